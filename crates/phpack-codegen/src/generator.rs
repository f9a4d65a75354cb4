//! Final source emission
//!
//! Renders the merged program as one PHP file: opening tag, a single
//! `declare(strict_types=1)`, inlined vendor blocks, namespace blocks,
//! and the entry code inside the global namespace. Writing is atomic and
//! the output carries the executable bit.

use crate::comments::{minimize_whitespace, strip_comments};
use crate::merger::{GenerateError, MergedBundle};
use phpack_core::Logger;
use std::fs;
use std::path::{Path, PathBuf};

/// Bootstrap prepended to the entry code when `error_handler` is set:
/// rethrows engine errors as `ErrorException` unless masked by
/// `error_reporting()`.
const ERROR_HANDLER_BOOTSTRAP: &str = "set_error_handler(static function ($severity, $message, $file, $line) {\n    if ((error_reporting() & $severity) === 0) {\n        return false;\n    }\n    throw new \\ErrorException($message, 0, $severity, $file, $line);\n});";

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub output: PathBuf,
    pub remove_comments: bool,
    pub minimize_whitespace: bool,
    /// Dead-code pruning of unreferenced class-like symbols.
    pub dead_code: bool,
    pub error_handler: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from("packed.php"),
            remove_comments: false,
            minimize_whitespace: false,
            dead_code: false,
            error_handler: false,
        }
    }
}

pub struct CodeGenerator {
    logger: Logger,
}

impl CodeGenerator {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Render the merged program to PHP source text.
    pub fn render(&self, bundle: &MergedBundle, options: &GenerateOptions) -> String {
        let mut out = String::from("<?php\n\ndeclare(strict_types=1);\n");

        let mut vendor_section = String::new();
        for block in &bundle.vendor_blocks {
            if block.content.is_empty() {
                continue;
            }
            vendor_section.push_str(&format!(
                "\n// ---- begin inlined file: {} ----\n{}\n// ---- end inlined file: {} ----\n",
                block.path, block.content, block.path
            ));
        }

        let named: Vec<(&str, &[String])> = bundle.named_namespaces().collect();
        let global: Vec<&String> = bundle
            .global_statements()
            .map(|stmts| stmts.iter().collect())
            .unwrap_or_default();

        let mut tail: Vec<&str> = Vec::new();
        if options.error_handler {
            tail.push(ERROR_HANDLER_BOOTSTRAP);
        }
        for stmt in &bundle.entry_code {
            tail.push(stmt.as_str());
        }

        let has_global_code = !global.is_empty() || !tail.is_empty();

        // The unbraced form must be the first statement after declare, so
        // inlined vendor code forces braces.
        if named.len() == 1 && !has_global_code && vendor_section.is_empty() {
            let (ns, stmts) = named[0];
            out.push_str(&format!("\nnamespace {};\n", ns));
            for stmt in stmts {
                out.push('\n');
                out.push_str(stmt);
                out.push('\n');
            }
        } else if named.is_empty() {
            out.push_str(&vendor_section);
            for stmt in &global {
                out.push('\n');
                out.push_str(stmt);
                out.push('\n');
            }
            for stmt in &tail {
                out.push('\n');
                out.push_str(stmt);
                out.push('\n');
            }
        } else {
            // Braced mode forbids code outside namespace blocks, so the
            // inlined vendor files lead in a global block of their own.
            if !vendor_section.is_empty() {
                out.push_str("\nnamespace {\n");
                out.push_str(&vendor_section);
                out.push_str("\n}\n");
            }
            for (ns, stmts) in &named {
                out.push_str(&format!("\nnamespace {} {{\n", ns));
                for stmt in *stmts {
                    out.push('\n');
                    out.push_str(stmt);
                    out.push('\n');
                }
                out.push_str("\n}\n");
            }
            if has_global_code {
                out.push_str("\nnamespace {\n");
                for stmt in &global {
                    out.push('\n');
                    out.push_str(stmt);
                    out.push('\n');
                }
                for stmt in &tail {
                    out.push('\n');
                    out.push_str(stmt);
                    out.push('\n');
                }
                out.push_str("\n}\n");
            }
        }

        if options.remove_comments {
            out = strip_comments(&out);
        }
        if options.minimize_whitespace {
            out = minimize_whitespace(&out);
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    /// Write the bundle atomically and make it executable.
    pub fn write(&self, text: &str, output: &Path) -> Result<(), GenerateError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "packed.php".to_string());
        let tmp = output.with_file_name(format!(".{}.tmp", file_name));

        fs::write(&tmp, text)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o755))?;
        }

        fs::rename(&tmp, output)?;
        self.logger
            .info(format!("Bundle written to {}", output.display()));
        Ok(())
    }
}
