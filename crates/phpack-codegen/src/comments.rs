//! Comment removal and whitespace minimization
//!
//! The scanner is string-aware: quoted strings, heredocs, and PHP 8
//! attributes pass through untouched. Doc blocks are filtered rather than
//! dropped: behavior-relevant tags survive, and `@param`/`@return` survive
//! only when the signature below carries no type of its own.

const PRESERVED_TAGS: &[&str] = &[
    "@throws",
    "@deprecated",
    "@see",
    "@since",
    "@todo",
    "@fixme",
    "@internal",
    "@api",
];

/// Remove comments from PHP source, preserving the doc tags listed above.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(c) = rest.chars().next() {
        if c == '\'' || c == '"' {
            let end = string_end(rest, c);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }
        if rest.starts_with("<<<") {
            let end = heredoc_end(rest);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }
        if rest.starts_with("/**") {
            let end = rest.find("*/").map(|p| p + 2).unwrap_or(rest.len());
            let block = &rest[..end];
            let following = &rest[end..];
            if let Some(kept) = filter_docblock(block, following) {
                out.push_str(&kept);
            }
            rest = following;
            continue;
        }
        if rest.starts_with("/*") {
            let end = rest.find("*/").map(|p| p + 2).unwrap_or(rest.len());
            rest = &rest[end..];
            continue;
        }
        if rest.starts_with("//") || (c == '#' && !rest.starts_with("#[")) {
            let end = rest.find('\n').unwrap_or(rest.len());
            rest = &rest[end..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Trim trailing whitespace and collapse runs of three or more blank lines
/// into one.
pub fn minimize_whitespace(source: &str) -> String {
    let lines: Vec<&str> = source.lines().map(|l| l.trim_end()).collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());

    let mut i = 0;
    while i < lines.len() {
        if lines[i].is_empty() {
            let mut run = 0;
            while i + run < lines.len() && lines[i + run].is_empty() {
                run += 1;
            }
            let keep = if run >= 3 { 1 } else { run };
            for _ in 0..keep {
                out.push("");
            }
            i += run;
        } else {
            out.push(lines[i]);
            i += 1;
        }
    }

    let mut result = out.join("\n");
    if source.ends_with('\n') && !result.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Past the closing quote of a string literal starting at offset 0.
fn string_end(text: &str, quote: char) -> usize {
    let mut iter = text.char_indices().skip(1);
    while let Some((i, c)) = iter.next() {
        if c == '\\' {
            iter.next();
            continue;
        }
        if c == quote {
            return i + c.len_utf8();
        }
    }
    text.len()
}

/// Past the terminator line of a heredoc/nowdoc starting at offset 0.
fn heredoc_end(text: &str) -> usize {
    let header_end = text.find('\n').map(|p| p + 1).unwrap_or(text.len());
    let label: String = text[3..header_end]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    if label.is_empty() {
        return header_end;
    }

    let mut offset = header_end;
    for line in text[header_end..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with(label.as_str()) {
            let after = &trimmed[label.len()..];
            if after
                .chars()
                .next()
                .map(|c| !c.is_alphanumeric() && c != '_')
                .unwrap_or(true)
            {
                return offset + line.len();
            }
        }
        offset += line.len();
    }
    text.len()
}

/// Keep only the preserved tags of a doc block. Returns `None` when the
/// whole block can go.
fn filter_docblock(block: &str, following: &str) -> Option<String> {
    let mut kept: Vec<String> = Vec::new();

    for line in block.lines() {
        let tag_text = line.trim().trim_start_matches("/**").trim_end_matches("*/");
        let tag_text = tag_text.trim().trim_start_matches('*').trim();
        if tag_text.is_empty() {
            continue;
        }

        if PRESERVED_TAGS.iter().any(|tag| tag_text.starts_with(tag)) {
            kept.push(tag_text.to_string());
        } else if tag_text.starts_with("@param") {
            if let Some(var) = tag_text.split_whitespace().find(|w| w.starts_with('$')) {
                if param_lacks_type(following, var) {
                    kept.push(tag_text.to_string());
                }
            }
        } else if tag_text.starts_with("@return") && return_lacks_type(following) {
            kept.push(tag_text.to_string());
        }
    }

    if kept.is_empty() {
        return None;
    }
    let mut block = String::from("/**\n");
    for line in kept {
        block.push_str(" * ");
        block.push_str(&line);
        block.push('\n');
    }
    block.push_str(" */");
    Some(block)
}

/// Signature text of the next function after a doc block: from the
/// `function` keyword to the start of its body.
fn next_signature(following: &str) -> Option<&str> {
    let start = following.find("function")?;
    let window = &following[start..];
    let end = window
        .find(['{', ';'])
        .unwrap_or_else(|| window.len().min(2000));
    Some(&window[..end])
}

/// A `@param $x` tag survives only when `$x` has no type declaration.
fn param_lacks_type(following: &str, var: &str) -> bool {
    let Some(signature) = next_signature(following) else {
        return false;
    };
    let Some(open) = signature.find('(') else {
        return false;
    };
    let params = &signature[open + 1..signature.rfind(')').unwrap_or(signature.len())];
    let Some(pos) = params.find(var) else {
        return false;
    };

    // Walk back over by-ref and variadic markers; a preceding type token
    // means the declaration already carries the information.
    let before = params[..pos]
        .trim_end()
        .trim_end_matches(['&', '.'])
        .trim_end();
    before.is_empty() || before.ends_with(',') || before.ends_with('(')
}

/// A `@return` tag survives only when the signature has no return type.
fn return_lacks_type(following: &str) -> bool {
    let Some(signature) = next_signature(following) else {
        return false;
    };
    match signature.rfind(')') {
        Some(close) => !signature[close..].contains(':'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comments_removed() {
        let source = "<?php\n// gone\necho 1; // also gone\n# and this\n";
        let out = strip_comments(source);
        assert!(!out.contains("gone"));
        assert!(!out.contains("and this"));
        assert!(out.contains("echo 1;"));
    }

    #[test]
    fn test_attribute_not_treated_as_comment() {
        let source = "<?php\n#[Attribute]\nclass Foo {}\n";
        let out = strip_comments(source);
        assert!(out.contains("#[Attribute]"));
    }

    #[test]
    fn test_block_comment_removed() {
        let out = strip_comments("<?php\n/* noise */\necho 1;\n");
        assert!(!out.contains("noise"));
    }

    #[test]
    fn test_comment_markers_in_strings_kept() {
        let source = "<?php\necho 'not // a comment';\necho \"nor /* this */\";\n";
        let out = strip_comments(source);
        assert!(out.contains("not // a comment"));
        assert!(out.contains("nor /* this */"));
    }

    #[test]
    fn test_heredoc_untouched() {
        let source = "<?php\n$x = <<<EOT\n// keep\n/* keep */\nEOT;\necho $x;\n";
        let out = strip_comments(source);
        assert!(out.contains("// keep"));
        assert!(out.contains("/* keep */"));
    }

    #[test]
    fn test_docblock_preserved_tags() {
        let source = "<?php\n/**\n * Summary dropped.\n * @throws \\RuntimeException\n * @deprecated use add()\n */\nfunction f() {}\n";
        let out = strip_comments(source);
        assert!(out.contains("@throws \\RuntimeException"));
        assert!(out.contains("@deprecated use add()"));
        assert!(!out.contains("Summary dropped."));
    }

    #[test]
    fn test_param_kept_only_without_type() {
        let source = "<?php\n/**\n * @param int $typed\n * @param $untyped\n */\nfunction f(int $typed, $untyped) {}\n";
        let out = strip_comments(source);
        assert!(!out.contains("$typed"));
        assert!(out.contains("@param $untyped"));
    }

    #[test]
    fn test_return_kept_only_without_type() {
        let typed = "<?php\n/**\n * @return int\n */\nfunction f(): int {}\n";
        assert!(!strip_comments(typed).contains("@return"));

        let untyped = "<?php\n/**\n * @return int\n */\nfunction f() {}\n";
        assert!(strip_comments(untyped).contains("@return int"));
    }

    #[test]
    fn test_strip_comments_idempotent() {
        let source = "<?php\n/** @throws \\Exception */\nfunction f() {}\n// gone\n";
        let once = strip_comments(source);
        assert_eq!(strip_comments(&once), once);
    }

    #[test]
    fn test_minimize_whitespace() {
        let source = "a;  \n\n\n\n\nb;\n\nc;\n";
        let out = minimize_whitespace(source);
        assert_eq!(out, "a;\n\nb;\n\nc;\n");
    }
}
