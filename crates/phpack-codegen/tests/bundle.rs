//! End-to-end bundling scenarios: analyze a fixture project, order it,
//! merge it, and check the emitted PHP.

use bumpalo::Bump;
use phpack_analyze::{AutoloadResolver, DependencyResolver, FileAnalyzer, LoadOrderer};
use phpack_codegen::{AstMerger, CodeGenerator, GenerateOptions};
use phpack_core::logger::MemorySink;
use phpack_core::parser::{MagoParser, Parser};
use phpack_core::{LogLevel, Logger};
use phpack_store::Store;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn bundle_project(
    root: &Path,
    entry: &str,
    options: &GenerateOptions,
) -> (String, Store, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::new(sink.clone());

    let mut store = Store::in_memory().unwrap();
    let analyzer = FileAnalyzer::new(root, logger.clone());
    let mut autoload = AutoloadResolver::new(root, logger.clone());
    let manifest = root.join("composer.json");
    if manifest.exists() {
        autoload.load_composer_manifest(&mut store, &manifest).unwrap();
    }

    let mut resolver = DependencyResolver::new(&analyzer, &autoload, logger.clone());
    resolver.resolve_all(&mut store, Path::new(entry)).unwrap();

    let entry_file = store.entry_file().unwrap().expect("entry analyzed");
    let order = LoadOrderer::new(logger.clone())
        .load_order(&store, entry_file.id)
        .unwrap();

    let merger = AstMerger::new(root, logger.clone());
    let bundle = merger.merge(&store, entry, &order, options).unwrap();
    let text = CodeGenerator::new(logger).render(&bundle, options);
    (text, store, sink)
}

fn assert_valid_php(bundle: &str) {
    let arena = Bump::new();
    let parser = MagoParser::new();
    parser
        .parse(&arena, "bundle.php", bundle)
        .expect("generated bundle must parse");
}

#[test]
fn simple_class_bundles_and_rewrites() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "composer.json",
        r#"{"autoload": {"psr-4": {"App\\": "src/"}}}"#,
    );
    write(
        temp.path(),
        "main.php",
        "<?php\nuse App\\Calc;\necho (new Calc)->add(2, 3);\n",
    );
    write(
        temp.path(),
        "src/Calc.php",
        "<?php\nnamespace App;\n\nclass Calc\n{\n    public function add($a, $b)\n    {\n        return $a + $b;\n    }\n}\n",
    );

    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &GenerateOptions::default());

    assert!(bundle.starts_with("<?php\n\ndeclare(strict_types=1);\n"));
    assert_eq!(bundle.matches("declare(strict_types").count(), 1);
    assert!(bundle.contains("namespace App {"));
    assert!(bundle.contains("class Calc"));
    // The alias import is gone; the reference survives fully qualified.
    assert!(!bundle.contains("use App\\Calc;"));
    assert!(bundle.contains("echo (new \\App\\Calc)->add(2, 3);"));
    assert_valid_php(&bundle);
}

#[test]
fn interface_declared_before_implementation() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "composer.json",
        r#"{"autoload": {"psr-4": {"App\\": "src/"}}}"#,
    );
    write(
        temp.path(),
        "main.php",
        "<?php\nuse App\\Calc;\necho (new Calc)->add(2, 3);\n",
    );
    write(
        temp.path(),
        "src/I.php",
        "<?php\nnamespace App;\ninterface I\n{\n    public function go(): int;\n}\n",
    );
    write(
        temp.path(),
        "src/Calc.php",
        "<?php\nnamespace App;\n\nclass Calc implements I\n{\n    public function add($a, $b)\n    {\n        return $a + $b;\n    }\n}\n",
    );

    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &GenerateOptions::default());

    let iface_pos = bundle.find("interface I").expect("interface bundled");
    let class_pos = bundle.find("class Calc").expect("class bundled");
    assert!(iface_pos < class_pos);
    assert!(bundle.contains("implements \\App\\I"));
    assert_valid_php(&bundle);
}

#[test]
fn namespace_disambiguation_two_blocks() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "composer.json",
        r#"{"autoload": {"psr-4": {"A\\": "src/"}}}"#,
    );
    write(
        temp.path(),
        "main.php",
        "<?php\nuse A\\V1\\Calc as C1;\nuse A\\V2\\Calc as C2;\necho (new C1)->go() + (new C2)->go();\n",
    );
    write(
        temp.path(),
        "src/V1/Calc.php",
        "<?php\nnamespace A\\V1;\nclass Calc\n{\n    public function go()\n    {\n        return 1;\n    }\n}\n",
    );
    write(
        temp.path(),
        "src/V2/Calc.php",
        "<?php\nnamespace A\\V2;\nclass Calc\n{\n    public function go()\n    {\n        return 2;\n    }\n}\n",
    );

    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &GenerateOptions::default());

    assert!(bundle.contains("namespace A\\V1 {"));
    assert!(bundle.contains("namespace A\\V2 {"));
    assert!(bundle.contains("new \\A\\V1\\Calc"));
    assert!(bundle.contains("new \\A\\V2\\Calc"));
    assert_valid_php(&bundle);
}

#[test]
fn circular_require_bundles_each_file_once() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "a.php",
        "<?php\nrequire_once 'b.php';\nfunction fa()\n{\n    return 1;\n}\necho fa() + fb();\n",
    );
    write(
        temp.path(),
        "b.php",
        "<?php\nrequire_once 'a.php';\nfunction fb()\n{\n    return 2;\n}\n",
    );

    let (bundle, _, sink) = bundle_project(temp.path(), "a.php", &GenerateOptions::default());

    assert!(sink.contains(LogLevel::Warn, "Circular dependency"));
    assert_eq!(bundle.matches("function fa()").count(), 1);
    assert_eq!(bundle.matches("function fb()").count(), 1);
    assert!(!bundle.contains("require_once"));
    assert_valid_php(&bundle);
}

#[test]
fn unresolvable_class_warns_once_and_persists() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "main.php",
        "<?php\nnew Unknown\\X();\nnew Unknown\\X();\n",
    );

    let (bundle, store, sink) = bundle_project(temp.path(), "main.php", &GenerateOptions::default());

    assert_eq!(sink.count(LogLevel::Warn, "Class not found: Unknown\\X"), 1);
    assert!(!bundle.contains("class X"));

    let unresolved = store.get_unresolved_dependencies().unwrap();
    assert_eq!(unresolved.len(), 1);
    assert!(!unresolved[0].is_resolved);
    assert_eq!(unresolved[0].symbol_name.as_deref(), Some("Unknown\\X"));
    assert_valid_php(&bundle);
}

#[test]
fn conditional_includes_bundled_and_stripped() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "main.php",
        "<?php\nif (PHP_SAPI === \"cli\") {\n    require \"cli.php\";\n} else {\n    require \"web.php\";\n}\n",
    );
    write(temp.path(), "cli.php", "<?php\nfunction run_cli()\n{\n    return 'cli';\n}\n");
    write(temp.path(), "web.php", "<?php\nfunction run_web()\n{\n    return 'web';\n}\n");

    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &GenerateOptions::default());

    // Both targets are merged and neither require remains; the emptied
    // conditional is allowed to stay behind.
    assert!(bundle.contains("function run_cli()"));
    assert!(bundle.contains("function run_web()"));
    assert!(!bundle.contains("require"));
    assert!(bundle.contains("if (PHP_SAPI === \"cli\")"));
    assert_valid_php(&bundle);
}

#[test]
fn require_chain_with_dir_constant() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "main.php",
        "<?php\nrequire __DIR__ . '/lib/a.php';\necho run();\n",
    );
    write(
        temp.path(),
        "lib/a.php",
        "<?php\nrequire_once __DIR__ . '/b.php';\nfunction run()\n{\n    return helper();\n}\n",
    );
    write(temp.path(), "lib/b.php", "<?php\nfunction helper()\n{\n    return 5;\n}\n");

    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &GenerateOptions::default());

    assert!(!bundle.contains("require"));
    let helper_pos = bundle.find("function helper()").unwrap();
    let run_pos = bundle.find("function run()").unwrap();
    let echo_pos = bundle.find("echo run();").unwrap();
    assert!(helper_pos < run_pos);
    assert!(run_pos < echo_pos);
    assert_valid_php(&bundle);
}

#[test]
fn vendor_autoload_inlined_and_require_stripped() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "main.php",
        "<?php\nrequire __DIR__ . '/vendor/autoload.php';\necho 'ok';\n",
    );
    write(
        temp.path(),
        "vendor/autoload.php",
        "<?php\nspl_autoload_register(function ($class) {\n    return false;\n});\n",
    );

    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &GenerateOptions::default());

    assert!(!bundle.contains("require"));
    assert!(bundle.contains("begin inlined file: vendor/autoload.php"));
    assert!(bundle.contains("spl_autoload_register"));
    assert!(bundle.contains("echo 'ok';"));
    assert_valid_php(&bundle);
}

#[test]
fn vendor_block_coexists_with_namespaced_classes() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "composer.json",
        r#"{"autoload": {"psr-4": {"App\\": "src/"}}}"#,
    );
    write(
        temp.path(),
        "main.php",
        "<?php\nrequire __DIR__ . '/vendor/autoload.php';\nuse App\\Calc;\necho (new Calc)->add(2, 3);\n",
    );
    write(
        temp.path(),
        "vendor/autoload.php",
        "<?php\nspl_autoload_register(function ($class) {\n    return false;\n});\n",
    );
    write(
        temp.path(),
        "src/Calc.php",
        "<?php\nnamespace App;\n\nclass Calc\n{\n    public function add($a, $b)\n    {\n        return $a + $b;\n    }\n}\n",
    );

    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &GenerateOptions::default());

    assert!(!bundle.contains("require"));
    assert!(bundle.contains("spl_autoload_register"));
    assert!(bundle.contains("namespace App {"));
    assert!(bundle.contains("echo (new \\App\\Calc)->add(2, 3);"));

    // The inlined autoloader leads inside a global namespace block; in
    // braced mode nothing may sit outside namespace braces.
    let global_open = bundle.find("namespace {").unwrap();
    let vendor_pos = bundle
        .find("begin inlined file: vendor/autoload.php")
        .unwrap();
    let app_pos = bundle.find("namespace App {").unwrap();
    assert!(global_open < vendor_pos);
    assert!(vendor_pos < app_pos);
    assert_valid_php(&bundle);
}

#[test]
fn comment_removal_keeps_doc_tags() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "composer.json",
        r#"{"autoload": {"psr-4": {"App\\": "src/"}}}"#,
    );
    write(temp.path(), "main.php", "<?php\nuse App\\Calc;\necho (new Calc)->add(2, 3);\n");
    write(
        temp.path(),
        "src/Calc.php",
        "<?php\nnamespace App;\n\n// implementation detail\nclass Calc\n{\n    /**\n     * Adds two numbers.\n     * @throws \\InvalidArgumentException\n     */\n    public function add($a, $b)\n    {\n        return $a + $b;\n    }\n}\n",
    );

    let options = GenerateOptions {
        remove_comments: true,
        minimize_whitespace: true,
        ..GenerateOptions::default()
    };
    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &options);

    assert!(!bundle.contains("implementation detail"));
    assert!(!bundle.contains("Adds two numbers"));
    assert!(bundle.contains("@throws \\InvalidArgumentException"));
    assert_valid_php(&bundle);
}

#[test]
fn dead_code_pruning_drops_unreferenced_class() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "composer.json",
        r#"{"autoload": {"psr-4": {"App\\": "src/"}}}"#,
    );
    write(temp.path(), "main.php", "<?php\nuse App\\Calc;\necho (new Calc)->add(2, 3);\n");
    write(
        temp.path(),
        "src/Calc.php",
        "<?php\nnamespace App;\n\nclass Calc\n{\n    public function add($a, $b)\n    {\n        return $a + $b;\n    }\n}\n\nclass Orphan\n{\n}\n",
    );

    let options = GenerateOptions {
        dead_code: true,
        ..GenerateOptions::default()
    };
    let (bundle, _, _) = bundle_project(temp.path(), "main.php", &options);

    assert!(bundle.contains("class Calc"));
    assert!(!bundle.contains("class Orphan"));
    assert_valid_php(&bundle);
}

#[test]
fn generate_bundle_writes_executable_output() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "main.php", "<?php\necho 'hello';\n");

    let sink = Arc::new(MemorySink::new());
    let logger = Logger::new(sink);
    let mut store = Store::in_memory().unwrap();
    let analyzer = FileAnalyzer::new(temp.path(), logger.clone());
    let autoload = AutoloadResolver::new(temp.path(), logger.clone());
    let mut resolver = DependencyResolver::new(&analyzer, &autoload, logger.clone());
    resolver
        .resolve_all(&mut store, Path::new("main.php"))
        .unwrap();

    let entry = store.entry_file().unwrap().unwrap();
    let order = LoadOrderer::new(logger.clone())
        .load_order(&store, entry.id)
        .unwrap();

    let options = GenerateOptions {
        output: temp.path().join("build/o.php"),
        ..GenerateOptions::default()
    };
    let written = phpack_codegen::generate_bundle(
        &store,
        temp.path(),
        "main.php",
        &order,
        &options,
        &logger,
    )
    .unwrap();

    let content = fs::read_to_string(&written).unwrap();
    assert!(content.starts_with("<?php\n"));
    assert!(content.contains("echo 'hello';"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&written).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
