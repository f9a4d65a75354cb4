//! Names the resolver never warns about
//!
//! Classes shipped with PHP itself and well-known third-party namespaces
//! are expected to be absent from the catalog; failing to bind them is not
//! a problem worth reporting.

/// PHP built-in classes and interfaces, by short name.
pub const PHP_BUILTIN_CLASSES: &[&str] = &[
    "ArrayAccess",
    "ArrayIterator",
    "ArrayObject",
    "Closure",
    "Countable",
    "DateInterval",
    "DatePeriod",
    "DateTime",
    "DateTimeImmutable",
    "DateTimeInterface",
    "DateTimeZone",
    "DirectoryIterator",
    "DivisionByZeroError",
    "DomainException",
    "Error",
    "ErrorException",
    "Exception",
    "Generator",
    "InvalidArgumentException",
    "Iterator",
    "IteratorAggregate",
    "JsonException",
    "JsonSerializable",
    "LengthException",
    "LogicException",
    "OutOfBoundsException",
    "OutOfRangeException",
    "OverflowException",
    "PDO",
    "PDOException",
    "PDOStatement",
    "RangeException",
    "RecursiveDirectoryIterator",
    "RecursiveIteratorIterator",
    "ReflectionClass",
    "ReflectionFunction",
    "ReflectionMethod",
    "ReflectionProperty",
    "RuntimeException",
    "SplFileInfo",
    "SplFileObject",
    "SplObjectStorage",
    "SplQueue",
    "SplStack",
    "Stringable",
    "Throwable",
    "Traversable",
    "TypeError",
    "UnderflowException",
    "UnexpectedValueException",
    "ValueError",
    "WeakMap",
    "stdClass",
];

/// Namespace prefixes of libraries the bundler does not try to locate.
pub const THIRD_PARTY_PREFIXES: &[&str] = &[
    "Composer\\",
    "Doctrine\\",
    "GuzzleHttp\\",
    "Monolog\\",
    "PHPUnit\\",
    "PhpParser\\",
    "Psr\\",
    "Symfony\\",
    "Twig\\",
];

/// True when the FQN (or its short name) names a PHP built-in.
pub fn is_builtin_class(fqn: &str) -> bool {
    let fqn = fqn.trim_start_matches('\\');
    let short = fqn.rsplit('\\').next().unwrap_or(fqn);
    PHP_BUILTIN_CLASSES.contains(&fqn) || PHP_BUILTIN_CLASSES.contains(&short)
}

/// True when the FQN lives under a known third-party namespace.
pub fn is_third_party(fqn: &str) -> bool {
    let fqn = fqn.trim_start_matches('\\');
    THIRD_PARTY_PREFIXES
        .iter()
        .any(|prefix| fqn.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_short_and_namespaced() {
        assert!(is_builtin_class("RuntimeException"));
        assert!(is_builtin_class("\\DateTime"));
        // Short-name fallback covers built-ins referenced from inside a
        // namespace without an import.
        assert!(is_builtin_class("App\\Exception"));
        assert!(!is_builtin_class("App\\Calc"));
    }

    #[test]
    fn test_third_party_prefixes() {
        assert!(is_third_party("Psr\\Log\\LoggerInterface"));
        assert!(is_third_party("\\Symfony\\Component\\Console\\Application"));
        assert!(!is_third_party("App\\Console\\Application"));
    }
}
