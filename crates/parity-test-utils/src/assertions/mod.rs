//! Common assertion macros for parity tests

/// Assert that a harness (or any `Result<EquivalenceResult, _>`) reports
/// equivalent graphs
#[macro_export]
macro_rules! assert_equivalent {
    ($harness:expr) => {
        match $harness.run() {
            Ok(result) => assert!(
                result.equivalent,
                "Expected equivalent graphs, but got differences:\n{:#?}",
                result.diff
            ),
            Err(e) => panic!("Expected equivalent graphs, but the check failed: {}", e),
        }
    };
    ($harness:expr, $strategy:expr) => {
        match $harness.run() {
            Ok(result) => {
                assert!(
                    result.equivalent,
                    "Expected equivalent graphs, but got differences:\n{:#?}",
                    result.diff
                );
                assert_eq!(result.strategy, $strategy, "Unexpected pairing strategy");
            }
            Err(e) => panic!("Expected equivalent graphs, but the check failed: {}", e),
        }
    };
}

/// Assert that a harness reports a mismatch, optionally naming an attribute
/// path that must appear among the differences
#[macro_export]
macro_rules! assert_not_equivalent {
    ($harness:expr) => {
        match $harness.run() {
            Ok(result) => assert!(!result.equivalent, "Expected a mismatch, but the graphs are equivalent"),
            Err(e) => panic!("Expected a mismatch, but the check failed: {}", e),
        }
    };
    ($harness:expr, $path:expr) => {
        match $harness.run() {
            Ok(result) => {
                assert!(!result.equivalent, "Expected a mismatch, but the graphs are equivalent");
                let paths = result
                    .diff
                    .changed
                    .iter()
                    .flat_map(|c| c.attributes.iter().map(|a| a.path.clone()))
                    .collect::<Vec<_>>();
                assert!(
                    paths.iter().any(|p| p == $path),
                    "Expected a difference at '{}', but got: {:?}",
                    $path,
                    paths
                );
            }
            Err(e) => panic!("Expected a mismatch, but the check failed: {}", e),
        }
    };
}

/// Assert that a result failed with the given `ErrorKind`, and optionally
/// that its message contains a pattern
#[macro_export]
macro_rules! assert_eval_error {
    ($result:expr, $kind:expr) => {
        match &$result {
            Ok(_) => panic!("Expected {} error, but got success", $kind),
            Err(e) => assert_eq!(e.kind(), $kind, "Unexpected error: {}", e),
        }
    };
    ($result:expr, $kind:expr, $pattern:expr) => {
        match &$result {
            Ok(_) => panic!("Expected {} error, but got success", $kind),
            Err(e) => {
                assert_eq!(e.kind(), $kind, "Unexpected error: {}", e);
                let error_str = e.to_string();
                assert!(
                    error_str.contains($pattern),
                    "Expected error containing '{}', but got: {}",
                    $pattern,
                    error_str
                );
            }
        }
    };
}
