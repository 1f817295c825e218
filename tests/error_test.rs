use std::error::Error;
use std::time::Duration;

use rfd_solver::{Result, SolverError};

#[test]
fn test_error_display() {
    let err = SolverError::NotFound("pokemon/missingno".to_string());
    assert!(err.to_string().contains("pokemon/missingno"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(SolverError::AuthenticationFailed)
    }
    assert!(returns_error().is_err());
}

#[test]
fn schema_violation_names_field_and_record() {
    let err = SolverError::SchemaViolation {
        field: "stats".into(),
        record_index: Some(3),
    };
    assert_eq!(
        err.to_string(),
        "schema violation: missing required field 'stats' in record 3"
    );

    let empty = SolverError::SchemaViolation {
        field: "id".into(),
        record_index: None,
    };
    assert!(empty.to_string().ends_with("(no records)"));
}

#[test]
fn generation_error_keeps_cause() {
    let err = SolverError::Generation {
        target: "move/7".into(),
        source: Box::new(SolverError::Api {
            status: 400,
            message: "bad request".into(),
        }),
    };
    assert!(err.to_string().starts_with("generation failed for move/7"));
    let cause = err.source().unwrap().to_string();
    assert!(cause.contains("400"));
    assert_eq!(err.kind(), "generation");
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(SolverError::RateLimited { retry_after: None }.is_transient());
    assert!(SolverError::Http("connection reset".into()).is_transient());
    assert!(SolverError::Timeout(Duration::from_secs(10)).is_transient());
    assert!(
        SolverError::Api {
            status: 502,
            message: "bad gateway".into()
        }
        .is_transient()
    );
}

#[test]
fn permanent_errors() {
    assert!(!SolverError::AuthenticationFailed.is_transient());
    assert!(!SolverError::NotFound("x".into()).is_transient());
    assert!(!SolverError::InvalidRfd("x".into()).is_transient());
    assert!(
        !SolverError::Api {
            status: 404,
            message: "missing".into()
        }
        .is_transient()
    );
    assert!(
        !SolverError::Generation {
            target: "pokemon/1".into(),
            source: Box::new(SolverError::Http("reset".into())),
        }
        .is_transient()
    );
}

#[test]
fn retry_after_only_from_rate_limit() {
    let hint = Duration::from_secs(3);
    assert_eq!(
        SolverError::RateLimited {
            retry_after: Some(hint)
        }
        .retry_after(),
        Some(hint)
    );
    assert_eq!(SolverError::Http("x".into()).retry_after(), None);
}

#[test]
fn json_errors_convert() {
    let err: SolverError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), "json");
}
