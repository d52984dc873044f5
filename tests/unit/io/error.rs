//! Tests for error types including source chaining and message formatting

#[cfg(test)]
mod tests {
    use greedylayers::GenerationError;
    use greedylayers::io::error::{file_system, invalid_catalog, invalid_parameter};
    use std::error::Error;
    use std::path::PathBuf;

    // Tests error source chaining works correctly
    // Verified by breaking source chain
    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = file_system("/tmp/request.json", "read")(io_error);

        assert!(error.source().is_some());
        let message = error.to_string();
        assert!(message.contains("/tmp/request.json"));
        assert!(message.contains("read"));
    }

    // Tests InvalidParameter error contains all fields
    // Verified by omitting value from message
    #[test]
    fn test_invalid_parameter_error() {
        let error = invalid_parameter("flush_threshold", &0, &"must be at least 1");

        let message = error.to_string();
        assert!(message.contains("flush_threshold"));
        assert!(message.contains('0'));
        assert!(message.contains("must be at least 1"));
    }

    #[test]
    fn test_invalid_catalog_error() {
        let error = invalid_catalog(&"piece id 'p' is used more than once");
        assert!(matches!(error, GenerationError::InvalidCatalog { .. }));
        assert_eq!(
            error.to_string(),
            "Invalid catalog: piece id 'p' is used more than once"
        );
    }

    // Tests request load errors keep the decoding cause
    // Verified by dropping the #[source] attribute
    #[test]
    fn test_request_load_error() {
        let source = serde_json::from_str::<u32>("nope").expect_err("Invalid JSON");
        let error = GenerationError::RequestLoad {
            path: PathBuf::from("broken.json"),
            source,
        };
        assert!(error.source().is_some());
        assert!(error.to_string().contains("broken.json"));
    }

    #[test]
    fn test_job_errors() {
        let failed = GenerationError::JobFailed {
            job: 3,
            reason: "generation thread panicked".to_string(),
        };
        assert!(failed.to_string().contains("job 3"));

        let disconnected = GenerationError::JobDisconnected { job: 4, received: 12 };
        assert!(disconnected.to_string().contains("12 images"));
    }

    // Tests conversion from std::io::Error
    // Verified by removing the From implementation
    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::other("disk full");
        let error: GenerationError = io_error.into();
        assert!(matches!(error, GenerationError::FileSystem { .. }));
    }
}
