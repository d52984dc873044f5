//! Tests for log level parsing and subscriber installation

#[cfg(test)]
mod tests {
    use greedylayers::GenerationError;
    use greedylayers::io::logging::{init_logging, parse_level};
    use tracing_subscriber::filter::LevelFilter;

    // Tests known level names parse case-insensitively
    // Verified by matching level names exactly
    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("warn").ok(), Some(LevelFilter::WARN));
        assert_eq!(parse_level("DEBUG").ok(), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level("off").ok(), Some(LevelFilter::OFF));
    }

    #[test]
    fn test_parse_level_rejects_unknown() {
        let result = parse_level("chatty");
        assert!(matches!(
            result,
            Err(GenerationError::InvalidParameter { parameter: "log_level", .. })
        ));
    }

    // Tests installing twice is harmless
    // Verified by propagating the try_init error
    #[test]
    fn test_init_logging_idempotent() {
        assert!(init_logging("info").is_ok());
        assert!(init_logging("info").is_ok());
        assert!(init_logging("nonsense").is_err());
    }
}
