pub mod config;
pub mod error;
pub mod logging;
pub mod rules;
pub mod validation;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use rules::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.sweep.chunk_size, 200);
        assert_eq!(config.sweep.expiry_window_days, 30);
        assert_eq!(config.alerts.sweep_low_compliance_threshold, 70.0);
        assert_eq!(config.alerts.update_low_compliance_threshold, 80.0);
        assert_eq!(config.rules.path, "config/document_rules.yaml");
    }

    #[test]
    fn test_error_handling() {
        let error = TrackerError::validation("test_field", "test message");
        assert_eq!(error.error_code(), "VALIDATION_ERROR");

        let missing = TrackerError::not_found("product 42");
        assert!(missing.is_not_found());
        assert_eq!(missing.error_code(), "NOT_FOUND");
        assert_eq!(missing.to_string(), "Not found: product 42");
    }
}
