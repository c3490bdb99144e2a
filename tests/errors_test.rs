#[cfg(test)]
mod error_tests {
    use facegate::errors::CaptureError;
    use std::error::Error;

    #[test]
    fn test_init_error_display() {
        let error = CaptureError::InitError("weights missing".to_string());
        assert!(error.to_string().contains("Detector initialization error"));
        assert!(error.to_string().contains("weights missing"));
    }

    #[test]
    fn test_attempts_exhausted_display() {
        let error = CaptureError::AttemptsExhausted {
            attempts: 3,
            max_attempts: 3,
        };
        assert_eq!(
            error.to_string(),
            "Verification attempts exhausted (3/3)"
        );
    }

    #[test]
    fn test_timeout_display() {
        let error = CaptureError::DetectTimeout(5000);
        assert_eq!(error.to_string(), "Detector call timed out after 5000ms");
    }

    #[test]
    fn test_only_init_and_exhaustion_are_fatal() {
        assert!(CaptureError::InitError("x".into()).is_fatal());
        assert!(CaptureError::AttemptsExhausted {
            attempts: 1,
            max_attempts: 1
        }
        .is_fatal());
        assert!(!CaptureError::TransientCapture("x".into()).is_fatal());
        assert!(!CaptureError::DetectTimeout(1).is_fatal());
        assert!(!CaptureError::SubmitRejected("x".into()).is_fatal());
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = CaptureError::TransientCapture("frame dropped".to_string());
        let error_trait: &dyn Error = &error;
        assert!(error_trait.to_string().contains("frame dropped"));
        assert!(error_trait.source().is_none());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<Vec<f32>>("not json").unwrap_err();
        let error: CaptureError = json_error.into();
        assert!(matches!(error, CaptureError::Serialization(_)));
    }
}
