use crate::types::DetectionResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a detection was not buffered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Smaller box side, in pixels
    FaceTooSmall { size: f32, min: f32 },
    LowConfidence { score: f32, min: f32 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::FaceTooSmall { size, min } => {
                write!(f, "face too small ({:.0}px < {:.0}px)", size, min)
            }
            RejectReason::LowConfidence { score, min } => {
                write!(f, "low confidence ({:.2} <= {:.2})", score, min)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    Accept,
    Reject(RejectReason),
}

impl GateDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, GateDecision::Accept)
    }
}

/// Stateless accept/reject policy for one detection.
///
/// A detection passes when the smaller side of its box is at least
/// `min_face_size` pixels and, if a confidence floor is set, its score is
/// strictly above that floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    min_face_size: f32,
    min_confidence: Option<f32>,
}

impl QualityGate {
    pub const MIN_FACE_SIZE: f32 = 100.0;
    pub const REGISTRATION_CONFIDENCE: f32 = 0.8;

    pub fn new(min_face_size: f32, min_confidence: Option<f32>) -> Self {
        Self {
            min_face_size,
            min_confidence,
        }
    }

    pub fn registration() -> Self {
        Self::new(Self::MIN_FACE_SIZE, Some(Self::REGISTRATION_CONFIDENCE))
    }

    /// Login buffers any face of sufficient size; there is no confidence floor.
    pub fn login() -> Self {
        Self::new(Self::MIN_FACE_SIZE, None)
    }

    pub fn min_face_size(&self) -> f32 {
        self.min_face_size
    }

    pub fn min_confidence(&self) -> Option<f32> {
        self.min_confidence
    }

    pub fn evaluate(&self, detection: &DetectionResult) -> GateDecision {
        let size = detection.bounding_box.min_dimension();
        // NaN on either side is a rejection
        if !(size >= self.min_face_size) {
            return GateDecision::Reject(RejectReason::FaceTooSmall {
                size,
                min: self.min_face_size,
            });
        }

        if let Some(min) = self.min_confidence {
            // NaN scores fail the comparison and are rejected
            if !(detection.confidence_score > min) {
                return GateDecision::Reject(RejectReason::LowConfidence {
                    score: detection.confidence_score,
                    min,
                });
            }
        }

        GateDecision::Accept
    }

    pub fn accept(&self, detection: &DetectionResult) -> bool {
        self.evaluate(detection).is_accept()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Point};

    fn detection(width: f32, height: f32, confidence: f32) -> DetectionResult {
        DetectionResult {
            bounding_box: BoundingBox::new(width, height),
            confidence_score: confidence,
            descriptor: vec![0.1; 128],
            landmarks: vec![Point::new(10.0, 10.0)],
        }
    }

    #[test]
    fn test_nan_size_threshold_rejects() {
        let gate = QualityGate::new(f32::NAN, None);
        assert!(!gate.accept(&detection(10.0, 10.0, 0.9)));
        assert!(!gate.accept(&detection(500.0, 500.0, 0.9)));
    }

    #[test]
    fn test_registration_accepts_large_confident_face() {
        let gate = QualityGate::registration();
        assert!(gate.accept(&detection(120.0, 130.0, 0.85)));
    }

    #[test]
    fn test_small_face_rejected_regardless_of_confidence() {
        let gate = QualityGate::registration();
        let decision = gate.evaluate(&detection(50.0, 50.0, 0.95));
        assert_eq!(
            decision,
            GateDecision::Reject(RejectReason::FaceTooSmall {
                size: 50.0,
                min: 100.0
            })
        );
        assert!(!QualityGate::login().accept(&detection(50.0, 50.0, 0.95)));
    }

    #[test]
    fn test_min_side_decides_size() {
        let gate = QualityGate::login();
        assert!(!gate.accept(&detection(300.0, 99.0, 1.0)));
        assert!(gate.accept(&detection(100.0, 100.0, 1.0)));
    }

    #[test]
    fn test_confidence_threshold_is_strict() {
        let gate = QualityGate::registration();
        assert!(!gate.accept(&detection(120.0, 130.0, 0.8)));
        assert!(gate.accept(&detection(120.0, 130.0, 0.81)));
        assert!(matches!(
            gate.evaluate(&detection(120.0, 130.0, 0.4)),
            GateDecision::Reject(RejectReason::LowConfidence { .. })
        ));
    }

    #[test]
    fn test_login_ignores_confidence() {
        let gate = QualityGate::login();
        assert!(gate.accept(&detection(120.0, 130.0, 0.4)));
        assert!(gate.accept(&detection(120.0, 130.0, 0.0)));
    }

    #[test]
    fn test_nan_confidence_rejected() {
        let gate = QualityGate::registration();
        assert!(!gate.accept(&detection(120.0, 130.0, f32::NAN)));
    }

    #[test]
    fn test_reject_reason_display() {
        let reason = RejectReason::FaceTooSmall {
            size: 50.0,
            min: 100.0,
        };
        assert_eq!(reason.to_string(), "face too small (50px < 100px)");
    }
}
