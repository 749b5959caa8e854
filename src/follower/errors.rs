//! Error types for track following
//!
//! Seed and pass level failures are recoverable: the follower excludes the
//! affected seed or direction and carries on. Missing dependencies and invalid
//! configuration are fatal for the event and surface to the caller.

use std::fmt;

/// Errors that can occur during track following
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// Seed points cannot define a track (too few, coincident, collinear)
    DegenerateSeed {
        /// Why the seed was rejected
        reason: String,
    },

    /// A state could not be propagated to the requested surface
    ExtrapolationFailed {
        /// Why the propagation failed
        reason: String,
    },

    /// Hit coordinates contain NaN or infinity
    NonFiniteHit,

    /// Matrix inversion failed (singular matrix)
    SingularMatrix {
        /// Description of which matrix failed
        context: String,
    },

    /// No usable magnetic field model
    MissingField,

    /// No detector geometry
    MissingGeometry,

    /// Configuration error
    Configuration {
        /// Description of the configuration issue
        description: String,
    },
}

impl TrackingError {
    /// True if the error prevents following any track of the event
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrackingError::MissingField
                | TrackingError::MissingGeometry
                | TrackingError::Configuration { .. }
        )
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        TrackingError::DegenerateSeed {
            reason: reason.into(),
        }
    }

    pub(crate) fn extrapolation(reason: impl Into<String>) -> Self {
        TrackingError::ExtrapolationFailed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::DegenerateSeed { reason } => write!(f, "Degenerate seed: {}", reason),
            TrackingError::ExtrapolationFailed { reason } => {
                write!(f, "Extrapolation failed: {}", reason)
            }
            TrackingError::NonFiniteHit => write!(f, "Hit coordinates are not finite"),
            TrackingError::SingularMatrix { context } => {
                write!(f, "Matrix inversion failed: {}", context)
            }
            TrackingError::MissingField => write!(f, "No magnetic field model available"),
            TrackingError::MissingGeometry => write!(f, "No detector geometry available"),
            TrackingError::Configuration { description } => {
                write!(f, "Configuration error: {}", description)
            }
        }
    }
}

impl std::error::Error for TrackingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_error_display() {
        let err = TrackingError::SingularMatrix {
            context: "innovation covariance".to_string(),
        };
        assert!(err.to_string().contains("innovation covariance"));

        let err = TrackingError::degenerate("collinear points");
        assert!(err.to_string().contains("collinear"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TrackingError::MissingField.is_fatal());
        assert!(TrackingError::MissingGeometry.is_fatal());
        assert!(!TrackingError::NonFiniteHit.is_fatal());
        assert!(!TrackingError::extrapolation("curls back").is_fatal());
    }
}
