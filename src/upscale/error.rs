//! Error types for the upscaling pipeline

use thiserror::Error;

use super::{MAX_DIMENSION, MIN_DIMENSION};

/// Pipeline stage in which an invariant check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Color-aware distance transform
    Distance,
    /// Contour tracing
    Trace,
    /// Offset map construction
    Offsets,
    /// 2x rendering
    Render,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Distance => write!(f, "distance field"),
            Stage::Trace => write!(f, "contour tracer"),
            Stage::Offsets => write!(f, "offset map"),
            Stage::Render => write!(f, "renderer"),
        }
    }
}

/// Error returned by the upscaling pipeline.
///
/// None of these are retryable: the pipeline is deterministic, so the same
/// input fails the same way every time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpscaleError {
    /// Width or height below the minimum the distance field needs
    #[error("Image {width}x{height} is too small: both dimensions must be at least {min} pixels", min = MIN_DIMENSION)]
    InputTooSmall { width: u32, height: u32 },
    /// Width or height cannot be encoded in the 15-bit worklist links
    #[error("Image {width}x{height} is too large: both dimensions must be at most {max} pixels", max = MAX_DIMENSION)]
    CoordinateOverflow { width: u32, height: u32 },
    /// An internal consistency check failed
    #[error("Invariant violation in {stage}: {detail}")]
    InvariantViolation { stage: Stage, detail: String },
}

impl UpscaleError {
    pub(crate) fn invariant(stage: Stage, detail: impl Into<String>) -> Self {
        UpscaleError::InvariantViolation { stage, detail: detail.into() }
    }
}

/// Reject dimensions the pipeline cannot process.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), UpscaleError> {
    if width < MIN_DIMENSION || height < MIN_DIMENSION {
        return Err(UpscaleError::InputTooSmall { width, height });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(UpscaleError::CoordinateOverflow { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimensions_accepts_minimum() {
        assert!(check_dimensions(4, 4).is_ok());
        assert!(check_dimensions(MAX_DIMENSION, MAX_DIMENSION).is_ok());
    }

    #[test]
    fn test_check_dimensions_too_small() {
        assert_eq!(
            check_dimensions(3, 10),
            Err(UpscaleError::InputTooSmall { width: 3, height: 10 })
        );
        assert_eq!(check_dimensions(10, 0), Err(UpscaleError::InputTooSmall { width: 10, height: 0 }));
    }

    #[test]
    fn test_check_dimensions_overflow() {
        assert_eq!(
            check_dimensions(32768, 4),
            Err(UpscaleError::CoordinateOverflow { width: 32768, height: 4 })
        );
    }

    #[test]
    fn test_error_display() {
        let err = UpscaleError::InputTooSmall { width: 2, height: 3 };
        assert_eq!(
            err.to_string(),
            "Image 2x3 is too small: both dimensions must be at least 4 pixels"
        );

        let err = UpscaleError::invariant(Stage::Trace, "contour did not close");
        assert_eq!(err.to_string(), "Invariant violation in contour tracer: contour did not close");
    }
}
