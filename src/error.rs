//! Error types for the viewer engine and its collaborators.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while ingesting samples or navigating the view.
///
/// Empty results (a GPU with no samples, a window with no data) are not
/// errors; they surface as `Option::None` or empty collections.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// A sample's timestamp precedes the last stored one for its GPU.
    /// The sample is dropped; the store is unchanged.
    #[error("out of order sample for gpu {gpu_id}: {timestamp} precedes {last}")]
    OutOfOrderSample {
        gpu_id: u32,
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    /// A navigation operation received malformed parameters. The window
    /// state is unchanged.
    #[error("invalid navigation: {reason}")]
    InvalidNavigation { reason: String },

    /// The telemetry source could not be queried or parsed.
    #[error("telemetry query failed: {reason}")]
    Telemetry { reason: String },

    /// A log file could not be read or written.
    #[error("log file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_navigation() {
        let err = ViewerError::InvalidNavigation {
            reason: "zoom factor must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid navigation: zoom factor must be positive"
        );
    }

    #[test]
    fn error_display_telemetry() {
        let err = ViewerError::Telemetry {
            reason: "nvidia-smi not found".to_string(),
        };
        assert_eq!(err.to_string(), "telemetry query failed: nvidia-smi not found");
    }

    #[test]
    fn error_display_out_of_order() {
        let last = Utc::now();
        let timestamp = last - chrono::TimeDelta::seconds(1);
        let err = ViewerError::OutOfOrderSample {
            gpu_id: 3,
            timestamp,
            last,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("out of order sample for gpu 3"));
    }
}
