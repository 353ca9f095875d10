/// 错误类型定义
/// Error taxonomy for the overlay pipeline
use thiserror::Error;

use crate::session::LensFacing;

/// 检测器失败 (模型错误 / 资源耗尽)
///
/// Produced by a [`Detector`](crate::detection::Detector); carries a
/// human-readable message plus an optional cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DetectionError {
    pub message: String,
    pub cause: Option<String>,
}

impl DetectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum OverlayError {
    /// 坐标转换时 SourceInfo 尚未设置 (编程错误)
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("failed to process frame: {message}")]
    DetectionFailure {
        message: String,
        cause: Option<String>,
    },

    #[error("this device does not have lens with facing: {facing:?}")]
    UnsupportedConfiguration { facing: LensFacing },

    #[error("invalid model name: {0}")]
    InvalidModel(String),

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("can not create image processor: {0}")]
    ProcessorCreation(String),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<DetectionError> for OverlayError {
    fn from(e: DetectionError) -> Self {
        OverlayError::DetectionFailure {
            message: e.message,
            cause: e.cause,
        }
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_error_converts_with_cause() {
        let err: OverlayError = DetectionError::with_cause("model error", "oom").into();
        match err {
            OverlayError::DetectionFailure { message, cause } => {
                assert_eq!(message, "model error");
                assert_eq!(cause.as_deref(), Some("oom"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unsupported_facing_message() {
        let err = OverlayError::UnsupportedConfiguration {
            facing: LensFacing::Front,
        };
        assert!(err.to_string().contains("Front"));
    }
}
