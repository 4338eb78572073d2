use thiserror::Error;

use crate::entry::SignalKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectorError {
    #[error("Signal type not supported by this runtime: {0}")]
    Unsupported(SignalKind),

    #[error("Failed to observe {kind}: {reason}")]
    Subscribe { kind: SignalKind, reason: String },

    #[error("Invalid beacon endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Unable to inspect frame ancestry: {0}")]
    FrameCheck(String),

    #[error("Platform operation failed: {0}")]
    Platform(String),
}
