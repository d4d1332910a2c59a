//! Error types with stable machine-readable codes

use thiserror::Error;

/// All error variants are part of the public API.
///
/// Every variant maps to a stable code via [`ForemanError::code`] so callers
/// can dispatch without matching on variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForemanError {
    #[error("No supported worker implementation available")]
    UnsupportedModel,

    #[error("Worker registration failed: {details}")]
    RegistrationFailed { details: String },

    #[error("Worker construction failed: {details}")]
    SpawnFailed { details: String },

    #[error("Worker setup failed: {details}")]
    SetupFailed { details: String },

    #[error("Timeout occurred during worker setup")]
    SetupTimeout,

    #[error("Worker update failed: {details}")]
    UpdateFailed { details: String },

    #[error("Worker is considered redundant")]
    Redundant,

    #[error("No worker handle was captured during setup")]
    HandleUnavailable,

    #[error("Worker message channel is closed")]
    ChannelClosed,

    #[error("The key '{key}' given is invalid")]
    KeyInvalid { key: String },

    #[error("Not implemented")]
    NotImplemented,
}

impl ForemanError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedModel => "unsupported-model",
            Self::RegistrationFailed { .. } => "registration-failed",
            Self::SpawnFailed { .. } => "spawn-failed",
            Self::SetupFailed { .. } => "setup-failed",
            Self::SetupTimeout => "setup-timeout",
            Self::UpdateFailed { .. } => "update-failed",
            Self::Redundant => "redundant",
            Self::HandleUnavailable => "handle-unavailable",
            Self::ChannelClosed => "channel-closed",
            Self::KeyInvalid { .. } => "key-invalid",
            Self::NotImplemented => "not-implemented",
        }
    }
}
