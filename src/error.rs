use thiserror::Error;

/// Why a generation request failed. `Display` is the message shown to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerateError {
    // Transport or provider-side failure, message passed through verbatim
    #[error("{0}")]
    Provider(String),
    #[error("No data returned from content provider")]
    NoData,
    #[error("Failed to parse response")]
    Parse,
    #[error("{0}")]
    Storage(String),
}
