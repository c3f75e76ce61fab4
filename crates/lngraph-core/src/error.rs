/// Errors raised while constructing or parsing core values.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid length for {what}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid short channel id: {0}")]
    InvalidShortChannelId(String),

    #[error("node alias too long: {len} bytes (max {max})")]
    AliasTooLong { len: usize, max: usize },

    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}
