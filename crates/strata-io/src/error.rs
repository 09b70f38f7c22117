use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("block data truncated")]
    Truncated,
    #[error("unsupported block format version {0}")]
    UnsupportedVersion(u8),
    #[error("node section holds {got} bytes, expected {expected}")]
    BadSize { expected: usize, got: usize },
    #[error("bad metadata: {0}")]
    BadMetadata(String),
    #[error("decompression failed: {0}")]
    Decompress(String),
    #[error("content id {0} does not fit format version {1}")]
    ContentOutOfRange(u16, u8),
    #[error("dummy blocks have no data to serialize")]
    Dummy,
}

impl From<std::io::Error> for SerializeError {
    fn from(_: std::io::Error) -> Self {
        // reads from an in-memory slice only fail by running out of bytes
        SerializeError::Truncated
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store environment: {0}")]
    Env(#[from] heed::Error),
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}
