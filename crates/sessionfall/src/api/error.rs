use thiserror::Error;

/// Why an incoming session tuple was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("session tuple has {0} elements, expected at least 6")]
    TooShort(usize),
    #[error("session tuple is not an array")]
    NotAnArray,
    #[error("session tuple has no device id")]
    MissingDeviceId,
}

/// Image load failure. Never fatal: the cache resolves failed loads to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("failed to load image `{src}`: {reason}")]
    Failed { src: String, reason: String },
}

/// Configuration or payload parsing failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid viewport {width}x{height}")]
    Viewport { width: f32, height: f32 },
    #[error("invalid {field}: {value}")]
    Field { field: &'static str, value: f64 },
    #[error("{columns} columns do not fit a {width}px viewport")]
    Columns { columns: usize, width: f32 },
}
