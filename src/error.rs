use elasticsearch::http::transport::BuildError;
use elasticsearch::Error as ElasticsearchError;
use exif::Error as ExifError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EXIF error: {0}")]
    Exif(#[from] ExifError),

    #[error("Elasticsearch error: {0}")]
    Elasticsearch(#[from] ElasticsearchError),

    #[error("Elasticsearch transport error: {0}")]
    TransportBuild(#[from] BuildError),

    #[error("JSON error: {0}")]
    Json(#[from] SerdeJsonError),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Tokio join error: {0}")]
    Join(#[from] JoinError),

    #[error("Unparseable date \"{value}\": {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Corrupt {format} stream: {reason}")]
    CorruptStream { format: &'static str, reason: String },

    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Thumbnail tool '{tool}' failed: {reason}")]
    ThumbnailTool { tool: String, reason: String },

    #[error("Document [id={id}] already exists in index {index}")]
    DocumentAlreadyExists { id: String, index: String },

    #[error("Search backend returned {status}: {reason}")]
    Backend { status: u16, reason: String },

    #[error("Result window exceeded: from ({from}) must be less than {max} [size={size}]")]
    ResultWindowExceeded { from: usize, size: usize, max: usize },

    #[error("Search backend connection is closed")]
    ConnectionClosed,

    #[error("Embedded cluster is not available: point indexor.cluster at an external node")]
    EmbeddedClusterUnavailable,
}

impl AppError {
    pub(crate) fn corrupt(format: &'static str, reason: impl Into<String>) -> Self {
        AppError::CorruptStream {
            format,
            reason: reason.into(),
        }
    }

    /// HTTP-like status of a backend failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Backend { status, .. } => Some(*status),
            AppError::DocumentAlreadyExists { .. } => Some(409),
            _ => None,
        }
    }
}
