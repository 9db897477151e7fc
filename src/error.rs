use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while extracting parcels for one site.
///
/// Every variant except `InvalidConfig` is scoped to a single site run; the
/// batch runner records it and moves on to the next site.
#[derive(Error, Debug)]
pub enum ParcelError {
    #[error("site {site_id}: missing input {}", path.display())]
    MissingInput { site_id: String, path: PathBuf },

    #[error("unreadable image {}: {source}", path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image {}: {source}", path.display())]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{stage}: grid is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        stage: &'static str,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("land-use assignment for unknown parcel {0}")]
    UnknownParcel(String),
}

pub type Result<T> = std::result::Result<T, ParcelError>;

impl ParcelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
