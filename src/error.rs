// error.rs — error types shared by the mesh core and the asset loader

use std::path::PathBuf;

/// Structural precondition violations found while building a mesh.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, MeshError>;

/// Failures while turning a stacked colour/disparity file into a mesh.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("stacked image is {width}x{height}; need at least one row per half")]
    TooSmall { width: u32, height: u32 },
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Failures while reading a JSON configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
