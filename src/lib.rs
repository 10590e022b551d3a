//! Depth panorama meshing.
//!
//! Turns an equirectangular colour panorama plus its disparity map into a displaced,
//! textured triangle mesh:
//!
//! - [`codec`]: 8-bit disparity / log depth <-> linear depth
//! - [`projection`]: equirectangular angles -> unit directions
//! - [`mesh`]: per-quad sampling and full-grid tessellation
//! - [`upload`]: the contract a renderer implements to receive the mesh
//! - [`asset`]: stacked image loading
//! - [`camera`], [`config`]: viewer-side state and settings

pub mod asset;
pub mod camera;
pub mod codec;
pub mod config;
pub mod error;
pub mod mesh;
pub mod projection;
pub mod upload;

pub use codec::{DepthEncoding, DepthField, DisparityImage, MAX_DISPARITY};
pub use error::{ConfigError, LoadError, MeshError};
pub use mesh::{tessellate, tessellate_parallel, GridResolution, PanoramaMesh, Vertex};
