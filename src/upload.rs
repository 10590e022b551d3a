//! Boundary between the CPU mesh and whatever draws it.
//!
//! The wgpu renderer in the viewer binary implements [`MeshUpload`]; tests use a
//! recording sink. Buffers are uploaded once per asset and drawn every frame.

use crate::codec::DepthField;
use crate::mesh::{PanoramaMesh, Vertex};

/// Bytes between consecutive vertices.
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;
/// Byte offset of the position attribute (3 x f32).
pub const POSITION_OFFSET: u64 = 0;
/// Byte offset of the texture coordinate attribute (2 x f32).
pub const UV_OFFSET: u64 = 3 * std::mem::size_of::<f32>() as u64;

/// Everything the drawing side needs for one asset.
pub struct PanoramaTextures<'a> {
    /// RGBA8 colour panorama, row-major, `width * height * 4` bytes.
    pub color_rgba: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Linear depth, uploaded as a single-channel float texture.
    pub depth: &'a DepthField,
}

pub trait MeshUpload {
    /// Replace the current mesh and textures. Called once per loaded asset.
    fn upload_panorama(&mut self, mesh: &PanoramaMesh, textures: &PanoramaTextures<'_>);
}
