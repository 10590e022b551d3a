// mesh.rs — displaced equirectangular mesh generator
//
// The panorama is cut into (cols - 1) x (rows - 1) texel-space quads. Every quad gets its
// own 4 vertices (neighbours duplicate shared corners, nothing is welded) and 2 triangles.

use crate::codec::DepthField;
use crate::error::{MeshError, Result};
use crate::projection::{back_project, equirect_angles};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const FLOATS_PER_VERTEX: usize = 5;
pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// Interleaved vertex: position then texture coordinate, 20 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Axis-aligned rectangle in source pixel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Quad {
    /// Top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.x, self.y),
            (self.x + self.w, self.y),
            (self.x + self.w, self.y + self.h),
            (self.x, self.y + self.h),
        ]
    }
}

/// Number of grid *lines*; the mesh has `(cols - 1) * (rows - 1)` cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridResolution {
    pub cols: u32,
    pub rows: u32,
}

impl Default for GridResolution {
    fn default() -> Self {
        Self {
            cols: 1000,
            rows: 500,
        }
    }
}

impl GridResolution {
    pub fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cols < 2 || self.rows < 2 {
            return Err(MeshError::InvalidArgument(format!(
                "grid resolution must be at least 2x2, got {}x{}",
                self.cols, self.rows
            )));
        }
        let vertices = self
            .cell_cols()
            .checked_mul(self.cell_rows())
            .and_then(|cells| cells.checked_mul(INDICES_PER_QUAD).map(|_| cells))
            .and_then(|cells| cells.checked_mul(VERTICES_PER_QUAD));
        if !vertices.is_some_and(|n| n <= u32::MAX as usize) {
            return Err(MeshError::InvalidArgument(format!(
                "grid {}x{} needs more vertices than u32 indices can address",
                self.cols, self.rows
            )));
        }
        Ok(())
    }

    pub fn cell_cols(&self) -> usize {
        self.cols.saturating_sub(1) as usize
    }

    pub fn cell_rows(&self) -> usize {
        self.rows.saturating_sub(1) as usize
    }

    // Saturating: only meaningful once `validate` has passed.
    pub fn cell_count(&self) -> usize {
        self.cell_cols().saturating_mul(self.cell_rows())
    }

    pub fn vertex_count(&self) -> usize {
        self.cell_count().saturating_mul(VERTICES_PER_QUAD)
    }

    pub fn index_count(&self) -> usize {
        self.cell_count().saturating_mul(INDICES_PER_QUAD)
    }
}

/// How each quad is split into two triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagonal {
    /// Always corners 0-1-3 and 1-2-3.
    #[default]
    Fixed,
    /// Split along whichever 3D diagonal is shorter. Changes the rendered surface.
    Shortest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TessellationOptions {
    pub diagonal: Diagonal,
    pub parallel: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PanoramaMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub grid: Option<GridResolution>,
}

impl PanoramaMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flat `[x, y, z, u, v, ...]` view of the vertex buffer.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Pixel actually read for a continuous corner: rounded, column wrapped around the
/// seam, row clamped at the poles.
pub fn sample_pixel(cx: f32, cy: f32, width: u32, height: u32) -> (u32, u32) {
    let xx = (cx - 0.5).round() as i64;
    let yy = (cy - 0.5).round() as i64;
    let xx = xx.rem_euclid(width as i64);
    let yy = yy.clamp(0, height as i64 - 1);
    (xx as u32, yy as u32)
}

/// Four displaced vertices for one quad, in corner order.
///
/// Direction comes from the continuous corner so the surface stays smooth across cells;
/// depth comes from the discrete pixel under the corner.
pub fn sample_quad(depth: &DepthField, quad: Quad) -> [Vertex; 4] {
    let (width, height) = (depth.width(), depth.height());
    let (wf, hf) = (width as f32, height as f32);

    quad.corners().map(|(cx, cy)| {
        let uv = [cx / wf, cy / hf];

        let (px, py) = sample_pixel(cx, cy, width, height);
        let d = depth.at(px, py);

        let (u, v) = equirect_angles(cx, cy, wf, hf);
        let dir = back_project(u, v);

        // flip into the renderer's right-handed, y-up frame
        Vertex {
            position: [dir.x * d, -dir.y * d, -dir.z * d],
            uv,
        }
    })
}

/// Six indices for the quad whose first vertex is `k`.
pub fn quad_indices(k: u32, corners: &[Vertex; 4], diagonal: Diagonal) -> [u32; 6] {
    let split_on_0_2 = match diagonal {
        Diagonal::Fixed => false,
        Diagonal::Shortest => {
            let dist = |a: usize, b: usize| {
                let pa = glam::Vec3::from(corners[a].position);
                let pb = glam::Vec3::from(corners[b].position);
                pa.distance_squared(pb)
            };
            dist(0, 2) < dist(1, 3)
        }
    };
    if split_on_0_2 {
        [k, k + 1, k + 2, k, k + 2, k + 3]
    } else {
        [k, k + 1, k + 3, k + 1, k + 2, k + 3]
    }
}

fn check_inputs(depth: &DepthField, grid: GridResolution) -> Result<()> {
    grid.validate()?;
    if depth.is_empty() {
        return Err(MeshError::InvalidArgument("depth field is empty".into()));
    }
    Ok(())
}

/// Colour and depth halves of an asset must have the same pixel grid.
pub fn check_color_matches(color_size: (u32, u32), depth: &DepthField) -> Result<()> {
    let depth_size = (depth.width(), depth.height());
    if color_size != depth_size {
        return Err(MeshError::InvalidArgument(format!(
            "colour panorama is {}x{} but depth field is {}x{}",
            color_size.0, color_size.1, depth_size.0, depth_size.1
        )));
    }
    Ok(())
}

fn cell_size(depth: &DepthField, grid: GridResolution) -> (f32, f32) {
    (
        depth.width() as f32 / (grid.cols - 1) as f32,
        depth.height() as f32 / (grid.rows - 1) as f32,
    )
}

/// Sequential row-major tessellation with the fixed diagonal.
pub fn tessellate(depth: &DepthField, grid: GridResolution) -> Result<PanoramaMesh> {
    tessellate_with(depth, grid, TessellationOptions::default())
}

/// Same output as [`tessellate`], cells generated on the rayon pool.
pub fn tessellate_parallel(depth: &DepthField, grid: GridResolution) -> Result<PanoramaMesh> {
    tessellate_with(
        depth,
        grid,
        TessellationOptions {
            parallel: true,
            ..Default::default()
        },
    )
}

pub fn tessellate_with(
    depth: &DepthField,
    grid: GridResolution,
    options: TessellationOptions,
) -> Result<PanoramaMesh> {
    check_inputs(depth, grid)?;

    let start = Instant::now();
    let (vertices, indices) = if options.parallel {
        build_parallel(depth, grid, options.diagonal)
    } else {
        build_sequential(depth, grid, options.diagonal)
    };
    log::info!(
        "generated {} vertices / {} triangles on a {}x{} grid in {:.2} ms",
        vertices.len(),
        indices.len() / 3,
        grid.cols,
        grid.rows,
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(PanoramaMesh {
        vertices,
        indices,
        grid: Some(grid),
    })
}

fn build_sequential(
    depth: &DepthField,
    grid: GridResolution,
    diagonal: Diagonal,
) -> (Vec<Vertex>, Vec<u32>) {
    let (w, h) = cell_size(depth, grid);
    let mut vertices = Vec::with_capacity(grid.vertex_count());
    let mut indices = Vec::with_capacity(grid.index_count());

    for i in 0..grid.cell_rows() {
        for j in 0..grid.cell_cols() {
            let quad = Quad {
                x: j as f32 * w,
                y: i as f32 * h,
                w,
                h,
            };
            let corners = sample_quad(depth, quad);

            let k = vertices.len() as u32;
            vertices.extend_from_slice(&corners);
            indices.extend_from_slice(&quad_indices(k, &corners, diagonal));
        }
    }

    (vertices, indices)
}

// Each cell owns a disjoint slice at a precomputed offset, so no cell depends on another.
fn build_parallel(
    depth: &DepthField,
    grid: GridResolution,
    diagonal: Diagonal,
) -> (Vec<Vertex>, Vec<u32>) {
    let (w, h) = cell_size(depth, grid);
    let cell_cols = grid.cell_cols();
    let mut vertices = vec![Vertex::default(); grid.vertex_count()];
    let mut indices = vec![0u32; grid.index_count()];

    vertices
        .par_chunks_mut(VERTICES_PER_QUAD)
        .zip(indices.par_chunks_mut(INDICES_PER_QUAD))
        .enumerate()
        .for_each(|(cell, (vs, is))| {
            let (i, j) = (cell / cell_cols, cell % cell_cols);
            let quad = Quad {
                x: j as f32 * w,
                y: i as f32 * h,
                w,
                h,
            };
            let corners = sample_quad(depth, quad);
            let k = (cell * VERTICES_PER_QUAD) as u32;
            vs.copy_from_slice(&corners);
            is.copy_from_slice(&quad_indices(k, &corners, diagonal));
        });

    (vertices, indices)
}
