// codec.rs — 8-bit viewable disparity/depth <-> linear depth field
//
// Two families:
//   disparity:   depth = 25500 * scale / d
//   logarithmic: view  = 70 * (ln(depth + 100) - ln(100))
//                depth = exp(view / 70 + ln(100)) - 100
//
// Neither family fails. Out of range values are clamped, empty input gives empty output.

use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};

/// Depth assigned to pixels with no usable disparity.
pub const MAX_DISPARITY: f32 = 10000.0;

/// Default disparity scale of the stacked assets.
pub const DEFAULT_DISPARITY_SCALE: f32 = 0.01;

const DISPARITY_NUMERATOR: f32 = 25500.0;
const LOG_OFFSET: f32 = 100.0;
const LOG_GAIN: f32 = 70.0;

/// Linear depth, one `f32` per source pixel, row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthField {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthField {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MeshError::InvalidArgument(format!(
                "depth field {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn filled(width: u32, height: u32, depth: f32) -> Self {
        Self {
            width,
            height,
            data: vec![depth; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Depth at a pixel that is known to be inside the field.
    pub fn at(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn set(&mut self, x: u32, y: u32, depth: f32) {
        let i = y as usize * self.width as usize + x as usize;
        self.data[i] = depth;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    One,
    Three,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::One => 1,
            Channels::Three => 3,
        }
    }
}

/// 8-bit disparity (or log depth) image. With three channels all of them carry the
/// same value; only channel 0 is ever read.
#[derive(Debug, Clone, PartialEq)]
pub struct DisparityImage {
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl DisparityImage {
    pub fn new(width: u32, height: u32, channels: Channels, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return Err(MeshError::InvalidArgument(format!(
                "disparity image {}x{}x{} needs {} bytes, got {}",
                width,
                height,
                channels.count(),
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    fn first_channel(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.iter().step_by(self.channels.count()).copied()
    }

    fn from_single(width: u32, height: u32, values: Vec<u8>, channels: Channels) -> Self {
        let data = match channels {
            Channels::One => values,
            Channels::Three => values.iter().flat_map(|&v| [v, v, v]).collect(),
        };
        Self {
            width,
            height,
            channels,
            data,
        }
    }
}

impl From<image::GrayImage> for DisparityImage {
    fn from(img: image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: Channels::One,
            data: img.into_raw(),
        }
    }
}

impl From<image::RgbImage> for DisparityImage {
    fn from(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            channels: Channels::Three,
            data: img.into_raw(),
        }
    }
}

/// Disparity to depth for one sample.
///
/// Non-positive results become 0 first, then a non-positive disparity overrides that
/// with [`MAX_DISPARITY`]. Anything non-finite also ends up at the sentinel.
pub fn disparity_to_depth(disparity: f32, scale: f32) -> f32 {
    let mut depth = DISPARITY_NUMERATOR * scale / disparity;
    if depth <= 0.0 {
        depth = 0.0;
    }
    if disparity <= 0.0 || !depth.is_finite() {
        depth = MAX_DISPARITY;
    }
    depth
}

pub fn depth_to_disparity(depth: f32, scale: f32) -> f32 {
    if depth <= 0.0 {
        return 0.0;
    }
    DISPARITY_NUMERATOR * scale / depth
}

pub fn log_view_to_depth(view: f32) -> f32 {
    let depth = (view / LOG_GAIN + LOG_OFFSET.ln()).exp() - LOG_OFFSET;
    depth.max(0.0)
}

pub fn depth_to_log_view(depth: f32) -> f32 {
    let view = LOG_GAIN * ((depth + LOG_OFFSET).ln() - LOG_OFFSET.ln());
    // NaN (depth < -100) lands here too
    if view >= 0.0 {
        view
    } else {
        0.0
    }
}

// Round half to even and saturate, NaN -> 0.
fn saturate_u8(v: f32) -> u8 {
    v.round_ties_even() as u8
}

pub fn decode_disparity(img: &DisparityImage, scale: f32) -> DepthField {
    if img.is_empty() {
        return DepthField::default();
    }
    let data = img
        .first_channel()
        .map(|d| disparity_to_depth(d as f32, scale))
        .collect();
    DepthField {
        width: img.width,
        height: img.height,
        data,
    }
}

pub fn encode_disparity(depth: &DepthField, scale: f32, channels: Channels) -> DisparityImage {
    if depth.is_empty() {
        return DisparityImage::from_single(0, 0, Vec::new(), channels);
    }
    let values = depth
        .data
        .iter()
        .map(|&d| saturate_u8(depth_to_disparity(d, scale)))
        .collect();
    DisparityImage::from_single(depth.width, depth.height, values, channels)
}

pub fn decode_log_depth(img: &DisparityImage) -> DepthField {
    if img.is_empty() {
        return DepthField::default();
    }
    let data = img
        .first_channel()
        .map(|v| log_view_to_depth(v as f32))
        .collect();
    DepthField {
        width: img.width,
        height: img.height,
        data,
    }
}

pub fn encode_log_depth(depth: &DepthField, channels: Channels) -> DisparityImage {
    if depth.is_empty() {
        return DisparityImage::from_single(0, 0, Vec::new(), channels);
    }
    let values = depth
        .data
        .iter()
        .map(|&d| saturate_u8(depth_to_log_view(d)))
        .collect();
    DisparityImage::from_single(depth.width, depth.height, values, channels)
}

/// Which codec family the lower half of a stacked asset was written with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepthEncoding {
    Disparity { scale: f32 },
    Logarithmic,
}

impl Default for DepthEncoding {
    fn default() -> Self {
        DepthEncoding::Disparity {
            scale: DEFAULT_DISPARITY_SCALE,
        }
    }
}

impl DepthEncoding {
    pub fn decode(&self, img: &DisparityImage) -> DepthField {
        match *self {
            DepthEncoding::Disparity { scale } => decode_disparity(img, scale),
            DepthEncoding::Logarithmic => decode_log_depth(img),
        }
    }

    pub fn encode(&self, depth: &DepthField, channels: Channels) -> DisparityImage {
        match *self {
            DepthEncoding::Disparity { scale } => encode_disparity(depth, scale, channels),
            DepthEncoding::Logarithmic => encode_log_depth(depth, channels),
        }
    }
}
