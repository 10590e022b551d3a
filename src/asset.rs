// asset.rs — stacked colour/disparity image -> textures + mesh
//
// Asset layout: upper half colour panorama, lower half disparity (or log depth) map,
// same width, stacked in one file.

use crate::codec::{DepthEncoding, DepthField, DisparityImage};
use crate::error::LoadError;
use crate::mesh::{
    check_color_matches, tessellate_with, GridResolution, PanoramaMesh, TessellationOptions,
};
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// How to turn the lower half into geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeshSettings {
    pub encoding: DepthEncoding,
    pub grid: GridResolution,
    pub options: TessellationOptions,
}

/// A fully built asset, ready to hand to [`crate::upload::MeshUpload`].
pub struct LoadedPanorama {
    pub color: RgbaImage,
    pub depth: DepthField,
    pub mesh: PanoramaMesh,
}

impl LoadedPanorama {
    pub fn textures(&self) -> crate::upload::PanoramaTextures<'_> {
        crate::upload::PanoramaTextures {
            color_rgba: self.color.as_raw(),
            width: self.color.width(),
            height: self.color.height(),
            depth: &self.depth,
        }
    }
}

/// Split into (colour, disparity). With an odd height the extra bottom row is dropped
/// so both halves have the same size.
pub fn split_stacked(img: &RgbImage) -> Result<(RgbImage, RgbImage), LoadError> {
    let (width, height) = img.dimensions();
    let half = height / 2;
    if width == 0 || half == 0 {
        return Err(LoadError::TooSmall { width, height });
    }
    let top = image::imageops::crop_imm(img, 0, 0, width, half).to_image();
    let bottom = image::imageops::crop_imm(img, 0, half, width, half).to_image();
    Ok((top, bottom))
}

pub fn build_panorama(
    img: &DynamicImage,
    settings: &MeshSettings,
) -> Result<LoadedPanorama, LoadError> {
    let (color, disparity) = split_stacked(&img.to_rgb8())?;

    let depth = settings.encoding.decode(&DisparityImage::from(disparity));
    check_color_matches(color.dimensions(), &depth)?;

    let mesh = tessellate_with(&depth, settings.grid, settings.options)?;
    let color = DynamicImage::ImageRgb8(color).to_rgba8();

    Ok(LoadedPanorama { color, depth, mesh })
}

pub fn load_panorama(path: &Path, settings: &MeshSettings) -> Result<LoadedPanorama, LoadError> {
    log::info!("loading {}", path.display());

    let open_err = |source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(open_err)?;
    let mut reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(open_err)?;
    reader.no_limits();
    let img = reader.decode()?;

    let (w, h) = img.dimensions();
    log::info!("decoded {}x{} stacked image", w, h);

    build_panorama(&img, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MAX_DISPARITY;
    use image::Rgb;

    fn stacked(width: u32, half: u32, disparity: u8) -> RgbImage {
        RgbImage::from_fn(width, half * 2, |x, y| {
            if y < half {
                Rgb([x as u8, y as u8, 200])
            } else {
                Rgb([disparity, disparity, disparity])
            }
        })
    }

    #[test]
    fn split_returns_equal_halves() {
        let img = stacked(6, 3, 51);
        let (top, bottom) = split_stacked(&img).unwrap();
        assert_eq!(top.dimensions(), (6, 3));
        assert_eq!(bottom.dimensions(), (6, 3));
        assert_eq!(top.get_pixel(2, 1), &Rgb([2, 1, 200]));
        assert_eq!(bottom.get_pixel(0, 0), &Rgb([51, 51, 51]));
    }

    #[test]
    fn odd_height_drops_last_row() {
        let img = RgbImage::new(4, 7);
        let (top, bottom) = split_stacked(&img).unwrap();
        assert_eq!(top.dimensions(), (4, 3));
        assert_eq!(bottom.dimensions(), (4, 3));
    }

    #[test]
    fn too_small_is_reported() {
        let err = split_stacked(&RgbImage::new(4, 1)).unwrap_err();
        assert!(matches!(err, LoadError::TooSmall { width: 4, height: 1 }));
        assert!(split_stacked(&RgbImage::new(0, 8)).is_err());
    }

    #[test]
    fn builds_mesh_from_stacked_image() {
        let img = DynamicImage::ImageRgb8(stacked(8, 4, 51));
        let settings = MeshSettings {
            grid: GridResolution::new(5, 3),
            ..Default::default()
        };
        let loaded = build_panorama(&img, &settings).unwrap();
        assert_eq!(loaded.color.dimensions(), (8, 4));
        assert_eq!(loaded.depth.width(), 8);
        assert!((loaded.depth.at(3, 2) - 5.0).abs() < 1e-4);
        assert_eq!(loaded.mesh.vertex_count(), 4 * 4 * 2);
        let textures = loaded.textures();
        assert_eq!(textures.color_rgba.len(), 8 * 4 * 4);
    }

    #[test]
    fn black_disparity_goes_to_sentinel() {
        let img = DynamicImage::ImageRgb8(stacked(4, 2, 0));
        let settings = MeshSettings {
            grid: GridResolution::new(2, 2),
            ..Default::default()
        };
        let loaded = build_panorama(&img, &settings).unwrap();
        assert!(loaded.depth.as_slice().iter().all(|&d| d == MAX_DISPARITY));
    }

    #[test]
    fn bad_grid_fails_whole_load() {
        let img = DynamicImage::ImageRgb8(stacked(4, 2, 10));
        let settings = MeshSettings {
            grid: GridResolution::new(1, 2),
            ..Default::default()
        };
        assert!(matches!(
            build_panorama(&img, &settings),
            Err(LoadError::Mesh(_))
        ));
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = load_panorama(Path::new("/nonexistent/pano.jpg"), &MeshSettings::default())
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::Open { .. }));
    }
}
