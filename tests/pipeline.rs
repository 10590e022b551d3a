use image::{DynamicImage, Rgb, RgbImage};
use panorama_depth::asset::{build_panorama, MeshSettings};
use panorama_depth::codec::{encode_disparity, Channels, DepthField};
use panorama_depth::mesh::{Diagonal, TessellationOptions};
use panorama_depth::{tessellate, tessellate_parallel, GridResolution, MeshError, MAX_DISPARITY};

// Stack a colour gradient on top of the disparity encoding of `depth`.
fn stacked_asset(depth: &DepthField, scale: f32) -> DynamicImage {
    let disparity = encode_disparity(depth, scale, Channels::Three);
    let (w, h) = (depth.width(), depth.height());
    let raw = disparity.as_raw();
    let img = RgbImage::from_fn(w, h * 2, |x, y| {
        if y < h {
            Rgb([(x * 7) as u8, (y * 11) as u8, 128])
        } else {
            let i = (((y - h) * w + x) * 3) as usize;
            Rgb([raw[i], raw[i + 1], raw[i + 2]])
        }
    });
    DynamicImage::ImageRgb8(img)
}

#[test]
fn stacked_asset_round_trips_into_mesh() {
    // 255 / d is integral for every value, so the 8-bit round trip is exact
    let values = [1.0, 3.0, 5.0, 15.0];
    let data = (0..32 * 16).map(|i| values[i % values.len()]).collect();
    let depth = DepthField::new(32, 16, data).unwrap();

    let settings = MeshSettings {
        grid: GridResolution::new(17, 9),
        ..Default::default()
    };
    let loaded = build_panorama(&stacked_asset(&depth, 0.01), &settings).unwrap();

    for (a, b) in loaded.depth.as_slice().iter().zip(depth.as_slice()) {
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
    }
    assert_eq!(loaded.mesh.vertex_count(), 4 * 16 * 8);
    assert_eq!(loaded.mesh.grid, Some(settings.grid));
    assert_eq!(loaded.mesh.indices.len(), 6 * 16 * 8);
    assert_eq!(loaded.color.get_pixel(3, 2).0, [21, 22, 128, 255]);
}

#[test]
fn zero_depth_becomes_far_geometry() {
    let mut depth = DepthField::filled(8, 4, 5.0);
    depth.set(2, 1, 0.0);
    let settings = MeshSettings {
        grid: GridResolution::new(9, 5),
        ..Default::default()
    };
    let loaded = build_panorama(&stacked_asset(&depth, 0.01), &settings).unwrap();
    assert_eq!(loaded.depth.at(2, 1), MAX_DISPARITY);

    let far = loaded
        .mesh
        .vertices
        .iter()
        .map(|v| glam::Vec3::from(v.position).length())
        .fold(0.0f32, f32::max);
    assert!((far - MAX_DISPARITY).abs() < 1.0);
}

#[test]
fn parallel_and_sequential_agree_on_production_shape() {
    let data = (0..200 * 100).map(|i| 1.0 + (i % 97) as f32 * 0.5).collect();
    let depth = DepthField::new(200, 100, data).unwrap();
    let grid = GridResolution::new(200, 100);

    let a = tessellate(&depth, grid).unwrap();
    let b = tessellate_parallel(&depth, grid).unwrap();
    assert_eq!(a.vertices, b.vertices);
    assert_eq!(a.indices, b.indices);
    assert_eq!(a.vertex_count(), grid.vertex_count());
    let n = a.vertex_count() as u32;
    assert!(a.indices.iter().all(|&i| i < n));
}

#[test]
fn shortest_diagonal_keeps_counts_and_ranges() {
    let data = (0..24 * 12).map(|i| 1.0 + (i % 5) as f32).collect();
    let depth = DepthField::new(24, 12, data).unwrap();
    let settings = MeshSettings {
        grid: GridResolution::new(13, 7),
        options: TessellationOptions {
            diagonal: Diagonal::Shortest,
            parallel: true,
        },
        ..Default::default()
    };
    let mesh =
        panorama_depth::mesh::tessellate_with(&depth, settings.grid, settings.options).unwrap();
    assert_eq!(mesh.indices.len(), settings.grid.index_count());
    let n = mesh.vertex_count() as u32;
    assert!(mesh.indices.iter().all(|&i| i < n));
}

#[test]
fn degenerate_resolution_is_rejected_before_any_work() {
    let depth = DepthField::filled(4, 2, 1.0);
    for grid in [GridResolution::new(1, 10), GridResolution::new(10, 1)] {
        assert!(matches!(
            tessellate(&depth, grid),
            Err(MeshError::InvalidArgument(_))
        ));
    }
}
