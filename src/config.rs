// config.rs — viewer configuration
//
// Precedence, lowest first: built-in defaults, JSON file (--config or
// PANORAMA_DEPTH_CONFIG), command line flags.

use crate::asset::MeshSettings;
use crate::camera::{Camera, DEFAULT_SENSITIVITY, DEFAULT_SPEED, DEFAULT_ZOOM};
use crate::codec::DepthEncoding;
use crate::error::ConfigError;
use crate::mesh::{Diagonal, GridResolution, TessellationOptions};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PANORAMA_DEPTH_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Stacked image opened at startup.
    pub input: Option<PathBuf>,
    pub depth_encoding: DepthEncoding,
    pub grid: GridResolution,
    pub diagonal: Diagonal,
    pub parallel_tessellation: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub camera_position: [f32; 3],
    pub fov_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub vsync: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            input: None,
            depth_encoding: DepthEncoding::default(),
            grid: GridResolution::default(),
            diagonal: Diagonal::Fixed,
            parallel_tessellation: false,
            window_width: 1000,
            window_height: 1000,
            camera_position: [0.0, 0.0, 0.0],
            fov_degrees: DEFAULT_ZOOM,
            near_plane: 0.1,
            far_plane: 100.0,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            vsync: true,
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn mesh_settings(&self) -> MeshSettings {
        MeshSettings {
            encoding: self.depth_encoding,
            grid: self.grid,
            options: TessellationOptions {
                diagonal: self.diagonal,
                parallel: self.parallel_tessellation,
            },
        }
    }

    pub fn camera(&self) -> Camera {
        let mut camera = Camera::new(self.camera_position.into());
        camera.movement_speed = self.movement_speed;
        camera.mouse_sensitivity = self.mouse_sensitivity;
        camera.zoom = self.fov_degrees;
        camera
    }
}

#[derive(Debug, Parser)]
#[command(name = "panorama_depth_viewer")]
#[command(about = "View a panorama with a stacked disparity map as a 3D mesh")]
#[command(version)]
pub struct Cli {
    /// Stacked image: colour on top, disparity below
    pub input: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disparity scale of the lower half
    #[arg(long)]
    pub scale: Option<f32>,

    /// Lower half is logarithmic depth, not disparity
    #[arg(long, conflicts_with = "scale")]
    pub log_depth: bool,

    /// Grid columns (vertices per row of cells + 1)
    #[arg(long)]
    pub cols: Option<u32>,

    /// Grid rows
    #[arg(long)]
    pub rows: Option<u32>,

    /// Build the mesh on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Present without waiting for vblank
    #[arg(long)]
    pub no_vsync: bool,
}

impl Cli {
    pub fn apply(&self, cfg: &mut ViewerConfig) {
        if let Some(input) = &self.input {
            cfg.input = Some(input.clone());
        }
        if let Some(scale) = self.scale {
            cfg.depth_encoding = DepthEncoding::Disparity { scale };
        }
        if self.log_depth {
            cfg.depth_encoding = DepthEncoding::Logarithmic;
        }
        if let Some(cols) = self.cols {
            cfg.grid.cols = cols;
        }
        if let Some(rows) = self.rows {
            cfg.grid.rows = rows;
        }
        if self.parallel {
            cfg.parallel_tessellation = true;
        }
        if self.no_vsync {
            cfg.vsync = false;
        }
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(|| {
            std::env::var(CONFIG_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        })
    }

    pub fn resolve(&self) -> Result<ViewerConfig, ConfigError> {
        let mut cfg = match self.config_path() {
            Some(path) => {
                log::info!("reading config {}", path.display());
                ViewerConfig::load(&path)?
            }
            None => ViewerConfig::default(),
        };
        self.apply(&mut cfg);
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_setup() {
        let cfg = ViewerConfig::default();
        assert_eq!(cfg.grid, GridResolution::new(1000, 500));
        assert_eq!(cfg.depth_encoding, DepthEncoding::Disparity { scale: 0.01 });
        assert_eq!(cfg.diagonal, Diagonal::Fixed);
        assert!(!cfg.parallel_tessellation);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ViewerConfig::from_json_str(
            r#"{
                "grid": { "cols": 200, "rows": 100 },
                "depth_encoding": { "kind": "logarithmic" },
                "diagonal": "shortest"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.grid, GridResolution::new(200, 100));
        assert_eq!(cfg.depth_encoding, DepthEncoding::Logarithmic);
        assert_eq!(cfg.diagonal, Diagonal::Shortest);
        assert_eq!(cfg.window_width, 1000);
        assert!(cfg.vsync);
    }

    #[test]
    fn disparity_scale_from_json() {
        let cfg =
            ViewerConfig::from_json_str(r#"{"depth_encoding": {"kind": "disparity", "scale": 0.5}}"#)
                .unwrap();
        assert_eq!(cfg.depth_encoding, DepthEncoding::Disparity { scale: 0.5 });
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ViewerConfig::from_json_str(r#"{"grid": 12}"#).is_err());
        let err = ViewerConfig::load(Path::new("/nonexistent/viewer.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn cli_overrides_file_values() {
        let cli = Cli::try_parse_from([
            "viewer", "pano.jpg", "--scale", "0.02", "--cols", "200", "--rows", "100", "--parallel",
            "--no-vsync",
        ])
        .unwrap();
        let mut cfg = ViewerConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.input, Some(PathBuf::from("pano.jpg")));
        assert_eq!(cfg.depth_encoding, DepthEncoding::Disparity { scale: 0.02 });
        assert_eq!(cfg.grid, GridResolution::new(200, 100));
        assert!(cfg.parallel_tessellation);
        assert!(!cfg.vsync);
    }

    #[test]
    fn log_depth_conflicts_with_scale() {
        assert!(Cli::try_parse_from(["viewer", "--log-depth", "--scale", "1"]).is_err());
        let cli = Cli::try_parse_from(["viewer", "--log-depth"]).unwrap();
        let mut cfg = ViewerConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.depth_encoding, DepthEncoding::Logarithmic);
    }

    #[test]
    fn settings_and_camera_follow_config() {
        let cfg = ViewerConfig {
            parallel_tessellation: true,
            fov_degrees: 30.0,
            camera_position: [1.0, 2.0, 3.0],
            ..Default::default()
        };
        let settings = cfg.mesh_settings();
        assert!(settings.options.parallel);
        assert_eq!(settings.grid, cfg.grid);
        let camera = cfg.camera();
        assert_eq!(camera.zoom, 30.0);
        assert_eq!(camera.position, glam::Vec3::new(1.0, 2.0, 3.0));
    }
}
