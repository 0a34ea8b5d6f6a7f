//! Configuration loader - YAML settings + .env overrides

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::circle::{CircleGenerator, DEFAULT_PRECISION};
use crate::data::{DataPipeline, DatasetPaths, WindowPolicy};
use crate::projection::{ProjectionState, Rotation};
use crate::render::Style;
use crate::view::GlobeView;

/// Main configuration loaded from globe.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    pub canvas: CanvasConfig,
    pub projection: ProjectionConfig,
    pub style: Style,
    pub data: DataConfig,
}

/// Globe diameter and the empty border around it, in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub diameter: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub rotation: Rotation,
    pub clip_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub countries: PathBuf,
    pub storms: PathBuf,
    pub max_points: usize,
    pub window: WindowPolicy,
    pub circle_precision: f64,
}

/// Overrides loaded from .env and the process environment
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub data_dir: Option<PathBuf>,
    pub log_dir: String,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self { diameter: 400.0, margin: 25.0 }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            rotation: Rotation::default(),
            clip_angle: 90.0,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            countries: PathBuf::from("countries.geo.json"),
            storms: PathBuf::from("Allstorms.ibtracs_wmo.v03r08.csv"),
            max_points: 999,
            window: WindowPolicy::LastN,
            circle_precision: DEFAULT_PRECISION,
        }
    }
}

impl CanvasConfig {
    /// Side of the square drawing surface
    pub fn size(&self) -> u32 {
        (self.diameter + 2.0 * self.margin).round() as u32
    }
}

impl GlobeConfig {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: GlobeConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, built-in defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            info!("Loading config from {}", path.display());
            Self::load(path)
        } else {
            warn!("Config {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let canvas = &self.canvas;
        if !(canvas.diameter.is_finite() && canvas.diameter > 0.0) {
            bail!("canvas.diameter must be positive, got {}", canvas.diameter);
        }
        if !(canvas.margin.is_finite() && canvas.margin >= 0.0) {
            bail!("canvas.margin must not be negative, got {}", canvas.margin);
        }
        let clip = self.projection.clip_angle;
        if !(clip > 0.0 && clip <= 90.0) {
            bail!("projection.clip_angle must be in (0, 90], got {}", clip);
        }
        let r = self.projection.rotation;
        if !(r.lambda.is_finite() && r.phi.is_finite() && r.gamma.is_finite()) {
            bail!("projection.rotation must be finite");
        }
        let precision = self.data.circle_precision;
        if !(precision.is_finite() && precision > 0.0) {
            bail!("data.circle_precision must be positive, got {}", precision);
        }
        if !(0.0..=1.0).contains(&self.style.storm_opacity) {
            bail!("style.storm_opacity must be in [0, 1], got {}", self.style.storm_opacity);
        }
        Ok(())
    }

    pub fn projection_state(&self) -> ProjectionState {
        ProjectionState::for_canvas(
            self.canvas.diameter,
            self.canvas.margin,
            self.projection.rotation,
            self.projection.clip_angle,
        )
    }

    pub fn pipeline(&self) -> DataPipeline {
        DataPipeline::new(self.data.max_points, self.data.window)
    }

    pub fn circles(&self) -> CircleGenerator {
        CircleGenerator::new(self.data.circle_precision)
    }

    /// Dataset paths, relative ones resolved against the data directory
    pub fn dataset_paths(&self, env: &Environment) -> DatasetPaths {
        let resolve = |p: &Path| match &env.data_dir {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p.to_path_buf(),
        };
        DatasetPaths {
            countries: resolve(&self.data.countries),
            storms: resolve(&self.data.storms),
        }
    }

    /// A fresh view at the configured rotation, with nothing bound yet
    pub fn view(&self) -> GlobeView {
        let size = self.canvas.size();
        GlobeView::new(self.projection_state(), [size, size], self.style.clone(), self.circles())
    }
}

impl Environment {
    /// Load overrides from .env file
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(
            std::env::var("GLOBE_DATA_DIR").ok(),
            std::env::var("GLOBE_LOG_DIR").ok(),
        )
    }

    fn from_vars(data_dir: Option<String>, log_dir: Option<String>) -> Self {
        Environment {
            data_dir: data_dir.filter(|s| !s.is_empty()).map(PathBuf::from),
            log_dir: log_dir.filter(|s| !s.is_empty()).unwrap_or_else(|| "logs".to_string()),
        }
    }
}
