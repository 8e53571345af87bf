use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{OrbitSettings, OrbitSettingsError};
use crate::scene::{Palette, VoxelModel, PASTELS};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "VOXBOX_CONFIG";

/// Settings file looked up in the working directory when the variable is unset.
pub const CONFIG_FILE: &str = "voxbox.json";

#[derive(Debug, Error)]
pub enum ConfigError
{
  #[error("failed to read {}: {source}", path.display())]
  Io
  {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {}: {source}", path.display())]
  Parse
  {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid setting: {0}")]
  Invalid(String),

  #[error("invalid orbit settings: {0}")]
  Orbit(#[from] OrbitSettingsError),
}

/// Everything the sandbox reads at startup. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig
{
  pub title: String,
  /// Edge length of one voxel in world units.
  pub cell_size: f32,
  /// The ground square spans ±this on X and Z.
  pub ground_half_extent: f32,
  pub grid_divisions: u32,
  /// 0xRRGGBB colours new voxels are drawn from.
  pub palette: Vec<u32>,
  pub camera_position: [f32; 3],
  pub background: [f32; 3],
  pub orbit: OrbitSettings,
}

impl Default for SandboxConfig
{
  fn default() -> Self
  {
    Self {
      title: "Voxbox".to_string(),
      cell_size: 50.0,
      ground_half_extent: 500.0,
      grid_divisions: 20,
      palette: PASTELS.to_vec(),
      camera_position: [500.0, 800.0, 1300.0],
      background: [0.94, 0.94, 0.94],
      orbit: OrbitSettings::default(),
    }
  }
}

impl SandboxConfig
{
  /// Path from `VOXBOX_CONFIG`, else `voxbox.json`.
  pub fn default_path() -> PathBuf
  {
    std::env::var_os(CONFIG_ENV).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
  }

  pub fn from_json(text: &str) -> Result<Self, serde_json::Error>
  {
    serde_json::from_str(text)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError>
  {
    let text =
      std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config =
      Self::from_json(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

    config.validate()?;
    Ok(config)
  }

  /// Like [`SandboxConfig::load`], but a missing file means defaults.
  pub fn load_or_default(path: &Path) -> Result<Self, ConfigError>
  {
    if !path.exists()
    {
      log::info!("config: {} not found, using defaults", path.display());
      return Ok(Self::default());
    }

    let config = Self::load(path)?;
    log::info!("config: loaded {}", path.display());
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError>
  {
    if !(self.cell_size > 0.0)
    {
      return Err(ConfigError::Invalid(format!("cell_size must be positive, got {}", self.cell_size)));
    }
    if !(self.ground_half_extent > 0.0)
    {
      return Err(ConfigError::Invalid(format!(
        "ground_half_extent must be positive, got {}",
        self.ground_half_extent
      )));
    }
    if self.grid_divisions == 0
    {
      return Err(ConfigError::Invalid("grid_divisions must be at least 1".to_string()));
    }

    self.orbit.validate()?;

    Ok(())
  }

  pub fn camera_position(&self) -> Vec3
  {
    Vec3::from_array(self.camera_position)
  }

  pub fn palette(&self) -> Palette
  {
    Palette::new(self.palette.clone())
  }

  pub fn voxel_model(&self) -> VoxelModel
  {
    VoxelModel::for_ground(self.cell_size, self.ground_half_extent)
  }
}

#[cfg(test)]
mod tests
{
  use super::*;
  use std::io::Write;

  #[test]
  fn partial_json_keeps_defaults()
  {
    let config = SandboxConfig::from_json(r#"{ "cell_size": 25.0, "orbit": { "pan_step": 4.0 } }"#).unwrap();

    assert_eq!(config.cell_size, 25.0);
    assert_eq!(config.orbit.pan_step, 4.0);
    assert_eq!(config.orbit.zoom_rate, OrbitSettings::default().zoom_rate);
    assert_eq!(config.grid_divisions, 20);
  }

  #[test]
  fn missing_file_means_defaults()
  {
    let dir = tempfile::tempdir().unwrap();
    let config = SandboxConfig::load_or_default(&dir.path().join("nope.json")).unwrap();
    assert_eq!(config, SandboxConfig::default());
  }

  #[test]
  fn loads_from_disk()
  {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "title": "test", "palette": [255] }}"#).unwrap();

    let config = SandboxConfig::load_or_default(file.path()).unwrap();
    assert_eq!(config.title, "test");
    assert_eq!(config.palette().colors(), &[255u32]);
  }

  #[test]
  fn malformed_file_is_an_error()
  {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();

    let err = SandboxConfig::load_or_default(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
  }

  #[test]
  fn rejects_degenerate_values()
  {
    let mut config = SandboxConfig::default();
    config.cell_size = 0.0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = SandboxConfig::default();
    config.orbit.min_radius = -1.0;
    assert!(matches!(config.validate(), Err(ConfigError::Orbit(OrbitSettingsError::MinRadius(_)))));

    let mut config = SandboxConfig::default();
    config.orbit.max_radius = 0.5;
    assert!(matches!(config.validate(), Err(ConfigError::Orbit(OrbitSettingsError::RadiusRange { .. }))));
  }

  #[test]
  fn model_follows_ground()
  {
    let config = SandboxConfig::default();
    let model = config.voxel_model();
    assert_eq!(model.cell_size(), 50.0);
    assert_eq!(model.bounds().0.x, -10);
  }
}
