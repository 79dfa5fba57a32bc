use std::path::Path;

use serde::{
  Deserialize, Serialize
};
use serde_json;

use crate::error::HalaMeshletError;
use crate::divider::{
  HalaGroupContent,
  HalaGroupLimits,
  HalaGroupStrategy,
  HalaMeshletStrategy,
  check_limits,
  locality_triangle_limit,
};

fn default_as_64() -> u32 {
  64
}

fn default_as_378() -> u32 {
  378
}

fn default_as_256() -> u32 {
  256
}

fn default_as_1512() -> u32 {
  1512
}

fn default_as_4() -> u32 {
  4
}

fn default_as_true() -> bool {
  true
}

/// The meshlet builder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalaMeshletConfig {
  #[serde(default = "default_as_64")]
  pub max_vertices: u32,
  #[serde(default = "default_as_378")]
  pub max_indices: u32,
  #[serde(default)]
  pub combine_submeshes: bool,
  #[serde(default)]
  pub cone_weight: f32,
  #[serde(default)]
  pub strategy: HalaMeshletStrategy,
  #[serde(default = "default_as_256")]
  pub group_max_vertices: u32,
  #[serde(default = "default_as_1512")]
  pub group_max_indices: u32,
  #[serde(default = "default_as_4")]
  pub max_meshlets_per_group: u32,
  #[serde(default)]
  pub group_strategy: HalaGroupStrategy,
  #[serde(default)]
  pub group_content: HalaGroupContent,
  #[serde(default = "default_as_true")]
  pub parallel: bool,
}

impl Default for HalaMeshletConfig {
  fn default() -> Self {
    Self {
      max_vertices: default_as_64(),
      max_indices: default_as_378(),
      combine_submeshes: false,
      cone_weight: 0.0,
      strategy: HalaMeshletStrategy::default(),
      group_max_vertices: default_as_256(),
      group_max_indices: default_as_1512(),
      max_meshlets_per_group: default_as_4(),
      group_strategy: HalaGroupStrategy::default(),
      group_content: HalaGroupContent::default(),
      parallel: true,
    }
  }
}

impl HalaMeshletConfig {
  /// Parse the configuration from a JSON string, missing fields take their defaults.
  /// param json: The JSON text.
  /// return: The configuration.
  pub fn from_json_str(json: &str) -> Result<Self, HalaMeshletError> {
    let config: Self = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  /// Load the configuration from a JSON file.
  /// param path: The file path.
  /// return: The configuration.
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HalaMeshletError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
      .map_err(|err| HalaMeshletError::new(&format!("Failed to read \"{:?}\".", path), Some(Box::new(err))))?;
    log::debug!("Loaded meshlet configuration from \"{:?}\".", path);
    Self::from_json_str(&json)
  }

  /// The ceilings of the grouping pass.
  pub fn group_limits(&self) -> HalaGroupLimits {
    HalaGroupLimits {
      max_vertices: self.group_max_vertices,
      max_indices: self.group_max_indices,
      max_meshlets: self.max_meshlets_per_group,
      content: self.group_content,
    }
  }

  /// Check every ceiling of the configuration.
  /// return: The result.
  pub fn validate(&self) -> Result<(), HalaMeshletError> {
    match self.strategy {
      HalaMeshletStrategy::Naive => check_limits(self.max_vertices, self.max_indices)?,
      HalaMeshletStrategy::Locality => {
        locality_triangle_limit(self.max_vertices, self.max_indices)?;
      },
    }
    self.group_limits().validate()?;
    if !(0.0..=1.0).contains(&self.cone_weight) {
      return Err(HalaMeshletError::new(&format!("The cone weight {} is not in [0, 1].", self.cone_weight), None));
    }
    Ok(())
  }
}
