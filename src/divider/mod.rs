pub(crate) mod kdtree;
pub(crate) mod cluster;
pub mod naive;
pub mod locality;
pub mod group;

use glam::Vec3;
use serde::{
  Deserialize, Serialize
};

use crate::error::HalaMeshletError;
use crate::scene::HalaMeshlet;

pub use naive::{HalaNaiveMeshletDivider, HalaNaiveGroupDivider};
pub use locality::{
  HalaLocalityMeshletDivider,
  MAX_LOCALITY_TRIANGLES,
  MAX_LOCALITY_VERTICES,
  locality_triangle_limit,
  meshlets_bound,
};
pub use group::{HalaLocalityGroupDivider, groups_bound};

/// A strategy that splits one triangle list into meshlets.
pub trait HalaMeshletDivider: Send + Sync {
  /// Divide the triangles into meshlets.
  /// param positions: The positions, one per vertex.
  /// param indices: The triangle list over the positions.
  /// param mesh_index: The submesh tag of the produced meshlets.
  /// param max_vertices: The maximum number of vertices per meshlet.
  /// param max_indices: The maximum number of indices per meshlet, a multiple of 3.
  /// return: The meshlets.
  fn divide(
    &self,
    positions: &[Vec3],
    indices: &[u32],
    mesh_index: Option<usize>,
    max_vertices: u32,
    max_indices: u32,
  ) -> Result<Vec<HalaMeshlet>, HalaMeshletError>;
}

/// What a group produced by the grouping pass carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HalaGroupContent {
  /// The union of the member meshlets' vertices and their triangles in local numbering.
  #[default]
  Geometry,
  /// The indices of the member meshlets in `vertices`, no triangles.
  MeshletIndices,
}

/// The ceilings of one meshlet group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalaGroupLimits {
  pub max_vertices: u32,
  pub max_indices: u32,
  pub max_meshlets: u32,
  pub content: HalaGroupContent,
}

impl HalaGroupLimits {
  /// Create the group limits with geometry content.
  /// param max_vertices: The maximum number of vertices per group.
  /// param max_indices: The maximum number of indices per group.
  /// param max_meshlets: The maximum number of meshlets per group.
  /// return: The limits.
  pub fn new(max_vertices: u32, max_indices: u32, max_meshlets: u32) -> Self {
    Self {
      max_vertices,
      max_indices,
      max_meshlets,
      content: HalaGroupContent::Geometry,
    }
  }

  /// Check the limits.
  /// return: The result.
  pub fn validate(&self) -> Result<(), HalaMeshletError> {
    check_limits(self.max_vertices, self.max_indices)?;
    if self.max_meshlets == 0 {
      return Err(HalaMeshletError::new("The maximum number of meshlets per group must be positive.", None));
    }
    Ok(())
  }
}

/// A strategy that clusters meshlets into groups.
pub trait HalaGroupDivider: Send + Sync {
  /// Divide the meshlets of one geometry into groups.
  /// With `HalaGroupContent::MeshletIndices` the group vertices index into `meshlets`.
  /// param positions: The positions of the geometry.
  /// param indices: The triangle list of the geometry.
  /// param meshlets: The meshlets built from the geometry.
  /// param mesh_index: The submesh tag of the produced groups.
  /// param limits: The group ceilings.
  /// return: The groups.
  fn divide(
    &self,
    positions: &[Vec3],
    indices: &[u32],
    meshlets: &[HalaMeshlet],
    mesh_index: Option<usize>,
    limits: &HalaGroupLimits,
  ) -> Result<Vec<HalaMeshlet>, HalaMeshletError>;
}

/// The meshlet strategies selectable from the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HalaMeshletStrategy {
  Naive,
  #[default]
  Locality,
}

impl HalaMeshletStrategy {
  /// Create the divider of the strategy.
  /// param cone_weight: The locality weight of the locality-aware divider.
  /// return: The divider.
  pub fn divider(&self, cone_weight: f32) -> Box<dyn HalaMeshletDivider> {
    match self {
      Self::Naive => Box::new(HalaNaiveMeshletDivider),
      Self::Locality => Box::new(HalaLocalityMeshletDivider { cone_weight }),
    }
  }
}

/// The group strategies selectable from the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HalaGroupStrategy {
  Naive,
  #[default]
  Locality,
}

impl HalaGroupStrategy {
  /// Create the divider of the strategy.
  /// param cone_weight: The locality weight of the locality-aware divider.
  /// return: The divider.
  pub fn divider(&self, cone_weight: f32) -> Box<dyn HalaGroupDivider> {
    match self {
      Self::Naive => Box::new(HalaNaiveGroupDivider),
      Self::Locality => Box::new(HalaLocalityGroupDivider { cone_weight }),
    }
  }
}

/// Check the vertex and index ceilings of a cluster.
/// param max_vertices: The maximum number of vertices.
/// param max_indices: The maximum number of indices.
/// return: The result.
pub fn check_limits(max_vertices: u32, max_indices: u32) -> Result<(), HalaMeshletError> {
  if max_vertices < 3 {
    return Err(HalaMeshletError::new(&format!("The maximum number of vertices {} is less than 3.", max_vertices), None));
  }
  if max_indices < 3 || max_indices % 3 != 0 {
    return Err(HalaMeshletError::new(
      &format!("The maximum number of indices {} is not a positive multiple of 3.", max_indices),
      None));
  }
  Ok(())
}
