use glam::Vec3;

use crate::error::HalaMeshletError;
use crate::scene::{
  HalaMeshlet,
  source::check_indices,
};
use super::{
  HalaMeshletDivider,
  HalaGroupDivider,
  HalaGroupLimits,
  check_limits,
  cluster::HalaClusterOrder,
  group::divide_meshlets_into_groups,
};

/// The naive meshlet divider.
/// Slices the triangle list into consecutive runs and duplicates every vertex,
/// so each meshlet has as many vertices as indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalaNaiveMeshletDivider;

impl HalaMeshletDivider for HalaNaiveMeshletDivider {
  fn divide(
    &self,
    positions: &[Vec3],
    indices: &[u32],
    mesh_index: Option<usize>,
    max_vertices: u32,
    max_indices: u32,
  ) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
    check_limits(max_vertices, max_indices)?;
    check_indices(indices, positions.len())?;
    let max_vertices = max_vertices as usize;
    let max_indices = max_indices as usize;

    let mut meshlets = Vec::new();
    let mut consumed = 0;
    while consumed < indices.len() {
      let mut vertices = Vec::with_capacity(max_vertices);
      let mut local_indices = Vec::with_capacity(max_indices);
      let mut count = 0;
      // Take whole triangles while one more fits.
      while count + 3 <= max_vertices && count + 3 <= max_indices && consumed + count < indices.len() {
        for k in 0..3 {
          local_indices.push((count + k) as u32);
          vertices.push(indices[consumed + count + k]);
        }
        count += 3;
      }
      vertices.shrink_to_fit();
      local_indices.shrink_to_fit();
      consumed += count;
      meshlets.push(HalaMeshlet::new(vertices, local_indices, mesh_index));
    }

    log::debug!("Naive divider built {} meshlets from {} triangles.", meshlets.len(), indices.len() / 3);
    Ok(meshlets)
  }
}

/// The naive group divider.
/// Groups consecutive meshlets in input order until the next one does not fit.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalaNaiveGroupDivider;

impl HalaGroupDivider for HalaNaiveGroupDivider {
  fn divide(
    &self,
    positions: &[Vec3],
    indices: &[u32],
    meshlets: &[HalaMeshlet],
    mesh_index: Option<usize>,
    limits: &HalaGroupLimits,
  ) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
    divide_meshlets_into_groups(positions, indices, meshlets, mesh_index, limits, HalaClusterOrder::Sequential, 0.0)
  }
}
