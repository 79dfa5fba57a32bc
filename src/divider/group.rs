use glam::Vec3;

use crate::error::HalaMeshletError;
use crate::scene::HalaMeshlet;
use super::{
  HalaGroupContent,
  HalaGroupDivider,
  HalaGroupLimits,
  cluster::{
    HalaClusterElements,
    HalaClusterLimits,
    HalaClusterOrder,
    build_clusters,
    clusters_bound,
  },
};

const NONE: u32 = u32::MAX;

/// Get the maximum number of groups the meshlets can produce.
/// A closed group failed to take one more meshlet, so it holds at least as many indices
/// as the tightest of the three ceilings leaves room for.
/// param meshlets: The meshlets to group, empty ones are ignored.
/// param limits: The group ceilings.
/// return: The bound.
pub fn groups_bound(meshlets: &[HalaMeshlet], limits: &HalaGroupLimits) -> usize {
  let mut num_of_meshlets = 0;
  let mut num_of_indices = 0;
  let mut max_vertices = 0;
  let mut max_indices = 0;
  let mut min_indices = usize::MAX;
  for meshlet in meshlets.iter().filter(|m| m.index_count > 0) {
    num_of_meshlets += 1;
    num_of_indices += meshlet.index_count as usize;
    max_vertices = max_vertices.max(meshlet.vertex_count as usize);
    max_indices = max_indices.max(meshlet.index_count as usize);
    min_indices = min_indices.min(meshlet.index_count as usize);
  }
  if num_of_meshlets == 0 {
    return 0;
  }

  let by_vertices = (limits.max_vertices as usize + 1).saturating_sub(max_vertices).max(1);
  let by_indices = (limits.max_indices as usize + 1).saturating_sub(max_indices).max(1);
  let by_meshlets = (limits.max_meshlets as usize * min_indices).max(1);
  let per_group = by_vertices.min(by_indices).min(by_meshlets);
  num_of_indices.div_ceil(per_group).min(num_of_meshlets)
}

/// The locality-aware group divider.
/// Meshlets sharing vertices are neighbors; groups grow over neighbors first and
/// jump to the closest remaining meshlet when none is left.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalaLocalityGroupDivider {
  pub cone_weight: f32,
}

impl HalaGroupDivider for HalaLocalityGroupDivider {
  fn divide(
    &self,
    positions: &[Vec3],
    indices: &[u32],
    meshlets: &[HalaMeshlet],
    mesh_index: Option<usize>,
    limits: &HalaGroupLimits,
  ) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
    divide_meshlets_into_groups(
      positions,
      indices,
      meshlets,
      mesh_index,
      limits,
      HalaClusterOrder::Locality,
      self.cone_weight.clamp(0.0, 1.0),
    )
  }
}

/// Turn every non-empty meshlet into one cluster element.
/// return: The elements and the meshlet index of each element.
fn meshlet_elements(
  positions: &[Vec3],
  meshlets: &[HalaMeshlet],
  limits: &HalaGroupLimits,
) -> Result<(HalaClusterElements, Vec<usize>), HalaMeshletError> {
  let mut elements = HalaClusterElements::new(positions.len());
  let mut members = Vec::with_capacity(meshlets.len());
  let mut stamps = vec![NONE; positions.len()];
  let mut corners = Vec::new();
  let mut distinct = Vec::new();

  for (i, meshlet) in meshlets.iter().enumerate() {
    if meshlet.index_count == 0 {
      log::warn!("Meshlet {} has no triangles, skipped.", i);
      continue;
    }
    meshlet.validate(u32::MAX, u32::MAX)?;
    if let Some(vertex) = meshlet.vertices.iter().find(|&&v| v as usize >= positions.len()) {
      return Err(HalaMeshletError::new(
        &format!("Meshlet {} vertex {} is out of range of {} positions.", i, vertex, positions.len()),
        None));
    }

    corners.clear();
    distinct.clear();
    let stamp = elements.len() as u32;
    let mut centroid_sum = Vec3::ZERO;
    let mut normal_sum = Vec3::ZERO;
    let mut area_sum = 0.0;
    for tri in meshlet.triangles() {
      for &v in tri.iter() {
        if stamps[v as usize] != stamp {
          stamps[v as usize] = stamp;
          distinct.push(v);
        }
      }
      corners.extend_from_slice(&tri);

      let (a, b, c) = (positions[tri[0] as usize], positions[tri[1] as usize], positions[tri[2] as usize]);
      let cross = (b - a).cross(c - a);
      let area = cross.length() * 0.5;
      centroid_sum += (a + b + c) / 3.0 * area;
      normal_sum += cross * 0.5;
      area_sum += area;
    }

    if distinct.len() > limits.max_vertices as usize || corners.len() > limits.max_indices as usize {
      return Err(HalaMeshletError::new(
        &format!("Meshlet {} ({} vertices, {} indices) does not fit in a group of ({}, {}).",
          i, distinct.len(), corners.len(), limits.max_vertices, limits.max_indices),
        None));
    }

    // Zero-area meshlets fall back to the plain vertex average.
    let centroid = if area_sum > 0.0 {
      centroid_sum / area_sum
    } else {
      distinct.iter().map(|&v| positions[v as usize]).sum::<Vec3>() / distinct.len() as f32
    };
    elements.push(&corners, distinct.iter().copied(), centroid, normal_sum.normalize_or_zero(), area_sum);
    members.push(i);
  }
  Ok((elements, members))
}

/// Group the meshlets of one geometry.
/// param positions: The positions of the geometry.
/// param indices: The triangle list of the geometry.
/// param meshlets: The meshlets built from the geometry.
/// param mesh_index: The submesh tag of the groups.
/// param limits: The group ceilings.
/// param order: The meshlet selection order.
/// param cone_weight: The normal cone weight of the locality order.
/// return: The groups.
pub(crate) fn divide_meshlets_into_groups(
  positions: &[Vec3],
  indices: &[u32],
  meshlets: &[HalaMeshlet],
  mesh_index: Option<usize>,
  limits: &HalaGroupLimits,
  order: HalaClusterOrder,
  cone_weight: f32,
) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
  limits.validate()?;
  let (elements, members) = meshlet_elements(positions, meshlets, limits)?;
  if elements.is_empty() {
    return Ok(Vec::new());
  }
  if elements.num_of_corners() != indices.len() {
    log::warn!("The meshlets cover {} of {} indices of the geometry.", elements.num_of_corners(), indices.len());
  }

  let cluster_limits = HalaClusterLimits {
    max_vertices: limits.max_vertices as usize,
    max_indices: limits.max_indices as usize,
    max_elements: limits.max_meshlets as usize,
    cone_weight,
  };
  // Distinct vertex counts make this tighter than the count-only bound.
  let bound = clusters_bound(&elements, &cluster_limits);
  debug_assert!(bound <= groups_bound(meshlets, limits));
  let scratch = build_clusters(&elements, cluster_limits, order, bound);

  let groups = scratch.clusters.iter()
    .map(|desc| match limits.content {
      HalaGroupContent::Geometry => HalaMeshlet::new(
        scratch.vertices_of(desc).to_vec(),
        scratch.indices_of(desc).to_vec(),
        mesh_index,
      ),
      HalaGroupContent::MeshletIndices => HalaMeshlet::new(
        scratch.elements_of(desc).iter().map(|&e| members[e as usize] as u32).collect(),
        Vec::new(),
        mesh_index,
      ),
    })
    .collect::<Vec<_>>();

  log::debug!("Grouped {} meshlets into {} groups (bound {}).", members.len(), groups.len(), bound);
  Ok(groups)
}
