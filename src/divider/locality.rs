use glam::Vec3;

use crate::error::HalaMeshletError;
use crate::scene::{
  HalaBounds,
  HalaMeshlet,
  source::check_indices,
};
use super::{
  HalaMeshletDivider,
  check_limits,
};

/// The largest vertex ceiling meshopt accepts.
pub const MAX_LOCALITY_VERTICES: u32 = 255;
/// The largest triangle ceiling meshopt accepts.
pub const MAX_LOCALITY_TRIANGLES: u32 = 512;

/// Get the maximum number of meshlets a triangle list can produce.
/// A meshlet closed by the vertex limit holds at least `max_vertices - 2` vertices,
/// one closed by the triangle limit holds `max_triangles` triangles.
/// param index_count: The number of indices.
/// param max_vertices: The maximum number of vertices per meshlet, at least 3.
/// param max_triangles: The maximum number of triangles per meshlet, at least 1.
/// return: The bound.
pub fn meshlets_bound(index_count: usize, max_vertices: usize, max_triangles: usize) -> usize {
  debug_assert!(max_vertices >= 3 && max_triangles >= 1);
  let max_vertices_conservative = max_vertices - 2;
  let limit_by_vertices = index_count.div_ceil(max_vertices_conservative);
  let limit_by_triangles = (index_count / 3).div_ceil(max_triangles);
  limit_by_vertices.max(limit_by_triangles)
}

/// Get the triangle ceiling the locality divider builds with.
/// meshopt counts triangles in multiples of 4, so `max_indices / 3` rounds down to one.
/// param max_vertices: The maximum number of vertices per meshlet.
/// param max_indices: The maximum number of indices per meshlet.
/// return: The triangle ceiling.
pub fn locality_triangle_limit(max_vertices: u32, max_indices: u32) -> Result<u32, HalaMeshletError> {
  check_limits(max_vertices, max_indices)?;
  let max_triangles = max_indices / 3;
  if max_vertices > MAX_LOCALITY_VERTICES || max_triangles > MAX_LOCALITY_TRIANGLES {
    return Err(HalaMeshletError::new(
      &format!("The locality divider supports at most {} vertices and {} triangles per meshlet, got {} and {}.",
        MAX_LOCALITY_VERTICES, MAX_LOCALITY_TRIANGLES, max_vertices, max_triangles),
      None));
  }
  let max_triangles = max_triangles & !3;
  if max_triangles == 0 {
    return Err(HalaMeshletError::new(
      &format!("The locality divider needs room for 4 triangles per meshlet, got {} indices.", max_indices),
      None));
  }
  Ok(max_triangles)
}

/// Check that meshopt can measure distances between the referenced positions.
fn check_positions(positions: &[Vec3], indices: &[u32]) -> Result<(), HalaMeshletError> {
  if let Some(&index) = indices.iter().find(|&&i| !positions[i as usize].is_finite()) {
    return Err(HalaMeshletError::new(
      &format!("Vertex {} has a non-finite position {:?}.", index, positions[index as usize]),
      None));
  }
  if let Some(bounds) = HalaBounds::from_points(indices.iter().map(|&i| positions[i as usize])) {
    if !(bounds.max - bounds.min).length_squared().is_finite() {
      return Err(HalaMeshletError::new(
        &format!("The positions span [{:?}, {:?}], too far apart to compare distances.", bounds.min, bounds.max),
        None));
    }
  }
  Ok(())
}

/// The locality-aware meshlet divider.
/// Runs meshopt's clusterizer: each meshlet grows from triangles sharing its vertices and
/// continues with the spatially closest triangle when the neighborhood is used up.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalaLocalityMeshletDivider {
  /// 0 optimizes vertex reuse and compactness only, up to 1 biases meshlets toward a narrow normal cone.
  pub cone_weight: f32,
}

impl HalaMeshletDivider for HalaLocalityMeshletDivider {
  fn divide(
    &self,
    positions: &[Vec3],
    indices: &[u32],
    mesh_index: Option<usize>,
    max_vertices: u32,
    max_indices: u32,
  ) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
    let max_triangles = locality_triangle_limit(max_vertices, max_indices)?;
    check_indices(indices, positions.len())?;
    if indices.is_empty() {
      return Ok(Vec::new());
    }
    check_positions(positions, indices)?;

    let vertex_data = meshopt::typed_to_bytes(positions);
    let vertex_adapter = meshopt::VertexDataAdapter::new(vertex_data, std::mem::size_of::<Vec3>(), 0)
      .map_err(|err| HalaMeshletError::new(&format!("Failed to create the vertex data adapter: {:?}", err), None))?;
    let built = meshopt::build_meshlets(
      indices,
      &vertex_adapter,
      max_vertices as usize,
      max_triangles as usize,
      self.cone_weight.clamp(0.0, 1.0),
    );

    // Copy every meshlet out of meshopt's packed buffers.
    let meshlets = built.iter()
      .map(|meshlet| HalaMeshlet::new(
        meshlet.vertices.to_vec(),
        meshlet.triangles.iter().map(|&t| t as u32).collect(),
        mesh_index,
      ))
      .collect::<Vec<_>>();

    let bound = meshlets_bound(indices.len(), max_vertices as usize, max_triangles as usize);
    debug_assert!(meshlets.len() <= bound, "meshlet bound {} exceeded", bound);
    let num_of_triangles = meshlets.iter().map(|m| m.num_of_triangles() as usize).sum::<usize>();
    if num_of_triangles != indices.len() / 3 {
      return Err(HalaMeshletError::new(
        &format!("The locality divider placed {} of {} triangles.", num_of_triangles, indices.len() / 3),
        None));
    }

    log::debug!("Locality divider built {} meshlets (bound {}) from {} triangles.",
      meshlets.len(), bound, num_of_triangles);
    Ok(meshlets)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strip(num_of_quads: usize) -> (Vec<Vec3>, Vec<u32>) {
    let mut positions = Vec::new();
    for x in 0..=num_of_quads {
      positions.push(Vec3::new(x as f32, 0.0, 0.0));
      positions.push(Vec3::new(x as f32, 1.0, 0.0));
    }
    let mut indices = Vec::new();
    for x in 0..num_of_quads as u32 {
      let i = x * 2;
      indices.extend_from_slice(&[i, i + 2, i + 1, i + 1, i + 2, i + 3]);
    }
    (positions, indices)
  }

  fn sorted_triangles(meshlets: &[HalaMeshlet]) -> Vec<[u32; 3]> {
    let mut triangles = meshlets.iter().flat_map(|m| m.triangles()).collect::<Vec<_>>();
    triangles.sort_unstable();
    triangles
  }

  #[test]
  fn bound_matches_reference_formula() {
    assert_eq!(meshlets_bound(0, 64, 126), 0);
    assert_eq!(meshlets_bound(3, 64, 126), 1);
    assert_eq!(meshlets_bound(378, 64, 126), 7);
    assert_eq!(meshlets_bound(9, 6, 2), 3);
  }

  #[test]
  fn triangle_limit_rounds_down_to_four() {
    assert_eq!(locality_triangle_limit(64, 378).unwrap(), 124);
    assert_eq!(locality_triangle_limit(64, 96).unwrap(), 32);
    assert_eq!(locality_triangle_limit(8, 12).unwrap(), 4);
    assert!(locality_triangle_limit(256, 378).is_err());
    assert!(locality_triangle_limit(64, 513 * 3).is_err());
    assert!(locality_triangle_limit(6, 9).is_err());
  }

  #[test]
  fn connected_strip_reuses_vertices() {
    let (positions, indices) = strip(20);
    let divider = HalaLocalityMeshletDivider::default();
    let meshlets = divider.divide(&positions, &indices, Some(0), 12, 30).unwrap();

    let total_vertices = meshlets.iter().map(|m| m.vertex_count).sum::<u32>();
    assert!(total_vertices < indices.len() as u32);
    assert!(meshlets.len() <= meshlets_bound(indices.len(), 12, 8));
    for meshlet in meshlets.iter() {
      assert!(meshlet.validate(12, 30).is_ok());
      assert_eq!(meshlet.mesh_index, Some(0));
    }
  }

  #[test]
  fn single_triangle_and_empty_input() {
    let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
    let divider = HalaLocalityMeshletDivider::default();
    let meshlets = divider.divide(&positions, &[0, 1, 2], None, 64, 378).unwrap();
    assert_eq!(meshlets.len(), 1);
    assert_eq!((meshlets[0].vertex_count, meshlets[0].index_count), (3, 3));
    assert!(divider.divide(&positions, &[], None, 64, 378).unwrap().is_empty());
  }

  #[test]
  fn cone_weight_keeps_limits() {
    let (positions, indices) = strip(16);
    let divider = HalaLocalityMeshletDivider { cone_weight: 0.5 };
    let meshlets = divider.divide(&positions, &indices, None, 8, 12).unwrap();
    assert!(meshlets.iter().all(|m| m.validate(8, 12).is_ok()));
    assert_eq!(meshlets.iter().map(|m| m.num_of_triangles()).sum::<u32>(), 32);
  }

  #[test]
  fn disconnected_islands_keep_every_triangle() {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for island in 0..6u32 {
      let offset = Vec3::new(island as f32 * 1000.0, 0.0, -(island as f32) * 250.0);
      let base = positions.len() as u32;
      positions.extend([offset, offset + Vec3::X, offset + Vec3::Y]);
      indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    let meshlets = HalaLocalityMeshletDivider::default().divide(&positions, &indices, None, 3, 12).unwrap();
    assert_eq!(meshlets.len(), 6);
    let mut expected = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect::<Vec<_>>();
    expected.sort_unstable();
    assert_eq!(sorted_triangles(&meshlets), expected);
  }

  #[test]
  fn unmeasurable_positions_are_errors() {
    let divider = HalaLocalityMeshletDivider::default();
    let far = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::splat(2e19), Vec3::splat(2e19) + Vec3::X, Vec3::splat(2e19) + Vec3::Y];
    assert!(divider.divide(&far, &[0, 1, 2, 3, 4, 5], None, 3, 12).is_err());

    let nan = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(f32::NAN, 0.0, 0.0), Vec3::X, Vec3::Y];
    assert!(divider.divide(&nan, &[0, 1, 2, 3, 4, 5], None, 3, 12).is_err());

    // An unreferenced NaN position does not matter.
    let meshlets = divider.divide(&nan, &[0, 1, 2], None, 3, 12).unwrap();
    assert_eq!(meshlets.len(), 1);
  }

  #[test]
  fn ceilings_beyond_meshopt_are_rejected() {
    let (positions, indices) = strip(2);
    let divider = HalaLocalityMeshletDivider::default();
    assert!(divider.divide(&positions, &indices, None, 256, 378).is_err());
    assert!(divider.divide(&positions, &indices, None, 64, 1536 + 3).is_err());
    assert!(divider.divide(&positions, &indices, None, 3, 3).is_err());
  }
}
