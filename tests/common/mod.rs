#![allow(dead_code)]

use glam::Vec3;

use hala_meshlet::prelude::*;

/// A flat grid of `width` x `height` quads, two triangles each.
pub fn grid(width: u32, height: u32, z: f32) -> HalaPrimitive {
  let mut positions = Vec::new();
  for y in 0..=height {
    for x in 0..=width {
      positions.push(Vec3::new(x as f32, y as f32, z));
    }
  }
  let row = width + 1;
  let mut indices = Vec::new();
  for y in 0..height {
    for x in 0..width {
      let i = y * row + x;
      indices.extend_from_slice(&[i, i + 1, i + row, i + 1, i + row + 1, i + row]);
    }
  }
  HalaPrimitive {
    positions,
    indices,
  }
}

/// The triangles of the meshlets in the original numbering, sorted.
pub fn sorted_triangles(meshlets: &[HalaMeshlet]) -> Vec<[u32; 3]> {
  let mut triangles = meshlets.iter().flat_map(|m| m.triangles()).collect::<Vec<_>>();
  triangles.sort_unstable();
  triangles
}

/// The triangles of an index list, sorted.
pub fn sorted_index_triangles(indices: &[u32]) -> Vec<[u32; 3]> {
  let mut triangles = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect::<Vec<_>>();
  triangles.sort_unstable();
  triangles
}
