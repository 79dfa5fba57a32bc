use glam::Vec3;
use serde::{
  Deserialize, Serialize
};

use crate::error::HalaMeshletError;
use crate::scene::HalaBounds;

/// The meshlet.
/// A bounded cluster of triangles with its own local vertex numbering.
/// The same type also describes a group of meshlets produced by the grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalaMeshlet {
  /// The original-mesh vertex indices used by this meshlet.
  pub vertices: Vec<u32>,
  /// The local indices into `vertices`, three per triangle.
  pub indices: Vec<u32>,
  pub vertex_count: u32,
  pub index_count: u32,
  /// The position of the source in the (mesh, submeshes) pairs this meshlet was built from.
  pub model_index: usize,
  /// The submesh this meshlet was built from, none if the submeshes were combined.
  pub mesh_index: Option<usize>,
}

/// The implementation of the meshlet.
impl HalaMeshlet {
  /// Create a new meshlet from its vertex and local index lists.
  /// param vertices: The original-mesh vertex indices.
  /// param indices: The local indices.
  /// param mesh_index: The submesh index.
  /// return: The meshlet.
  pub fn new(vertices: Vec<u32>, indices: Vec<u32>, mesh_index: Option<usize>) -> Self {
    Self {
      vertex_count: vertices.len() as u32,
      index_count: indices.len() as u32,
      vertices,
      indices,
      model_index: 0,
      mesh_index,
    }
  }

  /// Get the number of triangles.
  /// return: The number of triangles.
  pub fn num_of_triangles(&self) -> u32 {
    self.index_count / 3
  }

  /// Iterate the triangles of the meshlet in the original vertex numbering.
  /// return: The triangle iterator.
  pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
    self.indices.chunks_exact(3).map(move |tri| {
      [
        self.vertices[tri[0] as usize],
        self.vertices[tri[1] as usize],
        self.vertices[tri[2] as usize],
      ]
    })
  }

  /// Compute the axis-aligned bounds of the meshlet.
  /// param positions: The positions of the original mesh.
  /// return: The bounds, none if the meshlet has no vertices.
  pub fn aabb(&self, positions: &[Vec3]) -> Result<Option<HalaBounds>, HalaMeshletError> {
    if let Some(vertex) = self.vertices.iter().find(|&&v| v as usize >= positions.len()) {
      return Err(HalaMeshletError::new(
        &format!("Meshlet vertex {} is out of range of {} positions.", vertex, positions.len()),
        None));
    }
    Ok(HalaBounds::from_points(self.vertices.iter().map(|&v| positions[v as usize])))
  }

  /// Check the counts and local indices of the meshlet.
  /// param max_vertices: The maximum number of vertices.
  /// param max_indices: The maximum number of indices.
  /// return: The result.
  pub fn validate(&self, max_vertices: u32, max_indices: u32) -> Result<(), HalaMeshletError> {
    if self.vertex_count as usize != self.vertices.len() || self.index_count as usize != self.indices.len() {
      return Err(HalaMeshletError::new(
        &format!("Meshlet counts ({}, {}) do not match its storage ({}, {}).",
          self.vertex_count, self.index_count, self.vertices.len(), self.indices.len()),
        None));
    }
    if self.index_count % 3 != 0 {
      return Err(HalaMeshletError::new(&format!("Meshlet index count {} is not a multiple of 3.", self.index_count), None));
    }
    if self.vertex_count > max_vertices || self.index_count > max_indices {
      return Err(HalaMeshletError::new(
        &format!("Meshlet ({} vertices, {} indices) exceeds the limits ({}, {}).",
          self.vertex_count, self.index_count, max_vertices, max_indices),
        None));
    }
    if let Some(index) = self.indices.iter().find(|&&i| i >= self.vertex_count) {
      return Err(HalaMeshletError::new(&format!("Meshlet local index {} is out of range {}.", index, self.vertex_count), None));
    }
    Ok(())
  }
}
