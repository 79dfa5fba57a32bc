use glam::Vec3;

use crate::error::HalaMeshletError;
use crate::scene::HalaMeshSource;

/// A primitive is one submesh: positions and a triangle list over them.
#[derive(Debug, Clone, Default)]
pub struct HalaPrimitive {
  pub positions: Vec<Vec3>,
  pub indices: Vec<u32>,
}

/// A mesh is a collection of primitives that define a 3D object.
#[derive(Debug, Clone, Default)]
pub struct HalaMesh {
  pub name: String,
  pub primitives: Vec<HalaPrimitive>,
}

/// The implementation of the mesh.
impl HalaMesh {
  /// Create a new mesh from its primitives.
  /// param name: The name of the mesh.
  /// param primitives: The primitives.
  /// return: The mesh.
  pub fn new(name: &str, primitives: Vec<HalaPrimitive>) -> Self {
    Self {
      name: name.to_owned(),
      primitives,
    }
  }

  fn primitive(&self, mesh_index: usize) -> Result<&HalaPrimitive, HalaMeshletError> {
    self.primitives.get(mesh_index)
      .ok_or(HalaMeshletError::new(&format!("Mesh \"{}\" has no primitive {}.", self.name, mesh_index), None))
  }
}

/// The primitives of a mesh are its submeshes.
impl HalaMeshSource for HalaMesh {
  fn num_of_meshes(&self) -> usize {
    self.primitives.len()
  }

  fn positions_for_mesh(&self, mesh_index: usize) -> Result<Vec<Vec3>, HalaMeshletError> {
    Ok(self.primitive(mesh_index)?.positions.clone())
  }

  fn indices_for_mesh(&self, mesh_index: usize) -> Result<Vec<u32>, HalaMeshletError> {
    Ok(self.primitive(mesh_index)?.indices.clone())
  }
}
