use std::path::Path;

use crate::error::HalaMeshletError;
use super::mesh::HalaMesh;
use super::super::loader::HalaGltfLoader;

/// A scene is the collection of meshes loaded from one file.
pub struct HalaScene {
  pub meshes: Vec<HalaMesh>,
}

/// The Drop implementation of the scene.
impl Drop for HalaScene {
  fn drop(&mut self) {
    log::debug!("A HalaScene dropped.");
  }
}

/// The implementation of the scene.
impl HalaScene {
  /// Create a new scene from glTF file.
  /// param path: The path to the glTF file.
  /// return: The scene.
  pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, HalaMeshletError> {
    // Check the file extension.
    let path = path.as_ref();
    let extension = path.extension()
      .ok_or(HalaMeshletError::new(&format!("Get file \"{:?}\" extension failed.", path), None))?;
    let scene = match extension.to_str() {
      // glTF file.
      Some("gltf") | Some("glb") => HalaGltfLoader::load(path),
      // Unsupported file.
      _ => Err(HalaMeshletError::new(&format!("Unsupported file \"{:?}\".", path), None)),
    }?;

    log::debug!("A HalaScene created with {} meshes.", scene.meshes.len());
    Ok(scene)
  }

  /// Find a mesh by name.
  /// param name: The name of the mesh.
  /// return: The mesh if found.
  pub fn find_mesh(&self, name: &str) -> Option<&HalaMesh> {
    self.meshes.iter().find(|mesh| mesh.name == name)
  }

  /// Select every primitive of every mesh, in the shape the dividers take.
  /// return: The meshes with all their primitive indices.
  pub fn all_primitives(&self) -> Vec<(&HalaMesh, Vec<usize>)> {
    self.meshes.iter()
      .map(|mesh| (mesh, (0..mesh.primitives.len()).collect()))
      .collect()
  }

  /// Get the total number of triangles in the scene.
  /// return: The number of triangles.
  pub fn num_of_triangles(&self) -> usize {
    self.meshes.iter()
      .flat_map(|mesh| mesh.primitives.iter())
      .map(|primitive| primitive.indices.len() / 3)
      .sum()
  }
}
