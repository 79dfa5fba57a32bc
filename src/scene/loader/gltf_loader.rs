use std::path::Path;

use glam::Vec3;

use crate::error::HalaMeshletError;
use super::super::{
  cpu::scene::HalaScene,
  cpu::mesh::{HalaPrimitive, HalaMesh},
};

/// The glTF loader.
pub struct HalaGltfLoader;

/// The implementation of the glTF loader.
impl HalaGltfLoader {
  /// Load the glTF file from the given path.
  /// param path The path of the glTF file.
  /// return The loaded scene.
  pub fn load<P: AsRef<Path>>(path: P) -> Result<HalaScene, HalaMeshletError> {
    let path = path.as_ref();
    log::debug!("Loading glTF file \"{:?}\".", path);
    let (gltf, mesh_data, _) = gltf::import(path)?;

    // Load all meshes.
    let mut loaded_meshes = Vec::new();
    for mesh in gltf.meshes() {
      loaded_meshes.push(Self::load_mesh(&mesh, &mesh_data)?);
    }
    if loaded_meshes.is_empty() {
      log::warn!("No mesh in glTF file \"{:?}\".", path);
    }

    Ok(HalaScene {
      meshes: loaded_meshes,
    })
  }

  /// Load the mesh.
  /// Only triangle list primitives are kept, every other primitive is skipped.
  /// param mesh The gltf mesh.
  /// param buffers The gltf buffers.
  fn load_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<HalaMesh, HalaMeshletError> {
    let mesh_name = mesh.name().unwrap_or("<Unnamed>");
    log::debug!("Loading mesh \"{}\".", mesh_name);

    let mut loaded_primitives = Vec::new();
    for primitive in mesh.primitives() {
      if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("Skip primitive {} from mesh \"{}\" with mode {:?}.", primitive.index(), mesh_name, primitive.mode());
        continue;
      }
      log::debug!("Loading primitive {} from mesh \"{}\".", primitive.index(), mesh_name);
      let reader = primitive.reader(|i| buffers.get(i.index()).map(|data| &data[..]));

      let positions = reader.read_positions()
        .ok_or(HalaMeshletError::new(&format!("Read positions from mesh \"{}\" failed.", mesh_name), None))?
        .map(Vec3::from).collect::<Vec<_>>();
      // Non-indexed primitives draw their vertices in order.
      let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect::<Vec<_>>(),
        None => (0..positions.len() as u32).collect::<Vec<_>>(),
      };
      if indices.len() % 3 != 0 {
        return Err(HalaMeshletError::new(
          &format!("Primitive {} from mesh \"{}\" has {} indices, not a triangle list.", primitive.index(), mesh_name, indices.len()),
          None));
      }

      loaded_primitives.push(HalaPrimitive {
        positions,
        indices,
      });
    }

    Ok(HalaMesh {
      name: mesh_name.to_owned(),
      primitives: loaded_primitives,
    })
  }
}
