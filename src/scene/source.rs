use glam::Vec3;

use crate::error::HalaMeshletError;

/// A model that exposes its submeshes as positions and triangle lists.
pub trait HalaMeshSource {
  /// Get the number of submeshes.
  /// return: The number of submeshes.
  fn num_of_meshes(&self) -> usize;

  /// Get the positions of a submesh.
  /// param mesh_index: The submesh index.
  /// return: One position per vertex of the submesh.
  fn positions_for_mesh(&self, mesh_index: usize) -> Result<Vec<Vec3>, HalaMeshletError>;

  /// Get the triangle indices of a submesh.
  /// param mesh_index: The submesh index.
  /// return: The flat index list, three per triangle.
  fn indices_for_mesh(&self, mesh_index: usize) -> Result<Vec<u32>, HalaMeshletError>;
}

/// The flattened geometry the dividers work on.
#[derive(Debug, Clone, Default)]
pub struct HalaSubmeshGeometry {
  pub model_index: usize,
  pub mesh_index: Option<usize>,
  pub positions: Vec<Vec3>,
  pub indices: Vec<u32>,
}

/// Check a flat triangle list against its position count.
/// param indices: The index list.
/// param num_of_positions: The number of positions.
/// return: The result.
pub(crate) fn check_indices(indices: &[u32], num_of_positions: usize) -> Result<(), HalaMeshletError> {
  if indices.len() % 3 != 0 {
    return Err(HalaMeshletError::new(&format!("Index count {} is not a multiple of 3.", indices.len()), None));
  }
  if let Some(index) = indices.iter().find(|&&i| i as usize >= num_of_positions) {
    return Err(HalaMeshletError::new(
      &format!("Index {} is out of range of {} positions.", index, num_of_positions),
      None));
  }
  Ok(())
}

/// Extract the geometry of the selected submeshes.
/// If combine is true, the submeshes of every model are concatenated into one stream
/// and their indices are rebased onto the concatenated positions.
/// param models_and_mesh_indices: The models with their selected submeshes.
/// param combine: Whether to combine the submeshes of each model.
/// return: The geometry, in input order.
pub fn extract_geometry<M: HalaMeshSource>(
  models_and_mesh_indices: &[(&M, Vec<usize>)],
  combine: bool,
) -> Result<Vec<HalaSubmeshGeometry>, HalaMeshletError> {
  let mut geometries = Vec::new();
  for (model_index, (model, mesh_indices)) in models_and_mesh_indices.iter().enumerate() {
    let num_of_meshes = model.num_of_meshes();
    if let Some(mesh_index) = mesh_indices.iter().find(|&&i| i >= num_of_meshes) {
      return Err(HalaMeshletError::new(
        &format!("Submesh {} of model {} is out of range {}.", mesh_index, model_index, num_of_meshes),
        None));
    }

    if combine {
      let mut combined = HalaSubmeshGeometry {
        model_index,
        mesh_index: None,
        ..Default::default()
      };
      for &mesh_index in mesh_indices.iter() {
        let positions = model.positions_for_mesh(mesh_index)?;
        let indices = model.indices_for_mesh(mesh_index)?;
        check_indices(&indices, positions.len())?;

        let offset = combined.positions.len() as u32;
        combined.indices.extend(indices.iter().map(|i| i + offset));
        combined.positions.extend(positions);
      }
      log::debug!("Combined {} submeshes of model {} into {} vertices and {} indices.",
        mesh_indices.len(), model_index, combined.positions.len(), combined.indices.len());
      geometries.push(combined);
    } else {
      for &mesh_index in mesh_indices.iter() {
        let positions = model.positions_for_mesh(mesh_index)?;
        let indices = model.indices_for_mesh(mesh_index)?;
        check_indices(&indices, positions.len())?;
        geometries.push(HalaSubmeshGeometry {
          model_index,
          mesh_index: Some(mesh_index),
          positions,
          indices,
        });
      }
    }
  }
  Ok(geometries)
}
