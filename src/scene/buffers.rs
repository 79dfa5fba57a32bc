use glam::Vec3;

use crate::error::HalaMeshletError;
use crate::scene::HalaMeshlet;

/// The largest triangle count a mesh-shading meshlet may carry.
pub const MAX_TRIANGLES_PER_GPU_MESHLET: u32 = 512;

/// The meshlet as a mesh shader reads it.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct HalaGpuMeshlet {
  pub center: [f32; 3],
  pub radius: f32,
  pub cone_apex: [f32; 3],
  pub num_of_vertices: u32,
  pub cone_axis: [f32; 3],
  pub num_of_triangles: u32,
  pub cone_cutoff: f32,
  pub offset_of_vertices: u32,
  pub offset_of_primitives: u32,
  pub _padding: u32,
}

/// The meshlets of one geometry flattened into upload-ready buffers.
#[derive(Debug, Default, Clone)]
pub struct HalaMeshletBuffers {
  pub meshlets: Vec<HalaGpuMeshlet>,
  /// The original-mesh vertex indices of all meshlets, back to back.
  pub meshlet_vertices: Vec<u32>,
  /// The local indices of all meshlets, three bytes per triangle.
  pub meshlet_primitives: Vec<u8>,
}

impl HalaMeshletBuffers {
  /// Pack the meshlets.
  /// param meshlets: The meshlets of one geometry.
  /// param positions: The positions of the geometry.
  /// return: The buffers.
  pub fn new(meshlets: &[HalaMeshlet], positions: &[Vec3]) -> Result<Self, HalaMeshletError> {
    let vertex_data = meshopt::typed_to_bytes(positions);
    let vertex_adapter = meshopt::VertexDataAdapter::new(vertex_data, std::mem::size_of::<Vec3>(), 0)
      .map_err(|err| HalaMeshletError::new(&format!("Failed to create the vertex data adapter: {:?}", err), None))?;

    let mut buffers = Self {
      meshlets: Vec::with_capacity(meshlets.len()),
      meshlet_vertices: Vec::with_capacity(meshlets.iter().map(|m| m.vertices.len()).sum()),
      meshlet_primitives: Vec::with_capacity(meshlets.iter().map(|m| m.indices.len()).sum()),
    };
    let mut global_indices = Vec::new();
    for (i, meshlet) in meshlets.iter().enumerate() {
      meshlet.validate(u8::MAX as u32 + 1, MAX_TRIANGLES_PER_GPU_MESHLET * 3).map_err(|err| HalaMeshletError::new(
        &format!("Meshlet {} can not be packed: {}", i, err.message()),
        Some(Box::new(err))))?;
      if let Some(vertex) = meshlet.vertices.iter().find(|&&v| v as usize >= positions.len()) {
        return Err(HalaMeshletError::new(
          &format!("Meshlet {} vertex {} is out of range of {} positions.", i, vertex, positions.len()),
          None));
      }

      global_indices.clear();
      global_indices.extend(meshlet.triangles().flatten());
      let bounds = meshopt::compute_cluster_bounds(&global_indices, &vertex_adapter);

      buffers.meshlets.push(HalaGpuMeshlet {
        center: bounds.center,
        radius: bounds.radius,
        cone_apex: bounds.cone_apex,
        num_of_vertices: meshlet.vertex_count,
        cone_axis: bounds.cone_axis,
        num_of_triangles: meshlet.num_of_triangles(),
        cone_cutoff: bounds.cone_cutoff,
        offset_of_vertices: buffers.meshlet_vertices.len() as u32,
        offset_of_primitives: buffers.meshlet_primitives.len() as u32,
        _padding: 0,
      });
      buffers.meshlet_vertices.extend_from_slice(&meshlet.vertices);
      buffers.meshlet_primitives.extend(meshlet.indices.iter().map(|&i| i as u8));
    }

    log::debug!("Packed {} meshlets into {} vertices and {} primitive bytes.",
      buffers.meshlets.len(), buffers.meshlet_vertices.len(), buffers.meshlet_primitives.len());
    Ok(buffers)
  }
}
