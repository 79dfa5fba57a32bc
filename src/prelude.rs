pub use crate::error::HalaMeshletError;
pub use crate::config::HalaMeshletConfig;
pub use crate::divider::{
  HalaMeshletDivider,
  HalaGroupDivider,
  HalaGroupContent,
  HalaGroupLimits,
  HalaMeshletStrategy,
  HalaGroupStrategy,
  HalaNaiveMeshletDivider,
  HalaNaiveGroupDivider,
  HalaLocalityMeshletDivider,
  HalaLocalityGroupDivider,
  meshlets_bound,
  locality_triangle_limit,
  groups_bound,
};
pub use crate::builder::{
  HalaMeshletBuilder,
  divide_into_meshlets,
  divide_into_meshlets_with,
  divide_into_groups,
  divide_into_groups_with,
};
pub use crate::scene::{
  HalaMeshSource,
  HalaSubmeshGeometry,
  HalaMeshlet,
  HalaBounds,
  HalaGpuMeshlet,
  HalaMeshletBuffers,
  extract_geometry,
  cpu::{
    HalaMesh,
    HalaPrimitive,
    HalaScene,
  },
};
