use std::borrow::Cow;
use std::collections::HashMap;

use rayon::prelude::*;

use crate::error::HalaMeshletError;
use crate::config::HalaMeshletConfig;
use crate::divider::{
  HalaMeshletDivider,
  HalaGroupDivider,
  HalaGroupContent,
  HalaGroupLimits,
  HalaLocalityMeshletDivider,
  HalaLocalityGroupDivider,
  check_limits,
  locality_triangle_limit,
};
use crate::scene::{
  HalaMeshlet,
  HalaMeshSource,
  HalaSubmeshGeometry,
  extract_geometry,
};

/// Divide the selected submeshes into meshlets with the locality-aware divider.
/// param models_and_mesh_indices: The models with their selected submeshes.
/// param combine: Whether to combine the submeshes of each model.
/// param max_vertices: The maximum number of vertices per meshlet.
/// param max_indices: The maximum number of indices per meshlet.
/// return: The meshlets of all geometries in input order.
pub fn divide_into_meshlets<M: HalaMeshSource>(
  models_and_mesh_indices: &[(&M, Vec<usize>)],
  combine: bool,
  max_vertices: u32,
  max_indices: u32,
) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
  locality_triangle_limit(max_vertices, max_indices)?;
  divide_into_meshlets_with(
    models_and_mesh_indices,
    &HalaLocalityMeshletDivider::default(),
    combine,
    max_vertices,
    max_indices,
  )
}

/// Divide the selected submeshes into meshlets with the given divider.
/// param models_and_mesh_indices: The models with their selected submeshes.
/// param divider: The meshlet divider.
/// param combine: Whether to combine the submeshes of each model.
/// param max_vertices: The maximum number of vertices per meshlet.
/// param max_indices: The maximum number of indices per meshlet.
/// return: The meshlets of all geometries in input order.
pub fn divide_into_meshlets_with<M: HalaMeshSource, D: HalaMeshletDivider + ?Sized>(
  models_and_mesh_indices: &[(&M, Vec<usize>)],
  divider: &D,
  combine: bool,
  max_vertices: u32,
  max_indices: u32,
) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
  check_limits(max_vertices, max_indices)?;
  let geometries = extract_geometry(models_and_mesh_indices, combine)?;
  build_meshlets(&geometries, divider, max_vertices, max_indices, true)
}

/// Group the meshlets of the selected submeshes with the locality-aware divider.
/// param models_and_mesh_indices: The models with their selected submeshes, as used to build the meshlets.
/// param meshlets: The meshlets.
/// param combine: Whether the meshlets were built from combined submeshes.
/// param max_vertices: The maximum number of vertices per group.
/// param max_indices: The maximum number of indices per group.
/// param max_meshlets_per_group: The maximum number of meshlets per group.
/// return: The groups of all geometries in input order.
pub fn divide_into_groups<M: HalaMeshSource>(
  models_and_mesh_indices: &[(&M, Vec<usize>)],
  meshlets: &[HalaMeshlet],
  combine: bool,
  max_vertices: u32,
  max_indices: u32,
  max_meshlets_per_group: u32,
) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
  divide_into_groups_with(
    models_and_mesh_indices,
    meshlets,
    &HalaLocalityGroupDivider::default(),
    combine,
    max_vertices,
    max_indices,
    max_meshlets_per_group,
  )
}

/// Group the meshlets of the selected submeshes with the given divider.
/// param models_and_mesh_indices: The models with their selected submeshes, as used to build the meshlets.
/// param meshlets: The meshlets.
/// param divider: The group divider.
/// param combine: Whether the meshlets were built from combined submeshes.
/// param max_vertices: The maximum number of vertices per group.
/// param max_indices: The maximum number of indices per group.
/// param max_meshlets_per_group: The maximum number of meshlets per group.
/// return: The groups of all geometries in input order.
pub fn divide_into_groups_with<M: HalaMeshSource, D: HalaGroupDivider + ?Sized>(
  models_and_mesh_indices: &[(&M, Vec<usize>)],
  meshlets: &[HalaMeshlet],
  divider: &D,
  combine: bool,
  max_vertices: u32,
  max_indices: u32,
  max_meshlets_per_group: u32,
) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
  let limits = HalaGroupLimits::new(max_vertices, max_indices, max_meshlets_per_group);
  limits.validate()?;
  let geometries = extract_geometry(models_and_mesh_indices, combine)?;
  build_groups(&geometries, meshlets, divider, &limits, true)
}

/// Run the divider over every geometry and concatenate the results in input order.
fn build_meshlets<D: HalaMeshletDivider + ?Sized>(
  geometries: &[HalaSubmeshGeometry],
  divider: &D,
  max_vertices: u32,
  max_indices: u32,
  parallel: bool,
) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
  let divide = |geometry: &HalaSubmeshGeometry| -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
    let mut meshlets = divider.divide(
      &geometry.positions,
      &geometry.indices,
      geometry.mesh_index,
      max_vertices,
      max_indices,
    )?;
    for meshlet in meshlets.iter_mut() {
      meshlet.model_index = geometry.model_index;
    }
    log::debug!("Model {} submesh {:?}: {} triangles into {} meshlets.",
      geometry.model_index, geometry.mesh_index, geometry.indices.len() / 3, meshlets.len());
    Ok(meshlets)
  };

  let per_geometry = if parallel {
    geometries.par_iter().map(divide).collect::<Result<Vec<_>, _>>()?
  } else {
    geometries.iter().map(divide).collect::<Result<Vec<_>, _>>()?
  };
  let meshlets = per_geometry.into_iter().flatten().collect::<Vec<_>>();

  log::info!("Built {} meshlets from {} geometries.", meshlets.len(), geometries.len());
  Ok(meshlets)
}

/// Borrow the member meshlets when they are contiguous, clone them otherwise.
fn member_meshlets<'a>(meshlets: &'a [HalaMeshlet], members: &[usize]) -> Cow<'a, [HalaMeshlet]> {
  let first = members[0];
  if members.iter().enumerate().all(|(i, &m)| m == first + i) {
    Cow::Borrowed(&meshlets[first..first + members.len()])
  } else {
    Cow::Owned(members.iter().map(|&m| meshlets[m].clone()).collect())
  }
}

/// Match the meshlets to their geometries, group them and concatenate the results in input order.
fn build_groups<D: HalaGroupDivider + ?Sized>(
  geometries: &[HalaSubmeshGeometry],
  meshlets: &[HalaMeshlet],
  divider: &D,
  limits: &HalaGroupLimits,
  parallel: bool,
) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
  let mut meshlets_of_geometry: HashMap<(usize, Option<usize>), Vec<usize>> = HashMap::new();
  for (i, meshlet) in meshlets.iter().enumerate() {
    meshlets_of_geometry.entry((meshlet.model_index, meshlet.mesh_index)).or_default().push(i);
  }
  let num_of_unmatched = meshlets_of_geometry.iter()
    .filter(|(key, _)| !geometries.iter().any(|g| (g.model_index, g.mesh_index) == **key))
    .map(|(_, members)| members.len())
    .sum::<usize>();
  if num_of_unmatched > 0 {
    log::warn!("{} meshlets match no selected geometry and are not grouped.", num_of_unmatched);
  }

  let group = |geometry: &HalaSubmeshGeometry| -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
    let members = match meshlets_of_geometry.get(&(geometry.model_index, geometry.mesh_index)) {
      Some(members) => members,
      None => {
        log::warn!("Model {} submesh {:?} has no meshlets to group.", geometry.model_index, geometry.mesh_index);
        return Ok(Vec::new());
      },
    };

    let members_slice = member_meshlets(meshlets, members);
    let mut groups = divider.divide(
      &geometry.positions,
      &geometry.indices,
      &members_slice,
      geometry.mesh_index,
      limits,
    )?;
    for group in groups.iter_mut() {
      group.model_index = geometry.model_index;
      if limits.content == HalaGroupContent::MeshletIndices {
        for member in group.vertices.iter_mut() {
          *member = members[*member as usize] as u32;
        }
      }
    }
    log::debug!("Model {} submesh {:?}: {} meshlets into {} groups.",
      geometry.model_index, geometry.mesh_index, members.len(), groups.len());
    Ok(groups)
  };

  let per_geometry = if parallel {
    geometries.par_iter().map(group).collect::<Result<Vec<_>, _>>()?
  } else {
    geometries.iter().map(group).collect::<Result<Vec<_>, _>>()?
  };
  let groups = per_geometry.into_iter().flatten().collect::<Vec<_>>();

  log::info!("Built {} groups from {} meshlets.", groups.len(), meshlets.len());
  Ok(groups)
}

/// The meshlet builder.
/// Runs both passes with the dividers and ceilings of one configuration.
pub struct HalaMeshletBuilder {
  config: HalaMeshletConfig,
  meshlet_divider: Box<dyn HalaMeshletDivider>,
  group_divider: Box<dyn HalaGroupDivider>,
}

impl HalaMeshletBuilder {
  /// Create a new builder.
  /// param config: The configuration.
  /// return: The builder.
  pub fn new(config: HalaMeshletConfig) -> Result<Self, HalaMeshletError> {
    config.validate()?;
    let meshlet_divider = config.strategy.divider(config.cone_weight);
    let group_divider = config.group_strategy.divider(config.cone_weight);
    log::debug!("Meshlet builder created with {:?} meshlets and {:?} groups.", config.strategy, config.group_strategy);
    Ok(Self {
      config,
      meshlet_divider,
      group_divider,
    })
  }

  pub fn config(&self) -> &HalaMeshletConfig {
    &self.config
  }

  /// Divide the selected submeshes into meshlets.
  /// param models_and_mesh_indices: The models with their selected submeshes.
  /// return: The meshlets.
  pub fn build_meshlets<M: HalaMeshSource>(
    &self,
    models_and_mesh_indices: &[(&M, Vec<usize>)],
  ) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
    let geometries = extract_geometry(models_and_mesh_indices, self.config.combine_submeshes)?;
    build_meshlets(
      &geometries,
      self.meshlet_divider.as_ref(),
      self.config.max_vertices,
      self.config.max_indices,
      self.config.parallel,
    )
  }

  /// Group meshlets built from the same selection.
  /// param models_and_mesh_indices: The models with their selected submeshes.
  /// param meshlets: The meshlets.
  /// return: The groups.
  pub fn build_groups<M: HalaMeshSource>(
    &self,
    models_and_mesh_indices: &[(&M, Vec<usize>)],
    meshlets: &[HalaMeshlet],
  ) -> Result<Vec<HalaMeshlet>, HalaMeshletError> {
    let geometries = extract_geometry(models_and_mesh_indices, self.config.combine_submeshes)?;
    build_groups(
      &geometries,
      meshlets,
      self.group_divider.as_ref(),
      &self.config.group_limits(),
      self.config.parallel,
    )
  }
}
