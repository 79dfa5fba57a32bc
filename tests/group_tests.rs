mod common;

use anyhow::Result;

use hala_meshlet::prelude::*;

use common::{grid, sorted_triangles};

#[test]
fn groups_cover_every_meshlet_triangle() -> Result<()> {
  let mesh = HalaMesh::new("grid", vec![grid(12, 12, 0.0), grid(4, 4, 2.0)]);
  let pairs = [(&mesh, vec![0, 1])];
  let meshlets = divide_into_meshlets(&pairs, false, 32, 96)?;
  let groups = divide_into_groups(&pairs, &meshlets, false, 128, 384, 4)?;

  for group in groups.iter() {
    group.validate(128, 384)?;
  }
  assert_eq!(sorted_triangles(&groups), sorted_triangles(&meshlets));
  assert!(groups.iter().any(|g| g.mesh_index == Some(1)));
  Ok(())
}

#[test]
fn few_meshlets_make_a_single_group() -> Result<()> {
  let mesh = HalaMesh::new("grid", vec![grid(4, 2, 0.0)]);
  let pairs = [(&mesh, vec![0])];
  let meshlets = divide_into_meshlets_with(&pairs, &HalaNaiveMeshletDivider, false, 6, 6)?;
  assert_eq!(meshlets.len(), 8);

  let groups = divide_into_groups(&pairs, &meshlets, false, 256, 1512, 16)?;
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].index_count, 16 * 3);
  assert_eq!(groups[0].vertex_count, 15);
  Ok(())
}

#[test]
fn meshlet_ceiling_holds_for_every_strategy() -> Result<()> {
  let mesh = HalaMesh::new("grid", vec![grid(8, 8, 0.0)]);
  let pairs = [(&mesh, vec![0])];
  for group_strategy in [HalaGroupStrategy::Naive, HalaGroupStrategy::Locality] {
    let config = HalaMeshletConfig {
      max_vertices: 16,
      max_indices: 24,
      group_strategy,
      group_content: HalaGroupContent::MeshletIndices,
      max_meshlets_per_group: 3,
      ..Default::default()
    };
    let builder = HalaMeshletBuilder::new(config)?;
    let meshlets = builder.build_meshlets(&pairs)?;
    let groups = builder.build_groups(&pairs, &meshlets)?;

    assert!(groups.iter().all(|g| g.vertex_count <= 3 && g.indices.is_empty()));
    let mut members = groups.iter().flat_map(|g| g.vertices.iter().copied()).collect::<Vec<_>>();
    members.sort_unstable();
    assert_eq!(members, (0..meshlets.len() as u32).collect::<Vec<_>>());
  }
  Ok(())
}

#[test]
fn combined_meshlets_group_per_model() -> Result<()> {
  let first = HalaMesh::new("first", vec![grid(3, 3, 0.0), grid(3, 3, 1.0)]);
  let second = HalaMesh::new("second", vec![grid(2, 2, 0.0)]);
  let pairs = [(&first, vec![0, 1]), (&second, vec![0])];
  let meshlets = divide_into_meshlets(&pairs, true, 64, 378)?;
  let groups = divide_into_groups(&pairs, &meshlets, true, 256, 1512, 4)?;

  assert_eq!(groups.len(), 2);
  assert_eq!((groups[0].model_index, groups[0].mesh_index), (0, None));
  assert_eq!((groups[1].model_index, groups[1].mesh_index), (1, None));
  Ok(())
}

#[test]
fn oversized_meshlets_are_rejected() -> Result<()> {
  let mesh = HalaMesh::new("grid", vec![grid(4, 4, 0.0)]);
  let pairs = [(&mesh, vec![0])];
  let meshlets = divide_into_meshlets(&pairs, false, 64, 378)?;
  assert!(divide_into_groups(&pairs, &meshlets, false, 16, 1512, 4).is_err());
  assert!(divide_into_groups(&pairs, &meshlets, false, 256, 1512, 0).is_err());
  Ok(())
}
