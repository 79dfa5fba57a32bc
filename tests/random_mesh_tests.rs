mod common;

use anyhow::Result;
use glam::Vec3;
use rand::{
  Rng, SeedableRng,
  rngs::StdRng,
};

use hala_meshlet::prelude::*;

use common::{grid, sorted_index_triangles, sorted_triangles};

const NUM_OF_SEEDS: u64 = 48;

/// Random triangles over a small vertex pool, mixed with repeated-vertex and zero-area triangles.
fn random_soup(rng: &mut StdRng) -> (Vec<Vec3>, Vec<u32>) {
  let num_of_vertices = rng.random_range(3..80u32);
  let mut positions = (0..num_of_vertices)
    .map(|_| Vec3::new(rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0)))
    .collect::<Vec<_>>();
  // Vertex 1 lies between 0 and 2.
  positions[1] = (positions[0] + positions[2]) * 0.5;

  let num_of_triangles = rng.random_range(1..200);
  let mut indices = Vec::with_capacity(num_of_triangles * 3);
  for _ in 0..num_of_triangles {
    let a = rng.random_range(0..num_of_vertices);
    let b = rng.random_range(0..num_of_vertices);
    let c = rng.random_range(0..num_of_vertices);
    match rng.random_range(0..8) {
      0 => indices.extend_from_slice(&[a, a, b]),
      1 => indices.extend_from_slice(&[0, 1, 2]),
      _ => indices.extend_from_slice(&[a, b, c]),
    }
  }
  (positions, indices)
}

/// Small grids laid out along x, `spacing` apart.
fn islands(rng: &mut StdRng, spacing: f32) -> (Vec<Vec3>, Vec<u32>) {
  let mut positions = Vec::new();
  let mut indices = Vec::new();
  for island in 0..rng.random_range(2..6) {
    let primitive = grid(rng.random_range(1..4), rng.random_range(1..4), 0.0);
    let base = positions.len() as u32;
    let offset = Vec3::new(island as f32 * spacing, 0.0, 0.0);
    positions.extend(primitive.positions.iter().map(|&p| p + offset));
    indices.extend(primitive.indices.iter().map(|&i| i + base));
  }
  (positions, indices)
}

fn meshlet_strategies() -> [(&'static str, Box<dyn HalaMeshletDivider>); 2] {
  [
    ("naive", Box::new(HalaNaiveMeshletDivider)),
    ("locality", Box::new(HalaLocalityMeshletDivider { cone_weight: 0.25 })),
  ]
}

fn group_strategies() -> [(&'static str, Box<dyn HalaGroupDivider>); 2] {
  [
    ("naive", Box::new(HalaNaiveGroupDivider)),
    ("locality", Box::new(HalaLocalityGroupDivider::default())),
  ]
}

/// Pick ceilings the strategy accepts.
/// return: The vertex, index and triangle ceilings.
fn random_ceilings(rng: &mut StdRng, name: &str) -> Result<(u32, u32, u32)> {
  if name == "locality" {
    let max_vertices = rng.random_range(3..=128);
    let max_indices = rng.random_range(4..=128) * 3;
    Ok((max_vertices, max_indices, locality_triangle_limit(max_vertices, max_indices)?))
  } else {
    let max_vertices = rng.random_range(3..=70);
    let max_indices = rng.random_range(1..=60) * 3;
    Ok((max_vertices, max_indices, max_indices / 3))
  }
}

fn check_meshlets(
  divider: &dyn HalaMeshletDivider,
  positions: &[Vec3],
  indices: &[u32],
  ceilings: (u32, u32, u32),
) -> Result<Vec<HalaMeshlet>> {
  let (max_vertices, max_indices, max_triangles) = ceilings;
  let meshlets = divider.divide(positions, indices, Some(2), max_vertices, max_indices)?;
  for meshlet in meshlets.iter() {
    meshlet.validate(max_vertices, max_indices)?;
    assert!(meshlet.index_count > 0);
    assert_eq!(meshlet.mesh_index, Some(2));
  }
  assert_eq!(sorted_triangles(&meshlets), sorted_index_triangles(indices));
  assert!(meshlets.len() <= meshlets_bound(indices.len(), max_vertices as usize, max_triangles as usize));
  Ok(meshlets)
}

fn check_groups(
  rng: &mut StdRng,
  divider: &dyn HalaGroupDivider,
  positions: &[Vec3],
  indices: &[u32],
  meshlets: &[HalaMeshlet],
  ceilings: (u32, u32, u32),
) -> Result<()> {
  let limits = HalaGroupLimits::new(
    ceilings.0 * rng.random_range(1..=4),
    ceilings.1 * rng.random_range(1..=4),
    rng.random_range(1..=8),
  );

  let groups = divider.divide(positions, indices, meshlets, Some(2), &limits)?;
  for group in groups.iter() {
    group.validate(limits.max_vertices, limits.max_indices)?;
    assert_eq!(group.mesh_index, Some(2));
  }
  assert_eq!(sorted_triangles(&groups), sorted_triangles(meshlets));
  assert!(groups.len() <= groups_bound(meshlets, &limits));

  let limits = HalaGroupLimits { content: HalaGroupContent::MeshletIndices, ..limits };
  let groups = divider.divide(positions, indices, meshlets, Some(2), &limits)?;
  assert!(groups.iter().all(|g| g.vertex_count <= limits.max_meshlets && g.indices.is_empty()));
  let mut members = groups.iter().flat_map(|g| g.vertices.iter().copied()).collect::<Vec<_>>();
  members.sort_unstable();
  assert_eq!(members, (0..meshlets.len() as u32).collect::<Vec<_>>());
  Ok(())
}

fn check_every_strategy(rng: &mut StdRng, positions: &[Vec3], indices: &[u32]) -> Result<()> {
  for (name, meshlet_divider) in meshlet_strategies() {
    let ceilings = random_ceilings(rng, name)?;
    let meshlets = check_meshlets(meshlet_divider.as_ref(), positions, indices, ceilings)?;
    for (_, group_divider) in group_strategies() {
      check_groups(rng, group_divider.as_ref(), positions, indices, &meshlets, ceilings)?;
    }
  }
  Ok(())
}

#[test]
fn random_triangles_survive_every_strategy() -> Result<()> {
  for seed in 0..NUM_OF_SEEDS {
    let mut rng = StdRng::seed_from_u64(seed);
    let (positions, indices) = random_soup(&mut rng);
    check_every_strategy(&mut rng, &positions, &indices)?;
  }
  Ok(())
}

#[test]
fn disconnected_islands_survive_every_strategy() -> Result<()> {
  for seed in 0..NUM_OF_SEEDS {
    let mut rng = StdRng::seed_from_u64(seed);
    let (positions, indices) = islands(&mut rng, 1.0e4);
    check_every_strategy(&mut rng, &positions, &indices)?;
  }
  Ok(())
}

#[test]
fn overflowing_distances_never_drop_triangles() -> Result<()> {
  for seed in 0..NUM_OF_SEEDS {
    let mut rng = StdRng::seed_from_u64(seed);
    let (positions, indices) = islands(&mut rng, 2.0e19);

    // meshopt can not measure these distances; the divider says so instead of dropping triangles.
    let (max_vertices, max_indices, _) = random_ceilings(&mut rng, "locality")?;
    assert!(HalaLocalityMeshletDivider::default().divide(&positions, &indices, None, max_vertices, max_indices).is_err());

    let ceilings = random_ceilings(&mut rng, "naive")?;
    let meshlets = check_meshlets(&HalaNaiveMeshletDivider, &positions, &indices, ceilings)?;
    for (_, group_divider) in group_strategies() {
      check_groups(&mut rng, group_divider.as_ref(), &positions, &indices, &meshlets, ceilings)?;
    }
  }
  Ok(())
}
