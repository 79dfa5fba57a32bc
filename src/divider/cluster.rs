use glam::Vec3;

use super::kdtree::HalaKdTree;

const NONE: u32 = u32::MAX;

/// How the cluster builder picks the next element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HalaClusterOrder {
  /// Grow from adjacent elements, fall back to the spatially closest one.
  Locality,
  /// Take elements in input order.
  Sequential,
}

/// The ceilings of one cluster.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HalaClusterLimits {
  pub max_vertices: usize,
  pub max_indices: usize,
  pub max_elements: usize,
  pub cone_weight: f32,
}

/// The units the builder places into clusters: triangles, or meshlets one level up.
/// Each element has a corner list (its triangles in global vertex numbering) and the
/// distinct vertices of those corners.
#[derive(Debug, Default)]
pub(crate) struct HalaClusterElements {
  corner_offsets: Vec<u32>,
  corners: Vec<u32>,
  vertex_offsets: Vec<u32>,
  vertices: Vec<u32>,
  centroids: Vec<Vec3>,
  normals: Vec<Vec3>,
  areas: Vec<f32>,
  num_of_vertices: usize,
}

impl HalaClusterElements {
  /// Create an empty element list.
  /// param num_of_vertices: The size of the global vertex numbering.
  /// return: The element list.
  pub fn new(num_of_vertices: usize) -> Self {
    Self {
      corner_offsets: vec![0],
      vertex_offsets: vec![0],
      num_of_vertices,
      ..Default::default()
    }
  }

  /// Append an element.
  /// param corners: The corner list, three per triangle.
  /// param vertices: The distinct vertices of the corners.
  /// param centroid: The centroid.
  /// param normal: The unit normal, zero if unknown.
  /// param area: The surface area.
  pub fn push<I: IntoIterator<Item = u32>>(&mut self, corners: &[u32], vertices: I, centroid: Vec3, normal: Vec3, area: f32) {
    self.corners.extend_from_slice(corners);
    self.corner_offsets.push(self.corners.len() as u32);
    self.vertices.extend(vertices);
    self.vertex_offsets.push(self.vertices.len() as u32);
    self.centroids.push(centroid);
    self.normals.push(normal);
    self.areas.push(area);
  }

  pub fn len(&self) -> usize {
    self.centroids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.centroids.is_empty()
  }

  pub fn num_of_corners(&self) -> usize {
    self.corners.len()
  }

  pub fn corners_of(&self, element: usize) -> &[u32] {
    &self.corners[self.corner_offsets[element] as usize..self.corner_offsets[element + 1] as usize]
  }

  pub fn vertices_of(&self, element: usize) -> &[u32] {
    &self.vertices[self.vertex_offsets[element] as usize..self.vertex_offsets[element + 1] as usize]
  }

  /// The largest distinct vertex count of any element.
  pub fn max_element_vertices(&self) -> usize {
    self.vertex_offsets.windows(2).map(|w| (w[1] - w[0]) as usize).max().unwrap_or(0)
  }

  /// The largest and smallest corner counts of any element.
  pub fn element_corner_range(&self) -> (usize, usize) {
    let mut range = (0, usize::MAX);
    for w in self.corner_offsets.windows(2) {
      let count = (w[1] - w[0]) as usize;
      range.0 = range.0.max(count);
      range.1 = range.1.min(count);
    }
    if range.1 == usize::MAX {
      range.1 = 0;
    }
    range
  }
}

/// The cluster upper bound for arbitrary elements.
/// Every closed cluster failed to take one more element, so it holds at least
/// `per_cluster` corners; the last cluster holds at least one.
/// param elements: The elements.
/// param limits: The cluster ceilings; every element must fit alone.
/// return: The maximum number of clusters the builder can produce.
pub(crate) fn clusters_bound(elements: &HalaClusterElements, limits: &HalaClusterLimits) -> usize {
  if elements.is_empty() {
    return 0;
  }
  let (max_corners, min_corners) = elements.element_corner_range();
  let by_vertices = (limits.max_vertices + 1).saturating_sub(elements.max_element_vertices()).max(1);
  let by_indices = (limits.max_indices + 1).saturating_sub(max_corners).max(1);
  let by_elements = (limits.max_elements * min_corners).max(1);
  let per_cluster = by_vertices.min(by_indices).min(by_elements);
  elements.num_of_corners().div_ceil(per_cluster).min(elements.len())
}

/// A cluster as ranges into the shared scratch buffers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct HalaClusterDesc {
  pub vertex_offset: u32,
  pub vertex_count: u32,
  pub index_offset: u32,
  pub index_count: u32,
  pub element_offset: u32,
  pub element_count: u32,
}

/// The shared output buffers of one build.
#[derive(Debug, Default)]
pub(crate) struct HalaClusterScratch {
  pub clusters: Vec<HalaClusterDesc>,
  pub vertices: Vec<u32>,
  pub indices: Vec<u32>,
  pub elements: Vec<u32>,
}

impl HalaClusterScratch {
  /// Allocate the scratch buffers for a build.
  /// The vertex and index buffers are sized to the bound, capped at the input size.
  /// param bound: The cluster bound.
  /// param elements: The elements.
  /// param limits: The cluster ceilings.
  /// return: The scratch buffers.
  pub fn with_bound(bound: usize, elements: &HalaClusterElements, limits: &HalaClusterLimits) -> Self {
    let num_of_corners = elements.num_of_corners();
    Self {
      clusters: Vec::with_capacity(bound),
      vertices: Vec::with_capacity((bound * limits.max_vertices).min(num_of_corners)),
      indices: Vec::with_capacity((bound * limits.max_indices).min(num_of_corners)),
      elements: Vec::with_capacity(elements.len()),
    }
  }

  pub fn vertices_of(&self, desc: &HalaClusterDesc) -> &[u32] {
    &self.vertices[desc.vertex_offset as usize..(desc.vertex_offset + desc.vertex_count) as usize]
  }

  pub fn indices_of(&self, desc: &HalaClusterDesc) -> &[u32] {
    &self.indices[desc.index_offset as usize..(desc.index_offset + desc.index_count) as usize]
  }

  pub fn elements_of(&self, desc: &HalaClusterDesc) -> &[u32] {
    &self.elements[desc.element_offset as usize..(desc.element_offset + desc.element_count) as usize]
  }
}

/// Vertex to element adjacency in compressed rows.
struct HalaAdjacency {
  offsets: Vec<u32>,
  data: Vec<u32>,
  live: Vec<u32>,
}

impl HalaAdjacency {
  fn new(elements: &HalaClusterElements) -> Self {
    let mut live = vec![0u32; elements.num_of_vertices];
    for &v in elements.vertices.iter() {
      live[v as usize] += 1;
    }
    let mut offsets = Vec::with_capacity(live.len() + 1);
    let mut sum = 0u32;
    offsets.push(0);
    for &count in live.iter() {
      sum += count;
      offsets.push(sum);
    }
    let mut fill = offsets.clone();
    let mut data = vec![0u32; sum as usize];
    for element in 0..elements.len() {
      for &v in elements.vertices_of(element) {
        data[fill[v as usize] as usize] = element as u32;
        fill[v as usize] += 1;
      }
    }
    Self { offsets, data, live }
  }

  fn neighbors(&self, vertex: u32) -> &[u32] {
    &self.data[self.offsets[vertex as usize] as usize..self.offsets[vertex as usize + 1] as usize]
  }
}

/// The state of the cluster being grown.
struct HalaClusterState {
  desc: HalaClusterDesc,
  centroid_sum: Vec3,
  normal_sum: Vec3,
}

impl HalaClusterState {
  fn new(scratch: &HalaClusterScratch) -> Self {
    Self {
      desc: HalaClusterDesc {
        vertex_offset: scratch.vertices.len() as u32,
        index_offset: scratch.indices.len() as u32,
        element_offset: scratch.elements.len() as u32,
        ..Default::default()
      },
      centroid_sum: Vec3::ZERO,
      normal_sum: Vec3::ZERO,
    }
  }

  fn is_empty(&self) -> bool {
    self.desc.element_count == 0
  }

  fn center(&self) -> Vec3 {
    self.centroid_sum / self.desc.element_count.max(1) as f32
  }
}

/// The greedy cluster builder shared by the meshlet and group dividers.
struct HalaClusterBuilder<'a> {
  elements: &'a HalaClusterElements,
  limits: HalaClusterLimits,
  order: HalaClusterOrder,
  adjacency: HalaAdjacency,
  kdtree: Option<HalaKdTree>,
  emitted: Vec<bool>,
  used: Vec<u32>,
  expected_radius: f32,
  next_unemitted: usize,
}

impl<'a> HalaClusterBuilder<'a> {
  fn new(elements: &'a HalaClusterElements, limits: HalaClusterLimits, order: HalaClusterOrder) -> Self {
    let average_area = elements.areas.iter().sum::<f32>() / elements.len().max(1) as f32;
    let expected_radius = (average_area * limits.max_elements as f32).sqrt() * 0.5;
    let kdtree = match order {
      HalaClusterOrder::Locality => Some(HalaKdTree::new(&elements.centroids)),
      HalaClusterOrder::Sequential => None,
    };
    Self {
      elements,
      limits,
      order,
      adjacency: HalaAdjacency::new(elements),
      kdtree,
      emitted: vec![false; elements.len()],
      used: vec![NONE; elements.num_of_vertices],
      expected_radius: if expected_radius.is_finite() && expected_radius > 0.0 { expected_radius } else { 1.0 },
      next_unemitted: 0,
    }
  }

  fn score(&self, state: &HalaClusterState, element: usize) -> f32 {
    let distance = self.elements.centroids[element].distance(state.center());
    let axis = state.normal_sum.normalize_or_zero();
    let spread = self.elements.normals[element].dot(axis);
    let weight = self.limits.cone_weight;
    let cone = (1.0 - spread * weight).max(1e-3);
    (1.0 + distance / self.expected_radius * (1.0 - weight)) * cone
  }

  fn extra_vertices(&self, element: usize) -> usize {
    self.elements.vertices_of(element).iter().filter(|&&v| self.used[v as usize] == NONE).count()
  }

  /// Pick the best element adjacent to the cluster.
  /// Elements adding no vertex come first, then elements finishing off a vertex, then fewer new vertices,
  /// then the lowest spatial score.
  fn best_neighbor(&self, state: &HalaClusterState, scratch: &HalaClusterScratch) -> Option<usize> {
    let mut best: Option<(usize, usize, f32)> = None;
    for &v in scratch.vertices_of(&state.desc) {
      for &element in self.adjacency.neighbors(v) {
        let element = element as usize;
        if self.emitted[element] {
          continue;
        }
        let mut priority = self.extra_vertices(element);
        if priority != 0 {
          if self.elements.vertices_of(element).iter().any(|&v| self.adjacency.live[v as usize] == 1) {
            priority = 0;
          }
          priority += 1;
        }
        if let Some((_, best_priority, _)) = best {
          if priority > best_priority {
            continue;
          }
        }
        let score = self.score(state, element);
        let better = match best {
          None => true,
          Some((best_element, best_priority, best_score)) => priority < best_priority
            || score < best_score
            || (score == best_score && element < best_element),
        };
        if better {
          best = Some((element, priority, score));
        }
      }
    }
    best.map(|(element, _, _)| element)
  }

  fn first_unemitted(&mut self) -> Option<usize> {
    while self.next_unemitted < self.emitted.len() && self.emitted[self.next_unemitted] {
      self.next_unemitted += 1;
    }
    if self.next_unemitted < self.emitted.len() {
      Some(self.next_unemitted)
    } else {
      None
    }
  }

  fn next_element(&mut self, state: &HalaClusterState, scratch: &HalaClusterScratch) -> Option<usize> {
    if self.order == HalaClusterOrder::Sequential || state.is_empty() {
      return self.first_unemitted();
    }
    if let Some(element) = self.best_neighbor(state, scratch) {
      return Some(element);
    }
    let nearest = self.kdtree.as_ref()
      .and_then(|kdtree| kdtree.nearest(&self.elements.centroids, &self.emitted, state.center()));
    nearest.or_else(|| self.first_unemitted())
  }

  fn fits(&self, state: &HalaClusterState, element: usize) -> bool {
    state.desc.vertex_count as usize + self.extra_vertices(element) <= self.limits.max_vertices
      && state.desc.index_count as usize + self.elements.corners_of(element).len() <= self.limits.max_indices
      && state.desc.element_count as usize + 1 <= self.limits.max_elements
  }

  fn append(&mut self, state: &mut HalaClusterState, scratch: &mut HalaClusterScratch, element: usize) {
    for &v in self.elements.vertices_of(element) {
      if self.used[v as usize] == NONE {
        self.used[v as usize] = state.desc.vertex_count;
        scratch.vertices.push(v);
        state.desc.vertex_count += 1;
      }
      self.adjacency.live[v as usize] -= 1;
    }
    for &corner in self.elements.corners_of(element) {
      scratch.indices.push(self.used[corner as usize]);
    }
    scratch.elements.push(element as u32);
    state.desc.index_count += self.elements.corners_of(element).len() as u32;
    state.desc.element_count += 1;
    state.centroid_sum += self.elements.centroids[element];
    state.normal_sum += self.elements.normals[element];

    self.emitted[element] = true;
    if let Some(kdtree) = self.kdtree.as_mut() {
      kdtree.remove(element);
    }
  }

  fn close(&mut self, state: &HalaClusterState, scratch: &mut HalaClusterScratch, bound: usize) {
    debug_assert!(scratch.clusters.len() < bound, "cluster bound {} exceeded", bound);
    for &v in scratch.vertices_of(&state.desc) {
      self.used[v as usize] = NONE;
    }
    scratch.clusters.push(state.desc);
  }
}

/// Build clusters over the elements.
/// The scratch buffers are allocated once from the bound and never grow during the build.
/// param elements: The elements; each must fit into an empty cluster.
/// param limits: The cluster ceilings.
/// param order: The element selection order.
/// param bound: The cluster bound of the input.
/// return: The clusters as ranges into the scratch buffers.
pub(crate) fn build_clusters(
  elements: &HalaClusterElements,
  limits: HalaClusterLimits,
  order: HalaClusterOrder,
  bound: usize,
) -> HalaClusterScratch {
  let mut scratch = HalaClusterScratch::with_bound(bound, elements, &limits);
  if elements.is_empty() {
    return scratch;
  }

  let mut builder = HalaClusterBuilder::new(elements, limits, order);
  let mut state = HalaClusterState::new(&scratch);
  while let Some(element) = builder.next_element(&state, &scratch) {
    if !state.is_empty() && !builder.fits(&state, element) {
      builder.close(&state, &mut scratch, bound);
      state = HalaClusterState::new(&scratch);
    }
    builder.append(&mut state, &mut scratch, element);
  }
  if !state.is_empty() {
    builder.close(&state, &mut scratch, bound);
  }
  debug_assert!(scratch.elements.len() == elements.len(), "{} of {} elements placed", scratch.elements.len(), elements.len());
  scratch
}
