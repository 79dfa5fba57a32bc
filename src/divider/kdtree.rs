use std::cmp::Ordering;

use glam::Vec3;

const LEAF_SIZE: usize = 8;
const NONE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct HalaKdNode {
  split: f32,
  // 0..3 for split planes, 3 for leaves.
  axis: u8,
  // Leaf: range into `order`. Split: `start` is unused, the left child follows the node.
  start: u32,
  count: u32,
  right: u32,
  parent: u32,
}

/// A kd-tree over element centroids supporting removal.
/// Used to find the closest unassigned element once a cluster has no neighbors left.
pub(crate) struct HalaKdTree {
  nodes: Vec<HalaKdNode>,
  order: Vec<u32>,
  alive: Vec<u32>,
  leaf_of: Vec<u32>,
}

impl HalaKdTree {
  /// Build the tree.
  /// param points: One point per element.
  /// return: The tree.
  pub fn new(points: &[Vec3]) -> Self {
    let mut tree = Self {
      nodes: Vec::with_capacity(points.len() / LEAF_SIZE * 2 + 1),
      order: (0..points.len() as u32).collect(),
      alive: Vec::new(),
      leaf_of: vec![NONE; points.len()],
    };
    if !points.is_empty() {
      tree.build(points, 0, points.len(), NONE);
    }
    tree.alive = tree.nodes.iter().map(|node| node.count).collect();
    tree
  }

  fn build(&mut self, points: &[Vec3], start: usize, end: usize, parent: u32) -> u32 {
    let node_index = self.nodes.len() as u32;
    let count = end - start;

    let split = if count > LEAF_SIZE {
      self.choose_split(points, start, end)
    } else {
      None
    };

    match split {
      Some((axis, split, middle)) => {
        self.nodes.push(HalaKdNode { split, axis, start: start as u32, count: count as u32, right: NONE, parent });
        self.build(points, start, middle, node_index);
        let right = self.build(points, middle, end, node_index);
        self.nodes[node_index as usize].right = right;
      },
      None => {
        self.nodes.push(HalaKdNode { split: 0.0, axis: 3, start: start as u32, count: count as u32, right: NONE, parent });
        for &element in self.order[start..end].iter() {
          self.leaf_of[element as usize] = node_index;
        }
      },
    }
    node_index
  }

  /// Split at the mean of the widest axis.
  /// return: The axis, the split value and the partition point, none if the points can not be split.
  fn choose_split(&mut self, points: &[Vec3], start: usize, end: usize) -> Option<(u8, f32, usize)> {
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    let mut sum = Vec3::ZERO;
    for &element in self.order[start..end].iter() {
      let p = points[element as usize];
      min = min.min(p);
      max = max.max(p);
      sum += p;
    }
    let extent = max - min;
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
      0
    } else if extent.y >= extent.z {
      1
    } else {
      2
    };
    let split = sum[axis] / (end - start) as f32;

    // Stable partition keeps the build deterministic.
    let (left, right): (Vec<u32>, Vec<u32>) = self.order[start..end].iter()
      .partition(|&&element| points[element as usize][axis] < split);
    if left.is_empty() || right.is_empty() {
      return None;
    }
    let middle = start + left.len();
    self.order[start..middle].copy_from_slice(&left);
    self.order[middle..end].copy_from_slice(&right);
    Some((axis as u8, split, middle))
  }

  /// Remove an element from future queries.
  /// param element: The element index.
  pub fn remove(&mut self, element: usize) {
    let mut node = self.leaf_of[element];
    while node != NONE {
      self.alive[node as usize] -= 1;
      node = self.nodes[node as usize].parent;
    }
  }

  /// Find the closest element that is not removed.
  /// param points: The points the tree was built from.
  /// param removed: The removed flag per element.
  /// param target: The query point.
  /// return: The closest element, none if all are removed.
  pub fn nearest(&self, points: &[Vec3], removed: &[bool], target: Vec3) -> Option<usize> {
    if self.nodes.is_empty() {
      return None;
    }
    let mut best = (NONE, f32::INFINITY);
    self.nearest_in(0, points, removed, target, &mut best);
    if best.0 == NONE {
      None
    } else {
      Some(best.0 as usize)
    }
  }

  fn nearest_in(&self, node_index: u32, points: &[Vec3], removed: &[bool], target: Vec3, best: &mut (u32, f32)) {
    if self.alive[node_index as usize] == 0 {
      return;
    }
    let node = &self.nodes[node_index as usize];
    if node.axis == 3 {
      let start = node.start as usize;
      for &element in self.order[start..start + node.count as usize].iter() {
        if removed[element as usize] {
          continue;
        }
        // NaN sorts above infinity, so any live element beats an empty best.
        let distance = points[element as usize].distance_squared(target);
        let better = match distance.total_cmp(&best.1) {
          Ordering::Less => true,
          Ordering::Equal => element < best.0,
          Ordering::Greater => best.0 == NONE,
        };
        if better {
          *best = (element, distance);
        }
      }
      return;
    }

    let delta = target[node.axis as usize] - node.split;
    let (first, second) = if delta < 0.0 {
      (node_index + 1, node.right)
    } else {
      (node.right, node_index + 1)
    };
    self.nearest_in(first, points, removed, target, best);
    if best.0 == NONE || (delta * delta).total_cmp(&best.1) != Ordering::Greater {
      self.nearest_in(second, points, removed, target, best);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nearest_skips_removed_elements() {
    let points = (0..40).map(|i| Vec3::new(i as f32, (i % 3) as f32, 0.0)).collect::<Vec<_>>();
    let mut removed = vec![false; points.len()];
    let mut tree = HalaKdTree::new(&points);

    assert_eq!(tree.nearest(&points, &removed, Vec3::new(10.2, 1.0, 0.0)), Some(10));

    removed[10] = true;
    tree.remove(10);
    let next = tree.nearest(&points, &removed, Vec3::new(10.2, 1.0, 0.0)).unwrap();
    assert!(next == 9 || next == 11);
  }

  #[test]
  fn nearest_matches_brute_force() {
    let points = (0..100)
      .map(|i| {
        let t = i as f32 * 0.37;
        Vec3::new(t.sin() * 10.0, t.cos() * 7.0, (t * 3.0).sin())
      })
      .collect::<Vec<_>>();
    let mut removed = vec![false; points.len()];
    let mut tree = HalaKdTree::new(&points);
    for element in (0..100).step_by(3) {
      removed[element] = true;
      tree.remove(element);
    }

    let target = Vec3::new(1.0, -2.0, 0.5);
    let expected = (0..points.len())
      .filter(|&i| !removed[i])
      .min_by(|&a, &b| points[a].distance_squared(target).total_cmp(&points[b].distance_squared(target)))
      .unwrap();
    assert_eq!(tree.nearest(&points, &removed, target), Some(expected));
  }

  #[test]
  fn overflowing_and_nan_distances_still_find_an_element() {
    let points = vec![Vec3::ZERO, Vec3::splat(2e19), Vec3::new(f32::NAN, 0.0, 0.0)];
    let mut removed = vec![false; points.len()];
    let mut tree = HalaKdTree::new(&points);
    removed[0] = true;
    tree.remove(0);
    assert_eq!(tree.nearest(&points, &removed, Vec3::ZERO), Some(1));
    removed[1] = true;
    tree.remove(1);
    assert_eq!(tree.nearest(&points, &removed, Vec3::ZERO), Some(2));
    removed[2] = true;
    tree.remove(2);
    assert_eq!(tree.nearest(&points, &removed, Vec3::ZERO), None);
  }

  #[test]
  fn identical_points_become_one_leaf() {
    let points = vec![Vec3::ONE; 20];
    let removed = vec![false; points.len()];
    let tree = HalaKdTree::new(&points);
    assert_eq!(tree.nearest(&points, &removed, Vec3::ZERO), Some(0));
  }
}
