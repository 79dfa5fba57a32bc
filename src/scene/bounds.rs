use glam::Vec3;

/// Axis-aligned bounding box (AABB) of a meshlet or a meshlet group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalaBounds {
  pub min: Vec3,
  pub max: Vec3,
}

/// Implementation of HalaBounds.
impl HalaBounds {
  /// Create the bounds of a single point.
  /// param point: The point.
  /// return: The bounds.
  pub fn from_point(point: Vec3) -> Self {
    Self { min: point, max: point }
  }

  /// Create the bounds of a point set.
  /// param points: The points.
  /// return: The bounds, none if there is no point.
  pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
    let mut iter = points.into_iter();
    let mut bounds = Self::from_point(iter.next()?);
    for point in iter {
      bounds.encapsulate_point(point);
    }
    Some(bounds)
  }

  /// Grows the AABB to include the given point.
  /// param point: The point to include.
  pub fn encapsulate_point(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_points_grows_to_every_point() {
    let mut bounds = HalaBounds::from_point(Vec3::ZERO);
    bounds.encapsulate_point(Vec3::new(2.0, -1.0, 0.5));
    assert_eq!(bounds.min, Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(bounds.max, Vec3::new(2.0, 0.0, 0.5));

    let bounds = HalaBounds::from_points([Vec3::splat(4.0), Vec3::splat(6.0), Vec3::splat(5.0)]).unwrap();
    assert_eq!((bounds.min, bounds.max), (Vec3::splat(4.0), Vec3::splat(6.0)));
    assert!(HalaBounds::from_points(std::iter::empty()).is_none());
  }
}
