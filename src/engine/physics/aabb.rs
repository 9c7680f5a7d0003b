// Axis-aligned bounding boxes and ray cast inputs

use glam::Vec2;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub lower: Vec2,
    pub upper: Vec2,
}

impl Aabb {
    pub fn new(lower: Vec2, upper: Vec2) -> Self {
        Self { lower, upper }
    }

    /// Box centred on `center` with the given half extents
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            lower: center - half_extents,
            upper: center + half_extents,
        }
    }

    /// Perimeter, used as the surface-area heuristic in the tree
    pub fn perimeter(&self) -> f32 {
        let d = self.upper - self.lower;
        2.0 * (d.x + d.y)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    /// Grow the box by `margin` on every side
    pub fn fattened(&self, margin: f32) -> Aabb {
        let r = Vec2::splat(margin);
        Aabb {
            lower: self.lower - r,
            upper: self.upper + r,
        }
    }

    /// Whether `other` lies completely inside this box
    pub fn contains(&self, other: &Aabb) -> bool {
        self.lower.x <= other.lower.x
            && self.lower.y <= other.lower.y
            && other.upper.x <= self.upper.x
            && other.upper.y <= self.upper.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        self.lower.x <= p.x && p.x <= self.upper.x && self.lower.y <= p.y && p.y <= self.upper.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        let d1 = other.lower - self.upper;
        let d2 = self.lower - other.upper;
        !(d1.x > 0.0 || d1.y > 0.0 || d2.x > 0.0 || d2.y > 0.0)
    }

    /// Slab test, returns the entry fraction along `input` if hit
    pub fn ray_cast(&self, input: &RayCastInput) -> Option<f32> {
        let mut tmin = f32::MIN;
        let mut tmax = f32::MAX;

        let p = input.p1;
        let d = input.p2 - input.p1;

        for axis in 0..2 {
            let (pi, di, lo, hi) = (p[axis], d[axis], self.lower[axis], self.upper[axis]);
            if di.abs() < f32::EPSILON {
                if pi < lo || hi < pi {
                    return None;
                }
            } else {
                let inv_d = 1.0 / di;
                let mut t1 = (lo - pi) * inv_d;
                let mut t2 = (hi - pi) * inv_d;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                tmin = tmin.max(t1);
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return None;
                }
            }
        }

        if tmin < 0.0 || input.max_fraction < tmin {
            return None;
        }
        Some(tmin)
    }
}

/// Ray from `p1` towards `p2`, hits accepted up to `max_fraction` of the segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastInput {
    pub p1: Vec2,
    pub p2: Vec2,
    pub max_fraction: f32,
}

/// Ray hit: surface normal and fraction along the input segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastOutput {
    pub normal: Vec2,
    pub fraction: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_and_contains() {
        let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
        let b = Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 3.0));
        let c = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0));

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.union(&b).contains(&a));
        assert!(!a.contains(&b));
        assert!(a.contains_point(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_touching_boxes_overlap() {
        let a = Aabb::new(Vec2::ZERO, Vec2::ONE);
        let b = Aabb::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));
        assert!(a.overlaps(&b), "Shared edges count as overlap");
    }

    #[test]
    fn test_perimeter_and_fatten() {
        let a = Aabb::new(Vec2::ZERO, Vec2::new(2.0, 1.0));
        assert_eq!(a.perimeter(), 6.0);
        let fat = a.fattened(0.5);
        assert_eq!(fat.lower, Vec2::new(-0.5, -0.5));
        assert_eq!(fat.upper, Vec2::new(2.5, 1.5));
    }

    #[test]
    fn test_ray_cast() {
        let a = Aabb::new(Vec2::new(1.0, -1.0), Vec2::new(2.0, 1.0));
        let input = RayCastInput {
            p1: Vec2::new(0.0, 0.0),
            p2: Vec2::new(4.0, 0.0),
            max_fraction: 1.0,
        };
        assert_eq!(a.ray_cast(&input), Some(0.25));

        let miss = RayCastInput {
            p1: Vec2::new(0.0, 2.0),
            p2: Vec2::new(4.0, 2.0),
            max_fraction: 1.0,
        };
        assert_eq!(a.ray_cast(&miss), None);
    }
}
