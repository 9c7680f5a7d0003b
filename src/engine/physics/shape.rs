// Collision geometry: two-point edges and convex polygons

use glam::Vec2;

use super::aabb::{Aabb, RayCastInput, RayCastOutput};
use super::config::{MAX_POLYGON_VERTICES, POLYGON_RADIUS};
use super::error::{invalid, PhysicsResult};
use crate::core::math::{cross, cross_vs, is_finite_vec, Rot, Transform};

/// Points closer than this are welded together when building a hull
const WELD_DISTANCE: f32 = 0.0025;

/// Mass contribution of a shape, inertia is about the body origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassData {
    pub mass: f32,
    pub center: Vec2,
    pub inertia: f32,
}

/// Discriminant for quick dispatch in logs and filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Edge,
    Polygon,
}

/// Line segment between two local-space points, collides on both sides
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeShape {
    vertices: [Vec2; 2],
    normals: [Vec2; 2],
    radius: f32,
}

impl EdgeShape {
    pub fn new(v1: Vec2, v2: Vec2) -> PhysicsResult<Self> {
        if !is_finite_vec(v1) || !is_finite_vec(v2) {
            return Err(invalid("edge vertices must be finite"));
        }
        let e = v2 - v1;
        if e.length_squared() <= WELD_DISTANCE * WELD_DISTANCE {
            return Err(invalid("edge has zero length"));
        }
        let n = cross_vs(e, 1.0).normalize();
        Ok(Self {
            vertices: [v1, v2],
            normals: [n, -n],
            radius: POLYGON_RADIUS,
        })
    }

    pub fn v1(&self) -> Vec2 {
        self.vertices[0]
    }

    pub fn v2(&self) -> Vec2 {
        self.vertices[1]
    }

    /// Normal on the right-hand side of `v1 -> v2`
    pub fn normal(&self) -> Vec2 {
        self.normals[0]
    }

    fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inv(input.p1);
        let p2 = xf.apply_inv(input.p2);
        let d = p2 - p1;

        let [v1, v2] = self.vertices;
        let normal = self.normals[0];

        let numerator = normal.dot(v1 - p1);
        let denominator = normal.dot(d);
        if denominator == 0.0 {
            return None;
        }

        let t = numerator / denominator;
        if t < 0.0 || input.max_fraction < t {
            return None;
        }

        let q = p1 + t * d;
        let r = v2 - v1;
        let rr = r.dot(r);
        let s = (q - v1).dot(r) / rr;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        let facing = if numerator > 0.0 { -normal } else { normal };
        Some(RayCastOutput {
            normal: xf.q.apply(facing),
            fraction: t,
        })
    }
}

/// Convex polygon with counter-clockwise winding and outward edge normals
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonShape {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
    centroid: Vec2,
    radius: f32,
}

impl PolygonShape {
    /// Build the convex hull of `points`
    ///
    /// Near-duplicate points are welded; fewer than three hull points or a
    /// zero-area hull is rejected.
    pub fn new(points: &[Vec2]) -> PhysicsResult<Self> {
        if points.len() < 3 {
            return Err(invalid("polygon needs at least 3 points"));
        }
        if points.len() > MAX_POLYGON_VERTICES {
            return Err(invalid(format!(
                "polygon has {} points, at most {} are supported",
                points.len(),
                MAX_POLYGON_VERTICES
            )));
        }
        if points.iter().any(|p| !is_finite_vec(*p)) {
            return Err(invalid("polygon points must be finite"));
        }

        let hull = compute_hull(points)?;
        Self::from_hull(hull)
    }

    /// Axis-aligned box centred on the body origin
    pub fn new_box(half_width: f32, half_height: f32) -> PhysicsResult<Self> {
        Self::new_oriented_box(half_width, half_height, Vec2::ZERO, 0.0)
    }

    /// Box with the given half extents, centre and rotation in body space
    pub fn new_oriented_box(
        half_width: f32,
        half_height: f32,
        center: Vec2,
        angle: f32,
    ) -> PhysicsResult<Self> {
        if !(half_width.is_finite() && half_height.is_finite() && angle.is_finite())
            || !is_finite_vec(center)
        {
            return Err(invalid("box dimensions must be finite"));
        }
        if half_width <= 0.0 || half_height <= 0.0 {
            return Err(invalid("box half extents must be positive"));
        }

        let xf = Transform {
            p: center,
            q: Rot::new(angle),
        };
        let corners = [
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, -half_height),
            Vec2::new(half_width, half_height),
            Vec2::new(-half_width, half_height),
        ];
        let normals = [
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 0.0),
        ];

        Ok(Self {
            vertices: corners.iter().map(|v| xf.apply(*v)).collect(),
            normals: normals.iter().map(|n| xf.q.apply(*n)).collect(),
            centroid: center,
            radius: POLYGON_RADIUS,
        })
    }

    fn from_hull(vertices: Vec<Vec2>) -> PhysicsResult<Self> {
        let count = vertices.len();
        let mut normals = Vec::with_capacity(count);
        for i in 0..count {
            let edge = vertices[(i + 1) % count] - vertices[i];
            if edge.length_squared() <= f32::EPSILON * f32::EPSILON {
                return Err(invalid("polygon has a zero-length edge"));
            }
            normals.push(cross_vs(edge, 1.0).normalize());
        }

        let centroid = compute_centroid(&vertices)?;
        Ok(Self {
            vertices,
            normals,
            centroid,
            radius: POLYGON_RADIUS,
        })
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    /// Signed area of the hull
    pub fn area(&self) -> f32 {
        let s = self.vertices[0];
        let mut area = 0.0;
        for i in 1..self.vertices.len() - 1 {
            area += 0.5 * cross(self.vertices[i] - s, self.vertices[i + 1] - s);
        }
        area
    }

    fn compute_mass(&self, density: f32) -> MassData {
        // Triangle fan from the first vertex keeps the sums well conditioned
        let s = self.vertices[0];
        let inv3 = 1.0 / 3.0;
        let count = self.vertices.len();

        let mut center = Vec2::ZERO;
        let mut area = 0.0;
        let mut inertia = 0.0;

        for i in 0..count {
            let e1 = self.vertices[i] - s;
            let e2 = self.vertices[(i + 1) % count] - s;
            let d = cross(e1, e2);

            let triangle_area = 0.5 * d;
            area += triangle_area;
            center += triangle_area * inv3 * (e1 + e2);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * inv3 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        center *= 1.0 / area;
        let world_center = center + s;

        // Inertia about the fan origin, shifted to the centroid then to the body origin
        let mut inertia = density * inertia;
        inertia += mass * (world_center.dot(world_center) - center.dot(center));

        MassData {
            mass,
            center: world_center,
            inertia,
        }
    }

    fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let local = xf.apply_inv(p);
        self.vertices
            .iter()
            .zip(&self.normals)
            .all(|(v, n)| n.dot(local - *v) <= 0.0)
    }

    fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inv(input.p1);
        let p2 = xf.apply_inv(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0f32;
        let mut upper = input.max_fraction;
        let mut index = None;

        for (i, (v, n)) in self.vertices.iter().zip(&self.normals).enumerate() {
            let numerator = n.dot(*v - p1);
            let denominator = n.dot(d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else if denominator < 0.0 && numerator < lower * denominator {
                lower = numerator / denominator;
                index = Some(i);
            } else if denominator > 0.0 && numerator < upper * denominator {
                upper = numerator / denominator;
            }

            if upper < lower {
                return None;
            }
        }

        index.map(|i| RayCastOutput {
            normal: xf.q.apply(self.normals[i]),
            fraction: lower,
        })
    }
}

/// Collision geometry attached to a fixture
///
/// A closed set of primitives; the narrow phase matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Edge(EdgeShape),
    Polygon(PolygonShape),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Edge(_) => ShapeKind::Edge,
            Shape::Polygon(_) => ShapeKind::Polygon,
        }
    }

    /// Collision skin thickness
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Edge(edge) => edge.radius,
            Shape::Polygon(poly) => poly.radius,
        }
    }

    /// Vertices and outward normals, an edge is a two-sided, two-vertex hull
    pub fn hull(&self) -> (&[Vec2], &[Vec2]) {
        match self {
            Shape::Edge(edge) => (&edge.vertices, &edge.normals),
            Shape::Polygon(poly) => (&poly.vertices, &poly.normals),
        }
    }

    /// World-space bounding box including the skin radius
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let (vertices, _) = self.hull();
        let first = xf.apply(vertices[0]);
        let (lower, upper) = vertices[1..]
            .iter()
            .map(|v| xf.apply(*v))
            .fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Aabb::new(lower, upper).fattened(self.radius())
    }

    /// Mass properties for the given density
    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Edge(edge) => MassData {
                mass: 0.0,
                center: 0.5 * (edge.vertices[0] + edge.vertices[1]),
                inertia: 0.0,
            },
            Shape::Polygon(poly) => poly.compute_mass(density),
        }
    }

    /// Whether a world point lies inside the shape; edges have no interior
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        match self {
            Shape::Edge(_) => false,
            Shape::Polygon(poly) => poly.test_point(xf, p),
        }
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        match self {
            Shape::Edge(edge) => edge.ray_cast(input, xf),
            Shape::Polygon(poly) => poly.ray_cast(input, xf),
        }
    }
}

impl From<EdgeShape> for Shape {
    fn from(edge: EdgeShape) -> Self {
        Shape::Edge(edge)
    }
}

impl From<PolygonShape> for Shape {
    fn from(poly: PolygonShape) -> Self {
        Shape::Polygon(poly)
    }
}

/// Gift-wrapping hull, counter-clockwise starting from the right-most point
fn compute_hull(points: &[Vec2]) -> PhysicsResult<Vec<Vec2>> {
    let mut ps: Vec<Vec2> = Vec::with_capacity(points.len());
    for p in points {
        let unique = ps
            .iter()
            .all(|q| p.distance_squared(*q) >= WELD_DISTANCE * WELD_DISTANCE);
        if unique {
            ps.push(*p);
        }
    }

    let n = ps.len();
    if n < 3 {
        return Err(invalid("polygon is degenerate: points are too close together"));
    }

    let mut i0 = 0;
    for i in 1..n {
        let (x, x0) = (ps[i].x, ps[i0].x);
        if x > x0 || (x == x0 && ps[i].y < ps[i0].y) {
            i0 = i;
        }
    }

    let mut hull: Vec<usize> = Vec::with_capacity(n);
    let mut ih = i0;
    loop {
        if hull.len() > n {
            return Err(invalid("polygon hull did not close"));
        }
        hull.push(ih);

        let mut ie = 0;
        for j in 1..n {
            if ie == ih {
                ie = j;
                continue;
            }
            let r = ps[ie] - ps[ih];
            let v = ps[j] - ps[ih];
            let c = cross(r, v);
            if c < 0.0 || (c == 0.0 && v.length_squared() > r.length_squared()) {
                ie = j;
            }
        }

        ih = ie;
        if ie == i0 {
            break;
        }
    }

    if hull.len() < 3 {
        return Err(invalid("polygon is degenerate: points are collinear"));
    }

    Ok(hull.into_iter().map(|i| ps[i]).collect())
}

fn compute_centroid(vertices: &[Vec2]) -> PhysicsResult<Vec2> {
    let origin = vertices[0];
    let inv3 = 1.0 / 3.0;
    let mut c = Vec2::ZERO;
    let mut area = 0.0;

    for i in 1..vertices.len() - 1 {
        let e1 = vertices[i] - origin;
        let e2 = vertices[i + 1] - origin;
        let a = 0.5 * cross(e1, e2);
        c += a * inv3 * (e1 + e2);
        area += a;
    }

    if area <= f32::EPSILON {
        return Err(invalid("polygon is degenerate: zero area"));
    }
    Ok(c / area + origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::error::PhysicsError;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_vertices_and_normals() {
        let poly = PolygonShape::new_box(0.5, 0.5).unwrap();
        assert_eq!(poly.vertices().len(), 4);
        assert_eq!(poly.vertices()[0], Vec2::new(-0.5, -0.5));
        assert_eq!(poly.normals()[0], Vec2::new(0.0, -1.0));
        assert_relative_eq!(poly.area(), 1.0);
        assert_eq!(poly.centroid(), Vec2::ZERO);
    }

    #[test]
    fn test_hull_orders_points_counter_clockwise() {
        // Shuffled square with an interior point
        let points = [
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, -1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(-1.0, 1.0),
        ];
        let poly = PolygonShape::new(&points).unwrap();
        assert_eq!(poly.vertices().len(), 4, "Interior point must be dropped");
        assert!(poly.area() > 0.0, "Hull must wind counter-clockwise");
        for (v, n) in poly.vertices().iter().zip(poly.normals()) {
            assert!(n.dot(-*v) < 0.0, "Normals must point outward");
        }
    }

    #[test]
    fn test_degenerate_polygons_rejected() {
        let collinear = [Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)];
        assert!(matches!(
            PolygonShape::new(&collinear),
            Err(PhysicsError::InvalidConfiguration(_))
        ));

        let welded = [Vec2::ZERO, Vec2::new(0.0001, 0.0), Vec2::new(0.0, 0.0001)];
        assert!(PolygonShape::new(&welded).is_err());

        assert!(PolygonShape::new_box(0.0, 1.0).is_err());
        assert!(PolygonShape::new(&[Vec2::ZERO; 9]).is_err());
    }

    #[test]
    fn test_edge_rejects_zero_length() {
        assert!(EdgeShape::new(Vec2::ONE, Vec2::ONE).is_err());
        let edge = EdgeShape::new(Vec2::new(-40.0, 0.0), Vec2::new(40.0, 0.0)).unwrap();
        assert_eq!(edge.normal(), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_box_mass() {
        let shape = Shape::from(PolygonShape::new_box(0.5, 0.5).unwrap());
        let md = shape.compute_mass(2.0);
        assert_relative_eq!(md.mass, 2.0, epsilon = 1e-5);
        assert_relative_eq!(md.center.x, 0.0, epsilon = 1e-6);
        // m * (w^2 + h^2) / 12
        assert_relative_eq!(md.inertia, 2.0 * 2.0 / 12.0, epsilon = 1e-5);
    }

    #[test]
    fn test_offset_box_mass_uses_parallel_axis() {
        let shape = Shape::from(
            PolygonShape::new_oriented_box(0.5, 0.5, Vec2::new(2.0, 0.0), 0.0).unwrap(),
        );
        let md = shape.compute_mass(1.0);
        assert_relative_eq!(md.center.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(md.inertia, 1.0 / 6.0 + 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_edge_has_no_mass() {
        let shape = Shape::from(EdgeShape::new(Vec2::ZERO, Vec2::new(2.0, 0.0)).unwrap());
        let md = shape.compute_mass(5.0);
        assert_eq!(md.mass, 0.0);
        assert_eq!(md.center, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_aabb_includes_skin() {
        let shape = Shape::from(PolygonShape::new_box(1.0, 2.0).unwrap());
        let xf = Transform::new(Vec2::new(3.0, 4.0), 0.0);
        let aabb = shape.compute_aabb(&xf);
        assert_relative_eq!(aabb.lower.x, 2.0 - POLYGON_RADIUS);
        assert_relative_eq!(aabb.upper.y, 6.0 + POLYGON_RADIUS);
    }

    #[test]
    fn test_point_containment() {
        let shape = Shape::from(PolygonShape::new_box(1.0, 1.0).unwrap());
        let xf = Transform::new(Vec2::new(5.0, 0.0), 0.0);
        assert!(shape.test_point(&xf, Vec2::new(5.5, 0.5)));
        assert!(!shape.test_point(&xf, Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn test_ray_cast_polygon_and_edge() {
        let input = RayCastInput {
            p1: Vec2::new(0.0, 5.0),
            p2: Vec2::new(0.0, -5.0),
            max_fraction: 1.0,
        };

        let poly = Shape::from(PolygonShape::new_box(1.0, 1.0).unwrap());
        let hit = poly.ray_cast(&input, &Transform::IDENTITY).unwrap();
        assert_relative_eq!(hit.fraction, 0.4);
        assert_eq!(hit.normal, Vec2::new(0.0, 1.0));

        let edge = Shape::from(EdgeShape::new(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)).unwrap());
        let hit = edge.ray_cast(&input, &Transform::IDENTITY).unwrap();
        assert_relative_eq!(hit.fraction, 0.5);
        assert_relative_eq!(hit.normal.y, 1.0);
    }
}
