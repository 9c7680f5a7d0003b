// Narrow phase: contact manifolds between convex hulls
//
// Separating-axis search followed by reference-face clipping. Points are
// stored in body-local form so they survive small motions and can be matched
// across steps by their feature ids.

use glam::Vec2;

use super::shape::Shape;
use crate::core::math::{cross_vs, Transform};

/// Reference face B must beat face A by this much to be chosen
const FACE_TOLERANCE: f32 = 0.1 * 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FeatureType {
    #[default]
    Vertex,
    Face,
}

/// Which vertex or face pair produced a contact point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContactFeature {
    pub index_a: u8,
    pub index_b: u8,
    pub type_a: FeatureType,
    pub type_b: FeatureType,
}

impl ContactFeature {
    fn flipped(self) -> Self {
        Self {
            index_a: self.index_b,
            index_b: self.index_a,
            type_a: self.type_b,
            type_b: self.type_a,
        }
    }
}

/// One persistent contact point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManifoldPoint {
    /// Clip point in the incident body's frame
    pub local_point: Vec2,

    /// Accumulated impulses, carried over for warm starting
    pub normal_impulse: f32,
    pub tangent_impulse: f32,

    pub id: ContactFeature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifoldType {
    /// Reference face on shape A
    #[default]
    FaceA,
    /// Reference face on shape B
    FaceB,
}

/// Up to two contact points sharing a reference face
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Manifold {
    pub kind: ManifoldType,

    /// Reference face normal, in the reference body's frame
    pub local_normal: Vec2,

    /// Reference face midpoint, in the reference body's frame
    pub local_point: Vec2,

    points: [ManifoldPoint; 2],
    point_count: usize,
}

impl Manifold {
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points[..self.point_count]
    }

    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    fn push(&mut self, point: ManifoldPoint) {
        if self.point_count < self.points.len() {
            self.points[self.point_count] = point;
            self.point_count += 1;
        }
    }
}

/// World-space view of a manifold
///
/// `normal` points from A to B. Each point sits midway between the two skin
/// surfaces; `separations` are negative when the skins overlap.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldManifold {
    pub normal: Vec2,
    pub points: [Vec2; 2],
    pub separations: [f32; 2],
}

impl WorldManifold {
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut out = WorldManifold::default();
        if manifold.is_empty() {
            return out;
        }

        match manifold.kind {
            ManifoldType::FaceA => {
                let normal = xf_a.q.apply(manifold.local_normal);
                let plane_point = xf_a.apply(manifold.local_point);
                for (i, mp) in manifold.points().iter().enumerate() {
                    let clip_point = xf_b.apply(mp.local_point);
                    let c_a = clip_point
                        + (radius_a - (clip_point - plane_point).dot(normal)) * normal;
                    let c_b = clip_point - radius_b * normal;
                    out.points[i] = 0.5 * (c_a + c_b);
                    out.separations[i] = (c_b - c_a).dot(normal);
                }
                out.normal = normal;
            }
            ManifoldType::FaceB => {
                let normal = xf_b.q.apply(manifold.local_normal);
                let plane_point = xf_b.apply(manifold.local_point);
                for (i, mp) in manifold.points().iter().enumerate() {
                    let clip_point = xf_a.apply(mp.local_point);
                    let c_b = clip_point
                        + (radius_b - (clip_point - plane_point).dot(normal)) * normal;
                    let c_a = clip_point - radius_a * normal;
                    out.points[i] = 0.5 * (c_a + c_b);
                    out.separations[i] = (c_a - c_b).dot(normal);
                }
                // Keep the A -> B convention
                out.normal = -normal;
            }
        }
        out
    }
}

/// Compute the manifold for two shapes in their current poses
///
/// Edges collide with polygons from either side. Two edges never collide.
pub fn collide(shape_a: &Shape, xf_a: &Transform, shape_b: &Shape, xf_b: &Transform) -> Manifold {
    match (shape_a, shape_b) {
        (Shape::Edge(_), Shape::Edge(_)) => Manifold::default(),
        (Shape::Polygon(_), _) | (_, Shape::Polygon(_)) => {
            let (verts_a, norms_a) = shape_a.hull();
            let (verts_b, norms_b) = shape_b.hull();
            collide_hulls(
                Hull::new(verts_a, norms_a, shape_a.radius()),
                xf_a,
                Hull::new(verts_b, norms_b, shape_b.radius()),
                xf_b,
            )
        }
    }
}

#[derive(Clone, Copy)]
struct Hull<'a> {
    vertices: &'a [Vec2],
    normals: &'a [Vec2],
    radius: f32,
}

impl<'a> Hull<'a> {
    fn new(vertices: &'a [Vec2], normals: &'a [Vec2], radius: f32) -> Self {
        Self {
            vertices,
            normals,
            radius,
        }
    }

    fn next(&self, i: usize) -> usize {
        if i + 1 < self.vertices.len() {
            i + 1
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ClipVertex {
    v: Vec2,
    id: ContactFeature,
}

/// Face of `hull1` with the largest separation from `hull2`
fn find_max_separation(
    hull1: &Hull,
    xf1: &Transform,
    hull2: &Hull,
    xf2: &Transform,
) -> (usize, f32) {
    // Work in hull2's frame
    let xf = xf2.mul_t(xf1);

    let mut best_index = 0;
    let mut max_separation = f32::MIN;
    for (i, (v, n)) in hull1.vertices.iter().zip(hull1.normals).enumerate() {
        let n = xf.q.apply(*n);
        let v1 = xf.apply(*v);

        let si = hull2
            .vertices
            .iter()
            .map(|v2| n.dot(*v2 - v1))
            .fold(f32::MAX, f32::min);

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }
    (best_index, max_separation)
}

/// Edge of `hull2` most anti-parallel to the reference face, in world space
fn find_incident_edge(
    hull1: &Hull,
    xf1: &Transform,
    edge1: usize,
    hull2: &Hull,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    let normal1 = xf2.q.apply_inv(xf1.q.apply(hull1.normals[edge1]));

    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, n) in hull2.normals.iter().enumerate() {
        let dot = normal1.dot(*n);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = hull2.next(i1);
    let feature = |index_b: usize| ContactFeature {
        index_a: edge1 as u8,
        index_b: index_b as u8,
        type_a: FeatureType::Face,
        type_b: FeatureType::Vertex,
    };

    [
        ClipVertex {
            v: xf2.apply(hull2.vertices[i1]),
            id: feature(i1),
        },
        ClipVertex {
            v: xf2.apply(hull2.vertices[i2]),
            id: feature(i2),
        },
    ]
}

/// Sutherland-Hodgman clip of a segment against the half-plane `normal . x <= offset`
fn clip_segment_to_line(
    v_in: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index_a: usize,
) -> ([ClipVertex; 2], usize) {
    let mut v_out = [ClipVertex::default(); 2];
    let mut count = 0;

    let distance0 = normal.dot(v_in[0].v) - offset;
    let distance1 = normal.dot(v_in[1].v) - offset;

    if distance0 <= 0.0 {
        v_out[count] = v_in[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        v_out[count] = v_in[1];
        count += 1;
    }

    if distance0 * distance1 < 0.0 && count < 2 {
        let interp = distance0 / (distance0 - distance1);
        v_out[count] = ClipVertex {
            v: v_in[0].v + interp * (v_in[1].v - v_in[0].v),
            id: ContactFeature {
                index_a: vertex_index_a as u8,
                index_b: v_in[0].id.index_b,
                type_a: FeatureType::Vertex,
                type_b: FeatureType::Face,
            },
        };
        count += 1;
    }

    (v_out, count)
}

fn collide_hulls(hull_a: Hull, xf_a: &Transform, hull_b: Hull, xf_b: &Transform) -> Manifold {
    let mut manifold = Manifold::default();
    let total_radius = hull_a.radius + hull_b.radius;

    let (edge_a, separation_a) = find_max_separation(&hull_a, xf_a, &hull_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }

    let (edge_b, separation_b) = find_max_separation(&hull_b, xf_b, &hull_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    let (hull1, xf1, hull2, xf2, edge1, flip) = if separation_b > separation_a + FACE_TOLERANCE {
        manifold.kind = ManifoldType::FaceB;
        (hull_b, xf_b, hull_a, xf_a, edge_b, true)
    } else {
        manifold.kind = ManifoldType::FaceA;
        (hull_a, xf_a, hull_b, xf_b, edge_a, false)
    };

    let incident_edge = find_incident_edge(&hull1, xf1, edge1, &hull2, xf2);

    let iv1 = edge1;
    let iv2 = hull1.next(edge1);
    let mut v11 = hull1.vertices[iv1];
    let mut v12 = hull1.vertices[iv2];

    let local_tangent = (v12 - v11).normalize_or_zero();
    let local_normal = cross_vs(local_tangent, 1.0);
    let plane_point = 0.5 * (v11 + v12);

    let tangent = xf1.q.apply(local_tangent);
    let normal = cross_vs(tangent, 1.0);

    v11 = xf1.apply(v11);
    v12 = xf1.apply(v12);

    let front_offset = normal.dot(v11);
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    let (clip_points1, count) = clip_segment_to_line(&incident_edge, -tangent, side_offset1, iv1);
    if count < 2 {
        return manifold;
    }
    let (clip_points2, count) = clip_segment_to_line(&clip_points1, tangent, side_offset2, iv2);
    if count < 2 {
        return manifold;
    }

    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    for clip in &clip_points2 {
        let separation = normal.dot(clip.v) - front_offset;
        if separation <= total_radius {
            manifold.push(ManifoldPoint {
                local_point: xf2.apply_inv(clip.v),
                normal_impulse: 0.0,
                tangent_impulse: 0.0,
                id: if flip { clip.id.flipped() } else { clip.id },
            });
        }
    }

    manifold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::config::POLYGON_RADIUS;
    use crate::engine::physics::shape::{EdgeShape, PolygonShape};
    use approx::assert_abs_diff_eq;

    fn unit_box() -> Shape {
        Shape::from(PolygonShape::new_box(0.5, 0.5).unwrap())
    }

    fn ground() -> Shape {
        Shape::from(EdgeShape::new(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)).unwrap())
    }

    #[test]
    fn test_box_resting_on_edge() {
        let edge = ground();
        let boxed = unit_box();
        let xf_box = Transform::new(Vec2::new(0.0, 0.5), 0.0);

        let manifold = collide(&edge, &Transform::IDENTITY, &boxed, &xf_box);
        assert_eq!(manifold.point_count(), 2);
        assert_eq!(manifold.kind, ManifoldType::FaceA);

        let wm = WorldManifold::new(
            &manifold,
            &Transform::IDENTITY,
            edge.radius(),
            &xf_box,
            boxed.radius(),
        );
        assert_abs_diff_eq!(wm.normal.y, 1.0, epsilon = 1e-6);
        for sep in wm.separations {
            // Surfaces touch, so the skins overlap by both radii
            assert_abs_diff_eq!(sep, -2.0 * POLYGON_RADIUS, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_normal_points_from_a_to_b() {
        let top = unit_box();
        let bottom = Shape::from(PolygonShape::new_box(2.0, 0.5).unwrap());
        let xf_top = Transform::new(Vec2::new(0.2, 0.99), 0.0);
        let xf_bottom = Transform::IDENTITY;

        let manifold = collide(&top, &xf_top, &bottom, &xf_bottom);
        assert_eq!(manifold.point_count(), 2);

        let wm = WorldManifold::new(&manifold, &xf_top, 0.01, &xf_bottom, 0.01);
        assert_abs_diff_eq!(wm.normal.x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(wm.normal.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_separated_shapes_have_no_points() {
        let a = unit_box();
        let b = unit_box();
        let manifold = collide(
            &a,
            &Transform::IDENTITY,
            &b,
            &Transform::new(Vec2::new(1.5, 0.0), 0.0),
        );
        assert!(manifold.is_empty());

        let far = collide(
            &ground(),
            &Transform::IDENTITY,
            &a,
            &Transform::new(Vec2::new(0.0, 3.0), 0.0),
        );
        assert!(far.is_empty());
    }

    #[test]
    fn test_edges_never_collide() {
        let manifold = collide(
            &ground(),
            &Transform::IDENTITY,
            &ground(),
            &Transform::IDENTITY,
        );
        assert!(manifold.is_empty());
    }

    #[test]
    fn test_feature_ids_stable_under_small_motion() {
        let edge = ground();
        let boxed = unit_box();
        let m1 = collide(
            &edge,
            &Transform::IDENTITY,
            &boxed,
            &Transform::new(Vec2::new(0.0, 0.49), 0.0),
        );
        let m2 = collide(
            &edge,
            &Transform::IDENTITY,
            &boxed,
            &Transform::new(Vec2::new(0.01, 0.495), 0.001),
        );
        assert_eq!(m1.point_count(), 2);
        assert_eq!(m2.point_count(), 2);
        for (p1, p2) in m1.points().iter().zip(m2.points()) {
            assert_eq!(p1.id, p2.id);
        }
    }

    #[test]
    fn test_edge_collides_from_below() {
        let edge = ground();
        let boxed = unit_box();
        let xf_box = Transform::new(Vec2::new(0.0, -0.5), 0.0);
        let manifold = collide(&edge, &Transform::IDENTITY, &boxed, &xf_box);
        assert_eq!(manifold.point_count(), 2);

        let wm = WorldManifold::new(&manifold, &Transform::IDENTITY, 0.01, &xf_box, 0.01);
        assert_abs_diff_eq!(wm.normal.y, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_feature_flip_swaps_sides() {
        let id = ContactFeature {
            index_a: 1,
            index_b: 2,
            type_a: FeatureType::Face,
            type_b: FeatureType::Vertex,
        };
        let flipped = id.flipped();
        assert_eq!(flipped.index_a, 2);
        assert_eq!(flipped.type_a, FeatureType::Vertex);
        assert_eq!(flipped.type_b, FeatureType::Face);
        assert_eq!(flipped.flipped(), id);
    }
}
