// Vector type and mesh storage from the geometry module
use crate::geometry::{TriangleMesh, Vertex};

// Rayon provides parallel iterators for the per-triangle variant
use rayon::prelude::*;

/// Smallest determinant and ray parameter treated as non-zero
///
/// Rays whose determinant falls inside `(-EPSILON, EPSILON)` are considered
/// parallel to the triangle. Hits closer than `EPSILON` along the ray are
/// ignored so a ray never hits the surface it starts on.
pub const EPSILON: f64 = 1e-7;

/// Möller–Trumbore ray/triangle intersection
///
/// The triangle is given by its base vertex and the two cached edges
/// `edge1 = v1 - v0`, `edge2 = v2 - v0`.
///
/// # Returns
/// `Some(t)` when `origin + t * direction` lies inside the triangle and
/// `t > EPSILON`, otherwise `None`. Near-parallel rays are never a hit.
#[inline]
pub fn intersect(
    origin: Vertex,
    direction: Vertex,
    v0: Vertex,
    edge1: Vertex,
    edge2: Vertex,
) -> Option<f64> {
    let h = direction.cross(edge2);
    let det = edge1.dot(h);
    if det > -EPSILON && det < EPSILON {
        return None;
    }

    let f = 1.0 / det;
    let s = origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

/// Does a ray from `origin` hit any triangle of `obstacle`?
///
/// With `invert_ray` the ray is fired along `-ray`. That is how the
/// occlusion check works: light travels along `ray` towards the panel, so
/// the path back to the light source from the panel runs along `-ray`.
///
/// Stops at the first hit. `obstacle` must have its edges computed.
pub fn ray_hits_obstacle(
    origin: Vertex,
    ray: Vertex,
    obstacle: &TriangleMesh,
    invert_ray: bool,
) -> bool {
    let direction = if invert_ray { -ray } else { ray };

    (0..obstacle.triangle_count()).any(|k| {
        intersect(
            origin,
            direction,
            obstacle.v0.get(k),
            obstacle.edge1.get(k),
            obstacle.edge2.get(k),
        )
        .is_some()
    })
}

/// Ideal specular reflection: `incident - 2 (incident . normal) normal`
#[inline]
pub fn reflect(normal: Vertex, incident: Vertex) -> Vertex {
    incident - normal * (2.0 * incident.dot(normal))
}

/// Does panel triangle `i` bounce `ray` onto the obstacle?
///
/// True when the path from the triangle's circumcenter back towards the
/// light is clear of the obstacle *and* the reflected ray, fired from the
/// same circumcenter, hits it.
pub fn triangle_reflects_onto(
    panel: &TriangleMesh,
    i: usize,
    obstacle: &TriangleMesh,
    ray: Vertex,
) -> bool {
    let origin = panel.circumcenters.get(i);

    if ray_hits_obstacle(origin, ray, obstacle, true) {
        return false;
    }

    let reflection = reflect(panel.normals.get(i), ray);
    ray_hits_obstacle(origin, reflection, obstacle, false)
}

/// Count the (ray, triangle) pairs that reflect onto the obstacle
///
/// `panel` needs normals and circumcenters, `obstacle` needs edges.
/// The count is not normalised, so only panels of the same resolution
/// can be compared.
pub fn compute_fitness(panel: &TriangleMesh, obstacle: &TriangleMesh, rays: &[Vertex]) -> f64 {
    debug_assert_eq!(panel.normals.len(), panel.triangle_count());
    debug_assert_eq!(panel.circumcenters.len(), panel.triangle_count());

    let hits: usize = rays
        .iter()
        .map(|&ray| {
            (0..panel.triangle_count())
                .filter(|&i| triangle_reflects_onto(panel, i, obstacle, ray))
                .count()
        })
        .sum();

    hits as f64
}

/// Parallel version of [`compute_fitness`] (splits the triangles across cores)
///
/// The population already evaluates collectors in parallel, so this only
/// pays off when a single large panel is scored on its own.
pub fn compute_fitness_parallel(
    panel: &TriangleMesh,
    obstacle: &TriangleMesh,
    rays: &[Vertex],
) -> f64 {
    let hits: usize = rays
        .iter()
        .map(|&ray| {
            (0..panel.triangle_count())
                .into_par_iter()
                .filter(|&i| triangle_reflects_onto(panel, i, obstacle, ray))
                .count()
        })
        .sum();

    hits as f64
}

/// Which panel triangles reflect at least one of `rays` onto the obstacle
pub fn reflecting_triangles(
    panel: &TriangleMesh,
    obstacle: &TriangleMesh,
    rays: &[Vertex],
) -> Vec<bool> {
    (0..panel.triangle_count())
        .map(|i| {
            rays.iter()
                .any(|&ray| triangle_reflects_onto(panel, i, obstacle, ray))
        })
        .collect()
}
