use super::Vertex;

/// One vector attribute of every triangle, stored as three parallel columns
///
/// `x[i]`, `y[i]` and `z[i]` together form the attribute of triangle `i`.
/// Keeping the components apart means a pass that only touches `x` (say a
/// translation) streams through one contiguous `Vec<f64>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Columns {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl Columns {
    /// `len` zeroed entries
    pub fn zeroed(len: usize) -> Self {
        Self {
            x: vec![0.0; len],
            y: vec![0.0; len],
            z: vec![0.0; len],
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Vertex {
        Vertex::new(self.x[i], self.y[i], self.z[i])
    }

    #[inline]
    pub fn set(&mut self, i: usize, v: Vertex) {
        self.x[i] = v.x;
        self.y[i] = v.y;
        self.z[i] = v.z;
    }

    pub fn push(&mut self, v: Vertex) {
        self.x.push(v.x);
        self.y.push(v.y);
        self.z.push(v.z);
    }

    fn resize(&mut self, len: usize) {
        self.x.resize(len, 0.0);
        self.y.resize(len, 0.0);
        self.z.resize(len, 0.0);
    }

    fn translate_xy(&mut self, dx: f64, dy: f64) {
        self.x.iter_mut().for_each(|x| *x += dx);
        self.y.iter_mut().for_each(|y| *y += dy);
    }
}

/// Axis-aligned bounding box of a mesh
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vertex,
    pub max: Vertex,
}

/// A single triangle pulled out of a [`TriangleMesh`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub normal: Vertex,
    pub vertices: [Vertex; 3],
}

/// Triangle mesh in struct-of-arrays layout
///
/// Every per-triangle array has exactly `triangle_count()` entries.
/// The vertex columns are the source of truth; normals, circumcenters and
/// edges are derived and only valid after the matching `compute_*` call
/// has run since the last vertex change.
///
/// **Rust Concept: Plain data, no object graph**
/// A triangle is just an index. There are no per-triangle structs or
/// pointers, so the hot loops in `fitness.rs` read straight from flat
/// `Vec<f64>` buffers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    pub v0: Columns,
    pub v1: Columns,
    pub v2: Columns,

    /// Unit face normals (zero for degenerate triangles)
    pub normals: Columns,

    /// Circumcenters, used as the origin of every ray test
    pub circumcenters: Columns,

    /// Cached `v1 - v0`
    pub edge1: Columns,
    /// Cached `v2 - v0`
    pub edge2: Columns,

    /// Filled in by [`TriangleMesh::compute_bounding_box`]
    pub bounding_box: Option<BoundingBox>,
}

impl TriangleMesh {
    /// A mesh of `triangle_count` zeroed triangles
    pub fn zeroed(triangle_count: usize) -> Self {
        Self {
            v0: Columns::zeroed(triangle_count),
            v1: Columns::zeroed(triangle_count),
            v2: Columns::zeroed(triangle_count),
            normals: Columns::zeroed(triangle_count),
            circumcenters: Columns::zeroed(triangle_count),
            edge1: Columns::zeroed(triangle_count),
            edge2: Columns::zeroed(triangle_count),
            bounding_box: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            v0: Columns::with_capacity(capacity),
            v1: Columns::with_capacity(capacity),
            v2: Columns::with_capacity(capacity),
            normals: Columns::with_capacity(capacity),
            circumcenters: Columns::with_capacity(capacity),
            edge1: Columns::with_capacity(capacity),
            edge2: Columns::with_capacity(capacity),
            bounding_box: None,
        }
    }

    /// Triangulate a height field
    ///
    /// `values` is read row by row (`values[y * width + x]`). Every grid cell
    /// becomes two triangles split along the cell's diagonal. Grid `x` maps
    /// to mesh `x`, grid `y` maps to mesh `z` and the height goes into mesh
    /// `y`, so elevation reads as the vertical axis.
    ///
    /// Only vertices are written; call [`compute_normals`](Self::compute_normals)
    /// and friends afterwards.
    ///
    /// # Panics
    /// Panics if `values.len() != width * height`
    pub fn from_height_field(values: &[f64], width: usize, height: usize) -> Self {
        assert_eq!(
            values.len(),
            width * height,
            "Height field must have width * height values"
        );

        let cells = width.saturating_sub(1) * height.saturating_sub(1);
        let mut mesh = Self::zeroed(cells * 2);

        let h = |x: usize, y: usize| values[y * width + x];
        let mut i = 0;
        for y in 0..height.saturating_sub(1) {
            for x in 0..width.saturating_sub(1) {
                let (xf, yf) = (x as f64, y as f64);

                mesh.v0.set(i, Vertex::new(xf, h(x, y), yf));
                mesh.v1.set(i, Vertex::new(xf, h(x, y + 1), yf + 1.0));
                mesh.v2.set(i, Vertex::new(xf + 1.0, h(x + 1, y), yf));
                i += 1;

                mesh.v0.set(i, Vertex::new(xf + 1.0, h(x + 1, y + 1), yf + 1.0));
                mesh.v1.set(i, Vertex::new(xf + 1.0, h(x + 1, y), yf));
                mesh.v2.set(i, Vertex::new(xf, h(x, y + 1), yf + 1.0));
                i += 1;
            }
        }

        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.v0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v0.is_empty()
    }

    /// Append a triangle with a known normal
    ///
    /// Derived columns get a zero entry so every array keeps the same length.
    pub fn push_triangle(&mut self, normal: Vertex, vertices: [Vertex; 3]) {
        self.v0.push(vertices[0]);
        self.v1.push(vertices[1]);
        self.v2.push(vertices[2]);
        self.normals.push(normal);
        self.circumcenters.push(Vertex::ZERO);
        self.edge1.push(Vertex::ZERO);
        self.edge2.push(Vertex::ZERO);
    }

    pub fn triangle(&self, i: usize) -> Triangle {
        Triangle {
            normal: self.normals.get(i),
            vertices: [self.v0.get(i), self.v1.get(i), self.v2.get(i)],
        }
    }

    /// Unit normal of every triangle: `normalize((v1 - v0) x (v2 - v0))`
    ///
    /// Winding decides the sign. Degenerate triangles get a zero normal.
    pub fn compute_normals(&mut self) {
        let n = self.triangle_count();
        self.normals.resize(n);

        for i in 0..n {
            let v0 = self.v0.get(i);
            let normal = (self.v1.get(i) - v0).cross(self.v2.get(i) - v0);
            self.normals.set(i, normal.normalized());
        }
    }

    /// Circumcenter of every triangle
    ///
    /// With `a = v1 - v0`, `b = v2 - v0` and `c = a x b` the circumcenter is
    /// `v0 + (|a|^2 (b x c) + |b|^2 (c x a)) / (2 |c|^2)`.
    /// Degenerate triangles yield non-finite coordinates, and a ray
    /// starting there never reports a hit.
    pub fn compute_circumcenters(&mut self) {
        let n = self.triangle_count();
        self.circumcenters.resize(n);

        for i in 0..n {
            let v0 = self.v0.get(i);
            let a = self.v1.get(i) - v0;
            let b = self.v2.get(i) - v0;
            let c = a.cross(b);

            let inv_denom = 0.5 / c.dot(c);
            let offset = (b.cross(c) * a.dot(a) + c.cross(a) * b.dot(b)) * inv_denom;

            self.circumcenters.set(i, v0 + offset);
        }
    }

    /// Cache `edge1 = v1 - v0` and `edge2 = v2 - v0` for every triangle
    pub fn compute_edges(&mut self) {
        let n = self.triangle_count();
        self.edge1.resize(n);
        self.edge2.resize(n);

        for i in 0..n {
            let v0 = self.v0.get(i);
            self.edge1.set(i, self.v1.get(i) - v0);
            self.edge2.set(i, self.v2.get(i) - v0);
        }
    }

    /// Min/max over every vertex component; leaves an empty mesh untouched
    pub fn compute_bounding_box(&mut self) {
        if self.is_empty() {
            return;
        }

        let fold = |columns: [&Vec<f64>; 3]| {
            columns.iter().flat_map(|c| c.iter()).fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), &v| (lo.min(v), hi.max(v)),
            )
        };

        let (min_x, max_x) = fold([&self.v0.x, &self.v1.x, &self.v2.x]);
        let (min_y, max_y) = fold([&self.v0.y, &self.v1.y, &self.v2.y]);
        let (min_z, max_z) = fold([&self.v0.z, &self.v1.z, &self.v2.z]);

        self.bounding_box = Some(BoundingBox {
            min: Vertex::new(min_x, min_y, min_z),
            max: Vertex::new(max_x, max_y, max_z),
        });
    }

    /// Shift the mesh by `dx` along x and `dy` along y
    ///
    /// Vertices, circumcenters and the bounding box move. Normals and edges
    /// are translation invariant and stay as they are.
    pub fn translate_xy(&mut self, dx: f64, dy: f64) {
        self.v0.translate_xy(dx, dy);
        self.v1.translate_xy(dx, dy);
        self.v2.translate_xy(dx, dy);
        self.circumcenters.translate_xy(dx, dy);

        if let Some(bbox) = &mut self.bounding_box {
            let shift = Vertex::new(dx, dy, 0.0);
            bbox.min = bbox.min + shift;
            bbox.max = bbox.max + shift;
        }
    }

    /// Recompute normals, circumcenters, edges and the bounding box
    pub fn compute_all(&mut self) {
        self.compute_normals();
        self.compute_circumcenters();
        self.compute_edges();
        self.compute_bounding_box();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vertex, b: Vertex) {
        assert!((a - b).length() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_height_field_triangle_count() {
        let mesh = TriangleMesh::from_height_field(&[0.0; 12], 4, 3);
        // (4 - 1) * (3 - 1) cells, two triangles each
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.normals.len(), 12);
        assert_eq!(mesh.edge2.len(), 12);
    }

    #[test]
    fn test_height_field_axes_are_swapped() {
        let values = [0.0, 1.0, 2.0, 3.0];
        let mesh = TriangleMesh::from_height_field(&values, 2, 2);

        // First triangle of cell (0, 0)
        assert_eq!(mesh.v0.get(0), Vertex::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.v1.get(0), Vertex::new(0.0, 2.0, 1.0));
        assert_eq!(mesh.v2.get(0), Vertex::new(1.0, 1.0, 0.0));

        // Second triangle starts at the far corner
        assert_eq!(mesh.v0.get(1), Vertex::new(1.0, 3.0, 1.0));
    }

    #[test]
    fn test_flat_field_normals_point_up() {
        let mut mesh = TriangleMesh::from_height_field(&[5.0; 9], 3, 3);
        mesh.compute_normals();
        for i in 0..mesh.triangle_count() {
            assert_close(mesh.normals.get(i), Vertex::new(0.0, 1.0, 0.0));
        }
    }

    #[test]
    fn test_degenerate_triangle_normal_is_zero() {
        let mut mesh = TriangleMesh::default();
        let p = Vertex::new(1.0, 1.0, 1.0);
        mesh.push_triangle(Vertex::ZERO, [p, p, Vertex::new(2.0, 2.0, 2.0)]);
        mesh.compute_normals();
        assert_eq!(mesh.normals.get(0), Vertex::ZERO);
    }

    #[test]
    fn test_circumcenter_is_equidistant() {
        let mut mesh = TriangleMesh::default();
        let verts = [
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(4.0, 1.0, 0.5),
            Vertex::new(1.0, 3.0, -2.0),
        ];
        mesh.push_triangle(Vertex::ZERO, verts);
        mesh.compute_circumcenters();

        let c = mesh.circumcenters.get(0);
        let d0 = (verts[0] - c).length();
        let d1 = (verts[1] - c).length();
        let d2 = (verts[2] - c).length();
        assert!((d0 - d1).abs() < 1e-9);
        assert!((d0 - d2).abs() < 1e-9);
    }

    #[test]
    fn test_right_triangle_circumcenter_is_hypotenuse_midpoint() {
        let mut mesh = TriangleMesh::from_height_field(&[0.0; 4], 2, 2);
        mesh.compute_circumcenters();
        // Hypotenuse of both triangles runs from (0, 0, 1) to (1, 0, 0)
        assert_close(mesh.circumcenters.get(0), Vertex::new(0.5, 0.0, 0.5));
        assert_close(mesh.circumcenters.get(1), Vertex::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_edges() {
        let mut mesh = TriangleMesh::from_height_field(&[0.0, 0.0, 1.0, 0.0], 2, 2);
        mesh.compute_edges();
        assert_eq!(mesh.edge1.get(0), Vertex::new(0.0, 1.0, 1.0));
        assert_eq!(mesh.edge2.get(0), Vertex::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_bounding_box() {
        let mut mesh = TriangleMesh::from_height_field(&[0.0, 2.0, -1.0, 0.5], 2, 2);
        mesh.compute_bounding_box();
        let bbox = mesh.bounding_box.unwrap();
        assert_eq!(bbox.min, Vertex::new(0.0, -1.0, 0.0));
        assert_eq!(bbox.max, Vertex::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_bounding_box_empty_mesh_is_noop() {
        let mut mesh = TriangleMesh::default();
        mesh.compute_bounding_box();
        assert!(mesh.bounding_box.is_none());
    }

    #[test]
    fn test_translate_moves_vertices_and_circumcenters_only() {
        let mut mesh = TriangleMesh::from_height_field(&[0.0, 1.0, 2.0, 3.0], 2, 2);
        mesh.compute_all();
        let before = mesh.clone();

        mesh.translate_xy(10.0, -2.0);

        for i in 0..mesh.triangle_count() {
            let shift = Vertex::new(10.0, -2.0, 0.0);
            assert_close(mesh.v0.get(i), before.v0.get(i) + shift);
            assert_close(mesh.v2.get(i), before.v2.get(i) + shift);
            assert_close(mesh.circumcenters.get(i), before.circumcenters.get(i) + shift);
            assert_eq!(mesh.normals.get(i), before.normals.get(i));
            assert_eq!(mesh.edge1.get(i), before.edge1.get(i));
        }
    }

    #[test]
    #[should_panic(expected = "Height field must have width * height values")]
    fn test_height_field_size_mismatch_panics() {
        TriangleMesh::from_height_field(&[0.0; 5], 2, 2);
    }
}
