// Geometry primitives: points, triangle meshes and their STL encodings
//
// - vertex.rs: the `Vertex` value type and its vector math
// - mesh.rs:   `TriangleMesh`, struct-of-arrays triangle storage
// - stl.rs:    binary and ASCII STL codecs (more `impl TriangleMesh`)

mod mesh;
mod stl;
mod vertex;

pub use mesh::{BoundingBox, Columns, Triangle, TriangleMesh};
pub use vertex::Vertex;
