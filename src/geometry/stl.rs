//! STL import and export
//!
//! Binary layout (all little-endian):
//!
//! | bytes | content                                   |
//! |-------|-------------------------------------------|
//! | 80    | header, free-form                         |
//! | 4     | `u32` triangle count                      |
//! | 50 ×n | 3×`f32` normal, 9×`f32` vertices, `u16` 0 |
//!
//! The ASCII form is the classic `solid` / `facet normal` / `outer loop`
//! text layout.

use std::fmt::Write as _;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{TriangleMesh, Vertex};
use crate::error::StlError;

const HEADER_LEN: usize = 80;
const PREAMBLE_LEN: usize = HEADER_LEN + 4;
const FACET_LEN: usize = 50;
const HEADER_TEXT: &[u8] = b"solar_collector binary STL";

impl TriangleMesh {
    /// Write the mesh as binary STL
    ///
    /// Coordinates are narrowed to `f32`, as the format requires.
    pub fn export_binary_stl(&self, path: impl AsRef<Path>) -> Result<(), StlError> {
        let file = fs::File::create(path)?;
        let mut out = BufWriter::new(file);
        self.write_binary_stl(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Binary STL encoder behind [`export_binary_stl`](Self::export_binary_stl)
    pub fn write_binary_stl(&self, out: &mut impl Write) -> Result<(), StlError> {
        let mut header = [0u8; HEADER_LEN];
        header[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT);
        out.write_all(&header)?;
        out.write_all(&(self.triangle_count() as u32).to_le_bytes())?;

        let mut facet = [0u8; FACET_LEN];
        for i in 0..self.triangle_count() {
            let t = self.triangle(i);
            let fields = [
                t.normal,
                t.vertices[0],
                t.vertices[1],
                t.vertices[2],
            ];
            for (slot, v) in facet.chunks_exact_mut(12).zip(fields) {
                slot[0..4].copy_from_slice(&(v.x as f32).to_le_bytes());
                slot[4..8].copy_from_slice(&(v.y as f32).to_le_bytes());
                slot[8..12].copy_from_slice(&(v.z as f32).to_le_bytes());
            }
            // attribute byte count
            facet[48..50].copy_from_slice(&0u16.to_le_bytes());
            out.write_all(&facet)?;
        }

        Ok(())
    }

    /// Read a binary STL file
    ///
    /// The file must be exactly `84 + 50 * count` bytes long; anything else
    /// is rejected without reading a single triangle. Normals come from the
    /// file. Circumcenters, edges and the bounding box still need computing.
    pub fn import_binary_stl(path: impl AsRef<Path>) -> Result<Self, StlError> {
        let bytes = fs::read(path)?;
        Self::decode_binary_stl(&bytes)
    }

    /// Binary STL decoder behind [`import_binary_stl`](Self::import_binary_stl)
    pub fn decode_binary_stl(bytes: &[u8]) -> Result<Self, StlError> {
        if bytes.len() < PREAMBLE_LEN {
            return Err(StlError::Truncated(bytes.len() as u64));
        }

        let mut count_bytes = [0u8; 4];
        count_bytes.copy_from_slice(&bytes[HEADER_LEN..PREAMBLE_LEN]);
        let count = u32::from_le_bytes(count_bytes) as u64;

        let expected = PREAMBLE_LEN as u64 + FACET_LEN as u64 * count;
        if bytes.len() as u64 != expected {
            return Err(StlError::SizeMismatch {
                expected,
                actual: bytes.len() as u64,
            });
        }

        let read_f32 = |chunk: &[u8]| {
            let mut b = [0u8; 4];
            b.copy_from_slice(chunk);
            f32::from_le_bytes(b) as f64
        };
        let read_vertex = |chunk: &[u8]| {
            Vertex::new(
                read_f32(&chunk[0..4]),
                read_f32(&chunk[4..8]),
                read_f32(&chunk[8..12]),
            )
        };

        let mut mesh = TriangleMesh::with_capacity(count as usize);
        for facet in bytes[PREAMBLE_LEN..].chunks_exact(FACET_LEN) {
            // bytes 48..50 hold the attribute count, which is ignored
            mesh.push_triangle(
                read_vertex(&facet[0..12]),
                [
                    read_vertex(&facet[12..24]),
                    read_vertex(&facet[24..36]),
                    read_vertex(&facet[36..48]),
                ],
            );
        }

        Ok(mesh)
    }

    /// Write the mesh as ASCII STL
    pub fn export_text_stl(&self, path: impl AsRef<Path>) -> Result<(), StlError> {
        fs::write(path, self.to_text_stl("solar_collector"))?;
        Ok(())
    }

    /// Render the ASCII STL document in memory
    pub fn to_text_stl(&self, name: &str) -> String {
        // ~7 lines per facet, ~40 bytes per line
        let mut s = String::with_capacity(64 + self.triangle_count() * 280);

        // Writing into a String cannot fail
        let _ = writeln!(s, "solid {}", name);
        for i in 0..self.triangle_count() {
            let t = self.triangle(i);
            let _ = writeln!(s, "facet normal {} {} {}", t.normal.x, t.normal.y, t.normal.z);
            let _ = writeln!(s, "   outer loop");
            for v in t.vertices {
                let _ = writeln!(s, "      vertex {} {} {}", v.x, v.y, v.z);
            }
            let _ = writeln!(s, "   endloop");
            let _ = writeln!(s, "endfacet");
        }
        let _ = writeln!(s, "endsolid {}", name);

        s
    }

    /// Read an ASCII STL file
    pub fn import_text_stl(path: impl AsRef<Path>) -> Result<Self, StlError> {
        let text = fs::read_to_string(path)?;
        Self::parse_text_stl(&text)
    }

    /// ASCII STL parser behind [`import_text_stl`](Self::import_text_stl)
    pub fn parse_text_stl(text: &str) -> Result<Self, StlError> {
        let mut mesh = TriangleMesh::default();
        let mut normal = Vertex::ZERO;
        let mut vertices: Vec<Vertex> = Vec::with_capacity(3);
        let mut started = false;
        let mut finished = false;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let malformed = |message: &str| StlError::Malformed {
                line: line_no,
                message: message.to_string(),
            };

            let mut tokens = raw.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };

            match keyword {
                "solid" if !started => started = true,
                _ if !started => return Err(malformed("expected `solid`")),
                "facet" => {
                    if tokens.next() != Some("normal") {
                        return Err(malformed("expected `facet normal`"));
                    }
                    normal = parse_triplet(tokens).ok_or_else(|| malformed("bad normal"))?;
                    vertices.clear();
                }
                "vertex" => {
                    let v = parse_triplet(tokens).ok_or_else(|| malformed("bad vertex"))?;
                    vertices.push(v);
                }
                "endfacet" => {
                    if vertices.len() != 3 {
                        return Err(malformed("facet does not have exactly 3 vertices"));
                    }
                    mesh.push_triangle(normal, [vertices[0], vertices[1], vertices[2]]);
                    vertices.clear();
                }
                "outer" | "endloop" => {}
                "endsolid" => {
                    finished = true;
                    break;
                }
                other => return Err(malformed(&format!("unexpected keyword `{}`", other))),
            }
        }

        if !finished {
            return Err(StlError::Malformed {
                line: text.lines().count(),
                message: "missing `endsolid`".to_string(),
            });
        }

        Ok(mesh)
    }

    /// Load an STL file in either encoding
    ///
    /// Binary is tried first. A file that fails the binary size check but
    /// starts with `solid` is parsed as ASCII; the binary error is kept for
    /// everything else.
    pub fn load_stl(path: impl AsRef<Path>) -> Result<Self, StlError> {
        let bytes = fs::read(path)?;
        match Self::decode_binary_stl(&bytes) {
            Ok(mesh) => Ok(mesh),
            Err(err @ (StlError::SizeMismatch { .. } | StlError::Truncated(_))) => {
                if bytes.starts_with(b"solid") {
                    let text = String::from_utf8_lossy(&bytes);
                    Self::parse_text_stl(&text)
                } else {
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }
}

fn parse_triplet<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<Vertex> {
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    let z = tokens.next()?.parse().ok()?;
    Some(Vertex::new(x, y, z))
}
