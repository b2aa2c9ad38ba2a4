use std::ops::{Add, Mul, Neg, Sub};

/// A point or direction in 3D space
///
/// Used both for mesh vertices and for ray directions. It is a plain value
/// type: `Copy` makes passing it around as cheap as passing three floats.
///
/// **Rust Concept: Operator overloading**
/// Implementing `Add`, `Sub`, `Mul<f64>` and `Neg` lets us write vector
/// math as `a - b` or `n * 2.0` instead of calling helper functions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vertex {
    /// The zero vector
    pub const ZERO: Vertex = Vertex {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vertex) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vertex) -> Vertex {
        Vertex::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction
    ///
    /// Vectors shorter than `1e-12` return [`Vertex::ZERO`] instead of
    /// dividing by (almost) zero.
    pub fn normalized(self) -> Vertex {
        let len = self.length();
        if len > 1e-12 {
            self * (1.0 / len)
        } else {
            Vertex::ZERO
        }
    }
}

impl Add for Vertex {
    type Output = Vertex;

    fn add(self, rhs: Vertex) -> Vertex {
        Vertex::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vertex {
    type Output = Vertex;

    fn sub(self, rhs: Vertex) -> Vertex {
        Vertex::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vertex {
    type Output = Vertex;

    fn mul(self, rhs: f64) -> Vertex {
        Vertex::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vertex {
    type Output = Vertex;

    fn neg(self) -> Vertex {
        Vertex::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f64; 3]> for Vertex {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Vertex::new(x, y, z)
    }
}
