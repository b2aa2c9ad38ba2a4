// Genetic representation and geometry
use crate::fitness;
use crate::genome::Genome;
use crate::geometry::{TriangleMesh, Vertex};

use rand::Rng;

use std::path::Path;

use crate::error::StlError;

/// A solar collector panel: a genome read as a height field
///
/// This is the "phenotype" of the genetic algorithm. It owns a [`Genome`]
/// whose genes are the vertex heights of a `width` x `height` grid, the
/// triangle mesh built from them, and a borrowed reference to the obstacle
/// every panel is scored against.
///
/// **Rust Concept: Lifetimes**
/// `'a` ties the collector to the obstacle mesh it borrows. The compiler
/// guarantees the obstacle outlives every collector, and since the
/// collector only ever reads it, any number of threads can share it.
#[derive(Clone, Debug)]
pub struct Collector<'a> {
    genome: Genome,
    width: usize,
    height: usize,
    mesh: TriangleMesh,
    obstacle: &'a TriangleMesh,
}

impl<'a> Collector<'a> {
    /// Wrap a genome and build its mesh
    ///
    /// # Panics
    /// Panics if `genome.len() != width * height`
    pub fn new(genome: Genome, width: usize, height: usize, obstacle: &'a TriangleMesh) -> Self {
        assert_eq!(
            genome.len(),
            width * height,
            "Genome size must match the grid"
        );

        let mut collector = Self {
            genome,
            width,
            height,
            mesh: TriangleMesh::default(),
            obstacle,
        };
        collector.compute_mesh();
        collector
    }

    /// Collector with heights drawn uniformly from `[0, max_height]`
    pub fn random(
        width: usize,
        height: usize,
        max_height: f64,
        obstacle: &'a TriangleMesh,
        rng: &mut impl Rng,
    ) -> Self {
        let genome = Genome::random(width * height, 0.0, max_height, rng);
        Self::new(genome, width, height, obstacle)
    }

    /// Rebuild the mesh from the current genes
    ///
    /// Computes normals and circumcenters, which is all the fitness test
    /// needs from the panel side.
    pub fn compute_mesh(&mut self) {
        self.mesh = TriangleMesh::from_height_field(self.genome.values(), self.width, self.height);
        self.mesh.compute_normals();
        self.mesh.compute_circumcenters();
    }

    /// Score the panel against `rays` and store the result
    pub fn compute_fitness(&mut self, rays: &[Vertex]) -> f64 {
        let score = fitness::compute_fitness(&self.mesh, self.obstacle, rays);
        self.genome.fitness = Some(score);
        score
    }

    /// `None` until [`compute_fitness`](Self::compute_fitness) has run
    pub fn fitness(&self) -> Option<f64> {
        self.genome.fitness
    }

    pub fn is_evaluated(&self) -> bool {
        self.genome.fitness.is_some()
    }

    /// Height of grid vertex `(x, y)`
    pub fn height_at(&self, x: usize, y: usize) -> f64 {
        self.genome.get(y * self.width + x)
    }

    /// Set the height of grid vertex `(x, y)`, clamped into the genome bounds
    ///
    /// Clears the fitness. Call [`compute_mesh`](Self::compute_mesh) once
    /// all edits are done.
    pub fn set_height(&mut self, x: usize, y: usize, value: f64) {
        self.genome.set(y * self.width + x, value);
    }

    /// Mesh made of the triangles that bounce at least one ray onto the obstacle
    pub fn reflecting_mesh(&self, rays: &[Vertex]) -> TriangleMesh {
        let flags = fitness::reflecting_triangles(&self.mesh, self.obstacle, rays);
        let mut out = TriangleMesh::with_capacity(flags.iter().filter(|&&f| f).count());

        for (i, _) in flags.iter().enumerate().filter(|(_, f)| **f) {
            let t = self.mesh.triangle(i);
            out.push_triangle(t.normal, t.vertices);
        }

        out
    }

    /// Export the panel mesh as binary STL
    pub fn export_binary_stl(&self, path: impl AsRef<Path>) -> Result<(), StlError> {
        self.mesh.export_binary_stl(path)
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn into_genome(self) -> Genome {
        self.genome
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    pub fn obstacle(&self) -> &'a TriangleMesh {
        self.obstacle
    }

    /// Grid size as (width, height) in vertices
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}
