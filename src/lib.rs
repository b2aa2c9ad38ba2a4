// Library root for the solar collector optimizer
//
// A genetic algorithm shapes a height-field panel so that as many
// triangles as possible reflect the incoming rays onto an obstacle mesh.
//
// - geometry:   vertices, triangle meshes, STL import/export
// - genome:     real-valued genes with crossover and a text record format
// - fitness:    ray/triangle intersection and reflection scoring
// - collector:  a genome rendered as a panel mesh
// - population: parallel evaluation and ranking
// - evolution:  replacement of the weak ranks by offspring of the elite
// - checkpoint: saving and restoring a population
// - run:        the generational loop with its exports and checkpoints
// - calibrate:  fitness sweep over initial height scales
// - config:     the `key = value` run configuration

pub mod error;
pub mod geometry;

pub mod fitness;
pub mod genome;

pub mod collector;
pub mod evolution;
pub mod population;

pub mod calibrate;
pub mod checkpoint;
pub mod config;
pub mod run;

// Re-export commonly used types at the library root for convenience
pub use collector::Collector;
pub use config::RunConfig;
pub use error::{ConfigError, GenomeError, OptimizerError, StlError};
pub use evolution::{EvolutionParams, GenerationOutcome};
pub use genome::Genome;
pub use geometry::{TriangleMesh, Vertex};
pub use population::Population;
pub use run::RunSettings;
