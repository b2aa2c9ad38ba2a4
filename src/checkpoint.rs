//! Saving and restoring a population as a directory of genome files
//!
//! A checkpoint is one `<rank>.genome` file per collector, where `0.genome`
//! holds the best ranked collector. Restoring reads the files back in that
//! order.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::collector::Collector;
use crate::error::GenomeError;
use crate::genome::Genome;
use crate::geometry::TriangleMesh;
use crate::population::Population;

/// File holding the genome ranked `rank` in the checkpoint under `dir`
pub fn checkpoint_path(dir: impl AsRef<Path>, rank: usize) -> PathBuf {
    dir.as_ref().join(format!("{}.genome", rank))
}

/// Write every genome to `dir` in rank order, creating the directory
///
/// Returns the number of files written.
pub fn write_checkpoint(population: &Population<'_>, dir: impl AsRef<Path>) -> Result<usize, GenomeError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = 0;
    for (rank, collector) in population.ranked().enumerate() {
        collector.genome().save(checkpoint_path(dir, rank))?;
        written += 1;
    }

    info!(
        generation = population.generation,
        files = written,
        dir = %dir.display(),
        "checkpoint written"
    );
    Ok(written)
}

/// How a population was put together by [`restore_population`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Collectors read from checkpoint files
    pub restored: usize,
    /// Collectors created randomly after the first unreadable file
    pub randomized: usize,
}

/// Rebuild a population of `size` collectors from the checkpoint in `dir`
///
/// Files are read from rank 0 upward. The first file that is missing,
/// unreadable, or sized or bounded for a different run stops the restore; it and
/// every later slot get a fresh random collector instead. Restored
/// collectors keep the fitness stored in their file.
pub fn restore_population<'a>(
    size: usize,
    width: usize,
    height: usize,
    max_height: f64,
    obstacle: &'a TriangleMesh,
    dir: impl AsRef<Path>,
    mut rng: StdRng,
) -> (Population<'a>, RestoreSummary) {
    let dir = dir.as_ref();
    let mut collectors = Vec::with_capacity(size);

    while collectors.len() < size {
        let path = checkpoint_path(dir, collectors.len());
        match load_for_grid(&path, width * height, max_height) {
            Ok(genome) => collectors.push(Collector::new(genome, width, height, obstacle)),
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "could not restore checkpoint, initializing remaining collectors randomly"
                );
                break;
            }
        }
    }

    let summary = RestoreSummary {
        restored: collectors.len(),
        randomized: size - collectors.len(),
    };
    while collectors.len() < size {
        collectors.push(Collector::random(width, height, max_height, obstacle, &mut rng));
    }

    info!(
        restored = summary.restored,
        randomized = summary.randomized,
        "population restored"
    );
    (Population::new(collectors, rng), summary)
}

fn load_for_grid(path: &Path, genes: usize, max_height: f64) -> Result<Genome, GenomeError> {
    let genome = Genome::load(path)?;
    if genome.len() != genes {
        return Err(GenomeError::ValueCountMismatch {
            expected: genes,
            actual: genome.len(),
        });
    }

    let (min, max) = genome.bounds();
    if (min, max) != (0.0, max_height) {
        return Err(GenomeError::BoundsMismatch {
            expected_min: 0.0,
            expected_max: max_height,
            actual_min: min,
            actual_max: max,
        });
    }
    Ok(genome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vertex;
    use rand::SeedableRng;

    fn wall() -> TriangleMesh {
        let a = Vertex::new(10.0, 0.001, -50.0);
        let b = Vertex::new(10.0, 100.0, -50.0);
        let c = Vertex::new(10.0, 100.0, 50.0);
        let d = Vertex::new(10.0, 0.001, 50.0);

        let mut mesh = TriangleMesh::default();
        mesh.push_triangle(Vertex::ZERO, [a, b, c]);
        mesh.push_triangle(Vertex::ZERO, [a, c, d]);
        mesh.compute_all();
        mesh
    }

    #[test]
    fn test_checkpoint_path() {
        assert_eq!(
            checkpoint_path("ckpt", 3),
            Path::new("ckpt").join("3.genome")
        );
    }

    #[test]
    fn test_write_then_restore() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = dir.path().join("checkpoint");
        let obstacle = wall();
        let rays = [Vertex::new(1.0, -1.0, 0.0).normalized()];

        let mut pop = Population::random(5, 3, 3, 2.0, &obstacle, StdRng::seed_from_u64(1));
        pop.evaluate(&rays);
        pop.rank();
        let ranked: Vec<Genome> = pop.ranked().map(|c| c.genome().clone()).collect();

        assert_eq!(write_checkpoint(&pop, &ckpt).unwrap(), 5);
        assert!(checkpoint_path(&ckpt, 4).exists());

        let (restored, summary) =
            restore_population(5, 3, 3, 2.0, &obstacle, &ckpt, StdRng::seed_from_u64(2));
        assert_eq!(summary, RestoreSummary { restored: 5, randomized: 0 });

        for (collector, genome) in restored.collectors.iter().zip(&ranked) {
            assert_eq!(collector.genome().values(), genome.values());
            assert_eq!(collector.fitness(), genome.fitness);
        }
    }

    #[test]
    fn test_restore_falls_back_to_random() {
        let dir = tempfile::tempdir().unwrap();
        let obstacle = wall();

        Genome::blank(9, 0.0, 2.0).save(checkpoint_path(dir.path(), 0)).unwrap();
        Genome::blank(9, 0.0, 2.0).save(checkpoint_path(dir.path(), 1)).unwrap();
        fs::write(checkpoint_path(dir.path(), 2), "garbage").unwrap();
        Genome::blank(9, 0.0, 2.0).save(checkpoint_path(dir.path(), 3)).unwrap();

        let (pop, summary) =
            restore_population(5, 3, 3, 2.0, &obstacle, dir.path(), StdRng::seed_from_u64(3));

        assert_eq!(summary, RestoreSummary { restored: 2, randomized: 3 });
        assert_eq!(pop.len(), 5);
        assert!(pop.collectors[..2]
            .iter()
            .all(|c| c.genome().values().iter().all(|&h| h == 0.0)));
    }

    #[test]
    fn test_restore_rejects_other_grid_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let obstacle = wall();
        Genome::blank(16, 0.0, 2.0).save(checkpoint_path(dir.path(), 0)).unwrap();

        let (pop, summary) =
            restore_population(2, 3, 3, 2.0, &obstacle, dir.path(), StdRng::seed_from_u64(4));

        assert_eq!(summary, RestoreSummary { restored: 0, randomized: 2 });
        assert!(pop.collectors.iter().all(|c| c.genome().len() == 9));
    }

    #[test]
    fn test_restore_rejects_corrupt_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let obstacle = wall();
        for rank in 0..4 {
            fs::write(checkpoint_path(dir.path(), rank), "9 0 2 0 1 1 1 1 1 1 1 1 1").unwrap();
        }

        let (mut pop, summary) =
            restore_population(4, 3, 3, 2.0, &obstacle, dir.path(), StdRng::seed_from_u64(6));
        assert_eq!(summary, RestoreSummary { restored: 0, randomized: 4 });

        // the random replacements breed without trouble
        let params = crate::evolution::EvolutionParams::default();
        let outcome = pop.evolve_generation(&[Vertex::new(1.0, -1.0, 0.0).normalized()], &params);
        assert_eq!(outcome.ranked_fitness.len(), 4);
    }

    #[test]
    fn test_restore_rejects_other_height_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let obstacle = wall();
        Genome::blank(9, 0.0, 2.0).save(checkpoint_path(dir.path(), 0)).unwrap();
        Genome::blank(9, 0.0, 5.0).save(checkpoint_path(dir.path(), 1)).unwrap();

        let (pop, summary) =
            restore_population(3, 3, 3, 2.0, &obstacle, dir.path(), StdRng::seed_from_u64(7));

        assert_eq!(summary, RestoreSummary { restored: 1, randomized: 2 });
        assert!(pop.collectors.iter().all(|c| c.genome().bounds() == (0.0, 2.0)));
    }

    #[test]
    fn test_restore_from_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let obstacle = wall();

        let (pop, summary) = restore_population(
            3,
            3,
            3,
            2.0,
            &obstacle,
            dir.path().join("nope"),
            StdRng::seed_from_u64(5),
        );

        assert_eq!(summary.randomized, 3);
        assert_eq!(pop.len(), 3);
    }
}
