// The generational loop and its periodic side effects
//
// Per generation: evolve (evaluate, rank, replace), print the report line,
// export the best collector when the generation is a multiple of
// `export_every`, advance the counter, then checkpoint when the new
// counter is a multiple of `checkpoint_every`.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::checkpoint::write_checkpoint;
use crate::config::RunConfig;
use crate::error::{Result, StlError};
use crate::evolution::{EvolutionParams, GenerationOutcome};
use crate::geometry::Vertex;
use crate::population::Population;

/// Where and how often the loop writes files
#[derive(Clone, Debug, PartialEq)]
pub struct RunSettings {
    /// Export the best mesh every this many generations (0 never)
    pub export_every: u32,
    /// Checkpoint every this many generations (0 never)
    pub checkpoint_every: u32,
    /// Directory receiving the exported STL files
    pub output_dir: PathBuf,
    /// Directory receiving the `<rank>.genome` files
    pub checkpoint_dir: PathBuf,
}

impl RunSettings {
    pub fn from_config(config: &RunConfig, output_dir: impl Into<PathBuf>, checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_every: config.export_every,
            checkpoint_every: config.checkpoint_every,
            output_dir: output_dir.into(),
            checkpoint_dir: checkpoint_dir.into(),
        }
    }
}

fn is_due(generation: u64, every: u32) -> bool {
    every != 0 && generation % every as u64 == 0
}

/// Export the best ranked collector as `Gen<g>Fit<f>.stl`
///
/// The triangles that reflect onto the obstacle go next to it as
/// `Gen<g>Fit<f>_reflection.stl`. `f` is the fitness truncated to an
/// integer. Returns the path of the main export.
pub fn export_best(population: &Population<'_>, rays: &[Vertex], output_dir: impl AsRef<Path>) -> std::result::Result<PathBuf, StlError> {
    let best = population.best();
    let stem = format!(
        "Gen{}Fit{}",
        population.generation,
        best.fitness().unwrap_or(0.0) as i64
    );

    let path = output_dir.as_ref().join(format!("{}.stl", stem));
    best.export_binary_stl(&path)?;
    best.reflecting_mesh(rays)
        .export_binary_stl(output_dir.as_ref().join(format!("{}_reflection.stl", stem)))?;

    info!(
        generation = population.generation,
        fitness = best.fitness().unwrap_or(0.0),
        path = %path.display(),
        "exported best collector"
    );
    Ok(path)
}

/// Run the generational loop
///
/// Writes the report header and one report line per generation to
/// `report`. Stops after `limit` generations, or never when `limit` is
/// `None`. `on_generation` sees every outcome once its files are written.
pub fn run_generations(
    population: &mut Population<'_>,
    rays: &[Vertex],
    params: &EvolutionParams,
    settings: &RunSettings,
    report: &mut impl Write,
    limit: Option<u64>,
    mut on_generation: impl FnMut(&GenerationOutcome),
) -> Result<()> {
    writeln!(report, "{}", population.report_header())?;

    let mut done = 0;
    while limit.map_or(true, |n| done < n) {
        let outcome = population.evolve_generation(rays, params);
        writeln!(report, "{}", outcome.report)?;
        report.flush()?;

        if is_due(outcome.generation, settings.export_every) {
            export_best(population, rays, &settings.output_dir)?;
        }

        population.generation += 1;

        if is_due(population.generation, settings.checkpoint_every) {
            write_checkpoint(population, &settings.checkpoint_dir)?;
        }

        on_generation(&outcome);
        done += 1;
    }

    Ok(())
}
