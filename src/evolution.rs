// Import types we need
use crate::collector::Collector;
use crate::genome::Genome;
use crate::geometry::Vertex;
use crate::population::Population;

use rand::seq::index;
use rand::Rng;

use std::time::Instant;
use tracing::debug;

/// Parameters controlling the evolution process
///
/// These are the "knobs" you can turn to control how evolution works.
///
/// **Rust Concept: Derive macros**
/// - `Clone` lets us copy the params
/// - `Debug` lets us print them with {:?}
/// - `PartialEq` lets tests compare them
#[derive(Clone, Debug, PartialEq)]
pub struct EvolutionParams {
    /// Probability that a child gene is taken from the first parent (0.0-1.0)
    pub crossover_bias: f64,

    /// Per-gene probability of a mutation (0.0-1.0)
    pub mutation_probability: f64,

    /// A mutation adds a uniform offset from `[-mutation_range, mutation_range]`
    pub mutation_range: f64,

    /// Fraction of the ranked population replaced every generation (0.0-1.0)
    /// 0 keeps everyone, 1 keeps only the two best as parents
    pub termination_ratio: f64,
}

/// Default parameters based on experimentation
impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            crossover_bias: 0.6,        // Slight preference for the first parent
            mutation_probability: 0.05, // Mutate 5% of the heights per child
            mutation_range: 0.225,      // Small height nudges
            termination_ratio: 0.33,    // Replace the weakest third
        }
    }
}

/// What happened in one call to [`Population::evolve_generation`]
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationOutcome {
    /// Generation the fitness values belong to
    pub generation: u64,

    /// Fitness of every collector in rank order, taken before replacement
    pub ranked_fitness: Vec<f64>,

    /// [`Population::report_line`] for the same moment
    pub report: String,

    /// Number of collectors evaluated this generation
    pub evaluated: usize,

    /// Number of weak collectors replaced by offspring
    pub replaced: usize,
}

impl GenerationOutcome {
    pub fn best_fitness(&self) -> f64 {
        self.ranked_fitness.first().copied().unwrap_or(0.0)
    }
}

// Additional methods for Population related to evolution
//
// **Rust Concept: Multiple impl blocks**
// This one is in evolution.rs, the other in population.rs.
impl<'a> Population<'a> {
    /// Size of the elite rank prefix that survives and breeds
    ///
    /// `floor(len * (1 - termination_ratio))`, raised to 2 so there are
    /// always two parents to pick from, and never more than the population.
    pub fn elite_count(&self, params: &EvolutionParams) -> usize {
        let survivors = (self.len() as f64 * (1.0 - params.termination_ratio)).floor() as usize;
        survivors.max(2).min(self.len())
    }

    /// Pick two distinct parents from the first `elite` ranks
    ///
    /// Returns slot indices. Both are the same slot only when `elite` is 1.
    ///
    /// # Panics
    /// Panics if `elite` is 0 or larger than the population
    pub fn select_parents(&mut self, elite: usize) -> (usize, usize) {
        assert!(
            elite > 0 && elite <= self.len(),
            "Elite prefix must be within the population"
        );

        let (_, ranking, rng) = self.parts_mut();
        if elite == 1 {
            return (ranking[0], ranking[0]);
        }
        let picks = index::sample(rng, elite, 2);
        (ranking[picks.index(0)], ranking[picks.index(1)])
    }

    /// Breed two collectors into a new unevaluated genome
    ///
    /// **Why static method?**
    /// This doesn't need access to Population data, just the two parents
    pub fn breed(
        parent_a: &Collector<'_>,
        parent_b: &Collector<'_>,
        params: &EvolutionParams,
        rng: &mut impl Rng,
    ) -> Genome {
        Genome::crossover(
            parent_a.genome(),
            parent_b.genome(),
            params.crossover_bias,
            params.mutation_probability,
            params.mutation_range,
            rng,
        )
    }

    /// Overwrite every collector ranked at or below the elite prefix
    ///
    /// Each weak slot receives a child of two elite parents. The elite
    /// itself is never touched, so later children in the same pass still
    /// breed from the same parents. Returns the number of slots replaced.
    ///
    /// Call [`rank`](Population::rank) first.
    pub fn replace_weak(&mut self, params: &EvolutionParams) -> usize {
        let elite = self.elite_count(params);
        let weak: Vec<usize> = self.ranking()[elite..].to_vec();

        for &slot in &weak {
            let (a, b) = self.select_parents(elite);
            let (collectors, _, rng) = self.parts_mut();

            let child = Self::breed(&collectors[a], &collectors[b], params, rng);
            let (width, height) = collectors[slot].dimensions();
            let obstacle = collectors[slot].obstacle();
            collectors[slot] = Collector::new(child, width, height, obstacle);
        }

        weak.len()
    }

    /// Evaluate, rank and replace for one generation
    ///
    /// **Genetic Algorithm Steps:**
    /// 1. Evaluate fitness of the new collectors (in parallel)
    /// 2. Rank everyone by fitness
    /// 3. Replace the weak ranks with children of the elite
    ///
    /// The generation counter is left alone: exports of the best
    /// collector still belong to this generation, so the caller
    /// advances it once those are done.
    pub fn evolve_generation(&mut self, rays: &[Vertex], params: &EvolutionParams) -> GenerationOutcome {
        let started = Instant::now();
        let evaluated = self.evaluate(rays);
        let evaluate_time = started.elapsed();

        self.rank();
        let ranked_fitness = self.ranked().map(|c| c.fitness().unwrap_or(0.0)).collect();
        let report = self.report_line();

        let started = Instant::now();
        let replaced = self.replace_weak(params);

        debug!(
            generation = self.generation,
            evaluated,
            replaced,
            evaluate_ms = evaluate_time.as_millis() as u64,
            breed_ms = started.elapsed().as_millis() as u64,
            "generation evolved"
        );

        GenerationOutcome {
            generation: self.generation,
            ranked_fitness,
            report,
            evaluated,
            replaced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TriangleMesh;
    use rand::rngs::StdRng;
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

    fn tilted_ray() -> Vec<Vertex> {
        vec![Vertex::new(1.0, -1.0, 0.0).normalized()]
    }

    fn params(termination_ratio: f64) -> EvolutionParams {
        EvolutionParams {
            termination_ratio,
            ..EvolutionParams::default()
        }
    }

    #[test]
    fn test_evolution_params_default() {
        let params = EvolutionParams::default();
        assert_eq!(params.crossover_bias, 0.6);
        assert_eq!(params.mutation_probability, 0.05);
        assert_eq!(params.mutation_range, 0.225);
        assert_eq!(params.termination_ratio, 0.33);
    }

    #[test]
    fn test_elite_count() {
        let obstacle = wall();
        let pop = Population::random(10, 3, 3, 1.0, &obstacle, StdRng::seed_from_u64(1));

        assert_eq!(pop.elite_count(&params(0.0)), 10);
        assert_eq!(pop.elite_count(&params(0.25)), 7);
        assert_eq!(pop.elite_count(&params(0.5)), 5);
        // Always keep two parents
        assert_eq!(pop.elite_count(&params(1.0)), 2);

        let single = Population::random(1, 3, 3, 1.0, &obstacle, StdRng::seed_from_u64(1));
        assert_eq!(single.elite_count(&params(1.0)), 1);
    }

    #[test]
    fn test_parent_selection_is_distinct_and_elite() {
        let obstacle = wall();
        let mut pop = Population::random(10, 3, 3, 2.0, &obstacle, StdRng::seed_from_u64(2));
        pop.evaluate(&tilted_ray());
        pop.rank();

        let elite: Vec<usize> = pop.ranking()[..4].to_vec();
        for _ in 0..100 {
            let (a, b) = pop.select_parents(4);
            assert_ne!(a, b);
            assert!(elite.contains(&a));
            assert!(elite.contains(&b));
        }
    }

    #[test]
    fn test_breeding() {
        let obstacle = wall();
        let mut rng = StdRng::seed_from_u64(3);
        let parent_a = Collector::random(4, 3, 2.0, &obstacle, &mut rng);
        let parent_b = Collector::random(4, 3, 2.0, &obstacle, &mut rng);

        let child = Population::breed(&parent_a, &parent_b, &EvolutionParams::default(), &mut rng);

        assert_eq!(child.len(), 12);
        assert_eq!(child.bounds(), (0.0, 2.0));
        assert!(child.fitness.is_none());
    }

    #[test]
    fn test_replace_weak_keeps_elite() {
        let obstacle = wall();
        let mut pop = Population::random(8, 3, 3, 2.0, &obstacle, StdRng::seed_from_u64(4));
        pop.evaluate(&tilted_ray());
        pop.rank();

        let elite_slots: Vec<usize> = pop.ranking()[..6].to_vec();
        let elite_genomes: Vec<Genome> = elite_slots
            .iter()
            .map(|&s| pop.collectors[s].genome().clone())
            .collect();

        let replaced = pop.replace_weak(&params(0.25));
        assert_eq!(replaced, 2);
        assert_eq!(pop.len(), 8);

        for (slot, genome) in elite_slots.iter().zip(&elite_genomes) {
            assert_eq!(pop.collectors[*slot].genome(), genome);
        }
        for &slot in &pop.ranking()[6..] {
            assert!(!pop.collectors[slot].is_evaluated());
        }
    }

    #[test]
    fn test_zero_termination_ratio_replaces_nobody() {
        let obstacle = wall();
        let mut pop = Population::random(6, 3, 3, 2.0, &obstacle, StdRng::seed_from_u64(5));
        pop.evaluate(&tilted_ray());
        pop.rank();

        assert_eq!(pop.replace_weak(&params(0.0)), 0);
        assert!(pop.collectors.iter().all(|c| c.is_evaluated()));
    }

    #[test]
    fn test_evolution_cycle() {
        let obstacle = wall();
        let mut pop = Population::random(12, 3, 3, 2.0, &obstacle, StdRng::seed_from_u64(6));
        let params = params(0.5);

        let outcome = pop.evolve_generation(&tilted_ray(), &params);

        assert_eq!(outcome.generation, 0);
        assert_eq!(outcome.evaluated, 12);
        assert_eq!(outcome.replaced, 6);
        assert_eq!(outcome.ranked_fitness.len(), 12);
        assert!(outcome
            .ranked_fitness
            .windows(2)
            .all(|w| w[0] >= w[1]));
        assert_eq!(outcome.best_fitness(), outcome.ranked_fitness[0]);
        assert!(outcome.report.starts_with("0;"));
        assert_eq!(outcome.report.split(';').count(), 13);

        // The counter belongs to the caller
        assert_eq!(pop.generation, 0);
        assert_eq!(pop.len(), 12);

        // Only the offspring need scoring next time
        let next = pop.evolve_generation(&tilted_ray(), &params);
        assert_eq!(next.evaluated, 6);
    }

    #[test]
    fn test_best_never_gets_worse() {
        let obstacle = wall();
        let mut pop = Population::random(8, 3, 3, 2.0, &obstacle, StdRng::seed_from_u64(7));
        let params = params(0.5);

        let mut best = f64::MIN;
        for _ in 0..10 {
            let outcome = pop.evolve_generation(&tilted_ray(), &params);
            assert!(outcome.best_fitness() >= best);
            best = outcome.best_fitness();
            pop.generation += 1;
        }
        assert_eq!(pop.generation, 10);
        assert_eq!(pop.len(), 8);
    }

    #[test]
    fn test_single_collector_population() {
        let obstacle = wall();
        let mut pop = Population::random(1, 3, 3, 2.0, &obstacle, StdRng::seed_from_u64(8));

        let outcome = pop.evolve_generation(&tilted_ray(), &params(1.0));
        assert_eq!(outcome.replaced, 0);
        assert_eq!(pop.len(), 1);
    }
}
