// Collectors and the fitness scoring they share
use crate::collector::Collector;
use crate::geometry::{TriangleMesh, Vertex};

use rand::rngs::StdRng;

// Rayon for parallel fitness evaluation
use rayon::prelude::*;

use std::fmt::Write as _;

/// Population of collectors evolving toward the best reflector
///
/// The collectors are stored in slots that never move. Ranking is kept as
/// a separate permutation (`ranking[0]` is the slot of the best
/// collector), so replacing weak collectors only overwrites their slots.
///
/// **Rust Concept: Lifetimes on containers**
/// `Population<'a>` holds `Collector<'a>` values, so the obstacle they all
/// borrow must outlive the population as well.
pub struct Population<'a> {
    /// Every collector, indexed by slot
    pub collectors: Vec<Collector<'a>>,

    /// Current generation number (starts at 0)
    pub generation: u64,

    /// Slot indices ordered by descending fitness
    ranking: Vec<usize>,

    /// Source of randomness for every genetic operator
    rng: StdRng,
}

impl<'a> Population<'a> {
    /// Wrap existing collectors, ranked in slot order until [`rank`](Self::rank) runs
    pub fn new(collectors: Vec<Collector<'a>>, rng: StdRng) -> Self {
        let ranking = (0..collectors.len()).collect();
        Self {
            collectors,
            generation: 0,
            ranking,
            rng,
        }
    }

    /// Create `size` random collectors over a `width` x `height` grid
    pub fn random(
        size: usize,
        width: usize,
        height: usize,
        max_height: f64,
        obstacle: &'a TriangleMesh,
        mut rng: StdRng,
    ) -> Self {
        let collectors = (0..size)
            .map(|_| Collector::random(width, height, max_height, obstacle, &mut rng))
            .collect();
        Self::new(collectors, rng)
    }

    /// Score every collector that has no fitness yet, in parallel
    ///
    /// Collectors that kept their fitness from an earlier generation are
    /// skipped. Returns how many were scored.
    ///
    /// **Rust Concept: Parallel Mutation**
    /// `.par_iter_mut()` hands each thread exclusive `&mut` access to its
    /// own collectors, while the obstacle and rays are shared read-only.
    pub fn evaluate(&mut self, rays: &[Vertex]) -> usize {
        self.collectors
            .par_iter_mut()
            .filter(|c| !c.is_evaluated())
            .map(|c| {
                c.compute_fitness(rays);
            })
            .count()
    }

    /// Sort the ranking by descending fitness
    ///
    /// Unevaluated collectors rank last. Ties keep their previous order.
    pub fn rank(&mut self) {
        let collectors = &self.collectors;
        let score = |slot: usize| collectors[slot].fitness().unwrap_or(f64::NEG_INFINITY);
        self.ranking.sort_by(|&a, &b| score(b).total_cmp(&score(a)));
    }

    /// Slot indices in rank order
    pub fn ranking(&self) -> &[usize] {
        &self.ranking
    }

    /// Collectors in rank order, best first
    pub fn ranked(&self) -> impl Iterator<Item = &Collector<'a>> + '_ {
        self.ranking.iter().map(move |&slot| &self.collectors[slot])
    }

    /// The collector ranked first
    ///
    /// # Panics
    /// Panics if the population is empty
    pub fn best(&self) -> &Collector<'a> {
        &self.collectors[self.ranking[0]]
    }

    /// Mean fitness of the evaluated collectors, 0 when none are evaluated
    pub fn average_fitness(&self) -> f64 {
        let scores: Vec<f64> = self.collectors.iter().filter_map(|c| c.fitness()).collect();
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }

    /// `Gen;F0;F1;...;F{n-1}`
    pub fn report_header(&self) -> String {
        let mut line = String::from("Gen");
        for i in 0..self.collectors.len() {
            let _ = write!(line, ";F{}", i);
        }
        line
    }

    /// `generation;f0;f1;...` with fitness values in rank order
    pub fn report_line(&self) -> String {
        let mut line = self.generation.to_string();
        for collector in self.ranked() {
            let _ = write!(line, ";{}", collector.fitness().unwrap_or(0.0));
        }
        line
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Split borrow used by the genetic operators: collectors, ranking, rng
    pub(crate) fn parts_mut(&mut self) -> (&mut Vec<Collector<'a>>, &[usize], &mut StdRng) {
        (&mut self.collectors, &self.ranking, &mut self.rng)
    }
}
