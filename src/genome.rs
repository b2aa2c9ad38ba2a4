// Random utilities for initial values, crossover and mutation
use rand::Rng;

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::error::GenomeError;

/// A fixed-length vector of real-valued genes
///
/// For a solar collector every gene is the height of one grid vertex.
/// All genes stay inside `[min_bound, max_bound]`.
///
/// **Rust Concept: Option<T> for "not evaluated yet"**
/// `fitness` is `None` until somebody computes it. A genome that scores a
/// genuine zero is `Some(0.0)`, so the two cases cannot be confused.
#[derive(Clone, Debug, PartialEq)]
pub struct Genome {
    values: Vec<f64>,

    /// `None` means not yet evaluated
    pub fitness: Option<f64>,

    min_bound: f64,
    max_bound: f64,
}

impl Genome {
    /// Genome with every gene at `min_bound`
    pub fn blank(size: usize, min_bound: f64, max_bound: f64) -> Self {
        Self {
            values: vec![min_bound; size],
            fitness: None,
            min_bound,
            max_bound,
        }
    }

    /// Genome with genes drawn uniformly from `[min_bound, max_bound]`
    pub fn random(size: usize, min_bound: f64, max_bound: f64, rng: &mut impl Rng) -> Self {
        let values = (0..size)
            .map(|_| rng.gen_range(min_bound..=max_bound))
            .collect();

        Self {
            values,
            fitness: None,
            min_bound,
            max_bound,
        }
    }

    /// Genome from explicit values, each clamped into the bounds
    pub fn from_values(values: Vec<f64>, min_bound: f64, max_bound: f64) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.clamp(min_bound, max_bound))
            .collect();

        Self {
            values,
            fitness: None,
            min_bound,
            max_bound,
        }
    }

    /// Breed one offspring from two parents
    ///
    /// Every gene is decided on its own:
    /// 1. with probability `crossover_bias` it comes from `parent_a`,
    ///    otherwise from `parent_b`
    /// 2. with probability `mutation_probability` it is nudged by a uniform
    ///    amount in `[-mutation_range, mutation_range]`
    /// 3. the result is clamped into the bounds
    ///
    /// The child inherits `parent_a`'s bounds and starts unevaluated.
    ///
    /// # Panics
    /// Panics if the parents have different lengths or a probability is
    /// outside `[0, 1]`
    pub fn crossover(
        parent_a: &Genome,
        parent_b: &Genome,
        crossover_bias: f64,
        mutation_probability: f64,
        mutation_range: f64,
        rng: &mut impl Rng,
    ) -> Genome {
        assert_eq!(
            parent_a.len(),
            parent_b.len(),
            "Parents must have the same number of genes"
        );

        let (lo, hi) = (parent_a.min_bound, parent_a.max_bound);
        let values = parent_a
            .values
            .iter()
            .zip(&parent_b.values)
            .map(|(&a, &b)| {
                let mut gene = if rng.gen_bool(crossover_bias) { a } else { b };
                if rng.gen_bool(mutation_probability) {
                    gene += rng.gen_range(-mutation_range..=mutation_range);
                }
                gene.clamp(lo, hi)
            })
            .collect();

        Genome {
            values,
            fitness: None,
            min_bound: lo,
            max_bound: hi,
        }
    }

    /// Mean absolute gene difference, scaled by the bound width
    ///
    /// 0.0 for identical genomes, 1.0 when every gene sits on opposite
    /// bounds. Think of it as a bit error rate for continuous genes.
    ///
    /// # Panics
    /// Panics if the genomes have different lengths
    pub fn similarity(&self, other: &Genome) -> f64 {
        assert_eq!(
            self.len(),
            other.len(),
            "Genomes must have the same number of genes"
        );

        let range = self.max_bound - self.min_bound;
        if self.values.is_empty() || range <= 0.0 {
            return 0.0;
        }

        let total: f64 = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .sum();

        total / (self.values.len() as f64 * range)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Overwrite one gene, clamped into the bounds
    ///
    /// Resets the fitness since the old score no longer applies.
    pub fn set(&mut self, i: usize, value: f64) {
        self.values[i] = value.clamp(self.min_bound, self.max_bound);
        self.fitness = None;
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min_bound, self.max_bound)
    }

    /// Encode as the flat `size fitness min max v0 v1 ...` record
    ///
    /// An unevaluated genome writes `NaN` as its fitness.
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Decode a record produced by [`serialize`](Self::serialize)
    ///
    /// A non-finite fitness reads back as `None`.
    pub fn deserialize(record: &str) -> Result<Genome, GenomeError> {
        record.parse()
    }

    /// Write the record to `path`, replacing any previous file atomically
    ///
    /// The record goes to a temporary file in the same directory first and
    /// is renamed over `path` once fully on disk, so readers never see a
    /// half-written record.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GenomeError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(self.serialize().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Read a record written by [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Genome, GenomeError> {
        let text = fs::read_to_string(path)?;
        Genome::deserialize(&text)
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.values.len(),
            self.fitness.unwrap_or(f64::NAN),
            self.min_bound,
            self.max_bound
        )?;
        for v in &self.values {
            write!(f, " {}", v)?;
        }
        Ok(())
    }
}

impl FromStr for Genome {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();

        fn field<T: FromStr>(
            tokens: &mut std::str::SplitWhitespace<'_>,
            name: &'static str,
        ) -> Result<T, GenomeError> {
            let raw = tokens.next().ok_or(GenomeError::MissingField(name))?;
            raw.parse().map_err(|_| GenomeError::InvalidField {
                field: name,
                value: raw.to_string(),
            })
        }

        let size: usize = field(&mut tokens, "size")?;
        let fitness: f64 = field(&mut tokens, "fitness")?;
        let min_bound: f64 = field(&mut tokens, "min_bound")?;
        let max_bound: f64 = field(&mut tokens, "max_bound")?;

        let values = tokens
            .map(|raw| {
                raw.parse::<f64>().map_err(|_| GenomeError::InvalidField {
                    field: "value",
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if values.len() != size {
            return Err(GenomeError::ValueCountMismatch {
                expected: size,
                actual: values.len(),
            });
        }

        if !(min_bound.is_finite() && max_bound.is_finite() && min_bound <= max_bound) {
            return Err(GenomeError::InvalidBounds {
                min: min_bound,
                max: max_bound,
            });
        }
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(min_bound..=max_bound).contains(*v))
        {
            return Err(GenomeError::ValueOutOfBounds {
                index,
                value,
                min: min_bound,
                max: max_bound,
            });
        }

        Ok(Genome {
            values,
            fitness: fitness.is_finite().then_some(fitness),
            min_bound,
            max_bound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_random_genome_within_bounds() {
        let g = Genome::random(500, 0.0, 3.0, &mut rng());
        assert_eq!(g.len(), 500);
        assert!(g.fitness.is_none());
        assert!(g.values().iter().all(|&v| (0.0..=3.0).contains(&v)));
    }

    #[test]
    fn test_crossover_clamps_every_gene() {
        let mut rng = rng();
        let a = Genome::from_values(vec![0.0; 200], 0.0, 1.0);
        let b = Genome::from_values(vec![1.0; 200], 0.0, 1.0);

        for range in [0.0, 0.5, 10.0, 1e6] {
            let child = Genome::crossover(&a, &b, 0.5, 1.0, range, &mut rng);
            assert!(child.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
            assert!(child.fitness.is_none());
        }
    }

    #[test]
    fn test_crossover_bias_selects_parent() {
        let mut rng = rng();
        let a = Genome::from_values(vec![0.25; 50], 0.0, 1.0);
        let b = Genome::from_values(vec![0.75; 50], 0.0, 1.0);

        let all_a = Genome::crossover(&a, &b, 1.0, 0.0, 0.1, &mut rng);
        assert_eq!(all_a.values(), a.values());

        let all_b = Genome::crossover(&a, &b, 0.0, 0.0, 0.1, &mut rng);
        assert_eq!(all_b.values(), b.values());
    }

    #[test]
    fn test_crossover_mutation_stays_within_range() {
        let mut rng = rng();
        let a = Genome::from_values(vec![5.0; 100], 0.0, 10.0);
        let child = Genome::crossover(&a, &a, 0.5, 1.0, 0.3, &mut rng);

        assert!(child.values().iter().all(|&v| (v - 5.0).abs() <= 0.3 + 1e-12));
        assert!(child.values().iter().any(|&v| v != 5.0));
    }

    #[test]
    #[should_panic(expected = "Parents must have the same number of genes")]
    fn test_crossover_length_mismatch_panics() {
        let a = Genome::blank(3, 0.0, 1.0);
        let b = Genome::blank(4, 0.0, 1.0);
        Genome::crossover(&a, &b, 0.5, 0.1, 0.1, &mut rng());
    }

    #[test]
    fn test_similarity() {
        let a = Genome::from_values(vec![0.0, 0.0, 0.0, 0.0], 0.0, 2.0);
        let b = Genome::from_values(vec![2.0, 2.0, 2.0, 2.0], 0.0, 2.0);
        let c = Genome::from_values(vec![1.0, 0.0, 2.0, 0.0], 0.0, 2.0);

        assert_eq!(a.similarity(&a), 0.0);
        assert_eq!(a.similarity(&b), 1.0);
        assert_eq!(a.similarity(&c), 0.375);
    }

    #[test]
    fn test_set_clamps_and_resets_fitness() {
        let mut g = Genome::blank(2, 0.0, 1.0);
        g.fitness = Some(4.0);
        g.set(0, 7.0);
        g.set(1, -3.0);
        assert_eq!(g.values(), &[1.0, 0.0]);
        assert!(g.fitness.is_none());
    }

    #[test]
    fn test_serialize_format() {
        let mut g = Genome::from_values(vec![0.5, 1.0], 0.0, 1.0);
        g.fitness = Some(12.0);
        assert_eq!(g.serialize(), "2 12 0 1 0.5 1");
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut g = Genome::random(64, 0.0, 4.5, &mut rng());
        g.set(0, 0.0);
        g.set(1, 4.5);
        g.fitness = Some(321.0);
        assert_eq!(Genome::deserialize(&g.serialize()).unwrap(), g);

        // unevaluated genomes survive as unevaluated
        let fresh = Genome::random(8, -1.0, 1.0, &mut rng());
        assert_eq!(Genome::deserialize(&fresh.serialize()).unwrap(), fresh);

        let zero = Genome {
            fitness: Some(0.0),
            ..Genome::blank(3, 0.0, 1.0)
        };
        assert_eq!(Genome::deserialize(&zero.serialize()).unwrap(), zero);
    }

    #[test]
    fn test_deserialize_accepts_any_whitespace() {
        let g = Genome::deserialize("3\n5.0\t0 2\n\n0.1 0.2\n0.3").unwrap();
        assert_eq!(g.values(), &[0.1, 0.2, 0.3]);
        assert_eq!(g.fitness, Some(5.0));
        assert_eq!(g.bounds(), (0.0, 2.0));
    }

    #[test]
    fn test_deserialize_errors() {
        assert!(matches!(
            Genome::deserialize(""),
            Err(GenomeError::MissingField("size"))
        ));
        assert!(matches!(
            Genome::deserialize("2 1 0"),
            Err(GenomeError::MissingField("max_bound"))
        ));
        assert!(matches!(
            Genome::deserialize("2 abc 0 1 0 0"),
            Err(GenomeError::InvalidField { field: "fitness", .. })
        ));
        assert!(matches!(
            Genome::deserialize("2 1 0 1 0.5 x"),
            Err(GenomeError::InvalidField { field: "value", .. })
        ));
        assert!(matches!(
            Genome::deserialize("3 1 0 1 0.5 0.5"),
            Err(GenomeError::ValueCountMismatch { expected: 3, actual: 2 })
        ));
        assert!(matches!(
            Genome::deserialize("1 1 0 1 0.5 0.5"),
            Err(GenomeError::ValueCountMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_deserialize_rejects_bad_bounds() {
        assert!(matches!(
            Genome::deserialize("9 0 2 0 1 1 1 1 1 1 1 1 1"),
            Err(GenomeError::InvalidBounds { .. })
        ));
        assert!(matches!(
            Genome::deserialize("1 0 NaN 1 0.5"),
            Err(GenomeError::InvalidBounds { .. })
        ));
        assert!(matches!(
            Genome::deserialize("1 0 0 inf 0.5"),
            Err(GenomeError::InvalidBounds { .. })
        ));

        // a degenerate range is still a range
        let flat = Genome::deserialize("2 0 1 1 1 1").unwrap();
        assert_eq!(flat.bounds(), (1.0, 1.0));
    }

    #[test]
    fn test_deserialize_rejects_values_outside_bounds() {
        assert!(matches!(
            Genome::deserialize("2 1 0 1 5 -3"),
            Err(GenomeError::ValueOutOfBounds { index: 0, value, .. }) if value == 5.0
        ));
        assert!(matches!(
            Genome::deserialize("3 1 0 1 0 1 -0.5"),
            Err(GenomeError::ValueOutOfBounds { index: 2, .. })
        ));
        assert!(matches!(
            Genome::deserialize("1 1 0 1 NaN"),
            Err(GenomeError::ValueOutOfBounds { index: 0, .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("0.genome");
        let mut g = Genome::random(10, 0.0, 1.0, &mut rng());
        g.fitness = Some(3.0);

        g.save(&path).unwrap();
        // saving again replaces the record instead of appending
        g.save(&path).unwrap();

        assert_eq!(Genome::load(&path).unwrap(), g);
        // no temporary files are left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
