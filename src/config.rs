// Run configuration loaded from a flat `key = value` file
//
// Example:
//
//   # panel size in cells
//   xsize = 180
//   ysize = 940
//   hmax = 180
//   popsize = 60
//   crossover_bias = 0.6
//   mutation_probability = 0.05
//   mutation_range = 0.225
//   termination_ratio = 0.33
//   checkpoint_every = 50
//   export_every = 10
//   start_from_checkpoint = false
//   ray = 0,-1,0
//   ray = 0.2,-1,0

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::evolution::EvolutionParams;
use crate::geometry::Vertex;

/// Everything a run needs to know, straight from the configuration file
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Panel size along x, in grid cells
    pub xsize: u32,
    /// Panel size along the other horizontal axis, in grid cells
    pub ysize: u32,
    /// Maximum panel height
    pub hmax: u32,
    /// Number of collectors in the population
    pub popsize: usize,

    pub crossover_bias: f64,
    pub mutation_probability: f64,
    pub mutation_range: f64,

    /// Fraction of the ranked population replaced every generation
    pub termination_ratio: f64,

    /// Checkpoint once every this many generations (0 disables)
    pub checkpoint_every: u32,
    /// Export the best mesh once every this many generations (0 disables)
    pub export_every: u32,

    pub start_from_checkpoint: bool,

    /// Incoming light directions, in file order
    pub rays: Vec<Vertex>,
}

impl RunConfig {
    /// Read and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse and validate configuration text
    ///
    /// Lines are trimmed; empty lines and `#` comments are skipped. Each
    /// `ray = x,y,z` line adds one ray. For every other key the last
    /// occurrence wins.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut settings: HashMap<&str, &str> = HashMap::new();
        let mut rays = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::InvalidLine {
                line: idx + 1,
                text: line.to_string(),
            })?;
            let (key, value) = (key.trim(), value.trim());

            if key == "ray" {
                rays.push(parse_ray(value)?);
            } else {
                settings.insert(key, value);
            }
        }

        let config = Self {
            xsize: required(&settings, "xsize")?,
            ysize: required(&settings, "ysize")?,
            hmax: required(&settings, "hmax")?,
            popsize: required(&settings, "popsize")?,
            crossover_bias: required(&settings, "crossover_bias")?,
            mutation_probability: required(&settings, "mutation_probability")?,
            mutation_range: required(&settings, "mutation_range")?,
            termination_ratio: required(&settings, "termination_ratio")?,
            checkpoint_every: required(&settings, "checkpoint_every")?,
            export_every: required(&settings, "export_every")?,
            start_from_checkpoint: *settings
                .get("start_from_checkpoint")
                .ok_or(ConfigError::MissingKey("start_from_checkpoint"))?
                == "true",
            rays,
        };

        for key in settings.keys().filter(|k| !KNOWN_KEYS.contains(*k)) {
            debug!(key, "ignoring unknown configuration key");
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.xsize < 2 || self.ysize < 2 {
            return Err(ConfigError::Validation(
                "xsize and ysize need to be greater than 1".into(),
            ));
        }
        if self.popsize == 0 {
            return Err(ConfigError::Validation(
                "popsize needs to be greater than 0".into(),
            ));
        }

        for (key, value) in [
            ("crossover_bias", self.crossover_bias),
            ("mutation_probability", self.mutation_probability),
            ("termination_ratio", self.termination_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    key, value
                )));
            }
        }
        if !(self.mutation_range >= 0.0 && self.mutation_range.is_finite()) {
            return Err(ConfigError::Validation(format!(
                "mutation_range must be a non-negative number, got {}",
                self.mutation_range
            )));
        }

        if self.popsize % 4 != 0 {
            warn!(popsize = self.popsize, "population size is not divisible by 4");
        }
        if self.rays.is_empty() {
            warn!("no `ray` lines configured, every fitness will be 0");
        }

        Ok(())
    }

    /// Grid vertices along x (`xsize` cells need `xsize + 1` vertices)
    pub fn grid_width(&self) -> usize {
        self.xsize as usize + 1
    }

    /// Grid vertices along the second horizontal axis
    pub fn grid_height(&self) -> usize {
        self.ysize as usize + 1
    }

    /// Upper bound for every panel height
    pub fn max_height(&self) -> f64 {
        self.hmax as f64 + 1.0
    }

    /// Translation applied to the obstacle after loading
    ///
    /// Centres it over the panel along x and lifts it to half the height
    /// range.
    pub fn obstacle_offset(&self) -> (f64, f64) {
        (self.xsize as f64 / 2.0, self.hmax as f64 / 2.0)
    }

    pub fn evolution_params(&self) -> EvolutionParams {
        EvolutionParams {
            crossover_bias: self.crossover_bias,
            mutation_probability: self.mutation_probability,
            mutation_range: self.mutation_range,
            termination_ratio: self.termination_ratio,
        }
    }
}

const KNOWN_KEYS: [&str; 11] = [
    "xsize",
    "ysize",
    "hmax",
    "popsize",
    "crossover_bias",
    "mutation_probability",
    "mutation_range",
    "termination_ratio",
    "checkpoint_every",
    "export_every",
    "start_from_checkpoint",
];

fn required<T: FromStr>(settings: &HashMap<&str, &str>, key: &'static str) -> Result<T, ConfigError> {
    let value = settings.get(key).ok_or(ConfigError::MissingKey(key))?;
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_ray(value: &str) -> Result<Vertex, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: "ray".to_string(),
        value: value.to_string(),
    };

    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;

    match parts[..] {
        [x, y, z] if parts.iter().all(|c| c.is_finite()) => Ok(Vertex::new(x, y, z)),
        _ => Err(invalid()),
    }
}
