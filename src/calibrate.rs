// Height distribution calibration
//
// Scores a fixed sample of random panels at a range of height scales so
// the initial height distribution can be picked by eye. Output is the
// same `;`-separated shape as the progress report:
//
//   hub;S0;S1;...;S11
//   0;f0;f1;...;f11
//   <scale>;...

use std::io::{self, Write};

use rand::Rng;

use crate::collector::Collector;
use crate::genome::Genome;
use crate::geometry::{TriangleMesh, Vertex};

/// Number of panels scored at every scale
pub const SAMPLES: usize = 12;

/// Number of height scales, evenly spaced from 0 to the height bound
pub const SCALES: usize = 10;

/// The single ray every calibration panel is scored against
pub const CALIBRATION_RAY: Vertex = Vertex::new(0.0, -1.0, 0.0);

/// Heights of every sample are drawn once as unit values, then multiplied
/// by each scale in turn. Returns one row of fitness values per scale.
pub fn calibrate(
    width: usize,
    height: usize,
    max_height: f64,
    obstacle: &TriangleMesh,
    rng: &mut impl Rng,
    out: &mut impl Write,
) -> io::Result<Vec<Vec<f64>>> {
    let unit: Vec<Vec<f64>> = (0..SAMPLES)
        .map(|_| (0..width * height).map(|_| rng.gen::<f64>()).collect())
        .collect();

    let mut header = String::from("hub");
    for i in 0..SAMPLES {
        header.push_str(&format!(";S{}", i));
    }
    writeln!(out, "{}", header)?;

    let step = max_height / (SCALES - 1) as f64;
    let mut rows = Vec::with_capacity(SCALES);

    for s in 0..SCALES {
        let scale = step * s as f64;
        let row: Vec<f64> = unit
            .iter()
            .map(|values| {
                let heights = values.iter().map(|u| u * scale).collect();
                let genome = Genome::from_values(heights, 0.0, max_height);
                let mut collector = Collector::new(genome, width, height, obstacle);
                collector.compute_fitness(&[CALIBRATION_RAY])
            })
            .collect();

        let mut line = scale.to_string();
        for fitness in &row {
            line.push_str(&format!(";{}", fitness));
        }
        writeln!(out, "{}", line)?;
        rows.push(row);
    }

    Ok(rows)
}
