//! Generate a synthetic fMRIprep-style confounds TSV plus its JSON sidecar,
//! for demos and manual testing. Deterministic: same output on every run.

use ndarray::Array2;
use serde_json::{json, Map, Value};

use fmriprep_confounds::confounds::writer::write_table;
use fmriprep_confounds::ConfoundTable;

const N_FRAMES: usize = 200;
const OUTPUT_STEM: &str = "sub-01_task-rest_desc-confounds_timeseries";

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn random_walk(rng: &mut SimpleRng, step: f64, n: usize) -> Vec<f64> {
    let mut series = Vec::with_capacity(n);
    let mut value = 0.0;
    for _ in 0..n {
        value += rng.gauss(0.0, step);
        series.push(value);
    }
    series
}

fn noise(rng: &mut SimpleRng, std_dev: f64, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gauss(0.0, std_dev)).collect()
}

/// Temporal derivative with n/a (NaN) at the first frame, as fMRIprep
/// writes it.
fn derivative(series: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(series.len());
    out.push(f64::NAN);
    for pair in series.windows(2) {
        out.push(pair[1] - pair[0]);
    }
    out
}

fn squared(series: &[f64]) -> Vec<f64> {
    series.iter().map(|v| v * v).collect()
}

/// DCT-II high-pass drift basis, as produced by fMRIprep.
fn cosine_basis(order: usize, n: usize) -> Vec<f64> {
    let norm = (2.0 / n as f64).sqrt();
    (0..n)
        .map(|t| {
            let angle = std::f64::consts::PI * (order as f64 + 1.0) * (2.0 * t as f64 + 1.0)
                / (2.0 * n as f64);
            norm * angle.cos()
        })
        .collect()
}

/// Append a base series with its three expansion columns.
fn push_expanded(columns: &mut Vec<(String, Vec<f64>)>, name: &str, series: Vec<f64>) {
    let deriv = derivative(&series);
    columns.push((name.to_string(), series.clone()));
    columns.push((format!("{name}_derivative1"), deriv.clone()));
    columns.push((format!("{name}_power2"), squared(&series)));
    columns.push((format!("{name}_derivative1_power2"), squared(&deriv)));
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let mut columns: Vec<(String, Vec<f64>)> = Vec::new();

    // Rigid-body motion: slow random walks, rotations an order smaller.
    let motion_names = ["trans_x", "trans_y", "trans_z", "rot_x", "rot_y", "rot_z"];
    let mut motion: Vec<Vec<f64>> = Vec::new();
    for (i, name) in motion_names.iter().enumerate() {
        let step = if i < 3 { 0.02 } else { 0.002 };
        let series = random_walk(&mut rng, step, N_FRAMES);
        motion.push(series.clone());
        push_expanded(&mut columns, name, series);
    }

    for name in ["csf", "white_matter", "global_signal"] {
        push_expanded(&mut columns, name, random_walk(&mut rng, 0.5, N_FRAMES));
    }

    for order in 0..8 {
        columns.push((format!("cosine{order:02}"), cosine_basis(order, N_FRAMES)));
    }

    for i in 0..12 {
        columns.push((format!("a_comp_cor_{i:02}"), noise(&mut rng, 1.0, N_FRAMES)));
    }
    for i in 0..7 {
        columns.push((format!("t_comp_cor_{i:02}"), noise(&mut rng, 1.0, N_FRAMES)));
    }
    for i in [2usize, 5] {
        columns.push((format!("aroma_motion_{i:02}"), noise(&mut rng, 1.0, N_FRAMES)));
    }

    // Framewise displacement from the motion walks, with a few injected
    // spikes so scrubbing has something to find.
    let mut fd = vec![f64::NAN];
    for t in 1..N_FRAMES {
        let displacement: f64 = motion
            .iter()
            .map(|series| (series[t] - series[t - 1]).abs())
            .sum();
        fd.push(displacement);
    }
    for spike in [50usize, 51, 120] {
        fd[spike] = 0.8;
    }
    columns.push(("framewise_displacement".to_string(), fd));

    let mut dvars = vec![f64::NAN];
    for _ in 1..N_FRAMES {
        dvars.push(1.0 + rng.gauss(0.0, 0.3).abs());
    }
    dvars[120] = 4.5;
    columns.push(("std_dvars".to_string(), dvars));

    // Assemble the table.
    let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
    let mut cells = Vec::with_capacity(N_FRAMES * names.len());
    for t in 0..N_FRAMES {
        for (_, series) in &columns {
            cells.push(series[t]);
        }
    }
    let data = Array2::from_shape_vec((N_FRAMES, names.len()), cells)
        .expect("column lengths are all N_FRAMES");
    let table = ConfoundTable::new(names, data).expect("names match data width");

    let tsv_path = format!("{OUTPUT_STEM}.tsv");
    write_table(tsv_path.as_ref(), &table, None).expect("failed to write tsv");

    // Sidecar: mask provenance for the anatomical CompCor components.
    let mut sidecar = Map::new();
    for i in 0..12 {
        let mask = match i {
            0..=5 => "combined",
            6..=8 => "WM",
            _ => "CSF",
        };
        sidecar.insert(
            format!("a_comp_cor_{i:02}"),
            json!({
                "Method": "aCompCor",
                "Mask": mask,
                "Retained": true,
                "VarianceExplained": 0.05,
            }),
        );
    }
    for i in 0..7 {
        sidecar.insert(
            format!("t_comp_cor_{i:02}"),
            json!({ "Method": "tCompCor", "Retained": true }),
        );
    }
    let json_path = format!("{OUTPUT_STEM}.json");
    std::fs::write(
        &json_path,
        serde_json::to_string_pretty(&Value::Object(sidecar)).expect("sidecar serializes"),
    )
    .expect("failed to write sidecar");

    println!(
        "Wrote {} frames x {} confounds to {tsv_path} (+ {json_path})",
        N_FRAMES,
        table.n_cols()
    );
}
