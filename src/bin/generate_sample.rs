//! Write a deterministic synthetic atomic data set and load it back.
//!
//! Usage: `generate_sample [output_dir]` (default `sample_atomic`).

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

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

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// Rydberg frequency, Hz.
const RYDBERG_HZ: f64 = 3.289_841_96e15;
/// eV -> Hz.
const EV_TO_HZ: f64 = 2.417_989_24e14;

const ELEMENTS: [(u32, &str, f64); 5] = [
    (1, "H", 12.00),
    (2, "He", 10.99),
    (6, "C", 8.56),
    (7, "N", 8.05),
    (8, "O", 8.93),
];

const LEVELS_PER_ION: u32 = 6;

/// Cross-section samples from `threshold` upward on a geometric grid, falling
/// off as `nu^-3`.
fn edge_samples(threshold: f64, sigma0: f64, n: usize) -> String {
    let mut out = format!("{n}");
    for k in 0..n {
        let nu = threshold * 1.25f64.powi(k as i32);
        let sigma = sigma0 * (threshold / nu).powi(3);
        let _ = write!(out, " {nu:.6e} {sigma:.6e}");
    }
    out
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "sample_atomic".to_string());
    let out = Path::new(&out_dir);
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;

    let mut rng = SimpleRng::new(42);

    let mut elements = String::from("# z name log_abundance\n");
    let mut ions = String::from("# z stage ip_ev g\n");
    let mut levels = String::from("# z stage level energy_ev g config\n");
    let mut lines = String::from("# z stage lower upper freq_hz gf\n");
    let mut photo = String::from("# z stage threshold_hz n (freq sigma)*n\n");
    let mut inner = String::from("# z stage shell_n shell_l threshold_hz n (freq sigma)*n\n");
    let mut collisions = String::from("# z stage lower upper type n (u upsilon)*n\n");

    for &(z, name, abundance) in &ELEMENTS {
        writeln!(elements, "{z} {name} {abundance:.2}")?;

        for stage in 1..=z.min(3) {
            // Hydrogenic estimate of the ionization potential.
            let charge = stage as f64;
            let ip_ev = 13.6057 * charge * charge * rng.uniform(0.8, 1.2);
            writeln!(ions, "{z} {stage} {ip_ev:.4} {}", 1 + stage % 2)?;

            let mut energies = Vec::new();
            for level in 1..=LEVELS_PER_ION {
                let n = level as f64;
                let energy = if level == 1 { 0.0 } else { ip_ev * (1.0 - 1.0 / (n * n)) };
                let g = 2 * level * level;
                writeln!(levels, "{z} {stage} {level} {energy:.5} {g} n={level}")?;
                energies.push(energy);
            }

            for lower in 1..LEVELS_PER_ION {
                for upper in (lower + 1)..=LEVELS_PER_ION.min(lower + 2) {
                    let de = energies[(upper - 1) as usize] - energies[(lower - 1) as usize];
                    let freq = de * EV_TO_HZ;
                    let gf = rng.uniform(0.01, 1.0);
                    writeln!(lines, "{z} {stage} {lower} {upper} {freq:.6e} {gf:.4}")?;

                    if upper == lower + 1 {
                        let kind = if lower % 2 == 1 { "allowed" } else { "forbidden" };
                        let u0 = rng.uniform(0.05, 0.5);
                        writeln!(
                            collisions,
                            "{z} {stage} {lower} {upper} {kind} 4 1.0 {u0:.4} 2.0 {:.4} 4.0 {:.4} 8.0 {:.4}",
                            u0 * 1.2,
                            u0 * 1.35,
                            u0 * 1.45
                        )?;
                    }
                }
            }

            let threshold = ip_ev * EV_TO_HZ;
            let samples = edge_samples(threshold, 6.3e-18 / charge.powi(2), 12);
            writeln!(photo, "{z} {stage} {threshold:.6e} {samples}")?;

            if z > 2 {
                let k_edge = RYDBERG_HZ * (z as f64 - 1.0).powi(2) * rng.uniform(0.9, 1.1);
                let samples = edge_samples(k_edge, 1e-19, 8);
                writeln!(inner, "{z} {stage} 1 0 {k_edge:.6e} {samples}")?;
            }
        }
    }

    let files = [
        ("elements.dat", "element", &elements),
        ("ions.dat", "ion", &ions),
        ("levels.dat", "level", &levels),
        ("lines.dat", "line", &lines),
        ("photo.dat", "photo", &photo),
        ("inner.dat", "inner", &inner),
        ("collisions.dat", "collision", &collisions),
    ];
    let mut master = String::from("# synthetic atomic data\n");
    for (file, kind, body) in files {
        std::fs::write(out.join(file), body).with_context(|| format!("writing {file}"))?;
        writeln!(master, "{file} {kind}")?;
    }
    let master_path = out.join("master.dat");
    std::fs::write(&master_path, master).context("writing master.dat")?;

    let catalog = atomix::load(&master_path).context("loading generated catalog")?;
    let summary = serde_json::to_string_pretty(&catalog.summary())?;
    info!("generated catalog summary:\n{summary}");

    Ok(())
}
