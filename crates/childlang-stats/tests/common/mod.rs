//! Synthetic participant tables shared by the integration tests.
#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const HEADER: &str = ",child_id,sex,mother_birth_country,birth_order,age_months,ses,\
exposure_18,exposure_30,vocab,accuracy,rt,composite_eng,composite_spa";

/// Approximately standard normal draw (Irwin-Hall with 12 uniforms).
pub fn noise(rng: &mut StdRng) -> f64 {
    (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0
}

/// CSV text for `n` children. English composite rises with vocabulary,
/// Spanish composite with Spanish exposure; `NA` cells are sprinkled into
/// `rt` and `vocab`.
pub fn study_csv(n: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let countries = ["US", "MX", "CO"];
    let mut out = String::from(HEADER);
    out.push('\n');

    for i in 0..n {
        let sex = if i % 2 == 0 { "F" } else { "M" };
        let country = countries[i % countries.len()];
        let birth_order = 1 + (i % 3);
        let age = 30.0 + 2.0 * noise(&mut rng);
        let ses = (rng.gen_range(1..=6)) as f64;
        let exp18 = rng.gen_range(10.0..90.0);
        let exp30 = (exp18 + 5.0 * noise(&mut rng)).clamp(0.0, 100.0);
        let vocab = 300.0 + 60.0 * noise(&mut rng);
        let accuracy = (0.7 + 0.1 * noise(&mut rng)).clamp(0.0, 1.0);
        let rt = 800.0 - 0.5 * (vocab - 300.0) + 40.0 * noise(&mut rng);
        let eng = 100.0 + 0.08 * (vocab - 300.0) + 0.2 * (50.0 - exp30) + 5.0 * noise(&mut rng);
        let spa = 90.0 + 0.3 * (exp30 - 50.0) - 0.02 * (rt - 800.0) + 5.0 * noise(&mut rng);

        let vocab_cell = if i % 11 == 5 { "NA".to_string() } else { format!("{:.1}", vocab) };
        let rt_cell = if i % 13 == 7 { "NA".to_string() } else { format!("{:.1}", rt) };

        writeln!(
            out,
            "{},{},{},{},{},{:.2},{},{:.2},{:.2},{},{:.3},{},{:.2},{:.2}",
            i + 1,
            1000 + i,
            sex,
            country,
            birth_order,
            age,
            ses,
            exp18,
            exp30,
            vocab_cell,
            accuracy,
            rt_cell,
            eng,
            spa
        )
        .unwrap();
    }
    out
}

pub fn write_study_csv(dir: &Path, n: usize, seed: u64) -> PathBuf {
    let path = dir.join("study.csv");
    std::fs::write(&path, study_csv(n, seed)).unwrap();
    path
}
