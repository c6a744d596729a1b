//! Seeded synthetic data for demos, tests and benchmarks.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tt_common::{Error, Result, Unit};
use tt_math::Matrix;

/// `per_class` points around each center with isotropic noise `sd`.
///
/// Rows are grouped by center; the second value holds each row's 0-based
/// generating class.
pub fn gaussian_blobs(
    centers: &[Vec<f64>],
    per_class: usize,
    sd: f64,
    seed: u64,
) -> Result<(Matrix, Vec<usize>)> {
    let d = centers.first().map(|c| c.len()).unwrap_or(0);
    if centers.is_empty() || d == 0 {
        return Err(Error::invalid("centers", "at least one non-empty center is required"));
    }
    if let Some(bad) = centers.iter().find(|c| c.len() != d) {
        return Err(Error::DimensionMismatch {
            expected: d,
            got: bad.len(),
        });
    }
    let noise = Normal::new(0.0, sd).map_err(|e| Error::invalid("sd", e.to_string()))?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut flat = Vec::with_capacity(centers.len() * per_class * d);
    let mut labels = Vec::with_capacity(centers.len() * per_class);
    for (j, center) in centers.iter().enumerate() {
        for _ in 0..per_class {
            flat.extend(center.iter().map(|c| c + noise.sample(&mut rng)));
            labels.push(j);
        }
    }
    let rows = labels.len();
    let got = flat.len();
    let matrix = Matrix::from_vec(rows, d, flat).ok_or(Error::DimensionMismatch {
        expected: rows * d,
        got,
    })?;
    Ok((matrix, labels))
}

/// Typical ratios of the default features for two residential typologies:
/// dense renter-heavy neighbourhoods and low-density owner-occupied ones.
const TYPOLOGIES: [[f64; 5]; 2] = [
    // foreign_born, renter, poverty, bachelors, multi_unit
    [0.35, 0.70, 0.22, 0.45, 0.75],
    [0.08, 0.20, 0.07, 0.30, 0.05],
];

const RATIO_SD: f64 = 0.04;

fn ratio(rng: &mut ChaCha8Rng, noise: &Normal<f64>, mean: f64) -> f64 {
    (mean + noise.sample(rng)).clamp(0.01, 0.99)
}

fn tract(rng: &mut ChaCha8Rng, noise: &Normal<f64>, index: usize, typology: usize) -> Unit {
    let means = TYPOLOGIES[typology];
    let population = rng.random_range(1500.0..7000.0_f64).round();
    let occupied = (population / rng.random_range(2.0..3.0_f64)).round();
    let housing = (occupied * rng.random_range(1.02..1.12_f64)).round();
    let poverty_universe = (population * 0.97).round();
    let adults_25 = (population * rng.random_range(0.6..0.75_f64)).round();

    let foreign = ratio(rng, noise, means[0]);
    Unit::new(format!("36{:09}", index + 1), format!("Synthetic Tract {}", index + 1))
        .with_count("total_population", population)
        .with_count("native_born", (population * (1.0 - foreign)).round())
        .with_count("occupied_units", occupied)
        .with_count("renter_occupied", (occupied * ratio(rng, noise, means[1])).round())
        .with_count("poverty_universe", poverty_universe)
        .with_count("below_poverty", (poverty_universe * ratio(rng, noise, means[2])).round())
        .with_count("population_25_plus", adults_25)
        .with_count("bachelors_plus", (adults_25 * ratio(rng, noise, means[3])).round())
        .with_count("housing_units", housing)
        .with_count("units_5_plus", (housing * ratio(rng, noise, means[4])).round())
}

/// `n` valid tracts alternating between two typologies, followed by
/// `invalid` tracts that feature derivation must exclude.
///
/// Invalid tracts cycle through a zero denominator, a missing count, and a
/// numerator larger than its denominator.
pub fn synthetic_units(n: usize, seed: u64, invalid: usize) -> Result<Vec<Unit>> {
    let noise = Normal::new(0.0, RATIO_SD).map_err(|e| Error::invalid("sd", e.to_string()))?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut units: Vec<Unit> = (0..n).map(|i| tract(&mut rng, &noise, i, i % 2)).collect();
    for j in 0..invalid {
        let index = n + j;
        let base = tract(&mut rng, &noise, index, j % 2);
        let broken = match j % 3 {
            0 => base.with_count("occupied_units", 0.0),
            1 => base.with_missing("below_poverty"),
            _ => {
                let total = base.count("total_population").unwrap_or(1.0);
                base.with_count("native_born", total + 10.0)
            }
        };
        units.push(broken);
    }
    Ok(units)
}
