//! Starting points for EM.

use rand::Rng;
use tt_common::CovarianceStructure;
use tt_config::InitStrategy;
use tt_math::Matrix;

use super::params::MixtureParams;

/// Draw initial parameters for `k` classes.
///
/// Means come from the chosen strategy; weights are uniform and every
/// covariance starts at `init_scale · I`. Callers guarantee `1 <= k <= N`.
pub fn initialize<R: Rng + ?Sized>(
    data: &Matrix,
    k: usize,
    structure: CovarianceStructure,
    strategy: InitStrategy,
    init_scale: f64,
    rng: &mut R,
) -> MixtureParams {
    let means = match strategy {
        InitStrategy::RandomPartition => random_partition_means(data, k, rng),
        InitStrategy::KMeansPlusPlus => kmeans_plus_plus_means(data, k, rng),
    };
    MixtureParams::with_means(structure, means, init_scale)
}

/// Assign each row to a uniformly random class and average.
///
/// A class that receives no rows takes a random row as its mean.
fn random_partition_means<R: Rng + ?Sized>(data: &Matrix, k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let (n, d) = data.shape();
    let mut sums = vec![vec![0.0; d]; k];
    let mut counts = vec![0usize; k];
    for x in data.iter_rows() {
        let j = rng.random_range(0..k);
        counts[j] += 1;
        for (s, v) in sums[j].iter_mut().zip(x) {
            *s += v;
        }
    }
    sums.into_iter()
        .zip(counts)
        .map(|(mut s, c)| {
            if c == 0 {
                data.row(rng.random_range(0..n)).to_vec()
            } else {
                s.iter_mut().for_each(|v| *v /= c as f64);
                s
            }
        })
        .collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// First index whose running weight sum exceeds `target`.
///
/// When rounding keeps the running sum at or below `target`, falls back to
/// the last index with positive weight so a zero-distance row (one that
/// duplicates a chosen mean) is never picked.
fn weighted_index(weights: &[f64], target: f64) -> usize {
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        if acc > target {
            return i;
        }
    }
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}

/// k-means++ seeding: first mean uniform, each next one sampled with
/// probability proportional to squared distance from the nearest chosen mean.
fn kmeans_plus_plus_means<R: Rng + ?Sized>(data: &Matrix, k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = data.rows();
    let mut means: Vec<Vec<f64>> = Vec::with_capacity(k);
    means.push(data.row(rng.random_range(0..n)).to_vec());

    let mut nearest: Vec<f64> = data
        .iter_rows()
        .map(|x| squared_distance(x, &means[0]))
        .collect();

    while means.len() < k {
        let total: f64 = nearest.iter().sum();
        let pick = if total > 0.0 && total.is_finite() {
            weighted_index(&nearest, rng.random::<f64>() * total)
        } else {
            // every row coincides with a chosen mean
            rng.random_range(0..n)
        };

        let center = data.row(pick).to_vec();
        for (dist, x) in nearest.iter_mut().zip(data.iter_rows()) {
            *dist = dist.min(squared_distance(x, &center));
        }
        means.push(center);
    }
    means
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn blobs() -> Matrix {
        Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.1, -0.1],
            vec![-0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 9.9],
            vec![9.9, 10.1],
        ])
        .unwrap()
    }

    #[test]
    fn shapes_and_uniform_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for strategy in [InitStrategy::RandomPartition, InitStrategy::KMeansPlusPlus] {
            let p = initialize(&blobs(), 3, CovarianceStructure::Vvv, strategy, 2.0, &mut rng);
            assert_eq!(p.k(), 3);
            assert_eq!(p.dim(), 2);
            assert!(p.weights.iter().all(|w| (*w - 1.0 / 3.0).abs() < 1e-15));
            assert_eq!(p.covariances[2], Matrix::scaled_identity(2, 2.0));
        }
    }

    #[test]
    fn same_seed_same_start() {
        let a = initialize(
            &blobs(),
            2,
            CovarianceStructure::Eei,
            InitStrategy::KMeansPlusPlus,
            1.0,
            &mut ChaCha8Rng::seed_from_u64(9),
        );
        let b = initialize(
            &blobs(),
            2,
            CovarianceStructure::Eei,
            InitStrategy::KMeansPlusPlus,
            1.0,
            &mut ChaCha8Rng::seed_from_u64(9),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn kmeans_plus_plus_spreads_means() {
        // With two tight blobs the second mean lands in the other blob.
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let means = kmeans_plus_plus_means(&blobs(), 2, &mut rng);
            assert!(squared_distance(&means[0], &means[1]) > 100.0);
        }
    }

    #[test]
    fn kmeans_plus_plus_handles_identical_rows() {
        let data = Matrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let means = kmeans_plus_plus_means(&data, 3, &mut rng);
        assert_eq!(means, vec![vec![1.0, 1.0]; 3]);
    }

    #[test]
    fn weighted_index_skips_zero_weight_tail() {
        assert_eq!(weighted_index(&[1.0, 2.0, 3.0], 0.5), 0);
        assert_eq!(weighted_index(&[1.0, 2.0, 3.0], 2.5), 1);
        // a target at the very top of the range never lands on the
        // trailing zero-distance row
        assert_eq!(weighted_index(&[0.0, 3.0, 0.0], 3.0), 1);
        assert_eq!(weighted_index(&[2.0, 0.0, 0.0], 2.5), 0);
    }

    #[test]
    fn random_partition_means_are_data_averages() {
        let data = Matrix::from_rows(&[vec![2.0], vec![4.0]]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let means = random_partition_means(&data, 1, &mut rng);
        assert_eq!(means, vec![vec![3.0]]);
    }
}
