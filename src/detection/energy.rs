//! Divisive hierarchical change point detection with energy statistics
//!
//! E-Divisive repeatedly picks the split that maximises the two-sample energy
//! statistic across all current segments, and keeps it only if a permutation
//! test says the split is unlikely to be noise. The search ends at the first
//! split that fails the test.
//!
//! Reference: Matteson, D. S. & James, N. A. (2014). A Nonparametric Approach
//! for Multiple Change Point Analysis of Multivariate Data. JASA 109(505).

use crate::detection::CandidateDetector;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub const DEFAULT_PVALUE: f64 = 0.05;
pub const DEFAULT_PERMUTATIONS: usize = 100;
pub const DEFAULT_MIN_SEGMENT_SIZE: usize = 2;
pub const DEFAULT_SEED: u64 = 0x5eed_cafe;

/// Best split found inside one segment of the series
#[derive(Debug, Clone, Copy, PartialEq)]
struct Split {
    /// First index of the segment (inclusive)
    start: usize,
    /// Last index of the segment (exclusive)
    end: usize,
    /// Absolute index of the split in the full series
    index: usize,
    /// Energy statistic of the split
    statistic: f64,
}

/// E-Divisive candidate detector
///
/// The permutation RNG is seeded, so the same series always produces the same
/// candidates.
#[derive(Debug, Clone)]
pub struct EDivisive {
    pvalue: f64,
    permutations: usize,
    min_segment_size: usize,
    seed: u64,
}

impl Default for EDivisive {
    fn default() -> Self {
        Self::new(
            DEFAULT_PVALUE,
            DEFAULT_PERMUTATIONS,
            DEFAULT_MIN_SEGMENT_SIZE,
            DEFAULT_SEED,
        )
    }
}

impl EDivisive {
    /// Create a new E-Divisive detector
    ///
    /// # Arguments
    ///
    /// * `pvalue` - Significance level a split must reach to be accepted
    /// * `permutations` - Number of shuffles in each permutation test
    /// * `min_segment_size` - Smallest segment a split may leave on either side
    /// * `seed` - Seed for the permutation RNG
    pub fn new(pvalue: f64, permutations: usize, min_segment_size: usize, seed: u64) -> Self {
        Self {
            pvalue,
            permutations,
            min_segment_size: min_segment_size.max(1),
            seed,
        }
    }

    /// Best split of `segment` as `(tau, statistic)`, `tau` relative to the segment
    ///
    /// For a split at `tau` with `m = tau` points on the left and `n` on the right:
    ///
    /// `Q = m*n/(m+n) * (2/(m*n) * cross - within_left/C(m,2) - within_right/C(n,2))`
    ///
    /// where each sum runs over absolute pairwise differences. A within term is
    /// zero when its side has fewer than two points. Runs in O(len^2).
    fn max_statistic(&self, segment: &[f64]) -> Option<(usize, f64)> {
        let len = segment.len();
        if len < 2 * self.min_segment_size {
            return None;
        }

        let total: f64 = (0..len)
            .flat_map(|i| (i + 1..len).map(move |j| (i, j)))
            .map(|(i, j)| (segment[i] - segment[j]).abs())
            .sum();

        let mut within_left = 0.0;
        let mut cross = 0.0;
        let mut best: Option<(usize, f64)> = None;

        // Move point `t` from the right side to the left side; the split is then at t + 1
        for t in 0..len - 1 {
            let to_left: f64 = segment[..t].iter().map(|x| (x - segment[t]).abs()).sum();
            let to_right: f64 = segment[t + 1..]
                .iter()
                .map(|y| (segment[t] - y).abs())
                .sum();
            within_left += to_left;
            cross += to_right - to_left;

            let tau = t + 1;
            if tau < self.min_segment_size || len - tau < self.min_segment_size {
                continue;
            }

            let within_right = total - within_left - cross;
            let statistic = energy_statistic(tau, len - tau, cross, within_left, within_right);

            if best.map_or(true, |(_, q)| statistic > q) {
                best = Some((tau, statistic));
            }
        }

        best
    }

    /// Highest-scoring split over every segment delimited by `change_points`
    fn best_split(&self, values: &[f64], change_points: &[usize]) -> Option<Split> {
        let mut bounds = Vec::with_capacity(change_points.len() + 2);
        bounds.push(0);
        bounds.extend_from_slice(change_points);
        bounds.push(values.len());

        bounds
            .windows(2)
            .filter_map(|window| {
                let (start, end) = (window[0], window[1]);
                self.max_statistic(&values[start..end])
                    .map(|(tau, statistic)| Split {
                        start,
                        end,
                        index: start + tau,
                        statistic,
                    })
            })
            .max_by(|a, b| a.statistic.total_cmp(&b.statistic))
    }

    /// Fraction of shuffles of `segment` whose best statistic reaches `observed`
    ///
    /// Uses the `(exceed + 1) / (permutations + 1)` estimate so the p-value is
    /// never zero.
    fn permutation_pvalue(&self, segment: &[f64], observed: f64, rng: &mut StdRng) -> f64 {
        let mut shuffled = segment.to_vec();
        let mut exceed = 0usize;

        for _ in 0..self.permutations {
            shuffled.shuffle(rng);
            if let Some((_, statistic)) = self.max_statistic(&shuffled) {
                if statistic >= observed {
                    exceed += 1;
                }
            }
        }

        (exceed + 1) as f64 / (self.permutations + 1) as f64
    }
}

impl CandidateDetector for EDivisive {
    fn candidates(&self, values: &[f64]) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut change_points: Vec<usize> = Vec::new();

        while let Some(split) = self.best_split(values, &change_points) {
            if split.statistic <= 0.0 {
                break;
            }

            let pvalue =
                self.permutation_pvalue(&values[split.start..split.end], split.statistic, &mut rng);
            debug!(
                "E-Divisive split at {} in [{}, {}): statistic={:.4}, p={:.4}",
                split.index, split.start, split.end, split.statistic, pvalue
            );

            if pvalue > self.pvalue {
                break;
            }

            let pos = change_points.partition_point(|&cp| cp < split.index);
            change_points.insert(pos, split.index);
        }

        change_points
    }

    fn name(&self) -> &str {
        "EDivisive"
    }
}

/// Scaled two-sample energy statistic from pairwise distance sums
fn energy_statistic(m: usize, n: usize, cross: f64, within_left: f64, within_right: f64) -> f64 {
    let (mf, nf) = (m as f64, n as f64);

    let cross_term = 2.0 * cross / (mf * nf);
    let left_term = if m > 1 {
        within_left / (mf * (mf - 1.0) / 2.0)
    } else {
        0.0
    };
    let right_term = if n > 1 {
        within_right / (nf * (nf - 1.0) / 2.0)
    } else {
        0.0
    };

    (mf * nf / (mf + nf)) * (cross_term - left_term - right_term)
}
