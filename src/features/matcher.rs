//! Brute-force Hamming matcher.

use super::FeatureSet;
use crate::util::math::hamming;

/// Outcome of matching a query feature set against one template.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchStats {
    /// Query descriptors that found a nearest neighbor.
    pub total: usize,
    /// Matches whose distance is strictly below the cutoff.
    pub good: usize,
    /// Mean Hamming distance over the good matches.
    pub mean_good_distance: f32,
}

impl MatchStats {
    /// Fraction of matches that are good; 0 when nothing matched.
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.good as f32 / self.total as f32
        }
    }
}

/// Matches every query descriptor to its nearest train descriptor.
///
/// Ties on distance resolve to the lower train index.
pub fn match_features(query: &FeatureSet, train: &FeatureSet, max_distance: u32) -> MatchStats {
    let mut total = 0usize;
    let mut good = 0usize;
    let mut good_distance_sum = 0u64;

    if !train.descriptors().is_empty() {
        for q in query.descriptors() {
            let nearest = train
                .descriptors()
                .iter()
                .map(|t| hamming(q, t))
                .min()
                .unwrap_or(u32::MAX);
            total += 1;
            if nearest < max_distance {
                good += 1;
                good_distance_sum += u64::from(nearest);
            }
        }
    }

    let mean_good_distance = if good == 0 {
        0.0
    } else {
        good_distance_sum as f32 / good as f32
    };
    MatchStats {
        total,
        good,
        mean_good_distance,
    }
}

#[cfg(test)]
mod tests {
    use super::{match_features, MatchStats};
    use crate::features::{Descriptor, FeatureSet, Keypoint};

    fn set(descriptors: Vec<Descriptor>) -> FeatureSet {
        let keypoints = descriptors
            .iter()
            .enumerate()
            .map(|(i, _)| Keypoint {
                x: i as u32,
                y: 0,
                score: 1.0,
                angle: 0.0,
            })
            .collect();
        FeatureSet {
            keypoints,
            descriptors,
        }
    }

    #[test]
    fn counts_good_matches_under_cutoff() {
        let mut far = [0u8; 32];
        far[..8].copy_from_slice(&[0xFF; 8]);
        let mut near = [0u8; 32];
        near[0] = 0b0000_0111;

        let query = set(vec![[0u8; 32], near, far]);
        let train = set(vec![[0u8; 32]]);
        let stats = match_features(&query, &train, 50);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.good, 2);
        assert!((stats.mean_good_distance - 1.5).abs() < 1e-6);
        assert!((stats.ratio() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_train_matches_nothing() {
        let query = set(vec![[1u8; 32]]);
        let train = set(Vec::new());
        let stats = match_features(&query, &train, 50);
        assert_eq!(
            stats,
            MatchStats {
                total: 0,
                good: 0,
                mean_good_distance: 0.0
            }
        );
        assert_eq!(stats.ratio(), 0.0);
    }
}
