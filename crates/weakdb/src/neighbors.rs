//! Turns one row of a similarity matrix into a nearest-neighbor ranking.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_CLOSEST_LIST_SIZE: usize = 20;
pub const DEFAULT_SAMPLE_LIST_SIZE: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankerConfig {
    /// How many of the most similar items go into `closest`.
    pub closest_list_size: usize,
    /// Upper bound on the evenly spaced `sampled` list.
    pub sample_list_size: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            closest_list_size: DEFAULT_CLOSEST_LIST_SIZE,
            sample_list_size: DEFAULT_SAMPLE_LIST_SIZE,
        }
    }
}

/// The query's nearest neighbor was some other item. Usually means the
/// training set holds duplicate (or near duplicate) datapoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateNeighborAnomaly {
    pub query_idx: usize,
    pub top_idx: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NeighborRanking {
    /// Training-set indices, most to least similar, query excluded.
    pub ranking: Vec<usize>,
    pub closest: Vec<(usize, f64)>,
    pub sampled: Vec<(usize, f64)>,
    pub anomaly: Option<DuplicateNeighborAnomaly>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NeighborRanker {
    config: RankerConfig,
}

impl NeighborRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> RankerConfig {
        self.config
    }

    /// Rank `row` (higher score = more similar). `query_idx` is the row's own
    /// index when the row belongs to a training-set item, `None` otherwise.
    pub fn rank(&self, row: &[f64], query_idx: Option<usize>) -> NeighborRanking {
        let mut pairs: Vec<(usize, f64)> = row.iter().copied().enumerate().collect();
        // sort_by is stable: equal scores keep ascending index order
        pairs.sort_by(|a, b| descending(a.1, b.1));

        let anomaly = match (query_idx, pairs.first()) {
            (Some(q), Some(&(top, _))) if top != q => {
                warn!(
                    query_idx = q,
                    top_idx = top,
                    "closest datapoint to datapoint {q} is datapoint {top} (expected {q}), often a sign of duplicate data"
                );
                Some(DuplicateNeighborAnomaly { query_idx: q, top_idx: top })
            }
            _ => None,
        };

        let sample_size = self.config.sample_list_size;
        let sample_skip = if sample_size == 0 {
            1
        } else {
            row.len().div_ceil(sample_size).max(1)
        };

        let mut out = NeighborRanking {
            ranking: Vec::with_capacity(row.len()),
            closest: Vec::with_capacity(self.config.closest_list_size.min(row.len())),
            sampled: Vec::with_capacity(sample_size.min(row.len())),
            anomaly,
        };

        let mut walked = 0usize;
        for (idx, score) in pairs {
            if query_idx == Some(idx) {
                continue;
            }
            out.ranking.push(idx);

            if out.closest.len() < self.config.closest_list_size {
                out.closest.push((idx, score));
            }
            if out.sampled.len() < sample_size && walked % sample_skip == 0 {
                out.sampled.push((idx, score));
            }
            walked += 1;
        }

        out
    }
}

/// Descending by score; NaN ranks below every number.
fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
