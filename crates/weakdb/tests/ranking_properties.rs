//! Generated-row checks for `NeighborRanker`: tie-heavy scores with NaN mixed in.

use std::cmp::Ordering;

use proptest::prelude::*;
use weakdb::{NeighborRanker, RankerConfig};

/// Few distinct values so ties are common; NaN shows up about one time in six.
fn score() -> impl Strategy<Value = f64> {
    prop_oneof![
        5 => (0u8..5).prop_map(|v| f64::from(v) / 4.0),
        1 => Just(f64::NAN),
    ]
}

fn row_with_query() -> impl Strategy<Value = (Vec<f64>, usize)> {
    prop::collection::vec(score(), 1..60).prop_flat_map(|row| {
        let len = row.len();
        (Just(row), 0..len)
    })
}

/// Descending by score, NaN after every number, ties by ascending index.
fn in_rank_order(row: &[f64], a: usize, b: usize) -> bool {
    let by_score = match (row[a].is_nan(), row[b].is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => row[b].partial_cmp(&row[a]).unwrap_or(Ordering::Equal),
    };
    by_score.then(a.cmp(&b)) == Ordering::Less
}

fn most_similar(row: &[f64]) -> usize {
    (1..row.len()).fold(0, |best, i| if in_rank_order(row, i, best) { i } else { best })
}

fn ranker() -> NeighborRanker {
    NeighborRanker::new(RankerConfig { closest_list_size: 7, sample_list_size: 9 })
}

proptest! {
    /// Ranking is `[0, len) \ {query}` in rank order.
    #[test]
    fn prop_ranking_excludes_query_in_order((row, q) in row_with_query()) {
        let r = ranker().rank(&row, Some(q));

        let mut seen = r.ranking.clone();
        seen.sort_unstable();
        let expected: Vec<usize> = (0..row.len()).filter(|&i| i != q).collect();
        prop_assert_eq!(seen, expected);
        for w in r.ranking.windows(2) {
            prop_assert!(in_rank_order(&row, w[0], w[1]), "{} before {} in {:?}", w[0], w[1], row);
        }
    }

    /// The anomaly is reported exactly when something outranks the query.
    #[test]
    fn prop_anomaly_iff_query_not_on_top((row, q) in row_with_query()) {
        let top = most_similar(&row);
        let r = ranker().rank(&row, Some(q));
        match r.anomaly {
            Some(a) => {
                prop_assert_ne!(top, q);
                prop_assert_eq!(a.query_idx, q);
                prop_assert_eq!(a.top_idx, top);
            }
            None => {
                prop_assert_eq!(top, q);
            }
        }
    }

    /// Without a query nothing is excluded and no anomaly is raised.
    #[test]
    fn prop_no_query_keeps_every_index(row in prop::collection::vec(score(), 0..60)) {
        let r = ranker().rank(&row, None);
        prop_assert_eq!(r.ranking.len(), row.len());
        prop_assert!(r.anomaly.is_none());
        for w in r.ranking.windows(2) {
            prop_assert!(in_rank_order(&row, w[0], w[1]));
        }
    }

    /// `closest` is a prefix of the ranking; `sampled` is an ordered subsequence.
    #[test]
    fn prop_side_lists_follow_ranking((row, q) in row_with_query()) {
        let r = ranker().rank(&row, Some(q));

        let closest: Vec<usize> = r.closest.iter().map(|(i, _)| *i).collect();
        prop_assert_eq!(closest.len(), r.ranking.len().min(7));
        prop_assert_eq!(&closest[..], &r.ranking[..closest.len()]);

        prop_assert!(r.sampled.len() <= 9);
        let mut rest = r.ranking.iter();
        for (i, _) in &r.sampled {
            prop_assert!(rest.any(|j| j == i), "sampled {} out of order", i);
        }
    }
}
