//! Stable indirect sort over a table key, with bound searches.

use serde::Serialize;

// ---------------------------------------------------------------------------
// SortIndex – indirect sort over a table
// ---------------------------------------------------------------------------

/// A permutation of a table's positions in ascending key order.
///
/// The base table is never reordered. Sorted keys are kept alongside the
/// permutation so range searches never touch the base table again.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SortIndex {
    order: Vec<usize>,
    keys: Vec<f64>,
}

impl SortIndex {
    /// Build the index with a stable sort: equal keys keep table order.
    pub fn build<T, F>(table: &[T], key: F) -> Self
    where
        F: Fn(&T) -> f64,
    {
        let raw: Vec<f64> = table.iter().map(key).collect();
        let mut order: Vec<usize> = (0..table.len()).collect();
        order.sort_by(|&a, &b| raw[a].total_cmp(&raw[b]));
        let keys = order.iter().map(|&i| raw[i]).collect();
        SortIndex { order, keys }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Table positions in key order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Keys in ascending order, parallel to [`SortIndex::order`].
    pub fn keys(&self) -> &[f64] {
        &self.keys
    }

    /// Table position at sorted position `pos`.
    pub fn get(&self, pos: usize) -> Option<usize> {
        self.order.get(pos).copied()
    }

    /// First sorted position whose key is `>= value`.
    pub fn lower_bound(&self, value: f64) -> usize {
        self.keys.partition_point(|&k| k < value)
    }

    /// First sorted position whose key is `> value`.
    pub fn upper_bound(&self, value: f64) -> usize {
        self.keys.partition_point(|&k| k <= value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_bijection(index: &SortIndex, n: usize) -> bool {
        let mut seen = vec![false; n];
        for &i in index.order() {
            if i >= n || seen[i] {
                return false;
            }
            seen[i] = true;
        }
        seen.into_iter().all(|s| s)
    }

    #[test]
    fn empty_table_gives_empty_index() {
        let index = SortIndex::build(&Vec::<f64>::new(), |&v| v);
        assert!(index.is_empty());
        assert_eq!(index.lower_bound(1.0), 0);
    }

    #[test]
    fn ties_keep_table_order() {
        let freqs = [4.0, 2.5, 1.0, 2.5];
        let index = SortIndex::build(&freqs, |&v| v);
        assert_eq!(index.order(), &[2, 1, 3, 0]);
        assert_eq!(index.keys(), &[1.0, 2.5, 2.5, 4.0]);
        assert!(is_bijection(&index, freqs.len()));
    }

    #[test]
    fn builds_over_records_by_key() {
        struct Rec {
            threshold: f64,
        }
        let table: Vec<Rec> = [9.0, 3.0, 7.0, 3.0, 1.0]
            .into_iter()
            .map(|threshold| Rec { threshold })
            .collect();
        let index = SortIndex::build(&table, |r| r.threshold);
        assert_eq!(index.order(), &[4, 1, 3, 2, 0]);
        assert!(is_bijection(&index, table.len()));
        for w in index.order().windows(2) {
            assert!(table[w[0]].threshold <= table[w[1]].threshold);
        }
    }

    #[test]
    fn bounds() {
        let index = SortIndex::build(&[1.0, 2.5, 2.5, 4.0], |&v| v);
        assert_eq!(index.lower_bound(2.5), 1);
        assert_eq!(index.upper_bound(2.5), 3);
        assert_eq!(index.lower_bound(5.0), 4);
        assert_eq!(index.upper_bound(0.5), 0);
    }
}
