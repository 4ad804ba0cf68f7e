use crate::column::{Allele, Column, HapIdx};
use crate::marker::Marker;
use crate::pbwt::{Direction, PbwtState};

/// A maximal matching interval between two haplotypes, reported either as a
/// seed (forward pass, spec.md §4.4) or an extension candidate (backward
/// pass, §4.5). Indices are into the worker's marker window, with
/// `marker_start <= marker_end` regardless of which pass produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedRecord {
    pub hap1: HapIdx,
    pub hap2: HapIdx,
    pub marker_start: usize,
    pub marker_end: usize,
}

/// Static range-maximum query over a fixed slice, O(n log n) to build and
/// O(1) to answer — needed because two haplotypes terminating a match at
/// different marker pairs can have different divergence depths even when
/// their matches end at the very same marker (spec.md §4.4).
struct SparseTableMax {
    table: Vec<Vec<i64>>,
}

impl SparseTableMax {
    fn build(arr: &[i64]) -> Self {
        let n = arr.len();
        if n == 0 {
            return SparseTableMax { table: vec![Vec::new()] };
        }
        // smallest `levels` such that `1 << (levels-1) <= n`
        let mut levels = 1;
        while (1usize << levels) <= n {
            levels += 1;
        }
        let mut table = vec![arr.to_vec()];
        for level in 1..levels {
            let span = 1usize << level;
            let half = span / 2;
            let prev = &table[level - 1];
            let mut row = vec![i64::MIN; n - span + 1];
            for i in 0..row.len() {
                row[i] = prev[i].max(prev[i + half]);
            }
            table.push(row);
        }
        SparseTableMax { table }
    }

    /// Maximum over `arr[l..=r]` inclusive.
    fn query(&self, l: usize, r: usize) -> i64 {
        let len = r - l + 1;
        let level = len.ilog2() as usize;
        let span = 1usize << level;
        let row = &self.table[level];
        row[l].max(row[r + 1 - span])
    }
}

/// Runs one directional pass of the seed/extension finder over the given
/// marker window and emits every maximal match satisfying the length
/// thresholds, per spec.md §4.4/§4.5.
///
/// `markers` and `columns` are in physical (forward) marker order, aligned
/// 1:1. For a backward pass the PBWT sweeps them in reverse, but reported
/// `marker_start`/`marker_end` are always physical indices with
/// `marker_start <= marker_end`.
pub fn scan_window(
    markers: &[Marker],
    columns: &[Column],
    direction: Direction,
    min_len_cm: f64,
    min_markers_threshold: u32,
) -> Vec<SeedRecord> {
    let n_markers = columns.len();
    let mut out = Vec::new();
    if n_markers == 0 {
        return out;
    }
    let n_haps = columns[0].n_haps();
    if n_haps == 0 {
        return out;
    }

    let order: Vec<usize> = match direction {
        Direction::Forward => (0..n_markers).collect(),
        Direction::Backward => (0..n_markers).rev().collect(),
    };

    let mut state = PbwtState::identity(n_haps, 0, direction);

    for (step, &phys) in order.iter().enumerate() {
        let col = &columns[phys];
        let k = markers[phys].n_alleles.max(1) as usize;

        if step > 0 {
            let last_m_step = (step - 1) as i64;
            report_terminations(
                &state,
                last_m_step,
                |h| col.allele_of(h),
                markers,
                &order,
                min_markers_threshold,
                min_len_cm,
                &mut out,
            );
        }

        state.update(step as i64, col, k, direction);
    }

    let last_step = (n_markers - 1) as i64;
    report_terminations(
        &state,
        last_step,
        |h| h,
        markers,
        &order,
        min_markers_threshold,
        min_len_cm,
        &mut out,
    );

    out
}

#[allow(clippy::too_many_arguments)]
fn report_terminations(
    state: &PbwtState,
    last_m_step: i64,
    next_allele: impl Fn(HapIdx) -> Allele,
    markers: &[Marker],
    order: &[usize],
    min_markers_threshold: u32,
    min_len_cm: f64,
    out: &mut Vec<SeedRecord>,
) {
    let idx_end = order[last_m_step as usize];

    for (lo, hi) in state.bucket_ranges() {
        if lo == hi {
            continue;
        }
        let labels: Vec<Allele> = (lo..=hi).map(|pos| next_allele(state.a[pos])).collect();
        let sub_d = &state.d[lo + 1..=hi];
        let table = SparseTableMax::build(sub_d);

        for i in lo..=hi {
            for j in (i + 1)..=hi {
                if labels[i - lo] == labels[j - lo] {
                    continue;
                }
                let d_step = if j == i + 1 {
                    state.d[j]
                } else {
                    table.query(i - lo, j - lo - 1)
                };
                if d_step < 0 || d_step > last_m_step {
                    continue;
                }
                let idx_d = order[d_step as usize];
                let marker_start = idx_d.min(idx_end);
                let marker_end = idx_d.max(idx_end);
                let marker_count = (marker_end - marker_start + 1) as u32;
                if marker_count < min_markers_threshold {
                    continue;
                }
                let cm_len = markers[marker_end].cm - markers[marker_start].cm;
                if cm_len < min_len_cm {
                    continue;
                }
                let (h1, h2) = (state.a[i], state.a[j]);
                let (hap1, hap2) = if h1 < h2 { (h1, h2) } else { (h2, h1) };
                out.push(SeedRecord {
                    hap1,
                    hap2,
                    marker_start,
                    marker_end,
                });
            }
        }
    }
}
