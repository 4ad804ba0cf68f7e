use std::collections::{HashMap, HashSet};

use crate::column::HapIdx;
use crate::marker::Marker;
use crate::seeds::SeedRecord;

/// A seed after bidirectional extension (spec.md §4.5), indices are global
/// marker positions (into the chromosome's full `markers`/`columns`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedSegment {
    pub hap1: HapIdx,
    pub hap2: HapIdx,
    pub marker_start: usize,
    pub marker_end: usize,
}

/// Attempts to merge each `seed` with the closest attachable extension on
/// either flank, repeatedly, per spec.md §4.5's merge procedure. Each
/// extension is consumed at most once per haplotype pair. `max_gap < 0`
/// disables merging entirely. Deduplicates by `(hap1, hap2, bp_start,
/// bp_end)` across the seeds passed in this call.
pub fn merge_seeds(
    seeds: &[SeedRecord],
    extensions: &[SeedRecord],
    markers: &[Marker],
    max_gap: i64,
) -> Vec<MergedSegment> {
    let mut by_pair: HashMap<(HapIdx, HapIdx), Vec<SeedRecord>> = HashMap::new();
    for &ext in extensions {
        by_pair.entry((ext.hap1, ext.hap2)).or_default().push(ext);
    }
    let mut used: HashMap<(HapIdx, HapIdx), Vec<bool>> = HashMap::new();
    let mut dedup: HashSet<(HapIdx, HapIdx, i32, i32)> = HashSet::new();
    let mut out = Vec::new();

    for seed in seeds {
        let key = (seed.hap1, seed.hap2);
        let mut start = seed.marker_start;
        let mut end = seed.marker_end;

        if max_gap >= 0 {
            if let Some(cands) = by_pair.get(&key) {
                let used_flags = used.entry(key).or_insert_with(|| vec![false; cands.len()]);
                loop {
                    let mut best_right: Option<(usize, i64)> = None;
                    let mut best_left: Option<(usize, i64)> = None;
                    for (idx, ext) in cands.iter().enumerate() {
                        if used_flags[idx] {
                            continue;
                        }
                        if ext.marker_start > end {
                            let gap = (markers[ext.marker_start].bp - markers[end].bp) as i64;
                            if gap <= max_gap && best_right.is_none_or(|(_, g)| gap < g) {
                                best_right = Some((idx, gap));
                            }
                        } else if ext.marker_end < start {
                            let gap = (markers[start].bp - markers[ext.marker_end].bp) as i64;
                            if gap <= max_gap && best_left.is_none_or(|(_, g)| gap < g) {
                                best_left = Some((idx, gap));
                            }
                        }
                    }
                    let chosen = match (best_right, best_left) {
                        (Some((ri, rg)), Some((li, lg))) => {
                            Some(if rg <= lg { (ri, true) } else { (li, false) })
                        }
                        (Some((ri, _)), None) => Some((ri, true)),
                        (None, Some((li, _))) => Some((li, false)),
                        (None, None) => None,
                    };
                    let Some((idx, on_right)) = chosen else {
                        break;
                    };
                    used_flags[idx] = true;
                    if on_right {
                        end = cands[idx].marker_end;
                    } else {
                        start = cands[idx].marker_start;
                    }
                }
            }
        }

        let bp_start = markers[start].bp;
        let bp_end = markers[end].bp;
        if dedup.insert((seed.hap1, seed.hap2, bp_start, bp_end)) {
            out.push(MergedSegment {
                hap1: seed.hap1,
                hap2: seed.hap2,
                marker_start: start,
                marker_end: end,
            });
        }
    }

    out
}
