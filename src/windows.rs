use crate::marker::Marker;

/// A worker's marker window (spec.md §5): `core_start..=core_end` is the
/// range this worker is responsible for *reporting* seeds for, padded by
/// `window_start..=window_end` so no match starting in a neighbor's core
/// region is missed by the PBWT's need for left context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub core_start: usize,
    pub core_end: usize,
    pub window_start: usize,
    pub window_end: usize,
}

/// Splits `markers` into up to `nthreads` contiguous, near-equal-size core
/// ranges, each padded with enough preceding/following markers to span
/// `min_seed_cm` of genetic distance — the maximum marker count a seed of
/// that length could span (spec.md §5).
pub fn partition(markers: &[Marker], nthreads: usize, min_seed_cm: f64) -> Vec<Window> {
    let n = markers.len();
    if n == 0 || nthreads == 0 {
        return Vec::new();
    }
    let nthreads = nthreads.min(n);
    let base = n / nthreads;
    let rem = n % nthreads;

    let mut windows = Vec::with_capacity(nthreads);
    let mut start = 0usize;
    for t in 0..nthreads {
        let size = base + usize::from(t < rem);
        if size == 0 {
            continue;
        }
        let core_start = start;
        let core_end = start + size - 1;
        let left_pad = overlap_before(markers, core_start, min_seed_cm);
        let right_pad = overlap_after(markers, core_end, min_seed_cm);
        windows.push(Window {
            core_start,
            core_end,
            window_start: core_start - left_pad,
            window_end: core_end + right_pad,
        });
        start += size;
    }
    windows
}

fn overlap_before(markers: &[Marker], core_start: usize, min_seed_cm: f64) -> usize {
    if core_start == 0 {
        return 0;
    }
    let target = markers[core_start].cm - min_seed_cm;
    let mut i = core_start;
    while i > 0 && markers[i - 1].cm > target {
        i -= 1;
    }
    core_start - i
}

fn overlap_after(markers: &[Marker], core_end: usize, min_seed_cm: f64) -> usize {
    let n = markers.len();
    if core_end + 1 >= n {
        return 0;
    }
    let target = markers[core_end].cm + min_seed_cm;
    let mut i = core_end;
    while i + 1 < n && markers[i + 1].cm < target {
        i += 1;
    }
    i - core_end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(cms: &[f64]) -> Vec<Marker> {
        cms.iter()
            .enumerate()
            .map(|(i, &cm)| Marker {
                chrom_id: 0,
                bp: i as i32 + 1,
                cm,
                n_alleles: 2,
            })
            .collect()
    }

    #[test]
    fn core_ranges_cover_every_marker_exactly_once() {
        let m = markers(&(0..20).map(|i| i as f64 * 0.1).collect::<Vec<_>>());
        let windows = partition(&m, 4, 0.5);
        assert_eq!(windows.len(), 4);
        let mut covered = vec![false; 20];
        for w in &windows {
            for i in w.core_start..=w.core_end {
                assert!(!covered[i], "marker {i} covered twice");
                covered[i] = true;
            }
        }
        assert!(covered.iter().all(|&c| c));
    }

    #[test]
    fn windows_pad_with_overlap_but_stay_in_bounds() {
        let m = markers(&(0..20).map(|i| i as f64 * 0.5).collect::<Vec<_>>());
        let windows = partition(&m, 4, 2.0);
        for w in &windows {
            assert!(w.window_start <= w.core_start);
            assert!(w.window_end >= w.core_end);
            assert!(w.window_end < m.len());
        }
        // interior windows should gain left padding from a neighbor's markers
        assert!(windows[1].window_start < windows[1].core_start);
    }

    #[test]
    fn single_marker_has_no_overlap() {
        let m = markers(&[0.0]);
        let windows = partition(&m, 3, 2.0);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], Window { core_start: 0, core_end: 0, window_start: 0, window_end: 0 });
    }
}
