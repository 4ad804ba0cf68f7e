use crate::column::Column;
use crate::config::Config;
use crate::extend::merge_seeds;
use crate::marker::Marker;
use crate::pbwt::Direction;
use crate::segments::OutputSegment;
use crate::seeds::scan_window;
use crate::windows::Window;

/// Per-worker tunables derived once from [`Config`] (spec.md §4.4's
/// extension-pass thresholds).
pub struct WorkerParams {
    pub min_seed_cm: f64,
    pub min_markers: u32,
    pub min_extend_cm: f64,
    pub min_extend_markers: u32,
    pub min_output_cm: f64,
    pub max_gap: i64,
}

impl WorkerParams {
    pub fn from_config(cfg: &Config) -> Self {
        let ratio = cfg.min_seed / cfg.min_extend;
        let min_extend_markers = (ratio * cfg.min_markers as f64).ceil() as u32;
        WorkerParams {
            min_seed_cm: cfg.min_seed,
            min_markers: cfg.min_markers,
            min_extend_cm: cfg.min_extend,
            min_extend_markers,
            min_output_cm: cfg.min_output,
            max_gap: cfg.max_gap,
        }
    }
}

/// Drives the seed finder (forward) and extension finder (backward) over
/// one worker's marker window, merges, classifies, and length-filters the
/// results into ready-to-write segments (spec.md §4.4/§4.5).
pub fn process_window(
    markers: &[Marker],
    columns: &[Column],
    window: &Window,
    params: &WorkerParams,
) -> Vec<OutputSegment> {
    let local_markers = &markers[window.window_start..=window.window_end];
    let local_columns = &columns[window.window_start..=window.window_end];

    let local_seeds = scan_window(
        local_markers,
        local_columns,
        Direction::Forward,
        params.min_seed_cm,
        params.min_markers,
    );
    let local_extensions = scan_window(
        local_markers,
        local_columns,
        Direction::Backward,
        params.min_extend_cm,
        params.min_extend_markers,
    );

    let core_lo = window.core_start - window.window_start;
    let core_hi = window.core_end - window.window_start;
    let seeds: Vec<_> = local_seeds
        .into_iter()
        .filter(|s| s.marker_end >= core_lo && s.marker_end <= core_hi)
        .map(|s| shift(s, window.window_start))
        .collect();
    let extensions: Vec<_> = local_extensions
        .into_iter()
        .map(|e| shift(e, window.window_start))
        .collect();

    let merged = merge_seeds(&seeds, &extensions, markers, params.max_gap);

    merged
        .into_iter()
        .filter_map(|seg| {
            let cm_length = markers[seg.marker_end].cm - markers[seg.marker_start].cm;
            if cm_length < params.min_output_cm {
                return None;
            }
            Some(OutputSegment::new(
                seg.hap1,
                seg.hap2,
                markers[seg.marker_start].bp,
                markers[seg.marker_end].bp,
                cm_length,
            ))
        })
        .collect()
}

fn shift(rec: crate::seeds::SeedRecord, offset: usize) -> crate::seeds::SeedRecord {
    crate::seeds::SeedRecord {
        hap1: rec.hap1,
        hap2: rec.hap2,
        marker_start: rec.marker_start + offset,
        marker_end: rec.marker_end + offset,
    }
}
