use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::bounded;
use log::info;

use crate::config::Config;
use crate::error::Result;
use crate::genmap::GeneticMap;
use crate::interner::Interner;
use crate::report::{self, ChromStats};
use crate::samples;
use crate::segments::OutputSegment;
use crate::variants;
use crate::windows;
use crate::worker::{self, WorkerParams};

/// Channel capacity between worker threads and the writer threads,
/// bounding memory under the usual producer/consumer backpressure model
/// (spec.md §5).
const CHANNEL_CAPACITY: usize = 64;

/// Runs the full analysis for `cfg`: ingest, window partitioning,
/// per-window workers, and the two gzip TSV writers, then writes the
/// `.log` report. This is the single orchestration entry point `main.rs`
/// calls into (spec.md §5's concurrency model).
///
/// The `.log` report is written best-effort regardless of outcome
/// (spec.md §7): whatever chromosome name and counts were gathered before
/// an error aborted the run still get written, and the original error is
/// what's returned to the caller.
pub fn run(cfg: &Config, interner: &Arc<Interner>, raw_tokens: &[String]) -> Result<()> {
    let start = Instant::now();
    let mut chrom_name = String::new();
    let mut stats = ChromStats::default();

    let result = run_inner(cfg, interner, &mut chrom_name, &mut stats);

    let chrom_stats = vec![(chrom_name, stats)];
    match result {
        Ok(()) => {
            report::write_log(&cfg.out, cfg, raw_tokens, &chrom_stats, start.elapsed())?;
            Ok(())
        }
        Err(e) => {
            let _ = report::write_log(&cfg.out, cfg, raw_tokens, &chrom_stats, start.elapsed());
            Err(e)
        }
    }
}

fn run_inner(
    cfg: &Config,
    interner: &Arc<Interner>,
    chrom_name: &mut String,
    stats: &mut ChromStats,
) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));

    let excluded = match &cfg.excludesamples {
        Some(path) => samples::load_excluded(path)?,
        None => HashSet::new(),
    };
    let genmap = GeneticMap::load(&cfg.map)?;

    info!("ingesting {}", cfg.gt.display());
    let ingest = variants::ingest_chromosome(&cfg.gt, &excluded, cfg.min_mac, interner, &genmap, &cancel)?;
    *chrom_name = interner.resolve(ingest.chrom_id);
    stats.n_markers = ingest.markers.len();
    info!(
        "chromosome {}: {} markers, {} samples ({} dropped by min-mac)",
        chrom_name,
        ingest.markers.len(),
        ingest.sample_table.n_kept_samples(),
        ingest.n_dropped_mac
    );

    let windows = windows::partition(&ingest.markers, cfg.nthreads, cfg.min_seed);
    let params = WorkerParams::from_config(cfg);
    let sample_names = Arc::new(ingest.sample_table.kept_sample_names());
    let chrom_arc: Arc<str> = Arc::from(chrom_name.as_str());

    let (ibd_tx, ibd_rx) = bounded::<Vec<OutputSegment>>(CHANNEL_CAPACITY);
    let (hbd_tx, hbd_rx) = bounded::<Vec<OutputSegment>>(CHANNEL_CAPACITY);

    let ibd_writer = crate::writer::spawn_writer(
        format!("{}.ibd.gz", cfg.out).into(),
        Arc::clone(&chrom_arc),
        Arc::clone(&sample_names),
        ibd_rx,
        Arc::clone(&cancel),
    );
    let hbd_writer = crate::writer::spawn_writer(
        format!("{}.hbd.gz", cfg.out).into(),
        chrom_arc,
        sample_names,
        hbd_rx,
        Arc::clone(&cancel),
    );

    let markers = &ingest.markers;
    let columns = &ingest.columns;

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(windows.len());
        for window in &windows {
            let ibd_tx = ibd_tx.clone();
            let hbd_tx = hbd_tx.clone();
            let cancel = Arc::clone(&cancel);
            let params = &params;
            handles.push(scope.spawn(move || {
                if cancel.load(Ordering::Relaxed) {
                    return;
                }
                let segs = worker::process_window(markers, columns, window, params);
                let (ibd, hbd): (Vec<_>, Vec<_>) = segs.into_iter().partition(|s| !s.is_hbd());
                if !ibd.is_empty() {
                    let _ = ibd_tx.send(ibd);
                }
                if !hbd.is_empty() {
                    let _ = hbd_tx.send(hbd);
                }
            }));
        }
        for h in handles {
            h.join().expect("worker thread panicked");
        }
    });

    drop(ibd_tx);
    drop(hbd_tx);
    stats.n_ibd = ibd_writer.join().expect("ibd writer thread panicked")?;
    stats.n_hbd = hbd_writer.join().expect("hbd writer thread panicked")?;

    Ok(())
}
