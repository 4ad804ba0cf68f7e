use std::collections::HashSet;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CustomError, Result};
use crate::segments::OutputSegment;

/// Dedup key across workers: spec.md §4.5/§8 property 7,
/// `(sample1, side1, sample2, side2, bp_start, bp_end)`.
type DedupKey = (u32, u8, u32, u8, i32, i32);

/// Spawns the writer thread owning `path` (`.ibd.gz` or `.hbd.gz`), per
/// spec.md §5's "one writer thread per output file." `sample_names` maps
/// the analysis-local kept-sample index back to its original id for the
/// `sample1`/`sample2` output columns. `chrom` is resolved once (from the
/// chromosome id interned during ingestion) and stamped onto every row,
/// since one run covers exactly one chromosome. Returns the count of
/// segments actually written (post cross-worker dedup) once the channel
/// closes.
pub fn spawn_writer(
    path: PathBuf,
    chrom: Arc<str>,
    sample_names: Arc<Vec<String>>,
    rx: Receiver<Vec<OutputSegment>>,
    cancel: Arc<AtomicBool>,
) -> thread::JoinHandle<Result<u64>> {
    thread::spawn(move || write_loop(path, &chrom, &sample_names, rx, &cancel))
}

fn write_loop(
    path: PathBuf,
    chrom: &str,
    sample_names: &[String],
    rx: Receiver<Vec<OutputSegment>>,
    cancel: &AtomicBool,
) -> Result<u64> {
    let file = File::create(&path).map_err(|e| CustomError::Write {
        source: e,
        path: path.clone(),
    })?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(encoder);

    let mut seen: HashSet<DedupKey> = HashSet::new();
    let mut count = 0u64;

    for batch in rx.iter() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        for seg in batch {
            let key = (
                seg.sample1,
                seg.side1,
                seg.sample2,
                seg.side2,
                seg.bp_start,
                seg.bp_end,
            );
            if !seen.insert(key) {
                continue;
            }
            let name1 = sample_names
                .get(seg.sample1 as usize)
                .map(String::as_str)
                .unwrap_or("?");
            let name2 = sample_names
                .get(seg.sample2 as usize)
                .map(String::as_str)
                .unwrap_or("?");
            csv_writer
                .write_record(&[
                    name1.to_string(),
                    seg.side1.to_string(),
                    name2.to_string(),
                    seg.side2.to_string(),
                    chrom.to_string(),
                    seg.bp_start.to_string(),
                    seg.bp_end.to_string(),
                    format!("{:.4}", seg.cm_length),
                ])
                .map_err(CustomError::CsvWrite)?;
            count += 1;
        }
    }

    csv_writer
        .into_inner()
        .map_err(|e| CustomError::Write {
            source: e.into_error(),
            path: path.clone(),
        })?
        .finish()
        .map_err(|e| CustomError::Write { source: e, path })?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn seg(s1: u32, side1: u8, s2: u32, side2: u8, bp_start: i32, bp_end: i32) -> OutputSegment {
        OutputSegment {
            sample1: s1,
            side1,
            sample2: s2,
            side2,
            bp_start,
            bp_end,
            cm_length: 3.5,
        }
    }

    #[test]
    fn writes_deduplicated_tsv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ibd.gz");
        let (tx, rx) = bounded(4);
        let cancel = Arc::new(AtomicBool::new(false));
        let names = Arc::new(vec!["S0".to_string(), "S1".to_string()]);
        let handle = spawn_writer(path.clone(), Arc::from("1"), names, rx, cancel);

        tx.send(vec![seg(0, 1, 1, 2, 10, 20), seg(0, 1, 1, 2, 10, 20)])
            .unwrap();
        tx.send(vec![seg(0, 2, 1, 1, 30, 40)]).unwrap();
        drop(tx);

        let count = handle.join().unwrap().unwrap();
        assert_eq!(count, 2);

        let mut decoder = GzDecoder::new(File::open(&path).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "S0\t1\tS1\t2\t1\t10\t20\t3.5000");
    }

    #[test]
    fn cancellation_stops_early_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.hbd.gz");
        let (tx, rx) = bounded(4);
        let cancel = Arc::new(AtomicBool::new(true));
        let names = Arc::new(vec!["S0".to_string()]);
        let handle = spawn_writer(path, Arc::from("1"), names, rx, cancel);
        tx.send(vec![seg(0, 1, 0, 2, 1, 2)]).unwrap();
        drop(tx);
        assert!(handle.join().unwrap().is_ok());
    }
}
