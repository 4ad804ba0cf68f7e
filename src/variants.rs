use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;
use rayon::prelude::*;

use crate::column::{Allele, Column};
use crate::error::{CustomError, Result};
use crate::genmap::GeneticMap;
use crate::interner::Interner;
use crate::marker::Marker;
use crate::samples::SampleTable;
use crate::seqcoder::SequenceCoder;
use crate::vcf::{self, RawRecord};

const BATCH_SIZE: usize = 4096;

/// Upper bound on markers per chromosome (spec.md §7's `Capacity` leaf:
/// "exceeded `Integer.MAX_VALUE` markers").
const MAX_MARKERS: usize = i32::MAX as usize;

pub struct IngestResult {
    /// Interned chromosome id; resolve through the same `Interner` to get
    /// the display name.
    pub chrom_id: u32,
    pub markers: Vec<Marker>,
    pub columns: Vec<Column>,
    pub sample_table: SampleTable,
    pub n_dropped_mac: usize,
}

/// Reads one chromosome's worth of markers from `gt_path`, validates them,
/// applies sample exclusion and `min-mac` filtering, and packs each
/// surviving column, online-compressing eligible runs through the
/// sequence coder (spec.md §4.1). A dedicated reader thread feeds raw line
/// batches through a bounded channel; each batch's lines are parsed in
/// parallel by `rayon`, while the inherently sequential decisions
/// (chromosome/position ordering, sequence-coder state) stay on the
/// calling thread.
pub fn ingest_chromosome(
    gt_path: &Path,
    excluded: &HashSet<String>,
    min_mac: u32,
    interner: &Arc<Interner>,
    genmap: &GeneticMap,
    cancel: &Arc<AtomicBool>,
) -> Result<IngestResult> {
    let mut reader = vcf::open_reader(gt_path)?;
    let header = vcf::read_header(&mut reader, gt_path)?;
    let sample_table = SampleTable::new(header.sample_ids.clone(), excluded, interner);
    let n_kept_haps = sample_table.kept_haps.len();
    let max_n_seq = SequenceCoder::max_n_seq_for(sample_table.n_kept_samples());

    let (batch_tx, batch_rx) = bounded::<Vec<(usize, String)>>(4);
    let path_buf = gt_path.to_path_buf();
    let reader_cancel = Arc::clone(cancel);
    let reader_path = path_buf.clone();
    let reader_handle: thread::JoinHandle<Result<()>> = thread::spawn(move || {
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut line_num = 0usize;
        let mut line = String::new();
        loop {
            if reader_cancel.load(Ordering::Relaxed) {
                return Ok(());
            }
            line.clear();
            let n = reader
                .read_line(&mut line)
                .map_err(|e| CustomError::ReadWithPath {
                    source: e,
                    path: reader_path.clone(),
                })?;
            if n == 0 {
                break;
            }
            line_num += 1;
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            batch.push((line_num, trimmed.to_string()));
            if batch.len() == BATCH_SIZE {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(BATCH_SIZE));
                if batch_tx.send(full).is_err() {
                    return Ok(());
                }
            }
        }
        if !batch.is_empty() {
            let _ = batch_tx.send(batch);
        }
        Ok(())
    });

    let mut markers = Vec::new();
    let mut columns = Vec::new();
    let mut chrom_id: Option<u32> = None;
    let mut prev_bp: Option<i32> = None;
    let mut n_dropped_mac = 0usize;
    let mut coder = SequenceCoder::new(n_kept_haps, max_n_seq);
    let mut run_indices: Vec<usize> = Vec::new();

    let sample_ids = &header.sample_ids;
    'outer: for batch in batch_rx.iter() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let parsed: Vec<Result<RawRecord>> = batch
            .par_iter()
            .map(|(line_num, text)| vcf::parse_line(text, &path_buf, *line_num, sample_ids))
            .collect();

        for (idx, record) in parsed.into_iter().enumerate() {
            let record = record?;
            let line_num = batch[idx].0;

            let record_chrom_id = interner.intern(&record.chrom);
            match chrom_id {
                None => chrom_id = Some(record_chrom_id),
                Some(id) if id != record_chrom_id => {
                    return Err(CustomError::ChromosomeChanged {
                        expected: interner.resolve(id),
                        found: record.chrom.clone(),
                        line_num,
                    });
                }
                _ => {}
            }
            if let Some(prev) = prev_bp {
                if record.bp < prev {
                    return Err(CustomError::PositionsOutOfOrder {
                        prev,
                        next: record.bp,
                        line_num,
                    });
                }
            }
            prev_bp = Some(record.bp);

            let kept_alleles: Vec<Allele> = sample_table
                .kept_haps
                .iter()
                .map(|&h| record.alleles[h as usize])
                .collect();

            let minor_count = minor_allele_count(&kept_alleles, record.n_alleles);
            if minor_count < min_mac as usize {
                n_dropped_mac += 1;
                continue;
            }

            if markers.len() >= MAX_MARKERS {
                return Err(CustomError::TooManyMarkers {
                    max: MAX_MARKERS as u64,
                });
            }

            let cm = genmap.gen_pos(&record.chrom, record.bp)?;
            let marker = Marker {
                chrom_id: record_chrom_id,
                bp: record.bp,
                cm,
                n_alleles: record.n_alleles,
            };

            if is_low_maf(&kept_alleles, record.n_alleles, minor_count) {
                if coder.try_accept(&kept_alleles) {
                    markers.push(marker);
                    columns.push(Column::from_alleles(&kept_alleles, record.n_alleles));
                    run_indices.push(markers.len() - 1);
                    continue;
                }
                flush_run(&mut coder, &mut columns, &mut run_indices);
                markers.push(marker);
                if !coder.try_accept(&kept_alleles) {
                    return Err(CustomError::SequenceClassCapExceeded { cap: max_n_seq });
                }
                columns.push(Column::from_alleles(&kept_alleles, record.n_alleles));
                run_indices.push(markers.len() - 1);
                continue;
            }

            flush_run(&mut coder, &mut columns, &mut run_indices);
            markers.push(marker);
            columns.push(Column::from_alleles(&kept_alleles, record.n_alleles));
        }

        if cancel.load(Ordering::Relaxed) {
            break 'outer;
        }
    }

    flush_run(&mut coder, &mut columns, &mut run_indices);

    reader_handle
        .join()
        .map_err(|_| CustomError::ReadWithoutPath {
            source: std::io::Error::other("reader thread panicked"),
        })??;

    Ok(IngestResult {
        chrom_id: chrom_id.unwrap_or_default(),
        markers,
        columns,
        sample_table,
        n_dropped_mac,
    })
}

/// Replaces the placeholder columns of a finished sequence-coder run with
/// its flushed `SeqCoded` representations, per spec.md §4.2.
fn flush_run(coder: &mut SequenceCoder, columns: &mut [Column], run_indices: &mut Vec<usize>) {
    if let Some(run) = coder.flush() {
        debug_assert_eq!(run.seq2allele_per_marker.len(), run_indices.len());
        for (pos, &idx) in run_indices.iter().enumerate() {
            columns[idx] = Column::SeqCoded {
                hap2seq: Arc::clone(&run.hap2seq),
                seq2allele: run.seq2allele_per_marker[pos].clone(),
            };
        }
    }
    run_indices.clear();
}

/// For `n_alleles <= 2` this is the straightforward minor-allele count; for
/// multi-allelic markers spec.md §4.1 defines the minor allele as the
/// *second*-most-frequent, so its count is the second-largest bucket.
fn minor_allele_count(alleles: &[Allele], n_alleles: u32) -> usize {
    let mut counts = vec![0usize; n_alleles.max(1) as usize];
    for &a in alleles {
        counts[a as usize] += 1;
    }
    counts.sort_unstable_by(|a, b| b.cmp(a));
    counts.get(1).copied().unwrap_or(0)
}

/// Mirrors `Column::from_alleles`'s sparse-representation cap: a marker is
/// "low-MAF" if it would be stored sparsely, the predicate the sequence
/// coder is fed under (spec.md §4.1).
fn is_low_maf(alleles: &[Allele], n_alleles: u32, minor_count: usize) -> bool {
    if n_alleles > 2 {
        return false;
    }
    let cap = ((alleles.len() as f64) * 0.995).floor() as usize;
    let cap = cap.saturating_sub(1);
    minor_count <= cap
}
