use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::error::{CustomError, Result};
use crate::interner::Interner;

/// Sample bookkeeping for one VCF-like header: ordered sample ids (interned,
/// per the process-wide id table shared with chromosome names) plus the
/// subset of haplotype indices surviving `excludesamples` filtering
/// (spec.md §4.1).
#[derive(Debug)]
pub struct SampleTable {
    interner: Arc<Interner>,
    sample_id_ids: Vec<u32>,
    /// Haplotype indices (`2*sample_idx`, `2*sample_idx+1`) kept after
    /// exclusion, in ascending order.
    pub kept_haps: Vec<u32>,
}

impl SampleTable {
    pub fn new(sample_ids: Vec<String>, excluded: &HashSet<String>, interner: &Arc<Interner>) -> Self {
        let mut kept_haps = Vec::with_capacity(sample_ids.len() * 2);
        let mut sample_id_ids = Vec::with_capacity(sample_ids.len());
        for (idx, id) in sample_ids.iter().enumerate() {
            sample_id_ids.push(interner.intern(id));
            if excluded.contains(id) {
                continue;
            }
            kept_haps.push((idx * 2) as u32);
            kept_haps.push((idx * 2 + 1) as u32);
        }
        SampleTable {
            interner: Arc::clone(interner),
            sample_id_ids,
            kept_haps,
        }
    }

    pub fn n_kept_samples(&self) -> usize {
        self.kept_haps.len() / 2
    }

    /// Original sample ids in kept order, indexed by the analysis-local
    /// sample index used throughout `OutputSegment`/`HapIdx`.
    pub fn kept_sample_names(&self) -> Vec<String> {
        self.kept_haps
            .iter()
            .step_by(2)
            .map(|&h| {
                let id = self.sample_id_ids[(h / 2) as usize];
                self.interner.resolve(id)
            })
            .collect()
    }
}

/// Parses an `excludesamples` file: one identifier per line, blank lines
/// ignored, any line with more than one whitespace-separated token is an
/// error (spec.md §6). An id present in the file but absent from the VCF
/// header is tolerated (not every caller runs it against the same cohort).
pub fn load_excluded(path: &impl AsRef<Path>) -> Result<HashSet<String>> {
    let path_buf = path.as_ref().to_path_buf();
    let f = File::open(&path_buf).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: path_buf.clone(),
    })?;
    let reader = BufReader::new(f);
    let mut set = HashSet::new();
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CustomError::ReadWithPath {
            source: e,
            path: path_buf.clone(),
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 1 {
            return Err(CustomError::MalformedExcludeLine {
                path: path_buf.clone(),
                line_num: line_idx + 1,
            });
        }
        set.insert(tokens[0].to_string());
    }
    Ok(set)
}
