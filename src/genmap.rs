use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};

const MAP_FIELDS: usize = 4;

/// A per-chromosome sorted `(bp, cM)` table supporting `gen_pos` lookup
/// by linear interpolation, the standard convention for PLINK-format
/// genetic maps (spec.md §6's map contract).
#[derive(Debug, Default)]
pub struct GeneticMap {
    by_chrom: HashMap<String, Vec<(i32, f64)>>,
}

impl GeneticMap {
    pub fn load(path: &impl AsRef<Path>) -> Result<Self> {
        let path_buf: PathBuf = path.as_ref().to_path_buf();
        let f = File::open(&path_buf).map_err(|e| CustomError::ReadWithPath {
            source: e,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(f);

        let mut by_chrom: HashMap<String, Vec<(i32, f64)>> = HashMap::new();
        for (line_idx, line) in reader.lines().enumerate() {
            let line_num = line_idx + 1;
            let line = line.map_err(|e| CustomError::ReadWithPath {
                source: e,
                path: path_buf.clone(),
            })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != MAP_FIELDS {
                return Err(CustomError::MalformedMapLine {
                    path: path_buf.clone(),
                    line_num,
                    reason: format!("expected {MAP_FIELDS} fields, found {}", fields.len()),
                });
            }
            let chrom = fields[0].to_string();
            let cm: f64 = fields[2].parse().map_err(|_| CustomError::MalformedMapLine {
                path: path_buf.clone(),
                line_num,
                reason: format!("could not parse cM field {:?}", fields[2]),
            })?;
            if !cm.is_finite() {
                return Err(CustomError::MalformedMapLine {
                    path: path_buf.clone(),
                    line_num,
                    reason: "cM value is not finite".to_string(),
                });
            }
            let bp: i32 = fields[3].parse().map_err(|_| CustomError::MalformedMapLine {
                path: path_buf.clone(),
                line_num,
                reason: format!("could not parse bp field {:?}", fields[3]),
            })?;

            let entries = by_chrom.entry(chrom.clone()).or_default();
            if let Some(&(prev_bp, prev_cm)) = entries.last() {
                if bp == prev_bp {
                    return Err(CustomError::MalformedMapLine {
                        path: path_buf.clone(),
                        line_num,
                        reason: format!("duplicate bp {bp} within chromosome {chrom}"),
                    });
                }
                if cm < prev_cm {
                    return Err(CustomError::MalformedMapLine {
                        path: path_buf.clone(),
                        line_num,
                        reason: "cM is not non-decreasing within chromosome".to_string(),
                    });
                }
            }
            entries.push((bp, cm));
        }

        Ok(GeneticMap { by_chrom })
    }

    /// Genetic position in cM for `bp` on `chrom`, by linear interpolation
    /// between bracketing map entries (extrapolating past the ends using
    /// the nearest slope).
    pub fn gen_pos(&self, chrom: &str, bp: i32) -> Result<f64> {
        let entries = self
            .by_chrom
            .get(chrom)
            .ok_or_else(|| CustomError::MapMissingForChromosome {
                chrom: chrom.to_string(),
            })?;

        if entries.len() == 1 {
            return Ok(entries[0].1);
        }

        match entries.binary_search_by_key(&bp, |&(b, _)| b) {
            Ok(idx) => Ok(entries[idx].1),
            Err(0) => {
                let (bp0, cm0) = entries[0];
                let (bp1, cm1) = entries[1];
                Ok(interpolate(bp0, cm0, bp1, cm1, bp))
            }
            Err(idx) if idx == entries.len() => {
                let (bp0, cm0) = entries[idx - 2];
                let (bp1, cm1) = entries[idx - 1];
                Ok(interpolate(bp0, cm0, bp1, cm1, bp))
            }
            Err(idx) => {
                let (bp0, cm0) = entries[idx - 1];
                let (bp1, cm1) = entries[idx];
                Ok(interpolate(bp0, cm0, bp1, cm1, bp))
            }
        }
    }
}

fn interpolate(bp0: i32, cm0: f64, bp1: i32, cm1: f64, bp: i32) -> f64 {
    if bp1 == bp0 {
        return cm0;
    }
    let t = (bp - bp0) as f64 / (bp1 - bp0) as f64;
    cm0 + t * (cm1 - cm0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_map(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
        f
    }

    #[test]
    fn interpolates_between_entries() {
        let f = write_map(&["1 . 0.0 1", "1 . 10.0 1001"]);
        let map = GeneticMap::load(&f.path()).unwrap();
        assert_eq!(map.gen_pos("1", 1).unwrap(), 0.0);
        assert_eq!(map.gen_pos("1", 1001).unwrap(), 10.0);
        assert!((map.gen_pos("1", 501).unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_duplicate_bp() {
        let f = write_map(&["1 . 0.0 1", "1 . 1.0 1"]);
        let err = GeneticMap::load(&f.path()).unwrap_err();
        assert!(matches!(err, CustomError::MalformedMapLine { .. }));
    }

    #[test]
    fn rejects_decreasing_cm() {
        let f = write_map(&["1 . 5.0 1", "1 . 1.0 2"]);
        let err = GeneticMap::load(&f.path()).unwrap_err();
        assert!(matches!(err, CustomError::MalformedMapLine { .. }));
    }

    #[test]
    fn missing_chromosome_errors() {
        let f = write_map(&["1 . 0.0 1"]);
        let map = GeneticMap::load(&f.path()).unwrap();
        let err = map.gen_pos("2", 1).unwrap_err();
        assert!(matches!(err, CustomError::MapMissingForChromosome { .. }));
    }
}
