use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::{CustomError, Result};

/// Header of a VCF-like stream: the ordered sample ids from the
/// `#CHROM POS ID REF ALT QUAL FILTER INFO FORMAT <sample>...` line.
pub struct VcfHeader {
    pub sample_ids: Vec<String>,
}

/// One parsed marker record: alleles for *all* samples in the file (caller
/// subsets to kept haplotypes and applies `min-mac`), per spec.md §4.1.
pub struct RawRecord {
    pub chrom: String,
    pub bp: i32,
    pub n_alleles: u32,
    /// Length `2 * sample_ids.len()`, haplotype-major (`2*i`, `2*i+1` for
    /// sample `i`).
    pub alleles: Vec<u32>,
}

fn looks_like_gzip(path: &Path) -> Result<bool> {
    let mut f = File::open(path).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: path.to_path_buf(),
    })?;
    let mut magic = [0u8; 2];
    let n = f.read(&mut magic).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: path.to_path_buf(),
    })?;
    Ok(n == 2 && magic == [0x1f, 0x8b])
}

/// Opens `path`, transparently decompressing gzip or block-gzipped (BGZF)
/// input — BGZF's concatenated-gzip-member framing decodes correctly
/// under a plain multi-member gzip reader (spec.md §6).
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let path_buf = path.to_path_buf();
    let gzipped = looks_like_gzip(path)?;
    let f = File::open(path).map_err(|e| CustomError::ReadWithPath {
        source: e,
        path: path_buf.clone(),
    })?;
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Reads lines until the header row (first non-`##` line) and returns the
/// sample ids found in its trailing columns.
pub fn read_header(reader: &mut dyn BufRead, path: &Path) -> Result<VcfHeader> {
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| CustomError::ReadWithPath {
                source: e,
                path: path.to_path_buf(),
            })?;
        if n == 0 {
            return Err(CustomError::MalformedVariant {
                path: path.to_path_buf(),
                line_num: 0,
                reason: "reached end of file before a header row".to_string(),
            });
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.starts_with("##") || trimmed.is_empty() {
            continue;
        }
        let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let fields = split_fields(trimmed);
        if fields.len() < 9 {
            return Err(CustomError::MalformedVariant {
                path: path.to_path_buf(),
                line_num: 0,
                reason: format!("header row has only {} fields, need >= 9", fields.len()),
            });
        }
        let sample_ids = fields[9..].iter().map(|s| s.to_string()).collect();
        return Ok(VcfHeader { sample_ids });
    }
}

/// Parses one data line into a [`RawRecord`], per spec.md §4.1: every
/// genotype must be `|`-phased and non-missing.
pub fn parse_line(
    line: &str,
    path: &Path,
    line_num: usize,
    sample_ids: &[String],
) -> Result<RawRecord> {
    let fields = split_fields(line);
    let expected = 9 + sample_ids.len();
    if fields.len() != expected {
        return Err(CustomError::MalformedVariant {
            path: path.to_path_buf(),
            line_num,
            reason: format!("expected {expected} fields, found {}", fields.len()),
        });
    }
    let chrom = fields[0].to_string();
    let bp: i32 = fields[1].parse().map_err(|_| CustomError::MalformedVariant {
        path: path.to_path_buf(),
        line_num,
        reason: format!("could not parse position {:?}", fields[1]),
    })?;
    let n_alt = if fields[4] == "." {
        0
    } else {
        fields[4].split(',').count()
    };
    let n_alleles = (1 + n_alt) as u32;

    let format_fields: Vec<&str> = fields[8].split(':').collect();
    let gt_idx = format_fields
        .iter()
        .position(|&f| f == "GT")
        .ok_or_else(|| CustomError::MalformedVariant {
            path: path.to_path_buf(),
            line_num,
            reason: "FORMAT column has no GT subfield".to_string(),
        })?;

    let mut alleles = vec![0u32; 2 * sample_ids.len()];
    for (i, sample_field) in fields[9..].iter().enumerate() {
        let gt_token = sample_field
            .split(':')
            .nth(gt_idx)
            .ok_or_else(|| CustomError::MalformedVariant {
                path: path.to_path_buf(),
                line_num,
                reason: format!("sample {:?} has no GT subfield", sample_ids[i]),
            })?;
        if gt_token.contains('/') || gt_token.contains('.') {
            return Err(CustomError::UnphasedOrMissing {
                sample: sample_ids[i].clone(),
                chrom: chrom.clone(),
                pos: bp,
            });
        }
        let parts: Vec<&str> = gt_token.split('|').collect();
        if parts.len() != 2 {
            return Err(CustomError::AlleleCountMismatch {
                sample: sample_ids[i].clone(),
                chrom: chrom.clone(),
                pos: bp,
                found: parts.len(),
                expected: 2,
            });
        }
        for (side, p) in parts.iter().enumerate() {
            let allele: u32 = p.parse().map_err(|_| CustomError::UnphasedOrMissing {
                sample: sample_ids[i].clone(),
                chrom: chrom.clone(),
                pos: bp,
            })?;
            alleles[2 * i + side] = allele;
        }
    }

    Ok(RawRecord {
        chrom,
        bp,
        n_alleles,
        alleles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ids() -> Vec<String> {
        vec!["A".into(), "B".into()]
    }

    #[test]
    fn parses_phased_diploid_line() {
        let line = "1\t100\t.\tA\tG\t.\t.\t.\tGT\t0|1\t1|1";
        let rec = parse_line(line, Path::new("x"), 1, &sample_ids()).unwrap();
        assert_eq!(rec.chrom, "1");
        assert_eq!(rec.bp, 100);
        assert_eq!(rec.n_alleles, 2);
        assert_eq!(rec.alleles, vec![0, 1, 1, 1]);
    }

    #[test]
    fn rejects_unphased_genotype() {
        let line = "1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1\t1|1";
        let err = parse_line(line, Path::new("x"), 1, &sample_ids()).unwrap_err();
        assert!(matches!(err, CustomError::UnphasedOrMissing { .. }));
    }

    #[test]
    fn rejects_missing_genotype() {
        let line = "1\t100\t.\tA\tG\t.\t.\t.\tGT\t.|1\t1|1";
        let err = parse_line(line, Path::new("x"), 1, &sample_ids()).unwrap_err();
        assert!(matches!(err, CustomError::UnphasedOrMissing { .. }));
    }

    #[test]
    fn counts_multiallelic_n_alleles() {
        let line = "1\t100\t.\tA\tG,T\t.\t.\t.\tGT\t0|1\t2|0";
        let rec = parse_line(line, Path::new("x"), 1, &sample_ids()).unwrap();
        assert_eq!(rec.n_alleles, 3);
    }

    #[test]
    fn header_parses_trailing_sample_ids() {
        let text = "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tA\tB\n1\t1\t.\tA\tG\t.\t.\t.\tGT\t0|0\t0|0\n";
        let mut reader: Box<dyn BufRead> = Box::new(std::io::Cursor::new(text));
        let header = read_header(&mut reader, Path::new("x")).unwrap();
        assert_eq!(header.sample_ids, vec!["A".to_string(), "B".to_string()]);
    }
}
