use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// One sample's phased genotype across the fixture's diallelic markers,
/// e.g. `["0|0", "0|0", "1|0", "0|0", "0|0"]`.
pub struct SampleGt {
    pub id: &'static str,
    pub genotypes: Vec<&'static str>,
}

/// A small phased-genotype + genetic-map fixture written to a unique temp
/// dir for one test scenario.
pub struct Dataset {
    pub dir: PathBuf,
    pub gt_path: PathBuf,
    pub map_path: PathBuf,
    pub out_prefix: PathBuf,
}

/// `bp`/`cm` pairs for each marker, in order.
pub fn create_dataset(label: &str, bp: &[i32], cm: &[f64], samples: &[SampleGt]) -> io::Result<Dataset> {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join("ibdpbwt-tests").join(format!(
        "{}-{}-{}",
        std::process::id(),
        id,
        label
    ));
    fs::create_dir_all(&dir)?;

    let gt_path = dir.join("input.vcf");
    let map_path = dir.join("genetic.map");
    let out_prefix = dir.join("out");

    write_vcf(&gt_path, bp, samples)?;
    write_map(&map_path, bp, cm)?;

    Ok(Dataset {
        dir,
        gt_path,
        map_path,
        out_prefix,
    })
}

fn write_vcf(path: &PathBuf, bp: &[i32], samples: &[SampleGt]) -> io::Result<()> {
    let mut text = String::from("##fileformat=VCFv4.2\n");
    text.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT");
    for s in samples {
        text.push('\t');
        text.push_str(s.id);
    }
    text.push('\n');
    for (i, &pos) in bp.iter().enumerate() {
        text.push_str(&format!("1\t{pos}\t.\tA\tG\t.\t.\t.\tGT"));
        for s in samples {
            text.push('\t');
            text.push_str(s.genotypes[i]);
        }
        text.push('\n');
    }
    fs::write(path, text)
}

fn write_map(path: &PathBuf, bp: &[i32], cm: &[f64]) -> io::Result<()> {
    let mut text = String::new();
    for (&pos, &c) in bp.iter().zip(cm.iter()) {
        text.push_str(&format!("1 . {c} {pos}\n"));
    }
    fs::write(path, text)
}
