use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::{CustomError, Result};

/// Per-chromosome segment counts folded into the final `.log` report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromStats {
    pub n_markers: usize,
    pub n_ibd: u64,
    pub n_hbd: u64,
}

/// Writes `<out>.log`: program name/version, the reconstructed command
/// line, every resolved parameter, per-chromosome and total segment
/// counts, and a human-readable elapsed-time line (spec.md §6).
pub fn write_log(
    out_prefix: &str,
    cfg: &Config,
    raw_tokens: &[String],
    chroms: &[(String, ChromStats)],
    elapsed: Duration,
) -> Result<()> {
    let path = PathBuf::from(format!("{out_prefix}.log"));
    let mut f = File::create(&path).map_err(|e| CustomError::Write {
        source: e,
        path: path.clone(),
    })?;
    write_log_to(&mut f, &path, cfg, raw_tokens, chroms, elapsed)
}

fn write_log_to(
    f: &mut impl std::io::Write,
    path: &Path,
    cfg: &Config,
    raw_tokens: &[String],
    chroms: &[(String, ChromStats)],
    elapsed: Duration,
) -> Result<()> {
    let wrap = |e: std::io::Error| CustomError::Write {
        source: e,
        path: path.to_path_buf(),
    };

    writeln!(
        f,
        "{} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
    .map_err(wrap)?;
    writeln!(f, "command: {} {}", env!("CARGO_PKG_NAME"), raw_tokens.join(" ")).map_err(wrap)?;
    for (key, value) in cfg.resolved_params() {
        writeln!(f, "{key}={value}").map_err(wrap)?;
    }

    let mut total_ibd = 0u64;
    let mut total_hbd = 0u64;
    for (chrom, stats) in chroms {
        writeln!(
            f,
            "chrom {chrom}: {} markers, {} ibd segments, {} hbd segments",
            stats.n_markers, stats.n_ibd, stats.n_hbd
        )
        .map_err(wrap)?;
        total_ibd += stats.n_ibd;
        total_hbd += stats.n_hbd;
    }
    writeln!(f, "total: {total_ibd} ibd segments, {total_hbd} hbd segments").map_err(wrap)?;
    writeln!(f, "elapsed: {}", format_elapsed(elapsed)).map_err(wrap)?;
    Ok(())
}

fn format_elapsed(d: Duration) -> String {
    let total_secs = d.as_secs();
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
