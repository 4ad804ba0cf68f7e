use std::path::PathBuf;

use thiserror::Error;

/// Taxonomy from the error-handling design: every variant is fatal.
#[derive(Debug, Error)]
pub enum CustomError {
    #[error("unknown argument(s): {args}")]
    UnknownArgs { args: String },

    #[error("missing required argument: {key}")]
    MissingArg { key: &'static str },

    #[error("invalid value for {key}={value}: {reason}")]
    InvalidArg {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("could not read {path}")]
    ReadWithPath {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("could not read input stream")]
    ReadWithoutPath {
        #[source]
        source: std::io::Error,
    },

    #[error("could not write to {path}")]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("could not write TSV record")]
    CsvWrite(#[from] csv::Error),

    #[error("malformed variant record at {path}:{line_num}: {reason}")]
    MalformedVariant {
        path: PathBuf,
        line_num: usize,
        reason: String,
    },

    #[error("malformed genetic map line {line_num} in {path}: {reason}")]
    MalformedMapLine {
        path: PathBuf,
        line_num: usize,
        reason: String,
    },

    #[error("malformed exclude-samples line {line_num} in {path}: expected one identifier")]
    MalformedExcludeLine { path: PathBuf, line_num: usize },

    #[error("{sample} at {chrom}:{pos} is unphased or missing")]
    UnphasedOrMissing {
        sample: String,
        chrom: String,
        pos: i32,
    },

    #[error("sample {sample} has {found} alleles at {chrom}:{pos}, expected {expected}")]
    AlleleCountMismatch {
        sample: String,
        chrom: String,
        pos: i32,
        found: usize,
        expected: usize,
    },

    #[error("chromosome changed mid-stream: expected {expected}, found {found} at line {line_num}")]
    ChromosomeChanged {
        expected: String,
        found: String,
        line_num: usize,
    },

    #[error("genetic map has no entries for chromosome {chrom}")]
    MapMissingForChromosome { chrom: String },

    #[error("variant records are not in non-decreasing base-pair order: {prev} then {next} at line {line_num}")]
    PositionsOutOfOrder {
        prev: i32,
        next: i32,
        line_num: usize,
    },

    #[error("exceeded the maximum supported marker count ({max})")]
    TooManyMarkers { max: u64 },

    #[error("internal sequence-class cap exceeded ({cap})")]
    SequenceClassCapExceeded { cap: usize },
}

pub type Result<T> = std::result::Result<T, CustomError>;
