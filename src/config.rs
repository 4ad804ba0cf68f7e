use std::path::PathBuf;

use clap::Parser;

use crate::error::{CustomError, Result};

/// Top-level argv capture. The `name=value` grammar itself cannot be
/// expressed through clap's flag model, so clap only owns `--help`/
/// `--version` and hands the raw tokens to [`Config::from_tokens`].
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gt: PathBuf,
    pub map: PathBuf,
    pub out: String,
    pub min_seed: f64,
    pub max_gap: i64,
    pub min_extend: f64,
    pub min_output: f64,
    pub min_markers: u32,
    pub min_mac: u32,
    pub nthreads: usize,
    pub excludesamples: Option<PathBuf>,
}

impl Config {
    /// Parses process argv (skipping argv[0]) into a validated [`Config`].
    pub fn from_argv() -> Result<Config> {
        let args = Args::parse();
        Self::from_tokens(&args.tokens)
    }

    pub fn from_tokens(tokens: &[String]) -> Result<Config> {
        let mut gt = None;
        let mut map = None;
        let mut out = None;
        let mut min_seed = 2.0f64;
        let mut max_gap = 1000i64;
        let mut min_extend = None;
        let mut min_output = 2.0f64;
        let mut min_markers = 1u32;
        let mut min_mac = 2u32;
        let mut nthreads = num_cpus::get();
        let mut excludesamples = None;

        let mut unknown = Vec::new();

        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                unknown.push(token.clone());
                continue;
            };
            match key {
                "gt" => gt = Some(PathBuf::from(value)),
                "map" => map = Some(PathBuf::from(value)),
                "out" => out = Some(value.to_string()),
                "min-seed" => min_seed = parse_f64(key, value)?,
                "max-gap" => max_gap = parse_i64(key, value)?,
                "min-extend" => min_extend = Some(parse_f64(key, value)?),
                "min-output" => min_output = parse_f64(key, value)?,
                "min-markers" => min_markers = parse_u32(key, value)?,
                "min-mac" => min_mac = parse_u32(key, value)?,
                "nthreads" => nthreads = parse_u32(key, value)? as usize,
                "excludesamples" => excludesamples = Some(PathBuf::from(value)),
                _ => unknown.push(token.clone()),
            }
        }

        if !unknown.is_empty() {
            return Err(CustomError::UnknownArgs {
                args: unknown.join(", "),
            });
        }

        let gt = gt.ok_or(CustomError::MissingArg { key: "gt" })?;
        let map = map.ok_or(CustomError::MissingArg { key: "map" })?;
        let out = out.ok_or(CustomError::MissingArg { key: "out" })?;
        let min_extend = min_extend.unwrap_or(min_seed.min(1.0));

        if min_seed <= 0.0 {
            return Err(CustomError::InvalidArg {
                key: "min-seed",
                value: min_seed.to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if min_extend <= 0.0 {
            return Err(CustomError::InvalidArg {
                key: "min-extend",
                value: min_extend.to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if min_output <= 0.0 {
            return Err(CustomError::InvalidArg {
                key: "min-output",
                value: min_output.to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        if min_markers < 1 {
            return Err(CustomError::InvalidArg {
                key: "min-markers",
                value: min_markers.to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if min_mac < 1 {
            return Err(CustomError::InvalidArg {
                key: "min-mac",
                value: min_mac.to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if nthreads < 1 {
            return Err(CustomError::InvalidArg {
                key: "nthreads",
                value: nthreads.to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        if max_gap < -1 {
            return Err(CustomError::InvalidArg {
                key: "max-gap",
                value: max_gap.to_string(),
                reason: "must be >= -1".to_string(),
            });
        }

        Ok(Config {
            gt,
            map,
            out,
            min_seed,
            max_gap,
            min_extend,
            min_output,
            min_markers,
            min_mac,
            nthreads,
            excludesamples,
        })
    }

    /// Rebuilds a readable `key=value ...` command line for the log report.
    pub fn resolved_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("gt", self.gt.display().to_string()),
            ("map", self.map.display().to_string()),
            ("out", self.out.clone()),
            ("min-seed", self.min_seed.to_string()),
            ("max-gap", self.max_gap.to_string()),
            ("min-extend", self.min_extend.to_string()),
            ("min-output", self.min_output.to_string()),
            ("min-markers", self.min_markers.to_string()),
            ("min-mac", self.min_mac.to_string()),
            ("nthreads", self.nthreads.to_string()),
            (
                "excludesamples",
                self.excludesamples
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
        ]
    }
}

fn parse_f64(key: &'static str, value: &str) -> Result<f64> {
    value.parse::<f64>().map_err(|e| CustomError::InvalidArg {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_i64(key: &'static str, value: &str) -> Result<i64> {
    value.parse::<i64>().map_err(|e| CustomError::InvalidArg {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_u32(key: &'static str, value: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|e| CustomError::InvalidArg {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_tokens(&tokens(&["gt=x.vcf", "map=x.map", "out=prefix"])).unwrap();
        assert_eq!(cfg.min_seed, 2.0);
        assert_eq!(cfg.max_gap, 1000);
        assert_eq!(cfg.min_extend, 1.0);
        assert_eq!(cfg.min_output, 2.0);
        assert_eq!(cfg.min_markers, 1);
        assert_eq!(cfg.min_mac, 2);
    }

    #[test]
    fn min_extend_derives_from_small_min_seed() {
        let cfg = Config::from_tokens(&tokens(&[
            "gt=x.vcf",
            "map=x.map",
            "out=prefix",
            "min-seed=0.5",
        ]))
        .unwrap();
        assert_eq!(cfg.min_extend, 0.5);
    }

    #[test]
    fn unknown_token_is_rejected() {
        let err = Config::from_tokens(&tokens(&[
            "gt=x.vcf",
            "map=x.map",
            "out=prefix",
            "bogus=1",
            "also-bogus=2",
        ]))
        .unwrap_err();
        match err {
            CustomError::UnknownArgs { args } => {
                assert!(args.contains("bogus=1"));
                assert!(args.contains("also-bogus=2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_range_is_rejected() {
        let err = Config::from_tokens(&tokens(&[
            "gt=x.vcf",
            "map=x.map",
            "out=prefix",
            "min-seed=0",
        ]))
        .unwrap_err();
        assert!(matches!(err, CustomError::InvalidArg { key: "min-seed", .. }));
    }

    #[test]
    fn missing_required_arg_is_rejected() {
        let err = Config::from_tokens(&tokens(&["gt=x.vcf", "map=x.map"])).unwrap_err();
        assert!(matches!(err, CustomError::MissingArg { key: "out" }));
    }
}
