//! Checkpoint files and run metadata
//!
//! After every completed outer iteration both matrices are rewritten in full:
//! `output<TAG>.txt` (one averaged cost row per outer iteration) and
//! `input<TAG>.txt` (the matching scenario row). Values are whitespace
//! separated in `%.18e` notation so numpy's `loadtxt` reads them back bit for
//! bit. Each file is written to a temporary sibling and renamed into place, so
//! an interrupted run leaves the last complete checkpoint behind.

use crate::config::ExperimentConfig;
use crate::error::{GridHazardError, Result};
use crate::hazard::HazardGenerator;
use nested_mc::OuterResult;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `value` as `%.18e`: 18 fractional digits and a signed exponent of at least
/// two digits
pub fn format_scientific(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let formatted = format!("{:.18e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}

/// Replace `path` with `rows`, one line per row
pub fn write_matrix(path: &Path, rows: &[Vec<f64>]) -> Result<()> {
    let mut text = String::new();
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| format_scientific(*v)).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_matrix(path: &Path) -> Result<Vec<Vec<f64>>> {
    let text = fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            line.split_whitespace()
                .map(|field| {
                    field.parse::<f64>().map_err(|e| {
                        GridHazardError::invalid(format!(
                            "{} line {}: '{}': {}",
                            path.display(),
                            i + 1,
                            field,
                            e
                        ))
                    })
                })
                .collect()
        })
        .collect()
}

/// Rewrites the input and output matrices of one experiment
#[derive(Debug, Clone)]
pub struct CheckpointWriter {
    dir: PathBuf,
    tag: String,
}

impl CheckpointWriter {
    pub fn new(dir: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        CheckpointWriter {
            dir: dir.into(),
            tag: tag.into(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(format!("output{}.txt", self.tag))
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join(format!("input{}.txt", self.tag))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join("run_metadata.json")
    }

    pub fn write(&self, completed: &[OuterResult]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let outputs: Vec<Vec<f64>> = completed.iter().map(|r| r.output_row.clone()).collect();
        let inputs: Vec<Vec<f64>> = completed.iter().map(|r| r.input_row.clone()).collect();
        write_matrix(&self.output_path(), &outputs)?;
        write_matrix(&self.input_path(), &inputs)?;
        Ok(())
    }
}

/// Metadata for reproducibility
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub config: ExperimentConfig,
    pub seed: u64,
    pub timestamp: String,
    pub hazard: HazardGenerator,
    pub output_columns: Vec<String>,
    pub input_columns: Vec<String>,
    pub completed_outer_iterations: usize,
    pub elapsed_secs: f64,
}

impl RunMetadata {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
