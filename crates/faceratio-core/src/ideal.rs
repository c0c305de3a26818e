//! Reference ranges and the pass / warn / info classification of metrics.

use crate::metrics::FacialMetrics;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdealTableError {
    #[error("unknown metric `{0}` in ideal-range table")]
    UnknownMetric(String),
    #[error("metric `{key}` has a negative or non-finite tolerance ({tolerance})")]
    InvalidTolerance { key: String, tolerance: f64 },
    #[error("metric `{0}` appears more than once in ideal-range table")]
    Duplicate(String),
}

/// Reference value for one metric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdealRange {
    /// Name of a [`FacialMetrics`] field.
    pub key: String,
    pub ideal: f64,
    /// `None` marks an informational metric with no pass/fail band.
    #[serde(default)]
    pub tolerance: Option<f64>,
    pub description: String,
}

impl IdealRange {
    pub fn new(key: &str, ideal: f64, tolerance: Option<f64>, description: &str) -> Self {
        Self {
            key: key.to_string(),
            ideal,
            tolerance,
            description: description.to_string(),
        }
    }
}

/// Ordered, validated set of reference ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealTable {
    entries: Vec<IdealRange>,
}

impl IdealTable {
    pub fn new(entries: Vec<IdealRange>) -> Result<Self, IdealTableError> {
        for (i, entry) in entries.iter().enumerate() {
            if !FacialMetrics::is_field(&entry.key) {
                return Err(IdealTableError::UnknownMetric(entry.key.clone()));
            }
            if let Some(tolerance) = entry.tolerance {
                if !tolerance.is_finite() || tolerance < 0.0 {
                    return Err(IdealTableError::InvalidTolerance {
                        key: entry.key.clone(),
                        tolerance,
                    });
                }
            }
            if entries[..i].iter().any(|e| e.key == entry.key) {
                return Err(IdealTableError::Duplicate(entry.key.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[IdealRange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for IdealTable {
    /// Classical adult norms for thirds, fifths and feature indices.
    fn default() -> Self {
        Self {
            entries: vec![
                IdealRange::new("facial_index", 1.3, Some(0.1), "Facial index (h/w), ideal ≈ 1.3 (oval)"),
                IdealRange::new("third_upper_pct", 33.3, Some(3.0), "Upper third (%), ideal ≈ 33 %"),
                IdealRange::new("third_middle_pct", 33.3, Some(3.0), "Middle third (%), ideal ≈ 33 %"),
                IdealRange::new("third_lower_pct", 33.3, Some(3.0), "Lower third (%), ideal ≈ 33 %"),
                IdealRange::new("fifth_3_pct", 20.0, Some(2.0), "Central fifth (%), ideal ≈ 20 %"),
                IdealRange::new("eye_symmetry_pct", 0.0, Some(5.0), "Eye asymmetry (%), ideal < 5 %"),
                IdealRange::new("brow_symmetry_pct", 0.0, Some(5.0), "Brow asymmetry (%), ideal < 5 %"),
                IdealRange::new("nasal_index", 0.67, Some(0.1), "Nasal index (w/h), ideal ≈ 0.67"),
                IdealRange::new("upper_lower_lip_ratio", 0.5, Some(0.1), "Upper/lower lip ratio, ideal ≈ 0.5 (lower lip fuller)"),
                IdealRange::new("global_asymmetry_px", 0.0, None, "Global asymmetry (px), lower is better"),
            ],
        }
    }
}

/// Outcome of comparing one metric with its reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    WithinTolerance,
    OutsideTolerance,
    Informational,
}

impl Status {
    pub fn symbol(self) -> &'static str {
        match self {
            Status::WithinTolerance => "✓",
            Status::OutsideTolerance => "⚠",
            Status::Informational => "ℹ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub key: String,
    pub status: Status,
    pub measured: f64,
    pub ideal: f64,
    pub description: String,
}

/// Classify every table entry against `metrics`, in table order.
pub fn evaluate(metrics: &FacialMetrics, table: &IdealTable) -> Vec<Evaluation> {
    table
        .entries()
        .iter()
        .filter_map(|entry| {
            // Keys are validated on table construction.
            let measured = metrics.get(&entry.key)?;
            let status = match entry.tolerance {
                Some(tolerance) if (measured - entry.ideal).abs() <= tolerance + 1e-9 => {
                    Status::WithinTolerance
                }
                Some(_) => Status::OutsideTolerance,
                None => Status::Informational,
            };
            Some(Evaluation {
                key: entry.key.clone(),
                status,
                measured,
                ideal: entry.ideal,
                description: entry.description.clone(),
            })
        })
        .collect()
}
