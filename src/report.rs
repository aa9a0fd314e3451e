//! # Plate Report
//!
//! Human-readable overview of a plate: one line per sample with its label and
//! review status, followed by the plate-wide Tm statistics.

use std::fmt;

use serde::Serialize;

#[cfg(feature = "colorized_output")]
use console::style;

use crate::config::AnalysisConfig;
use crate::plate::{Plate, ReferenceSource, TmSummary};
use crate::steps::SuspectJump;

/// Review status of one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SampleStatus {
    /// Nothing to review
    Ok,
    /// Flagged by the suspect scan
    Suspect(SuspectJump),
    /// Tm deviates from the reference by at least the threshold
    Outlier {
        /// Absolute deviation from the reference
        deviation: f64,
    },
    /// Tm could not be estimated
    Undefined,
    /// Logically deleted
    Deleted,
}

impl SampleStatus {
    fn needs_review(&self) -> bool {
        !matches!(self, SampleStatus::Ok | SampleStatus::Deleted)
    }
}

/// One sample line of the report
#[derive(Debug, Clone, Serialize)]
pub struct SampleLine {
    /// Sample identifier
    pub sample_id: String,
    /// Display label
    pub label: String,
    /// Tm of the visible curve
    pub tm: Option<f64>,
    /// Whether the sample is in the corrected set
    pub corrected: bool,
    /// Review status
    pub status: SampleStatus,
}

/// Complete report for a plate
#[derive(Debug, Clone, Serialize)]
pub struct PlateReport {
    /// Where the plate was loaded from
    pub source: String,
    /// Sample lines in plate order, deleted samples included
    pub samples: Vec<SampleLine>,
    /// Tm statistics over the non-deleted samples
    pub summary: TmSummary,
}

impl PlateReport {
    /// Build a report from the current plate state. Suspects are taken from the
    /// last scan; call [`Plate::scan_suspects`] first for fresh results.
    pub fn build(plate: &mut Plate, config: &AnalysisConfig, source: impl Into<String>) -> Self {
        let summary = plate.tm_summary(config);
        let ids: Vec<String> = plate.samples().map(|s| s.id().to_string()).collect();

        let mut samples = Vec::with_capacity(ids.len());
        for id in ids {
            let label = plate
                .label(&id, &config.smoothing)
                .unwrap_or_else(|_| id.clone());
            let Some(sample) = plate.sample(&id) else {
                continue;
            };
            let tm = summary
                .entries
                .iter()
                .find(|e| e.sample_id == id)
                .and_then(|e| e.tm);
            let outlier = summary.outliers.iter().find(|o| o.sample_id == id);

            let status = if sample.is_deleted() {
                SampleStatus::Deleted
            } else if let Some(jump) = sample.suspect() {
                SampleStatus::Suspect(jump)
            } else if let Some(outlier) = outlier {
                SampleStatus::Outlier {
                    deviation: outlier.deviation,
                }
            } else if tm.is_none() {
                SampleStatus::Undefined
            } else {
                SampleStatus::Ok
            };

            samples.push(SampleLine {
                corrected: sample.is_corrected(),
                sample_id: id,
                label,
                tm,
                status,
            });
        }

        Self {
            source: source.into(),
            samples,
            summary,
        }
    }

    /// Count samples that need review
    pub fn review_count(&self) -> usize {
        self.samples.iter().filter(|s| s.status.needs_review()).count()
    }

    /// Count suspect samples
    pub fn suspect_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| matches!(s.status, SampleStatus::Suspect(_)))
            .count()
    }

    /// Count corrected samples, deleted ones excluded
    pub fn corrected_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.corrected && s.status != SampleStatus::Deleted)
            .count()
    }

    /// Count deleted samples
    pub fn deleted_count(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.status == SampleStatus::Deleted)
            .count()
    }

    fn status_text(status: &SampleStatus) -> String {
        match status {
            SampleStatus::Ok => String::new(),
            SampleStatus::Suspect(jump) => format!(
                "suspect jump at index {} (Δ={:.1}, dispersion={:.1})",
                jump.index, jump.delta, jump.dispersion
            ),
            SampleStatus::Outlier { deviation } => format!("outlier (|ΔTm|={:.2} °C)", deviation),
            SampleStatus::Undefined => "Tm undefined".to_string(),
            SampleStatus::Deleted => "deleted".to_string(),
        }
    }

    fn reference_text(&self) -> String {
        format!(
            "{:.2} °C ({}), outlier threshold {:.2} °C",
            self.summary.reference,
            match self.summary.reference_source {
                ReferenceSource::Fixed => "fixed",
                ReferenceSource::Mean => "mean",
            },
            self.summary.threshold
        )
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");
            static GONE: Emoji<'_, '_> = Emoji("✗", "[DEL]");

            let mut output = String::new();

            output.push_str(&format!("{}\n", style("DSF Plate Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("================").cyan()));
            output.push_str(&format!("{}: {}\n\n", style("Source").bold(), self.source));

            for line in &self.samples {
                match &line.status {
                    SampleStatus::Ok => {
                        output.push_str(&format!("[{}] {}\n", OK, style(&line.label).green()));
                    }
                    SampleStatus::Deleted => {
                        output.push_str(&format!("[{}] {}\n", GONE, style(&line.label).dim()));
                    }
                    status => {
                        output.push_str(&format!(
                            "[{}] {} - {}\n",
                            WARN,
                            style(&line.label).yellow(),
                            style(Self::status_text(status)).yellow().bold()
                        ));
                    }
                }
            }

            output.push('\n');
            if let Some(mean) = self.summary.mean {
                output.push_str(&format!(
                    "{}: {:.2} °C over {} sample(s)\n",
                    style("Mean Tm").bold(),
                    mean,
                    self.summary.valid_count
                ));
            }
            output.push_str(&format!("{}: {}\n", style("Reference").bold(), self.reference_text()));
            output.push_str(&format!(
                "{}: {} to review, {} corrected, {} deleted\n",
                style("Summary").bold(),
                style(self.review_count()).yellow(),
                style(self.corrected_count()).green(),
                style(self.deleted_count()).red()
            ));

            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for PlateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DSF Plate Report")?;
        writeln!(f, "================")?;
        writeln!(f, "Source: {}", self.source)?;
        writeln!(f)?;

        for line in &self.samples {
            let symbol = match &line.status {
                SampleStatus::Ok => "✓",
                SampleStatus::Deleted => "✗",
                _ => "⚠",
            };
            write!(f, "[{}] {}", symbol, line.label)?;
            if line.status.needs_review() {
                writeln!(f, " - {}", Self::status_text(&line.status))?;
            } else {
                writeln!(f)?;
            }
        }

        writeln!(f)?;
        if let Some(mean) = self.summary.mean {
            writeln!(f, "Mean Tm: {:.2} °C over {} sample(s)", mean, self.summary.valid_count)?;
        }
        writeln!(f, "Reference: {}", self.reference_text())?;
        writeln!(
            f,
            "Summary: {} to review, {} corrected, {} deleted",
            self.review_count(),
            self.corrected_count(),
            self.deleted_count()
        )
    }
}
