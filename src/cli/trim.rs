use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use dsf_harmonizer::config::AnalysisConfig;
use dsf_harmonizer::curve::AnalysisRange;
use dsf_harmonizer::gdsf::write_corrected;
use dsf_harmonizer::plate::{normalize_sample_id, Plate, TrimCandidate};

/// Trim curves, either to an explicit range or by searching for slices whose
/// Tm lies in the expected window
pub fn run(
    input: PathBuf,
    output: Option<PathBuf>,
    samples: &[String],
    range: Option<&[f64]>,
    config: &AnalysisConfig,
) -> Result<()> {
    let mut plate = super::load_plate(&input)?;

    match range {
        Some(&[min, max]) => set_ranges(&mut plate, samples, min, max)?,
        Some(_) => anyhow::bail!("--range needs exactly two values"),
        None => auto_trim(&mut plate, samples, config)?,
    }

    if let Some(output) = output {
        let rows = write_corrected(&plate, &output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Wrote {} rows to {}", rows, output.display());
    }
    Ok(())
}

fn set_ranges(plate: &mut Plate, samples: &[String], min: f64, max: f64) -> Result<()> {
    let range = AnalysisRange::new(min, max).context("Invalid analysis range")?;
    for id in samples {
        plate
            .set_analysis_range(id, range)
            .with_context(|| format!("Failed to set range on {}", id))?;
        println!("{}: analysis range [{:.2}, {:.2}] °C", normalize_sample_id(id), min, max);
    }
    Ok(())
}

fn auto_trim(plate: &mut Plate, samples: &[String], config: &AnalysisConfig) -> Result<()> {
    let Some(window) = config.tm.expected_window else {
        anyhow::bail!("Auto-trim needs an expected Tm window (--tm-window LO HI or [tm] expected_window)");
    };

    let selected: Vec<String> = samples.iter().map(|s| normalize_sample_id(s)).collect();
    let proposals: Vec<TrimCandidate> = plate
        .propose_auto_trims(&window, &config.smoothing)
        .into_iter()
        .filter(|c| selected.is_empty() || selected.contains(&c.sample_id))
        .collect();

    if proposals.is_empty() {
        println!(
            "No trim proposal for window [{:.2}, {:.2}] °C",
            window.lo, window.hi
        );
        return Ok(());
    }

    for candidate in &proposals {
        let p = &candidate.proposal;
        println!(
            "{}: Tm {:.2} -> {:.2} °C, keep [{:.2}, {:.2}] °C (-{} low, -{} high)",
            candidate.sample_id,
            p.tm_before,
            p.tm_after,
            p.new_min,
            p.new_max,
            p.removed_low,
            p.removed_high
        );
    }

    let applied = plate.apply_trim_proposals(&proposals);
    println!("Applied {} of {} proposal(s)", applied, proposals.len());
    Ok(())
}
