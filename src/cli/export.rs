use anyhow::{Context, Result};
use log::{info, warn};
use std::path::{Path, PathBuf};

use dsf_harmonizer::config::AnalysisConfig;
use dsf_harmonizer::gdsf::{write_corrected, write_corrected_smoothed, write_tm_table_file};
use dsf_harmonizer::report::PlateReport;

/// Run correction and auto-trim, then write the corrected curves, the smoothed
/// curves and the Tm table into `output_dir`
pub fn run(
    input: PathBuf,
    output_dir: PathBuf,
    deleted: &[String],
    correct: bool,
    config: &AnalysisConfig,
) -> Result<()> {
    let mut plate = super::load_plate(&input)?;

    for id in deleted {
        plate
            .delete_sample(id)
            .with_context(|| format!("Failed to delete {}", id))?;
    }

    if correct {
        let batch = plate.correct_all_suspects(&config.jump);
        info!("Corrected {} sample(s)", batch.corrected.len());
        if batch.remaining_suspects > 0 {
            warn!("{} suspect(s) remain", batch.remaining_suspects);
        }
    }

    if let Some(window) = config.tm.expected_window {
        let proposals = plate.propose_auto_trims(&window, &config.smoothing);
        plate.apply_trim_proposals(&proposals);
    }

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("plate");
    let target = |suffix: &str| -> PathBuf { output_dir.join(format!("{}{}", stem, suffix)) };

    let corrected = target("_corrected.gdsf");
    write_corrected(&plate, &corrected).with_context(|| failed(&corrected))?;

    let smoothed = target("_corrected_smoothed.gdsf");
    write_corrected_smoothed(&plate, &smoothed, config.smoothing.strength)
        .with_context(|| failed(&smoothed))?;

    let table = target("_tm.tsv");
    write_tm_table_file(&mut plate, &table, &config.smoothing).with_context(|| failed(&table))?;

    let report = PlateReport::build(&mut plate, config, input.display().to_string());
    super::print_report(&report, false)?;
    println!("Exports written to {}", output_dir.display());
    Ok(())
}

fn failed(path: &Path) -> String {
    format!("Failed to write {}", path.display())
}
