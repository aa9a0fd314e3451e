use anyhow::{Context, Result};
use std::path::PathBuf;

use dsf_harmonizer::config::AnalysisConfig;
use dsf_harmonizer::gdsf::write_tm_table_file;
use dsf_harmonizer::plate::TmSummary;

/// Print Tm statistics and optionally write the Tm table
pub fn run(
    input: PathBuf,
    output: Option<PathBuf>,
    json: bool,
    config: &AnalysisConfig,
) -> Result<()> {
    let mut plate = super::load_plate(&input)?;
    let summary = plate.tm_summary(config);

    if json {
        let text = serde_json::to_string_pretty(&summary).context("Failed to serialize Tm summary")?;
        println!("{}", text);
    } else {
        print_summary(&summary);
    }

    if let Some(output) = output {
        write_tm_table_file(&mut plate, &output, &config.smoothing)
            .with_context(|| format!("Failed to write Tm table: {}", output.display()))?;
    }
    Ok(())
}

fn print_summary(summary: &TmSummary) {
    for entry in &summary.entries {
        match entry.tm {
            Some(tm) if summary.is_outlier(&entry.sample_id) => {
                println!("{:<6} {:>8.2} °C  outlier", entry.sample_id, tm)
            }
            Some(tm) => println!("{:<6} {:>8.2} °C", entry.sample_id, tm),
            None => println!("{:<6} {:>8}", entry.sample_id, "n/a"),
        }
    }
    println!();
    match summary.mean {
        Some(mean) => println!("Mean Tm: {:.2} °C (n={})", mean, summary.valid_count),
        None => println!("Mean Tm: n/a"),
    }
    println!(
        "Outliers (|Tm - {:.2}| >= {:.2} °C): {}",
        summary.reference,
        summary.threshold,
        summary.outliers.len()
    );
}
