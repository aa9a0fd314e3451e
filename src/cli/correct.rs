use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;

use dsf_harmonizer::config::AnalysisConfig;
use dsf_harmonizer::gdsf::write_corrected;
use dsf_harmonizer::plate::{normalize_sample_id, Plate};

/// Correct jumps and write the corrected curves
pub fn run(
    input: PathBuf,
    output: PathBuf,
    samples: &[String],
    index: Option<usize>,
    config: &AnalysisConfig,
) -> Result<()> {
    let mut plate = super::load_plate(&input)?;

    let corrected = if samples.is_empty() {
        let batch = plate.correct_all_suspects(&config.jump);
        if batch.remaining_suspects > 0 {
            warn!(
                "{} sample(s) still look suspect after correction",
                batch.remaining_suspects
            );
        }
        batch.corrected
    } else {
        correct_selected(&mut plate, samples, index, config)?
    };

    if corrected.is_empty() {
        println!("No sample needed correction");
    } else {
        println!("Corrected {} sample(s): {}", corrected.len(), corrected.join(", "));
    }

    let rows = write_corrected(&plate, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {} rows to {}", rows, output.display());
    Ok(())
}

fn correct_selected(
    plate: &mut Plate,
    samples: &[String],
    index: Option<usize>,
    config: &AnalysisConfig,
) -> Result<Vec<String>> {
    if index.is_none() && !config.jump.multi_jump {
        plate.scan_suspects(&config.jump);
    }

    let mut corrected = Vec::new();
    for id in samples {
        let transition = match index {
            Some(index) => plate.correct_single_jump(id, index, config.jump.direction),
            None if config.jump.multi_jump => plate.correct_multi_jump(id, &config.jump),
            None => {
                let suspect = plate
                    .sample(id)
                    .with_context(|| format!("Unknown sample: {}", id))?
                    .suspect();
                match suspect {
                    Some(jump) => plate.correct_sample(id, jump.index, &config.jump),
                    None => Ok(None),
                }
            }
        }
        .with_context(|| format!("Failed to correct {}", id))?;

        if transition.is_some() {
            corrected.push(normalize_sample_id(id));
        } else {
            info!("{}: unchanged", id);
        }
    }
    Ok(corrected)
}
