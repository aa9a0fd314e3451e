use super::*;
use crate::config::TmConfig;
use crate::steps::find_step_indices;

fn sigmoid(temperatures: &[f64], center: f64) -> Vec<f64> {
    temperatures
        .iter()
        .map(|t| 100.0 + 4900.0 / (1.0 + (-(t - center) / 2.0).exp()))
        .collect()
}

/// 50 points from 25 to 74 °C.
fn wide_curve(center: f64) -> Curve {
    let x: Vec<f64> = (0..50).map(|i| 25.0 + i as f64).collect();
    let y = sigmoid(&x, center);
    Curve::new(x, y).unwrap()
}

/// 50 points from 40 to 60 °C.
fn scan_grid() -> Vec<f64> {
    (0..50).map(|i| 40.0 + 20.0 * i as f64 / 49.0).collect()
}

/// Sigmoid on the scan grid with +800 added from 52 °C on.
fn jumpy_curve() -> Curve {
    let x = scan_grid();
    let y = sigmoid(&x, 50.0)
        .into_iter()
        .zip(&x)
        .map(|(v, &t)| if t >= 52.0 { v + 800.0 } else { v })
        .collect();
    Curve::new(x, y).unwrap()
}

fn clean_curve() -> Curve {
    let x = scan_grid();
    let y = sigmoid(&x, 50.0);
    Curve::new(x, y).unwrap()
}

fn plate(curves: Vec<(&str, Curve)>) -> Plate {
    Plate::from_curves(curves.into_iter().map(|(id, c)| (id.to_string(), c)))
}

#[test]
fn test_well_sort_key() {
    assert_eq!(well_sort_key("A1"), ('A', 1));
    assert_eq!(well_sort_key(" b12 "), ('B', 12));
    assert_eq!(well_sort_key("C"), ('C', 999));
    assert_eq!(well_sort_key(""), ('Z', 999));
    assert!(well_sort_key("A2") < well_sort_key("A10"));
}

#[test]
fn test_from_curves_orders_and_filters() {
    let zero = Curve::from_points((0..5).map(|i| (i as f64, 0.0)));
    let plate = plate(vec![
        ("a10", wide_curve(50.0)),
        ("A2", wide_curve(50.0)),
        (" b1 ", wide_curve(50.0)),
        ("A1", wide_curve(50.0)),
        ("A3", zero),
    ]);
    let ids: Vec<&str> = plate.samples().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["A1", "A2", "A10", "B1"]);
    assert!(plate.sample("a10").is_some());
    assert!(plate.sample("A3").is_none());
}

#[test]
fn test_tm_is_cached_per_version() {
    let mut plate = plate(vec![("A1", wide_curve(50.0))]);
    let smoothing = SmoothingConfig::default();
    assert_eq!(plate.tm("A1", &smoothing).unwrap(), Some(50.0));
    assert_eq!(plate.cache.len(), 1);
    assert_eq!(plate.tm("A1", &smoothing).unwrap(), Some(50.0));
    assert_eq!(plate.cache.len(), 1);

    // A different effective strength drops the old entries
    let strong = SmoothingConfig {
        enabled: true,
        strength: 60,
    };
    plate.tm("A1", &strong).unwrap();
    assert_eq!(plate.cache.len(), 1);
    assert!(matches!(plate.tm("Z9", &smoothing), Err(PlateError::UnknownSample(_))));
}

#[test]
fn test_multi_jump_scenario() {
    let reference_tm = {
        let clean = clean_curve();
        estimate_tm(clean.temperatures(), clean.fluorescence(), 25).tm.unwrap()
    };
    let mut plate = plate(vec![("A1", jumpy_curve())]);
    let jump = JumpConfig::default();
    let smoothing = SmoothingConfig::default();

    assert_eq!(plate.scan_suspects(&jump), 1);
    let transition = plate.correct_multi_jump("A1", &jump).unwrap().unwrap();
    assert_eq!(transition.from, jumpy_curve().fluorescence());

    let sample = plate.sample("A1").unwrap();
    assert!(find_step_indices(sample.working().fluorescence(), &jump.thresholds()).is_empty());
    assert_eq!(transition.to, sample.working().fluorescence());
    assert!(sample.is_corrected());
    assert!(sample.suspect().is_none());
    assert_eq!(sample.version(), 1);

    let tm = plate.tm("A1", &smoothing).unwrap().unwrap();
    assert!((tm - reference_tm).abs() <= 0.5, "{} vs {}", tm, reference_tm);
    assert_eq!(plate.corrected_ids(), vec!["A1"]);
}

#[test]
fn test_correction_without_jumps_records_nothing() {
    let mut plate = plate(vec![("A1", clean_curve())]);
    assert!(plate.correct_multi_jump("A1", &JumpConfig::default()).unwrap().is_none());
    assert!(!plate.can_undo("A1"));
    assert!(plate.corrected_ids().is_empty());
}

#[test]
fn test_single_jump_and_undo_redo() {
    let mut plate = plate(vec![("A1", jumpy_curve())]);
    let original = jumpy_curve();

    let transition = plate.correct_single_jump("A1", 29, JumpDirection::Auto).unwrap();
    assert!(transition.is_some());
    let corrected = plate.sample("A1").unwrap().working().clone();
    assert!((corrected.fluorescence()[30] - corrected.fluorescence()[29]).abs() < 1e-9);
    assert_eq!(&corrected.fluorescence()[..30], &original.fluorescence()[..30]);

    let back = plate.undo("A1").unwrap().unwrap();
    assert_eq!(back.to, original.fluorescence());
    let sample = plate.sample("A1").unwrap();
    assert!(sample.working().bit_identical(&original));
    assert!(!sample.is_corrected());
    assert!(plate.can_redo("A1"));

    plate.redo("A1").unwrap();
    let sample = plate.sample("A1").unwrap();
    assert!(sample.working().bit_identical(&corrected));
    assert!(sample.is_corrected());

    // Empty stacks are no-ops
    assert!(plate.redo("A1").unwrap().is_none());
    plate.undo("A1").unwrap();
    assert!(plate.undo("A1").unwrap().is_none());
}

#[test]
fn test_single_jump_out_of_range() {
    let mut plate = plate(vec![("A1", jumpy_curve())]);
    assert!(matches!(
        plate.correct_single_jump("A1", 49, JumpDirection::Add),
        Err(PlateError::IndexOutOfRange { index: 49, len: 50, .. })
    ));
}

#[test]
fn test_single_jump_index_at_usize_max() {
    let mut plate = plate(vec![("A1", jumpy_curve())]);
    let before = plate.sample("A1").unwrap().working().fluorescence().to_vec();
    assert!(matches!(
        plate.correct_single_jump("A1", usize::MAX, JumpDirection::Auto),
        Err(PlateError::IndexOutOfRange { index: usize::MAX, len: 50, .. })
    ));
    assert!(!plate.can_undo("A1"));
    assert_eq!(plate.sample("A1").unwrap().working().fluorescence(), before.as_slice());
}

#[test]
fn test_correction_transition_interpolates() {
    let mut plate = plate(vec![("A1", jumpy_curve())]);
    let transition = plate
        .correct_single_jump("A1", 29, JumpDirection::Subtract)
        .unwrap()
        .unwrap();
    assert_eq!(transition.temperatures, scan_grid());
    assert_eq!(transition.frame(0.0), jumpy_curve().fluorescence());
    assert_eq!(
        transition.frame(1.0),
        plate.sample("A1").unwrap().working().fluorescence()
    );
    let midway = transition.frame(0.5);
    assert_eq!(midway[..30], transition.from[..30]);
    assert!(midway[30..]
        .iter()
        .zip(&transition.from[30..])
        .all(|(m, f)| m < f));
}

#[test]
fn test_correct_all_suspects_multi_jump() {
    let mut plate = plate(vec![("A1", clean_curve()), ("A2", jumpy_curve())]);
    let jump = JumpConfig::default();
    let batch = plate.correct_all_suspects(&jump);
    assert_eq!(batch.corrected, vec!["A2".to_string()]);
    assert_eq!(batch.remaining_suspects, 0);
    assert!(plate.suspects().is_empty());
    // Corrected samples are not rescanned
    assert_eq!(plate.scan_suspects(&jump), 0);
}

#[test]
fn test_correct_all_suspects_single_jump_maps_visible_index() {
    let mut plate = plate(vec![("A1", jumpy_curve())]);
    plate
        .set_analysis_range("A1", AnalysisRange::new(41.0, 59.0).unwrap())
        .unwrap();
    let jump = JumpConfig {
        multi_jump: false,
        ..JumpConfig::default()
    };
    let batch = plate.correct_all_suspects(&jump);
    assert_eq!(batch.corrected, vec!["A1".to_string()]);
    assert_eq!(batch.remaining_suspects, 0);

    let working = plate.sample("A1").unwrap().working().fluorescence().to_vec();
    assert!((working[30] - working[29]).abs() < 1e-9);
    // Range, then one correction pass
    assert_eq!(plate.sample("A1").unwrap().history().undo_depth(), 2);
}

#[test]
fn test_nothing_to_correct() {
    let mut plate = plate(vec![("A1", clean_curve())]);
    assert_eq!(plate.correct_all_suspects(&JumpConfig::default()), BatchCorrection::default());
}

#[test]
fn test_analysis_range() {
    let mut plate = plate(vec![("A1", wide_curve(50.0))]);
    plate
        .set_analysis_range("A1", AnalysisRange::new(10.0, 60.0).unwrap())
        .unwrap();
    let sample = plate.sample("A1").unwrap();
    assert_eq!(sample.range(), Some(AnalysisRange { min: 25.0, max: 60.0 }));
    assert_eq!(sample.visible_curve().len(), 36);
    assert!(!sample.is_auto_trimmed());

    // Too narrow: rejected, state unchanged
    let err = plate
        .set_analysis_range("A1", AnalysisRange::new(30.0, 31.5).unwrap())
        .unwrap_err();
    assert!(matches!(err, PlateError::TooFewPoints { count: 2, .. }));
    assert_eq!(plate.sample("A1").unwrap().history().undo_depth(), 1);

    // Entirely outside the data
    assert!(matches!(
        plate.set_analysis_range("A1", AnalysisRange::new(80.0, 90.0).unwrap()),
        Err(PlateError::InvalidRange { .. })
    ));

    assert!(plate.clear_analysis_range("A1").unwrap());
    assert!(!plate.clear_analysis_range("A1").unwrap());
    assert_eq!(plate.sample("A1").unwrap().range(), None);
}

#[test]
fn test_auto_trim_proposal_and_apply() {
    let mut plate = plate(vec![("A1", wide_curve(50.0)), ("A2", wide_curve(60.0))]);
    let smoothing = SmoothingConfig::default();
    let window = TmWindow::new(55.0, 65.0).unwrap();

    let candidates = plate.propose_auto_trims(&window, &smoothing);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].sample_id, "A1");
    assert_eq!(candidates[0].proposal.removed_high, 0);
    // Proposals have no side effect
    assert!(!plate.can_undo("A1"));

    assert_eq!(plate.apply_trim_proposals(&candidates), 1);
    let sample = plate.sample("A1").unwrap();
    assert!(sample.is_auto_trimmed());
    assert!(sample.is_corrected());
    assert_eq!(sample.working().len(), 50);
    let tm = plate.tm("A1", &smoothing).unwrap().unwrap();
    assert!(window.contains(tm));
    assert!(plate.label("A1", &smoothing).unwrap().ends_with(TRIM_MARKER));

    plate.undo("A1").unwrap();
    let sample = plate.sample("A1").unwrap();
    assert_eq!(sample.range(), None);
    assert!(!sample.is_auto_trimmed());
    assert!(!sample.is_corrected());
    assert_eq!(plate.tm("A1", &smoothing).unwrap(), Some(50.0));
}

#[test]
fn test_tm_summary_outliers() {
    let mut plate = plate(vec![
        ("A1", wide_curve(50.0)),
        ("A2", wide_curve(50.0)),
        ("A3", wide_curve(70.0)),
    ]);
    let mut config = AnalysisConfig::default();

    let summary = plate.tm_summary(&config);
    assert_eq!(summary.valid_count, 3);
    let mean = summary.mean.unwrap();
    assert!((mean - 170.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.reference_source, ReferenceSource::Mean);
    assert!(summary.outliers.is_empty());

    config.tm = TmConfig {
        outlier_threshold: 10.0,
        ..TmConfig::default()
    };
    let summary = plate.tm_summary(&config);
    assert_eq!(summary.outliers.len(), 1);
    assert!(summary.is_outlier("A3"));

    config.tm.reference = Some(50.0);
    config.tm.outlier_threshold = 20.0;
    let summary = plate.tm_summary(&config);
    assert_eq!(summary.reference, 50.0);
    assert_eq!(summary.reference_source, ReferenceSource::Fixed);
    // Deviation equal to the threshold counts as an outlier
    assert_eq!(summary.outliers[0].deviation, 20.0);
    assert!(summary.is_outlier("A3"));
}

#[test]
fn test_delete_and_recover() {
    let mut plate = plate(vec![("A1", wide_curve(50.0)), ("A2", wide_curve(52.0))]);
    let config = AnalysisConfig::default();

    assert!(plate.delete_sample("A1").unwrap());
    assert!(!plate.delete_sample("A1").unwrap());
    assert_eq!(plate.deleted_ids(), vec!["A1"]);
    assert_eq!(plate.visible_curves().count(), 1);
    assert_eq!(plate.tm_summary(&config).entries.len(), 1);
    assert_eq!(plate.label("A1", &config.smoothing).unwrap(), "A1 [DELETED]");
    assert!(matches!(
        plate.correct_multi_jump("A1", &config.jump),
        Err(PlateError::DeletedSample(_))
    ));

    assert!(plate.recover_sample("A1").unwrap());
    assert_eq!(plate.label("A1", &config.smoothing).unwrap(), "A1 — Tm=50.00 °C");
    // Working curve was kept while deleted
    assert!(!plate.sample("A1").unwrap().is_modified());
}

#[test]
fn test_tm_table() {
    let mut plate = plate(vec![("A1", wide_curve(50.0))]);
    let rows = plate.tm_table(&SmoothingConfig::default());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tm_corrected, Some(50.0));
    assert_eq!(rows[0].smooth_strength, 35);
    assert!(rows[0].tm_smoothed.is_some());
}
