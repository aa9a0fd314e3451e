//! TOML configuration file support with command-line overrides.
//!
//! Settings can come from a config file and be overridden per run by flags:
//!
//! ```toml
//! # dsf.toml
//! [jump]
//! k = 8.0
//! iterative = true
//!
//! [smoothing]
//! enabled = true
//! strength = 40
//!
//! [tm]
//! outlier_threshold = 5.0
//! expected_window = { lo = 45.0, hi = 60.0 }
//! ```
//!
//! Numeric flags go through the same lenient parsers as interactive input, so
//! a malformed value falls back to its documented default instead of failing.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use dsf_harmonizer::config::{
    parse_outlier_threshold, parse_strength, parse_threshold, parse_tm_reference, parse_tm_window,
    AnalysisConfig,
};

use super::AnalysisArgs;

/// Load the config file (if any) and apply flag overrides, then validate.
pub fn resolve(path: Option<&Path>, args: &AnalysisArgs) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    apply_overrides(&mut config, args);
    config.validate().context("Invalid analysis settings")?;
    debug!("Analysis settings: {:?}", config);
    Ok(config)
}

fn apply_overrides(config: &mut AnalysisConfig, args: &AnalysisArgs) {
    if let Some(text) = &args.abs_threshold {
        config.jump.abs_threshold = parse_threshold(text);
    }
    if let Some(text) = &args.k {
        config.jump.k = parse_threshold(text);
    }
    if let Some(method) = args.method {
        config.jump.method = method;
    }
    if args.iterative {
        config.jump.iterative = true;
    }
    if args.single_jump {
        config.jump.multi_jump = false;
    }
    if let Some(n) = args.max_iterations {
        config.jump.max_iterations = n;
    }
    if let Some(direction) = args.direction {
        config.jump.direction = direction;
    }

    if args.smooth {
        config.smoothing.enabled = true;
    }
    if let Some(text) = &args.strength {
        config.smoothing.strength = parse_strength(text);
    }

    if let Some(text) = &args.outlier_threshold {
        config.tm.outlier_threshold = parse_outlier_threshold(text);
    }
    if let Some(text) = &args.reference {
        config.tm.reference = parse_tm_reference(text);
    }
    if let Some(bounds) = &args.tm_window {
        if let [lo, hi] = bounds.as_slice() {
            config.tm.expected_window = parse_tm_window(lo, hi);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsf_harmonizer::correction::JumpDirection;
    use dsf_harmonizer::stats::DispersionMethod;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(None, &AnalysisArgs::default()).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[jump]\nk = 8.0\niterative = true\n\n[smoothing]\nstrength = 40").unwrap();

        let args = AnalysisArgs {
            k: Some("4".to_string()),
            method: Some(DispersionMethod::Std),
            direction: Some(JumpDirection::Add),
            smooth: true,
            outlier_threshold: Some("oops".to_string()),
            tm_window: Some(vec!["45".to_string(), "55".to_string()]),
            ..AnalysisArgs::default()
        };
        let config = resolve(Some(file.path()), &args).unwrap();

        assert_eq!(config.jump.k, 4.0);
        assert!(config.jump.iterative);
        assert_eq!(config.jump.method, DispersionMethod::Std);
        assert_eq!(config.jump.direction, JumpDirection::Add);
        assert!(config.smoothing.enabled);
        assert_eq!(config.smoothing.strength, 40);
        assert_eq!(config.tm.outlier_threshold, 20.0);
        let window = config.tm.expected_window.unwrap();
        assert_eq!((window.lo, window.hi), (45.0, 55.0));
    }

    #[test]
    fn test_invalid_window_is_dropped() {
        let args = AnalysisArgs {
            tm_window: Some(vec!["60".to_string(), "50".to_string()]),
            ..AnalysisArgs::default()
        };
        let config = resolve(None, &args).unwrap();
        assert!(config.tm.expected_window.is_none());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let args = AnalysisArgs {
            max_iterations: Some(0),
            ..AnalysisArgs::default()
        };
        assert!(resolve(None, &args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = resolve(Some(Path::new("/nonexistent/dsf.toml")), &AnalysisArgs::default())
            .unwrap_err();
        assert!(err.to_string().contains("Failed to load config file"));
    }
}
