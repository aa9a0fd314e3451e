//! # GDSF Import and Export
//!
//! The `.gdsf` format is a headerless, tab-separated table with three columns:
//!
//! ```text
//! A1	25.0	1021.5
//! A1	25.5	1019.8
//! ...
//! ```
//!
//! 1. Sample (well) identifier
//! 2. Temperature in °C
//! 3. Fluorescence
//!
//! Import is lenient: identifiers are trimmed and upper-cased, rows whose
//! temperature or fluorescence is missing or not a number are dropped, and
//! samples without any non-zero fluorescence are not loaded.
//!
//! Curve exports use the same layout with values written like C's `%.10g`. The
//! Tm table export has a header row and is tab-separated for `.tsv` paths,
//! comma-separated otherwise, with values written like `%.6g`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};

use crate::curve::Curve;
use crate::plate::{normalize_sample_id, Plate, TmTableRow};
use crate::smoothing::smooth_signal;

/// Significant digits for curve exports.
pub const CURVE_PRECISION: usize = 10;

/// Significant digits for the Tm table.
pub const TM_TABLE_PRECISION: usize = 6;

/// Header of the Tm table export.
pub const TM_TABLE_HEADER: [&str; 4] = ["Well", "Tm_corrected", "Tm_smoothed", "Smooth_strength"];

/// Errors that can occur while reading or writing GDSF files
#[derive(Debug, thiserror::Error)]
pub enum GdsfError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited data
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn parse_number(field: Option<&str>) -> Option<f64> {
    field?.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Read `(id, curve)` pairs from GDSF data, in first-appearance order.
pub fn read_curves<R: Read>(reader: R) -> Result<Vec<(String, Curve)>, GdsfError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut order: Vec<String> = Vec::new();
    let mut points: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    let mut dropped = 0usize;

    for record in csv_reader.records() {
        let record = record?;
        let (Some(temperature), Some(fluorescence)) =
            (parse_number(record.get(1)), parse_number(record.get(2)))
        else {
            dropped += 1;
            continue;
        };
        let id = normalize_sample_id(record.get(0).unwrap_or_default());
        points
            .entry(id.clone())
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push((temperature, fluorescence));
    }

    if dropped > 0 {
        debug!("Dropped {} row(s) without numeric temperature and fluorescence", dropped);
    }

    Ok(order
        .into_iter()
        .filter_map(|id| {
            let curve = Curve::from_points(points.remove(&id)?);
            Some((id, curve))
        })
        .collect())
}

/// Load a GDSF file into a [`Plate`].
pub fn read_gdsf<P: AsRef<Path>>(path: P) -> Result<Plate, GdsfError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let curves = read_curves(BufReader::new(file))?;
    info!("Read {} sample(s) from {}", curves.len(), path.display());
    Ok(Plate::from_curves(curves))
}

/// Write the visible curve of every non-deleted sample. With
/// `smoothing_strength`, fluorescence is smoothed before writing. Returns the
/// number of rows written.
pub fn write_curves<W: Write>(
    plate: &Plate,
    writer: W,
    smoothing_strength: Option<u8>,
) -> Result<usize, GdsfError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    let mut rows = 0;
    for (id, curve) in plate.visible_curves() {
        let fluorescence = match smoothing_strength {
            Some(strength) => smooth_signal(curve.fluorescence(), strength),
            None => curve.fluorescence().to_vec(),
        };
        for (t, f) in curve.temperatures().iter().zip(&fluorescence) {
            let temperature = format_general(*t, CURVE_PRECISION);
            let fluorescence = format_general(*f, CURVE_PRECISION);
            csv_writer.write_record([id, temperature.as_str(), fluorescence.as_str()])?;
            rows += 1;
        }
    }
    csv_writer.flush()?;
    Ok(rows)
}

/// Export corrected curves to `path`.
pub fn write_corrected<P: AsRef<Path>>(plate: &Plate, path: P) -> Result<usize, GdsfError> {
    let path = path.as_ref();
    let rows = write_curves(plate, BufWriter::new(File::create(path)?), None)?;
    info!("Saved corrected curves ({} rows) to {}", rows, path.display());
    Ok(rows)
}

/// Export corrected curves smoothed with `strength` to `path`.
pub fn write_corrected_smoothed<P: AsRef<Path>>(
    plate: &Plate,
    path: P,
    strength: u8,
) -> Result<usize, GdsfError> {
    let path = path.as_ref();
    let rows = write_curves(plate, BufWriter::new(File::create(path)?), Some(strength))?;
    info!(
        "Saved corrected+smoothed curves ({} rows, strength={}) to {}",
        rows,
        strength,
        path.display()
    );
    Ok(rows)
}

/// Field delimiter for a Tm table path: tab for `.tsv`, comma otherwise.
pub fn tm_table_delimiter(path: &Path) -> u8 {
    let is_tsv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
    if is_tsv {
        b'\t'
    } else {
        b','
    }
}

/// Write Tm table rows with a header. Undefined Tms are written as empty fields.
pub fn write_tm_table<W: Write>(
    rows: &[TmTableRow],
    writer: W,
    delimiter: u8,
) -> Result<(), GdsfError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);

    let optional = |v: Option<f64>| {
        v.map(|v| format_general(v, TM_TABLE_PRECISION))
            .unwrap_or_default()
    };

    csv_writer.write_record(TM_TABLE_HEADER)?;
    for row in rows {
        csv_writer.write_record([
            row.sample_id.clone(),
            optional(row.tm_corrected),
            optional(row.tm_smoothed),
            row.smooth_strength.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Compute and export the Tm table of `plate` to `path`.
pub fn write_tm_table_file<P: AsRef<Path>>(
    plate: &mut Plate,
    path: P,
    smoothing: &crate::config::SmoothingConfig,
) -> Result<usize, GdsfError> {
    let path = path.as_ref();
    let rows = plate.tm_table(smoothing);
    write_tm_table(&rows, BufWriter::new(File::create(path)?), tm_table_delimiter(path))?;
    info!("Saved Tm table ({} samples) to {}", rows.len(), path.display());
    Ok(rows.len())
}

/// Format like C's `%.{precision}g`: `precision` significant digits, trailing
/// zeros removed, scientific notation for very large or small magnitudes.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_general() {
        assert_eq!(format_general(25.0, 10), "25");
        assert_eq!(format_general(52.244897959183675, 10), "52.24489796");
        assert_eq!(format_general(-1234.5678, 10), "-1234.5678");
        assert_eq!(format_general(0.5, 6), "0.5");
        assert_eq!(format_general(0.0001, 6), "0.0001");
        assert_eq!(format_general(0.00001, 6), "1e-05");
        assert_eq!(format_general(12345678.0, 6), "1.23457e+07");
        assert_eq!(format_general(50.204081632653065, 6), "50.2041");
        assert_eq!(format_general(0.0, 6), "0");
        assert_eq!(format_general(f64::NAN, 6), "nan");
    }

    #[test]
    fn test_read_curves() {
        let data = "a1\t26\t12\n\
                    A1\t25\t10\n\
                    B2 \tabc\t5\n\
                    B2\t25\t0\n\
                    B2\t26\t0\n\
                    A1\t27\t\n\
                    A1\t27\t14\n";
        let curves = read_curves(data.as_bytes()).unwrap();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].0, "A1");
        assert_eq!(curves[0].1.temperatures(), &[25.0, 26.0, 27.0]);
        assert_eq!(curves[0].1.fluorescence(), &[10.0, 12.0, 14.0]);
        assert_eq!(curves[1].0, "B2");
        assert_eq!(curves[1].1.len(), 2);

        // B2 has no signal and is not loaded
        let plate = Plate::from_curves(curves);
        assert_eq!(plate.len(), 1);
    }

    #[test]
    fn test_write_curves() {
        let curves = vec![
            ("A2".to_string(), Curve::from_points([(25.0, 1.5), (26.0, 2.0), (27.0, 3.25)])),
            ("A1".to_string(), Curve::from_points([(25.0, 7.0), (26.0, 8.0), (27.0, 9.0)])),
        ];
        let mut plate = Plate::from_curves(curves);
        plate.delete_sample("A2").unwrap();

        let mut out = Vec::new();
        let rows = write_curves(&plate, &mut out, None).unwrap();
        assert_eq!(rows, 3);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "A1\t25\t7\nA1\t26\t8\nA1\t27\t9\n");
    }

    #[test]
    fn test_write_tm_table() {
        let rows = vec![
            TmTableRow {
                sample_id: "A1".to_string(),
                tm_corrected: Some(50.204081632653065),
                tm_smoothed: Some(50.0),
                smooth_strength: 35,
            },
            TmTableRow {
                sample_id: "A2".to_string(),
                tm_corrected: None,
                tm_smoothed: None,
                smooth_strength: 35,
            },
        ];
        let mut out = Vec::new();
        write_tm_table(&rows, &mut out, b',').unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Well,Tm_corrected,Tm_smoothed,Smooth_strength\nA1,50.2041,50,35\nA2,,,35\n"
        );
    }

    #[test]
    fn test_tm_table_delimiter() {
        assert_eq!(tm_table_delimiter(Path::new("out.tsv")), b'\t');
        assert_eq!(tm_table_delimiter(Path::new("out.TSV")), b'\t');
        assert_eq!(tm_table_delimiter(Path::new("out.csv")), b',');
        assert_eq!(tm_table_delimiter(Path::new("out")), b',');
    }
}
