use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;
use scale_calibration::CalibrationState;

use crate::batch::{MeasurementRecord, ERROR_MARKER};
use crate::error::{MeasureError, Result};

pub const DEFAULT_CSV_NAME: &str = "dark_area_measurements.csv";
pub const CSV_HEADER: [&str; 3] = ["Image", "Area_px2", "Area_mm2"];

/// Decimal places used when rendering each area column.
const PIXEL_DECIMALS: usize = 2;
const PHYSICAL_DECIMALS: usize = 4;

/// Ordered measurement results ready for display or export.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultTable {
    pub records: Vec<MeasurementRecord>,
    pub unit: &'static str,
}

impl ResultTable {
    pub fn new(records: Vec<MeasurementRecord>, calibration: &CalibrationState) -> ResultTable {
        ResultTable {
            records,
            unit: calibration.unit_label(),
        }
    }

    /// Rendered cells, one row per record. Rounding happens here only.
    pub fn rows(&self) -> Vec<[String; 3]> {
        self.records
            .iter()
            .map(|record| match &record.result {
                Ok(m) => [
                    record.name.clone(),
                    format!("{:.*}", PIXEL_DECIMALS, m.pixel_area),
                    format!("{:.*}", PHYSICAL_DECIMALS, m.physical_area),
                ],
                Err(e) => [record.name.clone(), ERROR_MARKER.to_string(), e.clone()],
            })
            .collect_vec()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header = CSV_HEADER.iter().map(|h| csv_field(h)).join(",");
        out.push_str(&header);
        out.push('\n');
        for row in self.rows() {
            out.push_str(&row.iter().map(|cell| csv_field(cell)).join(","));
            out.push('\n');
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let io_err = |source| MeasureError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
        writer.write_all(self.to_csv().as_bytes()).map_err(io_err)?;
        writer.flush().map_err(io_err)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        let header = [
            CSV_HEADER[0].to_string(),
            "Area (px²)".to_string(),
            format!("Area ({})", self.unit),
        ];
        let widths = (0..3)
            .map(|col| {
                rows.iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(header[col].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect_vec();
        for row in std::iter::once(&header).chain(rows.iter()) {
            writeln!(
                f,
                "{:<w0$}  {:>w1$}  {:>w2$}",
                row[0],
                row[1],
                row[2],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2]
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use scale_calibration::{calibrate_from_pixel_length, CalibrationState};

    use super::{csv_field, ResultTable};
    use crate::batch::{AreaMeasurement, MeasurementRecord};

    fn create_temporary_csv_path() -> std::path::PathBuf {
        use rand::Rng;
        let mut file_name: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        file_name.push_str(".csv");
        std::env::temp_dir().join(file_name)
    }

    fn sample_records() -> Vec<MeasurementRecord> {
        vec![
            MeasurementRecord {
                name: "a.tif".to_string(),
                result: Ok(AreaMeasurement {
                    pixel_area: 10000.0,
                    physical_area: 1.0,
                }),
            },
            MeasurementRecord {
                name: "b.tif".to_string(),
                result: Err("failed to decode image 'b.tif': bad, truncated".to_string()),
            },
            MeasurementRecord {
                name: "c.tif".to_string(),
                result: Ok(AreaMeasurement {
                    pixel_area: 123.456,
                    physical_area: 0.0123456,
                }),
            },
        ]
    }

    #[test]
    fn test_rows_are_rounded() {
        let table = ResultTable::new(sample_records(), &CalibrationState::Uncalibrated);
        let rows = table.rows();
        assert_eq!(rows[0], ["a.tif", "10000.00", "1.0000"].map(String::from));
        assert_eq!(rows[1][1], "Error");
        assert_eq!(rows[2], ["c.tif", "123.46", "0.0123"].map(String::from));
        assert_eq!(table.unit, "px²");
        // rounding is display only
        assert_eq!(table.records[2].pixel_area(), Some(123.456));
    }

    #[test]
    fn test_to_csv() {
        let calibration = calibrate_from_pixel_length(100.0, 1.0).unwrap();
        let table = ResultTable::new(sample_records(), &calibration.into());
        assert_eq!(table.unit, "mm²");
        assert_eq!(
            table.to_csv(),
            "Image,Area_px2,Area_mm2\n\
             a.tif,10000.00,1.0000\n\
             b.tif,Error,\"failed to decode image 'b.tif': bad, truncated\"\n\
             c.tif,123.46,0.0123\n"
        );
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain.tif"), "plain.tif");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("a\nb"), "\"a\nb\"");
    }

    #[test]
    fn test_write_csv() {
        let path = create_temporary_csv_path();
        let table = ResultTable::new(sample_records(), &CalibrationState::Uncalibrated);
        table.write_csv(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, table.to_csv());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_display_lists_every_record() {
        let table = ResultTable::new(sample_records(), &CalibrationState::Uncalibrated);
        let rendered = table.to_string();
        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.lines().next().unwrap().contains("Area (px²)"));
    }
}
