use std::path::Path;
use std::time::Instant;

use scale_calibration::CalibrationState;
use slog::{info, warn, Logger};

use crate::area_measurer::{measure_bytes, measure_path, physical_area, MeasureParameter};
use crate::error::MeasureError;
use crate::utils::ImageUtil;
use crate::IS_DEBUG;

/// Written in place of the pixel area when an image could not be measured.
pub const ERROR_MARKER: &str = "Error";

#[derive(Clone, Debug, Copy, PartialEq)]
pub struct AreaMeasurement {
    pub pixel_area: f64,
    pub physical_area: f64,
}

/// Outcome for one input image. A failed image keeps the error message.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementRecord {
    pub name: String,
    pub result: Result<AreaMeasurement, String>,
}

impl MeasurementRecord {
    pub fn pixel_area(&self) -> Option<f64> {
        self.result.as_ref().ok().map(|m| m.pixel_area)
    }

    pub fn physical_area(&self) -> Option<f64> {
        self.result.as_ref().ok().map(|m| m.physical_area)
    }

    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }
}

fn record_outcome(
    name: String,
    outcome: Result<f64, MeasureError>,
    area_conversion: f64,
    log: &Logger,
) -> MeasurementRecord {
    let result = match outcome {
        Ok(pixel_area) => {
            let measurement = AreaMeasurement {
                pixel_area,
                physical_area: physical_area(pixel_area, area_conversion),
            };
            info!(log, "measured {}", name;
                "pixel_area" => measurement.pixel_area,
                "physical_area" => measurement.physical_area);
            Ok(measurement)
        }
        Err(e) => {
            warn!(log, "could not measure {}: {}", name, e);
            Err(e.to_string())
        }
    };
    MeasurementRecord { name, result }
}

/// Measure every `(name, bytes)` pair in input order. A failing image yields an
/// error record and the remaining images are still measured.
pub fn run_batch<I, N, B>(
    images: I,
    threshold: u8,
    area_conversion: f64,
    log: &Logger,
) -> Vec<MeasurementRecord>
where
    I: IntoIterator<Item = (N, B)>,
    N: Into<String>,
    B: AsRef<[u8]>,
{
    BatchRunner::with_logger(
        MeasureParameter::new(threshold),
        CalibrationState::Uncalibrated,
        log.clone(),
    )
    .run_with_conversion(images, area_conversion)
}

/// Measures a batch of images with one threshold and one calibration.
pub struct BatchRunner {
    param: MeasureParameter,
    calibration: CalibrationState,
    log: Logger,
}

impl BatchRunner {
    pub fn with_logger(
        param: MeasureParameter,
        calibration: CalibrationState,
        log: Logger,
    ) -> BatchRunner {
        BatchRunner {
            param,
            calibration,
            log,
        }
    }

    pub fn run<I, N, B>(&self, images: I) -> Vec<MeasurementRecord>
    where
        I: IntoIterator<Item = (N, B)>,
        N: Into<String>,
        B: AsRef<[u8]>,
    {
        self.run_with_conversion(images, self.calibration.area_conversion())
    }

    fn run_with_conversion<I, N, B>(&self, images: I, area_conversion: f64) -> Vec<MeasurementRecord>
    where
        I: IntoIterator<Item = (N, B)>,
        N: Into<String>,
        B: AsRef<[u8]>,
    {
        info!(self.log, "starting batch";
            "threshold" => self.param.threshold,
            "area_conversion" => area_conversion);
        images
            .into_iter()
            .map(|(name, bytes)| {
                let name: String = name.into();
                let tick = Instant::now();
                let outcome = measure_bytes(&name, bytes.as_ref(), self.param.threshold);
                self.log_timing(&name, tick);
                record_outcome(name, outcome, area_conversion, &self.log)
            })
            .collect()
    }

    /// Read each file and measure it. Unreadable files become error records.
    pub fn run_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<MeasurementRecord> {
        let area_conversion = self.calibration.area_conversion();
        paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                let name = ImageUtil::file_name(path);
                let tick = Instant::now();
                let outcome = measure_path(path, &self.param);
                self.log_timing(&name, tick);
                record_outcome(name, outcome, area_conversion, &self.log)
            })
            .collect()
    }

    fn log_timing(&self, name: &str, tick: Instant) {
        if IS_DEBUG {
            info!(
                self.log,
                "{} took {:.3}s",
                name,
                tick.elapsed().as_millis() as f64 / 1000.0
            );
        }
    }
}
