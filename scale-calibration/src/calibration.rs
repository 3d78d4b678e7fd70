use itertools::Itertools;
use slog::{info, warn, Logger};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("reference points coincide at ({0}, {1}); the scale bar has zero pixel length")]
    CoincidentPoints(f64, f64),

    #[error("real-world length must be positive, got {0} mm")]
    NonPositiveLength(f64),

    #[error("pixel length must be positive, got {0} px")]
    NonPositivePixelLength(f64),

    #[error("calibration input is not a finite number")]
    NonFiniteInput,

    #[error("could not parse reference point '{0}', expected 'x,y'")]
    InvalidPoint(String),
}

/// Pixel coordinate `(x, y)` picked on the reference image.
#[derive(PartialEq, PartialOrd, Debug, Clone, Copy)]
pub struct Point(pub f64, pub f64);

impl Point {
    pub fn from_arr(pts: &[[f64; 2]]) -> Vec<Point> {
        pts.iter().map(|p| Point(p[0], p[1])).collect()
    }

    /// Euclidean distance in pixels.
    pub fn dist(&self, other: &Point) -> f64 {
        (self.0 - other.0).hypot(self.1 - other.1)
    }

    fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

impl FromStr for Point {
    type Err = CalibrationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CalibrationError::InvalidPoint(s.to_string());
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (x, y) = trimmed
            .split(',')
            .map(str::trim)
            .collect_tuple::<(_, _)>()
            .ok_or_else(invalid)?;
        let x = f64::from_str(x).map_err(|_| invalid())?;
        let y = f64::from_str(y).map_err(|_| invalid())?;
        Ok(Point(x, y))
    }
}

/// Pixel-to-millimeter scale derived from a scale bar of known length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pixels_per_mm: f64,
    area_conversion: f64,
}

impl Calibration {
    fn from_pixels_per_mm(pixels_per_mm: f64) -> Calibration {
        Calibration {
            pixels_per_mm,
            area_conversion: (1.0 / pixels_per_mm).powi(2),
        }
    }

    pub fn pixels_per_mm(&self) -> f64 {
        self.pixels_per_mm
    }

    pub fn mm_per_pixel(&self) -> f64 {
        1.0 / self.pixels_per_mm
    }

    /// Factor mapping px² to mm². Area scales with the square of the linear factor.
    pub fn area_conversion(&self) -> f64 {
        self.area_conversion
    }
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1 pixel = {:.4} mm", self.mm_per_pixel())
    }
}

/// Calibrate from two reference points spanning a scale bar of `real_world_length_mm`.
pub fn calibrate(
    p1: Point,
    p2: Point,
    real_world_length_mm: f64,
) -> Result<Calibration, CalibrationError> {
    if !p1.is_finite() || !p2.is_finite() {
        return Err(CalibrationError::NonFiniteInput);
    }
    let pixel_distance = p1.dist(&p2);
    if pixel_distance == 0.0 {
        return Err(CalibrationError::CoincidentPoints(p1.0, p1.1));
    }
    calibrate_from_pixel_length(pixel_distance, real_world_length_mm)
}

/// Calibrate from a scale bar length that was measured by hand in pixels.
pub fn calibrate_from_pixel_length(
    pixel_length: f64,
    real_world_length_mm: f64,
) -> Result<Calibration, CalibrationError> {
    if !pixel_length.is_finite() || !real_world_length_mm.is_finite() {
        return Err(CalibrationError::NonFiniteInput);
    }
    if real_world_length_mm <= 0.0 {
        return Err(CalibrationError::NonPositiveLength(real_world_length_mm));
    }
    if pixel_length <= 0.0 {
        return Err(CalibrationError::NonPositivePixelLength(pixel_length));
    }
    Ok(Calibration::from_pixels_per_mm(
        pixel_length / real_world_length_mm,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CalibrationState {
    /// No scale applied: physical area equals pixel area and is reported in px².
    #[default]
    Uncalibrated,
    Calibrated(Calibration),
}

impl CalibrationState {
    pub fn area_conversion(&self) -> f64 {
        match self {
            CalibrationState::Uncalibrated => 1.0,
            CalibrationState::Calibrated(calibration) => calibration.area_conversion(),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, CalibrationState::Calibrated(_))
    }

    pub fn unit_label(&self) -> &'static str {
        match self {
            CalibrationState::Uncalibrated => "px²",
            CalibrationState::Calibrated(_) => "mm²",
        }
    }
}

impl From<Calibration> for CalibrationState {
    fn from(calibration: Calibration) -> Self {
        CalibrationState::Calibrated(calibration)
    }
}

/// Outcome of a calibration attempt. A failed attempt never aborts the run:
/// the state falls back to uncalibrated and the error is kept as a warning.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResolution {
    pub state: CalibrationState,
    pub warning: Option<CalibrationError>,
}

impl CalibrationResolution {
    /// Fewer than two reference points were supplied.
    pub fn is_pending(&self) -> bool {
        !self.state.is_calibrated() && self.warning.is_none()
    }
}

/// Resolve the scale from user-picked points. Only the first two points are used;
/// with fewer than two the calibration stays pending.
pub fn resolve_calibration(
    points: &[Point],
    real_world_length_mm: f64,
    log: &Logger,
) -> CalibrationResolution {
    let Some((p1, p2)) = points.iter().copied().take(2).collect_tuple::<(_, _)>() else {
        info!(log, "calibration pending"; "points" => points.len());
        return CalibrationResolution {
            state: CalibrationState::Uncalibrated,
            warning: None,
        };
    };

    match calibrate(p1, p2, real_world_length_mm) {
        Ok(calibration) => {
            info!(log, "scale set: {}", calibration;
                "pixels_per_mm" => calibration.pixels_per_mm());
            CalibrationResolution {
                state: calibration.into(),
                warning: None,
            }
        }
        Err(e) => {
            warn!(log, "calibration failed, areas stay in px²: {}", e);
            CalibrationResolution {
                state: CalibrationState::Uncalibrated,
                warning: Some(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use slog::{o, Discard, Logger};

    use super::{
        calibrate, calibrate_from_pixel_length, resolve_calibration, CalibrationError,
        CalibrationState, Point,
    };

    fn quiet_log() -> Logger {
        Logger::root(Discard, o!())
    }

    #[test]
    fn test_calibrate_horizontal_bar() {
        let calibration = calibrate(Point(0.0, 0.0), Point(100.0, 0.0), 1.0).unwrap();
        assert_approx_eq!(calibration.pixels_per_mm(), 100.0);
        assert_approx_eq!(calibration.mm_per_pixel(), 0.01);
        assert_approx_eq!(calibration.area_conversion(), 0.0001);
        assert_eq!(calibration.to_string(), "1 pixel = 0.0100 mm");
    }

    #[test]
    fn test_area_conversion_round_trip() {
        let (p1, p2, length) = (Point(12.5, 40.0), Point(48.5, 88.0), 2.5);
        let pixel_area = 1234.5;
        let calibration = calibrate(p1, p2, length).unwrap();
        let physical_area = pixel_area * calibration.area_conversion();
        let expected = pixel_area * (length / p1.dist(&p2)).powi(2);
        assert_approx_eq!(physical_area, expected, 1e-9);
        assert_approx_eq!(p1.dist(&p2), 60.0);
    }

    #[test]
    fn test_calibrate_rejects_degenerate_input() {
        assert_eq!(
            calibrate(Point(3.0, 4.0), Point(3.0, 4.0), 1.0),
            Err(CalibrationError::CoincidentPoints(3.0, 4.0))
        );
        assert_eq!(
            calibrate(Point(0.0, 0.0), Point(10.0, 0.0), 0.0),
            Err(CalibrationError::NonPositiveLength(0.0))
        );
        assert_eq!(
            calibrate(Point(0.0, 0.0), Point(10.0, 0.0), -2.0),
            Err(CalibrationError::NonPositiveLength(-2.0))
        );
        assert_eq!(
            calibrate(Point(f64::NAN, 0.0), Point(10.0, 0.0), 1.0),
            Err(CalibrationError::NonFiniteInput)
        );
    }

    #[test]
    fn test_calibrate_from_pixel_length() {
        let calibration = calibrate_from_pixel_length(100.0, 1.0).unwrap();
        assert_approx_eq!(calibration.area_conversion(), 1e-4);
        assert_eq!(
            calibrate_from_pixel_length(0.0, 1.0),
            Err(CalibrationError::NonPositivePixelLength(0.0))
        );
    }

    #[test]
    fn test_resolve_uses_first_two_points() {
        let points = Point::from_arr(&[[0.0, 0.0], [0.0, 50.0], [999.0, 999.0]]);
        let resolution = resolve_calibration(&points, 0.5, &quiet_log());
        assert!(resolution.warning.is_none());
        match resolution.state {
            CalibrationState::Calibrated(c) => assert_approx_eq!(c.pixels_per_mm(), 100.0),
            CalibrationState::Uncalibrated => panic!("expected a calibrated state"),
        }
    }

    #[test]
    fn test_resolve_pending_with_one_point() {
        let resolution = resolve_calibration(&[Point(1.0, 1.0)], 1.0, &quiet_log());
        assert!(resolution.is_pending());
        assert_eq!(resolution.state.area_conversion(), 1.0);
        assert_eq!(resolution.state.unit_label(), "px²");
    }

    #[test]
    fn test_resolve_falls_back_on_error() {
        let points = [Point(5.0, 5.0), Point(5.0, 5.0)];
        let resolution = resolve_calibration(&points, 1.0, &quiet_log());
        assert_eq!(resolution.state, CalibrationState::Uncalibrated);
        assert_eq!(resolution.state.area_conversion(), 1.0);
        assert!(!resolution.is_pending());
        assert!(matches!(
            resolution.warning,
            Some(CalibrationError::CoincidentPoints(..))
        ));
    }

    #[test]
    fn test_point_from_str() {
        assert_eq!("12.5, 7".parse::<Point>().unwrap(), Point(12.5, 7.0));
        assert_eq!("(0,100)".parse::<Point>().unwrap(), Point(0.0, 100.0));
        assert!("12.5".parse::<Point>().is_err());
        assert!("a,b".parse::<Point>().is_err());
        assert!("1,2,3".parse::<Point>().is_err());
    }
}
