#![allow(missing_docs)]

pub mod calibration;

pub use calibration::{
    calibrate, calibrate_from_pixel_length, resolve_calibration, Calibration, CalibrationError,
    CalibrationResolution, CalibrationState, Point,
};
