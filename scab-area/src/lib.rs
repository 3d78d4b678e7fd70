#![allow(missing_docs)]

pub mod area_measurer;
pub mod batch;
pub mod error;
pub mod regions;
pub mod report;
pub mod threshold;
pub mod utils;
pub const IS_DEBUG: bool = false;
