//Measure dark (scab) area in a batch of images, optionally converting to mm²
//with a scale bar calibration

use std::path::PathBuf;

use clap::Parser;
use scab_area::{
    area_measurer::MeasureParameter,
    batch::BatchRunner,
    report::{ResultTable, DEFAULT_CSV_NAME},
    utils::set_log_config,
};
use scale_calibration::{
    calibrate_from_pixel_length, resolve_calibration, CalibrationResolution, CalibrationState,
    Point,
};
use slog::warn;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    //images to measure
    #[arg(required = true)]
    images: Vec<PathBuf>,

    //intensities at or below this value are dark
    #[arg(short, long, default_value_t = 50)]
    threshold: u8,

    //scale bar end points as "x,y", given twice
    #[arg(short, long = "point")]
    points: Vec<Point>,

    //scale bar length measured by hand, used instead of --point
    #[arg(long)]
    pixel_length: Option<f64>,

    //real length of the scale bar
    #[arg(long, default_value_t = 1.0)]
    real_length_mm: f64,

    //where to write the CSV table
    #[arg(short, long, default_value = DEFAULT_CSV_NAME)]
    output: PathBuf,
}

fn main() {
    let args = Args::parse();
    let log = set_log_config();

    let resolution = match args.pixel_length {
        Some(pixel_length) => match calibrate_from_pixel_length(pixel_length, args.real_length_mm)
        {
            Ok(calibration) => CalibrationResolution {
                state: calibration.into(),
                warning: None,
            },
            Err(e) => CalibrationResolution {
                state: CalibrationState::Uncalibrated,
                warning: Some(e),
            },
        },
        None => resolve_calibration(&args.points, args.real_length_mm, &log),
    };
    if let Some(warning) = &resolution.warning {
        warn!(log, "calibration ignored: {}", warning);
        eprintln!("warning: {}; reporting areas in px²", warning);
    }
    if let CalibrationState::Calibrated(calibration) = resolution.state {
        println!("Scale set: {}", calibration);
    }

    let runner = BatchRunner::with_logger(
        MeasureParameter::new(args.threshold),
        resolution.state,
        log,
    );
    let table = ResultTable::new(runner.run_paths(&args.images), &resolution.state);
    print!("{}", table);

    if let Err(e) = table.write_csv(&args.output) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    println!("Results written to {}", args.output.display());
}
