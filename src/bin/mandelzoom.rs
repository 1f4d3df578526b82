extern crate clap;
extern crate mandelzoom;
extern crate num;
extern crate num_cpus;

use std::cmp;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use num::Complex;

use mandelzoom::{
    Benchmark, Bounds, ColorMap, Error, Execution, FractalConfig, Mandelbrot, ZoomSequence,
    MAX_WORKERS,
};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn validate_number<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    match T::from_str(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(err.to_string()),
    }
}

fn validate_positive(s: &str, err: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(v) => {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(err.to_string())
            }
        }
        Err(_) => Err(err.to_string()),
    }
}

const FRAMES_CMD: &str = "frames";
const RENDER_CMD: &str = "render";
const BENCH_CMD: &str = "bench";

const THREADS: &str = "threads";
const COUNT: &str = "count";
const REGION: &str = "region";
const OUTPUT: &str = "output";
const ZOOM: &str = "zoom";
const RESOLUTION: &str = "resolution";
const NO_SAVE: &str = "no-save";
const COLOR: &str = "color";
const MAX_ITER: &str = "max-iter";
const THRESHOLD: &str = "threshold";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const LOG_DIR: &str = "log-dir";
const LOG_FILE: &str = "log-file";

fn threads_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(THREADS)
        .required(false)
        .long(THREADS)
        .short("t")
        .takes_value(true)
        .validator(|s| {
            validate_range(
                &s,
                1,
                MAX_WORKERS,
                "Could not parse thread count",
                &format!("Thread count must be between 1 and {}", MAX_WORKERS),
            )
        })
        .help("Number of worker threads (default: all cores, capped at 32)")
}

fn resolution_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(RESOLUTION)
        .required(false)
        .long(RESOLUTION)
        .takes_value(true)
        .default_value("0.005")
        .validator(|s| validate_positive(&s, "Resolution must be a positive number"))
        .help("Distance between adjacent sample points")
}

fn max_iter_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(MAX_ITER)
        .required(false)
        .long(MAX_ITER)
        .short("i")
        .takes_value(true)
        .default_value("1000")
        .validator(|s| validate_number::<u32>(&s, "Could not parse iteration budget"))
        .help("Iteration budget per sample point")
}

fn threshold_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(THRESHOLD)
        .required(false)
        .long(THRESHOLD)
        .takes_value(true)
        .default_value("2.0")
        .validator(|s| validate_number::<f64>(&s, "Could not parse escape threshold"))
        .help("Escape threshold on the magnitude of z")
}

fn leftlower_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(LEFTLOWER)
        .required(false)
        .long(LEFTLOWER)
        .short("l")
        .takes_value(true)
        .allow_hyphen_values(true)
        .default_value("-4,-4")
        .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
        .help("Left lower corner of the window, as re,im")
}

fn rightupper_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(RIGHTUPPER)
        .required(false)
        .long(RIGHTUPPER)
        .short("r")
        .takes_value(true)
        .allow_hyphen_values(true)
        .default_value("4,4")
        .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
        .help("Right upper corner of the window, as re,im")
}

fn color_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name(COLOR)
        .required(false)
        .long(COLOR)
        .takes_value(true)
        .possible_values(&["grayscale", "gradient"])
        .default_value("grayscale")
        .help("Mapping from escape time to pixel color")
}

fn frames_command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name(FRAMES_CMD)
        .about("Generates a zoom sequence of PPM frames around a named region")
        .arg(
            Arg::with_name(REGION)
                .required(false)
                .long(REGION)
                .short("r")
                .takes_value(true)
                .default_value("Seahorse")
                .help("Zoom target: Seahorse, Elephant Valley, or Feigenbaum"),
        )
        .arg(
            Arg::with_name(COUNT)
                .required(false)
                .long(COUNT)
                .short("n")
                .takes_value(true)
                .default_value("100")
                .validator(|s| validate_number::<usize>(&s, "Could not parse frame count"))
                .help("Number of frames to generate"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .required(false)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .default_value("1.01")
                .validator(|s| validate_positive(&s, "Zoom factor must be a positive number"))
                .help("Per-frame zoom factor; values above 1 zoom in"),
        )
        .arg(resolution_arg().help("Sample spacing of the first frame"))
        .arg(
            Arg::with_name(OUTPUT)
                .required(false)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value(".")
                .help("Existing directory that receives frame_NNNN.ppm files"),
        )
        .arg(
            Arg::with_name(NO_SAVE)
                .required(false)
                .long(NO_SAVE)
                .takes_value(false)
                .help("Compute every frame but write nothing (timing runs)"),
        )
        .arg(threads_arg())
        .arg(color_arg())
}

fn render_command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name(RENDER_CMD)
        .about("Renders one window of the set to a PPM image")
        .arg(leftlower_arg())
        .arg(rightupper_arg())
        .arg(resolution_arg())
        .arg(max_iter_arg())
        .arg(threshold_arg())
        .arg(
            Arg::with_name(OUTPUT)
                .required(false)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value("image.ppm")
                .help("Output file"),
        )
        .arg(threads_arg())
        .arg(color_arg())
}

fn bench_command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name(BENCH_CMD)
        .about("Times one render and appends the measurement to a log file")
        .arg(leftlower_arg())
        .arg(rightupper_arg())
        .arg(resolution_arg())
        .arg(max_iter_arg())
        .arg(threshold_arg())
        .arg(
            Arg::with_name(LOG_DIR)
                .required(false)
                .long(LOG_DIR)
                .takes_value(true)
                .default_value("./logs")
                .help("Existing directory that receives the log file"),
        )
        .arg(
            Arg::with_name(LOG_FILE)
                .required(false)
                .long(LOG_FILE)
                .takes_value(true)
                .default_value("bench.txt")
                .help("Log file name; records are appended"),
        )
        .arg(threads_arg())
        .arg(color_arg())
}

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandelzoom")
        .version("0.1.0")
        .about("Escape-time Mandelbrot renderer and zoom-sequence generator")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(frames_command())
        .subcommand(render_command())
        .subcommand(bench_command())
        .get_matches()
}

fn threads(matches: &ArgMatches) -> usize {
    match matches.value_of(THREADS) {
        Some(s) => usize::from_str(s).expect("Could not parse thread count"),
        None => cmp::min(num_cpus::get(), MAX_WORKERS),
    }
}

fn execution(threads: usize) -> Execution {
    if threads <= 1 {
        Execution::Sequential
    } else {
        Execution::Parallel(threads)
    }
}

fn color(matches: &ArgMatches) -> ColorMap {
    match matches.value_of(COLOR).unwrap() {
        "gradient" => ColorMap::Gradient,
        _ => ColorMap::Grayscale,
    }
}

fn fractal_config(matches: &ArgMatches) -> FractalConfig {
    let leftlower = parse_complex(matches.value_of(LEFTLOWER).unwrap())
        .expect("Could not parse left lower corner");
    let rightupper = parse_complex(matches.value_of(RIGHTUPPER).unwrap())
        .expect("Could not parse right upper corner");
    FractalConfig {
        max_iter: u32::from_str(matches.value_of(MAX_ITER).unwrap())
            .expect("Could not parse iteration budget"),
        threshold: f64::from_str(matches.value_of(THRESHOLD).unwrap())
            .expect("Could not parse escape threshold"),
        resolution: f64::from_str(matches.value_of(RESOLUTION).unwrap())
            .expect("Could not parse resolution"),
        bounds: Bounds {
            r_min: leftlower.re,
            r_max: rightupper.re,
            i_min: leftlower.im,
            i_max: rightupper.im,
        },
    }
}

fn run_frames(matches: &ArgMatches) -> Result<(), Error> {
    let sequence = ZoomSequence {
        max_procs: threads(matches),
        n_frames: usize::from_str(matches.value_of(COUNT).unwrap())
            .expect("Could not parse frame count"),
        region: matches.value_of(REGION).unwrap().to_string(),
        save_frames: !matches.is_present(NO_SAVE),
        output_dir: PathBuf::from(matches.value_of(OUTPUT).unwrap()),
        zoom_factor: f64::from_str(matches.value_of(ZOOM).unwrap())
            .expect("Could not parse zoom factor"),
        base_resolution: f64::from_str(matches.value_of(RESOLUTION).unwrap())
            .expect("Could not parse resolution"),
        color: color(matches),
    };
    sequence.generate()
}

fn run_render(matches: &ArgMatches) -> Result<(), Error> {
    let mut engine = Mandelbrot::new(
        fractal_config(matches),
        color(matches),
        execution(threads(matches)),
    )?;
    engine.generate_image();
    let output = matches.value_of(OUTPUT).unwrap();
    engine.save_image(output)?;
    println!("wrote {} ({} x {})", output, engine.cols(), engine.rows());
    Ok(())
}

fn run_bench(matches: &ArgMatches) -> Result<(), Error> {
    let config = fractal_config(matches);
    let n_procs = threads(matches);
    let mut engine = Mandelbrot::new(config, color(matches), execution(n_procs))?;
    let mut bench = Benchmark::with_log_dir(
        config.resolution,
        config.max_iter,
        n_procs,
        PathBuf::from(matches.value_of(LOG_DIR).unwrap()),
    );
    bench.start();
    engine.generate_image();
    let duration = bench.stop();
    println!(
        "computed {} cells on {} threads in {:.5} seconds",
        engine.rows() * engine.cols(),
        n_procs,
        duration
    );
    bench.log(matches.value_of(LOG_FILE).unwrap());
    Ok(())
}

fn main() {
    let matches = args();
    let outcome = match matches.subcommand() {
        (FRAMES_CMD, Some(sub)) => run_frames(sub),
        (RENDER_CMD, Some(sub)) => run_render(sub),
        (BENCH_CMD, Some(sub)) => run_bench(sub),
        _ => unreachable!(),
    };
    if let Err(e) = outcome {
        eprintln!("{}", e);
        process::exit(1);
    }
}
