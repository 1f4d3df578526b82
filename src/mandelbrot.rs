// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time engine.
//!
//! A `Mandelbrot` owns one rectangular window of the complex plane,
//! sampled on a fixed-resolution grid, plus the color buffer those
//! samples shade into. Both phases can run sequentially or on a bounded
//! worker pool, and the two strategies produce bit-identical buffers:
//! every cell's value depends only on its own coordinate, never on the
//! order its neighbors were computed in.
//!
//! The phases are parallelized differently on purpose. Building the
//! grid costs the same everywhere, so it is cut into one contiguous
//! block per worker up front. Escape-time cost varies wildly across the
//! window (interior points always burn the whole budget), so shading
//! workers pull small chunks from a shared queue and the slow regions
//! spread themselves over the pool.

extern crate crossbeam;
extern crate itertools;
extern crate num;

use std::cmp;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use itertools::iproduct;
use num::Complex;

use color::{ColorMap, Rgb};
use complex::magnitude;
use error::Error;
use ppm;

/// Hard ceiling on worker threads for any parallel region.
pub const MAX_WORKERS: usize = 32;

/// Cells handed to a shading worker per queue pull. Small enough to
/// balance the expensive interior regions, large enough that the queue
/// lock stays off the profile.
const CHUNK: usize = 16;

/// A rectangular window of the complex plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// Left edge on the real axis.
    pub r_min: f64,
    /// Right edge on the real axis.
    pub r_max: f64,
    /// Bottom edge on the imaginary axis.
    pub i_min: f64,
    /// Top edge on the imaginary axis.
    pub i_max: f64,
}

impl Bounds {
    /// The window of the given total width and height around `center`.
    pub fn centered(center: Complex<f64>, width: f64, height: f64) -> Bounds {
        Bounds {
            r_min: center.re - width / 2.0,
            r_max: center.re + width / 2.0,
            i_min: center.im - height / 2.0,
            i_max: center.im + height / 2.0,
        }
    }
}

/// Everything one escape-time computation needs to know.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractalConfig {
    /// Iteration budget before a point is declared non-divergent.
    pub max_iter: u32,
    /// Escape threshold compared against the magnitude of `z`.
    pub threshold: f64,
    /// Distance between adjacent samples on either axis.
    pub resolution: f64,
    /// The sampled window.
    pub bounds: Bounds,
}

impl Default for FractalConfig {
    /// A coarse 20 x 20 demonstration window over [-10, 10] on both
    /// axes. Big enough to show structure, small enough to compute in
    /// a unit test.
    fn default() -> FractalConfig {
        FractalConfig {
            max_iter: 255,
            threshold: 2.0,
            resolution: 1.0,
            bounds: Bounds {
                r_min: -10.0,
                r_max: 10.0,
                i_min: -10.0,
                i_max: 10.0,
            },
        }
    }
}

/// How an engine walks its cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
    /// One ordered row-major pass on the calling thread.
    Sequential,
    /// A worker pool of the given size, clamped to `1..=MAX_WORKERS`.
    Parallel(usize),
}

/// The escape-time count for one sample point.
///
/// Iteration starts from `z = c` rather than zero, so the first escape
/// check sees the sample itself. A count of `0` means `c` already sits
/// outside the threshold, and `max_iter` means the point never escaped
/// and is treated as interior.
pub fn escape_time(c: Complex<f64>, config: &FractalConfig) -> u32 {
    let mut z = c;
    let mut iter = 0;
    while iter < config.max_iter {
        if magnitude(z) > config.threshold {
            break;
        }
        iter += 1;
        z = z * z + c;
    }
    iter
}

/// One sampled window and the color buffer it shades into.
///
/// Both buffers are flat row-major vectors. Row `i`, column `j` sits at
/// index `i * cols + j`; rows advance along the imaginary axis, columns
/// along the real axis.
pub struct Mandelbrot {
    config: FractalConfig,
    color: ColorMap,
    execution: Execution,
    n_rows: usize,
    n_cols: usize,
    grid: Vec<Complex<f64>>,
    image: Vec<Rgb>,
}

impl Mandelbrot {
    /// Validates the configuration and allocates the grid and color
    /// buffer. Dimensions follow the window: `ceil(span / resolution)`
    /// samples per axis, so a window that does not divide evenly gets
    /// one extra row or column covering the ragged remainder.
    pub fn new(
        config: FractalConfig,
        color: ColorMap,
        execution: Execution,
    ) -> Result<Mandelbrot, Error> {
        if !(config.resolution > 0.0 && config.resolution.is_finite()) {
            return Err(Error::Config(format!(
                "resolution must be a positive finite number, got {}",
                config.resolution
            )));
        }
        let span_re = config.bounds.r_max - config.bounds.r_min;
        let span_im = config.bounds.i_max - config.bounds.i_min;
        if !(span_re >= 0.0 && span_re.is_finite()) {
            return Err(Error::Config(
                "window is inverted or not finite on the real axis".to_string(),
            ));
        }
        if !(span_im >= 0.0 && span_im.is_finite()) {
            return Err(Error::Config(
                "window is inverted or not finite on the imaginary axis".to_string(),
            ));
        }
        let n_cols = (span_re / config.resolution).ceil() as usize;
        let n_rows = (span_im / config.resolution).ceil() as usize;
        let execution = match execution {
            Execution::Sequential => Execution::Sequential,
            Execution::Parallel(workers) => {
                Execution::Parallel(cmp::max(1, cmp::min(workers, MAX_WORKERS)))
            }
        };
        Ok(Mandelbrot {
            config,
            color,
            execution,
            n_rows,
            n_cols,
            grid: vec![Complex::new(0.0, 0.0); n_rows * n_cols],
            image: vec![Rgb(0, 0, 0); n_rows * n_cols],
        })
    }

    /// Number of sample rows (imaginary axis).
    pub fn rows(&self) -> usize {
        self.n_rows
    }

    /// Number of sample columns (real axis).
    pub fn cols(&self) -> usize {
        self.n_cols
    }

    /// The sample coordinate at row `i`, column `j`.
    pub fn point(&self, i: usize, j: usize) -> Complex<f64> {
        self.grid[i * self.n_cols + j]
    }

    /// The shaded pixel at row `i`, column `j`.
    pub fn pixel(&self, i: usize, j: usize) -> Rgb {
        self.image[i * self.n_cols + j]
    }

    /// The whole color buffer, row-major.
    pub fn pixels(&self) -> &[Rgb] {
        &self.image
    }

    /// Fills every grid cell with its sample coordinate:
    /// `(j * resolution + r_min, i * resolution + i_min)`. Cell `(0, 0)`
    /// is exactly the window's lower-left corner. Deterministic, so
    /// rebuilding is idempotent.
    pub fn build_grid(&mut self) {
        match self.execution {
            Execution::Sequential => self.build_grid_sequential(),
            Execution::Parallel(workers) => self.build_grid_parallel(workers),
        }
    }

    fn build_grid_sequential(&mut self) {
        let cols = self.n_cols;
        let res = self.config.resolution;
        let (r_min, i_min) = (self.config.bounds.r_min, self.config.bounds.i_min);
        for (i, j) in iproduct!(0..self.n_rows, 0..cols) {
            self.grid[i * cols + j] =
                Complex::new(j as f64 * res + r_min, i as f64 * res + i_min);
        }
    }

    fn build_grid_parallel(&mut self, workers: usize) {
        let total = self.grid.len();
        if total == 0 {
            return;
        }
        let cols = self.n_cols;
        let res = self.config.resolution;
        let (r_min, i_min) = (self.config.bounds.r_min, self.config.bounds.i_min);
        // Every cell costs the same here, so a static split into one
        // contiguous block per worker needs no queue at all.
        let block = (total + workers - 1) / workers;
        let blocks = self.grid.chunks_mut(block);
        crossbeam::scope(|spawner| {
            for (w, cells) in blocks.enumerate() {
                spawner.spawn(move |_| {
                    let base = w * block;
                    for (k, cell) in cells.iter_mut().enumerate() {
                        let i = (base + k) / cols;
                        let j = (base + k) % cols;
                        *cell = Complex::new(j as f64 * res + r_min, i as f64 * res + i_min);
                    }
                });
            }
        })
        .unwrap();
    }

    /// Builds the grid, then evaluates and shades every cell. The grid
    /// is always complete before shading starts; the two parallel
    /// phases never overlap.
    pub fn generate_image(&mut self) {
        self.build_grid();
        match self.execution {
            Execution::Sequential => self.generate_sequential(),
            Execution::Parallel(workers) => self.generate_parallel(workers),
        }
    }

    fn generate_sequential(&mut self) {
        let cols = self.n_cols;
        for (i, j) in iproduct!(0..self.n_rows, 0..cols) {
            let count = escape_time(self.grid[i * cols + j], &self.config);
            self.image[i * cols + j] = self.color.shade(count, self.config.max_iter);
        }
    }

    fn generate_parallel(&mut self, workers: usize) {
        let config = self.config;
        let color = self.color;
        let grid = &self.grid;
        let work = Arc::new(Mutex::new(self.image.chunks_mut(CHUNK).enumerate()));
        crossbeam::scope(|spawner| {
            for _ in 0..workers {
                let work = work.clone();
                spawner.spawn(move |_| loop {
                    // Hold the lock only to pull the next chunk, never
                    // while iterating.
                    let job = { work.lock().unwrap().next() };
                    match job {
                        Some((index, cells)) => {
                            let base = index * CHUNK;
                            for (k, out) in cells.iter_mut().enumerate() {
                                let count = escape_time(grid[base + k], &config);
                                *out = color.shade(count, config.max_iter);
                            }
                        }
                        None => break,
                    }
                });
            }
        })
        .unwrap();
    }

    /// Serializes the color buffer to `path` as a P3 pixmap.
    pub fn save_image<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|cause| io_error(path, cause))?;
        let mut out = BufWriter::new(file);
        ppm::write_ppm(&mut out, self.n_cols, self.n_rows, &self.image)
            .and_then(|_| out.flush())
            .map_err(|cause| io_error(path, cause))
    }
}

fn io_error(path: &Path, cause: io::Error) -> Error {
    Error::Io {
        path: path.display().to_string(),
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn evaluation(max_iter: u32, threshold: f64) -> FractalConfig {
        FractalConfig {
            max_iter,
            threshold,
            ..FractalConfig::default()
        }
    }

    #[test]
    fn points_outside_the_threshold_escape_at_zero() {
        let config = evaluation(1000, 2.0);
        assert_eq!(escape_time(Complex::new(3.0, 4.0), &config), 0);
        assert_eq!(escape_time(Complex::new(0.0, -9.5), &config), 0);
    }

    #[test]
    fn the_escape_comparison_is_strict() {
        // Magnitude exactly 2.0 survives the first check, escapes on
        // the second.
        let config = evaluation(1000, 2.0);
        assert_eq!(escape_time(Complex::new(2.0, 0.0), &config), 1);
    }

    #[test]
    fn the_origin_exhausts_the_budget() {
        let config = evaluation(1000, 2.0);
        assert_eq!(escape_time(Complex::new(0.0, 0.0), &config), 1000);
    }

    #[test]
    fn a_zero_budget_returns_zero_everywhere() {
        let config = evaluation(0, 2.0);
        assert_eq!(escape_time(Complex::new(0.0, 0.0), &config), 0);
        assert_eq!(escape_time(Complex::new(5.0, 5.0), &config), 0);
    }

    #[test]
    fn a_negative_threshold_rejects_even_the_origin() {
        let config = evaluation(1000, -1.0);
        assert_eq!(escape_time(Complex::new(0.0, 0.0), &config), 0);
        assert_eq!(escape_time(Complex::new(1.0, 1.0), &config), 0);
    }

    #[test]
    fn a_zero_threshold_still_keeps_the_origin() {
        // magnitude(0) > 0.0 is false, so the origin iterates in place
        // until the budget runs out.
        let config = evaluation(50, 0.0);
        assert_eq!(escape_time(Complex::new(0.0, 0.0), &config), 50);
        assert_eq!(escape_time(Complex::new(0.5, 0.0), &config), 0);
    }

    #[test]
    fn dimensions_follow_the_ceiling_law() {
        let config = FractalConfig {
            resolution: 0.005,
            bounds: Bounds {
                r_min: -4.0,
                r_max: 4.0,
                i_min: -4.0,
                i_max: 4.0,
            },
            ..FractalConfig::default()
        };
        let engine = Mandelbrot::new(config, ColorMap::Grayscale, Execution::Sequential).unwrap();
        assert_eq!((engine.rows(), engine.cols()), (1600, 1600));
    }

    #[test]
    fn a_ragged_window_rounds_up() {
        let config = FractalConfig {
            resolution: 0.3,
            bounds: Bounds {
                r_min: 0.0,
                r_max: 1.0,
                i_min: 0.0,
                i_max: 1.0,
            },
            ..FractalConfig::default()
        };
        let engine = Mandelbrot::new(config, ColorMap::Grayscale, Execution::Sequential).unwrap();
        assert_eq!((engine.rows(), engine.cols()), (4, 4));
    }

    #[test]
    fn the_grid_anchors_on_the_lower_left_corner() {
        let mut engine = Mandelbrot::new(
            FractalConfig::default(),
            ColorMap::Grayscale,
            Execution::Sequential,
        )
        .unwrap();
        engine.build_grid();
        assert_eq!(engine.point(0, 0), Complex::new(-10.0, -10.0));
        assert_eq!(engine.point(0, 19), Complex::new(9.0, -10.0));
        assert_eq!(engine.point(19, 0), Complex::new(-10.0, 9.0));
        for i in 0..engine.rows() {
            for j in 0..engine.cols() {
                let expected = Complex::new(j as f64 - 10.0, i as f64 - 10.0);
                assert_eq!(engine.point(i, j), expected);
            }
        }
    }

    #[test]
    fn fractional_resolutions_place_samples_exactly() {
        let config = FractalConfig {
            resolution: 0.25,
            bounds: Bounds {
                r_min: -1.0,
                r_max: 0.1,
                i_min: 0.0,
                i_max: 1.1,
            },
            ..FractalConfig::default()
        };
        let mut engine =
            Mandelbrot::new(config, ColorMap::Grayscale, Execution::Sequential).unwrap();
        assert_eq!((engine.rows(), engine.cols()), (5, 5));
        engine.build_grid();
        assert_eq!(engine.point(0, 0), Complex::new(-1.0, 0.0));
        assert_eq!(engine.point(2, 3), Complex::new(-0.25, 0.5));
    }

    #[test]
    fn sequential_and_parallel_buffers_are_identical() {
        let mut lone = Mandelbrot::new(
            FractalConfig::default(),
            ColorMap::Gradient,
            Execution::Sequential,
        )
        .unwrap();
        let mut pool = Mandelbrot::new(
            FractalConfig::default(),
            ColorMap::Gradient,
            Execution::Parallel(5),
        )
        .unwrap();
        lone.generate_image();
        pool.generate_image();
        assert_eq!(lone.pixels(), pool.pixels());
        for i in 0..lone.rows() {
            for j in 0..lone.cols() {
                assert_eq!(lone.point(i, j), pool.point(i, j));
            }
        }
    }

    #[test]
    fn agreement_holds_across_random_windows() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..4 {
            let config = FractalConfig {
                max_iter: rng.gen_range(1u32, 200),
                threshold: rng.gen_range(0.5, 4.0),
                resolution: rng.gen_range(0.2, 1.5),
                bounds: Bounds {
                    r_min: -2.0,
                    r_max: rng.gen_range(0.0, 2.0),
                    i_min: -1.5,
                    i_max: rng.gen_range(0.0, 1.5),
                },
            };
            let mut lone =
                Mandelbrot::new(config, ColorMap::Grayscale, Execution::Sequential).unwrap();
            let mut pool =
                Mandelbrot::new(config, ColorMap::Grayscale, Execution::Parallel(7)).unwrap();
            lone.generate_image();
            pool.generate_image();
            assert_eq!(lone.pixels(), pool.pixels());
        }
    }

    #[test]
    fn worker_counts_are_clamped_not_rejected() {
        let mut zero = Mandelbrot::new(
            FractalConfig::default(),
            ColorMap::Grayscale,
            Execution::Parallel(0),
        )
        .unwrap();
        let mut huge = Mandelbrot::new(
            FractalConfig::default(),
            ColorMap::Grayscale,
            Execution::Parallel(10_000),
        )
        .unwrap();
        zero.generate_image();
        huge.generate_image();
        assert_eq!(zero.pixels(), huge.pixels());
    }

    #[test]
    fn an_empty_window_renders_nothing() {
        let config = FractalConfig {
            bounds: Bounds {
                r_min: 1.0,
                r_max: 1.0,
                i_min: -1.0,
                i_max: 1.0,
            },
            ..FractalConfig::default()
        };
        let mut engine =
            Mandelbrot::new(config, ColorMap::Grayscale, Execution::Parallel(4)).unwrap();
        engine.generate_image();
        assert_eq!(engine.cols(), 0);
        assert!(engine.pixels().is_empty());
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let zero_res = FractalConfig {
            resolution: 0.0,
            ..FractalConfig::default()
        };
        let nan_res = FractalConfig {
            resolution: ::std::f64::NAN,
            ..FractalConfig::default()
        };
        let inverted = FractalConfig {
            bounds: Bounds {
                r_min: 2.0,
                r_max: -2.0,
                i_min: -1.0,
                i_max: 1.0,
            },
            ..FractalConfig::default()
        };
        for config in &[zero_res, nan_res, inverted] {
            match Mandelbrot::new(*config, ColorMap::Grayscale, Execution::Sequential) {
                Err(Error::Config(_)) => {}
                Err(e) => panic!("wrong error variant: {}", e),
                Ok(_) => panic!("expected a configuration error"),
            }
        }
    }

    #[test]
    fn saved_images_reload_exactly() {
        let dir = ::tempfile::tempdir().unwrap();
        let path = dir.path().join("window.ppm");
        let mut engine = Mandelbrot::new(
            FractalConfig::default(),
            ColorMap::Gradient,
            Execution::Sequential,
        )
        .unwrap();
        engine.generate_image();
        engine.save_image(&path).unwrap();

        let mut file = File::open(&path).unwrap();
        let (cols, rows, pixels) = ::ppm::read_ppm(&mut file).unwrap();
        assert_eq!((cols, rows), (engine.cols(), engine.rows()));
        assert_eq!(pixels.as_slice(), engine.pixels());
        assert_eq!(pixels[cols + 1], engine.pixel(1, 1));
    }

    #[test]
    fn saving_into_a_missing_directory_reports_the_path() {
        let dir = ::tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("window.ppm");
        let engine = Mandelbrot::new(
            FractalConfig::default(),
            ColorMap::Grayscale,
            Execution::Sequential,
        )
        .unwrap();
        match engine.save_image(&path) {
            Err(Error::Io { .. }) => {}
            Err(e) => panic!("wrong error variant: {}", e),
            Ok(_) => panic!("expected an I/O error"),
        }
    }
}
