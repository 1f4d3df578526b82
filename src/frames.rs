// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Zoom sequences: a run of frames closing in on one point.
//!
//! A sequence fixes a center and shrinks both the sampling resolution
//! and the window by the same factor each frame, so every frame keeps
//! the same pixel dimensions while the view narrows. Frames are
//! independent of each other, which makes the sequence the second
//! place worth parallelizing: whole frames are handed out to a worker
//! pool, and each worker runs its frame on the sequential engine so
//! the per-cell pool and the per-frame pool never stack.

extern crate crossbeam;
extern crate num;

use std::cmp;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use num::Complex;

use color::ColorMap;
use error::Error;
use mandelbrot::{Bounds, Execution, FractalConfig, Mandelbrot, MAX_WORKERS};

/// Iteration budget used for every frame of a sequence.
pub const FRAME_MAX_ITER: u32 = 100;

/// Escape threshold used for every frame of a sequence.
pub const FRAME_THRESHOLD: f64 = 2.0;

/// Width of the frame-zero window, in complex-plane units.
pub const STANDARD_WIDTH: f64 = 4.0;

/// Height of the frame-zero window, in complex-plane units.
pub const STANDARD_HEIGHT: f64 = 4.0;

/// The named zoom targets. Each is a point on the boundary of the set
/// where the view stays interesting at any depth.
pub const REGIONS: [(&str, (f64, f64)); 3] = [
    ("Seahorse", (-0.743643887037151, 0.131825904205330)),
    ("Elephant Valley", (0.282, 0.5307)),
    ("Feigenbaum", (-1.401155, 0.0)),
];

/// Looks up a zoom target by name. Names are matched exactly,
/// including case.
pub fn region_center(name: &str) -> Option<Complex<f64>> {
    for &(preset, (re, im)) in REGIONS.iter() {
        if preset == name {
            return Some(Complex::new(re, im));
        }
    }
    None
}

/// Where one frame sits along a zoom trajectory.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSpec {
    /// Position in the sequence; frame zero is the widest view.
    pub index: usize,
    /// Sample spacing for this frame.
    pub resolution: f64,
    /// View window for this frame, centered on the zoom target.
    pub bounds: Bounds,
}

impl FrameSpec {
    /// Parameters for frame `index`: the resolution divides by
    /// `zoom_factor` once per frame, and the window shrinks in
    /// proportion around `center`, so the pixel dimensions hold steady
    /// while the view narrows.
    pub fn new(
        index: usize,
        center: Complex<f64>,
        zoom_factor: f64,
        base_resolution: f64,
    ) -> FrameSpec {
        let resolution = base_resolution / zoom_factor.powi(index as i32);
        let scale = resolution / base_resolution;
        FrameSpec {
            index,
            resolution,
            bounds: Bounds::centered(center, STANDARD_WIDTH * scale, STANDARD_HEIGHT * scale),
        }
    }

    /// The engine configuration for this frame.
    pub fn config(&self) -> FractalConfig {
        FractalConfig {
            max_iter: FRAME_MAX_ITER,
            threshold: FRAME_THRESHOLD,
            resolution: self.resolution,
            bounds: self.bounds,
        }
    }

    /// The frame's file name, zero-padded so a directory listing sorts
    /// in sequence order.
    pub fn file_name(&self) -> String {
        format!("frame_{:04}.ppm", self.index)
    }
}

/// One zoom run: the trajectory, the pool size, and where the frames
/// go.
#[derive(Clone, Debug)]
pub struct ZoomSequence {
    /// Upper bound on concurrent frame workers, clamped to
    /// `1..=MAX_WORKERS`.
    pub max_procs: usize,
    /// How many frames to compute.
    pub n_frames: usize,
    /// Name of the zoom target; see `REGIONS`.
    pub region: String,
    /// When false, every frame is still computed but nothing is
    /// written. Useful for timing runs.
    pub save_frames: bool,
    /// Directory that receives the `frame_NNNN.ppm` files. It must
    /// already exist.
    pub output_dir: PathBuf,
    /// Per-frame shrink factor; values above one zoom in.
    pub zoom_factor: f64,
    /// Sample spacing of frame zero.
    pub base_resolution: f64,
    /// Color mapping applied to every frame.
    pub color: ColorMap,
}

impl ZoomSequence {
    /// Validates the run, then computes every frame on a worker pool.
    ///
    /// Configuration problems fail the whole run before any compute
    /// starts. Once frames are in flight, a frame that cannot be
    /// rendered or written is reported on stderr and skipped; its
    /// siblings still complete.
    pub fn generate(&self) -> Result<(), Error> {
        let center = match region_center(&self.region) {
            Some(center) => center,
            None => {
                return Err(Error::Config(format!("unknown region \"{}\"", self.region)));
            }
        };
        if !(self.zoom_factor > 0.0 && self.zoom_factor.is_finite()) {
            return Err(Error::Config(format!(
                "zoom factor must be a positive finite number, got {}",
                self.zoom_factor
            )));
        }
        if !(self.base_resolution > 0.0 && self.base_resolution.is_finite()) {
            return Err(Error::Config(format!(
                "base resolution must be a positive finite number, got {}",
                self.base_resolution
            )));
        }

        let workers = cmp::max(
            1,
            cmp::min(
                cmp::min(self.max_procs, MAX_WORKERS),
                cmp::max(self.n_frames, 1),
            ),
        );
        let started = Instant::now();
        let queue = Arc::new(Mutex::new(0..self.n_frames));
        crossbeam::scope(|spawner| {
            for worker in 0..workers {
                let queue = queue.clone();
                spawner.spawn(move |_| loop {
                    let frame = { queue.lock().unwrap().next() };
                    match frame {
                        Some(index) => self.render_frame(worker, index, center),
                        None => break,
                    }
                });
            }
        })
        .unwrap();
        println!(
            "generated {} frames in {:.10} seconds",
            self.n_frames,
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    fn render_frame(&self, worker: usize, index: usize, center: Complex<f64>) {
        let spec = FrameSpec::new(index, center, self.zoom_factor, self.base_resolution);
        let mut engine = match Mandelbrot::new(spec.config(), self.color, Execution::Sequential) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("frame {}: {}", index, e);
                return;
            }
        };
        engine.generate_image();
        if self.save_frames {
            let path = self.output_dir.join(spec.file_name());
            if let Err(e) = engine.save_image(&path) {
                eprintln!("frame {}: {}", index, e);
                return;
            }
        }
        println!(
            "thread {:3}: frame {:4} of {:4} at resolution {:.10}",
            worker, index, self.n_frames, spec.resolution
        );
    }
}
