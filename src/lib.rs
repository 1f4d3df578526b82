#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot zoom renderer
//!
//! The Mandelbrot set lives on the complex plane: a point `c` belongs
//! to it when the sequence `z = z * z + c` never runs off to infinity.
//! This crate measures the opposite, how *quickly* each point escapes.
//! A window of the plane is sampled on a fixed-resolution grid, every
//! sample is iterated until its magnitude crosses a threshold or an
//! iteration budget runs out, and the surviving count is mapped to a
//! color. Points that never escape come out black; the halo around
//! the set shades by its escape velocity.
//!
//! One such window is a single image. The more interesting product is
//! a zoom sequence: hundreds of frames sharing one center, each
//! sampled at a finer resolution over a proportionally smaller window,
//! ready to be stitched into a film of the set's boundary unfolding.
//! Single images parallelize across grid cells; sequences parallelize
//! across whole frames.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate itertools;
extern crate num;

#[cfg(test)]
extern crate rand;
#[cfg(test)]
extern crate tempfile;

pub mod bench;
pub mod color;
pub mod complex;
pub mod error;
pub mod frames;
pub mod mandelbrot;
pub mod ppm;

pub use bench::Benchmark;
pub use color::{ColorMap, Rgb};
pub use error::Error;
pub use frames::{region_center, FrameSpec, ZoomSequence};
pub use mandelbrot::{escape_time, Bounds, Execution, FractalConfig, Mandelbrot, MAX_WORKERS};
