//! Failure taxonomy for the renderer.
//!
//! Configuration problems are fatal and reported before any compute
//! starts. Output problems are scoped to the file that failed so that
//! sibling frames in a sequence can still complete.

use std::io;

/// Everything that can go wrong while configuring or running a render.
#[derive(Debug, Fail)]
pub enum Error {
    /// The requested run was invalid and nothing was computed.
    #[fail(display = "configuration error: {}", _0)]
    Config(String),

    /// An output file could not be created or written.
    #[fail(display = "could not write {}: {}", path, cause)]
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O failure.
        cause: io::Error,
    },

    /// Unit normalization was requested for a zero-magnitude value.
    #[fail(display = "cannot normalize a complex number of zero magnitude")]
    ZeroMagnitude,
}
