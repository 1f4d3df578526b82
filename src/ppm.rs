//! Plain-text portable pixmap (P3) serialization.
//!
//! The layout is fixed: a `P3` magic line, `<cols> <rows>`, the maximum
//! channel value `255`, then one line per pixel row where every pixel is
//! written as `r g b ` with a trailing space. `read_ppm` parses exactly
//! the files `write_ppm` produces (plus any whitespace-equivalent
//! variation, since P3 is whitespace-delimited).

use std::io::{self, Read, Write};
use std::str::FromStr;

use color::Rgb;

/// Serializes a row-major pixel buffer as P3 text.
///
/// `pixels` must hold exactly `rows * cols` entries.
pub fn write_ppm<W: Write>(
    out: &mut W,
    cols: usize,
    rows: usize,
    pixels: &[Rgb],
) -> io::Result<()> {
    assert_eq!(pixels.len(), rows * cols);
    write!(out, "P3\n{} {}\n255\n", cols, rows)?;
    for i in 0..rows {
        for j in 0..cols {
            let Rgb(r, g, b) = pixels[i * cols + j];
            write!(out, "{} {} {} ", r, g, b)?;
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Parses a P3 pixmap back into `(cols, rows, pixels)`.
///
/// Only the 8-bit form (maximum channel value 255) is accepted.
pub fn read_ppm<R: Read>(input: &mut R) -> io::Result<(usize, usize, Vec<Rgb>)> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    let mut tokens = text.split_whitespace();
    if tokens.next() != Some("P3") {
        return Err(malformed("missing P3 magic"));
    }
    let cols: usize = expect_number(&mut tokens, "column count")?;
    let rows: usize = expect_number(&mut tokens, "row count")?;
    let maxval: usize = expect_number(&mut tokens, "maximum channel value")?;
    if maxval != 255 {
        return Err(malformed("maximum channel value is not 255"));
    }
    let mut pixels = Vec::with_capacity(rows * cols);
    for _ in 0..rows * cols {
        let r: u8 = expect_number(&mut tokens, "red channel")?;
        let g: u8 = expect_number(&mut tokens, "green channel")?;
        let b: u8 = expect_number(&mut tokens, "blue channel")?;
        pixels.push(Rgb(r, g, b));
    }
    Ok((cols, rows, pixels))
}

fn expect_number<'a, I, T>(tokens: &mut I, what: &str) -> io::Result<T>
where
    I: Iterator<Item = &'a str>,
    T: FromStr,
{
    match tokens.next() {
        Some(token) => token.parse().map_err(|_| malformed(what)),
        None => Err(malformed(what)),
    }
}

fn malformed(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("malformed ppm: {}", what))
}
