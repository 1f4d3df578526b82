//! Small extensions to the `num` complex type.
//!
//! Arithmetic comes straight from `num::Complex`; only the distance
//! measure and unit scaling live here. `magnitude` is spelled out as
//! `sqrt(re * re + im * im)` rather than going through `norm` so the
//! escape test sees exactly this formula, bit for bit.

use num::Complex;

use error::Error;

/// Euclidean distance of `a` from the origin, `sqrt(re² + im²)`.
pub fn magnitude(a: Complex<f64>) -> f64 {
    (a.re * a.re + a.im * a.im).sqrt()
}

/// Scales `a` down to magnitude one, preserving its direction.
///
/// A zero-magnitude input has no direction and is rejected.
pub fn unit(a: Complex<f64>) -> Result<Complex<f64>, Error> {
    let mag = magnitude(a);
    if mag == 0.0 {
        return Err(Error::ZeroMagnitude);
    }
    Ok(Complex::new(a.re / mag, a.im / mag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_follows_the_complex_field() {
        let x = Complex::new(1.5, 2.0);
        let y = Complex::new(3.0, -0.5);
        assert_eq!(x + y, Complex::new(4.5, 1.5));
        assert_eq!(x * y, Complex::new(5.5, 5.25));
    }

    #[test]
    fn magnitude_is_the_euclidean_norm() {
        assert_eq!(magnitude(Complex::new(3.0, 4.0)), 5.0);
        assert_eq!(magnitude(Complex::new(0.0, 0.0)), 0.0);
        assert_eq!(magnitude(Complex::new(-5.0, 0.0)), 5.0);
    }

    #[test]
    fn unit_preserves_direction() {
        let u = unit(Complex::new(3.0, 4.0)).unwrap();
        assert_eq!(u, Complex::new(0.6, 0.8));
        let d = unit(Complex::new(0.0, -2.0)).unwrap();
        assert_eq!(d, Complex::new(0.0, -1.0));
    }

    #[test]
    fn unit_rejects_zero() {
        assert!(unit(Complex::new(0.0, 0.0)).is_err());
    }
}
