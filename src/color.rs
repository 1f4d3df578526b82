//! Mapping escape-time counts onto pixel colors.

/// One 8-bit RGB pixel, channels in red, green, blue order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// How an iteration count becomes a pixel.
///
/// Both mappings take the raw count and the iteration budget it was
/// measured against, so one map can shade frames rendered at different
/// budgets consistently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMap {
    /// White for instant escape, shading down to black for points that
    /// exhaust the budget. Interior points land on pure black.
    Grayscale,
    /// A polynomial palette in `k = sqrt(iter / max_iter)`. Both ends of
    /// the scale are dark; the bands between glow.
    Gradient,
}

impl ColorMap {
    /// Shades one cell. `iter` at or above `max_iter` means the point
    /// never escaped.
    pub fn shade(self, iter: u32, max_iter: u32) -> Rgb {
        match self {
            ColorMap::Grayscale => grayscale(iter, max_iter),
            ColorMap::Gradient => gradient(iter, max_iter),
        }
    }
}

impl Default for ColorMap {
    fn default() -> ColorMap {
        ColorMap::Grayscale
    }
}

fn grayscale(iter: u32, max_iter: u32) -> Rgb {
    if max_iter == 0 {
        return Rgb(0, 0, 0);
    }
    // Integer arithmetic, widened so 255 * remaining cannot overflow.
    let remaining = u64::from(max_iter.saturating_sub(iter));
    let value = (255 * remaining / u64::from(max_iter)).min(255) as u8;
    Rgb(value, value, value)
}

fn gradient(iter: u32, max_iter: u32) -> Rgb {
    if max_iter == 0 {
        return Rgb(0, 0, 0);
    }
    let k = (f64::from(iter) / f64::from(max_iter)).sqrt();
    let k1 = 1.0 - k;
    // Each polynomial peaks below 1.0 on [0, 1], so the channels never
    // need clamping.
    let r = (9.0 * k1 * k.powi(3) * 255.0).floor();
    let g = (15.0 * k1.powi(2) * k.powi(2) * 255.0).floor();
    let b = (8.5 * k1.powi(3) * k * 255.0).floor();
    Rgb(r as u8, g as u8, b as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_spans_white_to_black() {
        assert_eq!(ColorMap::Grayscale.shade(0, 1000), Rgb(255, 255, 255));
        assert_eq!(ColorMap::Grayscale.shade(1000, 1000), Rgb(0, 0, 0));
        // Integer division truncates: 255 * 999 / 1000.
        assert_eq!(ColorMap::Grayscale.shade(1, 1000), Rgb(254, 254, 254));
    }

    #[test]
    fn grayscale_darkens_monotonically() {
        let mut last = 255;
        for iter in 0..=100 {
            let Rgb(r, g, b) = ColorMap::Grayscale.shade(iter, 100);
            assert_eq!(r, g);
            assert_eq!(g, b);
            assert!(r <= last);
            last = r;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn gradient_matches_the_polynomials() {
        // k = sqrt(25 / 100) = 0.5 exactly, so every factor below is an
        // exact binary fraction and the floors are unambiguous.
        assert_eq!(ColorMap::Gradient.shade(25, 100), Rgb(143, 239, 135));
    }

    #[test]
    fn gradient_is_dark_at_both_ends() {
        assert_eq!(ColorMap::Gradient.shade(0, 100), Rgb(0, 0, 0));
        assert_eq!(ColorMap::Gradient.shade(100, 100), Rgb(0, 0, 0));
    }

    #[test]
    fn degenerate_budget_shades_black() {
        assert_eq!(ColorMap::Grayscale.shade(0, 0), Rgb(0, 0, 0));
        assert_eq!(ColorMap::Gradient.shade(0, 0), Rgb(0, 0, 0));
    }

    #[test]
    fn counts_past_the_budget_stay_black() {
        assert_eq!(ColorMap::Grayscale.shade(2000, 1000), Rgb(0, 0, 0));
    }
}
