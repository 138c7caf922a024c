//! Reversible color transform (RCT) between RGB and Y/U/V
//!
//! Forward: `Y = (R + 2G + B) >> 2`, `U = R - G`, `V = B - G`.
//! Inverse: `G = Y - ((U + V) >> 2)`, `R = U + G`, `B = V + G`, truncated to 8 bits.
//! Since `R + 2G + B = 4G + U + V`, the floor in the forward shift is undone exactly
//! by the arithmetic shift in the inverse.

use crate::error::{ReduceError, Result};

/// An 8-bit RGB pixel (no alpha)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb {
    /// Create a pixel from its components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// All-zero pixel
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
}

impl From<image::Rgb<u8>> for Rgb {
    fn from(px: image::Rgb<u8>) -> Self {
        let [r, g, b] = px.0;
        Rgb { r, g, b }
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(px: Rgb) -> Self {
        image::Rgb([px.r, px.g, px.b])
    }
}

/// A transformed pixel. U and V are differences and need the signed 16-bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Yuv {
    /// Luma, always within 0..=255
    pub y: u8,
    /// R - G
    pub u: i16,
    /// B - G
    pub v: i16,
}

/// `(r + 2g + b) >> 2`
pub fn luma(r: i32, g: i32, b: i32) -> i32 {
    (r + 2 * g + b) >> 2
}

/// `(r - g, b - g)`
pub fn chroma(r: i32, g: i32, b: i32) -> (i32, i32) {
    (r - g, b - g)
}

/// Forward transform. Fails with [`ReduceError::TransformRange`] if luma leaves 0..=255,
/// which can only happen on corrupted input.
pub fn forward(px: Rgb) -> Result<Yuv> {
    let (r, g, b) = (i32::from(px.r), i32::from(px.g), i32::from(px.b));
    let y = luma(r, g, b);
    let y = u8::try_from(y).map_err(|_| ReduceError::TransformRange { y })?;
    let (u, v) = chroma(r, g, b);
    Ok(Yuv {
        y,
        u: u as i16,
        v: v as i16,
    })
}

/// Inverse transform. Total: values wrap modulo 256 on write-back.
pub fn inverse(px: Yuv) -> Rgb {
    let (y, u, v) = (i32::from(px.y), i32::from(px.u), i32::from(px.v));
    let g = y - ((u + v) >> 2);
    let r = u + g;
    let b = v + g;
    Rgb {
        r: r as u8,
        g: g as u8,
        b: b as u8,
    }
}
