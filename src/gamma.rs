// Gamma-correct compositing of the ink/overlay layers onto the screen.
// Lookup tables replace powf in the per-pixel blend.

use crate::error::Error;
use crate::types::FrameBuffer;

pub struct GammaLut {
    // sRGB(0..255) -> linear (0..1) as f32
    srgb_to_linear: [f32; 256],
    // linear(0..1) -> sRGB(0..255) via 4096-step quantization
    // (index = (linear * 4095).round())
    linear_to_srgb: [u8; 4096],
}

impl Default for GammaLut {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaLut {
    /// Build both tables once at startup.
    pub fn new() -> Self {
        let mut s2l = [0.0f32; 256];
        for (v, slot) in s2l.iter_mut().enumerate() {
            let c = v as f32 / 255.0;
            *slot = if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
        }

        let mut l2s = [0u8; 4096];
        for (i, slot) in l2s.iter_mut().enumerate() {
            let l = (i as f32) / 4095.0;
            let s = if l <= 0.003_130_8 { 12.92 * l } else { 1.055 * l.powf(1.0 / 2.4) - 0.055 };
            *slot = (s * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self { srgb_to_linear: s2l, linear_to_srgb: l2s }
    }

    #[inline]
    pub fn srgb_u8_to_linear(&self, v: u8) -> f32 {
        self.srgb_to_linear[v as usize]
    }

    #[inline]
    pub fn linear_to_srgb_u8(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * 4095.0).round() as usize;
        self.linear_to_srgb[idx]
    }

    /// Mix one channel: `a` of `top` over `1-a` of `bottom`, in linear light.
    #[inline]
    fn mix(&self, bottom: u32, top: u32, a: f32) -> u32 {
        let b = self.srgb_u8_to_linear(bottom as u8);
        let t = self.srgb_u8_to_linear(top as u8);
        self.linear_to_srgb_u8(a * t + (1.0 - a) * b) as u32
    }
}

/// Composite an 0xAARRGGBB layer over an 0x00RRGGBB screen in place.
/// Alpha 0 keeps the screen pixel, alpha 255 replaces it.
pub fn blend_layer(screen: &mut FrameBuffer, layer: &FrameBuffer, lut: &GammaLut) -> Result<(), Error> {
    if screen.width != layer.width || screen.height != layer.height {
        return Err(Error::WindowUpdate(format!(
            "blend: layer is {}x{}, screen is {}x{}",
            layer.width, layer.height, screen.width, screen.height
        )));
    }

    for (dst, &src) in screen.pixels.iter_mut().zip(layer.pixels.iter()) {
        let alpha = src >> 24;
        if alpha == 0 {
            continue;
        }
        if alpha == 0xFF {
            *dst = src & 0x00FF_FFFF;
            continue;
        }

        let a = alpha as f32 / 255.0;
        let r = lut.mix((*dst >> 16) & 0xFF, (src >> 16) & 0xFF, a);
        let g = lut.mix((*dst >> 8) & 0xFF, (src >> 8) & 0xFF, a);
        let b = lut.mix(*dst & 0xFF, src & 0xFF, a);
        *dst = (r << 16) | (g << 8) | b;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_hit_the_endpoints() {
        let lut = GammaLut::new();
        assert_eq!(lut.srgb_u8_to_linear(0), 0.0);
        assert!((lut.srgb_u8_to_linear(255) - 1.0).abs() < 1e-6);
        assert_eq!(lut.linear_to_srgb_u8(0.0), 0);
        assert_eq!(lut.linear_to_srgb_u8(1.0), 255);
        assert_eq!(lut.linear_to_srgb_u8(2.0), 255);
    }

    #[test]
    fn transparent_and_opaque_pixels() {
        let lut = GammaLut::new();
        let mut screen = FrameBuffer::filled(2, 1, 0x00_10_20_30);
        let layer = FrameBuffer { width: 2, height: 1, pixels: vec![0x00_FF_FF_FF, 0xFF_AA_BB_CC] };
        blend_layer(&mut screen, &layer, &lut).unwrap();
        assert_eq!(screen.pixels, vec![0x00_10_20_30, 0x00_AA_BB_CC]);
    }

    #[test]
    fn half_alpha_lands_between() {
        let lut = GammaLut::new();
        let mut screen = FrameBuffer::filled(1, 1, 0x00_00_00_00);
        let layer = FrameBuffer { width: 1, height: 1, pixels: vec![0x80_FF_FF_FF] };
        blend_layer(&mut screen, &layer, &lut).unwrap();
        let r = (screen.pixels[0] >> 16) & 0xFF;
        // linear-light half of white is brighter than sRGB 128
        assert!(r > 128 && r < 255, "r = {r}");
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let lut = GammaLut::new();
        let mut screen = FrameBuffer::filled(2, 2, 0);
        let layer = FrameBuffer::transparent(1, 1);
        assert!(blend_layer(&mut screen, &layer, &lut).is_err());
    }
}
