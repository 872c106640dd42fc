//! Cosine colour gradient: `c(t) = clamp01(a + b * cos((c * t + d) * 2π))`
//! evaluated independently for red, green and blue.

use std::f32::consts::TAU;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Gradient coefficients, one `Vec4` per channel packed as (A, B, C, D):
/// bias, amplitude, frequency, phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosineGradient {
    pub red: Vec4,
    pub green: Vec4,
    pub blue: Vec4,
}

impl Default for CosineGradient {
    fn default() -> Self {
        Self {
            red: Vec4::new(0.5, 0.5, 1.0, 0.0),
            green: Vec4::new(0.5, 0.5, 1.0, 0.333),
            blue: Vec4::new(0.5, 0.5, 1.0, 0.665),
        }
    }
}

/// Gradient coefficients in the form the draw shader consumes.
/// C and D are pre-multiplied by 2π. Must match `GradientCoeffs` in the tube shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GradientUniforms {
    pub a: [f32; 4],
    pub b: [f32; 4],
    pub c2: [f32; 4],
    pub d2: [f32; 4],
}

impl CosineGradient {
    /// Bias of each channel, packed (r, g, b).
    pub fn coeffs_a(&self) -> Vec3 {
        Vec3::new(self.red.x, self.green.x, self.blue.x)
    }

    /// Amplitude of each channel, packed (r, g, b).
    pub fn coeffs_b(&self) -> Vec3 {
        Vec3::new(self.red.y, self.green.y, self.blue.y)
    }

    /// Frequency of each channel, packed (r, g, b).
    pub fn coeffs_c(&self) -> Vec3 {
        Vec3::new(self.red.z, self.green.z, self.blue.z)
    }

    /// Frequency multiplied by 2π.
    pub fn coeffs_c2(&self) -> Vec3 {
        self.coeffs_c() * TAU
    }

    /// Phase of each channel, packed (r, g, b).
    pub fn coeffs_d(&self) -> Vec3 {
        Vec3::new(self.red.w, self.green.w, self.blue.w)
    }

    /// Phase multiplied by 2π.
    pub fn coeffs_d2(&self) -> Vec3 {
        self.coeffs_d() * TAU
    }

    /// Evaluate the colour at `t`. Each channel is clamped to [0, 1].
    pub fn evaluate(&self, t: f32) -> Vec3 {
        let channel = |k: Vec4| (k.x + k.y * ((k.z * t + k.w) * TAU).cos()).clamp(0.0, 1.0);
        Vec3::new(channel(self.red), channel(self.green), channel(self.blue))
    }

    pub fn to_uniforms(&self) -> GradientUniforms {
        GradientUniforms {
            a: self.coeffs_a().extend(0.0).to_array(),
            b: self.coeffs_b().extend(0.0).to_array(),
            c2: self.coeffs_c2().extend(0.0).to_array(),
            d2: self.coeffs_d2().extend(0.0).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_red_at_zero_is_one() {
        let g = CosineGradient::default();
        let c = g.evaluate(0.0);
        assert!((c.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_default_red_at_half_is_zero() {
        let g = CosineGradient::default();
        // cos(π) = -1 → 0.5 - 0.5 = 0
        assert!(g.evaluate(0.5).x.abs() < 1e-6);
    }

    #[test]
    fn test_channels_clamped() {
        let g = CosineGradient {
            red: Vec4::new(1.0, 1.0, 0.0, 0.0),
            green: Vec4::new(-1.0, 0.5, 0.0, 0.0),
            blue: Vec4::new(0.25, 0.0, 3.0, 0.1),
        };
        let c = g.evaluate(0.7);
        assert_eq!(c.x, 1.0);
        assert_eq!(c.y, 0.0);
        assert!((c.z - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_uniforms_premultiply_c_and_d() {
        let g = CosineGradient::default();
        let u = g.to_uniforms();
        assert_eq!(u.a, [0.5, 0.5, 0.5, 0.0]);
        assert!((u.c2[0] - TAU).abs() < 1e-6);
        assert!((u.d2[1] - 0.333 * TAU).abs() < 1e-5);
        assert!((u.d2[2] - 0.665 * TAU).abs() < 1e-5);
    }

    #[test]
    fn test_uniforms_size() {
        assert_eq!(std::mem::size_of::<GradientUniforms>(), 64);
    }
}
