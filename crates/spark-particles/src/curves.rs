//! Linear blending between keyframe values

use spark_core::{Color, Vec3};

/// A value that can be linearly interpolated between two keyframes
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f32) -> Self;
}

/// Linear interpolation between two floats
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl Lerp for f32 {
    fn lerp(self, to: Self, t: f32) -> Self {
        lerp_f32(self, to, t)
    }
}

impl Lerp for Vec3 {
    fn lerp(self, to: Self, t: f32) -> Self {
        Vec3::lerp(&self, &to, t)
    }
}

impl Lerp for Color {
    fn lerp(self, to: Self, t: f32) -> Self {
        Color::lerp(&self, &to, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_f32_endpoints() {
        assert!((lerp_f32(0.0, 10.0, 0.0) - 0.0).abs() < 1e-6);
        assert!((lerp_f32(0.0, 10.0, 1.0) - 10.0).abs() < 1e-6);
        assert!((lerp_f32(0.0, 10.0, 0.5) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn lerp_vec3_midpoint() {
        let mid = Lerp::lerp(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0), 0.5);
        assert_eq!(mid, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn lerp_color_midpoint() {
        let mid = Lerp::lerp(Color::WHITE, Color::TRANSPARENT, 0.5);
        for c in mid.to_array() {
            assert!((c - 0.5).abs() < 1e-6);
        }
    }
}
