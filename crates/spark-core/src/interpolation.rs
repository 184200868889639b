//! Easing curves mapping normalized progress in [0, 1] to eased progress.
//!
//! Every curve is a stateless preset addressed by a stable numeric id (its
//! position in [`Interpolation::ALL`]) and a snake_case name. Definitions
//! are written by name and read back from either form.

use crate::{Result, SparkError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::f32::consts::PI;

/// A named easing curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpolation {
    #[default]
    Linear,
    Smooth,
    Smooth2,
    Smoother,
    Fade,
    Pow2,
    Pow2In,
    Pow2Out,
    Pow2InInverse,
    Pow2OutInverse,
    Pow3,
    Pow3In,
    Pow3Out,
    Pow3InInverse,
    Pow3OutInverse,
    Pow4,
    Pow4In,
    Pow4Out,
    Pow5,
    Pow5In,
    Pow5Out,
    Sine,
    SineIn,
    SineOut,
    Exp10,
    Exp10In,
    Exp10Out,
    Exp5,
    Exp5In,
    Exp5Out,
    Circle,
    CircleIn,
    CircleOut,
    Elastic,
    ElasticIn,
    ElasticOut,
    Swing,
    SwingIn,
    SwingOut,
    Bounce,
    BounceIn,
    BounceOut,
}

const EPSILON: f32 = 0.000_001;

// Four-bounce table, first width already doubled.
const BOUNCE_WIDTHS: [f32; 4] = [0.68, 0.34, 0.2, 0.15];
const BOUNCE_HEIGHTS: [f32; 4] = [1.0, 0.26, 0.11, 0.03];

impl Interpolation {
    /// Every curve, ordered by id.
    pub const ALL: [Interpolation; 42] = [
        Interpolation::Linear,
        Interpolation::Smooth,
        Interpolation::Smooth2,
        Interpolation::Smoother,
        Interpolation::Fade,
        Interpolation::Pow2,
        Interpolation::Pow2In,
        Interpolation::Pow2Out,
        Interpolation::Pow2InInverse,
        Interpolation::Pow2OutInverse,
        Interpolation::Pow3,
        Interpolation::Pow3In,
        Interpolation::Pow3Out,
        Interpolation::Pow3InInverse,
        Interpolation::Pow3OutInverse,
        Interpolation::Pow4,
        Interpolation::Pow4In,
        Interpolation::Pow4Out,
        Interpolation::Pow5,
        Interpolation::Pow5In,
        Interpolation::Pow5Out,
        Interpolation::Sine,
        Interpolation::SineIn,
        Interpolation::SineOut,
        Interpolation::Exp10,
        Interpolation::Exp10In,
        Interpolation::Exp10Out,
        Interpolation::Exp5,
        Interpolation::Exp5In,
        Interpolation::Exp5Out,
        Interpolation::Circle,
        Interpolation::CircleIn,
        Interpolation::CircleOut,
        Interpolation::Elastic,
        Interpolation::ElasticIn,
        Interpolation::ElasticOut,
        Interpolation::Swing,
        Interpolation::SwingIn,
        Interpolation::SwingOut,
        Interpolation::Bounce,
        Interpolation::BounceIn,
        Interpolation::BounceOut,
    ];

    /// Stable persistence id.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Look up a curve by its persistence id.
    pub fn from_id(id: u32) -> Result<Self> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| SparkError::UnknownInterpolation(format!("id {id}")))
    }

    /// Look up a curve by name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.name() == name)
            .ok_or_else(|| SparkError::UnknownInterpolation(name.to_string()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Linear => "linear",
            Interpolation::Smooth => "smooth",
            Interpolation::Smooth2 => "smooth2",
            Interpolation::Smoother => "smoother",
            Interpolation::Fade => "fade",
            Interpolation::Pow2 => "pow2",
            Interpolation::Pow2In => "pow2_in",
            Interpolation::Pow2Out => "pow2_out",
            Interpolation::Pow2InInverse => "pow2_in_inverse",
            Interpolation::Pow2OutInverse => "pow2_out_inverse",
            Interpolation::Pow3 => "pow3",
            Interpolation::Pow3In => "pow3_in",
            Interpolation::Pow3Out => "pow3_out",
            Interpolation::Pow3InInverse => "pow3_in_inverse",
            Interpolation::Pow3OutInverse => "pow3_out_inverse",
            Interpolation::Pow4 => "pow4",
            Interpolation::Pow4In => "pow4_in",
            Interpolation::Pow4Out => "pow4_out",
            Interpolation::Pow5 => "pow5",
            Interpolation::Pow5In => "pow5_in",
            Interpolation::Pow5Out => "pow5_out",
            Interpolation::Sine => "sine",
            Interpolation::SineIn => "sine_in",
            Interpolation::SineOut => "sine_out",
            Interpolation::Exp10 => "exp10",
            Interpolation::Exp10In => "exp10_in",
            Interpolation::Exp10Out => "exp10_out",
            Interpolation::Exp5 => "exp5",
            Interpolation::Exp5In => "exp5_in",
            Interpolation::Exp5Out => "exp5_out",
            Interpolation::Circle => "circle",
            Interpolation::CircleIn => "circle_in",
            Interpolation::CircleOut => "circle_out",
            Interpolation::Elastic => "elastic",
            Interpolation::ElasticIn => "elastic_in",
            Interpolation::ElasticOut => "elastic_out",
            Interpolation::Swing => "swing",
            Interpolation::SwingIn => "swing_in",
            Interpolation::SwingOut => "swing_out",
            Interpolation::Bounce => "bounce",
            Interpolation::BounceIn => "bounce_in",
            Interpolation::BounceOut => "bounce_out",
        }
    }

    /// Map progress `a` in [0, 1] to eased progress.
    pub fn apply(self, a: f32) -> f32 {
        match self {
            Interpolation::Linear => a,
            Interpolation::Smooth => a * a * (3.0 - 2.0 * a),
            Interpolation::Smooth2 => {
                let a = a * a * (3.0 - 2.0 * a);
                a * a * (3.0 - 2.0 * a)
            }
            Interpolation::Smoother | Interpolation::Fade => {
                a * a * a * (a * (a * 6.0 - 15.0) + 10.0)
            }
            Interpolation::Pow2 => pow_in_out(a, 2),
            Interpolation::Pow2In => a.powi(2),
            Interpolation::Pow2Out => pow_out(a, 2),
            Interpolation::Pow2InInverse => {
                if a < EPSILON {
                    0.0
                } else {
                    a.sqrt()
                }
            }
            Interpolation::Pow2OutInverse => {
                if a < EPSILON {
                    0.0
                } else if a > 1.0 {
                    1.0
                } else {
                    1.0 - (1.0 - a).sqrt()
                }
            }
            Interpolation::Pow3 => pow_in_out(a, 3),
            Interpolation::Pow3In => a.powi(3),
            Interpolation::Pow3Out => pow_out(a, 3),
            Interpolation::Pow3InInverse => a.cbrt(),
            Interpolation::Pow3OutInverse => 1.0 - (1.0 - a).cbrt(),
            Interpolation::Pow4 => pow_in_out(a, 4),
            Interpolation::Pow4In => a.powi(4),
            Interpolation::Pow4Out => pow_out(a, 4),
            Interpolation::Pow5 => pow_in_out(a, 5),
            Interpolation::Pow5In => a.powi(5),
            Interpolation::Pow5Out => pow_out(a, 5),
            Interpolation::Sine => (1.0 - (a * PI).cos()) / 2.0,
            Interpolation::SineIn => 1.0 - (a * PI / 2.0).cos(),
            Interpolation::SineOut => (a * PI / 2.0).sin(),
            Interpolation::Exp10 => exp_in_out(a, 2.0, 10.0),
            Interpolation::Exp10In => exp_in(a, 2.0, 10.0),
            Interpolation::Exp10Out => exp_out(a, 2.0, 10.0),
            Interpolation::Exp5 => exp_in_out(a, 2.0, 5.0),
            Interpolation::Exp5In => exp_in(a, 2.0, 5.0),
            Interpolation::Exp5Out => exp_out(a, 2.0, 5.0),
            Interpolation::Circle => {
                if a <= 0.5 {
                    let a = a * 2.0;
                    (1.0 - (1.0 - a * a).sqrt()) / 2.0
                } else {
                    let a = (a - 1.0) * 2.0;
                    ((1.0 - a * a).sqrt() + 1.0) / 2.0
                }
            }
            Interpolation::CircleIn => 1.0 - (1.0 - a * a).sqrt(),
            Interpolation::CircleOut => {
                let a = a - 1.0;
                (1.0 - a * a).sqrt()
            }
            Interpolation::Elastic => {
                if a <= 0.5 {
                    elastic_in(a * 2.0) / 2.0
                } else {
                    1.0 - elastic_in((1.0 - a) * 2.0) / 2.0
                }
            }
            Interpolation::ElasticIn => elastic_in(a),
            Interpolation::ElasticOut => 1.0 - elastic_in(1.0 - a),
            Interpolation::Swing => {
                let scale = 3.0;
                if a <= 0.5 {
                    let a = a * 2.0;
                    a * a * ((scale + 1.0) * a - scale) / 2.0
                } else {
                    let a = (a - 1.0) * 2.0;
                    a * a * ((scale + 1.0) * a + scale) / 2.0 + 1.0
                }
            }
            Interpolation::SwingIn => {
                let scale = 2.0;
                a * a * ((scale + 1.0) * a - scale)
            }
            Interpolation::SwingOut => {
                let scale = 2.0;
                let a = a - 1.0;
                a * a * ((scale + 1.0) * a + scale) + 1.0
            }
            Interpolation::Bounce => {
                if a <= 0.5 {
                    (1.0 - bounce_edge(1.0 - a * 2.0)) / 2.0
                } else {
                    bounce_edge(a * 2.0 - 1.0) / 2.0 + 0.5
                }
            }
            Interpolation::BounceIn => 1.0 - bounce_out(1.0 - a),
            Interpolation::BounceOut => bounce_out(a),
        }
    }
}

fn pow_in_out(a: f32, power: i32) -> f32 {
    if a <= 0.5 {
        (a * 2.0).powi(power) / 2.0
    } else {
        let divisor = if power % 2 == 0 { -2.0 } else { 2.0 };
        ((a - 1.0) * 2.0).powi(power) / divisor + 1.0
    }
}

fn pow_out(a: f32, power: i32) -> f32 {
    let sign = if power % 2 == 0 { -1.0 } else { 1.0 };
    (a - 1.0).powi(power) * sign + 1.0
}

fn exp_scale(value: f32, power: f32) -> (f32, f32) {
    let min = value.powf(-power);
    (min, 1.0 / (1.0 - min))
}

fn exp_in_out(a: f32, value: f32, power: f32) -> f32 {
    let (min, scale) = exp_scale(value, power);
    if a <= 0.5 {
        (value.powf(power * (a * 2.0 - 1.0)) - min) * scale / 2.0
    } else {
        (2.0 - (value.powf(-power * (a * 2.0 - 1.0)) - min) * scale) / 2.0
    }
}

fn exp_in(a: f32, value: f32, power: f32) -> f32 {
    let (min, scale) = exp_scale(value, power);
    (value.powf(power * (a - 1.0)) - min) * scale
}

fn exp_out(a: f32, value: f32, power: f32) -> f32 {
    let (min, scale) = exp_scale(value, power);
    1.0 - (value.powf(-power * a) - min) * scale
}

fn elastic_in(a: f32) -> f32 {
    2.0f32.powf(10.0 * (a - 1.0)) * (a * 20.0).sin() * 1.0955
}

fn bounce_out(a: f32) -> f32 {
    if a >= 1.0 {
        return 1.0;
    }
    let mut a = a + BOUNCE_WIDTHS[0] / 2.0;
    let mut width = BOUNCE_WIDTHS[0];
    let mut height = BOUNCE_HEIGHTS[0];
    for (w, h) in BOUNCE_WIDTHS.iter().zip(BOUNCE_HEIGHTS.iter()) {
        width = *w;
        if a <= width {
            height = *h;
            break;
        }
        a -= width;
    }
    a /= width;
    let z = 4.0 / width * height * a;
    1.0 - (z - z * a) * width
}

// Mirrored first bounce used by the in-out variant.
fn bounce_edge(a: f32) -> f32 {
    let test = a + BOUNCE_WIDTHS[0] / 2.0;
    if test < BOUNCE_WIDTHS[0] {
        return test / (BOUNCE_WIDTHS[0] / 2.0) - 1.0;
    }
    bounce_out(a)
}

impl Serialize for Interpolation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InterpolationKey {
    Id(u32),
    Name(String),
}

impl<'de> Deserialize<'de> for Interpolation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let resolved = match InterpolationKey::deserialize(deserializer)? {
            InterpolationKey::Id(id) => Interpolation::from_id(id),
            InterpolationKey::Name(name) => Interpolation::from_name(&name),
        };
        resolved.map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_pinned() {
        for curve in Interpolation::ALL {
            let start = curve.apply(0.0);
            let end = curve.apply(1.0);
            assert!(start.abs() < 0.01, "{} starts at {start}", curve.name());
            assert!((end - 1.0).abs() < 0.01, "{} ends at {end}", curve.name());
        }
    }

    #[test]
    fn linear_is_identity() {
        for i in 0..=10 {
            let a = i as f32 / 10.0;
            assert!((Interpolation::Linear.apply(a) - a).abs() < 1e-6);
        }
    }

    #[test]
    fn ids_and_names_are_unique_and_resolvable() {
        for (i, curve) in Interpolation::ALL.iter().enumerate() {
            assert_eq!(curve.id() as usize, i);
            assert_eq!(Interpolation::from_id(curve.id()).unwrap(), *curve);
            assert_eq!(Interpolation::from_name(curve.name()).unwrap(), *curve);
        }
    }

    #[test]
    fn unknown_lookups_fail() {
        assert!(matches!(
            Interpolation::from_id(999),
            Err(SparkError::UnknownInterpolation(_))
        ));
        assert!(Interpolation::from_name("wobble").is_err());
    }

    #[test]
    fn symmetric_curves_hit_midpoint() {
        for curve in [
            Interpolation::Smooth,
            Interpolation::Fade,
            Interpolation::Pow2,
            Interpolation::Pow3,
            Interpolation::Sine,
            Interpolation::Circle,
        ] {
            assert!((curve.apply(0.5) - 0.5).abs() < 1e-4, "{}", curve.name());
        }
    }

    #[test]
    fn deserializes_from_name_or_id() {
        #[derive(Deserialize, Serialize)]
        struct Holder {
            a: Interpolation,
            b: Interpolation,
        }
        let holder: Holder = toml::from_str("a = \"bounce_out\"\nb = 3").unwrap();
        assert_eq!(holder.a, Interpolation::BounceOut);
        assert_eq!(holder.b, Interpolation::Smoother);

        let written = toml::to_string(&holder).unwrap();
        assert!(written.contains("b = \"smoother\""));
    }
}
