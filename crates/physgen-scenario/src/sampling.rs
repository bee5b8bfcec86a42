//! Sampling helpers shared by the presets.
//!
//! Ranges accept the same spellings on the command line and in TOML:
//! a scalar (`"0.3"`), a pair (`"0.2,0.3"` or `"[0.2,0.3]"`), and for
//! vectors also `"x,y,z"` or `{"x": .., "y": .., "z": ..}`.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use physgen_types::{Color, PhysgenError, PhysgenResult, Vector3};
use physgen_writer::RigidParams;

/// A closed interval `[min, max]` sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr", into = "RangeRepr")]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RangeRepr {
    Scalar(f32),
    Pair([f32; 2]),
    Text(String),
}

impl TryFrom<RangeRepr> for Range {
    type Error = PhysgenError;

    fn try_from(repr: RangeRepr) -> PhysgenResult<Self> {
        let range = match repr {
            RangeRepr::Scalar(v) => Range::fixed(v),
            RangeRepr::Pair([min, max]) => Range::new(min, max),
            RangeRepr::Text(s) => return Range::parse(&s),
        };
        range.validate("range")?;
        Ok(range)
    }
}

impl From<Range> for RangeRepr {
    fn from(r: Range) -> Self {
        RangeRepr::Pair([r.min, r.max])
    }
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A degenerate range that always samples `v`.
    pub const fn fixed(v: f32) -> Self {
        Self { min: v, max: v }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..self.max)
        }
    }

    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }

    /// Fails unless both ends are finite and `min <= max`.
    pub fn validate(&self, what: &str) -> PhysgenResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PhysgenError::InvalidConfig(format!(
                "{what}: range bounds must be finite, got {self}"
            )));
        }
        if self.min > self.max {
            return Err(PhysgenError::InvalidConfig(format!(
                "{what}: min {} is greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Parses `"v"`, `"min,max"` or `"[min,max]"`.
    pub fn parse(s: &str) -> PhysgenResult<Self> {
        let values = parse_floats(s)?;
        let range = match values.as_slice() {
            [v] => Range::fixed(*v),
            [min, max] => Range::new(*min, *max),
            _ => {
                return Err(PhysgenError::InvalidConfig(format!(
                    "malformed range '{s}': expected a value or 'min,max'"
                )))
            }
        };
        range.validate(s)?;
        Ok(range)
    }

    /// Multiplies both ends by `k`.
    pub fn scaled(self, k: f32) -> Self {
        let (a, b) = (self.min * k, self.max * k);
        Self::new(a.min(b), a.max(b))
    }
}

impl FromStr for Range {
    type Err = PhysgenError;

    fn from_str(s: &str) -> PhysgenResult<Self> {
        Range::parse(s)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.min, self.max)
    }
}

/// Parses `"a,b,..."` or `"[a,b,...]"` into floats.
pub fn parse_floats(s: &str) -> PhysgenResult<Vec<f32>> {
    let trimmed = s.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(trimmed);
    inner
        .split(',')
        .map(|part| {
            part.trim().parse::<f32>().map_err(|_| {
                PhysgenError::InvalidConfig(format!("malformed number '{}' in '{s}'", part.trim()))
            })
        })
        .collect()
}

/// A vector-valued range: one value for every axis, or one range per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "XyzRepr", into = "XyzRepr")]
pub enum XyzSpec {
    Uniform(Range),
    PerAxis { x: Range, y: Range, z: Range },
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum XyzRepr {
    Axes { x: Range, y: Range, z: Range },
    Text(String),
    Single(Range),
}

impl TryFrom<XyzRepr> for XyzSpec {
    type Error = PhysgenError;

    fn try_from(repr: XyzRepr) -> PhysgenResult<Self> {
        match repr {
            XyzRepr::Axes { x, y, z } => Ok(XyzSpec::PerAxis { x, y, z }),
            XyzRepr::Text(s) => XyzSpec::parse(&s),
            XyzRepr::Single(r) => Ok(XyzSpec::Uniform(r)),
        }
    }
}

impl From<XyzSpec> for XyzRepr {
    fn from(spec: XyzSpec) -> Self {
        match spec {
            XyzSpec::Uniform(r) => XyzRepr::Single(r),
            XyzSpec::PerAxis { x, y, z } => XyzRepr::Axes { x, y, z },
        }
    }
}

#[derive(Deserialize)]
struct AxesJson {
    x: Range,
    y: Range,
    z: Range,
}

impl XyzSpec {
    pub const fn fixed(x: f32, y: f32, z: f32) -> Self {
        XyzSpec::PerAxis {
            x: Range::fixed(x),
            y: Range::fixed(y),
            z: Range::fixed(z),
        }
    }

    pub const fn uniform(min: f32, max: f32) -> Self {
        XyzSpec::Uniform(Range::new(min, max))
    }

    /// Parses a range, `"x,y,z"`, or a JSON object with `x`, `y`, `z`.
    pub fn parse(s: &str) -> PhysgenResult<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with('{') {
            let axes: AxesJson = serde_json::from_str(trimmed).map_err(|e| {
                PhysgenError::InvalidConfig(format!("malformed vector '{s}': {e}"))
            })?;
            return Ok(XyzSpec::PerAxis {
                x: axes.x,
                y: axes.y,
                z: axes.z,
            });
        }
        let values = parse_floats(trimmed)?;
        if let [x, y, z] = values.as_slice() {
            return Ok(XyzSpec::fixed(*x, *y, *z));
        }
        Range::parse(trimmed).map(XyzSpec::Uniform)
    }

    pub fn validate(&self, what: &str) -> PhysgenResult<()> {
        match self {
            XyzSpec::Uniform(r) => r.validate(what),
            XyzSpec::PerAxis { x, y, z } => {
                x.validate(what)?;
                y.validate(what)?;
                z.validate(what)
            }
        }
    }

    /// A uniform spec yields the same value on every axis.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3 {
        match self {
            XyzSpec::Uniform(r) => Vector3::splat(r.sample(rng)),
            XyzSpec::PerAxis { x, y, z } => {
                Vector3::new(x.sample(rng), y.sample(rng), z.sample(rng))
            }
        }
    }
}

impl FromStr for XyzSpec {
    type Err = PhysgenError;

    fn from_str(s: &str) -> PhysgenResult<Self> {
        XyzSpec::parse(s)
    }
}

/// Splits a comma-separated model allow-list. Empty input selects nothing.
pub fn parse_model_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sampling ranges for rigid-body material parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidParamRanges {
    pub mass: Range,
    pub static_friction: Range,
    pub dynamic_friction: Range,
    pub bounciness: Range,
}

impl Default for RigidParamRanges {
    fn default() -> Self {
        Self {
            mass: Range::new(2.0, 7.0),
            static_friction: Range::new(0.0, 0.9),
            dynamic_friction: Range::new(0.0, 0.9),
            bounciness: Range::new(0.0, 1.0),
        }
    }
}

impl RigidParamRanges {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RigidParams {
        RigidParams {
            mass: self.mass.sample(rng),
            static_friction: self.static_friction.sample(rng),
            dynamic_friction: self.dynamic_friction.sample(rng),
            bounciness: self.bounciness.sample(rng),
        }
    }

    pub fn validate(&self) -> PhysgenResult<()> {
        self.mass.validate("mass")?;
        self.static_friction.validate("static_friction")?;
        self.dynamic_friction.validate("dynamic_friction")?;
        self.bounciness.validate("bounciness")
    }
}

/// A random opaque color.
///
/// With `exclude`, samples are rejected while every channel lies within
/// `range` of the excluded color.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R, exclude: Option<Color>, range: f32) -> Color {
    let mut sample = || Color::rgb(rng.gen(), rng.gen(), rng.gen());
    let Some(ex) = exclude else {
        return sample();
    };
    let close = |c: &Color| {
        (c.r - ex.r).abs() < range && (c.g - ex.g).abs() < range && (c.b - ex.b).abs() < range
    };
    let placement = place_with_retry(physgen_types::constants::PLACEMENT_ATTEMPTS, sample, |c| {
        !close(c)
    });
    placement.value
}

/// Camera placement around a center point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvatarPlacement {
    pub radius: Range,
    pub height: Range,
    /// Yaw in degrees.
    pub angle: Range,
}

impl AvatarPlacement {
    pub fn validate(&self) -> PhysgenResult<()> {
        self.radius.validate("camera radius")?;
        self.height.validate("camera height")?;
        self.angle.validate("camera angle")
    }

    /// Samples a position at `(r, r)` from `center` in x/z, rotated about
    /// the center by the sampled yaw.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, center: Vector3) -> Vector3 {
        let r = self.radius.sample(rng);
        let theta = self.angle.sample(rng).to_radians();
        let y = self.height.sample(rng);
        let (sin, cos) = theta.sin_cos();
        Vector3::new(
            center.x + cos * r - sin * r,
            y,
            center.z + sin * r + cos * r,
        )
    }

    /// Multiplies the height range by `k`.
    pub fn with_height_scale(mut self, k: f32) -> Self {
        self.height = self.height.scaled(k);
        self
    }
}

/// A uniformly distributed point in the horizontal disc of `radius`.
pub fn random_point_in_circle<R: Rng + ?Sized>(rng: &mut R, radius: f32, center: Vector3) -> Vector3 {
    let r = radius * rng.gen::<f32>().sqrt();
    let theta = rng.gen_range(0.0..std::f32::consts::TAU);
    let offset = Vec3::new(r * theta.cos(), 0.0, r * theta.sin());
    Vector3::from(Vec3::from(center) + offset)
}

/// Result of a bounded rejection-sampling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement<T> {
    pub value: T,
    pub attempts: u32,
    /// The budget ran out and `value` is the last rejected sample.
    pub fell_back: bool,
}

/// Draws samples until `accept` passes or `budget` attempts are used.
///
/// On exhaustion the last sample is kept and a warning is logged.
pub fn place_with_retry<T, S, A>(budget: u32, mut sample: S, mut accept: A) -> Placement<T>
where
    S: FnMut() -> T,
    A: FnMut(&T) -> bool,
{
    let budget = budget.max(1);
    let mut value = sample();
    let mut attempts = 1;
    loop {
        if accept(&value) {
            return Placement {
                value,
                attempts,
                fell_back: false,
            };
        }
        if attempts >= budget {
            tracing::warn!(attempts, "Placement budget exhausted; keeping last sample");
            return Placement {
                value,
                attempts,
                fell_back: true,
            };
        }
        value = sample();
        attempts += 1;
    }
}

/// Unit vector in the x/z plane at `yaw_deg` degrees from +x.
pub fn planar_direction(yaw_deg: f32) -> Vec3 {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();
    Vec3::new(cos, 0.0, sin)
}
