use std::fmt;

use kurbo::Point;

pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for RectValue {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            x: <f64 as Lerp>::lerp(&a.x, &b.x, t),
            y: <f64 as Lerp>::lerp(&a.y, &b.y, t),
            w: <f64 as Lerp>::lerp(&a.w, &b.w, t),
            h: <f64 as Lerp>::lerp(&a.h, &b.h, t),
            opacity: <f64 as Lerp>::lerp(&a.opacity, &b.opacity, t),
        }
    }
}

/// Uniform Catmull-Rom spline through `p1..p2`, with `p0`/`p3` giving the tangents.
pub fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Which value shape a parameter animates. Fixed for the lifetime of a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    Scalar,
    Rect,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Rect => f.write_str("rect"),
        }
    }
}

/// Geometry keyframe value: position, size and opacity.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RectValue {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default = "opaque")]
    pub opacity: f64,
}

fn opaque() -> f64 {
    1.0
}

impl RectValue {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            x,
            y,
            w,
            h,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Same size and opacity, translated so that its centre sits at `center`.
    pub fn recentered(&self, center: Point) -> Self {
        Self {
            x: center.x - self.w / 2.0,
            y: center.y - self.h / 2.0,
            ..*self
        }
    }
}

/// Tagged keyframe value, used where the value shape is only known at runtime.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Scalar(f64),
    Rect(RectValue),
}

impl Value {
    pub fn shape(&self) -> ValueShape {
        match self {
            Self::Scalar(_) => ValueShape::Scalar,
            Self::Rect(_) => ValueShape::Rect,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Rect(_) => None,
        }
    }

    pub fn as_rect(&self) -> Option<RectValue> {
        match self {
            Self::Rect(r) => Some(*r),
            Self::Scalar(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<RectValue> for Value {
    fn from(r: RectValue) -> Self {
        Self::Rect(r)
    }
}

/// A value shape a keyframe model can be parametrized over.
pub trait KeyframeValue: Lerp + Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const SHAPE: ValueShape;

    fn catmull_rom(p0: &Self, p1: &Self, p2: &Self, p3: &Self, t: f64) -> Self;

    /// Parse the value part of an animation segment.
    fn parse_text(text: &str) -> Option<Self>;

    fn write_text(&self, use_opacity: bool) -> String;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

impl KeyframeValue for f64 {
    const SHAPE: ValueShape = ValueShape::Scalar;

    fn catmull_rom(p0: &Self, p1: &Self, p2: &Self, p3: &Self, t: f64) -> Self {
        catmull_rom(*p0, *p1, *p2, *p3, t)
    }

    fn parse_text(text: &str) -> Option<Self> {
        parse_number(text)
    }

    fn write_text(&self, _use_opacity: bool) -> String {
        format!("{self}")
    }

    fn into_value(self) -> Value {
        Value::Scalar(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_scalar()
    }
}

impl KeyframeValue for RectValue {
    const SHAPE: ValueShape = ValueShape::Rect;

    fn catmull_rom(p0: &Self, p1: &Self, p2: &Self, p3: &Self, t: f64) -> Self {
        Self {
            x: catmull_rom(p0.x, p1.x, p2.x, p3.x, t),
            y: catmull_rom(p0.y, p1.y, p2.y, p3.y, t),
            w: catmull_rom(p0.w, p1.w, p2.w, p3.w, t),
            h: catmull_rom(p0.h, p1.h, p2.h, p3.h, t),
            opacity: catmull_rom(p0.opacity, p1.opacity, p2.opacity, p3.opacity, t),
        }
    }

    fn parse_text(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace().map(parse_number);
        let x = parts.next()??;
        let y = parts.next()??;
        let w = parts.next()??;
        let h = parts.next()??;
        let opacity = match parts.next() {
            Some(o) => o?,
            None => 1.0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            x,
            y,
            w,
            h,
            opacity,
        })
    }

    fn write_text(&self, use_opacity: bool) -> String {
        if use_opacity {
            format!(
                "{} {} {} {} {}",
                self.x, self.y, self.w, self.h, self.opacity
            )
        } else {
            format!("{} {} {} {}", self.x, self.y, self.w, self.h)
        }
    }

    fn into_value(self) -> Value {
        Value::Rect(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_rect()
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
#[path = "../../tests/unit/animation/value.rs"]
mod tests;
