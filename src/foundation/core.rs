use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use crate::foundation::error::{KeyframeError, KeyframeResult};

/// Rational frame rate, `num / den` frames per second. Both parts are non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Fps {
    pub fn new(num: u32, den: u32) -> KeyframeResult<Self> {
        if num == 0 || den == 0 {
            return Err(KeyframeError::validation(format!(
                "frame rate {num}/{den} must have non-zero parts"
            )));
        }
        Ok(Self { num, den })
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 25, den: 1 }
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Frame-accurate timestamp: an integer frame counted at a rational frame rate.
///
/// Two times compare equal when they denote the same instant, even if they were
/// built with different frame rates (`Time::new(25, 25fps) == Time::new(30, 30fps)`).
/// Arithmetic is carried out in the frame rate of the left operand.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Time {
    frame: i64,
    fps: Fps,
}

impl Time {
    pub fn new(frame: i64, fps: Fps) -> Self {
        Self { frame, fps }
    }

    pub fn zero(fps: Fps) -> Self {
        Self { frame: 0, fps }
    }

    pub fn frame(self) -> i64 {
        self.frame
    }

    pub fn fps(self) -> Fps {
        self.fps
    }

    pub fn seconds(self) -> f64 {
        self.frame as f64 * f64::from(self.fps.den) / f64::from(self.fps.num)
    }

    pub fn offset(self, frames: i64) -> Self {
        Self {
            frame: self.frame.saturating_add(frames),
            fps: self.fps,
        }
    }

    /// Re-express this time at another frame rate, rounding to the nearest frame.
    pub fn to_fps(self, fps: Fps) -> Self {
        if fps == self.fps {
            return self;
        }
        let num = i128::from(self.frame) * i128::from(self.fps.den) * i128::from(fps.num);
        let den = i128::from(self.fps.num) * i128::from(fps.den);
        let frame = div_round(num, den).clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
        Self { frame, fps }
    }

    /// Signed distance in frames (at `self`'s rate) from `other` to `self`.
    pub fn frames_since(self, other: Time) -> i64 {
        (self - other).frame
    }
}

fn div_round(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    if num >= 0 {
        (num + den / 2) / den
    } else {
        -((-num + den / 2) / den)
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.fps == other.fps {
            return self.frame.cmp(&other.frame);
        }
        // a/ra <=> b/rb  with r = num/den, cross-multiplied to stay exact
        let lhs = i128::from(self.frame) * i128::from(self.fps.den) * i128::from(other.fps.num);
        let rhs = i128::from(other.frame) * i128::from(other.fps.den) * i128::from(self.fps.num);
        lhs.cmp(&rhs)
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        let rhs = rhs.to_fps(self.fps);
        Time {
            frame: self.frame.saturating_sub(rhs.frame),
            fps: self.fps,
        }
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        let rhs = rhs.to_fps(self.fps);
        Time {
            frame: self.frame.saturating_add(rhs.frame),
            fps: self.fps,
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
