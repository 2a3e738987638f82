//! Animation property text, as exchanged with the rendering backend:
//!
//! ```text
//! <frame>[=|~=||=]<value>;<frame>[=|~=||=]<value>;...
//! ```
//!
//! `=` is linear, `|=` discrete and `~=` smooth. Scalar values are decimal numbers,
//! rect values are `"x y w h [o]"` with the opacity defaulting to 1.

use std::collections::BTreeMap;

use crate::animation::interp;
use crate::animation::keyframe::{Keyframe, KeyframeKind};
use crate::animation::value::{KeyframeValue, RectValue};
use crate::foundation::core::{Fps, Time};
use crate::foundation::error::{KeyframeError, KeyframeResult};

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedAnimation<V> {
    /// Keyframes sorted by frame; a frame listed twice keeps its last occurrence.
    pub keyframes: Vec<Keyframe<V>>,
    /// Number of non-empty segments that could not be used.
    pub skipped: usize,
}

impl<V> Default for ParsedAnimation<V> {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
            skipped: 0,
        }
    }
}

/// Parse animation text. Never fails: unusable segments are logged and skipped.
///
/// Text without any `=` is read as a single constant value at frame 0, with
/// `default_kind`.
pub fn parse_animation<V: KeyframeValue>(
    text: &str,
    fps: Fps,
    default_kind: KeyframeKind,
) -> ParsedAnimation<V> {
    let text = text.trim();
    let mut out = ParsedAnimation::default();
    if text.is_empty() {
        return out;
    }

    if !text.contains('=') {
        match V::parse_text(text) {
            Some(value) => out
                .keyframes
                .push(Keyframe::new(Time::zero(fps), default_kind, value)),
            None => {
                tracing::warn!(text, "unparseable constant animation value");
                out.skipped = 1;
            }
        }
        return out;
    }

    let mut keys: BTreeMap<i64, (KeyframeKind, V)> = BTreeMap::new();
    for segment in text.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match parse_segment::<V>(segment) {
            Some((frame, kind, value)) => {
                keys.insert(frame, (kind, value));
            }
            None => {
                tracing::warn!(segment, "skipping unparseable keyframe segment");
                out.skipped += 1;
            }
        }
    }

    out.keyframes = keys
        .into_iter()
        .map(|(frame, (kind, value))| Keyframe::new(Time::new(frame, fps), kind, value))
        .collect();
    out
}

/// Like [`parse_animation`], but the first malformed segment is an error.
pub fn parse_animation_strict<V: KeyframeValue>(
    text: &str,
    fps: Fps,
    default_kind: KeyframeKind,
) -> KeyframeResult<Vec<Keyframe<V>>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    if !text.contains('=') {
        let value = V::parse_text(text)
            .ok_or_else(|| KeyframeError::parse(format!("invalid value '{text}'")))?;
        return Ok(vec![Keyframe::new(Time::zero(fps), default_kind, value)]);
    }

    let mut keys: BTreeMap<i64, (KeyframeKind, V)> = BTreeMap::new();
    for segment in text.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (frame, kind, value) = parse_segment::<V>(segment)
            .ok_or_else(|| KeyframeError::parse(format!("invalid keyframe segment '{segment}'")))?;
        keys.insert(frame, (kind, value));
    }
    Ok(keys
        .into_iter()
        .map(|(frame, (kind, value))| Keyframe::new(Time::new(frame, fps), kind, value))
        .collect())
}

fn parse_segment<V: KeyframeValue>(segment: &str) -> Option<(i64, KeyframeKind, V)> {
    let (lhs, rhs) = segment.split_once('=')?;
    let lhs = lhs.trim_end();
    let digits_end = lhs
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_ascii_digit())
        .map(|(i, c)| i + c.len_utf8())?;
    let kind = KeyframeKind::from_operator_prefix(lhs[digits_end..].trim())?;
    let frame: i64 = lhs[..digits_end].trim().parse().ok()?;
    if frame < 0 {
        return None;
    }
    let value = V::parse_text(rhs)?;
    Some((frame, kind, value))
}

/// Serialize keyframes in ascending frame order.
pub fn write_animation<'a, V, I>(keys: I, use_opacity: bool) -> String
where
    V: KeyframeValue,
    I: IntoIterator<Item = &'a Keyframe<V>>,
{
    let mut keys: Vec<&Keyframe<V>> = keys.into_iter().collect();
    keys.sort_by(|a, b| a.position.cmp(&b.position));
    keys.iter()
        .map(|k| {
            format!(
                "{}{}{}",
                k.position.frame(),
                k.kind.operator(),
                k.value.write_text(use_opacity)
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Shift an animation by `offset` frames and cut it to `[0, duration]`.
///
/// Keys pushed below frame 0 are dropped; frame 0 then receives the value the source
/// animation had at `-offset`. If keys remain beyond `duration`, a key holding the
/// interpolated value (and the last key's kind) is placed at `duration`.
pub fn offset_animation<V: KeyframeValue>(
    text: &str,
    fps: Fps,
    default_kind: KeyframeKind,
    offset: i64,
    duration: i64,
    use_opacity: bool,
) -> String {
    let parsed = parse_animation::<V>(text, fps, default_kind);
    let source = parsed.keyframes;
    let Some(last) = source.last() else {
        return String::new();
    };
    let last_kind = last.kind;

    let mut shifted: BTreeMap<i64, (KeyframeKind, V)> = source
        .iter()
        .filter_map(|k| {
            let frame = k.position.frame().saturating_add(offset);
            (frame >= 0).then(|| (frame, (k.kind, k.value.clone())))
        })
        .collect();

    if offset < 0 && !shifted.contains_key(&0) {
        let at = Time::new(-offset, fps);
        let kind = source
            .iter()
            .rev()
            .find(|k| k.position <= at)
            .map_or(default_kind, |k| k.kind);
        if let Some(value) = interp::value_at(&source, at) {
            shifted.insert(0, (kind, value));
        }
    }

    let beyond = shifted.keys().next_back().is_some_and(|&f| f > duration);
    if beyond {
        let as_keys: Vec<Keyframe<V>> = shifted
            .iter()
            .map(|(f, (kind, value))| Keyframe::new(Time::new(*f, fps), *kind, value.clone()))
            .collect();
        if let Some(value) = interp::value_at(&as_keys, Time::new(duration, fps)) {
            shifted.retain(|f, _| *f <= duration);
            shifted.insert(duration, (last_kind, value));
        }
    }

    let out: Vec<Keyframe<V>> = shifted
        .into_iter()
        .map(|(f, (kind, value))| Keyframe::new(Time::new(f, fps), kind, value))
        .collect();
    write_animation(&out, use_opacity)
}

/// Per-component `(min, max)` of a rect animation.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct RectRanges {
    pub x: (f64, f64),
    pub y: (f64, f64),
    pub w: (f64, f64),
    pub h: (f64, f64),
    pub opacity: (f64, f64),
}

pub fn rect_ranges(keys: &[Keyframe<RectValue>]) -> Option<RectRanges> {
    fn widen(range: (f64, f64), v: f64) -> (f64, f64) {
        (range.0.min(v), range.1.max(v))
    }

    let first = keys.first()?.value;
    let init = RectRanges {
        x: (first.x, first.x),
        y: (first.y, first.y),
        w: (first.w, first.w),
        h: (first.h, first.h),
        opacity: (first.opacity, first.opacity),
    };
    Some(keys[1..].iter().fold(init, |acc, k| RectRanges {
        x: widen(acc.x, k.value.x),
        y: widen(acc.y, k.value.y),
        w: widen(acc.w, k.value.w),
        h: widen(acc.h, k.value.h),
        opacity: widen(acc.opacity, k.value.opacity),
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/animation/codec.rs"]
mod tests;
