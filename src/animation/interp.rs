use crate::animation::keyframe::{Keyframe, KeyframeKind, KeyframeRef};
use crate::animation::value::KeyframeValue;
use crate::foundation::core::Time;

/// The two keyframes bounding a query time, plus their outer neighbours when they exist.
///
/// The outer neighbours only matter for [`KeyframeKind::Smooth`], where they give the
/// spline its tangents.
#[derive(Debug)]
pub struct Segment<'a, V> {
    pub before: Option<KeyframeRef<'a, V>>,
    pub prev: KeyframeRef<'a, V>,
    pub next: KeyframeRef<'a, V>,
    pub after: Option<KeyframeRef<'a, V>>,
}

impl<'a, V: KeyframeValue> Segment<'a, V> {
    pub fn new(prev: KeyframeRef<'a, V>, next: KeyframeRef<'a, V>) -> Self {
        Self {
            before: None,
            prev,
            next,
            after: None,
        }
    }

    pub fn with_neighbors(
        before: Option<KeyframeRef<'a, V>>,
        prev: KeyframeRef<'a, V>,
        next: KeyframeRef<'a, V>,
        after: Option<KeyframeRef<'a, V>>,
    ) -> Self {
        Self {
            before,
            prev,
            next,
            after,
        }
    }

    /// Normalized position of `at` inside the segment, clamped to `[0, 1]`.
    pub fn progress(&self, at: Time) -> f64 {
        let span = self.next.position.frames_since(self.prev.position);
        if span <= 0 {
            return 0.0;
        }
        let offset = at.to_fps(self.prev.position.fps()).frames_since(self.prev.position);
        ((offset as f64) / (span as f64)).clamp(0.0, 1.0)
    }

    pub fn sample(&self, at: Time) -> V {
        let t = self.progress(at);
        match self.prev.kind {
            KeyframeKind::Discrete => self.prev.value.clone(),
            KeyframeKind::Linear => V::lerp(self.prev.value, self.next.value, t),
            KeyframeKind::Smooth => match (self.before, self.after) {
                (None, None) => V::lerp(self.prev.value, self.next.value, t),
                (before, after) => {
                    let p0 = before.map_or(self.prev.value, |k| k.value);
                    let p3 = after.map_or(self.next.value, |k| k.value);
                    V::catmull_rom(p0, self.prev.value, self.next.value, p3, t)
                }
            },
        }
    }
}

/// Value between two keyframes. Callers guarantee `prev.position < at < next.position`;
/// boundary clamping is done by [`value_at`] and by the keyframe model.
pub fn interpolate<V: KeyframeValue>(prev: &Keyframe<V>, next: &Keyframe<V>, at: Time) -> V {
    Segment::new(prev.view(), next.view()).sample(at)
}

/// Sample a keyframe slice sorted by position. Clamps before the first and after the
/// last keyframe; `None` only for an empty slice.
pub fn value_at<V: KeyframeValue>(keys: &[Keyframe<V>], at: Time) -> Option<V> {
    let idx = keys.partition_point(|k| k.position <= at);
    if idx == 0 {
        return keys.first().map(|k| k.value.clone());
    }
    let prev = &keys[idx - 1];
    if prev.position == at || idx >= keys.len() {
        return Some(prev.value.clone());
    }
    let next = &keys[idx];
    let before = idx.checked_sub(2).map(|i| keys[i].view());
    let after = keys.get(idx + 1).map(Keyframe::view);
    Some(Segment::with_neighbors(before, prev.view(), next.view(), after).sample(at))
}

#[cfg(test)]
#[path = "../../tests/unit/animation/interp.rs"]
mod tests;
