use crate::foundation::core::Time;

/// Interpolation applied between a keyframe and the next one.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum KeyframeKind {
    #[default]
    Linear,
    Discrete,
    Smooth,
}

impl KeyframeKind {
    pub const ALL: [KeyframeKind; 3] = [Self::Linear, Self::Discrete, Self::Smooth];

    /// Operator written between frame and value in animation text.
    pub fn operator(self) -> &'static str {
        match self {
            Self::Linear => "=",
            Self::Discrete => "|=",
            Self::Smooth => "~=",
        }
    }

    /// Kind for the characters found in front of `=`, if any.
    pub fn from_operator_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "" => Some(Self::Linear),
            "|" => Some(Self::Discrete),
            "~" => Some(Self::Smooth),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Discrete => "discrete",
            Self::Smooth => "smooth",
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<V> {
    pub position: Time,
    pub kind: KeyframeKind, // interpolation toward the next key
    pub value: V,
}

impl<V> Keyframe<V> {
    pub fn new(position: Time, kind: KeyframeKind, value: V) -> Self {
        Self {
            position,
            kind,
            value,
        }
    }

    pub fn view(&self) -> KeyframeRef<'_, V> {
        KeyframeRef {
            position: self.position,
            kind: self.kind,
            value: &self.value,
        }
    }

    pub fn mark(&self) -> KeyframeMark {
        KeyframeMark {
            position: self.position,
            kind: self.kind,
        }
    }
}

/// Borrowed view of a keyframe, as stored inside a model's sorted map.
#[derive(Debug)]
pub struct KeyframeRef<'a, V> {
    pub position: Time,
    pub kind: KeyframeKind,
    pub value: &'a V,
}

impl<V> Clone for KeyframeRef<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for KeyframeRef<'_, V> {}

impl<V: Clone> KeyframeRef<'_, V> {
    pub fn into_keyframe(self) -> Keyframe<V> {
        Keyframe::new(self.position, self.kind, self.value.clone())
    }
}

/// Position and kind of a keyframe, without its value.
///
/// This is what value-agnostic callers (the list, the timeline ruler) get back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyframeMark {
    pub position: Time,
    pub kind: KeyframeKind,
}

#[cfg(test)]
#[path = "../../tests/unit/animation/keyframe.rs"]
mod tests;
