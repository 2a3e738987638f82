use std::collections::BTreeMap;
use std::fmt;

use crate::animation::keyframe::KeyframeKind;
use crate::foundation::core::Time;
use crate::foundation::error::{KeyframeError, KeyframeResult};
use crate::transaction::notify::ChangeRange;

/// A reversible change to some piece of state.
///
/// `apply` either succeeds completely or leaves the state untouched. Applying
/// `invert()` right after a successful `apply` restores the previous state.
pub trait Edit: Clone + fmt::Debug + Send + Sync + 'static {
    type State;

    fn apply(&self, state: &mut Self::State) -> KeyframeResult<ChangeRange>;

    fn invert(&self) -> Self;
}

/// Sorted keyframe storage of a single parameter.
pub type KeyframeMap<V> = BTreeMap<Time, (KeyframeKind, V)>;

#[derive(Clone, Debug, PartialEq)]
pub enum KeyframeEdit<V> {
    Insert {
        position: Time,
        kind: KeyframeKind,
        value: V,
    },
    Remove {
        position: Time,
        kind: KeyframeKind,
        value: V,
    },
    Update {
        position: Time,
        old: (KeyframeKind, V),
        new: (KeyframeKind, V),
    },
}

impl<V> KeyframeEdit<V> {
    pub fn position(&self) -> Time {
        match self {
            Self::Insert { position, .. }
            | Self::Remove { position, .. }
            | Self::Update { position, .. } => *position,
        }
    }
}

impl<V> Edit for KeyframeEdit<V>
where
    V: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    type State = KeyframeMap<V>;

    fn apply(&self, keys: &mut KeyframeMap<V>) -> KeyframeResult<ChangeRange> {
        match self {
            Self::Insert {
                position,
                kind,
                value,
            } => {
                if keys.contains_key(position) {
                    return Err(KeyframeError::transaction(format!(
                        "insert: frame {position} is already a keyframe"
                    )));
                }
                keys.insert(*position, (*kind, value.clone()));
            }
            Self::Remove { position, .. } => {
                if keys.remove(position).is_none() {
                    return Err(KeyframeError::transaction(format!(
                        "remove: no keyframe at frame {position}"
                    )));
                }
            }
            Self::Update { position, new, .. } => match keys.get_mut(position) {
                Some(slot) => *slot = new.clone(),
                None => {
                    return Err(KeyframeError::transaction(format!(
                        "update: no keyframe at frame {position}"
                    )));
                }
            },
        }
        Ok(ChangeRange::at(self.position()))
    }

    fn invert(&self) -> Self {
        match self.clone() {
            Self::Insert {
                position,
                kind,
                value,
            } => Self::Remove {
                position,
                kind,
                value,
            },
            Self::Remove {
                position,
                kind,
                value,
            } => Self::Insert {
                position,
                kind,
                value,
            },
            Self::Update { position, old, new } => Self::Update {
                position,
                old: new,
                new: old,
            },
        }
    }
}

/// Edits applied in order as one unit. A failing member reverts the ones before it.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence<E>(pub Vec<E>);

impl<E: Edit> Edit for Sequence<E> {
    type State = E::State;

    fn apply(&self, state: &mut E::State) -> KeyframeResult<ChangeRange> {
        let mut range: Option<ChangeRange> = None;
        for (i, edit) in self.0.iter().enumerate() {
            match edit.apply(state) {
                Ok(r) => range = Some(range.map_or(r, |acc| acc.union(r))),
                Err(err) => {
                    for done in self.0[..i].iter().rev() {
                        if let Err(revert) = done.invert().apply(state) {
                            tracing::error!(edit = ?done, %revert, "revert failed");
                        }
                    }
                    return Err(err);
                }
            }
        }
        range.ok_or_else(|| KeyframeError::transaction("empty edit sequence"))
    }

    fn invert(&self) -> Self {
        Self(self.0.iter().rev().map(Edit::invert).collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transaction/edit.rs"]
mod tests;
