use std::fmt;

use crate::animation::keyframe::{KeyframeKind, KeyframeMark};
use crate::animation::value::{KeyframeValue, Value, ValueShape};
use crate::foundation::core::Time;
use crate::foundation::error::KeyframeResult;
use crate::model::keyframe_model::{KeyframeModel, ParseReport};
use crate::transaction::notify::{ChangeCallback, Notices, ObserverId};
use crate::transaction::step::Transaction;

/// Value-shape agnostic view of a [`KeyframeModel`], as held by a keyframe list.
pub trait KeyframeTrack: Send + Sync + fmt::Debug {
    fn shape(&self) -> ValueShape;

    fn anchor(&self) -> Time;

    fn len(&self) -> usize;

    fn positions(&self) -> Vec<Time>;

    fn mark(&self, pos: Time) -> Option<KeyframeMark>;

    fn next_mark(&self, pos: Time) -> Option<KeyframeMark>;

    fn prev_mark(&self, pos: Time) -> Option<KeyframeMark>;

    fn closest_mark(&self, pos: Time) -> Option<KeyframeMark>;

    fn value_at(&self, pos: Time) -> Value;

    fn serialize(&self) -> String;

    /// Positions `text` would produce if loaded into this track.
    fn preview_positions(&self, text: &str) -> Vec<Time>;

    fn add_interpolated_with(&self, pos: Time, kind: KeyframeKind, tx: &mut Transaction) -> bool;

    /// `false` when `value` has the wrong shape.
    fn add_value_with(
        &self,
        pos: Time,
        kind: KeyframeKind,
        value: Value,
        tx: &mut Transaction,
    ) -> bool;

    fn update_value_with(&self, pos: Time, value: Value, tx: &mut Transaction) -> bool;

    fn update_kind_with(&self, pos: Time, kind: KeyframeKind, tx: &mut Transaction) -> bool;

    fn remove_with(&self, pos: Time, tx: &mut Transaction) -> bool;

    fn move_with(&self, old: Time, new: Time, tx: &mut Transaction) -> bool;

    fn duplicate_with(&self, src: Time, dst: Time, tx: &mut Transaction) -> bool;

    fn remove_all_with(&self, tx: &mut Transaction) -> bool;

    fn remove_next_with(&self, pos: Time, tx: &mut Transaction) -> bool;

    fn offset_with(&self, from: Time, to: Time, tx: &mut Transaction) -> bool;

    fn resize_with(
        &self,
        old_in: Time,
        old_out: Time,
        new_in: Time,
        new_out: Time,
        tx: &mut Transaction,
    ) -> bool;

    fn replace_with(&self, text: &str, tx: &mut Transaction) -> bool;

    fn is_bound(&self) -> bool;

    fn pending_source_text(&self) -> KeyframeResult<Option<String>>;

    fn load_source_text(&self, text: &str, notices: &mut Notices) -> ParseReport;

    fn subscribe(&self, callback: ChangeCallback) -> ObserverId;

    fn unsubscribe(&self, id: ObserverId) -> bool;
}

impl<V: KeyframeValue> KeyframeTrack for KeyframeModel<V> {
    fn shape(&self) -> ValueShape {
        V::SHAPE
    }

    fn anchor(&self) -> Time {
        KeyframeModel::anchor(self)
    }

    fn len(&self) -> usize {
        KeyframeModel::len(self)
    }

    fn positions(&self) -> Vec<Time> {
        KeyframeModel::positions(self)
    }

    fn mark(&self, pos: Time) -> Option<KeyframeMark> {
        self.keyframe(pos).map(|k| k.mark())
    }

    fn next_mark(&self, pos: Time) -> Option<KeyframeMark> {
        self.next(pos).map(|k| k.mark())
    }

    fn prev_mark(&self, pos: Time) -> Option<KeyframeMark> {
        self.prev(pos).map(|k| k.mark())
    }

    fn closest_mark(&self, pos: Time) -> Option<KeyframeMark> {
        self.closest(pos).map(|k| k.mark())
    }

    fn value_at(&self, pos: Time) -> Value {
        KeyframeModel::value_at(self, pos).into_value()
    }

    fn serialize(&self) -> String {
        KeyframeModel::serialize(self)
    }

    fn preview_positions(&self, text: &str) -> Vec<Time> {
        self.preview(text).into_keys().collect()
    }

    fn add_interpolated_with(&self, pos: Time, kind: KeyframeKind, tx: &mut Transaction) -> bool {
        KeyframeModel::add_interpolated_with(self, pos, kind, tx)
    }

    fn add_value_with(
        &self,
        pos: Time,
        kind: KeyframeKind,
        value: Value,
        tx: &mut Transaction,
    ) -> bool {
        match V::from_value(value) {
            Some(v) => self.add_or_update_with(pos, kind, v, tx),
            None => shape_mismatch(V::SHAPE, value.shape()),
        }
    }

    fn update_value_with(&self, pos: Time, value: Value, tx: &mut Transaction) -> bool {
        match V::from_value(value) {
            Some(v) => KeyframeModel::update_value_with(self, pos, v, tx),
            None => shape_mismatch(V::SHAPE, value.shape()),
        }
    }

    fn update_kind_with(&self, pos: Time, kind: KeyframeKind, tx: &mut Transaction) -> bool {
        KeyframeModel::update_kind_with(self, pos, kind, tx)
    }

    fn remove_with(&self, pos: Time, tx: &mut Transaction) -> bool {
        KeyframeModel::remove_with(self, pos, tx)
    }

    fn move_with(&self, old: Time, new: Time, tx: &mut Transaction) -> bool {
        self.move_keyframe_with(old, new, None, tx)
    }

    fn duplicate_with(&self, src: Time, dst: Time, tx: &mut Transaction) -> bool {
        KeyframeModel::duplicate_with(self, src, dst, tx)
    }

    fn remove_all_with(&self, tx: &mut Transaction) -> bool {
        KeyframeModel::remove_all_with(self, tx)
    }

    fn remove_next_with(&self, pos: Time, tx: &mut Transaction) -> bool {
        KeyframeModel::remove_next_with(self, pos, tx)
    }

    fn offset_with(&self, from: Time, to: Time, tx: &mut Transaction) -> bool {
        KeyframeModel::offset_with(self, from, to, tx)
    }

    fn resize_with(
        &self,
        old_in: Time,
        old_out: Time,
        new_in: Time,
        new_out: Time,
        tx: &mut Transaction,
    ) -> bool {
        KeyframeModel::resize_with(self, old_in, old_out, new_in, new_out, tx)
    }

    fn replace_with(&self, text: &str, tx: &mut Transaction) -> bool {
        KeyframeModel::replace_with(self, text, tx)
    }

    fn is_bound(&self) -> bool {
        self.bound_param().is_some()
    }

    fn pending_source_text(&self) -> KeyframeResult<Option<String>> {
        KeyframeModel::pending_source_text(self)
    }

    fn load_source_text(&self, text: &str, notices: &mut Notices) -> ParseReport {
        KeyframeModel::load_source_text(self, text, notices)
    }

    fn subscribe(&self, callback: ChangeCallback) -> ObserverId {
        KeyframeModel::subscribe(self, move |range| callback(range))
    }

    fn unsubscribe(&self, id: ObserverId) -> bool {
        KeyframeModel::unsubscribe(self, id)
    }
}

fn shape_mismatch(expected: ValueShape, got: ValueShape) -> bool {
    tracing::warn!(%expected, %got, "value shape mismatch");
    false
}

#[cfg(test)]
#[path = "../../tests/unit/model/track.rs"]
mod tests;
