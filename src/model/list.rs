//! Several keyframed parameters of one effect, kept on identical keyframe positions.
//!
//! Structural edits go through [`KeyframeModelList::apply_to_all`]: the list's write lock is
//! held while every member applies the edit, and if any member refuses, the members that
//! already applied it are rolled back before the lock is released. Readers therefore see
//! either the old or the new positions on every member, never a mix.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::animation::keyframe::{KeyframeKind, KeyframeMark};
use crate::animation::value::Value;
use crate::foundation::config::KeyframeSettings;
use crate::foundation::core::Time;
use crate::foundation::error::{KeyframeError, KeyframeResult};
use crate::foundation::sync;
use crate::model::keyframe_model::add_name;
use crate::model::source::ParamId;
use crate::model::track::KeyframeTrack;
use crate::transaction::notify::{ChangeRange, Notices, ObserverId, Observers};
use crate::transaction::step::{GatedStep, Transaction};
use crate::transaction::undo::UndoStack;

/// A logical edit replayed on every member of a list.
#[derive(Clone, Debug, PartialEq)]
pub enum ListEdit {
    /// Every member keyframes its current interpolated value.
    Add { pos: Time, kind: KeyframeKind },
    /// `param` takes `value`, the other members their interpolated value.
    AddWithValue {
        pos: Time,
        kind: KeyframeKind,
        param: ParamId,
        value: Value,
    },
    Remove { pos: Time },
    Move { old: Time, new: Time },
    Duplicate { src: Time, dst: Time },
    RemoveAll,
    RemoveNext { pos: Time },
    Offset { from: Time, to: Time },
    /// The owning clip was resized; see [`crate::KeyframeModel::resize_with`].
    Resize {
        old_in: Time,
        old_out: Time,
        new_in: Time,
        new_out: Time,
    },
    SetKind { pos: Time, kind: KeyframeKind },
}

impl ListEdit {
    /// Undo history label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } | Self::AddWithValue { .. } => "Add keyframe",
            Self::Remove { .. } => "Delete keyframe",
            Self::Move { .. } => "Move keyframe",
            Self::Duplicate { .. } => "Duplicate keyframe",
            Self::RemoveAll => "Delete all keyframes",
            Self::RemoveNext { .. } => "Delete keyframes",
            Self::Offset { .. } => "Move keyframes",
            Self::Resize { .. } => "Resize keyframes",
            Self::SetKind { .. } => "Change keyframe type",
        }
    }

    fn run(&self, id: &ParamId, track: &dyn KeyframeTrack, tx: &mut Transaction) -> bool {
        match self {
            Self::Add { pos, kind } => track.add_interpolated_with(*pos, *kind, tx),
            Self::AddWithValue {
                pos,
                kind,
                param,
                value,
            } => {
                if param == id {
                    track.add_value_with(*pos, *kind, *value, tx)
                } else {
                    track.add_interpolated_with(*pos, *kind, tx)
                }
            }
            Self::Remove { pos } => track.remove_with(*pos, tx),
            Self::Move { old, new } => track.move_with(*old, *new, tx),
            Self::Duplicate { src, dst } => track.duplicate_with(*src, *dst, tx),
            Self::RemoveAll => track.remove_all_with(tx),
            Self::RemoveNext { pos } => track.remove_next_with(*pos, tx),
            Self::Offset { from, to } => track.offset_with(*from, *to, tx),
            Self::Resize {
                old_in,
                old_out,
                new_in,
                new_out,
            } => track.resize_with(*old_in, *old_out, *new_in, *new_out, tx),
            Self::SetKind { pos, kind } => track.update_kind_with(*pos, *kind, tx),
        }
    }
}

struct Member {
    track: Box<dyn KeyframeTrack>,
    forward: ObserverId,
}

#[derive(Default)]
struct ListState {
    members: BTreeMap<ParamId, Member>,
}

impl ListState {
    fn representative(&self) -> Option<&dyn KeyframeTrack> {
        self.members.values().next().map(|m| m.track.as_ref())
    }

    fn member(&self, id: &ParamId) -> Option<&dyn KeyframeTrack> {
        self.members.get(id).map(|m| m.track.as_ref())
    }
}

pub struct KeyframeModelList {
    state: Arc<RwLock<ListState>>,
    observers: Arc<Observers>,
    undo: Arc<UndoStack>,
    settings: KeyframeSettings,
}

impl KeyframeModelList {
    pub fn new(undo: Arc<UndoStack>) -> Self {
        Self::with_settings(KeyframeSettings::default(), undo)
    }

    pub fn with_settings(settings: KeyframeSettings, undo: Arc<UndoStack>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ListState::default())),
            observers: Arc::new(Observers::default()),
            undo,
            settings,
        }
    }

    pub fn settings(&self) -> &KeyframeSettings {
        &self.settings
    }

    pub fn undo_stack(&self) -> &Arc<UndoStack> {
        &self.undo
    }

    /// Time of `frame` at the list's frame rate.
    pub fn time(&self, frame: i64) -> Time {
        Time::new(frame, self.settings.fps)
    }

    /// Register a member. Its changes are forwarded to the list's observers.
    ///
    /// A member whose positions differ from the existing members is accepted, but stays
    /// out of sync until [`repair_consistency`](Self::repair_consistency) or the next
    /// import realigns it.
    pub fn add_parameter(
        &self,
        id: impl Into<ParamId>,
        track: impl KeyframeTrack + 'static,
    ) -> KeyframeResult<()> {
        let id = id.into();
        let mut state = sync::write(&self.state);
        if state.members.contains_key(&id) {
            return Err(KeyframeError::validation(format!(
                "parameter '{id}' is already part of the list"
            )));
        }
        if let Some(rep) = state.representative()
            && rep.positions() != track.positions()
        {
            tracing::warn!(param = %id, "parameter keyframes differ from the list");
        }
        let observers = Arc::downgrade(&self.observers);
        let forward = track.subscribe(Arc::new(move |range| {
            if let Some(observers) = observers.upgrade() {
                observers.notify(range);
            }
        }));
        state.members.insert(
            id,
            Member {
                track: Box::new(track),
                forward,
            },
        );
        Ok(())
    }

    /// Detach a member; `false` if `id` is unknown.
    pub fn remove_parameter(&self, id: &ParamId) -> bool {
        let removed = sync::write(&self.state).members.remove(id);
        match removed {
            Some(member) => {
                member.track.unsubscribe(member.forward);
                true
            }
            None => false,
        }
    }

    fn commit(&self, name: &str, f: impl FnOnce(&mut Transaction) -> bool) -> bool {
        let mut tx = Transaction::new();
        let ok = f(&mut tx);
        if ok {
            tx.commit(&self.undo, name);
        } else {
            tx.rollback().dispatch();
        }
        ok
    }

    /// Run `f` under the list's write lock against a transaction of its own.
    ///
    /// On error every step `f` recorded is reverted before the lock is released. On success
    /// the steps are added to `tx` as a single gated step.
    fn run_gated(
        &self,
        tx: &mut Transaction,
        f: impl FnOnce(&ListState, &mut Transaction) -> KeyframeResult<()>,
    ) -> KeyframeResult<()> {
        let mut local = Transaction::new();
        {
            let state = sync::write(&self.state);
            if let Err(err) = f(&state, &mut local) {
                let notices = local.rollback();
                drop(state);
                notices.dispatch();
                return Err(err);
            }
        }
        let notices = local.split_notices();
        if !local.is_empty() {
            tx.push(Box::new(GatedStep::new(Arc::downgrade(&self.state), local)));
        }
        tx.notices_mut().append(notices);
        Ok(())
    }

    /// Apply `op` to every member, all or nothing.
    ///
    /// `op` returns `false` to refuse the edit for a member; the edit is then undone on the
    /// members that already applied it and `false` is returned.
    #[tracing::instrument(skip(self, op, tx))]
    pub fn apply_to_all_with(
        &self,
        op: impl Fn(&ParamId, &dyn KeyframeTrack, &mut Transaction) -> bool,
        tx: &mut Transaction,
    ) -> bool {
        let result = self.run_gated(tx, |state, local| {
            if state.members.is_empty() {
                return Err(KeyframeError::validation("keyframe list has no parameters"));
            }
            for (id, member) in &state.members {
                if !op(id, member.track.as_ref(), local) {
                    return Err(KeyframeError::transaction(format!(
                        "parameter '{id}' refused the edit"
                    )));
                }
            }
            Ok(())
        });
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "list edit rolled back");
                false
            }
        }
    }

    /// [`apply_to_all_with`](Self::apply_to_all_with), committed to the undo stack as `name`.
    pub fn apply_to_all(
        &self,
        name: &str,
        op: impl Fn(&ParamId, &dyn KeyframeTrack, &mut Transaction) -> bool,
    ) -> bool {
        self.commit(name, |tx| self.apply_to_all_with(op, tx))
    }

    pub fn apply_edit_with(&self, edit: &ListEdit, tx: &mut Transaction) -> bool {
        self.apply_to_all_with(|id, track, tx| edit.run(id, track, tx), tx)
    }

    pub fn apply_edit(&self, edit: ListEdit) -> bool {
        self.commit(edit.name(), |tx| self.apply_edit_with(&edit, tx))
    }

    /// Recorded as "Change keyframe type" when `pos` already holds a keyframe.
    pub fn add_keyframe(&self, pos: Time, kind: KeyframeKind) -> bool {
        let edit = ListEdit::Add { pos, kind };
        self.commit(add_name(self.has_keyframe(pos)), |tx| {
            self.apply_edit_with(&edit, tx)
        })
    }

    pub fn add_keyframe_with_value(
        &self,
        pos: Time,
        kind: KeyframeKind,
        param: impl Into<ParamId>,
        value: Value,
    ) -> bool {
        let param = param.into();
        if !self.has_parameter(&param) {
            return false;
        }
        self.apply_edit(ListEdit::AddWithValue {
            pos,
            kind,
            param,
            value,
        })
    }

    pub fn remove_keyframe(&self, pos: Time) -> bool {
        self.apply_edit(ListEdit::Remove { pos })
    }

    pub fn move_keyframe(&self, old: Time, new: Time) -> bool {
        if old == new {
            return self.has_keyframe(old);
        }
        self.apply_edit(ListEdit::Move { old, new })
    }

    pub fn duplicate_keyframe(&self, src: Time, dst: Time) -> bool {
        self.apply_edit(ListEdit::Duplicate { src, dst })
    }

    pub fn remove_all_keyframes(&self) -> bool {
        self.apply_edit(ListEdit::RemoveAll)
    }

    pub fn remove_next_keyframes(&self, pos: Time) -> bool {
        self.apply_edit(ListEdit::RemoveNext { pos })
    }

    pub fn offset_keyframes(&self, from: Time, to: Time) -> bool {
        self.apply_edit(ListEdit::Offset { from, to })
    }

    pub fn update_kind(&self, pos: Time, kind: KeyframeKind) -> bool {
        self.apply_edit(ListEdit::SetKind { pos, kind })
    }

    pub fn resize_keyframes(
        &self,
        old_in: Time,
        old_out: Time,
        new_in: Time,
        new_out: Time,
    ) -> bool {
        self.apply_edit(ListEdit::Resize {
            old_in,
            old_out,
            new_in,
            new_out,
        })
    }

    /// Change the value one parameter holds at an existing keyframe.
    pub fn update_value_with(
        &self,
        pos: Time,
        param: &ParamId,
        value: Value,
        tx: &mut Transaction,
    ) -> bool {
        self.update_values_with(pos, &[(param.clone(), value)], tx)
    }

    /// Change the values several parameters hold at an existing keyframe, all or nothing.
    pub fn update_values_with(
        &self,
        pos: Time,
        values: &[(ParamId, Value)],
        tx: &mut Transaction,
    ) -> bool {
        let result = self.run_gated(tx, |state, local| {
            for (param, value) in values {
                let track = state.member(param).ok_or_else(|| {
                    KeyframeError::validation(format!("unknown parameter '{param}'"))
                })?;
                if !track.update_value_with(pos, *value, local) {
                    return Err(KeyframeError::validation(format!(
                        "parameter '{param}' has no keyframe at frame {pos}"
                    )));
                }
            }
            Ok(())
        });
        if let Err(err) = &result {
            tracing::debug!(%err, "keyframe value update rolled back");
        }
        result.is_ok()
    }

    pub fn update_values(&self, pos: Time, values: &[(ParamId, Value)]) -> bool {
        self.commit("Update keyframe", |tx| {
            self.update_values_with(pos, values, tx)
        })
    }

    pub fn update_value(&self, pos: Time, param: impl Into<ParamId>, value: Value) -> bool {
        let param = param.into();
        self.commit("Update keyframe", |tx| {
            self.update_value_with(pos, &param, value, tx)
        })
    }

    /// Positions missing from each member, relative to the union over all members.
    fn divergence(state: &ListState) -> BTreeMap<ParamId, Vec<Time>> {
        let all: BTreeSet<Time> = state
            .members
            .values()
            .flat_map(|m| m.track.positions())
            .collect();
        state
            .members
            .iter()
            .filter_map(|(id, m)| {
                let own: BTreeSet<Time> = m.track.positions().into_iter().collect();
                let missing: Vec<Time> = all.difference(&own).copied().collect();
                (!missing.is_empty()).then(|| (id.clone(), missing))
            })
            .collect()
    }

    /// `Err(Consistency)` naming the frames each member lacks, if positions diverge.
    pub fn check_consistency(&self) -> KeyframeResult<()> {
        let state = sync::read(&self.state);
        let divergence = Self::divergence(&state);
        if divergence.is_empty() {
            return Ok(());
        }
        Err(KeyframeError::consistency(describe_divergence(&divergence)))
    }

    /// Add every missing position to the members lacking it, with the member's
    /// interpolated value and the kind found on the other members.
    ///
    /// Returns `true` when the list is consistent afterwards.
    pub fn repair_consistency(&self) -> bool {
        let plan: BTreeMap<ParamId, Vec<(Time, KeyframeKind)>> = {
            let state = sync::read(&self.state);
            Self::divergence(&state)
                .into_iter()
                .map(|(id, missing)| {
                    let with_kind = missing
                        .into_iter()
                        .map(|pos| {
                            let kind = state
                                .members
                                .values()
                                .find_map(|m| m.track.mark(pos))
                                .map_or(self.settings.default_kind, |m| m.kind);
                            (pos, kind)
                        })
                        .collect();
                    (id, with_kind)
                })
                .collect()
        };
        if plan.is_empty() {
            return true;
        }
        self.apply_to_all("Align keyframes", |id, track, tx| {
            plan.get(id).is_none_or(|missing| {
                missing
                    .iter()
                    .all(|(pos, kind)| track.add_interpolated_with(*pos, *kind, tx))
            })
        })
    }

    /// Replace the keyframes of several members from animation text, as one undo entry.
    ///
    /// Rejected as a whole, with nothing applied, when a parameter is unknown or when the
    /// resulting positions would differ between members.
    #[tracing::instrument(skip(self, animations))]
    pub fn import_animations(&self, animations: &[(ParamId, &str)]) -> KeyframeResult<()> {
        let mut tx = Transaction::new();
        let result = self.run_gated(&mut tx, |state, local| {
            let texts: BTreeMap<&ParamId, &str> =
                animations.iter().map(|(id, text)| (id, *text)).collect();
            for id in texts.keys() {
                if !state.members.contains_key(*id) {
                    return Err(KeyframeError::validation(format!(
                        "unknown parameter '{id}'"
                    )));
                }
            }
            let incoming: BTreeMap<ParamId, Vec<Time>> = state
                .members
                .iter()
                .map(|(id, m)| {
                    let positions = match texts.get(id) {
                        Some(text) => m.track.preview_positions(text),
                        None => m.track.positions(),
                    };
                    (id.clone(), positions)
                })
                .collect();
            ensure_same_positions(&incoming)?;
            for (id, text) in &texts {
                if let Some(track) = state.member(id)
                    && !track.replace_with(text, local)
                {
                    return Err(KeyframeError::transaction(format!(
                        "parameter '{id}' refused the import"
                    )));
                }
            }
            Ok(())
        });
        match result {
            Ok(()) => {
                tx.commit(&self.undo, "Import keyframes");
                Ok(())
            }
            Err(err) => {
                tx.rollback().dispatch();
                Err(err)
            }
        }
    }

    /// Reload every bound member from its parameter, without undo history.
    ///
    /// `Ok(false)` when no parameter changed. Nothing is reloaded if the new texts would
    /// leave the members on different positions.
    #[tracing::instrument(skip(self))]
    pub fn refresh(&self) -> KeyframeResult<bool> {
        let mut notices = Notices::new();
        let refreshed = {
            let state = sync::read(&self.state);
            let mut pending = BTreeMap::new();
            for (id, m) in &state.members {
                if !m.track.is_bound() {
                    continue;
                }
                if let Some(text) = m.track.pending_source_text()? {
                    pending.insert(id.clone(), text);
                }
            }
            if pending.is_empty() {
                return Ok(false);
            }
            drop(state);

            let state = sync::write(&self.state);
            let incoming: BTreeMap<ParamId, Vec<Time>> = state
                .members
                .iter()
                .map(|(id, m)| {
                    let positions = match pending.get(id) {
                        Some(text) => m.track.preview_positions(text),
                        None => m.track.positions(),
                    };
                    (id.clone(), positions)
                })
                .collect();
            ensure_same_positions(&incoming)?;
            for (id, text) in &pending {
                if let Some(track) = state.member(id) {
                    track.load_source_text(text, &mut notices);
                }
            }
            pending.len()
        };
        tracing::debug!(refreshed, "refreshed keyframe list");
        notices.dispatch();
        Ok(true)
    }

    pub fn subscribe(&self, callback: impl Fn(ChangeRange) + Send + Sync + 'static) -> ObserverId {
        self.observers.subscribe(Arc::new(callback))
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Run `f` on one member under the list's read lock.
    pub fn with_parameter<R>(
        &self,
        id: &ParamId,
        f: impl FnOnce(&dyn KeyframeTrack) -> R,
    ) -> Option<R> {
        sync::read(&self.state).member(id).map(f)
    }

    fn with_representative<R>(&self, f: impl FnOnce(&dyn KeyframeTrack) -> R) -> Option<R> {
        sync::read(&self.state).representative().map(f)
    }

    pub fn has_parameter(&self, id: &ParamId) -> bool {
        sync::read(&self.state).members.contains_key(id)
    }

    pub fn parameter_ids(&self) -> Vec<ParamId> {
        sync::read(&self.state).members.keys().cloned().collect()
    }

    pub fn parameter_count(&self) -> usize {
        sync::read(&self.state).members.len()
    }

    /// `true` while no parameter has been added.
    pub fn is_empty(&self) -> bool {
        sync::read(&self.state).members.is_empty()
    }

    pub fn keyframe(&self, pos: Time) -> Option<KeyframeMark> {
        self.with_representative(|t| t.mark(pos)).flatten()
    }

    pub fn next_keyframe(&self, pos: Time) -> Option<KeyframeMark> {
        self.with_representative(|t| t.next_mark(pos)).flatten()
    }

    pub fn prev_keyframe(&self, pos: Time) -> Option<KeyframeMark> {
        self.with_representative(|t| t.prev_mark(pos)).flatten()
    }

    pub fn closest_keyframe(&self, pos: Time) -> Option<KeyframeMark> {
        self.with_representative(|t| t.closest_mark(pos)).flatten()
    }

    pub fn has_keyframe(&self, pos: Time) -> bool {
        self.keyframe(pos).is_some()
    }

    pub fn keyframe_kind(&self, pos: Time) -> Option<KeyframeKind> {
        self.keyframe(pos).map(|m| m.kind)
    }

    pub fn positions(&self) -> Vec<Time> {
        self.with_representative(|t| t.positions())
            .unwrap_or_default()
    }

    /// Number of keyframes (per member).
    pub fn len(&self) -> usize {
        self.with_representative(|t| t.len()).unwrap_or(0)
    }

    pub fn single_keyframe(&self) -> bool {
        self.len() == 1
    }

    pub fn interpolated_value(&self, pos: Time, id: &ParamId) -> Option<Value> {
        self.with_parameter(id, |t| t.value_at(pos))
    }

    pub fn serialize(&self, id: &ParamId) -> Option<String> {
        self.with_parameter(id, |t| t.serialize())
    }
}

fn ensure_same_positions(incoming: &BTreeMap<ParamId, Vec<Time>>) -> KeyframeResult<()> {
    let mut iter = incoming.iter();
    let Some((_, reference)) = iter.next() else {
        return Ok(());
    };
    let all: BTreeSet<Time> = incoming.values().flatten().copied().collect();
    if iter.all(|(_, positions)| positions == reference) {
        return Ok(());
    }
    let divergence: BTreeMap<ParamId, Vec<Time>> = incoming
        .iter()
        .filter_map(|(id, positions)| {
            let own: BTreeSet<Time> = positions.iter().copied().collect();
            let missing: Vec<Time> = all.difference(&own).copied().collect();
            (!missing.is_empty()).then(|| (id.clone(), missing))
        })
        .collect();
    Err(KeyframeError::consistency(describe_divergence(&divergence)))
}

fn describe_divergence(divergence: &BTreeMap<ParamId, Vec<Time>>) -> String {
    divergence
        .iter()
        .map(|(id, missing)| {
            let frames: Vec<String> = missing.iter().map(|t| t.frame().to_string()).collect();
            format!("'{id}' lacks frames [{}]", frames.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl fmt::Debug for KeyframeModelList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyframeModelList")
            .field("parameters", &self.parameter_ids())
            .field("keyframes", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/list.rs"]
mod tests;
