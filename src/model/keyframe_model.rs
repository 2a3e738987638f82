//! Keyframes of a single animated parameter.
//!
//! Every mutation comes in two flavours: `foo_with(.., &mut Transaction)` applies the change
//! right away and records its inverse into the caller's transaction, and `foo(..)` wraps the
//! same call in a transaction of its own and commits it to the model's undo stack under a
//! user-facing name.
//!
//! Invariant violations (removing the anchor keyframe, moving onto an occupied frame, ...)
//! are reported as `false` and leave the model untouched.

use std::fmt;
use std::ops::Bound;
use std::sync::{Arc, RwLock, Weak};

use crate::animation::codec::{self, ParsedAnimation};
use crate::animation::interp::Segment;
use crate::animation::keyframe::{Keyframe, KeyframeKind, KeyframeMark, KeyframeRef};
use crate::animation::value::KeyframeValue;
use crate::foundation::config::KeyframeSettings;
use crate::foundation::core::Time;
use crate::foundation::error::{KeyframeError, KeyframeResult};
use crate::foundation::sync;
use crate::model::source::{ParamId, ParameterSource};
use crate::transaction::edit::{Edit, KeyframeEdit, KeyframeMap, Sequence};
use crate::transaction::notify::{ChangeRange, Notices, ObserverId, Observers};
use crate::transaction::step::{EditTarget, TargetedEdit, Transaction};
use crate::transaction::undo::UndoStack;

/// Outcome of loading animation text into a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ParseReport {
    /// Keyframes the model holds afterwards.
    pub loaded: usize,
    /// Segments of the text that were dropped.
    pub skipped: usize,
}

struct ModelState<V> {
    keys: KeyframeMap<V>,
    /// Parameter text the keys were last loaded from.
    last_parsed: Option<String>,
    /// Canonical text last written to (or loaded from) the parameter.
    last_written: Option<String>,
}

struct Binding {
    source: Arc<dyn ParameterSource>,
    param: ParamId,
    observer: ObserverId,
}

pub(crate) struct ModelShared<V> {
    state: RwLock<ModelState<V>>,
    observers: Arc<Observers>,
    anchor: Time,
    seed: V,
    settings: KeyframeSettings,
    undo: Arc<UndoStack>,
    binding: RwLock<Option<Binding>>,
}

enum Applied<V> {
    Rejected,
    Unchanged,
    Changed(Sequence<KeyframeEdit<V>>, ChangeRange),
}

impl<V: KeyframeValue> ModelShared<V> {
    /// `pos` re-expressed at the model's frame rate, as stored in the keys.
    fn at(&self, pos: Time) -> Time {
        pos.to_fps(self.settings.fps)
    }

    fn serialize(&self) -> String {
        let state = sync::read(&self.state);
        let keys: Vec<Keyframe<V>> = state.keys.iter().map(owned).collect();
        codec::write_animation(&keys, self.settings.use_opacity)
    }

    /// Plan edits against the current keys and apply them under a single write guard.
    ///
    /// The plan returns `None` to reject the operation and an empty list for a no-op.
    fn apply_plan(
        &self,
        plan: impl FnOnce(&KeyframeMap<V>) -> Option<Vec<KeyframeEdit<V>>>,
    ) -> Applied<V> {
        let mut state = sync::write(&self.state);
        let Some(edits) = plan(&state.keys) else {
            return Applied::Rejected;
        };
        if edits.is_empty() {
            return Applied::Unchanged;
        }
        let seq = Sequence(edits);
        match seq.apply(&mut state.keys) {
            Ok(range) => Applied::Changed(seq, range),
            Err(err) => {
                tracing::warn!(%err, "keyframe edit rejected");
                Applied::Rejected
            }
        }
    }

    fn apply_tracked(
        self: &Arc<Self>,
        tx: &mut Transaction,
        plan: impl FnOnce(&KeyframeMap<V>) -> Option<Vec<KeyframeEdit<V>>>,
    ) -> bool {
        match self.apply_plan(plan) {
            Applied::Rejected => false,
            Applied::Unchanged => true,
            Applied::Changed(seq, range) => {
                tx.notices_mut().push(&self.observers, range);
                tx.push(Box::new(TargetedEdit::new(Arc::downgrade(self), seq)));
                true
            }
        }
    }

    fn apply_untracked(
        &self,
        plan: impl FnOnce(&KeyframeMap<V>) -> Option<Vec<KeyframeEdit<V>>>,
    ) -> bool {
        match self.apply_plan(plan) {
            Applied::Rejected => false,
            Applied::Unchanged => true,
            Applied::Changed(_, range) => {
                self.notify(range);
                true
            }
        }
    }

    fn notify(&self, range: ChangeRange) {
        let mut notices = Notices::new();
        notices.push(&self.observers, range);
        notices.dispatch();
    }

    /// Replace the keys with the content of `text`, without undo history.
    ///
    /// With `from_source`, `text` is remembered as the bound parameter's content so that
    /// neither write-back nor refresh act on it again.
    fn load(&self, text: &str, from_source: bool, notices: &mut Notices) -> ParseReport {
        let parsed = self.parse_text(text);
        let skipped = parsed.skipped;
        let target = self.anchored(parsed.keyframes);
        let loaded = target.len();
        let applied = self.apply_plan(|keys| Some(replace_plan(keys, &target)));
        if from_source {
            let written = self.serialize();
            let mut state = sync::write(&self.state);
            state.last_parsed = Some(text.to_owned());
            state.last_written = Some(written);
        }
        if let Applied::Changed(_, range) = applied {
            notices.push(&self.observers, range);
        }
        ParseReport { loaded, skipped }
    }

    /// Keys a parsed animation should be replaced with: nothing before the anchor, and
    /// always a keyframe at the anchor.
    fn anchored(&self, parsed: Vec<Keyframe<V>>) -> KeyframeMap<V> {
        let mut target = KeyframeMap::new();
        for k in parsed {
            if k.position < self.anchor {
                tracing::warn!(frame = k.position.frame(), "dropping keyframe before anchor");
                continue;
            }
            target.insert(k.position, (k.kind, k.value));
        }
        let first = target.iter().next().map(|(_, kv)| kv.clone());
        match first {
            None => {
                target.insert(
                    self.anchor,
                    (self.settings.default_kind, self.seed.clone()),
                );
            }
            Some(kv) => {
                target.entry(self.anchor).or_insert(kv);
            }
        }
        target
    }

    fn parse_text(&self, text: &str) -> ParsedAnimation<V> {
        codec::parse_animation(text, self.settings.fps, self.settings.default_kind)
    }

    fn write_back(&self) {
        let (source, param) = {
            let binding = sync::read(&self.binding);
            match binding.as_ref() {
                Some(b) => (Arc::clone(&b.source), b.param.clone()),
                None => return,
            }
        };
        let text = self.serialize();
        {
            let mut state = sync::write(&self.state);
            if state.last_written.as_deref() == Some(text.as_str()) {
                return;
            }
            state.last_written = Some(text.clone());
        }
        tracing::trace!(%param, %text, "write back keyframes");
        source.set_value(&param, text);
    }
}

pub(crate) fn add_name(existing: bool) -> &'static str {
    if existing {
        "Change keyframe type"
    } else {
        "Add keyframe"
    }
}

fn owned<V: Clone>((pos, (kind, value)): (&Time, &(KeyframeKind, V))) -> Keyframe<V> {
    Keyframe::new(*pos, *kind, value.clone())
}

fn view<'a, V>((pos, (kind, value)): (&Time, &'a (KeyframeKind, V))) -> KeyframeRef<'a, V> {
    KeyframeRef {
        position: *pos,
        kind: *kind,
        value,
    }
}

/// Value at `pos`: exact on a keyframe, interpolated between two, and clamped to the
/// first / last keyframe outside of them.
fn sample<V: KeyframeValue>(keys: &KeyframeMap<V>, pos: Time, seed: &V) -> V {
    if let Some((_, value)) = keys.get(&pos) {
        return value.clone();
    }
    let mut before = keys.range(..pos).rev();
    let mut after = keys.range((Bound::Excluded(pos), Bound::Unbounded));
    match (before.next().map(view), after.next().map(view)) {
        (Some(prev), Some(next)) => Segment::with_neighbors(
            before.next().map(view),
            prev,
            next,
            after.next().map(view),
        )
        .sample(pos),
        (Some(only), None) | (None, Some(only)) => only.value.clone(),
        (None, None) => seed.clone(),
    }
}

fn upsert_plan<V: KeyframeValue>(
    keys: &KeyframeMap<V>,
    pos: Time,
    kind: KeyframeKind,
    value: V,
) -> Vec<KeyframeEdit<V>> {
    match keys.get(&pos) {
        Some((k, v)) if *k == kind && *v == value => Vec::new(),
        Some(old) => vec![KeyframeEdit::Update {
            position: pos,
            old: old.clone(),
            new: (kind, value),
        }],
        None => vec![KeyframeEdit::Insert {
            position: pos,
            kind,
            value,
        }],
    }
}

/// Turns the current keys into `target` with as few edits as possible.
fn replace_plan<V: KeyframeValue>(
    keys: &KeyframeMap<V>,
    target: &KeyframeMap<V>,
) -> Vec<KeyframeEdit<V>> {
    let mut edits = Vec::new();
    for (pos, (kind, value)) in keys {
        if !target.contains_key(pos) {
            edits.push(KeyframeEdit::Remove {
                position: *pos,
                kind: *kind,
                value: value.clone(),
            });
        }
    }
    for (pos, new) in target {
        match keys.get(pos) {
            Some(old) if old == new => {}
            Some(old) => edits.push(KeyframeEdit::Update {
                position: *pos,
                old: old.clone(),
                new: new.clone(),
            }),
            None => edits.push(KeyframeEdit::Insert {
                position: *pos,
                kind: new.0,
                value: new.1.clone(),
            }),
        }
    }
    edits
}

impl<V: KeyframeValue> EditTarget<Sequence<KeyframeEdit<V>>> for ModelShared<V> {
    fn apply_edit(
        &self,
        edit: &Sequence<KeyframeEdit<V>>,
        notices: &mut Notices,
    ) -> KeyframeResult<()> {
        let range = edit.apply(&mut sync::write(&self.state).keys)?;
        notices.push(&self.observers, range);
        Ok(())
    }
}

/// Sorted keyframes of one parameter, with a permanent keyframe at the anchor.
pub struct KeyframeModel<V: KeyframeValue> {
    shared: Arc<ModelShared<V>>,
}

impl<V: KeyframeValue> KeyframeModel<V> {
    /// Model anchored at frame 0 with default settings, holding `seed` at the anchor.
    pub fn new(seed: V, undo: Arc<UndoStack>) -> Self {
        Self::with_settings(seed, 0, KeyframeSettings::default(), undo)
    }

    pub fn with_settings(
        seed: V,
        anchor_frame: i64,
        settings: KeyframeSettings,
        undo: Arc<UndoStack>,
    ) -> Self {
        let anchor = Time::new(anchor_frame, settings.fps);
        let mut keys = KeyframeMap::new();
        keys.insert(anchor, (settings.default_kind, seed.clone()));
        Self {
            shared: Arc::new(ModelShared {
                state: RwLock::new(ModelState {
                    keys,
                    last_parsed: None,
                    last_written: None,
                }),
                observers: Arc::new(Observers::default()),
                anchor,
                seed,
                settings,
                undo,
                binding: RwLock::new(None),
            }),
        }
    }

    /// Time of `frame` at the model's frame rate.
    pub fn time(&self, frame: i64) -> Time {
        Time::new(frame, self.shared.settings.fps)
    }

    pub fn anchor(&self) -> Time {
        self.shared.anchor
    }

    pub fn settings(&self) -> &KeyframeSettings {
        &self.shared.settings
    }

    pub fn undo_stack(&self) -> &Arc<UndoStack> {
        &self.shared.undo
    }

    fn run(&self, name: &str, f: impl FnOnce(&mut Transaction) -> bool) -> bool {
        let mut tx = Transaction::new();
        let ok = f(&mut tx);
        if ok {
            tx.commit(&self.shared.undo, name);
        } else {
            tx.rollback().dispatch();
        }
        ok
    }

    /// Insert a keyframe, or overwrite kind and value of the one already at `pos`.
    ///
    /// Re-adding an identical keyframe succeeds without recording anything.
    pub fn add_or_update_with(
        &self,
        pos: Time,
        kind: KeyframeKind,
        value: V,
        tx: &mut Transaction,
    ) -> bool {
        let pos = self.shared.at(pos);
        if pos < self.shared.anchor {
            return false;
        }
        self.shared
            .apply_tracked(tx, |keys| Some(upsert_plan(keys, pos, kind, value)))
    }

    /// Recorded as "Change keyframe type" when `pos` already holds a keyframe.
    pub fn add_or_update(&self, pos: Time, kind: KeyframeKind, value: V) -> bool {
        self.run(add_name(self.has_keyframe(pos)), |tx| {
            self.add_or_update_with(pos, kind, value, tx)
        })
    }

    /// Add a keyframe at `pos` holding the value currently interpolated there.
    pub fn add_interpolated_with(&self, pos: Time, kind: KeyframeKind, tx: &mut Transaction) -> bool {
        let pos = self.shared.at(pos);
        if pos < self.shared.anchor {
            return false;
        }
        let seed = &self.shared.seed;
        self.shared.apply_tracked(tx, |keys| {
            let value = sample(keys, pos, seed);
            Some(upsert_plan(keys, pos, kind, value))
        })
    }

    pub fn remove_with(&self, pos: Time, tx: &mut Transaction) -> bool {
        let pos = self.shared.at(pos);
        if pos == self.shared.anchor {
            return false;
        }
        self.shared.apply_tracked(tx, |keys| {
            let (kind, value) = keys.get(&pos)?.clone();
            Some(vec![KeyframeEdit::Remove {
                position: pos,
                kind,
                value,
            }])
        })
    }

    pub fn remove(&self, pos: Time) -> bool {
        self.run("Delete keyframe", |tx| self.remove_with(pos, tx))
    }

    /// Move the keyframe at `old` to `new`, optionally replacing its value.
    ///
    /// Fails when `old` is not a keyframe, when `new` is taken by another keyframe or lies
    /// before the anchor, and when `old` is the anchor itself.
    pub fn move_keyframe_with(
        &self,
        old: Time,
        new: Time,
        new_value: Option<V>,
        tx: &mut Transaction,
    ) -> bool {
        let (old, new) = (self.shared.at(old), self.shared.at(new));
        if old == new {
            return match new_value {
                None => self.has_keyframe(old),
                Some(value) => self.update_value_with(old, value, tx),
            };
        }
        if old == self.shared.anchor || new < self.shared.anchor {
            return false;
        }
        self.shared.apply_tracked(tx, |keys| {
            if keys.contains_key(&new) {
                return None;
            }
            let (kind, value) = keys.get(&old)?.clone();
            let moved = new_value.unwrap_or_else(|| value.clone());
            Some(vec![
                KeyframeEdit::Remove {
                    position: old,
                    kind,
                    value,
                },
                KeyframeEdit::Insert {
                    position: new,
                    kind,
                    value: moved,
                },
            ])
        })
    }

    pub fn move_keyframe(&self, old: Time, new: Time, new_value: Option<V>) -> bool {
        self.run("Move keyframe", |tx| {
            self.move_keyframe_with(old, new, new_value, tx)
        })
    }

    pub fn update_value_with(&self, pos: Time, value: V, tx: &mut Transaction) -> bool {
        let pos = self.shared.at(pos);
        self.shared.apply_tracked(tx, |keys| {
            let old = keys.get(&pos)?;
            if old.1 == value {
                return Some(Vec::new());
            }
            Some(vec![KeyframeEdit::Update {
                position: pos,
                old: old.clone(),
                new: (old.0, value),
            }])
        })
    }

    pub fn update_value(&self, pos: Time, value: V) -> bool {
        self.run("Update keyframe", |tx| self.update_value_with(pos, value, tx))
    }

    pub fn update_kind_with(&self, pos: Time, kind: KeyframeKind, tx: &mut Transaction) -> bool {
        let pos = self.shared.at(pos);
        self.shared.apply_tracked(tx, |keys| {
            let old = keys.get(&pos)?;
            if old.0 == kind {
                return Some(Vec::new());
            }
            Some(vec![KeyframeEdit::Update {
                position: pos,
                old: old.clone(),
                new: (kind, old.1.clone()),
            }])
        })
    }

    pub fn update_kind(&self, pos: Time, kind: KeyframeKind) -> bool {
        self.run("Change keyframe type", |tx| self.update_kind_with(pos, kind, tx))
    }

    /// Copy the keyframe at `src` (kind and value) to the free position `dst`.
    pub fn duplicate_with(&self, src: Time, dst: Time, tx: &mut Transaction) -> bool {
        let (src, dst) = (self.shared.at(src), self.shared.at(dst));
        if dst < self.shared.anchor {
            return false;
        }
        self.shared.apply_tracked(tx, |keys| {
            if keys.contains_key(&dst) {
                return None;
            }
            let (kind, value) = keys.get(&src)?.clone();
            Some(vec![KeyframeEdit::Insert {
                position: dst,
                kind,
                value,
            }])
        })
    }

    pub fn duplicate(&self, src: Time, dst: Time) -> bool {
        self.run("Duplicate keyframe", |tx| self.duplicate_with(src, dst, tx))
    }

    fn remove_matching_with(&self, tx: &mut Transaction, keep: impl Fn(Time) -> bool) -> bool {
        let anchor = self.shared.anchor;
        self.shared.apply_tracked(tx, |keys| {
            Some(
                keys.iter()
                    .filter(|(pos, _)| **pos != anchor && !keep(**pos))
                    .map(|(pos, (kind, value))| KeyframeEdit::Remove {
                        position: *pos,
                        kind: *kind,
                        value: value.clone(),
                    })
                    .collect(),
            )
        })
    }

    /// Remove every keyframe but the anchor.
    pub fn remove_all_with(&self, tx: &mut Transaction) -> bool {
        self.remove_matching_with(tx, |_| false)
    }

    pub fn remove_all(&self) -> bool {
        self.run("Delete all keyframes", |tx| self.remove_all_with(tx))
    }

    /// Remove every keyframe at or after `pos`, except the anchor.
    pub fn remove_next_with(&self, pos: Time, tx: &mut Transaction) -> bool {
        let pos = self.shared.at(pos);
        self.remove_matching_with(tx, |p| p < pos)
    }

    pub fn remove_next(&self, pos: Time) -> bool {
        self.run("Delete keyframes", |tx| self.remove_next_with(pos, tx))
    }

    /// Shift every keyframe at or after `from` by `to - from`.
    ///
    /// Fails if that would move the anchor, or land a keyframe before the anchor or on a
    /// keyframe that is not itself being shifted.
    pub fn offset_with(&self, from: Time, to: Time, tx: &mut Transaction) -> bool {
        let (from, to) = (self.shared.at(from), self.shared.at(to));
        if from == to {
            return true;
        }
        let anchor = self.shared.anchor;
        if from <= anchor {
            return false;
        }
        let delta = to.frames_since(from);
        self.shared.apply_tracked(tx, |keys| {
            let shifted: Vec<(Time, &(KeyframeKind, V))> =
                keys.range(from..).map(|(pos, kv)| (*pos, kv)).collect();
            if shifted.is_empty() {
                return Some(Vec::new());
            }
            let mut edits = Vec::with_capacity(shifted.len() * 2);
            for (pos, (kind, value)) in &shifted {
                edits.push(KeyframeEdit::Remove {
                    position: *pos,
                    kind: *kind,
                    value: value.clone(),
                });
            }
            for (pos, (kind, value)) in &shifted {
                let target = pos.offset(delta);
                if target < anchor || (target < from && keys.contains_key(&target)) {
                    return None;
                }
                edits.push(KeyframeEdit::Insert {
                    position: target,
                    kind: *kind,
                    value: value.clone(),
                });
            }
            Some(edits)
        })
    }

    pub fn offset(&self, from: Time, to: Time) -> bool {
        self.run("Move keyframes", |tx| self.offset_with(from, to, tx))
    }

    /// Follow a resize of the owning clip from `old_in..old_out` to `new_in..new_out`.
    ///
    /// Positions are relative to the clip start, which stays on the anchor. Moving the in
    /// point shifts every later keyframe by the opposite amount; trimming it also hands the
    /// anchor the value found at the new start and drops the keyframes cut away. Trimming
    /// the out point drops the keyframes past the new end and leaves an interpolated one on
    /// it, while extending it carries a lone end keyframe along.
    pub fn resize_with(
        &self,
        old_in: Time,
        old_out: Time,
        new_in: Time,
        new_out: Time,
        tx: &mut Transaction,
    ) -> bool {
        let [old_in, old_out, new_in, new_out] =
            [old_in, old_out, new_in, new_out].map(|t| self.shared.at(t));
        if new_out < new_in {
            return false;
        }
        let anchor = self.shared.anchor;
        let old_end = anchor.offset(old_out.frames_since(new_in));
        let new_end = anchor.offset(new_out.frames_since(new_in));
        self.shift_start_with(new_in.frames_since(old_in), tx)
            && self.trim_end_with(old_end, new_end, tx)
    }

    pub fn resize(&self, old_in: Time, old_out: Time, new_in: Time, new_out: Time) -> bool {
        self.run("Resize keyframes", |tx| {
            self.resize_with(old_in, old_out, new_in, new_out, tx)
        })
    }

    fn shift_start_with(&self, delta: i64, tx: &mut Transaction) -> bool {
        if delta == 0 {
            return true;
        }
        let anchor = self.shared.anchor;
        let seed = &self.shared.seed;
        self.shared.apply_tracked(tx, |keys| {
            let mut edits = Vec::new();
            if delta > 0 {
                let (kind, old) = keys.get(&anchor)?.clone();
                let value = sample(keys, anchor.offset(delta), seed);
                if value != old {
                    edits.push(KeyframeEdit::Update {
                        position: anchor,
                        old: (kind, old),
                        new: (kind, value),
                    });
                }
            }
            let trailing: Vec<(Time, &(KeyframeKind, V))> = keys
                .range((Bound::Excluded(anchor), Bound::Unbounded))
                .map(|(pos, kv)| (*pos, kv))
                .collect();
            for (pos, (kind, value)) in &trailing {
                edits.push(KeyframeEdit::Remove {
                    position: *pos,
                    kind: *kind,
                    value: value.clone(),
                });
            }
            for (pos, (kind, value)) in &trailing {
                let target = pos.offset(-delta);
                if target > anchor {
                    edits.push(KeyframeEdit::Insert {
                        position: target,
                        kind: *kind,
                        value: value.clone(),
                    });
                }
            }
            Some(edits)
        })
    }

    fn trim_end_with(&self, old_end: Time, new_end: Time, tx: &mut Transaction) -> bool {
        let anchor = self.shared.anchor;
        if new_end < anchor {
            return false;
        }
        let seed = &self.shared.seed;
        self.shared.apply_tracked(tx, |keys| {
            let mut trailing = keys.range((Bound::Excluded(anchor), Bound::Unbounded));
            if new_end >= old_end {
                let lone = (trailing.next(), trailing.next());
                return Some(match lone {
                    (Some((pos, (kind, value))), None) if *pos == old_end && new_end > old_end => {
                        vec![
                            KeyframeEdit::Remove {
                                position: old_end,
                                kind: *kind,
                                value: value.clone(),
                            },
                            KeyframeEdit::Insert {
                                position: new_end,
                                kind: *kind,
                                value: value.clone(),
                            },
                        ]
                    }
                    _ => Vec::new(),
                });
            }
            let dropped: Vec<(Time, &(KeyframeKind, V))> = keys
                .range((Bound::Excluded(new_end), Bound::Unbounded))
                .map(|(pos, kv)| (*pos, kv))
                .collect();
            let Some((_, (first_kind, _))) = dropped.first() else {
                return Some(Vec::new());
            };
            let mut edits = Vec::with_capacity(dropped.len() + 1);
            if !keys.contains_key(&new_end) {
                let kind = keys.get(&old_end).map_or(*first_kind, |(k, _)| *k);
                edits.push(KeyframeEdit::Insert {
                    position: new_end,
                    kind,
                    value: sample(keys, new_end, seed),
                });
            }
            for (pos, (kind, value)) in &dropped {
                edits.push(KeyframeEdit::Remove {
                    position: *pos,
                    kind: *kind,
                    value: value.clone(),
                });
            }
            Some(edits)
        })
    }

    /// Replace all keyframes with the content of `text`.
    pub fn replace_with(&self, text: &str, tx: &mut Transaction) -> bool {
        let parsed = self.shared.parse_text(text);
        let target = self.shared.anchored(parsed.keyframes);
        self.shared
            .apply_tracked(tx, |keys| Some(replace_plan(keys, &target)))
    }

    /// Keys `text` would be loaded as, without touching the model.
    pub(crate) fn preview(&self, text: &str) -> KeyframeMap<V> {
        self.shared.anchored(self.shared.parse_text(text).keyframes)
    }

    /// Reload from animation text as one undoable step.
    pub fn reset(&self, text: &str) -> bool {
        self.run("Reset keyframes", |tx| self.replace_with(text, tx))
    }

    /// Load animation text without recording undo history.
    ///
    /// Malformed segments are skipped (and logged), never fatal. A bound model writes the
    /// result back to its parameter.
    #[tracing::instrument(skip(self, text))]
    pub fn parse(&self, text: &str) -> ParseReport {
        let mut notices = Notices::new();
        let report = self.shared.load(text, false, &mut notices);
        notices.dispatch();
        report
    }

    /// Change a keyframe value without recording undo history, e.g. while dragging.
    pub fn direct_update(&self, pos: Time, value: V) -> bool {
        let pos = self.shared.at(pos);
        self.shared.apply_untracked(|keys| {
            let old = keys.get(&pos)?;
            if old.1 == value {
                return Some(Vec::new());
            }
            Some(vec![KeyframeEdit::Update {
                position: pos,
                old: old.clone(),
                new: (old.0, value),
            }])
        })
    }

    /// Attach the model to `param` of `source`.
    ///
    /// The model is loaded from the parameter's current text (or, when the parameter is
    /// unset, writes its own keyframes there), and from then on writes itself back after
    /// every change.
    pub fn bind(
        &self,
        source: Arc<dyn ParameterSource>,
        param: impl Into<ParamId>,
    ) -> KeyframeResult<()> {
        let param = param.into();
        if param.as_str().is_empty() {
            return Err(KeyframeError::validation("parameter id must not be empty"));
        }
        if let Some(previous) = sync::write(&self.shared.binding).take() {
            self.shared.observers.unsubscribe(previous.observer);
        }

        let current = source.value(&param);
        if let Some(text) = &current {
            let mut notices = Notices::new();
            let report = self.shared.load(text, true, &mut notices);
            notices.dispatch();
            tracing::debug!(
                %param,
                loaded = report.loaded,
                skipped = report.skipped,
                "bound keyframes"
            );
        }

        let weak: Weak<ModelShared<V>> = Arc::downgrade(&self.shared);
        let observer = self.shared.observers.subscribe(Arc::new(move |_| {
            if let Some(shared) = weak.upgrade() {
                shared.write_back();
            }
        }));
        *sync::write(&self.shared.binding) = Some(Binding {
            source,
            param,
            observer,
        });
        if current.is_none() {
            self.shared.write_back();
        }
        Ok(())
    }

    pub fn bound_param(&self) -> Option<ParamId> {
        sync::read(&self.shared.binding)
            .as_ref()
            .map(|b| b.param.clone())
    }

    /// Text of the bound parameter if it differs from what the model last loaded or wrote.
    pub fn pending_source_text(&self) -> KeyframeResult<Option<String>> {
        let (source, param) = {
            let binding = sync::read(&self.shared.binding);
            let b = binding
                .as_ref()
                .ok_or_else(|| KeyframeError::validation("keyframe model is not bound"))?;
            (Arc::clone(&b.source), b.param.clone())
        };
        let text = source
            .value(&param)
            .ok_or_else(|| KeyframeError::validation(format!("parameter '{param}' has no value")))?;
        let state = sync::read(&self.shared.state);
        let known = [&state.last_parsed, &state.last_written]
            .into_iter()
            .any(|t| t.as_deref() == Some(text.as_str()));
        Ok((!known).then_some(text))
    }

    /// Load text read from the bound parameter, queueing the notifications.
    pub(crate) fn load_source_text(&self, text: &str, notices: &mut Notices) -> ParseReport {
        self.shared.load(text, true, notices)
    }

    /// Reload from the bound parameter. `Ok(false)` when its text did not change.
    pub fn refresh(&self) -> KeyframeResult<bool> {
        match self.pending_source_text()? {
            None => Ok(false),
            Some(text) => {
                let mut notices = Notices::new();
                self.load_source_text(&text, &mut notices);
                notices.dispatch();
                Ok(true)
            }
        }
    }

    pub fn subscribe(&self, callback: impl Fn(ChangeRange) + Send + Sync + 'static) -> ObserverId {
        self.shared.observers.subscribe(Arc::new(callback))
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.shared.observers.unsubscribe(id)
    }

    pub fn keyframe(&self, pos: Time) -> Option<Keyframe<V>> {
        let pos = self.shared.at(pos);
        sync::read(&self.shared.state)
            .keys
            .get_key_value(&pos)
            .map(owned)
    }

    /// First keyframe strictly after `pos`.
    pub fn next(&self, pos: Time) -> Option<Keyframe<V>> {
        sync::read(&self.shared.state)
            .keys
            .range((Bound::Excluded(pos), Bound::Unbounded))
            .next()
            .map(owned)
    }

    /// Last keyframe strictly before `pos`.
    pub fn prev(&self, pos: Time) -> Option<Keyframe<V>> {
        sync::read(&self.shared.state)
            .keys
            .range(..pos)
            .next_back()
            .map(owned)
    }

    /// Keyframe nearest to `pos`; on a tie the earlier one wins.
    pub fn closest(&self, pos: Time) -> Option<Keyframe<V>> {
        let state = sync::read(&self.shared.state);
        let keys = &state.keys;
        if let Some(exact) = keys.get_key_value(&pos) {
            return Some(owned(exact));
        }
        let prev = keys.range(..pos).next_back();
        let next = keys.range((Bound::Excluded(pos), Bound::Unbounded)).next();
        let pick = match (prev, next) {
            (Some(p), Some(n)) => {
                if pos.frames_since(*p.0) <= n.0.frames_since(pos) {
                    Some(p)
                } else {
                    Some(n)
                }
            }
            (p, n) => p.or(n),
        };
        pick.map(owned)
    }

    pub fn has_keyframe(&self, pos: Time) -> bool {
        let pos = self.shared.at(pos);
        sync::read(&self.shared.state).keys.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        sync::read(&self.shared.state).keys.len()
    }

    /// Always `false`; provided for symmetry with [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        sync::read(&self.shared.state).keys.is_empty()
    }

    pub fn single_keyframe(&self) -> bool {
        self.len() == 1
    }

    pub fn positions(&self) -> Vec<Time> {
        sync::read(&self.shared.state).keys.keys().copied().collect()
    }

    pub fn marks(&self) -> Vec<KeyframeMark> {
        sync::read(&self.shared.state)
            .keys
            .iter()
            .map(|(p, (kind, _))| KeyframeMark {
                position: *p,
                kind: *kind,
            })
            .collect()
    }

    pub fn index_of(&self, pos: Time) -> Option<usize> {
        let pos = self.shared.at(pos);
        let state = sync::read(&self.shared.state);
        state
            .keys
            .contains_key(&pos)
            .then(|| state.keys.range(..pos).count())
    }

    pub fn position_at(&self, index: usize) -> Option<Time> {
        sync::read(&self.shared.state).keys.keys().nth(index).copied()
    }

    pub fn keyframes(&self) -> Vec<Keyframe<V>> {
        sync::read(&self.shared.state)
            .keys
            .iter()
            .map(owned)
            .collect()
    }

    /// Value at `pos`, sampled at the exact instant even when it falls between frames.
    pub fn value_at(&self, pos: Time) -> V {
        sample(&sync::read(&self.shared.state).keys, pos, &self.shared.seed)
    }

    /// Animation text of the current keyframes.
    pub fn serialize(&self) -> String {
        self.shared.serialize()
    }
}

impl<V: KeyframeValue> fmt::Debug for KeyframeModel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyframeModel")
            .field("shape", &V::SHAPE)
            .field("anchor", &self.shared.anchor)
            .field("keyframes", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/keyframe_model.rs"]
mod tests;
