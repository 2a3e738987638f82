//! Keyframe animation data model for effect and transition parameters.
//!
//! A parameter animated over time is a [`KeyframeModel`]: a sorted map of keyframes, each
//! carrying an interpolation kind and a value (a scalar or a rect). Effects with several
//! animated parameters keep them in a [`KeyframeModelList`], which guarantees that every
//! member has keyframes at the same positions.
//!
//! # Editing model
//!
//! 1. **Edit**: every mutation is an [`Edit`] with an exact inverse, applied under the
//!    model's write lock.
//! 2. **Record**: applied edits are collected into a [`Transaction`]; a failing member of a
//!    composite edit rolls the whole transaction back.
//! 3. **Commit**: named transactions go to an [`UndoStack`], and change notifications are
//!    delivered only after every lock has been released.
//!
//! Models exchange their state with the outside world as animation text
//! (`"0=0;50=100;100|=100"`), see [`parse_animation`] and [`write_animation`].
#![forbid(unsafe_code)]

mod animation;
mod foundation;
mod model;
mod transaction;

pub use animation::codec::{
    ParsedAnimation, RectRanges, offset_animation, parse_animation, parse_animation_strict,
    rect_ranges, write_animation,
};
pub use animation::interp::{Segment, interpolate, value_at};
pub use animation::keyframe::{Keyframe, KeyframeKind, KeyframeMark, KeyframeRef};
pub use animation::value::{KeyframeValue, Lerp, RectValue, Value, ValueShape, catmull_rom};
pub use foundation::config::KeyframeSettings;
pub use foundation::core::{Fps, Time};
pub use foundation::error::{KeyframeError, KeyframeResult};
pub use model::keyframe_model::{KeyframeModel, ParseReport};
pub use model::list::{KeyframeModelList, ListEdit};
pub use model::overlay::{
    OverlayHandle, apply_list_overlay_edit, apply_overlay_edit, list_overlay_handles,
    overlay_handles,
};
pub use model::source::{MemoryParameterSource, ParamId, ParameterSource};
pub use model::track::KeyframeTrack;
pub use transaction::edit::{Edit, KeyframeEdit, KeyframeMap, Sequence};
pub use transaction::notify::{ChangeCallback, ChangeRange, Notices, ObserverId, Observers};
pub use transaction::step::{EditTarget, GatedStep, Step, TargetedEdit, Transaction};
pub use transaction::undo::UndoStack;
