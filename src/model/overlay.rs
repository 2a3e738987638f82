//! Data exchanged with the monitor overlay: one on-screen handle per keyframe of a
//! geometry parameter, and handle drags coming back as new rect centres.

use kurbo::Point;

use crate::animation::keyframe::KeyframeKind;
use crate::animation::value::{RectValue, Value};
use crate::foundation::core::Time;
use crate::model::keyframe_model::KeyframeModel;
use crate::model::list::KeyframeModelList;
use crate::model::source::ParamId;
use crate::model::track::KeyframeTrack;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct OverlayHandle {
    pub frame: Time,
    /// Centre of the keyframed rect, in frame coordinates.
    pub position: Point,
    pub kind: KeyframeKind,
}

fn handles_of(track: &dyn KeyframeTrack) -> Vec<OverlayHandle> {
    track
        .positions()
        .into_iter()
        .filter_map(|frame| {
            let mark = track.mark(frame)?;
            let rect = track.value_at(frame).as_rect()?;
            Some(OverlayHandle {
                frame,
                position: rect.center(),
                kind: mark.kind,
            })
        })
        .collect()
}

pub fn overlay_handles(model: &KeyframeModel<RectValue>) -> Vec<OverlayHandle> {
    handles_of(model)
}

/// Move the rect keyed at `frame` so that it is centred on `center`.
///
/// `false` if `frame` is not a keyframe.
pub fn apply_overlay_edit(model: &KeyframeModel<RectValue>, frame: Time, center: Point) -> bool {
    match model.keyframe(frame) {
        Some(k) => model.update_value(frame, k.value.recentered(center)),
        None => false,
    }
}

/// Handles for the rect parameter `param` of `list`; empty for other shapes.
pub fn list_overlay_handles(list: &KeyframeModelList, param: &ParamId) -> Vec<OverlayHandle> {
    list.with_parameter(param, handles_of).unwrap_or_default()
}

pub fn apply_list_overlay_edit(
    list: &KeyframeModelList,
    param: &ParamId,
    frame: Time,
    center: Point,
) -> bool {
    let current = list
        .with_parameter(param, |t| {
            t.mark(frame)?;
            t.value_at(frame).as_rect()
        })
        .flatten();
    match current {
        Some(rect) => list.update_value(frame, param.clone(), Value::Rect(rect.recentered(center))),
        None => false,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/overlay.rs"]
mod tests;
