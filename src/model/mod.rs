pub mod keyframe_model;
pub mod list;
pub mod overlay;
pub mod source;
pub mod track;
