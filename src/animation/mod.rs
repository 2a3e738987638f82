pub mod codec;
pub mod interp;
pub mod keyframe;
pub mod value;
