pub mod edit;
pub mod notify;
pub mod step;
pub mod undo;
