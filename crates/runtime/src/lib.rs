pub mod activity;
pub mod timer;

pub use activity::*;
pub use timer::*;
