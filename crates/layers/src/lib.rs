pub mod animation;
pub mod dataset;
pub mod engine;
pub mod highlight;
pub mod instagram;
pub mod layer;
pub mod overlay;
pub mod params;
pub mod selection;

pub use layer::*;
