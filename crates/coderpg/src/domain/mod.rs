pub mod errors;
pub mod model;
pub mod ranges;
pub mod tree;
