pub mod marks;
pub mod repo;
