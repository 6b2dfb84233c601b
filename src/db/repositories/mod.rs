pub mod datasets;
pub mod field_types;
pub mod heuristics;
