//! Utilities shared by feature slices

pub mod pagination;
pub mod sort;
