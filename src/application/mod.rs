//! Application services layer scaffolding.

pub mod error;
pub mod gallery;
pub mod store;
