//! View models and template rendering helpers.

pub mod views;
