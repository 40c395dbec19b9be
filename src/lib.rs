//! Scatto: a small self-hosted photo drop.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
