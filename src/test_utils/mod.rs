//! Shared pages, controls and helpers for the unit tests
mod common;
mod controls;
mod pages;

pub use common::*;
pub use controls::*;
pub use pages::*;
