//! Library catalog service built on the ATLAS module framework.

pub mod bootstrap;
pub mod modules;

pub use bootstrap::{build_registry, run};
