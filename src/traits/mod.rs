//! Core traits for resolution and release.

mod release;
mod resolver;

pub use release::{AsyncRelease, Release};
pub use resolver::{ResolveCore, Resolver};
