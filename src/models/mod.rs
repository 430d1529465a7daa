//! Data models

mod access;
mod module;
mod role;

pub use access::*;
pub use module::*;
pub use role::*;
