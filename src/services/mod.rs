//! Business logic services
//!
//! Pure pieces (`FallbackResolver`, `PermissionMerger`, `CascadeEditor`) do no
//! I/O. `AccessService` and `RoleRegistry` sit on top of the stores.

pub mod cascade;
pub mod engine;
pub mod fallback;
pub mod merger;
pub mod role_registry;

pub use cascade::CascadeEditor;
pub use engine::AccessService;
pub use fallback::FallbackResolver;
pub use merger::PermissionMerger;
pub use role_registry::RoleRegistry;
