//! Type universe for exprtree.
//!
//! - [`TypeRegistry`]: user types and members, and the default [`OperatorResolver`]
//! - [`CachedResolver`]: thread-safe memoisation for any resolver
//!
//! [`OperatorResolver`]: exprtree_core::OperatorResolver

mod cached;
mod registry;

pub use cached::CachedResolver;
pub use registry::{RegistrationError, TypeRegistry};
