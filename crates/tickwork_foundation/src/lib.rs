//! Type keys, entity identifiers, and error types for Tickwork.
//!
//! This crate provides:
//! - [`TypeKey`] - Stable, hashable, ordered identity for a registered type
//! - [`TypeKeyStrategy`] - Swappable strategies producing type keys
//! - [`EntityId`] - Monotonic entity identifiers with a reserved invalid id
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod error;
pub mod type_key;

pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use type_key::{
    ActiveTypeKeys, CountedTypeKeys, NativeTypeKeys, TypeKey, TypeKeyStrategy, type_key_of,
};
