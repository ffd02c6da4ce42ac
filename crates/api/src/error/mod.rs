// Path: crates/api/src/error/mod.rs
//! Re-exports the error-kind taxonomy that every
//! collaborator trait's own error enum maps into.
pub use shardnet_types::error::{ErrorKind, HasErrorKind};
