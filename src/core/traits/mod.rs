//! Trait definitions for model backends.
//!
//! [`ModelLoader`] turns a source path into a [`ModelBackend`]; the registry owns
//! the resulting backends and the dispatcher invokes them.

pub mod backend;

pub use backend::{ModelBackend, ModelLoader};
