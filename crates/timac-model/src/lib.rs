//! Compiled model: typed ASTs and bytecode for a whole system.
//!
//! Construction validates the system structurally, then drives the type
//! checker and the bytecode compiler over every location invariant and
//! every edge guard and statement, accumulating diagnostics so a single
//! run surfaces all user-visible errors.

pub mod model;
pub mod validate;

pub use model::{Model, ModelError};
pub use validate::{validate, StructuralError};
