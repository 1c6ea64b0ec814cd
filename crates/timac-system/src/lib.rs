//! Variable catalogs and system graph for timac.
//!
//! A [`System`] is the opaque provider the compilation front-end consumes:
//! ordered locations and edges carrying raw annotations, event labels with
//! synchronisation vectors, and the two variable catalogs.

pub mod system;
pub mod vars;

pub use system::{
    Edge, EdgeId, Event, EventId, LocId, Location, Sync, SyncConstraint, SyncStrength, System,
    SystemError,
};
pub use vars::{Clocks, DeclError, IntVarInfo, IntVars, VarData, VarId, Variables};
