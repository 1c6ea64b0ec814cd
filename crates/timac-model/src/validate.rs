//! Whole-system structural checks.
//!
//! Checks are pure functions of the system producing diagnostics; new
//! system-wide rules plug in alongside the existing one.

use thiserror::Error;
use timac_system::{EdgeId, System};

/// Violation of a structural rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error(
        "weakly synchronized event {event} shall not be guarded \
         (edge {edge} carries guard {guard})"
    )]
    GuardedWeaklySynchronizedEvent {
        event: String,
        edge: EdgeId,
        guard: String,
    },
}

/// Run every structural rule over the system.
pub fn validate(sys: &System) -> Vec<StructuralError> {
    let mut errors = Vec::new();
    check_guarded_weak_sync(sys, &mut errors);
    errors
}

/// An edge whose event occurs weakly in some synchronisation vector must
/// carry a trivially-true guard.
fn check_guarded_weak_sync(sys: &System, errors: &mut Vec<StructuralError>) {
    for edge in sys.edges() {
        if sys.is_weakly_synchronized(edge.event) && !edge.guard.is_trivially_true() {
            errors.push(StructuralError::GuardedWeaklySynchronizedEvent {
                event: sys.events()[edge.event as usize].name.clone(),
                edge: edge.id,
                guard: edge.guard.to_string(),
            });
        }
    }
}
