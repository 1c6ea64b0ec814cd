//! System graph: locations, edges, events, and synchronisation vectors.

use crate::vars::{Clocks, DeclError, IntVarInfo, IntVars, VarId};
use thiserror::Error;
use timac_syntax::{Expr, Stmt};

/// Location identifier, dense from 0.
pub type LocId = u32;
/// Edge identifier, dense from 0.
pub type EdgeId = u32;
/// Event identifier, dense from 0.
pub type EventId = u32;

/// System construction error.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Decl(#[from] DeclError),
    #[error("unknown location id {0}")]
    UnknownLocation(LocId),
    #[error("unknown event id {0}")]
    UnknownEvent(EventId),
    #[error("event {0} is already declared")]
    DuplicateEvent(String),
    #[error("synchronisation vector is empty")]
    EmptySync,
}

/// A location with its invariant annotation.
#[derive(Debug, Clone)]
pub struct Location {
    pub id: LocId,
    pub name: String,
    /// Invariant; the literal `true` when none was given.
    pub invariant: Expr,
}

/// A directed edge with its guard and update annotations.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub source: LocId,
    pub target: LocId,
    pub event: EventId,
    /// Guard; the literal `true` when none was given.
    pub guard: Expr,
    /// Update statement; `nop` when none was given.
    pub stmt: Stmt,
}

/// An event label.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub name: String,
}

/// Strength of one event occurrence inside a synchronisation vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrength {
    /// The event must fire together with its partners.
    Strong,
    /// The event may fire with or without its partners.
    Weak,
}

/// One event occurrence in a synchronisation vector.
#[derive(Debug, Clone)]
pub struct SyncConstraint {
    pub event: EventId,
    pub strength: SyncStrength,
}

/// A synchronisation vector over events.
#[derive(Debug, Clone)]
pub struct Sync {
    pub constraints: Vec<SyncConstraint>,
}

/// A system of locations and edges over integer variables and clocks.
#[derive(Debug, Clone)]
pub struct System {
    name: String,
    locations: Vec<Location>,
    edges: Vec<Edge>,
    events: Vec<Event>,
    syncs: Vec<Sync>,
    intvars: IntVars,
    clocks: Clocks,
}

impl System {
    /// Create an empty system.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locations: Vec::new(),
            edges: Vec::new(),
            events: Vec::new(),
            syncs: Vec::new(),
            intvars: IntVars::new(),
            clocks: Clocks::new(),
        }
    }

    /// System name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // === Declarations ===

    /// Declare a bounded integer variable (`size` 1 for a scalar).
    pub fn declare_intvar(
        &mut self,
        name: &str,
        size: u32,
        min: i64,
        max: i64,
        initial: i64,
    ) -> Result<VarId, SystemError> {
        if initial < min || initial > max {
            return Err(DeclError::InitialOutOfBounds {
                name: name.to_string(),
                initial,
                min,
                max,
            }
            .into());
        }
        Ok(self
            .intvars
            .declare(name, size, IntVarInfo { min, max, initial })?)
    }

    /// Declare a clock (`size` 1 for a scalar).
    pub fn declare_clock(&mut self, name: &str, size: u32) -> Result<VarId, SystemError> {
        Ok(self.clocks.declare(name, size, ())?)
    }

    /// Declare an event label.
    pub fn declare_event(&mut self, name: &str) -> Result<EventId, SystemError> {
        if self.events.iter().any(|e| e.name == name) {
            return Err(SystemError::DuplicateEvent(name.to_string()));
        }
        let id = self.events.len() as EventId;
        self.events.push(Event {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    /// Add a location. A missing invariant defaults to the literal `true`.
    pub fn add_location(&mut self, name: &str, invariant: Option<Expr>) -> LocId {
        let id = self.locations.len() as LocId;
        self.locations.push(Location {
            id,
            name: name.to_string(),
            invariant: invariant.unwrap_or(Expr::Bool(true)),
        });
        id
    }

    /// Add an edge. A missing guard defaults to the literal `true`, a missing
    /// statement to `nop`.
    pub fn add_edge(
        &mut self,
        source: LocId,
        target: LocId,
        event: EventId,
        guard: Option<Expr>,
        stmt: Option<Stmt>,
    ) -> Result<EdgeId, SystemError> {
        if source as usize >= self.locations.len() {
            return Err(SystemError::UnknownLocation(source));
        }
        if target as usize >= self.locations.len() {
            return Err(SystemError::UnknownLocation(target));
        }
        if event as usize >= self.events.len() {
            return Err(SystemError::UnknownEvent(event));
        }
        let id = self.edges.len() as EdgeId;
        self.edges.push(Edge {
            id,
            source,
            target,
            event,
            guard: guard.unwrap_or(Expr::Bool(true)),
            stmt: stmt.unwrap_or(Stmt::Nop),
        });
        Ok(id)
    }

    /// Add a synchronisation vector over the given event occurrences.
    pub fn add_sync(
        &mut self,
        constraints: Vec<(EventId, SyncStrength)>,
    ) -> Result<(), SystemError> {
        if constraints.is_empty() {
            return Err(SystemError::EmptySync);
        }
        for &(event, _) in &constraints {
            if event as usize >= self.events.len() {
                return Err(SystemError::UnknownEvent(event));
            }
        }
        self.syncs.push(Sync {
            constraints: constraints
                .into_iter()
                .map(|(event, strength)| SyncConstraint { event, strength })
                .collect(),
        });
        Ok(())
    }

    // === Provider surface ===

    /// Locations in id order.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Edges in id order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Events in id order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Synchronisation vectors in declaration order.
    pub fn syncs(&self) -> &[Sync] {
        &self.syncs
    }

    /// Number of locations.
    pub fn locations_count(&self) -> usize {
        self.locations.len()
    }

    /// Number of edges.
    pub fn edges_count(&self) -> usize {
        self.edges.len()
    }

    /// Integer variable catalog.
    pub fn intvars(&self) -> &IntVars {
        &self.intvars
    }

    /// Clock catalog.
    pub fn clocks(&self) -> &Clocks {
        &self.clocks
    }

    /// Whether the event occurs weakly in at least one synchronisation
    /// vector.
    pub fn is_weakly_synchronized(&self, event: EventId) -> bool {
        self.syncs.iter().any(|sync| {
            sync.constraints
                .iter()
                .any(|c| c.event == event && c.strength == SyncStrength::Weak)
        })
    }
}
