//! Compiled model of a system.
//!
//! A model owns, per location, the typed invariant and its bytecode, and
//! per edge the typed guard and statement with their bytecode, indexed by
//! the dense location/edge ids of the underlying system.

use crate::validate::{validate, StructuralError};
use thiserror::Error;
use timac_syntax::{Expr, Stmt};
use timac_system::{EdgeId, LocId, System};
use timac_types::{typecheck_expr, typecheck_stmt, DiagnosticSink, TypedExpr, TypedStmt};
use timac_vm::{compile_expr, compile_stmt, CompileError, Program};
use tracing::{debug, info};

/// Model construction error.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A structural rule failed; construction stopped before compilation.
    #[error("invalid system: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<StructuralError>),
    /// Type checking or lowering reported errors through the sink.
    #[error("system compilation failed with {0} error(s)")]
    CompileFailed(usize),
}

/// A system together with typed ASTs and bytecode for all its annotations.
#[derive(Debug)]
pub struct Model {
    system: System,
    typed_invariants: Vec<TypedExpr>,
    invariants_bytecode: Vec<Program>,
    typed_guards: Vec<TypedExpr>,
    guards_bytecode: Vec<Program>,
    typed_statements: Vec<TypedStmt>,
    statements_bytecode: Vec<Program>,
}

impl Model {
    /// Build a model from a system.
    ///
    /// Runs the structural checks, then type-checks and compiles every
    /// location invariant and every edge guard and statement. Per-annotation
    /// errors accumulate in `diag` so one run surfaces all of them; any
    /// error fails construction.
    pub fn new(system: System, diag: &mut dyn DiagnosticSink) -> Result<Self, ModelError> {
        let structural = validate(&system);
        if !structural.is_empty() {
            debug!(errors = structural.len(), "structural validation failed");
            return Err(ModelError::Invalid(structural));
        }

        let before = diag.error_count();

        let mut typed_invariants = Vec::with_capacity(system.locations_count());
        let mut invariants_bytecode = Vec::with_capacity(system.locations_count());
        for loc in system.locations() {
            let context = format!("Attribute invariant: {}", loc.invariant);
            debug!(location = loc.id, name = %loc.name, "compiling invariant");
            let typed = typecheck(&loc.invariant, &system, diag, &context);
            invariants_bytecode.push(compile(compile_expr(&typed), diag, &context));
            typed_invariants.push(typed);
        }

        let mut typed_guards = Vec::with_capacity(system.edges_count());
        let mut guards_bytecode = Vec::with_capacity(system.edges_count());
        let mut typed_statements = Vec::with_capacity(system.edges_count());
        let mut statements_bytecode = Vec::with_capacity(system.edges_count());
        for edge in system.edges() {
            debug!(edge = edge.id, "compiling guard and statement");

            let context = format!("Attribute provided: {}", edge.guard);
            let typed = typecheck(&edge.guard, &system, diag, &context);
            guards_bytecode.push(compile(compile_expr(&typed), diag, &context));
            typed_guards.push(typed);

            let context = format!("Attribute do: {}", edge.stmt);
            let typed = typecheck_statement(&edge.stmt, &system, diag, &context);
            statements_bytecode.push(compile(compile_stmt(&typed), diag, &context));
            typed_statements.push(typed);
        }

        let errors = diag.error_count() - before;
        if errors > 0 {
            return Err(ModelError::CompileFailed(errors));
        }

        info!(
            locations = system.locations_count(),
            edges = system.edges_count(),
            "model compiled"
        );

        Ok(Self {
            system,
            typed_invariants,
            invariants_bytecode: take_all(invariants_bytecode),
            typed_guards,
            guards_bytecode: take_all(guards_bytecode),
            typed_statements,
            statements_bytecode: take_all(statements_bytecode),
        })
    }

    /// The underlying system.
    pub fn system(&self) -> &System {
        &self.system
    }

    /// Type-checked invariant of a location. Out-of-range ids are a
    /// programming error.
    pub fn typed_invariant(&self, loc: LocId) -> &TypedExpr {
        &self.typed_invariants[loc as usize]
    }

    /// Type-checked guard of an edge.
    pub fn typed_guard(&self, edge: EdgeId) -> &TypedExpr {
        &self.typed_guards[edge as usize]
    }

    /// Type-checked statement of an edge.
    pub fn typed_statement(&self, edge: EdgeId) -> &TypedStmt {
        &self.typed_statements[edge as usize]
    }

    /// Bytecode of a location invariant.
    pub fn invariant_bytecode(&self, loc: LocId) -> &Program {
        &self.invariants_bytecode[loc as usize]
    }

    /// Bytecode of an edge guard.
    pub fn guard_bytecode(&self, edge: EdgeId) -> &Program {
        &self.guards_bytecode[edge as usize]
    }

    /// Bytecode of an edge statement.
    pub fn statement_bytecode(&self, edge: EdgeId) -> &Program {
        &self.statements_bytecode[edge as usize]
    }
}

impl Clone for Model {
    /// Deep-clone the typed trees and recompile their bytecode.
    fn clone(&self) -> Self {
        Self {
            system: self.system.clone(),
            typed_invariants: self.typed_invariants.clone(),
            invariants_bytecode: self
                .typed_invariants
                .iter()
                .map(|typed| {
                    compile_expr(typed).expect("recompilation of a compiled invariant")
                })
                .collect(),
            typed_guards: self.typed_guards.clone(),
            guards_bytecode: self
                .typed_guards
                .iter()
                .map(|typed| compile_expr(typed).expect("recompilation of a compiled guard"))
                .collect(),
            typed_statements: self.typed_statements.clone(),
            statements_bytecode: self
                .typed_statements
                .iter()
                .map(|typed| {
                    compile_stmt(typed).expect("recompilation of a compiled statement")
                })
                .collect(),
        }
    }
}

/// Type check an expression annotation, reporting under `context`.
fn typecheck(
    expr: &Expr,
    system: &System,
    diag: &mut dyn DiagnosticSink,
    context: &str,
) -> TypedExpr {
    typecheck_expr(expr, system.intvars(), system.clocks(), &mut |message| {
        diag.error(context, &message)
    })
}

/// Type check a statement annotation, reporting under `context`.
fn typecheck_statement(
    stmt: &Stmt,
    system: &System,
    diag: &mut dyn DiagnosticSink,
    context: &str,
) -> TypedStmt {
    typecheck_stmt(stmt, system.intvars(), system.clocks(), &mut |message| {
        diag.error(context, &message)
    })
}

/// Record the outcome of a lowering attempt.
///
/// Ill-typed trees were already reported by the type checker, so only
/// genuinely new compilation errors reach the sink.
fn compile(
    result: Result<Program, CompileError>,
    diag: &mut dyn DiagnosticSink,
    context: &str,
) -> Option<Program> {
    match result {
        Ok(program) => Some(program),
        Err(error) => {
            if !matches!(
                error,
                CompileError::IllTypedExpr(_) | CompileError::IllTypedStmt(_)
            ) {
                diag.error(context, &error.to_string());
            }
            None
        }
    }
}

/// Unwrap per-annotation bytecode after the error tally confirmed success.
fn take_all(programs: Vec<Option<Program>>) -> Vec<Program> {
    programs
        .into_iter()
        .map(|p| p.expect("bytecode present when no error was recorded"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use timac_syntax::{parse_expr, parse_stmt};
    use timac_types::Diagnostics;

    fn clock_system(invariant: &str) -> System {
        let mut sys = System::new("test");
        sys.declare_clock("x", 1).unwrap();
        sys.add_location("L0", Some(parse_expr(invariant).unwrap()));
        sys
    }

    #[test]
    fn test_construction_owns_artifacts() {
        let mut sys = System::new("test");
        sys.declare_intvar("i", 1, 0, 10, 0).unwrap();
        let tick = sys.declare_event("tick").unwrap();
        let l0 = sys.add_location("L0", None);
        let l1 = sys.add_location("L1", Some(parse_expr("i<=7").unwrap()));
        sys.add_edge(
            l0,
            l1,
            tick,
            Some(parse_expr("i<3").unwrap()),
            Some(parse_stmt("i=i+1").unwrap()),
        )
        .unwrap();

        let mut diag = Diagnostics::new();
        let model = Model::new(sys, &mut diag).unwrap();
        assert_eq!(diag.error_count(), 0);
        assert_eq!(model.typed_invariant(l0).to_string(), "true");
        assert_eq!(model.typed_guard(0).to_string(), "i<3");
        assert_eq!(model.typed_statement(0).to_string(), "i=i+1");
    }

    #[test]
    fn test_type_error_fails_construction() {
        let mut diag = Diagnostics::new();
        let result = Model::new(clock_system("x+1<=5"), &mut diag);
        assert!(matches!(result, Err(ModelError::CompileFailed(1))));
        assert_eq!(diag.error_count(), 1);
        assert!(diag.errors()[0].message.contains("clock in arithmetic"));
        assert!(diag.errors()[0]
            .context
            .contains("Attribute invariant: x+1<=5"));
    }

    #[test]
    fn test_clone_recompiles_identical_bytecode() {
        let mut diag = Diagnostics::new();
        let model = Model::new(clock_system("x<=5"), &mut diag).unwrap();
        let copy = model.clone();
        assert_eq!(
            model.invariant_bytecode(0).instrs(),
            copy.invariant_bytecode(0).instrs()
        );
    }
}
