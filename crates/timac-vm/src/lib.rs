//! Bytecode compiler and stack VM for timac annotations.
//!
//! Typed trees lower to flat instruction streams ending in `HALT`; the VM
//! executes them against an integer memory, recording clock constraints and
//! resets into a side channel.

pub mod bytecode;
pub mod compile;
pub mod vm;

pub use bytecode::{ClkCmp, Instr, Program};
pub use compile::{compile_expr, compile_stmt, CompileError, CompileResult};
pub use vm::{ClockConstraint, ClockId, ClockLog, Vm, VmError};
