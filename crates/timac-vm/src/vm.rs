//! Stack-VM executor for compiled programs.
//!
//! The machine runs a program against an integer memory indexed by flat
//! offsets; clock instructions never touch values, they record constraints
//! and resets into a side-channel log for the surrounding exploration
//! engine to interpret.

use crate::bytecode::{ClkCmp, Instr, Program};
use thiserror::Error;

/// Clock id pushed by `LOAD_CLK` and consumed by the side channel.
pub type ClockId = u32;

/// Runtime trap.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("index {index} out of bounds for array of size {size}")]
    IndexOutOfBounds { index: i64, size: u32 },
    #[error("FAIL instruction executed")]
    Failure,
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("jump target outside program")]
    BadJump,
}

/// A recorded clock constraint `clock cmp bound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConstraint {
    pub clock: ClockId,
    pub cmp: ClkCmp,
    pub bound: i64,
}

/// Side channel collecting the clock effects of a run.
#[derive(Debug, Clone, Default)]
pub struct ClockLog {
    pub constraints: Vec<ClockConstraint>,
    pub resets: Vec<ClockId>,
}

impl ClockLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all recorded effects.
    pub fn clear(&mut self) {
        self.constraints.clear();
        self.resets.clear();
    }
}

/// The stack machine.
#[derive(Debug, Default)]
pub struct Vm {
    stack: Vec<i64>,
}

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a program against the given integer memory.
    ///
    /// `mem` must cover the integer layout the program was compiled
    /// against. Returns the top of the operand stack after `HALT`
    /// (expression programs leave their value there; statement programs
    /// leave nothing).
    pub fn run(
        &mut self,
        program: &Program,
        mem: &mut [i64],
        clocks: &mut ClockLog,
    ) -> Result<Option<i64>, VmError> {
        self.stack.clear();
        let code = program.instrs();
        let mut pc = 0usize;

        loop {
            let instr = *code.get(pc).ok_or(VmError::BadJump)?;
            pc += 1;
            match instr {
                Instr::Push(k) => self.stack.push(k),
                Instr::LoadInt(off) => self.stack.push(mem[off as usize]),
                Instr::StoreInt(off) => {
                    let value = self.pop()?;
                    mem[off as usize] = value;
                }
                Instr::LoadIntDyn { base, size } => {
                    let index = self.index_in(size)?;
                    self.stack.push(mem[(base + index) as usize]);
                }
                Instr::StoreIntDyn { base, size } => {
                    let index = self.index_in(size)?;
                    let value = self.pop()?;
                    mem[(base + index) as usize] = value;
                }
                Instr::LoadClk(off) => self.stack.push(off as i64),
                Instr::LoadClkDyn { base, size } => {
                    let index = self.index_in(size)?;
                    self.stack.push((base + index) as i64);
                }
                Instr::ResetClk => {
                    let clock = self.pop()?;
                    clocks.resets.push(clock as ClockId);
                }

                Instr::Add => self.binary_op(|a, b| a.wrapping_add(b))?,
                Instr::Sub => self.binary_op(|a, b| a.wrapping_sub(b))?,
                Instr::Mul => self.binary_op(|a, b| a.wrapping_mul(b))?,
                Instr::Div => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    if b == 0 {
                        return Err(VmError::DivisionByZero);
                    }
                    self.stack.push(a.wrapping_div(b));
                }
                Instr::Mod => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    if b == 0 {
                        return Err(VmError::DivisionByZero);
                    }
                    self.stack.push(a.wrapping_rem(b));
                }
                Instr::Neg => {
                    let a = self.pop()?;
                    self.stack.push(a.wrapping_neg());
                }

                Instr::Eq => self.binary_op(|a, b| (a == b) as i64)?,
                Instr::Ne => self.binary_op(|a, b| (a != b) as i64)?,
                Instr::Lt => self.binary_op(|a, b| (a < b) as i64)?,
                Instr::Le => self.binary_op(|a, b| (a <= b) as i64)?,
                Instr::Gt => self.binary_op(|a, b| (a > b) as i64)?,
                Instr::Ge => self.binary_op(|a, b| (a >= b) as i64)?,

                Instr::Land => self.binary_op(|a, b| (a != 0 && b != 0) as i64)?,
                Instr::Lor => self.binary_op(|a, b| (a != 0 || b != 0) as i64)?,
                Instr::Lnot => {
                    let a = self.pop()?;
                    self.stack.push((a == 0) as i64);
                }

                Instr::Jz(rel) => {
                    let value = self.pop()?;
                    if value == 0 {
                        pc = jump(pc, rel, code.len())?;
                    }
                }
                Instr::Jnz(rel) => {
                    let value = self.pop()?;
                    if value != 0 {
                        pc = jump(pc, rel, code.len())?;
                    }
                }

                Instr::Clk(cmp) => {
                    let bound = self.pop()?;
                    let clock = self.pop()?;
                    clocks.constraints.push(ClockConstraint {
                        clock: clock as ClockId,
                        cmp,
                        bound,
                    });
                    // Constraints are abstracted as true at this level.
                    self.stack.push(1);
                }

                Instr::Fail => return Err(VmError::Failure),
                Instr::Halt => return Ok(self.stack.pop()),
            }
        }
    }

    fn pop(&mut self) -> Result<i64, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pop a dynamic index and trap unless it addresses an array of `size`.
    fn index_in(&mut self, size: u32) -> Result<u32, VmError> {
        let index = self.pop()?;
        if index < 0 || index >= size as i64 {
            return Err(VmError::IndexOutOfBounds { index, size });
        }
        Ok(index as u32)
    }

    fn binary_op(&mut self, f: impl FnOnce(i64, i64) -> i64) -> Result<(), VmError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.stack.push(f(a, b));
        Ok(())
    }
}

fn jump(pc: usize, rel: i32, len: usize) -> Result<usize, VmError> {
    let target = pc as i64 + rel as i64;
    if target < 0 || target as usize >= len {
        return Err(VmError::BadJump);
    }
    Ok(target as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile_expr, compile_stmt};
    use timac_syntax::{parse_expr, parse_stmt};
    use timac_system::System;
    use timac_types::{typecheck_expr, typecheck_stmt};

    fn sample_system() -> System {
        let mut sys = System::new("test");
        sys.declare_intvar("i", 1, 0, 10, 0).unwrap();
        sys.declare_intvar("a", 3, 0, 10, 0).unwrap();
        sys.declare_clock("x", 1).unwrap();
        sys.declare_clock("y", 2).unwrap();
        sys
    }

    fn eval_expr(source: &str, mem: &mut [i64], clocks: &mut ClockLog) -> Result<i64, VmError> {
        let sys = sample_system();
        let typed = typecheck_expr(
            &parse_expr(source).unwrap(),
            sys.intvars(),
            sys.clocks(),
            &mut |msg| panic!("unexpected type error: {msg}"),
        );
        let program = compile_expr(&typed).unwrap();
        Vm::new()
            .run(&program, mem, clocks)
            .map(|v| v.expect("expression programs leave a value"))
    }

    fn exec_stmt(source: &str, mem: &mut [i64], clocks: &mut ClockLog) -> Result<(), VmError> {
        let sys = sample_system();
        let typed = typecheck_stmt(
            &parse_stmt(source).unwrap(),
            sys.intvars(),
            sys.clocks(),
            &mut |msg| panic!("unexpected type error: {msg}"),
        );
        let program = compile_stmt(&typed).unwrap();
        Vm::new().run(&program, mem, clocks).map(|_| ())
    }

    #[test]
    fn test_eval_integer_guard() {
        let mut mem = [2, 0, 0, 0];
        let mut clocks = ClockLog::new();
        assert_eq!(eval_expr("i<3", &mut mem, &mut clocks), Ok(1));
        assert_eq!(eval_expr("i==3", &mut mem, &mut clocks), Ok(0));
        assert_eq!(eval_expr("(i+4)/2%3", &mut mem, &mut clocks), Ok(0));
    }

    #[test]
    fn test_short_circuit_evaluation() {
        let mut mem = [0, 5, 6, 7];
        let mut clocks = ClockLog::new();
        // i==0 short-circuits the division by zero on the right
        assert_eq!(eval_expr("i!=0&&10/i>1", &mut mem, &mut clocks), Ok(0));
        assert_eq!(eval_expr("i==0||10/i>1", &mut mem, &mut clocks), Ok(1));
        // without the guard the division traps
        assert_eq!(
            eval_expr("10/i>1", &mut mem, &mut clocks),
            Err(VmError::DivisionByZero)
        );
    }

    #[test]
    fn test_statement_updates_memory() {
        let mut mem = [1, 10, 20, 30];
        let mut clocks = ClockLog::new();
        exec_stmt("i=i+1; a[0]=a[i]", &mut mem, &mut clocks).unwrap();
        assert_eq!(mem, [2, 30, 20, 30]);
    }

    #[test]
    fn test_clock_constraint_side_channel() {
        let mut mem = [0, 0, 0, 0];
        let mut clocks = ClockLog::new();
        assert_eq!(eval_expr("x<=5&&y[1]>2", &mut mem, &mut clocks), Ok(1));
        assert_eq!(
            clocks.constraints,
            vec![
                ClockConstraint {
                    clock: 0,
                    cmp: ClkCmp::Le,
                    bound: 5
                },
                ClockConstraint {
                    clock: 2,
                    cmp: ClkCmp::Gt,
                    bound: 2
                },
            ]
        );
    }

    #[test]
    fn test_clock_reset_side_channel() {
        let mut mem = [1, 0, 0, 0];
        let mut clocks = ClockLog::new();
        exec_stmt("x=0; y[i]=0", &mut mem, &mut clocks).unwrap();
        assert_eq!(clocks.resets, vec![0, 2]);
    }

    #[test]
    fn test_dynamic_index_trap() {
        let mut mem = [7, 0, 0, 0];
        let mut clocks = ClockLog::new();
        assert_eq!(
            eval_expr("a[i]", &mut mem, &mut clocks),
            Err(VmError::IndexOutOfBounds { index: 7, size: 3 })
        );
    }

    #[test]
    fn test_fail_traps() {
        let program = Program::new(vec![Instr::Fail, Instr::Halt]);
        let mut clocks = ClockLog::new();
        assert_eq!(
            Vm::new().run(&program, &mut [], &mut clocks),
            Err(VmError::Failure)
        );
    }

    #[test]
    fn test_eager_boolean_ops() {
        let program = Program::new(vec![
            Instr::Push(1),
            Instr::Push(0),
            Instr::Land,
            Instr::Push(1),
            Instr::Lor,
            Instr::Lnot,
            Instr::Halt,
        ]);
        let mut clocks = ClockLog::new();
        assert_eq!(
            Vm::new().run(&program, &mut [], &mut clocks),
            Ok(Some(0))
        );
    }
}
