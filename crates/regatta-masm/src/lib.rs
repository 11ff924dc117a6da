//! Recording macro-assembler and software machine for AArch64 test
//! programs.
//!
//! Test code is emitted against [`MacroAssembler`], which records a
//! stream of [`Instr`] values and tracks which scratch registers the
//! emitter may use. The stream is later executed by [`Machine`], a
//! software register file plus flat little-endian guest memory. The
//! split keeps emission a pure scheduling step: nothing runs until the
//! machine is asked to run the finished program.

mod machine;
mod masm;

pub use machine::{ExecError, Machine, MEM_BASE};
pub use masm::{CpuReg, Instr, MacroAssembler, ScratchExclusion};
