//! Register-file capture and comparison oracle for AArch64 codegen
//! tests, with an optional capability-extended (Morello-style)
//! addressing mode.
//!
//! The pieces, leaves first:
//! - [`a64`]: architectural register model (handles, width views,
//!   register lists, NZCV, ISA features).
//! - [`masm`]: recording macro-assembler plus the software machine that
//!   executes recorded programs.
//! - [`oracle`]: register selection, clobbering, state capture and the
//!   comparison predicates.
//! - [`shared`]: lock-free atomic helpers for multi-threaded harness
//!   tests.
//!
//! The end-to-end properties live in `tests/capture.rs`.

pub use regatta_a64 as a64;
pub use regatta_masm as masm;
pub use regatta_oracle as oracle;
pub use regatta_shared as shared;
