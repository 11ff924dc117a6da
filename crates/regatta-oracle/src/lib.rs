//! Architectural-state capture and comparison oracle for AArch64
//! codegen tests.
//!
//! A test emits the instruction sequence under scrutiny, appends a
//! [`RegisterDump`] capture, runs the program on the software machine
//! and then judges the captured state with the `equal_*` predicates:
//! - [`dump`] snapshots the entire visible register file into guest
//!   memory without net side effects on any register.
//! - [`select`] deterministically picks registers for a test out of an
//!   allowed pool, materialized under every width view.
//! - [`clobber`] seeds registers with a known pattern so tests catch
//!   reliance on stale register contents.
//! - [`compare`] holds the width- and class-specific equality
//!   predicates, including the zero-extension and bit-exact
//!   floating-point checks naive equality would miss.

pub mod clobber;
pub mod compare;
pub mod dump;
pub mod select;

pub use clobber::{clobber, clobber_cpu, clobber_fp, CLOBBER_FP_BITS, CLOBBER_VALUE};
pub use compare::{
    equal_128, equal_128_reg, equal_32, equal_32_reg, equal_64, equal_64_reg, equal_64_regs,
    equal_cap, equal_cap_reg, equal_cap_regs, equal_fp32, equal_fp32_reg, equal_fp64,
    equal_fp64_reg, equal_nzcv, equal_registers,
};
pub use dump::RegisterDump;
pub use select::{populate_register_array, populate_vregister_array};
