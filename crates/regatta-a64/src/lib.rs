//! AArch64 architectural register model.
//!
//! This crate defines the register handles, register lists and
//! condition-flag word shared by the emitter, the software machine and
//! the capture/comparison oracle:
//! - One handle type per register class (`Register`, `VRegister`), each
//!   carrying an architectural code plus a width view, with explicit
//!   conversions between views of the same code.
//! - Dense bitset register lists with deterministic ascending-code
//!   iteration.
//! - The NZCV condition-flag word.
//! - An explicit [`Features`] flag for the capability-extended
//!   addressing mode (Morello-style), so capability registers are a
//!   runtime configuration rather than a compile-time split.

mod flags;
mod list;
mod registers;

pub use flags::{Nzcv, NZCV_MASK};
pub use list::{CpuRegList, RegList, VRegList};
pub use registers::{
    RegSize, Register, VRegSize, VRegister, NUM_REGISTERS, NUM_VREGISTERS, SP_CODE, ZR_CODE,
};

/// ISA features relevant to the register model.
///
/// `capabilities` enables the capability register bank (`c0..c31`, `czr`,
/// `csp`): 128-bit registers whose low half aliases the corresponding x
/// register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    pub capabilities: bool,
}

impl Features {
    pub const fn with_capabilities() -> Self {
        Features { capabilities: true }
    }
}

/// Returns true when no two handles refer to the same architectural
/// register. Width views of one code count as aliased.
pub fn all_distinct(regs: &[Register]) -> bool {
    for (i, a) in regs.iter().enumerate() {
        for b in &regs[i + 1..] {
            if a.code() == b.code() {
                return false;
            }
        }
    }
    true
}
