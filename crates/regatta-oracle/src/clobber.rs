use regatta_a64::{CpuRegList, RegList, VRegList, VRegister};
use regatta_masm::MacroAssembler;

/// Default integer clobber pattern; recognizable in dumps and wide
/// enough to light up all 64 bits.
pub const CLOBBER_VALUE: u64 = 0xFEDC_BA98_7654_3210;

/// Default floating clobber pattern: a NaN with a distinctive payload,
/// so accidental arithmetic on a clobbered register is conspicuous.
pub const CLOBBER_FP_BITS: u64 = 0x7FF8_DEAD_BEEF_4321;

/// Overwrites every register in `list` with `value`.
///
/// The pattern is materialized once with an immediate move into the
/// first eligible register; later registers copy from that one, which
/// keeps the emitted count minimal and exercises register-to-register
/// moves. The zero register is skipped (writing it is a no-op by
/// definition); the stack pointer can never appear in a `RegList`.
pub fn clobber(masm: &mut MacroAssembler, list: RegList, value: u64) {
    let mut first = None;
    for reg in list.iter() {
        let xn = reg.to_x();
        if xn.is_zero() {
            continue;
        }
        match first {
            None => {
                masm.mov_imm(xn, value);
                first = Some(xn);
            }
            Some(loaded) => masm.mov(xn, loaded),
        }
    }
}

/// Floating counterpart of [`clobber`]; writes the d view of every
/// register in `list`.
pub fn clobber_fp(masm: &mut MacroAssembler, list: VRegList, value: f64) {
    let mut first: Option<VRegister> = None;
    for reg in list.iter() {
        let dn = reg.to_d();
        match first {
            None => {
                masm.fmov_f64(dn, value);
                first = Some(dn);
            }
            Some(loaded) => masm.fmov(dn, loaded),
        }
    }
}

/// Class-dispatching clobber with the default patterns. A caller with a
/// mixed-class register set has to split it; `CpuRegList` carries
/// exactly one class by construction.
pub fn clobber_cpu(masm: &mut MacroAssembler, list: CpuRegList) {
    match list {
        CpuRegList::Gp(list) => clobber(masm, list, CLOBBER_VALUE),
        CpuRegList::Fp(list) => clobber_fp(masm, list, f64::from_bits(CLOBBER_FP_BITS)),
    }
}
