use regatta_a64::{RegList, RegSize, Register, VRegSize, VRegister, Nzcv, NUM_VREGISTERS, NZCV_MASK};
use tracing::error;

use crate::dump::RegisterDump;

/// Equality predicates against a completed [`RegisterDump`].
///
/// Every predicate returns the verdict and, on mismatch, logs a
/// diagnostic with both values in a radix fit for the width. The
/// `*_reg` forms resolve a register handle through the snapshot first;
/// 32-bit forms additionally require the upper half of the wide view to
/// be zero, because a narrow write that fails to zero-extend is a
/// different codegen bug than a wrong value.

pub fn equal_32(expected: u32, _dump: &RegisterDump, result: u32) -> bool {
    if result != expected {
        error!("expected 0x{expected:08x}, found 0x{result:08x}");
    }
    expected == result
}

pub fn equal_64(expected: u64, _dump: &RegisterDump, result: u64) -> bool {
    if result != expected {
        error!("expected 0x{expected:016x}, found 0x{result:016x}");
    }
    expected == result
}

pub fn equal_cap(expected: u128, _dump: &RegisterDump, result: u128) -> bool {
    if result != expected {
        error!("expected 0x{expected:032x}, found 0x{result:032x}");
    }
    expected == result
}

pub fn equal_128(expected: u128, _dump: &RegisterDump, result: u128) -> bool {
    if result != expected {
        error!("expected 0x{expected:032x}, found 0x{result:032x}");
    }
    expected == result
}

/// Bit-exact 32-bit float equality: distinguishes +0.0 from -0.0 and
/// different NaN encodings. Only the diagnostic format depends on the
/// value class; the verdict never does.
pub fn equal_fp32(expected: f32, _dump: &RegisterDump, result: f32) -> bool {
    if expected.to_bits() == result.to_bits() {
        return true;
    }
    if expected.is_nan() || expected == 0.0 {
        error!(
            "expected 0x{:08x}, found 0x{:08x}",
            expected.to_bits(),
            result.to_bits()
        );
    } else {
        error!(
            "expected {expected:.9} (0x{:08x}), found {result:.9} (0x{:08x})",
            expected.to_bits(),
            result.to_bits()
        );
    }
    false
}

/// Bit-exact 64-bit float equality; see [`equal_fp32`].
pub fn equal_fp64(expected: f64, _dump: &RegisterDump, result: f64) -> bool {
    if expected.to_bits() == result.to_bits() {
        return true;
    }
    if expected.is_nan() || expected == 0.0 {
        error!(
            "expected 0x{:016x}, found 0x{:016x}",
            expected.to_bits(),
            result.to_bits()
        );
    } else {
        error!(
            "expected {expected:.17} (0x{:016x}), found {result:.17} (0x{:016x})",
            expected.to_bits(),
            result.to_bits()
        );
    }
    false
}

pub fn equal_32_reg(expected: u32, dump: &RegisterDump, reg: Register) -> bool {
    assert_eq!(reg.size(), RegSize::W32);
    // Fetch the containing x register so a narrow write that left the
    // upper half dirty is caught and reported as its own failure class.
    let result_x = dump.xreg(reg.code());
    if result_x & 0xFFFF_FFFF_0000_0000 != 0 {
        error!(
            "{reg}: narrow write failed to zero-extend: expected 0x{expected:08x}, \
             found 0x{result_x:016x}"
        );
        return false;
    }
    equal_32(expected, dump, dump.wreg(reg.code()))
}

pub fn equal_64_reg(expected: u64, dump: &RegisterDump, reg: Register) -> bool {
    assert_eq!(reg.size(), RegSize::X64);
    equal_64(expected, dump, dump.xreg(reg.code()))
}

pub fn equal_cap_reg(expected: u128, dump: &RegisterDump, reg: Register) -> bool {
    assert_eq!(reg.size(), RegSize::C128);
    equal_cap(expected, dump, dump.creg(reg.code()))
}

pub fn equal_128_reg(expected: u128, dump: &RegisterDump, reg: VRegister) -> bool {
    assert_eq!(reg.size(), VRegSize::Q128);
    equal_128(expected, dump, dump.qreg(reg.code()))
}

pub fn equal_fp32_reg(expected: f32, dump: &RegisterDump, reg: VRegister) -> bool {
    assert_eq!(reg.size(), VRegSize::S32);
    let result_64 = dump.dreg_bits(reg.code());
    if result_64 & 0xFFFF_FFFF_0000_0000 != 0 {
        error!(
            "{reg}: narrow write failed to zero-extend: expected 0x{:08x} ({expected}), \
             found 0x{result_64:016x}",
            expected.to_bits()
        );
        return false;
    }
    equal_fp32(expected, dump, dump.sreg(reg.code()))
}

pub fn equal_fp64_reg(expected: f64, dump: &RegisterDump, reg: VRegister) -> bool {
    assert_eq!(reg.size(), VRegSize::D64);
    equal_fp64(expected, dump, dump.dreg(reg.code()))
}

/// Register-vs-register comparison: both sides resolve through the
/// snapshot, then the value predicate judges them, so literals and
/// registers share one equality rule.
pub fn equal_64_regs(expected: Register, dump: &RegisterDump, actual: Register) -> bool {
    assert_eq!(expected.size(), RegSize::X64);
    assert_eq!(actual.size(), RegSize::X64);
    equal_64(dump.xreg(expected.code()), dump, dump.xreg(actual.code()))
}

pub fn equal_cap_regs(expected: Register, dump: &RegisterDump, actual: Register) -> bool {
    assert_eq!(expected.size(), RegSize::C128);
    assert_eq!(actual.size(), RegSize::C128);
    equal_cap(dump.creg(expected.code()), dump, dump.creg(actual.code()))
}

fn nzcv_letters(flags: u32) -> String {
    let flags = Nzcv::from_bits_truncate(flags);
    let mut out = String::with_capacity(4);
    for (bit, upper, lower) in [
        (Nzcv::N, 'N', 'n'),
        (Nzcv::Z, 'Z', 'z'),
        (Nzcv::C, 'C', 'c'),
        (Nzcv::V, 'V', 'v'),
    ] {
        out.push(if flags.contains(bit) { upper } else { lower });
    }
    out
}

/// Flag-word equality. Bits outside NZCV in either value are a caller
/// error, not a mismatch.
pub fn equal_nzcv(expected: u32, result: u32) -> bool {
    assert_eq!(expected & !NZCV_MASK, 0, "expected value has non-NZCV bits");
    assert_eq!(result & !NZCV_MASK, 0, "result value has non-NZCV bits");
    if result != expected {
        error!(
            "expected flags {}, found {}",
            nzcv_letters(expected),
            nzcv_letters(result)
        );
        return false;
    }
    true
}

/// Whole-file comparison of two snapshots over every caller- and
/// callee-saved general register and every vector register, reporting
/// the first mismatch. Used to assert an instruction sequence preserved
/// all registers it was not supposed to modify.
pub fn equal_registers(a: &RegisterDump, b: &RegisterDump) -> bool {
    let mut available = RegList::caller_saved();
    available.combine(RegList::callee_saved());
    while let Some(reg) = available.pop_lowest_index() {
        let i = reg.code();
        if a.xreg(i) != b.xreg(i) {
            error!(
                "x{i}: expected 0x{:016x}, found 0x{:016x}",
                a.xreg(i),
                b.xreg(i)
            );
            return false;
        }
    }

    for i in 0..NUM_VREGISTERS as u8 {
        let a_bits = a.dreg_bits(i);
        let b_bits = b.dreg_bits(i);
        if a_bits != b_bits {
            error!("d{i}: expected 0x{a_bits:016x}, found 0x{b_bits:016x}");
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use regatta_a64::Features;

    fn fake_dump() -> RegisterDump {
        // A dump that was never populated would refuse reads; the
        // literal-value predicates never consult it.
        RegisterDump::new(0x2_0000, Features::default())
    }

    #[test]
    fn literal_predicates() {
        let dump = fake_dump();
        assert!(equal_32(7, &dump, 7));
        assert!(!equal_32(7, &dump, 8));
        assert!(equal_64(u64::MAX, &dump, u64::MAX));
        assert!(!equal_64(1, &dump, 2));
        assert!(equal_128(1 << 100, &dump, 1 << 100));
        assert!(!equal_128(0, &dump, 1));
    }

    #[test]
    fn fp_equality_is_bit_exact() {
        let dump = fake_dump();
        assert!(equal_fp64(1.5, &dump, 1.5));
        assert!(!equal_fp64(0.0, &dump, -0.0));
        assert!(!equal_fp32(0.0, &dump, -0.0));

        // Two NaNs with different payloads are distinct.
        let nan_a = f64::from_bits(0x7FF8_0000_0000_0001);
        let nan_b = f64::from_bits(0x7FF8_0000_0000_0002);
        assert!(!equal_fp64(nan_a, &dump, nan_b));
        assert!(equal_fp64(nan_a, &dump, nan_a));
    }

    #[test]
    fn nzcv_matches_and_letters() {
        assert!(equal_nzcv(0, 0));
        assert!(equal_nzcv(NZCV_MASK, NZCV_MASK));
        assert!(!equal_nzcv(Nzcv::Z.bits(), Nzcv::C.bits()));
        assert_eq!(nzcv_letters(Nzcv::N.bits() | Nzcv::V.bits()), "NzcV");
        assert_eq!(nzcv_letters(0), "nzcv");
    }

    #[test]
    #[should_panic(expected = "non-NZCV bits")]
    fn stray_flag_bits_are_fatal() {
        equal_nzcv(1, 0);
    }

    #[test]
    #[should_panic]
    fn width_mismatch_is_fatal() {
        let dump = fake_dump();
        equal_32_reg(0, &dump, Register::x(0));
    }
}
