//! End-to-end properties of the capture/comparison oracle: emit a
//! program, run it on the software machine, read the snapshot back and
//! judge it with the comparison predicates.

use regatta::a64::{Features, Nzcv, RegList, RegSize, Register, VRegList, VRegister};
use regatta::masm::{Machine, MacroAssembler};
use regatta::oracle::{
    clobber, clobber_fp, equal_128_reg, equal_32_reg, equal_64_reg, equal_64_regs, equal_cap,
    equal_cap_reg, equal_cap_regs, equal_fp32_reg, equal_fp64_reg, equal_nzcv, equal_registers,
    populate_register_array, RegisterDump, CLOBBER_FP_BITS,
};

const MEM_LEN: usize = 64 * 1024;

struct Harness {
    machine: Machine,
    masm: MacroAssembler,
}

impl Harness {
    fn new(features: Features) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        Harness {
            machine: Machine::new(features, MEM_LEN),
            masm: MacroAssembler::new(features),
        }
    }

    fn new_dump(&mut self) -> RegisterDump {
        let base = self.machine.reserve(RegisterDump::SIZE, RegisterDump::ALIGN);
        RegisterDump::new(base, self.machine.features())
    }

    /// Runs the recorded program and completes `dumps` from memory.
    fn run(mut self, dumps: &mut [&mut RegisterDump]) {
        self.machine
            .run(self.masm.instrs())
            .expect("capture program failed");
        for dump in dumps {
            dump.populate(&self.machine);
        }
    }
}

#[test]
fn clobbered_patterns_survive_capture_at_every_width() {
    let mut h = Harness::new(Features::default());
    let mut dump = h.new_dump();

    // Patterns: a full-width integer for the x views, one that fits in
    // 32 bits for the w views, and a NaN payload for the vectors.
    let wide = 0x0123_4567_89AB_CDEF_u64;
    let narrow = 0x0000_0000_CAFE_F00D_u64;
    let fp = f64::from_bits(CLOBBER_FP_BITS);

    let mut x_views = [Register::x(0); 4];
    let selected = populate_register_array(
        None,
        Some(&mut x_views),
        None,
        RegSize::X64,
        4,
        RegList::range(19, 26),
    );
    clobber(&mut h.masm, selected, wide);
    clobber(&mut h.masm, RegList::range(4, 7), narrow);
    clobber_fp(&mut h.masm, VRegList::range(8, 11), fp);

    dump.dump(&mut h.masm);
    h.run(&mut [&mut dump]);

    for reg in x_views {
        assert!(equal_64_reg(wide, &dump, reg));
    }
    // All clobbered registers hold the same value, so the
    // register-vs-register form agrees with the literal form.
    assert!(equal_64_regs(x_views[0], &dump, x_views[1]));

    for code in 4..=7u8 {
        assert!(equal_32_reg(narrow as u32, &dump, Register::w(code)));
        assert!(equal_64_reg(narrow, &dump, Register::x(code)));
    }

    for code in 8..=11u8 {
        assert!(equal_fp64_reg(fp, &dump, VRegister::d(code)));
        // The d-write cleared the top half of the vector register.
        assert!(equal_128_reg(CLOBBER_FP_BITS as u128, &dump, VRegister::q(code)));
    }
}

#[test]
fn fp32_capture_is_bit_exact() {
    let mut h = Harness::new(Features::default());
    let mut dump = h.new_dump();

    h.masm.fmov_f32(VRegister::s(12), -0.0);
    let nan = f32::from_bits(0x7FC0_1234);
    h.masm.fmov_f32(VRegister::s(13), nan);

    dump.dump(&mut h.masm);
    h.run(&mut [&mut dump]);

    assert!(equal_fp32_reg(-0.0, &dump, VRegister::s(12)));
    assert!(!equal_fp32_reg(0.0, &dump, VRegister::s(12)));
    assert!(equal_fp32_reg(nan, &dump, VRegister::s(13)));
    assert!(!equal_fp32_reg(f32::NAN, &dump, VRegister::s(13)));
}

#[test]
fn narrow_writes_must_zero_extend() {
    let mut h = Harness::new(Features::default());
    let mut dump = h.new_dump();

    h.masm.mov_imm(Register::x(5), u64::MAX);
    h.masm.mov_imm(Register::w(5), 0xDDDD_7777);
    // A register whose upper half is dirty, as buggy codegen would
    // leave it.
    h.masm.mov_imm(Register::x(6), 0x9_0000_0001);

    dump.dump(&mut h.masm);
    h.run(&mut [&mut dump]);

    assert!(equal_32_reg(0xDDDD_7777, &dump, Register::w(5)));
    assert!(equal_64_reg(0x0000_0000_DDDD_7777, &dump, Register::x(5)));
    assert!(!equal_32_reg(1, &dump, Register::w(6)));
}

#[test]
fn capture_is_non_perturbing() {
    let mut h = Harness::new(Features::default());
    let mut first = h.new_dump();
    let mut second = h.new_dump();

    let mut gp = RegList::caller_saved();
    gp.combine(RegList::callee_saved());
    clobber(&mut h.masm, gp, 0x5A5A_A5A5_0F0F_F0F0);
    clobber_fp(&mut h.masm, VRegList::range(0, 31), f64::from_bits(CLOBBER_FP_BITS));

    // Two captures with nothing in between: every field must agree,
    // including the working registers the capture borrows internally.
    first.dump(&mut h.masm);
    second.dump(&mut h.masm);
    h.run(&mut [&mut first, &mut second]);

    assert!(equal_registers(&first, &second));
    assert_eq!(first.spreg(), second.spreg());
    assert_eq!(first.wspreg(), second.wspreg());
    assert!(equal_nzcv(first.flags_nzcv(), second.flags_nzcv()));
}

#[test]
fn recorded_stack_pointer_is_corrected_for_capture_pushes() {
    let mut h = Harness::new(Features::default());
    let mut dump = h.new_dump();

    // Independent register-only read of sp before any pushes.
    h.masm.add_imm(Register::x(20), Register::sp(), 0);
    h.masm.push(&[Register::x(24), Register::x(25)]);
    dump.dump(&mut h.masm);
    h.masm.pop(&[Register::x(25), Register::x(24)]);
    h.run(&mut [&mut dump]);

    // The test's own two pushes are the only delta between the
    // pre-push value in x20 and the sp the capture recorded.
    let before_pushes = dump.xreg(20);
    assert!(equal_64_reg(before_pushes, &dump, Register::x(20)));
    assert_eq!(dump.spreg(), before_pushes - 16);
    assert_eq!(dump.wspreg() as u64, (before_pushes - 16) & 0xFFFF_FFFF);
}

#[test]
fn capability_mode_captures_the_c_bank() {
    let features = Features::with_capabilities();
    let mut h = Harness::new(features);
    let mut dump = h.new_dump();

    let value = 0xAB54_A98C_EB1F_0AD2_u64;
    h.masm.mov_imm(Register::c(5), value);
    h.masm.mov(Register::c(6), Register::c(5));

    dump.dump(&mut h.masm);
    h.run(&mut [&mut dump]);

    assert!(equal_cap(value as u128, &dump, dump.creg(5)));
    assert!(equal_cap_reg(value as u128, &dump, Register::c(5)));
    assert!(equal_cap_regs(Register::c(5), &dump, Register::c(6)));
    // The x view aliases the capability's address bits.
    assert!(equal_64_reg(value, &dump, Register::x(5)));
    // csp shadows sp.
    assert_eq!(dump.cspreg() as u64, dump.spreg());
}

#[test]
fn condition_flags_are_recorded_last() {
    let mut h = Harness::new(Features::default());
    let mut dump = h.new_dump();

    let flags = (Nzcv::Z | Nzcv::C).bits();
    h.masm.mov_imm(Register::x(9), flags as u64);
    h.masm.msr_nzcv(Register::x(9));

    dump.dump(&mut h.masm);
    h.run(&mut [&mut dump]);

    assert!(equal_nzcv(flags, dump.flags_nzcv()));
    assert!(!equal_nzcv(Nzcv::N.bits(), dump.flags_nzcv()));
}
