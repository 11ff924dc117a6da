use bytemuck::{Pod, Zeroable};
use memoffset::offset_of;
use regatta_a64::{
    all_distinct, Features, Register, VRegister, NUM_REGISTERS, NUM_VREGISTERS, NZCV_MASK,
};
use regatta_masm::{Machine, MacroAssembler, ScratchExclusion};

/// A 128-bit value stored as two little-endian 64-bit halves, so the
/// snapshot layout stays free of implicit padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Bits128 {
    pub l: u64,
    pub h: u64,
}

impl Bits128 {
    fn get(self) -> u128 {
        (self.h as u128) << 64 | self.l as u128
    }
}

/// The in-memory capture target. One fixed-size array per register
/// class and width; index `i` in every array is architectural register
/// `i`, so cross-width reads are truncations of the same capture, not
/// separate captures.
///
/// The capability fields are always present so the layout is fixed for
/// one build; they are only written when the capability feature is
/// enabled.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct DumpArea {
    c_: [Bits128; NUM_REGISTERS],
    x_: [u64; NUM_REGISTERS],
    w_: [u32; NUM_REGISTERS],
    d_: [u64; NUM_VREGISTERS],
    s_: [u32; NUM_VREGISTERS],
    q_: [Bits128; NUM_VREGISTERS],
    csp_: Bits128,
    sp_: u64,
    flags_: u64,
    wsp_: u32,
    _pad: u32,
}

/// A full register-file snapshot.
///
/// `dump` emits the capture sequence against the guest address handed
/// to [`RegisterDump::new`]; after the machine has run the program,
/// [`RegisterDump::populate`] reads the bytes back and completes the
/// snapshot. Accessors refuse to read an incomplete snapshot.
pub struct RegisterDump {
    base: u64,
    area: DumpArea,
    features: Features,
    completed: bool,
}

impl RegisterDump {
    pub const SIZE: usize = std::mem::size_of::<DumpArea>();
    pub const ALIGN: u64 = 16;

    pub fn new(base: u64, features: Features) -> Self {
        assert_eq!(base % Self::ALIGN, 0, "dump area must be 16-byte aligned");
        RegisterDump {
            base,
            area: Zeroable::zeroed(),
            features,
            completed: false,
        }
    }

    /// Emits the capture sequence.
    ///
    /// The emitted code populates the dump area with the register file
    /// exactly as it exists when execution reaches this point in the
    /// program, and leaves every register bit-identical afterwards. The
    /// routine's own working registers are pushed up front and their
    /// stacked values patched into the snapshot at the end, over the
    /// placeholder slots the bulk pass wrote for them.
    pub fn dump(&self, masm: &mut MacroAssembler) {
        assert_eq!(
            masm.features(),
            self.features,
            "dump and assembler must agree on ISA features"
        );
        let caps = self.features.capabilities;

        // Claim every scratch register so the emitter cannot interleave
        // its own scratch usage with ours; restored when `masm` drops.
        let masm = &mut ScratchExclusion::claim_all(masm);

        // Working registers, from the lowest-numbered end of the file.
        let view = |reg: Register| if caps { reg.to_c() } else { reg };
        let dump_base = view(Register::x(0));
        let dump = view(Register::x(1));
        let tmp = view(Register::x(2));
        let zero = view(Register::x(31));

        let c_off = offset_of!(DumpArea, c_) as u64;
        let x_off = offset_of!(DumpArea, x_) as u64;
        let w_off = offset_of!(DumpArea, w_) as u64;
        let d_off = offset_of!(DumpArea, d_) as u64;
        let s_off = offset_of!(DumpArea, s_) as u64;
        let q_off = offset_of!(DumpArea, q_) as u64;
        let csp_off = offset_of!(DumpArea, csp_) as u64;
        let sp_off = offset_of!(DumpArea, sp_) as u64;
        let wsp_off = offset_of!(DumpArea, wsp_) as u64;
        let flags_off = offset_of!(DumpArea, flags_) as u64;

        masm.push(&[zero, dump_base, dump, tmp]);

        // Materialize the dump address.
        masm.mov_imm(dump_base, self.base);

        // The stack pointer cannot be stored directly; move it through
        // tmp. The four slots just pushed happened after the value we
        // want to record, so compensate for them.
        let slot = dump_base.size().bytes();
        if caps {
            masm.add_imm(tmp, Register::csp(), 4 * slot);
            masm.str(tmp, dump_base, csp_off);
        }
        masm.add_imm(tmp.to_x(), Register::sp(), 4 * slot);
        masm.str(tmp.to_x(), dump_base, sp_off);
        masm.add_imm(tmp.to_w(), Register::wsp(), 4 * slot);
        masm.str(tmp.to_w(), dump_base, wsp_off);

        // Bulk-store every register bank, two registers per store.
        if caps {
            masm.add_imm(dump, dump_base, c_off);
            for i in (0..NUM_REGISTERS as u8).step_by(2) {
                masm.stp(Register::c(i), Register::c(i + 1), dump, i as u64 * 16);
            }
        }

        masm.add_imm(dump, dump_base, x_off);
        for i in (0..NUM_REGISTERS as u8).step_by(2) {
            masm.stp(Register::x(i), Register::x(i + 1), dump, i as u64 * 8);
        }

        masm.add_imm(dump, dump_base, w_off);
        for i in (0..NUM_REGISTERS as u8).step_by(2) {
            masm.stp(Register::w(i), Register::w(i + 1), dump, i as u64 * 4);
        }

        masm.add_imm(dump, dump_base, d_off);
        for i in (0..NUM_VREGISTERS as u8).step_by(2) {
            masm.stp(VRegister::d(i), VRegister::d(i + 1), dump, i as u64 * 8);
        }

        masm.add_imm(dump, dump_base, s_off);
        for i in (0..NUM_VREGISTERS as u8).step_by(2) {
            masm.stp(VRegister::s(i), VRegister::s(i + 1), dump, i as u64 * 4);
        }

        masm.add_imm(dump, dump_base, q_off);
        for i in (0..NUM_VREGISTERS as u8).step_by(2) {
            masm.stp(VRegister::q(i), VRegister::q(i + 1), dump, i as u64 * 16);
        }

        // Record the flags. Nothing between the bulk stores above and
        // this read may touch the condition flags.
        masm.mrs_nzcv(tmp.to_x());
        masm.str(tmp.to_x(), dump_base, flags_off);

        // To patch in the values dump_base/dump/tmp held on entry we
        // need fresh working registers. Any already-dumped registers
        // will do, since their true values are safe in memory.
        let dump2_base = view(Register::x(10));
        let dump2 = view(Register::x(11));
        assert!(
            all_distinct(&[dump_base, dump, tmp, dump2_base, dump2]),
            "capture working registers must not alias"
        );

        // Don't lose the dump address.
        masm.mov(dump2_base, dump_base);

        masm.pop(&[tmp, dump, dump_base, zero]);

        masm.add_imm(dump2, dump2_base, w_off);
        masm.str(dump_base.to_w(), dump2, dump_base.code() as u64 * 4);
        masm.str(dump.to_w(), dump2, dump.code() as u64 * 4);
        masm.str(tmp.to_w(), dump2, tmp.code() as u64 * 4);

        masm.add_imm(dump2, dump2_base, x_off);
        masm.str(dump_base.to_x(), dump2, dump_base.code() as u64 * 8);
        masm.str(dump.to_x(), dump2, dump.code() as u64 * 8);
        masm.str(tmp.to_x(), dump2, tmp.code() as u64 * 8);

        if caps {
            masm.add_imm(dump2, dump2_base, c_off);
            masm.str(dump_base, dump2, dump_base.code() as u64 * 16);
            masm.str(dump, dump2, dump.code() as u64 * 16);
            masm.str(tmp, dump2, tmp.code() as u64 * 16);
        }

        // Finally restore dump2_base and dump2 from their own slots in
        // the bank `dump2` still points at.
        let patched_slot: u64 = if caps { 16 } else { 8 };
        masm.ldr(dump2_base, dump2, dump2_base.code() as u64 * patched_slot);
        masm.ldr(dump2, dump2, dump2.code() as u64 * patched_slot);
    }

    /// Reads the captured bytes back out of guest memory. Must run
    /// after the machine has executed the program containing the
    /// capture sequence.
    pub fn populate(&mut self, machine: &Machine) {
        machine.read(self.base, bytemuck::bytes_of_mut(&mut self.area));
        self.completed = true;
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn features(&self) -> Features {
        self.features
    }

    fn check_read(&self) {
        assert!(self.completed, "register dump read before completion");
    }

    pub fn xreg(&self, code: u8) -> u64 {
        self.check_read();
        self.area.x_[code as usize]
    }

    pub fn wreg(&self, code: u8) -> u32 {
        self.check_read();
        self.area.w_[code as usize]
    }

    pub fn creg(&self, code: u8) -> u128 {
        self.check_read();
        assert!(self.features.capabilities, "capability bank not captured");
        self.area.c_[code as usize].get()
    }

    pub fn dreg_bits(&self, code: u8) -> u64 {
        self.check_read();
        self.area.d_[code as usize]
    }

    pub fn sreg_bits(&self, code: u8) -> u32 {
        self.check_read();
        self.area.s_[code as usize]
    }

    pub fn dreg(&self, code: u8) -> f64 {
        f64::from_bits(self.dreg_bits(code))
    }

    pub fn sreg(&self, code: u8) -> f32 {
        f32::from_bits(self.sreg_bits(code))
    }

    pub fn qreg(&self, code: u8) -> u128 {
        self.check_read();
        self.area.q_[code as usize].get()
    }

    pub fn spreg(&self) -> u64 {
        self.check_read();
        self.area.sp_
    }

    pub fn wspreg(&self) -> u32 {
        self.check_read();
        self.area.wsp_
    }

    pub fn cspreg(&self) -> u128 {
        self.check_read();
        assert!(self.features.capabilities, "capability bank not captured");
        self.area.csp_.get()
    }

    pub fn flags_nzcv(&self) -> u32 {
        self.check_read();
        self.area.flags_ as u32 & NZCV_MASK
    }
}
