use std::ops::{Deref, DerefMut};

use regatta_a64::{Features, RegList, RegSize, Register, VRegList, VRegister};

/// Either class of register, for instructions that accept both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuReg {
    Gp(Register),
    Fp(VRegister),
}

impl CpuReg {
    /// Access width in bytes for loads/stores of this operand.
    pub fn bytes(self) -> u64 {
        match self {
            CpuReg::Gp(reg) => reg.size().bytes(),
            CpuReg::Fp(reg) => reg.size().bytes(),
        }
    }
}

impl From<Register> for CpuReg {
    fn from(reg: Register) -> Self {
        CpuReg::Gp(reg)
    }
}

impl From<VRegister> for CpuReg {
    fn from(reg: VRegister) -> Self {
        CpuReg::Fp(reg)
    }
}

/// The instruction vocabulary needed by register-file tests: immediate
/// and register moves, address arithmetic, width-correct stores and
/// loads (including paired stores), stack pushes/pops of register
/// lists, and flag-word transfers.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    MovImm { dst: Register, imm: u64 },
    MovReg { dst: Register, src: Register },
    /// Writes a raw bit pattern sized by `dst` into a vector register.
    FmovBits { dst: VRegister, bits: u64 },
    FmovReg { dst: VRegister, src: VRegister },
    /// `dst = src + imm`; the only way to read the stack pointer.
    AddImm { dst: Register, src: Register, imm: u64 },
    Str { src: CpuReg, base: Register, offset: u64 },
    Ldr { dst: CpuReg, base: Register, offset: u64 },
    /// Paired store: `a` at `base+offset`, `b` one slot above.
    Stp { a: CpuReg, b: CpuReg, base: Register, offset: u64 },
    Push { regs: Vec<Register> },
    Pop { regs: Vec<Register> },
    MrsNzcv { dst: Register },
    MsrNzcv { src: Register },
}

/// Records an instruction stream and tracks the scratch registers the
/// emitter is allowed to use behind the caller's back.
///
/// The scratch lists default to the conventional ip0/ip1 pair (x16,
/// x17) and d30/d31. Code that must not share scratch space with
/// surrounding emission claims the whole set via [`ScratchExclusion`].
pub struct MacroAssembler {
    instrs: Vec<Instr>,
    tmp_list: RegList,
    fptmp_list: VRegList,
    features: Features,
}

impl MacroAssembler {
    pub fn new(features: Features) -> Self {
        let mut tmp_list = RegList::empty();
        tmp_list.set(Register::x(16));
        tmp_list.set(Register::x(17));
        let mut fptmp_list = VRegList::empty();
        fptmp_list.set(VRegister::d(30));
        fptmp_list.set(VRegister::d(31));
        MacroAssembler {
            instrs: Vec::new(),
            tmp_list,
            fptmp_list,
            features,
        }
    }

    pub fn features(&self) -> Features {
        self.features
    }

    pub fn tmp_list(&self) -> RegList {
        self.tmp_list
    }

    pub fn set_tmp_list(&mut self, list: RegList) {
        self.tmp_list = list;
    }

    pub fn fptmp_list(&self) -> VRegList {
        self.fptmp_list
    }

    pub fn set_fptmp_list(&mut self, list: VRegList) {
        self.fptmp_list = list;
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }

    /// Consumes the assembler, returning the recorded program.
    pub fn finish(self) -> Vec<Instr> {
        self.instrs
    }

    fn check_cap(&self, reg: Register) {
        if reg.size() == RegSize::C128 {
            assert!(
                self.features.capabilities,
                "capability register {reg} without the capability feature"
            );
        }
    }

    pub fn mov_imm(&mut self, dst: Register, imm: u64) {
        self.check_cap(dst);
        assert!(!dst.is_sp(), "mov_imm cannot target sp");
        self.instrs.push(Instr::MovImm { dst, imm });
    }

    pub fn mov(&mut self, dst: Register, src: Register) {
        self.check_cap(dst);
        self.check_cap(src);
        self.instrs.push(Instr::MovReg { dst, src });
    }

    pub fn fmov_f64(&mut self, dst: VRegister, value: f64) {
        self.instrs.push(Instr::FmovBits {
            dst,
            bits: value.to_bits(),
        });
    }

    pub fn fmov_f32(&mut self, dst: VRegister, value: f32) {
        self.instrs.push(Instr::FmovBits {
            dst,
            bits: value.to_bits() as u64,
        });
    }

    pub fn fmov(&mut self, dst: VRegister, src: VRegister) {
        self.instrs.push(Instr::FmovReg { dst, src });
    }

    pub fn add_imm(&mut self, dst: Register, src: Register, imm: u64) {
        self.check_cap(dst);
        self.check_cap(src);
        self.instrs.push(Instr::AddImm { dst, src, imm });
    }

    pub fn str(&mut self, src: impl Into<CpuReg>, base: Register, offset: u64) {
        let src = src.into();
        if let CpuReg::Gp(reg) = src {
            self.check_cap(reg);
        }
        self.instrs.push(Instr::Str { src, base, offset });
    }

    pub fn ldr(&mut self, dst: impl Into<CpuReg>, base: Register, offset: u64) {
        let dst = dst.into();
        if let CpuReg::Gp(reg) = dst {
            self.check_cap(reg);
        }
        self.instrs.push(Instr::Ldr { dst, base, offset });
    }

    pub fn stp(&mut self, a: impl Into<CpuReg>, b: impl Into<CpuReg>, base: Register, offset: u64) {
        let (a, b) = (a.into(), b.into());
        assert_eq!(a.bytes(), b.bytes(), "stp operands must share a width");
        self.instrs.push(Instr::Stp { a, b, base, offset });
    }

    /// Pushes `regs` onto the stack, first-named register at the
    /// highest address. All registers must share a width and the total
    /// size must keep sp 16-byte aligned.
    pub fn push(&mut self, regs: &[Register]) {
        self.check_push_list(regs);
        self.instrs.push(Instr::Push {
            regs: regs.to_vec(),
        });
    }

    /// Pops into `regs`, first-named register from the lowest address.
    /// Mirrors [`MacroAssembler::push`] with the list reversed.
    pub fn pop(&mut self, regs: &[Register]) {
        self.check_push_list(regs);
        self.instrs.push(Instr::Pop {
            regs: regs.to_vec(),
        });
    }

    pub fn mrs_nzcv(&mut self, dst: Register) {
        assert_eq!(dst.size(), RegSize::X64);
        self.instrs.push(Instr::MrsNzcv { dst });
    }

    pub fn msr_nzcv(&mut self, src: Register) {
        assert_eq!(src.size(), RegSize::X64);
        self.instrs.push(Instr::MsrNzcv { src });
    }

    fn check_push_list(&self, regs: &[Register]) {
        assert!(!regs.is_empty());
        let size = regs[0].size();
        for reg in regs {
            self.check_cap(*reg);
            assert!(!reg.is_sp(), "cannot push/pop sp");
            assert_eq!(reg.size(), size, "push/pop registers must share a width");
        }
        assert_eq!(
            (regs.len() as u64 * size.bytes()) % 16,
            0,
            "push/pop must keep sp 16-byte aligned"
        );
    }
}

/// Scope guard that claims every scratch register.
///
/// While alive, the wrapped assembler's tmp lists are empty, so nothing
/// emitted inside the scope can be allocated a scratch slot shared with
/// surrounding code. The previous lists are restored on drop, which
/// lets such scopes nest and repeat safely.
pub struct ScratchExclusion<'a> {
    masm: &'a mut MacroAssembler,
    saved_tmp: RegList,
    saved_fptmp: VRegList,
}

impl<'a> ScratchExclusion<'a> {
    pub fn claim_all(masm: &'a mut MacroAssembler) -> Self {
        let saved_tmp = masm.tmp_list();
        let saved_fptmp = masm.fptmp_list();
        masm.set_tmp_list(RegList::empty());
        masm.set_fptmp_list(VRegList::empty());
        ScratchExclusion {
            masm,
            saved_tmp,
            saved_fptmp,
        }
    }
}

impl Deref for ScratchExclusion<'_> {
    type Target = MacroAssembler;

    fn deref(&self) -> &MacroAssembler {
        self.masm
    }
}

impl DerefMut for ScratchExclusion<'_> {
    fn deref_mut(&mut self) -> &mut MacroAssembler {
        self.masm
    }
}

impl Drop for ScratchExclusion<'_> {
    fn drop(&mut self) {
        self.masm.set_tmp_list(self.saved_tmp);
        self.masm.set_fptmp_list(self.saved_fptmp);
    }
}
