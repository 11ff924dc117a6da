use regatta_a64::{Features, RegSize, Register, VRegSize, VRegister, NZCV_MASK, ZR_CODE};
use thiserror::Error;
use tracing::trace;

use crate::masm::{CpuReg, Instr};

/// Guest address of the first byte of machine memory.
pub const MEM_BASE: u64 = 0x1_0000;

/// Bytes at the top of memory kept free for the stack; `reserve` will
/// not hand out addresses inside this region.
const STACK_HEADROOM: u64 = 4096;

pub type Result<T> = std::result::Result<T, ExecError>;

/// Failures raised while executing a recorded program.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("access out of bounds: addr=0x{addr:x} len={len}")]
    OutOfBounds { addr: u64, len: usize },

    #[error("unaligned {len}-byte access at 0x{addr:x}")]
    Unaligned { addr: u64, len: usize },

    #[error("stack overflow: sp would reach 0x{sp:x}")]
    StackOverflow { sp: u64 },

    #[error("capability instruction without the capability feature")]
    CapabilityDisabled,
}

/// A software AArch64 register file plus flat little-endian memory.
///
/// Registers follow the architecture's bookkeeping rules: code 31 reads
/// as zero and swallows writes, w-writes zero-extend into the x view,
/// narrow vector writes clear the rest of the 128-bit register, and the
/// stack pointer lives outside the numbered file. When capabilities are
/// enabled, each x register aliases the low half of a 128-bit c
/// register and `csp` shadows `sp`.
pub struct Machine {
    x: [u64; 32],
    sp: u64,
    v: [u128; 32],
    c: [u128; 32],
    csp: u128,
    nzcv: u32,
    mem: Vec<u8>,
    data_cursor: u64,
    features: Features,
}

impl Machine {
    pub fn new(features: Features, mem_len: usize) -> Self {
        assert!(mem_len as u64 > STACK_HEADROOM && mem_len % 16 == 0);
        let sp = MEM_BASE + mem_len as u64;
        Machine {
            x: [0; 32],
            sp,
            v: [0; 32],
            c: [0; 32],
            csp: sp as u128,
            nzcv: 0,
            mem: vec![0; mem_len],
            data_cursor: MEM_BASE,
            features,
        }
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Hands out a block of guest memory from the bottom of the address
    /// space. Exhausting the space below the stack headroom is a test
    /// setup error.
    pub fn reserve(&mut self, size: usize, align: u64) -> u64 {
        assert!(align.is_power_of_two());
        let addr = (self.data_cursor + align - 1) & !(align - 1);
        let end = addr + size as u64;
        assert!(
            end <= MEM_BASE + self.mem.len() as u64 - STACK_HEADROOM,
            "guest memory exhausted"
        );
        self.data_cursor = end;
        addr
    }

    /// Copies guest memory into `out`; the range must be in bounds.
    pub fn read(&self, addr: u64, out: &mut [u8]) {
        let start = addr.checked_sub(MEM_BASE).expect("address below memory") as usize;
        out.copy_from_slice(&self.mem[start..start + out.len()]);
    }

    pub fn xreg(&self, code: u8) -> u64 {
        if code == ZR_CODE {
            0
        } else {
            self.x[code as usize]
        }
    }

    pub fn vreg(&self, code: u8) -> u128 {
        self.v[code as usize]
    }

    pub fn creg(&self, code: u8) -> u128 {
        assert!(self.features.capabilities);
        if code == ZR_CODE {
            0
        } else {
            self.c[code as usize]
        }
    }

    pub fn sp(&self) -> u64 {
        self.sp
    }

    pub fn csp(&self) -> u128 {
        assert!(self.features.capabilities);
        self.csp
    }

    pub fn nzcv(&self) -> u32 {
        self.nzcv
    }

    pub fn run(&mut self, program: &[Instr]) -> Result<()> {
        for instr in program {
            trace!(?instr, "exec");
            self.step(instr)?;
        }
        Ok(())
    }

    fn step(&mut self, instr: &Instr) -> Result<()> {
        match instr {
            Instr::MovImm { dst, imm } => self.write_gp_any(*dst, *imm as u128)?,
            Instr::MovReg { dst, src } => {
                let value = self.read_gp_any(*src)?;
                self.write_gp_any(*dst, value)?;
            }
            Instr::FmovBits { dst, bits } => {
                let bits = match dst.size() {
                    VRegSize::S32 => *bits & 0xFFFF_FFFF,
                    VRegSize::D64 | VRegSize::Q128 => *bits,
                };
                self.v[dst.code() as usize] = bits as u128;
            }
            Instr::FmovReg { dst, src } => {
                let value = self.vreg_view(*src);
                self.v[dst.code() as usize] = value;
            }
            Instr::AddImm { dst, src, imm } => {
                let value = self.read_gp_any(*src)?;
                let low = (value as u64).wrapping_add(*imm);
                // Capability adds adjust the address and keep metadata.
                let result = (value & !0xFFFF_FFFF_FFFF_FFFF) | low as u128;
                self.write_gp_any(*dst, result)?;
            }
            Instr::Str { src, base, offset } => {
                let addr = self.base_addr(*base)?.wrapping_add(*offset);
                let value = self.operand_value(*src)?;
                self.store(addr, value, src.bytes() as usize)?;
            }
            Instr::Ldr { dst, base, offset } => {
                let addr = self.base_addr(*base)?.wrapping_add(*offset);
                let value = self.load(addr, dst.bytes() as usize)?;
                self.write_operand(*dst, value)?;
            }
            Instr::Stp { a, b, base, offset } => {
                let size = a.bytes();
                let addr = self.base_addr(*base)?.wrapping_add(*offset);
                let value_a = self.operand_value(*a)?;
                let value_b = self.operand_value(*b)?;
                self.store(addr, value_a, size as usize)?;
                self.store(addr + size, value_b, size as usize)?;
            }
            Instr::Push { regs } => {
                let slot = regs[0].size().bytes();
                let total = slot * regs.len() as u64;
                let new_sp = self.sp.wrapping_sub(total);
                if new_sp < self.data_cursor || new_sp < MEM_BASE {
                    return Err(ExecError::StackOverflow { sp: new_sp });
                }
                for (i, reg) in regs.iter().enumerate() {
                    let addr = new_sp + (regs.len() - 1 - i) as u64 * slot;
                    let value = self.read_gp_any(*reg)?;
                    self.store(addr, value, slot as usize)?;
                }
                self.set_sp(new_sp);
            }
            Instr::Pop { regs } => {
                let slot = regs[0].size().bytes();
                for (i, reg) in regs.iter().enumerate() {
                    let addr = self.sp + i as u64 * slot;
                    let value = self.load(addr, slot as usize)?;
                    self.write_gp_any(*reg, value)?;
                }
                self.set_sp(self.sp + slot * regs.len() as u64);
            }
            Instr::MrsNzcv { dst } => {
                self.write_gp_any(*dst, self.nzcv as u128)?;
            }
            Instr::MsrNzcv { src } => {
                let value = self.read_gp_any(*src)? as u32;
                self.nzcv = value & NZCV_MASK;
            }
        }
        Ok(())
    }

    /// Reads a register in its handle's width, widened to 128 bits.
    fn read_gp_any(&self, reg: Register) -> Result<u128> {
        self.check_cap(reg)?;
        let value = if reg.is_sp() {
            match reg.size() {
                RegSize::W32 => (self.sp & 0xFFFF_FFFF) as u128,
                RegSize::X64 => self.sp as u128,
                RegSize::C128 => self.csp,
            }
        } else if reg.is_zero() {
            0
        } else {
            match reg.size() {
                RegSize::W32 => (self.x[reg.code() as usize] & 0xFFFF_FFFF) as u128,
                RegSize::X64 => self.x[reg.code() as usize] as u128,
                RegSize::C128 => self.c[reg.code() as usize],
            }
        };
        Ok(value)
    }

    /// Writes a register in its handle's width. Narrow writes
    /// zero-extend; x-writes clear capability metadata.
    fn write_gp_any(&mut self, reg: Register, value: u128) -> Result<()> {
        self.check_cap(reg)?;
        if reg.is_sp() {
            match reg.size() {
                RegSize::W32 => self.set_sp(value as u64 & 0xFFFF_FFFF),
                RegSize::X64 => self.set_sp(value as u64),
                RegSize::C128 => {
                    self.csp = value;
                    self.sp = value as u64;
                }
            }
            return Ok(());
        }
        if reg.is_zero() {
            return Ok(());
        }
        let i = reg.code() as usize;
        match reg.size() {
            RegSize::W32 => {
                self.x[i] = value as u64 & 0xFFFF_FFFF;
                self.c[i] = self.x[i] as u128;
            }
            RegSize::X64 => {
                self.x[i] = value as u64;
                self.c[i] = self.x[i] as u128;
            }
            RegSize::C128 => {
                self.c[i] = value;
                self.x[i] = value as u64;
            }
        }
        Ok(())
    }

    fn set_sp(&mut self, sp: u64) {
        self.sp = sp;
        self.csp = (self.csp & !0xFFFF_FFFF_FFFF_FFFF) | sp as u128;
    }

    fn check_cap(&self, reg: Register) -> Result<()> {
        if reg.size() == RegSize::C128 && !self.features.capabilities {
            return Err(ExecError::CapabilityDisabled);
        }
        Ok(())
    }

    fn vreg_view(&self, reg: VRegister) -> u128 {
        let raw = self.v[reg.code() as usize];
        match reg.size() {
            VRegSize::S32 => raw & 0xFFFF_FFFF,
            VRegSize::D64 => raw & 0xFFFF_FFFF_FFFF_FFFF,
            VRegSize::Q128 => raw,
        }
    }

    fn base_addr(&self, base: Register) -> Result<u64> {
        Ok(self.read_gp_any(base)? as u64)
    }

    fn operand_value(&self, operand: CpuReg) -> Result<u128> {
        match operand {
            CpuReg::Gp(reg) => self.read_gp_any(reg),
            CpuReg::Fp(reg) => Ok(self.vreg_view(reg)),
        }
    }

    fn write_operand(&mut self, operand: CpuReg, value: u128) -> Result<()> {
        match operand {
            CpuReg::Gp(reg) => self.write_gp_any(reg, value),
            CpuReg::Fp(reg) => {
                // Loads into a narrow view clear the rest of the vector.
                self.v[reg.code() as usize] = value;
                Ok(())
            }
        }
    }

    fn range(&self, addr: u64, len: usize) -> Result<usize> {
        let end = MEM_BASE + self.mem.len() as u64;
        if addr < MEM_BASE || addr + len as u64 > end {
            return Err(ExecError::OutOfBounds { addr, len });
        }
        if addr % (len as u64) != 0 {
            return Err(ExecError::Unaligned { addr, len });
        }
        Ok((addr - MEM_BASE) as usize)
    }

    fn store(&mut self, addr: u64, value: u128, len: usize) -> Result<()> {
        let start = self.range(addr, len)?;
        let bytes = value.to_le_bytes();
        self.mem[start..start + len].copy_from_slice(&bytes[..len]);
        Ok(())
    }

    fn load(&mut self, addr: u64, len: usize) -> Result<u128> {
        let start = self.range(addr, len)?;
        let mut bytes = [0u8; 16];
        bytes[..len].copy_from_slice(&self.mem[start..start + len]);
        Ok(u128::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masm::MacroAssembler;

    fn run(masm: MacroAssembler) -> Machine {
        let mut machine = Machine::new(masm.features(), 64 * 1024);
        machine.run(&masm.finish()).expect("program failed");
        machine
    }

    #[test]
    fn w_writes_zero_extend() {
        let mut masm = MacroAssembler::new(Features::default());
        masm.mov_imm(Register::x(5), 0xFFFF_FFFF_FFFF_FFFF);
        masm.mov_imm(Register::w(5), 0x1234_5678);
        let machine = run(masm);
        assert_eq!(machine.xreg(5), 0x1234_5678);
    }

    #[test]
    fn zr_reads_zero_and_discards_writes() {
        let mut masm = MacroAssembler::new(Features::default());
        masm.mov_imm(Register::x(31), 0xDEAD);
        masm.mov(Register::x(4), Register::x(31));
        let machine = run(masm);
        assert_eq!(machine.xreg(31), 0);
        assert_eq!(machine.xreg(4), 0);
    }

    #[test]
    fn narrow_vector_writes_clear_the_rest() {
        let mut masm = MacroAssembler::new(Features::default());
        masm.fmov_f64(VRegister::d(3), f64::from_bits(u64::MAX));
        masm.fmov_f32(VRegister::s(3), f32::from_bits(0xAABB_CCDD));
        let machine = run(masm);
        assert_eq!(machine.vreg(3), 0xAABB_CCDD);
    }

    #[test]
    fn push_pop_round_trip_preserves_sp() {
        let mut masm = MacroAssembler::new(Features::default());
        masm.mov_imm(Register::x(1), 0x1111);
        masm.mov_imm(Register::x(2), 0x2222);
        masm.push(&[Register::x(1), Register::x(2)]);
        masm.mov_imm(Register::x(1), 0);
        masm.mov_imm(Register::x(2), 0);
        masm.pop(&[Register::x(2), Register::x(1)]);
        let machine = run(masm);
        assert_eq!(machine.xreg(1), 0x1111);
        assert_eq!(machine.xreg(2), 0x2222);
        assert_eq!(machine.sp(), MEM_BASE + 64 * 1024);
    }

    #[test]
    fn sp_reads_go_through_add() {
        let mut masm = MacroAssembler::new(Features::default());
        masm.add_imm(Register::x(9), Register::sp(), 16);
        let machine = run(masm);
        assert_eq!(machine.xreg(9), MEM_BASE + 64 * 1024 + 16);
    }

    #[test]
    fn store_and_load_width() {
        let mut masm = MacroAssembler::new(Features::default());
        let mut machine = Machine::new(Features::default(), 64 * 1024);
        let addr = machine.reserve(16, 16);
        masm.mov_imm(Register::x(0), addr);
        masm.mov_imm(Register::x(1), 0xAABB_CCDD_EEFF_0011);
        masm.str(Register::w(1), Register::x(0), 0);
        masm.ldr(Register::x(2), Register::x(0), 0);
        machine.run(masm.instrs()).expect("program failed");
        // Only the w view was stored; the load sees 4 bytes of data and
        // 4 bytes of zeroed memory.
        assert_eq!(machine.xreg(2), 0xEEFF_0011);
    }

    #[test]
    fn msr_mrs_nzcv() {
        let mut masm = MacroAssembler::new(Features::default());
        masm.mov_imm(Register::x(0), 0x6000_0000); // Z and C
        masm.msr_nzcv(Register::x(0));
        masm.mrs_nzcv(Register::x(1));
        let machine = run(masm);
        assert_eq!(machine.nzcv(), 0x6000_0000);
        assert_eq!(machine.xreg(1), 0x6000_0000);
    }

    #[test]
    fn capability_writes_alias_x_view() {
        let features = Features::with_capabilities();
        let mut masm = MacroAssembler::new(features);
        masm.mov_imm(Register::c(7), 0xABCD);
        let mut machine = Machine::new(features, 64 * 1024);
        machine.run(&masm.finish()).expect("program failed");
        assert_eq!(machine.creg(7), 0xABCD);
        assert_eq!(machine.xreg(7), 0xABCD);
    }

    #[test]
    fn capability_without_feature_fails() {
        let features = Features::with_capabilities();
        let mut masm = MacroAssembler::new(features);
        masm.mov_imm(Register::c(0), 1);
        let mut machine = Machine::new(Features::default(), 64 * 1024);
        let err = machine.run(&masm.finish()).unwrap_err();
        assert!(matches!(err, ExecError::CapabilityDisabled));
    }

    #[test]
    fn unaligned_store_is_an_error() {
        let mut masm = MacroAssembler::new(Features::default());
        masm.mov_imm(Register::x(0), MEM_BASE + 4);
        masm.str(Register::x(1), Register::x(0), 0);
        let mut machine = Machine::new(Features::default(), 64 * 1024);
        let err = machine.run(&masm.finish()).unwrap_err();
        assert!(matches!(err, ExecError::Unaligned { .. }));
    }
}
