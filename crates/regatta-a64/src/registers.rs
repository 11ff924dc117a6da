use std::fmt;

/// Number of general-purpose register slots (x0..x30 plus xzr as slot 31).
pub const NUM_REGISTERS: usize = 32;
/// Number of vector register slots.
pub const NUM_VREGISTERS: usize = 32;
/// Architectural code shared by xzr/wzr/czr.
pub const ZR_CODE: u8 = 31;
/// Internal code for the stack pointer. sp encodes as 31 in instructions
/// but is a separate register; give it an out-of-band code so it can
/// never collide with a register-list slot.
pub const SP_CODE: u8 = 63;

/// Width view of a general-purpose (or capability) register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegSize {
    W32,
    X64,
    /// Capability view: 64-bit address plus bounds/permission metadata.
    C128,
}

impl RegSize {
    pub const fn bits(self) -> u32 {
        match self {
            RegSize::W32 => 32,
            RegSize::X64 => 64,
            RegSize::C128 => 128,
        }
    }

    pub const fn bytes(self) -> u64 {
        (self.bits() / 8) as u64
    }
}

/// Width view of a vector register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VRegSize {
    S32,
    D64,
    Q128,
}

impl VRegSize {
    pub const fn bits(self) -> u32 {
        match self {
            VRegSize::S32 => 32,
            VRegSize::D64 => 64,
            VRegSize::Q128 => 128,
        }
    }

    pub const fn bytes(self) -> u64 {
        (self.bits() / 8) as u64
    }
}

/// A general-purpose register handle: architectural code + width view.
///
/// Two handles with the same code but different sizes are views of the
/// same register, not independent registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    code: u8,
    size: RegSize,
}

impl Register {
    pub const fn new(code: u8, size: RegSize) -> Self {
        assert!(code < NUM_REGISTERS as u8 || code == SP_CODE);
        Register { code, size }
    }

    pub const fn w(code: u8) -> Self {
        Register::new(code, RegSize::W32)
    }

    pub const fn x(code: u8) -> Self {
        Register::new(code, RegSize::X64)
    }

    pub const fn c(code: u8) -> Self {
        Register::new(code, RegSize::C128)
    }

    pub const fn sp() -> Self {
        Register {
            code: SP_CODE,
            size: RegSize::X64,
        }
    }

    pub const fn wsp() -> Self {
        Register {
            code: SP_CODE,
            size: RegSize::W32,
        }
    }

    pub const fn csp() -> Self {
        Register {
            code: SP_CODE,
            size: RegSize::C128,
        }
    }

    pub const fn code(self) -> u8 {
        self.code
    }

    pub const fn size(self) -> RegSize {
        self.size
    }

    pub const fn is_sp(self) -> bool {
        self.code == SP_CODE
    }

    /// True for xzr/wzr/czr: reads as zero, writes are discarded.
    pub const fn is_zero(self) -> bool {
        self.code == ZR_CODE
    }

    pub const fn to_w(self) -> Self {
        Register {
            code: self.code,
            size: RegSize::W32,
        }
    }

    pub const fn to_x(self) -> Self {
        Register {
            code: self.code,
            size: RegSize::X64,
        }
    }

    pub const fn to_c(self) -> Self {
        Register {
            code: self.code,
            size: RegSize::C128,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.size {
            RegSize::W32 => "w",
            RegSize::X64 => "x",
            RegSize::C128 => "c",
        };
        if self.is_sp() {
            match self.size {
                RegSize::W32 => write!(f, "wsp"),
                RegSize::X64 => write!(f, "sp"),
                RegSize::C128 => write!(f, "csp"),
            }
        } else if self.is_zero() {
            write!(f, "{prefix}zr")
        } else {
            write!(f, "{prefix}{}", self.code)
        }
    }
}

/// A vector/floating-point register handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VRegister {
    code: u8,
    size: VRegSize,
}

impl VRegister {
    pub const fn new(code: u8, size: VRegSize) -> Self {
        assert!(code < NUM_VREGISTERS as u8);
        VRegister { code, size }
    }

    pub const fn s(code: u8) -> Self {
        VRegister::new(code, VRegSize::S32)
    }

    pub const fn d(code: u8) -> Self {
        VRegister::new(code, VRegSize::D64)
    }

    pub const fn q(code: u8) -> Self {
        VRegister::new(code, VRegSize::Q128)
    }

    pub const fn code(self) -> u8 {
        self.code
    }

    pub const fn size(self) -> VRegSize {
        self.size
    }

    pub const fn to_s(self) -> Self {
        VRegister {
            code: self.code,
            size: VRegSize::S32,
        }
    }

    pub const fn to_d(self) -> Self {
        VRegister {
            code: self.code,
            size: VRegSize::D64,
        }
    }

    pub const fn to_q(self) -> Self {
        VRegister {
            code: self.code,
            size: VRegSize::Q128,
        }
    }
}

impl fmt::Display for VRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.size {
            VRegSize::S32 => "s",
            VRegSize::D64 => "d",
            VRegSize::Q128 => "q",
        };
        write!(f, "{prefix}{}", self.code)
    }
}
