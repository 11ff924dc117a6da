use crate::registers::{Register, VRegister, NUM_REGISTERS, NUM_VREGISTERS};

/// A set of general-purpose registers, stored as a bitset over codes.
///
/// Iteration and `pop_lowest_index` are in ascending code order, which
/// makes register selection deterministic across runs. The stack
/// pointer can never be a member (its internal code is out of range).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegList {
    bits: u32,
}

impl RegList {
    pub const fn empty() -> Self {
        RegList { bits: 0 }
    }

    pub const fn from_bits(bits: u32) -> Self {
        RegList { bits }
    }

    /// Registers `lo..=hi` inclusive, by code.
    pub const fn range(lo: u8, hi: u8) -> Self {
        assert!(lo <= hi && (hi as usize) < NUM_REGISTERS);
        let span = hi - lo + 1;
        let mask = if span == 32 { u32::MAX } else { (1u32 << span) - 1 };
        RegList { bits: mask << lo }
    }

    /// AAPCS64 caller-saved general registers (x0..x17).
    pub const fn caller_saved() -> Self {
        RegList::range(0, 17)
    }

    /// AAPCS64 callee-saved general registers (x19..x28).
    pub const fn callee_saved() -> Self {
        RegList::range(19, 28)
    }

    pub const fn bits(self) -> u32 {
        self.bits
    }

    pub fn set(&mut self, reg: Register) {
        assert!(!reg.is_sp(), "sp cannot be a register-list member");
        self.bits |= 1 << reg.code();
    }

    pub fn remove(&mut self, reg: Register) {
        if !reg.is_sp() {
            self.bits &= !(1 << reg.code());
        }
    }

    pub fn contains(self, reg: Register) -> bool {
        !reg.is_sp() && self.bits & (1 << reg.code()) != 0
    }

    pub const fn count(self) -> usize {
        self.bits.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn combine(&mut self, other: RegList) {
        self.bits |= other.bits;
    }

    /// Removes and returns the lowest-coded member as an x view.
    pub fn pop_lowest_index(&mut self) -> Option<Register> {
        if self.bits == 0 {
            return None;
        }
        let code = self.bits.trailing_zeros() as u8;
        self.bits &= self.bits - 1;
        Some(Register::x(code))
    }

    /// Ascending-code iteration, yielding x views.
    pub fn iter(self) -> impl Iterator<Item = Register> {
        (0..NUM_REGISTERS as u8).filter_map(move |code| {
            if self.bits & (1 << code) != 0 {
                Some(Register::x(code))
            } else {
                None
            }
        })
    }
}

impl FromIterator<Register> for RegList {
    fn from_iter<T: IntoIterator<Item = Register>>(iter: T) -> Self {
        let mut list = RegList::empty();
        for reg in iter {
            list.set(reg);
        }
        list
    }
}

/// A set of vector registers. Same representation and ordering rules as
/// [`RegList`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VRegList {
    bits: u32,
}

impl VRegList {
    pub const fn empty() -> Self {
        VRegList { bits: 0 }
    }

    pub const fn from_bits(bits: u32) -> Self {
        VRegList { bits }
    }

    pub const fn range(lo: u8, hi: u8) -> Self {
        assert!(lo <= hi && (hi as usize) < NUM_VREGISTERS);
        let span = hi - lo + 1;
        let mask = if span == 32 { u32::MAX } else { (1u32 << span) - 1 };
        VRegList { bits: mask << lo }
    }

    /// AAPCS64 caller-saved vector registers (d0..d7, d16..d31).
    pub const fn caller_saved() -> Self {
        VRegList {
            bits: VRegList::range(0, 7).bits | VRegList::range(16, 31).bits,
        }
    }

    /// AAPCS64 callee-saved vector registers (d8..d15).
    pub const fn callee_saved() -> Self {
        VRegList::range(8, 15)
    }

    pub const fn bits(self) -> u32 {
        self.bits
    }

    pub fn set(&mut self, reg: VRegister) {
        self.bits |= 1 << reg.code();
    }

    pub fn remove(&mut self, reg: VRegister) {
        self.bits &= !(1 << reg.code());
    }

    pub fn contains(self, reg: VRegister) -> bool {
        self.bits & (1 << reg.code()) != 0
    }

    pub const fn count(self) -> usize {
        self.bits.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn combine(&mut self, other: VRegList) {
        self.bits |= other.bits;
    }

    /// Removes and returns the lowest-coded member as a d view.
    pub fn pop_lowest_index(&mut self) -> Option<VRegister> {
        if self.bits == 0 {
            return None;
        }
        let code = self.bits.trailing_zeros() as u8;
        self.bits &= self.bits - 1;
        Some(VRegister::d(code))
    }

    /// Ascending-code iteration, yielding d views.
    pub fn iter(self) -> impl Iterator<Item = VRegister> {
        (0..NUM_VREGISTERS as u8).filter_map(move |code| {
            if self.bits & (1 << code) != 0 {
                Some(VRegister::d(code))
            } else {
                None
            }
        })
    }
}

impl FromIterator<VRegister> for VRegList {
    fn from_iter<T: IntoIterator<Item = VRegister>>(iter: T) -> Self {
        let mut list = VRegList::empty();
        for reg in iter {
            list.set(reg);
        }
        list
    }
}

/// A register list tagged with its class, for operations that dispatch
/// on general vs. vector registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuRegList {
    Gp(RegList),
    Fp(VRegList),
}

impl From<RegList> for CpuRegList {
    fn from(list: RegList) -> Self {
        CpuRegList::Gp(list)
    }
}

impl From<VRegList> for CpuRegList {
    fn from(list: VRegList) -> Self {
        CpuRegList::Fp(list)
    }
}
