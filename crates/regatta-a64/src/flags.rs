use bitflags::bitflags;

bitflags! {
    /// The NZCV condition-flag word, in its architectural bit positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Nzcv: u32 {
        const V = 1 << 28;
        const C = 1 << 29;
        const Z = 1 << 30;
        const N = 1 << 31;
    }
}

/// All four condition-flag bits; anything outside this mask in a flag
/// word is a caller error.
pub const NZCV_MASK: u32 = Nzcv::all().bits();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_positions() {
        assert_eq!(Nzcv::N.bits(), 0x8000_0000);
        assert_eq!(Nzcv::Z.bits(), 0x4000_0000);
        assert_eq!(Nzcv::C.bits(), 0x2000_0000);
        assert_eq!(Nzcv::V.bits(), 0x1000_0000);
        assert_eq!(NZCV_MASK, 0xF000_0000);
    }
}
