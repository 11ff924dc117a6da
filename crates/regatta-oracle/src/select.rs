use regatta_a64::{RegList, RegSize, Register, VRegList, VRegSize, VRegister};

/// Picks the first `count` registers of `allowed` in ascending code
/// order and materializes them under each requested width view: `w`
/// and `x` receive the fixed narrow/wide views, `r` receives the view
/// given by `size`. Returns the set of chosen registers.
///
/// Asking for more registers than the pool holds is a test setup error.
pub fn populate_register_array(
    mut w: Option<&mut [Register]>,
    mut x: Option<&mut [Register]>,
    mut r: Option<&mut [Register]>,
    size: RegSize,
    count: usize,
    allowed: RegList,
) -> RegList {
    let mut list = RegList::empty();
    for (i, reg) in allowed.iter().take(count).enumerate() {
        if let Some(r) = r.as_deref_mut() {
            r[i] = Register::new(reg.code(), size);
        }
        if let Some(x) = x.as_deref_mut() {
            x[i] = reg.to_x();
        }
        if let Some(w) = w.as_deref_mut() {
            w[i] = reg.to_w();
        }
        list.set(reg);
    }
    assert_eq!(
        list.count(),
        count,
        "not enough eligible registers in the allowed pool"
    );
    list
}

/// Vector-register counterpart of [`populate_register_array`]: `s` and
/// `d` receive the fixed views, `v` receives the view given by `size`.
pub fn populate_vregister_array(
    mut s: Option<&mut [VRegister]>,
    mut d: Option<&mut [VRegister]>,
    mut v: Option<&mut [VRegister]>,
    size: VRegSize,
    count: usize,
    allowed: VRegList,
) -> VRegList {
    let mut list = VRegList::empty();
    for (i, reg) in allowed.iter().take(count).enumerate() {
        if let Some(v) = v.as_deref_mut() {
            v[i] = VRegister::new(reg.code(), size);
        }
        if let Some(d) = d.as_deref_mut() {
            d[i] = reg.to_d();
        }
        if let Some(s) = s.as_deref_mut() {
            s[i] = reg.to_s();
        }
        list.set(reg);
    }
    assert_eq!(
        list.count(),
        count,
        "not enough eligible vector registers in the allowed pool"
    );
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_in_pool_order_under_all_views() {
        let mut allowed = RegList::empty();
        for code in [4u8, 9, 2, 20] {
            allowed.set(Register::x(code));
        }

        let mut w = [Register::x(0); 3];
        let mut x = [Register::x(0); 3];
        let mut r = [Register::x(0); 3];
        let list = populate_register_array(
            Some(&mut w),
            Some(&mut x),
            Some(&mut r),
            RegSize::W32,
            3,
            allowed,
        );

        assert_eq!(x, [Register::x(2), Register::x(4), Register::x(9)]);
        assert_eq!(w, [Register::w(2), Register::w(4), Register::w(9)]);
        assert_eq!(r, [Register::w(2), Register::w(4), Register::w(9)]);
        assert_eq!(list.count(), 3);
        assert!(list.contains(Register::x(2)));
        assert!(!list.contains(Register::x(20)));
    }

    #[test]
    fn output_views_are_optional() {
        let mut d = [VRegister::d(0); 2];
        let list = populate_vregister_array(
            None,
            Some(&mut d),
            None,
            VRegSize::D64,
            2,
            VRegList::range(5, 8),
        );
        assert_eq!(d, [VRegister::d(5), VRegister::d(6)]);
        assert_eq!(list.count(), 2);
    }

    #[test]
    #[should_panic(expected = "not enough eligible registers")]
    fn short_pool_is_fatal() {
        let allowed = RegList::range(0, 1);
        populate_register_array(None, None, None, RegSize::X64, 3, allowed);
    }
}
