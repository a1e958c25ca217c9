use crate::kind::{Kind, MASK_BASE};
use crate::types::Type;

/// Comparison level between two types, ordered from incompatible to equal.
///
/// The level describes how a value of the first type can be used as the
/// second: `Conv` converts losslessly, `Comp` converts through a shared
/// base, `Check` needs a runtime check, `None` is incompatible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Cmp {
    None,
    /// Needs a runtime check in one direction; mirrors to `Conv`.
    Check,
    /// Needs runtime checks in both directions; self-mirrored.
    CheckBoth,
    /// Converts through a shared base; self-mirrored.
    Comp,
    /// Lossless conversion; mirrors to `Check`.
    Conv,
    Same,
}

impl Cmp {
    /// The level of the reversed comparison: `compare(a, b).mirror()`
    /// equals `compare(b, a)`.
    pub fn mirror(self) -> Cmp {
        match self {
            Cmp::Check => Cmp::Conv,
            Cmp::Conv => Cmp::Check,
            lvl => lvl,
        }
    }
}

/// Compares two types and returns the level at which a value of type `a`
/// can be used as type `b`.
pub fn compare(a: &Type, b: &Type) -> Cmp {
    if a.equal(b) {
        return Cmp::Same;
    }
    let ao = a.kind.is_opt();
    let bo = b.kind.is_opt();
    let lvl = compare_plain(&strip_opt(a), &strip_opt(b));
    if ao == bo {
        return lvl;
    }
    // one side can hold null: demote so that mirroring stays consistent
    if ao {
        match lvl {
            Cmp::Same => Cmp::Check,
            Cmp::Conv | Cmp::Comp => Cmp::CheckBoth,
            lvl => lvl,
        }
    } else {
        match lvl {
            Cmp::Same | Cmp::Conv => Cmp::Conv,
            Cmp::Check | Cmp::Comp => Cmp::CheckBoth,
            lvl => lvl,
        }
    }
}

fn strip_opt(t: &Type) -> Type {
    Type {
        kind: crate::kind::Kind(t.kind.0 & !crate::kind::FLAG_OPT),
        info: t.info.clone(),
    }
}

fn compare_plain(a: &Type, b: &Type) -> Cmp {
    if a.equal(b) {
        return Cmp::Same;
    }
    let ka = a.kind.elem();
    let kb = b.kind.elem();
    if ka == kb {
        if ka.is_cont() && ka != Kind::REC {
            // element-wise: the container level cannot exceed the level of
            // its elements
            return compare(&a.elem(), &b.elem()).min(Cmp::Conv);
        }
        // same kind with differing names or params
        return Cmp::Check;
    }
    if ka == Kind::ANY {
        return Cmp::Check;
    }
    if kb == Kind::ANY {
        return Cmp::Conv;
    }
    let shared = ka.0 & kb.0 & MASK_BASE;
    if shared == 0 {
        return Cmp::None;
    }
    // a subtype converts to its bare base; a base narrows with a check
    if kb.base() == kb && ka.0 & kb.0 & MASK_BASE == kb.0 & MASK_BASE {
        return Cmp::Conv;
    }
    if ka.base() == ka && ka.0 & kb.0 & MASK_BASE == ka.0 & MASK_BASE {
        return Cmp::Check;
    }
    Cmp::Comp
}
