use crate::kind::{Kind, FLAG_OPT, SLOT_SIZE};
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

/// A type: a kind code plus an optional info block for parameters and names.
///
/// Info blocks are shared by reference. Walkers that recurse into params must
/// track visited infos by identity, because named record types can be cyclic.
#[derive(Clone)]
pub struct Type {
    pub kind: Kind,
    pub info: Option<Arc<Info>>,
}

/// Shared type details: a reference name for named types (schema types,
/// enums, records, signatures) and an ordered parameter list. The last
/// parameter of a signature is its result.
#[derive(Default, Debug)]
pub struct Info {
    pub name: SmolStr,
    pub params: Vec<Param>,
}

/// A named, typed parameter. A name ending in `?` marks the parameter
/// optional.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: SmolStr,
    pub typ: Type,
}

impl Param {
    pub fn new(name: impl Into<SmolStr>, typ: Type) -> Self {
        Param {
            name: name.into(),
            typ,
        }
    }

    pub fn anon(typ: Type) -> Self {
        Param {
            name: SmolStr::default(),
            typ,
        }
    }

    pub fn is_opt(&self) -> bool {
        self.name.ends_with('?')
    }

    /// Case-folded lookup key, without the optional marker.
    pub fn key(&self) -> SmolStr {
        let name = self.name.trim_end_matches('?');
        if name.chars().all(|c| c.is_ascii_lowercase() || !c.is_ascii_alphabetic()) {
            SmolStr::new(name)
        } else {
            SmolStr::new(name.to_ascii_lowercase())
        }
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.typ == other.typ
    }
}

impl Type {
    pub const VOID: Type = Type {
        kind: Kind::VOID,
        info: None,
    };
    pub const ANY: Type = Type {
        kind: Kind::ANY,
        info: None,
    };
    pub const TYP: Type = Type {
        kind: Kind::TYP,
        info: None,
    };
    pub const NUM: Type = Type {
        kind: Kind::NUM,
        info: None,
    };
    pub const BOOL: Type = Type {
        kind: Kind::BOOL,
        info: None,
    };
    pub const INT: Type = Type {
        kind: Kind::INT,
        info: None,
    };
    pub const REAL: Type = Type {
        kind: Kind::REAL,
        info: None,
    };
    pub const CHAR: Type = Type {
        kind: Kind::CHAR,
        info: None,
    };
    pub const STR: Type = Type {
        kind: Kind::STR,
        info: None,
    };
    pub const RAW: Type = Type {
        kind: Kind::RAW,
        info: None,
    };
    pub const UUID: Type = Type {
        kind: Kind::UUID,
        info: None,
    };
    pub const TIME: Type = Type {
        kind: Kind::TIME,
        info: None,
    };
    pub const SPAN: Type = Type {
        kind: Kind::SPAN,
        info: None,
    };
    pub const IDXR: Type = Type {
        kind: Kind::IDXR,
        info: None,
    };
    pub const LIST: Type = Type {
        kind: Kind::LIST,
        info: None,
    };
    pub const KEYR: Type = Type {
        kind: Kind::KEYR,
        info: None,
    };
    pub const DICT: Type = Type {
        kind: Kind::DICT,
        info: None,
    };
    pub const SYM: Type = Type {
        kind: Kind::SYM,
        info: None,
    };
    pub const DYN: Type = Type {
        kind: Kind::DYN,
        info: None,
    };
    pub const TAG: Type = Type {
        kind: Kind::TAG,
        info: None,
    };
    pub const DECL: Type = Type {
        kind: Kind::DECL,
        info: None,
    };
    pub const CALL: Type = Type {
        kind: Kind::CALL,
        info: None,
    };

    pub fn new(kind: Kind) -> Type {
        Type { kind, info: None }
    }

    // ── Constructors ─────────────────────────────────────────────

    /// A list type with the given element type.
    pub fn list(elem: Type) -> Type {
        Type::cont(Kind::LIST, elem)
    }

    /// A dict type with the given element type.
    pub fn dict(elem: Type) -> Type {
        Type::cont(Kind::DICT, elem)
    }

    /// A container type of the given kind with the given element type.
    pub fn cont(kind: Kind, elem: Type) -> Type {
        // Stack simple value-element kinds into the kind word; anything
        // carrying info, a variable id, or too deep a stack goes to params.
        let stackable = elem.info.is_none()
            && !elem.kind.is_ref()
            && elem.kind != Kind::VOID
            && elem.kind.0 >> (64 - SLOT_SIZE as u64) == 0;
        if stackable {
            if elem.kind == Kind::ANY {
                return Type::new(kind);
            }
            return Type::new(Kind(kind.0 | (elem.kind.0 << SLOT_SIZE)));
        }
        Type {
            kind,
            info: Some(Arc::new(Info {
                name: SmolStr::default(),
                params: vec![Param::anon(elem)],
            })),
        }
    }

    /// A named record type with the given fields.
    pub fn rec(name: impl Into<SmolStr>, fields: Vec<Param>) -> Type {
        Type {
            kind: Kind::REC,
            info: Some(Arc::new(Info {
                name: name.into(),
                params: fields,
            })),
        }
    }

    /// A named type reference, resolved through the environment.
    pub fn reff(name: impl Into<SmolStr>) -> Type {
        Type {
            kind: Kind::REF,
            info: Some(Arc::new(Info {
                name: name.into(),
                params: Vec::new(),
            })),
        }
    }

    /// A type variable with the given id.
    pub fn var(id: u64) -> Type {
        Type::new(Kind(Kind::VAR.0 | (id << SLOT_SIZE)))
    }

    /// A type variable with candidate alternatives it must choose from.
    pub fn var_alts(id: u64, alts: Vec<Type>) -> Type {
        Type {
            kind: Kind(Kind::VAR.0 | (id << SLOT_SIZE)),
            info: Some(Arc::new(Info {
                name: SmolStr::default(),
                params: alts.into_iter().map(Param::anon).collect(),
            })),
        }
    }

    /// A form signature; the last param is the result.
    pub fn form(name: impl Into<SmolStr>, params: Vec<Param>) -> Type {
        Type {
            kind: Kind::FORM,
            info: Some(Arc::new(Info {
                name: name.into(),
                params,
            })),
        }
    }

    /// A function signature; the last param is the result.
    pub fn func(name: impl Into<SmolStr>, params: Vec<Param>) -> Type {
        Type {
            kind: Kind::FUNC,
            info: Some(Arc::new(Info {
                name: name.into(),
                params,
            })),
        }
    }

    // ── Flags ────────────────────────────────────────────────────

    pub fn is_opt(&self) -> bool {
        self.kind.is_opt()
    }

    /// The optional variant of this type.
    pub fn opt(&self) -> Type {
        Type {
            kind: Kind(self.kind.0 | FLAG_OPT),
            info: self.info.clone(),
        }
    }

    /// Strips the optional flag, unless the type is `any`.
    pub fn deopt(&self) -> Type {
        if self.kind.is_opt() && self.kind.elem() != Kind::ANY {
            return Type {
                kind: Kind(self.kind.0 & !FLAG_OPT),
                info: self.info.clone(),
            };
        }
        self.clone()
    }

    pub fn is_var(&self) -> bool {
        self.kind.is_var()
    }

    pub fn var_id(&self) -> u64 {
        self.kind.var_id()
    }

    /// Alternative candidates attached to a variable or alt type.
    pub fn alts(&self) -> &[Param] {
        if self.kind.is_var() || self.kind.elem() == Kind::ALT {
            return self.params();
        }
        &[]
    }

    pub fn has_params(&self) -> bool {
        self.info.as_ref().is_some_and(|i| !i.params.is_empty())
    }

    pub fn params(&self) -> &[Param] {
        match &self.info {
            Some(info) => &info.params,
            None => &[],
        }
    }

    pub fn name(&self) -> &str {
        match &self.info {
            Some(info) => &info.name,
            None => "",
        }
    }

    /// Looks up a parameter by case-folded key; returns its index too.
    pub fn param_by_key(&self, key: &str) -> Option<(usize, &Param)> {
        self.params()
            .iter()
            .enumerate()
            .find(|(_, p)| p.key() == key)
    }

    // ── Structure ────────────────────────────────────────────────

    /// The element type for container kinds, `any` when unknown, `void` for
    /// everything else.
    pub fn elem(&self) -> Type {
        let k = self.kind.elem();
        if !k.is_cont() {
            return Type::VOID;
        }
        let rest = self.kind.slot_rest();
        if rest != 0 {
            return Type::new(Kind(rest));
        }
        if k != Kind::REC {
            if let Some(p) = self.params().first() {
                return p.typ.clone();
            }
        }
        Type::ANY
    }

    /// The innermost element type of a container stack; `self` otherwise.
    pub fn last(&self) -> Type {
        let mut t = self.clone();
        loop {
            let el = t.elem();
            if el.kind == Kind::VOID || el.kind == Kind::ANY {
                return t;
            }
            t = el;
        }
    }

    /// The result type of a signature: its last parameter.
    pub fn res(&self) -> Type {
        if self.kind.is_spec() {
            if let Some(p) = self.params().last() {
                return p.typ.clone();
            }
        }
        Type::VOID
    }

    /// The declared (non-result) parameters of a signature.
    pub fn args(&self) -> &[Param] {
        if self.kind.is_spec() {
            let ps = self.params();
            if !ps.is_empty() {
                return &ps[..ps.len() - 1];
            }
        }
        &[]
    }

    pub fn ordered(&self) -> bool {
        self.kind.is_ordered()
    }

    // ── Equality ─────────────────────────────────────────────────

    /// Structural equality on kind, name and params, cycle-safe via info
    /// identity.
    pub fn equal(&self, other: &Type) -> bool {
        self.eq_hist(other, &mut Vec::new())
    }

    fn eq_hist(&self, other: &Type, hist: &mut Vec<(usize, usize)>) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (&self.info, &other.info) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Arc::as_ptr(a) as usize, Arc::as_ptr(b) as usize);
                if hist.contains(&pair) {
                    return true;
                }
                hist.push(pair);
                let ok = a.name == b.name
                    && a.params.len() == b.params.len()
                    && a.params
                        .iter()
                        .zip(&b.params)
                        .all(|(x, y)| x.name == y.name && x.typ.eq_hist(&y.typ, hist));
                hist.pop();
                ok
            }
            _ => false,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({self})")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let k = self.kind.elem();
        if self.kind.is_var() {
            if self.var_id() != 0 {
                write!(f, "@{}", self.var_id())?;
            } else {
                f.write_str("@")?;
            }
            for (i, a) in self.alts().iter().enumerate() {
                f.write_str(if i == 0 { "|" } else { " " })?;
                write!(f, "{}", a.typ)?;
            }
            return Ok(());
        }
        if k == Kind::REF {
            return write!(f, "@{}", self.name());
        }
        if k.is_spec() || k == Kind::REC && self.info.is_some() {
            f.write_str("<")?;
            f.write_str(k.name())?;
            if !self.name().is_empty() {
                write!(f, " {}", self.name())?;
            }
            for p in self.params() {
                if p.name.is_empty() {
                    write!(f, " {}", p.typ)?;
                } else {
                    write!(f, " {}:{}", p.name, p.typ)?;
                }
            }
            return f.write_str(">");
        }
        f.write_str(k.name())?;
        if self.is_opt() {
            f.write_str("?")?;
        }
        if k.is_cont() {
            if self.kind.slot_rest() != 0 {
                return write!(f, "|{}", Type::new(Kind(self.kind.slot_rest())));
            }
            if k != Kind::REC {
                if let Some(p) = self.params().first() {
                    return write!(f, "|{}", p.typ);
                }
            }
        }
        Ok(())
    }
}
