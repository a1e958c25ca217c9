use std::fmt;

/// A bit-packed kind code.
///
/// The low 12 bits form one *slot*: class bits, a discriminator and the
/// optional flag. The bits above the low slot carry either a type variable
/// id or, for container kinds, the stacked element kind (so `list|list|int`
/// fits in a single word).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kind(pub u64);

/// Width of one kind slot in bits.
pub const SLOT_SIZE: u32 = 12;

// class bits
const NUM: u64 = 1 << 0;
const CHAR: u64 = 1 << 1;
const IDXR: u64 = 1 << 2;
const KEYR: u64 = 1 << 3;
const EXP: u64 = 1 << 4;
const SPC: u64 = 1 << 5;
const REF: u64 = 1 << 6;

const fn disc(n: u64) -> u64 {
    n << 7
}

/// Class bits of one slot.
pub const MASK_BASE: u64 = 0x7f;
/// Class plus discriminator bits of one slot, without the optional flag.
pub const MASK_ELEM: u64 = 0x7ff;
/// A full slot.
pub const MASK_SLOT: u64 = 0xfff;
/// The optional flag bit.
pub const FLAG_OPT: u64 = 1 << 11;

impl Kind {
    pub const VOID: Kind = Kind(0);
    pub const ANY: Kind = Kind(NUM | CHAR | IDXR | KEYR);

    pub const NUM: Kind = Kind(NUM);
    pub const BOOL: Kind = Kind(NUM | disc(1));
    pub const INT: Kind = Kind(NUM | disc(2));
    pub const REAL: Kind = Kind(NUM | disc(3));
    pub const FLAG: Kind = Kind(NUM | disc(6));

    pub const CHAR: Kind = Kind(CHAR);
    pub const STR: Kind = Kind(CHAR | disc(1));
    pub const RAW: Kind = Kind(CHAR | disc(2));
    pub const UUID: Kind = Kind(CHAR | disc(3));

    pub const TIME: Kind = Kind(NUM | CHAR | disc(4));
    pub const SPAN: Kind = Kind(NUM | CHAR | disc(5));
    pub const ENUM: Kind = Kind(NUM | CHAR | disc(7));

    pub const IDXR: Kind = Kind(IDXR);
    pub const LIST: Kind = Kind(IDXR | disc(1));
    pub const KEYR: Kind = Kind(KEYR);
    pub const DICT: Kind = Kind(KEYR | disc(1));
    pub const REC: Kind = Kind(IDXR | KEYR | disc(2));

    pub const TYP: Kind = Kind(SPC);
    pub const FORM: Kind = Kind(SPC | disc(1));
    pub const FUNC: Kind = Kind(SPC | disc(2));

    pub const SYM: Kind = Kind(EXP);
    pub const DYN: Kind = Kind(EXP | disc(1));
    pub const TAG: Kind = Kind(EXP | disc(2));
    pub const DECL: Kind = Kind(EXP | disc(3));
    pub const CALL: Kind = Kind(EXP | disc(4));

    pub const REF: Kind = Kind(REF);
    pub const VAR: Kind = Kind(REF | disc(1));
    pub const ALT: Kind = Kind(REF | disc(2));

    /// The element kind of the low slot, without the optional flag.
    pub fn elem(self) -> Kind {
        Kind(self.0 & MASK_ELEM)
    }

    /// The class bits of the low slot.
    pub fn base(self) -> Kind {
        Kind(self.0 & MASK_BASE)
    }

    /// Everything above the low slot: a stacked element kind for container
    /// kinds, the numeric id for variables.
    pub fn slot_rest(self) -> u64 {
        self.0 >> SLOT_SIZE
    }

    pub fn is_opt(self) -> bool {
        self.0 & FLAG_OPT != 0 && self.0 & MASK_ELEM != 0
    }

    pub fn is_var(self) -> bool {
        self.elem() == Kind::VAR
    }

    pub fn is_ref(self) -> bool {
        self.base() == Kind::REF
    }

    /// Variable id for var kinds, zero otherwise.
    pub fn var_id(self) -> u64 {
        if self.is_var() {
            self.slot_rest()
        } else {
            0
        }
    }

    pub fn is_num(self) -> bool {
        self.0 & NUM != 0 && self.base() != Kind::ANY.base()
    }

    pub fn is_char(self) -> bool {
        self.0 & CHAR != 0 && self.base() != Kind::ANY.base()
    }

    /// Whether the low slot names an index-accessible container.
    pub fn is_idxr(self) -> bool {
        self.0 & IDXR != 0 && self.base() != Kind::ANY.base()
    }

    /// Whether the low slot names a key-accessible container.
    pub fn is_keyr(self) -> bool {
        self.0 & KEYR != 0 && self.base() != Kind::ANY.base()
    }

    pub fn is_cont(self) -> bool {
        self.is_idxr() || self.is_keyr()
    }

    /// Whether the kind names a callable specification signature.
    pub fn is_spec(self) -> bool {
        matches!(self.elem(), Kind::FORM | Kind::FUNC)
    }

    /// Whether values of this kind support ordering.
    pub fn is_ordered(self) -> bool {
        if self.is_num() {
            return true;
        }
        matches!(self.elem(), Kind::CHAR | Kind::STR | Kind::ENUM)
    }

    /// Named schema kinds that require a `ref` name in their info.
    pub fn is_schema(self) -> bool {
        matches!(self.elem(), Kind::REC | Kind::FLAG | Kind::ENUM)
    }

    /// The canonical name of the low-slot element kind.
    pub fn name(self) -> &'static str {
        match self.elem() {
            Kind::VOID => "void",
            Kind::ANY => "any",
            Kind::NUM => "num",
            Kind::BOOL => "bool",
            Kind::INT => "int",
            Kind::REAL => "real",
            Kind::CHAR => "char",
            Kind::STR => "str",
            Kind::RAW => "raw",
            Kind::UUID => "uuid",
            Kind::TIME => "time",
            Kind::SPAN => "span",
            Kind::FLAG => "flag",
            Kind::ENUM => "enum",
            Kind::IDXR => "idxr",
            Kind::LIST => "list",
            Kind::KEYR => "keyr",
            Kind::DICT => "dict",
            Kind::REC => "rec",
            Kind::TYP => "typ",
            Kind::FORM => "form",
            Kind::FUNC => "func",
            Kind::SYM => "sym",
            Kind::DYN => "dyn",
            Kind::TAG => "tag",
            Kind::DECL => "decl",
            Kind::CALL => "call",
            Kind::REF => "ref",
            Kind::VAR => "var",
            Kind::ALT => "alt",
            _ => "kind",
        }
    }

    /// Look up an element kind by its canonical name.
    pub fn by_name(name: &str) -> Option<Kind> {
        Some(match name {
            "void" => Kind::VOID,
            "any" => Kind::ANY,
            "num" => Kind::NUM,
            "bool" => Kind::BOOL,
            "int" => Kind::INT,
            "real" => Kind::REAL,
            "char" => Kind::CHAR,
            "str" => Kind::STR,
            "raw" => Kind::RAW,
            "uuid" => Kind::UUID,
            "time" => Kind::TIME,
            "span" => Kind::SPAN,
            "flag" => Kind::FLAG,
            "enum" => Kind::ENUM,
            "idxr" => Kind::IDXR,
            "list" => Kind::LIST,
            "keyr" => Kind::KEYR,
            "dict" => Kind::DICT,
            "rec" => Kind::REC,
            "typ" => Kind::TYP,
            "form" => Kind::FORM,
            "func" => Kind::FUNC,
            "sym" => Kind::SYM,
            "dyn" => Kind::DYN,
            "tag" => Kind::TAG,
            "decl" => Kind::DECL,
            "call" => Kind::CALL,
            "ref" => Kind::REF,
            "var" => Kind::VAR,
            "alt" => Kind::ALT,
            _ => return None,
        })
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({self})")
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut k = *self;
        loop {
            f.write_str(k.name())?;
            if k.is_opt() {
                f.write_str("?")?;
            }
            if k.is_cont() && k.slot_rest() != 0 {
                f.write_str("|")?;
                k = Kind(k.slot_rest());
                continue;
            }
            if k.is_var() && k.var_id() != 0 {
                return write!(f, "@{}", k.var_id());
            }
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_classes() {
        assert!(Kind::INT.is_num());
        assert!(Kind::SPAN.is_num());
        assert!(Kind::STR.is_char());
        assert!(Kind::TIME.is_char());
        assert!(!Kind::ANY.is_num());
        assert!(Kind::LIST.is_idxr());
        assert!(Kind::REC.is_idxr());
        assert!(Kind::REC.is_keyr());
        assert!(!Kind::STR.is_cont());
    }

    #[test]
    fn ordering_support() {
        assert!(Kind::INT.is_ordered());
        assert!(Kind::STR.is_ordered());
        assert!(Kind::ENUM.is_ordered());
        assert!(!Kind::LIST.is_ordered());
        assert!(!Kind::RAW.is_ordered());
    }

    #[test]
    fn stacked_containers() {
        let k = Kind(Kind::LIST.0 | (Kind::INT.0 << SLOT_SIZE));
        assert_eq!(k.elem(), Kind::LIST);
        assert_eq!(Kind(k.slot_rest()), Kind::INT);
        assert_eq!(k.to_string(), "list|int");
    }

    #[test]
    fn var_ids() {
        let v = Kind(Kind::VAR.0 | (7 << SLOT_SIZE));
        assert!(v.is_var());
        assert_eq!(v.var_id(), 7);
        assert_eq!(v.to_string(), "var@7");
    }

    #[test]
    fn opt_flag() {
        let k = Kind(Kind::INT.0 | FLAG_OPT);
        assert!(k.is_opt());
        assert_eq!(k.elem(), Kind::INT);
        assert!(!Kind::VOID.is_opt());
        assert!(!Kind(FLAG_OPT).is_opt());
    }

    #[test]
    fn names_round_trip() {
        for n in ["void", "any", "int", "list", "rec", "func", "var"] {
            assert_eq!(Kind::by_name(n).unwrap().name(), n);
        }
    }
}
