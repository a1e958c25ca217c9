//! Literal values for the osier expression language.
//!
//! A literal is plain data: scalars, containers and records. Specs and type
//! values are not literals; they live one layer up in the element tree.

mod comp;
mod convert;
mod error;
mod select;

pub use comp::{comp, equal, equiv, less};
pub use convert::{convert, to_text};
pub use error::LitError;
pub use select::select;

use osier_types::{Kind, Type};
use smol_str::SmolStr;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Lit {
    /// The absent value.
    Nil,
    Bool(bool),
    /// An untyped number literal.
    Num(f64),
    Int(i64),
    Real(f64),
    /// An untyped text literal.
    Char(SmolStr),
    Str(SmolStr),
    Raw(Vec<u8>),
    Uuid([u8; 16]),
    /// Epoch milliseconds.
    Time(i64),
    /// Duration milliseconds.
    Span(i64),
    List(List),
    Dict(Dict),
    Rec(Rec),
    /// A present optional value.
    Some(Box<Lit>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct List {
    pub elem: Type,
    pub data: Vec<Lit>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dict {
    pub elem: Type,
    pub data: Vec<Keyed>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Keyed {
    pub key: SmolStr,
    pub val: Lit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rec {
    pub typ: Type,
    pub data: Vec<Keyed>,
}

impl List {
    pub fn new(elem: Type, data: Vec<Lit>) -> Self {
        List { elem, data }
    }

    pub fn any(data: Vec<Lit>) -> Self {
        List {
            elem: Type::ANY,
            data,
        }
    }
}

impl Dict {
    pub fn new(elem: Type, data: Vec<Keyed>) -> Self {
        Dict { elem, data }
    }

    pub fn any(data: Vec<Keyed>) -> Self {
        Dict {
            elem: Type::ANY,
            data,
        }
    }
}

impl Keyed {
    pub fn new(key: impl Into<SmolStr>, val: Lit) -> Self {
        Keyed {
            key: key.into(),
            val,
        }
    }
}

impl Lit {
    pub fn typ(&self) -> Type {
        match self {
            Lit::Nil => Type::ANY.opt(),
            Lit::Bool(_) => Type::BOOL,
            Lit::Num(_) => Type::NUM,
            Lit::Int(_) => Type::INT,
            Lit::Real(_) => Type::REAL,
            Lit::Char(_) => Type::CHAR,
            Lit::Str(_) => Type::STR,
            Lit::Raw(_) => Type::RAW,
            Lit::Uuid(_) => Type::UUID,
            Lit::Time(_) => Type::TIME,
            Lit::Span(_) => Type::SPAN,
            Lit::List(l) => Type::cont(Kind::LIST, l.elem.clone()),
            Lit::Dict(d) => Type::cont(Kind::DICT, d.elem.clone()),
            Lit::Rec(r) => r.typ.clone(),
            Lit::Some(l) => l.typ().opt(),
        }
    }

    /// The zero literal of the given type.
    pub fn zero(t: &Type) -> Lit {
        if t.is_opt() {
            return Lit::Nil;
        }
        match t.kind.elem() {
            Kind::BOOL => Lit::Bool(false),
            Kind::NUM => Lit::Num(0.0),
            Kind::INT | Kind::FLAG => Lit::Int(0),
            Kind::REAL => Lit::Real(0.0),
            Kind::CHAR => Lit::Char(SmolStr::default()),
            Kind::STR | Kind::ENUM => Lit::Str(SmolStr::default()),
            Kind::RAW => Lit::Raw(Vec::new()),
            Kind::UUID => Lit::Uuid([0; 16]),
            Kind::TIME => Lit::Time(0),
            Kind::SPAN => Lit::Span(0),
            Kind::IDXR | Kind::LIST => Lit::List(List::new(t.elem(), Vec::new())),
            Kind::KEYR | Kind::DICT => Lit::Dict(Dict::new(t.elem(), Vec::new())),
            Kind::REC => Lit::Rec(Rec {
                typ: t.clone(),
                data: t
                    .params()
                    .iter()
                    .map(|p| Keyed::new(p.key(), Lit::zero(&p.typ)))
                    .collect(),
            }),
            _ => Lit::Nil,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Lit::Nil => true,
            Lit::Bool(b) => !b,
            Lit::Num(n) => *n == 0.0,
            Lit::Int(n) => *n == 0,
            Lit::Real(n) => *n == 0.0,
            Lit::Char(s) => s.is_empty(),
            Lit::Str(s) => s.is_empty(),
            Lit::Raw(b) => b.is_empty(),
            Lit::Uuid(u) => u.iter().all(|b| *b == 0),
            Lit::Time(n) | Lit::Span(n) => *n == 0,
            Lit::List(l) => l.data.is_empty(),
            Lit::Dict(d) => d.data.is_empty(),
            Lit::Rec(r) => r.data.iter().all(|k| k.val.is_zero()),
            Lit::Some(_) => false,
        }
    }

    /// Unwraps a present optional, otherwise returns the literal as is.
    pub fn deopt(&self) -> &Lit {
        match self {
            Lit::Some(l) => l,
            l => l,
        }
    }

    /// The numeric value for number-like literals.
    pub fn num(&self) -> Option<f64> {
        match self.deopt() {
            Lit::Bool(b) => Some(*b as i64 as f64),
            Lit::Num(n) | Lit::Real(n) => Some(*n),
            Lit::Int(n) => Some(*n as f64),
            Lit::Time(n) | Lit::Span(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// The text value for character-like literals.
    pub fn text(&self) -> Option<SmolStr> {
        match self.deopt() {
            Lit::Char(s) | Lit::Str(s) => Some(s.clone()),
            Lit::Raw(b) => Some(SmolStr::new(String::from_utf8_lossy(b))),
            _ => None,
        }
    }

    /// The number of contained elements, or characters for text.
    pub fn len(&self) -> Option<usize> {
        match self.deopt() {
            Lit::Char(s) | Lit::Str(s) => Some(s.chars().count()),
            Lit::Raw(b) => Some(b.len()),
            Lit::List(l) => Some(l.data.len()),
            Lit::Dict(d) => Some(d.data.len()),
            Lit::Rec(r) => Some(r.data.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|n| n == 0)
    }

    /// The element at an index; negative indices count from the end.
    pub fn idx(&self, idx: i64) -> Result<&Lit, LitError> {
        let data = match self.deopt() {
            Lit::List(l) => &l.data,
            Lit::Rec(r) => {
                return rec_idx(&r.data, idx);
            }
            l => return Err(LitError::NotIdxr(l.typ().to_string())),
        };
        lookup_idx(data, idx)
    }

    /// The element stored under a key.
    pub fn key(&self, key: &str) -> Result<&Lit, LitError> {
        let data = match self.deopt() {
            Lit::Dict(d) => &d.data,
            Lit::Rec(r) => &r.data,
            l => return Err(LitError::NotKeyr(l.typ().to_string())),
        };
        data.iter()
            .find(|k| k.key == key)
            .map(|k| &k.val)
            .ok_or_else(|| LitError::NoKey(key.into()))
    }
}

fn rec_idx(data: &[Keyed], idx: i64) -> Result<&Lit, LitError> {
    let n = data.len() as i64;
    let i = if idx < 0 { n + idx } else { idx };
    if i < 0 || i >= n {
        return Err(LitError::IdxBounds(idx));
    }
    Ok(&data[i as usize].val)
}

fn lookup_idx(data: &[Lit], idx: i64) -> Result<&Lit, LitError> {
    let n = data.len() as i64;
    let i = if idx < 0 { n + idx } else { idx };
    if i < 0 || i >= n {
        return Err(LitError::IdxBounds(idx));
    }
    Ok(&data[i as usize])
}

// ── Printing ─────────────────────────────────────────────────────

fn write_num(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Nil => f.write_str("null"),
            Lit::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Lit::Num(n) | Lit::Real(n) => write_num(f, *n),
            Lit::Int(n) => write!(f, "{n}"),
            Lit::Char(s) | Lit::Str(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Lit::Raw(b) => write!(f, "'{}'", String::from_utf8_lossy(b)),
            Lit::Uuid(u) => {
                for b in u {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Lit::Time(n) => write!(f, "{n}"),
            Lit::Span(n) => write!(f, "{n}"),
            Lit::List(l) => {
                f.write_str("[")?;
                for (i, el) in l.data.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{el}")?;
                }
                f.write_str("]")
            }
            Lit::Dict(d) => write_keyed(f, &d.data),
            Lit::Rec(r) => write_keyed(f, &r.data),
            Lit::Some(l) => write!(f, "{l}"),
        }
    }
}

fn write_keyed(f: &mut fmt::Formatter<'_>, data: &[Keyed]) -> fmt::Result {
    f.write_str("{")?;
    for (i, k) in data.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}:{}", k.key, k.val)?;
    }
    f.write_str("}")
}
