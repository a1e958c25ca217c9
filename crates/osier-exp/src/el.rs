use crate::spec::Spec;
use osier_lexer::Span;
use osier_lit::Lit;
use osier_types::{Kind, Type};
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

/// The payload of a resolved atom: a literal, a type value, or a spec.
#[derive(Clone, Debug)]
pub enum Val {
    Lit(Lit),
    Typ(Type),
    Spec(Arc<Spec>),
}

impl Val {
    pub fn typ(&self) -> Type {
        match self {
            Val::Lit(l) => l.typ(),
            Val::Typ(_) => Type::TYP,
            Val::Spec(s) => s.sig.clone(),
        }
    }

    pub fn as_lit(&self) -> Option<&Lit> {
        match self {
            Val::Lit(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_typ(&self) -> Option<&Type> {
        match self {
            Val::Typ(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_spec(&self) -> Option<&Arc<Spec>> {
        match self {
            Val::Spec(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Lit(l) => write!(f, "{l}"),
            Val::Typ(t) => write!(f, "{t}"),
            Val::Spec(s) => f.write_str(&s.repr()),
        }
    }
}

/// A resolved literal or type value, with its source position.
#[derive(Clone, Debug)]
pub struct Atom {
    pub val: Val,
    pub src: Span,
}

impl Atom {
    pub fn lit(l: Lit) -> Atom {
        Atom {
            val: Val::Lit(l),
            src: Span::default(),
        }
    }

    pub fn typ(t: Type) -> Atom {
        Atom {
            val: Val::Typ(t),
            src: Span::default(),
        }
    }

    pub fn spec(s: Arc<Spec>) -> Atom {
        Atom {
            val: Val::Spec(s),
            src: Span::default(),
        }
    }
}

/// An identifier referring to a definition; the resolved type is recorded
/// during resolution.
#[derive(Clone, Debug)]
pub struct Sym {
    pub name: SmolStr,
    pub typ: Type,
    pub src: Span,
}

impl Sym {
    pub fn new(name: impl Into<SmolStr>) -> Sym {
        Sym {
            name: name.into(),
            typ: Type::VOID,
            src: Span::default(),
        }
    }
}

/// An element sequence whose head has not been classified yet.
#[derive(Clone, Debug, Default)]
pub struct Dyn {
    pub els: Vec<El>,
    pub src: Span,
}

/// A tag or declaration group. Tag names start with `:` (or are empty for
/// naked groups), declaration names with `+` or `-`.
#[derive(Clone, Debug)]
pub struct Named {
    pub name: SmolStr,
    pub el: Option<Box<El>>,
    pub src: Span,
}

impl Named {
    pub fn new(name: impl Into<SmolStr>, el: Option<El>) -> Named {
        Named {
            name: name.into(),
            el: el.map(Box::new),
            src: Span::default(),
        }
    }

    pub fn is_tag(&self) -> bool {
        self.name.is_empty() || self.name.starts_with(':')
    }

    /// Case-folded name without its marker prefix.
    pub fn key(&self) -> SmolStr {
        let n = self.name.trim_start_matches(&[':', '+', '-'][..]);
        SmolStr::new(n.to_ascii_lowercase())
    }

    /// The grouped arguments: a dyn's elements, a single element, or none.
    pub fn args(&self) -> Vec<El> {
        match &self.el {
            None => Vec::new(),
            Some(b) => match b.as_ref() {
                El::Dyn(d) => d.els.clone(),
                el => vec![el.clone()],
            },
        }
    }

    /// The first grouped argument, if any.
    pub fn arg(&self) -> Option<&El> {
        match &self.el {
            None => None,
            Some(b) => match b.as_ref() {
                El::Dyn(d) => d.els.first(),
                el => Some(el),
            },
        }
    }
}

/// A resolved call: a spec, the argument layout groups built against its
/// signature, and the instantiated signature itself.
#[derive(Clone, Debug)]
pub struct Call {
    pub spec: Arc<Spec>,
    pub sig: Type,
    pub groups: Vec<Vec<El>>,
    pub src: Span,
}

impl Call {
    /// The call's result type: the last signature parameter when known,
    /// otherwise the spec's declared result.
    pub fn res(&self) -> Type {
        let r = self.sig.res();
        if r.kind != Kind::VOID {
            return r;
        }
        self.spec.sig.res()
    }

    pub fn args(&self, idx: usize) -> &[El] {
        self.groups.get(idx).map(|g| g.as_slice()).unwrap_or(&[])
    }

    pub fn arg(&self, idx: usize) -> Option<&El> {
        self.args(idx).first()
    }

    /// All argument elements in group order.
    pub fn all_args(&self) -> Vec<El> {
        self.groups.iter().flatten().cloned().collect()
    }
}

/// A language element.
#[derive(Clone, Debug)]
pub enum El {
    Atom(Atom),
    Sym(Sym),
    Dyn(Dyn),
    Named(Named),
    Call(Box<Call>),
}

impl El {
    pub fn lit(l: Lit) -> El {
        El::Atom(Atom::lit(l))
    }

    pub fn typ(t: Type) -> El {
        El::Atom(Atom::typ(t))
    }

    pub fn void() -> El {
        El::Atom(Atom::typ(Type::VOID))
    }

    /// The element's own type discriminator.
    pub fn el_typ(&self) -> Type {
        match self {
            El::Atom(a) => a.val.typ(),
            El::Sym(_) => Type::SYM,
            El::Dyn(_) => Type::DYN,
            El::Named(n) => {
                if n.is_tag() {
                    Type::TAG
                } else {
                    Type::DECL
                }
            }
            El::Call(_) => Type::CALL,
        }
    }

    /// The resolved result type of this element, as far as it is known.
    pub fn res_typ(&self) -> Type {
        match self {
            El::Atom(a) => a.val.typ(),
            El::Sym(s) => s.typ.clone(),
            El::Call(c) => c.res(),
            El::Dyn(_) => Type::VOID,
            El::Named(n) => match &n.el {
                Some(el) => el.res_typ(),
                None => Type::VOID,
            },
        }
    }

    pub fn as_lit(&self) -> Option<&Lit> {
        match self {
            El::Atom(a) => a.val.as_lit(),
            _ => None,
        }
    }

    pub fn as_typ(&self) -> Option<&Type> {
        match self {
            El::Atom(a) => a.val.as_typ(),
            _ => None,
        }
    }

    pub fn src(&self) -> Span {
        match self {
            El::Atom(a) => a.src,
            El::Sym(s) => s.src,
            El::Dyn(d) => d.src,
            El::Named(n) => n.src,
            El::Call(c) => c.src,
        }
    }
}

// ── Printing ─────────────────────────────────────────────────────

impl fmt::Display for El {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            El::Atom(a) => write!(f, "{}", a.val),
            El::Sym(s) => f.write_str(&s.name),
            El::Dyn(d) => write_expr(f, "", &d.els),
            El::Named(n) => match &n.el {
                None => f.write_str(&n.name),
                Some(b) => {
                    // tags print in their concrete leading form: a:1
                    if let Some(key) = n.name.strip_prefix(':') {
                        match b.as_ref() {
                            El::Dyn(d) if d.els.len() != 1 => {
                                write!(f, "{key}:")?;
                                return write_expr(f, "", &d.els);
                            }
                            El::Dyn(d) => write!(f, "{key}:{}", d.els[0]),
                            el => write!(f, "{key}:{el}"),
                        }
                    } else {
                        match b.as_ref() {
                            El::Dyn(d) => write_expr(f, &n.name, &d.els),
                            el => {
                                if !n.name.is_empty() {
                                    write!(f, "{} ", n.name)?;
                                }
                                write!(f, "{el}")
                            }
                        }
                    }
                }
            },
            El::Call(c) => {
                let name = c.spec.name();
                if name.is_empty() {
                    let repr = c.spec.repr();
                    let args: Vec<El> = c.all_args();
                    return write_expr(f, &repr, &args);
                }
                let args: Vec<El> = c.all_args();
                write_expr(f, name, &args)
            }
        }
    }
}

fn write_expr(f: &mut fmt::Formatter<'_>, name: &str, els: &[El]) -> fmt::Result {
    f.write_str("(")?;
    if !name.is_empty() {
        f.write_str(name)?;
        if !els.is_empty() {
            f.write_str(" ")?;
        }
    }
    for (i, el) in els.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{el}")?;
    }
    f.write_str(")")
}

// ── Traversal ────────────────────────────────────────────────────

/// Traversal control: continue into children or skip them. Skipping still
/// runs the matching leave hook.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Skip,
}

pub type VisitRes = Result<Walk, crate::error::Error>;

/// Visitor over the element tree: visit hooks for leaves, enter/leave
/// pairs for interior nodes.
pub trait Visitor {
    fn visit_lit(&mut self, _: &Atom) -> VisitRes {
        Ok(Walk::Continue)
    }
    fn visit_typ(&mut self, _: &Atom) -> VisitRes {
        Ok(Walk::Continue)
    }
    fn visit_sym(&mut self, _: &Sym) -> VisitRes {
        Ok(Walk::Continue)
    }
    fn enter_named(&mut self, _: &Named) -> VisitRes {
        Ok(Walk::Continue)
    }
    fn leave_named(&mut self, _: &Named) -> VisitRes {
        Ok(Walk::Continue)
    }
    fn enter_dyn(&mut self, _: &Dyn) -> VisitRes {
        Ok(Walk::Continue)
    }
    fn leave_dyn(&mut self, _: &Dyn) -> VisitRes {
        Ok(Walk::Continue)
    }
    fn enter_call(&mut self, _: &Call) -> VisitRes {
        Ok(Walk::Continue)
    }
    fn leave_call(&mut self, _: &Call) -> VisitRes {
        Ok(Walk::Continue)
    }
}

/// Walks the element depth-first, in document order.
pub fn traverse(v: &mut dyn Visitor, el: &El) -> Result<(), crate::error::Error> {
    match el {
        El::Atom(a) => {
            let res = if matches!(a.val, Val::Typ(_)) {
                v.visit_typ(a)?
            } else {
                v.visit_lit(a)?
            };
            let _ = res;
            Ok(())
        }
        El::Sym(s) => {
            v.visit_sym(s)?;
            Ok(())
        }
        El::Named(n) => {
            if v.enter_named(n)? == Walk::Continue {
                if let Some(inner) = &n.el {
                    traverse(v, inner)?;
                }
            }
            v.leave_named(n)?;
            Ok(())
        }
        El::Dyn(d) => {
            if v.enter_dyn(d)? == Walk::Continue {
                for el in &d.els {
                    traverse(v, el)?;
                }
            }
            v.leave_dyn(d)?;
            Ok(())
        }
        El::Call(c) => {
            if v.enter_call(c)? == Walk::Continue {
                for g in &c.groups {
                    for el in g {
                        traverse(v, el)?;
                    }
                }
            }
            v.leave_call(c)?;
            Ok(())
        }
    }
}
