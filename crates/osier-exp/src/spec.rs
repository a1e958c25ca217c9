use crate::el::{Call, El};
use crate::env::Scope;
use crate::error::Error;
use crate::prog::Prog;
use osier_types::{Kind, Param, Type};
use std::fmt;
use std::sync::Arc;

/// A named operation: a signature and a resolve/eval implementation pair.
///
/// Forms control their own argument layout through magic parameter names;
/// functions receive evaluated literal arguments matched by position or tag.
pub struct Spec {
    pub sig: Type,
    pub imp: Box<dyn SpecImpl>,
}

/// The two operations every spec implementation provides. `resl` performs
/// static analysis and partial evaluation; `eval` produces a literal (or a
/// partial call in partial mode).
pub trait SpecImpl {
    fn resl(&self, p: &mut Prog, env: &Scope, c: Call, hint: &Type) -> Result<El, Error>;
    fn eval(&self, p: &mut Prog, env: &Scope, c: Call, hint: &Type) -> Result<El, Error>;

    /// Canonical rendition used when the spec appears in element output.
    fn repr(&self, sig: &Type) -> String {
        sig.to_string()
    }
}

impl Spec {
    pub fn new(sig: Type, imp: Box<dyn SpecImpl>) -> Arc<Spec> {
        Arc::new(Spec { sig, imp })
    }

    /// Parses a signature string like `<form 'if' plain; @>` and checks
    /// that it names a form or function.
    pub fn parse_sig(s: &str) -> Result<Type, osier_types::TypeError> {
        let t = Type::parse(s)?;
        if !t.kind.is_spec() {
            return Err(osier_types::TypeError::Parse {
                msg: format!("not a signature: {t}"),
                pos: 0,
            });
        }
        Ok(t)
    }

    pub fn name(&self) -> &str {
        self.sig.name()
    }

    pub fn args(&self) -> &[Param] {
        self.sig.args()
    }

    pub fn res(&self) -> Type {
        self.sig.res()
    }

    pub fn is_form(&self) -> bool {
        self.sig.kind.elem() == Kind::FORM
    }

    /// A spec is variadic when its last declared parameter is an indexer.
    pub fn is_variadic(&self) -> bool {
        is_variadic(self.args())
    }

    pub fn repr(&self) -> String {
        self.imp.repr(&self.sig)
    }
}

pub fn is_variadic(params: &[Param]) -> bool {
    params
        .last()
        .is_some_and(|p| p.typ.kind.elem().is_idxr())
}

impl fmt::Debug for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Spec({})", self.sig)
    }
}

// ── Built-in form plumbing ───────────────────────────────────────

pub type FormFn = fn(&mut Prog, &Scope, Call, &Type) -> Result<El, Error>;

/// A form backed by plain function pointers, used for all built-ins.
pub struct FormImpl {
    pub resl: FormFn,
    pub eval: FormFn,
}

impl SpecImpl for FormImpl {
    fn resl(&self, p: &mut Prog, env: &Scope, c: Call, hint: &Type) -> Result<El, Error> {
        (self.resl)(p, env, c, hint)
    }

    fn eval(&self, p: &mut Prog, env: &Scope, c: Call, hint: &Type) -> Result<El, Error> {
        (self.eval)(p, env, c, hint)
    }
}

/// Builds a form spec from a signature string; panics on bad signatures,
/// which only exist in built-in tables.
pub fn impl_form(sig: &str, resl: FormFn, eval: FormFn) -> Arc<Spec> {
    let t = Type::parse(sig).unwrap_or_else(|e| panic!("bad builtin signature {sig}: {e}"));
    Spec::new(t, Box::new(FormImpl { resl, eval }))
}
