use crate::el::{Atom, Call, El, Sym, Val};
use crate::env::{find_def, select_typ, Scope};
use crate::error::Error;
use crate::layout::layout_args;
use crate::spec::Spec;
use osier_lexer::Span;
use osier_lit::select;
use osier_types::{Ctx, Kind, Type};
use smol_str::SmolStr;
use std::sync::Arc;

/// Evaluation mode.
///
/// Resolution tolerates unresolved subtrees and records them; evaluation
/// treats them as fatal; partial evaluation reduces what it can and returns
/// partial calls for the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Resl,
    Eval,
    Part,
}

/// A resolution program: the type context, the current mode and the set of
/// elements deferred during the running pass.
pub struct Prog {
    pub ctx: Ctx,
    pub unres: Vec<SmolStr>,
    pub mode: Mode,
}

impl Default for Prog {
    fn default() -> Self {
        Prog::new()
    }
}

impl Prog {
    pub fn new() -> Prog {
        Prog {
            ctx: Ctx::new(),
            unres: Vec::new(),
            mode: Mode::Resl,
        }
    }

    /// Allocates a fresh type variable, typically used as a result hint.
    pub fn fresh(&mut self) -> Type {
        self.ctx.fresh()
    }

    // ── Drivers ──────────────────────────────────────────────────

    /// Resolves iteratively until the unresolved set is empty or stops
    /// shrinking. Unresolved elements are a normal outcome here.
    pub fn resl(&mut self, env: &Scope, el: El, hint: &Type) -> Result<El, Error> {
        self.mode = Mode::Resl;
        let mut el = el;
        let mut last = usize::MAX;
        loop {
            self.unres.clear();
            el = match self.resolve(env, el, hint) {
                Ok(r) => r,
                Err(e) if e.is_unres() => e.into_el()?,
                Err(e) => return Err(e),
            };
            let n = self.unres.len();
            if n == 0 {
                return Ok(el);
            }
            if n >= last {
                tracing::debug!(unresolved = n, "resolution stuck, tree is canonical");
                return Ok(el);
            }
            tracing::debug!(unresolved = n, "another resolution pass");
            last = n;
        }
    }

    /// Evaluates fully; any unresolved symbol is fatal.
    pub fn eval(&mut self, env: &Scope, el: El, hint: &Type) -> Result<El, Error> {
        self.mode = Mode::Eval;
        self.unres.clear();
        self.resolve(env, el, hint)
    }

    /// Evaluates partially: reduces what it can, keeps partial calls for
    /// unresolved operands.
    pub fn part(&mut self, env: &Scope, el: El, hint: &Type) -> Result<El, Error> {
        self.mode = Mode::Part;
        self.unres.clear();
        match self.resolve(env, el, hint) {
            Err(e) if e.is_unres() => e.into_el(),
            r => r,
        }
    }

    // ── Single-pass resolution ───────────────────────────────────

    /// Resolves one element against the environment, in the current mode.
    /// Specs drive resolution of their own arguments.
    pub fn resolve(&mut self, env: &Scope, el: El, hint: &Type) -> Result<El, Error> {
        match el {
            El::Atom(a) => self.resolve_atom(env, a, hint),
            El::Sym(s) => self.resolve_sym(env, s, hint),
            El::Named(mut n) => {
                if let Some(inner) = n.el.take() {
                    match self.resolve(env, *inner, &Type::VOID) {
                        Ok(r) => n.el = Some(Box::new(r)),
                        Err(Error::Unres(b)) => {
                            n.el = Some(b);
                            return Err(Error::unres(El::Named(n)));
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(El::Named(n))
            }
            El::Dyn(d) => {
                if d.els.is_empty() {
                    return Ok(El::void());
                }
                let found = find_def(env, "dyn")?
                    .ok_or_else(|| Error::other("no dyn form in scope"))?;
                let spec = found
                    .def
                    .val
                    .as_ref()
                    .and_then(Val::as_spec)
                    .cloned()
                    .ok_or_else(|| Error::other("dyn does not name a form"))?;
                let call = self.new_call(spec, d.els, d.src)?;
                self.resolve(env, El::Call(Box::new(call)), hint)
            }
            El::Call(c) => {
                let spec = c.spec.clone();
                match self.mode {
                    Mode::Resl => spec.imp.resl(self, env, *c, hint),
                    Mode::Eval | Mode::Part => spec.imp.eval(self, env, *c, hint),
                }
            }
        }
    }

    fn resolve_atom(&mut self, env: &Scope, mut a: Atom, hint: &Type) -> Result<El, Error> {
        if let Val::Typ(t) = &a.val {
            let last = t.last();
            if last.kind.elem() == Kind::REF {
                match self.resolve_typ_ref(env, t, &last) {
                    Ok(rt) => a.val = Val::Typ(rt),
                    Err(Error::Unres(_)) => {
                        return Err(Error::unres(El::Atom(a)));
                    }
                    Err(e) => return Err(e),
                }
            } else if last.kind.elem().is_schema() && last.name().is_empty() && !last.has_params()
            {
                return Err(Error::Typ(osier_types::TypeError::Unnamed(
                    last.kind.elem().name(),
                )));
            }
        }
        if hint.kind != Kind::VOID {
            let t = a.val.typ();
            self.ctx.unify(&t, hint)?;
        }
        Ok(El::Atom(a))
    }

    /// Resolves a referenced type through the environment, keeping the
    /// surrounding container stack intact.
    fn resolve_typ_ref(&mut self, env: &Scope, t: &Type, last: &Type) -> Result<Type, Error> {
        let name = last.name().to_string();
        if name.is_empty() {
            return Err(Error::Typ(osier_types::TypeError::Unnamed("reference")));
        }
        let found = match find_def(env, &name)? {
            Some(f) => f,
            None => {
                self.unres.push(SmolStr::new(&name));
                return Err(Error::unres(El::typ(t.clone())));
            }
        };
        let mut rt = match &found.def.val {
            Some(Val::Typ(t)) => t.clone(),
            _ => found.def.typ.clone(),
        };
        if !found.path.is_empty() {
            rt = select_typ(&rt, &found.path)
                .ok_or_else(|| Error::other(format!("no type at path {}", found.path)))?;
        }
        if rt.kind == Kind::VOID {
            self.unres.push(SmolStr::new(&name));
            return Err(Error::unres(El::typ(t.clone())));
        }
        Ok(replace_ref(t, rt))
    }

    fn resolve_sym(&mut self, env: &Scope, mut s: Sym, hint: &Type) -> Result<El, Error> {
        let found = match find_def(env, &s.name)? {
            Some(f) => f,
            None => {
                self.unres.push(s.name.clone());
                return Err(Error::unres(El::Sym(s)));
            }
        };
        // type and spec values are static; they materialize right away
        match &found.def.val {
            Some(Val::Typ(t)) => {
                let mut tv = t.clone();
                if !found.path.is_empty() {
                    tv = select_typ(&tv, &found.path)
                        .ok_or_else(|| Error::other(format!("no type at path {}", found.path)))?;
                }
                return Ok(El::Atom(Atom {
                    val: Val::Typ(tv),
                    src: s.src,
                }));
            }
            Some(val @ Val::Spec(_)) if found.path.is_empty() => {
                return Ok(El::Atom(Atom {
                    val: val.clone(),
                    src: s.src,
                }));
            }
            _ => {}
        }
        let mut typ = found.def.typ.clone();
        if !found.path.is_empty() {
            // a known literal gives the most precise selection type
            let selected = match &found.def.val {
                Some(Val::Lit(l)) => select(l, &found.path).ok().map(|sl| sl.typ()),
                _ => select_typ(&self.ctx.apply(&typ), &found.path),
            };
            typ = match selected {
                Some(t) => t,
                None => {
                    self.unres.push(s.name.clone());
                    return Err(Error::unres(El::Sym(s)));
                }
            };
        }
        if hint.kind != Kind::VOID {
            self.ctx.unify(&typ, hint)?;
        }
        s.typ = self.ctx.apply(&typ);
        match self.mode {
            Mode::Resl => Ok(El::Sym(s)),
            Mode::Eval | Mode::Part => match &found.def.val {
                Some(Val::Lit(l)) => {
                    let lit = if found.path.is_empty() {
                        l.clone()
                    } else {
                        select(l, &found.path)?
                    };
                    Ok(El::Atom(Atom {
                        val: Val::Lit(lit),
                        src: s.src,
                    }))
                }
                Some(val) => Ok(El::Atom(Atom {
                    val: val.clone(),
                    src: s.src,
                })),
                None => {
                    self.unres.push(s.name.clone());
                    Err(Error::unres(El::Sym(s)))
                }
            },
        }
    }

    /// Resolves each element in place; unresolved elements stay put and are
    /// reported through the returned flag.
    pub fn resolve_all(
        &mut self,
        env: &Scope,
        els: Vec<El>,
        hint: &Type,
    ) -> Result<(Vec<El>, bool), Error> {
        let mut out = Vec::with_capacity(els.len());
        let mut unres = false;
        for el in els {
            match self.resolve(env, el, hint) {
                Ok(r) => out.push(r),
                Err(Error::Unres(b)) => {
                    unres = true;
                    out.push(*b);
                }
                Err(e) => return Err(e),
            }
        }
        Ok((out, unres))
    }

    /// Builds a call: lays out the arguments against the spec's signature
    /// and instantiates the signature into this program's type context.
    /// Forms lay out by magic parameter names, functions match named
    /// parameters.
    pub fn new_call(&mut self, spec: Arc<Spec>, args: Vec<El>, src: Span) -> Result<Call, Error> {
        let groups = if spec.is_form() {
            layout_args(spec.args(), args)?
        } else {
            crate::layout::func_layout(&spec.sig, args)?
        };
        let sig = self.ctx.inst(&spec.sig);
        Ok(Call {
            spec,
            sig,
            groups,
            src,
        })
    }

    /// Unifies the call's result with a hint and re-applies the signature.
    pub fn hint_res(&mut self, c: &mut Call, hint: &Type) -> Result<(), Error> {
        if hint.kind != Kind::VOID {
            self.ctx.unify(&c.res(), hint)?;
        }
        c.sig = self.ctx.apply(&c.sig);
        Ok(())
    }

    // ── Finalization ─────────────────────────────────────────────

    /// Realizes every type in the tree against the context, so the result
    /// is independent of this program.
    pub fn realize(&mut self, el: El) -> Result<El, Error> {
        match el {
            El::Atom(mut a) => {
                if let Val::Typ(t) = &a.val {
                    if t.is_var() || t.has_params() {
                        let rt = self.ctx.realize(t)?;
                        a.val = Val::Typ(rt);
                    }
                }
                Ok(El::Atom(a))
            }
            El::Sym(mut s) => {
                if s.typ.kind != Kind::VOID {
                    s.typ = self.ctx.realize(&s.typ)?;
                }
                Ok(El::Sym(s))
            }
            El::Named(mut n) => {
                if let Some(inner) = n.el.take() {
                    n.el = Some(Box::new(self.realize(*inner)?));
                }
                Ok(El::Named(n))
            }
            El::Dyn(mut d) => {
                let els = std::mem::take(&mut d.els);
                d.els = els
                    .into_iter()
                    .map(|e| self.realize(e))
                    .collect::<Result<_, _>>()?;
                Ok(El::Dyn(d))
            }
            El::Call(mut c) => {
                c.sig = self.ctx.realize(&c.sig)?;
                let groups = std::mem::take(&mut c.groups);
                c.groups = groups
                    .into_iter()
                    .map(|g| g.into_iter().map(|e| self.realize(e)).collect())
                    .collect::<Result<_, _>>()?;
                Ok(El::Call(c))
            }
        }
    }

    /// The applied result type of an element under this program's context.
    pub fn res_typ(&self, el: &El) -> Type {
        self.ctx.apply(&el.res_typ())
    }
}

/// Replaces the innermost referenced type of a container stack.
fn replace_ref(t: &Type, rt: Type) -> Type {
    let k = t.kind.elem();
    if k == Kind::REF {
        if t.is_opt() {
            return rt.opt();
        }
        return rt;
    }
    if k.is_cont() {
        let inner = replace_ref(&t.elem(), rt);
        let mut n = Type::cont(k, inner);
        if t.is_opt() {
            n = n.opt();
        }
        return n;
    }
    t.clone()
}
