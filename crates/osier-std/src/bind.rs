use crate::{call_el, def_spec, keep, lit_arg};
use osier_exp::layout::{eval_func_args, resl_func_args};
use osier_exp::{impl_form, Call, Def, El, Error, Named, Prog, Scope, Spec, SpecImpl, Val};
use osier_lit::{convert, List, Lit};
use osier_types::{Kind, Param, Type};
use smol_str::SmolStr;
use std::sync::Arc;

pub(crate) fn register(s: &Scope) {
    def_spec(s, impl_form("<form let rest; @>", let_resl, let_eval));
    def_spec(s, impl_form("<form with a:any rest; @>", with_resl, with_eval));
    def_spec(s, impl_form("<form fn rest; @>", fn_resl, fn_eval));
}

// ── let ──────────────────────────────────────────────────────────

// (let k1:v1 k2:v2 ... body) — each binding resolves in the growing child
// scope, so later bindings see earlier ones.

fn let_split(els: &[El]) -> (Vec<Named>, Vec<El>) {
    let mut binds = Vec::new();
    let mut body = Vec::new();
    for el in els {
        match el {
            El::Named(n) if !n.name.is_empty() => binds.push(n.clone()),
            el => body.push(el.clone()),
        }
    }
    (binds, body)
}

fn let_scope(
    p: &mut Prog,
    env: &Scope,
    binds: Vec<Named>,
) -> Result<(Scope, Vec<El>, bool), Error> {
    let child = env.child();
    let mut out = Vec::with_capacity(binds.len());
    let mut unres = false;
    for mut n in binds {
        let inner = match n.el.take() {
            Some(b) => *b,
            None => return Err(Error::layout(format!("missing value for binding {}", n.name))),
        };
        let el = match p.resolve(&child, inner, &Type::VOID) {
            Ok(el) => el,
            Err(Error::Unres(b)) => {
                unres = true;
                *b
            }
            Err(e) => return Err(e),
        };
        let key = n.key();
        let def = match &el {
            El::Atom(a) => Def::val(a.val.clone()),
            el => Def::typed(p.ctx.apply(&el.res_typ())),
        };
        child.def(key, def);
        n.el = Some(Box::new(el));
        out.push(El::Named(n));
    }
    Ok((child, out, unres))
}

fn let_resl(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let els = std::mem::take(&mut c.groups[0]);
    let (binds, body) = let_split(&els);
    let (child, mut out, mut unres) = let_scope(p, env, binds)?;
    for el in body {
        match p.resolve(&child, el, hint) {
            Ok(r) => {
                p.ctx.unify(&c.res(), &r.res_typ()).ok();
                out.push(r);
            }
            Err(Error::Unres(b)) => {
                unres = true;
                out.push(*b);
            }
            Err(e) => return Err(e),
        }
    }
    c.groups[0] = out;
    c.sig = p.ctx.apply(&c.sig);
    if unres {
        return Err(keep(c));
    }
    Ok(call_el(c))
}

fn let_eval(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let els = std::mem::take(&mut c.groups[0]);
    let (binds, body) = let_split(&els);
    let (child, out, unres) = let_scope(p, env, binds)?;
    if unres {
        c.groups[0] = out;
        return Err(keep(c));
    }
    let mut last = El::void();
    for el in body {
        match p.resolve(&child, el, hint) {
            Ok(r) => last = r,
            Err(Error::Unres(b)) => {
                let mut rebuilt = out.clone();
                rebuilt.push(*b);
                c.groups[0] = rebuilt;
                return Err(keep(c));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(last)
}

// ── with ─────────────────────────────────────────────────────────

// (with e body) — e's value becomes the `.` of the body's scope.

fn with_resl(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let subj = c
        .arg(0)
        .cloned()
        .ok_or_else(|| Error::layout("missing subject for with"))?;
    let subj = match p.resolve(env, subj, &Type::VOID) {
        Ok(el) => el,
        Err(Error::Unres(b)) => {
            c.groups[0] = vec![*b];
            return Err(keep(c));
        }
        Err(e) => return Err(e),
    };
    let child = env.child();
    match &subj {
        El::Atom(a) => child.def(".", Def::val(a.val.clone())),
        el => child.def(".", Def::typed(p.ctx.apply(&el.res_typ()))),
    }
    c.groups[0] = vec![subj];
    let body = std::mem::take(&mut c.groups[1]);
    let (out, unres) = p.resolve_all(&child, body, hint)?;
    if let Some(last) = out.last() {
        p.ctx.unify(&c.res(), &last.res_typ()).ok();
    }
    c.groups[1] = out;
    c.sig = p.ctx.apply(&c.sig);
    if unres {
        return Err(keep(c));
    }
    Ok(call_el(c))
}

fn with_eval(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let subj = c
        .arg(0)
        .cloned()
        .ok_or_else(|| Error::layout("missing subject for with"))?;
    let subj = match p.resolve(env, subj, &Type::VOID) {
        Ok(el) => el,
        Err(Error::Unres(b)) => {
            c.groups[0] = vec![*b];
            return Err(keep(c));
        }
        Err(e) => return Err(e),
    };
    let val = match &subj {
        El::Atom(a) => a.val.clone(),
        el => return Err(Error::other(format!("with subject did not evaluate: {el}"))),
    };
    let child = env.child();
    child.def(".", Def::val(val));
    c.groups[0] = vec![subj];
    let body = std::mem::take(&mut c.groups[1]);
    let mut last = El::void();
    for el in body.clone() {
        match p.resolve(&child, el, hint) {
            Ok(r) => last = r,
            Err(Error::Unres(b)) => {
                c.groups[1] = body;
                let _ = b;
                return Err(keep(c));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(last)
}

// ── fn ───────────────────────────────────────────────────────────

// (fn [p1:t1 ... res:tr]? body) — leading tags declare parameters with the
// last tag naming the result. Without tags, the positional references `_`
// and `.N` in the body imply the parameter count, and the signature is
// generalized over the free type variables left after body resolution.

struct FnParts {
    params: Vec<Param>,
    res: Type,
    body: Vec<El>,
}

fn fn_split(p: &mut Prog, els: &[El]) -> Result<FnParts, Error> {
    let mut tags: Vec<(SmolStr, Type)> = Vec::new();
    let mut body = Vec::new();
    for el in els {
        match el {
            El::Named(n) if !n.name.is_empty() => {
                let t = n
                    .arg()
                    .and_then(El::as_typ)
                    .cloned()
                    .ok_or_else(|| Error::layout(format!("expected a type for {}", n.name)))?;
                tags.push((n.key(), t));
            }
            el => body.push(el.clone()),
        }
    }
    if tags.is_empty() {
        let arity = implied_arity(&body);
        let params = (0..arity)
            .map(|_| Param::anon(p.ctx.fresh()))
            .collect();
        return Ok(FnParts {
            params,
            res: p.ctx.fresh(),
            body,
        });
    }
    let res = tags.pop().map(|(_, t)| t).unwrap();
    let params = tags
        .into_iter()
        .map(|(name, t)| Param::new(name, t))
        .collect();
    Ok(FnParts { params, res, body })
}

/// Counts the positional references used by a body: `_` is the first
/// parameter, `.N` the N-th. Nested fn expressions keep their own scope.
fn implied_arity(els: &[El]) -> usize {
    fn walk(el: &El, max: &mut usize) {
        match el {
            El::Sym(s) => {
                if s.name == "_" {
                    *max = (*max).max(1);
                } else if let Some(rest) = s.name.strip_prefix('.') {
                    if let Ok(n) = rest.parse::<usize>() {
                        *max = (*max).max(n + 1);
                    }
                }
            }
            El::Dyn(d) => {
                if let Some(El::Sym(head)) = d.els.first() {
                    if head.name == "fn" {
                        return;
                    }
                }
                for el in &d.els {
                    walk(el, max);
                }
            }
            El::Named(n) => {
                if let Some(inner) = &n.el {
                    walk(inner, max);
                }
            }
            El::Call(c) => {
                for g in &c.groups {
                    for el in g {
                        walk(el, max);
                    }
                }
            }
            El::Atom(_) => {}
        }
    }
    let mut max = 0;
    for el in els {
        walk(el, &mut max);
    }
    max
}

/// The scope a function body resolves and evaluates in: named parameters,
/// the positional alias `_`, and `.` bound to the argument tuple.
fn fn_param_scope(env: &Scope, params: &[Param], args: Option<&[Lit]>) -> Scope {
    let child = env.child();
    match args {
        None => {
            let dot = Type::rec("", params.to_vec());
            child.def(".", Def::typed(dot));
            for param in params {
                if !param.name.is_empty() {
                    child.def(param.key(), Def::typed(param.typ.clone()));
                }
            }
            if let Some(first) = params.first() {
                child.def("_", Def::typed(first.typ.clone()));
            }
        }
        Some(args) => {
            child.def(
                ".",
                Def::lit(Lit::List(List::new(Type::ANY, args.to_vec()))),
            );
            for (i, param) in params.iter().enumerate() {
                if !param.name.is_empty() {
                    if let Some(l) = args.get(i) {
                        child.def(param.key(), Def::lit(l.clone()));
                    }
                }
            }
            if let Some(first) = args.first() {
                child.def("_", Def::lit(first.clone()));
            }
        }
    }
    child
}

fn fn_resl(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let els = c.args(0).to_vec();
    let parts = fn_split(p, &els)?;
    let scope = fn_param_scope(env, &parts.params, None);
    let mut out: Vec<El> = els
        .iter()
        .filter(|el| matches!(el, El::Named(n) if !n.name.is_empty()))
        .cloned()
        .collect();
    let mut unres = false;
    let mut last_typ = Type::VOID;
    for el in parts.body {
        match p.resolve(&scope, el, &parts.res) {
            Ok(r) => {
                last_typ = r.res_typ();
                out.push(r);
            }
            Err(Error::Unres(b)) => {
                unres = true;
                last_typ = b.res_typ();
                out.push(*b);
            }
            Err(e) => return Err(e),
        }
    }
    if last_typ.kind != Kind::VOID {
        p.ctx.unify(&parts.res, &last_typ).ok();
    }
    let mut sig_params: Vec<Param> = parts
        .params
        .iter()
        .map(|param| Param::new(param.name.clone(), p.ctx.apply(&param.typ)))
        .collect();
    sig_params.push(Param::anon(p.ctx.apply(&parts.res)));
    let sig = Type::func("", sig_params);
    p.ctx.unify(&c.res(), &sig)?;
    if hint.kind != Kind::VOID {
        p.ctx.unify(&c.res(), hint).ok();
    }
    c.sig = p.ctx.apply(&c.sig);
    c.groups[0] = out;
    if unres {
        return Err(keep(c));
    }
    Ok(call_el(c))
}

fn fn_eval(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    // the signature was inferred during resolution; rebuild it if this
    // call is evaluated standalone
    let mut sig = p.ctx.apply(&c.res());
    if !sig.kind.is_spec() || !sig.has_params() {
        match fn_resl(p, env, c, hint)? {
            El::Call(boxed) => {
                c = *boxed;
                sig = p.ctx.apply(&c.res());
            }
            other => return Ok(other),
        }
    }
    let els = c.args(0).to_vec();
    let body: Vec<El> = els
        .iter()
        .filter(|el| !matches!(el, El::Named(n) if !n.name.is_empty()))
        .cloned()
        .collect();
    let repr = call_el(c).to_string();
    let spec = Spec::new(
        sig,
        Box::new(FnImpl {
            body,
            env: env.clone(),
            repr,
        }),
    );
    Ok(El::Atom(osier_exp::Atom::spec(spec)))
}

/// A user function: the resolved body and the captured definition scope.
struct FnImpl {
    body: Vec<El>,
    env: Scope,
    repr: String,
}

impl SpecImpl for FnImpl {
    fn resl(&self, p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
        let unres = resl_func_args(p, env, &mut c)?;
        p.hint_res(&mut c, hint)?;
        if unres {
            return Err(keep(c));
        }
        Ok(call_el(c))
    }

    fn eval(&self, p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
        let unres = eval_func_args(p, env, &mut c)?;
        p.hint_res(&mut c, hint)?;
        if unres {
            return Err(keep(c));
        }
        let params = c.sig.args().to_vec();
        let mut args = Vec::with_capacity(params.len());
        for i in 0..params.len() {
            match c.arg(i) {
                Some(el) => args.push(lit_arg(el)?.clone()),
                None => args.push(Lit::Nil),
            }
        }
        let scope = fn_param_scope(&self.env, &params, Some(&args));
        let rt = p.ctx.apply(&c.res());
        let mut last = El::void();
        for el in self.body.clone() {
            match p.resolve(&scope, el, &Type::VOID) {
                Ok(r) => last = r,
                Err(Error::Unres(b)) => {
                    let _ = b;
                    return Err(keep(c));
                }
                Err(e) => return Err(e),
            }
        }
        let lit = lit_arg(&last)?.clone();
        if !rt.is_var() && rt.kind != Kind::VOID && rt.kind != Kind::ANY {
            return Ok(El::lit(convert(lit, &rt)?));
        }
        Ok(El::lit(lit))
    }

    fn repr(&self, _sig: &Type) -> String {
        self.repr.clone()
    }
}

// ── Deferred function references ─────────────────────────────────

/// A call target whose spec value is not known yet: a symbol or call with a
/// function type. Resolution types the arguments against the signature;
/// evaluation resolves the head to its spec and delegates.
pub(crate) fn fn_ref(head: El, sig: Type) -> Arc<Spec> {
    Arc::new(Spec {
        sig,
        imp: Box::new(FnRef { head }),
    })
}

struct FnRef {
    head: El,
}

impl SpecImpl for FnRef {
    fn resl(&self, p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
        let unres = resl_func_args(p, env, &mut c)?;
        p.hint_res(&mut c, hint)?;
        if unres {
            return Err(keep(c));
        }
        Ok(call_el(c))
    }

    fn eval(&self, p: &mut Prog, env: &Scope, c: Call, hint: &Type) -> Result<El, Error> {
        let head = match p.resolve(env, self.head.clone(), &Type::VOID) {
            Ok(h) => h,
            Err(Error::Unres(_)) => return Err(keep(c)),
            Err(e) => return Err(e),
        };
        let spec = match &head {
            El::Atom(a) => match &a.val {
                Val::Spec(s) => s.clone(),
                _ => return Err(Error::other(format!("{head} is not callable"))),
            },
            _ => return Err(Error::other(format!("{head} is not callable"))),
        };
        let call = Call {
            spec: spec.clone(),
            sig: c.sig.clone(),
            groups: c.groups.clone(),
            src: c.src,
        };
        spec.imp.eval(p, env, call, hint)
    }

    fn repr(&self, _sig: &Type) -> String {
        self.head.to_string()
    }
}
