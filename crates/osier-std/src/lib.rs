//! The osier standard library: built-in forms for construction, logic,
//! comparison, arithmetic, containers and binding.

mod arith;
mod bind;
mod comp;
mod cont;
mod dyncon;
mod logic;

#[cfg(test)]
mod tests;

use osier_exp::{find_def, Call, Def, El, Error, Prog, Scope, Spec, Val};
use osier_lit::Lit;
use osier_types::{Kind, Type};
use std::sync::Arc;

thread_local! {
    static STD: Scope = build();
}

/// The standard environment: every built-in form plus the `~`-prefixed
/// base type names. Built once per thread and shared read-only.
pub fn std_scope() -> Scope {
    STD.with(|s| s.clone())
}

const KIND_NAMES: [&str; 21] = [
    "void", "any", "typ", "bool", "num", "int", "real", "char", "str", "raw", "uuid", "time",
    "span", "list", "dict", "idxr", "keyr", "rec", "flag", "enum", "func",
];

fn build() -> Scope {
    let s = Scope::with_prefixes(None, "~");
    for name in KIND_NAMES {
        if let Some(kind) = Kind::by_name(name) {
            s.def(format!("~{name}"), Def::typ_val(Type::new(kind)));
        }
    }
    dyncon::register(&s);
    logic::register(&s);
    comp::register(&s);
    arith::register(&s);
    cont::register(&s);
    bind::register(&s);
    s
}

// ── Shared helpers ───────────────────────────────────────────────

pub(crate) fn def_spec(s: &Scope, spec: Arc<Spec>) {
    s.def(spec.name().to_string(), Def::val(Val::Spec(spec)));
}

pub(crate) fn lookup_spec(env: &Scope, name: &str) -> Result<Arc<Spec>, Error> {
    let found = find_def(env, name)?
        .ok_or_else(|| Error::other(format!("missing builtin {name}")))?;
    found
        .def
        .val
        .as_ref()
        .and_then(Val::as_spec)
        .cloned()
        .ok_or_else(|| Error::other(format!("{name} does not name a form")))
}

pub(crate) fn call_el(c: Call) -> El {
    El::Call(Box::new(c))
}

pub(crate) fn keep(c: Call) -> Error {
    Error::unres(call_el(c))
}

/// The default resolve path: resolve all argument groups against the
/// instantiated signature, unify the result with the hint, and keep the
/// call. Unresolved arguments defer the whole call.
pub(crate) fn resl_form(
    p: &mut Prog,
    env: &Scope,
    mut c: Call,
    hint: &Type,
) -> Result<El, Error> {
    let unres = osier_exp::layout::resl_groups(p, env, &mut c)?;
    p.hint_res(&mut c, hint)?;
    if unres {
        return Err(keep(c));
    }
    Ok(call_el(c))
}

pub(crate) fn lit_arg<'a>(el: &'a El) -> Result<&'a Lit, Error> {
    el.as_lit()
        .ok_or_else(|| Error::other(format!("expected a literal, got {el}")))
}
