use crate::{call_el, def_spec, keep, lookup_spec, resl_form};
use osier_exp::layout::resl_groups;
use osier_exp::{impl_form, Call, El, Error, Mode, Prog, Scope};
use osier_lit::{to_text, Lit};
use osier_types::Type;

pub(crate) fn register(s: &Scope) {
    def_spec(s, impl_form("<form ok plain?:list; bool>", resl_form, ok_eval));
    def_spec(s, impl_form("<form not plain?:list; bool>", resl_form, not_eval));
    def_spec(s, impl_form("<form and plain?:list; bool>", resl_form, and_eval));
    def_spec(s, impl_form("<form or plain?:list; bool>", resl_form, or_eval));
    def_spec(s, impl_form("<form if plain; @>", if_resl, if_eval));
    def_spec(s, impl_form("<form fail plain?:list; @>", fail_resl, fail_eval));
}

// ── and / or / not / ok ──────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
enum BoolOp {
    And,
    Or,
    Not,
    Ok,
}

fn and_eval(p: &mut Prog, env: &Scope, c: Call, _hint: &Type) -> Result<El, Error> {
    bool_fold(p, env, c, BoolOp::And)
}

fn or_eval(p: &mut Prog, env: &Scope, c: Call, _hint: &Type) -> Result<El, Error> {
    bool_fold(p, env, c, BoolOp::Or)
}

fn not_eval(p: &mut Prog, env: &Scope, c: Call, _hint: &Type) -> Result<El, Error> {
    bool_fold(p, env, c, BoolOp::Not)
}

fn ok_eval(p: &mut Prog, env: &Scope, c: Call, _hint: &Type) -> Result<El, Error> {
    bool_fold(p, env, c, BoolOp::Ok)
}

/// Short-circuit boolean folding. Arguments are evaluated in order; once
/// the outcome is decided no further argument runs. Unresolved operands
/// canonicalize into `ok`/`not` wrappers or a trimmed variadic call.
fn bool_fold(p: &mut Prog, env: &Scope, c: Call, op: BoolOp) -> Result<El, Error> {
    let els = c.all_args();
    if els.is_empty() {
        let res = matches!(op, BoolOp::And | BoolOp::Not);
        return Ok(El::lit(Lit::Bool(res)));
    }
    let mut pending: Vec<El> = Vec::new();
    for el in els {
        match p.resolve(env, el, &Type::VOID) {
            Ok(r) => {
                let l = crate::lit_arg(&r)?;
                let truthy = !l.is_zero();
                match op {
                    BoolOp::Or => {
                        if truthy {
                            return Ok(El::lit(Lit::Bool(true)));
                        }
                    }
                    _ => {
                        if !truthy {
                            return Ok(El::lit(Lit::Bool(op == BoolOp::Not)));
                        }
                    }
                }
            }
            Err(Error::Unres(b)) => {
                if p.mode != Mode::Part {
                    let mut c = c;
                    c.groups = vec![vec![*b]];
                    return Err(keep(c));
                }
                pending.push(*b);
            }
            Err(e) => return Err(e),
        }
    }
    if pending.is_empty() {
        let res = matches!(op, BoolOp::And | BoolOp::Ok);
        return Ok(El::lit(Lit::Bool(res)));
    }
    if pending.len() == 1 {
        let el = pending.pop().unwrap();
        let wrapped = bool_wrap(p, env, el, op == BoolOp::Not, c.src)?;
        return Err(Error::unres(wrapped));
    }
    let call = p.new_call(c.spec.clone(), pending, c.src)?;
    Err(Error::unres(call_el(call)))
}

/// Wraps a single undecided operand as `(ok x)` or `(not x)`, collapsing
/// nested `ok`/`not` chains along the way.
fn bool_wrap(
    p: &mut Prog,
    env: &Scope,
    mut el: El,
    mut negate: bool,
    src: osier_exp::Span,
) -> Result<El, Error> {
    loop {
        let inner = match &el {
            El::Call(c) => match c.spec.name() {
                "ok" => c.all_args().into_iter().next().map(|e| (e, negate)),
                "not" => c.all_args().into_iter().next().map(|e| (e, !negate)),
                _ => None,
            },
            _ => None,
        };
        match inner {
            Some((e, n)) => {
                el = e;
                negate = n;
            }
            None => break,
        }
    }
    let spec = lookup_spec(env, if negate { "not" } else { "ok" })?;
    let call = p.new_call(spec, vec![el], src)?;
    Ok(call_el(call))
}

// ── if ───────────────────────────────────────────────────────────

// (if c1 v1 c2 v2 ... else?) — conditions pair with values; a trailing
// unpaired element is the else branch. All value branches unify with the
// call's result type.

fn if_resl(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let els = std::mem::take(&mut c.groups[0]);
    let res = c.res();
    let n = els.len();
    let mut out = Vec::with_capacity(n);
    let mut unres = false;
    for (i, el) in els.into_iter().enumerate() {
        let is_val = i % 2 == 1 || (i == n - 1 && n % 2 == 1);
        let h = if is_val { res.clone() } else { Type::VOID };
        match p.resolve(env, el, &h) {
            Ok(r) => out.push(r),
            Err(Error::Unres(b)) => {
                unres = true;
                out.push(*b);
            }
            Err(e) => return Err(e),
        }
    }
    c.groups[0] = out;
    p.hint_res(&mut c, hint)?;
    if unres {
        return Err(keep(c));
    }
    Ok(call_el(c))
}

fn if_eval(p: &mut Prog, env: &Scope, c: Call, _hint: &Type) -> Result<El, Error> {
    let els = c.args(0).to_vec();
    let rt = p.ctx.apply(&c.res());
    let mut i = 0;
    while i + 1 < els.len() {
        match p.resolve(env, els[i].clone(), &Type::VOID) {
            Ok(r) => {
                let cond = crate::lit_arg(&r)?;
                if !cond.is_zero() {
                    return p.resolve(env, els[i + 1].clone(), &rt);
                }
                i += 2;
            }
            Err(Error::Unres(b)) => {
                // keep the undecided tail of the chain
                let mut rest = vec![*b];
                rest.extend(els[i + 1..].iter().cloned());
                let mut c = c;
                c.groups[0] = rest;
                return Err(keep(c));
            }
            Err(e) => return Err(e),
        }
    }
    if i < els.len() {
        return p.resolve(env, els[i].clone(), &rt);
    }
    Ok(El::lit(Lit::zero(&rt)))
}

// ── fail ─────────────────────────────────────────────────────────

fn fail_resl(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    // a fail form resolves fine; only evaluating it is an error
    let _ = resl_groups(p, env, &mut c)?;
    p.hint_res(&mut c, hint)?;
    Ok(call_el(c))
}

fn fail_eval(p: &mut Prog, env: &Scope, mut c: Call, _hint: &Type) -> Result<El, Error> {
    let _ = resl_groups(p, env, &mut c)?;
    let mut msg = String::new();
    for el in c.args(0) {
        if let Some(l) = el.as_lit() {
            msg.push_str(&to_text(l));
        }
    }
    if msg.is_empty() {
        msg.push_str("fail");
    }
    Err(Error::User { msg, src: c.src })
}
