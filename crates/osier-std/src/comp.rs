use crate::{call_el, def_spec, keep, lit_arg, resl_form};
use osier_exp::layout::resl_groups;
use osier_exp::{impl_form, Call, El, Error, Mode, Prog, Scope};
use osier_lit::{equal, equiv, less, Lit};
use osier_types::Type;

pub(crate) fn register(s: &Scope) {
    let rest2 = |name: &str| format!("<form {name} a:any b:any plain?:list; bool>");
    def_spec(s, impl_form(&rest2("eq"), resl_form, eq_eval));
    def_spec(s, impl_form(&rest2("ne"), resl_form, ne_eval));
    def_spec(s, impl_form(&rest2("equal"), resl_form, equal_eval));
    def_spec(s, impl_form(&rest2("lt"), resl_form, lt_eval));
    def_spec(s, impl_form(&rest2("le"), resl_form, le_eval));
    def_spec(s, impl_form(&rest2("gt"), resl_form, gt_eval));
    def_spec(s, impl_form(&rest2("ge"), resl_form, ge_eval));
    def_spec(s, impl_form("<form in a:any b:idxr; bool>", resl_form, in_eval));
    def_spec(s, impl_form("<form ni a:any b:idxr; bool>", resl_form, ni_eval));
}

// eq/ne compare for equivalence, equal for strict equality; lt/le/gt/ge
// check monotonic ordering. ge is "not lt" and le is "not gt".

fn eq_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    comp_fold(p, env, c, true, false, equiv)
}

fn ne_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    comp_fold(p, env, c, true, true, equiv)
}

fn equal_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    comp_fold(p, env, c, true, false, equal)
}

fn lt_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    comp_fold(p, env, c, false, false, |a, b| less(a, b) == Some(true))
}

fn ge_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    comp_fold(p, env, c, false, false, |a, b| less(a, b) == Some(false))
}

fn gt_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    comp_fold(p, env, c, false, false, |a, b| less(b, a) == Some(true))
}

fn le_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    comp_fold(p, env, c, false, false, |a, b| less(b, a) == Some(false))
}

/// Pairwise comparison chain with partial support. Runs of resolved
/// operands collapse to a single representative; for symmetric comparisons
/// the representative only leads the unresolved tail.
fn comp_fold(
    p: &mut Prog,
    env: &Scope,
    c: Call,
    sym: bool,
    negate: bool,
    cmp: fn(&Lit, &Lit) -> bool,
) -> Result<El, Error> {
    let args = c.all_args();
    let mut res = false;
    let mut init = false;
    let mut unres: Vec<El> = Vec::new();
    let mut last: Option<Lit> = None;
    for arg in args {
        match p.resolve(env, arg, &Type::VOID) {
            Err(Error::Unres(b)) => {
                if p.mode != Mode::Part {
                    let mut c = c;
                    c.groups = vec![vec![*b]];
                    return Err(keep(c));
                }
                if unres.is_empty() && res {
                    init = true;
                    if let Some(l) = &last {
                        unres.push(El::lit(l.clone()));
                    }
                }
                res = false;
                unres.push(*b);
            }
            Err(e) => return Err(e),
            Ok(el) => {
                let lit = lit_arg(&el)?.clone();
                if let Some(prev) = &last {
                    if !cmp(prev, &lit) {
                        return Ok(El::lit(Lit::Bool(negate)));
                    }
                }
                if !res && ((!sym || !init) && !unres.is_empty()) || unres.len() == 1 {
                    unres.push(El::lit(lit.clone()));
                }
                last = Some(lit);
                res = true;
            }
        }
    }
    if !unres.is_empty() {
        let call = p.new_call(c.spec.clone(), unres, c.src)?;
        return Err(Error::unres(call_el(call)));
    }
    Ok(El::lit(Lit::Bool(!negate)))
}

// ── in / ni ──────────────────────────────────────────────────────

fn in_eval(p: &mut Prog, env: &Scope, c: Call, h: &Type) -> Result<El, Error> {
    in_or_ni(p, env, c, h, false)
}

fn ni_eval(p: &mut Prog, env: &Scope, c: Call, h: &Type) -> Result<El, Error> {
    in_or_ni(p, env, c, h, true)
}

fn in_or_ni(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type, neg: bool) -> Result<El, Error> {
    let unres = resl_groups(p, env, &mut c)?;
    if unres {
        return Err(keep(c));
    }
    let a = lit_arg(c.arg(0).ok_or_else(|| Error::other("missing element"))?)?.clone();
    let list = lit_arg(c.arg(1).ok_or_else(|| Error::other("missing container"))?)?;
    let data = match list {
        Lit::List(l) => &l.data,
        other => {
            return Err(Error::other(format!(
                "expected an indexer, got {}",
                other.typ()
            )))
        }
    };
    let found = data.iter().any(|el| equiv(el, &a));
    Ok(El::lit(Lit::Bool(found != neg)))
}
