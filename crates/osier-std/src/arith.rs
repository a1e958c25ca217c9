use crate::{def_spec, keep, lit_arg, resl_form};
use osier_exp::layout::resl_groups;
use osier_exp::{impl_form, Call, El, Error, Mode, Prog, Scope};
use osier_lit::{convert, Lit};
use osier_types::Type;

pub(crate) fn register(s: &Scope) {
    // the first operand drives the result type; the rest only need to be
    // numeric
    let vari = |name: &str| format!("<form {name} a:@1 plain?:list|num; @1>");
    def_spec(s, impl_form(&vari("add"), resl_form, add_eval));
    def_spec(s, impl_form(&vari("sub"), resl_form, sub_eval));
    def_spec(s, impl_form(&vari("mul"), resl_form, mul_eval));
    def_spec(s, impl_form(&vari("div"), resl_form, div_eval));
    def_spec(s, impl_form(&vari("min"), resl_form, min_eval));
    def_spec(s, impl_form(&vari("max"), resl_form, max_eval));
    def_spec(s, impl_form("<form abs a:@1; @1>", resl_form, abs_eval));
    def_spec(s, impl_form("<form neg a:@1; @1>", resl_form, neg_eval));
    def_spec(s, impl_form("<form rem a:int b:int; int>", resl_form, rem_eval));
}

// Literal operands coalesce into a single leading value; unresolved
// operands keep their position. Non-commutative operators fold their known
// tail with the inverse-combining operation so the canonical partial call
// stays equivalent.

struct Op {
    // combine two known operands after the first
    fold: fn(f64, f64) -> f64,
    // combine the first operand with the folded tail
    first: fn(f64, f64) -> Result<f64, Error>,
}

fn add_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    num_fold(
        p,
        env,
        c,
        Op {
            fold: |a, b| a + b,
            first: |a, b| Ok(a + b),
        },
    )
}

fn mul_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    num_fold(
        p,
        env,
        c,
        Op {
            fold: |a, b| a * b,
            first: |a, b| Ok(a * b),
        },
    )
}

fn sub_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    // a - b - c folds the subtrahends by addition
    num_fold(
        p,
        env,
        c,
        Op {
            fold: |a, b| a + b,
            first: |a, b| Ok(a - b),
        },
    )
}

fn div_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    num_fold(
        p,
        env,
        c,
        Op {
            fold: |a, b| a * b,
            first: |a, b| {
                if b == 0.0 {
                    return Err(Error::other("division by zero"));
                }
                Ok(a / b)
            },
        },
    )
}

fn min_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    num_fold(
        p,
        env,
        c,
        Op {
            fold: f64::min,
            first: |a, b| Ok(a.min(b)),
        },
    )
}

fn max_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    num_fold(
        p,
        env,
        c,
        Op {
            fold: f64::max,
            first: |a, b| Ok(a.max(b)),
        },
    )
}

fn num_fold(p: &mut Prog, env: &Scope, c: Call, op: Op) -> Result<El, Error> {
    let els = c.all_args();
    let rt = p.ctx.apply(&c.res());
    let mut known: Vec<(usize, f64)> = Vec::new();
    let mut out: Vec<Option<El>> = Vec::with_capacity(els.len());
    for (i, el) in els.into_iter().enumerate() {
        match p.resolve(env, el, &Type::VOID) {
            Ok(r) => {
                let n = lit_arg(&r)?
                    .num()
                    .ok_or_else(|| Error::other(format!("expected a number, got {r}")))?;
                known.push((i, n));
                out.push(None);
            }
            Err(Error::Unres(b)) => {
                if p.mode != Mode::Part {
                    let mut c = c;
                    c.groups = vec![vec![*b]];
                    return Err(keep(c));
                }
                out.push(Some(*b));
            }
            Err(e) => return Err(e),
        }
    }
    let first_known_leads = known.first().is_some_and(|(i, _)| *i == 0);
    let folded = if first_known_leads {
        let first = known[0].1;
        match known[1..].iter().map(|(_, n)| *n).reduce(op.fold) {
            Some(tail) => (op.first)(first, tail)?,
            None => first,
        }
    } else {
        known.iter().map(|(_, n)| *n).reduce(op.fold).unwrap_or(0.0)
    };
    if out.iter().all(Option::is_none) {
        // fully reduced
        let lit = convert(Lit::Num(folded), &rt).unwrap_or(Lit::Num(folded));
        return Ok(El::lit(lit));
    }
    // partial: the folded value takes the first known operand's place
    let mut args: Vec<El> = Vec::new();
    let mut placed = known.is_empty();
    for (i, slot) in out.into_iter().enumerate() {
        match slot {
            Some(el) => args.push(el),
            None => {
                if !placed && known.first().is_some_and(|(k, _)| *k == i) {
                    args.push(El::lit(Lit::Num(folded)));
                    placed = true;
                }
            }
        }
    }
    let mut c = c;
    let first = args.remove(0);
    c.groups = vec![vec![first], args];
    Err(keep(c))
}

// ── abs / neg / rem ──────────────────────────────────────────────

fn abs_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    unary_eval(p, env, c, f64::abs)
}

fn neg_eval(p: &mut Prog, env: &Scope, c: Call, _h: &Type) -> Result<El, Error> {
    unary_eval(p, env, c, |n| -n)
}

fn unary_eval(p: &mut Prog, env: &Scope, mut c: Call, f: fn(f64) -> f64) -> Result<El, Error> {
    let unres = resl_groups(p, env, &mut c)?;
    if unres {
        return Err(keep(c));
    }
    let rt = p.ctx.apply(&c.res());
    let l = lit_arg(c.arg(0).ok_or_else(|| Error::other("missing operand"))?)?;
    let n = l
        .num()
        .ok_or_else(|| Error::other(format!("expected a number, got {l}")))?;
    let lit = convert(Lit::Num(f(n)), &rt).unwrap_or(Lit::Num(f(n)));
    Ok(El::lit(lit))
}

fn rem_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    let unres = resl_groups(p, env, &mut c)?;
    if unres {
        return Err(keep(c));
    }
    let a = lit_arg(c.arg(0).ok_or_else(|| Error::other("missing operand"))?)?
        .num()
        .ok_or_else(|| Error::other("expected a number"))? as i64;
    let b = lit_arg(c.arg(1).ok_or_else(|| Error::other("missing operand"))?)?
        .num()
        .ok_or_else(|| Error::other("expected a number"))? as i64;
    if b == 0 {
        return Err(Error::other("division by zero"));
    }
    Ok(El::lit(Lit::Int(a % b)))
}
