use crate::{call_el, def_spec, keep, lit_arg, resl_form};
use osier_exp::layout::{resl_groups, tags};
use osier_exp::{impl_form, Call, El, Error, Prog, Scope, Spec, Val};
use osier_lit::{convert, to_text, List, Lit};
use osier_types::{Kind, Type};
use std::sync::Arc;

pub(crate) fn register(s: &Scope) {
    def_spec(s, impl_form("<form cat a:@1 plain?:list; @1>", resl_form, cat_eval));
    def_spec(s, impl_form("<form apd a:@1 plain?:list; @1>", resl_form, apd_eval));
    def_spec(s, impl_form("<form set a:@1 args?:dict; @1>", resl_form, set_eval));
    def_spec(s, impl_form("<form len a:any; int>", resl_form, len_eval));
    def_spec(
        s,
        impl_form("<form fst a:list|@1 f?:func; @1>", resl_form, fst_eval),
    );
    def_spec(
        s,
        impl_form("<form lst a:list|@1 f?:func; @1>", resl_form, lst_eval),
    );
    def_spec(
        s,
        impl_form("<form nth a:list|@1 i:int f?:func; @1>", resl_form, nth_eval),
    );
    def_spec(
        s,
        impl_form("<form range n:int; list|int>", resl_form, range_eval),
    );
    def_spec(
        s,
        impl_form("<form repeat n:int el:@1; list|@1>", resl_form, repeat_eval),
    );
    def_spec(
        s,
        impl_form("<form map a:list|@1 f:func; list|@2>", map_resl, map_eval),
    );
    def_spec(
        s,
        impl_form(
            "<form filter a:list|@1 f:func; list|@1>",
            resl_form,
            filter_eval,
        ),
    );
    def_spec(
        s,
        impl_form("<form fold a:list|@1 b:@2 f:func; @2>", fold_resl, fold_eval),
    );
    def_spec(
        s,
        impl_form(
            "<form foldr a:list|@1 b:@2 f:func; @2>",
            fold_resl,
            foldr_eval,
        ),
    );
}

// ── cat / apd / set ──────────────────────────────────────────────

fn cat_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let els = c.all_args();
    let first = lit_arg(&els[0])?.clone();
    match &first {
        Lit::Char(_) | Lit::Str(_) | Lit::Raw(_) => {
            let mut s = to_text(&first).to_string();
            for el in &els[1..] {
                s.push_str(&to_text(lit_arg(el)?));
            }
            Ok(El::lit(match first {
                Lit::Raw(_) => Lit::Raw(s.into_bytes()),
                _ => Lit::Str(s.into()),
            }))
        }
        Lit::List(l) => {
            let mut data = l.data.clone();
            for el in &els[1..] {
                match lit_arg(el)? {
                    Lit::List(other) => data.extend(other.data.iter().cloned()),
                    other => {
                        return Err(Error::other(format!(
                            "cannot concatenate {} to a list",
                            other.typ()
                        )))
                    }
                }
            }
            Ok(El::lit(Lit::List(List::new(l.elem.clone(), data))))
        }
        Lit::Dict(d) => {
            let mut res = Lit::Dict(d.clone());
            for el in &els[1..] {
                match lit_arg(el)? {
                    Lit::Dict(other) => {
                        for k in &other.data {
                            crate::dyncon::set_key(&mut res, &k.key, k.val.clone())?;
                        }
                    }
                    other => {
                        return Err(Error::other(format!(
                            "cannot merge {} into a dict",
                            other.typ()
                        )))
                    }
                }
            }
            Ok(El::lit(res))
        }
        other => Err(Error::other(format!("cannot concatenate {}", other.typ()))),
    }
}

fn apd_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let els = c.all_args();
    let mut list = match lit_arg(&els[0])? {
        Lit::List(l) => l.clone(),
        other => {
            return Err(Error::other(format!(
                "cannot append to {}",
                other.typ()
            )))
        }
    };
    for el in &els[1..] {
        let l = lit_arg(el)?.clone();
        list.data.push(convert(l, &list.elem)?);
    }
    Ok(El::lit(Lit::List(list)))
}

fn set_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let mut res = lit_arg(c.arg(0).ok_or_else(|| Error::other("missing container"))?)?.clone();
    for n in tags(c.args(1)) {
        if n.name.is_empty() {
            return Err(Error::layout(format!("expected a tag, got {n:?}")));
        }
        let el = n
            .arg()
            .ok_or_else(|| Error::other(format!("missing value for tag {}", n.name)))?;
        crate::dyncon::set_key(&mut res, &n.key(), lit_arg(el)?.clone())?;
    }
    Ok(El::lit(res))
}

// ── len / fst / lst / nth ────────────────────────────────────────

fn len_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let l = lit_arg(c.arg(0).ok_or_else(|| Error::other("missing argument"))?)?;
    let n = l
        .len()
        .ok_or_else(|| Error::other(format!("{} has no length", l.typ())))?;
    Ok(El::lit(Lit::Int(n as i64)))
}

fn list_and_pred(
    c: &Call,
    list_idx: usize,
    pred_idx: usize,
) -> Result<(List, Option<Arc<Spec>>), Error> {
    let list = match lit_arg(
        c.arg(list_idx)
            .ok_or_else(|| Error::other("missing list argument"))?,
    )? {
        Lit::List(l) => l.clone(),
        other => return Err(Error::other(format!("expected a list, got {}", other.typ()))),
    };
    let pred = match c.arg(pred_idx) {
        Some(El::Atom(a)) => match &a.val {
            Val::Spec(s) => Some(s.clone()),
            _ => return Err(Error::other("expected a function")),
        },
        Some(other) => return Err(Error::other(format!("expected a function, got {other}"))),
        None => None,
    };
    Ok((list, pred))
}

fn fst_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let src = c.src;
    let (list, pred) = list_and_pred(&c, 0, 1)?;
    match pred {
        None => match list.data.first() {
            Some(l) => Ok(El::lit(l.clone())),
            None => Err(Error::other("empty list")),
        },
        Some(f) => {
            for (i, el) in list.data.iter().enumerate() {
                if truthy_call(p, env, &f, el, i, src)? {
                    return Ok(El::lit(el.clone()));
                }
            }
            Err(Error::other("no element matches"))
        }
    }
}

fn lst_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let src = c.src;
    let (list, pred) = list_and_pred(&c, 0, 1)?;
    match pred {
        None => match list.data.last() {
            Some(l) => Ok(El::lit(l.clone())),
            None => Err(Error::other("empty list")),
        },
        Some(f) => {
            for (i, el) in list.data.iter().enumerate().rev() {
                if truthy_call(p, env, &f, el, i, src)? {
                    return Ok(El::lit(el.clone()));
                }
            }
            Err(Error::other("no element matches"))
        }
    }
}

fn nth_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let src = c.src;
    let idx = lit_arg(c.arg(1).ok_or_else(|| Error::other("missing index"))?)?
        .num()
        .ok_or_else(|| Error::other("expected a number index"))? as i64;
    let (list, pred) = list_and_pred(&c, 0, 2)?;
    match pred {
        None => Ok(El::lit(Lit::List(list).idx(idx)?.clone())),
        Some(f) => {
            let mut matches = Vec::new();
            for (i, el) in list.data.iter().enumerate() {
                if truthy_call(p, env, &f, el, i, src)? {
                    matches.push(el.clone());
                }
            }
            let n = matches.len() as i64;
            let i = if idx < 0 { n + idx } else { idx };
            if i < 0 || i >= n {
                return Err(Error::other(format!("no match at index {idx}")));
            }
            Ok(El::lit(matches[i as usize].clone()))
        }
    }
}

// ── range / repeat ───────────────────────────────────────────────

fn range_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let n = lit_arg(c.arg(0).ok_or_else(|| Error::other("missing count"))?)?
        .num()
        .ok_or_else(|| Error::other("expected a number"))? as i64;
    let data = (0..n.max(0)).map(Lit::Int).collect();
    Ok(El::lit(Lit::List(List::new(Type::INT, data))))
}

fn repeat_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let n = lit_arg(c.arg(0).ok_or_else(|| Error::other("missing count"))?)?
        .num()
        .ok_or_else(|| Error::other("expected a number"))? as usize;
    let el = lit_arg(c.arg(1).ok_or_else(|| Error::other("missing element"))?)?.clone();
    let data = vec![el.clone(); n];
    Ok(El::lit(Lit::List(List::new(el.typ(), data))))
}

// ── map / filter / fold ──────────────────────────────────────────

fn map_resl(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let unres = resl_groups(p, env, &mut c)?;
    // the result element type follows the function's result
    if let Some(f) = c.arg(1) {
        let ft = p.ctx.apply(&f.res_typ());
        if ft.kind.is_spec() && ft.has_params() {
            p.ctx.unify(&c.res().elem(), &ft.res())?;
        }
    }
    p.hint_res(&mut c, hint)?;
    if unres {
        return Err(keep(c));
    }
    Ok(call_el(c))
}

fn fold_resl(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let unres = resl_groups(p, env, &mut c)?;
    if let Some(f) = c.arg(2) {
        let ft = p.ctx.apply(&f.res_typ());
        if ft.kind.is_spec() && ft.has_params() {
            p.ctx.unify(&c.res(), &ft.res())?;
        }
    }
    p.hint_res(&mut c, hint)?;
    if unres {
        return Err(keep(c));
    }
    Ok(call_el(c))
}

fn map_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let src = c.src;
    let et = p.ctx.apply(&c.res()).elem();
    let (list, f) = list_and_pred(&c, 0, 1)?;
    let f = f.ok_or_else(|| Error::other("missing function"))?;
    let mut data = Vec::with_capacity(list.data.len());
    for (i, el) in list.data.iter().enumerate() {
        let mut r = apply_fn(p, env, &f, &[el.clone(), Lit::Int(i as i64)], src)?;
        if !et.is_var() && et.kind != Kind::VOID {
            r = convert(r, &et)?;
        }
        data.push(r);
    }
    let et = if et.is_var() { Type::ANY } else { et };
    Ok(El::lit(Lit::List(List::new(et, data))))
}

fn filter_eval(p: &mut Prog, env: &Scope, mut c: Call, _h: &Type) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let src = c.src;
    let (list, f) = list_and_pred(&c, 0, 1)?;
    let f = f.ok_or_else(|| Error::other("missing function"))?;
    let mut data = Vec::new();
    for (i, el) in list.data.iter().enumerate() {
        if truthy_call(p, env, &f, el, i, src)? {
            data.push(el.clone());
        }
    }
    Ok(El::lit(Lit::List(List::new(list.elem.clone(), data))))
}

fn fold_eval(p: &mut Prog, env: &Scope, c: Call, h: &Type) -> Result<El, Error> {
    fold_impl(p, env, c, h, false)
}

fn foldr_eval(p: &mut Prog, env: &Scope, c: Call, h: &Type) -> Result<El, Error> {
    fold_impl(p, env, c, h, true)
}

fn fold_impl(
    p: &mut Prog,
    env: &Scope,
    mut c: Call,
    _h: &Type,
    rev: bool,
) -> Result<El, Error> {
    if resl_groups(p, env, &mut c)? {
        return Err(keep(c));
    }
    let src = c.src;
    let rt = p.ctx.apply(&c.res());
    let mut acc = lit_arg(c.arg(1).ok_or_else(|| Error::other("missing accumulator"))?)?.clone();
    let (list, f) = list_and_pred(&c, 0, 2)?;
    let f = f.ok_or_else(|| Error::other("missing function"))?;
    let iter: Vec<(usize, Lit)> = if rev {
        list.data.iter().cloned().enumerate().rev().collect()
    } else {
        list.data.iter().cloned().enumerate().collect()
    };
    for (i, el) in iter {
        acc = apply_fn(p, env, &f, &[acc, el, Lit::Int(i as i64)], src)?;
    }
    if !rt.is_var() && rt.kind != Kind::VOID {
        acc = convert(acc, &rt)?;
    }
    Ok(El::lit(acc))
}

// ── Calling function values ──────────────────────────────────────

/// Calls a function spec with literal arguments, passing only as many as
/// the signature declares.
fn apply_fn(
    p: &mut Prog,
    env: &Scope,
    spec: &Arc<Spec>,
    args: &[Lit],
    src: osier_exp::Span,
) -> Result<Lit, Error> {
    let arity = spec.sig.args().len();
    let els: Vec<El> = args.iter().take(arity).cloned().map(El::lit).collect();
    let mut call = p.new_call(spec.clone(), els, src)?;
    call.src = src;
    let r = p.resolve(env, call_el(call), &Type::VOID)?;
    lit_arg(&r).cloned()
}

fn truthy_call(
    p: &mut Prog,
    env: &Scope,
    spec: &Arc<Spec>,
    el: &Lit,
    idx: usize,
    src: osier_exp::Span,
) -> Result<bool, Error> {
    let r = apply_fn(p, env, spec, &[el.clone(), Lit::Int(idx as i64)], src)?;
    Ok(!r.is_zero())
}
