use crate::{call_el, def_spec, keep, lookup_spec};
use osier_exp::layout::{resl_groups, tags, unis};
use osier_exp::{impl_form, Call, El, Error, Prog, Scope, Val};
use osier_lit::{convert, Keyed, Lit};
use osier_types::{kind::MASK_BASE, Kind, Type};

pub(crate) fn register(s: &Scope) {
    def_spec(s, impl_form("<form 'dyn' rest; @>", dyn_run, dyn_run));
    def_spec(
        s,
        impl_form("<form con typ args?:list unis?:dict; @>", con_resl, con_eval),
    );
}

// ── dyn ──────────────────────────────────────────────────────────

/// Classifies a dynamic expression by its first element. A type head turns
/// into construction (`con`, or `ok` for bool), a spec head into a direct
/// call, and anything else picks the combinator matching the head's type.
fn dyn_run(p: &mut Prog, env: &Scope, c: Call, hint: &Type) -> Result<El, Error> {
    let mut els = c.all_args();
    if els.is_empty() {
        return Ok(El::void());
    }
    let head = els.remove(0);
    let head = match p.resolve(env, head, &Type::VOID) {
        Ok(h) => h,
        Err(Error::Unres(b)) => {
            let mut rest = vec![*b];
            rest.extend(els);
            let mut c = c;
            c.groups = vec![rest];
            return Err(keep(c));
        }
        Err(e) => return Err(e),
    };
    let ht = p.ctx.apply(&head.res_typ());
    if ht.is_var() {
        let mut rest = vec![head];
        rest.extend(els);
        let mut c = c;
        c.groups = vec![rest];
        return Err(keep(c));
    }
    let k = ht.kind.elem();
    if k == Kind::TYP {
        let t = head
            .as_typ()
            .cloned()
            .ok_or_else(|| Error::other(format!("expected a type value, got {head}")))?;
        if t.kind == Kind::VOID {
            return Ok(head);
        }
        if t == Type::BOOL {
            let spec = lookup_spec(env, "ok")?;
            let call = p.new_call(spec, els, c.src)?;
            return p.resolve(env, call_el(call), hint);
        }
        let spec = lookup_spec(env, "con")?;
        let mut args = vec![head];
        args.extend(els);
        let call = p.new_call(spec, args, c.src)?;
        return p.resolve(env, call_el(call), hint);
    }
    if k == Kind::FORM || k == Kind::FUNC {
        let spec = match &head {
            El::Atom(a) => match &a.val {
                Val::Spec(s) => s.clone(),
                _ => crate::bind::fn_ref(head.clone(), ht),
            },
            _ => crate::bind::fn_ref(head.clone(), ht),
        };
        let call = p.new_call(spec, els, c.src)?;
        return p.resolve(env, call_el(call), hint);
    }
    // a lone value element is itself
    if els.is_empty() && ht.kind.0 & Kind::ANY.0 & MASK_BASE != 0 {
        return Ok(head);
    }
    let sym = if k == Kind::BOOL {
        "and"
    } else if matches!(k, Kind::NUM | Kind::INT | Kind::REAL | Kind::SPAN) {
        "add"
    } else if matches!(k, Kind::CHAR | Kind::STR | Kind::RAW) {
        "cat"
    } else if k.is_keyr() {
        "set"
    } else if k.is_idxr() {
        "apd"
    } else {
        return Err(Error::other(format!(
            "unexpected first argument type {ht} in dynamic expression"
        )));
    };
    let spec = lookup_spec(env, sym)?;
    let mut args = vec![head];
    args.extend(els);
    let call = p.new_call(spec, args, c.src)?;
    p.resolve(env, call_el(call), hint)
}

// ── con ──────────────────────────────────────────────────────────

// Construction has four rules: no arguments yield the zero literal, one
// compatible literal converts, keyer types set tags and declarations, and
// idxer types append plain arguments.

fn con_typ(c: &Call) -> Option<Type> {
    c.arg(0).and_then(El::as_typ).cloned()
}

fn con_resl(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let unres = resl_groups(p, env, &mut c)?;
    if let Some(t) = con_typ(&c) {
        if t.kind != Kind::VOID {
            p.ctx.unify(&c.res(), &t)?;
        }
    }
    p.hint_res(&mut c, hint)?;
    if unres {
        return Err(keep(c));
    }
    Ok(call_el(c))
}

fn con_eval(p: &mut Prog, env: &Scope, mut c: Call, hint: &Type) -> Result<El, Error> {
    let unres = resl_groups(p, env, &mut c)?;
    let t = con_typ(&c)
        .ok_or_else(|| Error::other("the con expression must start with a type"))?;
    if t.kind == Kind::VOID {
        return Ok(El::void());
    }
    p.ctx.unify(&c.res(), &t)?;
    p.hint_res(&mut c, hint)?;
    if unres {
        return Err(keep(c));
    }
    let args = c.args(1).to_vec();
    let decls = unis(c.args(2))?;

    let mut plains: Vec<&El> = Vec::new();
    let mut keyed: Vec<(smol_str::SmolStr, El)> = Vec::new();
    for n in tags(&args) {
        match n.arg() {
            Some(el) if !n.name.is_empty() => keyed.push((n.key(), el.clone())),
            _ => {}
        }
    }
    for el in &args {
        if !matches!(el, El::Named(_)) {
            plains.push(el);
        }
    }
    for d in &decls {
        if let Some(el) = d.arg() {
            keyed.push((d.key(), el.clone()));
        }
    }

    if plains.is_empty() && keyed.is_empty() {
        return Ok(El::lit(Lit::zero(&t)));
    }
    if plains.len() == 1 && keyed.is_empty() {
        let l = crate::lit_arg(plains[0])?;
        match t.kind.elem() {
            Kind::FLAG => {
                let n = l
                    .num()
                    .ok_or_else(|| Error::other(format!("expected a number for {t}")))?;
                return Ok(El::lit(Lit::Int(n as i64)));
            }
            Kind::ENUM => {
                let s = l
                    .text()
                    .ok_or_else(|| Error::other(format!("expected a name for {t}")))?;
                return Ok(El::lit(Lit::Str(s)));
            }
            _ => {}
        }
        if let Ok(res) = convert(l.clone(), &t) {
            return Ok(El::lit(res));
        }
    }
    if t.kind.elem().is_keyr() {
        let mut res = Lit::zero(&t.deopt());
        for (key, el) in keyed {
            let l = crate::lit_arg(&el)?;
            set_key(&mut res, &key, l.clone())?;
        }
        return Ok(El::lit(res));
    }
    if t.kind.elem().is_idxr() {
        let mut res = Lit::zero(&t.deopt());
        match &mut res {
            Lit::List(list) => {
                for el in plains {
                    let l = crate::lit_arg(el)?;
                    list.data.push(convert(l.clone(), &list.elem)?);
                }
            }
            Lit::Rec(rec) => {
                let fields = rec.typ.params().to_vec();
                for (i, el) in plains.iter().enumerate() {
                    let ft = fields
                        .get(i)
                        .ok_or_else(|| Error::other(format!("too many fields for {t}")))?;
                    let l = crate::lit_arg(el)?;
                    rec.data[i].val = convert(l.clone(), &ft.typ)?;
                }
            }
            _ => return Err(Error::other(format!("cannot construct {t}"))),
        }
        return Ok(El::lit(res));
    }
    Err(Error::other(format!("cannot construct {t}")))
}

/// Sets a key on a dict or record literal, converting the value to the
/// container's element or field type.
pub(crate) fn set_key(l: &mut Lit, key: &str, val: Lit) -> Result<(), Error> {
    match l {
        Lit::Dict(d) => {
            let val = convert(val, &d.elem)?;
            match d.data.iter_mut().find(|k| k.key == key) {
                Some(k) => k.val = val,
                None => d.data.push(Keyed::new(key, val)),
            }
            Ok(())
        }
        Lit::Rec(r) => {
            let (idx, ft) = match r.typ.param_by_key(key) {
                Some((i, param)) => (i, param.typ.clone()),
                None => return Err(osier_lit::LitError::NoKey(key.into()).into()),
            };
            r.data[idx].val = convert(val, &ft)?;
            Ok(())
        }
        other => Err(Error::other(format!("cannot set key on {}", other.typ()))),
    }
}
