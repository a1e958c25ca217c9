use crate::el::{Call, Dyn, El, Named};
use crate::env::Scope;
use crate::error::Error;
use crate::prog::Prog;
use crate::spec::is_variadic;
use osier_lit::{convert, List, Lit};
use osier_types::{compare, is_magic, Cmp, Param, Type};
use smol_str::SmolStr;
use std::collections::VecDeque;

// A layout maps a flat argument sequence onto a signature's parameters.
// The magic parameter names direct consumption:
//
//    plain          any number of plain elements
//    rest           plain, tag and declaration elements until exhaustion
//    args, tail     leading plain elements, then tags
//    tags           tag elements
//    decls          declaration elements
//    unis           declarations with at most one argument each
//
// Explicit parameters appear before the first magic one and consume exactly
// one plain element each.

/// Builds the argument groups for a parameter list, one group per param.
pub fn layout_args(params: &[Param], args: Vec<El>) -> Result<Vec<Vec<El>>, Error> {
    check_sig(params)?;
    let mut q: VecDeque<El> = args.into();
    if params.is_empty() {
        if let Some(el) = q.front() {
            return Err(Error::layout(format!("unexpected argument {el}")));
        }
        return Ok(Vec::new());
    }
    let mut res = Vec::with_capacity(params.len());
    let mut ended = false;
    for p in params {
        let mut tmp = Vec::new();
        if !ended {
            match p.key().as_str() {
                "plain" => consume_plain(&mut q, &mut tmp),
                "rest" => {
                    while !q.is_empty() {
                        let before = q.len();
                        consume_plain(&mut q, &mut tmp);
                        consume_tags(&mut q, &mut tmp);
                        consume_decls(&mut q, &mut tmp);
                        if q.len() == before {
                            break;
                        }
                    }
                }
                "args" | "tail" => {
                    consume_plain(&mut q, &mut tmp);
                    consume_tags(&mut q, &mut tmp);
                }
                "tags" => consume_tags(&mut q, &mut tmp),
                "decls" => consume_decls(&mut q, &mut tmp),
                "unis" => consume_unis(&mut q, &mut tmp),
                _ => match q.front() {
                    None => {
                        if !p.is_opt() {
                            return Err(Error::layout(format!(
                                "missing argument for {}",
                                p.name
                            )));
                        }
                    }
                    Some(front) => {
                        if is_special(front, ":+-;").is_some() {
                            if !p.is_opt() {
                                ended = true;
                            }
                        } else {
                            tmp.push(q.pop_front().unwrap());
                        }
                    }
                },
            }
        }
        res.push(tmp);
    }
    if let Some(el) = q.front() {
        return Err(Error::layout(format!("unexpected tail element {el}")));
    }
    Ok(res)
}

/// Signature-shape constraints, enforced once per layout.
fn check_sig(params: &[Param]) -> Result<(), Error> {
    let mut seen: Vec<SmolStr> = Vec::new();
    let mut last_magic = "";
    let mut magic_started = false;
    for p in params {
        let key = p.key();
        if !is_magic(&key) {
            if magic_started {
                return Err(Error::layout(format!(
                    "explicit parameter {} after a magic parameter",
                    p.name
                )));
            }
            continue;
        }
        magic_started = true;
        if seen.contains(&key) {
            return Err(Error::layout(format!("duplicate magic parameter {key}")));
        }
        if matches!(key.as_str(), "plain" | "rest") && matches!(last_magic, "args" | "tail") {
            return Err(Error::layout(format!("{key} cannot follow {last_magic}")));
        }
        if key == "unis" && seen.iter().any(|s| s == "decls")
            || key == "decls" && seen.iter().any(|s| s == "unis")
        {
            return Err(Error::layout("only one of unis or decls".to_string()));
        }
        last_magic = match key.as_str() {
            "plain" => "plain",
            "rest" => "rest",
            "args" => "args",
            "tail" => "tail",
            "tags" => "tags",
            "decls" => "decls",
            _ => "unis",
        };
        seen.push(key);
    }
    Ok(())
}

// ── Consumption ──────────────────────────────────────────────────

struct Special {
    name: SmolStr,
    args: Vec<El>,
    closed: bool,
}

/// Classifies tag- and declaration-shaped elements: a named group, a dyn
/// whose head is a marker symbol, or a bare marker symbol.
fn is_special(el: &El, pre: &str) -> Option<Special> {
    let starts = |name: &str| {
        name.chars()
            .next()
            .is_some_and(|c| pre.contains(c))
    };
    match el {
        El::Named(n) => {
            if n.name.is_empty() || !starts(&n.name) {
                return None;
            }
            match &n.el {
                None => Some(Special {
                    name: n.name.clone(),
                    args: Vec::new(),
                    closed: false,
                }),
                Some(b) => match b.as_ref() {
                    El::Dyn(d) => Some(Special {
                        name: n.name.clone(),
                        args: d.els.clone(),
                        closed: true,
                    }),
                    el => Some(Special {
                        name: n.name.clone(),
                        args: vec![el.clone()],
                        closed: true,
                    }),
                },
            }
        }
        El::Sym(s) if starts(&s.name) => Some(Special {
            name: s.name.clone(),
            args: Vec::new(),
            closed: false,
        }),
        El::Dyn(d) => {
            let head = d.els.first()?;
            let name = match head {
                El::Sym(s) if starts(&s.name) => s.name.clone(),
                El::Named(n) if n.el.is_none() && starts(&n.name) => n.name.clone(),
                _ => return None,
            };
            Some(Special {
                name,
                args: d.els[1..].to_vec(),
                closed: true,
            })
        }
        _ => None,
    }
}

fn consume_arg(q: &mut VecDeque<El>) -> Option<El> {
    if let Some(front) = q.front() {
        if is_special(front, ":+-;").is_none() {
            return q.pop_front();
        }
    }
    None
}

fn consume_plain(q: &mut VecDeque<El>, res: &mut Vec<El>) {
    while let Some(el) = consume_arg(q) {
        res.push(el);
    }
}

fn consume_tag(q: &mut VecDeque<El>) -> Option<El> {
    let front = q.front()?;
    let sp = is_special(front, ":+-;")?;
    if !sp.name.starts_with(':') {
        return None;
    }
    q.pop_front();
    let mut tag = Named::new(sp.name, None);
    if sp.closed {
        let mut inner: VecDeque<El> = sp.args.into();
        let mut els = Vec::new();
        consume_plain(&mut inner, &mut els);
        consume_tags(&mut inner, &mut els);
        consume_decls(&mut inner, &mut els);
        tag.el = Some(Box::new(El::Dyn(Dyn {
            els,
            src: Default::default(),
        })));
    } else {
        tag.el = consume_arg(q).map(Box::new);
    }
    Some(El::Named(tag))
}

fn consume_tags(q: &mut VecDeque<El>, res: &mut Vec<El>) {
    while let Some(el) = consume_tag(q) {
        res.push(el);
    }
}

fn consume_decl(q: &mut VecDeque<El>, uni: bool) -> Option<El> {
    let front = q.front()?;
    let sp = is_special(front, "+-;")?;
    if sp.name.starts_with(';') {
        // naked terminator closes the declaration list
        q.pop_front();
        return None;
    }
    q.pop_front();
    let mut d = Named::new(sp.name, None);
    let mut els = Vec::new();
    if sp.closed {
        let mut inner: VecDeque<El> = sp.args.into();
        consume_plain(&mut inner, &mut els);
        consume_tags(&mut inner, &mut els);
        consume_decls(&mut inner, &mut els);
        d.el = Some(Box::new(El::Dyn(Dyn {
            els,
            src: Default::default(),
        })));
        return Some(El::Named(d));
    } else if uni {
        d.el = consume_arg(q).map(Box::new);
        return Some(El::Named(d));
    } else {
        consume_plain(q, &mut els);
        consume_tags(q, &mut els);
    }
    d.el = match els.len() {
        0 => None,
        1 => Some(Box::new(els.into_iter().next().unwrap())),
        _ => Some(Box::new(El::Dyn(Dyn {
            els,
            src: Default::default(),
        }))),
    };
    Some(El::Named(d))
}

fn consume_decls(q: &mut VecDeque<El>, res: &mut Vec<El>) {
    while let Some(el) = consume_decl(q, false) {
        res.push(el);
    }
}

fn consume_unis(q: &mut VecDeque<El>, res: &mut Vec<El>) {
    while let Some(el) = consume_decl(q, true) {
        res.push(el);
    }
}

// ── Group views ──────────────────────────────────────────────────

/// Views a group as tags, wrapping plain elements as unnamed tags.
pub fn tags(args: &[El]) -> Vec<Named> {
    args.iter()
        .map(|el| match el {
            El::Named(n) if n.is_tag() => n.clone(),
            el => Named::new("", Some(el.clone())),
        })
        .collect()
}

/// Views a group as declarations; anything else is an error.
pub fn decls(args: &[El]) -> Result<Vec<Named>, Error> {
    args.iter()
        .map(|el| match el {
            El::Named(n) if !n.is_tag() => Ok(n.clone()),
            el => Err(Error::layout(format!("unexpected declaration element {el}"))),
        })
        .collect()
}

/// Views a group as single-argument declarations. Naked declarations chain:
/// in `+a +b 5` both receive the literal.
pub fn unis(args: &[El]) -> Result<Vec<Named>, Error> {
    let mut res: Vec<Named> = Vec::with_capacity(args.len());
    let mut naked = 0usize;
    for arg in args {
        match arg {
            El::Named(n) if !n.is_tag() => {
                res.push(n.clone());
                if n.el.is_none() {
                    naked += 1;
                    continue;
                }
                let share = n.el.clone();
                while naked > 0 {
                    let idx = res.len() - naked - 1;
                    res[idx].el = share.clone();
                    naked -= 1;
                }
            }
            el => {
                if naked == 0 {
                    return Err(Error::layout(format!("unexpected uni element {el}")));
                }
                while naked > 0 {
                    let idx = res.len() - naked;
                    res[idx].el = Some(Box::new(el.clone()));
                    naked -= 1;
                }
            }
        }
    }
    Ok(res)
}

// ── Group resolution ─────────────────────────────────────────────

/// Resolves every argument group against the call's instantiated signature.
/// Magic groups resolve with the signature's element type as hint, explicit
/// parameters with their parameter type. Returns whether anything stayed
/// unresolved.
pub fn resl_groups(p: &mut Prog, env: &Scope, c: &mut Call) -> Result<bool, Error> {
    let params = c.spec.args().to_vec();
    let sig_args = c.sig.args().to_vec();
    let mut unres = false;
    for (i, param) in params.iter().enumerate() {
        let hint = sig_args
            .get(i)
            .map(|p| p.typ.clone())
            .unwrap_or(Type::VOID);
        let group = std::mem::take(&mut c.groups[i]);
        if group.is_empty() {
            continue;
        }
        if is_magic(&param.key()) {
            let eh = if hint.kind.elem().is_cont() {
                hint.elem()
            } else {
                Type::VOID
            };
            let (els, u) = p.resolve_all(env, group, &eh)?;
            unres |= u;
            c.groups[i] = els;
        } else {
            let mut it = group.into_iter();
            let el = it.next().unwrap();
            let mut rest: Vec<El> = it.collect();
            let el = match p.resolve(env, el, &hint) {
                Ok(el) => {
                    let ht = p.ctx.apply(&hint);
                    let et = el.res_typ();
                    if ht.kind != osier_types::Kind::VOID
                        && !ht.is_var()
                        && !et.is_var()
                        && compare(&et, &ht) < Cmp::Check
                    {
                        return Err(Error::layout(format!("cannot use {et} as {ht}")));
                    }
                    el
                }
                Err(Error::Unres(b)) => {
                    unres = true;
                    *b
                }
                Err(e) => return Err(e),
            };
            let mut g = vec![el];
            g.append(&mut rest);
            c.groups[i] = g;
        }
    }
    Ok(unres)
}

// ── Function argument matching ───────────────────────────────────

/// Matches call arguments to a function signature's named parameters.
///
/// Positional tags fill parameters in order; once a named tag appears no
/// further positional arguments are allowed. The naked tag `::` and excess
/// positional arguments accumulate on a variadic last parameter.
pub fn func_layout(sig: &Type, els: Vec<El>) -> Result<Vec<Vec<El>>, Error> {
    let pre = layout_args(&[Param::new("args?", Type::LIST)], els)?;
    let tags = tags(pre.first().map(|g| g.as_slice()).unwrap_or(&[]));
    let params = sig.args();
    if params.is_empty() {
        if !tags.is_empty() {
            return Err(Error::layout(format!("unexpected arguments for {sig}")));
        }
        return Ok(Vec::new());
    }
    let vari = is_variadic(params);
    let mut tagged = false;
    let mut groups: Vec<Vec<El>> = vec![Vec::new(); params.len()];
    for (i, tag) in tags.iter().enumerate() {
        let arg = match &tag.el {
            Some(b) => (**b).clone(),
            None => El::void(),
        };
        let mut idx = i;
        if tag.name.is_empty() {
            if tagged {
                return Err(Error::layout(format!(
                    "positional argument after named tag in {sig}"
                )));
            }
            if idx >= groups.len() {
                if vari {
                    let last = groups.len() - 1;
                    groups[last].push(arg);
                    continue;
                }
                return Err(Error::layout(format!("unexpected arguments for {sig}")));
            }
        } else if tag.name == "::" {
            if vari {
                let last = groups.len() - 1;
                groups[last].push(arg);
                continue;
            }
            return Err(Error::layout(format!("unexpected arguments for {sig}")));
        } else {
            tagged = true;
            idx = sig
                .param_by_key(&tag.key())
                .ok_or_else(|| Error::layout(format!("unknown parameter {}", tag.name)))?
                .0;
        }
        if !groups[idx].is_empty() {
            return Err(Error::layout(format!(
                "duplicate parameter {}",
                params[idx].name
            )));
        }
        groups[idx].push(arg);
    }
    for (i, p) in params.iter().enumerate() {
        if groups[i].is_empty() && !p.is_opt() {
            return Err(Error::layout(format!(
                "missing non-optional parameter {}",
                p.name
            )));
        }
    }
    Ok(groups)
}

/// Resolves function call arguments against the instantiated signature.
pub fn resl_func_args(p: &mut Prog, env: &Scope, c: &mut Call) -> Result<bool, Error> {
    let sig_args = c.sig.args().to_vec();
    let vari = is_variadic(&sig_args);
    let mut unres = false;
    for (i, param) in sig_args.iter().enumerate() {
        let group = std::mem::take(&mut c.groups[i]);
        if group.is_empty() {
            continue;
        }
        if i == sig_args.len() - 1 && vari && group.len() > 1 {
            let (els, u) = p.resolve_all(env, group, &param.typ.elem())?;
            unres |= u;
            c.groups[i] = els;
            break;
        }
        if group.len() > 1 {
            return Err(Error::layout(format!(
                "multiple arguments for non-variadic parameter {}",
                param.name
            )));
        }
        let el = group.into_iter().next().unwrap();
        match p.resolve(env, el, &param.typ) {
            Ok(el) => c.groups[i] = vec![el],
            Err(Error::Unres(b)) => {
                unres = true;
                c.groups[i] = vec![*b];
            }
            Err(e) => return Err(e),
        }
    }
    Ok(unres)
}

/// Evaluates function call arguments to literals, converting each to its
/// parameter type; variadic extras collapse into a list.
pub fn eval_func_args(p: &mut Prog, env: &Scope, c: &mut Call) -> Result<bool, Error> {
    let sig_args = c.sig.args().to_vec();
    let vari = is_variadic(&sig_args);
    let mut unres = false;
    for (i, param) in sig_args.iter().enumerate() {
        let group = std::mem::take(&mut c.groups[i]);
        if group.is_empty() {
            continue;
        }
        let pt = p.ctx.apply(&param.typ);
        if i == sig_args.len() - 1 && vari && group.len() > 1 {
            let et = pt.elem();
            let (els, u) = p.resolve_all(env, group, &et)?;
            if u {
                unres = true;
                c.groups[i] = els;
                continue;
            }
            let mut data = Vec::with_capacity(els.len());
            for el in els {
                let lit = el
                    .as_lit()
                    .cloned()
                    .ok_or_else(|| Error::other(format!("expected literal, got {el}")))?;
                data.push(convert(lit, &et)?);
            }
            c.groups[i] = vec![El::lit(Lit::List(List::new(et, data)))];
            continue;
        }
        let el = group.into_iter().next().unwrap();
        match p.resolve(env, el, &pt) {
            Ok(el) => {
                if let Some(lit) = el.as_lit() {
                    let conv = convert(lit.clone(), &pt)?;
                    c.groups[i] = vec![El::lit(conv)];
                } else {
                    c.groups[i] = vec![el];
                }
            }
            Err(Error::Unres(b)) => {
                unres = true;
                c.groups[i] = vec![*b];
            }
            Err(e) => return Err(e),
        }
    }
    Ok(unres)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::el::Sym;
    use osier_lit::Lit;

    fn sym(name: &str) -> El {
        El::Sym(Sym::new(name))
    }

    fn num(n: f64) -> El {
        El::lit(Lit::Num(n))
    }

    fn tag(name: &str, el: Option<El>) -> El {
        El::Named(Named::new(name, el))
    }

    fn params(sig: &str) -> Vec<Param> {
        Type::parse(sig).unwrap().args().to_vec()
    }

    #[test]
    fn plain_consumption() {
        let ps = params("<form t plain; @>");
        let groups = layout_args(&ps, vec![num(1.0), num(2.0)]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn explicit_then_plain() {
        let ps = params("<form t a:any plain?:list; @>");
        let groups = layout_args(&ps, vec![num(1.0), num(2.0), num(3.0)]).unwrap();
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 2);
    }

    #[test]
    fn missing_required_errors() {
        let ps = params("<form t a:any; @>");
        assert!(layout_args(&ps, vec![]).is_err());
        let ps = params("<form t a?:any; @>");
        assert!(layout_args(&ps, vec![]).is_ok());
    }

    #[test]
    fn unexpected_tail_errors() {
        let ps = params("<form t a:any; @>");
        assert!(layout_args(&ps, vec![num(1.0), num(2.0)]).is_err());
    }

    #[test]
    fn tags_are_grouped() {
        let ps = params("<form t args?:list; @>");
        let groups = layout_args(
            &ps,
            vec![num(1.0), tag(":x", Some(num(2.0))), tag(":y", None), num(3.0)],
        )
        .unwrap();
        // plain 1, tag x 2, tag y grabbing the trailing 3
        assert_eq!(groups[0].len(), 3);
        let tags = tags(&groups[0]);
        assert_eq!(tags[0].name, "");
        assert_eq!(tags[1].name, ":x");
        assert_eq!(tags[2].name, ":y");
        assert!(tags[2].el.is_some());
    }

    #[test]
    fn bare_tag_sym_consumes_next() {
        let ps = params("<form t tags?:dict; @>");
        let groups = layout_args(&ps, vec![sym(":a"), num(1.0)]).unwrap();
        let tags = tags(&groups[0]);
        assert_eq!(tags.len(), 1);
        assert!(tags[0].el.is_some());
    }

    #[test]
    fn decl_spans() {
        // +a 1 2 +b 3 → a gets (1 2), b gets 3
        let ps = params("<form t decls?:dict; @>");
        let groups = layout_args(
            &ps,
            vec![
                tag("+a", None),
                num(1.0),
                num(2.0),
                tag("+b", None),
                num(3.0),
            ],
        )
        .unwrap();
        let ds = decls(&groups[0]).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds[0].args().len(), 2);
        assert_eq!(ds[1].args().len(), 1);
    }

    #[test]
    fn naked_unis_chain() {
        // +a +b 5 → both a and b get 5
        let ps = params("<form t unis?:dict; @>");
        let groups = layout_args(&ps, vec![tag("+a", None), tag("+b", None), num(5.0)]).unwrap();
        let us = unis(&groups[0]).unwrap();
        assert_eq!(us.len(), 2);
        assert!(us[0].el.is_some());
        assert!(us[1].el.is_some());
        assert_eq!(us[0].arg().unwrap().as_lit(), Some(&Lit::Num(5.0)));
    }

    #[test]
    fn terminator_closes_decl() {
        // +a 1 ; 2 → decl a gets 1, then plain 2 remains for later params
        let ps = params("<form t decls?:dict plain?:list; @>");
        let groups = layout_args(
            &ps,
            vec![tag("+a", None), num(1.0), sym(";"), num(2.0)],
        )
        .unwrap();
        assert_eq!(decls(&groups[0]).unwrap().len(), 1);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn sig_constraints() {
        assert!(layout_args(&params("<form t plain; @>"), vec![]).is_ok());
        // duplicate magic name
        let bad = vec![
            Param::new("plain", Type::VOID),
            Param::new("plain", Type::VOID),
        ];
        assert!(layout_args(&bad, vec![]).is_err());
        // plain cannot follow args
        let bad = vec![
            Param::new("args", Type::VOID),
            Param::new("plain", Type::VOID),
        ];
        assert!(layout_args(&bad, vec![]).is_err());
        // at most one of unis/decls
        let bad = vec![
            Param::new("unis", Type::VOID),
            Param::new("decls", Type::VOID),
        ];
        assert!(layout_args(&bad, vec![]).is_err());
        // explicit params must come first
        let bad = vec![
            Param::new("plain", Type::VOID),
            Param::new("x", Type::ANY),
        ];
        assert!(layout_args(&bad, vec![]).is_err());
    }

    #[test]
    fn func_layout_positional_and_named() {
        let sig = Type::parse("<func f a:num b?:num; num>").unwrap();
        let groups = func_layout(&sig, vec![num(1.0), num(2.0)]).unwrap();
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 1);

        // named b without positional a leaves a missing
        let groups = func_layout(&sig, vec![tag(":b", Some(num(1.0)))]);
        assert!(groups.is_err());

        let groups = func_layout(&sig, vec![num(1.0), tag(":b", Some(num(2.0)))]).unwrap();
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn func_layout_rejects_positional_after_named() {
        let sig = Type::parse("<func f a:num b:num; num>").unwrap();
        let err = func_layout(
            &sig,
            vec![tag(":a", Some(num(1.0))), num(2.0)],
        );
        assert!(err.is_err());
    }

    #[test]
    fn func_layout_variadic_collects() {
        let sig = Type::parse("<func f a:num rest:list|num; num>").unwrap();
        let groups = func_layout(&sig, vec![num(1.0), num(2.0), num(3.0), num(4.0)]).unwrap();
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 3);
    }

    #[test]
    fn func_layout_duplicate_tag_errors() {
        let sig = Type::parse("<func f a:num; num>").unwrap();
        let err = func_layout(
            &sig,
            vec![tag(":a", Some(num(1.0))), tag(":a", Some(num(2.0)))],
        );
        assert!(err.is_err());
    }
}
