use crate::error::LitError;
use crate::{Dict, Keyed, List, Lit, Rec};
use osier_types::{Kind, Type};
use smol_str::SmolStr;

/// Converts a literal to the given type, or fails with a conversion error.
///
/// `void` and `any` targets leave the literal untouched. An optional target
/// wraps the converted value; `null` converts to the target's zero value.
pub fn convert(l: Lit, t: &Type) -> Result<Lit, LitError> {
    let k = t.kind.elem();
    if k == Kind::VOID || k == Kind::ANY && !t.is_opt() {
        return Ok(l);
    }
    if t.is_opt() {
        if matches!(l, Lit::Nil) {
            return Ok(Lit::Nil);
        }
        let inner = convert(l, &t.deopt())?;
        return Ok(Lit::Some(Box::new(inner)));
    }
    let l = match l {
        Lit::Some(inner) => *inner,
        Lit::Nil => return Ok(Lit::zero(t)),
        l => l,
    };
    if l.typ().equal(t) {
        return Ok(l);
    }
    let fail = |l: &Lit| LitError::Convert(l.typ().to_string(), t.to_string());
    match k {
        Kind::NUM | Kind::INT | Kind::REAL | Kind::BOOL | Kind::SPAN | Kind::TIME => {
            let n = l.num().ok_or_else(|| fail(&l))?;
            Ok(match k {
                Kind::NUM => Lit::Num(n),
                Kind::INT => Lit::Int(n as i64),
                Kind::REAL => Lit::Real(n),
                Kind::BOOL => Lit::Bool(n != 0.0),
                Kind::SPAN => Lit::Span(n as i64),
                _ => Lit::Time(n as i64),
            })
        }
        Kind::CHAR | Kind::STR => {
            let s = l.text().ok_or_else(|| fail(&l))?;
            Ok(if k == Kind::CHAR {
                Lit::Char(s)
            } else {
                Lit::Str(s)
            })
        }
        Kind::RAW => {
            let s = l.text().ok_or_else(|| fail(&l))?;
            Ok(Lit::Raw(s.as_bytes().to_vec()))
        }
        Kind::IDXR | Kind::LIST => {
            let elem = t.elem();
            let data = match l {
                Lit::List(list) => list.data,
                ref other => return Err(fail(other)),
            };
            let data = data
                .into_iter()
                .map(|el| convert(el, &elem))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Lit::List(List::new(elem, data)))
        }
        Kind::KEYR | Kind::DICT => {
            let elem = t.elem();
            let data = match l {
                Lit::Dict(dict) => dict.data,
                Lit::Rec(rec) => rec.data,
                ref other => return Err(fail(other)),
            };
            let data = data
                .into_iter()
                .map(|k| Ok(Keyed::new(k.key, convert(k.val, &elem)?)))
                .collect::<Result<Vec<_>, LitError>>()?;
            Ok(Lit::Dict(Dict::new(elem, data)))
        }
        Kind::REC => {
            let fields = t.params();
            match l {
                Lit::List(list) => {
                    if list.data.len() > fields.len() {
                        return Err(LitError::Convert(
                            Lit::List(list).typ().to_string(),
                            t.to_string(),
                        ));
                    }
                    let mut data = Vec::with_capacity(fields.len());
                    let mut vals = list.data.into_iter();
                    for p in fields {
                        let val = match vals.next() {
                            Some(v) => convert(v, &p.typ)?,
                            None => Lit::zero(&p.typ),
                        };
                        data.push(Keyed::new(p.key(), val));
                    }
                    Ok(Lit::Rec(Rec {
                        typ: t.clone(),
                        data,
                    }))
                }
                Lit::Dict(dict) => {
                    let mut data: Vec<Keyed> = fields
                        .iter()
                        .map(|p| Keyed::new(p.key(), Lit::zero(&p.typ)))
                        .collect();
                    for k in dict.data {
                        let p = t
                            .param_by_key(&k.key)
                            .ok_or_else(|| LitError::NoKey(k.key.to_string()))?;
                        let idx = p.0;
                        data[idx].val = convert(k.val, &p.1.typ)?;
                    }
                    Ok(Lit::Rec(Rec {
                        typ: t.clone(),
                        data,
                    }))
                }
                ref other => Err(fail(other)),
            }
        }
        _ => Err(fail(&l)),
    }
}

/// Converts a literal to text, as `cat` and string construction see it.
pub fn to_text(l: &Lit) -> SmolStr {
    match l.text() {
        Some(s) => s,
        None => SmolStr::new(l.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_conversions() {
        assert_eq!(convert(Lit::Num(7.0), &Type::INT).unwrap(), Lit::Int(7));
        assert_eq!(convert(Lit::Int(7), &Type::NUM).unwrap(), Lit::Num(7.0));
        assert_eq!(convert(Lit::Num(7.0), &Type::REAL).unwrap(), Lit::Real(7.0));
        assert_eq!(convert(Lit::Num(2.0), &Type::BOOL).unwrap(), Lit::Bool(true));
        assert!(convert(Lit::Str("x".into()), &Type::INT).is_err());
    }

    #[test]
    fn text_conversions() {
        assert_eq!(
            convert(Lit::Char("abc".into()), &Type::STR).unwrap(),
            Lit::Str("abc".into())
        );
        assert_eq!(
            convert(Lit::Char("abc".into()), &Type::RAW).unwrap(),
            Lit::Raw(b"abc".to_vec())
        );
    }

    #[test]
    fn nil_and_optionals() {
        assert_eq!(convert(Lit::Nil, &Type::TIME).unwrap(), Lit::Time(0));
        assert_eq!(
            convert(Lit::Num(1.0), &Type::INT.opt()).unwrap(),
            Lit::Some(Box::new(Lit::Int(1)))
        );
        assert_eq!(convert(Lit::Nil, &Type::INT.opt()).unwrap(), Lit::Nil);
        assert_eq!(
            convert(Lit::Some(Box::new(Lit::Num(1.0))), &Type::INT).unwrap(),
            Lit::Int(1)
        );
    }

    #[test]
    fn list_element_conversion() {
        let l = Lit::List(List::any(vec![Lit::Num(1.0), Lit::Num(2.0)]));
        let out = convert(l, &Type::list(Type::INT)).unwrap();
        assert_eq!(
            out,
            Lit::List(List::new(Type::INT, vec![Lit::Int(1), Lit::Int(2)]))
        );
    }

    #[test]
    fn list_to_record() {
        let t = Type::rec(
            "",
            vec![osier_types::Param::new("a", Type::INT)],
        );
        let out = convert(Lit::List(List::any(vec![Lit::Num(1.0)])), &t).unwrap();
        assert_eq!(out.key("a").unwrap(), &Lit::Int(1));
    }

    #[test]
    fn any_and_void_pass_through() {
        assert_eq!(convert(Lit::Int(3), &Type::ANY).unwrap(), Lit::Int(3));
        assert_eq!(convert(Lit::Int(3), &Type::VOID).unwrap(), Lit::Int(3));
    }
}
