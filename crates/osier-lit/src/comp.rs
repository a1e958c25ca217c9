use crate::convert::convert;
use crate::Lit;
use osier_types::{compare, Cmp};

/// Strict equality: equal types and equal values.
pub fn equal(a: &Lit, b: &Lit) -> bool {
    a.typ().equal(&b.typ()) && same_value(a, b)
}

/// Equivalence: the literals are equal after converting one side to the
/// other's type, when their types are comparable.
pub fn equiv(a: &Lit, b: &Lit) -> bool {
    match comparable(a, b) {
        Some((a, b)) => same_value(&a, &b),
        None => false,
    }
}

/// Whether `a` is strictly less than `b`; `None` when the types are not
/// ordered or not comparable.
pub fn less(a: &Lit, b: &Lit) -> Option<bool> {
    comp(a, b).map(|(less, _)| less)
}

/// Ordering comparison: `(less, same)` for ordered, comparable literals.
pub fn comp(a: &Lit, b: &Lit) -> Option<(bool, bool)> {
    if !a.typ().ordered() || !b.typ().ordered() {
        return None;
    }
    let (a, b) = comparable(a, b)?;
    if let (Some(x), Some(y)) = (a.num(), b.num()) {
        return Some((x < y, x == y));
    }
    if let (Some(x), Some(y)) = (a.text(), b.text()) {
        return Some((x < y, x == y));
    }
    None
}

/// Converts the pair onto a common type when their types are close enough
/// to compare.
fn comparable(a: &Lit, b: &Lit) -> Option<(Lit, Lit)> {
    let mut cmp = compare(&a.typ(), &b.typ());
    if cmp < Cmp::Comp {
        cmp = cmp.mirror();
        if cmp < Cmp::Comp {
            return None;
        }
        // the other direction converts; compare on a's type instead
        let bb = convert(b.clone(), &a.typ()).ok()?;
        return Some((a.clone(), bb));
    }
    if cmp == Cmp::Same {
        return Some((a.clone(), b.clone()));
    }
    let aa = convert(a.clone(), &b.typ()).ok()?;
    Some((aa, b.clone()))
}

fn same_value(a: &Lit, b: &Lit) -> bool {
    match (a, b) {
        (Lit::Some(x), _) => same_value(x, b),
        (_, Lit::Some(y)) => same_value(a, y),
        (Lit::Nil, Lit::Nil) => true,
        (Lit::Bool(x), Lit::Bool(y)) => x == y,
        (Lit::Raw(x), Lit::Raw(y)) => x == y,
        (Lit::Uuid(x), Lit::Uuid(y)) => x == y,
        (Lit::List(x), Lit::List(y)) => {
            x.data.len() == y.data.len()
                && x.data.iter().zip(&y.data).all(|(a, b)| same_value(a, b))
        }
        (Lit::Dict(x), Lit::Dict(y)) => {
            x.data.len() == y.data.len()
                && x.data
                    .iter()
                    .zip(&y.data)
                    .all(|(a, b)| a.key == b.key && same_value(&a.val, &b.val))
        }
        (Lit::Rec(x), Lit::Rec(y)) => {
            x.data.len() == y.data.len()
                && x.data
                    .iter()
                    .zip(&y.data)
                    .all(|(a, b)| a.key == b.key && same_value(&a.val, &b.val))
        }
        _ => {
            if let (Some(x), Some(y)) = (a.num(), b.num()) {
                return x == y;
            }
            if let (Some(x), Some(y)) = (a.text(), b.text()) {
                return x == y;
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::List;

    #[test]
    fn strict_equality_minds_types() {
        assert!(equal(&Lit::Int(1), &Lit::Int(1)));
        assert!(!equal(&Lit::Int(1), &Lit::Num(1.0)));
        assert!(!equal(&Lit::Int(1), &Lit::Int(2)));
    }

    #[test]
    fn equivalence_converts() {
        assert!(equiv(&Lit::Int(1), &Lit::Num(1.0)));
        assert!(equiv(&Lit::Num(1.0), &Lit::Int(1)));
        assert!(!equiv(&Lit::Int(1), &Lit::Num(2.0)));
        assert!(!equiv(&Lit::Int(1), &Lit::Str("1".into())));
        assert!(equiv(&Lit::Char("a".into()), &Lit::Str("a".into())));
    }

    #[test]
    fn list_equality() {
        let a = Lit::List(List::any(vec![Lit::Num(1.0), Lit::Num(2.0)]));
        let b = Lit::List(List::any(vec![Lit::Num(1.0), Lit::Num(2.0)]));
        let c = Lit::List(List::any(vec![Lit::Num(2.0), Lit::Num(1.0)]));
        assert!(equal(&a, &b));
        assert!(!equal(&a, &c));
    }

    #[test]
    fn ordering() {
        assert_eq!(less(&Lit::Num(1.0), &Lit::Num(2.0)), Some(true));
        assert_eq!(less(&Lit::Num(2.0), &Lit::Num(1.0)), Some(false));
        assert_eq!(less(&Lit::Int(1), &Lit::Num(2.0)), Some(true));
        assert_eq!(less(&Lit::Str("a".into()), &Lit::Str("b".into())), Some(true));
        assert_eq!(less(&Lit::List(List::any(vec![])), &Lit::Num(1.0)), None);
    }

    #[test]
    fn comp_reports_sameness() {
        assert_eq!(comp(&Lit::Num(1.0), &Lit::Num(1.0)), Some((false, true)));
        assert_eq!(comp(&Lit::Bool(false), &Lit::Bool(true)), Some((true, false)));
    }
}
