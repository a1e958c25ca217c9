use crate::el::Val;
use crate::error::Error;
use osier_types::Type;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::rc::Rc;

/// A definition: its resolved type, and a value once one is known.
#[derive(Clone, Debug)]
pub struct Def {
    pub typ: Type,
    pub val: Option<Val>,
}

impl Def {
    pub fn typed(typ: Type) -> Def {
        Def { typ, val: None }
    }

    pub fn val(val: Val) -> Def {
        Def {
            typ: val.typ(),
            val: Some(val),
        }
    }

    pub fn lit(l: osier_lit::Lit) -> Def {
        Def::val(Val::Lit(l))
    }

    /// A definition naming a type, e.g. the builtin `~int`.
    pub fn typ_val(t: Type) -> Def {
        Def {
            typ: Type::TYP,
            val: Some(Val::Typ(t)),
        }
    }
}

/// A scope in the environment chain. Scopes are cheap to clone and share
/// their bindings; `def` appends so `let` can grow a scope while resolving
/// its own bindings.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

struct ScopeInner {
    binds: RefCell<Vec<(SmolStr, Def)>>,
    parent: Option<Scope>,
    // symbol prefixes this scope answers for, e.g. "~"
    prefixes: &'static str,
}

impl Scope {
    pub fn new(parent: Option<Scope>) -> Scope {
        Scope::with_prefixes(parent, "")
    }

    pub fn with_prefixes(parent: Option<Scope>, prefixes: &'static str) -> Scope {
        Scope(Rc::new(ScopeInner {
            binds: RefCell::new(Vec::new()),
            parent,
            prefixes,
        }))
    }

    pub fn child(&self) -> Scope {
        Scope::new(Some(self.clone()))
    }

    pub fn parent(&self) -> Option<Scope> {
        self.0.parent.clone()
    }

    pub fn def(&self, name: impl Into<SmolStr>, def: Def) {
        self.0.binds.borrow_mut().push((name.into(), def));
    }

    /// Looks up a name in this scope only.
    pub fn get(&self, name: &str) -> Option<Def> {
        let binds = self.0.binds.borrow();
        binds
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, d)| d.clone())
    }

    /// Looks up a name, walking parent scopes.
    pub fn lookup(&self, name: &str) -> Option<Def> {
        let mut cur = Some(self.clone());
        while let Some(s) = cur {
            if let Some(d) = s.get(name) {
                return Some(d);
            }
            cur = s.parent();
        }
        None
    }

    /// Looks up a prefixed symbol in the scopes that declare support for
    /// its prefix.
    pub fn lookup_prefix(&self, sym: &str, prefix: char) -> Option<Def> {
        let mut cur = Some(self.clone());
        while let Some(s) = cur {
            if s.0.prefixes.contains(prefix) {
                if let Some(d) = s.get(sym) {
                    return Some(d);
                }
            }
            cur = s.parent();
        }
        None
    }
}

/// The result of symbol dispatch: the definition, the name that resolved,
/// and a remaining selector path.
#[derive(Clone, Debug)]
pub struct Found {
    pub def: Def,
    pub name: SmolStr,
    pub path: SmolStr,
}

/// Routes a symbol to its definition.
///
/// The first character dispatches: `~`, `$` and `/` route to a scope that
/// declares the prefix. Each extra leading `.` climbs one parent; the `.`
/// binding of that scope alone then answers, with the rest as a selector
/// path — unless a `?` follows the dots, which walks parent scopes instead.
/// Anything else walks the scope chain, splitting a trailing `.path`
/// selector.
pub fn find_def(env: &Scope, sym: &str) -> Result<Option<Found>, Error> {
    let Some(first) = sym.chars().next() else {
        return Err(Error::other("empty symbol"));
    };
    match first {
        '~' | '$' | '/' => Ok(env.lookup_prefix(sym, first).map(|def| Found {
            def,
            name: sym.into(),
            path: SmolStr::default(),
        })),
        '.' => {
            let mut env = env.clone();
            let mut rest = &sym[1..];
            while let Some(r) = rest.strip_prefix('.') {
                rest = r;
                env = env
                    .parent()
                    .ok_or_else(|| Error::other(format!("no scope for symbol {sym}")))?;
            }
            let (rest, walk) = match rest.strip_prefix('?') {
                Some(r) => (r, true),
                None => (rest, false),
            };
            let def = if walk { env.lookup(".") } else { env.get(".") };
            Ok(def.map(|def| Found {
                def,
                name: ".".into(),
                path: rest.into(),
            }))
        }
        _ => {
            let (head, path) = match sym.find('.') {
                Some(i) if i > 0 => (&sym[..i], &sym[i + 1..]),
                _ => (sym, ""),
            };
            Ok(env.lookup(head).map(|def| Found {
                def,
                name: head.into(),
                path: path.into(),
            }))
        }
    }
}

/// Selects a nested type by a dotted path: numeric segments index params
/// (or take a container's element type), names look up fields by key.
pub fn select_typ(t: &Type, path: &str) -> Option<Type> {
    let mut cur = t.clone();
    for seg in path.split('.') {
        if seg.is_empty() {
            continue;
        }
        cur = if let Ok(i) = seg.parse::<i64>() {
            let ps = cur.params();
            if ps.is_empty() {
                let el = cur.elem();
                if el == Type::VOID {
                    return None;
                }
                el
            } else {
                let n = ps.len() as i64;
                let i = if i < 0 { n + i } else { i };
                if i < 0 || i >= n {
                    return None;
                }
                ps[i as usize].typ.clone()
            }
        } else {
            cur.param_by_key(seg)?.1.typ.clone()
        };
    }
    Some(cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osier_lit::Lit;
    use osier_types::Param;

    #[test]
    fn lookup_walks_parents() {
        let root = Scope::new(None);
        root.def("a", Def::lit(Lit::Num(1.0)));
        let child = root.child();
        child.def("b", Def::lit(Lit::Num(2.0)));
        assert!(child.lookup("a").is_some());
        assert!(child.lookup("b").is_some());
        assert!(child.get("a").is_none());
        assert!(root.lookup("b").is_none());
    }

    #[test]
    fn later_defs_shadow() {
        let s = Scope::new(None);
        s.def("x", Def::lit(Lit::Num(1.0)));
        s.def("x", Def::lit(Lit::Num(2.0)));
        let d = s.get("x").unwrap();
        assert_eq!(d.val.unwrap().as_lit(), Some(&Lit::Num(2.0)));
    }

    #[test]
    fn prefix_routing() {
        let root = Scope::with_prefixes(None, "~");
        root.def("~int", Def::typ_val(Type::INT));
        let child = root.child();
        let f = find_def(&child, "~int").unwrap().unwrap();
        assert_eq!(f.def.typ, Type::TYP);
        assert!(find_def(&child, "~nope").unwrap().is_none());
    }

    #[test]
    fn dot_resolution() {
        let root = Scope::new(None);
        let dot = root.child();
        dot.def(".", Def::lit(Lit::Num(7.0)));
        let f = find_def(&dot, ".").unwrap().unwrap();
        assert_eq!(f.path, "");
        let f = find_def(&dot, ".a.b").unwrap().unwrap();
        assert_eq!(f.path, "a.b");
    }

    #[test]
    fn dot_climbing() {
        let outer = Scope::new(None);
        outer.def(".", Def::lit(Lit::Num(1.0)));
        let inner = outer.child();
        inner.def(".", Def::lit(Lit::Num(2.0)));
        // one extra dot skips the inner scope
        let f = find_def(&inner, "..").unwrap().unwrap();
        assert_eq!(f.def.val.unwrap().as_lit(), Some(&Lit::Num(1.0)));
    }

    #[test]
    fn dot_gets_this_scope_only() {
        let dot = Scope::new(None);
        dot.def(".", Def::lit(Lit::Num(1.0)));
        let nested = dot.child();
        // a bare dot does not walk out of the nested scope
        assert!(find_def(&nested, ".").unwrap().is_none());
        assert!(find_def(&nested, ".a").unwrap().is_none());
        // the ? form walks parents
        let f = find_def(&nested, ".?").unwrap().unwrap();
        assert_eq!(f.def.val.unwrap().as_lit(), Some(&Lit::Num(1.0)));
        let f = find_def(&nested, ".?a").unwrap().unwrap();
        assert_eq!(f.path, "a");
    }

    #[test]
    fn path_split() {
        let s = Scope::new(None);
        s.def("a", Def::lit(Lit::Num(1.0)));
        let f = find_def(&s, "a.b.c").unwrap().unwrap();
        assert_eq!(f.name, "a");
        assert_eq!(f.path, "b.c");
    }

    #[test]
    fn type_selection() {
        let rec = Type::rec(
            "p",
            vec![Param::new("x", Type::INT), Param::new("y", Type::STR)],
        );
        assert_eq!(select_typ(&rec, "x"), Some(Type::INT));
        assert_eq!(select_typ(&rec, "1"), Some(Type::STR));
        assert_eq!(select_typ(&rec, "-1"), Some(Type::STR));
        assert_eq!(select_typ(&rec, "z"), None);
        assert_eq!(select_typ(&Type::list(Type::INT), "3"), Some(Type::INT));
    }
}
