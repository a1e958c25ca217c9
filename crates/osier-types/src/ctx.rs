use crate::cmp::{compare, Cmp};
use crate::error::TypeError;
use crate::kind::Kind;
use crate::types::{Info, Param, Type};
use std::collections::HashMap;
use std::sync::Arc;

/// The unification context: allocates type variables and tracks their
/// bindings in a dense substitution indexed by variable id.
#[derive(Default)]
pub struct Ctx {
    // index = var id - 1, value = binding (or None while free)
    binds: Vec<Option<Type>>,
}

/// Picks the first candidate of an alternative type, if any.
pub fn choose(t: &Type) -> Result<Type, TypeError> {
    if t.kind.elem() == Kind::ALT {
        match t.params().first() {
            Some(p) => return Ok(p.typ.clone()),
            None => return Err(TypeError::Immature(t.to_string())),
        }
    }
    Ok(t.clone())
}

impl Ctx {
    pub fn new() -> Self {
        Ctx::default()
    }

    /// Allocates a fresh type variable.
    pub fn fresh(&mut self) -> Type {
        self.binds.push(None);
        Type::var(self.binds.len() as u64)
    }

    /// Allocates a fresh type variable carrying candidate alternatives.
    pub fn fresh_alts(&mut self, alts: Vec<Type>) -> Type {
        self.binds.push(None);
        Type::var_alts(self.binds.len() as u64, alts)
    }

    fn get(&self, id: u64) -> Option<&Type> {
        if id == 0 {
            return None;
        }
        self.binds.get(id as usize - 1).and_then(|b| b.as_ref())
    }

    /// Binds variable `v` to `t`. Fails on non-variables, missing ids and
    /// recursive bindings.
    pub fn bind(&mut self, v: &Type, t: Type) -> Result<(), TypeError> {
        if !v.is_var() {
            return Err(TypeError::NotVar(v.to_string()));
        }
        let id = v.var_id();
        if id == 0 {
            return Err(TypeError::NoId);
        }
        if self.contains(&t, id) {
            return Err(TypeError::Recursive(id));
        }
        if self.binds.len() < id as usize {
            self.binds.resize(id as usize, None);
        }
        self.binds[id as usize - 1] = Some(t);
        Ok(())
    }

    fn unvar(&self, t: &Type) -> (Type, bool) {
        let mut t = t.clone();
        let mut isvar = false;
        while t.is_var() {
            isvar = true;
            match self.get(t.var_id()) {
                Some(b) => t = b.clone(),
                None => break,
            }
        }
        (t, isvar)
    }

    // ── Unification ──────────────────────────────────────────────

    /// Unifies two types and returns the combined type. Variables are bound
    /// as a side effect; alternative lists narrow toward a single candidate.
    pub fn unify(&mut self, a: &Type, b: &Type) -> Result<Type, TypeError> {
        let (a, _) = self.unvar(a);
        let (b, _) = self.unvar(b);
        match (a.is_var(), b.is_var()) {
            (true, true) => {
                if a.var_id() == b.var_id() {
                    return Ok(a);
                }
                self.unify_vars(a, b)
            }
            (true, false) => self.bind_var(a, b),
            (false, true) => self.bind_var(b, a),
            (false, false) => self.unify_concrete(a, b),
        }
    }

    fn unify_vars(&mut self, a: Type, b: Type) -> Result<Type, TypeError> {
        let aa = a.alts();
        let ba = b.alts();
        if !aa.is_empty() && !ba.is_empty() {
            let merged: Vec<Type> = aa
                .iter()
                .map(|p| p.typ.clone())
                .filter(|t| ba.iter().any(|q| compare(t, &q.typ) != Cmp::None))
                .collect();
            if merged.is_empty() {
                return Err(TypeError::NoAlt(a.to_string(), b.to_string()));
            }
            let v = self.fresh_alts(merged);
            self.bind(&a, v.clone())?;
            self.bind(&b, v.clone())?;
            return Ok(v);
        }
        if !aa.is_empty() {
            // keep the candidate list alive on the surviving variable
            self.bind(&b, a.clone())?;
            return Ok(a);
        }
        self.bind(&a, b.clone())?;
        Ok(b)
    }

    fn bind_var(&mut self, v: Type, t: Type) -> Result<Type, TypeError> {
        let alts = v.alts();
        if alts.is_empty() {
            self.bind(&v, t.clone())?;
            return Ok(t);
        }
        if alts.iter().any(|p| p.typ.equal(&t)) {
            self.bind(&v, t.clone())?;
            return Ok(t);
        }
        let compat: Vec<Type> = alts
            .iter()
            .map(|p| p.typ.clone())
            .filter(|alt| compare(alt, &t) != Cmp::None)
            .collect();
        match compat.len() {
            0 => Err(TypeError::NoAlt(v.to_string(), t.to_string())),
            1 => {
                let u = self.unify_concrete(compat.into_iter().next().unwrap(), t)?;
                self.bind(&v, u.clone())?;
                Ok(u)
            }
            _ => {
                let n = self.fresh_alts(compat);
                self.bind(&v, n.clone())?;
                Ok(n)
            }
        }
    }

    fn unify_concrete(&mut self, a: Type, b: Type) -> Result<Type, TypeError> {
        if a.equal(&b) {
            return Ok(a);
        }
        let ka = a.kind.elem();
        let kb = b.kind.elem();
        if ka == Kind::ANY {
            return Ok(b);
        }
        if kb == Kind::ANY {
            return Ok(a);
        }
        if ka == kb {
            if ka.is_cont() && ka != Kind::REC {
                let el = self.unify(&a.elem(), &b.elem())?;
                let mut t = Type::cont(ka, el);
                if a.is_opt() || b.is_opt() {
                    t = t.opt();
                }
                return Ok(t);
            }
            // a bare kind accepts any parameterized refinement of itself
            if a.has_params() != b.has_params() {
                return Ok(if a.has_params() { a } else { b });
            }
            if a.has_params() || b.has_params() {
                if a.name() != b.name() {
                    return Err(TypeError::Mismatch(a.to_string(), b.to_string()));
                }
                let (pa, pb) = (a.params(), b.params());
                if pa.len() != pb.len() {
                    return Err(TypeError::Mismatch(a.to_string(), b.to_string()));
                }
                let mut params = Vec::with_capacity(pa.len());
                for (x, y) in pa.iter().zip(pb) {
                    let t = self.unify(&x.typ, &y.typ)?;
                    params.push(Param::new(x.name.clone(), t));
                }
                return Ok(Type {
                    kind: a.kind,
                    info: Some(Arc::new(Info {
                        name: a.name().into(),
                        params,
                    })),
                });
            }
            // only the optional flag differs
            return Ok(if a.is_opt() { a } else { b });
        }
        // a discriminated kind refines its bare base
        let (ba, bb) = (ka.base(), kb.base());
        if kb == bb && ba.0 & bb.0 == bb.0 {
            return Ok(a);
        }
        if ka == ba && ba.0 & bb.0 == ba.0 {
            return Ok(b);
        }
        Err(TypeError::Mismatch(a.to_string(), b.to_string()))
    }

    // ── Substitution walkers ─────────────────────────────────────

    /// Substitutes every bound variable in `t`, transitively, sharing
    /// already-visited info blocks to survive cyclic record types.
    pub fn apply(&self, t: &Type) -> Type {
        let (t, _) = self.apply_hist(t, &mut Vec::new());
        t
    }

    fn apply_hist(&self, t: &Type, hist: &mut Vec<Type>) -> (Type, bool) {
        let (t, isvar) = self.unvar(t);
        if !t.has_params() {
            return (t, isvar);
        }
        for h in hist.iter().rev() {
            if info_eq(&t, h) {
                return (h.clone(), isvar);
            }
        }
        hist.push(t.clone());
        let mut ps: Option<Vec<Param>> = None;
        for (i, p) in t.params().iter().enumerate() {
            let (pt, changed) = self.apply_hist(&p.typ, hist);
            if changed && ps.is_none() {
                ps = Some(t.params()[..i].to_vec());
            }
            if let Some(v) = &mut ps {
                v.push(Param::new(p.name.clone(), pt));
            }
        }
        hist.pop();
        match ps {
            Some(params) => (
                Type {
                    kind: t.kind,
                    info: Some(Arc::new(Info {
                        name: t.name().into(),
                        params,
                    })),
                },
                true,
            ),
            None => (t, isvar),
        }
    }

    /// Like `apply`, but fails on any remaining free variable unless it
    /// carries alternatives, in which case the first candidate is chosen.
    /// The result is independent of this context.
    pub fn realize(&self, t: &Type) -> Result<Type, TypeError> {
        self.realize_hist(t, &mut Vec::new())
    }

    fn realize_hist(&self, t: &Type, hist: &mut Vec<Type>) -> Result<Type, TypeError> {
        let (mut t, _) = self.unvar(t);
        if t.is_var() {
            if !t.has_params() {
                return Err(TypeError::Immature(t.to_string()));
            }
            t = Type {
                kind: Kind::ALT,
                info: t.info.clone(),
            };
        }
        for h in hist.iter().rev() {
            if info_eq(&t, h) {
                return Ok(h.clone());
            }
        }
        if t.kind.elem() == Kind::ALT {
            t = choose(&t)?;
            return self.realize_hist(&t, hist);
        }
        if !t.has_params() {
            return Ok(t);
        }
        hist.push(t.clone());
        let mut params = Vec::with_capacity(t.params().len());
        for p in t.params() {
            let pt = self.realize_hist(&p.typ, hist)?;
            params.push(Param::new(p.name.clone(), pt));
        }
        hist.pop();
        Ok(Type {
            kind: t.kind,
            info: Some(Arc::new(Info {
                name: t.name().into(),
                params,
            })),
        })
    }

    /// Freshens a quantified signature: every variable is replaced with a
    /// fresh one, sharing replacements between repeated occurrences.
    pub fn inst(&mut self, t: &Type) -> Type {
        self.inst_hist(t, &mut HashMap::new(), &mut Vec::new())
    }

    fn inst_hist(
        &mut self,
        t: &Type,
        map: &mut HashMap<u64, Type>,
        hist: &mut Vec<Type>,
    ) -> Type {
        if t.is_var() {
            if let Some(r) = map.get(&t.var_id()) {
                return r.clone();
            }
            let alts: Vec<Type> = t.alts().iter().map(|p| p.typ.clone()).collect();
            let r = if alts.is_empty() {
                self.fresh()
            } else {
                self.fresh_alts(alts)
            };
            map.insert(t.var_id(), r.clone());
            return r;
        }
        if !t.has_params() {
            return t.clone();
        }
        for h in hist.iter().rev() {
            if info_eq(t, h) {
                return h.clone();
            }
        }
        hist.push(t.clone());
        let params = t
            .params()
            .iter()
            .map(|p| Param::new(p.name.clone(), self.inst_hist(&p.typ, map, hist)))
            .collect();
        hist.pop();
        Type {
            kind: t.kind,
            info: Some(Arc::new(Info {
                name: t.name().into(),
                params,
            })),
        }
    }

    // ── Variable queries ─────────────────────────────────────────

    /// Appends the ids of all variables in `t` that are bound here.
    pub fn bound(&self, t: &Type, vars: &mut Vec<u64>) {
        self.vars_hist(t, vars, true, &mut Vec::new());
    }

    /// Appends the ids of all variables in `t` that are still free.
    pub fn free(&self, t: &Type, vars: &mut Vec<u64>) {
        self.vars_hist(t, vars, false, &mut Vec::new());
    }

    fn vars_hist(&self, t: &Type, vars: &mut Vec<u64>, want_bound: bool, hist: &mut Vec<Type>) {
        if t.is_var() {
            match self.get(t.var_id()) {
                Some(b) => {
                    if want_bound {
                        add_var(vars, t.var_id());
                    } else {
                        let b = b.clone();
                        self.vars_hist(&b, vars, want_bound, hist);
                    }
                }
                None => {
                    if !want_bound {
                        add_var(vars, t.var_id());
                    }
                }
            }
            return;
        }
        if !t.has_params() {
            return;
        }
        for h in hist.iter().rev() {
            if info_eq(t, h) {
                return;
            }
        }
        hist.push(t.clone());
        for p in t.params() {
            self.vars_hist(&p.typ, vars, want_bound, hist);
        }
        hist.pop();
    }

    /// Occurs check: whether `t` transitively contains the variable id.
    pub fn contains(&self, t: &Type, id: u64) -> bool {
        self.contains_hist(t, id, &mut Vec::new())
    }

    fn contains_hist(&self, t: &Type, id: u64, hist: &mut Vec<Type>) -> bool {
        let mut t = t.clone();
        loop {
            if t.is_var() {
                if t.var_id() == id {
                    return true;
                }
                match self.get(t.var_id()) {
                    Some(b) => {
                        t = b.clone();
                        continue;
                    }
                    None => return false,
                }
            }
            if t.has_params() {
                for h in hist.iter().rev() {
                    if info_eq(&t, h) {
                        return false;
                    }
                }
                hist.push(t.clone());
                let found = t.params().iter().any(|p| {
                    let pt = p.typ.clone();
                    self.contains_hist(&pt, id, hist)
                });
                hist.pop();
                return found;
            }
            return false;
        }
    }
}

fn info_eq(a: &Type, b: &Type) -> bool {
    match (&a.info, &b.info) {
        (Some(x), Some(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

fn add_var(vars: &mut Vec<u64>, id: u64) {
    if !vars.contains(&id) {
        vars.push(id);
    }
}
