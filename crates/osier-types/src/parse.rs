use crate::error::TypeError;
use crate::kind::Kind;
use crate::types::{Param, Type};
use smol_str::SmolStr;

/// Magic layout parameter names recognized in form signatures.
pub const MAGIC_NAMES: [&str; 7] = ["plain", "rest", "args", "tail", "tags", "decls", "unis"];

pub fn is_magic(name: &str) -> bool {
    MAGIC_NAMES.contains(&name)
}

impl Type {
    /// Parses the compact type and signature syntax, e.g. `list|int`,
    /// `dict|str?`, `@1`, `@name`, `<rec point x:int y:int>`,
    /// `<form add a:@1 plain?:list|@1; @1>`.
    pub fn parse(s: &str) -> Result<Type, TypeError> {
        let mut scan = Scan::new(s);
        scan.ws();
        let t = scan.typ()?;
        scan.ws();
        if scan.pos < scan.s.len() {
            return Err(scan.err("trailing input"));
        }
        Ok(t)
    }
}

struct Scan<'a> {
    s: &'a [u8],
    pos: usize,
    // bare `@` and `_` variables get signature-local ids from a high base,
    // clear of explicit `@N` ids
    next_var: u64,
}

impl<'a> Scan<'a> {
    fn new(s: &'a str) -> Self {
        Scan {
            s: s.as_bytes(),
            pos: 0,
            next_var: 100,
        }
    }

    fn err(&self, msg: &str) -> TypeError {
        TypeError::Parse {
            msg: msg.into(),
            pos: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        std::str::from_utf8(&self.s[start..self.pos]).unwrap_or("")
    }

    fn fresh(&mut self) -> Type {
        self.next_var += 1;
        Type::var(self.next_var)
    }

    // ── Types ────────────────────────────────────────────────────

    fn typ(&mut self) -> Result<Type, TypeError> {
        match self.peek() {
            Some(b'<') => self.bracketed(),
            Some(b'@') => {
                self.pos += 1;
                match self.peek() {
                    Some(c) if c.is_ascii_digit() => {
                        let mut id = 0u64;
                        while let Some(c) = self.peek() {
                            if !c.is_ascii_digit() {
                                break;
                            }
                            id = id * 10 + (c - b'0') as u64;
                            self.pos += 1;
                        }
                        Ok(Type::var(id))
                    }
                    Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                        let start = self.pos;
                        while let Some(c) = self.peek() {
                            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                                self.pos += 1;
                            } else {
                                break;
                            }
                        }
                        let name = std::str::from_utf8(&self.s[start..self.pos]).unwrap_or("");
                        Ok(Type::reff(name))
                    }
                    _ => Ok(self.fresh()),
                }
            }
            Some(b'~') => {
                self.pos += 1;
                let name = self.word();
                if name.is_empty() {
                    return Err(self.err("expected schema name after ~"));
                }
                Ok(Type::reff(format!("~{name}")))
            }
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                let word = self.word();
                if word == "_" {
                    return Ok(self.fresh());
                }
                let kind = Kind::by_name(word).ok_or_else(|| self.err("unknown type name"))?;
                let mut t = Type::new(kind);
                if self.peek() == Some(b'?') {
                    self.pos += 1;
                    t = t.opt();
                }
                if self.peek() == Some(b'|') {
                    self.pos += 1;
                    if !kind.is_cont() {
                        return Err(self.err("element on non-container type"));
                    }
                    let elem = self.typ()?;
                    let opt = t.is_opt();
                    t = Type::cont(kind, elem);
                    if opt {
                        t = t.opt();
                    }
                }
                Ok(t)
            }
            _ => Err(self.err("expected type")),
        }
    }

    // ── Bracketed signatures ─────────────────────────────────────

    fn bracketed(&mut self) -> Result<Type, TypeError> {
        self.pos += 1; // <
        self.ws();
        let head = self.word();
        let kind = match head {
            "rec" => Kind::REC,
            "form" => Kind::FORM,
            "func" => Kind::FUNC,
            _ => return Err(self.err("expected rec, form or func")),
        };
        self.ws();
        let name = self.sig_name();
        let mut params = Vec::new();
        loop {
            self.ws();
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b';') => {
                    self.pos += 1;
                    self.ws();
                    let res = self.typ()?;
                    params.push(Param::anon(res));
                    self.ws();
                    if self.peek() != Some(b'>') {
                        return Err(self.err("expected > after result type"));
                    }
                    self.pos += 1;
                    break;
                }
                Some(_) => params.push(self.param()?),
                None => return Err(self.err("unterminated signature")),
            }
        }
        Ok(Type {
            kind,
            info: Some(std::sync::Arc::new(crate::types::Info { name, params })),
        })
    }

    /// An optional signature name: quoted, or a bare word that is neither a
    /// kind name, a magic layout name, nor a `name:type` parameter.
    fn sig_name(&mut self) -> SmolStr {
        if self.peek() == Some(b'\'') {
            self.pos += 1;
            let start = self.pos;
            while let Some(c) = self.peek() {
                if c == b'\'' {
                    break;
                }
                self.pos += 1;
            }
            let name = std::str::from_utf8(&self.s[start..self.pos]).unwrap_or("");
            self.pos += 1; // closing quote
            return SmolStr::new(name);
        }
        let save = self.pos;
        if matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            let word = self.word();
            let next = self.peek();
            if Kind::by_name(word).is_none()
                && !is_magic(word)
                && next != Some(b':')
                && next != Some(b'?')
                && next != Some(b'|')
            {
                return SmolStr::new(word);
            }
        }
        self.pos = save;
        SmolStr::default()
    }

    fn param(&mut self) -> Result<Param, TypeError> {
        let save = self.pos;
        if matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == b'_') {
            let mut name = self.word().to_string();
            if self.peek() == Some(b'?') && self.s.get(self.pos + 1) == Some(&b':') {
                name.push('?');
                self.pos += 1;
            }
            if self.peek() == Some(b':') {
                self.pos += 1;
                let t = self.typ()?;
                return Ok(Param::new(name, t));
            }
            if Kind::by_name(&name).is_none() && name != "_" {
                // bare parameter name without a type hint
                if self.peek() == Some(b'?') {
                    name.push('?');
                    self.pos += 1;
                }
                return Ok(Param::new(name, Type::VOID));
            }
            self.pos = save;
        }
        let t = self.typ()?;
        Ok(Param::anon(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Type {
        Type::parse(s).unwrap_or_else(|e| panic!("parse {s}: {e}"))
    }

    #[test]
    fn plain_types() {
        assert_eq!(p("int"), Type::INT);
        assert_eq!(p("any"), Type::ANY);
        assert_eq!(p("int?"), Type::INT.opt());
        assert_eq!(p("list|int"), Type::list(Type::INT));
        assert_eq!(p("list|list|int"), Type::list(Type::list(Type::INT)));
        assert_eq!(p("dict|str"), Type::dict(Type::STR));
        assert_eq!(p("list|int?"), Type::list(Type::INT.opt()));
    }

    #[test]
    fn vars_and_refs() {
        assert_eq!(p("@3"), Type::var(3));
        assert_eq!(p("@abc"), Type::reff("abc"));
        assert_eq!(p("@a.b"), Type::reff("a.b"));
        assert!(p("@").is_var());
        assert!(p("_").is_var());
        assert_eq!(p("list|@2"), Type::list(Type::var(2)));
    }

    #[test]
    fn rec_types() {
        let t = p("<rec a:int b:str>");
        assert_eq!(t.kind, Kind::REC);
        assert_eq!(t.params().len(), 2);
        assert_eq!(t.params()[0].name, "a");
        assert_eq!(t.params()[0].typ, Type::INT);

        let named = p("<rec point x:real y:real>");
        assert_eq!(named.name(), "point");
        assert_eq!(named.params().len(), 2);
    }

    #[test]
    fn form_signatures() {
        let t = p("<form if plain; @>");
        assert_eq!(t.kind, Kind::FORM);
        assert_eq!(t.name(), "if");
        assert_eq!(t.args().len(), 1);
        assert_eq!(t.args()[0].name, "plain");
        assert_eq!(t.args()[0].typ, Type::VOID);
        assert!(t.res().is_var());
    }

    #[test]
    fn quoted_names_and_opt_params() {
        let t = p("<form 'con' typ args?:list unis?:dict; @>");
        assert_eq!(t.name(), "con");
        let args = t.args();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].typ, Type::TYP);
        assert_eq!(args[1].name, "args?");
        assert!(args[1].is_opt());
        assert_eq!(args[1].typ, Type::LIST);
        assert_eq!(args[2].typ, Type::DICT);
    }

    #[test]
    fn shared_vars() {
        let t = p("<form add a:@1 plain?:list|@1; @1>");
        assert_eq!(t.args()[0].typ, Type::var(1));
        assert_eq!(t.args()[1].typ, Type::list(Type::var(1)));
        assert_eq!(t.res(), Type::var(1));
    }

    #[test]
    fn func_without_semicolon() {
        // the printer omits the separator; the last param is the result
        let t = p("<func num num>");
        assert_eq!(t.kind, Kind::FUNC);
        assert_eq!(t.args().len(), 1);
        assert_eq!(t.res(), Type::NUM);
        assert_eq!(t.to_string(), "<func num num>");
    }

    #[test]
    fn nested_signatures() {
        let t = p("<form with a:any f:<func any any>; @>");
        assert_eq!(t.args()[1].typ.kind, Kind::FUNC);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Type::parse("nope").is_err());
        assert!(Type::parse("int extra").is_err());
        assert!(Type::parse("<form").is_err());
        assert!(Type::parse("int|str").is_err());
    }
}
