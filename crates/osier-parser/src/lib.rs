//! Parses concrete syntax into osier element trees.
//!
//! The parser stays deliberately dumb: tags and declarations become named
//! groups, everything in parentheses becomes a dyn, and the layout engine
//! decides later how groups bind to parameters.

use osier_exp::{Dyn, El, Named, Span, Sym};
use osier_lexer::{lex, Token};
use osier_lit::{Dict, Keyed, List, Lit};
use osier_types::{Kind, Type};
use smol_str::SmolStr;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.span.start, self.span.end, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a single expression.
pub fn parse(source: &str) -> Result<El, ParseError> {
    let mut els = parse_all(source)?;
    match els.len() {
        0 => Err(ParseError {
            message: "empty input".into(),
            span: Span::new(0, 0),
        }),
        _ => Ok(els.remove(0)),
    }
}

/// Parses a sequence of top-level expressions.
pub fn parse_all(source: &str) -> Result<Vec<El>, ParseError> {
    let (tokens, errors) = lex(source);
    if let Some(span) = errors.first() {
        return Err(ParseError {
            message: "unexpected character".into(),
            span: *span,
        });
    }
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let mut els = Vec::new();
    while !parser.at_end() {
        els.push(parser.element()?);
    }
    Ok(els)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|(_, s)| Span::new(s.end, s.end))
                    .unwrap_or(Span::new(0, 0))
            })
    }

    fn advance(&mut self) -> (Token, Span) {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn error(&self, message: impl Into<String>, span: Span) -> ParseError {
        ParseError {
            message: message.into(),
            span,
        }
    }

    // ── Elements ──────────────────────────────────────────────────

    fn element(&mut self) -> Result<El, ParseError> {
        let span = self.peek_span();
        let Some(tok) = self.peek() else {
            return Err(self.error("unexpected end of input", span));
        };
        match tok.clone() {
            Token::Int(n) => {
                self.advance();
                Ok(lit_el(Lit::Num(n as f64), span))
            }
            Token::Real(n) => {
                self.advance();
                Ok(lit_el(Lit::Num(n), span))
            }
            Token::Str(s) => {
                self.advance();
                Ok(lit_el(Lit::Char(SmolStr::new(&s)), span))
            }
            Token::LParen => self.dyn_expr(),
            Token::LBracket => self.list_lit(),
            Token::LBrace => self.dict_lit(),
            Token::Lt => self.type_expr(),
            Token::Tag(name) => {
                self.advance();
                // a leading tag associates with the one element to its right
                let arg = match self.peek() {
                    None | Some(Token::RParen | Token::RBracket | Token::RBrace) => None,
                    _ => Some(self.element()?),
                };
                Ok(El::Named(named(format!(":{name}"), arg, span)))
            }
            Token::Key(name) => {
                self.advance();
                Ok(El::Named(named(format!(":{name}"), None, span)))
            }
            Token::NakedTag => {
                self.advance();
                Ok(El::Named(named("::", None, span)))
            }
            Token::Decl(name) => {
                self.advance();
                Ok(El::Named(named(name.as_str(), None, span)))
            }
            Token::Semi => {
                self.advance();
                Ok(El::Named(named(";", None, span)))
            }
            Token::Sym(name) => {
                self.advance();
                Ok(self.symbol(name, span))
            }
            other => Err(self.error(format!("unexpected token {other:?}"), span)),
        }
    }

    fn symbol(&mut self, name: SmolStr, span: Span) -> El {
        match name.as_str() {
            "true" => return lit_el(Lit::Bool(true), span),
            "false" => return lit_el(Lit::Bool(false), span),
            "null" => return lit_el(Lit::Nil, span),
            _ => {}
        }
        if is_type_sym(&name) {
            if let Ok(t) = Type::parse(&name) {
                return El::Atom(osier_exp::Atom {
                    val: osier_exp::Val::Typ(t),
                    src: span,
                });
            }
        }
        El::Sym(Sym {
            name,
            typ: Type::VOID,
            src: span,
        })
    }

    fn dyn_expr(&mut self) -> Result<El, ParseError> {
        let (_, start) = self.advance();
        let mut els = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RParen) => {
                    let (_, end) = self.advance();
                    return Ok(El::Dyn(Dyn {
                        els,
                        src: start.merge(end),
                    }));
                }
                None => return Err(self.error("unclosed (", start)),
                _ => els.push(self.element()?),
            }
        }
    }

    // ── Literals ──────────────────────────────────────────────────

    fn list_lit(&mut self) -> Result<El, ParseError> {
        let (_, start) = self.advance();
        let mut data = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBracket) => {
                    let (_, end) = self.advance();
                    return Ok(lit_el(Lit::List(List::any(data)), start.merge(end)));
                }
                None => return Err(self.error("unclosed [", start)),
                _ => {
                    let span = self.peek_span();
                    let el = self.element()?;
                    match el.as_lit() {
                        Some(l) => data.push(l.clone()),
                        None => {
                            return Err(
                                self.error("list literals may only contain literals", span)
                            )
                        }
                    }
                }
            }
        }
    }

    fn dict_lit(&mut self) -> Result<El, ParseError> {
        let (_, start) = self.advance();
        let mut data = Vec::new();
        loop {
            match self.peek().cloned() {
                Some(Token::RBrace) => {
                    let (_, end) = self.advance();
                    return Ok(lit_el(Lit::Dict(Dict::any(data)), start.merge(end)));
                }
                Some(Token::Tag(key)) => {
                    self.advance();
                    let span = self.peek_span();
                    let el = self.element()?;
                    match el.as_lit() {
                        Some(l) => data.push(Keyed::new(key, l.clone())),
                        None => {
                            return Err(
                                self.error("dict literals may only contain literals", span)
                            )
                        }
                    }
                }
                None => return Err(self.error("unclosed {", start)),
                _ => {
                    let span = self.peek_span();
                    return Err(self.error("expected key: in dict literal", span));
                }
            }
        }
    }

    /// A bracketed type expression: slice the source up to the matching `>`
    /// and hand it to the type parser.
    fn type_expr(&mut self) -> Result<El, ParseError> {
        let (_, start) = self.advance();
        let mut depth = 1;
        let mut end = start;
        while depth > 0 {
            if self.at_end() {
                return Err(self.error("unclosed <", start));
            }
            let (tok, span) = self.advance();
            match tok {
                Token::Lt => depth += 1,
                Token::Gt => depth -= 1,
                _ => {}
            }
            end = span;
        }
        let src = &self.source[start.start as usize..end.end as usize];
        match Type::parse(src) {
            Ok(t) => Ok(El::Atom(osier_exp::Atom {
                val: osier_exp::Val::Typ(t),
                src: start.merge(end),
            })),
            Err(e) => Err(self.error(format!("invalid type expression: {e}"), start)),
        }
    }
}

fn lit_el(l: Lit, span: Span) -> El {
    El::Atom(osier_exp::Atom {
        val: osier_exp::Val::Lit(l),
        src: span,
    })
}

fn named(name: impl Into<SmolStr>, el: Option<El>, span: Span) -> Named {
    let mut n = Named::new(name, el);
    n.src = span;
    n
}

/// Whether a symbol denotes a type: a reference (`@a`, `~any`) or a base
/// type name, possibly stacked or optional (`list|int`, `int?`).
fn is_type_sym(name: &str) -> bool {
    if name.starts_with('@') || name.starts_with('~') {
        return true;
    }
    if name == "_" {
        return false;
    }
    let head = name.split(['|', '?']).next().unwrap_or("");
    Kind::by_name(head).is_some()
}
