use logos::Logos;
use smol_str::SmolStr;

/// Source span as byte offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

fn parse_quoted(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut result = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => result.push('\n'),
                't' => result.push('\t'),
                'r' => result.push('\r'),
                '\\' => result.push('\\'),
                '\'' => result.push('\''),
                '"' => result.push('"'),
                '0' => result.push('\0'),
                other => {
                    result.push('\\');
                    result.push(other);
                }
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    /// Naked declaration terminator.
    #[token(";")]
    Semi,

    /// Naked tag sentinel `::`.
    #[token("::", priority = 4)]
    NakedTag,

    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", priority = 3, callback = |lex| lex.slice().parse::<f64>().ok())]
    Real(f64),

    #[regex(r"-?[0-9]+", priority = 2, callback = |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    /// Quoted text, single or double quotes.
    #[regex(r"'([^'\\]|\\.)*'", callback = parse_quoted)]
    #[regex(r#""([^"\\]|\\.)*""#, callback = parse_quoted)]
    Str(String),

    /// Leading tag name: `name:` (the argument follows).
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*:", priority = 3, callback = |lex| {
        let s = lex.slice();
        SmolStr::new(&s[..s.len() - 1])
    })]
    Tag(SmolStr),

    /// Tag symbol: `:name`.
    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*", callback = |lex| SmolStr::new(&lex.slice()[1..]))]
    Key(SmolStr),

    /// Declaration symbol: `+name` or `-name`, sign kept.
    #[regex(r"[+\-][a-zA-Z_][a-zA-Z0-9_]*", priority = 3, callback = |lex| SmolStr::new(lex.slice()))]
    Decl(SmolStr),

    /// Symbols: identifiers, operators like `+`, prefixed (`~ $ / . @`) and
    /// dotted names, and type notation such as `list|int` or `int?`.
    #[regex(r"[a-zA-Z_~$/@.+\-*][a-zA-Z0-9_|?./@~]*", priority = 1, callback = |lex| SmolStr::new(lex.slice()))]
    Sym(SmolStr),
}

/// Lex source into (token, span) pairs plus spans of unrecognized input.
pub fn lex(source: &str) -> (Vec<(Token, Span)>, Vec<Span>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start as u32, range.end as u32);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => errors.push(span),
        }
    }

    (tokens, errors)
}
