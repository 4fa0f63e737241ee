use logos::{FilterResult, Logos, Span};

/// Lexical error labels. Rendered with [`LexError::label`] in diagnostics.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    #[default]
    UnexpectedCharacter,
    MalformedNumber,
    InvalidEscape,
    MalformedEscapeDecimal,
    MalformedEscapeHex,
    MalformedEscapeUnicode,
    UnclosedShortString,
    UnclosedLongString,
    UnclosedLongComment,
}

impl LexError {
    pub fn label(self) -> &'static str {
        match self {
            LexError::UnexpectedCharacter => "UnexpectedCharacter",
            LexError::MalformedNumber => "MalformedNumber",
            LexError::InvalidEscape => "InvalidEscape",
            LexError::MalformedEscapeDecimal => "MalformedEscape_decimal",
            LexError::MalformedEscapeHex => "MalformedEscape_x",
            LexError::MalformedEscapeUnicode => "MalformedEscape_u",
            LexError::UnclosedShortString => "UnclosedShortString",
            LexError::UnclosedLongString => "UnclosedLongString",
            LexError::UnclosedLongComment => "UnclosedLongComment",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            LexError::UnexpectedCharacter => "unexpected character",
            LexError::MalformedNumber => "malformed number",
            LexError::InvalidEscape => "invalid escape sequence",
            LexError::MalformedEscapeDecimal => "decimal escape does not fit a byte",
            LexError::MalformedEscapeHex => "\\x escape expects two hexadecimal digits",
            LexError::MalformedEscapeUnicode => "malformed \\u{...} escape",
            LexError::UnclosedShortString => "unclosed string literal",
            LexError::UnclosedLongString => "unclosed long string",
            LexError::UnclosedLongComment => "unclosed long comment",
        }
    }
}

/// A numeric literal value. Decimal integers that overflow become floats;
/// hexadecimal integers wrap around, as in Lua.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeral {
    Int(i64),
    Flt(f64),
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n\x0c]+")]
pub enum Token {
    // Keywords. `break`, `goto`, and `in` are reserved but have no grammar
    // rule in this version of the language.
    #[token("and")]
    And,
    #[token("break")]
    Break,
    #[token("do")]
    Do,
    #[token("else")]
    Else,
    #[token("elseif")]
    Elseif,
    #[token("end")]
    End,
    #[token("false")]
    False,
    #[token("for")]
    For,
    #[token("function")]
    Function,
    #[token("goto")]
    Goto,
    #[token("if")]
    If,
    #[token("in")]
    In,
    #[token("local")]
    Local,
    #[token("nil")]
    Nil,
    #[token("not")]
    Not,
    #[token("or")]
    Or,
    #[token("record")]
    Record,
    #[token("repeat")]
    Repeat,
    #[token("return")]
    Return,
    #[token("then")]
    Then,
    #[token("true")]
    True,
    #[token("until")]
    Until,
    #[token("while")]
    While,
    #[token("import")]
    Import,
    #[token("as")]
    As,
    #[token("foreign")]
    Foreign,

    // Multi-character operators. Longest-match resolves the priority ties
    // (`...` over `..` over `.`, `<=` over `<`, `//` over `/`, ...).
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("==")]
    EqEq,
    #[token("~=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("//")]
    DoubleSlash,
    #[token("..")]
    DotDot,
    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,

    // Single-character operators and punctuation.
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
    #[token("#")]
    Hash,
    #[token("&")]
    Amp,
    #[token("~")]
    Tilde,
    #[token("|")]
    Pipe,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LCurly,
    #[token("}")]
    RCurly,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,

    /// Identifier; the text is sliced from the source via the span.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,

    /// Numeric literal. The regex only anchors the start; the callback
    /// consumes the rest following Lua's numeral rules so that trailing
    /// garbage (`1q`, `1.2.3`) becomes one `MalformedNumber` token.
    #[regex(r"[0-9]", lex_number)]
    #[regex(r"\.[0-9]", lex_number)]
    Number(Numeral),

    /// String literal with escapes already processed into bytes.
    #[token("\"", lex_short_string)]
    #[token("'", lex_short_string)]
    #[regex(r"\[=*\[", lex_long_string)]
    Str(Vec<u8>),

    /// `--` comments, short and long. Consumed by the callback and never
    /// surfaced to the parser.
    #[regex(r"--", lex_comment)]
    Comment,

    Eof,
}

pub type SpannedToken = (Token, Span);

/// A lexical error with its position; lexing stops at the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalError {
    pub kind: LexError,
    pub span: Span,
}

/// Tokenize an entire source file.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, LexicalError> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(kind) => return Err(LexicalError { kind, span }),
        }
    }
    Ok(tokens)
}

// ─── Numerals ────────────────────────────────────────────────────────────────

fn lex_number(lex: &mut logos::Lexer<Token>) -> Result<Numeral, LexError> {
    let mut hex = false;
    if lex.slice() == "0" {
        if let Some(b'x' | b'X') = lex.remainder().as_bytes().first() {
            lex.bump(1);
            hex = true;
        }
    }
    let expo: &[u8] = if hex { b"pP" } else { b"eE" };
    loop {
        let rem = lex.remainder().as_bytes();
        match rem.first() {
            Some(&c) if expo.contains(&c) => {
                lex.bump(1);
                if let Some(b'+' | b'-') = lex.remainder().as_bytes().first() {
                    lex.bump(1);
                }
            }
            Some(&c) if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' => lex.bump(1),
            _ => break,
        }
    }
    parse_numeral(lex.slice()).ok_or(LexError::MalformedNumber)
}

/// Parse a numeral lexeme. Returns `None` when the lexeme is not a valid
/// Lua-style number (which the lexer reports as `MalformedNumber`).
pub fn parse_numeral(s: &str) -> Option<Numeral> {
    let b = s.as_bytes();
    if b.len() >= 2 && b[0] == b'0' && (b[1] | 0x20) == b'x' {
        parse_hex_numeral(&s[2..])
    } else {
        parse_dec_numeral(s)
    }
}

fn parse_dec_numeral(s: &str) -> Option<Numeral> {
    let b = s.as_bytes();
    let mut digits = 0usize;
    let mut dot = false;
    let mut expo = false;
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'0'..=b'9' => digits += 1,
            b'.' if !dot && !expo => dot = true,
            b'e' | b'E' if !expo && digits > 0 => {
                expo = true;
                if let Some(b'+' | b'-') = b.get(i + 1) {
                    i += 1;
                }
                // the exponent needs at least one digit of its own
                if !matches!(b.get(i + 1), Some(b'0'..=b'9')) {
                    return None;
                }
            }
            _ => return None,
        }
        i += 1;
    }
    if digits == 0 {
        return None;
    }
    if !dot && !expo {
        if let Ok(n) = s.parse::<i64>() {
            return Some(Numeral::Int(n));
        }
        // decimal integer constants that overflow become floats
    }
    s.parse::<f64>().ok().map(Numeral::Flt)
}

fn parse_hex_numeral(s: &str) -> Option<Numeral> {
    let b = s.as_bytes();
    let is_float = b.iter().any(|&c| c == b'.' || c == b'p' || c == b'P');
    if !is_float {
        if b.is_empty() {
            return None;
        }
        let mut acc: u64 = 0;
        for &c in b {
            let d = (c as char).to_digit(16)? as u64;
            acc = acc.wrapping_mul(16).wrapping_add(d);
        }
        return Some(Numeral::Int(acc as i64));
    }
    // hexadecimal float: mantissa in base 16, binary exponent after p/P
    let mut value = 0.0f64;
    let mut digits = 0usize;
    let mut i = 0;
    while i < b.len() {
        match (b[i] as char).to_digit(16) {
            Some(d) => {
                value = value * 16.0 + d as f64;
                digits += 1;
                i += 1;
            }
            None => break,
        }
    }
    if b.get(i) == Some(&b'.') {
        i += 1;
        let mut scale = 1.0 / 16.0;
        while i < b.len() {
            match (b[i] as char).to_digit(16) {
                Some(d) => {
                    value += d as f64 * scale;
                    scale /= 16.0;
                    digits += 1;
                    i += 1;
                }
                None => break,
            }
        }
    }
    if digits == 0 {
        return None;
    }
    let mut exponent = 0i32;
    if let Some(b'p' | b'P') = b.get(i) {
        i += 1;
        let mut negative = false;
        if let Some(&sign @ (b'+' | b'-')) = b.get(i) {
            negative = sign == b'-';
            i += 1;
        }
        let mut expo_digits = 0usize;
        while let Some(&c @ b'0'..=b'9') = b.get(i) {
            exponent = exponent.saturating_mul(10).saturating_add((c - b'0') as i32);
            expo_digits += 1;
            i += 1;
        }
        if expo_digits == 0 {
            return None;
        }
        if negative {
            exponent = -exponent;
        }
    }
    if i != b.len() {
        return None;
    }
    Some(Numeral::Flt(value * (exponent as f64).exp2()))
}

// ─── Strings and comments ────────────────────────────────────────────────────

fn lex_short_string(lex: &mut logos::Lexer<Token>) -> Result<Vec<u8>, LexError> {
    let quote = lex.slice().as_bytes()[0];
    let rem = lex.remainder().as_bytes().to_vec();
    let mut out = Vec::new();
    let mut i = 0;
    loop {
        let Some(&c) = rem.get(i) else {
            lex.bump(i);
            return Err(LexError::UnclosedShortString);
        };
        i += 1;
        match c {
            c if c == quote => {
                lex.bump(i);
                return Ok(out);
            }
            b'\n' | b'\r' => {
                lex.bump(i - 1);
                return Err(LexError::UnclosedShortString);
            }
            b'\\' => {
                let Some(&e) = rem.get(i) else {
                    lex.bump(i);
                    return Err(LexError::UnclosedShortString);
                };
                i += 1;
                match e {
                    b'a' => out.push(0x07),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'v' => out.push(0x0b),
                    b'\\' | b'\'' | b'"' => out.push(e),
                    // an escaped line break, in any of its spellings,
                    // normalizes to a single newline
                    b'\n' => {
                        out.push(b'\n');
                        if rem.get(i) == Some(&b'\r') {
                            i += 1;
                        }
                    }
                    b'\r' => {
                        out.push(b'\n');
                        if rem.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'0'..=b'9' => {
                        let mut value = (e - b'0') as u32;
                        for _ in 0..2 {
                            match rem.get(i) {
                                Some(&d @ b'0'..=b'9') => {
                                    value = value * 10 + (d - b'0') as u32;
                                    i += 1;
                                }
                                _ => break,
                            }
                        }
                        if value > 255 {
                            lex.bump(i);
                            return Err(LexError::MalformedEscapeDecimal);
                        }
                        out.push(value as u8);
                    }
                    b'x' => {
                        let mut value = 0u32;
                        for _ in 0..2 {
                            match rem.get(i).and_then(|&d| (d as char).to_digit(16)) {
                                Some(d) => {
                                    value = value * 16 + d;
                                    i += 1;
                                }
                                None => {
                                    lex.bump(i);
                                    return Err(LexError::MalformedEscapeHex);
                                }
                            }
                        }
                        out.push(value as u8);
                    }
                    b'u' => {
                        if rem.get(i) != Some(&b'{') {
                            lex.bump(i);
                            return Err(LexError::MalformedEscapeUnicode);
                        }
                        i += 1;
                        let mut value = 0u32;
                        let mut digits = 0usize;
                        while let Some(d) = rem.get(i).and_then(|&d| (d as char).to_digit(16)) {
                            value = value.saturating_mul(16).saturating_add(d);
                            digits += 1;
                            i += 1;
                        }
                        if digits == 0 || rem.get(i) != Some(&b'}') {
                            lex.bump(i);
                            return Err(LexError::MalformedEscapeUnicode);
                        }
                        i += 1;
                        match char::from_u32(value) {
                            Some(ch) => {
                                let mut buf = [0u8; 4];
                                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                            }
                            None => {
                                lex.bump(i);
                                return Err(LexError::MalformedEscapeUnicode);
                            }
                        }
                    }
                    _ => {
                        lex.bump(i);
                        return Err(LexError::InvalidEscape);
                    }
                }
            }
            _ => out.push(c),
        }
    }
}

fn lex_long_string(lex: &mut logos::Lexer<Token>) -> Result<Vec<u8>, LexError> {
    let level = lex.slice().len() - 2;
    match read_long_bracket(lex, level) {
        Some(content) => Ok(strip_first_newline(content)),
        None => Err(LexError::UnclosedLongString),
    }
}

fn lex_comment(lex: &mut logos::Lexer<Token>) -> FilterResult<(), LexError> {
    let rem = lex.remainder().as_bytes();
    if rem.first() == Some(&b'[') {
        let mut j = 1;
        while rem.get(j) == Some(&b'=') {
            j += 1;
        }
        if rem.get(j) == Some(&b'[') {
            let level = j - 1;
            lex.bump(j + 1);
            return match read_long_bracket(lex, level) {
                Some(_) => FilterResult::Skip,
                None => FilterResult::Error(LexError::UnclosedLongComment),
            };
        }
    }
    let mut i = 0;
    while let Some(&c) = rem.get(i) {
        if c == b'\n' {
            break;
        }
        i += 1;
    }
    lex.bump(i);
    FilterResult::Skip
}

/// Consume input up to (and including) the `]=*]` closer matching `level`
/// equals signs, returning the raw content. `None` means the closer was
/// never found; the remainder is consumed so the error spans to the end.
fn read_long_bracket(lex: &mut logos::Lexer<Token>, level: usize) -> Option<Vec<u8>> {
    let rem = lex.remainder().as_bytes().to_vec();
    let mut i = 0;
    while i < rem.len() {
        if rem[i] == b']' {
            let mut j = i + 1;
            let mut eq = 0;
            while rem.get(j) == Some(&b'=') {
                j += 1;
                eq += 1;
            }
            if eq == level && rem.get(j) == Some(&b']') {
                let content = rem[..i].to_vec();
                lex.bump(j + 1);
                return Some(content);
            }
        }
        i += 1;
    }
    lex.bump(rem.len());
    None
}

fn strip_first_newline(mut content: Vec<u8>) -> Vec<u8> {
    let skip = match content.as_slice() {
        [b'\r', b'\n', ..] | [b'\n', b'\r', ..] => 2,
        [b'\n', ..] | [b'\r', ..] => 1,
        _ => 0,
    };
    content.drain(..skip);
    content
}
