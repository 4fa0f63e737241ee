use crate::lexer::{tokenize, LexError, Numeral, Token};

fn kinds(source: &str) -> Vec<Token> {
    tokenize(source)
        .expect("lex failed")
        .into_iter()
        .map(|(t, _)| t)
        .collect()
}

fn lex_error(source: &str) -> LexError {
    tokenize(source).expect_err("expected a lexical error").kind
}

fn int(n: i64) -> Token {
    Token::Number(Numeral::Int(n))
}

fn flt(x: f64) -> Token {
    Token::Number(Numeral::Flt(x))
}

fn s(text: &str) -> Token {
    Token::Str(text.as_bytes().to_vec())
}

#[test]
fn test_keywords_and_names() {
    assert_eq!(
        kinds("while whilex do end_ end"),
        vec![Token::While, Token::Name, Token::Do, Token::Name, Token::End]
    );
}

#[test]
fn test_operator_priorities() {
    // each longer operator wins over its prefixes
    assert_eq!(kinds(".."), vec![Token::DotDot]);
    assert_eq!(kinds("..."), vec![Token::Ellipsis]);
    assert_eq!(kinds(". ."), vec![Token::Dot, Token::Dot]);
    assert_eq!(kinds("<= <"), vec![Token::Le, Token::Lt]);
    assert_eq!(kinds("~= ~"), vec![Token::NotEq, Token::Tilde]);
    assert_eq!(kinds("-> -"), vec![Token::Arrow, Token::Minus]);
    assert_eq!(kinds("// /"), vec![Token::DoubleSlash, Token::Slash]);
    assert_eq!(kinds("<< <"), vec![Token::Shl, Token::Lt]);
}

#[test]
fn test_integers() {
    assert_eq!(kinds("0 42 0x10 0xFF"), vec![int(0), int(42), int(16), int(255)]);
}

#[test]
fn test_floats() {
    assert_eq!(
        kinds("1.5 .5 1. 2e3 2E-1 0x1p4 0x.8p1"),
        vec![
            flt(1.5),
            flt(0.5),
            flt(1.0),
            flt(2000.0),
            flt(0.2),
            flt(16.0),
            flt(1.0)
        ]
    );
}

#[test]
fn test_decimal_overflow_becomes_float() {
    assert_eq!(
        kinds("9223372036854775808"),
        vec![flt(9223372036854775808.0)]
    );
}

#[test]
fn test_hex_wraps() {
    assert_eq!(kinds("0xFFFFFFFFFFFFFFFF"), vec![int(-1)]);
}

#[test]
fn test_malformed_numbers() {
    assert_eq!(lex_error("1q"), LexError::MalformedNumber);
    assert_eq!(lex_error("1.2.3"), LexError::MalformedNumber);
    assert_eq!(lex_error("0x"), LexError::MalformedNumber);
    assert_eq!(lex_error("1e"), LexError::MalformedNumber);
    assert_eq!(lex_error("1e+"), LexError::MalformedNumber);
}

#[test]
fn test_short_strings() {
    assert_eq!(kinds(r#""hello""#), vec![s("hello")]);
    assert_eq!(kinds(r#"'hello'"#), vec![s("hello")]);
    assert_eq!(kinds(r#""a\"b""#), vec![s("a\"b")]);
    assert_eq!(kinds(r#""a\tb\nc""#), vec![s("a\tb\nc")]);
}

#[test]
fn test_escaped_line_breaks_normalize() {
    assert_eq!(kinds("\"a\\\nb\""), vec![s("a\nb")]);
    assert_eq!(kinds("\"a\\\r\nb\""), vec![s("a\nb")]);
    assert_eq!(kinds("\"a\\\n\rb\""), vec![s("a\nb")]);
}

#[test]
fn test_decimal_escapes() {
    assert_eq!(kinds(r#""\65\066\9""#), vec![s("AB\t")]);
    assert_eq!(
        kinds(r#""\255""#),
        vec![Token::Str(vec![255])],
        "\\255 is the largest accepted decimal escape"
    );
    assert_eq!(lex_error(r#""\256""#), LexError::MalformedEscapeDecimal);
}

#[test]
fn test_hex_and_unicode_escapes() {
    assert_eq!(kinds(r#""\x41\x62""#), vec![s("Ab")]);
    assert_eq!(kinds(r#""\u{48}\u{CA}""#), vec![s("H\u{CA}")]);
    assert_eq!(lex_error(r#""\xZ1""#), LexError::MalformedEscapeHex);
    assert_eq!(lex_error(r#""\u{}""#), LexError::MalformedEscapeUnicode);
    assert_eq!(lex_error(r#""\u{110000}""#), LexError::MalformedEscapeUnicode);
    assert_eq!(lex_error(r#""\q""#), LexError::InvalidEscape);
}

#[test]
fn test_unclosed_strings() {
    assert_eq!(lex_error("\"abc"), LexError::UnclosedShortString);
    assert_eq!(lex_error("\"abc\ndef\""), LexError::UnclosedShortString);
    assert_eq!(lex_error("[[abc"), LexError::UnclosedLongString);
    assert_eq!(lex_error("--[[abc"), LexError::UnclosedLongComment);
}

#[test]
fn test_long_strings() {
    assert_eq!(kinds("[[hello]]"), vec![s("hello")]);
    // the initial newline is stripped, later ones are kept
    assert_eq!(kinds("[[\nhello\nworld]]"), vec![s("hello\nworld")]);
    // levels must match
    assert_eq!(kinds("[==[a]b]=]c]==]"), vec![s("a]b]=]c")]);
    // escapes are not processed
    assert_eq!(kinds(r"[[a\nb]]"), vec![s(r"a\nb")]);
}

#[test]
fn test_comments() {
    assert_eq!(kinds("1 -- a comment\n2"), vec![int(1), int(2)]);
    assert_eq!(kinds("1 --[[ long\ncomment ]] 2"), vec![int(1), int(2)]);
    assert_eq!(kinds("1 --[==[ ]] ]==] 2"), vec![int(1), int(2)]);
    // `--[=` without the second bracket is a plain line comment
    assert_eq!(kinds("1 --[= not long\n2"), vec![int(1), int(2)]);
}

#[test]
fn test_long_comment_beats_short() {
    // `--[[ ... ]]` swallows a line break that a short comment would not
    assert_eq!(kinds("--[[a\nb]]1"), vec![int(1)]);
}

#[test]
fn test_spans() {
    let tokens = tokenize("ab + 12").expect("lex failed");
    assert_eq!(tokens[0].1, 0..2);
    assert_eq!(tokens[1].1, 3..4);
    assert_eq!(tokens[2].1, 5..7);
}
