//! Tokenizer for the expression language.
//!
//! Anything that is not part of the arithmetic grammar (quotes, brackets,
//! braces, `=`, `;`, `&`, `|`, ...) is rejected here, before parsing.
use super::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Dot,
    Comma,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    Question,
    Colon,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Number(v) => v.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Dot => ".".into(),
            Token::Comma => ",".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Percent => "%".into(),
            Token::Power => "^".into(),
            Token::Lt => "<".into(),
            Token::Le => "<=".into(),
            Token::Gt => ">".into(),
            Token::Ge => ">=".into(),
            Token::EqEq => "==".into(),
            Token::NotEq => "!=".into(),
            Token::Question => "?".into(),
            Token::Colon => ":".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Spanned>, CompileError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let pos = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).map_or(false, |d| d.is_ascii_digit())) {
            let (value, next) = read_number(&chars, i)?;
            tokens.push(Spanned { token: Token::Number(value), pos });
            i = next;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' || c == 'π' {
            let start = i;
            i += 1;
            if c != 'π' {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
            }
            let name: String = chars[start..i].iter().collect();
            tokens.push(Spanned { token: Token::Ident(name), pos });
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (c, next) {
            ('*', Some('*')) => (Token::Power, 2),
            ('*', _) => (Token::Star, 1),
            ('^', _) => (Token::Power, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            ('.', _) => (Token::Dot, 1),
            ('?', _) => (Token::Question, 1),
            (':', _) => (Token::Colon, 1),
            ('<', Some('=')) => (Token::Le, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', Some('=')) => (Token::Ge, 2),
            ('>', _) => (Token::Gt, 1),
            // `===` and `!==` are accepted as their loose forms.
            ('=', Some('=')) => (Token::EqEq, if chars.get(i + 2) == Some(&'=') { 3 } else { 2 }),
            ('!', Some('=')) => (Token::NotEq, if chars.get(i + 2) == Some(&'=') { 3 } else { 2 }),
            ('=', _) => return Err(CompileError::Assignment { pos }),
            ('\'', _) | ('"', _) | ('`', _) => return Err(CompileError::StringLiteral { pos }),
            _ => return Err(CompileError::UnexpectedChar { ch: c, pos }),
        };
        tokens.push(Spanned { token, pos });
        i += width;
    }

    Ok(tokens)
}

/// Reads `digits[.digits][e[+-]digits]`, allowing `_` between digits.
fn read_number(chars: &[char], start: usize) -> Result<(f64, usize), CompileError> {
    let mut i = start;
    let mut text = String::new();

    let take_digits = |i: &mut usize, text: &mut String| -> bool {
        let mut any = false;
        while *i < chars.len() {
            let c = chars[*i];
            if c.is_ascii_digit() {
                text.push(c);
                any = true;
            } else if c == '_'
                && any
                && chars.get(*i + 1).map_or(false, |d| d.is_ascii_digit())
            {
                // separator, dropped
            } else {
                break;
            }
            *i += 1;
        }
        any
    };

    let int_part = take_digits(&mut i, &mut text);
    if i < chars.len() && chars[i] == '.' {
        text.push('.');
        i += 1;
        let frac_part = take_digits(&mut i, &mut text);
        if !int_part && !frac_part {
            return Err(invalid(chars, start, i));
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        text.push('e');
        i += 1;
        if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
            text.push(chars[i]);
            i += 1;
        }
        if !take_digits(&mut i, &mut text) {
            return Err(invalid(chars, start, i));
        }
    }

    // `2x`, `1_`, `3.5.1` and friends.
    if i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
        return Err(invalid(chars, start, i + 1));
    }

    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok((v, i)),
        _ => Err(invalid(chars, start, i)),
    }
}

fn invalid(chars: &[char], start: usize, end: usize) -> CompileError {
    let end = end.min(chars.len());
    CompileError::InvalidNumber { text: chars[start..end].iter().collect(), pos: start }
}
