//! Tokenizer with Go-style statement-terminator insertion.
//!
//! A newline becomes a `Newline` token only when the previous token can end
//! an expression. This lets scripts omit semicolons while still allowing
//! expressions to span lines after an operator, comma, or open bracket.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals and names
    Num(f64),
    Str(String),
    Ident(String),

    // Keywords
    True,
    False,
    Null,
    If,
    Else,
    While,
    For,
    In,
    Return,
    Fn,
    Break,
    Continue,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Semi,
    Newline,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// True when a token may be the last token of an expression, which makes a
/// following newline act as a statement terminator.
fn ends_expression(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Num(_)
            | TokenKind::Str(_)
            | TokenKind::Ident(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Return
            | TokenKind::Break
            | TokenKind::Continue
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
    )
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;
    let mut line = 1;

    macro_rules! push {
        ($kind:expr) => {
            tokens.push(Token { kind: $kind, line })
        };
    }

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' => i += 1,
            '\n' => {
                if tokens.last().is_some_and(|t| ends_expression(&t.kind)) {
                    push!(TokenKind::Newline);
                }
                line += 1;
                i += 1;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '"' => {
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None | Some('\n') => {
                            return Err(ParseError::new("unterminated string literal", line));
                        }
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            let esc = chars.get(i + 1).copied().ok_or_else(|| {
                                ParseError::new("unterminated string literal", line)
                            })?;
                            s.push(match esc {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                '"' => '"',
                                '\\' => '\\',
                                '/' => '/',
                                other => {
                                    return Err(ParseError::new(
                                        format!("invalid escape '\\{other}' in string"),
                                        line,
                                    ));
                                }
                            });
                            i += 2;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                push!(TokenKind::Str(s));
            }
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if i < chars.len() && chars[i] == '.' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if chars.get(j) == Some(&'+') || chars.get(j) == Some(&'-') {
                        j += 1;
                    }
                    if chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text
                    .parse()
                    .map_err(|_| ParseError::new(format!("invalid number '{text}'"), line))?;
                push!(TokenKind::Num(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let kind = match word.as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    "while" => TokenKind::While,
                    "for" => TokenKind::For,
                    "in" => TokenKind::In,
                    "return" => TokenKind::Return,
                    "fn" => TokenKind::Fn,
                    "break" => TokenKind::Break,
                    "continue" => TokenKind::Continue,
                    _ => TokenKind::Ident(word),
                };
                push!(kind);
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                push!(TokenKind::AndAnd);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                push!(TokenKind::OrOr);
                i += 2;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                push!(TokenKind::Eq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                push!(TokenKind::Ne);
                i += 2;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                push!(TokenKind::Le);
                i += 2;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                push!(TokenKind::Ge);
                i += 2;
            }
            '(' => {
                push!(TokenKind::LParen);
                i += 1;
            }
            ')' => {
                push!(TokenKind::RParen);
                i += 1;
            }
            '[' => {
                push!(TokenKind::LBracket);
                i += 1;
            }
            ']' => {
                push!(TokenKind::RBracket);
                i += 1;
            }
            '{' => {
                push!(TokenKind::LBrace);
                i += 1;
            }
            '}' => {
                push!(TokenKind::RBrace);
                i += 1;
            }
            ',' => {
                push!(TokenKind::Comma);
                i += 1;
            }
            '.' => {
                push!(TokenKind::Dot);
                i += 1;
            }
            ':' => {
                push!(TokenKind::Colon);
                i += 1;
            }
            ';' => {
                push!(TokenKind::Semi);
                i += 1;
            }
            '=' => {
                push!(TokenKind::Assign);
                i += 1;
            }
            '+' => {
                push!(TokenKind::Plus);
                i += 1;
            }
            '-' => {
                push!(TokenKind::Minus);
                i += 1;
            }
            '*' => {
                push!(TokenKind::Star);
                i += 1;
            }
            '/' => {
                push!(TokenKind::Slash);
                i += 1;
            }
            '%' => {
                push!(TokenKind::Percent);
                i += 1;
            }
            '<' => {
                push!(TokenKind::Lt);
                i += 1;
            }
            '>' => {
                push!(TokenKind::Gt);
                i += 1;
            }
            '!' => {
                push!(TokenKind::Bang);
                i += 1;
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character '{other}'"),
                    line,
                ));
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}
