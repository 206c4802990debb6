//! XPath tokenizer
//!
//! Applies the XPath 1.0 disambiguation rule: after a token that can end an
//! operand, `*` is multiplication and `and`/`or`/`div`/`mod` are operators.

use crate::XPathError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Pipe,
    Plus,
    Minus,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    DoubleColon,
    /// `*` as a name test
    Star,
    /// `*` as an operator
    Multiply,
    And,
    Or,
    Div,
    Mod,
    Literal(String),
    Number(f64),
    /// NCName or QName, possibly `prefix:*`
    Name(String),
    Dollar,
}

impl Token {
    /// Tokens after which an operand may *not* end, so the next `*` or
    /// operator-like name is a name test.
    fn opens_operand(&self) -> bool {
        matches!(
            self,
            Token::At
                | Token::DoubleColon
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::And
                | Token::Or
                | Token::Div
                | Token::Mod
                | Token::Multiply
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::Le
                | Token::Gt
                | Token::Ge
                | Token::Dollar
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, XPathError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|&(_, c)| c);

    while i < chars.len() {
        let (pos, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let operand_may_end = tokens.last().is_some_and(|t| !t.token.opens_operand());

        let token = match c {
            '/' if peek(i + 1) == Some('/') => {
                i += 2;
                Token::DoubleSlash
            }
            '/' => {
                i += 1;
                Token::Slash
            }
            '.' if peek(i + 1) == Some('.') => {
                i += 2;
                Token::DotDot
            }
            '.' if peek(i + 1).is_some_and(|d| d.is_ascii_digit()) => {
                let (number, next) = read_number(&chars, i);
                i = next;
                Token::Number(number)
            }
            '.' => {
                i += 1;
                Token::Dot
            }
            '@' => {
                i += 1;
                Token::At
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '[' => {
                i += 1;
                Token::LBracket
            }
            ']' => {
                i += 1;
                Token::RBracket
            }
            '|' => {
                i += 1;
                Token::Pipe
            }
            '+' => {
                i += 1;
                Token::Plus
            }
            '-' => {
                i += 1;
                Token::Minus
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '!' if peek(i + 1) == Some('=') => {
                i += 2;
                Token::NotEq
            }
            '<' if peek(i + 1) == Some('=') => {
                i += 2;
                Token::Le
            }
            '<' => {
                i += 1;
                Token::Lt
            }
            '>' if peek(i + 1) == Some('=') => {
                i += 2;
                Token::Ge
            }
            '>' => {
                i += 1;
                Token::Gt
            }
            ':' if peek(i + 1) == Some(':') => {
                i += 2;
                Token::DoubleColon
            }
            '$' => {
                i += 1;
                Token::Dollar
            }
            '*' => {
                i += 1;
                if operand_may_end { Token::Multiply } else { Token::Star }
            }
            '"' | '\'' => {
                let start = i + 1;
                let end = (start..chars.len())
                    .find(|&j| chars[j].1 == c)
                    .ok_or(XPathError::UnterminatedLiteral { pos })?;
                let literal: String = chars[start..end].iter().map(|&(_, ch)| ch).collect();
                i = end + 1;
                Token::Literal(literal)
            }
            d if d.is_ascii_digit() => {
                let (number, next) = read_number(&chars, i);
                i = next;
                Token::Number(number)
            }
            n if is_name_start(n) => {
                let mut end = i;
                while end < chars.len() && is_name_char(chars[end].1) {
                    end += 1;
                }
                // QName prefix, but not an axis separator
                if peek(end) == Some(':') && peek(end + 1) != Some(':') {
                    if peek(end + 1) == Some('*') {
                        end += 2;
                    } else if peek(end + 1).is_some_and(is_name_start) {
                        end += 1;
                        while end < chars.len() && is_name_char(chars[end].1) {
                            end += 1;
                        }
                    }
                }
                let name: String = chars[i..end].iter().map(|&(_, ch)| ch).collect();
                i = end;

                match name.as_str() {
                    "and" if operand_may_end => Token::And,
                    "or" if operand_may_end => Token::Or,
                    "div" if operand_may_end => Token::Div,
                    "mod" if operand_may_end => Token::Mod,
                    _ => Token::Name(name),
                }
            }
            other => return Err(XPathError::InvalidCharacter { pos, ch: other }),
        };

        tokens.push(Spanned { token, pos });
    }

    Ok(tokens)
}

fn read_number(chars: &[(usize, char)], start: usize) -> (f64, usize) {
    let mut end = start;
    let mut seen_dot = false;
    while end < chars.len() {
        match chars[end].1 {
            d if d.is_ascii_digit() => end += 1,
            '.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    let text: String = chars[start..end].iter().map(|&(_, c)| c).collect();
    (text.parse().unwrap_or(f64::NAN), end)
}
