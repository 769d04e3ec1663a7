//! Tokenization of ALGO source text.
//!
//! Newlines are tokens: together with `;` they separate statements.
//! `#` starts a line comment. Keywords are the upper-case French words of
//! the language; everything else word-shaped is an identifier.

use std::fmt;

use rame_core::Diagnostic;

use crate::ParseError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Int(i32),
    Ident(String),

    // keywords
    Si,
    Alors,
    Sinon,
    Fsi,
    Tq,
    Faire,
    Ftq,
    Fonction,
    Fin,
    Renvoyer,
    Lire,
    Afficher,
    Tableau,
    Et,
    Ou,
    Exclusif,
    Non,

    // punctuation and operators
    Assign, // :=
    Colon,
    Semi,
    Newline,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ge,
    Gt,
    Le,
    Lt,
    Eq, // `=`, the equality test; assignment is `:=`
    Ne,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(v) => write!(f, "{v}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::Si => write!(f, "SI"),
            Token::Alors => write!(f, "ALORS"),
            Token::Sinon => write!(f, "SINON"),
            Token::Fsi => write!(f, "FSI"),
            Token::Tq => write!(f, "TQ"),
            Token::Faire => write!(f, "FAIRE"),
            Token::Ftq => write!(f, "FTQ"),
            Token::Fonction => write!(f, "FONCTION"),
            Token::Fin => write!(f, "FIN"),
            Token::Renvoyer => write!(f, "RENVOYER"),
            Token::Lire => write!(f, "LIRE"),
            Token::Afficher => write!(f, "AFFICHER"),
            Token::Tableau => write!(f, "TABLEAU"),
            Token::Et => write!(f, "ET"),
            Token::Ou => write!(f, "OU"),
            Token::Exclusif => write!(f, "EXCLUSIF"),
            Token::Non => write!(f, "NON"),
            Token::Assign => write!(f, ":="),
            Token::Colon => write!(f, ":"),
            Token::Semi => write!(f, ";"),
            Token::Newline => write!(f, "fin de ligne"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Ge => write!(f, ">="),
            Token::Gt => write!(f, ">"),
            Token::Le => write!(f, "<="),
            Token::Lt => write!(f, "<"),
            Token::Eq => write!(f, "="),
            Token::Ne => write!(f, "!="),
        }
    }
}

/// A token with the line it was read on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

fn keyword(word: &str) -> Option<Token> {
    Some(match word {
        "SI" => Token::Si,
        "ALORS" => Token::Alors,
        "SINON" => Token::Sinon,
        "FSI" => Token::Fsi,
        "TQ" => Token::Tq,
        "FAIRE" => Token::Faire,
        "FTQ" => Token::Ftq,
        "FONCTION" => Token::Fonction,
        "FIN" => Token::Fin,
        "RENVOYER" => Token::Renvoyer,
        "LIRE" => Token::Lire,
        "AFFICHER" => Token::Afficher,
        "TABLEAU" => Token::Tableau,
        "ET" => Token::Et,
        "OU" => Token::Ou,
        "EXCLUSIF" => Token::Exclusif,
        "NON" => Token::Non,
        _ => return None,
    })
}

/// Tokenizes `source`, reporting errors against `file`.
pub fn lex(file: &str, source: &str) -> Result<Vec<Spanned>, Diagnostic> {
    let mut tokens = Vec::new();
    let mut line: u32 = 1;
    let mut chars = source.chars().peekable();

    macro_rules! push {
        ($token:expr) => {
            tokens.push(Spanned {
                token: $token,
                line,
            })
        };
    }

    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                push!(Token::Newline);
                line += 1;
            }
            ' ' | '\t' | '\r' => {}
            '#' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }

            '0'..='9' => {
                let mut digits = String::from(c);
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = digits
                    .parse::<i32>()
                    .map_err(|_| ParseError::InvalidInt(digits.clone()).at(file, line))?;
                push!(Token::Int(value));
            }

            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match keyword(&word) {
                    Some(token) => push!(token),
                    None => push!(Token::Ident(word)),
                }
            }

            ':' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(Token::Assign);
                } else {
                    push!(Token::Colon);
                }
            }
            '>' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(Token::Ge);
                } else {
                    push!(Token::Gt);
                }
            }
            '<' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(Token::Le);
                } else {
                    push!(Token::Lt);
                }
            }
            '!' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(Token::Ne);
                } else {
                    return Err(ParseError::UnexpectedChar('!').at(file, line));
                }
            }
            '=' => push!(Token::Eq),
            ';' => push!(Token::Semi),
            ',' => push!(Token::Comma),
            '.' => push!(Token::Dot),
            '(' => push!(Token::LParen),
            ')' => push!(Token::RParen),
            '[' => push!(Token::LBracket),
            ']' => push!(Token::RBracket),
            '{' => push!(Token::LBrace),
            '}' => push!(Token::RBrace),
            '+' => push!(Token::Plus),
            '-' => push!(Token::Minus),
            '*' => push!(Token::Star),
            '/' => push!(Token::Slash),
            '%' => push!(Token::Percent),

            other => return Err(ParseError::UnexpectedChar(other).at(file, line)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        lex("test.algo", source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn keywords_and_idents() {
        assert_eq!(
            tokens("AFFICHER double"),
            vec![Token::Afficher, Token::Ident("double".into())]
        );
    }

    #[test]
    fn multi_char_operators() {
        assert_eq!(
            tokens("x := y >= 1 != 2"),
            vec![
                Token::Ident("x".into()),
                Token::Assign,
                Token::Ident("y".into()),
                Token::Ge,
                Token::Int(1),
                Token::Ne,
                Token::Int(2),
            ]
        );
    }

    #[test]
    fn equality_is_a_single_equals() {
        assert_eq!(
            tokens("a = b"),
            vec![
                Token::Ident("a".into()),
                Token::Eq,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn newlines_are_tokens_and_comments_are_not() {
        assert_eq!(
            tokens("LIRE x # la donnée\nAFFICHER x"),
            vec![
                Token::Lire,
                Token::Ident("x".into()),
                Token::Newline,
                Token::Afficher,
                Token::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn lines_are_tracked() {
        let spanned = lex("test.algo", "SI\nALORS\nFSI").unwrap();
        let lines: Vec<u32> = spanned.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 1, 2, 2, 3]);
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = lex("test.algo", "x := 1 $").unwrap_err();
        assert_eq!(err.to_string(), "test.algo:1: caractère inattendu: '$'");
    }
}
