//! Predicate parsing and tri-state evaluation.
//!
//! Schema documents encode conditions as strings (`applies_if`, gate `when`
//! clauses) so they stay storage-friendly. The grammar is fixed and small:
//!
//! ```text
//! expr       := and_expr ("or" and_expr)*
//! and_expr   := unary ("and" unary)*
//! unary      := "not" unary | primary
//! primary    := "(" expr ")" | comparison
//! comparison := answers['id'] ("==" | "!=") 'token'
//!             | answers['id'] in ['a', 'b', ...]
//!             | profile.field ("==" | "!=") true|false
//! ```
//!
//! Predicates are parsed once at schema load into [`Expr`] trees; evaluation
//! never re-parses text. Evaluation is three-valued: referencing an
//! unanswered question or unset profile fact yields [`Tri::Indeterminate`],
//! which gates need to distinguish "not yet known" from "known false".

use serde::{Deserialize, Serialize};

use super::context::{AnswerSet, ProfileFacts};
use super::schema::AnswerToken;

/// Three-valued truth: a predicate over partial answers can be undecided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tri {
    True,
    False,
    Indeterminate,
}

impl Tri {
    pub fn known(value: bool) -> Self {
        if value {
            Tri::True
        } else {
            Tri::False
        }
    }

    /// `False` dominates, then `Indeterminate`, then `True`.
    pub fn and(self, other: Tri) -> Tri {
        match (self, other) {
            (Tri::False, _) | (_, Tri::False) => Tri::False,
            (Tri::Indeterminate, _) | (_, Tri::Indeterminate) => Tri::Indeterminate,
            _ => Tri::True,
        }
    }

    /// `True` dominates, then `Indeterminate`, then `False`.
    pub fn or(self, other: Tri) -> Tri {
        match (self, other) {
            (Tri::True, _) | (_, Tri::True) => Tri::True,
            (Tri::Indeterminate, _) | (_, Tri::Indeterminate) => Tri::Indeterminate,
            _ => Tri::False,
        }
    }

    pub fn negate(self) -> Tri {
        match self {
            Tri::True => Tri::False,
            Tri::False => Tri::True,
            Tri::Indeterminate => Tri::Indeterminate,
        }
    }
}

/// Parsed predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The literal predicate `"always"`.
    Always,
    /// `answers['id'] == 'token'` (or `!=` when `negated`).
    AnswerEq {
        question_id: String,
        token: AnswerToken,
        negated: bool,
    },
    /// `answers['id'] in ['a', 'b']`.
    AnswerIn {
        question_id: String,
        tokens: Vec<AnswerToken>,
    },
    /// `profile.field == true/false` (`!=` folds into `expected`).
    ProfileEq { field: String, expected: bool },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Parse failure for a predicate string. Raised only at schema load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateParseError {
    #[error("unexpected character '{found}' at byte {at}")]
    UnexpectedChar { found: char, at: usize },
    #[error("unterminated string literal starting at byte {at}")]
    UnterminatedString { at: usize },
    #[error("unknown answer token '{0}'")]
    UnknownAnswerToken(String),
    #[error("expected {expected} at byte {at}, found '{found}'")]
    Expected {
        expected: &'static str,
        found: String,
        at: usize,
    },
    #[error("predicate ended unexpectedly, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("trailing input at byte {at}")]
    TrailingInput { at: usize },
    #[error("predicate is empty")]
    Empty,
}

impl Expr {
    /// Parse a predicate string into an expression tree.
    pub fn parse(raw: &str) -> Result<Self, PredicateParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PredicateParseError::Empty);
        }
        if trimmed == "always" {
            return Ok(Expr::Always);
        }

        let tokens = lex(trimmed)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.peek() {
            Some(lexed) => Err(PredicateParseError::TrailingInput { at: lexed.at }),
            None => Ok(expr),
        }
    }

    /// Evaluate against explicit answer/profile contexts.
    ///
    /// Unknown references degrade to [`Tri::Indeterminate`] rather than
    /// erroring; schema validation is responsible for ruling them out.
    pub fn evaluate(&self, answers: &AnswerSet, profile: &ProfileFacts) -> Tri {
        match self {
            Expr::Always => Tri::True,
            Expr::AnswerEq {
                question_id,
                token,
                negated,
            } => match answers.get(question_id) {
                Some(answered) => Tri::known((answered == *token) != *negated),
                None => Tri::Indeterminate,
            },
            Expr::AnswerIn {
                question_id,
                tokens,
            } => match answers.get(question_id) {
                Some(answered) => Tri::known(tokens.contains(&answered)),
                None => Tri::Indeterminate,
            },
            Expr::ProfileEq { field, expected } => match profile.get(field) {
                Some(value) => Tri::known(value == *expected),
                None => Tri::Indeterminate,
            },
            Expr::Not(inner) => inner.evaluate(answers, profile).negate(),
            Expr::And(lhs, rhs) => lhs
                .evaluate(answers, profile)
                .and(rhs.evaluate(answers, profile)),
            Expr::Or(lhs, rhs) => lhs
                .evaluate(answers, profile)
                .or(rhs.evaluate(answers, profile)),
        }
    }

    /// Question ids this predicate reads, for load-time reference checks.
    pub fn referenced_questions(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_questions(&mut out);
        out
    }

    /// Profile fields this predicate reads.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_questions<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::AnswerEq { question_id, .. } | Expr::AnswerIn { question_id, .. } => {
                out.push(question_id)
            }
            Expr::Not(inner) => inner.collect_questions(out),
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.collect_questions(out);
                rhs.collect_questions(out);
            }
            Expr::Always | Expr::ProfileEq { .. } => {}
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::ProfileEq { field, .. } => out.push(field),
            Expr::Not(inner) => inner.collect_fields(out),
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
            Expr::Always | Expr::AnswerEq { .. } | Expr::AnswerIn { .. } => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    StrLit(String),
    EqEq,
    NotEq,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Dot,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => name.clone(),
            Token::StrLit(value) => format!("'{value}'"),
            Token::EqEq => "==".to_string(),
            Token::NotEq => "!=".to_string(),
            Token::LBracket => "[".to_string(),
            Token::RBracket => "]".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
            Token::Dot => ".".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Lexed {
    token: Token,
    at: usize,
}

fn lex(raw: &str) -> Result<Vec<Lexed>, PredicateParseError> {
    let bytes = raw.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '\'' => {
                let start = i;
                i += 1;
                let begin = i;
                while i < bytes.len() && bytes[i] as char != '\'' {
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(PredicateParseError::UnterminatedString { at: start });
                }
                tokens.push(Lexed {
                    token: Token::StrLit(raw[begin..i].to_string()),
                    at: start,
                });
                i += 1;
            }
            '=' => {
                if i + 1 < bytes.len() && bytes[i + 1] as char == '=' {
                    tokens.push(Lexed {
                        token: Token::EqEq,
                        at: i,
                    });
                    i += 2;
                } else {
                    return Err(PredicateParseError::UnexpectedChar { found: '=', at: i });
                }
            }
            '!' => {
                if i + 1 < bytes.len() && bytes[i + 1] as char == '=' {
                    tokens.push(Lexed {
                        token: Token::NotEq,
                        at: i,
                    });
                    i += 2;
                } else {
                    return Err(PredicateParseError::UnexpectedChar { found: '!', at: i });
                }
            }
            '[' => {
                tokens.push(Lexed {
                    token: Token::LBracket,
                    at: i,
                });
                i += 1;
            }
            ']' => {
                tokens.push(Lexed {
                    token: Token::RBracket,
                    at: i,
                });
                i += 1;
            }
            '(' => {
                tokens.push(Lexed {
                    token: Token::LParen,
                    at: i,
                });
                i += 1;
            }
            ')' => {
                tokens.push(Lexed {
                    token: Token::RParen,
                    at: i,
                });
                i += 1;
            }
            ',' => {
                tokens.push(Lexed {
                    token: Token::Comma,
                    at: i,
                });
                i += 1;
            }
            '.' => {
                tokens.push(Lexed {
                    token: Token::Dot,
                    at: i,
                });
                i += 1;
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() {
                    let b = bytes[i] as char;
                    if b.is_ascii_alphanumeric() || b == '_' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Lexed {
                    token: Token::Ident(raw[start..i].to_string()),
                    at: start,
                });
            }
            other => return Err(PredicateParseError::UnexpectedChar { found: other, at: i }),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Lexed>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Lexed> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &'static str) -> Result<Lexed, PredicateParseError> {
        let lexed = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(PredicateParseError::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(lexed)
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), PredicateParseError> {
        let lexed = self.next(expected)?;
        if lexed.token == token {
            Ok(())
        } else {
            Err(PredicateParseError::Expected {
                expected,
                found: lexed.token.describe(),
                at: lexed.at,
            })
        }
    }

    fn peek_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Lexed { token: Token::Ident(ident), .. }) if ident == name)
    }

    fn parse_or(&mut self) -> Result<Expr, PredicateParseError> {
        let mut expr = self.parse_and()?;
        while self.peek_ident("or") {
            self.pos += 1;
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, PredicateParseError> {
        let mut expr = self.parse_unary()?;
        while self.peek_ident("and") {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, PredicateParseError> {
        if self.peek_ident("not") {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, PredicateParseError> {
        let lexed = self.next("a comparison or '('")?;
        match lexed.token {
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) if name == "answers" => self.parse_answers_comparison(),
            Token::Ident(name) if name == "profile" => self.parse_profile_comparison(),
            other => Err(PredicateParseError::Expected {
                expected: "'answers', 'profile', 'not', or '('",
                found: other.describe(),
                at: lexed.at,
            }),
        }
    }

    fn parse_answers_comparison(&mut self) -> Result<Expr, PredicateParseError> {
        self.expect(Token::LBracket, "'['")?;
        let question_id = self.parse_str_lit("a quoted question id")?;
        self.expect(Token::RBracket, "']'")?;

        let op = self.next("'==', '!=', or 'in'")?;
        match op.token {
            Token::EqEq | Token::NotEq => {
                let negated = op.token == Token::NotEq;
                let raw = self.parse_str_lit("a quoted answer token")?;
                let token = AnswerToken::parse(&raw)
                    .ok_or(PredicateParseError::UnknownAnswerToken(raw))?;
                Ok(Expr::AnswerEq {
                    question_id,
                    token,
                    negated,
                })
            }
            Token::Ident(name) if name == "in" => {
                self.expect(Token::LBracket, "'['")?;
                let mut tokens = Vec::new();
                loop {
                    let raw = self.parse_str_lit("a quoted answer token")?;
                    let token = AnswerToken::parse(&raw)
                        .ok_or(PredicateParseError::UnknownAnswerToken(raw))?;
                    tokens.push(token);

                    let next = self.next("',' or ']'")?;
                    match next.token {
                        Token::Comma => continue,
                        Token::RBracket => break,
                        other => {
                            return Err(PredicateParseError::Expected {
                                expected: "',' or ']'",
                                found: other.describe(),
                                at: next.at,
                            })
                        }
                    }
                }
                Ok(Expr::AnswerIn {
                    question_id,
                    tokens,
                })
            }
            other => Err(PredicateParseError::Expected {
                expected: "'==', '!=', or 'in'",
                found: other.describe(),
                at: op.at,
            }),
        }
    }

    fn parse_profile_comparison(&mut self) -> Result<Expr, PredicateParseError> {
        let mut field = String::new();
        loop {
            self.expect(Token::Dot, "'.'")?;
            let part = self.next("a field name")?;
            match part.token {
                Token::Ident(name) => {
                    if !field.is_empty() {
                        field.push('.');
                    }
                    field.push_str(&name);
                }
                other => {
                    return Err(PredicateParseError::Expected {
                        expected: "a field name",
                        found: other.describe(),
                        at: part.at,
                    })
                }
            }
            if !matches!(self.peek(), Some(Lexed { token: Token::Dot, .. })) {
                break;
            }
        }

        let op = self.next("'==' or '!='")?;
        let negated = match op.token {
            Token::EqEq => false,
            Token::NotEq => true,
            other => {
                return Err(PredicateParseError::Expected {
                    expected: "'==' or '!='",
                    found: other.describe(),
                    at: op.at,
                })
            }
        };

        let literal = self.next("'true' or 'false'")?;
        let value = match literal.token {
            Token::Ident(name) if name == "true" => true,
            Token::Ident(name) if name == "false" => false,
            other => {
                return Err(PredicateParseError::Expected {
                    expected: "'true' or 'false'",
                    found: other.describe(),
                    at: literal.at,
                })
            }
        };

        Ok(Expr::ProfileEq {
            field,
            expected: value != negated,
        })
    }

    fn parse_str_lit(&mut self, expected: &'static str) -> Result<String, PredicateParseError> {
        let lexed = self.next(expected)?;
        match lexed.token {
            Token::StrLit(value) => Ok(value),
            other => Err(PredicateParseError::Expected {
                expected,
                found: other.describe(),
                at: lexed.at,
            }),
        }
    }
}
