use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected {found:?} at byte {pos}")]
    Unexpected { found: char, pos: usize },
    #[error("unterminated attribute selector")]
    UnterminatedAttribute,
    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),
}

/// One simple selector inside a compound selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Universal,
    Type(String),  // element/tag selector, lowercased
    Id(String),    // #id selector
    Class(String), // .class selector
    Attribute { name: String, value: Option<String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// `compounds[i]` relates to `compounds[i + 1]` through `combinators[i]`;
/// the last compound is the subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<Vec<Selector>>,
    pub combinators: Vec<Combinator>,
}

/// Comma-separated selector list, e.g. `a, .nav a, button[role="link"]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_selector_list(s)
    }
}

pub fn parse_selector_list(input: &str) -> Result<SelectorList, SelectorError> {
    let mut cursor = Cursor { src: input, pos: 0 };
    let mut selectors = Vec::new();
    loop {
        cursor.skip_ws();
        selectors.push(parse_complex(&mut cursor)?);
        match cursor.peek() {
            Some(',') => cursor.bump(),
            None => break,
            Some(found) => {
                return Err(SelectorError::Unexpected {
                    found,
                    pos: cursor.pos,
                });
            }
        }
    }
    Ok(SelectorList { selectors })
}

fn parse_complex(cursor: &mut Cursor<'_>) -> Result<ComplexSelector, SelectorError> {
    let mut compounds = vec![parse_compound(cursor)?];
    let mut combinators = Vec::new();
    loop {
        let had_ws = cursor.skip_ws();
        match cursor.peek() {
            None | Some(',') => break,
            Some('>') => {
                cursor.bump();
                cursor.skip_ws();
                combinators.push(Combinator::Child);
            }
            Some(_) if had_ws => combinators.push(Combinator::Descendant),
            Some(found) => {
                return Err(SelectorError::Unexpected {
                    found,
                    pos: cursor.pos,
                });
            }
        }
        compounds.push(parse_compound(cursor)?);
    }
    Ok(ComplexSelector {
        compounds,
        combinators,
    })
}

fn parse_compound(cursor: &mut Cursor<'_>) -> Result<Vec<Selector>, SelectorError> {
    let mut out = Vec::new();
    while let Some(c) = cursor.peek() {
        match c {
            '*' if out.is_empty() => {
                cursor.bump();
                out.push(Selector::Universal);
            }
            c if out.is_empty() && is_ident_char(c) => {
                out.push(Selector::Type(cursor.ident().to_ascii_lowercase()));
            }
            '#' => {
                cursor.bump();
                out.push(Selector::Id(cursor.required_ident()?));
            }
            '.' => {
                cursor.bump();
                out.push(Selector::Class(cursor.required_ident()?));
            }
            '[' => {
                cursor.bump();
                out.push(parse_attribute(cursor)?);
            }
            _ => break,
        }
    }
    if out.is_empty() {
        return match cursor.peek() {
            Some(found) => Err(SelectorError::Unexpected {
                found,
                pos: cursor.pos,
            }),
            None => Err(SelectorError::Empty),
        };
    }
    Ok(out)
}

// Cursor sits just past '['.
fn parse_attribute(cursor: &mut Cursor<'_>) -> Result<Selector, SelectorError> {
    cursor.skip_ws();
    let name = cursor.required_ident()?.to_ascii_lowercase();
    cursor.skip_ws();
    let value = match cursor.peek() {
        Some('=') => {
            cursor.bump();
            cursor.skip_ws();
            let value = match cursor.peek() {
                Some(q @ ('"' | '\'')) => cursor.quoted(q)?,
                Some(_) => cursor.required_ident()?,
                None => return Err(SelectorError::UnterminatedAttribute),
            };
            cursor.skip_ws();
            Some(value)
        }
        _ => None,
    };
    match cursor.peek() {
        Some(']') => {
            cursor.bump();
            Ok(Selector::Attribute { name, value })
        }
        Some(found) => Err(SelectorError::Unexpected {
            found,
            pos: cursor.pos,
        }),
        None => Err(SelectorError::UnterminatedAttribute),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    /// Returns whether any whitespace was consumed.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.bump();
        }
        self.pos != start
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn required_ident(&mut self) -> Result<String, SelectorError> {
        let ident = self.ident();
        if ident.is_empty() {
            return match self.peek() {
                Some(found) => Err(SelectorError::Unexpected {
                    found,
                    pos: self.pos,
                }),
                None => Err(SelectorError::UnterminatedAttribute),
            };
        }
        Ok(ident)
    }

    fn quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        let start = self.pos;
        self.bump();
        let body_start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let body = self.src[body_start..self.pos].to_string();
                self.bump();
                return Ok(body);
            }
            self.bump();
        }
        Err(SelectorError::UnterminatedString(start))
    }
}
