use std::fmt;

use thiserror::Error;

use crate::dom::dom_model::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected '{found}' at offset {offset} in selector '{selector}'")]
    Unexpected {
        selector: String,
        offset: usize,
        found: char,
    },

    #[error("unterminated {what} in selector '{selector}'")]
    Unterminated { selector: String, what: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Word(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMatcher {
    pub name: String,
    pub op: AttrOp,
}

impl AttrMatcher {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => value == v,
            AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
            AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
            AttrOp::Contains(v) => !v.is_empty() && value.contains(v.as_str()),
            AttrOp::Word(v) => value.split_whitespace().any(|w| w == v),
        }
    }
}

/// Tag, id, classes and attribute tests that all apply to one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrMatcher>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag {
            if doc.tag(node) != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let have = doc.classes(node);
            if !self.classes.iter().all(|c| have.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs
            .iter()
            .all(|a| a.matches(doc.attribute(node, &a.name)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// A chain of compounds, e.g. `[role="feed"] > div.unit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    compounds: Vec<Compound>,
    // combinators[i] joins compounds[i] and compounds[i + 1]
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.match_at(self.compounds.len() - 1, doc, node)
    }

    fn match_at(&self, idx: usize, doc: &Document, node: NodeId) -> bool {
        if !self.compounds[idx].matches(doc, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| self.match_at(idx - 1, doc, p)),
            Combinator::Descendant => doc.ancestors(node).any(|a| self.match_at(idx - 1, doc, a)),
        }
    }
}

/// Parsed, comma-separated selector list. Matches when any member matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<ComplexSelector>,
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut parser = Parser {
            source: trimmed,
            chars: trimmed.chars().collect(),
            pos: 0,
        };
        let selectors = parser.parse_list()?;
        Ok(SelectorList {
            source: trimmed.to_string(),
            selectors,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(doc, node))
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                selector: self.source.to_string(),
                offset: self.pos,
                found,
            },
            None => SelectorError::Unterminated {
                selector: self.source.to_string(),
                what: "selector",
            },
        }
    }

    fn parse_list(&mut self) -> Result<Vec<ComplexSelector>, SelectorError> {
        let mut out = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.bump();
            out.push(self.parse_complex()?);
        }
        if self.peek().is_some() {
            return Err(self.unexpected());
        }
        Ok(out)
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        self.skip_ws();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = vec![];

        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_ws => combinators.push(Combinator::Descendant),
                Some(_) => return Err(self.unexpected()),
            }
            compounds.push(self.parse_compound()?);
        }

        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                universal = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident().to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.required_ident()?);
                }
                Some('.') => {
                    self.bump();
                    let class = self.required_ident()?;
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.bump();
                    let attr = self.parse_attr()?;
                    compound.attrs.push(attr);
                }
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<AttrMatcher, SelectorError> {
        self.skip_ws();
        let name = self.required_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op_prefix = match self.peek() {
            Some(']') => {
                self.bump();
                return Ok(AttrMatcher {
                    name,
                    op: AttrOp::Exists,
                });
            }
            Some('=') => None,
            Some(c @ ('^' | '$' | '*' | '~')) => {
                self.bump();
                Some(c)
            }
            _ => return Err(self.unexpected()),
        };
        if self.peek() != Some('=') {
            return Err(self.unexpected());
        }
        self.bump();

        self.skip_ws();
        let value = self.attr_value()?;
        self.skip_ws();
        if self.bump() != Some(']') {
            return Err(SelectorError::Unterminated {
                selector: self.source.to_string(),
                what: "attribute selector",
            });
        }

        let op = match op_prefix {
            None => AttrOp::Equals(value),
            Some('^') => AttrOp::Prefix(value),
            Some('$') => AttrOp::Suffix(value),
            Some('*') => AttrOp::Contains(value),
            _ => AttrOp::Word(value),
        };
        Ok(AttrMatcher { name, op })
    }

    fn attr_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('\\') => {
                            if let Some(c) = self.bump() {
                                value.push(c);
                            }
                        }
                        Some(c) if c == q => return Ok(value),
                        Some(c) => value.push(c),
                        None => {
                            return Err(SelectorError::Unterminated {
                                selector: self.source.to_string(),
                                what: "quoted value",
                            });
                        }
                    }
                }
            }
            _ => self.required_ident(),
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn required_ident(&mut self) -> Result<String, SelectorError> {
        let ident = self.ident();
        if ident.is_empty() {
            return Err(self.unexpected());
        }
        Ok(ident)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Quote a value for use inside an attribute selector.
pub fn quote_attr_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// True when `ident` can be written after `#` or `.` without escaping.
pub fn is_plain_ident(ident: &str) -> bool {
    !ident.is_empty()
        && ident.chars().all(is_ident_char)
        && !ident.starts_with(|c: char| c.is_ascii_digit())
}
