//! Minimal selector matching for the in-memory document.
//!
//! Supported: compound simple selectors (`tag`, `*`, `#id`, `.class`,
//! `[attr]`, `[attr=value]`) and comma-separated groups. Combinators and
//! pseudo-classes are rejected with [`Error::Selector`].

use crate::dom::Element;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeTest {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag
            && tag != element.tag()
        {
            return false;
        }
        if !self.ids.is_empty() {
            let id = element.id();
            if self.ids.iter().any(|want| *want != id) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let classes = element.class_list().tokens();
            if !self.classes.iter().all(|c| classes.contains(c)) {
                return false;
            }
        }
        self.attributes.iter().all(|test| match &test.value {
            None => element.has_attribute(&test.name),
            Some(want) => element.get_attribute(&test.name).as_deref() == Some(want),
        })
    }
}

/// A parsed selector group list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Compound>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let groups = split_groups(input)
            .into_iter()
            .map(|group| parse_compound(input, group.trim()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { groups })
    }

    /// Whether any group matches `element`.
    #[must_use]
    pub fn matches(&self, element: &Element) -> bool {
        self.groups.iter().any(|group| group.matches(element))
    }
}

/// Split on commas outside of brackets and quotes.
fn split_groups(input: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&input[start..]);
    groups
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn parse_compound(selector: &str, group: &str) -> Result<Compound> {
    let fail = |message: &str| Error::selector(selector, message);
    if group.is_empty() {
        return Err(fail("empty selector group"));
    }

    let chars: Vec<char> = group.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    let ident = |pos: &mut usize| -> String {
        let start = *pos;
        while *pos < chars.len() && is_ident_char(chars[*pos]) {
            *pos += 1;
        }
        chars[start..*pos].iter().collect()
    };

    if chars[0] == '*' {
        pos = 1;
    } else if is_ident_char(chars[0]) {
        compound.tag = Some(ident(&mut pos).to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                let name = ident(&mut pos);
                if name.is_empty() {
                    return Err(fail("expected an id after '#'"));
                }
                compound.ids.push(name);
            }
            '.' => {
                pos += 1;
                let name = ident(&mut pos);
                if name.is_empty() {
                    return Err(fail("expected a class name after '.'"));
                }
                compound.classes.push(name);
            }
            '[' => {
                pos += 1;
                let name = ident(&mut pos);
                if name.is_empty() {
                    return Err(fail("expected an attribute name"));
                }
                let value = if chars.get(pos) == Some(&'=') {
                    pos += 1;
                    Some(match chars.get(pos) {
                        Some(&q @ ('"' | '\'')) => {
                            pos += 1;
                            let start = pos;
                            while pos < chars.len() && chars[pos] != q {
                                pos += 1;
                            }
                            if pos == chars.len() {
                                return Err(fail("unterminated attribute value"));
                            }
                            let value: String = chars[start..pos].iter().collect();
                            pos += 1;
                            value
                        }
                        _ => ident(&mut pos),
                    })
                } else {
                    None
                };
                if chars.get(pos) != Some(&']') {
                    return Err(fail("expected ']'"));
                }
                pos += 1;
                compound.attributes.push(AttributeTest { name, value });
            }
            c if c.is_whitespace() || matches!(c, '>' | '+' | '~') => {
                return Err(fail("combinators are not supported"));
            }
            ':' => return Err(fail("pseudo-classes are not supported")),
            c => return Err(fail(&format!("unexpected character {c:?}"))),
        }
    }
    Ok(compound)
}
