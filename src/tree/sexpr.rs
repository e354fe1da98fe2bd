//! Reading and writing parse trees as brace S-expressions:
//! `{kind key=value "text" children...}`.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, cut, map},
    error::{convert_error, VerboseError},
    multi::many0,
    sequence::{delimited, preceded, separated_pair},
    IResult,
};

use super::*;

pub type Error<'a> = VerboseError<&'a str>;
pub type Res<'a, T> = IResult<&'a str, T, Error<'a>>;

/// An element as written, before its tag is checked against the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    tag: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Attr(String, String),
    Text(String),
    List(Element),
}

/// Parses a string literal, e.g. "2,3"
fn parse_string_literal(input: &str) -> Res<'_, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"'))(input)
}

fn parse_bare(input: &str) -> Res<'_, &str> {
    take_while1(|c: char| !c.is_whitespace() && c != '{' && c != '}' && c != '"')(input)
}

fn parse_key(input: &str) -> Res<'_, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn parse_attribute(input: &str) -> Res<'_, Item> {
    map(
        separated_pair(parse_key, char('='), alt((parse_string_literal, parse_bare))),
        |(key, value): (&str, &str)| Item::Attr(key.to_string(), value.to_string()),
    )(input)
}

fn parse_item(input: &str) -> Res<'_, Item> {
    preceded(
        multispace0,
        alt((
            map(parse_element, Item::List),
            map(parse_string_literal, |text: &str| Item::Text(text.to_string())),
            parse_attribute,
        )),
    )(input)
}

fn parse_element(input: &str) -> Res<'_, Element> {
    let (input, _) = char('{')(input)?;
    let (input, tag) = cut(preceded(multispace0, parse_key))(input)?;
    let (input, items) = many0(parse_item)(input)?;
    let (input, _) = cut(preceded(multispace0, char('}')))(input)?;
    Ok((
        input,
        Element {
            tag: tag.to_string(),
            items,
        },
    ))
}

fn parse(input: &str) -> std::result::Result<Element, String> {
    match all_consuming(delimited(multispace0, parse_element, multispace0))(input) {
        Ok((_, element)) => Ok(element),
        Err(e) => match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => Err(convert_error(input, e)),
            nom::Err::Incomplete(_) => Err("incomplete".to_string()),
        },
    }
}

impl ParseTree {
    /// Reads a tree from its text form. The outermost element must be `molecule`.
    pub fn parse(input: &str) -> Result<ParseTree> {
        let element = parse(input).map_err(ChemError::TreeFormat)?;
        if element.tag != "molecule" {
            return Err(ChemError::TreeFormat(format!(
                "expected a molecule element, found '{}'",
                element.tag
            )));
        }
        let mut tree = ParseTree::new();
        let root = tree.root();
        tree.fill(root, element.items)?;
        Ok(tree)
    }

    fn fill(&mut self, node: NodeId, items: Vec<Item>) -> Result<()> {
        for item in items {
            match item {
                Item::Attr(key, value) => {
                    self[node].attrs.insert(key, value);
                }
                Item::Text(text) => self[node].text.push_str(&text),
                Item::List(element) => {
                    let mut attrs = Attrs::new();
                    let mut rest = Vec::new();
                    for item in element.items {
                        match item {
                            Item::Attr(key, value) => {
                                attrs.insert(key, value);
                            }
                            other => rest.push(other),
                        }
                    }
                    let kind = NodeKind::from_tag(&element.tag, &mut attrs)?;
                    let child = self.create(kind, "");
                    self[child].attrs = attrs;
                    self.append_child(node, child);
                    self.fill(child, rest)?;
                }
            }
        }
        Ok(())
    }

    fn write_node(&self, f: &mut Formatter<'_>, id: NodeId, depth: usize) -> FmtResult {
        let node = &self[id];
        write!(f, "{{{}", node.kind.tag())?;
        let payload = node.kind.payload_attrs();
        for (key, value) in payload.iter().map(|(k, v)| (*k, v.as_str())).chain(
            node.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ) {
            if needs_quotes(value) {
                write!(f, " {key}=\"{value}\"")?;
            } else {
                write!(f, " {key}={value}")?;
            }
        }
        if !node.text.is_empty() {
            write!(f, " \"{}\"", node.text)?;
        }
        for &child in &node.children {
            write!(f, "\n{}", "  ".repeat(depth + 1))?;
            self.write_node(f, child, depth + 1)?;
        }
        write!(f, "}}")
    }
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '{' || c == '}')
}

impl Display for ParseTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.write_node(f, self.root(), 0)
    }
}

impl FromStr for ParseTree {
    type Err = ChemError;

    fn from_str(s: &str) -> Result<Self> {
        ParseTree::parse(s)
    }
}
