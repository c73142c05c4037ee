//! Builds the detached tree from lexer tokens.
//!
//! Lenient in the places browsers are lenient (unclosed elements, implied
//! or unmatched end tags), strict where the input cannot be a screen
//! fragment at all.

use std::borrow::Cow;

use super::entities::decode_entities;
use super::lexer::{Attribute, Span, Spanned, Token};
use super::node::{Element, Node, is_raw_text, is_void};
use super::ScriptDescriptor;
use crate::error::MarkupIssue;

/// Elements that implicitly close an open sibling of the same name.
const SELF_NESTING_FORBIDDEN: &[&str] = &["li", "option", "p", "tr", "td", "th", "dt", "dd"];

pub(super) struct Tree {
    pub nodes: Vec<Node>,
    pub scripts: Vec<ScriptDescriptor>,
}

struct Builder {
    root: Vec<Node>,
    open: Vec<(Element, Span)>,
    scripts: Vec<ScriptDescriptor>,
    issues: Vec<MarkupIssue>,
}

impl Builder {
    fn append(&mut self, node: Node) {
        match self.open.last_mut() {
            Some((parent, _)) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn close_top(&mut self) {
        if let Some((element, _)) = self.open.pop() {
            self.append(Node::Element(element));
        }
    }

    fn open_element(&mut self, element: Element, span: Span) {
        if SELF_NESTING_FORBIDDEN.contains(&element.name.as_str())
            && self
                .open
                .last()
                .is_some_and(|(top, _)| top.name == element.name)
        {
            self.close_top();
        }
        self.open.push((element, span));
    }

    fn close_element(&mut self, name: &str, span: Span) {
        if is_void(name) {
            return;
        }
        match self.open.iter().rposition(|(element, _)| element.name == name) {
            Some(position) => {
                while self.open.len() > position {
                    self.close_top();
                }
            }
            // Browsers drop unmatched end tags
            None => log::warn!("ignoring </{name}> at {span:?} with no matching open element"),
        }
    }

    fn finish(mut self) -> Result<Tree, Vec<MarkupIssue>> {
        while !self.open.is_empty() {
            self.close_top();
        }
        if self.issues.is_empty() {
            Ok(Tree {
                nodes: self.root,
                scripts: self.scripts,
            })
        } else {
            Err(self.issues)
        }
    }
}

fn element_from(name: &str, attributes: &[Attribute<'_>]) -> Element {
    let mut element = Element::new(name);
    for attribute in attributes {
        let value = attribute.value.map(decode_entities).unwrap_or(Cow::Borrowed(""));
        element.set_attribute(attribute.name.to_ascii_lowercase(), value.into_owned());
    }
    element
}

fn script_descriptor(attributes: &[Attribute<'_>], body: &str) -> ScriptDescriptor {
    let src = attributes
        .iter()
        .find(|attribute| attribute.name.eq_ignore_ascii_case("src"))
        .and_then(|attribute| attribute.value)
        .map(decode_entities)
        .filter(|src| !src.trim().is_empty());
    match src {
        Some(src) => ScriptDescriptor::External {
            locator: src.trim().to_owned(),
        },
        None => ScriptDescriptor::Inline {
            source: body.to_owned(),
        },
    }
}

pub(super) fn build(tokens: Vec<Spanned<Token<'_>>>) -> Result<Tree, Vec<MarkupIssue>> {
    let mut builder = Builder {
        root: Vec::new(),
        open: Vec::new(),
        scripts: Vec::new(),
        issues: Vec::new(),
    };

    for Spanned { node: token, span } in tokens {
        match token {
            Token::Doctype(_) => {}
            Token::Comment(comment) => builder.append(Node::Comment(comment.to_owned())),
            Token::Text(text) => builder.append(Node::Text(decode_entities(text).into_owned())),
            Token::RawElement {
                name,
                attributes,
                body,
            } => {
                if name.eq_ignore_ascii_case("script") {
                    // Scripts never become displayable content
                    builder.scripts.push(script_descriptor(&attributes, body));
                } else {
                    let element = element_from(name, &attributes).with_child(Node::text(body));
                    builder.append(Node::Element(element));
                }
            }
            Token::OpenTag {
                name,
                attributes,
                self_closing,
            } => {
                let element = element_from(name, &attributes);
                if is_raw_text(&element.name) {
                    builder.issues.push(MarkupIssue {
                        span: span.into_range(),
                        message: format!("<{}> element is never closed", element.name),
                    });
                } else if self_closing || is_void(&element.name) {
                    builder.append(Node::Element(element));
                } else {
                    builder.open_element(element, span);
                }
            }
            Token::CloseTag(name) => builder.close_element(&name.to_ascii_lowercase(), span),
        }
    }

    builder.finish()
}
