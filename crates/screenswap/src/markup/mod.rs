//! Fragment parsing: markup text to displayable content plus script descriptors.

use chumsky::Parser;
use smallvec::SmallVec;

use crate::error::{MarkupError, MarkupIssue};

mod entities;
mod lexer;
mod node;
mod report;
mod serialize;
mod tree;

pub use entities::{decode_entities, escape_attribute, escape_text};
pub use lexer::{Attribute, Span, Spanned, Token, lexer};
pub use node::{
    Element, Node, RAW_TEXT_ELEMENTS, VOID_ELEMENTS, is_raw_text, is_void, select, walk_elements,
    walk_elements_mut,
};
pub use serialize::to_markup;

/// A script found in a fragment, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptDescriptor {
    External { locator: String },
    Inline { source: String },
}

impl ScriptDescriptor {
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }
}

pub type Scripts = SmallVec<[ScriptDescriptor; 4]>;

/// A parsed screen: what to mount and what to run afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFragment {
    pub content: Vec<Node>,
    pub scripts: Scripts,
}

impl ParsedFragment {
    pub fn to_markup(&self) -> String {
        to_markup(&self.content)
    }
}

/// Parses fragment markup without executing anything.
///
/// Full documents contribute the children of `<body>`; scripts are collected
/// from the whole document, `<head>` included.
pub fn parse_fragment(location: &str, markup: &str) -> Result<ParsedFragment, MarkupError> {
    let to_error = |issues: Vec<MarkupIssue>| MarkupError {
        location: location.to_owned(),
        source_text: markup.to_owned(),
        issues,
    };

    let tokens = lexer().parse(markup).into_result().map_err(|errors| {
        to_error(
            errors
                .into_iter()
                .map(|error| MarkupIssue {
                    span: error.span().into_range(),
                    message: error.to_string(),
                })
                .collect(),
        )
    })?;

    let tree = tree::build(tokens).map_err(to_error)?;
    Ok(ParsedFragment {
        content: displayable(tree.nodes),
        scripts: tree.scripts.into(),
    })
}

fn take_element(nodes: &mut Vec<Node>, name: &str) -> Option<Element> {
    let position = nodes
        .iter()
        .position(|node| node.as_element().is_some_and(|element| element.name == name))?;
    match nodes.remove(position) {
        Node::Element(element) => Some(element),
        _ => None,
    }
}

fn without_head(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .filter(|node| !node.as_element().is_some_and(|element| element.name == "head"))
        .collect()
}

fn displayable(mut nodes: Vec<Node>) -> Vec<Node> {
    if let Some(mut html) = take_element(&mut nodes, "html") {
        return match take_element(&mut html.children, "body") {
            Some(body) => body.children,
            None => without_head(html.children),
        };
    }
    if let Some(body) = take_element(&mut nodes, "body") {
        return body.children;
    }
    without_head(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_without_scripts() {
        let fragment = parse_fragment(
            "step1.html",
            "<section class=\"screen\"><h1>Your details</h1></section>",
        )
        .unwrap();
        assert!(fragment.scripts.is_empty());
        assert_eq!(fragment.content.len(), 1);
        assert_eq!(fragment.content[0].text_content(), "Your details");
    }

    #[test]
    fn scripts_are_extracted_in_source_order() {
        let fragment = parse_fragment(
            "step2.html",
            "<script src=\"js/common.js\"></script>\
             <div id=\"q\">Question</div>\
             <script>window.__pageInitFunction__ = () => setupOptionButtons();</script>\
             <script src='js/extra.js'></script>",
        )
        .unwrap();
        assert_eq!(
            fragment.scripts.as_slice(),
            [
                ScriptDescriptor::External {
                    locator: "js/common.js".to_owned()
                },
                ScriptDescriptor::Inline {
                    source: "window.__pageInitFunction__ = () => setupOptionButtons();".to_owned()
                },
                ScriptDescriptor::External {
                    locator: "js/extra.js".to_owned()
                },
            ]
        );
        assert_eq!(fragment.to_markup(), "<div id=\"q\">Question</div>");
    }

    #[test]
    fn full_document_uses_body_and_collects_head_scripts() {
        let fragment = parse_fragment(
            "step3.html",
            "<!DOCTYPE html><html><head><title>Step 3</title>\
             <script src=\"head.js\"></script></head>\
             <body><p>Body</p><script>inline()</script></body></html>",
        )
        .unwrap();
        assert_eq!(fragment.to_markup(), "<p>Body</p>");
        assert_eq!(fragment.scripts.len(), 2);
        assert!(fragment.scripts[0].is_external());
        assert!(!fragment.scripts[1].is_external());
    }

    #[test]
    fn nested_script_is_removed_from_content() {
        let fragment =
            parse_fragment("s.html", "<div><span>a</span><script>b()</script></div>").unwrap();
        assert_eq!(fragment.to_markup(), "<div><span>a</span></div>");
        assert_eq!(fragment.scripts.len(), 1);
    }

    #[test]
    fn empty_markup_is_an_empty_fragment() {
        let fragment = parse_fragment("empty.html", "").unwrap();
        assert!(fragment.content.is_empty());
        assert!(fragment.scripts.is_empty());
    }

    #[test]
    fn markup_browsers_accept_still_parses() {
        let fragment = parse_fragment(
            "step.html",
            "<div><p>Hello</p></p></div><input value=\"a\"b><script>init()</script>",
        )
        .unwrap();
        assert_eq!(fragment.to_markup(), "<div><p>Hello</p></div><input value=\"a\" b>");
        assert_eq!(
            fragment.scripts.as_slice(),
            [ScriptDescriptor::Inline {
                source: "init()".to_owned()
            }]
        );
    }

    #[test]
    fn malformed_markup_is_a_parse_error() {
        let error = parse_fragment("bad.html", "<div class=\"open").unwrap_err();
        assert_eq!(error.location, "bad.html");
        assert!(!error.issues.is_empty());
    }
}
