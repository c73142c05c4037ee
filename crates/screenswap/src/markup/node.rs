//! Detached markup tree.

/// Elements that never have children or a close tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is written verbatim.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Element(element) => element
                .children
                .iter()
                .for_each(|child| child.collect_text(out)),
            Self::Text(text) => out.push_str(text),
            Self::Comment(_) => {}
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// An element with ordered attributes. A boolean attribute is stored with an
/// empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attribute, _)| attribute.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(attribute, _)| attribute.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes
            .retain(|(attribute, _)| !attribute.eq_ignore_ascii_case(name));
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|existing| existing == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let mut classes: Vec<&str> = self.classes().collect();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attribute("class", joined);
    }

    pub fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let joined = self
            .classes()
            .filter(|existing| *existing != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute("class", joined);
    }

    /// Returns whether the class is present afterwards.
    pub fn toggle_class(&mut self, class: &str) -> bool {
        if self.has_class(class) {
            self.remove_class(class);
            false
        } else {
            self.add_class(class);
            true
        }
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    pub fn set_text_content(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }
}

/// Visits every element in document order.
pub fn walk_elements<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a Element)) {
    for node in nodes {
        if let Node::Element(element) = node {
            visit(element);
            walk_elements(&element.children, visit);
        }
    }
}

/// Visits every element in document order, mutably.
pub fn walk_elements_mut(nodes: &mut [Node], visit: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let Node::Element(element) = node {
            visit(element);
            walk_elements_mut(&mut element.children, visit);
        }
    }
}

/// Elements of `nodes` in document order that satisfy `predicate`.
pub fn select<'a>(nodes: &'a [Node], predicate: impl Fn(&Element) -> bool) -> Vec<&'a Element> {
    let mut selected = Vec::new();
    walk_elements(nodes, &mut |element| {
        if predicate(element) {
            selected.push(element);
        }
    });
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_list_operations() {
        let mut button = Element::new("button").with_attribute("class", "option-btn  large");
        assert!(button.has_class("option-btn"));
        assert!(!button.has_class("selected"));

        button.add_class("selected");
        assert_eq!(button.attribute("class"), Some("option-btn large selected"));

        assert!(!button.toggle_class("selected"));
        assert_eq!(button.attribute("class"), Some("option-btn large"));

        assert!(button.toggle_class("selected"));
        button.remove_class("large");
        assert_eq!(button.attribute("class"), Some("option-btn selected"));
    }

    #[test]
    fn text_content_skips_comments() {
        let node: Node = Element::new("p")
            .with_child(Node::text("Hello "))
            .with_child(Node::Comment("ignored".into()))
            .with_child(Element::new("b").with_child(Node::text("world")))
            .into();
        assert_eq!(node.text_content(), "Hello world");
    }

    #[test]
    fn select_in_document_order() {
        let nodes = vec![Node::from(
            Element::new("div")
                .with_child(Element::new("span").with_attribute("id", "a"))
                .with_child(
                    Element::new("p").with_child(Element::new("span").with_attribute("id", "b")),
                ),
        )];
        let ids: Vec<_> = select(&nodes, |element| element.name == "span")
            .into_iter()
            .filter_map(|element| element.attribute("id"))
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
