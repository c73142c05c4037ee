use super::entities::{escape_attribute, escape_text};
use super::node::{Element, Node, is_raw_text, is_void};

/// Serialises nodes back to markup, the form `innerHTML` expects.
pub fn to_markup(nodes: &[Node]) -> String {
    let mut output = String::new();
    for node in nodes {
        write_node(node, false, &mut output);
    }
    output
}

fn write_node(node: &Node, raw: bool, output: &mut String) {
    match node {
        Node::Element(element) => write_element(element, output),
        Node::Text(text) if raw => output.push_str(text),
        Node::Text(text) => output.push_str(&escape_text(text)),
        Node::Comment(comment) => {
            output.push_str("<!--");
            output.push_str(comment);
            output.push_str("-->");
        }
    }
}

fn write_element(element: &Element, output: &mut String) {
    output.push('<');
    output.push_str(&element.name);
    for (name, value) in &element.attributes {
        output.push(' ');
        output.push_str(name);
        if !value.is_empty() {
            output.push_str("=\"");
            output.push_str(&escape_attribute(value));
            output.push('"');
        }
    }
    output.push('>');
    if is_void(&element.name) {
        return;
    }
    let raw = is_raw_text(&element.name);
    for child in &element.children {
        write_node(child, raw, output);
    }
    output.push_str("</");
    output.push_str(&element.name);
    output.push('>');
}

#[cfg(test)]
mod tests {
    use super::super::parse_fragment;
    use super::*;

    #[test]
    fn reparsed_markup_is_stable() {
        let source = "<div class=\"q\"><h2>Who&#39;s applying?</h2>\
                      <input type=\"checkbox\" data-key=\"isGroup\" checked>\
                      <style>.q > h2 { color: red }</style><!-- c --></div>";
        let fragment = parse_fragment("step.html", source).unwrap();
        let markup = to_markup(&fragment.content);
        assert_eq!(
            markup,
            "<div class=\"q\"><h2>Who's applying?</h2>\
             <input type=\"checkbox\" data-key=\"isGroup\" checked>\
             <style>.q > h2 { color: red }</style><!-- c --></div>"
        );
        let again = parse_fragment("step.html", &markup).unwrap();
        assert_eq!(again.content, fragment.content);
    }

    #[test]
    fn bare_ampersand_reference_is_escaped_once() {
        let fragment = parse_fragment("menu.html", "<p>Fish &amp Chips</p>").unwrap();
        assert_eq!(to_markup(&fragment.content), "<p>Fish &amp; Chips</p>");
    }
}
