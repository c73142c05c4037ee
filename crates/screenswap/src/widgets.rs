//! Selection widgets shared by wizard screens.
//!
//! These operate on mounted content the same way the screens' click and
//! input handlers do: they adjust classes and form state in the tree and
//! persist the selection through a [`FieldStore`].

use serde_json::Value;

use crate::markup::{Element, Node, walk_elements_mut};
use crate::store::{FieldStore, FieldStoreExt};

pub const OPTION_BUTTON: &str = "option-btn";
pub const TAG_BUTTON: &str = "tag-btn";
pub const SELECTED: &str = "selected";
pub const PROGRESS_FILL: &str = "progress-fill";
pub const PROGRESS_TEXT: &str = "progress-text";
/// Store key holding the texts of all selected tag buttons.
pub const EVENT_TAGS_KEY: &str = "eventTags";

/// A value typed into a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    Text(String),
    Checked(bool),
}

impl FieldInput {
    fn into_value(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text),
            Self::Checked(checked) => Value::Bool(checked),
        }
    }
}

fn is_checkbox(element: &Element) -> bool {
    element.name == "input"
        && element
            .attribute("type")
            .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox"))
}

fn nth_with_class<'a>(content: &'a mut [Node], class: &str, index: usize) -> Option<&'a mut Element> {
    let mut seen = 0;
    let path = path_to(content, &mut |element| {
        if !element.has_class(class) {
            return false;
        }
        seen += 1;
        seen > index
    })?;
    element_at(content, &path)
}

/// Child indices leading to the first element, in document order, that
/// `matches` accepts.
fn path_to(nodes: &[Node], matches: &mut impl FnMut(&Element) -> bool) -> Option<Vec<usize>> {
    for (position, node) in nodes.iter().enumerate() {
        let Node::Element(element) = node else {
            continue;
        };
        if matches(element) {
            return Some(vec![position]);
        }
        if let Some(mut path) = path_to(&element.children, matches) {
            path.insert(0, position);
            return Some(path);
        }
    }
    None
}

fn element_at<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Element> {
    let (first, rest) = path.split_first()?;
    let element = nodes.get_mut(*first)?.as_element_mut()?;
    if rest.is_empty() {
        Some(element)
    } else {
        element_at(&mut element.children, rest)
    }
}

/// Selects the `index`-th option button (document order), deselecting every
/// other one, and saves its `data-key` → `data-value` pair when it has both.
///
/// Returns false when there is no such button.
pub fn click_option<S: FieldStore + ?Sized>(content: &mut [Node], index: usize, store: &S) -> bool {
    if nth_with_class(content, OPTION_BUTTON, index).is_none() {
        return false;
    }
    walk_elements_mut(content, &mut |element| {
        if element.has_class(OPTION_BUTTON) {
            element.remove_class(SELECTED);
        }
    });
    let Some(button) = nth_with_class(content, OPTION_BUTTON, index) else {
        return false;
    };
    button.add_class(SELECTED);
    let key = button.attribute("data-key").unwrap_or_default();
    let value = button.attribute("data-value").unwrap_or_default();
    if !key.is_empty() && !value.is_empty() {
        store.set(key, Value::String(value.to_owned()));
    }
    true
}

/// Toggles the `index`-th tag button and saves the trimmed texts of every
/// selected tag under [`EVENT_TAGS_KEY`].
///
/// Returns whether the tag is selected afterwards, or `None` when there is
/// no such button.
pub fn click_tag<S: FieldStore + ?Sized>(content: &mut [Node], index: usize, store: &S) -> Option<bool> {
    let selected = nth_with_class(content, TAG_BUTTON, index)?.toggle_class(SELECTED);
    store.set_as(EVENT_TAGS_KEY, &selected_tags(content));
    Some(selected)
}

/// Trimmed texts of the selected tag buttons, in document order.
pub fn selected_tags(content: &[Node]) -> Vec<String> {
    crate::markup::select(content, |element| {
        element.has_class(TAG_BUTTON) && element.has_class(SELECTED)
    })
    .into_iter()
    .map(|element| element.text_content().trim().to_owned())
    .collect()
}

/// Re-applies saved option, tag and form field state to freshly mounted
/// content.
pub fn restore_selections<S: FieldStore + ?Sized>(content: &mut [Node], store: &S) {
    let saved_tags: Option<Vec<String>> = store.get_as(EVENT_TAGS_KEY);
    walk_elements_mut(content, &mut |element| {
        if element.has_class(OPTION_BUTTON) && saved_option_matches(element, store) {
            element.add_class(SELECTED);
        }
        if element.has_class(TAG_BUTTON) {
            let text = element.text_content();
            let saved = saved_tags
                .as_ref()
                .is_some_and(|tags| tags.iter().any(|tag| tag == text.trim()));
            if saved {
                element.add_class(SELECTED);
            }
        }
        if matches!(element.name.as_str(), "input" | "select") {
            let saved = element.attribute("data-key").and_then(|key| store.get(key));
            match saved {
                None | Some(Value::Null) => {}
                Some(saved) => restore_field(element, &saved),
            }
        }
    });
}

fn saved_option_matches<S: FieldStore + ?Sized>(element: &Element, store: &S) -> bool {
    match (element.attribute("data-key"), element.attribute("data-value")) {
        (Some(key), Some(value)) => store.get(key) == Some(Value::String(value.to_owned())),
        _ => false,
    }
}

fn restore_field(element: &mut Element, saved: &Value) {
    if is_checkbox(element) {
        set_checked(element, is_truthy(saved));
        return;
    }
    set_field_value(element, &field_text(saved));
}

/// The text a saved value shows as in a text field or select.
pub fn field_text(saved: &Value) -> String {
    match saved {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Whether a saved value checks a checkbox.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn set_checked(element: &mut Element, checked: bool) {
    if checked {
        element.set_attribute("checked", "");
    } else {
        element.remove_attribute("checked");
    }
}

fn set_field_value(element: &mut Element, value: &str) {
    match element.name.as_str() {
        "select" => walk_elements_mut(&mut element.children, &mut |option| {
            if option.name != "option" {
                return;
            }
            let option_value = option
                .attribute("value")
                .map(str::to_owned)
                .unwrap_or_else(|| option.text_content().trim().to_owned());
            if option_value == value {
                option.set_attribute("selected", "");
            } else {
                option.remove_attribute("selected");
            }
        }),
        "textarea" => element.set_text_content(value),
        _ => element.set_attribute("value", value),
    }
}

/// Auto-save for `input`, `select` and `textarea` fields carrying a
/// `data-key`. Updates the field in the tree and stores the value; a
/// checkbox stores a bool.
///
/// Returns false when no field uses `key`.
pub fn apply_input<S: FieldStore + ?Sized>(
    content: &mut [Node],
    key: &str,
    input: FieldInput,
    store: &S,
) -> bool {
    let path = path_to(content, &mut |element| {
        matches!(element.name.as_str(), "input" | "select" | "textarea")
            && element.attribute("data-key") == Some(key)
    });
    let Some(field) = path.and_then(|path| element_at(content, &path)) else {
        return false;
    };
    let input = match (is_checkbox(field), input) {
        (true, FieldInput::Text(text)) => FieldInput::Checked(!text.is_empty()),
        (_, input) => input,
    };
    match &input {
        FieldInput::Checked(checked) => set_checked(field, *checked),
        FieldInput::Text(text) => set_field_value(field, text),
    }
    store.set(key, input.into_value());
    true
}

/// Sets the first `.progress-fill` width and `.progress-text` label.
///
/// Does nothing unless both elements are present and `total_steps` is
/// positive.
pub fn init_progress_bar(content: &mut [Node], current_step: u32, total_steps: u32) -> bool {
    if total_steps == 0 {
        return false;
    }
    let has_fill = !crate::markup::select(content, |element| element.has_class(PROGRESS_FILL)).is_empty();
    let has_text = !crate::markup::select(content, |element| element.has_class(PROGRESS_TEXT)).is_empty();
    if !has_fill || !has_text {
        return false;
    }

    if let Some(fill) = nth_with_class(content, PROGRESS_FILL, 0) {
        set_style_property(fill, "width", &progress_width(current_step, total_steps));
    }
    if let Some(text) = nth_with_class(content, PROGRESS_TEXT, 0) {
        text.set_text_content(progress_label(current_step, total_steps));
    }
    true
}

/// CSS width of the progress fill, e.g. `50%`.
pub fn progress_width(current_step: u32, total_steps: u32) -> String {
    let percentage = f64::from(current_step) / f64::from(total_steps) * 100.0;
    format!("{percentage}%")
}

pub fn progress_label(current_step: u32, total_steps: u32) -> String {
    format!("Step {current_step} of {total_steps}")
}

fn set_style_property(element: &mut Element, property: &str, value: &str) {
    let mut declarations: Vec<String> = element
        .attribute("style")
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|declaration| !declaration.is_empty())
        .filter(|declaration| {
            declaration
                .split_once(':')
                .is_none_or(|(name, _)| !name.trim().eq_ignore_ascii_case(property))
        })
        .map(str::to_owned)
        .collect();
    declarations.push(format!("{property}: {value}"));
    element.set_attribute("style", format!("{};", declarations.join("; ")));
}
