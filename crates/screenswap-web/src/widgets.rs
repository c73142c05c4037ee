//! The selection widgets on the live page. Handlers are attached to the
//! elements of the current screen and save through [`SessionStore`].

use std::rc::Rc;

use screenswap::FieldStore;
use screenswap::widgets::{
    EVENT_TAGS_KEY, OPTION_BUTTON, PROGRESS_FILL, PROGRESS_TEXT, SELECTED, TAG_BUTTON, field_text,
    is_truthy, progress_label, progress_width,
};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Element, HtmlElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

use crate::store::SessionStore;

const FIELDS: &str = "input[data-key], select[data-key], textarea[data-key]";

fn document() -> Option<web_sys::Document> {
    web_sys::window()?.document()
}

fn query(selector: &str) -> Option<Element> {
    document()?.query_selector(selector).ok().flatten()
}

fn query_all(selector: &str) -> Vec<Element> {
    let Some(document) = document() else {
        return Vec::new();
    };
    match document.query_selector_all(selector) {
        Ok(nodes) => (0..nodes.length())
            .filter_map(|index| nodes.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect(),
        Err(error) => {
            zoon::eprintln!("Failed to query '{selector}': {error:?}");
            Vec::new()
        }
    }
}

fn listen(element: &Element, event: &str, handler: impl FnMut() + 'static) {
    let closure = Closure::<dyn FnMut()>::new(handler);
    if let Err(error) =
        element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
    {
        zoon::eprintln!("Failed to listen for '{event}': {error:?}");
    }
    // Lives as long as the element
    closure.forget();
}

fn trimmed_text(element: &Element) -> String {
    element.text_content().unwrap_or_default().trim().to_owned()
}

fn is_checkbox(element: &Element) -> Option<&HtmlInputElement> {
    element
        .dyn_ref::<HtmlInputElement>()
        .filter(|input| input.type_().eq_ignore_ascii_case("checkbox"))
}

/// Single choice across `.option-btn`; saves `data-key` → `data-value`.
pub fn setup_option_buttons() {
    let buttons = Rc::new(query_all(&format!(".{OPTION_BUTTON}")));
    for button in buttons.iter() {
        let buttons = Rc::clone(&buttons);
        let clicked = button.clone();
        listen(button, "click", move || {
            for other in buttons.iter() {
                let _ = other.class_list().remove_1(SELECTED);
            }
            let _ = clicked.class_list().add_1(SELECTED);
            let key = clicked.get_attribute("data-key").unwrap_or_default();
            let value = clicked.get_attribute("data-value").unwrap_or_default();
            if !key.is_empty() && !value.is_empty() {
                SessionStore.set(&key, Value::String(value));
            }
        });
    }
}

/// Toggles `.tag-btn` and saves every selected tag under `eventTags`.
pub fn setup_tag_buttons() {
    for button in query_all(&format!(".{TAG_BUTTON}")) {
        let clicked = button.clone();
        listen(&button, "click", move || {
            let _ = clicked.class_list().toggle(SELECTED);
            let selected = query_all(&format!(".{TAG_BUTTON}.{SELECTED}"))
                .iter()
                .map(trimmed_text)
                .collect::<Vec<_>>();
            SessionStore.set(EVENT_TAGS_KEY, Value::from(selected));
        });
    }
}

/// Re-applies saved option, tag and field state to the current screen.
pub fn restore_selections() {
    let store = SessionStore;
    for button in query_all(&format!(".{OPTION_BUTTON}[data-key]")) {
        let key = button.get_attribute("data-key").unwrap_or_default();
        let saved = store.get(&key);
        let matches = button
            .get_attribute("data-value")
            .is_some_and(|value| saved == Some(Value::String(value)));
        if matches {
            let _ = button.class_list().add_1(SELECTED);
        }
    }

    if let Some(Value::Array(tags)) = store.get(EVENT_TAGS_KEY) {
        for button in query_all(&format!(".{TAG_BUTTON}")) {
            if tags.contains(&Value::String(trimmed_text(&button))) {
                let _ = button.class_list().add_1(SELECTED);
            }
        }
    }

    for field in query_all("input[data-key], select[data-key]") {
        let key = field.get_attribute("data-key").unwrap_or_default();
        let saved = match store.get(&key) {
            None | Some(Value::Null) => continue,
            Some(saved) => saved,
        };
        if let Some(checkbox) = is_checkbox(&field) {
            checkbox.set_checked(is_truthy(&saved));
        } else if let Some(input) = field.dyn_ref::<HtmlInputElement>() {
            input.set_value(&field_text(&saved));
        } else if let Some(select) = field.dyn_ref::<HtmlSelectElement>() {
            select.set_value(&field_text(&saved));
        }
    }
}

fn field_value(field: &Element) -> Option<Value> {
    if let Some(checkbox) = is_checkbox(field) {
        return Some(Value::Bool(checkbox.checked()));
    }
    if let Some(input) = field.dyn_ref::<HtmlInputElement>() {
        return Some(Value::String(input.value()));
    }
    if let Some(select) = field.dyn_ref::<HtmlSelectElement>() {
        return Some(Value::String(select.value()));
    }
    field
        .dyn_ref::<HtmlTextAreaElement>()
        .map(|textarea| Value::String(textarea.value()))
}

/// Saves `input`, `select` and `textarea` fields with a `data-key` on every
/// edit; a checkbox saves a bool.
pub fn setup_auto_save() {
    for field in query_all(FIELDS) {
        let edited = field.clone();
        listen(&field, "input", move || {
            let key = edited.get_attribute("data-key").unwrap_or_default();
            if let Some(value) = field_value(&edited) {
                SessionStore.set(&key, value);
            }
        });
    }
}

/// Sets the `.progress-fill` width and the `.progress-text` label. Returns
/// false when either is missing or `total_steps` is zero.
pub fn init_progress_bar(current_step: u32, total_steps: u32) -> bool {
    if total_steps == 0 {
        return false;
    }
    let fill = query(&format!(".{PROGRESS_FILL}")).and_then(|fill| fill.dyn_into::<HtmlElement>().ok());
    let (Some(fill), Some(text)) = (fill, query(&format!(".{PROGRESS_TEXT}"))) else {
        return false;
    };
    if let Err(error) = fill
        .style()
        .set_property("width", &progress_width(current_step, total_steps))
    {
        zoon::eprintln!("Failed to set progress width: {error:?}");
    }
    text.set_text_content(Some(&progress_label(current_step, total_steps)));
    true
}
