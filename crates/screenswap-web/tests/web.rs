#![cfg(target_arch = "wasm32")]

use screenswap::{FieldStore, ScreenLoader, StaticSource};
use screenswap_web::{
    BrowserDocument, BrowserScriptHost, SessionStore, calculate_duration_label, format_date_label,
    get_data, init_progress_bar, restore_selections, save_data, setup_auto_save,
    setup_option_buttons, setup_tag_buttons,
};
use serde_json::json;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn mount(id: &str) -> web_sys::Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let element = document.create_element("div").unwrap();
    element.set_id(id);
    document.body().unwrap().append_child(&element).unwrap();
    element
}

fn by_id<T: JsCast>(id: &str) -> T {
    web_sys::window()
        .unwrap()
        .document()
        .unwrap()
        .get_element_by_id(id)
        .unwrap()
        .dyn_into::<T>()
        .unwrap()
}

#[wasm_bindgen_test]
async fn legacy_hook_runs_after_inline_scripts() {
    mount("legacy");
    let loader = ScreenLoader::new(
        StaticSource::new().with(
            "s.html",
            "<p id=\"greeting\">loading</p>\
             <script>window.__pageInitFunction__ = function () {\
               document.getElementById('greeting').textContent = 'ready';\
             };</script>",
        ),
        BrowserDocument::new("legacy"),
        BrowserScriptHost::new(),
    );

    let report = loader.load("s.html").await.unwrap().await.unwrap();
    assert!(report.hook_fired);

    let document = web_sys::window().unwrap().document().unwrap();
    let greeting = document.get_element_by_id("greeting").unwrap();
    assert_eq!(greeting.text_content().as_deref(), Some("ready"));
}

#[wasm_bindgen_test]
async fn throwing_inline_script_is_reported() {
    mount("throwing");
    let loader = ScreenLoader::new(
        StaticSource::new().with("s.html", "<p>x</p><script>throw new Error('boom')</script>"),
        BrowserDocument::new("throwing"),
        BrowserScriptHost::new(),
    );

    let report = loader.load("s.html").await.unwrap().await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].reason.contains("boom"));
}

#[wasm_bindgen_test]
fn session_store_round_trips() {
    let store = SessionStore;
    store.set("eventTags", json!(["Music"]));
    assert_eq!(store.get("eventTags"), Some(json!(["Music"])));
    store.clear_all();
    assert_eq!(store.get("eventTags"), None);
}

#[wasm_bindgen_test]
async fn syntax_error_in_inline_script_is_reported() {
    mount("syntax");
    let loader = ScreenLoader::new(
        StaticSource::new().with("s.html", "<p>x</p><script>let = ;</script>"),
        BrowserDocument::new("syntax"),
        BrowserScriptHost::new(),
    );

    let report = loader.load("s.html").await.unwrap().await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].script, "inline #0");
}

#[wasm_bindgen_test]
fn save_and_get_data_use_plain_values() {
    save_data("isGroup", JsValue::TRUE);
    assert_eq!(get_data("isGroup"), JsValue::TRUE);
    assert_eq!(SessionStore.get("isGroup"), Some(json!(true)));

    save_data("eventType", JsValue::from_str("concert"));
    assert_eq!(get_data("eventType").as_string().as_deref(), Some("concert"));

    assert!(get_data("neverSaved").is_null());
}

#[wasm_bindgen_test]
fn widgets_work_on_the_live_page() {
    SessionStore.clear_all();
    mount("widgets").set_inner_html(
        "<button id=\"fair\" class=\"option-btn selected\" data-key=\"eventType\" data-value=\"fair\">Fair</button>\
         <button id=\"concert\" class=\"option-btn\" data-key=\"eventType\" data-value=\"concert\">Concert</button>\
         <span id=\"food\" class=\"tag-btn\"> Food </span>\
         <input id=\"name\" type=\"text\" data-key=\"applicantName\">\
         <input id=\"group\" type=\"checkbox\" data-key=\"isGroup\">\
         <div id=\"fill\" class=\"progress-fill\"></div><span id=\"label\" class=\"progress-text\"></span>",
    );
    setup_option_buttons();
    setup_tag_buttons();
    setup_auto_save();

    let concert: web_sys::HtmlElement = by_id("concert");
    concert.click();
    let fair: web_sys::Element = by_id("fair");
    assert!(!fair.class_list().contains("selected"));
    assert!(concert.class_list().contains("selected"));
    assert_eq!(SessionStore.get("eventType"), Some(json!("concert")));

    by_id::<web_sys::HtmlElement>("food").click();
    assert_eq!(SessionStore.get("eventTags"), Some(json!(["Food"])));

    let name: web_sys::HtmlInputElement = by_id("name");
    name.set_value("Ada");
    name.dispatch_event(&web_sys::Event::new("input").unwrap()).unwrap();
    assert_eq!(SessionStore.get("applicantName"), Some(json!("Ada")));

    SessionStore.set("isGroup", json!(true));
    restore_selections();
    assert!(by_id::<web_sys::HtmlInputElement>("group").checked());

    assert!(init_progress_bar(1, 4));
    assert_eq!(
        by_id::<web_sys::HtmlElement>("fill").style().get_property_value("width").unwrap(),
        "25%"
    );
    assert_eq!(by_id::<web_sys::Element>("label").text_content().as_deref(), Some("Step 1 of 4"));
}

#[wasm_bindgen_test]
fn format_helpers_are_exported() {
    assert_eq!(calculate_duration_label(540, 630), "1 hour 30 minutes");
    assert_eq!(format_date_label("2024-03-15").as_deref(), Some("March 15, 2024"));
    assert_eq!(format_date_label("soon"), None);
}
