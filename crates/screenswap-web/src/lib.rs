//! Browser binding: screens are fetched with `window.fetch`, mounted through
//! `innerHTML` and their scripts re-created as `<script>` elements.

use std::cell::RefCell;
use std::collections::HashMap;

use js_sys::{Array, JSON, Object, Reflect};
use screenswap::format::{calculate_duration, format_date, format_time};
use screenswap::{FieldStore, LoadReport, ScreenLoader};
use serde_json::Value;
use wasm_bindgen::prelude::*;

mod document;
mod fetch;
mod script_host;
mod store;
mod widgets;

pub use document::BrowserDocument;
pub use fetch::BrowserFetch;
pub use script_host::{BrowserScriptHost, LEGACY_INIT_HOOK};
pub use store::SessionStore;

pub const DEFAULT_MOUNT_ID: &str = "app";

pub type BrowserLoader = ScreenLoader<BrowserFetch, BrowserDocument, BrowserScriptHost>;

thread_local! {
    static LOADERS: RefCell<HashMap<String, BrowserLoader>> = RefCell::new(HashMap::new());
}

/// The loader owning `mount_id`. Loads into the same mount share one
/// generation counter, so only the newest of them fires its hook.
pub fn loader(mount_id: &str) -> BrowserLoader {
    LOADERS.with(|loaders| {
        loaders
            .borrow_mut()
            .entry(mount_id.to_owned())
            .or_insert_with(|| {
                ScreenLoader::new(
                    BrowserFetch,
                    BrowserDocument::new(mount_id),
                    BrowserScriptHost::new(),
                )
            })
            .clone()
    })
}

/// Loads a screen and waits until its scripts settled.
pub async fn load(file: &str, mount_id: &str) -> Result<LoadReport, String> {
    let completion = loader(mount_id)
        .load(file)
        .await
        .map_err(|error| error.to_string())?;
    completion.await.map_err(|error| error.to_string())
}

fn report_to_js(report: &LoadReport) -> JsValue {
    let object = Object::new();
    let failures = report
        .failures
        .iter()
        .map(|failure| JsValue::from_str(&failure.to_string()))
        .collect::<Array>();
    let fields: [(&str, JsValue); 6] = [
        ("location", JsValue::from_str(&report.location)),
        ("loadId", JsValue::from_str(&report.load_id.to_string())),
        ("generation", JsValue::from_f64(report.generation as f64)),
        ("scripts", JsValue::from_f64(report.scripts as f64)),
        ("failures", failures.into()),
        ("hookFired", JsValue::from_bool(report.hook_fired)),
    ];
    for (name, value) in fields {
        let _ = Reflect::set(&object, &JsValue::from_str(name), &value);
    }
    object.into()
}

/// Replaces the mount's content with `file` and resolves once the screen is
/// ready. Rejects when the screen could not be fetched, parsed or mounted,
/// or when a newer screen replaced it first.
#[wasm_bindgen(js_name = loadScreen)]
pub fn load_screen(file: String, mount_id: Option<String>) -> js_sys::Promise {
    let mount_id = mount_id.unwrap_or_else(|| DEFAULT_MOUNT_ID.to_owned());
    wasm_bindgen_futures::future_to_promise(async move {
        match load(&file, &mount_id).await {
            Ok(report) => {
                for failure in &report.failures {
                    zoon::eprintln!("{failure}");
                }
                Ok(report_to_js(&report))
            }
            Err(error) => {
                zoon::eprintln!("Failed to load screen '{file}': {error}");
                Err(JsValue::from_str(&error))
            }
        }
    })
}

fn to_json(value: &JsValue) -> Result<Value, String> {
    if value.is_undefined() {
        return Ok(Value::Null);
    }
    let text = JSON::stringify(value)
        .map_err(|error| format!("{error:?}"))?
        .as_string()
        .unwrap_or_default();
    serde_json::from_str(&text).map_err(|error| error.to_string())
}

fn from_json(value: &Value) -> JsValue {
    JSON::parse(&value.to_string()).unwrap_or(JsValue::NULL)
}

/// Saves any JSON-compatible value under `key`.
#[wasm_bindgen(js_name = saveData)]
pub fn save_data(key: &str, value: JsValue) {
    match to_json(&value) {
        Ok(value) => SessionStore.set(key, value),
        Err(error) => zoon::eprintln!("Error saving data: {error}"),
    }
}

/// The value saved under `key`, or `null`.
#[wasm_bindgen(js_name = getData)]
pub fn get_data(key: &str) -> JsValue {
    SessionStore
        .get(key)
        .map(|value| from_json(&value))
        .unwrap_or(JsValue::NULL)
}

#[wasm_bindgen(js_name = clearAllData)]
pub fn clear_all_data() {
    SessionStore.clear_all();
}

#[wasm_bindgen(js_name = setupOptionButtons)]
pub fn setup_option_buttons() {
    widgets::setup_option_buttons();
}

#[wasm_bindgen(js_name = setupTagButtons)]
pub fn setup_tag_buttons() {
    widgets::setup_tag_buttons();
}

#[wasm_bindgen(js_name = restoreSelections)]
pub fn restore_selections() {
    widgets::restore_selections();
}

#[wasm_bindgen(js_name = setupAutoSave)]
pub fn setup_auto_save() {
    widgets::setup_auto_save();
}

#[wasm_bindgen(js_name = initProgressBar)]
pub fn init_progress_bar(current_step: u32, total_steps: u32) -> bool {
    widgets::init_progress_bar(current_step, total_steps)
}

#[wasm_bindgen(js_name = formatTime)]
pub fn format_time_label(minutes: u32) -> String {
    format_time(minutes)
}

#[wasm_bindgen(js_name = calculateDuration)]
pub fn calculate_duration_label(start_minutes: u32, end_minutes: u32) -> String {
    calculate_duration(start_minutes, end_minutes)
}

/// `YYYY-MM-DD` as e.g. `March 15, 2024`, or `null` for other input.
#[wasm_bindgen(js_name = formatDate)]
pub fn format_date_label(date: &str) -> Option<String> {
    format_date(date)
        .inspect_err(|error| zoon::eprintln!("{error}"))
        .ok()
}

fn expose(window: &web_sys::Window, name: &str, function: JsValue) {
    if let Err(error) = Reflect::set(window, &JsValue::from_str(name), &function) {
        zoon::eprintln!("Failed to expose {name}: {error:?}");
    }
}

/// Screens call the helpers as plain globals, so they are put on `window`
/// as soon as the module starts.
#[wasm_bindgen(start)]
pub fn install_globals() {
    let Some(window) = web_sys::window() else {
        return;
    };
    expose(
        &window,
        "loadScreen",
        Closure::<dyn Fn(String, Option<String>) -> js_sys::Promise>::new(load_screen).into_js_value(),
    );
    expose(
        &window,
        "saveData",
        Closure::<dyn Fn(String, JsValue)>::new(|key: String, value| save_data(&key, value))
            .into_js_value(),
    );
    expose(
        &window,
        "getData",
        Closure::<dyn Fn(String) -> JsValue>::new(|key: String| get_data(&key)).into_js_value(),
    );
    expose(&window, "clearAllData", Closure::<dyn Fn()>::new(clear_all_data).into_js_value());
    expose(
        &window,
        "setupOptionButtons",
        Closure::<dyn Fn()>::new(setup_option_buttons).into_js_value(),
    );
    expose(
        &window,
        "setupTagButtons",
        Closure::<dyn Fn()>::new(setup_tag_buttons).into_js_value(),
    );
    expose(
        &window,
        "restoreSelections",
        Closure::<dyn Fn()>::new(restore_selections).into_js_value(),
    );
    expose(&window, "setupAutoSave", Closure::<dyn Fn()>::new(setup_auto_save).into_js_value());
    expose(
        &window,
        "initProgressBar",
        Closure::<dyn Fn(u32, u32) -> bool>::new(init_progress_bar).into_js_value(),
    );
    expose(
        &window,
        "formatTime",
        Closure::<dyn Fn(u32) -> String>::new(format_time_label).into_js_value(),
    );
    expose(
        &window,
        "calculateDuration",
        Closure::<dyn Fn(u32, u32) -> String>::new(calculate_duration_label).into_js_value(),
    );
    expose(
        &window,
        "formatDate",
        Closure::<dyn Fn(String) -> Option<String>>::new(|date: String| format_date_label(&date))
            .into_js_value(),
    );
}
