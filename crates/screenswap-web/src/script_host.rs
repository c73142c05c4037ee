//! Re-creates fragment scripts as live `<script>` elements.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Function, Reflect};
use screenswap::script::isolate_inline;
use screenswap::{ScreenScope, ScriptError, ScriptHost, Settle};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen::closure::Closure;

/// Global that screens written for the plain loader assign their
/// initializer to.
pub const LEGACY_INIT_HOOK: &str = "__pageInitFunction__";
const INLINE_ERROR: &str = "__screenswapInlineError__";

#[derive(Default)]
pub struct BrowserScriptHost {
    generation: Cell<u64>,
}

impl BrowserScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn window() -> Result<web_sys::Window, ScriptError> {
        web_sys::window().ok_or_else(|| ScriptError::new("no window"))
    }

    fn create_script() -> Result<web_sys::HtmlScriptElement, ScriptError> {
        let document = Self::window()?
            .document()
            .ok_or_else(|| ScriptError::new("no document"))?;
        document
            .create_element("script")
            .map_err(|error| ScriptError::new(format!("{error:?}")))?
            .dyn_into::<web_sys::HtmlScriptElement>()
            .map_err(|_| ScriptError::new("created element is not a script"))
    }

    fn append(script: &web_sys::HtmlScriptElement) -> Result<(), ScriptError> {
        let body = Self::window()?
            .document()
            .and_then(|document| document.body())
            .ok_or_else(|| ScriptError::new("document has no body"))?;
        body.append_child(script)
            .map(drop)
            .map_err(|error| ScriptError::new(format!("{error:?}")))
    }

    /// The first script of a new screen starts with an empty legacy slot.
    fn enter(&self, scope: &ScreenScope) {
        if self.generation.replace(scope.generation()) != scope.generation() {
            set_global(LEGACY_INIT_HOOK, &JsValue::NULL);
        }
    }
}

fn set_global(name: &str, value: &JsValue) {
    if let Some(window) = web_sys::window() {
        let _ = Reflect::set(&window, &JsValue::from_str(name), value);
    }
}

fn take_global(name: &str) -> Option<JsValue> {
    let window = web_sys::window()?;
    let key = JsValue::from_str(name);
    let value = Reflect::get(&window, &key).ok()?;
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let _ = Reflect::set(&window, &key, &JsValue::NULL);
    Some(value)
}

/// Runs `action` with a one-off `error` listener on `window`, returning the
/// message of the first error event it saw.
fn capture_window_error(
    action: impl FnOnce() -> Result<(), ScriptError>,
) -> Result<Option<String>, ScriptError> {
    let window = BrowserScriptHost::window()?;
    let captured = Rc::new(RefCell::new(None));
    let listener = {
        let captured = Rc::clone(&captured);
        Closure::<dyn FnMut(web_sys::ErrorEvent)>::new(move |event: web_sys::ErrorEvent| {
            event.prevent_default();
            captured.borrow_mut().get_or_insert_with(|| event.message());
        })
    };
    let callback = listener.as_ref().unchecked_ref();
    window
        .add_event_listener_with_callback("error", callback)
        .map_err(|error| ScriptError::new(format!("{error:?}")))?;
    let result = action();
    let _ = window.remove_event_listener_with_callback("error", callback);
    result?;
    Ok(captured.take())
}

/// Moves a function a script assigned to the legacy global into the scope.
fn adopt_legacy_hook(scope: &ScreenScope) {
    let Some(value) = take_global(LEGACY_INIT_HOOK) else {
        return;
    };
    let Ok(function) = value.dyn_into::<Function>() else {
        zoon::eprintln!("{}: {LEGACY_INIT_HOOK} is not a function", scope.request());
        return;
    };
    let location = scope.request().location().to_owned();
    scope.on_ready(move || {
        if let Err(error) = function.call0(&JsValue::NULL) {
            zoon::eprintln!("{location}: init hook threw {error:?}");
        }
    });
}

impl ScriptHost for BrowserScriptHost {
    fn run_inline(&self, source: &str, scope: &ScreenScope) -> Result<(), ScriptError> {
        self.enter(scope);
        let script = Self::create_script()?;
        // Errors thrown by the script are caught and parked in a global so
        // they can be reported for this script.
        script.set_text(&format!(
            "try {{\n{}\n}} catch (error) {{ window.{INLINE_ERROR} = String(error); }}",
            isolate_inline(source)
        ))
        .map_err(|error| ScriptError::new(format!("{error:?}")))?;
        // A syntax error never reaches the catch; it is reported to `window`
        // while the script is appended.
        let compile_error = capture_window_error(|| Self::append(&script))?;

        adopt_legacy_hook(scope);
        if let Some(message) = compile_error {
            return Err(ScriptError::new(message));
        }
        match take_global(INLINE_ERROR) {
            Some(error) => Err(ScriptError::new(
                error.as_string().unwrap_or_else(|| format!("{error:?}")),
            )),
            None => Ok(()),
        }
    }

    fn attach_external(&self, locator: &str, scope: &ScreenScope, settle: Settle) {
        self.enter(scope);
        let script = match Self::create_script() {
            Ok(script) => script,
            Err(error) => return settle.finish(Err(error)),
        };
        script.set_src(locator);

        let settle = Rc::new(RefCell::new(Some(settle)));
        let onload = {
            let settle = Rc::clone(&settle);
            let scope = scope.clone();
            Closure::once_into_js(move || {
                adopt_legacy_hook(&scope);
                if let Some(settle) = settle.borrow_mut().take() {
                    settle.loaded();
                }
            })
        };
        let onerror = {
            let settle = Rc::clone(&settle);
            let locator = locator.to_owned();
            Closure::once_into_js(move || {
                if let Some(settle) = settle.borrow_mut().take() {
                    settle.failed(format!("failed to load {locator}"));
                }
            })
        };
        script.set_onload(Some(onload.unchecked_ref()));
        script.set_onerror(Some(onerror.unchecked_ref()));

        if let Err(error) = Self::append(&script) {
            if let Some(settle) = settle.borrow_mut().take() {
                settle.finish(Err(error));
            }
        }
    }
}
