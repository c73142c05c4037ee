//! Script re-execution seam.
//!
//! Markup inserted by content replacement never runs its scripts, so every
//! [`crate::ScriptDescriptor`] is handed to a [`ScriptHost`] which creates a
//! live unit for it. Inline units run synchronously; external units report
//! back through a one-shot [`Settle`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::ScriptError;
use crate::fetch::FragmentRequest;

mod manual;
pub use manual::{Executed, ManualScriptHost};

pub type InitHook = Box<dyn FnOnce()>;

/// Per-load slot a screen uses to announce its initializer.
///
/// Replaces a process-wide hook: each load gets a fresh scope, the barrier
/// takes the hook exactly once, and a closed scope ignores late registrations.
#[derive(Clone)]
pub struct ScreenScope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    generation: u64,
    request: FragmentRequest,
    hook: RefCell<Option<InitHook>>,
    closed: Cell<bool>,
}

impl ScreenScope {
    pub(crate) fn new(generation: u64, request: FragmentRequest) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                generation,
                request,
                hook: RefCell::new(None),
                closed: Cell::new(false),
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn request(&self) -> &FragmentRequest {
        &self.inner.request
    }

    /// Registers the screen's initializer. A later registration replaces an
    /// earlier one.
    pub fn on_ready(&self, hook: impl FnOnce() + 'static) {
        if self.inner.closed.get() {
            log::warn!(
                "{}: init hook registered after the screen finished loading, ignoring it",
                self.inner.request
            );
            return;
        }
        self.inner.hook.replace(Some(Box::new(hook)));
    }

    pub fn has_hook(&self) -> bool {
        self.inner.hook.borrow().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub(crate) fn take_hook(&self) -> Option<InitHook> {
        self.inner.hook.borrow_mut().take()
    }

    /// Drops any registered hook and refuses new ones.
    pub(crate) fn close(&self) {
        self.inner.closed.set(true);
        let stale = self.inner.hook.borrow_mut().take();
        drop(stale);
    }
}

impl fmt::Debug for ScreenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenScope")
            .field("generation", &self.inner.generation)
            .field("request", &self.inner.request)
            .field("has_hook", &self.has_hook())
            .field("closed", &self.inner.closed.get())
            .finish()
    }
}

/// One-shot completion signal for an external script.
///
/// Dropping it without calling [`Settle::loaded`] or [`Settle::failed`] means
/// the script never settles; once every pending signal of a load is gone its
/// completion resolves as abandoned.
pub struct Settle {
    callback: Box<dyn FnOnce(Result<(), ScriptError>)>,
}

impl Settle {
    pub(crate) fn new(callback: impl FnOnce(Result<(), ScriptError>) + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn loaded(self) {
        self.finish(Ok(()));
    }

    pub fn failed(self, reason: impl Into<String>) {
        self.finish(Err(ScriptError::new(reason)));
    }

    pub fn finish(self, result: Result<(), ScriptError>) {
        (self.callback)(result);
    }
}

impl fmt::Debug for Settle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Settle")
    }
}

/// Creates live executable units for script descriptors.
pub trait ScriptHost {
    /// Runs inline source synchronously, isolated from other screens'
    /// top-level declarations. Returning means the script has executed.
    fn run_inline(&self, source: &str, scope: &ScreenScope) -> Result<(), ScriptError>;

    /// Attaches an external script. `settle` must be called once the script
    /// has loaded and executed, or failed to.
    fn attach_external(&self, locator: &str, scope: &ScreenScope, settle: Settle);
}

impl<H: ScriptHost> ScriptHost for Rc<H> {
    fn run_inline(&self, source: &str, scope: &ScreenScope) -> Result<(), ScriptError> {
        (**self).run_inline(source, scope)
    }

    fn attach_external(&self, locator: &str, scope: &ScreenScope, settle: Settle) {
        (**self).attach_external(locator, scope, settle)
    }
}

/// Wraps inline source so its top-level declarations stay local.
pub fn isolate_inline(source: &str) -> String {
    format!("(() => {{\n{source}\n}})();")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_scope_ignores_hooks() {
        let scope = ScreenScope::new(1, "step.html".into());
        scope.on_ready(|| {});
        assert!(scope.has_hook());

        scope.close();
        assert!(!scope.has_hook());

        scope.on_ready(|| {});
        assert!(!scope.has_hook());
        assert!(scope.is_closed());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let fired = Rc::new(Cell::new(0));
        let scope = ScreenScope::new(1, "step.html".into());
        let first = Rc::clone(&fired);
        scope.on_ready(move || first.set(1));
        let second = Rc::clone(&fired);
        scope.on_ready(move || second.set(2));

        scope.take_hook().unwrap()();
        assert_eq!(fired.get(), 2);
        assert!(scope.take_hook().is_none());
    }

    #[test]
    fn isolated_source_is_an_iife() {
        assert_eq!(
            isolate_inline("let step = 2;"),
            "(() => {\nlet step = 2;\n})();"
        );
    }
}
