//! Deterministic script host.
//!
//! Script behaviour is supplied as Rust closures keyed by inline source or
//! external locator, and external scripts only settle when told to. This
//! makes every completion order reproducible.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{ScreenScope, ScriptHost, Settle};
use crate::error::ScriptError;

type Behaviour = Rc<dyn Fn(&ScreenScope) -> Result<(), ScriptError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executed {
    Inline { source: String, generation: u64 },
    External { locator: String, generation: u64 },
}

struct PendingExternal {
    locator: String,
    scope: ScreenScope,
    settle: Settle,
}

#[derive(Default)]
struct ManualState {
    behaviours: HashMap<String, Behaviour>,
    pending: Vec<PendingExternal>,
    executed: Vec<Executed>,
}

#[derive(Clone, Default)]
pub struct ManualScriptHost {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines what the script identified by `key` does when it runs. Inline
    /// scripts are matched by their trimmed source.
    pub fn define(
        &self,
        key: impl Into<String>,
        behaviour: impl Fn(&ScreenScope) -> Result<(), ScriptError> + 'static,
    ) {
        self.state
            .borrow_mut()
            .behaviours
            .insert(key.into(), Rc::new(behaviour));
    }

    /// Locators of attached external scripts that have not settled yet.
    pub fn pending(&self) -> Vec<String> {
        self.state
            .borrow()
            .pending
            .iter()
            .map(|pending| pending.locator.clone())
            .collect()
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.borrow().executed.clone()
    }

    /// Loads and runs the oldest pending external script with this locator.
    pub fn complete(&self, locator: &str) -> bool {
        let Some(pending) = self.take_pending(locator) else {
            return false;
        };
        let result = self.execute(&pending.locator, &pending.scope);
        self.state.borrow_mut().executed.push(Executed::External {
            locator: pending.locator,
            generation: pending.scope.generation(),
        });
        pending.settle.finish(result);
        true
    }

    /// Fails the oldest pending external script with this locator.
    pub fn fail(&self, locator: &str, reason: impl Into<String>) -> bool {
        let Some(pending) = self.take_pending(locator) else {
            return false;
        };
        pending.settle.failed(reason);
        true
    }

    /// Completes every pending external script in attachment order.
    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while let Some(locator) = self.pending().into_iter().next() {
            self.complete(&locator);
            completed += 1;
        }
        completed
    }

    /// Forgets pending scripts without settling them.
    pub fn drop_pending(&self) -> usize {
        let dropped = std::mem::take(&mut self.state.borrow_mut().pending);
        dropped.len()
    }

    fn take_pending(&self, locator: &str) -> Option<PendingExternal> {
        let mut state = self.state.borrow_mut();
        let position = state
            .pending
            .iter()
            .position(|pending| pending.locator == locator)?;
        Some(state.pending.remove(position))
    }

    fn execute(&self, key: &str, scope: &ScreenScope) -> Result<(), ScriptError> {
        let behaviour = self.state.borrow().behaviours.get(key).cloned();
        match behaviour {
            Some(behaviour) => behaviour(scope),
            None => Ok(()),
        }
    }
}

impl ScriptHost for ManualScriptHost {
    fn run_inline(&self, source: &str, scope: &ScreenScope) -> Result<(), ScriptError> {
        self.state.borrow_mut().executed.push(Executed::Inline {
            source: source.to_owned(),
            generation: scope.generation(),
        });
        self.execute(source.trim(), scope)
    }

    fn attach_external(&self, locator: &str, scope: &ScreenScope, settle: Settle) {
        self.state.borrow_mut().pending.push(PendingExternal {
            locator: locator.to_owned(),
            scope: scope.clone(),
            settle,
        });
    }
}
