//! Script host for native runs.
//!
//! There is no JavaScript engine here: inline scripts are recorded, and an
//! external script settles once its file could be fetched from the same
//! origin as the screens. A screen that assigns the legacy
//! `window.__pageInitFunction__` gets a hook that records the call, so a run
//! still shows whether the screen would have been initialised.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use screenswap::{FragmentRequest, FragmentSource, ScreenScope, ScriptError, ScriptHost, Settle};

pub const LEGACY_INIT_HOOK: &str = "__pageInitFunction__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Inline { generation: u64, bytes: usize },
    External { generation: u64, locator: String, bytes: Option<usize> },
    InitHook { generation: u64, location: String },
}

pub struct ProbeScriptHost<S> {
    source: Rc<S>,
    probes: Rc<RefCell<Vec<Probe>>>,
    in_flight: Rc<Cell<usize>>,
}

impl<S> Clone for ProbeScriptHost<S> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            probes: Rc::clone(&self.probes),
            in_flight: Rc::clone(&self.in_flight),
        }
    }
}

impl<S: FragmentSource + 'static> ProbeScriptHost<S> {
    pub fn new(source: Rc<S>) -> Self {
        Self {
            source,
            probes: Rc::new(RefCell::new(Vec::new())),
            in_flight: Rc::new(Cell::new(0)),
        }
    }

    /// Everything observed since the last call.
    pub fn take_probes(&self) -> Vec<Probe> {
        self.probes.take()
    }

    /// External scripts whose fetch has not finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }
}

impl<S: FragmentSource + 'static> ScriptHost for ProbeScriptHost<S> {
    fn run_inline(&self, source: &str, scope: &ScreenScope) -> Result<(), ScriptError> {
        self.probes.borrow_mut().push(Probe::Inline {
            generation: scope.generation(),
            bytes: source.len(),
        });
        if source.contains(LEGACY_INIT_HOOK) {
            let probes = Rc::clone(&self.probes);
            let generation = scope.generation();
            let location = scope.request().location().to_owned();
            scope.on_ready(move || {
                log::info!("{location}: init hook fired");
                probes.borrow_mut().push(Probe::InitHook {
                    generation,
                    location,
                });
            });
        }
        Ok(())
    }

    fn attach_external(&self, locator: &str, scope: &ScreenScope, settle: Settle) {
        let source = Rc::clone(&self.source);
        let probes = Rc::clone(&self.probes);
        let in_flight = Rc::clone(&self.in_flight);
        let generation = scope.generation();
        let locator = locator.to_owned();
        in_flight.set(in_flight.get() + 1);
        tokio::task::spawn_local(async move {
            let result = source.fetch(&FragmentRequest::new(&locator)).await;
            in_flight.set(in_flight.get() - 1);
            probes.borrow_mut().push(Probe::External {
                generation,
                locator: locator.clone(),
                bytes: result.as_ref().ok().map(String::len),
            });
            match result {
                Ok(_) => settle.loaded(),
                Err(error) => settle.failed(error.to_string()),
            }
        });
    }
}
