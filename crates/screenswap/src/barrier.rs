//! Script execution barrier.
//!
//! Counts the scripts of one mounted fragment down to zero, then fires the
//! screen's init hook once and resolves the load's [`Completion`].

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_channel::oneshot;
use pin_project::pin_project;
use ulid::Ulid;

use crate::error::{CompletionError, ScriptError, ScriptLoadError};
use crate::loader::LoadPhase;
use crate::markup::ScriptDescriptor;
use crate::script::{ScreenScope, ScriptHost, Settle};

/// Outcome of a load that reached the ready state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub location: String,
    pub load_id: Ulid,
    pub generation: u64,
    pub scripts: usize,
    /// Scripts that failed; each still counted towards completion.
    pub failures: Vec<ScriptLoadError>,
    pub hook_fired: bool,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

type Outcome = Result<LoadReport, CompletionError>;

/// Resolves once every script of a load has settled.
///
/// Returned by [`crate::ScreenLoader::load`]. A load without scripts is
/// already resolved when it is handed out.
#[pin_project]
#[must_use = "a completion does nothing unless awaited or inspected"]
pub struct Completion {
    #[pin]
    receiver: oneshot::Receiver<Outcome>,
    settled: Option<Outcome>,
    phase: Rc<Cell<LoadPhase>>,
}

impl Completion {
    fn new(receiver: oneshot::Receiver<Outcome>, phase: Rc<Cell<LoadPhase>>) -> Self {
        Self {
            receiver,
            settled: None,
            phase,
        }
    }

    /// The result, if the barrier has already fired. Never blocks.
    pub fn try_result(&mut self) -> Option<&Outcome> {
        if self.settled.is_none() {
            self.settled = match self.receiver.try_recv() {
                Ok(Some(outcome)) => Some(outcome),
                Ok(None) => None,
                Err(oneshot::Canceled) => Some(Err(CompletionError::Abandoned)),
            };
        }
        self.settled.as_ref()
    }

    pub fn is_ready(&mut self) -> bool {
        self.try_result().is_some()
    }

    /// Phase of this particular load.
    pub fn phase(&self) -> LoadPhase {
        self.phase.get()
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if let Some(outcome) = this.settled.take() {
            return Poll::Ready(outcome);
        }
        match this.receiver.poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(CompletionError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Generation bookkeeping shared by a loader and its barriers.
///
/// Every request takes a ticket; the ticket doubles as the generation of the
/// content it mounts.
pub(crate) struct Tracker {
    latest_request: Cell<u64>,
    mounted: Cell<u64>,
    latest_phase: RefCell<Rc<Cell<LoadPhase>>>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            latest_request: Cell::new(0),
            mounted: Cell::new(0),
            latest_phase: RefCell::new(Rc::new(Cell::new(LoadPhase::Idle))),
        }
    }
}

impl Tracker {
    /// Starts a request, returning its ticket and phase cell.
    pub(crate) fn begin(&self) -> (u64, Rc<Cell<LoadPhase>>) {
        let ticket = self.latest_request.get() + 1;
        self.latest_request.set(ticket);
        let phase = Rc::new(Cell::new(LoadPhase::Fetching));
        self.latest_phase.replace(Rc::clone(&phase));
        (ticket, phase)
    }

    pub(crate) fn is_latest(&self, ticket: u64) -> bool {
        self.latest_request.get() == ticket
    }

    pub(crate) fn mount(&self, generation: u64) {
        self.mounted.set(generation);
    }

    pub(crate) fn is_mounted(&self, generation: u64) -> bool {
        self.mounted.get() == generation
    }

    pub(crate) fn mounted(&self) -> u64 {
        self.mounted.get()
    }

    pub(crate) fn phase(&self) -> LoadPhase {
        self.latest_phase.borrow().get()
    }
}

pub(crate) struct ScriptBarrier {
    load_id: Ulid,
    scope: ScreenScope,
    tracker: Rc<Tracker>,
    phase: Rc<Cell<LoadPhase>>,
    total: usize,
    pending: Cell<usize>,
    failures: RefCell<Vec<ScriptLoadError>>,
    sender: RefCell<Option<oneshot::Sender<Outcome>>>,
}

impl ScriptBarrier {
    pub(crate) fn new(
        load_id: Ulid,
        scope: ScreenScope,
        tracker: Rc<Tracker>,
        phase: Rc<Cell<LoadPhase>>,
        total: usize,
    ) -> (Rc<Self>, Completion) {
        let (sender, receiver) = oneshot::channel();
        let completion = Completion::new(receiver, Rc::clone(&phase));
        let barrier = Rc::new(Self {
            load_id,
            scope,
            tracker,
            phase,
            total,
            pending: Cell::new(total),
            failures: RefCell::new(Vec::new()),
            sender: RefCell::new(Some(sender)),
        });
        (barrier, completion)
    }

    /// Re-creates every script through `host`.
    ///
    /// The count is fixed before the first script is attached, so an external
    /// script settling during attachment cannot fire the barrier early.
    pub(crate) fn run<H: ScriptHost>(self: &Rc<Self>, scripts: &[ScriptDescriptor], host: &H) {
        self.phase.set(LoadPhase::ExecutingScripts {
            pending: self.total,
        });
        if self.total == 0 {
            self.finish();
            return;
        }
        for (index, script) in scripts.iter().enumerate() {
            match script {
                ScriptDescriptor::Inline { source } => {
                    let result = host.run_inline(source, &self.scope);
                    self.settle(format!("inline #{index}"), result);
                }
                ScriptDescriptor::External { locator } => {
                    let barrier = Rc::clone(self);
                    let label = locator.clone();
                    let settle = Settle::new(move |result| barrier.settle(label, result));
                    host.attach_external(locator, &self.scope, settle);
                }
            }
        }
    }

    fn settle(&self, script: String, result: Result<(), ScriptError>) {
        if let Err(error) = result {
            log::warn!(
                "{}: script {script} failed: {}",
                self.scope.request(),
                error.reason
            );
            self.failures.borrow_mut().push(ScriptLoadError {
                script,
                reason: error.reason,
            });
        }
        let Some(pending) = self.pending.get().checked_sub(1) else {
            log::warn!("{}: script settled twice", self.scope.request());
            return;
        };
        self.pending.set(pending);
        if pending > 0 {
            self.phase.set(LoadPhase::ExecutingScripts { pending });
            return;
        }
        self.finish();
    }

    fn finish(&self) {
        let Some(sender) = self.sender.borrow_mut().take() else {
            return;
        };
        let generation = self.scope.generation();
        if !self.tracker.is_mounted(generation) {
            log::warn!(
                "{}: scripts of generation {generation} finished after generation {} was mounted, not firing its hook",
                self.scope.request(),
                self.tracker.mounted()
            );
            self.scope.close();
            self.phase.set(LoadPhase::Superseded);
            let _ = sender.send(Err(CompletionError::Superseded));
            return;
        }

        let hook = self.scope.take_hook();
        self.scope.close();
        let hook_fired = hook.is_some();
        if let Some(hook) = hook {
            hook();
        }
        self.phase.set(LoadPhase::Ready);

        let report = LoadReport {
            location: self.scope.request().location().to_owned(),
            load_id: self.load_id,
            generation,
            scripts: self.total,
            failures: self.failures.take(),
            hook_fired,
        };
        log::debug!(
            "{}: ready after {} scripts ({} failed), hook fired: {hook_fired}",
            report.location,
            report.scripts,
            report.failures.len()
        );
        if sender.send(Ok(report)).is_err() {
            log::debug!("{}: completion was dropped before it resolved", self.scope.request());
        }
    }
}

impl Drop for ScriptBarrier {
    fn drop(&mut self) {
        if self.sender.get_mut().is_some() {
            log::warn!(
                "{}: {} of {} scripts never settled",
                self.scope.request(),
                self.pending.get(),
                self.total
            );
        }
    }
}
