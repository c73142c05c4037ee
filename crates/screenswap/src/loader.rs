//! The screen loader: fetch, parse, inject, then hand scripts to the barrier.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ulid::Ulid;

use crate::barrier::{Completion, ScriptBarrier, Tracker};
use crate::dom::Document;
use crate::error::LoadError;
use crate::fetch::{FragmentRequest, FragmentSource};
use crate::markup::parse_fragment;
use crate::script::{ScreenScope, ScriptHost};

/// Where one load operation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Fetching,
    Parsing,
    Injecting,
    ExecutingScripts {
        pending: usize,
    },
    /// Scripts settled and the init hook, if any, has fired.
    Ready,
    Failed,
    /// A newer request won before this load finished.
    Superseded,
}

impl LoadPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::Superseded)
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Fetching => f.write_str("fetching"),
            Self::Parsing => f.write_str("parsing"),
            Self::Injecting => f.write_str("injecting"),
            Self::ExecutingScripts { pending } => write!(f, "executing scripts ({pending} pending)"),
            Self::Ready => f.write_str("ready"),
            Self::Failed => f.write_str("failed"),
            Self::Superseded => f.write_str("superseded"),
        }
    }
}

/// Swaps screens into a single mount point.
///
/// Cloning is cheap; clones share the mount, the script host and the
/// generation counter.
pub struct ScreenLoader<S, D, H> {
    inner: Rc<LoaderInner<S, D, H>>,
}

struct LoaderInner<S, D, H> {
    source: S,
    document: D,
    host: H,
    tracker: Rc<Tracker>,
    current_scope: RefCell<Option<ScreenScope>>,
}

impl<S, D, H> Clone for ScreenLoader<S, D, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, D, H> ScreenLoader<S, D, H>
where
    S: FragmentSource,
    D: Document,
    H: ScriptHost,
{
    pub fn new(source: S, document: D, host: H) -> Self {
        Self {
            inner: Rc::new(LoaderInner {
                source,
                document,
                host,
                tracker: Rc::new(Tracker::default()),
                current_scope: RefCell::new(None),
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    pub fn document(&self) -> &D {
        &self.inner.document
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    /// Phase of the most recent request.
    pub fn phase(&self) -> LoadPhase {
        self.inner.tracker.phase()
    }

    /// Scope of the mounted screen.
    pub fn current_scope(&self) -> Option<ScreenScope> {
        self.inner.current_scope.borrow().clone()
    }

    /// Loads a screen into the mount point.
    ///
    /// Resolves once the fragment is mounted and its scripts have been handed
    /// to the host. The returned [`Completion`] resolves when every script has
    /// settled and the screen's init hook has fired. A fragment fetched for a
    /// request that is no longer the newest is dropped without touching the
    /// mount.
    pub async fn load(&self, request: impl Into<FragmentRequest>) -> Result<Completion, LoadError> {
        let request = request.into();
        let tracker = &self.inner.tracker;
        let (ticket, phase) = tracker.begin();
        log::debug!("{request}: fetching (generation {ticket})");

        let markup = match self.inner.source.fetch(&request).await {
            Ok(markup) => markup,
            Err(error) => {
                log::debug!("{request}: {error}");
                phase.set(LoadPhase::Failed);
                return Err(error.into());
            }
        };
        if !tracker.is_latest(ticket) {
            log::debug!("{request}: discarding fetched fragment, a newer load was requested");
            phase.set(LoadPhase::Superseded);
            return Err(LoadError::Superseded {
                location: request.location().to_owned(),
            });
        }

        phase.set(LoadPhase::Parsing);
        let fragment = match parse_fragment(request.location(), &markup) {
            Ok(fragment) => fragment,
            Err(error) => {
                phase.set(LoadPhase::Failed);
                return Err(error.into());
            }
        };
        log::debug!(
            "{request}: parsed {} nodes and {} scripts",
            fragment.content.len(),
            fragment.scripts.len()
        );

        phase.set(LoadPhase::Injecting);
        let previous = self.inner.current_scope.borrow_mut().take();
        if let Some(previous) = previous {
            previous.close();
        }
        if let Err(error) = self.inner.document.replace_mount(&fragment.content) {
            phase.set(LoadPhase::Failed);
            return Err(error.into());
        }
        tracker.mount(ticket);

        let scope = ScreenScope::new(ticket, request);
        self.inner.current_scope.replace(Some(scope.clone()));
        let (barrier, completion) = ScriptBarrier::new(
            Ulid::new(),
            scope,
            Rc::clone(tracker),
            phase,
            fragment.scripts.len(),
        );
        barrier.run(&fragment.scripts, &self.inner.host);
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::VirtualDocument;
    use crate::error::{FetchError, MountError};
    use crate::fetch::StaticSource;
    use crate::script::ManualScriptHost;

    fn loader(
        source: StaticSource,
    ) -> ScreenLoader<StaticSource, VirtualDocument, ManualScriptHost> {
        ScreenLoader::new(source, VirtualDocument::new("app"), ManualScriptHost::new())
    }

    #[tokio::test]
    async fn phases_follow_the_load() {
        let loader = loader(StaticSource::new().with(
            "s.html",
            "<p>one</p><script src=\"a.js\"></script>",
        ));
        assert_eq!(loader.phase(), LoadPhase::Idle);

        let completion = loader.load("s.html").await.unwrap();
        assert_eq!(loader.phase(), LoadPhase::ExecutingScripts { pending: 1 });
        assert_eq!(completion.phase(), loader.phase());

        loader.host().complete("a.js");
        assert_eq!(loader.phase(), LoadPhase::Ready);
        assert!(loader.phase().is_terminal());
        let report = completion.await.unwrap();
        assert_eq!(report.location, "s.html");
    }

    #[tokio::test]
    async fn parse_failure_leaves_mount_untouched() {
        let loader = loader(
            StaticSource::new()
                .with("good.html", "<p>good</p>")
                .with("bad.html", "<div></span>"),
        );
        let _first = loader.load("good.html").await.unwrap();

        let error = loader.load("bad.html").await.err().unwrap();
        assert!(matches!(error, LoadError::Parse(_)));
        assert_eq!(loader.phase(), LoadPhase::Failed);
        assert_eq!(loader.document().to_markup().unwrap(), "<p>good</p>");
    }

    #[tokio::test]
    async fn missing_mount_is_a_mount_error() {
        let loader = ScreenLoader::new(
            StaticSource::new().with("s.html", "<p>x</p>"),
            VirtualDocument::without_mount("app"),
            ManualScriptHost::new(),
        );
        let error = loader.load("s.html").await.err().unwrap();
        assert_eq!(
            error,
            LoadError::Mount(MountError::Missing {
                mount_id: "app".to_owned()
            })
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_reported() {
        let loader = loader(StaticSource::new().fail("down.html", "connection reset"));
        let error = loader.load("down.html").await.err().unwrap();
        assert!(matches!(error, LoadError::Fetch(FetchError::Transport { .. })));
        assert_eq!(loader.phase(), LoadPhase::Failed);
    }
}
