//! End-to-end loads against an in-memory page and a manual script host.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures_channel::oneshot;
use screenswap::{
    CompletionError, FetchError, FragmentRequest, FragmentSource, LoadError, LoadPhase,
    ManualScriptHost, ScreenLoader, ScriptError, StaticSource, VirtualDocument,
};

type Loader<S = StaticSource> = ScreenLoader<S, VirtualDocument, ManualScriptHost>;

/// Counts init hook invocations per screen.
#[derive(Clone, Default)]
struct Hooks {
    fired: Rc<RefCell<Vec<&'static str>>>,
}

impl Hooks {
    /// Makes the script `key` register an init hook that records `screen`.
    fn register(&self, host: &ManualScriptHost, key: &str, screen: &'static str) {
        let fired = Rc::clone(&self.fired);
        host.define(key, move |scope| {
            let fired = Rc::clone(&fired);
            scope.on_ready(move || fired.borrow_mut().push(screen));
            Ok(())
        });
    }

    fn fired(&self) -> Vec<&'static str> {
        self.fired.borrow().clone()
    }
}

fn loader<S: FragmentSource>(source: S) -> Loader<S> {
    ScreenLoader::new(source, VirtualDocument::new("app"), ManualScriptHost::new())
}

#[tokio::test]
async fn zero_scripts_complete_synchronously_without_a_hook() {
    let hooks = Hooks::default();
    let loader = loader(
        StaticSource::new()
            .with("step1.html", "<p>one</p><script src=\"step1.js\"></script>")
            .with("step2.html", "<p>two</p>"),
    );
    hooks.register(loader.host(), "step1.js", "step1");

    // step1's script registers its hook but is still loading when step2 mounts.
    let mut first = loader.load("step1.html").await.unwrap();
    assert_eq!(loader.host().pending(), ["step1.js"]);

    let mut second = loader.load("step2.html").await.unwrap();
    let report = second.try_result().unwrap().as_ref().unwrap().clone();
    assert_eq!(report.scripts, 0);
    assert!(!report.hook_fired);
    assert_eq!(loader.document().to_markup().unwrap(), "<p>two</p>");
    assert_eq!(loader.phase(), LoadPhase::Ready);
    assert!(hooks.fired().is_empty());

    loader.host().complete("step1.js");
    assert_eq!(first.try_result(), Some(&Err(CompletionError::Superseded)));
    assert_eq!(first.phase(), LoadPhase::Superseded);
    assert!(hooks.fired().is_empty());
}

#[tokio::test]
async fn inline_scripts_fire_the_hook_before_load_returns() {
    let hooks = Hooks::default();
    let loader = loader(StaticSource::new().with(
        "step2.html",
        "<div id=\"q\"></div><script>helpers()</script><script>\n  init()\n</script>",
    ));
    hooks.register(loader.host(), "init()", "step2");

    let mut completion = loader.load("step2.html").await.unwrap();
    assert_eq!(hooks.fired(), ["step2"]);
    let report = completion.try_result().unwrap().as_ref().unwrap();
    assert_eq!(report.scripts, 2);
    assert!(report.hook_fired);
    assert!(report.is_clean());
}

#[tokio::test]
async fn external_scripts_fire_once_in_any_completion_order() {
    let orders: [[usize; 3]; 6] = [
        [1, 2, 3],
        [1, 3, 2],
        [2, 1, 3],
        [2, 3, 1],
        [3, 1, 2],
        [3, 2, 1],
    ];
    for order in orders {
        let hooks = Hooks::default();
        let loader = loader(StaticSource::new().with(
            "step3.html",
            "<form></form>\
             <script src=\"s1.js\"></script>\
             <script src=\"s2.js\"></script>\
             <script src=\"s3.js\"></script>",
        ));
        // Whichever script runs decides the hook; the barrier must still wait
        // for the remaining ones.
        for key in ["s1.js", "s2.js", "s3.js"] {
            hooks.register(loader.host(), key, "step3");
        }

        let mut completion = loader.load("step3.html").await.unwrap();
        for (settled, script) in order.iter().enumerate() {
            assert!(hooks.fired().is_empty(), "fired early in order {order:?}");
            assert_eq!(
                loader.phase(),
                LoadPhase::ExecutingScripts {
                    pending: 3 - settled
                }
            );
            assert!(loader.host().complete(&format!("s{script}.js")));
        }
        assert_eq!(hooks.fired(), ["step3"], "order {order:?}");
        assert!(completion.is_ready());
        assert!(loader.host().pending().is_empty());
    }
}

#[tokio::test]
async fn mixed_scripts_wait_for_the_externals() {
    let hooks = Hooks::default();
    let order = Rc::new(RefCell::new(Vec::new()));
    let loader = loader(StaticSource::new().with(
        "step4.html",
        "<script>first()</script>\
         <script src=\"a.js\"></script>\
         <script>second()</script>\
         <script src=\"b.js\"></script>",
    ));
    for key in ["first()", "second()"] {
        let order = Rc::clone(&order);
        loader.host().define(key, move |_| {
            order.borrow_mut().push(key);
            Ok(())
        });
    }
    hooks.register(loader.host(), "a.js", "step4");

    let completion = loader.load("step4.html").await.unwrap();
    assert_eq!(*order.borrow(), ["first()", "second()"]);
    assert_eq!(loader.phase(), LoadPhase::ExecutingScripts { pending: 2 });

    loader.host().complete("a.js");
    assert!(hooks.fired().is_empty());
    loader.host().complete("b.js");
    assert_eq!(hooks.fired(), ["step4"]);

    let report = completion.await.unwrap();
    assert_eq!(report.scripts, 4);
    assert_eq!(report.generation, 1);
}

#[tokio::test]
async fn sequential_loads_fire_their_own_hooks() {
    let hooks = Hooks::default();
    let loader = loader(
        StaticSource::new()
            .with("a.html", "<p>A</p><script src=\"a.js\"></script>")
            .with("b.html", "<p>B</p><script src=\"b.js\"></script>"),
    );
    hooks.register(loader.host(), "a.js", "a");
    hooks.register(loader.host(), "b.js", "b");

    let first = loader.load("a.html").await.unwrap();
    loader.host().complete_all();
    let first = first.await.unwrap();

    let second = loader.load("b.html").await.unwrap();
    loader.host().complete_all();
    let second = second.await.unwrap();

    assert_eq!(hooks.fired(), ["a", "b"]);
    assert_ne!(first.load_id, second.load_id);
    assert!(second.generation > first.generation);
    assert_eq!(loader.document().to_markup().unwrap(), "<p>B</p>");
}

#[tokio::test]
async fn fetch_failure_leaves_the_mount_unchanged() {
    let hooks = Hooks::default();
    let loader = loader(
        StaticSource::new()
            .with("ok.html", "<p>kept</p><script>init()</script>")
            .fail("broken.html", "connection refused"),
    );
    hooks.register(loader.host(), "init()", "ok");
    let _ok = loader.load("ok.html").await.unwrap();

    let error = loader.load("broken.html").await.err().unwrap();
    assert_eq!(
        error,
        LoadError::Fetch(FetchError::Transport {
            location: "broken.html".to_owned(),
            reason: "connection refused".to_owned(),
        })
    );
    assert_eq!(loader.document().to_markup().unwrap(), "<p>kept</p>");
    assert_eq!(hooks.fired(), ["ok"]);
    assert_eq!(loader.phase(), LoadPhase::Failed);

    let error = loader.load("unknown.html").await.err().unwrap();
    assert!(matches!(error, LoadError::Fetch(FetchError::Missing { .. })));
}

#[tokio::test]
async fn failed_scripts_still_release_the_barrier() {
    let hooks = Hooks::default();
    let loader = loader(StaticSource::new().with(
        "step5.html",
        "<script>init()</script><script>broken()</script>\
         <script src=\"missing.js\"></script><script src=\"ok.js\"></script>",
    ));
    hooks.register(loader.host(), "init()", "step5");
    loader
        .host()
        .define("broken()", |_| Err(ScriptError::new("ReferenceError: x is not defined")));

    let completion = loader.load("step5.html").await.unwrap();
    assert!(loader.host().fail("missing.js", "404 Not Found"));
    assert!(hooks.fired().is_empty());
    assert!(loader.host().complete("ok.js"));

    let report = completion.await.unwrap();
    assert_eq!(hooks.fired(), ["step5"]);
    let failed: Vec<_> = report.failures.iter().map(|f| f.script.as_str()).collect();
    assert_eq!(failed, ["inline #1", "missing.js"]);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn unsettled_scripts_abandon_the_completion() {
    let loader = loader(StaticSource::new().with("s.html", "<script src=\"gone.js\"></script>"));
    let mut completion = loader.load("s.html").await.unwrap();
    assert!(!completion.is_ready());

    loader.host().drop_pending();
    assert_eq!(completion.await, Err(CompletionError::Abandoned));
}

#[tokio::test]
async fn late_hook_registration_is_ignored() {
    let fired = Rc::new(Cell::new(0));
    let loader = loader(StaticSource::new().with("s.html", "<p>s</p>"));
    let completion = loader.load("s.html").await.unwrap();
    completion.await.unwrap();

    let scope = loader.current_scope().unwrap();
    assert!(scope.is_closed());
    let count = Rc::clone(&fired);
    scope.on_ready(move || count.set(count.get() + 1));
    assert!(!scope.has_hook());
    assert_eq!(fired.get(), 0);
}

#[tokio::test]
async fn newer_mount_supersedes_pending_scripts() {
    let hooks = Hooks::default();
    let loader = loader(
        StaticSource::new()
            .with("slow.html", "<p>slow</p><script src=\"slow.js\"></script>")
            .with("fast.html", "<p>fast</p><script src=\"fast.js\"></script>"),
    );
    hooks.register(loader.host(), "slow.js", "slow");
    hooks.register(loader.host(), "fast.js", "fast");

    let slow = loader.load("slow.html").await.unwrap();
    let fast = loader.load("fast.html").await.unwrap();

    // slow's script finishes after fast has been mounted.
    loader.host().complete("slow.js");
    loader.host().complete("fast.js");

    assert_eq!(slow.await, Err(CompletionError::Superseded));
    assert_eq!(fast.await.unwrap().location, "fast.html");
    assert_eq!(hooks.fired(), ["fast"]);
}

/// Fragments released by the test, one gate per location.
#[derive(Default)]
struct GatedSource {
    gates: RefCell<HashMap<String, oneshot::Receiver<String>>>,
}

impl GatedSource {
    fn gate(&self, location: &str) -> oneshot::Sender<String> {
        let (sender, receiver) = oneshot::channel();
        self.gates.borrow_mut().insert(location.to_owned(), receiver);
        sender
    }
}

impl FragmentSource for GatedSource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchError> {
        let missing = || FetchError::Missing {
            location: request.location().to_owned(),
        };
        let receiver = self
            .gates
            .borrow_mut()
            .remove(request.location())
            .ok_or_else(missing)?;
        receiver.await.map_err(|_| missing())
    }
}

#[tokio::test]
async fn out_of_order_fetch_is_discarded() {
    let hooks = Hooks::default();
    let source = GatedSource::default();
    let old_gate = source.gate("old.html");
    let new_gate = source.gate("new.html");
    let loader = loader(source);
    hooks.register(loader.host(), "init()", "screen");

    let (old, new, ()) = tokio::join!(loader.load("old.html"), loader.load("new.html"), async {
        tokio::task::yield_now().await;
        let _ = new_gate.send("<p>new</p><script>init()</script>".to_owned());
        tokio::task::yield_now().await;
        let _ = old_gate.send("<p>old</p><script>init()</script>".to_owned());
    });

    assert_eq!(
        old.err(),
        Some(LoadError::Superseded {
            location: "old.html".to_owned()
        })
    );
    let report = new.unwrap().await.unwrap();
    assert_eq!(report.location, "new.html");
    assert_eq!(loader.document().to_markup().unwrap(), "<p>new</p>");
    assert_eq!(hooks.fired(), ["screen"]);
    assert_eq!(loader.phase(), LoadPhase::Ready);
}
