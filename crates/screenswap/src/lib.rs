//! Screen swapping for multi-step form wizards.
//!
//! A load fetches a markup fragment, parses it into displayable content and
//! script descriptors, replaces the mount point's content, re-runs the
//! scripts and resolves a per-load [`Completion`] once every script settled.

pub mod barrier;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod format;
pub mod loader;
pub mod markup;
pub mod script;
pub mod store;
pub mod widgets;

pub use barrier::{Completion, LoadReport};
pub use dom::{Document, VirtualDocument};
pub use error::{
    CompletionError, FetchError, FormatError, LoadError, MarkupError, MountError, ScriptError,
    ScriptLoadError,
};
pub use fetch::{FragmentRequest, FragmentSource, StaticSource};
pub use loader::{LoadPhase, ScreenLoader};
pub use markup::{Element, Node, ParsedFragment, ScriptDescriptor, parse_fragment};
pub use script::{ManualScriptHost, ScreenScope, ScriptHost, Settle};
pub use store::{FieldStore, FieldStoreExt, MemoryStore};
