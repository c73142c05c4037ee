//! Fragment retrieval seam.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::FetchError;

/// Names the screen to load. Opaque to the loader.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentRequest {
    location: Rc<str>,
}

impl FragmentRequest {
    pub fn new(location: impl AsRef<str>) -> Self {
        Self {
            location: Rc::from(location.as_ref()),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl From<&str> for FragmentRequest {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl From<String> for FragmentRequest {
    fn from(location: String) -> Self {
        Self::new(location)
    }
}

impl From<&String> for FragmentRequest {
    fn from(location: &String) -> Self {
        Self::new(location)
    }
}

impl fmt::Display for FragmentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Retrieves raw markup for a location.
///
/// One attempt per call: implementations must not retry and the loader adds
/// no timeout. Any failure propagates to whoever started the load.
#[allow(async_fn_in_trait)]
pub trait FragmentSource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchError>;
}

impl<S: FragmentSource> FragmentSource for Rc<S> {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchError> {
        (**self).fetch(request).await
    }
}

/// In-memory fragments keyed by location.
///
/// Locations registered with [`StaticSource::fail`] reject with a transport
/// error, which is how tests simulate a broken network.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    entries: HashMap<String, Result<String, FetchError>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, markup: impl Into<String>) -> Self {
        self.insert(location, markup);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, markup: impl Into<String>) {
        self.entries.insert(location.into(), Ok(markup.into()));
    }

    pub fn fail(mut self, location: impl Into<String>, reason: impl Into<String>) -> Self {
        let location = location.into();
        let error = FetchError::Transport {
            location: location.clone(),
            reason: reason.into(),
        };
        self.entries.insert(location, Err(error));
        self
    }
}

impl FragmentSource for StaticSource {
    async fn fetch(&self, request: &FragmentRequest) -> Result<String, FetchError> {
        match self.entries.get(request.location()) {
            Some(entry) => entry.clone(),
            None => Err(FetchError::Missing {
                location: request.location().to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_serves_and_rejects() {
        let source = StaticSource::new()
            .with("step1.html", "<p>one</p>")
            .fail("down.html", "connection reset");

        let markup = source.fetch(&"step1.html".into()).await.unwrap();
        assert_eq!(markup, "<p>one</p>");

        let error = source.fetch(&"down.html".into()).await.unwrap_err();
        assert!(matches!(error, FetchError::Transport { .. }));
        assert_eq!(error.location(), "down.html");

        let error = source.fetch(&"nope.html".into()).await.unwrap_err();
        assert_eq!(
            error,
            FetchError::Missing {
                location: "nope.html".to_owned()
            }
        );
    }
}
