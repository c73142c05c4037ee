use screenswap::markup::to_markup;
use screenswap::{Document, MountError, Node};

/// The live page; screens replace the `innerHTML` of the element with
/// `mount_id`.
pub struct BrowserDocument {
    mount_id: String,
}

impl BrowserDocument {
    pub fn new(mount_id: impl Into<String>) -> Self {
        Self {
            mount_id: mount_id.into(),
        }
    }

    pub fn mount_id(&self) -> &str {
        &self.mount_id
    }

    /// The mount element, if the page has one.
    pub fn mount(&self) -> Result<web_sys::Element, MountError> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| MountError::Rejected {
                mount_id: self.mount_id.clone(),
                reason: "no document is available".to_owned(),
            })?;
        document
            .get_element_by_id(&self.mount_id)
            .ok_or_else(|| MountError::Missing {
                mount_id: self.mount_id.clone(),
            })
    }
}

impl Document for BrowserDocument {
    fn replace_mount(&self, content: &[Node]) -> Result<(), MountError> {
        let mount = self.mount()?;
        // Scripts never run from innerHTML; the script host re-creates them.
        mount.set_inner_html(&to_markup(content));
        Ok(())
    }
}
