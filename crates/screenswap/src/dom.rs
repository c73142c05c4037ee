//! Mount point seam.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::MountError;
use crate::markup::{Node, to_markup};

/// The page that owns the single mount element.
pub trait Document {
    /// Replaces the mount's whole content. Either all of `content` is in
    /// place when this returns `Ok`, or the mount is unchanged.
    fn replace_mount(&self, content: &[Node]) -> Result<(), MountError>;
}

impl<D: Document> Document for Rc<D> {
    fn replace_mount(&self, content: &[Node]) -> Result<(), MountError> {
        (**self).replace_mount(content)
    }
}

/// In-memory page. Clones share the same mount.
#[derive(Debug, Clone)]
pub struct VirtualDocument {
    mount_id: Rc<str>,
    mount: Rc<RefCell<Option<Vec<Node>>>>,
}

impl VirtualDocument {
    /// A page with an empty mount element.
    pub fn new(mount_id: impl AsRef<str>) -> Self {
        Self {
            mount_id: Rc::from(mount_id.as_ref()),
            mount: Rc::new(RefCell::new(Some(Vec::new()))),
        }
    }

    /// A page whose mount element is missing.
    pub fn without_mount(mount_id: impl AsRef<str>) -> Self {
        Self {
            mount_id: Rc::from(mount_id.as_ref()),
            mount: Rc::new(RefCell::new(None)),
        }
    }

    pub fn mount_id(&self) -> &str {
        &self.mount_id
    }

    pub fn content(&self) -> Option<Vec<Node>> {
        self.mount.borrow().clone()
    }

    pub fn to_markup(&self) -> Option<String> {
        self.mount.borrow().as_deref().map(to_markup)
    }

    /// Edits mounted content in place, as event handlers on a live page do.
    pub fn with_content_mut<T>(&self, edit: impl FnOnce(&mut Vec<Node>) -> T) -> Result<T, MountError> {
        let mut mount = self.mount.borrow_mut();
        let content = mount.as_mut().ok_or_else(|| MountError::Missing {
            mount_id: self.mount_id.to_string(),
        })?;
        Ok(edit(content))
    }
}

impl Document for VirtualDocument {
    fn replace_mount(&self, content: &[Node]) -> Result<(), MountError> {
        let mut mount = self.mount.borrow_mut();
        let Some(current) = mount.as_mut() else {
            return Err(MountError::Missing {
                mount_id: self.mount_id.to_string(),
            });
        };
        *current = content.to_vec();
        Ok(())
    }
}
