//! Resource registry: client-side handles for host-side objects.
//!
//! Handles are allocated optimistically. [`ResourceRegistry::allocate`]
//! queues the creation task and returns the handle immediately, before the
//! host has created anything. Later tasks may reference the handle right
//! away: the queue is flushed in FIFO order, so the host always applies the
//! creation before the first use.
//!
//! Handles start at 1 and are never reused within one registry.
//!
//! # Example
//!
//! ```
//! use canvaswire_client::queue::CommandQueue;
//! use canvaswire_client::registry::{ResourceKind, ResourceRegistry};
//! use canvaswire_client::task::Task;
//!
//! let mut queue = CommandQueue::new();
//! let mut registry = ResourceRegistry::new();
//!
//! let handle = registry
//!     .allocate(&mut queue, ResourceKind::Surface, |index| {
//!         Task::with_params("createSurfaceBitmap", &serde_json::json!({
//!             "path": "logo.bmp",
//!             "index": index,
//!         }))
//!     })
//!     .unwrap();
//!
//! assert_eq!(handle.get(), 1);
//! assert_eq!(queue.len(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, Result};
use crate::queue::CommandQueue;
use crate::task::Task;

/// Opaque handle to a host-side object. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(u32);

impl ResourceHandle {
    /// Raw handle value as sent on the wire.
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A font kept client-side and sent along with each render.
    Font,
    /// A pixel surface.
    Surface,
    /// A renderer texture.
    Texture,
    /// A mouse cursor.
    Cursor,
}

/// Allocates handles and remembers what kind of resource each one names.
#[derive(Debug)]
pub struct ResourceRegistry {
    next: u32,
    kinds: HashMap<ResourceHandle, ResourceKind>,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            next: 1, // 0 is never a valid handle
            kinds: HashMap::new(),
        }
    }

    /// Allocate a handle and queue the task that creates it on the host.
    ///
    /// `creation` receives the new handle so it can embed it in the task.
    /// If building the task fails nothing is queued and the handle is not
    /// consumed.
    pub fn allocate<F>(
        &mut self,
        queue: &mut CommandQueue,
        kind: ResourceKind,
        creation: F,
    ) -> Result<ResourceHandle>
    where
        F: FnOnce(ResourceHandle) -> Result<Task>,
    {
        let (handle, following) = self.next_handle()?;
        let task = creation(handle)?;
        self.commit(handle, kind, following);
        queue.push(task);
        Ok(handle)
    }

    /// Allocate a handle for a resource that needs no creation task.
    pub fn reserve(&mut self, kind: ResourceKind) -> Result<ResourceHandle> {
        let (handle, following) = self.next_handle()?;
        self.commit(handle, kind, following);
        Ok(handle)
    }

    /// Check that `handle` was allocated here and names a `kind`.
    pub fn resolve(&self, handle: ResourceHandle, kind: ResourceKind) -> Result<ResourceHandle> {
        match self.kinds.get(&handle) {
            Some(found) if *found == kind => Ok(handle),
            Some(found) => Err(CanvasError::Resource(format!(
                "Handle {} is a {:?}, expected a {:?}",
                handle, found, kind
            ))),
            None => Err(CanvasError::Resource(format!(
                "Handle {} was never created",
                handle
            ))),
        }
    }

    /// Look up a raw handle value, e.g. one read back from the host.
    pub fn lookup(&self, raw: u32) -> Option<(ResourceHandle, ResourceKind)> {
        let handle = ResourceHandle(raw);
        self.kinds.get(&handle).map(|kind| (handle, *kind))
    }

    /// Number of handles allocated so far.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Handles are never reused, so the id space ends at `u32::MAX`.
    fn next_handle(&self) -> Result<(ResourceHandle, u32)> {
        let following = self.next.checked_add(1).ok_or_else(|| {
            CanvasError::Resource(format!("Handle space exhausted after {}", self.next - 1))
        })?;
        Ok((ResourceHandle(self.next), following))
    }

    fn commit(&mut self, handle: ResourceHandle, kind: ResourceKind, following: u32) {
        self.next = following;
        self.kinds.insert(handle, kind);
        tracing::debug!(%handle, ?kind, "Resource handle allocated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn surface_task(index: ResourceHandle) -> Result<Task> {
        Task::with_params("createSurfaceBitmap", &json!({"path": "a.bmp", "index": index}))
    }

    #[test]
    fn test_handles_start_at_one_and_increase() {
        let mut queue = CommandQueue::new();
        let mut registry = ResourceRegistry::new();

        let handles: Vec<u32> = (0..3)
            .map(|_| {
                registry
                    .allocate(&mut queue, ResourceKind::Surface, surface_task)
                    .unwrap()
                    .get()
            })
            .collect();

        assert_eq!(handles, [1, 2, 3]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_creation_task_carries_handle() {
        let mut queue = CommandQueue::new();
        let mut registry = ResourceRegistry::new();
        registry.reserve(ResourceKind::Font).unwrap();

        let handle = registry
            .allocate(&mut queue, ResourceKind::Surface, surface_task)
            .unwrap();
        assert_eq!(handle.get(), 2);

        let batch = queue.flush();
        assert_eq!(
            serde_json::to_value(&batch[0]).unwrap(),
            json!({"createSurfaceBitmap": {"path": "a.bmp", "index": 2}})
        );
    }

    #[test]
    fn test_failed_creation_consumes_nothing() {
        let mut queue = CommandQueue::new();
        let mut registry = ResourceRegistry::new();

        let result = registry.allocate(&mut queue, ResourceKind::Texture, |_| {
            Err(CanvasError::Protocol("boom".into()))
        });
        assert!(result.is_err());
        assert!(queue.is_empty());
        assert!(registry.is_empty());

        let handle = registry.reserve(ResourceKind::Texture).unwrap();
        assert_eq!(handle.get(), 1);
    }

    #[test]
    fn test_resolve() {
        let mut queue = CommandQueue::new();
        let mut registry = ResourceRegistry::new();
        let surface = registry
            .allocate(&mut queue, ResourceKind::Surface, surface_task)
            .unwrap();

        assert_eq!(registry.resolve(surface, ResourceKind::Surface).unwrap(), surface);
        assert!(matches!(
            registry.resolve(surface, ResourceKind::Texture),
            Err(CanvasError::Resource(_))
        ));
        assert!(matches!(
            registry.resolve(ResourceHandle(99), ResourceKind::Surface),
            Err(CanvasError::Resource(_))
        ));
    }

    #[test]
    fn test_lookup() {
        let mut registry = ResourceRegistry::new();
        let cursor = registry.reserve(ResourceKind::Cursor).unwrap();
        assert_eq!(registry.lookup(1), Some((cursor, ResourceKind::Cursor)));
        assert_eq!(registry.lookup(2), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_exhausted_handle_space() {
        let mut queue = CommandQueue::new();
        let mut registry = ResourceRegistry::new();
        registry.next = u32::MAX - 1;

        let last = registry.reserve(ResourceKind::Surface).unwrap();
        assert_eq!(last.get(), u32::MAX - 1);

        assert!(matches!(
            registry.reserve(ResourceKind::Surface),
            Err(CanvasError::Resource(_))
        ));
        assert!(matches!(
            registry.allocate(&mut queue, ResourceKind::Texture, surface_task),
            Err(CanvasError::Resource(_))
        ));
        assert!(queue.is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(last.get()), Some((last, ResourceKind::Surface)));
    }
}
