//! Memory windows: the bytes a schema is read from.
//!
//! Most fields are read straight out of the window's byte slice. Pointer
//! string fields hold an address instead, which only a window backed by
//! real foreign memory can follow.

use std::ffi::{c_char, CStr};

use crate::error::{CanvasError, Result};

/// A readable region of memory.
pub trait MemoryWindow {
    /// The bytes of the region.
    fn bytes(&self) -> &[u8];

    /// Follow a pointer to a NUL-terminated string.
    fn read_c_string(&self, addr: usize) -> Result<String>;
}

/// A plain byte slice. Pointer strings cannot be followed.
#[derive(Debug, Clone, Copy)]
pub struct SliceWindow<'a> {
    bytes: &'a [u8],
}

impl<'a> SliceWindow<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl MemoryWindow for SliceWindow<'_> {
    fn bytes(&self) -> &[u8] {
        self.bytes
    }

    fn read_c_string(&self, addr: usize) -> Result<String> {
        Err(CanvasError::Layout(format!(
            "Cannot follow string pointer {:#x} from a detached buffer",
            addr
        )))
    }
}

/// A buffer filled by native code whose pointer fields point into live
/// native memory.
#[derive(Debug, Clone, Copy)]
pub struct RawWindow<'a> {
    bytes: &'a [u8],
}

impl<'a> RawWindow<'a> {
    /// Wrap a natively filled buffer.
    ///
    /// # Safety
    ///
    /// Every pointer-string field read through this window must hold either
    /// null or the address of a NUL-terminated string that stays valid and
    /// unmodified for as long as the window is used.
    pub unsafe fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl MemoryWindow for RawWindow<'_> {
    fn bytes(&self) -> &[u8] {
        self.bytes
    }

    fn read_c_string(&self, addr: usize) -> Result<String> {
        if addr == 0 {
            return Ok(String::new());
        }
        // SAFETY: non-null, and the constructor's contract guarantees the
        // address names a live NUL-terminated string.
        let text = unsafe { CStr::from_ptr(addr as *const c_char) };
        Ok(text.to_string_lossy().into_owned())
    }
}
