//! Window and canvas configuration sent during the handshake.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Window creation flags, a bitmask of named bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowFlags(u32);

impl WindowFlags {
    pub const FULLSCREEN: WindowFlags = WindowFlags(0x0000_0001);
    pub const OPENGL: WindowFlags = WindowFlags(0x0000_0002);
    pub const HIDDEN: WindowFlags = WindowFlags(0x0000_0008);
    pub const BORDERLESS: WindowFlags = WindowFlags(0x0000_0010);
    pub const RESIZABLE: WindowFlags = WindowFlags(0x0000_0020);
    pub const MINIMIZED: WindowFlags = WindowFlags(0x0000_0040);
    pub const MAXIMIZED: WindowFlags = WindowFlags(0x0000_0080);
    pub const MOUSE_GRABBED: WindowFlags = WindowFlags(0x0000_0100);
    pub const INPUT_FOCUS: WindowFlags = WindowFlags(0x0000_0200);
    pub const MOUSE_FOCUS: WindowFlags = WindowFlags(0x0000_0400);
    pub const FOREIGN: WindowFlags = WindowFlags(0x0000_0800);
    pub const HIGH_PIXEL_DENSITY: WindowFlags = WindowFlags(0x0000_2000);
    pub const MOUSE_CAPTURE: WindowFlags = WindowFlags(0x0000_4000);
    pub const ALWAYS_ON_TOP: WindowFlags = WindowFlags(0x0000_8000);
    pub const SKIP_TASKBAR: WindowFlags = WindowFlags(0x0001_0000);
    pub const UTILITY: WindowFlags = WindowFlags(0x0002_0000);
    pub const TOOLTIP: WindowFlags = WindowFlags(0x0004_0000);
    pub const POPUP_MENU: WindowFlags = WindowFlags(0x0008_0000);
    pub const KEYBOARD_GRABBED: WindowFlags = WindowFlags(0x0010_0000);
    pub const VULKAN: WindowFlags = WindowFlags(0x1000_0000);
    pub const METAL: WindowFlags = WindowFlags(0x2000_0000);
    pub const TRANSPARENT: WindowFlags = WindowFlags(0x4000_0000);

    const NAMES: [(&'static str, WindowFlags); 22] = [
        ("fullscreen", Self::FULLSCREEN),
        ("opengl", Self::OPENGL),
        ("hidden", Self::HIDDEN),
        ("borderless", Self::BORDERLESS),
        ("resizable", Self::RESIZABLE),
        ("minimized", Self::MINIMIZED),
        ("maximized", Self::MAXIMIZED),
        ("mouse_grabbed", Self::MOUSE_GRABBED),
        ("input_focus", Self::INPUT_FOCUS),
        ("mouse_focus", Self::MOUSE_FOCUS),
        ("foreign", Self::FOREIGN),
        ("high_pixel_density", Self::HIGH_PIXEL_DENSITY),
        ("mouse_capture", Self::MOUSE_CAPTURE),
        ("always_on_top", Self::ALWAYS_ON_TOP),
        ("skip_taskbar", Self::SKIP_TASKBAR),
        ("utility", Self::UTILITY),
        ("tooltip", Self::TOOLTIP),
        ("popup_menu", Self::POPUP_MENU),
        ("keyboard_grabbed", Self::KEYBOARD_GRABBED),
        ("vulkan", Self::VULKAN),
        ("metal", Self::METAL),
        ("transparent", Self::TRANSPARENT),
    ];

    /// No flags set.
    pub const fn empty() -> Self {
        WindowFlags(0)
    }

    /// Flags from a raw bitmask. Unknown bits are kept.
    pub const fn from_bits(bits: u32) -> Self {
        WindowFlags(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set.
    #[inline]
    pub const fn contains(self, other: WindowFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Builder-style union.
    #[must_use]
    pub const fn with(self, other: WindowFlags) -> Self {
        WindowFlags(self.0 | other.0)
    }

    /// Names of the known flags that are set, in bit order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| name)
    }
}

impl BitOr for WindowFlags {
    type Output = WindowFlags;

    fn bitor(self, rhs: WindowFlags) -> WindowFlags {
        self.with(rhs)
    }
}

impl BitOrAssign for WindowFlags {
    fn bitor_assign(&mut self, rhs: WindowFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for WindowFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowFlags({:#x}", self.0)?;
        let mut names = self.names().peekable();
        if names.peek().is_some() {
            write!(f, ": {}", names.collect::<Vec<_>>().join(" | "))?;
        }
        write!(f, ")")
    }
}

/// Window configuration, sent when the host reports it is ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowOptions {
    pub title: String,
    pub height: u32,
    pub width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<WindowFlags>,
    /// Initial position. Ignored when `centered` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(i32, i32)>,
    #[serde(default)]
    pub centered: bool,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub resizable: bool,
    #[serde(default)]
    pub minimized: bool,
    #[serde(default)]
    pub maximized: bool,
}

impl WindowOptions {
    /// Options with every switch off.
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            height,
            width,
            flags: None,
            position: None,
            centered: false,
            fullscreen: false,
            hidden: false,
            resizable: false,
            minimized: false,
            maximized: false,
        }
    }
}

/// Rendering backend configuration, sent once the window exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanvasOptions {
    /// Use the software renderer instead of an accelerated one.
    pub software: bool,
}
