//! Canvas: the application-facing client.
//!
//! The [`CanvasBuilder`] collects window and renderer options. The
//! [`Canvas`] it builds owns the session, the command queue and the
//! resource registry:
//! 1. Drawing and window methods queue tasks
//! 2. Resource methods allocate a handle and queue the creation task
//! 3. [`Canvas::next_event`] drives the host turns, flushing the queue when
//!    the host asks for it and yielding events as they arrive
//!
//! # Example
//!
//! ```ignore
//! use canvaswire_client::{Canvas, WindowFlags};
//!
//! #[tokio::main]
//! async fn main() -> canvaswire_client::Result<()> {
//!     let mut canvas = Canvas::builder("Hello", 800, 600)
//!         .centered(true)
//!         .flags(WindowFlags::RESIZABLE)
//!         .listen()
//!         .await?;
//!
//!     while let Some(event) = canvas.next_event().await? {
//!         match event.kind.as_str() {
//!             "draw" => {
//!                 canvas.set_draw_color(0, 64, 255, 255)?;
//!                 canvas.clear();
//!                 canvas.present();
//!             }
//!             "quit" => canvas.quit(),
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{CanvasError, Result};
use crate::event::Event;
use crate::options::{CanvasOptions, WindowFlags, WindowOptions};
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;
use crate::queue::CommandQueue;
use crate::registry::{ResourceHandle, ResourceKind, ResourceRegistry};
use crate::session::{Phase, Session};
use crate::task::{Color, FontRender, FontStyle, Point, Rect, Task};
use crate::transport::HostListener;

/// Default address the host connects to.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:34254";

/// Builder for configuring and creating a [`Canvas`].
#[derive(Debug, Clone)]
pub struct CanvasBuilder {
    window: WindowOptions,
    canvas: CanvasOptions,
    max_frame_size: u32,
    listen_addr: String,
}

impl CanvasBuilder {
    /// Create a builder for a window of the given size.
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            window: WindowOptions::new(title, width, height),
            canvas: CanvasOptions::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }

    /// Add window creation flags. Repeated calls accumulate.
    pub fn flags(mut self, flags: WindowFlags) -> Self {
        self.window.flags = Some(self.window.flags.unwrap_or_default() | flags);
        self
    }

    /// Initial window position.
    pub fn position(mut self, x: i32, y: i32) -> Self {
        self.window.position = Some((x, y));
        self
    }

    pub fn centered(mut self, centered: bool) -> Self {
        self.window.centered = centered;
        self
    }

    pub fn fullscreen(mut self, fullscreen: bool) -> Self {
        self.window.fullscreen = fullscreen;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.window.hidden = hidden;
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.window.resizable = resizable;
        self
    }

    pub fn minimized(mut self, minimized: bool) -> Self {
        self.window.minimized = minimized;
        self
    }

    pub fn maximized(mut self, maximized: bool) -> Self {
        self.window.maximized = maximized;
        self
    }

    /// Use the software renderer.
    pub fn software(mut self, software: bool) -> Self {
        self.canvas.software = software;
        self
    }

    /// Set the maximum event batch size accepted from the host.
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Address [`listen`](Self::listen) binds to.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    pub fn window_options(&self) -> &WindowOptions {
        &self.window
    }

    /// Build a canvas over an already connected host stream.
    pub fn build<S>(self, stream: S) -> Canvas<S>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        Canvas {
            session: Session::new(stream, self.window, self.canvas)
                .with_max_frame_size(self.max_frame_size),
            queue: CommandQueue::new(),
            registry: ResourceRegistry::new(),
            fonts: HashMap::new(),
        }
    }

    /// Bind the listen address, wait for the host to connect and build
    /// over that connection.
    pub async fn listen(self) -> Result<Canvas<TcpStream>> {
        let listener = HostListener::bind(&self.listen_addr).await?;
        let stream = listener.accept().await?;
        Ok(self.build(stream))
    }
}

/// Font parameters kept client-side and sent with every render.
#[derive(Debug, Clone, PartialEq)]
struct FontSpec {
    path: String,
    size: u16,
    style: Option<FontStyle>,
}

/// A window on the host, driven over one session.
pub struct Canvas<S> {
    session: Session<S>,
    queue: CommandQueue,
    registry: ResourceRegistry,
    fonts: HashMap<ResourceHandle, FontSpec>,
}

impl Canvas<TcpStream> {
    /// Create a builder.
    pub fn builder(title: impl Into<String>, width: u32, height: u32) -> CanvasBuilder {
        CanvasBuilder::new(title, width, height)
    }
}

impl<S> Canvas<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Next event. Returns `Ok(None)` once the session has closed.
    pub async fn next_event(&mut self) -> Result<Option<Event>> {
        self.session.next_event(&mut self.queue).await
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Tasks waiting for the next flush.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    fn push(&mut self, tag: &str) {
        self.queue.push(Task::bare(tag));
    }

    fn push_with<P: Serialize>(&mut self, tag: &str, params: &P) -> Result<()> {
        self.queue.push(Task::with_params(tag, params)?);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Show everything drawn since the last present.
    pub fn present(&mut self) {
        self.push("present");
    }

    /// Fill the target with the draw color.
    pub fn clear(&mut self) {
        self.push("clear");
    }

    pub fn set_draw_color(&mut self, r: u8, g: u8, b: u8, a: u8) -> Result<()> {
        self.push_with("setDrawColor", &Color::rgba(r, g, b, a))
    }

    pub fn set_scale(&mut self, x: f32, y: f32) -> Result<()> {
        self.push_with("setScale", &json!({"x": x, "y": y}))
    }

    pub fn draw_point(&mut self, x: i32, y: i32) -> Result<()> {
        self.push_with("drawPoint", &Point::new(x, y))
    }

    pub fn draw_points(&mut self, points: &[Point]) -> Result<()> {
        self.push_with("drawPoints", &json!({"points": points}))
    }

    pub fn draw_line(&mut self, p1: Point, p2: Point) -> Result<()> {
        self.push_with("drawLine", &json!({"p1": p1, "p2": p2}))
    }

    pub fn draw_lines(&mut self, points: &[Point]) -> Result<()> {
        self.push_with("drawLines", &json!({"points": points}))
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<()> {
        self.push_with("drawRect", &Rect::new(x, y, width, height))
    }

    pub fn draw_rects(&mut self, rects: &[Rect]) -> Result<()> {
        self.push_with("drawRects", &json!({"rects": rects}))
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<()> {
        self.push_with("fillRect", &Rect::new(x, y, width, height))
    }

    pub fn fill_rects(&mut self, rects: &[Rect]) -> Result<()> {
        self.push_with("fillRects", &json!({"rects": rects}))
    }

    /// Copy part of a texture onto the target.
    pub fn copy(&mut self, texture: ResourceHandle, src: Rect, dst: Rect) -> Result<()> {
        self.registry.resolve(texture, ResourceKind::Texture)?;
        self.push_with(
            "copyRect",
            &json!({"texture": texture, "rect1": src, "rect2": dst}),
        )
    }

    // ------------------------------------------------------------------
    // Window
    // ------------------------------------------------------------------

    /// `format` is the host's pixel format enum value.
    pub fn set_display_mode(
        &mut self,
        width: i32,
        height: i32,
        rate: i32,
        format: u32,
    ) -> Result<()> {
        self.push_with(
            "setDisplayMode",
            &json!({"width": width, "height": height, "rate": rate, "format": format}),
        )
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.push_with("setTitle", &json!({ "title": title }))
    }

    /// Set the window icon from an image file on the host.
    pub fn set_icon(&mut self, icon: &str) -> Result<()> {
        self.push_with("setIcon", &json!({ "icon": icon }))
    }

    pub fn set_position(&mut self, x: i32, y: i32) -> Result<()> {
        self.push_with("setPosition", &json!({"x": x, "y": y}))
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.push_with("setSize", &json!({"width": width, "height": height}))
    }

    pub fn set_minimum_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.push_with("setMinimumSize", &json!({"width": width, "height": height}))
    }

    pub fn set_brightness(&mut self, brightness: f64) -> Result<()> {
        self.push_with("setBrightness", &json!({ "brightness": brightness }))
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<()> {
        self.push_with("setOpacity", &json!({ "opacity": opacity }))
    }

    pub fn show(&mut self) {
        self.push("show");
    }

    pub fn hide(&mut self) {
        self.push("hide");
    }

    pub fn raise(&mut self) {
        self.push("raise");
    }

    pub fn maximize(&mut self) {
        self.push("maximize");
    }

    pub fn minimize(&mut self) {
        self.push("minimize");
    }

    pub fn restore(&mut self) {
        self.push("restore");
    }

    /// Ask the host to quit. The pending batch, `quit` included, is still
    /// delivered on the next flush; after that the session closes.
    pub fn quit(&mut self) {
        self.push("quit");
        self.session.mark_closing();
    }

    // ------------------------------------------------------------------
    // Audio
    // ------------------------------------------------------------------

    /// `format` is the host's audio sample format value.
    pub fn open_audio(
        &mut self,
        frequency: i32,
        format: u16,
        channels: i32,
        chunksize: i32,
    ) -> Result<()> {
        self.push_with(
            "openAudio",
            &json!({
                "frequency": frequency,
                "format": format,
                "channels": channels,
                "chunksize": chunksize,
            }),
        )
    }

    pub fn play_music(&mut self, path: &str) -> Result<()> {
        self.push_with("playMusic", &json!({ "path": path }))
    }

    // ------------------------------------------------------------------
    // Resources
    // ------------------------------------------------------------------

    /// Register a font. Nothing is sent until it is rendered with.
    pub fn load_font(
        &mut self,
        path: &str,
        size: u16,
        style: Option<FontStyle>,
    ) -> Result<ResourceHandle> {
        let handle = self.registry.reserve(ResourceKind::Font)?;
        self.fonts.insert(
            handle,
            FontSpec {
                path: path.to_string(),
                size,
                style,
            },
        );
        Ok(handle)
    }

    /// Render text with a loaded font, into `target` if given.
    pub fn render_font(
        &mut self,
        font: ResourceHandle,
        text: &str,
        options: FontRender,
        target: Option<Rect>,
    ) -> Result<()> {
        self.registry.resolve(font, ResourceKind::Font)?;
        let spec = self.fonts.get(&font).cloned().ok_or_else(|| {
            CanvasError::Resource(format!("Font {} has no parameters", font))
        })?;
        self.push_with(
            "renderFont",
            &json!({
                "font": font,
                "text": text,
                "options": options,
                "target": target,
                "path": spec.path,
                "size": spec.size,
                "style": spec.style,
            }),
        )
    }

    /// Set the mouse cursor from an image file on the host.
    pub fn set_cursor(&mut self, path: &str) -> Result<ResourceHandle> {
        self.registry
            .allocate(&mut self.queue, ResourceKind::Cursor, |index| {
                Task::with_params("setCursor", &json!({"path": path, "index": index}))
            })
    }

    /// Create a blank surface. `format` is the host's pixel format value.
    pub fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        format: u32,
    ) -> Result<ResourceHandle> {
        self.registry
            .allocate(&mut self.queue, ResourceKind::Surface, |index| {
                Task::with_params(
                    "createSurface",
                    &json!({"width": width, "height": height, "format": format, "index": index}),
                )
            })
    }

    /// Load a BMP file into a surface.
    pub fn load_bitmap(&mut self, path: &str) -> Result<ResourceHandle> {
        self.registry
            .allocate(&mut self.queue, ResourceKind::Surface, |index| {
                Task::with_params("createSurfaceBitmap", &json!({"path": path, "index": index}))
            })
    }

    /// Upload a surface into a new texture.
    pub fn create_texture_from_surface(
        &mut self,
        surface: ResourceHandle,
    ) -> Result<ResourceHandle> {
        self.registry.resolve(surface, ResourceKind::Surface)?;
        self.registry
            .allocate(&mut self.queue, ResourceKind::Texture, |index| {
                Task::with_params(
                    "createTextureSurface",
                    &json!({"surface": surface, "index": index}),
                )
            })
    }

    /// Load an image file straight into a texture.
    pub fn load_texture(&mut self, path: &str) -> Result<ResourceHandle> {
        self.registry
            .allocate(&mut self.queue, ResourceKind::Texture, |index| {
                Task::with_params("loadTexture", &json!({"path": path, "index": index}))
            })
    }

    /// Create a blank texture. `format` and `access` are the host's enum
    /// values; `None` lets the host pick the format.
    pub fn create_texture(
        &mut self,
        format: Option<u32>,
        access: u32,
        width: u32,
        height: u32,
    ) -> Result<ResourceHandle> {
        self.registry
            .allocate(&mut self.queue, ResourceKind::Texture, |index| {
                Task::with_params(
                    "createTexture",
                    &json!({
                        "format": format,
                        "access": access,
                        "width": width,
                        "height": height,
                        "index": index,
                    }),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::io::DuplexStream;

    fn canvas() -> Canvas<DuplexStream> {
        let (client, _host) = tokio::io::duplex(64);
        CanvasBuilder::new("test", 100, 100).build(client)
    }

    fn pending(canvas: &Canvas<DuplexStream>) -> Vec<Value> {
        canvas
            .queue()
            .pending()
            .iter()
            .map(|t| serde_json::to_value(t).unwrap())
            .collect()
    }

    #[test]
    fn test_builder_options() {
        let builder = CanvasBuilder::new("win", 640, 480)
            .flags(WindowFlags::BORDERLESS)
            .flags(WindowFlags::OPENGL)
            .position(5, 6)
            .centered(true)
            .resizable(true)
            .software(true)
            .listen_addr("127.0.0.1:0");

        let window = builder.window_options();
        assert_eq!(window.flags.map(WindowFlags::bits), Some(0x12));
        assert_eq!(window.position, Some((5, 6)));
        assert!(window.centered && window.resizable);
        assert!(!window.fullscreen);
        assert!(builder.canvas.software);
        assert_eq!(builder.listen_addr, "127.0.0.1:0");
        assert_eq!(builder.max_frame_size, DEFAULT_MAX_FRAME_SIZE);
    }

    #[test]
    fn test_drawing_tasks_wire_shape() {
        let mut canvas = canvas();
        canvas.set_draw_color(1, 2, 3, 4).unwrap();
        canvas.draw_line(Point::new(0, 0), Point::new(5, 5)).unwrap();
        canvas.fill_rects(&[Rect::new(1, 1, 2, 2)]).unwrap();
        canvas.maximize();
        canvas.present();

        assert_eq!(
            pending(&canvas),
            vec![
                json!({"setDrawColor": {"r": 1, "g": 2, "b": 3, "a": 4}}),
                json!({"drawLine": {"p1": {"x": 0, "y": 0}, "p2": {"x": 5, "y": 5}}}),
                json!({"fillRects": {"rects": [{"x": 1, "y": 1, "width": 2, "height": 2}]}}),
                json!("maximize"),
                json!("present"),
            ]
        );
    }

    #[test]
    fn test_resource_handles_increase() {
        let mut canvas = canvas();
        let surface = canvas.load_bitmap("a.bmp").unwrap();
        let texture = canvas.create_texture_from_surface(surface).unwrap();
        let cursor = canvas.set_cursor("hand.png").unwrap();
        assert_eq!([surface.get(), texture.get(), cursor.get()], [1, 2, 3]);

        assert_eq!(
            pending(&canvas)[1],
            json!({"createTextureSurface": {"surface": 1, "index": 2}})
        );
    }

    #[test]
    fn test_handle_validation() {
        let mut canvas = canvas();
        let surface = canvas.create_surface(8, 8, 0).unwrap();
        let texture = canvas.load_texture("t.png").unwrap();

        // A surface is not a texture.
        assert!(matches!(
            canvas.copy(surface, Rect::new(0, 0, 1, 1), Rect::new(0, 0, 1, 1)),
            Err(CanvasError::Resource(_))
        ));
        assert!(matches!(
            canvas.create_texture_from_surface(texture),
            Err(CanvasError::Resource(_))
        ));
        assert_eq!(canvas.queue().len(), 2);

        canvas
            .copy(texture, Rect::new(0, 0, 1, 1), Rect::new(2, 2, 1, 1))
            .unwrap();
        assert_eq!(canvas.queue().len(), 3);
    }

    #[test]
    fn test_render_font_carries_font_spec() {
        let mut canvas = canvas();
        let font = canvas.load_font("mono.ttf", 14, Some(FontStyle::Italic)).unwrap();
        // Fonts queue nothing on load.
        assert!(canvas.queue().is_empty());

        canvas
            .render_font(
                font,
                "hi",
                FontRender::Solid {
                    color: Color::rgba(255, 0, 0, 255),
                },
                None,
            )
            .unwrap();

        assert_eq!(
            pending(&canvas)[0],
            json!({"renderFont": {
                "font": 1,
                "text": "hi",
                "options": {"solid": {"color": {"r": 255, "g": 0, "b": 0, "a": 255}}},
                "target": null,
                "path": "mono.ttf",
                "size": 14,
                "style": "italic"
            }})
        );

        let surface = canvas.create_surface(1, 1, 0).unwrap();
        assert!(matches!(
            canvas.render_font(
                surface,
                "x",
                FontRender::Blended {
                    color: Default::default()
                },
                None
            ),
            Err(CanvasError::Resource(_))
        ));
    }

    #[test]
    fn test_quit_marks_closing() {
        let mut canvas = canvas();
        canvas.quit();
        assert!(canvas.queue().contains("quit"));
        assert!(canvas.session.is_closing());
        assert_eq!(canvas.phase(), Phase::AwaitingHost);
    }
}
