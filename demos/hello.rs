//! Bouncing square.
//!
//! Waits for the canvas host to connect on `CANVASWIRE_ADDR` (default
//! `0.0.0.0:34254`), then draws until the window is closed or Escape is
//! pressed.
//!
//! Run with: `RUST_LOG=debug cargo run --example hello`

use canvaswire_client::task::Point;
use canvaswire_client::{CanvasBuilder, WindowFlags, DEFAULT_LISTEN_ADDR};
use tracing_subscriber::EnvFilter;

const ESCAPE: i64 = 27;
const SIZE: i32 = 40;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("CANVASWIRE_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
    tracing::info!("Waiting for the canvas host on {}", addr);

    let mut canvas = CanvasBuilder::new("Hello canvaswire", 640, 480)
        .centered(true)
        .flags(WindowFlags::RESIZABLE)
        .listen_addr(addr)
        .listen()
        .await?;

    let (mut x, mut y, mut dx, mut dy) = (0i32, 0i32, 3i32, 2i32);

    while let Some(event) = canvas.next_event().await? {
        match event.kind.as_str() {
            "draw" => {
                x += dx;
                y += dy;
                if x <= 0 || x + SIZE >= 640 {
                    dx = -dx;
                }
                if y <= 0 || y + SIZE >= 480 {
                    dy = -dy;
                }

                canvas.set_draw_color(16, 16, 24, 255)?;
                canvas.clear();
                canvas.set_draw_color(255, 160, 0, 255)?;
                canvas.fill_rect(x, y, SIZE as u32, SIZE as u32)?;
                canvas.draw_line(Point::new(0, 0), Point::new(x, y))?;
                canvas.present();
            }
            "key_down" if event.get("keycode").and_then(|k| k.as_i64()) == Some(ESCAPE) => {
                canvas.quit();
            }
            "quit" => canvas.quit(),
            _ => {}
        }
    }

    tracing::info!("Host closed");
    Ok(())
}
