//! TCP listener the host process connects to.
//!
//! # Example
//!
//! ```ignore
//! use canvaswire_client::transport::HostListener;
//!
//! let listener = HostListener::bind("127.0.0.1:34254").await?;
//! // spawn the host process here, pointing it at listener.local_addr()
//! let stream = listener.accept().await?;
//! ```

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::Result;

/// Listens for the host connection.
pub struct HostListener {
    listener: TcpListener,
}

impl HostListener {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::debug!("Listening for host on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    /// Accept a single host connection.
    ///
    /// Nagle is disabled: every status byte waits on the reply before it.
    pub async fn accept(&self) -> Result<TcpStream> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        tracing::debug!("Host connected from {}", peer);
        Ok(stream)
    }

    /// Get the bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}
