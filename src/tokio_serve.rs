//! Serving the engine over an async byte stream.
//!
//! [`serve`] is the control loop of the instrument. It waits for either a
//! chunk of input or the next periodic deadline, whichever comes first.
//! Input is framed into lines and each line is answered before the next one
//! is looked at; a periodic report is always written as a whole line, so
//! responses and unsolicited output never interleave.
//!
//! Engine calls may block (shared-bus settle delays), so they run on the
//! blocking pool while the loop awaits them.
//!
//! ```no_run
//! use multitherm_lib::{
//!     bank::{ChannelBank, RelayBank},
//!     engine::{Engine, Settings},
//!     tokio_serve::{self, SharedEngine},
//! };
//!
//! # async fn run() -> multitherm_lib::tokio_common::Result<()> {
//! let engine = SharedEngine::new(Engine::new(
//!     ChannelBank::new(Vec::new(), Vec::new()),
//!     RelayBank::new(Vec::new()),
//!     Settings::default(),
//! ));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5025").await?;
//! loop {
//!     let (socket, _) = listener.accept().await?;
//!     let (reader, writer) = socket.into_split();
//!     tokio_serve::serve(&engine, reader, writer).await?;
//! }
//! # }
//! ```

use crate::engine::Engine;
use crate::mode::Mode;
use crate::protocol::LINE_TERMINATOR;
use crate::tokio_common::Result;
use crate::transport::LineFramer;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Thread-safe handle to an [`Engine`].
///
/// The engine outlives any single host connection, so mode and relay states
/// carry over when a host reconnects.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    engine: Arc<Mutex<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Runs `f` against the engine on the blocking pool.
    pub async fn call<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Engine) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut engine = self.engine.clone().lock_owned().await;
        Ok(tokio::task::spawn_blocking(move || f(&mut engine)).await?)
    }

    /// Processes one input line, see [`Engine::handle_line`].
    pub async fn handle_line(&self, line: String) -> Result<Option<String>> {
        self.call(move |engine| engine.handle_line(&line)).await
    }

    /// Produces the periodic report of the active mode, see [`Engine::periodic_report`].
    pub async fn periodic_report(&self) -> Result<Option<String>> {
        self.call(Engine::periodic_report).await
    }

    pub async fn mode(&self) -> Mode {
        self.engine.lock().await.mode()
    }

    pub async fn output_interval(&self) -> Option<Duration> {
        self.engine.lock().await.output_interval()
    }
}

async fn write_line<W>(writer: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(LINE_TERMINATOR.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Serves one host until its input reaches end-of-file.
pub async fn serve<R, W>(engine: &SharedEngine, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut framer = LineFramer::new();
    let mut buffer = [0u8; 256];
    let mut mode = engine.mode().await;
    let mut deadline = engine
        .output_interval()
        .await
        .map(|every| Instant::now() + every);

    loop {
        tokio::select! {
            biased;

            read = reader.read(&mut buffer) => {
                let count = read?;
                if count == 0 {
                    info!("Host closed the connection");
                    return Ok(());
                }
                for line in framer.push(&buffer[..count]) {
                    if let Some(response) = engine.handle_line(line).await? {
                        write_line(&mut writer, &response).await?;
                    }
                }
            }

            _ = async { sleep_until(deadline.unwrap_or_else(Instant::now)).await },
                if deadline.is_some() =>
            {
                if let Some(report) = engine.periodic_report().await? {
                    write_line(&mut writer, &report).await?;
                }
                deadline = engine
                    .output_interval()
                    .await
                    .map(|every| Instant::now() + every);
            }
        }

        // A mode change restarts the cadence of the new mode.
        let current = engine.mode().await;
        if current != mode {
            mode = current;
            deadline = engine
                .output_interval()
                .await
                .map(|every| Instant::now() + every);
        }
    }
}
