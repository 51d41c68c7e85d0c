//! Serialized request/response exchanges over a shared transport.
//!
//! A [`Link`] owns one [`Transport`] behind an async mutex. Every protocol
//! codec talks to its instrument through [`Link::exchange`], which holds the
//! lock for the whole write-then-read cycle. A second request therefore
//! cannot reach the wire until the previous response has been fully
//! consumed or rejected, even when several channel facades share one
//! multidrop bus.
//!
//! # Timeouts and stale bytes
//!
//! When a response does not complete before the deadline the partial bytes
//! are discarded and the link is marked stale. Before the next request the
//! link drains whatever arrived late, so leftover bytes are never prepended
//! to a future response.
//!
//! There is no retry at this layer: a failed exchange is reported to the
//! caller, which keeps non-idempotent writes at-most-once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Window used to collect late bytes after a timed-out exchange.
const DRAIN_WINDOW: Duration = Duration::from_millis(20);

/// Upper bound on reads while draining, so a chattering device cannot
/// stall the link forever.
const MAX_DRAIN_READS: usize = 64;

/// Verdict of a framer on the bytes received so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A complete response occupies the first `n` bytes.
    Complete(usize),
    /// More bytes are needed.
    Incomplete,
}

struct LinkState {
    transport: Box<dyn Transport>,
    stale: bool,
}

/// A shared, mutex-guarded transport with a fixed response deadline.
///
/// Cloning a `Link` yields another handle to the same bus.
#[derive(Clone)]
pub struct Link {
    state: Arc<Mutex<LinkState>>,
    timeout: Duration,
}

impl Link {
    /// Wrap a transport. `timeout` bounds the read half of every exchange.
    pub fn new(transport: Box<dyn Transport>, timeout: Duration) -> Self {
        Link {
            state: Arc::new(Mutex::new(LinkState {
                transport,
                stale: false,
            })),
            timeout,
        }
    }

    /// Another handle to the same bus with a different response deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Link {
            state: Arc::clone(&self.state),
            timeout,
        }
    }

    /// Response deadline for exchanges on this handle.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write `request` and read until `framer` reports a complete response.
    ///
    /// Returns exactly the bytes of the complete frame. Bytes beyond the
    /// frame are treated as stale and drained before the next exchange.
    pub async fn exchange<F>(&self, request: &[u8], framer: F) -> Result<Vec<u8>>
    where
        F: Fn(&[u8]) -> FrameStatus + Send,
    {
        let mut state = self.state.lock().await;

        if !state.transport.is_connected() {
            return Err(Error::TransportClosed);
        }

        if state.stale {
            drain(state.transport.as_mut()).await?;
            state.stale = false;
        }

        trace!(bytes = request.len(), data = ?request, "exchange request");
        state.transport.send(request).await?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; 256];
        let mut response = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                discard_partial(&response);
                state.stale = true;
                return Err(Error::Timeout);
            }

            match state.transport.receive(&mut buf, remaining).await {
                Ok(0) => {
                    state.stale = true;
                    return Err(Error::Transport("transport returned end of stream".into()));
                }
                Ok(n) => {
                    response.extend_from_slice(&buf[..n]);
                    if let FrameStatus::Complete(len) = framer(&response) {
                        if response.len() > len {
                            warn!(
                                trailing = response.len() - len,
                                "bytes after complete frame will be discarded"
                            );
                            state.stale = true;
                        }
                        response.truncate(len);
                        trace!(bytes = len, data = ?response, "exchange response");
                        return Ok(response);
                    }
                }
                Err(Error::Timeout) => {
                    discard_partial(&response);
                    state.stale = true;
                    return Err(Error::Timeout);
                }
                Err(e) => {
                    state.stale = true;
                    return Err(e);
                }
            }
        }
    }

    /// Close the underlying transport. Later exchanges fail with
    /// [`Error::TransportClosed`].
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.transport.close().await
    }

    /// Whether the underlying transport is open.
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.transport.is_connected()
    }
}

fn discard_partial(response: &[u8]) {
    if !response.is_empty() {
        warn!(bytes = response.len(), data = ?response, "discarding partial response");
    }
}

async fn drain(transport: &mut dyn Transport) -> Result<()> {
    let mut buf = [0u8; 256];
    let mut discarded = 0usize;
    for _ in 0..MAX_DRAIN_READS {
        match transport.receive(&mut buf, DRAIN_WINDOW).await {
            Ok(0) | Err(Error::Timeout) => break,
            Ok(n) => discarded += n,
            Err(e) => return Err(e),
        }
    }
    if discarded > 0 {
        warn!(bytes = discarded, "drained late bytes before next request");
    }
    Ok(())
}
