//! Closure-driven transport that detects interleaved requests.
//!
//! [`ScriptedTransport`] answers every request through a responder closure
//! instead of a fixed expectation queue, which makes it suitable for tests
//! where several tasks issue requests in an unpredictable order. It records
//! a violation whenever a request is written while the previous response
//! has not been fully read, so a test can assert that a shared bus never
//! interleaves exchanges.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use benchlink_core::error::{Error, Result};
use benchlink_core::transport::Transport;

use crate::mock_serial::SentLog;

type Responder = dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync;

/// A transport whose replies are computed by a closure.
///
/// Returning `None` from the responder simulates a device that stays
/// silent, which surfaces as [`Error::Timeout`] on the next `receive()`.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    pending: VecDeque<u8>,
    chunk_size: usize,
    delay: Duration,
    connected: bool,
    sent_log: SentLog,
    interleaved: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Create a transport answering through `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        ScriptedTransport {
            responder: Box::new(responder),
            pending: VecDeque::new(),
            chunk_size: usize::MAX,
            delay: Duration::ZERO,
            connected: true,
            sent_log: SentLog::default(),
            interleaved: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Hand out responses at most `size` bytes per `receive()` call.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Sleep for `delay` before every `receive()` returns data, giving
    /// competing tasks a chance to run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// A handle to the sent log.
    pub fn sent_log(&self) -> SentLog {
        self.sent_log.clone()
    }

    /// A counter of requests written while a response was still unread.
    pub fn interleave_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.interleaved)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::TransportClosed);
        }
        self.sent_log.push(data);

        if !self.pending.is_empty() {
            self.interleaved.fetch_add(1, Ordering::SeqCst);
            return Err(Error::Protocol(format!(
                "request {data:02X?} written while {} response bytes were unread",
                self.pending.len()
            )));
        }

        if let Some(response) = (self.responder)(data) {
            self.pending.extend(response);
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::TransportClosed);
        }
        if self.pending.is_empty() {
            return Err(Error::Timeout);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let n = self.pending.len().min(buf.len()).min(self.chunk_size);
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
