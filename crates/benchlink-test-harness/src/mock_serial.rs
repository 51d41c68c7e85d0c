//! Mock transport for deterministic testing of protocol engines.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test ASCII command generation,
//! binary frame encoding, and response parsing without real instruments.
//!
//! Responses can be delivered whole, in chunks, cut short by a timeout, or
//! followed by late bytes that only show up after the timeout, which is how
//! the stale-byte handling of [`Link`](benchlink_core::Link) is exercised.
//!
//! # Example
//!
//! ```
//! use benchlink_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // Pre-load: when the protocol engine sends this request, return this response.
//! mock.expect(b"AZ.2P1?\r", b"AZ,02,4,1,550.0\r\n");
//! let sent = mock.sent_log();
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use benchlink_core::error::{Error, Result};
use benchlink_core::transport::Transport;

/// One step of a scripted reply.
#[derive(Debug, Clone)]
enum Reply {
    /// Bytes handed out by `receive()`.
    Data(Vec<u8>),
    /// A `receive()` that times out.
    Silence,
}

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// What the device does after the request.
    replies: Vec<Reply>,
}

/// Shared, inspectable log of every `send()` call.
///
/// The log stays readable after the transport itself has been boxed into a
/// [`Link`](benchlink_core::Link).
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl SentLog {
    /// Record one write.
    pub fn push(&self, data: &[u8]) {
        if let Ok(mut log) = self.0.lock() {
            log.push(data.to_vec());
        }
    }

    /// Snapshot of all writes so far.
    pub fn entries(&self) -> Vec<Vec<u8>> {
        self.0.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of writes so far.
    pub fn len(&self) -> usize {
        self.0.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes decoded as UTF-8 (lossy), handy for ASCII protocols.
    pub fn as_strings(&self) -> Vec<String> {
        self.entries()
            .iter()
            .map(|e| String::from_utf8_lossy(e).into_owned())
            .collect()
    }
}

/// A mock [`Transport`] for testing protocol engines without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation. The
/// corresponding replies are then handed out by subsequent `receive()`
/// calls.
///
/// If no expectation matches or the queue is exhausted, an error is returned.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Replies pending for upcoming `receive()` calls.
    inbound: VecDeque<Reply>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: SentLog,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            inbound: VecDeque::new(),
            connected: true,
            sent_log: SentLog::default(),
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, the subsequent
    /// `receive()` call will return `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.push(request, vec![Reply::Data(response.to_vec())]);
    }

    /// Like [`expect`](Self::expect), but the response arrives in pieces,
    /// one per `receive()` call.
    pub fn expect_chunked(&mut self, request: &[u8], chunks: &[&[u8]]) {
        let replies = chunks.iter().map(|c| Reply::Data(c.to_vec())).collect();
        self.push(request, replies);
    }

    /// The device answers with `partial` and then goes quiet, so the
    /// exchange times out.
    pub fn expect_timeout(&mut self, request: &[u8], partial: &[u8]) {
        let mut replies = Vec::new();
        if !partial.is_empty() {
            replies.push(Reply::Data(partial.to_vec()));
        }
        replies.push(Reply::Silence);
        self.push(request, replies);
    }

    /// The device answers with `partial`, the exchange times out, and `late`
    /// arrives afterwards, where the next exchange could pick it up.
    pub fn expect_with_late(&mut self, request: &[u8], partial: &[u8], late: &[u8]) {
        let mut replies = Vec::new();
        if !partial.is_empty() {
            replies.push(Reply::Data(partial.to_vec()));
        }
        replies.push(Reply::Silence);
        replies.push(Reply::Data(late.to_vec()));
        self.push(request, replies);
    }

    fn push(&mut self, request: &[u8], replies: Vec<Reply>) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            replies,
        });
    }

    /// Return all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.sent_log.entries()
    }

    /// A handle to the sent log that outlives boxing the transport.
    pub fn sent_log(&self) -> SentLog {
        self.sent_log.clone()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::TransportClosed`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::TransportClosed);
        }

        self.sent_log.push(data);

        if let Some(expectation) = self.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::Protocol(format!(
                    "unexpected send data: expected {:02X?}, got {:02X?}",
                    expectation.request, data
                )));
            }
            self.inbound.extend(expectation.replies);
            Ok(())
        } else {
            Err(Error::Protocol(
                "no more expectations in mock transport".into(),
            ))
        }
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::TransportClosed);
        }

        match self.inbound.pop_front() {
            Some(Reply::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.inbound.push_front(Reply::Data(data[n..].to_vec()));
                }
                Ok(n)
            }
            Some(Reply::Silence) | None => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.inbound.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchlink_core::link::{FrameStatus, Link};

    fn line_framer(buf: &[u8]) -> FrameStatus {
        match buf.iter().position(|&b| b == b'\n') {
            Some(pos) => FrameStatus::Complete(pos + 1),
            None => FrameStatus::Incomplete,
        }
    }

    #[tokio::test]
    async fn mock_transport_basic_send_receive() {
        let mut mock = MockTransport::new();
        let request = b"AZ.1K\r";
        let response = b"AZ,01,4,0,12.0,3.5\r\n";

        mock.expect(request, response);
        mock.send(request).await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(n, response.len());
        assert_eq!(&buf[..n], response);
    }

    #[tokio::test]
    async fn mock_transport_tracks_sent_data() {
        let mut mock = MockTransport::new();
        let log = mock.sent_log();
        mock.expect(&[0x60, 0x00, 0x60], &[0x60, 0x00, 0x10, 0x70]);
        mock.expect(&[0x60, 0x02, 0x62], &[0x60, 0x00, 0x00, 0x60]);

        mock.send(&[0x60, 0x00, 0x60]).await.unwrap();
        mock.send(&[0x60, 0x02, 0x62]).await.unwrap();

        assert_eq!(mock.sent_data().len(), 2);
        assert_eq!(log.entries()[1], vec![0x60, 0x02, 0x62]);
    }

    #[tokio::test]
    async fn mock_transport_wrong_data_errors() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xFF]);

        let result = mock.send(&[0x99]).await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn mock_transport_no_expectations_errors() {
        let mut mock = MockTransport::new();
        let result = mock.send(&[0x01]).await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn mock_transport_receive_without_send_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 64];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
    }

    #[tokio::test]
    async fn mock_transport_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.send(&[0x01]).await;
        assert!(matches!(result.unwrap_err(), Error::TransportClosed));
    }

    #[tokio::test]
    async fn mock_transport_partial_receive() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xAA, 0xBB, 0xCC, 0xDD]);
        mock.send(&[0x01]).await.unwrap();

        let mut buf = [0u8; 2];
        let n = mock.receive(&mut buf, Duration::from_millis(100)).await.unwrap();
        assert_eq!(&buf[..n], &[0xAA, 0xBB]);
        let n = mock.receive(&mut buf, Duration::from_millis(100)).await.unwrap();
        assert_eq!(&buf[..n], &[0xCC, 0xDD]);
    }

    #[tokio::test]
    async fn late_bytes_never_reach_the_next_exchange() {
        let mut mock = MockTransport::new();
        mock.expect_with_late(b"AZ.1P1?\r", b"AZ,01,4", b",1,12.0\r\n");
        mock.expect(b"AZ.1P3?\r", b"AZ,01,4,3,1\r\n");

        let link = Link::new(Box::new(mock), Duration::from_millis(50));
        let err = link.exchange(b"AZ.1P1?\r", line_framer).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));

        let reply = link.exchange(b"AZ.1P3?\r", line_framer).await.unwrap();
        assert_eq!(reply, b"AZ,01,4,3,1\r\n");
    }

    #[tokio::test]
    async fn chunked_response_is_reassembled_by_link() {
        let mut mock = MockTransport::new();
        mock.expect_chunked(b"q\r", &[b"AZ,", b"01,4,", b"3,2\r\n"]);
        let link = Link::new(Box::new(mock), Duration::from_millis(50));
        assert_eq!(link.exchange(b"q\r", line_framer).await.unwrap(), b"AZ,01,4,3,2\r\n");
    }
}
