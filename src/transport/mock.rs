//! Mock transport for testing

use super::Transport;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};

/// Which open error a [`MockTransport`] should report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailure {
    TransportInit,
    SocketCreate,
    Connect,
}

enum ScriptedRead {
    Data(Vec<u8>),
    Error(ErrorKind),
}

/// Scripted transport for unit and integration tests.
///
/// Clones share state, so a test can keep one handle and move another into
/// the publisher. Each queued chunk is returned by exactly one `receive`;
/// once the script is exhausted `receive` reports an orderly close (`Ok(0)`).
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    reads: VecDeque<ScriptedRead>,
    open_failure: Option<OpenFailure>,
    open: bool,
    open_count: usize,
    close_count: usize,
    receive_count: usize,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue one chunk to be returned by a single `receive`
    pub fn push_chunk(&self, data: &[u8]) {
        self.lock().reads.push_back(ScriptedRead::Data(data.to_vec()));
    }

    /// Queue a receive error
    pub fn push_error(&self, kind: ErrorKind) {
        self.lock().reads.push_back(ScriptedRead::Error(kind));
    }

    /// Make every subsequent `open` fail
    pub fn fail_open(&self, failure: OpenFailure) {
        self.lock().open_failure = Some(failure);
    }

    /// Number of scripted reads not yet consumed
    pub fn pending(&self) -> usize {
        self.lock().reads.len()
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    /// Number of `close` calls that released an open connection
    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    pub fn receive_count(&self) -> usize {
        self.lock().receive_count
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.open_count += 1;

        match inner.open_failure {
            Some(OpenFailure::TransportInit) => {
                Err(Error::TransportInit("mock network stack unavailable".to_string()))
            }
            Some(OpenFailure::SocketCreate) => Err(Error::SocketCreate(std::io::Error::new(
                ErrorKind::PermissionDenied,
                "mock socket creation refused",
            ))),
            Some(OpenFailure::Connect) => Err(Error::Connect {
                addr: "mock".to_string(),
                source: std::io::Error::new(ErrorKind::ConnectionRefused, "mock refused"),
            }),
            None => {
                inner.open = true;
                Ok(())
            }
        }
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock();
        if !inner.open {
            return Err(Error::NotConnected);
        }
        inner.receive_count += 1;

        match inner.reads.pop_front() {
            Some(ScriptedRead::Data(data)) => {
                let n = data.len().min(buffer.len());
                buffer[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(ScriptedRead::Error(kind)) => Err(Error::Io(std::io::Error::new(
                kind,
                "mock receive error",
            ))),
            None => Ok(0),
        }
    }

    fn close(&mut self) {
        let mut inner = self.lock();
        if inner.open {
            inner.open = false;
            inner.close_count += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }
}
