//! Pose publisher: background receive, parse and publish loop
//!
//! One dedicated thread per active device owns the transport, reads chunks,
//! turns them into poses and hands them to the host registry.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start()──► Running ──stop()──► Stopping ──worker exits──► Stopped
//!                      │
//!                      └── transport open fails ──────────────────► Stopped
//! ```
//!
//! - `start()` sets the liveness flag and spawns the worker; the worker opens
//!   the transport. If that fails the loop body never runs.
//! - Each iteration receives one chunk, publishes every sample it yields,
//!   then sleeps the poll interval whatever the outcome.
//! - `stop()` clears the liveness flag with a single atomic swap. Only the
//!   call that observes `true` joins the worker; repeated calls are no-ops.
//! - The worker closes the transport before it finishes, so once `stop()`
//!   returns the connection is released.
//!
//! Receive and parse failures are logged and counted, never fatal. A dropped
//! connection is not re-established; every following receive reports a
//! failure until the publisher is stopped.
//!
//! Cancellation is cooperative: a receive blocked on the socket is not
//! interrupted, so `stop()` returns once that receive completes (next
//! message, peer close, socket error, or read timeout if configured).

use crate::config::{ConnectionConfig, FramingMode};
use crate::error::{Error, Result};
use crate::host::{DriverHost, TrackedDeviceIndex};
use crate::parser::FrameParser;
use crate::pose::{DriverPose, RotationSample};
use crate::transport::Transport;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Publisher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl PublisherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PublisherState::Idle,
            1 => PublisherState::Running,
            2 => PublisherState::Stopping,
            _ => PublisherState::Stopped,
        }
    }
}

/// Loop parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Size of the receive buffer; bounds one chunk
    pub buffer_size: usize,
    /// Pause after every iteration
    pub poll_interval: Duration,
    pub framing: FramingMode,
}

impl PublisherConfig {
    pub fn from_connection(config: &ConnectionConfig) -> Self {
        Self {
            buffer_size: config.receive_buffer_size,
            poll_interval: config.poll_interval(),
            framing: config.framing,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self::from_connection(&ConnectionConfig::default())
    }
}

/// Counters updated by the worker, readable from any thread
#[derive(Debug, Default)]
pub struct PublisherStats {
    chunks_received: AtomicU64,
    poses_published: AtomicU64,
    parse_failures: AtomicU64,
    receive_failures: AtomicU64,
}

/// Point-in-time copy of [`PublisherStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub chunks_received: u64,
    pub poses_published: u64,
    pub parse_failures: u64,
    pub receive_failures: u64,
}

impl PublisherStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            poses_published: self.poses_published.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            receive_failures: self.receive_failures.load(Ordering::Relaxed),
        }
    }
}

/// Background pose stream for one device. Single-use: once stopped it
/// cannot be started again.
pub struct PosePublisher {
    config: PublisherConfig,
    /// Liveness flag: true while the worker should keep iterating
    active: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    stats: Arc<PublisherStats>,
    /// Worker thread handle - joined on stop
    handle: Option<JoinHandle<()>>,
}

impl PosePublisher {
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            config,
            active: Arc::new(AtomicBool::new(false)),
            state: Arc::new(AtomicU8::new(PublisherState::Idle as u8)),
            stats: Arc::new(PublisherStats::default()),
            handle: None,
        }
    }

    pub fn state(&self) -> PublisherState {
        PublisherState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the liveness flag is set
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Spawn the worker thread.
    ///
    /// The worker opens `transport` and publishes every parsed sample to
    /// `host` under `index`. Fails with [`Error::AlreadyStarted`] unless the
    /// publisher is idle.
    pub fn start<T>(
        &mut self,
        transport: T,
        host: Arc<dyn DriverHost>,
        index: TrackedDeviceIndex,
    ) -> Result<()>
    where
        T: Transport + 'static,
    {
        self.state
            .compare_exchange(
                PublisherState::Idle as u8,
                PublisherState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| Error::AlreadyStarted)?;

        self.active.store(true, Ordering::SeqCst);

        let worker = PoseWorker {
            transport,
            parser: FrameParser::new(self.config.framing),
            host,
            index,
            buffer: vec![0u8; self.config.buffer_size],
            poll_interval: self.config.poll_interval,
            active: Arc::clone(&self.active),
            state: Arc::clone(&self.state),
            stats: Arc::clone(&self.stats),
        };

        let spawned = thread::Builder::new()
            .name("pose-update".to_string())
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Pose publisher started for device {}", index);
                Ok(())
            }
            Err(e) => {
                self.active.store(false, Ordering::SeqCst);
                self.state
                    .store(PublisherState::Stopped as u8, Ordering::SeqCst);
                Err(Error::Other(format!("Failed to spawn pose update thread: {}", e)))
            }
        }
    }

    /// Clear the liveness flag and wait for the worker to exit.
    ///
    /// Only the first call after `start()` has any effect.
    pub fn stop(&mut self) -> Result<()> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // The worker may already be Stopped if the transport never opened
        let _ = self.state.compare_exchange(
            PublisherState::Running as u8,
            PublisherState::Stopping as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        tracing::info!("Stopping pose publisher...");

        let joined = match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::ThreadPanic),
            None => Ok(()),
        };

        self.state
            .store(PublisherState::Stopped as u8, Ordering::SeqCst);
        tracing::info!("Pose publisher stopped");
        joined
    }
}

impl Drop for PosePublisher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// State owned by the worker thread
struct PoseWorker<T> {
    transport: T,
    parser: FrameParser,
    host: Arc<dyn DriverHost>,
    index: TrackedDeviceIndex,
    buffer: Vec<u8>,
    poll_interval: Duration,
    active: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    stats: Arc<PublisherStats>,
}

impl<T: Transport> PoseWorker<T> {
    fn run(mut self) {
        if let Err(e) = self.transport.open() {
            tracing::error!("Pose stream not started: {}", e);
            self.state
                .store(PublisherState::Stopped as u8, Ordering::SeqCst);
            return;
        }

        tracing::info!("Pose update thread running for device {}", self.index);

        while self.active.load(Ordering::SeqCst) {
            self.iterate();
            thread::sleep(self.poll_interval);
        }

        self.transport.close();
        self.state
            .store(PublisherState::Stopped as u8, Ordering::SeqCst);
        tracing::info!("Pose update thread exiting");
    }

    /// One receive / parse / publish step
    fn iterate(&mut self) {
        let results = match self.transport.receive(&mut self.buffer) {
            Ok(0) => {
                self.stats.receive_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Failed to receive data: connection closed");
                return;
            }
            Ok(n) => {
                self.stats.chunks_received.fetch_add(1, Ordering::Relaxed);
                let chunk = &self.buffer[..n];
                tracing::debug!("Received data: {}", String::from_utf8_lossy(chunk));
                self.parser.feed(chunk)
            }
            Err(Error::ReceiveTimeout) => {
                tracing::trace!("No data within read timeout");
                return;
            }
            Err(e) => {
                self.stats.receive_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Failed to receive data: {}", e);
                return;
            }
        };

        for result in results {
            match result {
                Ok(sample) => self.publish(sample),
                Err(e) => {
                    self.stats.parse_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Discarded chunk: {}", e);
                }
            }
        }
    }

    fn publish(&self, sample: RotationSample) {
        let pose = DriverPose::from_rotation_sample(sample);
        self.host
            .tracked_device_pose_updated(self.index, &pose, DriverPose::VERSION);
        self.stats.poses_published.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Pose updated: Rotation({}, {}, {})",
            sample.x,
            sample.y,
            sample.z
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;
    use crate::transport::{MockTransport, OpenFailure};
    use std::io::ErrorKind;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_config() -> PublisherConfig {
        PublisherConfig {
            poll_interval: Duration::from_millis(1),
            ..PublisherConfig::default()
        }
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    #[test]
    fn test_publishes_rotation_from_record() {
        let mock = MockTransport::new();
        mock.push_chunk(b"0,0,0\n1.5,-2.25,3.0");
        let host = Arc::new(RecordingHost::new());

        let mut publisher = PosePublisher::new(fast_config());
        publisher.start(mock.clone(), host.clone(), 4).unwrap();
        assert!(host.wait_for_poses(1, WAIT));
        publisher.stop().unwrap();

        let updates = host.poses();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].index, 4);
        assert_eq!(updates[0].version, DriverPose::VERSION);
        assert_eq!(updates[0].pose.rotation.to_xyzw(), [1.5, -2.25, 3.0, 1.0]);
        assert_eq!(updates[0].pose.position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_nan_rotation_is_published() {
        let mock = MockTransport::new();
        mock.push_chunk(b"0,0,0\nNaN,0,0");
        let host = Arc::new(RecordingHost::new());

        let mut publisher = PosePublisher::new(fast_config());
        publisher.start(mock.clone(), host.clone(), 0).unwrap();
        assert!(host.wait_for_poses(1, WAIT));
        publisher.stop().unwrap();

        let q = host.poses()[0].pose.rotation;
        assert!(q.x.is_nan());
        assert_eq!((q.y, q.z, q.w), (0.0, 0.0, 1.0));
    }

    #[test]
    fn test_chunk_without_newline_is_not_published() {
        let mock = MockTransport::new();
        mock.push_chunk(b"garbage");
        let host = Arc::new(RecordingHost::new());

        let mut publisher = PosePublisher::new(fast_config());
        publisher.start(mock.clone(), host.clone(), 0).unwrap();
        assert!(wait_until(WAIT, || publisher.stats().parse_failures == 1));
        publisher.stop().unwrap();

        assert_eq!(host.pose_count(), 0);
        let stats = publisher.stats();
        assert_eq!(stats.chunks_received, 1);
        assert_eq!(stats.poses_published, 0);
    }

    #[test]
    fn test_open_failure_never_iterates() {
        for failure in [
            OpenFailure::TransportInit,
            OpenFailure::SocketCreate,
            OpenFailure::Connect,
        ] {
            let mock = MockTransport::new();
            mock.fail_open(failure);
            mock.push_chunk(b"0,0,0\n1,2,3");
            let host = Arc::new(RecordingHost::new());

            let mut publisher = PosePublisher::new(fast_config());
            publisher.start(mock.clone(), host.clone(), 0).unwrap();
            assert!(wait_until(WAIT, || publisher.state() == PublisherState::Stopped));
            publisher.stop().unwrap();

            assert_eq!(mock.open_count(), 1);
            assert_eq!(mock.receive_count(), 0);
            assert_eq!(mock.pending(), 1);
            assert_eq!(host.pose_count(), 0);
        }
    }

    #[test]
    fn test_samples_published_in_order() {
        let mock = MockTransport::new();
        mock.push_chunk(b"0,0,0\n1,0,0");
        mock.push_chunk(b"0,0,0\n2,0,0");
        mock.push_chunk(b"0,0,0\n3,0,0");
        let host = Arc::new(RecordingHost::new());

        let mut publisher = PosePublisher::new(fast_config());
        publisher.start(mock.clone(), host.clone(), 0).unwrap();
        assert!(host.wait_for_poses(3, WAIT));
        publisher.stop().unwrap();

        let xs: Vec<f64> = host.poses().iter().map(|u| u.pose.rotation.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_receive_errors_do_not_stop_loop() {
        let mock = MockTransport::new();
        mock.push_error(ErrorKind::ConnectionReset);
        mock.push_chunk(b"0,0,0\nbad");
        mock.push_chunk(b"0,0,0\n7,8,9");
        let host = Arc::new(RecordingHost::new());

        let mut publisher = PosePublisher::new(fast_config());
        publisher.start(mock.clone(), host.clone(), 0).unwrap();
        assert!(host.wait_for_poses(1, WAIT));
        publisher.stop().unwrap();

        let stats = publisher.stats();
        assert!(stats.receive_failures >= 1);
        assert_eq!(stats.parse_failures, 1);
        assert_eq!(stats.poses_published, 1);
        assert_eq!(host.poses()[0].pose.rotation.to_xyzw(), [7.0, 8.0, 9.0, 1.0]);
    }

    #[test]
    fn test_stop_closes_transport() {
        let mock = MockTransport::new();
        let host = Arc::new(RecordingHost::new());

        let mut publisher = PosePublisher::new(fast_config());
        publisher.start(mock.clone(), host, 0).unwrap();
        assert!(wait_until(WAIT, || mock.receive_count() > 0));
        assert_eq!(publisher.state(), PublisherState::Running);

        publisher.stop().unwrap();
        assert_eq!(publisher.state(), PublisherState::Stopped);
        assert!(!publisher.is_active());
        assert!(!mock.is_open());
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mock = MockTransport::new();
        let host = Arc::new(RecordingHost::new());

        let mut publisher = PosePublisher::new(fast_config());
        publisher.start(mock.clone(), host, 0).unwrap();
        publisher.stop().unwrap();
        publisher.stop().unwrap();
        publisher.stop().unwrap();

        assert_eq!(publisher.state(), PublisherState::Stopped);
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let mut publisher = PosePublisher::new(fast_config());
        publisher.stop().unwrap();
        assert_eq!(publisher.state(), PublisherState::Idle);
    }

    #[test]
    fn test_publisher_is_single_use() {
        let host = Arc::new(RecordingHost::new());
        let mut publisher = PosePublisher::new(fast_config());
        publisher.start(MockTransport::new(), host.clone(), 0).unwrap();

        assert!(matches!(
            publisher.start(MockTransport::new(), host.clone(), 0),
            Err(Error::AlreadyStarted)
        ));

        publisher.stop().unwrap();
        assert!(matches!(
            publisher.start(MockTransport::new(), host, 0),
            Err(Error::AlreadyStarted)
        ));
    }

    #[test]
    fn test_buffered_framing_joins_fragments() {
        let mock = MockTransport::new();
        mock.push_chunk(b"0,0,0\n1.5,-2.");
        mock.push_chunk(b"25,3.0\n");
        let host = Arc::new(RecordingHost::new());

        let config = PublisherConfig {
            framing: FramingMode::Buffered,
            ..fast_config()
        };
        let mut publisher = PosePublisher::new(config);
        publisher.start(mock.clone(), host.clone(), 0).unwrap();
        assert!(host.wait_for_poses(1, WAIT));
        publisher.stop().unwrap();

        assert_eq!(
            host.poses()[0].pose.rotation.to_xyzw(),
            [1.5, -2.25, 3.0, 1.0]
        );
        assert_eq!(publisher.stats().parse_failures, 0);
    }

    #[test]
    fn test_drop_stops_worker() {
        let mock = MockTransport::new();
        let host = Arc::new(RecordingHost::new());
        {
            let mut publisher = PosePublisher::new(fast_config());
            publisher.start(mock.clone(), host, 0).unwrap();
            assert!(wait_until(WAIT, || mock.is_open()));
        }
        assert!(!mock.is_open());
    }
}
