//! Ghalib Driver - pose stream for a tracked VR controller
//!
//! A local process sends orientation records over TCP (`127.0.0.1:4120` by
//! default). Each record is two newline-separated lines; the second carries
//! `x,y,z`. The driver turns every record into a [`DriverPose`] and hands it
//! to the runtime's tracking registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  chunks  ┌─────────────┐ samples ┌──────────────┐
//! │  TcpSession  │─────────►│ FrameParser │────────►│  DriverHost  │
//! │ (transport)  │          │  (parser)   │  poses  │ (VR runtime) │
//! └──────────────┘          └─────────────┘         └──────────────┘
//!        ▲                                                 ▲
//!        └──────────── PosePublisher worker thread ────────┘
//! ```
//!
//! [`ControllerDevice`] ties it together: it registers the controller,
//! publishes its properties and input components on activation, and owns the
//! [`PosePublisher`] whose thread runs the receive/parse/publish loop.
//!
//! ## Rotation semantics
//!
//! The three received values go straight into the quaternion's vector part
//! with `w` fixed at `1.0`. The result is not normalized and the values are
//! not converted from degrees; consumers get exactly what the source sent.

pub mod config;
pub mod device;
pub mod error;
pub mod host;
pub mod logging;
pub mod parser;
pub mod pose;
pub mod publisher;
pub mod settings;
pub mod transport;

pub use config::{ConnectionConfig, DeviceConfig, DriverConfig, FramingMode, LoggingConfig};
pub use device::{ControllerDevice, InputComponents};
pub use error::{Error, Result};
pub use host::{
    ControllerRole, DeviceClass, DeviceProperty, DriverHost, DriverInput, LoggingHost,
    PropertyStore, RecordingHost, TrackedDeviceIndex,
};
pub use parser::{FrameError, FrameParser};
pub use pose::{DriverPose, Quaternion, RotationSample};
pub use publisher::{PosePublisher, PublisherConfig, PublisherState, StatsSnapshot};
pub use settings::{SettingsSource, StaticSettings};
pub use transport::{MockTransport, TcpSession, Transport};
