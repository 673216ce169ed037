//! Interfaces to the VR runtime that hosts the driver
//!
//! The runtime owns device registration, the property containers, input
//! components and the tracking registry that receives poses. The driver only
//! calls into it; these traits describe the calls it makes.
//!
//! Two implementations ship with the crate:
//!
//! - [`RecordingHost`]: keeps every call in memory, for tests
//! - [`LoggingHost`]: reports every call through `tracing`, for running the
//!   driver standalone

mod logging;
mod recording;

pub use logging::LoggingHost;
pub use recording::{PoseUpdate, PropertyValue, RecordingHost};

use crate::pose::DriverPose;

/// Index the runtime assigns to a tracked device on activation
pub type TrackedDeviceIndex = u32;

/// Index value meaning "no device"
pub const INVALID_DEVICE_INDEX: TrackedDeviceIndex = u32::MAX;

/// Handle to a device's property container
pub type PropertyContainerHandle = u64;

/// Handle to an input or output component
pub type InputComponentHandle = u64;

/// Handle value returned when a component could not be created
pub const INVALID_INPUT_COMPONENT: InputComponentHandle = 0;

/// Kind of device announced to the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Hmd,
    Controller,
    GenericTracker,
    TrackingReference,
}

/// Which hand (if any) a controller is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerRole {
    Invalid = 0,
    LeftHand = 1,
    RightHand = 2,
    OptOut = 3,
    Treadmill = 4,
    Stylus = 5,
}

/// Device properties the driver sets on activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceProperty {
    ModelNumber,
    ControllerRoleHint,
    InputProfilePath,
}

/// Interpretation of a scalar input value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Absolute,
    Relative,
}

/// Range of a scalar input value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarUnits {
    /// 0.0 to 1.0
    NormalizedOneSided,
    /// -1.0 to 1.0
    NormalizedTwoSided,
}

/// Device registration and the pose sink
pub trait DriverHost: Send + Sync {
    /// Announce a device to the runtime
    fn tracked_device_added(&self, serial_number: &str, class: DeviceClass) -> bool;

    /// Deliver a new pose for an active device; `version` tags the pose layout
    fn tracked_device_pose_updated(&self, index: TrackedDeviceIndex, pose: &DriverPose, version: u32);
}

/// Device property containers
pub trait PropertyStore {
    fn tracked_device_to_property_container(
        &self,
        index: TrackedDeviceIndex,
    ) -> PropertyContainerHandle;

    fn set_string_property(
        &self,
        container: PropertyContainerHandle,
        property: DeviceProperty,
        value: &str,
    );

    fn set_int32_property(
        &self,
        container: PropertyContainerHandle,
        property: DeviceProperty,
        value: i32,
    );
}

/// Input and haptic component creation
pub trait DriverInput {
    fn create_boolean_component(
        &self,
        container: PropertyContainerHandle,
        name: &str,
    ) -> InputComponentHandle;

    fn create_scalar_component(
        &self,
        container: PropertyContainerHandle,
        name: &str,
        scalar_type: ScalarType,
        units: ScalarUnits,
    ) -> InputComponentHandle;

    fn create_haptic_component(
        &self,
        container: PropertyContainerHandle,
        name: &str,
    ) -> InputComponentHandle;
}
