//! Host that reports driver calls through `tracing`

use super::{
    DeviceClass, DeviceProperty, DriverHost, DriverInput, InputComponentHandle,
    PropertyContainerHandle, PropertyStore, ScalarType, ScalarUnits, TrackedDeviceIndex,
};
use crate::pose::DriverPose;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stand-in runtime for running the driver outside a VR host.
///
/// Pose updates are logged at debug level and counted; everything else at
/// info level.
#[derive(Debug, Default)]
pub struct LoggingHost {
    pose_updates: AtomicU64,
    next_handle: AtomicU64,
}

impl LoggingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pose updates received so far
    pub fn pose_updates(&self) -> u64 {
        self.pose_updates.load(Ordering::Relaxed)
    }

    fn allocate_handle(&self) -> InputComponentHandle {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl DriverHost for LoggingHost {
    fn tracked_device_added(&self, serial_number: &str, class: DeviceClass) -> bool {
        tracing::info!("Device added: {} ({:?})", serial_number, class);
        true
    }

    fn tracked_device_pose_updated(&self, index: TrackedDeviceIndex, pose: &DriverPose, version: u32) {
        self.pose_updates.fetch_add(1, Ordering::Relaxed);
        let q = pose.rotation;
        tracing::debug!(
            "Pose for device {} (v{}): rotation=({:.3}, {:.3}, {:.3}, {:.3})",
            index,
            version,
            q.x,
            q.y,
            q.z,
            q.w
        );
    }
}

impl PropertyStore for LoggingHost {
    fn tracked_device_to_property_container(
        &self,
        index: TrackedDeviceIndex,
    ) -> PropertyContainerHandle {
        u64::from(index)
    }

    fn set_string_property(
        &self,
        container: PropertyContainerHandle,
        property: DeviceProperty,
        value: &str,
    ) {
        tracing::info!("Property {:?} = {:?} (container {})", property, value, container);
    }

    fn set_int32_property(
        &self,
        container: PropertyContainerHandle,
        property: DeviceProperty,
        value: i32,
    ) {
        tracing::info!("Property {:?} = {} (container {})", property, value, container);
    }
}

impl DriverInput for LoggingHost {
    fn create_boolean_component(
        &self,
        _container: PropertyContainerHandle,
        name: &str,
    ) -> InputComponentHandle {
        let handle = self.allocate_handle();
        tracing::info!("Boolean component {} -> handle {}", name, handle);
        handle
    }

    fn create_scalar_component(
        &self,
        _container: PropertyContainerHandle,
        name: &str,
        scalar_type: ScalarType,
        units: ScalarUnits,
    ) -> InputComponentHandle {
        let handle = self.allocate_handle();
        tracing::info!(
            "Scalar component {} ({:?}, {:?}) -> handle {}",
            name,
            scalar_type,
            units,
            handle
        );
        handle
    }

    fn create_haptic_component(
        &self,
        _container: PropertyContainerHandle,
        name: &str,
    ) -> InputComponentHandle {
        let handle = self.allocate_handle();
        tracing::info!("Haptic component {} -> handle {}", name, handle);
        handle
    }
}
