//! In-memory host that records every call

use super::{
    DeviceClass, DeviceProperty, DriverHost, DriverInput, InputComponentHandle,
    PropertyContainerHandle, PropertyStore, ScalarType, ScalarUnits, TrackedDeviceIndex,
};
use crate::pose::DriverPose;
use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// One pose delivered to the host
#[derive(Debug, Clone, PartialEq)]
pub struct PoseUpdate {
    pub index: TrackedDeviceIndex,
    pub pose: DriverPose,
    pub version: u32,
}

/// Value stored for a device property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    String(String),
    Int32(i32),
}

#[derive(Default)]
struct RecordingState {
    devices: Vec<(String, DeviceClass)>,
    poses: Vec<PoseUpdate>,
    properties: BTreeMap<(PropertyContainerHandle, DeviceProperty), PropertyValue>,
    components: Vec<(String, InputComponentHandle)>,
    next_handle: u64,
}

/// Host double that keeps every registration, property, component and pose
#[derive(Default)]
pub struct RecordingHost {
    state: Mutex<RecordingState>,
    pose_arrived: Condvar,
}

/// Container handles are derived from the device index so tests can predict them
const CONTAINER_BASE: PropertyContainerHandle = 0x1000;

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Devices announced through `tracked_device_added`
    pub fn devices(&self) -> Vec<(String, DeviceClass)> {
        self.lock().devices.clone()
    }

    /// Pose updates in delivery order
    pub fn poses(&self) -> Vec<PoseUpdate> {
        self.lock().poses.clone()
    }

    pub fn pose_count(&self) -> usize {
        self.lock().poses.len()
    }

    pub fn property(
        &self,
        container: PropertyContainerHandle,
        property: DeviceProperty,
    ) -> Option<PropertyValue> {
        self.lock().properties.get(&(container, property)).cloned()
    }

    /// Component names in creation order
    pub fn component_names(&self) -> Vec<String> {
        self.lock()
            .components
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Block until at least `count` poses arrived or `timeout` elapsed.
    ///
    /// Returns whether the count was reached.
    pub fn wait_for_poses(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.poses.len() < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = match self.pose_arrived.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
        true
    }

    fn next_handle(&self) -> InputComponentHandle {
        let mut state = self.lock();
        state.next_handle += 1;
        state.next_handle
    }

    fn add_component(&self, name: &str) -> InputComponentHandle {
        let handle = self.next_handle();
        self.lock().components.push((name.to_string(), handle));
        handle
    }
}

impl DriverHost for RecordingHost {
    fn tracked_device_added(&self, serial_number: &str, class: DeviceClass) -> bool {
        self.lock().devices.push((serial_number.to_string(), class));
        true
    }

    fn tracked_device_pose_updated(&self, index: TrackedDeviceIndex, pose: &DriverPose, version: u32) {
        self.lock().poses.push(PoseUpdate {
            index,
            pose: *pose,
            version,
        });
        self.pose_arrived.notify_all();
    }
}

impl PropertyStore for RecordingHost {
    fn tracked_device_to_property_container(
        &self,
        index: TrackedDeviceIndex,
    ) -> PropertyContainerHandle {
        CONTAINER_BASE + u64::from(index)
    }

    fn set_string_property(
        &self,
        container: PropertyContainerHandle,
        property: DeviceProperty,
        value: &str,
    ) {
        self.lock()
            .properties
            .insert((container, property), PropertyValue::String(value.to_string()));
    }

    fn set_int32_property(
        &self,
        container: PropertyContainerHandle,
        property: DeviceProperty,
        value: i32,
    ) {
        self.lock()
            .properties
            .insert((container, property), PropertyValue::Int32(value));
    }
}

impl DriverInput for RecordingHost {
    fn create_boolean_component(
        &self,
        _container: PropertyContainerHandle,
        name: &str,
    ) -> InputComponentHandle {
        self.add_component(name)
    }

    fn create_scalar_component(
        &self,
        _container: PropertyContainerHandle,
        name: &str,
        _scalar_type: ScalarType,
        _units: ScalarUnits,
    ) -> InputComponentHandle {
        self.add_component(name)
    }

    fn create_haptic_component(
        &self,
        _container: PropertyContainerHandle,
        name: &str,
    ) -> InputComponentHandle {
        self.add_component(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_records_poses_in_order() {
        let host = RecordingHost::new();
        for i in 0..3 {
            let mut pose = DriverPose::default_pose();
            pose.rotation.x = f64::from(i);
            host.tracked_device_pose_updated(7, &pose, DriverPose::VERSION);
        }

        let xs: Vec<f64> = host.poses().iter().map(|u| u.pose.rotation.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        assert!(host.poses().iter().all(|u| u.index == 7));
    }

    #[test]
    fn test_wait_for_poses_across_threads() {
        let host = Arc::new(RecordingHost::new());
        let producer = Arc::clone(&host);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.tracked_device_pose_updated(0, &DriverPose::default_pose(), 1);
        });

        assert!(host.wait_for_poses(1, Duration::from_secs(2)));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_for_poses_times_out() {
        let host = RecordingHost::new();
        assert!(!host.wait_for_poses(1, Duration::from_millis(10)));
    }

    #[test]
    fn test_component_handles_are_distinct() {
        let host = RecordingHost::new();
        let a = host.create_boolean_component(1, "/input/a/click");
        let b = host.create_haptic_component(1, "/output/haptic");
        assert_ne!(a, b);
        assert_eq!(host.component_names(), vec!["/input/a/click", "/output/haptic"]);
    }
}
