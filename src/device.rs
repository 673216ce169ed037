//! Controller device: registration, activation metadata and the pose stream
//!
//! A [`ControllerDevice`] is what the runtime sees as one tracked controller.
//! Construction reads its identity from settings and announces it; activation
//! publishes its properties and input components and starts the
//! [`PosePublisher`] that feeds it rotations from the local TCP source.

use crate::config::DriverConfig;
use crate::error::{Error, Result};
use crate::host::{
    ControllerRole, DeviceClass, DeviceProperty, DriverHost, DriverInput,
    INVALID_DEVICE_INDEX, INVALID_INPUT_COMPONENT, InputComponentHandle, PropertyStore,
    ScalarType, ScalarUnits, TrackedDeviceIndex,
};
use crate::pose::DriverPose;
use crate::publisher::{PosePublisher, PublisherConfig, PublisherState, StatsSnapshot};
use crate::settings::{MODEL_NUMBER_KEY, SERIAL_NUMBER_KEY, SettingsSource};
use crate::transport::{TcpSession, Transport};
use std::sync::Arc;

/// Handles of the components created on activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputComponents {
    pub a_touch: InputComponentHandle,
    pub a_click: InputComponentHandle,
    pub trigger_value: InputComponentHandle,
    pub trigger_click: InputComponentHandle,
    pub haptic: InputComponentHandle,
}

impl Default for InputComponents {
    fn default() -> Self {
        Self {
            a_touch: INVALID_INPUT_COMPONENT,
            a_click: INVALID_INPUT_COMPONENT,
            trigger_value: INVALID_INPUT_COMPONENT,
            trigger_click: INVALID_INPUT_COMPONENT,
            haptic: INVALID_INPUT_COMPONENT,
        }
    }
}

pub struct ControllerDevice {
    role: ControllerRole,
    model_number: String,
    serial_number: String,
    object_id: TrackedDeviceIndex,
    host: Arc<dyn DriverHost>,
    config: DriverConfig,
    components: InputComponents,
    publisher: PosePublisher,
}

impl ControllerDevice {
    /// Read model and serial number from `settings` and announce the device.
    ///
    /// The serial number comes from the section configured for the role:
    /// `device.left_hand_section` for [`ControllerRole::LeftHand`],
    /// `device.right_hand_section` for every other role.
    pub fn new(
        role: ControllerRole,
        settings: &dyn SettingsSource,
        host: Arc<dyn DriverHost>,
        config: DriverConfig,
    ) -> Self {
        let device = &config.device;
        let model_number = settings.get_string_or_empty(&device.main_section, MODEL_NUMBER_KEY);
        let serial_section = match role {
            ControllerRole::LeftHand => &device.left_hand_section,
            _ => &device.right_hand_section,
        };
        let serial_number = settings.get_string_or_empty(serial_section, SERIAL_NUMBER_KEY);

        tracing::info!("Controller model number: {}", model_number);
        tracing::info!("Controller serial number: {}", serial_number);

        if !host.tracked_device_added(&device.registration_name, DeviceClass::Controller) {
            tracing::warn!(
                "Host rejected device registration: {}",
                device.registration_name
            );
        }

        let publisher = PosePublisher::new(PublisherConfig::from_connection(&config.connection));

        Self {
            role,
            model_number,
            serial_number,
            object_id: INVALID_DEVICE_INDEX,
            host,
            config,
            components: InputComponents::default(),
            publisher,
        }
    }

    /// Publish properties and components, then start streaming poses from
    /// the configured TCP endpoint.
    ///
    /// Connection failures surface in the log, not here: the transport is
    /// opened by the publisher thread.
    pub fn activate(
        &mut self,
        object_id: TrackedDeviceIndex,
        props: &dyn PropertyStore,
        input: &dyn DriverInput,
    ) -> Result<()> {
        let transport = TcpSession::from_config(&self.config.connection);
        self.activate_with_transport(object_id, props, input, transport)
    }

    /// [`activate`](Self::activate) with a caller-supplied transport
    pub fn activate_with_transport<T>(
        &mut self,
        object_id: TrackedDeviceIndex,
        props: &dyn PropertyStore,
        input: &dyn DriverInput,
        transport: T,
    ) -> Result<()>
    where
        T: Transport + 'static,
    {
        match self.publisher.state() {
            PublisherState::Running | PublisherState::Stopping => {
                return Err(Error::AlreadyStarted);
            }
            // Publishers are single-use; a device may come back after deactivate
            PublisherState::Stopped => {
                self.publisher =
                    PosePublisher::new(PublisherConfig::from_connection(&self.config.connection));
            }
            PublisherState::Idle => {}
        }

        self.object_id = object_id;
        let container = props.tracked_device_to_property_container(object_id);

        props.set_string_property(container, DeviceProperty::ModelNumber, &self.model_number);
        props.set_int32_property(container, DeviceProperty::ControllerRoleHint, self.role as i32);
        props.set_string_property(
            container,
            DeviceProperty::InputProfilePath,
            &self.config.device.input_profile_path,
        );

        self.components = InputComponents {
            a_touch: input.create_boolean_component(container, "/input/a/touch"),
            a_click: input.create_boolean_component(container, "/input/a/click"),
            trigger_value: input.create_scalar_component(
                container,
                "/input/trigger/value",
                ScalarType::Absolute,
                ScalarUnits::NormalizedOneSided,
            ),
            trigger_click: input.create_boolean_component(container, "/input/trigger/click"),
            haptic: input.create_haptic_component(container, "/output/haptic"),
        };

        tracing::info!(
            "Activating controller {} as device {}",
            self.serial_number,
            object_id
        );
        self.publisher
            .start(transport, Arc::clone(&self.host), object_id)
    }

    /// Stop the pose stream and forget the device index. Safe to call more
    /// than once.
    pub fn deactivate(&mut self) -> Result<()> {
        let stopped = self.publisher.stop();
        if self.object_id != INVALID_DEVICE_INDEX {
            tracing::info!("Deactivated controller {}", self.serial_number);
        }
        self.object_id = INVALID_DEVICE_INDEX;
        stopped
    }

    /// Pose template reported when the runtime polls the device
    pub fn pose(&self) -> DriverPose {
        DriverPose::default_pose()
    }

    pub fn role(&self) -> ControllerRole {
        self.role
    }

    pub fn model_number(&self) -> &str {
        &self.model_number
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn object_id(&self) -> TrackedDeviceIndex {
        self.object_id
    }

    pub fn components(&self) -> InputComponents {
        self.components
    }

    pub fn publisher_state(&self) -> PublisherState {
        self.publisher.state()
    }

    pub fn publisher_stats(&self) -> StatsSnapshot {
        self.publisher.stats()
    }
}

impl Drop for ControllerDevice {
    fn drop(&mut self) {
        if let Err(e) = self.deactivate() {
            tracing::error!("Controller shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{PropertyValue, RecordingHost};
    use crate::settings::StaticSettings;
    use crate::transport::{MockTransport, OpenFailure};
    use std::thread;
    use std::time::{Duration, Instant};

    fn settings() -> StaticSettings {
        StaticSettings::new()
            .with("driver_simplecontroller", MODEL_NUMBER_KEY, "MyController-1")
            .with(
                "driver_simplecontroller_left_controller",
                SERIAL_NUMBER_KEY,
                "SN-LEFT-SECTION",
            )
            .with(
                "driver_simplecontroller_right_controller",
                SERIAL_NUMBER_KEY,
                "SN-RIGHT-SECTION",
            )
    }

    fn fast_config() -> DriverConfig {
        let mut config = DriverConfig::default();
        config.connection.poll_interval_ms = 1;
        config
    }

    fn device(role: ControllerRole, host: &Arc<RecordingHost>) -> ControllerDevice {
        ControllerDevice::new(role, &settings(), host.clone(), fast_config())
    }

    #[test]
    fn test_new_registers_controller() {
        let host = Arc::new(RecordingHost::new());
        let device = device(ControllerRole::RightHand, &host);

        assert_eq!(
            host.devices(),
            vec![("simplecontroller_right".to_string(), DeviceClass::Controller)]
        );
        assert_eq!(device.model_number(), "MyController-1");
        assert_eq!(device.object_id(), INVALID_DEVICE_INDEX);
        assert_eq!(device.publisher_state(), PublisherState::Idle);
    }

    #[test]
    fn test_serial_section_follows_role() {
        let host = Arc::new(RecordingHost::new());
        let left = device(ControllerRole::LeftHand, &host);
        let right = device(ControllerRole::RightHand, &host);
        let other = device(ControllerRole::Treadmill, &host);

        assert_eq!(left.serial_number(), "SN-RIGHT-SECTION");
        assert_eq!(right.serial_number(), "SN-LEFT-SECTION");
        assert_eq!(other.serial_number(), "SN-LEFT-SECTION");
    }

    #[test]
    fn test_missing_settings_read_as_empty() {
        let host = Arc::new(RecordingHost::new());
        let device = ControllerDevice::new(
            ControllerRole::LeftHand,
            &StaticSettings::new(),
            host.clone(),
            fast_config(),
        );
        assert_eq!(device.model_number(), "");
        assert_eq!(device.serial_number(), "");
    }

    #[test]
    fn test_activate_sets_properties_and_components() {
        let host = Arc::new(RecordingHost::new());
        let mut device = device(ControllerRole::LeftHand, &host);

        device
            .activate_with_transport(3, host.as_ref(), host.as_ref(), MockTransport::new())
            .unwrap();
        let container = host.tracked_device_to_property_container(3);

        assert_eq!(device.object_id(), 3);
        assert_eq!(
            host.property(container, DeviceProperty::ModelNumber),
            Some(PropertyValue::String("MyController-1".to_string()))
        );
        assert_eq!(
            host.property(container, DeviceProperty::ControllerRoleHint),
            Some(PropertyValue::Int32(1))
        );
        assert_eq!(
            host.property(container, DeviceProperty::InputProfilePath),
            Some(PropertyValue::String(
                "{simplecontroller}/input/mycontroller_profile.json".to_string()
            ))
        );
        assert_eq!(
            host.component_names(),
            vec![
                "/input/a/touch",
                "/input/a/click",
                "/input/trigger/value",
                "/input/trigger/click",
                "/output/haptic",
            ]
        );

        let components = device.components();
        assert_ne!(components.a_touch, INVALID_INPUT_COMPONENT);
        assert_ne!(components.haptic, INVALID_INPUT_COMPONENT);

        device.deactivate().unwrap();
    }

    #[test]
    fn test_activated_device_streams_poses() {
        let host = Arc::new(RecordingHost::new());
        let mut device = device(ControllerRole::RightHand, &host);
        let mock = MockTransport::new();
        mock.push_chunk(b"0,0,0\n10,20,30");

        device
            .activate_with_transport(5, host.as_ref(), host.as_ref(), mock.clone())
            .unwrap();
        assert!(host.wait_for_poses(1, Duration::from_secs(2)));
        device.deactivate().unwrap();

        let update = &host.poses()[0];
        assert_eq!(update.index, 5);
        assert_eq!(update.pose.rotation.to_xyzw(), [10.0, 20.0, 30.0, 1.0]);
        assert_eq!(device.object_id(), INVALID_DEVICE_INDEX);
        assert_eq!(device.publisher_state(), PublisherState::Stopped);
        assert!(!mock.is_open());
    }

    #[test]
    fn test_activate_succeeds_when_connection_fails() {
        let host = Arc::new(RecordingHost::new());
        let mut device = device(ControllerRole::RightHand, &host);
        let mock = MockTransport::new();
        mock.fail_open(OpenFailure::Connect);

        device
            .activate_with_transport(0, host.as_ref(), host.as_ref(), mock.clone())
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while device.publisher_state() != PublisherState::Stopped && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(device.publisher_state(), PublisherState::Stopped);
        assert_eq!(mock.receive_count(), 0);

        device.deactivate().unwrap();
        assert_eq!(host.pose_count(), 0);
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let host = Arc::new(RecordingHost::new());
        let mut device = device(ControllerRole::RightHand, &host);
        let mock = MockTransport::new();

        device
            .activate_with_transport(1, host.as_ref(), host.as_ref(), mock.clone())
            .unwrap();
        device.deactivate().unwrap();
        device.deactivate().unwrap();

        assert_eq!(mock.close_count(), 1);
        assert_eq!(device.object_id(), INVALID_DEVICE_INDEX);
    }

    #[test]
    fn test_second_activate_leaves_device_untouched() {
        let host = Arc::new(RecordingHost::new());
        let mut device = device(ControllerRole::RightHand, &host);
        let mock = MockTransport::new();

        device
            .activate_with_transport(1, host.as_ref(), host.as_ref(), mock.clone())
            .unwrap();
        let components = device.components();
        let container = host.tracked_device_to_property_container(2);

        let result =
            device.activate_with_transport(2, host.as_ref(), host.as_ref(), MockTransport::new());
        assert!(matches!(result, Err(Error::AlreadyStarted)));
        assert_eq!(device.object_id(), 1);
        assert_eq!(device.components(), components);
        assert_eq!(host.component_names().len(), 5);
        assert_eq!(host.property(container, DeviceProperty::ModelNumber), None);
        assert_eq!(device.publisher_state(), PublisherState::Running);

        mock.push_chunk(b"0,0,0\n1,2,3");
        assert!(host.wait_for_poses(1, Duration::from_secs(2)));
        device.deactivate().unwrap();
        assert!(host.poses().iter().all(|u| u.index == 1));
    }

    #[test]
    fn test_deactivate_without_activate() {
        let host = Arc::new(RecordingHost::new());
        let mut device = device(ControllerRole::RightHand, &host);
        device.deactivate().unwrap();
        assert_eq!(device.publisher_state(), PublisherState::Idle);
    }

    #[test]
    fn test_reactivate_after_deactivate() {
        let host = Arc::new(RecordingHost::new());
        let mut device = device(ControllerRole::RightHand, &host);

        device
            .activate_with_transport(1, host.as_ref(), host.as_ref(), MockTransport::new())
            .unwrap();
        device.deactivate().unwrap();

        let mock = MockTransport::new();
        mock.push_chunk(b"0,0,0\n4,5,6");
        device
            .activate_with_transport(2, host.as_ref(), host.as_ref(), mock)
            .unwrap();
        assert!(host.wait_for_poses(1, Duration::from_secs(2)));
        device.deactivate().unwrap();

        assert_eq!(host.poses()[0].index, 2);
    }

    #[test]
    fn test_pose_template() {
        let host = Arc::new(RecordingHost::new());
        let device = device(ControllerRole::RightHand, &host);
        assert_eq!(device.pose(), DriverPose::default_pose());
    }
}
