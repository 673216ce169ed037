//! Pose types exchanged with the tracking host.

/// Rotation triple decoded from one record.
///
/// Values are passed through as received: no range check, no normalization,
/// non-finite values included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationSample {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Quaternion in the host's layout (double precision).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Components in (x, y, z, w) order
    pub fn to_xyzw(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

/// Tracking quality reported with each pose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingResult {
    Uninitialized = 1,
    CalibratingInProgress = 100,
    CalibratingOutOfRange = 101,
    RunningOk = 200,
    RunningOutOfRange = 201,
    FallbackRotationOnly = 300,
}

/// Pose record consumed by the host registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverPose {
    pub rotation: Quaternion,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub angular_velocity: [f64; 3],
    pub world_from_driver_rotation: Quaternion,
    pub world_from_driver_translation: [f64; 3],
    pub driver_from_head_rotation: Quaternion,
    pub driver_from_head_translation: [f64; 3],
    pub pose_time_offset: f64,
    pub result: TrackingResult,
    pub pose_is_valid: bool,
    pub device_is_connected: bool,
}

impl DriverPose {
    /// Layout version tag sent alongside every pose update
    pub const VERSION: u32 = 1;

    /// Pose template handed out by the device: identity, valid, connected.
    pub fn default_pose() -> Self {
        Self {
            rotation: Quaternion::IDENTITY,
            position: [0.0; 3],
            velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
            world_from_driver_rotation: Quaternion::IDENTITY,
            world_from_driver_translation: [0.0; 3],
            driver_from_head_rotation: Quaternion::IDENTITY,
            driver_from_head_translation: [0.0; 3],
            pose_time_offset: 0.0,
            result: TrackingResult::RunningOk,
            pose_is_valid: true,
            device_is_connected: true,
        }
    }

    /// Build the published pose from a received rotation sample.
    ///
    /// The sample becomes the vector part and the scalar part is fixed at
    /// 1.0. The result is not a unit quaternion in general; downstream
    /// consumers that need one must normalize it themselves. Position is
    /// always the origin.
    pub fn from_rotation_sample(sample: RotationSample) -> Self {
        let mut pose = Self::default_pose();
        pose.rotation = Quaternion {
            w: 1.0,
            x: f64::from(sample.x),
            y: f64::from(sample.y),
            z: f64::from(sample.z),
        };
        pose.position = [0.0; 3];
        pose
    }
}

impl Default for DriverPose {
    fn default() -> Self {
        Self::default_pose()
    }
}
