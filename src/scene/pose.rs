use nalgebra::{Matrix3, Vector3};

use crate::scene::{PoseId, SceneElement};

/// Camera pose as center position and rotation matrix.
///
/// Rotations use a right-handed coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub(super) id: Option<PoseId>,
    /// Camera position in world coordinates.
    pub center: Vector3<f64>,
    /// Camera rotation matrix.
    pub rotation: Matrix3<f64>,
}

impl Pose {
    pub fn new(center: Vector3<f64>, rotation: Matrix3<f64>) -> Self {
        Pose {
            id: None,
            center,
            rotation,
        }
    }
}

impl Default for Pose {
    /// Pose at the world origin with identity rotation.
    fn default() -> Self {
        Pose::new(Vector3::zeros(), Matrix3::identity())
    }
}

impl SceneElement for Pose {
    type Id = PoseId;

    fn id(&self) -> Option<PoseId> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_defaults() {
        let pose = Pose::default();
        assert_eq!(pose.id(), None);
        assert_eq!(pose.center, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(pose.rotation, Matrix3::identity());
    }
}
