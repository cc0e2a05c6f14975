use std::path::PathBuf;

use crate::scene::{normalize_path, IntrinsicId, PoseId, SceneElement, ViewId};

/// Observation of the scene (an image file) and its related parameters.
///
/// A view references exactly one intrinsic and one pose of the same scene through their
/// identifiers. The references are usually assigned after the intrinsic and pose have been
/// added, see [`Scene::view_mut`](crate::scene::Scene::view_mut).
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub(super) id: Option<ViewId>,
    /// Path to the image file, normalized by [`View::new`].
    pub path: PathBuf,
    /// Image width, in pixels.
    pub width: u32,
    /// Image height, in pixels.
    pub height: u32,
    pub camera_make: String,
    pub camera_model: String,
    pub intrinsic: Option<IntrinsicId>,
    pub pose: Option<PoseId>,
}

impl View {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        View {
            id: None,
            path: normalize_path(&path.into()),
            width,
            height,
            camera_make: String::new(),
            camera_model: String::new(),
            intrinsic: None,
            pose: None,
        }
    }

    /// Sets the camera make and model strings, as found in the image metadata.
    pub fn with_camera(mut self, make: impl Into<String>, model: impl Into<String>) -> Self {
        self.camera_make = make.into();
        self.camera_model = model.into();
        self
    }

    pub fn with_intrinsic(mut self, intrinsic: IntrinsicId) -> Self {
        self.intrinsic = Some(intrinsic);
        self
    }

    pub fn with_pose(mut self, pose: PoseId) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Camera make and model as a single string, the key format of the sensor width
    /// database.
    pub fn camera_make_model(&self) -> String {
        format!("{} {}", self.camera_make, self.camera_model)
    }
}

impl SceneElement for View {
    type Id = ViewId;

    fn id(&self) -> Option<ViewId> {
        self.id
    }
}
