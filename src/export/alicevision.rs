//! AliceVision (Meshroom) `.sfm` project export.
//!
//! Every number in this format is written as a string. Rotations are flattened in
//! column-major order.

use log::info;
use serde::{Deserialize, Serialize};

use crate::export::json::format_float;
use crate::export::{linked_elements, ExportError};
use crate::scene::{
    normalize_path, Intrinsic, IntrinsicId, IntrinsicModel, Pose, PoseId, Scene, View, ViewId,
};

pub const VERSION: [&str; 3] = ["1", "0", "0"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfmData {
    pub version: Vec<String>,
    pub views: Vec<ViewEntry>,
    pub intrinsics: Vec<IntrinsicEntry>,
    pub poses: Vec<PoseEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEntry {
    #[serde(rename = "viewID")]
    pub view_id: String,
    #[serde(rename = "poseID")]
    pub pose_id: String,
    #[serde(rename = "intrinsicID")]
    pub intrinsic_id: String,
    pub path: String,
    pub width: String,
    pub height: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrinsicEntry {
    #[serde(rename = "intrinsicID")]
    pub intrinsic_id: String,
    pub width: String,
    pub height: String,
    /// Same value as `intrinsic_id`.
    pub serial_number: String,
    #[serde(rename = "type")]
    pub model: String,
    pub initialization_mode: String,
    pub px_initial_focal_length: String,
    pub px_focal_length: String,
    pub principal_point: [String; 2],
    pub locked: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distortion_params: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseEntry {
    pub pose_id: String,
    pub pose: PoseState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseState {
    pub transform: Transform,
    pub locked: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Column-major rotation matrix.
    pub rotation: Vec<String>,
    pub center: Vec<String>,
}

/// AliceVision type name of an intrinsic model.
pub fn intrinsic_type_name(model: &IntrinsicModel) -> &'static str {
    match model {
        IntrinsicModel::Pinhole => "pinhole",
        IntrinsicModel::RadialK3 { .. } => "radial3",
        IntrinsicModel::BrownT2 { .. } => "brownt2",
    }
}

/// Converts a [`Scene`] to an AliceVision project.
///
/// # Errors
///
/// Same as [`scene_to_openmvg`](crate::export::openmvg::scene_to_openmvg): unlinked views and
/// intrinsics without a focal length in pixels.
pub fn scene_to_alicevision(scene: &Scene) -> Result<SfmData, ExportError> {
    info!(
        "Converting scene with {} views, {} intrinsics and {} poses to AliceVision",
        scene.views().len(),
        scene.intrinsics().len(),
        scene.poses().len()
    );

    let views = scene
        .iter_views()
        .map(|(id, view)| view_entry(scene, id, view))
        .collect::<Result<Vec<_>, _>>()?;
    let intrinsics = scene
        .iter_intrinsics()
        .map(|(id, intrinsic)| intrinsic_entry(id, intrinsic))
        .collect::<Result<Vec<_>, _>>()?;
    let poses = scene
        .iter_poses()
        .map(|(id, pose)| pose_entry(id, pose))
        .collect();

    Ok(SfmData {
        version: VERSION.iter().map(|v| v.to_string()).collect(),
        views,
        intrinsics,
        poses,
    })
}

fn view_entry(scene: &Scene, id: ViewId, view: &View) -> Result<ViewEntry, ExportError> {
    let (intrinsic, pose) = linked_elements(scene, id, view)?;
    Ok(ViewEntry {
        view_id: id.to_string(),
        pose_id: pose.to_string(),
        intrinsic_id: intrinsic.to_string(),
        path: normalize_path(&view.path).to_string_lossy().into_owned(),
        width: view.width.to_string(),
        height: view.height.to_string(),
    })
}

fn intrinsic_entry(
    id: IntrinsicId,
    intrinsic: &Intrinsic,
) -> Result<IntrinsicEntry, ExportError> {
    let focal_length = intrinsic
        .focal_length_as_pixels()
        .map(format_float)
        .ok_or(ExportError::UndefinedFocalLength { intrinsic: id })?;

    Ok(IntrinsicEntry {
        intrinsic_id: id.to_string(),
        width: intrinsic.width.to_string(),
        height: intrinsic.height.to_string(),
        serial_number: id.to_string(),
        model: intrinsic_type_name(intrinsic.model()).to_string(),
        initialization_mode: "estimated".to_string(),
        px_initial_focal_length: focal_length.clone(),
        px_focal_length: focal_length,
        principal_point: [format_float(intrinsic.ppx()), format_float(intrinsic.ppy())],
        locked: "0".to_string(),
        distortion_params: intrinsic
            .model()
            .dist_params()
            .map(|params| params.iter().copied().map(format_float).collect()),
    })
}

fn pose_entry(id: PoseId, pose: &Pose) -> PoseEntry {
    PoseEntry {
        pose_id: id.to_string(),
        pose: PoseState {
            transform: Transform {
                // nalgebra stores matrices column-major
                rotation: pose.rotation.iter().copied().map(format_float).collect(),
                center: pose.center.iter().copied().map(format_float).collect(),
            },
            locked: "0".to_string(),
        },
    }
}
