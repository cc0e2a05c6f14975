//! OpenMVG `sfm_data.json` project export.
//!
//! OpenMVG writes its projects with the cereal C++ serialization library. Views and
//! intrinsics are stored behind polymorphic pointers, so every one of them is wrapped in a
//! `ptr_wrapper` carrying a pointer id, and intrinsics additionally carry a polymorphic type
//! name. The ids are reproduced here the way cereal hands them out when writing a whole
//! project: a single counter starting at `0x80000001`, advanced once per wrapped object,
//! first for all views and then for all intrinsics. Extrinsics are plain values and do not
//! consume ids.

use log::{debug, info};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::export::{linked_elements, ExportError, ExportOptions};
use crate::scene::{
    normalize_path, Intrinsic, IntrinsicId, IntrinsicModel, Pose, PoseId, Scene, View, ViewId,
};

pub const SFM_DATA_VERSION: &str = "0.3";

/// First pointer id cereal assigns in an archive.
pub const POINTER_ID_START: u64 = 0x8000_0001;

/// Polymorphic id of the view entries.
pub const VIEW_POLYMORPHIC_ID: u64 = 0x4000_0000;

/// Polymorphic id of the intrinsic entries.
pub const INTRINSIC_POLYMORPHIC_ID: u64 = 0x8000_0001;

/// Top level of an OpenMVG project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfmData {
    pub sfm_data_version: String,
    pub root_path: String,
    pub views: Vec<Entry<ViewValue>>,
    pub intrinsics: Vec<Entry<IntrinsicValue>>,
    pub extrinsics: Vec<Entry<ExtrinsicValue>>,
    pub structure: Vec<serde_json::Value>,
    pub control_points: Vec<serde_json::Value>,
}

/// Map entry as written by cereal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<T> {
    pub key: usize,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtrWrapper<T> {
    pub id: u64,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewValue {
    pub polymorphic_id: u64,
    pub ptr_wrapper: PtrWrapper<ViewData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewData {
    pub local_path: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub id_view: usize,
    pub id_intrinsic: usize,
    pub id_pose: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicValue {
    pub polymorphic_id: u64,
    pub polymorphic_name: String,
    pub ptr_wrapper: PtrWrapper<IntrinsicData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicData {
    pub width: u32,
    pub height: u32,
    pub focal_length: f64,
    pub principal_point: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disto_k3: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disto_t2: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrinsicValue {
    /// Row-major rotation matrix.
    pub rotation: [[f64; 3]; 3],
    pub center: [f64; 3],
}

/// Pointer ids of one archive.
struct PointerIds {
    next: u64,
}

impl PointerIds {
    fn new() -> Self {
        PointerIds {
            next: POINTER_ID_START,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Conversion from the scene camera convention to OpenMVG's, `diag(-1, 1, -1)`.
pub fn rotation_conversion() -> Matrix3<f64> {
    Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, -1.0))
}

/// OpenMVG polymorphic type name of an intrinsic model.
pub fn polymorphic_name(model: &IntrinsicModel) -> &'static str {
    match model {
        IntrinsicModel::Pinhole => "pinhole",
        IntrinsicModel::RadialK3 { .. } => "pinhole_radial_k3",
        IntrinsicModel::BrownT2 { .. } => "pinhole_brown_t2",
    }
}

/// Converts a [`Scene`] to an OpenMVG project.
///
/// With `options.convert_rotations` set, pose rotations are pre-multiplied by
/// [`rotation_conversion`]. The pointer id counter is local to this call.
///
/// # Errors
///
/// * [`ExportError::UnlinkedView`], [`ExportError::UnknownIntrinsic`],
///   [`ExportError::UnknownPose`]: If a view is not linked to an intrinsic and a pose of
///   this scene.
/// * [`ExportError::UndefinedFocalLength`]: If an intrinsic has no focal length in pixels.
pub fn scene_to_openmvg(scene: &Scene, options: &ExportOptions) -> Result<SfmData, ExportError> {
    info!(
        "Converting scene with {} views, {} intrinsics and {} poses to OpenMVG",
        scene.views().len(),
        scene.intrinsics().len(),
        scene.poses().len()
    );

    let mut pointer_ids = PointerIds::new();

    let views = scene
        .iter_views()
        .map(|(id, view)| view_entry(scene, id, view, &mut pointer_ids))
        .collect::<Result<Vec<_>, _>>()?;
    let intrinsics = scene
        .iter_intrinsics()
        .map(|(id, intrinsic)| intrinsic_entry(id, intrinsic, &mut pointer_ids))
        .collect::<Result<Vec<_>, _>>()?;
    let extrinsics = scene
        .iter_poses()
        .map(|(id, pose)| extrinsic_entry(id, pose, options.convert_rotations))
        .collect();

    debug!(
        "Assigned {} OpenMVG pointer ids",
        pointer_ids.next - POINTER_ID_START
    );

    Ok(SfmData {
        sfm_data_version: SFM_DATA_VERSION.to_string(),
        root_path: normalize_path(scene.root_dir())
            .to_string_lossy()
            .into_owned(),
        views,
        intrinsics,
        extrinsics,
        structure: Vec::new(),
        control_points: Vec::new(),
    })
}

fn view_entry(
    scene: &Scene,
    id: ViewId,
    view: &View,
    pointer_ids: &mut PointerIds,
) -> Result<Entry<ViewValue>, ExportError> {
    let (intrinsic, pose) = linked_elements(scene, id, view)?;
    let filename = view
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Entry {
        key: id.index(),
        value: ViewValue {
            polymorphic_id: VIEW_POLYMORPHIC_ID,
            ptr_wrapper: PtrWrapper {
                id: pointer_ids.next_id(),
                data: ViewData {
                    local_path: String::new(),
                    filename,
                    width: view.width,
                    height: view.height,
                    id_view: id.index(),
                    id_intrinsic: intrinsic.index(),
                    id_pose: pose.index(),
                },
            },
        },
    })
}

fn intrinsic_entry(
    id: IntrinsicId,
    intrinsic: &Intrinsic,
    pointer_ids: &mut PointerIds,
) -> Result<Entry<IntrinsicValue>, ExportError> {
    let focal_length = intrinsic
        .focal_length_as_pixels()
        .ok_or(ExportError::UndefinedFocalLength { intrinsic: id })?;

    let (disto_k3, disto_t2) = match intrinsic.model() {
        IntrinsicModel::Pinhole => (None, None),
        IntrinsicModel::RadialK3 { dist_params } => (Some(dist_params.clone()), None),
        IntrinsicModel::BrownT2 { dist_params } => (None, Some(dist_params.clone())),
    };

    Ok(Entry {
        key: id.index(),
        value: IntrinsicValue {
            polymorphic_id: INTRINSIC_POLYMORPHIC_ID,
            polymorphic_name: polymorphic_name(intrinsic.model()).to_string(),
            ptr_wrapper: PtrWrapper {
                id: pointer_ids.next_id(),
                data: IntrinsicData {
                    width: intrinsic.width,
                    height: intrinsic.height,
                    focal_length,
                    principal_point: [intrinsic.ppx(), intrinsic.ppy()],
                    disto_k3,
                    disto_t2,
                },
            },
        },
    })
}

fn extrinsic_entry(id: PoseId, pose: &Pose, convert_rotations: bool) -> Entry<ExtrinsicValue> {
    let rotation = if convert_rotations {
        rotation_conversion() * pose.rotation
    } else {
        pose.rotation
    };

    Entry {
        key: id.index(),
        value: ExtrinsicValue {
            rotation: std::array::from_fn(|row| {
                std::array::from_fn(|col| rotation[(row, col)])
            }),
            center: [pose.center.x, pose.center.y, pose.center.z],
        },
    }
}
