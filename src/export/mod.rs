//! The `export` module writes a [`Scene`] as a project file of an external SfM/MVS tool.
//!
//! Two formats are supported, see [`ExportFormat`]:
//!
//! * [`openmvg`]: OpenMVG `sfm_data.json`, numbers as JSON numbers and cereal pointer ids.
//! * [`alicevision`]: AliceVision/Meshroom `.sfm`, every number as a string.
//!
//! Each export first converts the whole scene to the format's in-memory structure and only
//! then writes it out, so a failing export never leaves a partial file behind.
//!
//! # Examples
//!
//! ```rust
//! use sfm_utils::export::{export_to_string, ExportFormat, ExportOptions};
//! use sfm_utils::scene::{Intrinsic, Pose, Scene, View};
//!
//! let mut scene = Scene::new(".");
//! let intrinsic = scene.add_intrinsic(
//!     Intrinsic::pinhole(100, 100)
//!         .with_focal_length(10.0)
//!         .with_sensor_width(10.0),
//! );
//! let pose = scene.add_pose(Pose::default());
//! scene.add_view(
//!     View::new("view.jpg", 100, 100)
//!         .with_intrinsic(intrinsic)
//!         .with_pose(pose),
//! );
//!
//! let text = export_to_string(&scene, ExportFormat::AliceVision, &ExportOptions::default())
//!     .unwrap();
//! assert!(text.contains("\"pxFocalLength\": \"100.0\""));
//! ```

pub mod alicevision;
pub mod json;
pub mod openmvg;

pub use alicevision::scene_to_alicevision;
pub use openmvg::scene_to_openmvg;

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::scene::{IntrinsicId, PoseId, Scene, View, ViewId};

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("Unknown scene format: {0}")]
    UnknownFormat(String),
    #[error("View {view} has no {missing} assigned")]
    UnlinkedView { view: ViewId, missing: &'static str },
    #[error("View {view} references intrinsic {intrinsic}, which is not in the scene")]
    UnknownIntrinsic { view: ViewId, intrinsic: IntrinsicId },
    #[error("View {view} references pose {pose}, which is not in the scene")]
    UnknownPose { view: ViewId, pose: PoseId },
    #[error("Intrinsic {intrinsic} has no focal length in pixels")]
    UndefinedFocalLength { intrinsic: IntrinsicId },
    #[error("Failed to serialize JSON: {0}")]
    Json(String),
    #[error("Failed to load YAML: {0}")]
    Yaml(String),
    #[error("IO Error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for ExportError {
    fn from(err: serde_yaml::Error) -> Self {
        ExportError::Yaml(err.to_string())
    }
}

/// Project file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    OpenMvg,
    AliceVision,
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openmvg" | "open_mvg" => Ok(ExportFormat::OpenMvg),
            "alicevision" | "alice_vision" => Ok(ExportFormat::AliceVision),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::OpenMvg => write!(f, "openmvg"),
            ExportFormat::AliceVision => write!(f, "alicevision"),
        }
    }
}

/// Export settings.
///
/// Can be loaded from a YAML file; missing keys take their default value.
///
/// ```yaml
/// convert_rotations: false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Convert pose rotations to OpenMVG's camera convention. Only used by the OpenMVG
    /// exporter.
    pub convert_rotations: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            convert_rotations: true,
        }
    }
}

impl ExportOptions {
    /// Loads export options from a YAML file.
    pub fn load_from_yaml(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ExportError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}

/// Resolves the intrinsic and pose a view is linked to.
pub(crate) fn linked_elements(
    scene: &Scene,
    id: ViewId,
    view: &View,
) -> Result<(IntrinsicId, PoseId), ExportError> {
    let intrinsic = view.intrinsic.ok_or(ExportError::UnlinkedView {
        view: id,
        missing: "intrinsic",
    })?;
    let pose = view.pose.ok_or(ExportError::UnlinkedView {
        view: id,
        missing: "pose",
    })?;

    if scene.intrinsic(intrinsic).is_none() {
        return Err(ExportError::UnknownIntrinsic {
            view: id,
            intrinsic,
        });
    }
    if scene.pose(pose).is_none() {
        return Err(ExportError::UnknownPose { view: id, pose });
    }
    Ok((intrinsic, pose))
}

/// Writes the scene in `format` to `writer`.
///
/// The scene is fully converted before the first byte is written.
pub fn export_to_writer<W: Write>(
    writer: W,
    scene: &Scene,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::OpenMvg => {
            let data = scene_to_openmvg(scene, options)?;
            json::to_json_writer(writer, &data)?;
        }
        ExportFormat::AliceVision => {
            let data = scene_to_alicevision(scene)?;
            json::to_json_writer(writer, &data)?;
        }
    }
    Ok(())
}

/// Returns the project file contents of the scene in `format`.
pub fn export_to_string(
    scene: &Scene,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<String, ExportError> {
    let text = match format {
        ExportFormat::OpenMvg => json::to_json_string(&scene_to_openmvg(scene, options)?)?,
        ExportFormat::AliceVision => json::to_json_string(&scene_to_alicevision(scene)?)?,
    };
    Ok(text)
}

/// Exports the scene to a project file at `path`.
///
/// # Errors
///
/// Conversion errors are returned before `path` is created or touched. An
/// [`ExportError::Io`] is returned if the file cannot be written.
pub fn export_scene(
    path: impl AsRef<Path>,
    scene: &Scene,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    let text = export_to_string(scene, format, options)?;
    fs::write(path, text)?;
    info!("Wrote {} project to {}", format, path.display());
    Ok(())
}

/// Exports the scene to a project file at `path`, with the format given by name
/// (`"openmvg"` or `"alicevision"`, case insensitive).
///
/// # Errors
///
/// * [`ExportError::UnknownFormat`]: If `format` names no supported format. Nothing is
///   written.
pub fn export_scene_named(
    path: impl AsRef<Path>,
    scene: &Scene,
    format: &str,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    let format = format.parse::<ExportFormat>()?;
    export_scene(path, scene, format, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Intrinsic, Pose};
    use tempfile::tempdir;

    const OPENMVG_EXPECTED: &str = r#"{
    "sfm_data_version": "0.3",
    "root_path": ".",
    "views": [
        {
            "key": 0,
            "value": {
                "polymorphic_id": 1073741824,
                "ptr_wrapper": {
                    "id": 2147483649,
                    "data": {
                        "local_path": "",
                        "filename": "view.jpg",
                        "width": 100,
                        "height": 100,
                        "id_view": 0,
                        "id_intrinsic": 0,
                        "id_pose": 0
                    }
                }
            }
        }
    ],
    "intrinsics": [
        {
            "key": 0,
            "value": {
                "polymorphic_id": 2147483649,
                "polymorphic_name": "pinhole",
                "ptr_wrapper": {
                    "id": 2147483650,
                    "data": {
                        "width": 100,
                        "height": 100,
                        "focal_length": 100.0,
                        "principal_point": [
                            50.0,
                            50.0
                        ]
                    }
                }
            }
        }
    ],
    "extrinsics": [
        {
            "key": 0,
            "value": {
                "rotation": [
                    [
                        -1.0,
                        0.0,
                        0.0
                    ],
                    [
                        0.0,
                        1.0,
                        0.0
                    ],
                    [
                        0.0,
                        0.0,
                        -1.0
                    ]
                ],
                "center": [
                    0.0,
                    0.0,
                    0.0
                ]
            }
        }
    ],
    "structure": [],
    "control_points": []
}"#;

    const ALICEVISION_EXPECTED: &str = r#"{
    "version": [
        "1",
        "0",
        "0"
    ],
    "views": [
        {
            "viewID": "0",
            "poseID": "0",
            "intrinsicID": "0",
            "path": "view.jpg",
            "width": "100",
            "height": "100"
        }
    ],
    "intrinsics": [
        {
            "intrinsicID": "0",
            "width": "100",
            "height": "100",
            "serialNumber": "0",
            "type": "pinhole",
            "initializationMode": "estimated",
            "pxInitialFocalLength": "100.0",
            "pxFocalLength": "100.0",
            "principalPoint": [
                "50.0",
                "50.0"
            ],
            "locked": "0"
        }
    ],
    "poses": [
        {
            "poseId": "0",
            "pose": {
                "transform": {
                    "rotation": [
                        "1.0",
                        "0.0",
                        "0.0",
                        "0.0",
                        "1.0",
                        "0.0",
                        "0.0",
                        "0.0",
                        "1.0"
                    ],
                    "center": [
                        "0.0",
                        "0.0",
                        "0.0"
                    ]
                },
                "locked": "0"
            }
        }
    ]
}"#;

    /// Single view scene, linked the way a scan importer does it: the view is added first and
    /// linked once its intrinsic and pose are in the scene.
    fn test_scene() -> Scene {
        let mut scene = Scene::new(".");
        let view_id =
            scene.add_view(View::new("view.jpg", 100, 100).with_camera("Canon", "Test Camera"));

        let intrinsic = Intrinsic::pinhole(100, 100)
            .with_focal_length(10.0)
            .with_sensor_width(10.0);
        let intrinsic_id = scene.add_intrinsic(intrinsic);
        let pose_id = scene.add_pose(Pose::default());

        let view = scene.view_mut(view_id).unwrap();
        view.intrinsic = Some(intrinsic_id);
        view.pose = Some(pose_id);
        scene
    }

    #[test]
    fn test_export_openmvg_text() {
        let text =
            export_to_string(&test_scene(), ExportFormat::OpenMvg, &ExportOptions::default())
                .unwrap();
        assert_eq!(text, OPENMVG_EXPECTED);
    }

    #[test]
    fn test_export_alicevision_text() {
        let text = export_to_string(
            &test_scene(),
            ExportFormat::AliceVision,
            &ExportOptions::default(),
        )
        .unwrap();
        assert_eq!(text, ALICEVISION_EXPECTED);
    }

    #[test]
    fn test_export_writer_matches_string() {
        let scene = test_scene();
        let mut buffer = Vec::new();
        export_to_writer(
            &mut buffer,
            &scene,
            ExportFormat::OpenMvg,
            &ExportOptions::default(),
        )
        .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), OPENMVG_EXPECTED);
    }

    #[test]
    fn test_export_scene_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sfm_data.json");

        export_scene_named(&path, &test_scene(), "OpenMVG", &ExportOptions::default()).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, OPENMVG_EXPECTED);

        // The written file is a valid OpenMVG project
        let parsed: openmvg::SfmData = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.intrinsics[0].value.ptr_wrapper.data.focal_length, 100.0);
    }

    #[test]
    fn test_unknown_format_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.json");

        let err = export_scene_named(&path, &test_scene(), "colmap", &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::UnknownFormat(ref name) if name == "colmap"));
        assert!(!path.exists());
    }

    #[test]
    fn test_conversion_error_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.sfm");

        let mut scene = test_scene();
        scene.add_view(View::new("unlinked.jpg", 100, 100));

        let err = export_scene(
            &path,
            &scene,
            ExportFormat::AliceVision,
            &ExportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExportError::UnlinkedView { view, missing: "intrinsic" } if view.index() == 1
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_references() {
        let mut other = Scene::default();
        other.add_pose(Pose::default());
        let foreign_pose = other.add_pose(Pose::default());

        let mut scene = Scene::new(".");
        let intrinsic = scene.add_intrinsic(
            Intrinsic::pinhole(100, 100)
                .with_focal_length(10.0)
                .with_sensor_width(10.0),
        );
        scene.add_pose(Pose::default());
        scene.add_view(
            View::new("view.jpg", 100, 100)
                .with_intrinsic(intrinsic)
                .with_pose(foreign_pose),
        );

        let err = scene_to_openmvg(&scene, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::UnknownPose { .. }));
    }

    #[test]
    fn test_format_names() {
        assert_eq!("openmvg".parse::<ExportFormat>().unwrap(), ExportFormat::OpenMvg);
        assert_eq!("OPEN_MVG".parse::<ExportFormat>().unwrap(), ExportFormat::OpenMvg);
        assert_eq!(
            "AliceVision".parse::<ExportFormat>().unwrap(),
            ExportFormat::AliceVision
        );
        assert!(matches!(
            "nvm".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat(_))
        ));
        assert_eq!(ExportFormat::AliceVision.to_string(), "alicevision");
    }

    #[test]
    fn test_error_conversions() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(ExportError::from(io), ExportError::Io(ref msg) if msg == "missing"));

        let err = ExportOptions::load_from_yaml("samples/missing_options.yaml").unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
        assert!(err.to_string().starts_with("IO Error: "));
    }

    #[test]
    fn test_options_from_yaml() {
        assert!(ExportOptions::default().convert_rotations);

        let options = ExportOptions::from_yaml_str("convert_rotations: false\n").unwrap();
        assert!(!options.convert_rotations);

        let options = ExportOptions::from_yaml_str("{}").unwrap();
        assert_eq!(options, ExportOptions::default());

        assert!(matches!(
            ExportOptions::from_yaml_str("convert_rotations: maybe"),
            Err(ExportError::Yaml(_))
        ));
    }

    #[test]
    fn test_options_load_from_yaml_file() {
        let options = ExportOptions::load_from_yaml("samples/export_options.yaml").unwrap();
        assert!(!options.convert_rotations);

        let text = export_to_string(&test_scene(), ExportFormat::OpenMvg, &options).unwrap();
        assert!(text.contains("\"rotation\": [\n                    [\n                        1.0,"));
    }
}
