//! SfM Utils Library
//!
//! A Rust library for describing a Structure-from-Motion capture and handing it over to
//! reconstruction tools. It provides:
//! - An in-memory scene of views, camera intrinsics and poses
//! - Pinhole, radial (k3) and Brown (k3 + t2) intrinsic models
//! - OpenMVG `sfm_data.json` export
//! - AliceVision/Meshroom `.sfm` export
//! - The OpenMVG camera sensor width database

pub mod camera_db;
pub mod export;
pub mod scene;

// Re-export commonly used types
pub use camera_db::{CameraDb, CameraDbError};
pub use export::{
    export_scene, export_scene_named, export_to_string, export_to_writer, ExportError,
    ExportFormat, ExportOptions,
};
pub use scene::{
    Intrinsic, IntrinsicId, IntrinsicModel, Pose, PoseId, Scene, SceneElement, SceneError, View,
    ViewId,
};
