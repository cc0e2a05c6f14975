//! In-memory Structure-from-Motion scene.
//!
//! A [`Scene`] owns the [`View`]s, [`Intrinsic`]s and [`Pose`]s of a capture and is the
//! only place where their identifiers are handed out. Identifiers are 0-based and assigned
//! in insertion order, independently for each kind of element. Intrinsics are grouped:
//! adding an intrinsic that is value-equal to one already in the scene returns the existing
//! identifier instead of creating a new entry.
//!
//! # Examples
//!
//! ```rust
//! use sfm_utils::scene::{Intrinsic, Pose, Scene, View};
//!
//! let mut scene = Scene::new(".");
//! let view_id = scene.add_view(View::new("view.jpg", 100, 100));
//!
//! let intrinsic = Intrinsic::pinhole(100, 100)
//!     .with_focal_length(10.0)
//!     .with_sensor_width(10.0);
//! let intrinsic_id = scene.add_intrinsic(intrinsic);
//! let pose_id = scene.add_pose(Pose::default());
//!
//! let view = scene.view_mut(view_id).unwrap();
//! view.intrinsic = Some(intrinsic_id);
//! view.pose = Some(pose_id);
//!
//! assert_eq!(view_id.index(), 0);
//! assert_eq!(scene.intrinsics().len(), 1);
//! ```

pub mod intrinsic;
pub mod pose;
pub mod view;

pub use intrinsic::{Intrinsic, IntrinsicModel};
pub use pose::Pose;
pub use view::View;

use log::debug;
use std::fmt;
use std::path::{Component, Path, PathBuf};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SceneError {
    #[error("{model} intrinsics carry no distortion parameters")]
    InvalidDistortionAssignment { model: &'static str },
}

macro_rules! element_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(usize);

        impl $name {
            /// Position of the element in its scene collection.
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

element_id!(
    /// Identifier of a [`View`] within its [`Scene`].
    ViewId
);
element_id!(
    /// Identifier of an [`Intrinsic`] within its [`Scene`].
    IntrinsicId
);
element_id!(
    /// Identifier of a [`Pose`] within its [`Scene`].
    PoseId
);

/// An element owned by a [`Scene`].
///
/// The identifier is `None` until the element has been added to a scene, and it never
/// changes afterwards.
pub trait SceneElement {
    type Id: Copy + fmt::Display;

    /// Identifier within the owning scene.
    fn id(&self) -> Option<Self::Id>;
}

/// Lexically normalizes a path as it is stored in a scene and written to project files.
///
/// Repeated separators, trailing separators and `.` components are dropped, `..` is kept.
/// An empty path becomes `.`.
///
/// ```rust
/// use sfm_utils::scene::normalize_path;
/// use std::path::Path;
///
/// assert_eq!(normalize_path(Path::new("./images//view.jpg")), Path::new("images/view.jpg"));
/// assert_eq!(normalize_path(Path::new("scan/")), Path::new("scan"));
/// assert_eq!(normalize_path(Path::new(".")), Path::new("."));
/// ```
pub fn normalize_path(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Container of views, intrinsics and poses.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    root_dir: PathBuf,
    views: Vec<View>,
    intrinsics: Vec<Intrinsic>,
    poses: Vec<Pose>,
}

impl Scene {
    /// Creates an empty scene whose files live under `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Scene {
            root_dir: normalize_path(&root_dir.into()),
            ..Default::default()
        }
    }

    /// Root directory for scene files.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn set_root_dir(&mut self, root_dir: impl Into<PathBuf>) {
        self.root_dir = normalize_path(&root_dir.into());
    }

    /// Adds a view and returns its identifier.
    ///
    /// Views are never grouped: every call appends a new entry.
    pub fn add_view(&mut self, mut view: View) -> ViewId {
        let id = ViewId(self.views.len());
        view.id = Some(id);
        debug!("Added view {} ({})", id, view.path.display());
        self.views.push(view);
        id
    }

    /// Adds an intrinsic, grouping it with an identical one if present.
    ///
    /// Equivalent to [`Scene::add_intrinsic_grouped`] with `group_models` set to `true`.
    pub fn add_intrinsic(&mut self, intrinsic: Intrinsic) -> IntrinsicId {
        self.add_intrinsic_grouped(intrinsic, true)
    }

    /// Adds an intrinsic and returns the identifier the associated views should reference.
    ///
    /// If `group_models` is `true` and the scene already holds an intrinsic equal to
    /// `intrinsic` (see [`Intrinsic`]'s `PartialEq`), the passed intrinsic is dropped and
    /// the identifier of the existing one is returned. The scene is left unchanged in that
    /// case.
    pub fn add_intrinsic_grouped(
        &mut self,
        mut intrinsic: Intrinsic,
        group_models: bool,
    ) -> IntrinsicId {
        if group_models {
            let existing = self.intrinsics.iter().position(|other| *other == intrinsic);
            if let Some(index) = existing {
                debug!(
                    "Grouped {} intrinsic with intrinsic {}",
                    intrinsic.model().name(),
                    index
                );
                return IntrinsicId(index);
            }
        }

        let id = IntrinsicId(self.intrinsics.len());
        intrinsic.id = Some(id);
        debug!("Added {} intrinsic {}", intrinsic.model().name(), id);
        self.intrinsics.push(intrinsic);
        id
    }

    /// Adds a pose and returns its identifier.
    pub fn add_pose(&mut self, mut pose: Pose) -> PoseId {
        let id = PoseId(self.poses.len());
        pose.id = Some(id);
        debug!("Added pose {}", id);
        self.poses.push(pose);
        id
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn intrinsics(&self) -> &[Intrinsic] {
        &self.intrinsics
    }

    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(id.0)
    }

    /// Mutable access to a view, used to link it to its intrinsic and pose once those have
    /// been added.
    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(id.0)
    }

    pub fn intrinsic(&self, id: IntrinsicId) -> Option<&Intrinsic> {
        self.intrinsics.get(id.0)
    }

    pub fn pose(&self, id: PoseId) -> Option<&Pose> {
        self.poses.get(id.0)
    }

    /// Views paired with their identifiers, in insertion order.
    pub fn iter_views(&self) -> impl Iterator<Item = (ViewId, &View)> {
        self.views.iter().enumerate().map(|(index, view)| {
            debug_assert_eq!(view.id, Some(ViewId(index)));
            (ViewId(index), view)
        })
    }

    /// Intrinsics paired with their identifiers, in insertion order.
    pub fn iter_intrinsics(&self) -> impl Iterator<Item = (IntrinsicId, &Intrinsic)> {
        self.intrinsics.iter().enumerate().map(|(index, intrinsic)| {
            debug_assert_eq!(intrinsic.id, Some(IntrinsicId(index)));
            (IntrinsicId(index), intrinsic)
        })
    }

    /// Poses paired with their identifiers, in insertion order.
    pub fn iter_poses(&self) -> impl Iterator<Item = (PoseId, &Pose)> {
        self.poses.iter().enumerate().map(|(index, pose)| {
            debug_assert_eq!(pose.id, Some(PoseId(index)));
            (PoseId(index), pose)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_intrinsic() -> Intrinsic {
        Intrinsic::pinhole(100, 100)
            .with_focal_length(10.0)
            .with_sensor_width(10.0)
    }

    #[test]
    fn test_view_ids_follow_insertion_order() {
        let mut scene = Scene::new(".");
        let ids: Vec<ViewId> = (0..3)
            .map(|_| scene.add_view(View::new("view.jpg", 100, 100)))
            .collect();

        // Identical views are never grouped
        let indices: Vec<usize> = ids.iter().map(|id| id.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(scene.views().len(), 3);
        for (index, view) in scene.views().iter().enumerate() {
            assert_eq!(view.id(), Some(ViewId(index)));
        }
    }

    #[test]
    fn test_pose_ids_follow_insertion_order() {
        let mut scene = Scene::default();
        let first = scene.add_pose(Pose::default());
        let second = scene.add_pose(Pose::default());

        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(scene.poses().len(), 2);
        assert_eq!(scene.pose(second).unwrap().id(), Some(second));
    }

    #[test]
    fn test_equal_intrinsics_are_grouped() {
        let mut scene = Scene::default();
        let first = scene.add_intrinsic(test_intrinsic());
        let second = scene.add_intrinsic(test_intrinsic());

        assert_eq!(first, second);
        assert_eq!(scene.intrinsics().len(), 1);

        // A distinct intrinsic takes the next id
        let third = scene.add_intrinsic(test_intrinsic().with_focal_length(20.0));
        assert_eq!(third.index(), 1);
        assert_eq!(scene.intrinsics().len(), 2);
    }

    #[test]
    fn test_grouping_matches_earlier_entries() {
        let mut scene = Scene::default();
        let a = scene.add_intrinsic(test_intrinsic());
        let b = scene.add_intrinsic(
            Intrinsic::radial_k3(100, 100)
                .with_focal_length(10.0)
                .with_sensor_width(10.0),
        );
        let again = scene.add_intrinsic(test_intrinsic());

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(again, a);
        assert_eq!(scene.intrinsics().len(), 2);
    }

    #[test]
    fn test_ungrouped_intrinsics_always_append() {
        let mut scene = Scene::default();
        let first = scene.add_intrinsic_grouped(test_intrinsic(), false);
        let second = scene.add_intrinsic_grouped(test_intrinsic(), false);

        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(scene.intrinsics().len(), 2);

        // Grouping afterwards returns the first match
        assert_eq!(scene.add_intrinsic(test_intrinsic()), first);
    }

    #[test]
    fn test_view_mut_links_elements() {
        let mut scene = Scene::new("/data/scan");
        let view_id = scene.add_view(View::new("images/0001.jpg", 640, 480));
        let intrinsic_id = scene.add_intrinsic(test_intrinsic());
        let pose_id = scene.add_pose(Pose::default());

        let view = scene.view_mut(view_id).unwrap();
        view.intrinsic = Some(intrinsic_id);
        view.pose = Some(pose_id);

        let view = scene.view(view_id).unwrap();
        assert_eq!(view.intrinsic, Some(intrinsic_id));
        assert_eq!(view.pose, Some(pose_id));
        assert_eq!(scene.root_dir(), Path::new("/data/scan"));
    }

    #[test]
    fn test_root_dir_is_normalized() {
        let mut scene = Scene::new("./scan/");
        assert_eq!(scene.root_dir(), Path::new("scan"));

        scene.set_root_dir("/data//scan/./images/");
        assert_eq!(scene.root_dir(), Path::new("/data/scan/images"));

        scene.set_root_dir("");
        assert_eq!(scene.root_dir(), Path::new("."));
        assert_eq!(Scene::new(".").root_dir(), Path::new("."));
    }

    #[test]
    fn test_iterators_pair_ids() {
        let mut scene = Scene::default();
        scene.add_view(View::new("a.jpg", 10, 10));
        scene.add_view(View::new("b.jpg", 10, 10));
        scene.add_intrinsic(test_intrinsic());
        scene.add_pose(Pose::default());

        let view_ids: Vec<usize> = scene.iter_views().map(|(id, _)| id.index()).collect();
        assert_eq!(view_ids, vec![0, 1]);
        assert_eq!(scene.iter_intrinsics().count(), 1);
        assert_eq!(scene.iter_poses().count(), 1);
    }

    #[test]
    fn test_unknown_ids_are_none() {
        let mut scene = Scene::default();
        let mut other = Scene::default();
        other.add_pose(Pose::default());
        let foreign = other.add_pose(Pose::default());

        scene.add_pose(Pose::default());
        assert!(scene.pose(foreign).is_none());
    }
}
