//! Implements the camera intrinsic models of a scene.
//!
//! This module provides the [`Intrinsic`] struct, which holds the parameters shared by every
//! model (image size, principal point, focal length), and the [`IntrinsicModel`] tag that
//! selects the lens distortion model and carries its coefficients.
//!
//! The principal point and the focal length in pixels are derived values: unless they are
//! explicitly overridden they are recomputed from the current image size, focal length and
//! sensor width every time they are read.

use crate::scene::{IntrinsicId, SceneElement, SceneError};

/// Lens model of an [`Intrinsic`], with its distortion coefficients.
#[derive(Debug, Clone, PartialEq)]
pub enum IntrinsicModel {
    /// Pinhole camera without distortion.
    Pinhole,
    /// Pinhole camera with three radial distortion coefficients `[k1, k2, k3]`.
    RadialK3 { dist_params: Vec<f64> },
    /// Pinhole camera with three radial and two tangential distortion coefficients
    /// `[k1, k2, k3, t1, t2]`.
    BrownT2 { dist_params: Vec<f64> },
}

impl IntrinsicModel {
    /// Default radial model, all coefficients zero.
    pub fn radial_k3() -> Self {
        IntrinsicModel::RadialK3 {
            dist_params: vec![0.0; 3],
        }
    }

    /// Default Brown model, all coefficients zero.
    pub fn brown_t2() -> Self {
        IntrinsicModel::BrownT2 {
            dist_params: vec![0.0; 5],
        }
    }

    /// Human readable model name, used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            IntrinsicModel::Pinhole => "pinhole",
            IntrinsicModel::RadialK3 { .. } => "radial_k3",
            IntrinsicModel::BrownT2 { .. } => "brown_t2",
        }
    }

    /// Maximum number of distortion coefficients the model stores.
    pub fn num_dist_params(&self) -> usize {
        match self {
            IntrinsicModel::Pinhole => 0,
            IntrinsicModel::RadialK3 { .. } => 3,
            IntrinsicModel::BrownT2 { .. } => 5,
        }
    }

    /// Distortion coefficients, or `None` for models without distortion.
    pub fn dist_params(&self) -> Option<&[f64]> {
        match self {
            IntrinsicModel::Pinhole => None,
            IntrinsicModel::RadialK3 { dist_params } | IntrinsicModel::BrownT2 { dist_params } => {
                Some(dist_params)
            }
        }
    }
}

/// Camera intrinsic parameters.
///
/// `ppx`, `ppy` and the focal length in pixels fall back to values computed from the other
/// fields until they are set explicitly:
///
/// * `ppx = width / 2`, `ppy = height / 2`
/// * `focal_length_as_pixels = max(width, height) * focal_length / sensor_width`
///
/// Two intrinsics are equal when they have the same model, image size, principal point,
/// focal length in pixels and distortion coefficients. The scene identifier is ignored, so
/// an intrinsic that has not been added to a scene can be compared with one that has.
///
/// # Examples
///
/// ```rust
/// use sfm_utils::scene::Intrinsic;
///
/// let mut intrinsic = Intrinsic::pinhole(100, 100)
///     .with_focal_length(10.0)
///     .with_sensor_width(10.0);
///
/// assert_eq!(intrinsic.principal_point(), (50.0, 50.0));
/// assert_eq!(intrinsic.focal_length_as_pixels(), Some(100.0));
///
/// // The principal point follows the image size until it is overridden
/// intrinsic.width = 200;
/// assert_eq!(intrinsic.ppx(), 100.0);
/// intrinsic.set_ppx(49.0);
/// intrinsic.width = 300;
/// assert_eq!(intrinsic.ppx(), 49.0);
/// ```
#[derive(Debug, Clone)]
pub struct Intrinsic {
    pub(super) id: Option<IntrinsicId>,
    model: IntrinsicModel,
    /// Image width, in pixels.
    pub width: u32,
    /// Image height, in pixels.
    pub height: u32,
    /// Effective lens focal length, in mm.
    pub focal_length: Option<f64>,
    /// Largest image sensor dimension (typically the sensor width), in mm.
    pub sensor_width: Option<f64>,
    ppx: Option<f64>,
    ppy: Option<f64>,
    focal_length_px: Option<f64>,
}

impl Intrinsic {
    /// Creates an intrinsic of the given model for images of `width` x `height` pixels.
    ///
    /// Distortion coefficients beyond the model's count are dropped, shorter lists are kept
    /// as they are. Use [`IntrinsicModel::radial_k3`] or [`IntrinsicModel::brown_t2`] for the
    /// zero-filled defaults.
    pub fn new(mut model: IntrinsicModel, width: u32, height: u32) -> Self {
        let len = model.num_dist_params();
        if let IntrinsicModel::RadialK3 { dist_params } | IntrinsicModel::BrownT2 { dist_params } =
            &mut model
        {
            dist_params.truncate(len);
        }

        Intrinsic {
            id: None,
            model,
            width,
            height,
            focal_length: None,
            sensor_width: None,
            ppx: None,
            ppy: None,
            focal_length_px: None,
        }
    }

    /// Pinhole intrinsic without distortion.
    pub fn pinhole(width: u32, height: u32) -> Self {
        Intrinsic::new(IntrinsicModel::Pinhole, width, height)
    }

    /// Pinhole intrinsic with three radial distortion coefficients, initialized to zero.
    pub fn radial_k3(width: u32, height: u32) -> Self {
        Intrinsic::new(IntrinsicModel::radial_k3(), width, height)
    }

    /// Pinhole intrinsic with three radial and two tangential distortion coefficients,
    /// initialized to zero.
    pub fn brown_t2(width: u32, height: u32) -> Self {
        Intrinsic::new(IntrinsicModel::brown_t2(), width, height)
    }

    /// Sets the lens focal length, in mm.
    pub fn with_focal_length(mut self, focal_length: f64) -> Self {
        self.focal_length = Some(focal_length);
        self
    }

    /// Sets the largest sensor dimension, in mm.
    pub fn with_sensor_width(mut self, sensor_width: f64) -> Self {
        self.sensor_width = Some(sensor_width);
        self
    }

    pub fn model(&self) -> &IntrinsicModel {
        &self.model
    }

    /// Principal point X position, in pixels.
    pub fn ppx(&self) -> f64 {
        self.ppx.unwrap_or_else(|| f64::from(self.width) / 2.0)
    }

    /// Overrides the principal point X position. Later changes to `width` no longer affect it.
    pub fn set_ppx(&mut self, x: f64) {
        self.ppx = Some(x);
    }

    /// Principal point Y position, in pixels.
    pub fn ppy(&self) -> f64 {
        self.ppy.unwrap_or_else(|| f64::from(self.height) / 2.0)
    }

    /// Overrides the principal point Y position. Later changes to `height` no longer affect it.
    pub fn set_ppy(&mut self, y: f64) {
        self.ppy = Some(y);
    }

    /// Principal point as `(ppx, ppy)`.
    pub fn principal_point(&self) -> (f64, f64) {
        (self.ppx(), self.ppy())
    }

    /// Effective focal length, in pixels.
    ///
    /// Returns the override set with [`Intrinsic::set_focal_length_as_pixels`] if there is
    /// one. Otherwise the value is computed as
    /// `max(width, height) * focal_length / sensor_width`.
    ///
    /// # Return Value
    ///
    /// `None` when no override is set and either `focal_length` or `sensor_width` is
    /// missing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sfm_utils::scene::Intrinsic;
    ///
    /// let mut intrinsic = Intrinsic::pinhole(4000, 3000);
    /// assert_eq!(intrinsic.focal_length_as_pixels(), None);
    ///
    /// intrinsic.focal_length = Some(24.0);
    /// intrinsic.sensor_width = Some(36.0);
    /// assert!((intrinsic.focal_length_as_pixels().unwrap() - 2666.666).abs() < 1e-3);
    ///
    /// intrinsic.set_focal_length_as_pixels(2700.0);
    /// assert_eq!(intrinsic.focal_length_as_pixels(), Some(2700.0));
    /// ```
    pub fn focal_length_as_pixels(&self) -> Option<f64> {
        if let Some(focal_length_px) = self.focal_length_px {
            return Some(focal_length_px);
        }
        let focal_length = self.focal_length?;
        let sensor_width = self.sensor_width?;
        Some(f64::from(self.width.max(self.height)) * focal_length / sensor_width)
    }

    /// Overrides the focal length in pixels. The override is returned verbatim regardless of
    /// `focal_length`, `sensor_width` and the image size.
    pub fn set_focal_length_as_pixels(&mut self, focal_length_px: f64) {
        self.focal_length_px = Some(focal_length_px);
    }

    /// Lens distortion coefficients. Empty for [`IntrinsicModel::Pinhole`].
    pub fn dist_params(&self) -> &[f64] {
        self.model.dist_params().unwrap_or(&[])
    }

    /// Replaces the lens distortion coefficients.
    ///
    /// Lists longer than the model's coefficient count are truncated. Shorter lists are
    /// stored as they are, without padding.
    ///
    /// # Errors
    ///
    /// * [`SceneError::InvalidDistortionAssignment`]: If the model is
    ///   [`IntrinsicModel::Pinhole`], which has no distortion coefficients.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sfm_utils::scene::Intrinsic;
    ///
    /// let mut intrinsic = Intrinsic::radial_k3(640, 480);
    /// assert_eq!(intrinsic.dist_params(), &[0.0, 0.0, 0.0]);
    ///
    /// intrinsic.set_dist_params(&[0.0, 1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(intrinsic.dist_params(), &[0.0, 1.0, 2.0]);
    ///
    /// assert!(Intrinsic::pinhole(640, 480).set_dist_params(&[0.1]).is_err());
    /// ```
    pub fn set_dist_params(&mut self, params: &[f64]) -> Result<(), SceneError> {
        let len = params.len().min(self.model.num_dist_params());
        match &mut self.model {
            IntrinsicModel::Pinhole => Err(SceneError::InvalidDistortionAssignment {
                model: IntrinsicModel::Pinhole.name(),
            }),
            IntrinsicModel::RadialK3 { dist_params } | IntrinsicModel::BrownT2 { dist_params } => {
                *dist_params = params[..len].to_vec();
                Ok(())
            }
        }
    }

    /// Builder form of [`Intrinsic::set_dist_params`].
    pub fn with_dist_params(mut self, params: &[f64]) -> Result<Self, SceneError> {
        self.set_dist_params(params)?;
        Ok(self)
    }
}

impl PartialEq for Intrinsic {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
            && self.width == other.width
            && self.height == other.height
            && self.ppx() == other.ppx()
            && self.ppy() == other.ppy()
            && self.focal_length_as_pixels() == other.focal_length_as_pixels()
    }
}

impl SceneElement for Intrinsic {
    type Id = IntrinsicId;

    fn id(&self) -> Option<IntrinsicId> {
        self.id
    }
}
