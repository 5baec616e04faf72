//! Origin & mode state: the geographic anchor, the translation factor that
//! distinguishes full-scale from tabletop AR, and the optional overrides
//! supplied by a positioning source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ArError;
use crate::geometry::{
    CameraTransform, GeoCamera, GeoPosition, GeoProjection, SE3, camera_transform_from_se3,
};

/// The geographic anchor of the scene. The tracking world frame coincides
/// with this camera when the session-relative pose is the identity.
pub type OriginCamera = GeoCamera;

/// Scale applied to tracking translations before they reach scene space.
///
/// `1.0` is full-scale AR (one tracking metre is one real metre); larger
/// values shrink the world onto a tabletop.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TranslationFactor(f64);

impl TranslationFactor {
    pub const FULL_SCALE: TranslationFactor = TranslationFactor(1.0);

    pub fn new(factor: f64) -> Result<Self, ArError> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self(factor))
        } else {
            Err(ArError::InvalidTranslationFactor(factor))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub fn is_full_scale(self) -> bool {
        self.0 == 1.0
    }
}

impl Default for TranslationFactor {
    fn default() -> Self {
        Self::FULL_SCALE
    }
}

impl TryFrom<f64> for TranslationFactor {
    type Error = ArError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TranslationFactor> for f64 {
    fn from(value: TranslationFactor) -> Self {
        value.0
    }
}

impl fmt::Display for TranslationFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Externally supplied device location, authoritative over the origin
/// camera's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationOverride {
    pub position: GeoPosition,
    pub heading: Option<f64>,
}

/// Current anchor, scale and overrides.
///
/// Readers always see a consistent snapshot; every setter takes effect on the
/// next pose update.
#[derive(Debug, Clone)]
pub struct OriginState {
    origin: OriginCamera,
    factor: TranslationFactor,
    location: Option<LocationOverride>,
    heading: Option<f64>,
    /// Set by tabletop placement: maps a surface point to the origin.
    initial_offset: SE3,
}

impl OriginState {
    pub fn new(origin: OriginCamera, factor: TranslationFactor) -> Self {
        Self {
            origin,
            factor,
            location: None,
            heading: None,
            initial_offset: SE3::identity(),
        }
    }

    pub fn origin(&self) -> &OriginCamera {
        &self.origin
    }

    pub fn set_origin(&mut self, origin: OriginCamera) {
        self.origin = origin;
    }

    pub fn factor(&self) -> TranslationFactor {
        self.factor
    }

    pub fn set_factor(&mut self, factor: TranslationFactor) {
        self.factor = factor;
    }

    pub fn location_override(&self) -> Option<&LocationOverride> {
        self.location.as_ref()
    }

    pub fn set_location_override(&mut self, location: Option<LocationOverride>) {
        self.location = location;
    }

    pub fn set_heading_override(&mut self, heading: Option<f64>) {
        self.heading = heading;
    }

    /// Direct heading override first, then the location fix's heading.
    pub fn effective_heading(&self) -> Option<f64> {
        self.heading
            .or_else(|| self.location.as_ref().and_then(|l| l.heading))
    }

    /// The origin camera with its position replaced by the location override.
    pub fn effective_origin(&self) -> OriginCamera {
        match &self.location {
            Some(location) => OriginCamera {
                position: location.position,
                ..self.origin
            },
            None => self.origin,
        }
    }

    pub fn initial_offset(&self) -> &SE3 {
        &self.initial_offset
    }

    pub fn set_initial_offset(&mut self, offset: SE3) {
        self.initial_offset = offset;
    }

    pub fn clear_initial_offset(&mut self) {
        self.initial_offset = SE3::identity();
    }

    pub fn clear_overrides(&mut self) {
        self.location = None;
        self.heading = None;
    }

    /// Scene camera for a session-relative pose under the current settings.
    pub fn camera_transform(
        &self,
        relative_pose: &SE3,
        projection: &dyn GeoProjection,
    ) -> CameraTransform {
        let pose = self.initial_offset.compose(relative_pose);
        let origin = self.effective_origin();
        let transform = camera_transform_from_se3(&origin, &pose, self.factor, projection);

        let Some(heading) = self.effective_heading() else {
            return transform;
        };

        // Turn the whole tracking frame so motion follows the overridden
        // facing, then snap away the residual meridian convergence.
        let turned = OriginCamera {
            heading: origin.heading + heading_delta_signed(transform.camera.heading, heading),
            ..origin
        };
        camera_transform_from_se3(&turned, &pose, self.factor, projection)
            .with_heading(heading, projection)
    }
}

/// Signed clockwise turn from `from` to `to`, in (-180, 180].
fn heading_delta_signed(from: f64, to: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

impl Default for OriginState {
    fn default() -> Self {
        Self::new(OriginCamera::default(), TranslationFactor::default())
    }
}
