use glam::{Mat3, Mat4, Quat, Vec2, Vec3};

use crate::scene::Ray;

//
// ──────────────────────────────────────────────────────────────
//   Camera (right-handed, Y-up, XZ = ground)
//
//   The camera looks down its local -Z axis. Orientation is kept
//   as a quaternion so the orbit controller can rotate freely
//   around the target without re-deriving Euler angles.
// ──────────────────────────────────────────────────────────────
//

/// What the orbit controller needs from a camera, and nothing more.
pub trait Viewpoint
{
  fn position(&self) -> Vec3;

  fn set_position(&mut self, position: Vec3);

  fn up(&self) -> Vec3;

  /// Turn to face `target`, keeping `up()` as the roll reference.
  fn look_at(&mut self, target: Vec3);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection
{
  /// `fovy` is the vertical field of view in radians.
  Perspective { fovy: f32 },
  /// `half_height` is half the visible height in world units; width follows the aspect.
  Orthographic { half_height: f32 },
}

impl Projection
{
  pub fn name(&self) -> &'static str
  {
    match self
    {
      Projection::Perspective { .. } => "perspective",
      Projection::Orthographic { .. } => "orthographic",
    }
  }
}

#[derive(Debug, Clone)]
pub struct Camera
{
  pub position: Vec3,
  pub orientation: Quat,
  pub up: Vec3,

  pub projection: Projection,
  pub aspect: f32,
  pub znear: f32,
  pub zfar: f32,
}

//
// ──────────────────────────────────────────────────────────────
//   Constants
// ──────────────────────────────────────────────────────────────
//

const DEFAULT_FOVY: f32 = 75.0 * std::f32::consts::PI / 180.0;
const DEFAULT_HALF_HEIGHT: f32 = 500.0;
const DEFAULT_ZNEAR: f32 = 1.0;
const DEFAULT_ZFAR: f32 = 10_000.0;

//
// ──────────────────────────────────────────────────────────────
//   Public API
// ──────────────────────────────────────────────────────────────
//

impl Camera
{
  pub fn new(aspect: f32) -> Self
  {
    Self {
      position: Vec3::new(0.0, 0.0, 1.0),
      orientation: Quat::IDENTITY,
      up: Vec3::Y,

      projection: Projection::Perspective { fovy: DEFAULT_FOVY },
      aspect,
      znear: DEFAULT_ZNEAR,
      zfar: DEFAULT_ZFAR,
    }
  }

  pub fn set_aspect(&mut self, aspect: f32)
  {
    self.aspect = aspect;
  }

  pub fn perspective() -> Projection
  {
    Projection::Perspective { fovy: DEFAULT_FOVY }
  }

  pub fn orthographic() -> Projection
  {
    Projection::Orthographic { half_height: DEFAULT_HALF_HEIGHT }
  }

  /// Swap projection in place; position and orientation are kept.
  pub fn set_projection(&mut self, projection: Projection)
  {
    if self.projection != projection
    {
      log::debug!("camera: switching to {} projection", projection.name());
    }
    self.projection = projection;
  }

  /// Direction the camera is facing in world space.
  pub fn forward(&self) -> Vec3
  {
    self.orientation * Vec3::NEG_Z
  }

  pub fn build_view(&self) -> Mat4
  {
    Mat4::from_rotation_translation(self.orientation, self.position).inverse()
  }

  pub fn build_projection(&self) -> Mat4
  {
    match self.projection
    {
      Projection::Perspective { fovy } => Mat4::perspective_rh(fovy, self.aspect, self.znear, self.zfar),
      Projection::Orthographic { half_height } =>
      {
        let half_width = half_height * self.aspect;
        Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, self.znear, self.zfar)
      }
    }
  }

  pub fn build_view_proj(&self) -> Mat4
  {
    self.build_projection() * self.build_view()
  }

  /// World-space ray through a point in normalized device coordinates
  /// (x, y in -1..1, y up).
  pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray
  {
    let inv = self.build_view_proj().inverse();
    let near = inv.project_point3(ndc.extend(0.0));
    let far = inv.project_point3(ndc.extend(1.0));

    Ray::new(near, far - near)
  }
}

impl Viewpoint for Camera
{
  fn position(&self) -> Vec3
  {
    self.position
  }

  fn set_position(&mut self, position: Vec3)
  {
    self.position = position;
  }

  fn up(&self) -> Vec3
  {
    self.up
  }

  fn look_at(&mut self, target: Vec3)
  {
    if let Some(orientation) = facing(self.position, target, self.up, self.orientation * Vec3::X)
    {
      self.orientation = orientation;
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Helpers
// ──────────────────────────────────────────────────────────────
//

/// Rotation whose -Z points from `eye` at `target`. `None` only when the
/// two coincide.
///
/// Looking along `up` leaves roll undefined; the current right axis
/// (`previous_right`) is kept in that case so the view does not spin.
fn facing(eye: Vec3, target: Vec3, up: Vec3, previous_right: Vec3) -> Option<Quat>
{
  let back = (eye - target).normalize_or_zero();
  if back == Vec3::ZERO
  {
    return None;
  }

  let mut right = up.cross(back);
  if right.length_squared() < 1.0e-12
  {
    right = previous_right - back * previous_right.dot(back);
  }
  if right.length_squared() < 1.0e-12
  {
    right = back.any_orthonormal_vector();
  }

  let right = right.normalize();
  let true_up = back.cross(right);

  Some(Quat::from_mat3(&Mat3::from_cols(right, true_up, back)))
}
