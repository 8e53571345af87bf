use std::cell::RefCell;
use std::rc::Rc;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::spherical::Spherical;
use super::view::{Camera, Viewpoint};
use crate::input::{KeyCombination, Keyboard, Subscription};

//
// ──────────────────────────────────────────────────────────────
//   Orbit-pan controller
//
//   Key bindings (held, fire every tick):
//     r / f                → zoom in / out
//     shift+a / shift+d    → orbit left / right (theta)
//     shift+w / shift+s    → orbit over / under (phi)
//     a / d / w / s        → drift the target along camera facing
//
//   Callbacks only accumulate. update() folds everything gathered
//   during the frame into one integration step.
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings
{
  /// Radius change per second while `r`/`f` is held (world units).
  pub zoom_rate: f32,
  /// Angular speed for the shift+wasd orbit keys (radians per second).
  pub rotate_rate: f32,
  /// Distance the target drifts per update while a pan key is held.
  pub pan_step: f32,
  pub min_radius: f32,
  pub max_radius: f32,
}

impl Default for OrbitSettings
{
  fn default() -> Self
  {
    Self {
      zoom_rate: 1000.0,
      rotate_rate: std::f32::consts::PI,
      pan_step: 10.0,
      min_radius: 1.0,
      max_radius: 10_000.0,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum OrbitSettingsError
{
  #[error("min_radius must be positive, got {0}")]
  MinRadius(f32),

  #[error("radius range {min}..{max} is empty")]
  RadiusRange
  {
    min: f32,
    max: f32,
  },
}

impl OrbitSettings
{
  pub fn validate(&self) -> Result<(), OrbitSettingsError>
  {
    if !(self.min_radius > 0.0)
    {
      return Err(OrbitSettingsError::MinRadius(self.min_radius));
    }
    if !(self.max_radius >= self.min_radius)
    {
      return Err(OrbitSettingsError::RadiusRange { min: self.min_radius, max: self.max_radius });
    }

    Ok(())
  }

  /// Same settings with the radius range forced into `0 < min <= max`.
  pub fn sanitized(mut self) -> Self
  {
    if let Err(err) = self.validate()
    {
      log::warn!("orbit: {err}, adjusting");
    }

    if !(self.min_radius > 0.0)
    {
      self.min_radius = f32::EPSILON;
    }
    if !(self.max_radius >= self.min_radius)
    {
      self.max_radius = self.min_radius;
    }

    self
  }
}

#[derive(Debug, Default)]
struct Impulses
{
  spherical: Spherical,
  pan: Vec3,
}

pub struct OrbitController<C: Viewpoint = Camera>
{
  camera: C,
  target: Vec3,
  spherical: Spherical,
  settings: OrbitSettings,

  impulses: Rc<RefCell<Impulses>>,
  bindings: Subscription,
}

//
// ──────────────────────────────────────────────────────────────
//   Public API
// ──────────────────────────────────────────────────────────────
//

impl<C: Viewpoint> OrbitController<C>
{
  pub fn new(camera: C, keyboard: &Keyboard, settings: OrbitSettings) -> Self
  {
    let settings = settings.sanitized();
    let impulses = Rc::new(RefCell::new(Impulses::default()));
    let bindings = bind_keys(keyboard, &impulses, &settings);
    let spherical = Spherical::from_vec3(camera.position());

    Self { camera, target: Vec3::ZERO, spherical, settings, impulses, bindings }
  }

  /// Fold this frame's impulses into the camera. Call once per frame,
  /// after the keyboard tick.
  pub fn update(&mut self, _elapsed: f32)
  {
    let (delta, pan) = {
      let mut impulses = self.impulses.borrow_mut();
      (std::mem::take(&mut impulses.spherical), std::mem::take(&mut impulses.pan))
    };

    let up = self.camera.up().normalize_or(Vec3::Y);
    let position = self.camera.position();

    // Do the spherical maths as if the camera's up were +Y.
    let align = Quat::from_rotation_arc(up, Vec3::Y);
    let unalign = align.inverse();

    let mut spherical = Spherical::from_vec3(align * (position - self.target));
    spherical += delta;
    spherical.make_safe();
    spherical.radius = spherical.radius.clamp(self.settings.min_radius, self.settings.max_radius);
    self.spherical = spherical;

    let drift = drift(align * (self.target - position + up), pan, self.settings.pan_step);
    self.target += unalign * drift;

    self.camera.set_position(self.target + unalign * spherical.to_vec3());
    self.camera.look_at(self.target);
  }

  /// Queue a zoom/orbit impulse. Nothing moves until the next update.
  pub fn rotate(&mut self, radius: f32, phi: f32, theta: f32)
  {
    self.impulses.borrow_mut().spherical += Spherical::new(radius, phi, theta);
  }

  /// Queue a pan impulse: x strafes, negative z moves forward.
  pub fn pan(&mut self, vector: Vec3)
  {
    self.impulses.borrow_mut().pan += vector;
  }

  /// Jump the target to `position`. The camera catches up on the next update.
  pub fn look_at(&mut self, position: Vec3)
  {
    self.target = position;
  }

  /// Remove every key binding this controller registered.
  pub fn dispose(&mut self)
  {
    self.bindings.dispose();
  }

  pub fn target(&self) -> Vec3
  {
    self.target
  }

  /// Spherical state as of the last update.
  pub fn spherical(&self) -> Spherical
  {
    self.spherical
  }

  pub fn settings(&self) -> &OrbitSettings
  {
    &self.settings
  }

  pub fn camera(&self) -> &C
  {
    &self.camera
  }

  pub fn camera_mut(&mut self) -> &mut C
  {
    &mut self.camera
  }
}

impl<C: Viewpoint> Drop for OrbitController<C>
{
  fn drop(&mut self)
  {
    self.dispose();
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Helpers
// ──────────────────────────────────────────────────────────────
//

fn bind_keys(keyboard: &Keyboard, impulses: &Rc<RefCell<Impulses>>, settings: &OrbitSettings) -> Subscription
{
  let zoom = settings.zoom_rate;
  let turn = settings.rotate_rate;

  keyboard
    .on("r", spin(impulses, move |e| Spherical::new(-e * zoom, 0.0, 0.0)))
    .on("f", spin(impulses, move |e| Spherical::new(e * zoom, 0.0, 0.0)))
    .on("shift+a", spin(impulses, move |e| Spherical::new(0.0, 0.0, -e * turn)))
    .on("shift+d", spin(impulses, move |e| Spherical::new(0.0, 0.0, e * turn)))
    .on("shift+w", spin(impulses, move |e| Spherical::new(0.0, e * turn, 0.0)))
    .on("shift+s", spin(impulses, move |e| Spherical::new(0.0, -e * turn, 0.0)))
    .on("a", nudge(impulses, Vec3::NEG_X))
    .on("d", nudge(impulses, Vec3::X))
    .on("w", nudge(impulses, Vec3::NEG_Z))
    .on("s", nudge(impulses, Vec3::Z))
}

fn spin(
  impulses: &Rc<RefCell<Impulses>>,
  delta: impl Fn(f32) -> Spherical + 'static,
) -> impl FnMut(f32, &KeyCombination) + 'static
{
  let impulses = impulses.clone();
  move |elapsed, _| impulses.borrow_mut().spherical += delta(elapsed)
}

fn nudge(impulses: &Rc<RefCell<Impulses>>, direction: Vec3) -> impl FnMut(f32, &KeyCombination) + 'static
{
  let impulses = impulses.clone();
  move |elapsed, _| impulses.borrow_mut().pan += direction * elapsed
}

/// Fixed-length step for the target, in up-aligned space.
///
/// `facing` is roughly the view direction; only its ground-plane part is
/// used. Forward and strafe are summed before normalizing.
fn drift(facing: Vec3, pan: Vec3, step: f32) -> Vec3
{
  let mut normal = facing.normalize_or_zero();
  normal.y = 0.0;

  let forward = normal * -pan.z;
  let strafe = Vec3::new(-normal.z, 0.0, normal.x) * pan.x;

  (forward + strafe).normalize_or_zero() * step
}

#[cfg(test)]
mod tests
{
  use super::*;
  use std::f32::consts::{FRAC_PI_2, PI};

  fn start_camera(position: Vec3) -> Camera
  {
    let mut camera = Camera::new(1.0);
    camera.set_position(position);
    camera.look_at(Vec3::ZERO);
    camera
  }

  fn controller(keyboard: &Keyboard, position: Vec3) -> OrbitController
  {
    OrbitController::new(start_camera(position), keyboard, OrbitSettings::default())
  }

  #[test]
  fn registers_ten_bindings_and_disposes_them_together()
  {
    let keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));
    assert_eq!(keyboard.listener_count(), 10);

    orbit.dispose();
    assert_eq!(keyboard.listener_count(), 0);

    orbit.dispose();
    assert_eq!(keyboard.listener_count(), 0);
  }

  #[test]
  fn drop_releases_bindings()
  {
    let keyboard = Keyboard::new();
    {
      let _orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));
      assert_eq!(keyboard.listener_count(), 10);
    }
    assert_eq!(keyboard.listener_count(), 0);
  }

  #[test]
  fn repeated_update_without_impulses_is_stable()
  {
    let keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(500.0, 800.0, 1300.0));

    orbit.rotate(0.0, FRAC_PI_2, 0.0);
    orbit.update(0.016);
    let first = orbit.spherical();

    orbit.update(0.016);
    let second = orbit.spherical();

    assert!((first.phi - second.phi).abs() < 1.0e-3);
    assert!((first.radius - second.radius).abs() < 1.0e-2);
    assert!(orbit.impulses.borrow().spherical.is_zero());
  }

  #[test]
  fn rotate_is_only_applied_on_update()
  {
    let keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));
    let before = orbit.camera().position;

    orbit.rotate(0.0, 0.0, FRAC_PI_2);
    assert_eq!(orbit.camera().position, before);

    orbit.update(0.016);
    assert!((orbit.camera().position - Vec3::new(10.0, 0.0, 0.0)).length() < 1.0e-3);
  }

  #[test]
  fn radius_never_reaches_zero()
  {
    let keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 50.0, 100.0));

    for _ in 0..5
    {
      orbit.rotate(-10_000.0, 0.0, 0.0);
      orbit.update(0.016);

      assert!(orbit.spherical().radius > 0.0);
      assert!((orbit.camera().position - orbit.target()).length() > 0.0);
    }
    assert_eq!(orbit.spherical().radius, OrbitSettings::default().min_radius);
  }

  #[test]
  fn phi_stays_off_the_poles()
  {
    let keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));

    orbit.rotate(0.0, 10.0 * PI, 0.0);
    orbit.update(0.016);
    assert!(orbit.spherical().phi < PI);

    orbit.rotate(0.0, -10.0 * PI, 0.0);
    orbit.update(0.016);
    assert!(orbit.spherical().phi > 0.0);
  }

  #[test]
  fn camera_faces_target_at_either_pole()
  {
    let keyboard = Keyboard::new();

    for phi in [-10.0, 10.0]
    {
      let mut orbit = controller(&keyboard, Vec3::new(500.0, 800.0, 1300.0));
      orbit.rotate(0.0, phi, 0.0);
      orbit.update(0.016);

      let clamped = orbit.spherical().phi;
      assert!(clamped < 1.0e-3 || clamped > PI - 1.0e-3);

      let camera = orbit.camera();
      let facing = (orbit.target() - camera.position).normalize();
      assert!((camera.forward() - facing).length() < 1.0e-3);
    }
  }

  #[test]
  fn zero_min_radius_keeps_camera_off_target()
  {
    let keyboard = Keyboard::new();
    let settings = OrbitSettings { min_radius: 0.0, ..OrbitSettings::default() };
    let mut orbit = OrbitController::new(start_camera(Vec3::new(0.0, 50.0, 100.0)), &keyboard, settings);

    orbit.rotate(-10_000.0, 0.0, 0.0);
    orbit.update(0.016);

    assert!(orbit.spherical().radius > 0.0);
    assert!(orbit.camera().position.is_finite());
  }

  #[test]
  fn inverted_radius_range_pins_to_min()
  {
    let keyboard = Keyboard::new();
    let settings = OrbitSettings { min_radius: 100.0, max_radius: 10.0, ..OrbitSettings::default() };
    let mut orbit = OrbitController::new(start_camera(Vec3::new(0.0, 0.0, 50.0)), &keyboard, settings);

    orbit.update(0.016);

    assert_eq!(orbit.settings().max_radius, 100.0);
    assert!((orbit.spherical().radius - 100.0).abs() < 1.0e-3);
  }

  #[test]
  fn validate_reports_bad_radius_range()
  {
    assert_eq!(OrbitSettings::default().validate(), Ok(()));

    let zero = OrbitSettings { min_radius: 0.0, ..OrbitSettings::default() };
    assert_eq!(zero.validate(), Err(OrbitSettingsError::MinRadius(0.0)));

    let inverted = OrbitSettings { min_radius: 5.0, max_radius: 1.0, ..OrbitSettings::default() };
    assert_eq!(inverted.validate(), Err(OrbitSettingsError::RadiusRange { min: 5.0, max: 1.0 }));

    let nan = OrbitSettings { max_radius: f32::NAN, ..OrbitSettings::default() };
    assert!(nan.validate().is_err());
    assert_eq!(nan.sanitized().max_radius, nan.min_radius);
  }

  #[test]
  fn held_zoom_key_shrinks_radius()
  {
    let mut keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 100.0));

    keyboard.press("r", false, false);
    keyboard.tick(0.01);
    orbit.update(0.01);

    assert!((orbit.spherical().radius - 90.0).abs() < 1.0e-3);
  }

  #[test]
  fn shift_a_orbits_without_panning()
  {
    let mut keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));

    keyboard.press("shift", true, false);
    keyboard.press("a", true, false);
    keyboard.tick(0.5);
    orbit.update(0.5);

    assert_eq!(orbit.target(), Vec3::ZERO);
    assert!((orbit.spherical().theta + FRAC_PI_2).abs() < 1.0e-4);
  }

  #[test]
  fn forward_pan_moves_target_towards_view()
  {
    let mut keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));

    keyboard.press("w", false, false);
    keyboard.tick(0.1);
    orbit.update(0.1);

    let step = OrbitSettings::default().pan_step;
    assert!((orbit.target() - Vec3::new(0.0, 0.0, -step)).length() < 1.0e-3);
  }

  #[test]
  fn simultaneous_pans_move_diagonally()
  {
    let mut keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));

    keyboard.press("w", false, false);
    keyboard.press("d", false, false);
    keyboard.tick(0.1);
    orbit.update(0.1);

    let step = OrbitSettings::default().pan_step;
    let moved = orbit.target();
    assert!((moved.length() - step).abs() < 1.0e-3);
    assert!((moved.x - step / 2.0_f32.sqrt()).abs() < 1.0e-3);
    assert!((moved.z + step / 2.0_f32.sqrt()).abs() < 1.0e-3);
    assert_eq!(moved.y, 0.0);
  }

  #[test]
  fn look_at_re_aims_without_moving()
  {
    let keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));

    orbit.look_at(Vec3::new(50.0, 0.0, 0.0));
    orbit.update(0.016);

    let camera = orbit.camera();
    assert!((camera.position - Vec3::new(0.0, 0.0, 10.0)).length() < 1.0e-3);
    assert!(((camera.position - orbit.target()).length() - orbit.spherical().radius).abs() < 1.0e-2);

    let facing = (orbit.target() - camera.position).normalize();
    assert!((camera.forward() - facing).length() < 1.0e-3);
  }

  #[test]
  fn non_y_up_camera_round_trips()
  {
    let keyboard = Keyboard::new();
    let mut camera = Camera::new(1.0);
    camera.up = Vec3::Z;
    camera.set_position(Vec3::new(0.0, -10.0, 5.0));
    camera.look_at(Vec3::ZERO);

    let mut orbit = OrbitController::new(camera, &keyboard, OrbitSettings::default());
    orbit.update(0.016);

    assert!((orbit.camera().position - Vec3::new(0.0, -10.0, 5.0)).length() < 1.0e-3);
  }

  #[test]
  fn pending_impulses_are_cleared_after_update()
  {
    let keyboard = Keyboard::new();
    let mut orbit = controller(&keyboard, Vec3::new(0.0, 0.0, 10.0));

    orbit.rotate(1.0, 0.1, 0.1);
    orbit.pan(Vec3::X);
    orbit.update(0.016);

    let impulses = orbit.impulses.borrow();
    assert!(impulses.spherical.is_zero());
    assert_eq!(impulses.pan, Vec3::ZERO);
  }
}
