use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use voxbox_core::camera::{Camera, OrbitController, OrbitSettings, Projection, Viewpoint};
use voxbox_core::input::{KeyInput, KeyState, Keyboard};

fn key(name: &str, state: KeyState, keyboard: &Keyboard) -> KeyInput
{
  KeyInput { key: name.to_string(), shift: keyboard.shift_held() || name == "shift", ctrl: false, state }
}

fn frame(keyboard: &Keyboard, orbit: &mut OrbitController, dt: f32)
{
  keyboard.tick(dt);
  orbit.update(dt);
}

fn sandbox() -> (Keyboard, OrbitController)
{
  let keyboard = Keyboard::new();
  let mut camera = Camera::new(16.0 / 9.0);
  camera.set_position(Vec3::new(500.0, 800.0, 1300.0));
  camera.look_at(Vec3::ZERO);

  let orbit = OrbitController::new(camera, &keyboard, OrbitSettings::default());
  (keyboard, orbit)
}

#[test]
fn holding_shift_d_orbits_at_constant_radius()
{
  let (mut keyboard, mut orbit) = sandbox();
  frame(&keyboard, &mut orbit, 0.016);
  let radius = orbit.spherical().radius;
  let theta = orbit.spherical().theta;

  let shift = key("shift", KeyState::Pressed, &keyboard);
  keyboard.handle(&shift);
  let d = key("d", KeyState::Pressed, &keyboard);
  keyboard.handle(&d);

  for _ in 0..10
  {
    frame(&keyboard, &mut orbit, 0.01);
  }

  let after = orbit.spherical();
  assert!((after.radius - radius).abs() < 0.5);
  assert!((after.theta - theta - 0.1 * std::f32::consts::PI).abs() < 1.0e-3);
  assert_eq!(orbit.target(), Vec3::ZERO);
}

#[test]
fn releasing_a_key_stops_its_motion()
{
  let (mut keyboard, mut orbit) = sandbox();

  keyboard.press("w", false, false);
  frame(&keyboard, &mut orbit, 0.016);
  let moved = orbit.target();
  assert!(moved.length() > 0.0);

  keyboard.release("w", false, false);
  frame(&keyboard, &mut orbit, 0.016);
  frame(&keyboard, &mut orbit, 0.016);

  assert_eq!(orbit.target(), moved);
}

#[test]
fn press_edges_drive_projection_switches()
{
  let (mut keyboard, mut orbit) = sandbox();
  let requested: Rc<Cell<Option<Projection>>> = Rc::new(Cell::new(None));

  let ortho = requested.clone();
  let persp = requested.clone();
  let mut toggles = keyboard
    .on("v+e", move |_, _| ortho.set(Some(Camera::orthographic())))
    .on("v+q", move |_, _| persp.set(Some(Camera::perspective())));

  keyboard.press("e", false, false);
  frame(&keyboard, &mut orbit, 0.016);
  if let Some(projection) = requested.take()
  {
    orbit.camera_mut().set_projection(projection);
  }
  assert_eq!(orbit.camera().projection.name(), "orthographic");

  // Held frames do not re-fire a press edge.
  frame(&keyboard, &mut orbit, 0.016);
  assert!(requested.take().is_none());

  toggles.dispose();
  assert_eq!(keyboard.listener_count(), 10);
}

#[test]
fn keyboard_teardown_silences_the_controller()
{
  let (mut keyboard, mut orbit) = sandbox();
  frame(&keyboard, &mut orbit, 0.016);
  let before = orbit.camera().position();

  keyboard.dispose();
  keyboard.press("r", false, false);
  frame(&keyboard, &mut orbit, 0.016);

  assert!((orbit.camera().position() - before).length() < 1.0e-2);
  orbit.dispose();
}
