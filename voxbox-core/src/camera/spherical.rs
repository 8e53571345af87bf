use glam::Vec3;

//
// ──────────────────────────────────────────────────────────────
//   Spherical coordinates (Y-up)
//
//   Coordinate system used by the orbit maths:
//     Y → up
//     X, Z → ground plane
//
//   radius = distance from the origin
//   phi    = polar angle measured down from +Y (radians)
//   theta  = azimuth around +Y, measured from +Z towards +X (radians)
// ──────────────────────────────────────────────────────────────
//

/// Closest the polar angle may get to either pole.
pub const POLE_EPSILON: f32 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spherical
{
  pub radius: f32,
  pub phi: f32,
  pub theta: f32,
}

impl Spherical
{
  pub const ZERO: Self = Self { radius: 0.0, phi: 0.0, theta: 0.0 };

  pub fn new(radius: f32, phi: f32, theta: f32) -> Self
  {
    Self { radius, phi, theta }
  }

  pub fn from_vec3(v: Vec3) -> Self
  {
    let radius = v.length();
    if radius == 0.0
    {
      return Self::ZERO;
    }

    Self { radius, phi: (v.y / radius).clamp(-1.0, 1.0).acos(), theta: v.x.atan2(v.z) }
  }

  pub fn to_vec3(self) -> Vec3
  {
    let sin_phi_radius = self.phi.sin() * self.radius;

    Vec3::new(sin_phi_radius * self.theta.sin(), self.phi.cos() * self.radius, sin_phi_radius * self.theta.cos())
  }

  /// Keep phi off the poles so the up vector never degenerates.
  pub fn make_safe(&mut self)
  {
    self.phi = self.phi.clamp(POLE_EPSILON, std::f32::consts::PI - POLE_EPSILON);
  }

  pub fn is_zero(&self) -> bool
  {
    *self == Self::ZERO
  }
}

impl std::ops::AddAssign for Spherical
{
  fn add_assign(&mut self, rhs: Self)
  {
    self.radius += rhs.radius;
    self.phi += rhs.phi;
    self.theta += rhs.theta;
  }
}

#[cfg(test)]
mod tests
{
  use super::*;
  use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

  fn close(a: Vec3, b: Vec3) -> bool
  {
    (a - b).length() < 1.0e-3
  }

  #[test]
  fn axes_map_to_expected_angles()
  {
    let up = Spherical::from_vec3(Vec3::Y * 5.0);
    assert_eq!(up.radius, 5.0);
    assert!(up.phi.abs() < 1.0e-6);

    let front = Spherical::from_vec3(Vec3::Z * 2.0);
    assert!((front.phi - FRAC_PI_2).abs() < 1.0e-6);
    assert!(front.theta.abs() < 1.0e-6);

    let right = Spherical::from_vec3(Vec3::X);
    assert!((right.theta - FRAC_PI_2).abs() < 1.0e-6);
  }

  #[test]
  fn converts_back_to_the_same_point()
  {
    let p = Vec3::new(500.0, 800.0, 1300.0);
    assert!(close(Spherical::from_vec3(p).to_vec3(), p));

    let s = Spherical::new(3.0, FRAC_PI_4, -PI / 3.0);
    let back = Spherical::from_vec3(s.to_vec3());
    assert!((back.radius - s.radius).abs() < 1.0e-4);
    assert!((back.phi - s.phi).abs() < 1.0e-4);
    assert!((back.theta - s.theta).abs() < 1.0e-4);
  }

  #[test]
  fn origin_is_zero()
  {
    assert!(Spherical::from_vec3(Vec3::ZERO).is_zero());
  }

  #[test]
  fn make_safe_clamps_both_poles()
  {
    let mut s = Spherical::new(1.0, -1.0, 0.0);
    s.make_safe();
    assert!(s.phi > 0.0);

    s.phi = PI + 1.0;
    s.make_safe();
    assert!(s.phi < PI);
  }
}
