use glam::{IVec3, Vec3};

use super::voxel::{cell_bounds, VoxelModel};

//
// ──────────────────────────────────────────────────────────────
//   Ray picking
//
//   Targets, nearest wins:
//     ground → the square y = 0, seen from above only
//     voxels → each solid cell's axis-aligned box
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray
{
  pub origin: Vec3,
  /// Unit length, or zero for a degenerate ray.
  pub direction: Vec3,
}

impl Ray
{
  pub fn new(origin: Vec3, direction: Vec3) -> Self
  {
    Self { origin, direction: direction.normalize_or_zero() }
  }

  pub fn at(&self, t: f32) -> Vec3
  {
    self.origin + self.direction * t
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget
{
  Ground,
  Voxel(IVec3),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit
{
  pub point: Vec3,
  /// Outward normal of the face that was hit.
  pub normal: Vec3,
  pub distance: f32,
  pub target: HitTarget,
}

impl Hit
{
  /// Cell a new voxel would occupy if placed against this face.
  pub fn placement_cell(&self, model: &VoxelModel) -> IVec3
  {
    model.snap(self.point + self.normal * (model.cell_size() * 0.5))
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Public API
// ──────────────────────────────────────────────────────────────
//

/// Nearest hit against the ground square and every solid voxel.
pub fn pick(ray: &Ray, ground_half_extent: f32, model: &VoxelModel) -> Option<Hit>
{
  let ground = intersect_ground(ray, ground_half_extent);

  let voxels = model.iter().filter(|(_, voxel)| voxel.is_solid()).filter_map(|(cell, _)| {
    let (min, max) = cell_bounds(cell, model.cell_size());
    intersect_box(ray, min, max).map(|(distance, normal)| Hit {
      point: ray.at(distance),
      normal,
      distance,
      target: HitTarget::Voxel(cell),
    })
  });

  ground.into_iter().chain(voxels).min_by(|a, b| a.distance.total_cmp(&b.distance))
}

pub fn intersect_ground(ray: &Ray, half_extent: f32) -> Option<Hit>
{
  // Single-sided: only rays coming down from above the plane count.
  if ray.origin.y <= 0.0 || ray.direction.y >= -f32::EPSILON
  {
    return None;
  }

  let distance = -ray.origin.y / ray.direction.y;
  let point = ray.at(distance);

  if point.x.abs() > half_extent || point.z.abs() > half_extent
  {
    return None;
  }

  Some(Hit { point: Vec3::new(point.x, 0.0, point.z), normal: Vec3::Y, distance, target: HitTarget::Ground })
}

/// Slab test. Returns the entry distance and the normal of the entry face;
/// rays starting inside the box do not hit it.
pub fn intersect_box(ray: &Ray, min: Vec3, max: Vec3) -> Option<(f32, Vec3)>
{
  let mut t_enter = f32::NEG_INFINITY;
  let mut t_exit = f32::INFINITY;
  let mut normal = Vec3::ZERO;

  for axis in 0..3
  {
    let origin = ray.origin[axis];
    let dir = ray.direction[axis];

    if dir.abs() < f32::EPSILON
    {
      if origin < min[axis] || origin > max[axis]
      {
        return None;
      }
      continue;
    }

    let (mut near, mut far) = ((min[axis] - origin) / dir, (max[axis] - origin) / dir);
    let mut face = Vec3::ZERO;
    face[axis] = -dir.signum();

    if near > far
    {
      std::mem::swap(&mut near, &mut far);
    }

    if near > t_enter
    {
      t_enter = near;
      normal = face;
    }
    t_exit = t_exit.min(far);

    if t_enter > t_exit
    {
      return None;
    }
  }

  if t_enter < 0.0 || normal == Vec3::ZERO
  {
    return None;
  }

  Some((t_enter, normal))
}
