use std::collections::HashMap;

use glam::{IVec3, Vec3};
use rand::Rng;
use thiserror::Error;

//
// ──────────────────────────────────────────────────────────────
//   Voxels
//
//   World space is cut into cubes of `cell_size`. Cell (0, 0, 0)
//   spans [0, size) on every axis; its centre sits at size / 2.
// ──────────────────────────────────────────────────────────────
//

/// A single placed cube: 0xRRGGBB colour plus a byte of flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voxel
{
  pub color: u32,
  pub flags: u8,
}

impl Voxel
{
  /// Takes part in picking, so new cubes can be stacked on it.
  pub const SOLID: u8 = 0b0000_0001;

  pub fn solid(color: u32) -> Self
  {
    Self { color, flags: Self::SOLID }
  }

  pub fn is_solid(&self) -> bool
  {
    self.flags & Self::SOLID != 0
  }

  /// Colour as linear-ish 0..1 floats for the GPU.
  pub fn rgb(&self) -> [f32; 3]
  {
    [
      ((self.color >> 16) & 0xff) as f32 / 255.0,
      ((self.color >> 8) & 0xff) as f32 / 255.0,
      (self.color & 0xff) as f32 / 255.0,
    ]
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsertError
{
  #[error("cell {0} is outside the model bounds")]
  OutOfBounds(IVec3),

  #[error("cell {0} is already occupied")]
  Occupied(IVec3),
}

//
// ──────────────────────────────────────────────────────────────
//   Grid helpers
// ──────────────────────────────────────────────────────────────
//

pub fn snap_to_cell(point: Vec3, cell_size: f32) -> IVec3
{
  (point / cell_size).floor().as_ivec3()
}

pub fn cell_center(cell: IVec3, cell_size: f32) -> Vec3
{
  (cell.as_vec3() + Vec3::splat(0.5)) * cell_size
}

pub fn cell_bounds(cell: IVec3, cell_size: f32) -> (Vec3, Vec3)
{
  let min = cell.as_vec3() * cell_size;
  (min, min + Vec3::splat(cell_size))
}

//
// ──────────────────────────────────────────────────────────────
//   VoxelModel
// ──────────────────────────────────────────────────────────────
//

/// Sparse set of placed voxels inside an inclusive cell box.
#[derive(Debug, Clone)]
pub struct VoxelModel
{
  cell_size: f32,
  min: IVec3,
  max: IVec3,
  cells: HashMap<IVec3, Voxel>,
}

impl VoxelModel
{
  pub fn new(cell_size: f32, min: IVec3, max: IVec3) -> Self
  {
    Self { cell_size, min: min.min(max), max: min.max(max), cells: HashMap::new() }
  }

  /// Model covering a square ground of `half_extent` either side of the
  /// origin, as tall as it is wide.
  pub fn for_ground(cell_size: f32, half_extent: f32) -> Self
  {
    let cells = (half_extent / cell_size).ceil() as i32;
    Self::new(cell_size, IVec3::new(-cells, 0, -cells), IVec3::new(cells - 1, 2 * cells - 1, cells - 1))
  }

  pub fn cell_size(&self) -> f32
  {
    self.cell_size
  }

  pub fn bounds(&self) -> (IVec3, IVec3)
  {
    (self.min, self.max)
  }

  pub fn in_bounds(&self, cell: IVec3) -> bool
  {
    cell.cmpge(self.min).all() && cell.cmple(self.max).all()
  }

  pub fn insert(&mut self, cell: IVec3, voxel: Voxel) -> Result<(), InsertError>
  {
    if !self.in_bounds(cell)
    {
      return Err(InsertError::OutOfBounds(cell));
    }
    if self.cells.contains_key(&cell)
    {
      return Err(InsertError::Occupied(cell));
    }

    self.cells.insert(cell, voxel);
    Ok(())
  }

  pub fn remove(&mut self, cell: IVec3) -> Option<Voxel>
  {
    self.cells.remove(&cell)
  }

  pub fn get(&self, cell: IVec3) -> Option<&Voxel>
  {
    self.cells.get(&cell)
  }

  pub fn contains(&self, cell: IVec3) -> bool
  {
    self.cells.contains_key(&cell)
  }

  pub fn len(&self) -> usize
  {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool
  {
    self.cells.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (IVec3, &Voxel)>
  {
    self.cells.iter().map(|(cell, voxel)| (*cell, voxel))
  }

  pub fn snap(&self, point: Vec3) -> IVec3
  {
    snap_to_cell(point, self.cell_size)
  }

  pub fn center(&self, cell: IVec3) -> Vec3
  {
    cell_center(cell, self.cell_size)
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Palette
// ──────────────────────────────────────────────────────────────
//

pub const PASTELS: [u32; 6] = [0xff9aa2, 0xffb7b2, 0xffdac1, 0xe2f0cb, 0xb5ead7, 0xc7ceea];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette
{
  colors: Vec<u32>,
}

impl Default for Palette
{
  fn default() -> Self
  {
    Self { colors: PASTELS.to_vec() }
  }
}

impl Palette
{
  /// Falls back to the default pastels when `colors` is empty.
  pub fn new(colors: Vec<u32>) -> Self
  {
    if colors.is_empty()
    {
      return Self::default();
    }
    Self { colors }
  }

  pub fn len(&self) -> usize
  {
    self.colors.len()
  }

  pub fn is_empty(&self) -> bool
  {
    self.colors.is_empty()
  }

  /// Colour at `index`, wrapping around.
  pub fn get(&self, index: usize) -> u32
  {
    self.colors[index % self.colors.len()]
  }

  pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> u32
  {
    self.colors[rng.gen_range(0..self.colors.len())]
  }

  pub fn colors(&self) -> &[u32]
  {
    &self.colors
  }
}
