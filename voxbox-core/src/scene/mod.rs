mod picking;
mod voxel;

pub use picking::{intersect_box, intersect_ground, pick, Hit, HitTarget, Ray};
pub use voxel::{cell_bounds, cell_center, snap_to_cell, InsertError, Palette, Voxel, VoxelModel, PASTELS};
