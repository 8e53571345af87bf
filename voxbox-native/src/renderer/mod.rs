mod core;
mod depth;
mod grid;
mod gui;
mod uniform;
mod voxels;

pub use self::core::Renderer;

/// Converts an sRGB colour to linear, for sRGB render targets.
pub fn srgb_to_linear(rgb: [f32; 3]) -> [f32; 3]
{
  rgb.map(|c| if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) })
}
