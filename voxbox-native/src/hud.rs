use std::time::Instant;

use glam::{IVec3, Vec3};
use voxbox_core::Spherical;

//
// ──────────────────────────────────────────────────────────────
//   Frame timing
// ──────────────────────────────────────────────────────────────
//

// Longest step handed to the simulation; keeps a stalled window from
// flinging the camera on the next frame
const MAX_STEP: f32 = 0.1;

pub struct FrameTimer
{
  last: Instant,
  fps: f32,
}

impl FrameTimer
{
  pub fn new() -> Self
  {
    Self { last: Instant::now(), fps: 0.0 }
  }

  /// Seconds since the previous call, clamped.
  pub fn tick(&mut self) -> f32
  {
    let now = Instant::now();
    let dt = now.duration_since(self.last).as_secs_f32();
    self.last = now;

    if dt > 0.0
    {
      let instant = 1.0 / dt;
      self.fps = if self.fps == 0.0 { instant } else { self.fps * 0.95 + instant * 0.05 };
    }

    dt.min(MAX_STEP)
  }

  pub fn fps(&self) -> f32
  {
    self.fps
  }
}

//
// ──────────────────────────────────────────────────────────────
//   HUD
// ──────────────────────────────────────────────────────────────
//

pub struct HudStats
{
  pub fps: f32,
  pub spherical: Spherical,
  pub target: Vec3,
  pub voxels: usize,
  pub projection: &'static str,
  pub hover: Option<IVec3>,
}

const HINTS: &[(&str, &str)] = &[
  ("w a s d", "pan"),
  ("shift + w a s d", "orbit"),
  ("r / f", "zoom in / out"),
  ("q / e", "perspective / orthographic"),
  ("click", "place voxel"),
];

pub fn draw(ctx: &egui::Context, stats: &HudStats)
{
  egui::Window::new("voxbox")
    .anchor(egui::Align2::LEFT_TOP, [8.0, 8.0])
    .resizable(false)
    .collapsible(true)
    .show(ctx, |ui| {
      ui.label(format!("{:.0} fps", stats.fps));
      ui.separator();

      let s = stats.spherical;
      ui.monospace(format!("radius {:>8.1}", s.radius));
      ui.monospace(format!("phi    {:>8.1}°", s.phi.to_degrees()));
      ui.monospace(format!("theta  {:>8.1}°", s.theta.to_degrees()));
      ui.monospace(format!("target {:.0} {:.0} {:.0}", stats.target.x, stats.target.y, stats.target.z));
      ui.separator();

      ui.label(format!("{} projection", stats.projection));
      ui.label(format!("{} voxels", stats.voxels));
      match stats.hover
      {
        Some(cell) => ui.label(format!("cell {} {} {}", cell.x, cell.y, cell.z)),
        None => ui.label("cell -"),
      };

      ui.collapsing("keys", |ui| {
        egui::Grid::new("hints").striped(true).show(ui, |ui| {
          for (keys, action) in HINTS
          {
            ui.monospace(*keys);
            ui.label(*action);
            ui.end_row();
          }
        });
      });
    });
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn steps_are_clamped()
  {
    let mut timer = FrameTimer::new();
    timer.last -= std::time::Duration::from_secs(5);

    assert_eq!(timer.tick(), MAX_STEP);
    assert!(timer.fps() > 0.0);
  }
}
