//! Window- and GPU-free core of the voxbox sandbox.
//!
//! - [`input`]: shortcut parsing and the keyboard dispatch engine
//! - [`camera`]: camera, spherical maths and the orbit-pan controller
//! - [`scene`]: voxel grid, voxel store and ray picking
//! - [`config`]: startup settings

pub mod camera;
pub mod config;
pub mod input;
pub mod scene;

pub use camera::{Camera, OrbitController, OrbitSettings, OrbitSettingsError, Projection, Spherical, Viewpoint};
pub use config::{ConfigError, SandboxConfig};
pub use input::{parse_shortcut, KeyCombination, KeyInput, KeyState, Keyboard, Phase, Subscription};
pub use scene::{pick, Hit, HitTarget, Palette, Ray, Voxel, VoxelModel};
