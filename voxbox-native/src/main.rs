mod app;
mod hud;
mod input;
mod renderer;

use anyhow::Context;
use voxbox_core::SandboxConfig;

fn main() -> anyhow::Result<()>
{
  // RUST_LOG overrides; wgpu_hal is very chatty at info
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,wgpu_hal=off,naga=warn")).init();

  let path = SandboxConfig::default_path();
  let config = SandboxConfig::load_or_default(&path).with_context(|| format!("loading {}", path.display()))?;

  app::run(config)
}
