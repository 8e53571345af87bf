use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec3;
use voxbox_core::{Camera, SandboxConfig, VoxelModel};
use winit::event::WindowEvent;
use winit::window::Window;

use super::depth::DepthResources;
use super::grid::GroundMesh;
use super::gui::GuiRenderer;
use super::srgb_to_linear;
use super::uniform::CameraBinding;
use super::voxels::VoxelMesh;

pub struct Renderer
{
  window: Arc<Window>,
  surface: wgpu::Surface<'static>,
  device: wgpu::Device,
  queue: wgpu::Queue,
  config: wgpu::SurfaceConfiguration,

  depth: DepthResources,
  camera: CameraBinding,
  clear: wgpu::Color,

  ground: GroundMesh,
  voxels: VoxelMesh,
  gui: GuiRenderer,
}

//
// ──────────────────────────────────────────────────────────────
//   Public API
// ──────────────────────────────────────────────────────────────
//

impl Renderer
{
  pub async fn new(window: Arc<Window>, settings: &SandboxConfig, camera: &Camera) -> Result<Self>
  {
    let instance = wgpu::Instance::default();
    let surface = instance.create_surface(window.clone()).context("failed to create surface")?;

    let adapter = request_adapter(&instance, &surface).await?;
    let (device, queue) = request_device(&adapter).await?;

    let config = configure_surface(&window, &surface, &adapter, &device)?;
    let depth = DepthResources::create(&device, &config);

    let camera_binding = CameraBinding::create(&device);
    camera_binding.update(&queue, camera);

    let ground = GroundMesh::create(
      &device,
      config.format,
      &camera_binding.layout,
      settings.ground_half_extent,
      settings.grid_divisions,
    );
    let voxels = VoxelMesh::create(&device, config.format, &camera_binding.layout);
    let gui = GuiRenderer::new(&device, config.format, &window);

    let [r, g, b] = srgb_to_linear(settings.background);
    let clear = wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 };

    Ok(Self {
      window,
      surface,
      device,
      queue,
      config,
      depth,
      camera: camera_binding,
      clear,
      ground,
      voxels,
      gui,
    })
  }

  pub fn resize(&mut self, width: u32, height: u32)
  {
    if width == 0 || height == 0
    {
      return;
    }

    self.config.width = width;
    self.config.height = height;
    self.surface.configure(&self.device, &self.config);
    self.depth.resize(&self.device, &self.config);
  }

  pub fn update_camera(&self, camera: &Camera)
  {
    self.camera.update(&self.queue, camera);
  }

  pub fn upload_voxels(&mut self, model: &VoxelModel)
  {
    self.voxels.upload(&self.device, &self.queue, model);
  }

  pub fn set_rollover(&mut self, center: Option<Vec3>, size: f32)
  {
    self.voxels.set_rollover(&self.queue, center, size);
  }

  /// True when the HUD consumed the event.
  pub fn gui_event(&mut self, event: &WindowEvent) -> bool
  {
    self.gui.on_window_event(&self.window, event)
  }

  pub fn gui_wants_pointer(&self) -> bool
  {
    self.gui.wants_pointer()
  }

  /// Draws one frame. A lost or outdated surface is reconfigured and the
  /// frame skipped; only running out of memory is an error.
  pub fn render(&mut self, hud: impl FnMut(&egui::Context)) -> Result<()>
  {
    let frame = match self.surface.get_current_texture()
    {
      Ok(frame) => frame,
      Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) =>
      {
        log::debug!("renderer: surface lost, reconfiguring");
        self.surface.configure(&self.device, &self.config);
        return Ok(());
      }
      Err(wgpu::SurfaceError::OutOfMemory) =>
      {
        anyhow::bail!("renderer: out of GPU memory");
      }
      Err(err) =>
      {
        log::warn!("renderer: skipping frame: {err}");
        return Ok(());
      }
    };

    let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Render Encoder") });

    self.record_scene_pass(&mut encoder, &view);
    self.gui.render(&self.device, &self.queue, &mut encoder, &self.window, &view, hud);

    self.queue.submit(Some(encoder.finish()));
    self.window.pre_present_notify();
    frame.present();

    Ok(())
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Render Pass
  // ──────────────────────────────────────────────────────────────
  //

  fn record_scene_pass(&self, encoder: &mut wgpu::CommandEncoder, color_view: &wgpu::TextureView)
  {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
      label: Some("Scene Pass"),
      color_attachments: &[Some(wgpu::RenderPassColorAttachment {
        view: color_view,
        resolve_target: None,
        ops: wgpu::Operations { load: wgpu::LoadOp::Clear(self.clear), store: wgpu::StoreOp::Store },
        depth_slice: None,
      })],
      depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
        view: &self.depth.view,
        depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
        stencil_ops: None,
      }),
      occlusion_query_set: None,
      timestamp_writes: None,
    });

    pass.set_bind_group(0, &self.camera.bind_group, &[]);

    // Opaque first; the rollover cube blends over both
    self.ground.draw(&mut pass);
    self.voxels.draw(&mut pass);
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Initialization Helpers
// ──────────────────────────────────────────────────────────────
//

async fn request_adapter(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> Result<wgpu::Adapter>
{
  let adapter = instance
    .request_adapter(&wgpu::RequestAdapterOptions {
      power_preference: wgpu::PowerPreference::HighPerformance,
      compatible_surface: Some(surface),
      force_fallback_adapter: false,
    })
    .await
    .context("no suitable GPU adapter found")?;

  let info = adapter.get_info();
  log::info!("renderer: using {} ({:?})", info.name, info.backend);

  Ok(adapter)
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)>
{
  adapter
    .request_device(&wgpu::DeviceDescriptor { label: Some("Voxbox Device"), ..Default::default() })
    .await
    .context("failed to create device")
}

fn configure_surface(
  window: &Window,
  surface: &wgpu::Surface<'_>,
  adapter: &wgpu::Adapter,
  device: &wgpu::Device,
) -> Result<wgpu::SurfaceConfiguration>
{
  let size = window.inner_size();
  let caps = surface.get_capabilities(adapter);

  let format = caps
    .formats
    .iter()
    .copied()
    .find(|f| f.is_srgb())
    .or_else(|| caps.formats.first().copied())
    .context("surface reports no formats")?;

  if !format.is_srgb()
  {
    log::warn!("renderer: no sRGB surface format, colours will look dark");
  }

  let config = wgpu::SurfaceConfiguration {
    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
    format,
    width: size.width.max(1),
    height: size.height.max(1),
    present_mode: wgpu::PresentMode::Fifo,
    alpha_mode: caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
    view_formats: vec![],
    desired_maximum_frame_latency: 2,
  };

  surface.configure(device, &config);

  Ok(config)
}
