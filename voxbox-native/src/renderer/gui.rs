use egui_wgpu::{Renderer, RendererOptions, ScreenDescriptor};
use egui_winit::State;
use winit::event::WindowEvent;
use winit::window::Window;

pub struct GuiRenderer
{
  context: egui::Context,
  state: State,
  renderer: Renderer,
}

impl GuiRenderer
{
  pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, window: &Window) -> Self
  {
    let context = egui::Context::default();
    let state = State::new(
      context.clone(),
      egui::viewport::ViewportId::ROOT,
      window,
      Some(window.scale_factor() as f32),
      None,
      None,
    );

    let renderer = Renderer::new(
      device,
      output_format,
      RendererOptions {
        depth_stencil_format: None,
        msaa_samples: 1,
        predictable_texture_filtering: false,
        dithering: true,
      },
    );

    Self { context, state, renderer }
  }

  /// Feeds a window event to egui. True when egui wants it for itself.
  pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool
  {
    self.state.on_window_event(window, event).consumed
  }

  pub fn wants_pointer(&self) -> bool
  {
    self.context.wants_pointer_input()
  }

  /// Runs one egui pass and paints it on top of `view`.
  pub fn render(
    &mut self,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    window: &Window,
    view: &wgpu::TextureView,
    mut ui: impl FnMut(&egui::Context),
  )
  {
    let raw_input = self.state.take_egui_input(window);
    let mut full_output = self.context.run(raw_input, |ctx| ui(ctx));
    self.state.handle_platform_output(window, std::mem::take(&mut full_output.platform_output));

    let size = window.inner_size();
    let ppp = full_output.pixels_per_point;
    let screen_descriptor = ScreenDescriptor { size_in_pixels: [size.width, size.height], pixels_per_point: ppp };

    for (id, delta) in full_output.textures_delta.set
    {
      self.renderer.update_texture(device, queue, id, &delta);
    }

    let tris = self.context.tessellate(full_output.shapes, ppp);
    self.renderer.update_buffers(device, queue, encoder, &tris, &screen_descriptor);
    self.paint(encoder, view, &tris, &screen_descriptor);

    for id in full_output.textures_delta.free
    {
      self.renderer.free_texture(&id);
    }
  }

  /// HUD pass over the finished scene, colour loaded not cleared.
  fn paint(
    &self,
    encoder: &mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    tris: &[egui::ClippedPrimitive],
    screen: &ScreenDescriptor,
  )
  {
    let mut pass = encoder
      .begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Hud Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
          view,
          resolve_target: None,
          ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
          depth_slice: None,
        })],
        ..Default::default()
      })
      .forget_lifetime();

    self.renderer.render(&mut pass, tris, screen);
  }
}
