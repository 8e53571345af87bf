use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context;
use glam::{IVec3, Vec3};
use voxbox_core::{
  pick, Camera, KeyState, Keyboard, OrbitController, Palette, Projection, SandboxConfig, Subscription, Viewpoint,
  Voxel, VoxelModel,
};
use winit::{
  application::ApplicationHandler,
  event::WindowEvent,
  event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
  window::{Window, WindowId},
};

use crate::hud::{self, FrameTimer, HudStats};
use crate::input::{InputState, KeyTranslator};
use crate::renderer::Renderer;

pub fn run(config: SandboxConfig) -> anyhow::Result<()>
{
  let event_loop = EventLoop::new().context("failed to create event loop")?;
  let mut app = VoxboxApp::new(config);

  event_loop.run_app(&mut app).context("event loop failed")?;

  match app.error.take()
  {
    Some(err) => Err(err),
    None => Ok(()),
  }
}

struct VoxboxApp
{
  config: SandboxConfig,
  window: Option<Arc<Window>>,
  renderer: Option<Renderer>,

  keyboard: Keyboard,
  orbit: OrbitController,
  keys: KeyTranslator,
  input: InputState,
  timer: FrameTimer,

  // Filled by the q / e press edges, applied at the start of the next frame
  requested_projection: Rc<Cell<Option<Projection>>>,
  projection_keys: Subscription,

  model: VoxelModel,
  palette: Palette,
  hover: Option<IVec3>,

  error: Option<anyhow::Error>,
}

impl VoxboxApp
{
  fn new(config: SandboxConfig) -> Self
  {
    let keyboard = Keyboard::new();

    let mut camera = Camera::new(16.0 / 9.0);
    camera.set_position(config.camera_position());
    camera.look_at(Vec3::ZERO);

    let orbit = OrbitController::new(camera, &keyboard, config.orbit);

    let requested_projection = Rc::new(Cell::new(None));
    let projection_keys = bind_projection_keys(&keyboard, &requested_projection);

    let model = config.voxel_model();
    let palette = config.palette();

    Self {
      config,
      window: None,
      renderer: None,
      keyboard,
      orbit,
      keys: KeyTranslator::new(),
      input: InputState::new(),
      timer: FrameTimer::new(),
      requested_projection,
      projection_keys,
      model,
      palette,
      hover: None,
      error: None,
    }
  }

  fn init_window_and_renderer(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()>
  {
    if self.window.is_some()
    {
      return Ok(());
    }

    let attrs = Window::default_attributes().with_title(self.config.title.clone());
    let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);

    let size = window.inner_size();
    if size.width > 0 && size.height > 0
    {
      self.orbit.camera_mut().set_aspect(size.width as f32 / size.height as f32);
    }

    let renderer = pollster::block_on(Renderer::new(window.clone(), &self.config, self.orbit.camera()))?;
    log::info!("app: {}x{} window ready", size.width, size.height);

    window.request_redraw();
    self.window = Some(window);
    self.renderer = Some(renderer);

    Ok(())
  }

  fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error)
  {
    log::error!("app: {err:#}");
    self.error = Some(err);
    event_loop.exit();
  }

  fn handle_window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent)
  {
    match &self.window
    {
      Some(w) if w.id() == window_id =>
      {}
      _ => return,
    }

    let consumed = match &mut self.renderer
    {
      Some(renderer) => renderer.gui_event(&event),
      None => false,
    };

    match event
    {
      WindowEvent::CloseRequested =>
      {
        log::info!("app: closing with {} voxel(s) placed", self.model.len());
        self.projection_keys.dispose();
        self.orbit.dispose();
        self.keyboard.dispose();
        event_loop.exit();
      }

      WindowEvent::Resized(size) =>
      {
        if size.width == 0 || size.height == 0
        {
          return;
        }

        if let Some(renderer) = &mut self.renderer
        {
          renderer.resize(size.width, size.height);
        }
        self.orbit.camera_mut().set_aspect(size.width as f32 / size.height as f32);
      }

      WindowEvent::Focused(false) =>
      {
        self.keyboard.release_all();
      }

      WindowEvent::ModifiersChanged(modifiers) =>
      {
        self.keys.set_modifiers(modifiers.state());
      }

      WindowEvent::KeyboardInput { event, .. } =>
      {
        if let Some(input) = self.keys.translate(&event)
        {
          // Releases always go through so a key pressed before the HUD
          // took focus cannot stay held
          if !consumed || input.state == KeyState::Released
          {
            self.keyboard.handle(&input);
          }
        }
      }

      WindowEvent::CursorLeft { .. } =>
      {
        self.input.handle_event(&event);
      }

      WindowEvent::CursorMoved { .. } | WindowEvent::MouseInput { .. } =>
      {
        if !consumed
        {
          self.input.handle_event(&event);
        }
      }

      WindowEvent::RedrawRequested =>
      {
        if let Err(err) = self.frame()
        {
          self.fail(event_loop, err);
        }
      }

      _ =>
      {}
    }
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Frame
  //
  //   keyboard tick → controller update → picking → upload → draw
  // ──────────────────────────────────────────────────────────────
  //

  fn frame(&mut self) -> anyhow::Result<()>
  {
    let (Some(window), Some(renderer)) = (&self.window, &mut self.renderer)
    else
    {
      return Ok(());
    };

    let dt = self.timer.tick();

    self.keyboard.tick(dt);
    if let Some(projection) = self.requested_projection.take()
    {
      self.orbit.camera_mut().set_projection(projection);
    }
    self.orbit.update(dt);

    let wants_pointer = renderer.gui_wants_pointer();
    self.hover = if wants_pointer
    {
      None
    }
    else
    {
      hover_cell(&self.input, window, self.orbit.camera(), &self.config, &self.model)
    };

    if self.input.take_click() && !wants_pointer
    {
      if let Some(cell) = self.hover.take()
      {
        let color = self.palette.random(&mut rand::thread_rng());
        match self.model.insert(cell, Voxel::solid(color))
        {
          Ok(()) =>
          {
            log::debug!("app: placed #{color:06x} at {cell}");
            renderer.upload_voxels(&self.model);
          }
          Err(err) => log::warn!("app: {err}"),
        }
      }
    }

    renderer.set_rollover(self.hover.map(|cell| self.model.center(cell)), self.model.cell_size());
    renderer.update_camera(self.orbit.camera());

    let stats = HudStats {
      fps: self.timer.fps(),
      spherical: self.orbit.spherical(),
      target: self.orbit.target(),
      voxels: self.model.len(),
      projection: self.orbit.camera().projection.name(),
      hover: self.hover,
    };
    renderer.render(|ctx| hud::draw(ctx, &stats))?;

    window.request_redraw();
    Ok(())
  }
}

impl ApplicationHandler for VoxboxApp
{
  fn resumed(&mut self, event_loop: &ActiveEventLoop)
  {
    event_loop.set_control_flow(ControlFlow::Wait);

    if let Err(err) = self.init_window_and_renderer(event_loop)
    {
      self.fail(event_loop, err);
    }
  }

  fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent)
  {
    self.handle_window_event(event_loop, window_id, event);
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Helpers
// ──────────────────────────────────────────────────────────────
//

fn bind_projection_keys(keyboard: &Keyboard, requested: &Rc<Cell<Option<Projection>>>) -> Subscription
{
  let perspective = requested.clone();
  let orthographic = requested.clone();

  keyboard
    .on("v+q", move |_, _| perspective.set(Some(Camera::perspective())))
    .on("v+e", move |_, _| orthographic.set(Some(Camera::orthographic())))
}

/// Free, in-bounds cell under the cursor, if any.
fn hover_cell(
  input: &InputState,
  window: &Window,
  camera: &Camera,
  config: &SandboxConfig,
  model: &VoxelModel,
) -> Option<IVec3>
{
  let ndc = input.cursor_ndc(window.inner_size())?;
  let hit = pick(&camera.ray_from_ndc(ndc), config.ground_half_extent, model)?;
  let cell = hit.placement_cell(model);

  (model.in_bounds(cell) && !model.contains(cell)).then_some(cell)
}
