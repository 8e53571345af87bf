use glam::Vec2;
use voxbox_core::{KeyInput, KeyState};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::keyboard::{Key, ModifiersState, NamedKey};

//
// ──────────────────────────────────────────────────────────────
//   Keyboard translation
//
//   winit key events → KeyInput for the core keyboard. Names are
//   lowercase: characters as typed, "shift", "ctrl", and any other
//   named key by its winit name ("escape", "arrowup", ...).
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Default)]
pub struct KeyTranslator
{
  modifiers: ModifiersState,
}

impl KeyTranslator
{
  pub fn new() -> Self
  {
    Self::default()
  }

  pub fn set_modifiers(&mut self, modifiers: ModifiersState)
  {
    self.modifiers = modifiers;
  }

  /// None for auto-repeat and for keys with no usable name.
  pub fn translate(&self, event: &KeyEvent) -> Option<KeyInput>
  {
    translate_key(&event.logical_key, event.state, event.repeat, self.modifiers)
  }
}

pub fn key_name(key: &Key) -> Option<String>
{
  match key
  {
    Key::Named(NamedKey::Shift) => Some("shift".to_string()),
    Key::Named(NamedKey::Control) => Some("ctrl".to_string()),
    Key::Named(named) => Some(format!("{named:?}").to_lowercase()),
    Key::Character(text) => Some(text.to_lowercase()),
    _ => None,
  }
}

fn translate_key(key: &Key, state: ElementState, repeat: bool, modifiers: ModifiersState) -> Option<KeyInput>
{
  if repeat
  {
    return None;
  }

  let key = key_name(key)?;
  let pressed = state == ElementState::Pressed;

  // A modifier's own edge reports its new state; ModifiersChanged lags behind it
  let shift = if key == "shift" { pressed } else { modifiers.shift_key() };
  let ctrl = if key == "ctrl" { pressed } else { modifiers.control_key() };

  let state = if pressed { KeyState::Pressed } else { KeyState::Released };
  Some(KeyInput { key, shift, ctrl, state })
}

//
// ──────────────────────────────────────────────────────────────
//   Pointer
// ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Default)]
pub struct InputState
{
  /// Physical pixels, None while the cursor is outside the window.
  pub cursor: Option<Vec2>,
  clicked: bool,
}

impl InputState
{
  pub fn new() -> Self
  {
    Self::default()
  }

  pub fn handle_event(&mut self, event: &WindowEvent)
  {
    match event
    {
      WindowEvent::CursorMoved { position, .. } =>
      {
        self.cursor = Some(Vec2::new(position.x as f32, position.y as f32));
      }

      WindowEvent::CursorLeft { .. } =>
      {
        self.cursor = None;
      }

      WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } =>
      {
        self.clicked = true;
      }

      _ =>
      {}
    }
  }

  /// True once per left click.
  pub fn take_click(&mut self) -> bool
  {
    std::mem::take(&mut self.clicked)
  }

  /// Cursor in normalised device coordinates, +Y up.
  pub fn cursor_ndc(&self, size: PhysicalSize<u32>) -> Option<Vec2>
  {
    if size.width == 0 || size.height == 0
    {
      return None;
    }

    self.cursor.map(|p| {
      Vec2::new(2.0 * p.x / size.width as f32 - 1.0, 1.0 - 2.0 * p.y / size.height as f32)
    })
  }
}
