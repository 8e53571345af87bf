use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};

use super::combo::{ComboId, KeyCombination, Phase};

//
// ──────────────────────────────────────────────────────────────
//   Keyboard dispatch
//
//   Two paths feed the same registry:
//     edges  → press()/release(), fired once with elapsed = 0
//     held   → tick(), fired every frame for each key still down
//
//   Every dispatch is gated on an exact modifier match against the
//   pressed set. Shift/ctrl are themselves just keys in that set.
// ──────────────────────────────────────────────────────────────
//

const SHIFT_KEY: &str = "shift";
const CTRL_KEY: &str = "ctrl";

pub type KeyCallback = Box<dyn FnMut(f32, &KeyCombination)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Direction of a raw key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState
{
  Pressed,
  Released,
}

/// One raw key transition as delivered by the host window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput
{
  pub key: String,
  pub shift: bool,
  pub ctrl: bool,
  pub state: KeyState,
}

//
// ──────────────────────────────────────────────────────────────
//   Registry
// ──────────────────────────────────────────────────────────────
//

struct Listener
{
  id: ListenerId,
  live: Cell<bool>,
  callback: RefCell<KeyCallback>,
}

#[derive(Default)]
struct Registry
{
  next_id: u64,
  listeners: HashMap<ComboId, Vec<Rc<Listener>>>,
  /// Set once the owning keyboard is disposed; no further inserts.
  closed: bool,
}

impl Registry
{
  fn insert(&mut self, combo: ComboId, callback: KeyCallback) -> ListenerId
  {
    let id = ListenerId(self.next_id);
    self.next_id += 1;

    let listener = Rc::new(Listener { id, live: Cell::new(true), callback: RefCell::new(callback) });
    self.listeners.entry(combo).or_default().push(listener);

    id
  }

  fn remove(&mut self, combo: &ComboId, id: ListenerId) -> bool
  {
    let Some(list) = self.listeners.get_mut(combo)
    else
    {
      return false;
    };

    let Some(at) = list.iter().position(|l| l.id == id)
    else
    {
      return false;
    };

    list.swap_remove(at).live.set(false);

    if list.is_empty()
    {
      self.listeners.remove(combo);
    }

    true
  }

  fn snapshot(&self, combo: &ComboId) -> Vec<Rc<Listener>>
  {
    self.listeners.get(combo).cloned().unwrap_or_default()
  }

  /// Drops every listener and refuses new ones.
  fn close(&mut self)
  {
    self.closed = true;
    self.clear();
  }

  fn clear(&mut self)
  {
    for listener in self.listeners.values().flatten()
    {
      listener.live.set(false);
    }
    self.listeners.clear();
  }

  fn len(&self) -> usize
  {
    self.listeners.values().map(Vec::len).sum()
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Subscription (dispose handle)
// ──────────────────────────────────────────────────────────────
//

/// Handle to one registration plus every registration chained before it.
///
/// Dropping a subscription leaves the registration in place; call
/// [`Subscription::dispose`] to remove it.
pub struct Subscription
{
  registry: Weak<RefCell<Registry>>,
  entry: Option<(ComboId, ListenerId)>,
  on_disposed: Option<Box<dyn FnOnce()>>,
  children: Vec<Subscription>,
}

impl Subscription
{
  /// Register a further combination on the same keyboard.
  ///
  /// The returned subscription owns `self`, so disposing it tears down the
  /// whole chain.
  pub fn on<K, F>(self, combo: K, callback: F) -> Subscription
  where
    K: Into<KeyCombination>,
    F: FnMut(f32, &KeyCombination) + 'static,
  {
    let mut next = subscribe(&self.registry, combo.into(), Box::new(callback), None);
    next.children.push(self);
    next
  }

  /// Remove this registration and everything chained before it.
  /// Calling it again does nothing.
  pub fn dispose(&mut self)
  {
    for mut child in self.children.drain(..)
    {
      child.dispose();
    }

    if let Some((combo, id)) = self.entry.take()
    {
      if let Some(registry) = self.registry.upgrade()
      {
        if registry.borrow_mut().remove(&combo, id)
        {
          log::debug!("keyboard: disposed listener {:?} on {}", id, combo);
        }
      }
    }

    if let Some(on_disposed) = self.on_disposed.take()
    {
      on_disposed();
    }
  }

  pub fn is_disposed(&self) -> bool
  {
    self.entry.is_none() && self.children.iter().all(Subscription::is_disposed)
  }
}

fn subscribe(
  registry: &Weak<RefCell<Registry>>,
  combo: KeyCombination,
  callback: KeyCallback,
  on_disposed: Option<Box<dyn FnOnce()>>,
) -> Subscription
{
  let id = combo.id();

  let entry = match registry.upgrade().filter(|registry| !registry.borrow().closed)
  {
    Some(registry) =>
    {
      let listener = registry.borrow_mut().insert(id.clone(), callback);
      log::debug!("keyboard: listener {:?} on {}", listener, combo);
      Some((id, listener))
    }
    None =>
    {
      log::debug!("keyboard: {} registered after teardown, ignoring", combo);
      None
    }
  };

  Subscription { registry: registry.clone(), entry, on_disposed, children: Vec::new() }
}

//
// ──────────────────────────────────────────────────────────────
//   Keyboard
// ──────────────────────────────────────────────────────────────
//

pub struct Keyboard
{
  pressed: BTreeSet<String>,
  registry: Rc<RefCell<Registry>>,
  attached: bool,
}

impl Default for Keyboard
{
  fn default() -> Self
  {
    Self::new()
  }
}

impl Keyboard
{
  pub fn new() -> Self
  {
    Self { pressed: BTreeSet::new(), registry: Rc::new(RefCell::new(Registry::default())), attached: true }
  }

  /// Register `callback` for `combo` (a [`KeyCombination`] or shortcut text).
  pub fn on<K, F>(&self, combo: K, callback: F) -> Subscription
  where
    K: Into<KeyCombination>,
    F: FnMut(f32, &KeyCombination) + 'static,
  {
    subscribe(&Rc::downgrade(&self.registry), combo.into(), Box::new(callback), None)
  }

  /// Like [`Keyboard::on`], running `on_disposed` once the registration is removed.
  pub fn on_with<K, F, D>(&self, combo: K, callback: F, on_disposed: D) -> Subscription
  where
    K: Into<KeyCombination>,
    F: FnMut(f32, &KeyCombination) + 'static,
    D: FnOnce() + 'static,
  {
    subscribe(&Rc::downgrade(&self.registry), combo.into(), Box::new(callback), Some(Box::new(on_disposed)))
  }

  //
  // ── Raw edges ───────────────────────────────────────────────
  //

  pub fn handle(&mut self, input: &KeyInput)
  {
    match input.state
    {
      KeyState::Pressed => self.press(&input.key, input.shift, input.ctrl),
      KeyState::Released => self.release(&input.key, input.shift, input.ctrl),
    }
  }

  /// Key went down. The press edge sees the key as already pressed.
  pub fn press(&mut self, key: &str, shift: bool, ctrl: bool)
  {
    if !self.attached
    {
      return;
    }

    let key = key.to_lowercase();
    if !self.pressed.insert(key.clone())
    {
      log::trace!("keyboard: '{}' already down", key);
      return;
    }

    let combo = KeyCombination { key, shift, ctrl, phase: Phase::Press };
    self.dispatch(&combo, 0.0);
  }

  /// Key came up. The release edge still sees the key as pressed.
  pub fn release(&mut self, key: &str, shift: bool, ctrl: bool)
  {
    if !self.attached
    {
      return;
    }

    let key = key.to_lowercase();
    let combo = KeyCombination { key, shift, ctrl, phase: Phase::Release };
    self.dispatch(&combo, 0.0);

    self.pressed.remove(&combo.key);
  }

  /// Forget every held key without firing release edges (focus lost).
  pub fn release_all(&mut self)
  {
    if !self.pressed.is_empty()
    {
      log::debug!("keyboard: dropping {} held key(s)", self.pressed.len());
    }
    self.pressed.clear();
  }

  //
  // ── Per-frame ───────────────────────────────────────────────
  //

  /// Fire held callbacks for every key currently down.
  ///
  /// Modifiers come from the pressed set as a whole, not from the moment
  /// each key went down.
  pub fn tick(&self, elapsed: f32)
  {
    if !self.attached
    {
      return;
    }

    let shift = self.shift_held();
    let ctrl = self.ctrl_held();

    for key in &self.pressed
    {
      let combo = KeyCombination { key: key.clone(), shift, ctrl, phase: Phase::Held };
      self.dispatch(&combo, elapsed);
    }
  }

  //
  // ── State queries ───────────────────────────────────────────
  //

  /// Does `combo` agree with the keys down right now? Phase is ignored.
  pub fn matches(&self, combo: &KeyCombination) -> bool
  {
    self.is_pressed(&combo.key) && combo.shift == self.shift_held() && combo.ctrl == self.ctrl_held()
  }

  pub fn is_pressed(&self, key: &str) -> bool
  {
    self.pressed.contains(key)
  }

  pub fn shift_held(&self) -> bool
  {
    self.pressed.contains(SHIFT_KEY)
  }

  pub fn ctrl_held(&self) -> bool
  {
    self.pressed.contains(CTRL_KEY)
  }

  pub fn pressed(&self) -> impl Iterator<Item = &str>
  {
    self.pressed.iter().map(String::as_str)
  }

  pub fn listener_count(&self) -> usize
  {
    self.registry.borrow().len()
  }

  pub fn is_attached(&self) -> bool
  {
    self.attached
  }

  /// Detach from the host: drop every registration and stop dispatching.
  pub fn dispose(&mut self)
  {
    if !self.attached
    {
      return;
    }

    self.attached = false;
    self.registry.borrow_mut().close();
    self.pressed.clear();

    log::debug!("keyboard: detached");
  }

  //
  // ── Dispatch ────────────────────────────────────────────────
  //

  fn dispatch(&self, combo: &KeyCombination, elapsed: f32)
  {
    if !self.matches(combo)
    {
      return;
    }

    // Snapshot first so callbacks may register or dispose freely.
    let listeners = self.registry.borrow().snapshot(&combo.id());

    for listener in listeners
    {
      if !listener.live.get()
      {
        continue;
      }

      match listener.callback.try_borrow_mut()
      {
        Ok(mut callback) =>
        {
          log::trace!("keyboard: {} → {:?}", combo, listener.id);
          (*callback)(elapsed, combo);
        }
        Err(_) => log::trace!("keyboard: {:?} re-entered, skipped", listener.id),
      }
    }
  }
}

#[cfg(test)]
mod tests
{
  use super::*;

  fn counter() -> (Rc<Cell<u32>>, impl FnMut(f32, &KeyCombination) + 'static)
  {
    let hits = Rc::new(Cell::new(0));
    let inner = hits.clone();
    (hits, move |_, _: &KeyCombination| inner.set(inner.get() + 1))
  }

  #[test]
  fn press_edge_requires_exact_modifiers()
  {
    let mut keyboard = Keyboard::new();
    let (plain, plain_cb) = counter();
    let (shifted, shifted_cb) = counter();

    let _a = keyboard.on(KeyCombination::new("a").with_phase(Phase::Press), plain_cb);
    let _b = keyboard.on("shift+v+a", shifted_cb);

    keyboard.press("shift", true, false);
    keyboard.press("a", true, false);

    assert_eq!(plain.get(), 0);
    assert_eq!(shifted.get(), 1);
  }

  #[test]
  fn press_edge_passes_zero_elapsed_and_the_combo()
  {
    let mut keyboard = Keyboard::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();

    let _sub = keyboard.on("v+q", move |elapsed, combo: &KeyCombination| {
      sink.borrow_mut().push((elapsed, combo.clone()));
    });

    keyboard.press("Q", false, false);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, 0.0);
    assert_eq!(seen[0].1, KeyCombination::new("q").with_phase(Phase::Press));
  }

  #[test]
  fn release_edge_fires_before_key_is_removed()
  {
    let mut keyboard = Keyboard::new();
    let (released, cb) = counter();
    let _sub = keyboard.on("^+a", cb);

    keyboard.press("a", false, false);
    assert!(keyboard.is_pressed("a"));

    keyboard.release("a", false, false);
    assert_eq!(released.get(), 1);
    assert!(!keyboard.is_pressed("a"));
  }

  #[test]
  fn duplicate_press_is_harmless()
  {
    let mut keyboard = Keyboard::new();
    let (pressed, cb) = counter();
    let _sub = keyboard.on("v+a", cb);

    keyboard.press("a", false, false);
    keyboard.press("a", false, false);

    assert_eq!(pressed.get(), 1);
    assert_eq!(keyboard.pressed().count(), 1);
  }

  #[test]
  fn tick_uses_global_modifiers()
  {
    let mut keyboard = Keyboard::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let (plain, plain_cb) = counter();

    let _shifted = keyboard.on("shift+w", move |elapsed, combo: &KeyCombination| {
      sink.borrow_mut().push((elapsed, combo.clone()));
    });
    let _plain = keyboard.on("w", plain_cb);

    keyboard.press("w", false, false);
    keyboard.press("shift", true, false);
    keyboard.tick(0.25);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, 0.25);
    assert_eq!(seen[0].1, KeyCombination::new("w").with_shift(true));
    assert_eq!(plain.get(), 0);
  }

  #[test]
  fn tick_fires_every_frame_while_held()
  {
    let mut keyboard = Keyboard::new();
    let (held, cb) = counter();
    let _sub = keyboard.on("d", cb);

    keyboard.press("d", false, false);
    keyboard.tick(0.016);
    keyboard.tick(0.016);
    keyboard.release("d", false, false);
    keyboard.tick(0.016);

    assert_eq!(held.get(), 2);
  }

  #[test]
  fn dispose_removes_exactly_one_registration()
  {
    let mut keyboard = Keyboard::new();
    let (first, first_cb) = counter();
    let (second, second_cb) = counter();

    let mut one = keyboard.on("a", first_cb);
    let _two = keyboard.on("a", second_cb);
    assert_eq!(keyboard.listener_count(), 2);

    one.dispose();
    one.dispose();
    assert_eq!(keyboard.listener_count(), 1);
    assert!(one.is_disposed());

    keyboard.press("a", false, false);
    keyboard.tick(0.1);

    assert_eq!(first.get(), 0);
    assert_eq!(second.get(), 1);
  }

  #[test]
  fn on_disposed_runs_once()
  {
    let keyboard = Keyboard::new();
    let (disposed, _) = counter();
    let flag = disposed.clone();

    let mut sub = keyboard.on_with("a", |_, _| {}, move || flag.set(flag.get() + 1));
    sub.dispose();
    sub.dispose();

    assert_eq!(disposed.get(), 1);
  }

  #[test]
  fn chained_dispose_tears_down_earlier_links()
  {
    let keyboard = Keyboard::new();
    let disposed = Rc::new(Cell::new(false));
    let flag = disposed.clone();

    let mut chain = keyboard
      .on_with("a", |_, _| {}, move || flag.set(true))
      .on("b", |_, _| {})
      .on("shift+c", |_, _| {});
    assert_eq!(keyboard.listener_count(), 3);

    chain.dispose();

    assert!(disposed.get());
    assert_eq!(keyboard.listener_count(), 0);
    assert!(chain.is_disposed());
  }

  #[test]
  fn disposing_mid_dispatch_skips_the_removed_listener()
  {
    let mut keyboard = Keyboard::new();
    let (late, late_cb) = counter();
    let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
    let handle = victim.clone();

    // Registry order within one combination is unspecified, so make both
    // listeners try to kill the other and check exactly one survives.
    let _killer = keyboard.on("v+x", move |_, _| {
      if let Some(sub) = handle.borrow_mut().as_mut()
      {
        sub.dispose();
      }
    });
    *victim.borrow_mut() = Some(keyboard.on("v+x", late_cb));

    keyboard.press("x", false, false);

    assert!(late.get() <= 1);
    assert_eq!(keyboard.listener_count(), 1);
  }

  #[test]
  fn keyboard_dispose_detaches_everything()
  {
    let mut keyboard = Keyboard::new();
    let (hits, cb) = counter();
    let mut sub = keyboard.on("v+a", cb);

    keyboard.press("a", false, false);
    keyboard.dispose();
    keyboard.dispose();

    assert!(!keyboard.is_attached());
    assert_eq!(keyboard.listener_count(), 0);
    assert!(!keyboard.is_pressed("a"));

    keyboard.release("a", false, false);
    keyboard.press("a", false, false);
    sub.dispose();

    assert_eq!(hits.get(), 1);
  }

  #[test]
  fn registrations_after_dispose_are_not_stored()
  {
    let mut keyboard = Keyboard::new();
    let live = keyboard.on("a", |_, _| {});
    keyboard.dispose();

    let captured = Rc::new(Cell::new(0));
    let held = captured.clone();
    let late = keyboard.on("b", move |_, _| held.set(1));
    let _chained = live.on("c", |_, _| {});

    assert_eq!(keyboard.listener_count(), 0);
    assert!(late.is_disposed());
    assert_eq!(Rc::strong_count(&captured), 1);
  }

  #[test]
  fn subscriptions_outlive_a_dropped_keyboard()
  {
    let keyboard = Keyboard::new();
    let mut sub = keyboard.on("a", |_, _| {});
    drop(keyboard);

    sub.dispose();
    let mut late = sub.on("b", |_, _| {});
    late.dispose();

    assert!(late.is_disposed());
  }

  #[test]
  fn release_all_clears_without_edges()
  {
    let mut keyboard = Keyboard::new();
    let (released, cb) = counter();
    let _sub = keyboard.on("^+w", cb);

    keyboard.press("w", false, false);
    keyboard.press("shift", true, false);
    keyboard.release_all();

    assert_eq!(keyboard.pressed().count(), 0);
    assert!(!keyboard.shift_held());
    assert_eq!(released.get(), 0);
  }

  #[test]
  fn handle_routes_raw_input()
  {
    let mut keyboard = Keyboard::new();
    let (hits, cb) = counter();
    let _sub = keyboard.on("ctrl+v+z", cb);

    keyboard.handle(&KeyInput { key: "ctrl".into(), shift: false, ctrl: true, state: KeyState::Pressed });
    keyboard.handle(&KeyInput { key: "z".into(), shift: false, ctrl: true, state: KeyState::Pressed });

    assert!(keyboard.ctrl_held());
    assert_eq!(hits.get(), 1);
  }
}
