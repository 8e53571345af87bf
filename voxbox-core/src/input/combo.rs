use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

//
// ──────────────────────────────────────────────────────────────
//   Key combinations
//
//   Shortcut grammar (case-insensitive):
//     shift+   → shift held
//     ctrl+    → ctrl held
//     v+       → fire once on press
//     ^+       → fire once on release
//   Anything left over is the key. No phase prefix means "held",
//   i.e. fire every frame while the chord is down.
// ──────────────────────────────────────────────────────────────
//

const SHIFT_PREFIX: &str = "shift+";
const CTRL_PREFIX: &str = "ctrl+";
const PRESS_PREFIX: &str = "v+";
const RELEASE_PREFIX: &str = "^+";

/// Which dispatch path a combination listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum Phase
{
  /// Fired once, the moment the key goes down.
  Press,
  /// Fired once, the moment the key comes up.
  Release,
  /// Fired every tick while the key stays down.
  #[default]
  Held,
}

impl Phase
{
  fn token(self) -> &'static str
  {
    match self
    {
      Phase::Press => "press",
      Phase::Release => "release",
      Phase::Held => "held",
    }
  }
}

/// A key plus the exact modifier state and phase it fires on.
///
/// Modifiers are matched exactly: `a` does not fire while shift is held,
/// `shift+a` does not fire while it is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombination
{
  pub key: String,
  pub shift: bool,
  pub ctrl: bool,
  pub phase: Phase,
}

/// Canonical identity of a [`KeyCombination`], used as the registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComboId(String);

impl ComboId
{
  pub fn as_str(&self) -> &str
  {
    &self.0
  }
}

impl fmt::Display for ComboId
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
  {
    f.write_str(&self.0)
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Construction
// ──────────────────────────────────────────────────────────────
//

impl KeyCombination
{
  /// Plain held combination for `key`, no modifiers.
  pub fn new(key: impl AsRef<str>) -> Self
  {
    Self { key: key.as_ref().to_lowercase(), shift: false, ctrl: false, phase: Phase::Held }
  }

  /// Build from optional parts; anything left out takes its default.
  pub fn from_parts(
    key: impl AsRef<str>,
    shift: Option<bool>,
    ctrl: Option<bool>,
    phase: Option<Phase>,
  ) -> Self
  {
    Self {
      key: key.as_ref().to_lowercase(),
      shift: shift.unwrap_or(false),
      ctrl: ctrl.unwrap_or(false),
      phase: phase.unwrap_or_default(),
    }
  }

  pub fn with_shift(mut self, shift: bool) -> Self
  {
    self.shift = shift;
    self
  }

  pub fn with_ctrl(mut self, ctrl: bool) -> Self
  {
    self.ctrl = ctrl;
    self
  }

  pub fn with_phase(mut self, phase: Phase) -> Self
  {
    self.phase = phase;
    self
  }

  /// Deterministic `key|shift|ctrl|phase` encoding.
  ///
  /// The three trailing fields never contain `|`, so the tuple can always be
  /// recovered by splitting from the right even when the key itself does.
  pub fn id(&self) -> ComboId
  {
    ComboId(format!("{}|{}|{}|{}", self.key, self.shift, self.ctrl, self.phase.token()))
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Shortcut text
// ──────────────────────────────────────────────────────────────
//

/// Parse compact shortcut text such as `shift+ctrl+v+a`.
///
/// Never fails: whatever remains after the known prefixes are stripped is
/// taken as the key, so unknown key names pass straight through.
pub fn parse_shortcut(text: &str) -> KeyCombination
{
  let mut rest = text.to_lowercase();

  let shift = strip_first(&mut rest, SHIFT_PREFIX);
  let ctrl = strip_first(&mut rest, CTRL_PREFIX);

  let mut phase = Phase::Held;
  if strip_first(&mut rest, PRESS_PREFIX)
  {
    phase = Phase::Press;
  }
  if strip_first(&mut rest, RELEASE_PREFIX)
  {
    phase = Phase::Release;
  }

  KeyCombination { key: rest, shift, ctrl, phase }
}

fn strip_first(text: &mut String, prefix: &str) -> bool
{
  match text.find(prefix)
  {
    Some(at) =>
    {
      text.replace_range(at..at + prefix.len(), "");
      true
    }
    None => false,
  }
}

impl FromStr for KeyCombination
{
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err>
  {
    Ok(parse_shortcut(s))
  }
}

impl From<&str> for KeyCombination
{
  fn from(text: &str) -> Self
  {
    parse_shortcut(text)
  }
}

impl From<&KeyCombination> for KeyCombination
{
  fn from(combo: &KeyCombination) -> Self
  {
    combo.clone()
  }
}

impl fmt::Display for KeyCombination
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
  {
    if self.shift
    {
      f.write_str(SHIFT_PREFIX)?;
    }
    if self.ctrl
    {
      f.write_str(CTRL_PREFIX)?;
    }
    match self.phase
    {
      Phase::Press => f.write_str(PRESS_PREFIX)?,
      Phase::Release => f.write_str(RELEASE_PREFIX)?,
      Phase::Held =>
      {}
    }
    f.write_str(&self.key)
  }
}
