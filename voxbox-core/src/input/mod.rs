mod combo;
mod keyboard;

pub use combo::{parse_shortcut, ComboId, KeyCombination, Phase};
pub use keyboard::{KeyCallback, KeyInput, KeyState, Keyboard, ListenerId, Subscription};
