//! Global hotkey model and registration lifecycle.
//!
//! The OS side is hidden behind [`HotkeyWindow`]: a native handle that can hold
//! one `RegisterHotKey` binding and calls back when it fires. [`HotkeySlot`]
//! owns at most one such window and enforces the Unregistered/Registered
//! transitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::i18n::MessageKey;

/// Identifier passed to `RegisterHotKey` for the mute binding.
pub const HOTKEY_ID: i32 = 9000;

/// Virtual key code of F1. F2..F12 follow consecutively.
const VK_F1: u32 = 0x70;

/// Base keys selectable for the hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FunctionKey {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl FunctionKey {
    pub const ALL: [FunctionKey; 12] = [
        FunctionKey::F1,
        FunctionKey::F2,
        FunctionKey::F3,
        FunctionKey::F4,
        FunctionKey::F5,
        FunctionKey::F6,
        FunctionKey::F7,
        FunctionKey::F8,
        FunctionKey::F9,
        FunctionKey::F10,
        FunctionKey::F11,
        FunctionKey::F12,
    ];

    /// Position in [`FunctionKey::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn virtual_key(self) -> u32 {
        VK_F1 + self.index() as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            FunctionKey::F1 => "F1",
            FunctionKey::F2 => "F2",
            FunctionKey::F3 => "F3",
            FunctionKey::F4 => "F4",
            FunctionKey::F5 => "F5",
            FunctionKey::F6 => "F6",
            FunctionKey::F7 => "F7",
            FunctionKey::F8 => "F8",
            FunctionKey::F9 => "F9",
            FunctionKey::F10 => "F10",
            FunctionKey::F11 => "F11",
            FunctionKey::F12 => "F12",
        }
    }

    /// Parses `F1`..`F12`, ignoring case. Anything else is rejected.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Modifier combined with the base key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum Modifier {
    #[default]
    None,
    Shift,
    Alt,
    Control,
    Win,
}

impl Modifier {
    pub const ALL: [Modifier; 5] = [
        Modifier::None,
        Modifier::Shift,
        Modifier::Alt,
        Modifier::Control,
        Modifier::Win,
    ];

    /// `fsModifiers` bits for `RegisterHotKey`.
    pub fn bits(self) -> u32 {
        match self {
            Modifier::None => 0x0,
            Modifier::Alt => 0x1,
            Modifier::Control => 0x2,
            Modifier::Shift => 0x4,
            Modifier::Win => 0x8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Modifier::None => "None",
            Modifier::Shift => "Shift",
            Modifier::Alt => "Alt",
            Modifier::Control => "Control",
            Modifier::Win => "Win",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|modifier| modifier.name().eq_ignore_ascii_case(name))
    }

    /// Label shown for this modifier in the settings dialog.
    pub fn message_key(self) -> MessageKey {
        match self {
            Modifier::None => MessageKey::ModifierNone,
            Modifier::Shift => MessageKey::ModifierShift,
            Modifier::Alt => MessageKey::ModifierAlt,
            Modifier::Control => MessageKey::ModifierControl,
            Modifier::Win => MessageKey::ModifierWin,
        }
    }
}

/// A modifier + base key pair, displayed as `F9` or `Shift+F3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyBinding {
    pub modifier: Modifier,
    pub key: FunctionKey,
}

impl HotkeyBinding {
    pub fn new(modifier: Modifier, key: FunctionKey) -> Self {
        Self { modifier, key }
    }

    pub fn modifier_bits(&self) -> u32 {
        self.modifier.bits()
    }

    pub fn virtual_key(&self) -> u32 {
        self.key.virtual_key()
    }
}

impl Default for HotkeyBinding {
    fn default() -> Self {
        Self::new(Modifier::None, FunctionKey::F9)
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            Modifier::None => write!(f, "{}", self.key),
            modifier => write!(f, "{}+{}", modifier.name(), self.key),
        }
    }
}

#[derive(Debug, Error)]
pub enum HotkeyError {
    #[error("failed to create hotkey window: {0}")]
    Window(String),
    #[error("{0}")]
    Rejected(String),
}

/// Native handle that receives global hotkey notifications.
///
/// The handle is created on construction. Dropping the value must release any
/// binding and destroy the handle; implementations make this idempotent.
pub trait HotkeyWindow {
    /// Binds `virtual_key` with `modifiers` under `id`. Fails if the OS refuses
    /// the combination, for example because another process already owns it.
    fn register(&mut self, id: i32, modifiers: u32, virtual_key: u32)
    -> Result<(), HotkeyError>;

    /// Releases the binding. Safe to call when nothing is registered.
    fn unregister(&mut self);

    /// Sets the single callback invoked when the registered hotkey fires.
    fn on_activated(&mut self, callback: Box<dyn Fn()>);
}

/// Holds at most one live [`HotkeyWindow`].
pub struct HotkeySlot<W> {
    window: Option<W>,
    binding: Option<HotkeyBinding>,
}

impl<W: HotkeyWindow> HotkeySlot<W> {
    pub fn new() -> Self {
        Self {
            window: None,
            binding: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.window.is_some()
    }

    pub fn active_binding(&self) -> Option<HotkeyBinding> {
        self.binding
    }

    /// Creates a window and binds `binding` on it.
    ///
    /// Returns `Ok(false)` without touching the OS if a window is already live.
    /// On failure the freshly created window is dropped, so no partial
    /// registration survives.
    pub fn register<F>(
        &mut self,
        binding: HotkeyBinding,
        create: F,
        on_activated: impl Fn() + 'static,
    ) -> Result<bool, HotkeyError>
    where
        F: FnOnce() -> Result<W, HotkeyError>,
    {
        if self.window.is_some() {
            debug!(%binding, "hotkey window already live, skipping registration");
            return Ok(false);
        }

        let mut window = create()?;
        window.register(HOTKEY_ID, binding.modifier_bits(), binding.virtual_key())?;
        window.on_activated(Box::new(on_activated));

        info!(%binding, "hotkey registered");
        self.window = Some(window);
        self.binding = Some(binding);
        Ok(true)
    }

    /// Releases the binding and destroys the window. Idempotent.
    pub fn unregister(&mut self) {
        if let Some(mut window) = self.window.take() {
            window.unregister();
            if let Some(binding) = self.binding.take() {
                info!(%binding, "hotkey unregistered");
            }
        }
    }
}

impl<W: HotkeyWindow> Default for HotkeySlot<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::rc::Rc;

    #[derive(Default)]
    struct Os {
        bound: RefCell<HashSet<(u32, u32)>>,
        taken: RefCell<HashSet<(u32, u32)>>,
        alive: Cell<usize>,
        created: Cell<usize>,
    }

    struct TestWindow {
        os: Rc<Os>,
        binding: Option<(u32, u32)>,
    }

    impl TestWindow {
        fn create(os: &Rc<Os>) -> Result<Self, HotkeyError> {
            os.alive.set(os.alive.get() + 1);
            os.created.set(os.created.get() + 1);
            Ok(Self {
                os: os.clone(),
                binding: None,
            })
        }
    }

    impl HotkeyWindow for TestWindow {
        fn register(&mut self, _id: i32, modifiers: u32, vk: u32) -> Result<(), HotkeyError> {
            let pair = (modifiers, vk);
            if self.os.taken.borrow().contains(&pair) || !self.os.bound.borrow_mut().insert(pair)
            {
                return Err(HotkeyError::Rejected("hotkey already registered".into()));
            }
            self.binding = Some(pair);
            Ok(())
        }

        fn unregister(&mut self) {
            if let Some(pair) = self.binding.take() {
                self.os.bound.borrow_mut().remove(&pair);
            }
        }

        fn on_activated(&mut self, _callback: Box<dyn Fn()>) {}
    }

    impl Drop for TestWindow {
        fn drop(&mut self) {
            self.unregister();
            self.os.alive.set(self.os.alive.get() - 1);
        }
    }

    #[test]
    fn test_function_key_virtual_codes() {
        assert_eq!(FunctionKey::F1.virtual_key(), 0x70);
        assert_eq!(FunctionKey::F3.virtual_key(), 0x72);
        assert_eq!(FunctionKey::F9.virtual_key(), 0x78);
        assert_eq!(FunctionKey::F12.virtual_key(), 0x7B);
    }

    #[test]
    fn test_function_key_parse() {
        assert_eq!(FunctionKey::parse("F9"), Some(FunctionKey::F9));
        assert_eq!(FunctionKey::parse("f12"), Some(FunctionKey::F12));
        assert_eq!(FunctionKey::parse("F20"), None);
        assert_eq!(FunctionKey::parse("F0"), None);
        assert_eq!(FunctionKey::parse("Q"), None);
        for key in FunctionKey::ALL {
            assert_eq!(FunctionKey::parse(key.name()), Some(key));
        }
    }

    #[test]
    fn test_modifier_bits() {
        assert_eq!(Modifier::None.bits(), 0);
        assert_eq!(Modifier::Alt.bits(), 1);
        assert_eq!(Modifier::Control.bits(), 2);
        assert_eq!(Modifier::Shift.bits(), 4);
        assert_eq!(Modifier::Win.bits(), 8);
    }

    #[test]
    fn test_modifier_parse_is_case_insensitive() {
        assert_eq!(Modifier::parse("shift"), Some(Modifier::Shift));
        assert_eq!(Modifier::parse("CONTROL"), Some(Modifier::Control));
        assert_eq!(Modifier::parse("Ctrl"), None);
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(HotkeyBinding::default().to_string(), "F9");
        assert_eq!(
            HotkeyBinding::new(Modifier::Shift, FunctionKey::F3).to_string(),
            "Shift+F3"
        );
        assert_eq!(
            HotkeyBinding::new(Modifier::Win, FunctionKey::F12).to_string(),
            "Win+F12"
        );
    }

    #[test]
    fn test_slot_register_then_unregister() {
        let os = Rc::new(Os::default());
        let mut slot = HotkeySlot::new();
        let binding = HotkeyBinding::default();

        assert!(!slot.is_registered());
        let created = slot.register(binding, || TestWindow::create(&os), || {});
        assert!(created.unwrap());
        assert!(slot.is_registered());
        assert_eq!(slot.active_binding(), Some(binding));
        assert!(os.bound.borrow().contains(&(0, 0x78)));

        slot.unregister();
        assert!(!slot.is_registered());
        assert_eq!(slot.active_binding(), None);
        assert!(os.bound.borrow().is_empty());
        assert_eq!(os.alive.get(), 0);
    }

    #[test]
    fn test_slot_register_while_live_is_noop() {
        let os = Rc::new(Os::default());
        let mut slot = HotkeySlot::new();
        let binding = HotkeyBinding::default();

        slot.register(binding, || TestWindow::create(&os), || {}).unwrap();
        let again = slot.register(
            HotkeyBinding::new(Modifier::Alt, FunctionKey::F1),
            || TestWindow::create(&os),
            || {},
        );
        assert!(!again.unwrap());
        assert_eq!(os.created.get(), 1);
        assert_eq!(slot.active_binding(), Some(binding));
    }

    #[test]
    fn test_slot_failed_register_leaves_nothing_alive() {
        let os = Rc::new(Os::default());
        os.taken.borrow_mut().insert((0, 0x78));
        let mut slot = HotkeySlot::new();

        let result = slot.register(HotkeyBinding::default(), || TestWindow::create(&os), || {});
        assert!(matches!(result, Err(HotkeyError::Rejected(_))));
        assert!(!slot.is_registered());
        assert_eq!(os.alive.get(), 0);
    }

    #[test]
    fn test_slot_rebinding_is_repeatable() {
        let os = Rc::new(Os::default());
        let mut slot = HotkeySlot::new();
        let binding = HotkeyBinding::new(Modifier::Control, FunctionKey::F5);

        for _ in 0..3 {
            assert!(slot.register(binding, || TestWindow::create(&os), || {}).unwrap());
            assert!(os.bound.borrow().contains(&(2, 0x74)));
            slot.unregister();
            assert!(os.bound.borrow().is_empty());
        }
        assert_eq!(os.created.get(), 3);
    }

    #[test]
    fn test_slot_unregister_is_idempotent() {
        let mut slot: HotkeySlot<TestWindow> = HotkeySlot::default();
        slot.unregister();
        slot.unregister();
        assert!(!slot.is_registered());
    }
}
