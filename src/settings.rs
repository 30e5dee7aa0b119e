//! Content of the hotkey settings dialog.
//!
//! The dialog offers a fixed list of base keys and modifiers; the window
//! itself only reports the selected indices back, which [`SettingsForm::choose`]
//! validates against these lists.

use crate::hotkey::{FunctionKey, HotkeyBinding, Modifier};
use crate::i18n::{Language, MessageKey, Translations};

/// Localized labels and initial selection for the settings dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub title: String,
    pub key_label: String,
    pub modifier_label: String,
    pub ok: String,
    pub cancel: String,
    /// Labels shown in the modifier list, in [`Modifier::ALL`] order.
    pub modifier_labels: Vec<String>,
    pub selected_key: usize,
    pub selected_modifier: usize,
    /// Window width in pixels; Russian labels need more room.
    pub width: i32,
    pub height: i32,
}

impl SettingsForm {
    pub fn new(translations: &Translations, lang: Language, current: HotkeyBinding) -> Self {
        let text = |key| translations.resolve(lang, key).to_string();
        let selected_modifier = Modifier::ALL
            .iter()
            .position(|m| *m == current.modifier)
            .unwrap_or(0);

        Self {
            title: text(MessageKey::HotkeySettingsFormTitle),
            key_label: text(MessageKey::KeyLabel),
            modifier_label: text(MessageKey::ModifierLabel),
            ok: text(MessageKey::Ok),
            cancel: text(MessageKey::Cancel),
            modifier_labels: Modifier::ALL
                .iter()
                .map(|m| text(m.message_key()))
                .collect(),
            selected_key: current.key.index(),
            selected_modifier,
            width: match lang {
                Language::Russian => 350,
                Language::English => 300,
            },
            height: 150,
        }
    }

    /// Labels shown in the key list, in [`FunctionKey::ALL`] order.
    pub fn key_labels(&self) -> impl Iterator<Item = &'static str> {
        FunctionKey::ALL.iter().map(|key| key.name())
    }

    /// Maps list selections back to a binding; `None` for out-of-range indices.
    pub fn choose(&self, key_index: usize, modifier_index: usize) -> Option<HotkeyBinding> {
        let key = FunctionKey::ALL.get(key_index)?;
        let modifier = Modifier::ALL.get(modifier_index)?;
        Some(HotkeyBinding::new(*modifier, *key))
    }

    /// Binding that was selected when the dialog opened.
    pub fn initial(&self) -> Option<HotkeyBinding> {
        self.choose(self.selected_key, self.selected_modifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipped() -> Translations {
        Translations::from_json(include_str!("../data/lang.json")).unwrap()
    }

    #[test]
    fn test_form_preselects_current_binding() {
        let current = HotkeyBinding::new(Modifier::Control, FunctionKey::F5);
        let form = SettingsForm::new(&shipped(), Language::English, current);
        assert_eq!(form.selected_key, 4);
        assert_eq!(form.selected_modifier, 3);
        assert_eq!(form.initial(), Some(current));
    }

    #[test]
    fn test_form_labels_are_localized() {
        let t = shipped();
        let en = SettingsForm::new(&t, Language::English, HotkeyBinding::default());
        let ru = SettingsForm::new(&t, Language::Russian, HotkeyBinding::default());

        assert_eq!(en.ok, "OK");
        assert_eq!(en.modifier_labels[0], "None");
        assert_eq!(ru.cancel, "Отмена");
        assert_eq!(ru.modifier_labels[0], "Нет");
        assert_eq!(en.modifier_labels.len(), Modifier::ALL.len());
        assert!(ru.width > en.width);
    }

    #[test]
    fn test_form_without_translations_uses_keys() {
        let form = SettingsForm::new(
            &Translations::empty(),
            Language::English,
            HotkeyBinding::default(),
        );
        assert_eq!(form.title, "hotkey_settings_form_title");
        assert_eq!(form.modifier_labels[1], "modifier_shift");
    }

    #[test]
    fn test_choose_maps_indices() {
        let form = SettingsForm::new(&shipped(), Language::English, HotkeyBinding::default());
        assert_eq!(
            form.choose(2, 1),
            Some(HotkeyBinding::new(Modifier::Shift, FunctionKey::F3))
        );
        assert_eq!(
            form.choose(11, 4),
            Some(HotkeyBinding::new(Modifier::Win, FunctionKey::F12))
        );
    }

    #[test]
    fn test_choose_rejects_out_of_range() {
        let form = SettingsForm::new(&shipped(), Language::English, HotkeyBinding::default());
        assert_eq!(form.choose(12, 0), None);
        assert_eq!(form.choose(0, 5), None);
        assert_eq!(form.choose(usize::MAX, usize::MAX), None);
    }

    #[test]
    fn test_key_labels() {
        let form = SettingsForm::new(&shipped(), Language::English, HotkeyBinding::default());
        let labels: Vec<_> = form.key_labels().collect();
        assert_eq!(labels.len(), 12);
        assert_eq!(labels[0], "F1");
        assert_eq!(labels[11], "F12");
    }
}
