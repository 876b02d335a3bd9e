//! Six-box OTP entry model.

use flow_hydration_core::OtpCode;

const SLOTS: usize = OtpCode::LENGTH;

/// The state of a six-box OTP entry: one digit per slot plus the focused slot.
///
/// Typing a digit fills the focused slot and moves focus forward. Backspace
/// on an empty slot steps back. Pasting spreads digits across the slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    digits: [Option<char>; SLOTS],
    focus: usize,
}

impl OtpInput {
    /// An empty input focused on the first slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the focused slot.
    #[must_use]
    pub const fn focus(&self) -> usize {
        self.focus
    }

    /// Digit in each slot.
    #[must_use]
    pub const fn slots(&self) -> &[Option<char>; SLOTS] {
        &self.digits
    }

    /// Entered digits, in slot order, skipping empty slots.
    #[must_use]
    pub fn value(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    /// The full code, once every slot holds a digit.
    #[must_use]
    pub fn code(&self) -> Option<OtpCode> {
        OtpCode::parse(&self.value()).ok()
    }

    /// Whether no slot holds a digit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digits.iter().all(Option::is_none)
    }

    /// Move focus to `slot` (clamped to the last slot).
    pub fn set_focus(&mut self, slot: usize) {
        self.focus = slot.min(SLOTS - 1);
    }

    /// Type a character into the focused slot.
    ///
    /// Non-digits are ignored. Returns the code when this keystroke fills the
    /// last slot and all six slots hold digits.
    pub fn enter(&mut self, ch: char) -> Option<OtpCode> {
        if !ch.is_ascii_digit() {
            return None;
        }

        if let Some(slot) = self.digits.get_mut(self.focus) {
            *slot = Some(ch);
        }

        if self.focus < SLOTS - 1 {
            self.focus += 1;
            None
        } else {
            self.code()
        }
    }

    /// Delete backwards: clear the focused slot, or step back and clear the
    /// previous one if the focused slot is already empty.
    pub fn backspace(&mut self) {
        let focused_filled = self.digits.get(self.focus).is_some_and(Option::is_some);

        if !focused_filled && self.focus > 0 {
            self.focus -= 1;
        }

        if let Some(slot) = self.digits.get_mut(self.focus) {
            *slot = None;
        }
    }

    /// Fill the slots from the start with the first six digits of `text`.
    ///
    /// Returns the code if `text` contained at least six digits.
    pub fn paste(&mut self, text: &str) -> Option<OtpCode> {
        let pasted: Vec<char> = text.chars().filter(char::is_ascii_digit).take(SLOTS).collect();
        if pasted.is_empty() {
            return None;
        }

        self.digits = [None; SLOTS];
        for (slot, digit) in self.digits.iter_mut().zip(&pasted) {
            *slot = Some(*digit);
        }
        self.set_focus(pasted.len());

        self.code()
    }

    /// Empty every slot and focus the first one.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_advances_focus_and_completes() {
        let mut input = OtpInput::new();
        for ch in "12345".chars() {
            assert!(input.enter(ch).is_none());
        }
        assert_eq!(input.focus(), 5);

        let code = input.enter('6').map(|c| c.as_str().to_string());
        assert_eq!(code.as_deref(), Some("123456"));
        assert_eq!(input.focus(), 5);
    }

    #[test]
    fn test_non_digits_are_ignored() {
        let mut input = OtpInput::new();
        assert!(input.enter('a').is_none());
        assert!(input.enter(' ').is_none());
        assert!(input.is_empty());
        assert_eq!(input.focus(), 0);
    }

    #[test]
    fn test_backspace_on_empty_slot_steps_back() {
        let mut input = OtpInput::new();
        input.enter('1');
        input.enter('2');
        assert_eq!(input.focus(), 2);

        input.backspace();
        assert_eq!(input.focus(), 1);
        assert_eq!(input.value(), "1");

        input.backspace();
        input.backspace();
        assert_eq!(input.focus(), 0);
        assert!(input.is_empty());
    }

    #[test]
    fn test_backspace_on_filled_slot_clears_in_place() {
        let mut input = OtpInput::new();
        input.paste("123456");
        input.backspace();
        assert_eq!(input.focus(), 5);
        assert_eq!(input.value(), "12345");
    }

    #[test]
    fn test_paste_fills_from_start() {
        let mut input = OtpInput::new();
        input.set_focus(3);

        let code = input.paste("Your code is 987-654, valid 10 min");
        assert_eq!(code.map(|c| c.as_str().to_string()).as_deref(), Some("987654"));
        assert_eq!(input.focus(), 5);
    }

    #[test]
    fn test_partial_paste() {
        let mut input = OtpInput::new();
        assert!(input.paste("42").is_none());
        assert_eq!(input.value(), "42");
        assert_eq!(input.focus(), 2);
        assert!(input.code().is_none());
    }

    #[test]
    fn test_clear_resets_digits_and_focus() {
        let mut input = OtpInput::new();
        input.paste("123456");
        input.clear();
        assert!(input.is_empty());
        assert_eq!(input.focus(), 0);
        assert_eq!(input.slots(), &[None; 6]);
    }
}
