//! Interaction mode and classification of raw operator input.

use std::fmt;

/// Interaction mode forwarded to the model with every turn.
///
/// The mode only changes how the model behaves (verbosity of explanations);
/// the loop itself treats both modes identically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Guided,
    Expert,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Guided => "guided",
            Mode::Expert => "expert",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a raw input line means to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Blank line; nothing to do.
    Empty,
    /// A quit keyword (`quit`, `exit`, `bye`).
    Quit,
    /// A mode keyword (`guided`, `expert`).
    SwitchMode(Mode),
    /// Anything else: conversational text for the model.
    Message(String),
}

/// Classify one line of operator input.
///
/// Control tokens are matched case-insensitively against the whole trimmed
/// line, so `load 1ubq and exit the binding pocket` is a message, not a quit.
pub fn classify_input(line: &str) -> InputKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return InputKind::Empty;
    }
    match trimmed.to_lowercase().as_str() {
        "quit" | "exit" | "bye" => InputKind::Quit,
        "guided" => InputKind::SwitchMode(Mode::Guided),
        "expert" => InputKind::SwitchMode(Mode::Expert),
        _ => InputKind::Message(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_empty() {
        assert_eq!(classify_input(""), InputKind::Empty);
        assert_eq!(classify_input("   \t"), InputKind::Empty);
    }

    #[test]
    fn quit_keywords_are_case_insensitive() {
        assert_eq!(classify_input("quit"), InputKind::Quit);
        assert_eq!(classify_input("EXIT"), InputKind::Quit);
        assert_eq!(classify_input(" Bye "), InputKind::Quit);
    }

    #[test]
    fn mode_keywords_switch_mode() {
        assert_eq!(classify_input("expert"), InputKind::SwitchMode(Mode::Expert));
        assert_eq!(classify_input("Guided"), InputKind::SwitchMode(Mode::Guided));
    }

    #[test]
    fn keywords_inside_sentences_are_messages() {
        assert_eq!(
            classify_input("show me the exit tunnel"),
            InputKind::Message("show me the exit tunnel".to_string())
        );
    }
}
