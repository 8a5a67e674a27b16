//! Key bindings: arrows and vim-style.

use crate::game::Command;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move(Command),
    Pause,
    Restart,
    Quit,
    None,
}

/// Map key event to action. Anything with a modifier other than Shift is ignored.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::Move(Command::MoveLeft),
        KeyCode::Right | KeyCode::Char('l') => Action::Move(Command::MoveRight),
        KeyCode::Down | KeyCode::Char('j') => Action::Move(Command::SoftDrop),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Action {
        key_to_action(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_arrows_and_vim_keys() {
        assert_eq!(press(KeyCode::Left), Action::Move(Command::MoveLeft));
        assert_eq!(press(KeyCode::Char('h')), Action::Move(Command::MoveLeft));
        assert_eq!(press(KeyCode::Right), Action::Move(Command::MoveRight));
        assert_eq!(press(KeyCode::Char('l')), Action::Move(Command::MoveRight));
        assert_eq!(press(KeyCode::Down), Action::Move(Command::SoftDrop));
        assert_eq!(press(KeyCode::Char('j')), Action::Move(Command::SoftDrop));
    }

    #[test]
    fn test_app_keys() {
        assert_eq!(press(KeyCode::Esc), Action::Quit);
        assert_eq!(press(KeyCode::Char('q')), Action::Quit);
        assert_eq!(press(KeyCode::Char('p')), Action::Pause);
        assert_eq!(press(KeyCode::Char('r')), Action::Restart);
    }

    #[test]
    fn test_unbound_and_modified_keys_ignored() {
        assert_eq!(press(KeyCode::Up), Action::None);
        assert_eq!(press(KeyCode::Char(' ')), Action::None);
        let ctrl_h = KeyEvent::new(KeyCode::Char('h'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_h), Action::None);
    }
}
