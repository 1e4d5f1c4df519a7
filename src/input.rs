use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::worm::Direction::{self, *};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Steer(Direction),
    Start,
    Quit,
    Ignore,
}

pub fn key_action(ev: &KeyEvent) -> KeyAction {
    if is_ctrl_c(ev) {
        return KeyAction::Quit;
    }

    match ev.code {
        KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Up => KeyAction::Steer(Up),
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Left => KeyAction::Steer(Left),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Down => KeyAction::Steer(Down),
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Right => KeyAction::Steer(Right),
        KeyCode::Enter | KeyCode::Char(' ') => KeyAction::Start,
        _ => KeyAction::Ignore,
    }
}

pub fn is_ctrl_c(ev: &KeyEvent) -> bool {
    ev.code == KeyCode::Char('c') && ev.modifiers.contains(KeyModifiers::CONTROL)
}
