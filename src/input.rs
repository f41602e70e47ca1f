use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::Action;
use crate::pattern::Move;
use crate::{BPM_STEP, NUM_INSTRUMENTS};

pub fn handle_key(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Up | KeyCode::Char('w') => Action::MoveCursor(Move::Up),
        KeyCode::Down | KeyCode::Char('s') => Action::MoveCursor(Move::Down),
        KeyCode::Left | KeyCode::Char('a') => Action::MoveCursor(Move::Left),
        KeyCode::Right | KeyCode::Char('d') => Action::MoveCursor(Move::Right),
        KeyCode::Char(' ') | KeyCode::Enter => Action::ToggleStep,
        KeyCode::Char('p') => Action::TogglePlay,
        KeyCode::Char('P') => Action::Stop,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::AdjustBpm(BPM_STEP),
        KeyCode::Char('-') | KeyCode::Char('_') => Action::AdjustBpm(-BPM_STEP),
        KeyCode::Char('[') => Action::AdjustLength(-1),
        KeyCode::Char(']') => Action::AdjustLength(1),
        KeyCode::Char('z') => Action::CycleSample(-1),
        KeyCode::Char('x') => Action::CycleSample(1),
        KeyCode::Char(c @ '1'..='9') => {
            let track = (c as usize) - ('1' as usize);
            if track >= NUM_INSTRUMENTS {
                return None;
            }
            Action::TriggerTrack(track)
        }
        KeyCode::Char('c') => Action::Clear,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> Option<Action> {
        handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn movement() {
        assert_eq!(press(KeyCode::Up), Some(Action::MoveCursor(Move::Up)));
        assert_eq!(press(KeyCode::Char('a')), Some(Action::MoveCursor(Move::Left)));
        assert_eq!(press(KeyCode::Char('s')), Some(Action::MoveCursor(Move::Down)));
        assert_eq!(press(KeyCode::Right), Some(Action::MoveCursor(Move::Right)));
    }

    #[test]
    fn transport_and_editing() {
        assert_eq!(press(KeyCode::Char(' ')), Some(Action::ToggleStep));
        assert_eq!(press(KeyCode::Enter), Some(Action::ToggleStep));
        assert_eq!(press(KeyCode::Char('p')), Some(Action::TogglePlay));
        let shift_p = KeyEvent::new(KeyCode::Char('P'), KeyModifiers::SHIFT);
        assert_eq!(handle_key(shift_p), Some(Action::Stop));
        assert_eq!(press(KeyCode::Char('=')), Some(Action::AdjustBpm(5)));
        assert_eq!(press(KeyCode::Char('_')), Some(Action::AdjustBpm(-5)));
        assert_eq!(press(KeyCode::Char('[')), Some(Action::AdjustLength(-1)));
        assert_eq!(press(KeyCode::Char('x')), Some(Action::CycleSample(1)));
        assert_eq!(press(KeyCode::Char('c')), Some(Action::Clear));
        assert_eq!(press(KeyCode::Esc), Some(Action::Quit));
    }

    #[test]
    fn track_triggers() {
        assert_eq!(press(KeyCode::Char('1')), Some(Action::TriggerTrack(0)));
        assert_eq!(press(KeyCode::Char('4')), Some(Action::TriggerTrack(3)));
        assert_eq!(press(KeyCode::Char('5')), None);
    }

    #[test]
    fn ignores_releases_and_modifiers() {
        let release = KeyEvent {
            code: KeyCode::Char('p'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(handle_key(release), None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(ctrl_c), Some(Action::Quit));
        let ctrl_p = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(ctrl_p), None);
        assert_eq!(press(KeyCode::Tab), None);
    }
}
