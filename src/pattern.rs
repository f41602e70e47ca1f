use crate::{MAX_STEPS, NUM_INSTRUMENTS};

// One bit per step, least significant bit is step 0.
type StepBits = u8;
const _: () = assert!(MAX_STEPS <= StepBits::BITS as usize);

/// The instrument x step grid. Steps beyond the active pattern length keep
/// their value, they are simply not played.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pattern {
    steps: [StepBits; NUM_INSTRUMENTS],
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_groove() -> Self {
        let mut pattern = Self::new();
        pattern.set_step(0, 0, true);
        pattern.set_step(0, 4, true);
        pattern.set_step(1, 2, true);
        pattern.set_step(1, 6, true);
        for step in 0..MAX_STEPS {
            pattern.set_step(2, step, true);
        }
        pattern
    }

    pub fn step(&self, instrument: usize, step: usize) -> bool {
        (self.steps[instrument] >> step) & 1 == 1
    }

    pub fn set_step(&mut self, instrument: usize, step: usize, value: bool) {
        if value {
            self.steps[instrument] |= 1 << step;
        } else {
            self.steps[instrument] &= !(1 << step);
        }
    }

    pub fn toggle_step(&mut self, instrument: usize, step: usize) {
        self.steps[instrument] ^= 1 << step;
    }

    pub fn clear(&mut self) {
        self.steps = [0; NUM_INSTRUMENTS];
    }

    pub fn active_at(&self, step: usize) -> impl Iterator<Item = usize> + '_ {
        (0..NUM_INSTRUMENTS).filter(move |&i| self.step(i, step))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

impl Cursor {
    pub fn move_to(&mut self, m: Move, pattern_length: usize) {
        match m {
            Move::Up if self.row == 0 => {}
            Move::Up => self.row -= 1,
            Move::Down => self.row = usize::min(self.row + 1, NUM_INSTRUMENTS - 1),
            Move::Left if self.col == 0 => {}
            Move::Left => self.col -= 1,
            Move::Right if self.col + 1 >= pattern_length => {}
            Move::Right => self.col += 1,
        }
    }

    pub fn clamp_to_length(&mut self, length: usize) {
        if self.col >= length {
            self.col = length.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut pattern = Pattern::new();
        for i in 0..NUM_INSTRUMENTS {
            for s in 0..MAX_STEPS {
                assert!(!pattern.step(i, s));
                pattern.set_step(i, s, true);
                assert!(pattern.step(i, s));
            }
        }
        pattern.set_step(1, 3, false);
        assert!(!pattern.step(1, 3));
        assert!(pattern.step(1, 2));
        assert!(pattern.step(1, 4));
    }

    #[test]
    fn toggle_twice_restores() {
        let mut pattern = Pattern::with_default_groove();
        let before = pattern;
        pattern.toggle_step(0, 0);
        assert!(!pattern.step(0, 0));
        pattern.toggle_step(0, 0);
        assert_eq!(pattern, before);

        pattern.toggle_step(3, 7);
        assert!(pattern.step(3, 7));
        pattern.toggle_step(3, 7);
        assert_eq!(pattern, before);
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut pattern = Pattern::with_default_groove();
        pattern.clear();
        assert_eq!(pattern, Pattern::new());
        assert_eq!(pattern.active_at(0).count(), 0);
    }

    #[test]
    fn default_groove() {
        let pattern = Pattern::with_default_groove();
        assert_eq!(pattern.active_at(0).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(pattern.active_at(2).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(pattern.active_at(7).collect::<Vec<_>>(), vec![2]);
        assert!(!pattern.step(3, 0));
    }

    #[test]
    fn cursor_stays_inside_grid() {
        let mut cursor = Cursor::default();
        cursor.move_to(Move::Up, 8);
        cursor.move_to(Move::Left, 8);
        assert_eq!(cursor, Cursor { row: 0, col: 0 });

        for _ in 0..10 {
            cursor.move_to(Move::Down, 4);
            cursor.move_to(Move::Right, 4);
        }
        assert_eq!(cursor, Cursor { row: NUM_INSTRUMENTS - 1, col: 3 });
    }

    #[test]
    fn cursor_clamps_to_length() {
        let mut cursor = Cursor { row: 1, col: 6 };
        cursor.clamp_to_length(8);
        assert_eq!(cursor.col, 6);
        cursor.clamp_to_length(4);
        assert_eq!(cursor.col, 3);
        cursor.clamp_to_length(1);
        assert_eq!(cursor.col, 0);
    }
}
