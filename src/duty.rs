//! Level to PWM duty cycle conversion shared by motors and lamps.

/// Lowest level that produces a scaled (non-clamped) output.
pub const MIN_LEVEL: i32 = 1;
/// Highest level that produces a scaled (non-clamped) output.
pub const MAX_LEVEL: i32 = 7;
pub const MAX_DUTY: u8 = u8::MAX;

const STEPS: i32 = 8;
const RANGE: i32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Normal,
    Inverted,
}

impl Polarity {
    /// Alternating channels of the A4990 run with inverted PWM polarity.
    pub fn for_channel(channel: u8) -> Self {
        if channel % 2 == 1 {
            Self::Inverted
        } else {
            Self::Normal
        }
    }

    pub fn apply(self, duty: u8) -> u8 {
        match self {
            Self::Normal => duty,
            Self::Inverted => MAX_DUTY - duty,
        }
    }
}

impl From<bool> for Polarity {
    fn from(invert: bool) -> Self {
        if invert {
            Self::Inverted
        } else {
            Self::Normal
        }
    }
}

fn scale(level: i32) -> u8 {
    if level < MIN_LEVEL {
        0
    } else if level > MAX_LEVEL {
        MAX_DUTY
    } else {
        // 1..=7 -> 32..=224, always fits
        (level * RANGE / STEPS) as u8
    }
}

/// Maps a level onto an 8-bit duty cycle.
///
/// Levels below 1 give the minimum and levels above 7 give the maximum
/// output; everything in between lands on a multiple of 32. The polarity
/// is applied after clamping, so an inverted level 0 drives 255.
pub fn duty_cycle(level: i32, polarity: impl Into<Polarity>) -> u8 {
    polarity.into().apply(scale(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_levels_are_multiples_of_32() {
        for level in MIN_LEVEL..=MAX_LEVEL {
            assert_eq!(duty_cycle(level, false) as i32, level * 32);
        }
    }

    #[test]
    fn out_of_range_levels_clamp() {
        assert_eq!(duty_cycle(0, false), 0);
        assert_eq!(duty_cycle(-5, false), 0);
        assert_eq!(duty_cycle(i32::MIN, false), 0);
        assert_eq!(duty_cycle(0, true), 255);
        assert_eq!(duty_cycle(-1, true), 255);
        assert_eq!(duty_cycle(8, false), 255);
        assert_eq!(duty_cycle(1000, false), 255);
        assert_eq!(duty_cycle(i32::MAX, false), 255);
        assert_eq!(duty_cycle(8, true), 0);
    }

    #[test]
    fn known_values() {
        assert_eq!(duty_cycle(4, false), 128);
        assert_eq!(duty_cycle(4, true), 127);
        assert_eq!(duty_cycle(7, false), 224);
        assert_eq!(duty_cycle(7, true), 31);
        assert_eq!(duty_cycle(1, Polarity::Normal), 32);
        assert_eq!(duty_cycle(1, Polarity::Inverted), 223);
    }

    #[test]
    fn inversion_is_complement() {
        for level in -2..=10 {
            assert_eq!(duty_cycle(level, true), 255 - duty_cycle(level, false));
            let twice = Polarity::Inverted.apply(Polarity::Inverted.apply(duty_cycle(level, false)));
            assert_eq!(twice, duty_cycle(level, false));
        }
    }

    #[test]
    fn channel_parity() {
        for channel in [0, 2, 4, 6] {
            assert_eq!(Polarity::for_channel(channel), Polarity::Normal);
        }
        for channel in [1, 3, 5, 7] {
            assert_eq!(Polarity::for_channel(channel), Polarity::Inverted);
        }
        for level in 0..=8 {
            let even = duty_cycle(level, Polarity::for_channel(2));
            let odd = duty_cycle(level, Polarity::for_channel(3));
            assert_eq!(even as u16 + odd as u16, 255);
        }
    }
}
