use crate::{Color, FanState};

const POWER_MASK: u32 = 0x10;
const LED_MASK: u32 = 0x20;
const COOL_MASK: u32 = 0x08;
const SPEED_MASK: u32 = 0x07;
const BRIGHTNESS_MASK: u32 = 0x7F00;
const BRIGHTNESS_SHIFT: u32 = 8;
const WARM_MASK: u32 = 0x8000;
const SLEEP_MASK: u32 = 0x80;
const TIMER_MASK: u32 = 0x0F_0000;
const TIMER_SHIFT: u32 = 16;
const ELAPSED_MASK: u32 = 0xFF00_0000;
const ELAPSED_SHIFT: u32 = 24;
const ELAPSED_MINUTES_PER_UNIT: u16 = 4;

/// Bitfield-encoded device state integer.
///
/// Every `u32` is a valid word; fields that are not set simply read as
/// zero or `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateWord(pub u32);

impl StateWord {
    /// Parses the first comma-delimited field of a device `state_string`.
    ///
    /// Never fails: an empty or non-numeric field yields `StateWord(0)`.
    /// Leading whitespace and a sign are accepted, `0x` selects base 16 and
    /// parsing stops at the first character that is not a digit. Values are
    /// reduced modulo 2^32.
    pub fn parse(state_string: &str) -> Self {
        let field = state_string.split(',').next().unwrap_or_default();
        Self(parse_leading_int(field))
    }

    pub fn power(self) -> bool {
        self.0 & POWER_MASK != 0
    }

    pub fn led(self) -> bool {
        self.0 & LED_MASK != 0
    }

    pub fn sleep(self) -> bool {
        self.0 & SLEEP_MASK != 0
    }

    pub fn cool(self) -> bool {
        self.0 & COOL_MASK != 0
    }

    pub fn warm(self) -> bool {
        self.0 & WARM_MASK != 0
    }

    pub fn speed(self) -> u8 {
        (self.0 & SPEED_MASK) as u8
    }

    pub fn brightness(self) -> u8 {
        ((self.0 & BRIGHTNESS_MASK) >> BRIGHTNESS_SHIFT) as u8
    }

    pub fn fan_timer(self) -> u8 {
        ((self.0 & TIMER_MASK) >> TIMER_SHIFT) as u8
    }

    /// Elapsed timer minutes. Reported even when no timer is set.
    pub fn fan_timer_elapsed_mins(self) -> u16 {
        (((self.0 & ELAPSED_MASK) >> ELAPSED_SHIFT) as u16) * ELAPSED_MINUTES_PER_UNIT
    }

    pub fn color(self) -> Color {
        Color::from_flags(self.cool(), self.warm())
    }
}

/// Decodes the fan attributes of a device `state_string`.
pub fn decode(state_string: &str) -> FanState {
    StateWord::parse(state_string).into()
}

fn parse_leading_int(field: &str) -> u32 {
    let s = field.trim_start();

    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match s.get(..2) {
        Some("0x" | "0X") => (16, &s[2..]),
        _ => (10, s),
    };

    let value = digits
        .chars()
        .map_while(|c| c.to_digit(radix))
        .fold(0u32, |acc, digit| acc.wrapping_mul(radix).wrapping_add(digit));

    if negative { value.wrapping_neg() } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_power_led_speed_word() {
        // 55 = 0b0011_0111: the cool bit (0x08) is clear.
        assert!(!StateWord(55).cool());

        let state = decode("55,x,y");

        assert!(state.power);
        assert!(state.led);
        assert!(!state.sleep);
        assert_eq!(state.speed, 7);
        assert_eq!(state.brightness, 0);
        assert_eq!(state.fan_timer, 0);
        assert_eq!(state.fan_timer_elapsed_mins, 0);
        assert_eq!(state.color, Color::None);
    }

    #[test]
    fn decodes_cool_word() {
        let state = decode("63");

        assert!(StateWord(63).cool());
        assert!(state.power);
        assert!(state.led);
        assert_eq!(state.speed, 7);
        assert_eq!(state.color, Color::Cool);
    }

    #[test]
    fn decodes_brightness_word() {
        let state = decode("2560");

        assert_eq!(state.brightness, 10);
        assert_eq!(state.speed, 0);
        assert!(!state.power && !state.led && !state.sleep);
        assert_eq!(state.color, Color::None);
    }

    #[test]
    fn color_truth_table() {
        assert_eq!(StateWord(0x8008).color(), Color::Daylight);
        assert_eq!(StateWord(0x0008).color(), Color::Cool);
        assert_eq!(StateWord(0x8000).color(), Color::Warm);
        assert_eq!(StateWord(0x0000).color(), Color::None);
    }

    #[test]
    fn timer_fields_use_upper_bytes() {
        let word = StateWord(0xFF0F_0000);

        assert_eq!(word.fan_timer(), 15);
        assert_eq!(word.fan_timer_elapsed_mins(), 1020);
    }

    #[test]
    fn elapsed_minutes_reported_without_active_timer() {
        let word = StateWord(0x0300_0000);

        assert_eq!(word.fan_timer(), 0);
        assert_eq!(word.fan_timer_elapsed_mins(), 12);
    }

    #[test]
    fn unparseable_fields_decode_as_zero() {
        let zero = decode("0");

        assert_eq!(decode(""), zero);
        assert_eq!(decode(",16"), zero);
        assert_eq!(decode("abc,16"), zero);
        assert_eq!(decode("0x"), zero);
        assert_eq!(decode("-"), zero);
    }

    #[test]
    fn parse_uses_leading_digits() {
        assert_eq!(StateWord::parse("  55abc,1"), StateWord(55));
        assert_eq!(StateWord::parse("12.9"), StateWord(12));
        assert_eq!(StateWord::parse("+7"), StateWord(7));
    }

    #[test]
    fn parse_accepts_hex_literals() {
        assert_eq!(StateWord::parse("0x1F"), StateWord(0x1F));
        assert_eq!(StateWord::parse("0XA00,foo"), StateWord(0xA00));
    }

    #[test]
    fn parse_wraps_to_u32() {
        assert_eq!(StateWord::parse("-1"), StateWord(u32::MAX));
        assert_eq!(StateWord::parse("4294967296"), StateWord(0));
        assert_eq!(StateWord::parse("4294967351"), StateWord(55));
    }
}
