//! Echo duration to distance conversion.

use std::time::Duration;

/// Speed of sound at 0 °C in m/s.
pub const SPEED_OF_SOUND_AT_ZERO_C: f64 = 331.0;

/// Increase of the speed of sound per degree Celsius in m/s.
pub const SPEED_OF_SOUND_PER_DEGREE: f64 = 0.6;

/// Ambient temperatures the linear approximation is meant for.
pub const PLAUSIBLE_AMBIENT_RANGE_C: std::ops::RangeInclusive<f64> = -20.0..=60.0;

/// Speed of sound in air in m/s for the given ambient temperature.
pub fn speed_of_sound(ambient_c: f64) -> f64 {
    SPEED_OF_SOUND_AT_ZERO_C + SPEED_OF_SOUND_PER_DEGREE * ambient_c
}

/// Distance in centimeters for a round-trip echo duration.
pub fn distance_cm(echo: Duration, ambient_c: f64) -> f64 {
    echo.as_secs_f64() * speed_of_sound(ambient_c) / 2.0 * 100.0
}

pub fn is_plausible_ambient(ambient_c: f64) -> bool {
    PLAUSIBLE_AMBIENT_RANGE_C.contains(&ambient_c)
}
