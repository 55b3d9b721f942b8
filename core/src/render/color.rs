use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn css(&self) -> String {
        format!("rgb({},{},{})", self.red, self.green, self.blue)
    }
}

/// Speed mapped onto the gradient: 30 km/h is 0, 120 km/h is 1. Unknown speed counts as 0 km/h.
pub fn speed_fraction(speed: Option<f64>) -> f64 {
    (speed.unwrap_or(0.0) - 30.0) / 90.0
}

/// Two-segment linear blend `c1 -> c2 -> c3`, split at 0.5.
///
/// `fraction` is clamped to `[0, 1]` (NaN reads as 0) and channels are floored.
pub fn color_gradient(fraction: f64, c1: Rgb, c2: Rgb, c3: Rgb) -> Rgb {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };

    let mut fade = fraction * 2.0;
    let (from, to) = if fade >= 1.0 {
        fade -= 1.0;
        (c2, c3)
    } else {
        (c1, c2)
    };

    Rgb {
        red: blend(from.red, to.red, fade),
        green: blend(from.green, to.green, fade),
        blue: blend(from.blue, to.blue, fade),
    }
}

fn blend(from: u8, to: u8, fade: f64) -> u8 {
    let from = f64::from(from);
    let to = f64::from(to);
    (from + (to - from) * fade).floor().clamp(0.0, 255.0) as u8
}

/// Red/yellow/green fill for a station speed.
pub fn speed_color(speed: Option<f64>) -> Rgb {
    color_gradient(speed_fraction(speed), Rgb::RED, Rgb::YELLOW, Rgb::GREEN)
}
