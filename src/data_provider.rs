use eframe::egui;

/// Orientation in degrees as sent by the board, one sample per line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl OrientationSample {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(pitch: f64, roll: f64, yaw: f64) -> Self {
        Self { pitch, roll, yaw }
    }
}

/// Two-axis variant without yaw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltSample {
    pub pitch: f64,
    pub roll: f64,
}

/// Anything that yields raw decoded lines, one read attempt at a time.
pub trait LineSource {
    /// Returns `None` for an empty read (timeout, no data, closed link).
    fn read_line(&mut self) -> Option<String>;
}

pub trait DataProviderUi {
    fn show(&mut self, ui: &mut egui::Ui);
}
