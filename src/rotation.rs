use crate::data_provider::OrientationSample;
use eframe::egui::Color32;
use nalgebra::{matrix, Matrix3};

/// Rotation about X by `roll`.
pub fn rot_x(roll_deg: f64) -> Matrix3<f64> {
    let (s, c) = roll_deg.to_radians().sin_cos();
    matrix![
        1.0, 0.0, 0.0;
        0.0, c, -s;
        0.0, s, c
    ]
}

/// Rotation about Y by `pitch`.
pub fn rot_y(pitch_deg: f64) -> Matrix3<f64> {
    let (s, c) = pitch_deg.to_radians().sin_cos();
    matrix![
        c, 0.0, s;
        0.0, 1.0, 0.0;
        -s, 0.0, c
    ]
}

/// Rotation about Z by `yaw`.
pub fn rot_z(yaw_deg: f64) -> Matrix3<f64> {
    let (s, c) = yaw_deg.to_radians().sin_cos();
    matrix![
        c, -s, 0.0;
        s, c, 0.0;
        0.0, 0.0, 1.0
    ]
}

/// `Rz(yaw) * Ry(pitch) * Rx(roll)`: roll is applied first, yaw last.
///
/// The order is not interchangeable with other Euler conventions.
pub fn rotation_matrix(sample: &OrientationSample) -> Matrix3<f64> {
    rot_z(sample.yaw) * rot_y(sample.pitch) * rot_x(sample.roll)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Pitch,
    Roll,
    Yaw,
}

impl Axis {
    pub fn color(self) -> Color32 {
        match self {
            Axis::Pitch => Color32::BLUE,
            Axis::Roll => Color32::GREEN,
            Axis::Yaw => Color32::RED,
        }
    }

    pub fn color_name(self) -> &'static str {
        match self {
            Axis::Pitch => "blue",
            Axis::Roll => "green",
            Axis::Yaw => "red",
        }
    }
}

/// Axis with the largest absolute angle. Ties go to the first axis in
/// pitch, roll, yaw order.
pub fn dominant_axis(sample: &OrientationSample) -> Axis {
    let candidates = [
        (Axis::Roll, sample.roll.abs()),
        (Axis::Yaw, sample.yaw.abs()),
    ];

    let mut best = (Axis::Pitch, sample.pitch.abs());
    for candidate in candidates {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }

    best.0
}
