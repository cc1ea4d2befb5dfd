use crate::data_provider::{LineSource, TiltSample};
use crate::parse::parse_tilt_line;
use nalgebra::{Rotation2, Vector2};
use std::collections::VecDeque;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

pub const DEFAULT_WINDOW: usize = 200;

const BAR_HALF_LENGTH: f64 = 1.5;
const BAR_HALF_THICKNESS: f64 = 0.1;

/// Rolling window of the most recent pitch/roll samples.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TiltHistory {
    #[serde(skip_serializing)]
    window: usize,
    pitch: VecDeque<f64>,
    roll: VecDeque<f64>,
}

impl TiltHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            pitch: VecDeque::with_capacity(window),
            roll: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.pitch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitch.is_empty()
    }

    pub fn push(&mut self, sample: TiltSample) {
        if self.window == 0 {
            return;
        }
        if self.pitch.len() == self.window {
            self.pitch.pop_front();
            self.roll.pop_front();
        }
        self.pitch.push_back(sample.pitch);
        self.roll.push_back(sample.roll);
    }

    /// Reads up to `max_attempts` lines and keeps every valid sample. An
    /// empty read ends the tick early. Returns the number of samples added.
    pub fn ingest<S>(&mut self, source: &mut S, max_attempts: usize) -> usize
    where
        S: LineSource + ?Sized,
    {
        let mut added = 0;
        for _ in 0..max_attempts {
            let Some(line) = source.read_line() else {
                break;
            };
            if let Some(sample) = parse_tilt_line(&line) {
                self.push(sample);
                added += 1;
            }
        }
        added
    }

    pub fn pitch_series(&self) -> Vec<[f64; 2]> {
        Self::series(&self.pitch)
    }

    pub fn roll_series(&self) -> Vec<[f64; 2]> {
        Self::series(&self.roll)
    }

    fn series(values: &VecDeque<f64>) -> Vec<[f64; 2]> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| [i as f64, *v])
            .collect()
    }

    /// Visible sample range on the x axis.
    pub fn x_bounds(&self) -> (f64, f64) {
        let n = self.len();
        (
            n.saturating_sub(self.window) as f64,
            self.window.max(n) as f64,
        )
    }

    pub fn latest_pitch(&self) -> Option<f64> {
        self.pitch.back().copied()
    }

    pub fn save_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json_string = serde_json::to_string(self)?;

        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        log::info!("saved {} samples to {}", self.len(), path.display());
        Ok(())
    }
}

/// Corners of the tilt bar rotated about the origin by `angle_deg`.
pub fn bar_outline(angle_deg: f64) -> Vec<[f64; 2]> {
    let rotation = Rotation2::new(angle_deg.to_radians());
    [
        Vector2::new(-BAR_HALF_LENGTH, -BAR_HALF_THICKNESS),
        Vector2::new(BAR_HALF_LENGTH, -BAR_HALF_THICKNESS),
        Vector2::new(BAR_HALF_LENGTH, BAR_HALF_THICKNESS),
        Vector2::new(-BAR_HALF_LENGTH, BAR_HALF_THICKNESS),
    ]
    .iter()
    .map(|corner| {
        let p = rotation * corner;
        [p.x, p.y]
    })
    .collect()
}
