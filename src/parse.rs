use crate::data_provider::{OrientationSample, TiltSample};
use regex::Regex;
use std::sync::LazyLock;

static LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Roll:\s*(-?\d+\.?\d*)\s*\|\s*Pitch:\s*(-?\d+\.?\d*)").unwrap()
});

/// Splits a comma separated line into exactly `N` numbers.
fn parse_fields<const N: usize>(line: &str) -> Option<[f64; N]> {
    let mut values = [0.0; N];
    let mut parts = line.trim().split(',');

    for value in values.iter_mut() {
        *value = parts.next()?.trim().parse().ok()?;
    }

    if parts.next().is_some() {
        return None;
    }

    Some(values)
}

/// `pitch,roll,yaw`
pub fn parse_orientation_line(line: &str) -> Option<OrientationSample> {
    let [pitch, roll, yaw] = parse_fields::<3>(line)?;
    Some(OrientationSample { pitch, roll, yaw })
}

/// `pitch,roll`
pub fn parse_tilt_line(line: &str) -> Option<TiltSample> {
    let [pitch, roll] = parse_fields::<2>(line)?;
    Some(TiltSample { pitch, roll })
}

/// Free text containing `Roll: <n> | Pitch: <n>` somewhere in the line.
pub fn parse_labelled_line(line: &str) -> Option<TiltSample> {
    let caps = LABELLED.captures(line)?;
    let roll = caps[1].parse().ok()?;
    let pitch = caps[2].parse().ok()?;
    Some(TiltSample { pitch, roll })
}
