use crate::data_provider::{LineSource, OrientationSample};
use crate::mesh::Mesh;
use crate::parse::parse_orientation_line;
use crate::rotation::{dominant_axis, rotation_matrix, Axis};

pub const DEFAULT_READ_ATTEMPTS: usize = 5;

/// Bounded search for the next valid sample within one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleSearch {
    /// `attempt` reads have been used so far.
    Searching { attempt: usize },
    Found(OrientationSample),
    /// Every attempt came back empty or malformed.
    ExhaustedFallback,
}

impl SampleSearch {
    pub fn start(max_attempts: usize) -> Self {
        if max_attempts == 0 {
            Self::ExhaustedFallback
        } else {
            Self::Searching { attempt: 0 }
        }
    }

    /// Consumes one read attempt. Terminal states are returned unchanged.
    pub fn step(self, line: Option<&str>, max_attempts: usize) -> Self {
        let Self::Searching { attempt } = self else {
            return self;
        };

        if let Some(sample) = line.and_then(parse_orientation_line) {
            return Self::Found(sample);
        }

        let attempt = attempt + 1;
        if attempt >= max_attempts {
            Self::ExhaustedFallback
        } else {
            Self::Searching { attempt }
        }
    }

    pub fn is_searching(&self) -> bool {
        matches!(self, Self::Searching { .. })
    }

    /// Sample to draw. The fallback is the un-rotated frame.
    pub fn sample(&self) -> Option<OrientationSample> {
        match self {
            Self::Searching { .. } => None,
            Self::Found(sample) => Some(*sample),
            Self::ExhaustedFallback => Some(OrientationSample::ZERO),
        }
    }
}

/// Reads from `source` until a valid sample shows up or the attempts run out.
pub fn acquire_sample<S>(source: &mut S, max_attempts: usize) -> SampleSearch
where
    S: LineSource + ?Sized,
{
    let mut search = SampleSearch::start(max_attempts);
    while search.is_searching() {
        let line = source.read_line();
        search = search.step(line.as_deref(), max_attempts);
    }
    search
}

/// One displayed frame: the rotated mesh and the colour it is drawn in.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub sample: OrientationSample,
    pub axis: Axis,
    pub mesh: Mesh,
    pub fallback: bool,
}

/// Rotates `mesh` by `sample`. Pure.
pub fn render(mesh: &Mesh, sample: OrientationSample) -> Frame {
    let rotation = rotation_matrix(&sample);
    Frame {
        sample,
        axis: dominant_axis(&sample),
        mesh: mesh.rotated(&rotation),
        fallback: false,
    }
}

pub struct Renderer {
    mesh: Mesh,
    max_attempts: usize,
}

impl Renderer {
    pub fn new(mesh: Mesh, max_attempts: usize) -> Self {
        Self { mesh, max_attempts }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Frame shown before the first tick.
    pub fn initial_frame(&self) -> Frame {
        render(&self.mesh, OrientationSample::ZERO)
    }

    /// Replaces `current` with the frame for the next tick.
    pub fn update<S: LineSource + ?Sized>(&self, current: Frame, source: &mut S) -> Frame {
        let search = acquire_sample(source, self.max_attempts);
        let sample = search.sample().unwrap_or(OrientationSample::ZERO);

        let mut next = render(&self.mesh, sample);
        next.fallback = search == SampleSearch::ExhaustedFallback;

        if next.fallback && !current.fallback {
            log::debug!("no sample within {} reads, showing level frame", self.max_attempts);
        }
        if next.axis != current.axis {
            log::trace!(
                "dominant axis {:?} -> {:?} ({})",
                current.axis,
                next.axis,
                next.axis.color_name()
            );
        }

        next
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data_provider::test_source::Scripted;
    use crate::rotation::{rot_x, rot_y, rot_z};

    fn assert_same_points(a: &Mesh, b: &Mesh) {
        assert_eq!(a.shape(), b.shape());
        for i in 0..a.len() {
            assert!((a.point(i) - b.point(i)).norm() < 1e-9);
        }
    }

    #[test]
    fn zero_sample_leaves_mesh_unchanged() {
        let cup = Mesh::cup(1.0, 3.0, 30);
        let frame = render(&cup, OrientationSample::ZERO);
        assert_same_points(&frame.mesh, &cup);
        assert_eq!(frame.axis, Axis::Pitch);
    }

    #[test]
    fn single_axis_round_trip() {
        let cup = Mesh::cup(1.0, 3.0, 30);

        for theta in [-170.0, -33.3, 0.5, 45.0, 90.0, 271.0] {
            let axes = [
                OrientationSample::new(theta, 0.0, 0.0),
                OrientationSample::new(0.0, theta, 0.0),
                OrientationSample::new(0.0, 0.0, theta),
            ];
            for forward in axes {
                let back = OrientationSample::new(-forward.pitch, -forward.roll, -forward.yaw);
                let there = render(&cup, forward).mesh;
                let again = render(&there, back).mesh;
                assert_same_points(&again, &cup);
            }
        }
    }

    #[test]
    fn rotates_every_vertex() {
        let cup = Mesh::cup(1.0, 3.0, 8);
        let sample = OrientationSample::new(15.0, -40.0, 100.0);
        let frame = render(&cup, sample);
        let r = rot_z(100.0) * rot_y(15.0) * rot_x(-40.0);

        for i in 0..cup.len() {
            assert!((frame.mesh.point(i) - r * cup.point(i)).norm() < 1e-12);
        }
        assert_eq!(frame.axis, Axis::Yaw);
    }

    #[test]
    fn search_finds_first_valid_line() {
        let mut source = Scripted::new(&[
            None,
            Some("garbage"),
            Some("10,-50,20\n"),
            Some("1,2,3\n"),
        ]);
        let search = acquire_sample(&mut source, DEFAULT_READ_ATTEMPTS);

        assert_eq!(
            search,
            SampleSearch::Found(OrientationSample::new(10.0, -50.0, 20.0))
        );
        assert_eq!(source.attempts, 3);
    }

    #[test]
    fn search_exhausts_after_five_reads() {
        let mut source = Scripted::new(&[
            Some("12.5,abc,3.0"),
            None,
            Some("1,2"),
            None,
            Some(""),
            Some("1,2,3"),
        ]);
        let search = acquire_sample(&mut source, 5);

        assert_eq!(search, SampleSearch::ExhaustedFallback);
        assert_eq!(search.sample(), Some(OrientationSample::ZERO));
        assert_eq!(source.attempts, 5);
    }

    #[test]
    fn search_state_transitions() {
        let s = SampleSearch::start(2);
        assert_eq!(s, SampleSearch::Searching { attempt: 0 });
        assert_eq!(s.sample(), None);

        let s = s.step(None, 2);
        assert_eq!(s, SampleSearch::Searching { attempt: 1 });

        let s = s.step(Some("x"), 2);
        assert_eq!(s, SampleSearch::ExhaustedFallback);

        // terminal
        assert_eq!(s.step(Some("1,2,3"), 2), SampleSearch::ExhaustedFallback);
        assert_eq!(SampleSearch::start(0), SampleSearch::ExhaustedFallback);
    }

    #[test]
    fn update_falls_back_to_level_not_last_sample() {
        let renderer = Renderer::new(Mesh::cup(1.0, 3.0, 30), DEFAULT_READ_ATTEMPTS);

        let mut source = Scripted::new(&[Some("30,40,50")]);
        let frame = renderer.update(renderer.initial_frame(), &mut source);
        assert_eq!(frame.sample, OrientationSample::new(30.0, 40.0, 50.0));
        assert!(!frame.fallback);

        let mut silent = Scripted::new(&[None, None, Some("bad"), None, None]);
        let frame = renderer.update(frame, &mut silent);
        assert_eq!(frame.sample, OrientationSample::ZERO);
        assert!(frame.fallback);
        assert_eq!(frame.axis, Axis::Pitch);
        assert_same_points(&frame.mesh, renderer.mesh());
        assert_eq!(silent.attempts, 5);
    }
}
