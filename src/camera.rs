use crate::mesh::Mesh;
use nalgebra::Vector3;

/// Orthographic view looking at the origin from a given elevation and
/// azimuth, in degrees.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    right: Vector3<f64>,
    up: Vector3<f64>,
    toward_eye: Vector3<f64>,
}

impl Camera {
    pub fn new(elevation_deg: f64, azimuth_deg: f64) -> Self {
        let (se, ce) = elevation_deg.to_radians().sin_cos();
        let (sa, ca) = azimuth_deg.to_radians().sin_cos();

        Self {
            right: Vector3::new(-sa, ca, 0.0),
            up: Vector3::new(-se * ca, -se * sa, ce),
            toward_eye: Vector3::new(ce * ca, ce * sa, se),
        }
    }

    /// Screen position and depth; larger depth is closer to the viewer.
    pub fn project(&self, p: &Vector3<f64>) -> ([f64; 2], f64) {
        ([self.right.dot(p), self.up.dot(p)], self.toward_eye.dot(p))
    }

    /// Projected faces of `mesh`, far ones first.
    pub fn ordered_faces(&self, mesh: &Mesh) -> Vec<ProjectedFace> {
        let mut faces: Vec<ProjectedFace> = mesh
            .faces()
            .map(|face| {
                let mut depth = 0.0;
                let outline = face
                    .iter()
                    .map(|i| {
                        let (xy, d) = self.project(&mesh.point(*i));
                        depth += d;
                        xy
                    })
                    .collect();
                ProjectedFace {
                    depth: depth / face.len() as f64,
                    outline,
                }
            })
            .collect();

        faces.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        faces
    }

    /// Screen rectangle `(min, max)` enclosing the box spanned by `lo` and `hi`.
    pub fn bounds(&self, lo: Vector3<f64>, hi: Vector3<f64>) -> ([f64; 2], [f64; 2]) {
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];

        for i in 0..8 {
            let corner = Vector3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            let (xy, _) = self.project(&corner);
            for k in 0..2 {
                min[k] = min[k].min(xy[k]);
                max[k] = max[k].max(xy[k]);
            }
        }

        (min, max)
    }
}

#[derive(Debug, Clone)]
pub struct ProjectedFace {
    /// Mean depth of the corners.
    pub depth: f64,
    pub outline: Vec<[f64; 2]>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(30.0, -60.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basis_is_orthonormal() {
        let cam = Camera::new(25.0, 130.0);
        assert!((cam.right.norm() - 1.0).abs() < 1e-12);
        assert!((cam.up.norm() - 1.0).abs() < 1e-12);
        assert!(cam.right.dot(&cam.up).abs() < 1e-12);
        assert!(cam.right.dot(&cam.toward_eye).abs() < 1e-12);
        assert!(cam.up.dot(&cam.toward_eye).abs() < 1e-12);
    }

    #[test]
    fn top_down_view() {
        let cam = Camera::new(90.0, -90.0);
        let (xy, depth) = cam.project(&Vector3::new(1.0, 2.0, 3.0));
        assert!((xy[0] - 1.0).abs() < 1e-12);
        assert!((xy[1] - 2.0).abs() < 1e-12);
        assert!((depth - 3.0).abs() < 1e-12);
    }

    #[test]
    fn bounds_of_unit_box_from_above() {
        let cam = Camera::new(90.0, -90.0);
        let (min, max) = cam.bounds(Vector3::new(-1.0, -2.0, 0.0), Vector3::new(1.0, 2.0, 4.0));
        assert!((min[0] + 1.0).abs() < 1e-12 && (max[0] - 1.0).abs() < 1e-12);
        assert!((min[1] + 2.0).abs() < 1e-12 && (max[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn far_faces_first() {
        let cam = Camera::default();
        let cup = Mesh::cup(1.0, 3.0, 30);
        let faces = cam.ordered_faces(&cup);

        assert_eq!(faces.len(), 29);
        assert!(faces.iter().all(|f| f.outline.len() == 4));
        assert!(faces.windows(2).all(|w| w[0].depth <= w[1].depth));
        assert!(faces[0].depth < faces[28].depth);
    }
}
