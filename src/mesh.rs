use nalgebra::{Matrix3, Matrix3xX, Vector3};
use std::f64::consts::TAU;

/// `count` evenly spaced values over `[start, end]`, both ends included.
fn linspace(start: f64, end: f64, count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 {
        (end - start) / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(move |i| start + step * i as f64)
}

/// A parametric surface sampled on a `rows x cols` grid.
///
/// Points are stored column-wise in a `3 x N` matrix, flattened row by row
/// (`index = row * cols + col`). The grid shape never changes; rotating
/// yields a new mesh with the same topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    points: Matrix3xX<f64>,
    rows: usize,
    cols: usize,
}

impl Mesh {
    /// Open cylinder standing on the XY plane.
    pub fn cup(radius: f64, height: f64, resolution: usize) -> Self {
        let thetas: Vec<f64> = linspace(0.0, TAU, resolution).collect();
        let zs: Vec<f64> = linspace(0.0, height, 2).collect();

        let columns: Vec<Vector3<f64>> = zs
            .iter()
            .flat_map(|z| {
                thetas
                    .iter()
                    .map(move |t| Vector3::new(radius * t.cos(), radius * t.sin(), *z))
            })
            .collect();

        Self {
            points: Matrix3xX::from_columns(&columns),
            rows: zs.len(),
            cols: thetas.len(),
        }
    }

    pub fn point(&self, index: usize) -> Vector3<f64> {
        self.points.column(index).into_owned()
    }

    pub fn len(&self) -> usize {
        self.points.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Quads between neighbouring grid cells, counter-clockwise in the
    /// parameter plane.
    pub fn faces(&self) -> impl Iterator<Item = [usize; 4]> + '_ {
        let cols = self.cols;
        (0..self.rows.saturating_sub(1)).flat_map(move |r| {
            (0..cols.saturating_sub(1)).map(move |c| {
                let i = r * cols + c;
                [i, i + 1, i + cols + 1, i + cols]
            })
        })
    }

    /// Same grid with every point multiplied by `rotation`.
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> Self {
        Self {
            points: rotation * &self.points,
            rows: self.rows,
            cols: self.cols,
        }
    }
}
