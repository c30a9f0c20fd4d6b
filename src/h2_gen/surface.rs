//! # 结构曲面拟合
//!
//! 用最小二乘把原子坐标拟合为曲面
//! `z = C0 + C1 x + ... + Cn x^n + C(n+1) y + ... + C(2n) y^n`，
//! H2 沿该曲面摆放，与结构保持固定距离。
//!
//! 正规方程 `A C = B` 中 `A[i][j] = Σ φi φj`，`B[i] = Σ φi z`，用 LU 分解求解。

use crate::error::{DopingsError, Result};

use nalgebra::{DMatrix, DVector, Vector3};

/// 第 `i` 个基函数：`φ0 = 1`，`φ1..φn = x^i`，`φ(n+1)..φ(2n) = y^(i-n)`
pub fn phi(i: usize, degree: usize, x: f64, y: f64) -> f64 {
    if i == 0 {
        1.0
    } else if i <= degree {
        x.powi(i as i32)
    } else {
        y.powi((i - degree) as i32)
    }
}

/// 拟合得到的曲面
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub degree: usize,
    pub coeffs: DVector<f64>,
}

impl Surface {
    /// 对点集做 `degree` 次拟合
    pub fn fit(points: &[Vector3<f64>], degree: usize) -> Result<Self> {
        let m = 2 * degree + 1;
        if points.len() < m {
            return Err(DopingsError::InvalidValue(format!(
                "a degree {} surface needs at least {} atoms, got {}",
                degree,
                m,
                points.len()
            )));
        }

        let a = DMatrix::from_fn(m, m, |i, j| {
            points
                .iter()
                .map(|p| phi(i, degree, p.x, p.y) * phi(j, degree, p.x, p.y))
                .sum::<f64>()
        });
        let b = DVector::from_fn(m, |i, _| {
            points.iter().map(|p| phi(i, degree, p.x, p.y) * p.z).sum::<f64>()
        });

        let coeffs = a
            .lu()
            .solve(&b)
            .ok_or_else(|| DopingsError::InvalidValue("surface fit is singular".to_string()))?;

        Ok(Surface { degree, coeffs })
    }

    /// 曲面在 `(x, y)` 处的高度
    pub fn z(&self, x: f64, y: f64) -> f64 {
        self.coeffs
            .iter()
            .enumerate()
            .map(|(i, c)| c * phi(i, self.degree, x, y))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phi() {
        assert_eq!(phi(0, 3, 2.0, 5.0), 1.0);
        assert_eq!(phi(2, 3, 2.0, 5.0), 4.0);
        assert_eq!(phi(3, 3, 2.0, 5.0), 8.0);
        assert_eq!(phi(5, 3, 2.0, 5.0), 25.0);
    }

    #[test]
    fn test_fit_tilted_plane() {
        let points: Vec<Vector3<f64>> = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (2.0, 3.0), (-1.0, 2.0)]
            .iter()
            .map(|&(x, y)| Vector3::new(x, y, 1.0 + 0.5 * x - 0.25 * y))
            .collect();

        let surface = Surface::fit(&points, 1).unwrap();
        assert!((surface.coeffs[0] - 1.0).abs() < 1e-9);
        assert!((surface.coeffs[1] - 0.5).abs() < 1e-9);
        assert!((surface.coeffs[2] + 0.25).abs() < 1e-9);
        assert!((surface.z(4.0, 4.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_cubic_in_x() {
        let points: Vec<Vector3<f64>> = (-3..=3)
            .flat_map(|i| (-2..=2).map(move |j| (i as f64, j as f64)))
            .map(|(x, y)| Vector3::new(x, y, 0.1 * x.powi(3) + y * y))
            .collect();

        let surface = Surface::fit(&points, 3).unwrap();
        assert!((surface.z(1.5, 0.5) - (0.1 * 1.5f64.powi(3) + 0.25)).abs() < 1e-8);
    }

    #[test]
    fn test_fit_needs_enough_points() {
        let points = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 0.0)];
        assert!(Surface::fit(&points, 1).is_err());

        // 所有点共线时方程奇异
        let line: Vec<Vector3<f64>> = (0..5).map(|i| Vector3::new(i as f64, 0.0, 0.0)).collect();
        assert!(Surface::fit(&line, 1).is_err());
    }
}
