//! # H2 中心在平面上的分布
//!
//! - 薄片：以碳原子最远距离为半径的正六边形分成 6 个三角形，每个三角形
//!   再细分为 `T(m)` 个小三角形 (`T` 为三角形数)，在小三角形重心中随机抽取。
//! - 周期性结构：晶胞分成 `n × n` 网格 (`n²` 为不小于数量的最小平方数)，
//!   在网格中心中随机抽取。

use crate::models::Structure;
use crate::parsers::gen_cell::Cell;

use nalgebra::{Rotation2, Vector2, Vector3};
use rand::seq::SliceRandom;
use rand::Rng;
use std::f64::consts::FRAC_PI_3;

/// 小三角形重心相对角点的偏移比例
const TRIANGLE_OFFSET: f64 = 0.03;

/// 第 `n` 个三角形数
fn triangular(n: usize) -> usize {
    n * (n + 1) / 2
}

/// 使 6 个三角形能容纳 `count` 个 H2 的最小细分
pub fn smallest_triangular(count: usize) -> usize {
    (0..).find(|&m| 6 * triangular(m) >= count).unwrap_or_default()
}

/// 碳原子离原点的最远距离
pub fn flake_radius(s: &Structure) -> f64 {
    s.atoms
        .iter()
        .filter(|a| a.elem == "C")
        .map(|a| Vector3::from(a.coord).norm())
        .fold(0.0, f64::max)
}

/// 由 `v0`, `v1` 张成的三角形细分为 `T(n)` 个朝向相同的小三角形，返回其重心
pub fn triangle_centers(v0: Vector2<f64>, v1: Vector2<f64>, n: usize) -> Vec<Vector2<f64>> {
    if n == 0 {
        return Vec::new();
    }

    let u0 = v0 / n as f64;
    let u1 = v1 / n as f64;
    let offset = (u0 + v1) * TRIANGLE_OFFSET;
    let center = (u0 + u1) / 3.0;

    let mut centers = Vec::with_capacity(triangular(n));
    for k in 0..n {
        for l in 0..n - k {
            centers.push(offset + center + u0 * k as f64 + u1 * l as f64);
        }
    }
    centers
}

/// 薄片上的 `count` 个 H2 中心，`main_vector` 为六边形一个顶点的方向 (默认 x 轴)
pub fn flake_centers(
    s: &Structure,
    count: usize,
    main_vector: Option<Vector2<f64>>,
    rng: &mut impl Rng,
) -> Vec<Vector2<f64>> {
    if count == 0 {
        return Vec::new();
    }

    let radius = flake_radius(s);
    let m = smallest_triangular(count);

    let first = main_vector
        .and_then(|v| v.try_normalize(f64::EPSILON))
        .unwrap_or_else(Vector2::x)
        * radius;
    let rotation = Rotation2::new(FRAC_PI_3);
    let mut vertices = vec![first];
    for _ in 0..5 {
        let last = vertices[vertices.len() - 1];
        vertices.push(rotation * last);
    }

    // 余数分给前面的三角形
    let mut centers = Vec::with_capacity(count);
    for i in 0..6 {
        let samples = count / 6 + usize::from(i < count % 6);
        let candidates = triangle_centers(vertices[i], vertices[(i + 1) % 6], m);
        centers.extend(candidates.choose_multiple(rng, samples).copied());
    }
    centers
}

/// 周期性晶胞中的 `count` 个 H2 中心，坐标相对晶胞原点
pub fn periodic_centers(cell: &Cell, count: usize, rng: &mut impl Rng) -> Vec<Vector2<f64>> {
    let n = (0..).find(|&n: &usize| n * n >= count).unwrap_or_default();
    if n == 0 {
        return Vec::new();
    }

    let step = 1.0 / n as f64;
    let v0 = cell.vectors[0].xy();
    let v1 = cell.vectors[1].xy();
    let offset = (v0 + v1) * (step / 2.0);

    let points: Vec<(usize, usize)> = (0..n).flat_map(|r| (0..n).map(move |c| (r, c))).collect();
    points
        .choose_multiple(rng, count)
        .map(|&(r, c)| v0 * (c as f64 * step) + v1 * (r as f64 * step) + offset)
        .collect()
}
