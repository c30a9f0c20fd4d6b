//! # 图表模块
//!
//! 使用 `plotters` 绘制单个结构与掺杂集合的图表。
//! 输出格式由文件扩展名决定：`.svg` 为 SVG，其余为 PNG。
//!
//! ## 依赖关系
//! - 被 `commands/`, `graphine/viz.rs` 使用
//! - 使用 `models/`, `dops_set/`
//! - 子模块: struct_viz, set_viz

pub mod set_viz;
pub mod struct_viz;

use crate::error::{DopingsError, Result};
use crate::models::structure::ensure_parent;

use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

/// 系列颜色
pub const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

/// 发散色阶的节点，从蓝到红
const SPECTRAL: [(f64, f64, f64); 5] = [
    (94.0, 79.0, 162.0),
    (102.0, 194.0, 165.0),
    (255.0, 255.0, 191.0),
    (253.0, 174.0, 97.0),
    (158.0, 1.0, 66.0),
];

/// 第 `i` 个系列的颜色
pub fn series_color(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

/// 色阶取色，`t` 截断到 `[0, 1]`
pub fn spectral(t: f64) -> RGBColor {
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
    let pos = t * (SPECTRAL.len() - 1) as f64;
    let i = (pos.floor() as usize).min(SPECTRAL.len() - 2);
    let f = pos - i as f64;

    let (r0, g0, b0) = SPECTRAL[i];
    let (r1, g1, b1) = SPECTRAL[i + 1];
    let lerp = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// 绘图错误转换
pub fn plot_err<E: std::fmt::Debug>(e: E) -> DopingsError {
    DopingsError::PlotError(format!("{:?}", e))
}

/// 可以画到任意后端上的图
pub trait Figure {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static;
}

/// 渲染到文件，按扩展名选择 SVG 或 PNG
pub fn render<F: Figure>(figure: &F, output_path: &Path, size: (u32, u32)) -> Result<()> {
    ensure_parent(output_path)?;
    let use_svg = output_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if use_svg {
        let root = SVGBackend::new(output_path, size).into_drawing_area();
        figure.draw(&root)?;
        root.present().map_err(plot_err)?;
    } else {
        let root = BitMapBackend::new(output_path, size).into_drawing_area();
        figure.draw(&root)?;
        root.present().map_err(plot_err)?;
    }

    log::debug!("rendered {}", output_path.display());
    Ok(())
}

/// 类别轴：第 `i` 个类别位于 `x = i`
pub fn category_range(n: usize) -> Range<f64> {
    -0.5..(n.max(1) as f64 - 0.5)
}

/// 类别轴刻度标签，非整数位置为空
pub fn category_label(labels: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

/// 分组柱状图中第 `k` 组 (共 `m` 组) 在类别 `i` 上的横向范围
pub fn grouped_bar(i: usize, k: usize, m: usize) -> (f64, f64) {
    let width = 0.8 / m.max(1) as f64;
    let x0 = i as f64 - 0.4 + k as f64 * width;
    (x0, x0 + width)
}

/// 从 `from` 到 `to` 的虚线，由 `n` 段短线组成
pub fn dashes(from: (f64, f64), to: (f64, f64), n: usize, color: RGBColor) -> Vec<PathElement<(f64, f64)>> {
    let steps = 2 * n.max(1);
    let at = |t: f64| (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
    (0..steps)
        .step_by(2)
        .map(|i| {
            PathElement::new(
                vec![at(i as f64 / steps as f64), at((i + 1) as f64 / steps as f64)],
                color.stroke_width(1),
            )
        })
        .collect()
}

/// 包含所有数据并留白的范围，无数据时为 `[0, 1]`
pub fn padded_range(values: impl IntoIterator<Item = f64>, pad: f64) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if min > max {
        return 0.0..1.0;
    }
    let span = if max > min { max - min } else { min.abs().max(1.0) };
    (min - pad * span)..(max + pad * span)
}

/// 皮尔逊相关系数，长度不一致、少于两个点或方差为零时为 `None`
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// 净电荷的标准差，均值固定为 0，分母为 `n - 1`
pub fn charges_std(excess: &[f64]) -> Option<f64> {
    if excess.len() < 2 {
        return None;
    }
    let sum_sq: f64 = excess.iter().map(|x| x * x).sum();
    Some((sum_sq / (excess.len() - 1) as f64).sqrt())
}
