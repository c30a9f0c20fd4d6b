//! # 单结构图表
//!
//! - 键长直方图，可附带 xmgrace 可读的阶梯数据 (`.dat`)
//! - 电荷分布图：按对数标度的净得电子数着色
//!
//! ## 依赖关系
//! - 被 `commands/structs.rs`, `commands/bases.rs` 使用
//! - 使用 `viz/mod.rs` 的渲染与配色, `config.rs` 的 `viz` 配置

use crate::config::Config;
use crate::error::{DopingsError, Result};
use crate::models::structure::{ensure_parent, round_to};
use crate::models::Structure;
use crate::utils::output;
use crate::viz::{padded_range, plot_err, render, spectral, Figure};

use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ─────────────────────────────────────────────────────────────
// 键长直方图
// ─────────────────────────────────────────────────────────────

/// 成键原子对的距离
///
/// 两个原子的距离小于 `bond_crit[material]["E1-E2"]` (元素按字母序) 时视为成键。
pub fn bonds_lengths(s: &Structure, bond_crit: &BTreeMap<String, BTreeMap<String, f64>>) -> Result<Vec<f64>> {
    let material = s
        .meta
        .material
        .as_deref()
        .ok_or_else(|| DopingsError::MissingData(format!("structure {} has no material", s.name())))?;
    let crit = bond_crit
        .get(material)
        .ok_or_else(|| DopingsError::MissingKey(format!("bond_crit of material {}", material)))?;

    let mut data = Vec::new();
    for (i, a) in s.atoms.iter().enumerate() {
        for b in &s.atoms[i + 1..] {
            let mut pair = [a.elem.as_str(), b.elem.as_str()];
            pair.sort_unstable();
            let label = pair.join("-");

            let limit = crit
                .get(&label)
                .ok_or_else(|| DopingsError::MissingKey(format!("bond_crit of {} {}", material, label)))?;
            let length = a.dist_to(b);
            if length < *limit {
                data.push(length);
            }
        }
    }
    Ok(data)
}

/// 等宽分箱的计数
///
/// 第一个箱两端闭合，其余为左开右闭。范围外的值不计入。
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn new(values: &[f64], limits: [f64; 2], width: f64) -> Result<Self> {
        if width <= 0.0 || limits[1] <= limits[0] {
            return Err(DopingsError::InvalidValue(format!(
                "invalid histogram bins: limits {:?}, width {}",
                limits, width
            )));
        }

        let n_bins = ((limits[1] - limits[0]) / width + 1e-9).floor() as usize;
        if n_bins == 0 {
            return Err(DopingsError::InvalidValue(format!(
                "bin width {} larger than limits {:?}",
                width, limits
            )));
        }

        let edges: Vec<f64> = (0..=n_bins)
            .map(|i| round_to(limits[0] + width * i as f64, 10))
            .collect();
        let mut counts = vec![0; n_bins];

        for &v in values {
            if v < edges[0] || v > edges[n_bins] {
                continue;
            }
            let idx = edges[1..].iter().position(|&right| v <= right).unwrap_or(n_bins - 1);
            counts[idx] += 1;
        }

        Ok(Histogram { edges, counts })
    }

    /// (左边界, 右边界, 计数)
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.counts)
            .map(|(e, &c)| (e[0], e[1], c))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// 阶梯曲线数据：首行 `left 0`，之后每个箱 `left count` 与 `right count`
    pub fn dat_string(&self) -> String {
        let mut lines = vec![format!("{} 0", self.edges[0])];
        for (left, right, count) in self.bins() {
            lines.push(format!("{} {}", left, count));
            lines.push(format!("{} {}", right, count));
        }
        lines.join("\n") + "\n"
    }

    pub fn write_dat(&self, dat_out: &Path) -> Result<()> {
        ensure_parent(dat_out)?;
        fs::write(dat_out, self.dat_string()).map_err(|e| DopingsError::write(dat_out, e))
    }
}

struct HistogramFigure {
    title: String,
    warning: Option<String>,
    hist: Histogram,
    x_limits: [f64; 2],
    x_ticks: usize,
    y_max: f64,
}

impl Figure for HistogramFigure {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).map_err(plot_err)?;

        let area = match &self.warning {
            Some(warning) => {
                let (top, rest) = root.split_vertically(40);
                top.draw(&Text::new(
                    warning.as_str(),
                    (20, 12),
                    ("sans-serif", 18).into_font().color(&RED),
                ))
                .map_err(plot_err)?;
                rest
            }
            None => root.clone(),
        };

        let mut chart = ChartBuilder::on(&area)
            .caption(&self.title, ("sans-serif", 28).into_font())
            .margin(30)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(self.x_limits[0]..self.x_limits[1], 0.0..self.y_max)
            .map_err(plot_err)?;

        chart
            .configure_mesh()
            .x_labels(self.x_ticks)
            .y_labels(21)
            .x_label_formatter(&|x| format!("{:.2}", x))
            .y_label_formatter(&|y| format!("{:.0}", y))
            .x_desc("Bond length (Å)")
            .y_desc("Count")
            .x_label_style(("sans-serif", 14))
            .y_label_style(("sans-serif", 14))
            .axis_desc_style(("sans-serif", 18))
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(self.hist.bins().filter(|(_, _, c)| *c > 0).map(|(left, right, count)| {
                Rectangle::new([(left, 0.0), (right, count as f64)], BLUE.mix(0.6).filled())
            }))
            .map_err(plot_err)?;

        Ok(())
    }
}

/// 键长直方图
///
/// y 轴上限为该基底预期的键数，无材料信息时为找到的键数。
/// `gen_dat` 时在图旁写出同名 `.dat` 文件，分箱宽度为小刻度间隔。
pub fn histogram(s: &Structure, hist_out: &Path, gen_dat: bool, cfg: &Config) -> Result<()> {
    let hist_cfg = &cfg.viz.histogram;
    let lengths = bonds_lengths(s, &hist_cfg.bond_crit)?;
    let n_ligs = lengths.len();
    if n_ligs == 0 {
        return Err(DopingsError::MissingData(format!("zero bonds found in {}", s.name())));
    }

    let expected = match (&s.meta.material, &s.meta.base) {
        (Some(material), Some(base)) => cfg.dops_info(material)?.n_ligs.get(base).copied(),
        _ => None,
    };

    let warning = expected.filter(|&e| e != n_ligs).map(|e| {
        format!(
            "[bonds found] - [bonds expected] = {:+}",
            n_ligs as i64 - e as i64
        )
    });
    if let Some(w) = &warning {
        output::print_warning(&format!("{}: {}", hist_out.display(), w));
    }

    let stem = hist_out
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let x_ticks = ((hist_cfg.x_limits[1] - hist_cfg.x_limits[0]) / hist_cfg.delta_tick_big).round() as usize + 1;

    let figure = HistogramFigure {
        title: format!("{} - bonds: {}", stem, n_ligs),
        warning,
        hist: Histogram::new(&lengths, hist_cfg.x_limits, hist_cfg.bins_length)?,
        x_limits: hist_cfg.x_limits,
        x_ticks,
        y_max: expected.unwrap_or(n_ligs).max(1) as f64,
    };
    let [w, h] = hist_cfg.fig_size;
    render(&figure, hist_out, (w, h))?;
    output::print_path(hist_out);

    if gen_dat {
        let dat_out = hist_out.with_extension("dat");
        Histogram::new(&lengths, hist_cfg.x_limits, hist_cfg.delta_tick_small)?.write_dat(&dat_out)?;
        output::print_path(&dat_out);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 电荷分布图
// ─────────────────────────────────────────────────────────────

const SCALE_X_MAX: f64 = 0.5;
const SCALE_C: f64 = 3.5;

fn scale_k() -> f64 {
    SCALE_X_MAX / ((SCALE_X_MAX + (-SCALE_C).exp()).ln() + SCALE_C)
}

/// 对数电荷标度，`±0.5` 映射到自身
pub fn charge_scale(x: f64) -> f64 {
    let d = (-SCALE_C).exp();
    let k = scale_k();
    if x >= 0.0 {
        k * ((x + d).ln() + SCALE_C)
    } else {
        -k * ((-x + d).ln() + SCALE_C)
    }
}

/// `charge_scale` 的反函数
pub fn charge_scale_inv(y: f64) -> f64 {
    let d = (-SCALE_C).exp();
    let k = scale_k();
    if y >= 0.0 {
        (y / k - SCALE_C).exp() - d
    } else {
        -((-y / k) - SCALE_C).exp() + d
    }
}

/// 图例中的电荷值：标度 `-0.5..=0.5` 每 0.1 一个，只保留覆盖数据范围的部分
pub fn legend_charges(min_charge: f64, max_charge: f64) -> Vec<f64> {
    let values: Vec<f64> = (-5..=5)
        .map(|i| round_to(charge_scale_inv(i as f64 / 10.0), 2))
        .collect();

    let max_index = values
        .iter()
        .position(|&v| v >= max_charge)
        .unwrap_or(values.len() - 1);
    let min_index = values.iter().rposition(|&v| v <= min_charge).unwrap_or(0);

    if min_index > max_index {
        return Vec::new();
    }
    values[min_index..=max_index].to_vec()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outline {
    None,
    Thin,
    Thick,
}

#[derive(Debug, Clone)]
struct ChargePoint {
    x: f64,
    y: f64,
    scaled: f64,
    outline: Outline,
}

/// 电荷图数据
#[derive(Debug, Clone)]
pub struct ChargesData {
    points: Vec<ChargePoint>,
    /// 净得电子数 (3 位小数)
    pub charges: Vec<f64>,
    /// 超出标度范围的电荷
    pub out_of_bounds: Vec<f64>,
}

impl ChargesData {
    /// 计算净得电子数并检查总和为零
    pub fn new(s: &Structure, cfg: &Config) -> Result<Self> {
        let excess = s.excess_charges(&cfg.atoms)?;
        let total: f64 = excess.iter().sum();
        if total.abs() > 0.001 {
            return Err(DopingsError::InvalidValue(format!(
                "charges total sum is not zero ({:.4}) in {}",
                total,
                s.name()
            )));
        }

        let [lo, hi] = cfg.viz.charges_map.values_limits;
        let charges: Vec<f64> = excess.iter().map(|q| round_to(*q, 3)).collect();
        let out_of_bounds = charges.iter().copied().filter(|&q| q < lo || q > hi).collect();

        // 碳在最下层，其后是氢和掺杂原子
        let mut points: Vec<ChargePoint> = s
            .atoms
            .iter()
            .zip(&charges)
            .map(|(atom, &q)| ChargePoint {
                x: atom.coord[0],
                y: atom.coord[1],
                scaled: round_to(charge_scale(q), 3),
                outline: match atom.elem.as_str() {
                    "C" => Outline::None,
                    "H" => Outline::Thin,
                    _ => Outline::Thick,
                },
            })
            .collect();
        points.sort_by_key(|p| match p.outline {
            Outline::None => 0,
            Outline::Thin => 1,
            Outline::Thick => 2,
        });

        Ok(ChargesData {
            points,
            charges,
            out_of_bounds,
        })
    }

    fn charge_range(&self) -> (f64, f64) {
        self.charges
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &q| (lo.min(q), hi.max(q)))
    }
}

struct ChargesFigure {
    title: String,
    warning: Option<String>,
    data: ChargesData,
    limits: [f64; 2],
}

impl ChargesFigure {
    fn norm(&self, scaled: f64) -> f64 {
        (scaled - self.limits[0]) / (self.limits[1] - self.limits[0])
    }

    fn radius(&self, scaled: f64) -> u32 {
        (4.0 + 8.0 * self.norm(scaled).clamp(0.0, 1.0)).round() as u32
    }
}

impl Figure for ChargesFigure {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).map_err(plot_err)?;

        let area = match &self.warning {
            Some(warning) => {
                let (top, rest) = root.split_vertically(40);
                top.draw(&Text::new(
                    warning.as_str(),
                    (20, 12),
                    ("sans-serif", 16).into_font().color(&RED),
                ))
                .map_err(plot_err)?;
                rest
            }
            None => root.clone(),
        };

        let points = &self.data.points;
        let mut chart = ChartBuilder::on(&area)
            .caption(&self.title, ("sans-serif", 28).into_font())
            .margin(30)
            .build_cartesian_2d(
                padded_range(points.iter().map(|p| p.x), 0.05),
                padded_range(points.iter().map(|p| p.y), 0.05),
            )
            .map_err(plot_err)?;

        chart
            .draw_series(points.iter().map(|p| {
                Circle::new((p.x, p.y), self.radius(p.scaled), spectral(self.norm(p.scaled)).filled())
            }))
            .map_err(plot_err)?;

        chart
            .draw_series(points.iter().filter(|p| p.outline != Outline::None).map(|p| {
                let width = if p.outline == Outline::Thick { 2 } else { 1 };
                Circle::new((p.x, p.y), self.radius(p.scaled), BLACK.stroke_width(width))
            }))
            .map_err(plot_err)?;

        // 图例
        let (min_q, max_q) = self.data.charge_range();
        let legend = legend_charges(min_q, max_q);
        let (x0, y0) = (40, 90);
        area.draw(&Text::new("Gained electrons", (x0, y0), ("sans-serif", 16).into_font()))
            .map_err(plot_err)?;
        for (i, q) in legend.iter().rev().enumerate() {
            let scaled = charge_scale(*q);
            let y = y0 + 30 + 26 * i as i32;
            area.draw(&Circle::new((x0 + 12, y), self.radius(scaled), spectral(self.norm(scaled)).filled()))
                .map_err(plot_err)?;
            area.draw(&Text::new(
                format!("{:.2}", q),
                (x0 + 32, y - 8),
                ("sans-serif", 14).into_font(),
            ))
            .map_err(plot_err)?;
        }

        Ok(())
    }
}

/// 电荷分布图
pub fn charges_map(s: &Structure, map_out: &Path, cfg: &Config) -> Result<()> {
    let map_cfg = &cfg.viz.charges_map;
    let data = ChargesData::new(s, cfg)?;

    let warning = if data.out_of_bounds.is_empty() {
        None
    } else {
        Some(format!(
            "Charges out of the scale limits: {:?} - limits: {:?}",
            data.out_of_bounds, map_cfg.values_limits
        ))
    };
    if let Some(w) = &warning {
        output::print_warning(&format!("{}: {}", map_out.display(), w));
    }

    let stem = map_out
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let figure = ChargesFigure {
        title: format!("{} - atoms: {}", stem, s.size()),
        warning,
        data,
        limits: map_cfg.values_limits,
    };

    let [w, h] = map_cfg.fig_size;
    render(&figure, map_out, (w, h))?;
    output::print_path(map_out);
    Ok(())
}
