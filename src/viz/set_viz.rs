//! # 掺杂集合图表
//!
//! 折线图按类别轴 (位点或掺杂元素) 绘制：
//! - HOMO/LUMO 随位点、随掺杂元素的变化
//! - 每原子形成能随位点的网格图，可附带偶极矩或电荷标准差作为第二变量
//! - 每原子形成能随掺杂元素的变化
//!
//! 先由集合构建 `Panel`，再渲染到文件。
//!
//! ## 依赖关系
//! - 被 `commands/sets.rs` 使用
//! - 使用 `dops_set/`, `viz/mod.rs`

use crate::dops_set::DopsSet;
use crate::error::{DopingsError, Result};
use crate::models::Structure;
use crate::utils::output;
use crate::viz::{
    category_label, category_range, charges_std, dashes, padded_range, pearson, plot_err, render, series_color,
    Figure,
};

use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt;
use std::path::PathBuf;

/// 形成能图的第二变量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondVar {
    /// 偶极矩模长
    Dipole,
    /// 净电荷标准差
    Std,
}

impl fmt::Display for SecondVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondVar::Dipole => write!(f, "dipole"),
            SecondVar::Std => write!(f, "std"),
        }
    }
}

/// 一条折线
#[derive(Debug, Clone)]
pub struct Curve {
    pub name: String,
    pub values: Vec<f64>,
    pub color: RGBColor,
}

/// 一个折线图面板
#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    /// 类别轴标签
    pub labels: Vec<String>,
    pub curves: Vec<Curve>,
    /// 右侧坐标轴上的折线
    pub secondary: Option<Curve>,
    pub y_range: Option<[f64; 2]>,
    pub y_desc: String,
    /// 竖直分隔线的位置
    pub separators: Vec<f64>,
}

impl Panel {
    fn new(title: String, labels: Vec<String>, y_desc: &str) -> Self {
        Panel {
            title,
            labels,
            curves: Vec::new(),
            secondary: None,
            y_range: None,
            y_desc: y_desc.to_string(),
            separators: Vec::new(),
        }
    }

    fn with_curve(mut self, name: &str, values: Vec<f64>) -> Self {
        let color = series_color(self.curves.len());
        self.curves.push(Curve {
            name: name.to_string(),
            values,
            color,
        });
        self
    }

    /// 配置的范围无效 (如未配置时的 `[0, 0]`) 时自动取范围
    fn with_y_range(mut self, range: Option<[f64; 2]>) -> Self {
        self.y_range = range.filter(|[lo, hi]| lo < hi);
        self
    }

    fn draw_on<DB>(&self, area: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let n = self.labels.len();
        let y_range = match self.y_range {
            Some([lo, hi]) => lo..hi,
            None => padded_range(self.curves.iter().flat_map(|c| c.values.iter().copied()), 0.1),
        };
        let y2_range = match &self.secondary {
            Some(curve) => padded_range(curve.values.iter().copied(), 0.1),
            None => 0.0..1.0,
        };

        let mut chart = ChartBuilder::on(area)
            .caption(&self.title, ("sans-serif", 22).into_font())
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .right_y_label_area_size(if self.secondary.is_some() { 60 } else { 0 })
            .build_cartesian_2d(category_range(n), y_range.clone())
            .map_err(plot_err)?
            .set_secondary_coord(category_range(n), y2_range);

        let labels = &self.labels;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n.max(1))
            .x_label_formatter(&|x| category_label(labels, *x))
            .y_desc(self.y_desc.as_str())
            .x_label_style(("sans-serif", 14))
            .y_label_style(("sans-serif", 14))
            .axis_desc_style(("sans-serif", 16))
            .draw()
            .map_err(plot_err)?;

        for x in &self.separators {
            chart
                .draw_series(dashes((*x, y_range.start), (*x, y_range.end), 20, BLACK))
                .map_err(plot_err)?;
        }

        for curve in &self.curves {
            let color = curve.color;
            let points: Vec<(f64, f64)> = curve.values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect();

            chart
                .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
                .map_err(plot_err)?
                .label(curve.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            chart
                .draw_series(
                    points
                        .iter()
                        .map(|p| EmptyElement::at(*p) + Rectangle::new([(-4, -4), (4, 4)], color.filled())),
                )
                .map_err(plot_err)?;
        }

        if let Some(curve) = &self.secondary {
            let color = curve.color;
            let points: Vec<(f64, f64)> = curve.values.iter().enumerate().map(|(i, v)| (i as f64, *v)).collect();

            chart
                .configure_secondary_axes()
                .y_desc(curve.name.as_str())
                .label_style(("sans-serif", 14))
                .axis_desc_style(("sans-serif", 16))
                .draw()
                .map_err(plot_err)?;
            chart
                .draw_secondary_series(LineSeries::new(points.clone(), color.stroke_width(2)))
                .map_err(plot_err)?
                .label(curve.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            chart
                .draw_secondary_series(
                    points
                        .iter()
                        .map(|p| EmptyElement::at(*p) + Rectangle::new([(-4, -4), (4, 4)], color.filled())),
                )
                .map_err(plot_err)?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(("sans-serif", 14))
            .draw()
            .map_err(plot_err)?;

        Ok(())
    }
}

impl Figure for Panel {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).map_err(plot_err)?;
        self.draw_on(root)
    }
}

/// 面板网格，按行填充
#[derive(Debug, Clone)]
pub struct PanelGrid {
    pub rows: usize,
    pub cols: usize,
    pub panels: Vec<Panel>,
}

impl Figure for PanelGrid {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).map_err(plot_err)?;
        for (area, panel) in root.split_evenly((self.rows, self.cols)).iter().zip(&self.panels) {
            panel.draw_on(area)?;
        }
        Ok(())
    }
}

/// 位点类别字母变化处的分隔线
fn kind_separators(sites: &[String]) -> Vec<f64> {
    sites
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0].chars().next() != w[1].chars().next())
        .map(|(i, _)| i as f64 + 0.5)
        .collect()
}

fn site_of(s: &Structure) -> String {
    s.meta.site.clone().unwrap_or_default()
}

fn dop_elem_of(s: &Structure) -> String {
    s.meta.dop_elem.clone().unwrap_or_default()
}

fn homo_lumo_curves(panel: Panel, structs: &[&Structure]) -> Result<Panel> {
    let mut homos = Vec::with_capacity(structs.len());
    let mut lumos = Vec::with_capacity(structs.len());
    for s in structs {
        let (homo, lumo, _) = s.homo_lumo()?;
        homos.push(homo);
        lumos.push(lumo);
    }
    Ok(panel.with_curve("HOMO", homos).with_curve("LUMO", lumos))
}

/// 所有集合中某个基底、位点的结构，按集合顺序
fn structs_at<'a>(sets: &'a [DopsSet], base: &str, site: &str) -> Vec<&'a Structure> {
    sets.iter().filter_map(|set| set.find(base, site)).collect()
}

fn first_set<'a, 'c>(sets: &'a [DopsSet<'c>]) -> Result<&'a DopsSet<'c>> {
    sets.first()
        .ok_or_else(|| DopingsError::InvalidValue("at least one set is needed".to_string()))
}

fn render_panels(panels: Vec<(PathBuf, Panel)>, size: (u32, u32)) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(panels.len());
    for (path, panel) in panels {
        render(&panel, &path, size)?;
        output::print_path(&path);
        written.push(path);
    }
    Ok(written)
}

// ─────────────────────────────────────────────────────────────
// HOMO/LUMO
// ─────────────────────────────────────────────────────────────

/// 每个基底一张：HOMO/LUMO 随位点变化
pub fn gap_site_panels(set: &DopsSet) -> Result<Vec<(PathBuf, Panel)>> {
    let cfg = set.config();
    let out_dir = cfg
        .dirs
        .processing_output
        .join(set.material())
        .join("gap_graphs")
        .join("site_x_gap");

    let mut panels = Vec::new();
    for base in &set.info.bases {
        let structs = set.structs_of_base(base);
        if structs.is_empty() {
            output::print_skip(&format!("No structures of {}-{}", set.dop_elem, base));
            continue;
        }

        let labels = structs.iter().map(|s| site_of(s)).collect();
        let panel = Panel::new(format!("HOMO LUMO | {}-{}", set.dop_elem, base), labels, "HOMO - LUMO (eV)")
            .with_y_range(Some(set.info.graphs_config.ylims.gap));
        panels.push((
            out_dir.join(format!("{}-{}.png", base, set.dop_elem)),
            homo_lumo_curves(panel, &structs)?,
        ));
    }
    Ok(panels)
}

pub fn gap_site_graph(set: &DopsSet) -> Result<Vec<PathBuf>> {
    render_panels(gap_site_panels(set)?, (1500, 500))
}

/// 每个基底、位点一张：HOMO/LUMO 随掺杂元素变化
pub fn gap_elem_panels(sets: &[DopsSet]) -> Result<Vec<(PathBuf, Panel)>> {
    let first = first_set(sets)?;
    let info = &first.info;
    let out_dir = first
        .config()
        .dirs
        .processing_output
        .join(first.material())
        .join("gap_graphs")
        .join("elem_x_gap");

    let mut panels = Vec::new();
    for base in &info.bases {
        for site in &info.sites[base] {
            let structs = structs_at(sets, base, site);
            if structs.is_empty() {
                continue;
            }

            let labels = structs.iter().map(|s| dop_elem_of(s)).collect();
            let panel = Panel::new(format!("HOMO LUMO | {}-{}", base, site), labels, "HOMO - LUMO (eV)")
                .with_y_range(Some(info.graphs_config.ylims.gap));
            panels.push((
                out_dir.join(format!("{}-{}.png", base, site)),
                homo_lumo_curves(panel, &structs)?,
            ));
        }
    }
    Ok(panels)
}

pub fn gap_elem_graph(sets: &[DopsSet]) -> Result<Vec<PathBuf>> {
    render_panels(gap_elem_panels(sets)?, (800, 400))
}

// ─────────────────────────────────────────────────────────────
// 形成能
// ─────────────────────────────────────────────────────────────

fn second_value(s: &Structure, var: SecondVar, set: &DopsSet) -> Result<f64> {
    match var {
        SecondVar::Dipole => s
            .dipole_norm()
            .ok_or_else(|| DopingsError::MissingData(format!("dipole of {} not read", s.name()))),
        SecondVar::Std => {
            let excess = s.excess_charges(&set.config().atoms)?;
            charges_std(&excess)
                .ok_or_else(|| DopingsError::MissingData(format!("not enough charges in {}", s.name())))
        }
    }
}

/// 网格：行为基底，列为集合，第二变量画在右侧坐标轴
pub fn energ_site_panels(sets: &[DopsSet], second_var: Option<SecondVar>, show_cov: bool) -> Result<(PathBuf, PanelGrid)> {
    if sets.len() < 2 {
        return Err(DopingsError::InvalidValue(
            "at least two sets are needed in sets_list".to_string(),
        ));
    }
    let first = &sets[0];
    let bases = &first.info.bases;

    let mut panels = Vec::with_capacity(bases.len() * sets.len());
    for base in bases {
        for set in sets {
            let structs = set.structs_of_base(base);
            let labels: Vec<String> = structs.iter().map(|s| site_of(s)).collect();

            let mut energies = Vec::with_capacity(structs.len());
            for s in &structs {
                energies.push(s.formation_energy(&set.config().atoms)?.1);
            }

            let mut title = format!("{}-{}", set.dop_elem, base);
            let separators = kind_separators(&labels);
            let mut panel = Panel::new(String::new(), labels, "Formation energy (eV/atom)").with_curve("energy", energies.clone());
            panel.separators = separators;

            if let Some(var) = second_var {
                let values = structs
                    .iter()
                    .map(|s| second_value(s, var, set))
                    .collect::<Result<Vec<f64>>>()?;
                if show_cov {
                    match pearson(&energies, &values) {
                        Some(r) => title.push_str(&format!(" - COV = {:.2}", r)),
                        None => title.push_str(" - COV = nan"),
                    }
                }
                panel.secondary = Some(Curve {
                    name: var.to_string(),
                    values,
                    color: RED,
                });
            }

            panel.title = title;
            panels.push(panel);
        }
    }

    let name = second_var.map(|v| v.to_string()).unwrap_or_else(|| "energy".to_string());
    let path = first
        .config()
        .dirs
        .processing_output
        .join(first.material())
        .join("energy_correlations")
        .join("sites")
        .join(format!("{}.png", name));

    Ok((
        path,
        PanelGrid {
            rows: bases.len(),
            cols: sets.len(),
            panels,
        },
    ))
}

pub fn energ_site_graph(sets: &[DopsSet], second_var: Option<SecondVar>, show_cov: bool) -> Result<PathBuf> {
    let (path, grid) = energ_site_panels(sets, second_var, show_cov)?;
    let size = (900 * grid.cols.max(1) as u32, 500 * grid.rows.max(1) as u32);
    render(&grid, &path, size)?;
    output::print_path(&path);
    Ok(path)
}

/// 每个基底、位点一张：每原子形成能随掺杂元素变化
pub fn energ_elem_panels(sets: &[DopsSet]) -> Result<Vec<(PathBuf, Panel)>> {
    let first = first_set(sets)?;
    let info = &first.info;
    let out_dir = first
        .config()
        .dirs
        .processing_output
        .join(first.material())
        .join("energy_correlations")
        .join("elems");

    let mut panels = Vec::new();
    for base in &info.bases {
        for site in &info.sites[base] {
            let structs = structs_at(sets, base, site);
            if structs.is_empty() {
                continue;
            }

            let labels = structs.iter().map(|s| dop_elem_of(s)).collect();
            let mut energies = Vec::with_capacity(structs.len());
            for s in &structs {
                energies.push(s.formation_energy(&first.config().atoms)?.1);
            }

            let panel = Panel::new(format!("{}-{}", base, site), labels, "Formation energy (eV/atom)")
                .with_curve("energy", energies)
                .with_y_range(info.graphs_config.ylims.energy.get(base).copied());
            panels.push((out_dir.join(format!("{}-{}.png", base, site)), panel));
        }
    }
    Ok(panels)
}

pub fn energ_elem_graphs(sets: &[DopsSet]) -> Result<Vec<PathBuf>> {
    render_panels(energ_elem_panels(sets)?, (800, 400))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dops_set::tests::setup;
    use crate::dops_set::SetMode;
    use std::collections::BTreeMap;

    fn energies(cfg: &mut Config) {
        let energ = BTreeMap::from([
            ("B".to_string(), -25.0),
            ("N".to_string(), -50.0),
            ("C".to_string(), -38.0),
            ("H".to_string(), -6.5),
        ]);
        cfg.atoms.energ_atom.insert("3ob".to_string(), energ);
        cfg.atoms.valency.insert("N".to_string(), 5);
    }

    fn look_set<'c>(cfg: &'c Config, dop: &str) -> DopsSet<'c> {
        let info = crate::dops_set::tests::info();
        let mut set = DopsSet::new(cfg, dop, &info, SetMode::Look, Some("3ob"), false).unwrap();
        for (i, s) in set.structs.iter_mut().enumerate() {
            s.homo = Some(-5.0 - i as f64);
            s.lumo = Some(-2.0 - i as f64);
            s.total_energy = Some(-100.0 - i as f64);
            s.dipole = Some([3.0, 4.0, 0.0]);
        }
        set
    }

    #[test]
    fn test_kind_separators() {
        let sites: Vec<String> = ["A1", "B1", "B2", "C1", "D1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(kind_separators(&sites), vec![0.5, 2.5, 3.5]);
        assert!(kind_separators(&[]).is_empty());
    }

    #[test]
    fn test_gap_site_panels() {
        let (_root, cfg) = setup();
        let set = look_set(&cfg, "B");

        let panels = gap_site_panels(&set).unwrap();
        assert_eq!(panels.len(), 1);
        let (path, panel) = &panels[0];
        assert!(path.ends_with("graphene/gap_graphs/site_x_gap/G1-B.png"));
        assert_eq!(panel.labels, vec!["A1", "B1"]);
        assert_eq!(panel.curves[0].values, vec![-5.0, -6.0]);
        assert_eq!(panel.curves[1].values, vec![-2.0, -3.0]);
        // 未配置的 [0, 0] 不作为范围
        assert!(panel.y_range.is_none());
    }

    #[test]
    fn test_gap_site_panels_missing_bands() {
        let (_root, cfg) = setup();
        let mut set = look_set(&cfg, "B");
        set.structs[1].homo = None;
        assert!(matches!(gap_site_panels(&set), Err(DopingsError::MissingData(_))));
    }

    #[test]
    fn test_elem_panels() {
        let (_root, mut cfg) = setup();
        energies(&mut cfg);
        let sets = vec![look_set(&cfg, "B"), look_set(&cfg, "N")];

        let gap = gap_elem_panels(&sets).unwrap();
        assert_eq!(gap.len(), 2);
        assert!(gap[0].0.ends_with("gap_graphs/elem_x_gap/G1-A1.png"));
        assert_eq!(gap[0].1.labels, vec!["B", "N"]);

        let energ = energ_elem_panels(&sets).unwrap();
        assert!(energ[1].0.ends_with("energy_correlations/elems/G1-B1.png"));
        // A1 位点：B 掺杂 -100 - (-25 - 38 - 6.5) = -30.5，每原子 -10.1667
        assert!((energ[0].1.curves[0].values[0] + 10.1667).abs() < 1e-9);

        assert!(gap_elem_panels(&[]).is_err());
    }

    #[test]
    fn test_energ_site_panels() {
        let (_root, mut cfg) = setup();
        energies(&mut cfg);
        let sets = vec![look_set(&cfg, "B"), look_set(&cfg, "N")];

        assert!(matches!(
            energ_site_panels(&sets[..1], None, true),
            Err(DopingsError::InvalidValue(_))
        ));

        let (path, grid) = energ_site_panels(&sets, Some(SecondVar::Dipole), true).unwrap();
        assert!(path.ends_with("energy_correlations/sites/dipole.png"));
        assert_eq!((grid.rows, grid.cols), (1, 2));
        assert_eq!(grid.panels.len(), 2);

        let panel = &grid.panels[0];
        assert!(panel.title.starts_with("B-G1"));
        assert_eq!(panel.secondary.as_ref().unwrap().values, vec![5.0, 5.0]);
        // 偶极矩不变，相关系数无定义
        assert!(panel.title.ends_with("COV = nan"));
        assert_eq!(panel.separators, vec![0.5]);

        let (path, grid) = energ_site_panels(&sets, None, true).unwrap();
        assert!(path.ends_with("sites/energy.png"));
        assert!(grid.panels[1].secondary.is_none());
        assert_eq!(grid.panels[1].title, "N-G1");
    }
}
