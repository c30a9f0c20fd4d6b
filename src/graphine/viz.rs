//! # 石墨炔几何变化图
//!
//! 对集合中每个结构计算相对未掺杂基底的几何变化，
//! 每个基底输出一张三联柱状图，整个集合另存一份 CSV。
//!
//! ## 依赖关系
//! - 被 `commands/sets.rs` 使用
//! - 使用 `graphine/calcs.rs`, `viz/mod.rs`, `export.rs`

use crate::config::{DopsInfo, GraphineData};
use crate::dops_set::DopsSet;
use crate::error::{DopingsError, Result};
use crate::export;
use crate::graphine::calcs::Geometry;
use crate::models::{SiteLabel, Structure};
use crate::utils::output;
use crate::viz::{category_label, category_range, dashes, grouped_bar, plot_err, render, series_color, Figure};

use plotters::coord::Shift;
use plotters::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

/// 两个角度之差，负角先加 360
pub fn delta_arc(value1: f64, value2: f64) -> f64 {
    let wrap = |v: f64| if v < 0.0 { v + 360.0 } else { v };
    wrap(value2) - wrap(value1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleKind {
    RingTorsion,
    BondAngle,
}

/// 一个结构相对基底的几何变化
#[derive(Debug, Clone, Serialize)]
pub struct GeometryRow {
    pub material: String,
    pub dop_elem: String,
    pub base: String,
    pub site: String,
    /// 三个轴的扭转角变化 (°)
    pub torsion_0: f64,
    pub torsion_1: f64,
    pub torsion_2: f64,
    /// 内臂相对伸长
    pub int_arm: f64,
    /// 外臂相对伸长
    pub ext_arm: f64,
    /// 环扭转角或键角的变化 (°)
    pub angle: f64,
    pub angle_kind: AngleKind,
}

fn reference<'a, T>(table: &'a std::collections::BTreeMap<String, T>, base: &str, what: &str) -> Result<&'a T> {
    table
        .get(base)
        .ok_or_else(|| DopingsError::MissingKey(format!("{} of base {}", what, base)))
}

fn is_ring_site(site: SiteLabel) -> bool {
    site == SiteLabel::new('A', 1) || (site.kind() == 'C' && (1..=4).contains(&site.index()))
}

pub fn geometry_row(s: &Structure, data: &GraphineData, info: &DopsInfo) -> Result<GeometryRow> {
    let geo = Geometry::new(s, data, info)?;
    let base = s.meta.base.clone().unwrap_or_default();
    let site = geo.site().to_string();

    let base_torsions = reference(&data.base_torsions, &base, "base_torsions")?;
    let mut torsions = [0.0; 3];
    for (arm, t) in torsions.iter_mut().enumerate() {
        *t = delta_arc(base_torsions[arm], geo.axis_torsion_angle(arm)?);
    }

    let ref_int = *reference(&data.int_arm_length, &base, "int_arm_length")?;
    let ref_ext = *reference(&data.ext_arm_length, &base, "ext_arm_length")?;

    let (angle, angle_kind) = if is_ring_site(geo.site()) {
        let torsion = geo
            .dop_atom_torsion()?
            .ok_or_else(|| DopingsError::MissingData(format!("no ring torsion for site {}", site)))?;
        let ref_torsion = reference(&data.dop_atom_torsion_on_ring, &base, "dop_atom_torsion_on_ring")?
            .get(&site)
            .ok_or_else(|| DopingsError::MissingKey(format!("dop_atom_torsion_on_ring of {}-{}", base, site)))?;
        (torsion - ref_torsion, AngleKind::RingTorsion)
    } else {
        let bond = geo
            .dop_atom_angle()?
            .ok_or_else(|| DopingsError::MissingData(format!("no bond angle for site {}", site)))?;
        let ref_angle = reference(&data.bases_bonds_angles, &base, "bases_bonds_angles")?
            .get(&site)
            .ok_or_else(|| DopingsError::MissingKey(format!("bases_bonds_angles of {}-{}", base, site)))?;
        (bond - ref_angle, AngleKind::BondAngle)
    };

    Ok(GeometryRow {
        material: s.meta.material.clone().unwrap_or_default(),
        dop_elem: s.meta.dop_elem.clone().unwrap_or_default(),
        base,
        site,
        torsion_0: torsions[0],
        torsion_1: torsions[1],
        torsion_2: torsions[2],
        int_arm: (geo.int_arm_length()? - ref_int) / ref_int,
        ext_arm: (geo.ext_arm_length()? - ref_ext) / ref_ext,
        angle,
        angle_kind,
    })
}

/// 集合中所有结构的几何变化，按集合顺序
pub fn geometry_rows(set: &DopsSet) -> Result<Vec<GeometryRow>> {
    let data = &set.config().graphine;
    set.structs
        .iter()
        .map(|s| geometry_row(s, data, &set.info))
        .collect()
}

// ─────────────────────────────────────────────────────────────
// 绘图
// ─────────────────────────────────────────────────────────────

/// 分组柱状图面板，缺失值不画
#[derive(Debug, Clone)]
pub struct BarPanel {
    pub title: String,
    pub y_desc: String,
    pub y_range: [f64; 2],
    pub groups: Vec<(String, Vec<Option<f64>>)>,
}

/// 一个基底的三联图
#[derive(Debug, Clone)]
pub struct GeometryFigure {
    pub labels: Vec<String>,
    pub panels: Vec<BarPanel>,
}

impl GeometryFigure {
    pub fn new(dop_elem: &str, base: &str, rows: &[&GeometryRow]) -> Self {
        let col = |f: fn(&GeometryRow) -> f64| rows.iter().map(|r| Some(f(r))).collect::<Vec<_>>();
        let angle_of = |kind: AngleKind| {
            rows.iter()
                .map(|r| (r.angle_kind == kind).then_some(r.angle))
                .collect::<Vec<_>>()
        };

        let torsion = BarPanel {
            title: format!("{}-{} - Torsion variation", dop_elem, base),
            y_desc: "Torsion angle variation (°)".to_string(),
            y_range: [-25.0, 25.0],
            groups: vec![
                ("Axis 0".to_string(), col(|r| r.torsion_0)),
                ("Axis 1".to_string(), col(|r| r.torsion_1)),
                ("Axis 2".to_string(), col(|r| r.torsion_2)),
            ],
        };
        let arms = BarPanel {
            title: format!("{}-{} - Arm length variation", dop_elem, base),
            y_desc: "Arm length variation".to_string(),
            y_range: [-0.25, 0.25],
            groups: vec![
                ("Internal arm".to_string(), col(|r| r.int_arm)),
                ("External arm".to_string(), col(|r| r.ext_arm)),
            ],
        };
        let angles = BarPanel {
            title: format!("{}-{} - C-{}-C bond angle variation", dop_elem, base, dop_elem),
            y_desc: format!("C-{}-C angle variation (°)", dop_elem),
            y_range: [-80.0, 50.0],
            groups: vec![
                ("Ring torsion".to_string(), angle_of(AngleKind::RingTorsion)),
                ("Bond angle".to_string(), angle_of(AngleKind::BondAngle)),
            ],
        };

        GeometryFigure {
            labels: rows.iter().map(|r| r.site.clone()).collect(),
            panels: vec![torsion, arms, angles],
        }
    }
}

fn draw_bars<DB>(area: &DrawingArea<DB, Shift>, labels: &[String], panel: &BarPanel) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let n = labels.len();
    let [lo, hi] = panel.y_range;

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(category_range(n), lo..hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| category_label(labels, *x))
        .x_desc("Site")
        .y_desc(panel.y_desc.as_str())
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    // 零线与位点分隔线
    chart
        .draw_series(dashes((-0.5, 0.0), (n as f64 - 0.5, 0.0), 4 * n.max(1), BLACK))
        .map_err(plot_err)?;
    for i in 0..n.saturating_sub(1) {
        let x = i as f64 + 0.5;
        chart
            .draw_series(dashes((x, lo), (x, hi), 20, BLACK))
            .map_err(plot_err)?;
    }

    let m = panel.groups.len();
    for (k, (name, values)) in panel.groups.iter().enumerate() {
        if values.iter().all(Option::is_none) {
            continue;
        }
        let color = series_color(k);
        chart
            .draw_series(values.iter().enumerate().filter_map(|(i, v)| {
                v.map(|v| {
                    let (x0, x1) = grouped_bar(i, k, m);
                    Rectangle::new([(x0, 0.0), (x1, v.clamp(lo, hi))], color.filled())
                })
            }))
            .map_err(plot_err)?
            .label(name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 16))
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

impl Figure for GeometryFigure {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE).map_err(plot_err)?;
        for (area, panel) in root.split_evenly((self.panels.len(), 1)).iter().zip(&self.panels) {
            draw_bars(area, &self.labels, panel)?;
        }
        Ok(())
    }
}

fn geometry_dir(set: &DopsSet) -> PathBuf {
    set.config()
        .dirs
        .processing_output
        .join(set.material())
        .join("geometry_graphs")
}

/// 每个基底一张三联图：`<dop>-<base>.png`
pub fn geometry_graph(set: &DopsSet) -> Result<Vec<PathBuf>> {
    let rows = geometry_rows(set)?;
    let out_dir = geometry_dir(set);

    let mut written = Vec::new();
    for base in &set.info.bases {
        let base_rows: Vec<&GeometryRow> = rows.iter().filter(|r| &r.base == base).collect();
        if base_rows.is_empty() {
            output::print_skip(&format!("No structures of {}-{}", set.dop_elem, base));
            continue;
        }

        let figure = GeometryFigure::new(&set.dop_elem, base, &base_rows);
        let path = out_dir.join(format!("{}-{}.png", set.dop_elem, base));
        render(&figure, &path, (2000, 1500))?;
        output::print_path(&path);
        written.push(path);
    }
    Ok(written)
}

/// 几何变化表：`<dop>-geometry.csv`
pub fn geometry_csv(set: &DopsSet) -> Result<PathBuf> {
    let rows = geometry_rows(set)?;
    if rows.is_empty() {
        return Err(DopingsError::MissingData(format!(
            "There is no structs on the {}-{} set",
            set.material(),
            set.dop_elem
        )));
    }

    let path = geometry_dir(set).join(format!("{}-geometry.csv", set.dop_elem));
    export::write_records(&rows, &path)?;
    output::print_path(&path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphine::calcs::tests::hexagon;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn with_references(data: &mut GraphineData) {
        data.base_torsions.insert("G1".to_string(), [180.0, -180.0, 180.0]);
        data.int_arm_length.insert("G1".to_string(), 4.0 + 2f64.sqrt());
        data.ext_arm_length.insert("G1".to_string(), 10f64.sqrt() / 2.0);
        data.dop_atom_torsion_on_ring.insert(
            "G1".to_string(),
            BTreeMap::from([("A1".to_string(), 10.0)]),
        );
        data.bases_bonds_angles.insert(
            "G1".to_string(),
            BTreeMap::from([("B1".to_string(), 120.0)]),
        );
    }

    #[test]
    fn test_delta_arc() {
        assert_eq!(delta_arc(10.0, 20.0), 10.0);
        assert_eq!(delta_arc(-170.0, 170.0), -20.0);
        assert_eq!(delta_arc(170.0, -170.0), 20.0);
        assert_eq!(delta_arc(-180.0, 180.0), 0.0);
    }

    #[test]
    fn test_geometry_row_ring_site() {
        let (s, mut data, info) = hexagon();
        with_references(&mut data);

        let row = geometry_row(&s, &data, &info).unwrap();
        assert_eq!(row.site, "A1");
        assert_eq!(row.angle_kind, AngleKind::RingTorsion);
        assert!((row.angle + 10.0).abs() < 1e-6);
        for t in [row.torsion_0, row.torsion_1, row.torsion_2] {
            assert!(t.abs() < 1e-6, "{}", t);
        }
        assert!(row.int_arm.abs() < 1e-9);
        assert!((row.ext_arm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_geometry_row_bond_site() {
        let (mut s, mut data, info) = hexagon();
        with_references(&mut data);
        s.meta.site = Some("B1".to_string());

        let row = geometry_row(&s, &data, &info).unwrap();
        assert_eq!(row.angle_kind, AngleKind::BondAngle);
        assert!((row.angle - 15.0).abs() < 1e-6);

        data.bases_bonds_angles.clear();
        assert!(matches!(
            geometry_row(&s, &data, &info),
            Err(DopingsError::MissingKey(_))
        ));
    }

    #[test]
    fn test_geometry_figure_and_csv() {
        let (s, mut data, info) = hexagon();
        with_references(&mut data);
        let ring = geometry_row(&s, &data, &info).unwrap();
        let mut s_b1 = s.clone();
        s_b1.meta.site = Some("B1".to_string());
        let bond = geometry_row(&s_b1, &data, &info).unwrap();

        let figure = GeometryFigure::new("C", "G1", &[&ring, &bond]);
        assert_eq!(figure.labels, vec!["A1", "B1"]);
        assert_eq!(figure.panels.len(), 3);
        assert_eq!(figure.panels[2].groups[0].1[1], None);
        assert!(figure.panels[2].groups[1].1[1].is_some());
        assert_eq!(figure.panels[0].y_range, [-25.0, 25.0]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("G1.csv");
        export::write_records(&[ring, bond], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("material,dop_elem,base,site,torsion_0,torsion_1,torsion_2,int_arm,ext_arm,angle,angle_kind")
        );
        assert!(lines.next().unwrap().ends_with(",ring_torsion"));
        assert!(lines.next().unwrap().ends_with(",bond_angle"));
    }
}
