//! # 石墨炔几何量
//!
//! 基于位点编号表计算掺杂石墨炔的几何描述量：
//! 轴扭转角、内外臂长度、掺杂原子处的键角与环上扭转角。
//!
//! 编号表有两张：掺杂位点表 `dops_data.sites_id[base]` 与六条臂的
//! 补充位点表 `graphine_data.sites_id[base]`。二者合并时以第 0 条臂为准。
//!
//! ## 依赖关系
//! - 被 `graphine/viz.rs` 使用
//! - 使用 `models/`, `config.rs`

use crate::config::{DopsInfo, GraphineData};
use crate::error::{DopingsError, Result};
use crate::models::{AtomData, SiteLabel, Structure};

use std::collections::BTreeMap;

type Vec3 = [f64; 3];

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn scale(a: Vec3, k: f64) -> Vec3 {
    [a[0] * k, a[1] * k, a[2] * k]
}

fn norm(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// 四个点的二面角 (°)，范围 `(-180, 180]`
pub fn dihedral_angle(p: [Vec3; 4]) -> f64 {
    let b0 = sub(p[0], p[1]);
    let b1 = sub(p[2], p[1]);
    let b1 = scale(b1, 1.0 / norm(b1));
    let b2 = sub(p[3], p[2]);

    // b0、b2 在垂直于 b1 的平面上的投影
    let v = sub(b0, scale(b1, dot(b0, b1)));
    let w = sub(b2, scale(b1, dot(b2, b1)));

    let x = dot(v, w);
    let y = dot(cross(b1, v), w);
    y.atan2(x).to_degrees()
}

/// 以 `b` 为顶点的键角 (°)
pub fn bond_angle(a: Vec3, b: Vec3, c: Vec3) -> f64 {
    let v1 = sub(a, b);
    let v2 = sub(c, b);
    let cos = dot(v1, v2) / (norm(v1) * norm(v2));
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

const RING_SEQUENCES: [(u32, [u32; 4]); 4] = [
    (1, [5, 6, 1, 2]),
    (2, [6, 1, 2, 3]),
    (3, [1, 2, 3, 4]),
    (4, [2, 3, 4, 5]),
];

/// 一个掺杂石墨炔结构的几何量计算
#[derive(Debug)]
pub struct Geometry<'a> {
    s: &'a Structure,
    base: &'a str,
    site: SiteLabel,
    /// 掺杂位点 -> 原子编号
    sites_id: BTreeMap<SiteLabel, usize>,
    /// 该基底的掺杂位点
    sites: Vec<SiteLabel>,
    /// 六条臂的补充位点表
    arms: &'a [BTreeMap<SiteLabel, usize>],
}

fn parse_label(name: &str) -> Result<SiteLabel> {
    name.parse().map_err(DopingsError::InvalidValue)
}

impl<'a> Geometry<'a> {
    pub fn new(s: &'a Structure, data: &'a GraphineData, info: &DopsInfo) -> Result<Self> {
        let missing = |what: &str| DopingsError::MissingData(format!("structure {} has no {}", s.name(), what));
        let base = s.meta.base.as_deref().ok_or_else(|| missing("base"))?;
        let site = parse_label(s.meta.site.as_deref().ok_or_else(|| missing("site"))?)?;

        let sites_id = info
            .sites_id
            .get(base)
            .ok_or_else(|| DopingsError::MissingKey(format!("sites_id of base {}", base)))?
            .iter()
            .map(|(name, id)| Ok((parse_label(name)?, *id)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let mut sites = info
            .sites
            .get(base)
            .ok_or_else(|| DopingsError::MissingKey(format!("sites of base {}", base)))?
            .iter()
            .map(|name| parse_label(name))
            .collect::<Result<Vec<_>>>()?;
        sites.sort();

        let arms = data
            .sites_id
            .get(base)
            .ok_or_else(|| DopingsError::MissingKey(format!("graphine sites_id of base {}", base)))?;

        Ok(Geometry {
            s,
            base,
            site,
            sites_id,
            sites,
            arms,
        })
    }

    pub fn site(&self) -> SiteLabel {
        self.site
    }

    /// 编号从 1 开始的原子
    fn atom(&self, id: usize) -> Result<&'a AtomData> {
        let s: &'a Structure = self.s;
        id.checked_sub(1)
            .and_then(|i| s.atoms.get(i))
            .ok_or(DopingsError::IndexOutOfRange { id, size: s.size() })
    }

    fn coord(&self, id: usize) -> Result<Vec3> {
        Ok(self.atom(id)?.coord)
    }

    fn site_id(table: &BTreeMap<SiteLabel, usize>, label: SiteLabel) -> Result<usize> {
        table
            .get(&label)
            .copied()
            .ok_or_else(|| DopingsError::MissingKey(format!("site {}", label)))
    }

    fn arm_id(&self, arm: usize, label: SiteLabel) -> Result<usize> {
        let table = self
            .arms
            .get(arm % 6)
            .ok_or_else(|| DopingsError::MissingKey(format!("arm {} of base {}", arm % 6, self.base)))?;
        Self::site_id(table, label)
    }

    /// 掺杂位点表与第 0 条臂合并
    fn merged(&self) -> Result<BTreeMap<SiteLabel, usize>> {
        let mut table = self.sites_id.clone();
        let arm0 = self
            .arms
            .first()
            .ok_or_else(|| DopingsError::MissingKey(format!("arm 0 of base {}", self.base)))?;
        table.extend(arm0.iter().map(|(k, v)| (*k, *v)));
        Ok(table)
    }

    fn is_carbon(&self, id: usize) -> Result<bool> {
        Ok(self.atom(id)?.elem == "C")
    }

    fn path_length(&self, ids: &[usize]) -> Result<f64> {
        let mut total = 0.0;
        for pair in ids.windows(2) {
            total += self.atom(pair[0])?.dist_to(self.atom(pair[1])?);
        }
        Ok(total)
    }

    /// 第 `arm` 个轴的扭转角
    ///
    /// 基底 `GN` 的外侧位点为 `D{N+1}`。
    pub fn axis_torsion_angle(&self, arm: usize) -> Result<f64> {
        let n: u32 = self
            .base
            .get(1..)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| DopingsError::InvalidValue(format!("base name without number: {}", self.base)))?;
        let next_d = SiteLabel::new('D', n + 1);
        let a1 = SiteLabel::new('A', 1);

        Ok(dihedral_angle([
            self.coord(self.arm_id(arm, next_d)?)?,
            self.coord(self.arm_id(arm + 2, a1)?)?,
            self.coord(self.arm_id(arm + 5, a1)?)?,
            self.coord(self.arm_id(arm + 3, next_d)?)?,
        ]))
    }

    /// 内臂长度：`A1`、碳原子所在的 `B` 位点、`C4` 依次相连
    pub fn int_arm_length(&self) -> Result<f64> {
        let mut ids = vec![Self::site_id(&self.sites_id, SiteLabel::new('A', 1))?];
        for label in self.sites.iter().filter(|l| l.kind() == 'B') {
            let id = Self::site_id(&self.sites_id, *label)?;
            if self.is_carbon(id)? {
                ids.push(id);
            }
        }
        ids.push(Self::site_id(&self.sites_id, SiteLabel::new('C', 4))?);

        self.path_length(&ids)
    }

    /// 外臂长度：`C2` 与碳原子所在的 `D` 位点依次相连
    pub fn ext_arm_length(&self) -> Result<f64> {
        let mut ids = Vec::new();
        for (label, id) in self.merged()? {
            let on_arm = label == SiteLabel::new('C', 2) || (label.kind() == 'D' && self.is_carbon(id)?);
            if on_arm {
                ids.push(id);
            }
        }
        self.path_length(&ids)
    }

    /// `B`、`D` 位点上掺杂原子与链上相邻原子的键角
    pub fn dop_atom_angle(&self) -> Result<Option<f64>> {
        if !matches!(self.site.kind(), 'B' | 'D') {
            return Ok(None);
        }

        let chain: Vec<(SiteLabel, usize)> = self
            .merged()?
            .into_iter()
            .filter(|(label, _)| !(label.kind() == 'C' && (3..=6).contains(&label.index())))
            .collect();

        let i = chain
            .iter()
            .position(|(label, _)| *label == self.site)
            .ok_or_else(|| DopingsError::MissingKey(format!("site {}", self.site)))?;
        if i == 0 || i + 1 >= chain.len() {
            return Err(DopingsError::MissingData(format!(
                "site {} has no neighbours on both sides",
                self.site
            )));
        }

        Ok(Some(bond_angle(
            self.coord(chain[i - 1].1)?,
            self.coord(chain[i].1)?,
            self.coord(chain[i + 1].1)?,
        )))
    }

    /// `A1` 与 `C1..C4` 位点上的环扭转角
    pub fn dop_atom_torsion(&self) -> Result<Option<f64>> {
        let a1 = SiteLabel::new('A', 1);
        if self.site == a1 {
            let mut p = [[0.0; 3]; 4];
            for (slot, arm) in p.iter_mut().zip([2, 1, 0, 5]) {
                *slot = self.coord(self.arm_id(arm, a1)?)?;
            }
            return Ok(Some(dihedral_angle(p)));
        }

        if self.site.kind() != 'C' {
            return Ok(None);
        }
        let Some((_, seq)) = RING_SEQUENCES.iter().find(|(c, _)| *c == self.site.index()) else {
            return Ok(None);
        };

        let table = self.merged()?;
        let mut p = [[0.0; 3]; 4];
        for (slot, index) in p.iter_mut().zip(seq) {
            *slot = self.coord(Self::site_id(&table, SiteLabel::new('C', *index))?)?;
        }
        Ok(Some(dihedral_angle(p)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::GraphsConfig;
    use crate::models::StructureMeta;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_dihedral_cis_trans() {
        let cis = dihedral_angle([[1.0, 1.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 1.0, 0.0]]);
        assert!(close(cis, 0.0));

        let trans = dihedral_angle([[1.0, 1.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, -1.0, 0.0]]);
        assert!(close(trans.abs(), 180.0));

        let gauche = dihedral_angle([[1.0, 1.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [2.0, 0.0, 1.0]]);
        assert!(close(gauche.abs(), 90.0));
    }

    #[test]
    fn test_bond_angle() {
        assert!(close(bond_angle([1.0, 0.0, 0.0], [0.0; 3], [0.0, 2.0, 0.0]), 90.0));
        assert!(close(bond_angle([1.0, 0.0, 0.0], [0.0; 3], [-3.0, 0.0, 0.0]), 180.0));
        assert!(close(bond_angle([1.0, 0.0, 0.0], [0.0; 3], [1.0, 1.0, 0.0]), 45.0));
    }

    /// 平面六元环 (A1，编号 1..6)，每条臂外侧 D2 (编号 7..12)，
    /// 第 0 条臂上 B1 (13)、B2 (14)、C2 (15)、C4 (16) 排成一条折线
    pub(crate) fn hexagon() -> (Structure, GraphineData, DopsInfo) {
        let mut atoms = Vec::new();
        for radius in [1.0, 2.0] {
            for k in 0..6 {
                let angle = (60.0 * k as f64).to_radians();
                atoms.push(AtomData::new("C", [radius * angle.cos(), radius * angle.sin(), 0.0]));
            }
        }
        atoms.push(AtomData::new("C", [3.0, 0.0, 0.0]));
        atoms.push(AtomData::new("C", [4.0, 1.0, 0.0]));
        atoms.push(AtomData::new("C", [5.0, 1.0, 0.0]));
        atoms.push(AtomData::new("C", [6.0, 1.0, 0.0]));

        let mut arms = Vec::new();
        for k in 0..6 {
            let mut arm = BTreeMap::new();
            arm.insert(SiteLabel::new('A', 1), k + 1);
            arm.insert(SiteLabel::new('D', 2), k + 7);
            arms.push(arm);
        }
        arms[0].insert(SiteLabel::new('C', 2), 15);

        let data = GraphineData {
            sites_id: BTreeMap::from([("G1".to_string(), arms)]),
            ..Default::default()
        };

        let ids = BTreeMap::from([
            ("A1".to_string(), 1),
            ("B1".to_string(), 13),
            ("B2".to_string(), 14),
            ("C4".to_string(), 16),
        ]);
        let info = DopsInfo {
            graphs_config: GraphsConfig::default(),
            material: "graphine".to_string(),
            bases: vec!["G1".to_string()],
            sites: BTreeMap::from([(
                "G1".to_string(),
                vec!["B2".to_string(), "A1".to_string(), "B1".to_string(), "C4".to_string()],
            )]),
            sites_id: BTreeMap::from([("G1".to_string(), ids)]),
            n_atoms: BTreeMap::new(),
            n_ligs: BTreeMap::new(),
        };

        let s = Structure::new(atoms).with_meta(StructureMeta::new("graphine", "C", "G1", "A1"));
        (s, data, info)
    }

    #[test]
    fn test_ring_torsions() {
        let (s, data, info) = hexagon();
        let geo = Geometry::new(&s, &data, &info).unwrap();

        assert!(close(geo.dop_atom_torsion().unwrap().unwrap(), 0.0));
        assert!(geo.dop_atom_angle().unwrap().is_none());

        for arm in 0..3 {
            let angle = geo.axis_torsion_angle(arm).unwrap();
            assert!(close(angle.abs(), 180.0), "arm {}: {}", arm, angle);
        }
    }

    #[test]
    fn test_arm_lengths() {
        let (mut s, data, info) = hexagon();
        {
            let geo = Geometry::new(&s, &data, &info).unwrap();
            // A1 (1,0) -> B1 (3,0) -> B2 (4,1) -> C4 (6,1)
            let expected = 2.0 + 2f64.sqrt() + 2.0;
            assert!(close(geo.int_arm_length().unwrap(), expected));
            // C2 (5,1) -> D2 (2,0)
            assert!(close(geo.ext_arm_length().unwrap(), 10f64.sqrt()));
        }

        // 掺杂的 B 位点不计入内臂
        s.atoms[13].elem = "N".to_string();
        s.meta.site = Some("B2".to_string());
        let geo = Geometry::new(&s, &data, &info).unwrap();
        let expected = 2.0 + 10f64.sqrt();
        assert!(close(geo.int_arm_length().unwrap(), expected));
        assert!(geo.dop_atom_torsion().unwrap().is_none());
    }

    #[test]
    fn test_dop_atom_angle() {
        let (mut s, data, info) = hexagon();
        s.meta.site = Some("B1".to_string());
        let geo = Geometry::new(&s, &data, &info).unwrap();
        // A1 (1,0) - B1 (3,0) - B2 (4,1)
        assert!(close(geo.dop_atom_angle().unwrap().unwrap(), 135.0));
    }

    #[test]
    fn test_missing_tables() {
        let (mut s, data, info) = hexagon();
        s.meta.base = Some("G2".to_string());
        assert!(matches!(
            Geometry::new(&s, &data, &info),
            Err(DopingsError::MissingKey(_))
        ));

        let (mut s, data, info) = hexagon();
        s.atoms.truncate(8);
        let geo = Geometry::new(&s, &data, &info).unwrap();
        assert!(matches!(
            geo.axis_torsion_angle(0),
            Err(DopingsError::IndexOutOfRange { .. })
        ));
    }
}
