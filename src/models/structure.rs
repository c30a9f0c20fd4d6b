//! # 结构数据模型
//!
//! 一个结构由有序的原子列表组成，并附带从优化目录读取的派生量：
//! 总能量、HOMO/LUMO、偶极矩。掺杂相关的元数据 (材料、基底、
//! 掺杂元素、位点、参数集) 保存在 `StructureMeta` 中。
//!
//! ## 依赖关系
//! - 被 `dops_set/`, `graphine/`, `viz/`, `commands/` 使用
//! - 使用 `parsers/` 读取优化目录
//! - 使用 `models/atom.rs`, `models/report.rs`

use crate::config::{AtomsData, Config};
use crate::error::{DopingsError, Result};
use crate::models::{AtomData, OptReport};
use crate::parsers;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 掺杂元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureMeta {
    /// 被掺杂的材料
    pub material: Option<String>,
    /// 基底名
    pub base: Option<String>,
    /// 掺杂元素
    pub dop_elem: Option<String>,
    /// 掺杂位点
    pub site: Option<String>,
    /// 优化所用参数集，仅用于形成能
    pub param: Option<String>,
}

impl StructureMeta {
    pub fn new(material: &str, dop_elem: &str, base: &str, site: &str) -> Self {
        StructureMeta {
            material: Some(material.to_string()),
            base: Some(base.to_string()),
            dop_elem: Some(dop_elem.to_string()),
            site: Some(site.to_string()),
            param: None,
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }
}

/// 结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Structure {
    /// 原子列表
    pub atoms: Vec<AtomData>,

    /// 优化目录
    pub dir: Option<PathBuf>,

    #[serde(flatten)]
    pub meta: StructureMeta,

    /// 总能量 (eV)
    pub total_energy: Option<f64>,

    /// HOMO 能级 (eV)
    pub homo: Option<f64>,

    /// LUMO 能级 (eV)
    pub lumo: Option<f64>,

    /// 偶极矩 (a.u.)
    pub dipole: Option<[f64; 3]>,
}

impl Structure {
    pub fn new(atoms: Vec<AtomData>) -> Self {
        Structure {
            atoms,
            ..Default::default()
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_meta(mut self, meta: StructureMeta) -> Self {
        self.meta = meta;
        self
    }

    /// 从优化目录读取结构与派生量
    pub fn from_dir(dir: impl Into<PathBuf>, meta: StructureMeta, cfg: &Config) -> Result<Self> {
        let mut structure = Structure::default().with_dir(dir).with_meta(meta);
        structure.data_from_file(cfg)?;
        Ok(structure)
    }

    /// 原子数
    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    /// 结构名：优化目录名，无目录时为 "frame"
    pub fn name(&self) -> String {
        self.dir
            .as_ref()
            .and_then(|d| d.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "frame".to_string())
    }

    /// 优化目录，未设置时报错
    pub fn require_dir(&self) -> Result<&Path> {
        self.dir
            .as_deref()
            .ok_or_else(|| DopingsError::MissingData("structure has no directory".to_string()))
    }

    /// 结构中出现的元素
    pub fn elements(&self) -> BTreeSet<&str> {
        self.atoms.iter().map(|a| a.elem.as_str()).collect()
    }

    /// 追加原子
    pub fn append(&mut self, atoms: Vec<AtomData>) -> Result<()> {
        if atoms.is_empty() {
            return Err(DopingsError::InvalidArgument(
                "atoms must be a non-empty list of atoms".to_string(),
            ));
        }
        self.atoms.extend(atoms);
        Ok(())
    }

    /// 从优化目录读取最后一帧、能量、能带与偶极矩
    pub fn data_from_file(&mut self, cfg: &Config) -> Result<()> {
        let dir = self.require_dir()?.to_path_buf();

        if let Some(atoms) = parsers::read_frame(&dir)? {
            self.append(atoms)?;
        }
        self.total_energy = parsers::read_energy(&dir, cfg.output_name(), true)?;
        if let Some((homo, lumo)) = parsers::read_bands(&dir, &self.atoms, &cfg.atoms)? {
            self.homo = Some(homo);
            self.lumo = Some(lumo);
        }
        self.dipole = parsers::read_dipole(&dir)?;

        log::debug!(
            "read {} atoms from {} (E = {:?})",
            self.size(),
            dir.display(),
            self.total_energy
        );
        Ok(())
    }

    /// 优化日志的状态报告
    pub fn report(&self, cfg: &Config) -> Result<OptReport> {
        parsers::read_opt_report(self.require_dir()?, cfg.output_name())
    }

    /// 优化耗费的墙钟时间 (s)，包括续算前的运行
    pub fn run_time(&self, cfg: &Config) -> Result<Option<f64>> {
        parsers::read_run_time(self.require_dir()?, cfg.output_name(), &cfg.main.resume_dir_name)
    }

    /// 生成掺杂结构：编号为 `id` (从 1 开始) 的原子替换为 `dop_elem`，
    /// 所有电荷清空
    pub fn dope_out(&self, dop_elem: &str, id: usize, meta: StructureMeta) -> Result<Structure> {
        if id == 0 || id > self.size() {
            return Err(DopingsError::IndexOutOfRange {
                id,
                size: self.size(),
            });
        }

        let mut atoms = self.atoms.clone();
        for atom in &mut atoms {
            atom.charge = None;
        }
        atoms[id - 1].elem = dop_elem.to_string();

        Ok(Structure::new(atoms).with_meta(meta))
    }

    /// 形成能 (eV) 与每原子形成能，均保留 4 位小数
    pub fn formation_energy(&self, atoms_data: &AtomsData) -> Result<(f64, f64)> {
        let param = self
            .meta
            .param
            .as_deref()
            .ok_or_else(|| DopingsError::MissingData("param is needed for formation energy".to_string()))?;
        let total = self.total_energy.ok_or_else(|| {
            DopingsError::MissingData(format!("total energy of {} not read", self.name()))
        })?;
        if self.atoms.is_empty() {
            return Err(DopingsError::MissingData("structure has no atoms".to_string()));
        }

        let mut atoms_sum = 0.0;
        for atom in &self.atoms {
            atoms_sum += atoms_data.atom_energy(param, &atom.elem)?;
        }

        let energy = round_to(total - atoms_sum, 4);
        Ok((energy, round_to(energy / self.size() as f64, 4)))
    }

    /// HOMO、LUMO 与能隙 (3 位小数)
    pub fn homo_lumo(&self) -> Result<(f64, f64, f64)> {
        match (self.homo, self.lumo) {
            (Some(homo), Some(lumo)) => Ok((homo, lumo, round_to(lumo - homo, 3))),
            _ => Err(DopingsError::MissingData(format!(
                "HOMO/LUMO of {} not read",
                self.name()
            ))),
        }
    }

    /// 偶极矩模长
    pub fn dipole_norm(&self) -> Option<f64> {
        self.dipole
            .map(|d| d.iter().map(|x| x * x).sum::<f64>().sqrt())
    }

    /// 每个原子相对价电子数的净得电子数 (电荷 - 价电子)
    pub fn excess_charges(&self, atoms_data: &AtomsData) -> Result<Vec<f64>> {
        self.atoms
            .iter()
            .map(|atom| {
                let charge = atom.charge.ok_or_else(|| {
                    DopingsError::MissingData("not all atoms have defined charges".to_string())
                })?;
                Ok(charge - atoms_data.valency_of(&atom.elem)? as f64)
            })
            .collect()
    }

    /// `elem1` 与 `elem2` 原子之间最短的 `n` 个距离 (升序)
    pub fn shortest_distances(&self, elem1: &str, elem2: &str, n: usize) -> Vec<f64> {
        let mut data = Vec::new();
        for (i, a) in self.atoms.iter().enumerate() {
            if a.elem != elem1 {
                continue;
            }
            for (j, b) in self.atoms.iter().enumerate() {
                if i != j && b.elem == elem2 {
                    data.push(a.dist_to(b));
                }
            }
        }
        data.sort_by(|x, y| x.total_cmp(y));
        data.truncate(n);
        data
    }

    /// XYZ 格式文本
    pub fn frame_string(&self) -> Result<String> {
        if self.atoms.is_empty() {
            return Err(DopingsError::InvalidValue("this structure has no atoms".to_string()));
        }

        let with_charges = self.atoms[0].charge.is_some();
        if self.atoms.iter().any(|a| a.charge.is_some() != with_charges) {
            return Err(DopingsError::InvalidValue(format!(
                "only some atoms of {} have charges",
                self.name()
            )));
        }

        let mut lines = Vec::with_capacity(self.size() + 2);
        lines.push(self.size().to_string());
        lines.push(self.name());

        for atom in &self.atoms {
            let mut cols = vec![atom.elem.clone()];
            cols.extend(atom.coord.iter().map(|x| round_to(*x, 8).to_string()));
            if let Some(q) = atom.charge {
                cols.push(q.to_string());
            }
            lines.push(cols.join(" "));
        }

        Ok(lines.join("\n"))
    }

    /// 写出最后一帧的 XYZ 文件，自动创建父目录
    pub fn frame(&self, frame_out: &Path) -> Result<()> {
        let text = self.frame_string()?;
        ensure_parent(frame_out)?;
        fs::write(frame_out, text).map_err(|e| DopingsError::write(frame_out, e))
    }

    /// 将优化日志复制到 `output_dest`
    pub fn output(&self, output_dest: &Path, cfg: &Config) -> Result<()> {
        let origin = self.require_dir()?.join(cfg.output_name());
        if !origin.is_file() {
            return Err(DopingsError::FileNotFound {
                path: origin.display().to_string(),
            });
        }
        ensure_parent(output_dest)?;
        fs::copy(&origin, output_dest).map_err(|e| DopingsError::write(output_dest, e))?;
        Ok(())
    }

    /// 只包含相同原子的新结构
    pub fn copy(&self) -> Structure {
        Structure::new(self.atoms.clone())
    }
}

/// 四舍五入到 `digits` 位小数
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// 创建文件的父目录
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| DopingsError::write(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn methane() -> Structure {
        Structure::new(vec![
            AtomData::new("C", [0.0, 0.0, 0.0]).with_charge(4.2),
            AtomData::new("H", [1.09, 0.0, 0.0]).with_charge(0.95),
            AtomData::new("H", [0.0, 1.10, 0.0]).with_charge(0.95),
            AtomData::new("H", [0.0, 0.0, 1.11]).with_charge(0.95),
            AtomData::new("H", [-1.12, 0.0, 0.0]).with_charge(0.95),
        ])
    }

    fn atoms_data() -> AtomsData {
        let mut energ = BTreeMap::new();
        energ.insert("C".to_string(), -38.0);
        energ.insert("H".to_string(), -6.5);
        energ.insert("B".to_string(), -25.0);
        let mut energ_atom = BTreeMap::new();
        energ_atom.insert("3ob".to_string(), energ);

        let mut valency = BTreeMap::new();
        valency.insert("C".to_string(), 4);
        valency.insert("H".to_string(), 1);

        AtomsData {
            valency,
            energ_atom,
            ..Default::default()
        }
    }

    #[test]
    fn test_append_rejects_empty() {
        let mut s = Structure::default();
        assert!(s.append(vec![]).is_err());
        s.append(vec![AtomData::new("C", [0.0; 3])]).unwrap();
        assert_eq!(s.size(), 1);
    }

    #[test]
    fn test_dope_out() {
        let s = methane();
        let meta = StructureMeta::new("graphene", "B", "G1", "A1");
        let doped = s.dope_out("B", 1, meta.clone()).unwrap();

        assert_eq!(doped.atoms[0].elem, "B");
        assert_eq!(doped.atoms[1].elem, "H");
        assert!(doped.atoms.iter().all(|a| a.charge.is_none()));
        assert_eq!(doped.meta, meta);
        // 原结构不受影响
        assert_eq!(s.atoms[0].elem, "C");
        assert!(s.atoms[0].charge.is_some());

        assert!(matches!(
            s.dope_out("B", 0, StructureMeta::default()),
            Err(DopingsError::IndexOutOfRange { .. })
        ));
        assert!(s.dope_out("B", 6, StructureMeta::default()).is_err());
    }

    #[test]
    fn test_formation_energy() {
        let mut s = methane();
        s.meta.param = Some("3ob".to_string());
        s.total_energy = Some(-70.123456);

        let (energy, per_atom) = s.formation_energy(&atoms_data()).unwrap();
        // -70.123456 - (-38 - 4 * 6.5) = -6.123456
        assert!((energy - (-6.1235)).abs() < 1e-9);
        assert!((per_atom - round_to(energy / 5.0, 4)).abs() < 1e-12);
    }

    #[test]
    fn test_formation_energy_missing_data() {
        let mut s = methane();
        s.total_energy = Some(-70.0);
        assert!(s.formation_energy(&atoms_data()).is_err());

        s.meta.param = Some("matsci".to_string());
        assert!(matches!(
            s.formation_energy(&atoms_data()),
            Err(DopingsError::MissingKey(_))
        ));
    }

    #[test]
    fn test_homo_lumo() {
        let mut s = methane();
        assert!(s.homo_lumo().is_err());

        s.homo = Some(-5.4321);
        s.lumo = Some(-2.1);
        let (homo, lumo, gap) = s.homo_lumo().unwrap();
        assert_eq!(homo, -5.4321);
        assert_eq!(lumo, -2.1);
        assert!((gap - 3.332).abs() < 1e-12);
    }

    #[test]
    fn test_shortest_distances() {
        let s = methane();
        let d = s.shortest_distances("C", "H", 2);
        assert_eq!(d.len(), 2);
        assert!((d[0] - 1.09).abs() < 1e-9);
        assert!((d[1] - 1.10).abs() < 1e-9);

        let hh = s.shortest_distances("H", "H", 100);
        // 12 个有序对，不包含自身
        assert_eq!(hh.len(), 12);
        assert!(hh.windows(2).all(|w| w[0] <= w[1]));
        assert!(hh[0] > 0.0);
    }

    #[test]
    fn test_excess_charges() {
        let s = methane();
        let excess = s.excess_charges(&atoms_data()).unwrap();
        assert!((excess[0] - 0.2).abs() < 1e-9);
        assert!((excess[1] + 0.05).abs() < 1e-9);

        let doped = s.dope_out("B", 1, StructureMeta::default()).unwrap();
        assert!(doped.excess_charges(&atoms_data()).is_err());
    }

    #[test]
    fn test_frame_string() {
        let s = methane().with_dir("/data/G1/A1");
        let text = s.frame_string().unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "5");
        assert_eq!(lines[1], "A1");
        assert_eq!(lines[2], "C 0 0 0 4.2");
        assert_eq!(lines[3], "H 1.09 0 0 0.95");

        let no_charge = s.copy();
        let text = no_charge.dope_out("B", 2, StructureMeta::default()).unwrap().frame_string().unwrap();
        assert_eq!(text.lines().nth(1), Some("frame"));
        assert_eq!(text.lines().nth(3), Some("B 1.09 0 0"));

        assert!(Structure::default().frame_string().is_err());
    }

    #[test]
    fn test_frame_string_rejects_partial_charges() {
        let mut s = methane();
        s.atoms[3].charge = None;
        assert!(matches!(s.frame_string(), Err(DopingsError::InvalidValue(_))));

        s.atoms[0].charge = None;
        assert!(s.frame_string().is_err());
    }

    #[test]
    fn test_frame_writes_parents() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("a/b/frame.xyz");
        methane().frame(&out).unwrap();
        assert!(out.is_file());
    }

    #[test]
    fn test_copy_drops_metadata() {
        let mut s = methane().with_dir("/x/y");
        s.total_energy = Some(-1.0);
        let c = s.copy();
        assert_eq!(c.atoms, s.atoms);
        assert!(c.dir.is_none());
        assert!(c.total_energy.is_none());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456789, 4), 1.2346);
        assert_eq!(round_to(-0.00049, 3), -0.0);
    }
}
