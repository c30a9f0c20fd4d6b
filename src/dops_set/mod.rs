//! # 掺杂集合
//!
//! 一个 `DopsSet` 表示某一掺杂元素在一种材料所有基底、所有位点上的
//! 掺杂结构。根据访问模式：
//!
//! - `look`: 只列出结构，用于查看优化状态
//! - `write`: 生成优化输入文件 (续算过的目录默认跳过)
//! - `read`: 只保留已收敛的结构并读取其数据
//!
//! 目录约定：
//!
//! ```text
//! [bases]/[material]/[base]                                   基底
//! [dopings_opt]/[material]/[dop_elem]/[base]/[site]           掺杂结构
//! [processing_output]/[material]/[method]/[dop_elem]/[dop_elem]-[base]-[site].[suffix]
//! [processing_output]/[material]/[method]/[method]-[dop_elem].csv
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/`, `viz/set_viz.rs`, `graphine/viz.rs` 使用
//! - 使用 `models/structure.rs`, `config.rs`, `batch/`, `export.rs`
//! - 子模块: files (输入文件生成), optimize (调用优化程序)

pub mod files;
pub mod optimize;

pub use optimize::OptOptions;

use crate::batch::{BatchResult, BatchRunner, ProcessResult};
use crate::config::{Config, DopsInfo};
use crate::error::{DopingsError, Result};
use crate::export::Table;
use crate::models::{Structure, StructureMeta};
use crate::utils::output;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

/// 默认处理的掺杂元素
pub const DEFAULT_DOP_ELEMS: [&str; 11] = ["Al", "B", "Li", "Mg", "N", "Na", "O", "P", "Si", "Ti", "Zn"];

/// 集合访问模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    Look,
    Read,
    Write,
}

impl fmt::Display for SetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetMode::Look => write!(f, "look"),
            SetMode::Read => write!(f, "read"),
            SetMode::Write => write!(f, "write"),
        }
    }
}

/// 写入 CSV 的结构方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvMethod {
    HomoLumo,
    FormationEnergy,
}

impl CsvMethod {
    pub const ALL: [CsvMethod; 2] = [CsvMethod::HomoLumo, CsvMethod::FormationEnergy];

    pub fn name(&self) -> &'static str {
        match self {
            CsvMethod::HomoLumo => "homo_lumo",
            CsvMethod::FormationEnergy => "formation_energy",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            CsvMethod::HomoLumo => &["homo", "lumo", "homo_lumo"],
            CsvMethod::FormationEnergy => &["energy", "per_atom"],
        }
    }

    /// 计算一个结构的一行数据
    pub fn row(&self, s: &Structure, cfg: &Config) -> Result<Vec<String>> {
        match self {
            CsvMethod::HomoLumo => {
                let (homo, lumo, gap) = s.homo_lumo()?;
                Ok(vec![homo.to_string(), lumo.to_string(), gap.to_string()])
            }
            CsvMethod::FormationEnergy => {
                let (energy, per_atom) = s.formation_energy(&cfg.atoms)?;
                Ok(vec![energy.to_string(), per_atom.to_string()])
            }
        }
    }
}

/// 掺杂集合
pub struct DopsSet<'c> {
    cfg: &'c Config,
    /// 掺杂元素
    pub dop_elem: String,
    /// 优化参数集
    pub param: Option<String>,
    pub info: DopsInfo,
    pub mode: SetMode,
    /// 基底名 -> 基底结构
    pub bases: BTreeMap<String, Structure>,
    /// 掺杂结构，按基底、位点顺序
    pub structs: Vec<Structure>,
}

impl<'c> DopsSet<'c> {
    /// 构建掺杂集合
    pub fn new(
        cfg: &'c Config,
        dop_elem: &str,
        info: &DopsInfo,
        mode: SetMode,
        param: Option<&str>,
        force_write: bool,
    ) -> Result<Self> {
        let n_chars = dop_elem.chars().count();
        if !(1..=2).contains(&n_chars) {
            return Err(DopingsError::InvalidValue(format!("Invalid dop_elem: '{}'", dop_elem)));
        }
        if !valid_dops_info(info) {
            return Err(DopingsError::InvalidValue(format!(
                "Not valid dops_info for material {}",
                info.material
            )));
        }

        let param = param
            .map(str::to_string)
            .or_else(|| cfg.dops.param_dict.get(dop_elem).cloned());

        let mut set = DopsSet {
            cfg,
            dop_elem: dop_elem.to_string(),
            param,
            info: info.clone(),
            mode,
            bases: BTreeMap::new(),
            structs: Vec::new(),
        };

        for base in &info.bases {
            let dir = set.infer_base_dir(base);
            let meta = StructureMeta {
                material: Some(info.material.clone()),
                base: Some(base.clone()),
                ..Default::default()
            };
            let base_struct = Structure::from_dir(&dir, meta, cfg)?;
            if base_struct.atoms.is_empty() {
                return Err(DopingsError::MissingData(format!(
                    "base structure {} has no atoms",
                    dir.display()
                )));
            }
            set.bases.insert(base.clone(), base_struct);
        }

        for base in &info.bases {
            for site in &info.sites[base] {
                let mut meta = StructureMeta::new(&info.material, dop_elem, base, site);
                meta.param = set.param.clone();

                let opt_dir = infer_dops_dir(&cfg.dirs.dopings_opt, &info.material, dop_elem, base, site);
                let id = set.atom_id(base, site)?;
                let doped = set.bases[base].dope_out(dop_elem, id, meta.clone())?.with_dir(&opt_dir);

                match mode {
                    SetMode::Look => set.structs.push(doped),
                    SetMode::Write => {
                        let backup_exists = opt_dir.join(&cfg.main.resume_dir_name).is_dir();
                        if !backup_exists || force_write {
                            files::gen_files(&doped, cfg, false, false)?;
                        } else {
                            output::print_warning(&format!(
                                "Not writing over {}, cause this optimization was restarted",
                                opt_dir.display()
                            ));
                        }
                        set.structs.push(doped);
                    }
                    SetMode::Read => {
                        let report = doped.report(cfg)?;
                        if !report.is_converged() {
                            if report.exists {
                                output::print_warning(&format!(
                                    "Not reading not converged structure: {}",
                                    opt_dir.display()
                                ));
                            } else {
                                output::print_skip(&format!(
                                    "Skipping structure with not found output: {}",
                                    opt_dir.display()
                                ));
                            }
                            continue;
                        }
                        set.structs.push(Structure::from_dir(&opt_dir, meta, cfg)?);
                    }
                }
            }
        }

        log::info!(
            "{}-{} ({} mode): {} structures",
            info.material,
            dop_elem,
            mode,
            set.structs.len()
        );
        Ok(set)
    }

    pub fn config(&self) -> &'c Config {
        self.cfg
    }

    pub fn material(&self) -> &str {
        &self.info.material
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    /// 位点对应的原子编号 (从 1 开始)
    pub fn atom_id(&self, base: &str, site: &str) -> Result<usize> {
        self.info
            .sites_id
            .get(base)
            .and_then(|sites| sites.get(site))
            .copied()
            .ok_or_else(|| DopingsError::MissingKey(format!("sites_id of {}/{}", base, site)))
    }

    /// 基底目录 `[bases]/[material]/[base]`
    pub fn infer_base_dir(&self, base: &str) -> PathBuf {
        self.cfg.dirs.bases.join(&self.info.material).join(base)
    }

    /// 输出文件路径
    ///
    /// `as_csv` 时为整个集合的 CSV，否则为单个结构的文件，此时需要 `suffix`。
    pub fn infer_dir_out(
        &self,
        s: &Structure,
        method: &str,
        suffix: Option<&str>,
        as_csv: bool,
    ) -> Result<PathBuf> {
        let meta = &s.meta;
        let missing = |what: &str| DopingsError::MissingData(format!("structure {} has no {}", s.name(), what));
        let material = meta.material.as_deref().ok_or_else(|| missing("material"))?;
        let dop_elem = meta.dop_elem.as_deref().ok_or_else(|| missing("dop_elem"))?;

        let method_dir = self.cfg.dirs.processing_output.join(material).join(method);
        if as_csv {
            return Ok(method_dir.join(format!("{}-{}.csv", method, dop_elem)));
        }

        let suffix = suffix
            .ok_or_else(|| DopingsError::InvalidArgument("suffix is needed".to_string()))?
            .trim_start_matches('.');
        let base = meta.base.as_deref().ok_or_else(|| missing("base"))?;
        let site = meta.site.as_deref().ok_or_else(|| missing("site"))?;

        Ok(method_dir
            .join(dop_elem)
            .join(format!("{}-{}-{}.{}", dop_elem, base, site, suffix)))
    }

    fn require_read_mode(&self) -> Result<()> {
        if self.mode != SetMode::Read {
            return Err(DopingsError::InvalidValue(
                "read mode is needed for proper processing results".to_string(),
            ));
        }
        Ok(())
    }

    /// 对每个结构执行 `f(structure, 输出路径)`，并行运行
    pub fn map<F>(&self, method: &str, suffix: &str, jobs: usize, f: F) -> Result<BatchResult>
    where
        F: Fn(&Structure, &Path) -> Result<()> + Sync + Send,
    {
        self.require_read_mode()?;

        let jobs_list = self
            .structs
            .iter()
            .map(|s| Ok((s, self.infer_dir_out(s, method, Some(suffix), false)?)))
            .collect::<Result<Vec<_>>>()?;

        let runner = BatchRunner::new(jobs);
        let result = runner.run(&jobs_list, method, |(s, path)| {
            let name = path.display().to_string();
            match f(s, path) {
                Ok(()) => {
                    log::debug!("{} -> {}", s.name(), name);
                    ProcessResult::Success(name)
                }
                Err(DopingsError::MissingData(reason)) => {
                    log::warn!("{}: {}", name, reason);
                    ProcessResult::Skipped(name)
                }
                Err(e) => ProcessResult::Failed(name, e.to_string()),
            }
        })?;

        Ok(result)
    }

    /// 收集每个结构的 `f(structure)` 行，写出整个集合的 CSV
    ///
    /// 表头为 `material, dop_elem, Base, Site` 加 `columns`。
    pub fn map_to_csv<F>(&self, method: &str, columns: &[&str], f: F) -> Result<PathBuf>
    where
        F: Fn(&Structure) -> Result<Vec<String>>,
    {
        let Some(first) = self.structs.first() else {
            return Err(DopingsError::MissingData(format!(
                "There is no structs on the {}-{} set",
                self.info.material, self.dop_elem
            )));
        };

        let mut headers = vec!["material", "dop_elem", "Base", "Site"];
        headers.extend_from_slice(columns);
        let mut table = Table::new(&headers);

        for s in &self.structs {
            let mut row: Vec<String> = [&s.meta.material, &s.meta.dop_elem, &s.meta.base, &s.meta.site]
                .iter()
                .map(|v| v.as_deref().unwrap_or_default().to_string())
                .collect();
            row.extend(f(s)?);
            table.push_row(row)?;
        }

        let dir_out = self.infer_dir_out(first, method, None, true)?;
        table.write_csv(&dir_out)?;
        output::print_path(&dir_out);
        Ok(dir_out)
    }

    /// 以已知方法写出 CSV
    pub fn method_to_csv(&self, method: CsvMethod) -> Result<PathBuf> {
        self.map_to_csv(method.name(), method.columns(), |s| method.row(s, self.cfg))
    }

    /// 依次查看或优化每个结构
    pub fn map_opt(&self, options: &OptOptions, only_report: bool, inverse_order: bool) -> Result<()> {
        let mut structs: Vec<&Structure> = self.structs.iter().collect();
        if inverse_order {
            structs.reverse();
        }

        for s in structs {
            if only_report {
                s.report(self.cfg)?.print(options.verbose);
            } else {
                s.opt(self.cfg, options)?;
            }
        }
        Ok(())
    }

    /// 满足条件的结构
    pub fn filter<P>(&self, pred: P) -> Vec<&Structure>
    where
        P: Fn(&Structure) -> bool,
    {
        self.structs.iter().filter(|s| pred(s)).collect()
    }

    /// 某个基底的所有掺杂结构，按位点顺序
    pub fn structs_of_base(&self, base: &str) -> Vec<&Structure> {
        self.filter(|s| s.meta.base.as_deref() == Some(base))
    }

    /// 按基底与位点查找结构
    pub fn find(&self, base: &str, site: &str) -> Option<&Structure> {
        self.structs
            .iter()
            .find(|s| s.meta.base.as_deref() == Some(base) && s.meta.site.as_deref() == Some(site))
    }
}

/// 掺杂结构目录 `[dopings_opt]/[material]/[dop_elem]/[base]/[site]`
pub fn infer_dops_dir(dopings_opt: &Path, material: &str, dop_elem: &str, base: &str, site: &str) -> PathBuf {
    dopings_opt.join(material).join(dop_elem).join(base).join(site)
}

/// 检查 `sites`、`sites_id` 的基底与位点是否与 `bases` 一致
pub fn valid_dops_info(info: &DopsInfo) -> bool {
    let bases: BTreeSet<&String> = info.bases.iter().collect();

    if info.sites.keys().collect::<BTreeSet<_>>() != bases {
        return false;
    }
    if info.sites_id.keys().collect::<BTreeSet<_>>() != bases {
        return false;
    }

    info.bases.iter().all(|base| {
        let sites: BTreeSet<&String> = info.sites[base].iter().collect();
        info.sites_id[base].keys().collect::<BTreeSet<_>>() == sites
    })
}
