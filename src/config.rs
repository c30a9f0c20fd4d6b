//! # 全局配置
//!
//! 从配置目录读取六个 JSON 文件，反序列化为强类型配置结构：
//!
//! | 文件 | 内容 |
//! |---|---|
//! | `dirs_data.json` | 各类根目录、优化程序路径、HSD 模板、SK 参数目录、H2 输出目录 |
//! | `main_config.json` | 输出文件名、续算备份目录名等 |
//! | `graphine_data.json` | 石墨炔各臂的位点编号与几何参考值 |
//! | `dops_data.json` | 各材料的掺杂集合描述 (`DopsInfo`) |
//! | `atoms_data.json` | 价电子数、孤立原子能量、角动量、Hubbard 导数 |
//! | `viz_config.json` | 直方图与电荷图的绘图参数 |
//!
//! ## 依赖关系
//! - 被 `commands/`, `dops_set/`, `viz/`, `graphine/` 使用
//! - 使用 `models/site.rs` 的 SiteLabel
//! - 使用 `serde_json` 解析

use crate::error::{DopingsError, Result};
use crate::models::SiteLabel;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置目录
pub const DEFAULT_CONFIG_DIR: &str = "input/config_files";

// ─────────────────────────────────────────────────────────────
// dirs_data.json
// ─────────────────────────────────────────────────────────────

/// 目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirsData {
    /// 未掺杂基底结构的根目录 `[bases]/[material]/[base]`
    pub bases: PathBuf,
    /// 掺杂结构优化目录的根目录
    pub dopings_opt: PathBuf,
    /// 处理结果输出根目录
    pub processing_output: PathBuf,
    /// 机器名 -> 优化程序可执行文件
    #[serde(default)]
    pub bin_dir: BTreeMap<String, PathBuf>,
    /// 参数集 -> 通用 dftb_in.hsd 模板
    #[serde(default)]
    pub generic_hsd: BTreeMap<String, PathBuf>,
    /// 参数集 -> Slater-Koster 文件目录
    #[serde(default)]
    pub skf_dirs: BTreeMap<String, PathBuf>,
    /// H2 覆盖结构的输出根目录，默认 `[processing_output]/h2_gen`
    #[serde(default)]
    pub h2_gen_output: Option<PathBuf>,
}

impl DirsData {
    fn expand(mut self) -> Self {
        self.bases = expand_home(&self.bases);
        self.dopings_opt = expand_home(&self.dopings_opt);
        self.processing_output = expand_home(&self.processing_output);
        self.h2_gen_output = self.h2_gen_output.as_deref().map(expand_home);
        for map in [&mut self.bin_dir, &mut self.generic_hsd, &mut self.skf_dirs] {
            for path in map.values_mut() {
                *path = expand_home(path);
            }
        }
        self
    }

    /// H2 覆盖结构的输出根目录
    pub fn h2_gen_root(&self) -> PathBuf {
        self.h2_gen_output
            .clone()
            .unwrap_or_else(|| self.processing_output.join("h2_gen"))
    }
}

// ─────────────────────────────────────────────────────────────
// main_config.json
// ─────────────────────────────────────────────────────────────

/// 主配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainConfig {
    /// 优化程序日志文件名
    #[serde(default = "default_output_name")]
    pub output_name: String,
    /// 续算前备份目录名
    #[serde(default = "default_resume_dir_name")]
    pub resume_dir_name: String,
    /// 续算时几何优化的最大步数
    #[serde(default = "default_redo_steps_limits")]
    pub redo_steps_limits: u32,
    /// 当前机器名，用于在 `bin_dir` 中选择可执行文件
    #[serde(default, alias = "maquina")]
    pub machine: String,
}

fn default_output_name() -> String {
    "output".to_string()
}

fn default_resume_dir_name() -> String {
    "before_restart".to_string()
}

fn default_redo_steps_limits() -> u32 {
    10000
}

impl Default for MainConfig {
    fn default() -> Self {
        MainConfig {
            output_name: default_output_name(),
            resume_dir_name: default_resume_dir_name(),
            redo_steps_limits: default_redo_steps_limits(),
            machine: String::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────
// graphine_data.json
// ─────────────────────────────────────────────────────────────

/// 石墨炔几何数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphineData {
    /// base -> 六条臂，每条臂为 位点 -> 原子编号 (从 1 开始)
    pub sites_id: BTreeMap<String, Vec<BTreeMap<SiteLabel, usize>>>,
    /// base -> 未掺杂时内臂长度 (Å)
    #[serde(default)]
    pub int_arm_length: BTreeMap<String, f64>,
    /// base -> 未掺杂时外臂长度 (Å)
    #[serde(default)]
    pub ext_arm_length: BTreeMap<String, f64>,
    /// base -> 未掺杂时三个轴的扭转角 (°)
    #[serde(default)]
    pub base_torsions: BTreeMap<String, [f64; 3]>,
    /// base -> 位点 -> 未掺杂时环上扭转角 (°)
    #[serde(default)]
    pub dop_atom_torsion_on_ring: BTreeMap<String, BTreeMap<String, f64>>,
    /// base -> 位点 -> 未掺杂时键角 (°)
    #[serde(default)]
    pub bases_bonds_angles: BTreeMap<String, BTreeMap<String, f64>>,
}

// ─────────────────────────────────────────────────────────────
// dops_data.json
// ─────────────────────────────────────────────────────────────

/// 绘图 y 轴范围
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ylims {
    /// HOMO/LUMO 图
    pub gap: [f64; 2],
    /// base -> 形成能图
    #[serde(default)]
    pub energy: BTreeMap<String, [f64; 2]>,
}

/// 掺杂集合的绘图配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphsConfig {
    pub ylims: Ylims,
}

/// 一种材料的掺杂集合描述
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DopsInfo {
    pub graphs_config: GraphsConfig,
    /// 材料名 (graphene, graphine, ...)
    pub material: String,
    /// 基底名，保持配置文件中的顺序
    pub bases: Vec<String>,
    /// base -> 掺杂位点列表，保持顺序
    pub sites: BTreeMap<String, Vec<String>>,
    /// base -> 位点 -> 被替换原子编号 (从 1 开始)
    pub sites_id: BTreeMap<String, BTreeMap<String, usize>>,
    /// base -> 原子数
    pub n_atoms: BTreeMap<String, usize>,
    /// base -> 期望的化学键数量
    pub n_ligs: BTreeMap<String, usize>,
}

/// 掺杂数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DopsData {
    /// 掺杂元素 -> 默认参数集
    #[serde(default)]
    pub param_dict: BTreeMap<String, String>,
    /// 材料名 -> 掺杂集合描述
    #[serde(flatten)]
    pub materials: BTreeMap<String, DopsInfo>,
}

// ─────────────────────────────────────────────────────────────
// atoms_data.json
// ─────────────────────────────────────────────────────────────

/// 元素数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtomsData {
    /// 元素 -> 价电子数
    #[serde(default)]
    pub valency: BTreeMap<String, u32>,
    /// 参数集 -> 元素 -> 孤立原子能量 (eV)
    #[serde(default)]
    pub energ_atom: BTreeMap<String, BTreeMap<String, f64>>,
    /// 元素 -> 最大角动量 (s, p, d)
    #[serde(default)]
    pub max_ang_momentum: BTreeMap<String, String>,
    /// 元素 -> Hubbard 导数 (3ob 参数集)
    #[serde(default)]
    pub hubbard_derivs: BTreeMap<String, f64>,
}

impl AtomsData {
    /// 查询元素价电子数
    pub fn valency_of(&self, elem: &str) -> Result<u32> {
        self.valency
            .get(elem)
            .copied()
            .ok_or_else(|| DopingsError::MissingKey(format!("valency of element {} not found", elem)))
    }

    /// 查询参数集下的孤立原子能量
    pub fn atom_energy(&self, param: &str, elem: &str) -> Result<f64> {
        self.energ_atom
            .get(param)
            .ok_or_else(|| DopingsError::MissingKey(format!("energ_atom for param {}", param)))?
            .get(elem)
            .copied()
            .ok_or_else(|| {
                DopingsError::MissingKey(format!("energ_atom of element {} in param {}", elem, param))
            })
    }
}

// ─────────────────────────────────────────────────────────────
// viz_config.json
// ─────────────────────────────────────────────────────────────

/// 键长直方图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramConfig {
    /// 材料 -> "E1-E2" (按字母序) -> 成键判据 (Å)
    pub bond_crit: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default = "default_hist_x_limits")]
    pub x_limits: [f64; 2],
    #[serde(default = "default_bins_length")]
    pub bins_length: f64,
    #[serde(default = "default_delta_tick_small")]
    pub delta_tick_small: f64,
    #[serde(default = "default_delta_tick_big")]
    pub delta_tick_big: f64,
    /// 图片尺寸 (像素)
    #[serde(default = "default_fig_size")]
    pub fig_size: [u32; 2],
}

fn default_hist_x_limits() -> [f64; 2] {
    [1.0, 1.8]
}

fn default_bins_length() -> f64 {
    0.01
}

fn default_delta_tick_small() -> f64 {
    0.01
}

fn default_delta_tick_big() -> f64 {
    0.05
}

fn default_fig_size() -> [u32; 2] {
    [1600, 900]
}

/// 电荷图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargesMapConfig {
    /// 标度后的取值范围
    #[serde(default = "default_values_limits")]
    pub values_limits: [f64; 2],
    #[serde(default = "default_fig_size")]
    pub fig_size: [u32; 2],
}

fn default_values_limits() -> [f64; 2] {
    [-0.5, 0.5]
}

impl Default for ChargesMapConfig {
    fn default() -> Self {
        ChargesMapConfig {
            values_limits: default_values_limits(),
            fig_size: default_fig_size(),
        }
    }
}

/// 可视化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VizConfig {
    pub histogram: HistogramConfig,
    #[serde(default)]
    pub charges_map: ChargesMapConfig,
}

// ─────────────────────────────────────────────────────────────
// 汇总
// ─────────────────────────────────────────────────────────────

/// 全部配置
#[derive(Debug, Clone)]
pub struct Config {
    pub dirs: DirsData,
    pub main: MainConfig,
    pub graphine: GraphineData,
    pub dops: DopsData,
    pub atoms: AtomsData,
    pub viz: VizConfig,
}

impl Config {
    /// 从配置目录读取全部配置文件
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(DopingsError::DirectoryNotFound {
                path: dir.display().to_string(),
            });
        }

        log::debug!("loading configuration from {}", dir.display());

        let dirs: DirsData = read_json(&dir.join("dirs_data.json"))?;

        Ok(Config {
            dirs: dirs.expand(),
            main: read_json(&dir.join("main_config.json"))?,
            graphine: read_json(&dir.join("graphine_data.json"))?,
            dops: read_json(&dir.join("dops_data.json"))?,
            atoms: read_json(&dir.join("atoms_data.json"))?,
            viz: read_json(&dir.join("viz_config.json"))?,
        })
    }

    /// 获取材料的掺杂集合描述
    pub fn dops_info(&self, material: &str) -> Result<&DopsInfo> {
        self.dops
            .materials
            .get(material)
            .ok_or_else(|| DopingsError::MissingKey(format!("dops_data has no material {}", material)))
    }

    /// 优化日志文件名
    pub fn output_name(&self) -> &str {
        &self.main.output_name
    }
}

/// 读取并反序列化一个 JSON 文件
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|e| DopingsError::read(path, e))?;
    serde_json::from_str(&text).map_err(|e| DopingsError::ConfigError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// 展开路径开头的 `~`
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
