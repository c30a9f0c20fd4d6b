//! # 解析器模块
//!
//! 读取 DFTB+ 优化目录中的输出文件，以及读写 HSD 输入文件。
//!
//! | 文件 | 内容 |
//! |---|---|
//! | `geo_end.xyz` | 优化轨迹，取最后一帧 |
//! | `band.out` | 能带，求 HOMO/LUMO |
//! | `detailed.out` | 偶极矩 |
//! | 日志 (`output`) | 总能量、优化状态、运行时间 |
//! | `dftb_in.hsd` | 输入文件 |
//! | `geo_end.gen` | 周期性结构的晶胞 |
//!
//! 文件不存在时返回 `None`，文件存在但内容不合法时返回错误。
//!
//! ## 依赖关系
//! - 被 `models/structure.rs`, `dops_set/`, `commands/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: geo_end, gen_cell, band_out, detailed_out, dftb_output, hsd

pub mod band_out;
pub mod detailed_out;
pub mod dftb_output;
pub mod gen_cell;
pub mod geo_end;
pub mod hsd;

use crate::config::AtomsData;
use crate::error::{DopingsError, Result};
use crate::models::{AtomData, OptReport};

use std::fs;
use std::path::Path;

pub const GEO_END_FILE: &str = "geo_end.xyz";
pub const BAND_FILE: &str = "band.out";
pub const DETAILED_FILE: &str = "detailed.out";
pub const INPUT_XYZ_FILE: &str = "inp.xyz";
pub const INPUT_HSD_FILE: &str = "dftb_in.hsd";
pub const CHARGES_FILE: &str = "charges.dat";
pub const GEO_END_GEN_FILE: &str = "geo_end.gen";

/// 读取优化轨迹的最后一帧
pub fn read_frame(dir: &Path) -> Result<Option<Vec<AtomData>>> {
    let path = dir.join(GEO_END_FILE);
    if !path.is_file() {
        log::trace!("{} not found", path.display());
        return Ok(None);
    }
    geo_end::parse_geo_end_file(&path).map(Some)
}

/// 读取周期性结构的晶胞
pub fn read_cell(dir: &Path) -> Result<Option<gen_cell::Cell>> {
    let path = dir.join(GEO_END_GEN_FILE);
    if !path.is_file() {
        log::trace!("{} not found", path.display());
        return Ok(None);
    }
    gen_cell::parse_gen_file(&path).map(Some)
}

/// 读取日志中的总能量 (eV)
pub fn read_energy(dir: &Path, output_name: &str, extrapolated_0k: bool) -> Result<Option<f64>> {
    dftb_output::read_energy(&dir.join(output_name), extrapolated_0k)
}

/// 读取优化的墙钟时间 (s)：当前日志加上续算备份中的日志
pub fn read_run_time(dir: &Path, output_name: &str, resume_dir_name: &str) -> Result<Option<f64>> {
    let current = dftb_output::read_run_time(&dir.join(output_name))?;
    let resumed = dftb_output::read_run_time(&dir.join(resume_dir_name).join(output_name))?;

    Ok(match (current, resumed) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or_default() + b.unwrap_or_default()),
    })
}

/// 读取 HOMO 与 LUMO 能级 (eV)
pub fn read_bands(dir: &Path, atoms: &[AtomData], atoms_data: &AtomsData) -> Result<Option<(f64, f64)>> {
    let path = dir.join(BAND_FILE);
    if !path.is_file() {
        log::trace!("{} not found", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|e| DopingsError::read(&path, e))?;
    let bands = band_out::parse_bands(&content);
    let val_electrons = band_out::valence_electrons(atoms, atoms_data)?;

    band_out::homo_lumo_from_bands(&bands, val_electrons).map(Some)
}

/// 读取偶极矩 (a.u.)
pub fn read_dipole(dir: &Path) -> Result<Option<[f64; 3]>> {
    let path = dir.join(DETAILED_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|e| DopingsError::read(&path, e))?;
    Ok(detailed_out::parse_dipole(&content))
}

/// 读取优化状态报告
pub fn read_opt_report(dir: &Path, output_name: &str) -> Result<OptReport> {
    dftb_output::read_opt_report(dir, output_name)
}
