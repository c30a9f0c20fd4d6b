//! # 优化输入文件生成
//!
//! 为掺杂结构生成 `inp.xyz` 与 `dftb_in.hsd`，以及为中断的优化
//! 准备续算目录。
//!
//! `dftb_in.hsd` 由参数集的通用模板修改而来 (Li 掺杂使用 `3ob+Li`)：
//! - `Hamiltonian/DFTB/MaxAngularMomentum`: 每种元素的最大角动量
//! - `Hamiltonian/DFTB/HubbardDerivs`: 3ob 参数集的 Hubbard 导数
//! - `Hamiltonian/DFTB/SlaterKosterFiles/Type2FileNames/Prefix`: SK 文件目录
//! - `Hamiltonian/DFTB/Filling`: Fermi 展宽 2000 K，帮助 SCC 收敛
//! - `Geometry = xyzFormat { <<< "inp.xyz" }`
//!
//! ## 依赖关系
//! - 被 `dops_set/mod.rs` (write 模式)、`dops_set/optimize.rs` 使用
//! - 使用 `parsers/hsd.rs` 读写模板

use crate::config::Config;
use crate::error::{DopingsError, Result};
use crate::models::Structure;
use crate::parsers::hsd::{self, HsdBlock};
use crate::parsers::{self, CHARGES_FILE, GEO_END_FILE, INPUT_HSD_FILE, INPUT_XYZ_FILE};
use crate::utils::output;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Li 掺杂使用的模板
const LI_TEMPLATE: &str = "3ob+Li";
/// 需要 Hubbard 导数的参数集
const HUBBARD_PARAM: &str = "3ob";
/// Fermi 展宽温度 (K)
const FERMI_TEMPERATURE: u32 = 2000;

/// 续算时保留的文件
const KEEP_ON_RESUME: [&str; 3] = [INPUT_XYZ_FILE, CHARGES_FILE, INPUT_HSD_FILE];

/// 生成结构的优化输入文件
pub fn gen_files(s: &Structure, cfg: &Config, read_initial_charges: bool, redo: bool) -> Result<PathBuf> {
    let dir = s.require_dir()?;
    fs::create_dir_all(dir).map_err(|e| DopingsError::write(dir, e))?;

    s.frame(&dir.join(INPUT_XYZ_FILE))?;

    let param = s
        .meta
        .param
        .as_deref()
        .ok_or_else(|| DopingsError::MissingData(format!("structure {} has no param", s.name())))?;
    let is_li = s.meta.dop_elem.as_deref() == Some("Li");

    let template_key = if is_li { LI_TEMPLATE } else { param };
    let template = cfg
        .dirs
        .generic_hsd
        .get(template_key)
        .ok_or_else(|| DopingsError::MissingKey(format!("generic_hsd for {}", template_key)))?;
    let mut hsd = hsd::read_hsd(template)?;

    let skf_dir = cfg
        .dirs
        .skf_dirs
        .get(param)
        .ok_or_else(|| DopingsError::MissingKey(format!("skf_dirs for {}", param)))?;
    let skf_prefix = skf_prefix(skf_dir)?;

    {
        let dftb = method_block(&mut hsd, &["Hamiltonian", "DFTB"], template)?;
        let elements = s.elements();

        let max_ang = dftb.child_block_mut("MaxAngularMomentum");
        for elem in &elements {
            let momentum = cfg.atoms.max_ang_momentum.get(*elem).ok_or_else(|| {
                DopingsError::MissingKey(format!("max_ang_momentum of element {}", elem))
            })?;
            max_ang.set_value(elem, format!("\"{}\"", momentum));
        }

        if param == HUBBARD_PARAM && !is_li {
            let derivs = dftb.child_block_mut("HubbardDerivs");
            for elem in &elements {
                let value = cfg.atoms.hubbard_derivs.get(*elem).ok_or_else(|| {
                    DopingsError::MissingKey(format!("hubbard_derivs of element {}", elem))
                })?;
                derivs.set_value(elem, value);
            }
        }

        method_block(dftb, &["SlaterKosterFiles", "Type2FileNames"], template)?
            .set_value("Prefix", format!("\"{}\"", skf_prefix));

        let mut fermi = HsdBlock::new();
        fermi.set_value("Temperature [K]", FERMI_TEMPERATURE);
        let mut filling = HsdBlock::new();
        filling.set_block("Fermi", fermi);
        dftb.set_block("Filling", filling);

        if read_initial_charges {
            dftb.set_value("ReadInitialCharges", "Yes");
        }
    }

    if read_initial_charges {
        hsd.path_mut(&["Options"]).set_value("ReadChargesAsText", "Yes");
    }

    if redo {
        method_block(&mut hsd, &["Driver", "GeometryOptimization"], template)?
            .set_value("MaxSteps", cfg.main.redo_steps_limits);
    }

    let mut xyz = HsdBlock::new();
    xyz.push_raw(format!("<<< \"{}\"", INPUT_XYZ_FILE));
    let mut geometry = HsdBlock::new();
    geometry.set_block("xyzFormat", xyz);
    hsd.set_block("Geometry", geometry);

    let target = dir.join(INPUT_HSD_FILE);
    hsd::write_hsd(&hsd, &target)?;
    output::print_path(&target);

    Ok(target)
}

/// 模板中必须已有的方法块，缺失时不自动创建
fn method_block<'a>(hsd: &'a mut HsdBlock, path: &[&str], template: &Path) -> Result<&'a mut HsdBlock> {
    hsd.existing_path_mut(path).ok_or_else(|| {
        DopingsError::MissingKey(format!("{} in {}", path.join(" = "), template.display()))
    })
}

/// SK 文件目录的绝对路径，以单个 `/` 结尾
fn skf_prefix(skf_dir: &Path) -> Result<String> {
    let absolute = std::path::absolute(skf_dir).map_err(|e| DopingsError::read(skf_dir, e))?;
    let absolute = absolute.display().to_string();
    Ok(format!("{}/", absolute.trim_end_matches(['/', std::path::MAIN_SEPARATOR])))
}

fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| DopingsError::read(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl Structure {
    /// 备份当前优化目录，并以最后一帧和电荷为起点重新生成输入文件
    ///
    /// 日志与 `geo_end.xyz` 追加到备份目录中的同名文件，其他文件直接复制。
    /// 重新生成失败时从备份恢复目录。
    pub fn redo_files_for_resume(&self, cfg: &Config) -> Result<()> {
        let dir = self.require_dir()?;
        let last_frame = parsers::read_frame(dir)?.ok_or_else(|| {
            DopingsError::MissingData(format!("no {} to resume from in {}", GEO_END_FILE, dir.display()))
        })?;

        let backup = dir.join(&cfg.main.resume_dir_name);
        fs::create_dir_all(&backup).map_err(|e| DopingsError::write(&backup, e))?;

        for file in files_in(dir)? {
            let name = file_name(&file);
            let dest = backup.join(&name);

            if name == GEO_END_FILE || name == cfg.output_name() {
                let content = fs::read(&file).map_err(|e| DopingsError::read(&file, e))?;
                let mut copy = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&dest)
                    .map_err(|e| DopingsError::write(&dest, e))?;
                copy.write_all(&content).map_err(|e| DopingsError::write(&dest, e))?;
            } else {
                fs::copy(&file, &dest).map_err(|e| DopingsError::write(&dest, e))?;
            }
        }
        log::debug!("backed up {} into {}", dir.display(), backup.display());

        if let Err(e) = gen_files(self, cfg, true, true) {
            for file in files_in(&backup)? {
                let dest = dir.join(file_name(&file));
                fs::copy(&file, &dest).map_err(|e| DopingsError::write(&dest, e))?;
            }
            fs::remove_dir_all(&backup).map_err(|e| DopingsError::write(&backup, e))?;
            output::print_error("OPT FILES RESTORED BECAUSE REDO COULD NOT BE DONE");
            return Err(DopingsError::Other(format!(
                "It was not possible to gen files for restart: {}",
                e
            )));
        }

        // 初始电荷从 charges.dat 读取，inp.xyz 只写坐标
        let mut start = Structure::new(last_frame).with_dir(dir);
        for atom in &mut start.atoms {
            atom.charge = None;
        }
        start.frame(&dir.join(INPUT_XYZ_FILE))?;

        for file in files_in(dir)? {
            if !KEEP_ON_RESUME.contains(&file_name(&file).as_str()) {
                fs::remove_file(&file).map_err(|e| DopingsError::write(&file, e))?;
            }
        }

        Ok(())
    }
}
