//! # scan 命令实现
//!
//! 在目录树中查找 DFTB+ 优化目录，并行读取每个目录的优化状态、
//! 总能量与 HOMO-LUMO 能隙，以表格显示，可另存为 CSV / JSON。
//!
//! ## 依赖关系
//! - 使用 `cli/scan.rs` 定义的参数
//! - 使用 `batch/` 收集与并行读取
//! - 使用 `export.rs`, `utils/output.rs`

use crate::batch::{BatchRunner, OptDirCollector};
use crate::cli::scan::ScanArgs;
use crate::config::Config;
use crate::error::{DopingsError, Result};
use crate::export;
use crate::models::{OptStatus, Structure, StructureMeta};
use crate::parsers;
use crate::utils::output;

use serde::Serialize;
use std::path::Path;
use tabled::{Table, Tabled};

/// 一个优化目录的汇总
#[derive(Debug, Clone, Serialize)]
pub struct ScanRecord {
    /// 相对根目录的路径
    pub dir: String,
    pub status: OptStatus,
    pub last_step: Option<usize>,
    pub scc_failures: usize,
    pub n_atoms: usize,
    /// 总能量 (eV)
    pub energy: Option<f64>,
    /// HOMO-LUMO 能隙 (eV)
    pub gap: Option<f64>,
    /// 读取输出时的错误
    pub note: String,
}

/// 终端表格行
#[derive(Debug, Clone, Tabled)]
struct ScanRow {
    #[tabled(rename = "Directory")]
    dir: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last step")]
    last_step: String,
    #[tabled(rename = "SCC fails")]
    scc_failures: usize,
    #[tabled(rename = "Energy (eV)")]
    energy: String,
    #[tabled(rename = "Gap (eV)")]
    gap: String,
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl From<&ScanRecord> for ScanRow {
    fn from(r: &ScanRecord) -> Self {
        ScanRow {
            dir: r.dir.clone(),
            status: r.status.to_string(),
            last_step: or_dash(r.last_step),
            scc_failures: r.scc_failures,
            energy: or_dash(r.energy.map(|e| format!("{:.4}", e))),
            gap: or_dash(r.gap.map(|g| format!("{:.3}", g))),
        }
    }
}

/// 读取一个优化目录
pub fn scan_dir(dir: &Path, root: &Path, cfg: &Config) -> Result<ScanRecord> {
    let report = parsers::read_opt_report(dir, cfg.output_name())?;
    let rel = dir.strip_prefix(root).unwrap_or(dir).display().to_string();

    let mut record = ScanRecord {
        dir: if rel.is_empty() { ".".to_string() } else { rel },
        status: report.status,
        last_step: report.last_step(),
        scc_failures: report.scc_not_converged.len(),
        n_atoms: 0,
        energy: None,
        gap: None,
        note: String::new(),
    };

    match Structure::from_dir(dir, StructureMeta::default(), cfg) {
        Ok(s) => {
            record.n_atoms = s.size();
            record.energy = s.total_energy;
            record.gap = s.homo_lumo().ok().map(|(_, _, gap)| gap);
        }
        Err(e) => {
            log::debug!("{}: {}", dir.display(), e);
            record.note = e.to_string();
        }
    }
    Ok(record)
}

/// 执行 scan 命令
pub fn execute(args: ScanArgs, cfg: &Config) -> Result<()> {
    output::print_header("Scanning Optimizations");

    let dirs = OptDirCollector::new(&args.root, cfg.output_name())
        .with_pattern(args.pattern.as_deref())?
        .skip_dir(&cfg.main.resume_dir_name)
        .collect()?;
    if dirs.is_empty() {
        return Err(DopingsError::NoStructuresFound {
            root: args.root.display().to_string(),
        });
    }
    output::print_info(&format!("Found {} optimization directories", dirs.len()));

    let runner = BatchRunner::new(args.jobs);
    let results = runner.collect(&dirs, "Reading", |dir| scan_dir(dir, &args.root, cfg))?;

    let mut records = Vec::with_capacity(results.len());
    for (dir, result) in dirs.iter().zip(results) {
        match result {
            Ok(record) => records.push(record),
            Err(e) => output::print_error(&format!("{}: {}", dir.display(), e)),
        }
    }
    if args.unconverged {
        records.retain(|r| r.status != OptStatus::Converged);
    }

    let rows: Vec<ScanRow> = records.iter().map(ScanRow::from).collect();
    let table = Table::new(&rows);
    println!("{}", table);

    for r in records.iter().filter(|r| !r.note.is_empty()) {
        output::print_warning(&format!("{}: {}", r.dir, r.note));
    }

    let converged = records.iter().filter(|r| r.status == OptStatus::Converged).count();
    output::print_done(&format!("{} of {} optimizations converged", converged, records.len()));

    if let Some(path) = &args.csv {
        export::write_records(&records, path)?;
        output::print_success(&format!("Table saved to '{}'", path.display()));
    }
    if let Some(path) = &args.json {
        export::write_json(&records, path)?;
        output::print_success(&format!("Table saved to '{}'", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dops_set::tests::{converge, setup};

    #[test]
    fn test_scan_dir() {
        let (root, cfg) = setup();
        converge(&cfg, "A1");

        let opt_root = cfg.dirs.dopings_opt.clone();
        let record = scan_dir(&opt_root.join("graphene/B/G1/A1"), &opt_root, &cfg).unwrap();
        assert_eq!(record.dir, Path::new("graphene/B/G1/A1").display().to_string());
        assert_eq!(record.status, OptStatus::Converged);
        assert_eq!(record.last_step, Some(0));
        assert_eq!(record.n_atoms, 3);
        assert!(record.energy.is_some());
        assert!(record.gap.is_none());
        drop(root);
    }

    #[test]
    fn test_scan_row() {
        let record = ScanRecord {
            dir: "a".to_string(),
            status: OptStatus::NotConverged,
            last_step: None,
            scc_failures: 2,
            n_atoms: 0,
            energy: Some(-1.23456),
            gap: None,
            note: String::new(),
        };
        let row = ScanRow::from(&record);
        assert_eq!(row.last_step, "-");
        assert_eq!(row.energy, "-1.2346");
        assert_eq!(row.gap, "-");
        assert_eq!(row.status, "NOT converged");
    }
}
