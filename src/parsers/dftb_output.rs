//! # DFTB+ 优化日志解析器
//!
//! 解析 DFTB+ 标准输出重定向得到的日志文件 (默认名 `output`)，
//! 提取总能量与几何优化状态。
//!
//! ## 日志片段
//! ```text
//! Geometry step: 12
//! ...
//! >> SCC is NOT converged, maximal SCC iterations exceeded
//! Total Energy:                      -45.1234567890 H        -1227.9283 eV
//! Extrapolated to 0K:                -45.1234000000 H        -1227.9267 eV
//! ...
//! Geometry converged
//! ...
//! Total                            =      812.40 (100.0%)      205.31 (100.0%)
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 生成 `models/report.rs` 的 OptReport
//! - 使用 `regex` 提取能量

use crate::error::{DopingsError, Result};
use crate::models::{OptReport, OptStatus};

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static EXTRAPOLATED_0K: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Extrapolated to 0K:?\s+(\S+)\s+H\s+(\S+)\s+eV").unwrap()
});

static TOTAL_ENERGY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Total Energy:?\s+(\S+)\s+H\s+(\S+)\s+eV").unwrap());

/// 计时表的合计行：`Total = cpu (..%) wall (..%)`
static RUN_TIME_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Total\s+=\s+(\S+)\s+\(\s*\S+%\)\s+(\S+)\s+\(").unwrap()
});

const STEP_MARKER: &str = "Geometry step:";
const SCC_NOT_CONVERGED: &str = "SCC is NOT converged";
const GEOMETRY_CONVERGED: &str = "Geometry converged";
const GEOMETRY_NOT_CONVERGED: [&str; 2] = ["Geometry NOT converged", "Geometry did NOT converge"];

/// 从日志末尾向前查找最后一步的总能量 (eV)
///
/// `extrapolated_0k` 为真时取外推到 0 K 的能量，否则取 `Total Energy`。
pub fn parse_energy(content: &str, extrapolated_0k: bool) -> Option<f64> {
    let pattern = if extrapolated_0k {
        &*EXTRAPOLATED_0K
    } else {
        &*TOTAL_ENERGY
    };

    content
        .lines()
        .rev()
        .find_map(|line| pattern.captures(line))
        .and_then(|caps| caps[2].parse().ok())
}

/// 读取能量，日志不存在时返回 None，找不到能量时报错
pub fn read_energy(path: &Path, extrapolated_0k: bool) -> Result<Option<f64>> {
    if !path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| DopingsError::read(path, e))?;
    match parse_energy(&content, extrapolated_0k) {
        Some(energy) => Ok(Some(energy)),
        None => Err(DopingsError::ParseError {
            format: "DFTB+ output".to_string(),
            path: path.display().to_string(),
            reason: "Energies not found in file".to_string(),
        }),
    }
}

/// 日志中所有计时表合计行的墙钟时间之和 (s)，没有计时表时返回 None
///
/// 续算备份中的日志由多次运行追加而成，每次运行各有一张计时表。
pub fn parse_run_time(content: &str) -> Option<f64> {
    let totals: Vec<f64> = content
        .lines()
        .filter_map(|line| RUN_TIME_TOTAL.captures(line))
        .filter_map(|caps| caps[2].parse().ok())
        .collect();

    if totals.is_empty() {
        None
    } else {
        Some(totals.iter().sum())
    }
}

/// 读取日志的运行时间 (s)，日志不存在或没有计时表时返回 None
pub fn read_run_time(path: &Path) -> Result<Option<f64>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| DopingsError::read(path, e))?;
    Ok(parse_run_time(&content))
}

/// 解析几何优化状态
pub fn parse_opt_log(content: &str, dir: &Path) -> OptReport {
    let step_positions: Vec<usize> = content.match_indices(STEP_MARKER).map(|(i, _)| i).collect();

    // SCC 失败出现在哪一步：最后一个起始位置不大于它的几何步，每次出现记一次
    let scc_not_converged: Vec<usize> = content
        .match_indices(SCC_NOT_CONVERGED)
        .filter_map(|(pos, _)| step_positions.iter().rposition(|&start| start < pos))
        .collect();

    let status = if content.contains(GEOMETRY_CONVERGED) {
        OptStatus::Converged
    } else if GEOMETRY_NOT_CONVERGED.iter().any(|m| content.contains(m)) {
        OptStatus::NotConverged
    } else {
        OptStatus::Undefined
    };

    OptReport {
        dir: dir.to_path_buf(),
        exists: true,
        status,
        steps_written: (0..step_positions.len()).collect(),
        scc_not_converged,
    }
}

/// 读取优化目录下日志的状态报告
pub fn read_opt_report(dir: &Path, output_name: &str) -> Result<OptReport> {
    let path = dir.join(output_name);
    if !path.is_file() {
        return Ok(OptReport::missing(dir));
    }

    let content = std::fs::read_to_string(&path).map_err(|e| DopingsError::read(&path, e))?;
    Ok(parse_opt_log(&content, dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const LOG: &str = "\
Geometry step: 0
  iSCC Total electronic   Diff electronic      SCC error
Total Energy:                      -45.1000000000 H        -1227.1000 eV
Extrapolated to 0K:                -45.1100000000 H        -1227.2000 eV
Geometry step: 1
>> SCC is NOT converged, maximal SCC iterations exceeded
Total Energy:                      -45.2000000000 H        -1227.3000 eV
Extrapolated to 0K:                -45.2100000000 H        -1227.4000 eV
Geometry step: 2
>> SCC is NOT converged, maximal SCC iterations exceeded
Total Energy:                      -45.3000000000 H        -1227.5000 eV
Extrapolated to 0K:                -45.3100000000 H        -1227.6000 eV
Geometry converged
";

    #[test]
    fn test_parse_energy() {
        assert_eq!(parse_energy(LOG, true), Some(-1227.6));
        assert_eq!(parse_energy(LOG, false), Some(-1227.5));
        assert_eq!(parse_energy("nothing here", true), None);
    }

    #[test]
    fn test_parse_opt_log() {
        let dir = PathBuf::from("/opt/G1/B1");
        let report = parse_opt_log(LOG, &dir);

        assert!(report.exists);
        assert_eq!(report.status, OptStatus::Converged);
        assert_eq!(report.steps_written, vec![0, 1, 2]);
        assert_eq!(report.scc_not_converged, vec![1, 2]);
        assert!(report.is_converged());
    }

    #[test]
    fn test_not_converged_and_undefined() {
        let dir = PathBuf::from("/x");
        let text = "Geometry step: 0\nGeometry did NOT converge\n";
        assert_eq!(parse_opt_log(text, &dir).status, OptStatus::NotConverged);

        let text = "Geometry step: 0\nGeometry step: 1\n";
        let report = parse_opt_log(text, &dir);
        assert_eq!(report.status, OptStatus::Undefined);
        assert_eq!(report.last_step(), Some(1));

        let report = parse_opt_log("", &dir);
        assert!(report.steps_written.is_empty());
    }

    #[test]
    fn test_scc_failure_before_first_step_is_ignored() {
        let text = "SCC is NOT converged\nGeometry step: 0\n";
        let report = parse_opt_log(text, Path::new("/x"));
        assert!(report.scc_not_converged.is_empty());
    }

    #[test]
    fn test_scc_failures_counted_per_occurrence() {
        let text = "\
Geometry step: 0
>> SCC is NOT converged, maximal SCC iterations exceeded
>> SCC is NOT converged, maximal SCC iterations exceeded
Geometry step: 1
>> SCC is NOT converged, maximal SCC iterations exceeded
";
        let report = parse_opt_log(text, Path::new("/x"));
        assert_eq!(report.scc_not_converged, vec![0, 0, 1]);
        assert!(report.scc_failed_last_step());
    }

    #[test]
    fn test_parse_run_time() {
        let table = "\
--------------------------------------------------------------------------------
DFTB+ running times                          cpu [s]             wall clock [s]
--------------------------------------------------------------------------------
Global initialisation                 +       0.01 (  0.0%)       0.01 (  0.0%)
Post-geometry optimisation            +       0.30 (  0.1%)       0.08 (  0.1%)
--------------------------------------------------------------------------------
Total                                 =     812.40 (100.0%)     205.31 (100.0%)
--------------------------------------------------------------------------------
";
        assert!((parse_run_time(table).unwrap() - 205.31).abs() < 1e-9);

        let appended = format!("{}{}", table, table.replace("205.31", "94.69"));
        assert!((parse_run_time(&appended).unwrap() - 300.0).abs() < 1e-9);

        assert_eq!(parse_run_time(LOG), None);
    }

    #[test]
    fn test_read_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_energy(&dir.path().join("output"), true).unwrap(), None);

        let report = read_opt_report(dir.path(), "output").unwrap();
        assert!(!report.exists);

        std::fs::write(dir.path().join("output"), "Geometry step: 0\n").unwrap();
        assert!(read_energy(&dir.path().join("output"), true).is_err());
    }
}
