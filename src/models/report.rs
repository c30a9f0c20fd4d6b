//! # 优化状态报告
//!
//! 描述一次几何优化在日志文件中的状态：是否收敛、写出了哪些几何步、
//! 哪些步的 SCC 没有收敛。
//!
//! ## 依赖关系
//! - 由 `parsers/dftb_output.rs` 生成
//! - 被 `models/structure.rs`, `dops_set/`, `commands/` 使用

use crate::utils::output;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SCC 失败步数超过该值时放弃优化
const MAX_SCC_FAILURES: usize = 30;
/// 在前若干步内 SCC 失败过多时放弃优化
const EARLY_STEP_LIMIT: usize = 30;
const EARLY_SCC_FAILURES: usize = 20;

/// 几何优化状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptStatus {
    Converged,
    NotConverged,
    Undefined,
}

impl std::fmt::Display for OptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptStatus::Converged => write!(f, "Converged"),
            OptStatus::NotConverged => write!(f, "NOT converged"),
            OptStatus::Undefined => write!(f, "Undefined"),
        }
    }
}

/// 优化报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptReport {
    /// 优化目录
    pub dir: PathBuf,
    /// 日志文件是否存在
    pub exists: bool,
    pub status: OptStatus,
    /// 已写出的几何步 (从 0 开始)
    pub steps_written: Vec<usize>,
    /// SCC 未收敛的几何步
    pub scc_not_converged: Vec<usize>,
}

impl OptReport {
    /// 日志文件不存在时的报告
    pub fn missing(dir: impl Into<PathBuf>) -> Self {
        OptReport {
            dir: dir.into(),
            exists: false,
            status: OptStatus::Undefined,
            steps_written: Vec::new(),
            scc_not_converged: Vec::new(),
        }
    }

    pub fn is_converged(&self) -> bool {
        self.exists && self.status == OptStatus::Converged
    }

    pub fn last_step(&self) -> Option<usize> {
        self.steps_written.last().copied()
    }

    /// SCC 未收敛步占总步数的百分比，上限 100
    pub fn scc_failure_percent(&self) -> f64 {
        let denom = self.steps_written.len().saturating_sub(1).max(1);
        let percent = 100.0 * self.scc_not_converged.len() as f64 / denom as f64;
        ((percent * 10.0).round() / 10.0).min(100.0)
    }

    /// 最后一个几何步 SCC 是否未收敛
    pub fn scc_failed_last_step(&self) -> bool {
        match (self.scc_not_converged.last(), self.last_step()) {
            (Some(failed), Some(last)) => *failed == last,
            _ => false,
        }
    }

    /// SCC 难以收敛：失败超过 30 步，或在第 30 步之前失败超过 20 步
    pub fn is_hard_to_converge(&self) -> bool {
        let failures = self.scc_not_converged.len();
        if failures > MAX_SCC_FAILURES {
            return true;
        }
        match self.scc_not_converged.last() {
            Some(last) => *last < EARLY_STEP_LIMIT && failures > EARLY_SCC_FAILURES,
            None => false,
        }
    }

    /// 生成报告文本
    pub fn lines(&self, verbose: bool) -> Vec<String> {
        let dir = self.dir.display();
        let mut lines = Vec::new();

        if !self.exists {
            lines.push(format!("{} - the output file doesn't exist", dir));
            return lines;
        }

        match self.last_step() {
            Some(last) => lines.push(format!(
                "{} - {:<14} | Last step: {}",
                dir,
                self.status.to_string(),
                last
            )),
            None => lines.push(format!(
                "{} - {:<14} | No steps written to file",
                dir,
                self.status.to_string()
            )),
        }

        if verbose && !self.scc_not_converged.is_empty() {
            lines.push(format!(
                "\tNot converged SCC's: {:?} => {}% of total",
                self.scc_not_converged,
                self.scc_failure_percent()
            ));
            if self.scc_failed_last_step() {
                lines.push("WARNING: SCC was not converged in the final step.".to_string());
            }
        }

        lines
    }

    /// 打印报告
    pub fn print(&self, verbose: bool) {
        let lines = self.lines(verbose);
        let Some((head, rest)) = lines.split_first() else {
            return;
        };

        match (self.exists, self.status) {
            (false, _) => output::print_skip(head),
            (true, OptStatus::Converged) => output::print_success(head),
            (true, OptStatus::NotConverged) => output::print_warning(head),
            (true, OptStatus::Undefined) => output::print_info(head),
        }
        for line in rest {
            println!("{}", line);
        }
    }
}
