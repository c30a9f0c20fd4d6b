//! # scan 子命令 CLI 定义
//!
//! 在目录树中查找优化目录并汇总状态、能量与能隙
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/scan.rs`

use clap::Args;
use std::path::PathBuf;

/// scan 子命令参数
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Root directory to walk
    pub root: PathBuf,

    /// Glob pattern on the path relative to the root (e.g. "graphene/B/*/*")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Only list the optimizations that did not converge
    #[arg(long, default_value_t = false)]
    pub unconverged: bool,

    /// Write the table to a CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write the table to a JSON file
    #[arg(long)]
    pub json: Option<PathBuf>,
}
