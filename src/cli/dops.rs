//! # 掺杂集合子命令 CLI 定义
//!
//! `report`, `generate`, `opt`, `structs`, `sets`, `bases`, `time` 的参数。
//! 除 `bases` 外共用 `SetArgs` 选择材料、掺杂元素与参数集。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/` 中的同名模块

use super::ImageFormat;
use crate::dops_set::DEFAULT_DOP_ELEMS;
use crate::viz::set_viz::SecondVar;

use clap::{Args, ValueEnum};

// ─────────────────────────────────────────────────────────────
// 公共参数
// ─────────────────────────────────────────────────────────────

/// 选择掺杂集合
#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    /// Material name, a key of dops_data.json
    #[arg(short, long)]
    pub material: String,

    /// Doping elements (default: Al B Li Mg N Na O P Si Ti Zn)
    #[arg(short, long, num_args = 1..)]
    pub elems: Vec<String>,

    /// Parameter set (default: param_dict of the element)
    #[arg(short, long)]
    pub param: Option<String>,
}

impl SetArgs {
    /// 要处理的掺杂元素
    pub fn dop_elems(&self) -> Vec<String> {
        if self.elems.is_empty() {
            DEFAULT_DOP_ELEMS.iter().map(|e| e.to_string()).collect()
        } else {
            self.elems.clone()
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 优化相关
// ─────────────────────────────────────────────────────────────

/// report 子命令参数
#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub set: SetArgs,

    /// Report the structures in reverse order
    #[arg(long, default_value_t = false)]
    pub reverse: bool,

    /// Do not list the steps where SCC did not converge
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}

/// generate 子命令参数
#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub set: SetArgs,

    /// Write even where a restarted optimization keeps its backup
    #[arg(long, default_value_t = false)]
    pub force_write: bool,
}

/// opt 子命令参数
#[derive(Args, Debug)]
pub struct OptArgs {
    #[command(flatten)]
    pub set: SetArgs,

    /// Optimize again structures that already converged
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    /// Keep running optimizations whose SCC hardly converges
    #[arg(long, default_value_t = false)]
    pub no_skip_scc: bool,

    /// Resume unfinished optimizations from their last written step
    #[arg(long, default_value_t = false)]
    pub resume: bool,

    /// Optimize the structures in reverse order
    #[arg(long, default_value_t = false)]
    pub reverse: bool,

    /// Seconds between two looks at a running optimization
    #[arg(long, default_value_t = 5)]
    pub poll: u64,
}

// ─────────────────────────────────────────────────────────────
// 输出相关
// ─────────────────────────────────────────────────────────────

/// structs 子命令参数
#[derive(Args, Debug)]
pub struct StructsArgs {
    #[command(flatten)]
    pub set: SetArgs,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Also write the histograms as xmgrace .dat files
    #[arg(long, default_value_t = false)]
    pub dat: bool,

    /// Image format of the histograms and charge maps
    #[arg(long, value_enum, default_value = "png")]
    pub format: ImageFormat,
}

/// 能量图的第二变量
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SecondVarArg {
    /// Norm of the dipole moment
    Dipole,
    /// Standard deviation of the excess charges
    Std,
}

impl From<SecondVarArg> for SecondVar {
    fn from(arg: SecondVarArg) -> Self {
        match arg {
            SecondVarArg::Dipole => SecondVar::Dipole,
            SecondVarArg::Std => SecondVar::Std,
        }
    }
}

/// sets 子命令参数
#[derive(Args, Debug)]
pub struct SetsArgs {
    #[command(flatten)]
    pub set: SetArgs,

    /// Only draw the energy-site grid against this variable
    /// (default: energy alone, then against dipole and std)
    #[arg(long, value_enum)]
    pub second_var: Option<SecondVarArg>,

    /// Leave the correlation out of the energy-site titles
    #[arg(long, default_value_t = false)]
    pub no_cov: bool,
}

/// bases 子命令参数
#[derive(Args, Debug)]
pub struct BasesArgs {
    /// Material name, a key of dops_data.json
    #[arg(short, long)]
    pub material: String,

    /// Parameter set the bases were optimized with
    #[arg(short, long)]
    pub param: String,

    /// Also write the histograms as xmgrace .dat files
    #[arg(long, default_value_t = false)]
    pub dat: bool,

    /// Image format of the histograms and charge maps
    #[arg(long, value_enum, default_value = "png")]
    pub format: ImageFormat,
}

/// time 子命令参数
#[derive(Args, Debug)]
pub struct TimeArgs {
    #[command(flatten)]
    pub set: SetArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_default_elems() {
        let cli = Cli::parse_from(["dopings", "report", "-m", "graphene"]);
        let Commands::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.set.dop_elems().len(), DEFAULT_DOP_ELEMS.len());
        assert!(!args.quiet);
    }

    #[test]
    fn test_sets_args() {
        let cli = Cli::parse_from(["dopings", "sets", "-m", "graphine", "-e", "B", "N", "--second-var", "std"]);
        let Commands::Sets(args) = cli.command else {
            panic!("expected sets");
        };
        assert_eq!(args.set.dop_elems(), vec!["B", "N"]);
        assert_eq!(args.second_var.map(SecondVar::from), Some(SecondVar::Std));
    }

    #[test]
    fn test_time_args() {
        let cli = Cli::parse_from(["dopings", "time", "-m", "graphine", "-p", "3ob"]);
        let Commands::Time(args) = cli.command else {
            panic!("expected time");
        };
        assert_eq!(args.set.param.as_deref(), Some("3ob"));
    }
}
