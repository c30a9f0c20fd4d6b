//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - 掺杂集合: `report`, `generate`, `opt`, `structs`, `sets`, `bases`, `time`
//! - H2 覆盖: `h2`
//! - 目录工具: `scan`, `inspect`
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: dops, h2, scan, inspect

pub mod dops;
pub mod h2;
pub mod inspect;
pub mod scan;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// dopings - 掺杂石墨烯/石墨炔结构分析工具
#[derive(Parser)]
#[command(name = "dopings")]
#[command(version)]
#[command(about = "Prepare, run and analyze DFTB+ optimizations of doped graphene-like structures", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory with the JSON configuration files
    #[arg(long, global = true, env = "DOPINGS_CONFIG_DIR", default_value = "input/config_files")]
    pub config_dir: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// `-v` 次数对应的日志级别
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Print the optimization status of every doped structure
    Report(dops::ReportArgs),

    /// Write the optimization input files of every doped structure
    Generate(dops::GenerateArgs),

    /// Run the optimizer on every doped structure, one at a time
    Opt(dops::OptArgs),

    /// Per-structure outputs: log copy, frame, histogram, charge map, JSON, CSVs
    Structs(dops::StructsArgs),

    /// Per-set charts: gaps, formation energies, graphyne geometry
    Sets(dops::SetsArgs),

    /// HOMO/LUMO and formation energy tables of the undoped bases
    Bases(dops::BasesArgs),

    /// Optimization run time of every set, in hours
    Time(dops::TimeArgs),

    /// Write structures covered with 0 to N H2 molecules
    H2(h2::H2Args),

    /// Walk a directory tree and tabulate every optimization found
    Scan(scan::ScanArgs),

    /// Show the data read from one optimization directory
    Inspect(inspect::InspectArgs),
}

/// 图像输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG image
    #[default]
    Png,
    /// SVG vector image
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}
