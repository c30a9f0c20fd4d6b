//! # h2 子命令 CLI 定义
//!
//! 在优化好的结构上摆放 H2，写出一系列 XYZ 文件
//! (`<name>-000.xyz` 到 `<name>-<max>.xyz`)。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/h2.rs`

use crate::h2_gen::H2Orientation;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 结构类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum H2Layout {
    /// Finite flake, H2 spread over a hexagon around the carbons
    Flake,
    /// Periodic cell read from geo_end.gen, H2 on a square grid
    Periodic,
}

impl std::fmt::Display for H2Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            H2Layout::Flake => write!(f, "flake"),
            H2Layout::Periodic => write!(f, "periodic"),
        }
    }
}

/// H2 朝向
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OrientationArg {
    /// Axis perpendicular to the structure
    Vertical,
    /// Axis parallel to the structure, along x
    Horizontal,
    /// Axis parallel to the structure, random in-plane angle
    Random,
}

impl From<OrientationArg> for H2Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Vertical => H2Orientation::Vertical,
            OrientationArg::Horizontal => H2Orientation::Horizontal,
            OrientationArg::Random => H2Orientation::Random,
        }
    }
}

/// h2 子命令参数
#[derive(Args, Debug)]
pub struct H2Args {
    /// Kind of structure
    #[arg(value_enum)]
    pub layout: H2Layout,

    /// Optimization directory holding geo_end.xyz (and geo_end.gen when periodic)
    pub dir: PathBuf,

    /// Largest number of H2 (flake: per side; periodic: in total)
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// H2 per Å² used for the periodic count when --count is not given
    #[arg(long, default_value_t = 0.16)]
    pub density: f64,

    /// Only write the structure with exactly --count molecules
    #[arg(long, default_value_t = false)]
    pub only: bool,

    /// Cover both sides of the structure
    #[arg(long, default_value_t = false)]
    pub both_sides: bool,

    /// Orientation of the H2 axis
    #[arg(long, value_enum, default_value = "vertical")]
    pub orientation: OrientationArg,

    /// Seed of the random placement
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output directory (default: <h2_gen_output>/<layout>/<orientation>-<mono|dual>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl H2Args {
    /// 默认输出子目录名
    pub fn variant(&self) -> String {
        let sides = if self.both_sides { "dual" } else { "mono" };
        format!("{}-{}", H2Orientation::from(self.orientation), sides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_h2_args() {
        let cli = Cli::parse_from(["dopings", "h2", "flake", "bases/graphine/g1", "-n", "30", "--both-sides"]);
        let Commands::H2(args) = cli.command else {
            panic!("expected h2");
        };
        assert_eq!(args.layout, H2Layout::Flake);
        assert_eq!(args.count, Some(30));
        assert_eq!(args.variant(), "vertical-dual");

        let cli = Cli::parse_from(["dopings", "h2", "periodic", "g1_s2", "--orientation", "random", "--seed", "4"]);
        let Commands::H2(args) = cli.command else {
            panic!("expected h2");
        };
        assert_eq!(args.count, None);
        assert_eq!(args.seed, Some(4));
        assert_eq!(args.variant(), "random-mono");
    }
}
