//! # generate 命令实现
//!
//! 为每个掺杂结构写出 `inp.xyz` 与 `dftb_in.hsd`。
//! 已经续算过的目录保留原文件，除非 `--force-write`。
//!
//! ## 依赖关系
//! - 使用 `cli/dops.rs` 定义的参数
//! - 使用 `dops_set/`, `utils/output.rs`

use crate::cli::dops::GenerateArgs;
use crate::config::Config;
use crate::dops_set::{DopsSet, SetMode};
use crate::error::Result;
use crate::utils::output;

/// 执行 generate 命令
pub fn execute(args: GenerateArgs, cfg: &Config) -> Result<()> {
    output::print_header("Generating Optimization Files");
    let info = cfg.dops_info(&args.set.material)?;

    let mut total = 0;
    for elem in args.set.dop_elems() {
        let set = DopsSet::new(
            cfg,
            &elem,
            info,
            SetMode::Write,
            args.set.param.as_deref(),
            args.force_write,
        )?;
        output::print_success(&format!(
            "{}-{}: {} structures (param {})",
            info.material,
            elem,
            set.len(),
            set.param.as_deref().unwrap_or("-")
        ));
        total += set.len();
    }

    output::print_done(&format!(
        "Files written under '{}' for {} structures",
        cfg.dirs.dopings_opt.join(&info.material).display(),
        total
    ));
    Ok(())
}
