//! # report 命令实现
//!
//! 依次打印每个掺杂结构的优化状态。
//!
//! ## 依赖关系
//! - 使用 `cli/dops.rs` 定义的参数
//! - 使用 `dops_set/`, `utils/output.rs`

use crate::cli::dops::ReportArgs;
use crate::config::Config;
use crate::dops_set::{DopsSet, OptOptions, SetMode};
use crate::error::Result;
use crate::utils::output;

/// 执行 report 命令
pub fn execute(args: ReportArgs, cfg: &Config) -> Result<()> {
    let info = cfg.dops_info(&args.set.material)?;
    let options = OptOptions {
        verbose: !args.quiet,
        ..Default::default()
    };

    for elem in args.set.dop_elems() {
        output::print_header(&format!("{}-{}", info.material, elem));
        let set = DopsSet::new(cfg, &elem, info, SetMode::Look, args.set.param.as_deref(), false)?;
        set.map_opt(&options, true, args.reverse)?;
    }

    Ok(())
}
