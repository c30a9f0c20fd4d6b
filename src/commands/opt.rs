//! # opt 命令实现
//!
//! 依次在每个掺杂结构的目录中运行优化程序，一次一个。
//!
//! ## 依赖关系
//! - 使用 `cli/dops.rs` 定义的参数
//! - 使用 `dops_set/`, `utils/output.rs`

use crate::cli::dops::OptArgs;
use crate::config::Config;
use crate::dops_set::{DopsSet, OptOptions, SetMode};
use crate::error::Result;
use crate::utils::output;

use std::time::Duration;

fn options(args: &OptArgs) -> OptOptions {
    OptOptions {
        overwrite: args.overwrite,
        verbose: true,
        skip_hard_to_conv_scc: !args.no_skip_scc,
        resume_unfinished: args.resume,
        poll_interval: Duration::from_secs(args.poll.max(1)),
    }
}

/// 执行 opt 命令
pub fn execute(args: OptArgs, cfg: &Config) -> Result<()> {
    let info = cfg.dops_info(&args.set.material)?;
    let options = options(&args);
    log::debug!("optimization options: {:?}", options);

    for elem in args.set.dop_elems() {
        output::print_header(&format!("Optimizing {}-{}", info.material, elem));
        let set = DopsSet::new(cfg, &elem, info, SetMode::Look, args.set.param.as_deref(), false)?;
        set.map_opt(&options, false, args.reverse)?;
    }

    output::print_done("All optimizations finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::dops::SetArgs;

    #[test]
    fn test_options_from_args() {
        let args = OptArgs {
            set: SetArgs {
                material: "graphene".to_string(),
                elems: vec![],
                param: None,
            },
            overwrite: true,
            no_skip_scc: true,
            resume: false,
            reverse: false,
            poll: 0,
        };
        let options = options(&args);
        assert!(options.overwrite);
        assert!(!options.skip_hard_to_conv_scc);
        assert_eq!(options.poll_interval, Duration::from_secs(1));
    }
}
