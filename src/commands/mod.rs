//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。配置目录在分派前读取一次。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `config.rs`, `dops_set/`, `viz/`, `graphine/`, `h2_gen/`, `utils/`
//! - 子模块: report, generate, opt, structs, sets, bases, time, h2, scan, inspect

pub mod bases;
pub mod generate;
pub mod h2;
pub mod inspect;
pub mod opt;
pub mod report;
pub mod scan;
pub mod sets;
pub mod structs;
pub mod time;

use crate::cli::dops::SetArgs;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::dops_set::{DopsSet, SetMode};
use crate::error::{DopingsError, Result};
use crate::utils::output;

/// 执行命令
pub fn run(cli: Cli) -> Result<()> {
    let cfg = Config::load(&cli.config_dir)?;

    match cli.command {
        Commands::Report(args) => report::execute(args, &cfg),
        Commands::Generate(args) => generate::execute(args, &cfg),
        Commands::Opt(args) => opt::execute(args, &cfg),
        Commands::Structs(args) => structs::execute(args, &cfg),
        Commands::Sets(args) => sets::execute(args, &cfg),
        Commands::Bases(args) => bases::execute(args, &cfg),
        Commands::Time(args) => time::execute(args, &cfg),
        Commands::H2(args) => h2::execute(args, &cfg).map(|_| ()),
        Commands::Scan(args) => scan::execute(args, &cfg),
        Commands::Inspect(args) => inspect::execute(args, &cfg),
    }
}

/// 读取所选元素的掺杂集合，空集合跳过
fn load_sets<'c>(cfg: &'c Config, args: &SetArgs, mode: SetMode) -> Result<Vec<DopsSet<'c>>> {
    let info = cfg.dops_info(&args.material)?;

    let mut sets = Vec::new();
    for elem in args.dop_elems() {
        let set = DopsSet::new(cfg, &elem, info, mode, args.param.as_deref(), false)?;
        if set.is_empty() {
            output::print_skip(&format!("No structures in the {}-{} set", args.material, elem));
            continue;
        }
        sets.push(set);
    }

    output::print_info(&format!(
        "Loaded {} set(s) of {} in {} mode",
        sets.len(),
        args.material,
        mode
    ));
    Ok(sets)
}

/// 缺少数据时只给出警告，其余错误照常返回
fn warn_missing<T>(what: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DopingsError::MissingData(reason)) => {
            output::print_warning(&format!("{}: {}", what, reason));
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_missing() {
        assert_eq!(warn_missing("x", Ok(1)).unwrap(), Some(1));
        let missing: Result<i32> = Err(DopingsError::MissingData("no bands".into()));
        assert_eq!(warn_missing("x", missing).unwrap(), None);
        let other: Result<i32> = Err(DopingsError::InvalidValue("bad".into()));
        assert!(warn_missing("x", other).is_err());
    }
}
