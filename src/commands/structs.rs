//! # structs 命令实现
//!
//! 对每个已收敛的掺杂结构并行生成单结构输出：
//! 日志副本、最后一帧、键长直方图、电荷分布图、JSON，
//! 再写出每个集合的 HOMO/LUMO 与形成能 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/dops.rs` 定义的参数
//! - 使用 `dops_set/`, `viz/struct_viz.rs`, `export.rs`

use super::{load_sets, warn_missing};
use crate::cli::dops::StructsArgs;
use crate::config::Config;
use crate::dops_set::{CsvMethod, DopsSet, SetMode};
use crate::error::Result;
use crate::export;
use crate::utils::output;
use crate::viz::struct_viz::{charges_map, histogram};

/// 执行 structs 命令
pub fn execute(args: StructsArgs, cfg: &Config) -> Result<()> {
    output::print_header("Processing Structures");
    let sets = load_sets(cfg, &args.set, SetMode::Read)?;
    let ext = args.format.extension();

    for set in &sets {
        output::print_header(&format!("{}-{}", set.material(), set.dop_elem));
        let name = |method: &str| format!("{}-{} {}", set.material(), set.dop_elem, method);

        set.map("output", "out", args.jobs, |s, p| s.output(p, cfg))?
            .print_summary(&name("output"));
        set.map("frame", "xyz", args.jobs, |s, p| s.frame(p))?
            .print_summary(&name("frame"));
        set.map("histogram", ext, args.jobs, |s, p| histogram(s, p, args.dat, cfg))?
            .print_summary(&name("histogram"));
        set.map("charges_map", ext, args.jobs, |s, p| charges_map(s, p, cfg))?
            .print_summary(&name("charges_map"));
        set.map("json", "json", args.jobs, |s, p| export::write_json(s, p))?
            .print_summary(&name("json"));

        write_csvs(set)?;
    }

    output::print_done(&format!("Processed {} set(s)", sets.len()));
    Ok(())
}

/// 每个已知方法写一份 CSV
fn write_csvs(set: &DopsSet) -> Result<()> {
    for method in CsvMethod::ALL {
        warn_missing(method.name(), set.method_to_csv(method))?;
    }
    Ok(())
}
