//! # sets 命令实现
//!
//! 绘制掺杂集合的图表：
//! - 每个集合: HOMO/LUMO 随位点变化，石墨炔另加几何变化图与 CSV
//! - 所有集合: HOMO/LUMO 与形成能随掺杂元素变化，形成能随位点的网格图
//!
//! ## 依赖关系
//! - 使用 `cli/dops.rs` 定义的参数
//! - 使用 `dops_set/`, `viz/set_viz.rs`, `graphine/`

use super::{load_sets, warn_missing};
use crate::cli::dops::SetsArgs;
use crate::config::Config;
use crate::dops_set::{DopsSet, SetMode};
use crate::error::Result;
use crate::graphine;
use crate::utils::output;
use crate::viz::set_viz::{self, SecondVar};

/// 执行 sets 命令
pub fn execute(args: SetsArgs, cfg: &Config) -> Result<()> {
    output::print_header("Drawing Set Graphs");
    let sets = load_sets(cfg, &args.set, SetMode::Read)?;
    if sets.is_empty() {
        output::print_warning(&format!("No converged structures of {}", args.set.material));
        return Ok(());
    }

    for set in &sets {
        per_set(set)?;
    }

    output::print_header("Comparing Doping Elements");
    warn_missing("gap x elem", set_viz::gap_elem_graph(&sets))?;
    warn_missing("energy x elem", set_viz::energ_elem_graphs(&sets))?;

    if sets.len() < 2 {
        output::print_skip("Energy x site grid needs at least two sets");
    } else {
        let second_vars: Vec<Option<SecondVar>> = match args.second_var {
            Some(var) => vec![Some(var.into())],
            None => vec![None, Some(SecondVar::Dipole), Some(SecondVar::Std)],
        };
        for var in second_vars {
            let what = format!("energy x site ({})", var.map_or("energy".to_string(), |v| v.to_string()));
            warn_missing(&what, set_viz::energ_site_graph(&sets, var, !args.no_cov))?;
        }
    }

    output::print_done(&format!("Graphs of {} set(s) drawn", sets.len()));
    Ok(())
}

fn per_set(set: &DopsSet) -> Result<()> {
    let label = format!("{}-{}", set.material(), set.dop_elem);
    output::print_info(&label);

    warn_missing(&format!("{} gap x site", label), set_viz::gap_site_graph(set))?;

    if set.material() == graphine::MATERIAL {
        warn_missing(&format!("{} geometry", label), graphine::geometry_graph(set))?;
        warn_missing(&format!("{} geometry table", label), graphine::geometry_csv(set))?;
    }
    Ok(())
}
