//! # time 命令实现
//!
//! 统计掺杂集合的优化耗时：每个结构取日志计时表的墙钟时间，
//! 续算前的运行一并计入。按元素列表，最后给出材料的总天数。
//!
//! ## 依赖关系
//! - 使用 `cli/dops.rs` 定义的参数
//! - 使用 `dops_set/`, `models/structure.rs` 的 `run_time`

use super::load_sets;
use crate::cli::dops::TimeArgs;
use crate::config::Config;
use crate::dops_set::{DopsSet, SetMode};
use crate::error::Result;
use crate::utils::output;

use tabled::{Table, Tabled};

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_DAY: f64 = 24.0 * SECONDS_PER_HOUR;

/// 一个集合的耗时
#[derive(Debug, Clone, PartialEq)]
pub struct SetTime {
    pub dop_elem: String,
    pub n_structs: usize,
    /// 墙钟时间之和 (s)
    pub seconds: f64,
    /// 找不到计时表的结构 `base/site`
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Tabled)]
struct TimeRow {
    #[tabled(rename = "Element")]
    elem: String,
    #[tabled(rename = "Structures")]
    n_structs: usize,
    #[tabled(rename = "Without time")]
    missing: usize,
    #[tabled(rename = "Hours")]
    hours: String,
}

impl From<&SetTime> for TimeRow {
    fn from(t: &SetTime) -> Self {
        TimeRow {
            elem: t.dop_elem.clone(),
            n_structs: t.n_structs,
            missing: t.missing.len(),
            hours: format!("{:.1}", t.seconds / SECONDS_PER_HOUR),
        }
    }
}

/// 累加集合中每个结构的优化耗时
pub fn set_time(set: &DopsSet) -> Result<SetTime> {
    let cfg = set.config();
    let mut time = SetTime {
        dop_elem: set.dop_elem.clone(),
        n_structs: set.len(),
        seconds: 0.0,
        missing: Vec::new(),
    };

    for s in &set.structs {
        match s.run_time(cfg)? {
            Some(seconds) => time.seconds += seconds,
            None => time.missing.push(format!(
                "{}/{}",
                s.meta.base.as_deref().unwrap_or_default(),
                s.name()
            )),
        }
    }
    Ok(time)
}

/// 总天数，保留一位小数
pub fn total_days(times: &[SetTime]) -> f64 {
    let seconds: f64 = times.iter().map(|t| t.seconds).sum();
    (seconds / SECONDS_PER_DAY * 10.0).round() / 10.0
}

/// 执行 time 命令
pub fn execute(args: TimeArgs, cfg: &Config) -> Result<()> {
    output::print_header(&format!("Optimization time of {}", args.set.material));
    let sets = load_sets(cfg, &args.set, SetMode::Look)?;

    let mut times = Vec::with_capacity(sets.len());
    for set in &sets {
        let time = set_time(set)?;
        for name in &time.missing {
            output::print_warning(&format!("{}-{} {}: time not found", set.material(), set.dop_elem, name));
        }
        times.push(time);
    }

    let rows: Vec<TimeRow> = times.iter().map(TimeRow::from).collect();
    println!("{}", Table::new(&rows));

    output::print_done(&format!("{} total time: {} days", args.set.material, total_days(&times)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dops_set::tests::{info, setup};
    use std::fs;

    #[test]
    fn test_set_time() {
        let (_root, cfg) = setup();
        let set = DopsSet::new(&cfg, "B", &info(), SetMode::Look, None, false).unwrap();
        assert_eq!(set.len(), 2);

        let dir = set.structs[0].dir.clone().unwrap();
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("output"),
            "Total                =     9.00 (100.0%)     7200.00 (100.0%)\n",
        )
        .unwrap();

        let time = set_time(&set).unwrap();
        assert_eq!(time.n_structs, 2);
        assert!((time.seconds - 7200.0).abs() < 1e-9);
        assert_eq!(time.missing.len(), 1);
        assert!(time.missing[0].starts_with("G1/"));

        let row = TimeRow::from(&time);
        assert_eq!(row.hours, "2.0");
    }

    #[test]
    fn test_total_days() {
        let day = |seconds: f64| SetTime {
            dop_elem: "B".to_string(),
            n_structs: 1,
            seconds,
            missing: Vec::new(),
        };
        assert_eq!(total_days(&[day(86400.0), day(43200.0)]), 1.5);
        assert_eq!(total_days(&[]), 0.0);
    }
}
