//! # dopings - 掺杂石墨烯/石墨炔结构分析工具
//!
//! 为 DFTB+ 准备掺杂结构的优化输入，逐个运行优化，
//! 再读取结果生成报告、表格与图表。
//!
//! ## 子命令
//! - `report`   - 优化状态
//! - `generate` - 写出优化输入文件
//! - `opt`      - 运行优化
//! - `structs`  - 单结构输出 (帧、直方图、电荷分布图、JSON、CSV)
//! - `sets`     - 集合图表 (能隙、形成能、石墨炔几何)
//! - `bases`    - 未掺杂基底的表格与图
//! - `time`     - 优化耗时
//! - `h2`       - 生成 H2 覆盖结构
//! - `scan`     - 汇总目录树中的优化
//! - `inspect`  - 查看单个优化目录
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── dops_set/  (掺杂集合)
//!   │     ├── viz/       (图表)
//!   │     ├── graphine/  (石墨炔几何)
//!   │     ├── h2_gen/    (H2 摆放)
//!   │     ├── batch/     (并行执行)
//!   │     └── export.rs  (CSV / JSON)
//!   ├── models/     (数据模型)
//!   ├── parsers/    (DFTB+ 文件读写)
//!   ├── config.rs   (JSON 配置)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod config;
mod dops_set;
mod error;
mod export;
mod graphine;
mod h2_gen;
mod models;
mod parsers;
mod utils;
mod viz;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    if let Err(e) = commands::run(cli) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
