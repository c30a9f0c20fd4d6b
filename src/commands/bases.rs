//! # bases 命令实现
//!
//! 未掺杂基底的输出：HOMO/LUMO 与形成能 CSV、最后一帧、
//! 键长直方图与电荷分布图。
//!
//! 路径与掺杂集合相同，掺杂元素的位置换成 `BASES`：
//! - `<processing_output>/<material>/<method>/<method>-BASES.csv`
//! - `<processing_output>/<material>/<method>/BASES/<base>.<suffix>`
//!
//! ## 依赖关系
//! - 使用 `cli/dops.rs` 定义的参数
//! - 使用 `models/`, `viz/struct_viz.rs`, `export.rs`

use super::warn_missing;
use crate::cli::dops::BasesArgs;
use crate::config::Config;
use crate::dops_set::CsvMethod;
use crate::error::Result;
use crate::export::Table;
use crate::models::{Structure, StructureMeta};
use crate::utils::output;
use crate::viz::struct_viz::{charges_map, histogram};

use std::path::{Path, PathBuf};

const BASES_TAG: &str = "BASES";

/// 基底输出路径，`base` 为 `None` 时为整个材料的 CSV
pub fn bases_dir_out(processing_output: &Path, material: &str, method: &str, base: Option<(&str, &str)>) -> PathBuf {
    let method_dir = processing_output.join(material).join(method);
    match base {
        Some((base, suffix)) => method_dir.join(BASES_TAG).join(format!("{}.{}", base, suffix)),
        None => method_dir.join(format!("{}-{}.csv", method, BASES_TAG)),
    }
}

/// 读取材料的全部基底
fn read_bases(cfg: &Config, material: &str, param: &str) -> Result<Vec<Structure>> {
    let info = cfg.dops_info(material)?;
    info.bases
        .iter()
        .map(|base| {
            let meta = StructureMeta {
                material: Some(material.to_string()),
                base: Some(base.clone()),
                param: Some(param.to_string()),
                ..Default::default()
            };
            Structure::from_dir(cfg.dirs.bases.join(material).join(base), meta, cfg)
        })
        .collect()
}

/// 基底的方法表：`material, Base` 加方法的列
fn method_table(bases: &[Structure], method: CsvMethod, cfg: &Config) -> Result<Table> {
    let mut headers = vec!["material", "Base"];
    headers.extend_from_slice(method.columns());
    let mut table = Table::new(&headers);

    for s in bases {
        let mut row: Vec<String> = [&s.meta.material, &s.meta.base]
            .iter()
            .map(|v| v.as_deref().unwrap_or_default().to_string())
            .collect();
        row.extend(method.row(s, cfg)?);
        table.push_row(row)?;
    }
    Ok(table)
}

/// 执行 bases 命令
pub fn execute(args: BasesArgs, cfg: &Config) -> Result<()> {
    output::print_header(&format!("Processing {} Bases", args.material));
    let bases = read_bases(cfg, &args.material, &args.param)?;
    let po = &cfg.dirs.processing_output;
    let ext = args.format.extension();

    for method in CsvMethod::ALL {
        if let Some(table) = warn_missing(method.name(), method_table(&bases, method, cfg))? {
            let path = bases_dir_out(po, &args.material, method.name(), None);
            table.write_csv(&path)?;
            output::print_path(&path);
        }
    }

    for s in &bases {
        let base = s.meta.base.as_deref().unwrap_or_default();
        let out = |method: &str, suffix: &str| bases_dir_out(po, &args.material, method, Some((base, suffix)));

        warn_missing(&format!("{} frame", base), s.frame(&out("frame", "xyz")))?;
        warn_missing(
            &format!("{} histogram", base),
            histogram(s, &out("histogram", ext), args.dat, cfg),
        )?;
        warn_missing(
            &format!("{} charges map", base),
            charges_map(s, &out("charges_map", ext), cfg),
        )?;
    }

    output::print_done(&format!("Processed {} bases", bases.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bases_dir_out() {
        let po = Path::new("/po");
        assert_eq!(
            bases_dir_out(po, "graphene", "homo_lumo", None),
            PathBuf::from("/po/graphene/homo_lumo/homo_lumo-BASES.csv")
        );
        assert_eq!(
            bases_dir_out(po, "graphene", "histogram", Some(("G1", "svg"))),
            PathBuf::from("/po/graphene/histogram/BASES/G1.svg")
        );
    }

    #[test]
    fn test_method_table() {
        let mut s = Structure::new(vec![crate::models::AtomData::new("C", [0.0; 3])]);
        s.meta.material = Some("graphene".to_string());
        s.meta.base = Some("G1".to_string());
        s.homo = Some(-5.0);
        s.lumo = Some(-3.25);

        let cfg = crate::dops_set::tests::config(Path::new("/tmp"));
        let table = method_table(&[s], CsvMethod::HomoLumo, &cfg).unwrap();
        assert_eq!(table.headers, vec!["material", "Base", "homo", "lumo", "homo_lumo"]);
        assert_eq!(table.rows[0], vec!["graphene", "G1", "-5", "-3.25", "1.75"]);
    }
}
