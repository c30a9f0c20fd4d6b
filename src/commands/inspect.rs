//! # inspect 命令实现
//!
//! 读取单个优化目录并显示结构的派生量：原子数、元素、
//! 总能量与形成能、HOMO/LUMO、偶极矩、优化状态，
//! 可选列出某个元素对的最短距离。
//!
//! ## 依赖关系
//! - 使用 `cli/inspect.rs` 定义的参数
//! - 使用 `models/`, `export.rs`, `utils/output.rs`

use crate::cli::inspect::InspectArgs;
use crate::config::Config;
use crate::error::{DopingsError, Result};
use crate::export;
use crate::models::{Structure, StructureMeta};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 属性表的一行
#[derive(Debug, Clone, Tabled)]
struct PropertyRow {
    #[tabled(rename = "Property")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl PropertyRow {
    fn new(name: &str, value: impl ToString) -> Self {
        PropertyRow {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// 结构的属性表，读不到的量显示为 `-`
fn property_rows(s: &Structure, cfg: &Config) -> Vec<PropertyRow> {
    let dash = || "-".to_string();
    let elements: Vec<&str> = s.elements().into_iter().collect();

    let mut rows = vec![
        PropertyRow::new("Atoms", s.size()),
        PropertyRow::new("Elements", elements.join(" ")),
        PropertyRow::new(
            "Total energy (eV)",
            s.total_energy.map_or_else(dash, |e| e.to_string()),
        ),
    ];

    match s.formation_energy(&cfg.atoms) {
        Ok((energy, per_atom)) => {
            rows.push(PropertyRow::new("Formation energy (eV)", energy));
            rows.push(PropertyRow::new("Formation energy (eV/atom)", per_atom));
        }
        Err(e) => log::info!("no formation energy: {}", e),
    }

    match s.homo_lumo() {
        Ok((homo, lumo, gap)) => {
            rows.push(PropertyRow::new("HOMO (eV)", homo));
            rows.push(PropertyRow::new("LUMO (eV)", lumo));
            rows.push(PropertyRow::new("Gap (eV)", gap));
        }
        Err(_) => rows.push(PropertyRow::new("Gap (eV)", dash())),
    }

    rows.push(PropertyRow::new(
        "Dipole (au)",
        s.dipole_norm().map_or_else(dash, |d| format!("{:.4}", d)),
    ));
    rows
}

/// 执行 inspect 命令
pub fn execute(args: InspectArgs, cfg: &Config) -> Result<()> {
    if !args.dir.is_dir() {
        return Err(DopingsError::DirectoryNotFound {
            path: args.dir.display().to_string(),
        });
    }
    output::print_header(&format!("Inspecting {}", args.dir.display()));

    let meta = StructureMeta {
        param: args.param.clone(),
        ..Default::default()
    };
    let s = Structure::from_dir(&args.dir, meta, cfg)?;

    s.report(cfg)?.print(true);
    println!("{}", Table::new(property_rows(&s, cfg)));

    if let Some(pair) = args.elem_pair() {
        let (e1, e2) = pair.map_err(DopingsError::InvalidArgument)?;
        let distances = s.shortest_distances(&e1, &e2, args.n);
        if distances.is_empty() {
            output::print_warning(&format!("No {}-{} pair in the structure", e1, e2));
        } else {
            let text: Vec<String> = distances.iter().map(|d| format!("{:.4}", d)).collect();
            output::print_info(&format!("Shortest {}-{} distances (Å): {}", e1, e2, text.join(", ")));
        }
    }

    if let Some(path) = &args.json {
        export::write_json(&s, path)?;
        output::print_success(&format!("Structure saved to '{}'", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AtomData;
    use std::path::Path;

    #[test]
    fn test_property_rows() {
        let cfg = crate::dops_set::tests::config(Path::new("/tmp"));
        let mut s = Structure::new(vec![
            AtomData::new("C", [0.0; 3]),
            AtomData::new("B", [1.5, 0.0, 0.0]),
        ]);
        s.homo = Some(-5.0);
        s.lumo = Some(-4.0);

        let rows = property_rows(&s, &cfg);
        let value = |name: &str| rows.iter().find(|r| r.name == name).map(|r| r.value.clone());
        assert_eq!(value("Atoms").as_deref(), Some("2"));
        assert_eq!(value("Elements").as_deref(), Some("B C"));
        assert_eq!(value("Total energy (eV)").as_deref(), Some("-"));
        assert_eq!(value("Gap (eV)").as_deref(), Some("1"));
        assert!(value("Formation energy (eV)").is_none());
    }
}
