//! # 数据导出
//!
//! 把按列组织的结果表写为 CSV，把可序列化的数据写为 JSON。
//! 输出文件的父目录会自动创建。
//!
//! ## 依赖关系
//! - 被 `dops_set/`, `graphine/viz.rs`, `commands/` 使用
//! - 使用 `csv` 写 CSV, `serde_json` 写 JSON

use crate::error::{DopingsError, Result};
use crate::models::structure::ensure_parent;

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// 有表头的字符串表格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        Table {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// 追加一行，列数必须与表头一致
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(DopingsError::InvalidValue(format!(
                "row has {} columns, table has {}",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 写出为 CSV
    pub fn write_csv(&self, output_path: &Path) -> Result<()> {
        ensure_parent(output_path)?;
        let mut wtr = csv::Writer::from_path(output_path)?;

        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }

        wtr.flush().map_err(|e| DopingsError::write(output_path, e))?;
        log::debug!("wrote {} rows to {}", self.rows.len(), output_path.display());
        Ok(())
    }
}

/// 写出为格式化的 JSON
pub fn write_json<T: Serialize + ?Sized>(value: &T, output_path: &Path) -> Result<()> {
    ensure_parent(output_path)?;
    let file = File::create(output_path).map_err(|e| DopingsError::write(output_path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// 按列写出序列化记录的 CSV
pub fn write_records<T: Serialize>(records: &[T], output_path: &Path) -> Result<()> {
    ensure_parent(output_path)?;
    let mut wtr = csv::Writer::from_path(output_path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush().map_err(|e| DopingsError::write(output_path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_table_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("homo_lumo/homo_lumo-B.csv");

        let mut table = Table::new(&["material", "Base", "homo"]);
        table
            .push_row(vec!["graphene".into(), "G1".into(), "-5.1".into()])
            .unwrap();
        assert!(table.push_row(vec!["x".into()]).is_err());
        table.write_csv(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "material,Base,homo\ngraphene,G1,-5.1\n");
    }

    #[test]
    fn test_write_json_and_records() {
        #[derive(Serialize)]
        struct Row {
            name: String,
            energy: Option<f64>,
        }

        let dir = tempdir().unwrap();
        let rows = vec![
            Row { name: "A1".into(), energy: Some(-1.5) },
            Row { name: "B1".into(), energy: None },
        ];

        let json_path = dir.path().join("out/rows.json");
        write_json(&rows, &json_path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value[0]["energy"], -1.5);
        assert!(value[1]["energy"].is_null());

        let csv_path = dir.path().join("rows.csv");
        write_records(&rows, &csv_path).unwrap();
        let text = fs::read_to_string(&csv_path).unwrap();
        assert_eq!(text, "name,energy\nA1,-1.5\nB1,\n");
    }
}
