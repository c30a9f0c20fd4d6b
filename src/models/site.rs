//! # 掺杂位点标签
//!
//! 位点名由一个大写字母和一个序号组成，如 `A1`、`B12`、`D3`。
//! 排序规则为先字母后数值序号，因此在石墨炔的一条臂上，
//! 排序结果正好是链上原子的顺序：`A1, B1..B2N, C1..C6, D1..D2N+1`。
//!
//! ## 依赖关系
//! - 被 `config.rs`, `graphine/calcs.rs` 使用
//! - 无外部模块依赖

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 位点标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteLabel {
    kind: char,
    index: u32,
}

impl SiteLabel {
    pub fn new(kind: char, index: u32) -> Self {
        SiteLabel { kind, index }
    }

    /// 位点类别字母
    pub fn kind(&self) -> char {
        self.kind
    }

    /// 位点序号
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for SiteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.index)
    }
}

impl FromStr for SiteLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut chars = s.chars();
        let kind = chars
            .next()
            .filter(|c| c.is_ascii_uppercase())
            .ok_or_else(|| format!("invalid site label '{}'", s))?;
        let index = chars
            .as_str()
            .parse::<u32>()
            .map_err(|_| format!("invalid site label '{}'", s))?;
        Ok(SiteLabel { kind, index })
    }
}

impl Serialize for SiteLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SiteLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_and_display() {
        let label: SiteLabel = "B12".parse().unwrap();
        assert_eq!(label.kind(), 'B');
        assert_eq!(label.index(), 12);
        assert_eq!(label.to_string(), "B12");

        assert!("b1".parse::<SiteLabel>().is_err());
        assert!("C".parse::<SiteLabel>().is_err());
        assert!("".parse::<SiteLabel>().is_err());
    }

    #[test]
    fn test_chain_order() {
        let mut labels: Vec<SiteLabel> = ["D1", "B10", "C2", "A1", "B2", "B1"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        labels.sort();

        let names: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
        assert_eq!(names, vec!["A1", "B1", "B2", "B10", "C2", "D1"]);
    }

    #[test]
    fn test_json_map_keys() {
        let map: BTreeMap<SiteLabel, usize> =
            serde_json::from_str(r#"{ "C2": 5, "A1": 1, "D1": 9 }"#).unwrap();
        let keys: Vec<String> = map.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["A1", "C2", "D1"]);
    }
}
