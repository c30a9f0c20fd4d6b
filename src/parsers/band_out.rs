//! # band.out 解析器
//!
//! 每行依次为能级序号、能量 (eV)、占据数。首行为 K 点/自旋头。
//! HOMO 由体系价电子总数确定：第 `ceil(V / 2)` 个能级 (从 1 开始)，
//! LUMO 为下一个能级。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 的 `read_bands` 使用
//! - 使用 `config.rs` 的 AtomsData 查询价电子数

use crate::config::AtomsData;
use crate::error::{DopingsError, Result};
use crate::models::AtomData;

/// 单个能级
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub index: usize,
    pub energy: f64,
    pub occupation: f64,
}

/// 解析能级列表，跳过不是数据行的行
pub fn parse_bands(content: &str) -> Vec<Band> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 3 {
                return None;
            }
            Some(Band {
                index: parts[0].parse().ok()?,
                energy: parts[1].parse().ok()?,
                occupation: parts[2].parse().ok()?,
            })
        })
        .collect()
}

/// 价电子总数
pub fn valence_electrons(atoms: &[AtomData], atoms_data: &AtomsData) -> Result<u32> {
    atoms
        .iter()
        .map(|atom| atoms_data.valency_of(&atom.elem))
        .sum()
}

/// 最高占据能级的序号 (从 1 开始)
pub fn homo_band_index(val_electrons: u32) -> usize {
    val_electrons.div_ceil(2) as usize
}

/// 根据价电子数取 HOMO 与 LUMO 能量
pub fn homo_lumo_from_bands(bands: &[Band], val_electrons: u32) -> Result<(f64, f64)> {
    let homo_band = homo_band_index(val_electrons);
    let lumo_band = homo_band + 1;

    if homo_band == 0 || lumo_band > bands.len() {
        return Err(DopingsError::MissingData(format!(
            "band.out has {} levels, HOMO/LUMO need levels {} and {}",
            bands.len(),
            homo_band,
            lumo_band
        )));
    }

    Ok((bands[homo_band - 1].energy, bands[lumo_band - 1].energy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const BANDS: &str = " KPT            1  SPIN            1  KWEIGHT    1.0000000000000000\n\
      1   -20.123  2.00000\n\
      2   -15.500  2.00000\n\
      3    -9.750  2.00000\n\
      4    -5.250  1.00000\n\
      5    -2.125  0.00000\n\
      6    -1.000  0.00000\n\
\n";

    #[test]
    fn test_parse_bands() {
        let bands = parse_bands(BANDS);
        assert_eq!(bands.len(), 6);
        assert_eq!(bands[0].index, 1);
        assert!((bands[4].energy + 2.125).abs() < 1e-12);
        assert!((bands[3].occupation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_homo_band_index() {
        assert_eq!(homo_band_index(8), 4);
        assert_eq!(homo_band_index(7), 4);
        assert_eq!(homo_band_index(1), 1);
    }

    #[test]
    fn test_homo_lumo_from_bands() {
        let bands = parse_bands(BANDS);
        let (homo, lumo) = homo_lumo_from_bands(&bands, 7).unwrap();
        assert!((homo + 5.25).abs() < 1e-12);
        assert!((lumo + 2.125).abs() < 1e-12);

        assert!(homo_lumo_from_bands(&bands, 12).is_err());
        assert!(homo_lumo_from_bands(&bands, 0).is_err());
    }

    #[test]
    fn test_valence_electrons() {
        let mut valency = BTreeMap::new();
        valency.insert("C".to_string(), 4);
        valency.insert("H".to_string(), 1);
        let atoms_data = AtomsData {
            valency,
            ..Default::default()
        };

        let atoms = vec![
            AtomData::new("C", [0.0; 3]),
            AtomData::new("H", [1.0, 0.0, 0.0]),
            AtomData::new("H", [0.0, 1.0, 0.0]),
        ];
        assert_eq!(valence_electrons(&atoms, &atoms_data).unwrap(), 6);

        let atoms = vec![AtomData::new("Zn", [0.0; 3])];
        assert!(matches!(
            valence_electrons(&atoms, &atoms_data),
            Err(DopingsError::MissingKey(_))
        ));
    }
}
