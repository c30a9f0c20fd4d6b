//! # H2 覆盖结构生成
//!
//! 在石墨炔薄片或周期性晶胞上摆放 H2 分子，写出 XYZ 结构：
//! 1. 结构平移到原点 (薄片取碳原子几何中心，周期性结构取晶胞原点)
//! 2. 在 xy 平面上分布 H2 中心 (`grid.rs`)
//! 3. 拟合原子坐标的曲面 (`surface.rs`)，中心沿曲面抬高 2.7 Å
//! 4. 以中心为中点放两个相距 0.7 Å 的 H 原子
//!
//! ## 依赖关系
//! - 被 `commands/h2.rs` 使用
//! - 使用 `models/`, `parsers/gen_cell.rs`
//! - 子模块: grid, surface

pub mod grid;
pub mod surface;

use crate::error::{DopingsError, Result};
use crate::models::structure::round_to;
use crate::models::{AtomData, Structure};
use crate::parsers::gen_cell::Cell;

use nalgebra::{Vector2, Vector3};
use rand::Rng;
use std::f64::consts::TAU;
use std::fmt;
use surface::Surface;

/// H2 中心到结构曲面的距离 (Å)
pub const PLANE_DISTANCE: f64 = 2.7;
/// H-H 键长 (Å)
pub const H2_BOND_LENGTH: f64 = 0.7;
/// 薄片曲面的拟合次数
pub const FLAKE_DEGREE: usize = 3;
/// 周期性结构用平面拟合
pub const PERIODIC_DEGREE: usize = 1;

/// H2 分子轴的朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H2Orientation {
    /// 垂直于结构，中心再抬高半个键长
    Vertical,
    /// 平行于结构，沿 x 轴
    Horizontal,
    /// 平行于结构，面内随机转角
    Random,
}

impl fmt::Display for H2Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            H2Orientation::Vertical => write!(f, "vertical"),
            H2Orientation::Horizontal => write!(f, "horizontal"),
            H2Orientation::Random => write!(f, "random"),
        }
    }
}

/// 结构的哪一侧 (z 正方向为上)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
}

/// 把平面上的 H2 中心放到曲面上方或下方，返回 H 原子
pub fn place_h2(
    centers: &[Vector2<f64>],
    surface: &Surface,
    side: Side,
    orientation: H2Orientation,
    rng: &mut impl Rng,
) -> Vec<AtomData> {
    let half = H2_BOND_LENGTH / 2.0;
    let distance = match orientation {
        H2Orientation::Vertical => PLANE_DISTANCE + half,
        _ => PLANE_DISTANCE,
    };

    let mut atoms = Vec::with_capacity(2 * centers.len());
    for c in centers {
        let height = match side {
            Side::Above => surface.z(c.x, c.y) + distance,
            Side::Below => surface.z(c.x, c.y) - distance,
        };
        let center = Vector3::new(c.x, c.y, height);

        let axis = match orientation {
            H2Orientation::Vertical => Vector3::z() * half,
            H2Orientation::Horizontal => Vector3::x() * half,
            H2Orientation::Random => {
                let alpha: f64 = rng.gen_range(0.0..TAU);
                Vector3::new(alpha.cos(), alpha.sin(), 0.0) * half
            }
        };

        for p in [center + axis, center - axis] {
            atoms.push(AtomData::new("H", [round_to(p.x, 8), round_to(p.y, 8), round_to(p.z, 8)]));
        }
    }
    atoms
}

/// 去掉电荷，平移 `shift` 后的结构副本
fn shifted(s: &Structure, shift: Vector3<f64>) -> Structure {
    let mut moved = s.copy();
    for atom in &mut moved.atoms {
        let p = Vector3::from(atom.coord) - shift;
        atom.coord = [p.x, p.y, p.z];
        atom.charge = None;
    }
    moved
}

/// 碳原子几何中心移到原点的结构副本
pub fn carbon_centered(s: &Structure) -> Result<Structure> {
    let carbons: Vec<Vector3<f64>> = s
        .atoms
        .iter()
        .filter(|a| a.elem == "C")
        .map(|a| Vector3::from(a.coord))
        .collect();
    if carbons.is_empty() {
        return Err(DopingsError::MissingData(format!("{} has no carbon atoms", s.name())));
    }

    let center = carbons.iter().sum::<Vector3<f64>>() / carbons.len() as f64;
    Ok(shifted(s, center.map(|x| round_to(x, 8))))
}

fn atom_points(s: &Structure) -> Vec<Vector3<f64>> {
    s.atoms.iter().map(|a| Vector3::from(a.coord)).collect()
}

/// 薄片覆盖 H2：每一侧 `count` 个
pub fn h2_flake(
    s: &Structure,
    count: usize,
    orientation: H2Orientation,
    both_sides: bool,
    rng: &mut impl Rng,
) -> Result<Structure> {
    let mut flake = carbon_centered(s)?;
    let surface = Surface::fit(&atom_points(&flake), FLAKE_DEGREE)?;

    let mut hydrogens = Vec::new();
    let mut sides = vec![Side::Above];
    if both_sides {
        sides.push(Side::Below);
    }
    for side in sides {
        let centers = grid::flake_centers(&flake, count, None, rng);
        hydrogens.extend(place_h2(&centers, &surface, side, orientation, rng));
    }

    flake.atoms.extend(hydrogens);
    Ok(flake)
}

/// 周期性结构覆盖 H2：共 `count` 个，两侧时下方多分余数
pub fn h2_periodic(
    s: &Structure,
    cell: &Cell,
    count: usize,
    orientation: H2Orientation,
    both_sides: bool,
    rng: &mut impl Rng,
) -> Result<Structure> {
    let mut periodic = shifted(s, cell.origin);
    let surface = Surface::fit(&atom_points(&periodic), PERIODIC_DEGREE)?;

    let counts = if both_sides {
        vec![(Side::Above, count / 2), (Side::Below, count / 2 + count % 2)]
    } else {
        vec![(Side::Above, count)]
    };

    let mut hydrogens = Vec::new();
    for (side, n) in counts {
        let centers = grid::periodic_centers(cell, n, rng);
        hydrogens.extend(place_h2(&centers, &surface, side, orientation, rng));
    }

    periodic.atoms.extend(hydrogens);
    Ok(periodic)
}

/// 按面密度 (个/Å²) 估计晶胞能容纳的 H2 数量，向上取整
pub fn periodic_capacity(cell: &Cell, density: f64) -> usize {
    (density * cell.area()).ceil().max(0.0) as usize
}

/// 输出文件名 `<name>-<count:03>.xyz`
pub fn output_name(name: &str, count: usize) -> String {
    format!("{}-{:03}.xyz", name, count)
}
