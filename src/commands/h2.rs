//! # h2 命令实现
//!
//! 读取优化目录的最后一帧 (周期性结构另读晶胞)，对 0 到最大数量的
//! 每个 H2 数写出一个覆盖后的 XYZ 文件。
//!
//! 周期性结构未给出 `--count` 时按面密度估计最大数量，两侧覆盖时加倍。
//!
//! ## 依赖关系
//! - 使用 `cli/h2.rs` 定义的参数
//! - 使用 `h2_gen/`, `parsers/`, `utils/`

use crate::cli::h2::{H2Args, H2Layout};
use crate::config::Config;
use crate::error::{DopingsError, Result};
use crate::h2_gen::{self, H2Orientation};
use crate::models::Structure;
use crate::parsers::{self, GEO_END_FILE, GEO_END_GEN_FILE};
use crate::utils::{output, progress};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// 最大 H2 数量
fn max_count(args: &H2Args, cell: Option<&parsers::gen_cell::Cell>) -> Result<usize> {
    match (args.count, cell) {
        (Some(count), _) => Ok(count),
        (None, Some(cell)) => {
            let capacity = h2_gen::periodic_capacity(cell, args.density);
            Ok(if args.both_sides { 2 * capacity } else { capacity })
        }
        (None, None) => Err(DopingsError::InvalidArgument(
            "--count is required for flakes".to_string(),
        )),
    }
}

/// 执行 h2 命令，返回写出的文件
pub fn execute(args: H2Args, cfg: &Config) -> Result<Vec<PathBuf>> {
    output::print_header(&format!("H2 on {} {}", args.layout, args.dir.display()));

    let atoms = parsers::read_frame(&args.dir)?.ok_or_else(|| DopingsError::FileNotFound {
        path: args.dir.join(GEO_END_FILE).display().to_string(),
    })?;
    let s = Structure::new(atoms).with_dir(&args.dir);
    let name = s.name();

    let cell = match args.layout {
        H2Layout::Periodic => Some(parsers::read_cell(&args.dir)?.ok_or_else(|| DopingsError::FileNotFound {
            path: args.dir.join(GEO_END_GEN_FILE).display().to_string(),
        })?),
        H2Layout::Flake => None,
    };

    let max = max_count(&args, cell.as_ref())?;
    let counts: Vec<usize> = if args.only { vec![max] } else { (0..=max).collect() };

    let out_dir = args.output.clone().unwrap_or_else(|| {
        cfg.dirs
            .h2_gen_root()
            .join(args.layout.to_string())
            .join(args.variant())
    });
    let orientation = H2Orientation::from(args.orientation);
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    log::info!("{} structure(s) of {} with up to {} H2", counts.len(), name, max);

    let pb = progress::create_progress_bar(counts.len() as u64, &format!("{} {}", name, args.variant()));
    let mut written = Vec::with_capacity(counts.len());
    for count in counts {
        let covered = match &cell {
            Some(cell) => h2_gen::h2_periodic(&s, cell, count, orientation, args.both_sides, &mut rng)?,
            None => h2_gen::h2_flake(&s, count, orientation, args.both_sides, &mut rng)?,
        };
        let path = out_dir.join(h2_gen::output_name(&name, count));
        covered.frame(&path)?;
        written.push(path);
        pb.inc(1);
    }
    pb.finish_and_clear();

    output::print_done(&format!("Wrote {} structure(s) to {}", written.len(), out_dir.display()));
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::h2::OrientationArg;
    use crate::dops_set::tests::config;
    use std::fs;
    use tempfile::tempdir;

    /// 两圈碳原子 (内圈转 30°) 加两个氢
    fn flake_xyz() -> String {
        let mut lines = vec!["14".to_string(), "flake".to_string()];
        for (radius, phase) in [(5.0, 0.0), (2.5, std::f64::consts::FRAC_PI_6)] {
            for i in 0..6 {
                let a = i as f64 * std::f64::consts::FRAC_PI_3 + phase;
                lines.push(format!("C {} {} {} 4.0", radius * a.cos(), radius * a.sin(), 0.05 * i as f64));
            }
        }
        lines.push("H 6.0 0.0 0.0 1.0".to_string());
        lines.push("H -6.0 0.0 0.0 1.0".to_string());
        lines.join("\n") + "\n"
    }

    fn args(layout: H2Layout, dir: PathBuf) -> H2Args {
        H2Args {
            layout,
            dir,
            count: None,
            density: 0.16,
            only: false,
            both_sides: false,
            orientation: OrientationArg::Vertical,
            seed: Some(2),
            output: None,
        }
    }

    #[test]
    fn test_flake_series() {
        let root = tempdir().unwrap();
        let cfg = config(root.path());
        let dir = root.path().join("g1");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("geo_end.xyz"), flake_xyz()).unwrap();

        assert!(matches!(
            execute(args(H2Layout::Flake, dir.clone()), &cfg),
            Err(DopingsError::InvalidArgument(_))
        ));

        let mut flake = args(H2Layout::Flake, dir.clone());
        flake.count = Some(3);
        let written = execute(flake, &cfg).unwrap();

        assert_eq!(written.len(), 4);
        assert_eq!(written[3], root.path().join("out/h2_gen/flake/vertical-mono/g1-003.xyz"));
        let text = fs::read_to_string(&written[3]).unwrap();
        assert_eq!(text.lines().next(), Some("20"));
        assert_eq!(text.lines().nth(2).map(|l| l.split_whitespace().count()), Some(4));
    }

    #[test]
    fn test_periodic_from_density() {
        let root = tempdir().unwrap();
        let cfg = config(root.path());
        let dir = root.path().join("g1_s2");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("geo_end.xyz"),
            "4\ncell\nC 0.0 0.0 0.0\nC 2.0 0.0 0.0\nC 0.0 2.0 0.0\nC 2.0 2.0 0.0\n",
        )
        .unwrap();

        let mut periodic = args(H2Layout::Periodic, dir.clone());
        assert!(matches!(execute(periodic, &cfg), Err(DopingsError::FileNotFound { .. })));

        fs::write(
            dir.join("geo_end.gen"),
            "4 S\nC\n1 1 0 0 0\n2 1 2 0 0\n3 1 0 2 0\n4 1 2 2 0\n0 0 0\n5 0 0\n0 5 0\n0 0 40\n",
        )
        .unwrap();
        periodic = args(H2Layout::Periodic, dir.clone());
        periodic.both_sides = true;
        periodic.only = true;
        periodic.output = Some(root.path().join("h2"));

        // 面积 25 Å², 0.16/Å² -> 4 个每侧，两侧 8 个
        let written = execute(periodic, &cfg).unwrap();
        assert_eq!(written, vec![root.path().join("h2/g1_s2-008.xyz")]);
        let text = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(text.lines().next(), Some("20"));
    }
}
