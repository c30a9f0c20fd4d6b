//! # 调用优化程序
//!
//! 在结构目录中启动配置的 DFTB+ 可执行文件，标准输出与标准错误写入
//! 日志文件，轮询日志直到进程结束。SCC 难以收敛时提前结束进程。
//!
//! ## 依赖关系
//! - 被 `dops_set/mod.rs` 的 `map_opt` 使用
//! - 使用 `dops_set/files.rs` 续算, `utils/progress.rs` 显示等待状态

use crate::config::Config;
use crate::error::{DopingsError, Result};
use crate::models::Structure;
use crate::utils::{output, progress};

use std::fs::File;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// 默认轮询间隔
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// 优化选项
#[derive(Debug, Clone)]
pub struct OptOptions {
    /// 已收敛也重新优化
    pub overwrite: bool,
    /// 报告中列出 SCC 未收敛的步
    pub verbose: bool,
    /// SCC 难以收敛时结束优化
    pub skip_hard_to_conv_scc: bool,
    /// 从中断处续算，否则从头开始
    pub resume_unfinished: bool,
    pub poll_interval: Duration,
}

impl Default for OptOptions {
    fn default() -> Self {
        OptOptions {
            overwrite: false,
            verbose: true,
            skip_hard_to_conv_scc: true,
            resume_unfinished: false,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl Structure {
    /// 在结构目录中运行优化并等待结束
    pub fn opt(&self, cfg: &Config, options: &OptOptions) -> Result<()> {
        let dir = self.require_dir()?;
        let report = self.report(cfg)?;
        let converged = report.is_converged();

        if options.resume_unfinished && !options.overwrite && !converged && report.steps_written.len() > 1 {
            output::print_info(&format!("Redoing files of {} to resume", dir.display()));
            self.redo_files_for_resume(cfg)?;
        }

        if !converged || options.overwrite {
            let bin = cfg.dirs.bin_dir.get(&cfg.main.machine).ok_or_else(|| {
                DopingsError::MissingKey(format!("bin_dir for machine '{}'", cfg.main.machine))
            })?;
            let command = bin.display().to_string();

            let log_path = dir.join(cfg.output_name());
            let log = File::create(&log_path).map_err(|e| DopingsError::write(&log_path, e))?;
            let err_log = log.try_clone().map_err(|e| DopingsError::write(&log_path, e))?;

            let mut child = Command::new(bin)
                .current_dir(dir)
                .stdin(Stdio::null())
                .stdout(Stdio::from(log))
                .stderr(Stdio::from(err_log))
                .spawn()
                .map_err(|source| DopingsError::CommandNotFound {
                    command: command.clone(),
                    source,
                })?;
            log::info!("started {} (pid {}) in {}", command, child.id(), dir.display());

            let spinner = progress::create_spinner(&format!("Optimizing {}", dir.display()));
            let mut killed = false;

            loop {
                if options.skip_hard_to_conv_scc && !killed && self.report(cfg)?.is_hard_to_converge() {
                    spinner.suspend(|| {
                        output::print_warning(&format!(
                            "Too many not converged SCC's, stopping {}",
                            dir.display()
                        ))
                    });
                    // 进程可能刚好结束
                    if let Err(e) = child.kill() {
                        log::debug!("kill {}: {}", child.id(), e);
                    }
                    killed = true;
                }

                match child.try_wait() {
                    Ok(Some(status)) => {
                        log::debug!("{} exited with {}", command, status);
                        break;
                    }
                    Ok(None) => thread::sleep(options.poll_interval),
                    Err(e) => {
                        spinner.finish_and_clear();
                        return Err(DopingsError::CommandFailed {
                            command,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            spinner.finish_and_clear();
        } else {
            log::info!("{} already converged", dir.display());
        }

        self.report(cfg)?.print(options.verbose);
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::dops_set::tests::config;
    use crate::models::AtomData;
    use std::fs;
    use tempfile::tempdir;

    fn options() -> OptOptions {
        OptOptions {
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    fn structure(dir: &std::path::Path) -> Structure {
        Structure::new(vec![AtomData::new("C", [0.0; 3])]).with_dir(dir)
    }

    #[test]
    fn test_converged_is_not_rerun() {
        let root = tempdir().unwrap();
        let mut cfg = config(root.path());
        cfg.main.machine = "local".to_string();
        cfg.dirs.bin_dir.insert("local".to_string(), root.path().join("no-such-binary"));

        let dir = root.path().join("A1");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("output"), "Geometry step: 0\nGeometry converged\n").unwrap();

        let s = structure(&dir);
        s.opt(&cfg, &options()).unwrap();

        let overwrite = OptOptions {
            overwrite: true,
            ..options()
        };
        assert!(matches!(
            s.opt(&cfg, &overwrite),
            Err(DopingsError::CommandNotFound { .. })
        ));
    }

    #[test]
    fn test_runs_binary_in_directory() {
        let root = tempdir().unwrap();
        let mut cfg = config(root.path());
        cfg.main.machine = "local".to_string();
        cfg.dirs.bin_dir.insert("local".to_string(), "/bin/sh".into());

        let dir = root.path().join("A1");
        fs::create_dir_all(&dir).unwrap();

        let s = structure(&dir);
        s.opt(&cfg, &options()).unwrap();

        let report = s.report(&cfg).unwrap();
        assert!(report.exists);
        assert!(!report.is_converged());
    }

    #[test]
    fn test_hard_to_converge_scc_is_stopped() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Instant;

        let root = tempdir().unwrap();
        let script = root.path().join("dftb+");
        fs::write(
            &script,
            "#!/bin/sh\n\
             i=0\n\
             while [ $i -lt 31 ]; do\n\
             echo \"Geometry step: $i\"\n\
             echo \">> SCC is NOT converged, maximal SCC iterations exceeded\"\n\
             i=$((i+1))\n\
             done\n\
             exec sleep 60\n",
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut cfg = config(root.path());
        cfg.main.machine = "local".to_string();
        cfg.dirs.bin_dir.insert("local".to_string(), script);

        let dir = root.path().join("A1");
        fs::create_dir_all(&dir).unwrap();
        let s = structure(&dir);

        let start = Instant::now();
        s.opt(&cfg, &options()).unwrap();
        assert!(start.elapsed() < Duration::from_secs(30));

        let report = s.report(&cfg).unwrap();
        assert!(report.is_hard_to_converge());
        assert!(!report.is_converged());
    }

    #[test]
    fn test_missing_machine() {
        let root = tempdir().unwrap();
        let cfg = config(root.path());
        let dir = root.path().join("A1");
        fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            structure(&dir).opt(&cfg, &options()),
            Err(DopingsError::MissingKey(_))
        ));
    }
}
