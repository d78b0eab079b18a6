//! # Slurm 作业底座
//!
//! 为每个作业生成 `submit.sbatch`，用 `sbatch --parsable` 提交，
//! 之后按固定间隔轮询 `sacct` 直到作业终止。
//!
//! ## 依赖关系
//! - 被 `commands/launch.rs` 使用
//! - 使用 `utils/slurm.rs`, `utils/progress.rs`

use super::{command_line, job_directory, retrieve_outputs, stage_workdir, JobSubstrate};
use super::{RETRIEVED_SUBDIR, WORK_SUBDIR};
use crate::error::{write_error, RelaxError, Result};
use crate::models::{JobDescriptor, JobHandle, JobId, JobState, RemoteFolder};
use crate::utils::progress;
use crate::utils::slurm::{generate_sbatch_script, parse_sacct_state, parse_sbatch_output, SlurmConfig};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::thread;
use std::time::Duration;

/// 提交脚本文件名
pub const SBATCH_FILE: &str = "submit.sbatch";

/// Slurm 执行器
pub struct SlurmRunner {
    scratch_root: PathBuf,
    template: SlurmConfig,
    mpirun: String,
    poll_interval: Duration,
    next_id: u64,
    show_progress: bool,
    submitted: HashMap<JobId, (JobDescriptor, PathBuf)>,
}

impl SlurmRunner {
    /// `template` 提供分区、内存、时限与模块；作业名和核数按作业填写
    pub fn new(scratch_root: impl Into<PathBuf>, template: SlurmConfig) -> Self {
        SlurmRunner {
            scratch_root: scratch_root.into(),
            template,
            mpirun: "mpirun".to_string(),
            poll_interval: Duration::from_secs(30),
            next_id: 1,
            show_progress: true,
            submitted: HashMap::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_mpirun(mut self, mpirun: impl Into<String>) -> Self {
        self.mpirun = mpirun.into();
        self
    }

    /// 不显示等待 spinner
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// 作业对应的 sbatch 脚本
    pub fn render_script(&self, job: &JobDescriptor, workdir: &std::path::Path) -> String {
        let config = SlurmConfig {
            job_name: job.label.clone(),
            nodes: job.resources.num_machines,
            ntasks: job.resources.total_mpiprocs(),
            ..self.template.clone()
        };
        let exec_cmd = format!("{} > {}", command_line(job, &self.mpirun).join(" "), job.stdout_name);
        generate_sbatch_script(&config, workdir, &exec_cmd)
    }

    fn query_state(scheduler_id: &str) -> Result<Option<JobState>> {
        let out = Command::new("sacct")
            .args(["-j", scheduler_id, "-n", "-P", "-X", "-o", "State,ExitCode"])
            .output()
            .map_err(|_| RelaxError::CommandNotFound {
                command: "sacct".to_string(),
            })?;

        if !out.status.success() {
            return Err(RelaxError::CommandFailed {
                command: format!("sacct -j {}", scheduler_id),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            });
        }

        // 刚提交时 sacct 可能还没有记录
        Ok(String::from_utf8_lossy(&out.stdout)
            .lines()
            .find(|l| !l.trim().is_empty())
            .and_then(parse_sacct_state))
    }
}

impl JobSubstrate for SlurmRunner {
    fn submit(&mut self, job: &JobDescriptor) -> Result<JobHandle> {
        let id = JobId(self.next_id);
        self.next_id += 1;

        let job_dir = job_directory(&self.scratch_root, id, &job.label);
        let workdir = job_dir.join(WORK_SUBDIR);
        stage_workdir(job, &workdir)?;

        let logs = workdir.join("slurm_logs");
        fs::create_dir_all(&logs).map_err(write_error(&logs))?;

        let sbatch_path = workdir.join(SBATCH_FILE);
        fs::write(&sbatch_path, self.render_script(job, &workdir))
            .map_err(write_error(&sbatch_path))?;

        let mut handle = JobHandle::new(id, &job.label);
        handle.remote_folder = Some(RemoteFolder::new(&workdir));

        match Command::new("sbatch")
            .arg("--parsable")
            .arg(SBATCH_FILE)
            .current_dir(&workdir)
            .output()
        {
            Ok(out) if out.status.success() => {
                let stdout = String::from_utf8_lossy(&out.stdout);
                match parse_sbatch_output(&stdout)? {
                    Some(scheduler_id) => {
                        handle.scheduler_id = Some(scheduler_id);
                        self.submitted.insert(id, (job.clone(), job_dir));
                    }
                    None => {
                        handle.state = JobState::Excepted {
                            reason: format!("unexpected sbatch output: {}", stdout.trim()),
                        };
                    }
                }
            }
            Ok(out) => {
                handle.state = JobState::Excepted {
                    reason: format!("sbatch failed: {}", String::from_utf8_lossy(&out.stderr).trim()),
                };
            }
            Err(_) => {
                return Err(RelaxError::CommandNotFound {
                    command: "sbatch".to_string(),
                })
            }
        }

        Ok(handle)
    }

    fn wait(&mut self, mut handle: JobHandle) -> Result<JobHandle> {
        if handle.is_terminated() {
            return Ok(handle);
        }

        let (descriptor, job_dir) = self.submitted.remove(&handle.id).ok_or_else(|| {
            RelaxError::Other(format!("Job {} is not known to the Slurm runner", handle.id))
        })?;
        let scheduler_id = handle.scheduler_id.clone().unwrap_or_default();

        let spinner = progress::job_spinner(
            self.show_progress,
            &format!("Waiting for {} (slurm job {})", handle.label, scheduler_id),
        );

        let state = loop {
            match Self::query_state(&scheduler_id) {
                Ok(Some(state)) => break state,
                Ok(None) => thread::sleep(self.poll_interval),
                Err(e) => {
                    spinner.finish_and_clear();
                    return Err(e);
                }
            }
        };
        spinner.finish_and_clear();
        handle.state = state;

        let workdir = job_dir.join(WORK_SUBDIR);
        if let Err(e) = retrieve_outputs(&descriptor, &workdir, &job_dir.join(RETRIEVED_SUBDIR)) {
            if !handle.is_excepted() && !handle.is_killed() {
                handle.state = JobState::Excepted {
                    reason: format!("retrieval failed: {}", e),
                };
            }
        }

        Ok(handle)
    }
}
