//! # 本地进程作业底座
//!
//! 在本机直接启动计算程序（可经 `mpirun`）。标准输出与标准错误分别写入
//! 工作目录中的输出文件和 `abacus.err`，两者都随取回列表复制到取回目录。
//!
//! ## 依赖关系
//! - 被 `commands/launch.rs` 使用
//! - 使用 `utils/progress.rs` 显示等待状态

use super::{command_line, job_directory, retrieve_outputs, stage_workdir, JobSubstrate};
use super::{RETRIEVED_SUBDIR, WORK_SUBDIR};
use crate::error::{write_error, RelaxError, Result};
use crate::models::{JobDescriptor, JobHandle, JobId, JobState, RemoteFolder};
use crate::utils::progress;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// 标准错误文件名
pub const STDERR_FILE: &str = "abacus.err";

struct RunningJob {
    child: Child,
    descriptor: JobDescriptor,
    job_dir: PathBuf,
}

/// 本地进程执行器
pub struct LocalRunner {
    scratch_root: PathBuf,
    mpirun: String,
    next_id: u64,
    show_progress: bool,
    running: HashMap<JobId, RunningJob>,
}

impl LocalRunner {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        LocalRunner {
            scratch_root: scratch_root.into(),
            mpirun: "mpirun".to_string(),
            next_id: 1,
            show_progress: true,
            running: HashMap::new(),
        }
    }

    /// 指定 MPI 启动器
    pub fn with_mpirun(mut self, mpirun: impl Into<String>) -> Self {
        self.mpirun = mpirun.into();
        self
    }

    /// 不显示等待 spinner
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn spawn(&self, job: &JobDescriptor, workdir: &Path) -> Result<Child> {
        let cmd = command_line(job, &self.mpirun);
        let stdout_path = workdir.join(&job.stdout_name);
        let stdout = File::create(&stdout_path).map_err(write_error(&stdout_path))?;
        let stderr_path = workdir.join(STDERR_FILE);
        let stderr = File::create(&stderr_path).map_err(write_error(&stderr_path))?;

        Command::new(&cmd[0])
            .args(&cmd[1..])
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RelaxError::CommandNotFound {
                        command: cmd[0].clone(),
                    }
                } else {
                    RelaxError::CommandFailed {
                        command: cmd.join(" "),
                        stderr: e.to_string(),
                    }
                }
            })
    }
}

impl JobSubstrate for LocalRunner {
    fn submit(&mut self, job: &JobDescriptor) -> Result<JobHandle> {
        let id = JobId(self.next_id);
        self.next_id += 1;

        let job_dir = job_directory(&self.scratch_root, id, &job.label);
        let workdir = job_dir.join(WORK_SUBDIR);
        stage_workdir(job, &workdir)?;

        let mut handle = JobHandle::new(id, &job.label);
        handle.remote_folder = Some(RemoteFolder::new(&workdir));

        // 启动失败记为异常终止，由工作流决定后续处理
        match self.spawn(job, &workdir) {
            Ok(child) => {
                handle.scheduler_id = Some(child.id().to_string());
                let mut descriptor = job.clone();
                if !descriptor.retrieve_list.iter().any(|name| name == STDERR_FILE) {
                    descriptor.retrieve_list.push(STDERR_FILE.to_string());
                }
                self.running.insert(
                    id,
                    RunningJob {
                        child,
                        descriptor,
                        job_dir,
                    },
                );
            }
            Err(e) => {
                handle.state = JobState::Excepted {
                    reason: e.to_string(),
                };
            }
        }

        Ok(handle)
    }

    fn wait(&mut self, mut handle: JobHandle) -> Result<JobHandle> {
        if handle.is_terminated() {
            return Ok(handle);
        }

        let RunningJob {
            mut child,
            descriptor,
            job_dir,
        } = self.running.remove(&handle.id).ok_or_else(|| {
            RelaxError::Other(format!("Job {} is not known to the local runner", handle.id))
        })?;

        let spinner = progress::job_spinner(
            self.show_progress,
            &format!("Running {} (pid {})", handle.label, child.id()),
        );

        let status = child.wait();
        spinner.finish_and_clear();

        handle.state = match status {
            Ok(status) => match status.code() {
                Some(code) => JobState::Finished { exit_status: code },
                None => JobState::Killed {
                    reason: format!("terminated by signal ({})", status),
                },
            },
            Err(e) => JobState::Excepted {
                reason: e.to_string(),
            },
        };

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::tests::descriptor;
    use std::fs;

    fn shell_job(staging: &Path, script: &str) -> JobDescriptor {
        fs::create_dir_all(staging).unwrap();
        fs::write(staging.join("INPUT"), "INPUT_PARAMETERS\n").unwrap();
        let mut job = descriptor(staging);
        job.with_mpi = false;
        job.executable = "sh".to_string();
        job.cmdline_params = vec!["-c".to_string(), script.to_string()];
        job
    }

    #[test]
    fn test_run_success_retrieves_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let job = shell_job(
            &dir.path().join("staging"),
            "mkdir -p OUT.ABACUS && echo done > OUT.ABACUS/log && echo hello",
        );

        let mut runner = LocalRunner::new(dir.path().join("scratch")).quiet();
        let handle = runner.run(&job).unwrap();

        assert_eq!(handle.state, JobState::Finished { exit_status: 0 });
        let job_dir = dir.path().join("scratch").join("0001-iteration_01");
        assert_eq!(
            handle.remote_folder().unwrap().path(),
            job_dir.join("work").as_path()
        );
        let retrieved = job_dir.join("retrieved");
        assert_eq!(fs::read_to_string(retrieved.join("abacus.out")).unwrap(), "hello\n");
        assert!(retrieved.join("OUT.ABACUS/log").is_file());
        assert!(retrieved.join("INPUT").is_file());
    }

    #[test]
    fn test_non_zero_exit_is_failed() {
        let dir = tempfile::tempdir().unwrap();
        let job = shell_job(&dir.path().join("staging"), "exit 3");
        let mut runner = LocalRunner::new(dir.path().join("scratch")).quiet();

        let handle = runner.run(&job).unwrap();
        assert!(handle.is_failed());
        assert_eq!(handle.exit_status(), Some(3));
    }

    #[test]
    fn test_stderr_is_kept_and_retrieved() {
        let dir = tempfile::tempdir().unwrap();
        let job = shell_job(&dir.path().join("staging"), "echo boom >&2; exit 3");
        let mut runner = LocalRunner::new(dir.path().join("scratch")).quiet();

        let handle = runner.run(&job).unwrap();
        assert_eq!(handle.exit_status(), Some(3));

        let job_dir = dir.path().join("scratch").join("0001-iteration_01");
        assert_eq!(
            fs::read_to_string(job_dir.join("work").join(STDERR_FILE)).unwrap(),
            "boom\n"
        );
        assert_eq!(
            fs::read_to_string(job_dir.join("retrieved").join(STDERR_FILE)).unwrap(),
            "boom\n"
        );
    }

    #[test]
    fn test_missing_executable_is_excepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = shell_job(&dir.path().join("staging"), "");
        job.executable = "definitely-not-an-abacus-binary".to_string();
        let mut runner = LocalRunner::new(dir.path().join("scratch")).quiet();

        let handle = runner.run(&job).unwrap();
        assert!(handle.is_excepted());
        assert!(handle.remote_folder().is_some());
    }

    #[test]
    fn test_quiet_hides_progress() {
        let runner = LocalRunner::new("/scratch");
        assert!(runner.show_progress);
        assert!(!runner.quiet().show_progress);
    }

    #[test]
    fn test_ids_increase_per_submission() {
        let dir = tempfile::tempdir().unwrap();
        let job = shell_job(&dir.path().join("staging"), "true");
        let mut runner = LocalRunner::new(dir.path().join("scratch")).quiet();

        let first = runner.run(&job).unwrap();
        let second = runner.run(&job).unwrap();
        assert_eq!(first.id, JobId(1));
        assert_eq!(second.id, JobId(2));
    }
}
