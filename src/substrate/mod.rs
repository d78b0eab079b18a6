//! # 作业底座
//!
//! 工作流通过 `JobSubstrate` 提交作业并等待其终止。
//! 每个作业拥有独立目录：
//!
//! ```text
//! <scratch>/0001-iteration_01/
//!     work/        远程工作目录（输入文件、赝势、程序输出）
//!     retrieved/   取回的输出
//! ```
//!
//! ## 依赖关系
//! - 被 `workflow/relax.rs` 和 `commands/launch.rs` 使用
//! - 子模块: local, slurm

pub mod local;
pub mod slurm;

pub use local::LocalRunner;
pub use slurm::SlurmRunner;

use crate::error::{read_error, write_error, RelaxError, Result};
use crate::models::{JobDescriptor, JobHandle, JobId};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 工作目录名
pub const WORK_SUBDIR: &str = "work";
/// 取回目录名
pub const RETRIEVED_SUBDIR: &str = "retrieved";

/// 作业提交接口
pub trait JobSubstrate {
    /// 提交作业，返回初始句柄
    fn submit(&mut self, job: &JobDescriptor) -> Result<JobHandle>;

    /// 阻塞直到作业终止，返回终止状态的句柄
    fn wait(&mut self, handle: JobHandle) -> Result<JobHandle>;

    /// 提交并等待
    fn run(&mut self, job: &JobDescriptor) -> Result<JobHandle> {
        let handle = self.submit(job)?;
        self.wait(handle)
    }
}

/// 作业目录：`<scratch>/<id:04>-<label>`
pub fn job_directory(scratch_root: &Path, id: JobId, label: &str) -> PathBuf {
    scratch_root.join(format!("{:04}-{}", id.0, label))
}

/// 把暂存文件与本地复制列表放入工作目录
///
/// 已存在的工作目录先被清空，编号从 1 重新开始的新运行不会混入旧输出。
pub fn stage_workdir(job: &JobDescriptor, workdir: &Path) -> Result<()> {
    if workdir.exists() {
        fs::remove_dir_all(workdir).map_err(write_error(workdir))?;
    }
    fs::create_dir_all(workdir).map_err(write_error(workdir))?;

    for name in &job.staged_files {
        let src = job.staging_dir.join(name);
        if !src.is_file() {
            return Err(RelaxError::FileNotFound {
                path: src.display().to_string(),
            });
        }
        let dst = workdir.join(name);
        fs::copy(&src, &dst).map_err(write_error(&dst))?;
    }

    for copy in &job.local_copy_list {
        let dst = workdir.join(&copy.destination);
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(write_error(parent))?;
        }
        fs::copy(&copy.source, &dst).map_err(read_error(&copy.source))?;
    }

    Ok(())
}

/// 作业命令行（不含重定向）
pub fn command_line(job: &JobDescriptor, mpirun: &str) -> Vec<String> {
    let mut cmd = Vec::new();
    if job.with_mpi {
        cmd.push(mpirun.to_string());
        cmd.push("-np".to_string());
        cmd.push(job.resources.total_mpiprocs().to_string());
    }
    cmd.push(job.executable.clone());
    cmd.extend(job.cmdline_params.iter().cloned());
    cmd
}

/// 将取回列表中的文件/目录从工作目录复制到取回目录，缺失项跳过
///
/// 返回实际取回的条目名。
pub fn retrieve_outputs(job: &JobDescriptor, workdir: &Path, retrieved: &Path) -> Result<Vec<String>> {
    fs::create_dir_all(retrieved).map_err(write_error(retrieved))?;
    let mut found = Vec::new();

    for name in &job.retrieve_list {
        let src = workdir.join(name);
        if src.is_dir() {
            copy_tree(&src, &retrieved.join(name))?;
        } else if src.is_file() {
            let dst = retrieved.join(name);
            fs::copy(&src, &dst).map_err(write_error(&dst))?;
        } else {
            continue;
        }
        found.push(name.clone());
    }

    Ok(found)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(write_error(&target))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(write_error(&target))?;
        }
    }
    Ok(())
}
