//! # 作业数据模型
//!
//! - `JobDescriptor`: 一次提交所需的全部信息，构造后不再修改
//! - `JobHandle`: 作业底座返回的句柄，记录终止状态与远程工作目录
//!
//! ## 依赖关系
//! - 被 `calculation/`, `substrate/`, `workflow/` 使用

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 计算资源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub num_machines: u32,
    pub num_mpiprocs_per_machine: u32,
}

impl Resources {
    pub fn total_mpiprocs(&self) -> u32 {
        self.num_machines * self.num_mpiprocs_per_machine
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            num_machines: 1,
            num_mpiprocs_per_machine: 1,
        }
    }
}

/// 需要复制进工作目录的本地文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCopy {
    /// 源文件稳定标识
    pub identity: String,
    /// 源文件路径
    pub source: PathBuf,
    /// 原始文件名
    pub filename: String,
    /// 工作目录内的相对目标路径
    pub destination: PathBuf,
}

/// 作业提交描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// 人类可读的序列标签（如 iteration_01）
    pub label: String,
    /// 可执行文件
    pub executable: String,
    pub cmdline_params: Vec<String>,
    /// 标准输出重定向文件名
    pub stdout_name: String,
    pub with_mpi: bool,
    pub resources: Resources,
    /// 已写入输入文件的暂存目录
    pub staging_dir: PathBuf,
    /// 暂存目录中需要复制的文件名
    pub staged_files: Vec<String>,
    pub local_copy_list: Vec<LocalCopy>,
    /// 执行后取回的输出文件/目录
    pub retrieve_list: Vec<String>,
}

/// 作业底座分配的作业编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 作业状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// 已提交，尚未终止
    Submitted,
    /// 进程正常结束（退出码可能非零）
    Finished { exit_status: i32 },
    /// 提交或执行过程中出现异常
    Excepted { reason: String },
    /// 被外部终止（信号、取消、超时）
    Killed { reason: String },
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Submitted => write!(f, "submitted"),
            JobState::Finished { exit_status } => write!(f, "finished [{}]", exit_status),
            JobState::Excepted { reason } => write!(f, "excepted ({})", reason),
            JobState::Killed { reason } => write!(f, "killed ({})", reason),
        }
    }
}

/// 远程工作目录清理失败的原因（仅此两类会被吞掉）
#[derive(Debug)]
pub enum CleanupError {
    NotFound(PathBuf),
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupError::NotFound(path) => write!(f, "{} does not exist", path.display()),
            CleanupError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
        }
    }
}

/// 作业的远程工作目录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub path: PathBuf,
}

impl RemoteFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RemoteFolder { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 删除工作目录
    pub fn release(&self) -> std::result::Result<(), CleanupError> {
        if !self.path.exists() {
            return Err(CleanupError::NotFound(self.path.clone()));
        }
        fs::remove_dir_all(&self.path).map_err(|source| CleanupError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// 作业句柄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: JobId,
    pub label: String,
    /// 调度器内部编号（如 Slurm job id）
    pub scheduler_id: Option<String>,
    pub state: JobState,
    pub remote_folder: Option<RemoteFolder>,
    /// 由该作业派生的子作业
    pub called: Vec<JobHandle>,
}

impl JobHandle {
    pub fn new(id: JobId, label: impl Into<String>) -> Self {
        JobHandle {
            id,
            label: label.into(),
            scheduler_id: None,
            state: JobState::Submitted,
            remote_folder: None,
            called: Vec::new(),
        }
    }

    pub fn is_terminated(&self) -> bool {
        !matches!(self.state, JobState::Submitted)
    }

    pub fn is_excepted(&self) -> bool {
        matches!(self.state, JobState::Excepted { .. })
    }

    pub fn is_killed(&self) -> bool {
        matches!(self.state, JobState::Killed { .. })
    }

    /// 正常结束但退出码非零
    pub fn is_failed(&self) -> bool {
        matches!(self.state, JobState::Finished { exit_status } if exit_status != 0)
    }

    pub fn exit_status(&self) -> Option<i32> {
        match self.state {
            JobState::Finished { exit_status } => Some(exit_status),
            _ => None,
        }
    }

    pub fn remote_folder(&self) -> Option<&RemoteFolder> {
        self.remote_folder.as_ref()
    }

    /// 所有直接与间接派生的子作业（深度优先）
    pub fn descendants(&self) -> Vec<&JobHandle> {
        let mut out = Vec::new();
        let mut stack: Vec<&JobHandle> = self.called.iter().rev().collect();
        while let Some(handle) = stack.pop() {
            out.push(handle);
            stack.extend(handle.called.iter().rev());
        }
        out
    }
}
