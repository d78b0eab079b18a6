//! # launch 子命令 CLI 定义
//!
//! 启动工作流，目前只有 `relax`。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/launch.rs`

use super::common::{InputArgs, PseudoArgs};
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

/// launch 主命令参数
#[derive(Args, Debug)]
pub struct LaunchArgs {
    #[command(subcommand)]
    pub command: LaunchCommands,
}

/// launch 子命令
#[derive(Subcommand, Debug)]
pub enum LaunchCommands {
    /// Run the iterative ABACUS relaxation workflow
    Relax(RelaxArgs),
}

/// 作业底座选择
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Scheduler {
    /// Run ABACUS directly on this machine
    Local,
    /// Submit through sbatch and poll sacct
    Slurm,
}

/// relax 子命令参数
#[derive(Args, Debug)]
pub struct RelaxArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub pseudo: PseudoArgs,

    /// ABACUS executable
    #[arg(short = 'X', long, default_value = "abacus")]
    pub code: String,

    /// Number of machines per calculation
    #[arg(short = 'm', long, default_value_t = 1)]
    pub max_num_machines: u32,

    /// MPI processes per machine
    #[arg(long, default_value_t = 1)]
    pub num_mpiprocs_per_machine: u32,

    /// Run ABACUS without an MPI launcher
    #[arg(long, default_value_t = false)]
    pub without_mpi: bool,

    /// MPI launcher
    #[arg(long, default_value = "mpirun")]
    pub mpirun: String,

    /// Maximum number of relax iterations
    #[arg(long, default_value_t = 1)]
    pub max_iterations: u32,

    /// Remove the remote working folders when the workflow terminates
    #[arg(short = 'x', long, default_value_t = false)]
    pub clean_workdir: bool,

    /// Detach and run in the background (output goes to <work-dir>/abacus-relax.log)
    #[arg(short = 'd', long, default_value_t = false)]
    pub daemon: bool,

    /// Job substrate
    #[arg(long, value_enum, default_value = "local")]
    pub scheduler: Scheduler,

    /// Directory for staged inputs of each iteration
    #[arg(long, default_value = "abacus-relax")]
    pub work_dir: PathBuf,

    /// Directory for job working folders (default: <work-dir>/jobs)
    #[arg(long, env = "ABACUS_RELAX_SCRATCH")]
    pub scratch: Option<PathBuf>,

    // ─────────────────────────────────────────────────────────────
    // Slurm options
    // ─────────────────────────────────────────────────────────────
    /// Slurm partition
    #[arg(long)]
    pub partition: Option<String>,

    /// Slurm constraint
    #[arg(long)]
    pub constraint: Option<String>,

    /// Memory per CPU
    #[arg(long, default_value = "2G")]
    pub mem_per_cpu: String,

    /// Time limit (e.g., '24:00:00')
    #[arg(long, default_value = "24:00:00")]
    pub time: String,

    /// Modules to load in the job script (comma-separated)
    #[arg(long, default_value = "")]
    pub modules: String,

    /// Seconds between sacct polls
    #[arg(long, default_value_t = 30)]
    pub poll_interval: u64,
}
