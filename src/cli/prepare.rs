//! # prepare 子命令 CLI 定义
//!
//! 只写出 KPT / STRU / INPUT 和赝势目录，不提交作业。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/prepare.rs`

use super::common::{InputArgs, PseudoArgs};
use clap::Args;
use std::path::PathBuf;

/// prepare 子命令参数
#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub pseudo: PseudoArgs,

    /// Output directory
    #[arg(short = 'o', long, default_value = ".")]
    pub output: PathBuf,

    /// Explicit k-point mesh, overrides the density from the parameters
    #[arg(short = 'k', long, num_args = 3, value_names = ["N1", "N2", "N3"])]
    pub kpoints_mesh: Option<Vec<u32>>,

    /// Offset of the explicit mesh (each 0 or 0.5)
    #[arg(long, num_args = 3, value_names = ["O1", "O2", "O3"], requires = "kpoints_mesh")]
    pub kpoints_offset: Option<Vec<f64>>,

    /// k-point spacing in 1/Å, overrides `kpoints_mesh_density`
    #[arg(long, conflicts_with = "kpoints_mesh")]
    pub kpoints_distance: Option<f64>,

    /// Round odd mesh sizes up to even ones
    #[arg(long, default_value_t = false)]
    pub force_parity: bool,
}
