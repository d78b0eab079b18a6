//! # 共享 CLI 参数
//!
//! `launch relax` 与 `prepare` 共用的结构、参数、赝势选项。
//!
//! ## 依赖关系
//! - 被 `cli/launch.rs`, `cli/prepare.rs` 使用

use clap::Args;
use std::path::PathBuf;

/// 结构与参数输入
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Structure file (POSCAR/CONTCAR or ABACUS STRU)
    #[arg(short = 'S', long)]
    pub structure: PathBuf,

    /// Name of the stored parameters preset
    #[arg(long, default_value = "default")]
    pub parameters_name: String,

    /// Override a preset parameter (repeatable): -p ecutwfc 80
    #[arg(
        short = 'p',
        long = "parameters",
        num_args = 2,
        value_names = ["KEY", "VALUE"],
        action = clap::ArgAction::Append
    )]
    pub parameters: Vec<String>,

    /// JSON file with STRU settings (INITIAL_MAGNETIC, FIXED_COORDS)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Parameters preset store
    #[arg(long, env = "ABACUS_RELAX_STORE", default_value = "presets.json")]
    pub store: PathBuf,
}

/// 赝势来源（族与显式文件二选一）
#[derive(Args, Debug)]
pub struct PseudoArgs {
    /// Pseudopotential family name (a directory under --pseudo-root)
    #[arg(long)]
    pub pseudo_family: Option<String>,

    /// Root directory containing pseudopotential families
    #[arg(long, env = "ABACUS_RELAX_PSEUDO_ROOT")]
    pub pseudo_root: Option<PathBuf>,

    /// Explicit pseudopotential for a kind (repeatable): --pseudo Si=./Si.upf
    #[arg(long = "pseudo", value_name = "KIND=PATH")]
    pub pseudo: Vec<String>,

    /// Treat the structure as a 2D system (k-mesh along c is 1)
    #[arg(long, default_value_t = false)]
    pub system_2d: bool,
}
