//! # 工具函数模块
//!
//! 提供美化输出、等待动画、sbatch 脚本生成与 sacct 状态解析。
//!
//! ## 依赖关系
//! - 被 `commands/`, `substrate/`, `workflow/` 模块使用
//! - 子模块: output, progress, slurm

pub mod output;
pub mod progress;
pub mod slurm;
