//! # 工作流模块
//!
//! 迭代弛豫工作流及其状态机。
//!
//! ## 依赖关系
//! - 被 `commands/launch.rs` 使用
//! - 子模块: context, relax

pub mod context;
pub mod relax;

pub use context::RelaxOutcome;
pub use relax::{RelaxInputs, RelaxWorkflow};
