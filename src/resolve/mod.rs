//! # 输入解析模块
//!
//! 工作流初始化阶段把"名称"与"密度"之类的间接输入解析为具体数据：
//! - `parameters`: 命名预设 + 覆盖项 -> `ParameterSet`
//! - `kmesh`: 目标 k 点间距 -> Monkhorst-Pack 网格
//! - `pseudos`: 赝势族名称 -> kind 到赝势文件的映射
//!
//! ## 依赖关系
//! - 被 `workflow/relax.rs` 和 `commands/` 使用
//! - 使用 `store/`, `models/`

pub mod kmesh;
pub mod parameters;
pub mod pseudos;

pub use kmesh::{mesh_from_density, resolve_kpoints};
pub use parameters::resolve_parameters;
pub use pseudos::{select_pseudos, DirectoryFamily, PseudoFamily};
