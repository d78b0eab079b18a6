//! # 数据模型模块
//!
//! 定义结构、参数、k 点、赝势与作业的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `deck/`, `calculation/`, `workflow/` 和 `commands/` 使用
//! - 子模块: structure, elements, parameters, kpoints, pseudo, job

pub mod elements;
pub mod job;
pub mod kpoints;
pub mod parameters;
pub mod pseudo;
pub mod structure;

pub use job::{JobDescriptor, JobHandle, JobId, JobState, LocalCopy, RemoteFolder, Resources};
pub use kpoints::KpointSpec;
pub use parameters::{NamedPreset, ParamValue, ParameterSet};
pub use pseudo::{PseudoMap, Pseudopotential};
pub use structure::{Kind, Lattice, Structure};
