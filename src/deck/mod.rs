//! # 输入文件生成模块
//!
//! 将 (结构, k 点, 参数, 赝势, 附加设置) 转换为 ABACUS 的三个输入文件。
//! 纯文件操作，不涉及作业提交。
//!
//! ## 依赖关系
//! - 被 `calculation/` 和 `commands/prepare.rs` 使用
//! - 使用 `models/`
//! - 子模块: kpt, stru, input

pub mod input;
pub mod kpt;
pub mod stru;

pub use stru::StruSettings;

/// k 点文件名
pub const KPT_FILE: &str = "KPT";
/// 结构文件名
pub const STRU_FILE: &str = "STRU";
/// 主参数文件名
pub const INPUT_FILE: &str = "INPUT";

/// 工作目录中存放赝势的子目录
pub const PSEUDO_SUBFOLDER: &str = "pseudo";
/// 输出目录后缀，程序输出写入 `OUT.<suffix>`
pub const SUFFIX: &str = "ABACUS";
