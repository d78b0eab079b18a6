//! # 进度条工具
//!
//! 封装 `indicatif`，等待作业结束时显示 spinner。
//!
//! ## 依赖关系
//! - 被 `substrate/` 模块使用
//! - 使用 `indicatif` crate

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// 创建 spinner（用于不确定进度的任务）
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {elapsed_precise} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 静默模式下的 spinner：不输出任何内容
pub fn hidden_spinner() -> ProgressBar {
    ProgressBar::hidden()
}

/// 等待作业时的 spinner，`show` 为 false 时隐藏
pub fn job_spinner(show: bool, message: &str) -> ProgressBar {
    if show {
        create_spinner(message)
    } else {
        hidden_spinner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_job_spinner_is_hidden() {
        let pb = job_spinner(false, "Waiting");
        assert!(pb.is_hidden());
        pb.finish_and_clear();
    }
}
