//! # 统一错误处理模块
//!
//! 定义 abacus-relax 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - `ValidationError`: 结构化输入不合法（k 点偏移、固定坐标、磁矩长度、缺失赝势等）
//! - `ResolutionError`: 命名记录查找数量不为 1，或赝势来源配置冲突
//! - `SubProcessFailure`: 计算作业异常终止或返回非零状态
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// abacus-relax 统一错误类型
#[derive(Error, Debug)]
pub enum RelaxError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 输入校验与记录解析
    // ─────────────────────────────────────────────────────────────
    #[error("Input validation failed: {0}")]
    ValidationError(String),

    #[error("Resolution failed: {0}")]
    ResolutionError(String),

    // ─────────────────────────────────────────────────────────────
    // 外部命令与子作业
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("[{status}] {message}")]
    SubProcessFailure {
        status: u32,
        message: String,
        exit_status: Option<i32>,
    },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // JSON 错误
    // ─────────────────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, RelaxError>;

/// 将 I/O 错误包装为带路径的读错误
pub fn read_error(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> RelaxError + '_ {
    move |source| RelaxError::FileReadError {
        path: path.display().to_string(),
        source,
    }
}

/// 将 I/O 错误包装为带路径的写错误
pub fn write_error(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> RelaxError + '_ {
    move |source| RelaxError::FileWriteError {
        path: path.display().to_string(),
        source,
    }
}
