//! # KPT 文件生成
//!
//! ## KPT 格式说明
//! ```text
//! K_POINTS
//! 0                # 由程序根据网格自动生成 k 点
//! Gamma            # 网格类型
//! n1 n2 n3 s1 s2 s3
//! ```
//! 其中 s_i 为偏移标志：offset 0.0 -> 0, 0.5 -> 1。
//!
//! ## 依赖关系
//! - 被 `calculation/` 使用
//! - 使用 `models/kpoints.rs`

use crate::error::{write_error, RelaxError, Result};
use crate::models::KpointSpec;
use std::fs;
use std::path::Path;

/// 生成 KPT 文件内容
pub fn render_kpt(kpoints: &KpointSpec) -> Result<String> {
    let (mesh, offset) = kpoints.get_mesh().ok_or_else(|| {
        RelaxError::ValidationError("No mesh found in k-point data".to_string())
    })?;

    if offset.iter().any(|&o| o != 0.0 && o != 0.5) {
        return Err(RelaxError::ValidationError(
            "offset list must only be made of 0 or 0.5 floats".to_string(),
        ));
    }
    let flags = offset.map(|o| if o == 0.0 { 0 } else { 1 });

    Ok(format!(
        "K_POINTS\n0\nGamma\n{} {} {} {} {} {}\n",
        mesh[0], mesh[1], mesh[2], flags[0], flags[1], flags[2]
    ))
}

/// 写出 KPT 文件
pub fn write_kpt(path: &Path, kpoints: &KpointSpec) -> Result<()> {
    let content = render_kpt(kpoints)?;
    fs::write(path, content).map_err(write_error(path))
}
