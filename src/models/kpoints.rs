//! # k 点数据模型
//!
//! 显式网格 (mesh + offset) 或由目标线密度推导网格。
//!
//! ## 依赖关系
//! - 被 `deck/kpt.rs`, `resolve/kmesh.rs` 使用

use serde::{Deserialize, Serialize};

/// k 点设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KpointSpec {
    /// 显式 Monkhorst-Pack 网格；offset 分量只能为 0 或 0.5
    Mesh { mesh: [u32; 3], offset: [f64; 3] },
    /// 目标倒空间点间距 (1/Å)，尚未展开为网格
    Density { distance: f64, system_2d: bool },
}

impl KpointSpec {
    /// 无偏移网格
    pub fn mesh(mesh: [u32; 3]) -> Self {
        KpointSpec::Mesh {
            mesh,
            offset: [0.0; 3],
        }
    }

    pub fn with_offset(mesh: [u32; 3], offset: [f64; 3]) -> Self {
        KpointSpec::Mesh { mesh, offset }
    }

    /// 网格与偏移；密度形式返回 None
    pub fn get_mesh(&self) -> Option<([u32; 3], [f64; 3])> {
        match self {
            KpointSpec::Mesh { mesh, offset } => Some((*mesh, *offset)),
            KpointSpec::Density { .. } => None,
        }
    }
}
