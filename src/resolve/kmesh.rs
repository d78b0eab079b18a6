//! # k 点网格生成
//!
//! 由目标倒空间间距 `distance` (1/Å) 推导 Monkhorst-Pack 网格：
//!
//! ```text
//! n_i = max(1, ceil(round(|b_i| / distance, 5)))
//! ```
//!
//! 其中 b_i 为含 2π 因子的倒格子向量。之后依次执行：
//! 1. 可选的奇偶修正（奇数向上取偶）
//! 2. 三个晶格向量等长时取最大值使网格各向同性
//! 3. 二维体系强制 n_3 = 1
//!
//! ## 依赖关系
//! - 被 `workflow/relax.rs` 和 `commands/prepare.rs` 使用
//! - 使用 `models/structure.rs` 的倒格子计算

use crate::error::{RelaxError, Result};
use crate::models::{KpointSpec, ParamValue, ParameterSet, Structure};

/// 未指定时的 k 点间距 (1/Å)
pub const DEFAULT_MESH_DENSITY: f64 = 0.2;

const SYMMETRIC_CELL_TOLERANCE: f64 = 1e-5;

/// 按间距生成 k 点网格（偏移为 0）
pub fn mesh_from_density(
    structure: &Structure,
    distance: f64,
    force_parity: bool,
    system_2d: bool,
) -> Result<KpointSpec> {
    if distance.is_nan() || distance <= 0.0 {
        return Err(RelaxError::ValidationError(format!(
            "k-point distance must be positive, got {}",
            distance
        )));
    }

    let reciprocal = structure.lattice.reciprocal().ok_or_else(|| {
        RelaxError::ValidationError("Cell matrix is singular".to_string())
    })?;

    let mut mesh = reciprocal.map(|b| {
        let length = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
        let ratio = round_to(length / distance, 5);
        (ratio.ceil() as u32).max(1)
    });

    if force_parity {
        mesh = mesh.map(|n| n + n % 2);
    }

    let lengths = structure.lattice.lengths();
    let symmetric_cell = lengths
        .iter()
        .all(|l| (l - lengths[0]).abs() < SYMMETRIC_CELL_TOLERANCE);
    if symmetric_cell {
        let n = mesh.iter().copied().max().unwrap_or(1);
        mesh = [n; 3];
    }

    if system_2d {
        mesh[2] = 1;
    }

    Ok(KpointSpec::mesh(mesh))
}

fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// 参数集中 k 点相关条目的解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct KpointResolution {
    pub kpoints: KpointSpec,
    pub distance: f64,
    /// 被移除但不生效的 `kpoints_mesh_offset`
    pub ignored_offset: Option<ParamValue>,
}

/// 从参数集中取出 `kpoints_mesh_density` 与 `kpoints_mesh_offset` 并生成网格
///
/// 两个 key 都会从 `parameters` 中移除，不会写入 INPUT。
pub fn resolve_kpoints(
    parameters: &mut ParameterSet,
    structure: &Structure,
    system_2d: bool,
) -> Result<KpointResolution> {
    let density = parameters.pop_or("kpoints_mesh_density", DEFAULT_MESH_DENSITY);
    let ignored_offset = parameters.pop("kpoints_mesh_offset");

    let distance = density.as_f64().ok_or_else(|| {
        RelaxError::ValidationError(format!(
            "kpoints_mesh_density must be a number, got '{}'",
            density
        ))
    })?;

    let kpoints = mesh_from_density(structure, distance, false, system_2d)?;

    Ok(KpointResolution {
        kpoints,
        distance,
        ignored_offset,
    })
}
