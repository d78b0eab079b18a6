//! # 晶体结构数据模型
//!
//! 定义计算使用的原子结构：晶格、原子种类 (kind) 与格点 (site)。
//!
//! ## 不变量
//! - kind 名称唯一
//! - 每个 site 都引用一个已声明的 kind
//!
//! ## 依赖关系
//! - 被 `parsers/`, `deck/`, `resolve/`, `workflow/` 使用
//! - 使用 `models/elements.rs` 查询默认原子质量

use super::elements;
use crate::error::{RelaxError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 晶格参数表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 三个晶格向量的长度
    pub fn lengths(&self) -> [f64; 3] {
        self.matrix.map(norm)
    }

    /// 计算晶格体积（有符号）
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.matrix;
        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }

    /// 晶格矩阵的逆矩阵；奇异矩阵返回 None
    pub fn inverse(&self) -> Option<[[f64; 3]; 3]> {
        let m = self.matrix;
        let det = self.volume();
        if det.abs() < 1e-10 {
            return None;
        }

        Some([
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
            ],
        ])
    }

    /// 倒格子向量（行向量，含 2π 因子）：B = 2π (A⁻¹)ᵀ
    pub fn reciprocal(&self) -> Option<[[f64; 3]; 3]> {
        let inv = self.inverse()?;
        let mut rec = [[0.0; 3]; 3];
        for (i, row) in rec.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = 2.0 * PI * inv[j][i];
            }
        }
        Some(rec)
    }

    /// 笛卡尔坐标转分数坐标
    pub fn cart_to_frac(&self, cart: [f64; 3]) -> Result<[f64; 3]> {
        let inv = self.inverse().ok_or_else(|| {
            RelaxError::ValidationError("Cell matrix is singular".to_string())
        })?;

        // frac = cart · A⁻¹
        Ok([
            cart[0] * inv[0][0] + cart[1] * inv[1][0] + cart[2] * inv[2][0],
            cart[0] * inv[0][1] + cart[1] * inv[1][1] + cart[2] * inv[2][1],
            cart[0] * inv[0][2] + cart[1] * inv[1][2] + cart[2] * inv[2][2],
        ])
    }
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// 原子种类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kind {
    /// kind 名称（可与元素符号不同，如 Fe1/Fe2）
    pub name: String,
    /// 元素符号
    pub symbol: String,
    /// 原子质量 (amu)
    pub mass: f64,
}

impl Kind {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, mass: f64) -> Self {
        Kind {
            name: name.into(),
            symbol: symbol.into(),
            mass,
        }
    }

    /// 以元素符号命名，质量取标准原子量
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        let mass = elements::atomic_mass(symbol).ok_or_else(|| {
            RelaxError::ValidationError(format!("Unknown chemical symbol '{}'", symbol))
        })?;
        Ok(Kind::new(symbol, symbol, mass))
    }
}

/// 格点：kind 引用 + 分数坐标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub kind_name: String,
    pub position: [f64; 3],
}

/// 原子结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    kinds: Vec<Kind>,
    sites: Vec<Site>,
}

impl Structure {
    pub fn new(name: impl Into<String>, lattice: Lattice) -> Self {
        Structure {
            name: name.into(),
            lattice,
            kinds: Vec::new(),
            sites: Vec::new(),
        }
    }

    pub fn kinds(&self) -> &[Kind] {
        &self.kinds
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn get_kind(&self, name: &str) -> Option<&Kind> {
        self.kinds.iter().find(|k| k.name == name)
    }

    /// 声明新的 kind，名称重复时报错
    pub fn append_kind(&mut self, kind: Kind) -> Result<()> {
        if self.get_kind(&kind.name).is_some() {
            return Err(RelaxError::ValidationError(format!(
                "Kind '{}' is already defined",
                kind.name
            )));
        }
        self.kinds.push(kind);
        Ok(())
    }

    /// 添加格点（分数坐标），kind 必须已声明
    pub fn append_site(&mut self, kind_name: &str, position: [f64; 3]) -> Result<()> {
        if self.get_kind(kind_name).is_none() {
            return Err(RelaxError::ValidationError(format!(
                "Site references undefined kind '{}'",
                kind_name
            )));
        }
        self.sites.push(Site {
            kind_name: kind_name.to_string(),
            position,
        });
        Ok(())
    }

    /// 按元素符号添加原子，必要时自动声明同名 kind
    pub fn append_atom(&mut self, symbol: &str, position: [f64; 3]) -> Result<()> {
        if self.get_kind(symbol).is_none() {
            self.append_kind(Kind::from_symbol(symbol)?)?;
        }
        self.append_site(symbol, position)
    }

    /// 晶胞体积 (Å³)
    pub fn cell_volume(&self) -> f64 {
        self.lattice.volume().abs()
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for site in &self.sites {
            let symbol = self
                .get_kind(&site.kind_name)
                .map(|k| k.symbol.as_str())
                .unwrap_or(site.kind_name.as_str());
            *counts.entry(symbol).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }
}
