//! # 赝势族解析
//!
//! 赝势族是一个目录，内含每个元素一个 UPF 文件：
//!
//! ```text
//! <root>/SSSP_efficiency/
//!     Si.pbe-n-rrkjus_psl.1.0.0.UPF
//!     ge_pbe_v1.4.uspp.F.UPF
//!     ...
//! ```
//!
//! 文件名以元素符号开头（后接 `.`、`_` 或 `-`，不区分大小写）即视为匹配。
//!
//! ## 依赖关系
//! - 被 `workflow/relax.rs` 和 `commands/` 使用
//! - 使用 `walkdir` 扫描目录

use crate::error::{RelaxError, Result};
use crate::models::{PseudoMap, Pseudopotential, Structure};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 按族名称为结构中每个 kind 选择赝势
pub trait PseudoFamily {
    fn resolve(&self, structure: &Structure, family: &str) -> Result<PseudoMap>;
}

/// 赝势族与显式赝势恰好提供一个时取得赝势映射
pub fn select_pseudos(
    explicit: Option<&PseudoMap>,
    family: Option<&str>,
    families: &dyn PseudoFamily,
    structure: &Structure,
) -> Result<PseudoMap> {
    match (explicit, family) {
        (Some(map), None) => Ok(map.clone()),
        (None, Some(family)) => families.resolve(structure, family),
        _ => Err(pseudo_source_error()),
    }
}

pub(crate) fn pseudo_source_error() -> RelaxError {
    RelaxError::ResolutionError(
        "You must specify either a pseudopotential family or explicit pseudopotentials, but not both"
            .to_string(),
    )
}

/// 以目录组织的赝势族：`<root>/<family>/*.upf`
#[derive(Debug, Clone)]
pub struct DirectoryFamily {
    root: PathBuf,
}

impl DirectoryFamily {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryFamily { root: root.into() }
    }

    /// 族目录中的全部 UPF 文件（按文件名排序）
    fn upf_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("upf"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        files
    }
}

/// 文件名是否属于给定元素
fn matches_element(filename: &str, symbol: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    let symbol = symbol.to_ascii_lowercase();
    match lower.strip_prefix(&symbol) {
        Some(rest) => rest.starts_with(['.', '_', '-']),
        None => false,
    }
}

impl PseudoFamily for DirectoryFamily {
    fn resolve(&self, structure: &Structure, family: &str) -> Result<PseudoMap> {
        let dir = self.root.join(family);
        if !dir.is_dir() {
            return Err(RelaxError::ResolutionError(format!(
                "Pseudopotential family '{}' not found under {}",
                family,
                self.root.display()
            )));
        }

        let files = Self::upf_files(&dir);
        let mut pseudos = PseudoMap::new();

        for kind in structure.kinds() {
            let candidates: Vec<&PathBuf> = files
                .iter()
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .map(|n| matches_element(n, &kind.symbol))
                        .unwrap_or(false)
                })
                .collect();

            match candidates.as_slice() {
                [path] => {
                    pseudos.insert(kind.name.clone(), Pseudopotential::from_file(path)?);
                }
                [] => {
                    return Err(RelaxError::ResolutionError(format!(
                        "No pseudopotential for element {} in family '{}'",
                        kind.symbol, family
                    )))
                }
                many => {
                    return Err(RelaxError::ResolutionError(format!(
                        "Family '{}' has {} pseudopotentials for element {}",
                        family,
                        many.len(),
                        kind.symbol
                    )))
                }
            }
        }

        Ok(pseudos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Kind, Lattice};
    use std::fs;

    fn si_ge() -> Structure {
        let lattice = Lattice::from_vectors([[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]]);
        let mut s = Structure::new("SiGe", lattice);
        s.append_atom("Si", [0.0; 3]).unwrap();
        s.append_atom("Ge", [0.5; 3]).unwrap();
        s
    }

    #[test]
    fn test_select_pseudos_requires_exactly_one_source() {
        let family = DirectoryFamily::new("/nonexistent");
        let explicit = PseudoMap::new();

        assert!(select_pseudos(Some(&explicit), None, &family, &si_ge())
            .unwrap()
            .is_empty());
        assert!(matches!(
            select_pseudos(None, None, &family, &si_ge()),
            Err(RelaxError::ResolutionError(ref m)) if m.contains("but not both")
        ));
        assert!(matches!(
            select_pseudos(Some(&explicit), Some("SSSP"), &family, &si_ge()),
            Err(RelaxError::ResolutionError(_))
        ));
    }

    #[test]
    fn test_matches_element() {
        assert!(matches_element("Si.pbe-n-rrkjus.UPF", "Si"));
        assert!(matches_element("si_pbe_v1.uspp.F.UPF", "Si"));
        assert!(matches_element("S-sp.upf", "S"));
        assert!(!matches_element("Si.upf", "S"));
        assert!(!matches_element("Sn.upf", "S"));
    }

    #[test]
    fn test_resolve_family_directory() {
        let root = tempfile::tempdir().unwrap();
        let fam = root.path().join("SSSP");
        fs::create_dir(&fam).unwrap();
        fs::write(fam.join("Si.pbe.UPF"), "si").unwrap();
        fs::write(fam.join("ge_pbe_v1.4.upf"), "ge").unwrap();
        fs::write(fam.join("README"), "x").unwrap();

        let pseudos = DirectoryFamily::new(root.path()).resolve(&si_ge(), "SSSP").unwrap();
        assert_eq!(pseudos.len(), 2);
        assert_eq!(pseudos["Si"].filename, "Si.pbe.UPF");
        assert_eq!(pseudos["Ge"].filename, "ge_pbe_v1.4.upf");
    }

    #[test]
    fn test_resolve_uses_symbol_for_custom_kind_names() {
        let root = tempfile::tempdir().unwrap();
        let fam = root.path().join("fam");
        fs::create_dir(&fam).unwrap();
        fs::write(fam.join("Fe.upf"), "fe").unwrap();

        let lattice = Lattice::from_vectors([[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]]);
        let mut s = Structure::new("Fe", lattice);
        s.append_kind(Kind::new("Fe1", "Fe", 55.845)).unwrap();
        s.append_kind(Kind::new("Fe2", "Fe", 55.845)).unwrap();

        let pseudos = DirectoryFamily::new(root.path()).resolve(&s, "fam").unwrap();
        assert_eq!(pseudos["Fe1"].identity, pseudos["Fe2"].identity);
    }

    #[test]
    fn test_missing_or_ambiguous_entries() {
        let root = tempfile::tempdir().unwrap();
        let fam = root.path().join("fam");
        fs::create_dir(&fam).unwrap();
        fs::write(fam.join("Si.a.upf"), "1").unwrap();
        fs::write(fam.join("Si.b.upf"), "2").unwrap();

        let family = DirectoryFamily::new(root.path());
        let err = family.resolve(&si_ge(), "fam").unwrap_err();
        assert!(matches!(err, RelaxError::ResolutionError(ref m) if m.contains("has 2")));

        fs::remove_file(fam.join("Si.b.upf")).unwrap();
        let err = family.resolve(&si_ge(), "fam").unwrap_err();
        assert!(matches!(err, RelaxError::ResolutionError(ref m) if m.contains("element Ge")));

        assert!(matches!(
            family.resolve(&si_ge(), "nope"),
            Err(RelaxError::ResolutionError(_))
        ));
    }
}
