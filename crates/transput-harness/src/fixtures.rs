//! Fixture loading and management.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use transput_core::{EnvHandle, ExprHandle, FormatText, Mode, PictureNode, TableHost, Value, WideArithmetic};

/// Failure to load or interpret a fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("case '{case}': {message}")]
    Case { case: String, message: String },
}

/// Which statement a case exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseDirection {
    Write,
    Read,
}

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// Behaviour area the case covers (e.g. `mould/zero-suppression`).
    pub section: String,
    pub direction: CaseDirection,
    /// The format's picture tree.
    pub format: serde_json::Value,
    /// Values of dynamic integer expressions, by expression handle.
    #[serde(default)]
    pub ints: BTreeMap<u32, i64>,
    /// Picture trees of dynamic sub-format expressions, by expression handle.
    #[serde(default)]
    pub formats: BTreeMap<u32, serde_json::Value>,
    /// Values to write.
    #[serde(default)]
    pub values: Vec<Value>,
    /// Text to read.
    #[serde(default)]
    pub input: String,
    /// Modes to read, in order.
    #[serde(default)]
    pub modes: Vec<Mode>,
    /// Written text, or read values joined by `, `. A failing statement
    /// appends `<error:TAG>`.
    pub expected_output: String,
    /// Recovery mode the case applies to: `strict`, `lenient` or `both`.
    pub mode: String,
}

impl FixtureCase {
    /// Compile a picture tree described in this case.
    pub fn compile(&self, tree: &serde_json::Value) -> Result<FormatText, FixtureError> {
        let root: PictureNode =
            serde_json::from_value(tree.clone()).map_err(|err| FixtureError::Case {
                case: self.name.clone(),
                message: format!("bad picture tree: {err}"),
            })?;
        Ok(FormatText::new(&root, EnvHandle(0)))
    }

    /// Expression evaluator backed by the case's tables.
    pub fn host(&self) -> Result<TableHost, FixtureError> {
        let mut host = TableHost::new().with_arithmetic(WideArithmetic::new());
        for (&expr, &value) in &self.ints {
            host = host.with_int(ExprHandle(expr), value);
        }
        for (&expr, tree) in &self.formats {
            host = host.with_format(ExprHandle(expr), self.compile(tree)?);
        }
        Ok(host)
    }
}

/// A collection of fixture cases for one behaviour family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Family name.
    pub family: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, FixtureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Every `*.json` fixture in `dir`, sorted by path.
    pub fn load_dir(dir: &Path) -> Result<Vec<(std::path::PathBuf, Self)>, FixtureError> {
        let io = |source| FixtureError::Io {
            path: dir.display().to_string(),
            source,
        };
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(io)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        paths
            .into_iter()
            .map(|path| Self::from_file(&path).map(|set| (path, set)))
            .collect()
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// SHA-256 of a fixture file's bytes, lowercase hex.
pub fn fixture_digest(path: &Path) -> Result<String, FixtureError> {
    let data = std::fs::read(path).map_err(|source| FixtureError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(hex_lower(&Sha256::digest(&data)))
}
