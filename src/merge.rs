//! 注釈済みコーパスの結合。
//!
//! 複数の実行結果（ソース別に作ったJSON配列）を引数順に連結し、1ファイルにまとめる。
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::MergeConfig;
use crate::pipeline::persist::write_json_atomic;
use crate::schema::AnnotatedRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// 入力ごとのレコード数（引数順）
    pub inputs: Vec<(PathBuf, usize)>,
    pub total: usize,
    pub output: PathBuf,
}

/// 1ファイル分のレコード配列を読む。
///
/// # Errors
/// ファイルが読めない、またはレコード配列として不正な場合。
pub fn read_records(path: &Path) -> Result<Vec<AnnotatedRecord>> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not an array of annotated records", path.display()))
}

/// 入力を順に連結して書き出す。
///
/// # Errors
/// 入力が2つ未満、いずれかの入力が不正、または書き込みに失敗した場合。
pub fn merge_files(config: &MergeConfig) -> Result<MergeSummary> {
    config.validate()?;

    let mut merged = Vec::new();
    let mut inputs = Vec::with_capacity(config.inputs.len());
    for path in &config.inputs {
        let records = read_records(path)?;
        info!(path = %path.display(), records = records.len(), "read annotated records");
        inputs.push((path.clone(), records.len()));
        merged.extend(records);
    }

    write_json_atomic(&config.output, &merged)?;
    info!(
        output = %config.output.display(),
        total = merged.len(),
        "merged annotated corpora"
    );

    Ok(MergeSummary {
        inputs,
        total: merged.len(),
        output: config.output.clone(),
    })
}
