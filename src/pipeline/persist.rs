use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::schema::AnnotatedRecord;

use super::annotate::{AlignmentError, Annotations};

/// 永続化結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistResult {
    pub path: PathBuf,
    pub records: usize,
}

/// コーパスと4列の注釈を位置で突き合わせてレコードにする。
///
/// # Errors
/// いずれかの列の長さがコーパスと異なる場合。
pub fn merge_records(
    corpus: &[String],
    annotations: Annotations,
) -> Result<Vec<AnnotatedRecord>, AlignmentError> {
    annotations.check_alignment(corpus.len())?;

    let Annotations {
        categories,
        sentiments,
        entities,
        topics,
        ..
    } = annotations;

    Ok(corpus
        .iter()
        .zip(categories)
        .zip(sentiments)
        .zip(entities)
        .zip(topics)
        .map(
            |((((text, category), sentiment), entities), topic)| AnnotatedRecord {
                text: text.clone(),
                category,
                sentiment,
                entities,
                topic,
            },
        )
        .collect())
}

/// 値を2スペースインデントのJSONとして書き出す。非ASCII文字はエスケープしない。
///
/// 同じディレクトリの一時ファイルに書いてからリネームするので、
/// 途中で失敗しても出力先に中途半端なファイルは残らない。
///
/// # Errors
/// ディレクトリ作成、書き込み、リネームのいずれかに失敗した場合。
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create output directory {}", parent.display()))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let temp_path = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

    let result = write_to(&temp_path, value).and_then(|()| {
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("failed to move output into place at {}", path.display()))
    });

    if result.is_err() {
        if let Err(err) = std::fs::remove_file(&temp_path) {
            warn!(path = %temp_path.display(), error = %err, "failed to remove temporary output");
        }
    }
    result
}

fn write_to<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("failed to serialize JSON to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    writer
        .get_ref()
        .sync_all()
        .with_context(|| format!("failed to sync {}", path.display()))?;
    Ok(())
}

#[async_trait]
pub trait PersistStage: Send + Sync {
    async fn persist(&self, run_id: Uuid, records: Arc<[AnnotatedRecord]>) -> Result<PersistResult>;
}

/// レコード配列を1つのJSONファイルに書き出すPersistStage。
#[derive(Debug, Clone)]
pub struct JsonFilePersistStage {
    output: PathBuf,
}

impl JsonFilePersistStage {
    #[must_use]
    pub fn new(output: PathBuf) -> Self {
        Self { output }
    }
}

#[async_trait]
impl PersistStage for JsonFilePersistStage {
    async fn persist(&self, run_id: Uuid, records: Arc<[AnnotatedRecord]>) -> Result<PersistResult> {
        let output = self.output.clone();
        let count = records.len();
        debug!(%run_id, path = %output.display(), records = count, "writing annotated records");

        let target = output.clone();
        tokio::task::spawn_blocking(move || write_json_atomic(&target, &records[..]))
            .await
            .context("persist task panicked")??;

        info!(%run_id, path = %output.display(), records = count, "persisted annotated records");
        Ok(PersistResult {
            path: output,
            records: count,
        })
    }
}
