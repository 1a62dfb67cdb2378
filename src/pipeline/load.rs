/// 入力ソースからテキスト列を読み込むステージ。
///
/// 表形式ファイル（CSV/TSV）、JSON配列ファイル、リモートコーパスに対応する。
/// どのソースでも、欠損・空のエントリは除外し、読み込み順を保つ。
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::util::retry::RetryConfig;

/// `huggingface` 指定時に読むコーパス。
pub const DEFAULT_REMOTE_DATASET: &str = "gustavecortal/DreamBank-annotated";
pub const DEFAULT_REMOTE_SPLIT: &str = "train";
/// rows APIが1リクエストで返す最大行数。
const REMOTE_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(
        "unsupported source '{0}': expected a .csv, .tsv or .json path, \
         'huggingface', or hf://owner/name[@split]"
    )]
    UnsupportedFormat(String),
    #[error("source file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tabular file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("tabular file {0} has no header row")]
    EmptyHeader(PathBuf),
    #[error("failed to parse JSON file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("JSON source {0} must contain a top-level array")]
    NotAnArray(PathBuf),
    #[error("field '{field}' of entry {index} is {found}, expected a string")]
    InvalidFieldType {
        index: usize,
        field: String,
        found: &'static str,
    },
    #[error("remote corpus {dataset} exposes no columns")]
    NoColumns { dataset: String },
    #[error("invalid remote endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// `--input` で指定されたソース。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Tabular { path: PathBuf, delimiter: u8 },
    Json { path: PathBuf },
    Remote { dataset: String, split: String },
}

impl SourceDescriptor {
    /// ソース指定文字列を解釈する。
    ///
    /// # Errors
    /// どの形式にも当てはまらない場合は [`SourceError::UnsupportedFormat`]。
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let trimmed = raw.trim();
        if trimmed == "huggingface" {
            return Ok(Self::Remote {
                dataset: DEFAULT_REMOTE_DATASET.to_string(),
                split: DEFAULT_REMOTE_SPLIT.to_string(),
            });
        }

        if let Some(rest) = trimmed.strip_prefix("hf://") {
            let (dataset, split) = rest.split_once('@').unwrap_or((rest, DEFAULT_REMOTE_SPLIT));
            let valid_name = dataset
                .split_once('/')
                .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
            if !valid_name || split.is_empty() {
                return Err(SourceError::UnsupportedFormat(raw.to_string()));
            }
            return Ok(Self::Remote {
                dataset: dataset.to_string(),
                split: split.to_string(),
            });
        }

        let path = PathBuf::from(trimmed);
        let extension = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(Self::Tabular {
                path,
                delimiter: b',',
            }),
            Some("tsv") => Ok(Self::Tabular {
                path,
                delimiter: b'\t',
            }),
            Some("json") => Ok(Self::Json { path }),
            _ => Err(SourceError::UnsupportedFormat(raw.to_string())),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tabular { path, .. } | Self::Json { path } => write!(f, "{}", path.display()),
            Self::Remote { dataset, split } => write!(f, "hf://{dataset}@{split}"),
        }
    }
}

/// 候補列名を優先順に探し、最初に見つかった列の位置を返す。
fn select_column<'a>(names: impl IntoIterator<Item = &'a str>, candidates: &[String]) -> Option<usize> {
    let names: Vec<&str> = names.into_iter().collect();
    candidates
        .iter()
        .find_map(|candidate| names.iter().position(|name| name == candidate))
}

/// 表形式ファイルからテキスト列を読み込む。
///
/// 候補列が1つもなければ先頭列を使う。空セルは除外するが、空白のみのセルは残す。
///
/// # Errors
/// ファイルが存在しない、ヘッダーがない、またはCSVとして不正な場合。
pub fn load_tabular(path: &Path, delimiter: u8, candidates: &[String]) -> Result<Vec<String>, SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    let csv_error = |source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    if headers.is_empty() {
        return Err(SourceError::EmptyHeader(path.to_path_buf()));
    }
    let column = select_column(headers.iter(), candidates).unwrap_or(0);
    debug!(
        path = %path.display(),
        column = headers.get(column).unwrap_or_default(),
        "selected text column"
    );

    let mut texts = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        if let Some(cell) = record.get(column).filter(|cell| !cell.is_empty()) {
            texts.push(cell.to_string());
        }
    }
    Ok(texts)
}

/// JSON配列ファイルからテキストを読み込む。
///
/// オブジェクト以外の要素と、フィールドが欠落・null・false・空文字の要素は除外する。
///
/// # Errors
/// ファイルが読めない、JSONとして不正、配列でない、
/// またはフィールドが文字列以外の値を持つ場合。
pub fn load_json(path: &Path, field: &str) -> Result<Vec<String>, SourceError> {
    let raw = std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            SourceError::NotFound(path.to_path_buf())
        } else {
            SourceError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let value: Value = serde_json::from_slice(&raw).map_err(|source| SourceError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(items) = value else {
        return Err(SourceError::NotAnArray(path.to_path_buf()));
    };

    let mut texts = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(mut object) = item else {
            continue;
        };
        if let Some(text) = take_text_field(&mut object, field, index)? {
            texts.push(text);
        }
    }
    Ok(texts)
}

fn take_text_field(
    object: &mut Map<String, Value>,
    field: &str,
    index: usize,
) -> Result<Option<String>, SourceError> {
    match object.remove(field) {
        Some(Value::String(text)) if !text.is_empty() => Ok(Some(text)),
        None | Some(Value::Null | Value::Bool(false) | Value::String(_)) => Ok(None),
        Some(other) => Err(SourceError::InvalidFieldType {
            index,
            field: field.to_string(),
            found: json_type_name(&other),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// リモートコーパス取得の設定。
#[derive(Debug, Clone)]
pub struct RemoteCorpusSettings {
    pub endpoint: String,
    pub config_name: String,
    pub token: Option<String>,
    pub text_columns: Vec<String>,
    pub timeout: Duration,
    pub max_attempts: usize,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    rows: Vec<RowEntry>,
    num_rows_total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: Map<String, Value>,
}

/// データセット行API（`/rows`）からコーパスをページ単位で取得するクライアント。
#[derive(Debug, Clone)]
pub struct RemoteCorpusClient {
    client: Client,
    base_url: Url,
    config_name: String,
    token: Option<String>,
    text_columns: Vec<String>,
    retry: RetryConfig,
}

impl RemoteCorpusClient {
    /// # Errors
    /// エンドポイントURLが不正、またはHTTPクライアントの構築に失敗した場合。
    pub fn new(settings: RemoteCorpusSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build remote corpus HTTP client")?;

        let base_url = Url::parse(&settings.endpoint).map_err(|err| SourceError::InvalidEndpoint {
            endpoint: settings.endpoint.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            config_name: settings.config_name,
            token: settings.token,
            text_columns: settings.text_columns,
            retry: RetryConfig::new(
                settings.max_attempts,
                settings.backoff_base_ms,
                settings.backoff_cap_ms,
            ),
        })
    }

    /// データセットの指定splitを全件取得する。
    ///
    /// 列は最初のページの列定義から候補順に選び、なければ先頭列を使う。
    ///
    /// # Errors
    /// 再試行を使い切ったHTTPエラー、4xx、応答のパース失敗、列定義なし、
    /// またはテキスト列に文字列以外の値がある場合。
    pub async fn fetch_texts(&self, dataset: &str, split: &str) -> Result<Vec<String>> {
        let mut page = self.fetch_page(dataset, split, 0).await?;

        let names: Vec<&str> = page.features.iter().map(|feature| feature.name.as_str()).collect();
        let column_idx = select_column(names.iter().copied(), &self.text_columns).unwrap_or(0);
        let column = names
            .get(column_idx)
            .map(|name| (*name).to_string())
            .ok_or_else(|| SourceError::NoColumns {
                dataset: dataset.to_string(),
            })?;
        debug!(dataset, split, column = %column, "selected remote text column");

        let mut texts = Vec::new();
        let mut offset = 0;
        loop {
            let fetched = page.rows.len();
            for (idx, mut entry) in page.rows.into_iter().enumerate() {
                if let Some(text) = take_text_field(&mut entry.row, &column, offset + idx)? {
                    texts.push(text);
                }
            }
            offset += fetched;

            // 総件数がない応答では、満杯でないページを最終ページとみなす
            let has_more = match page.num_rows_total {
                Some(total) => offset < total,
                None => fetched == REMOTE_PAGE_SIZE,
            };
            debug!(dataset, offset, total = ?page.num_rows_total, "fetched remote rows page");
            if fetched == 0 || !has_more {
                break;
            }
            page = self.fetch_page(dataset, split, offset).await?;
        }

        Ok(texts)
    }

    async fn fetch_page(&self, dataset: &str, split: &str, offset: usize) -> Result<RowsResponse> {
        let mut url = self
            .base_url
            .join("rows")
            .context("failed to build rows URL")?;
        url.query_pairs_mut()
            .append_pair("dataset", dataset)
            .append_pair("config", &self.config_name)
            .append_pair("split", split)
            .append_pair("offset", &offset.to_string())
            .append_pair("length", &REMOTE_PAGE_SIZE.to_string());

        self.retry
            .run("remote_rows", || {
                let url = url.clone();
                async move { self.request_page(url).await }
            })
            .await
            .with_context(|| format!("failed to fetch rows of {dataset} ({split}) at offset {offset}"))
    }

    async fn request_page(&self, url: Url) -> Result<RowsResponse> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<RowsResponse>().await?)
    }
}

/// 表形式・JSONの読み込み設定。
#[derive(Debug, Clone)]
pub struct LocalSourceOptions {
    pub text_columns: Vec<String>,
    pub json_field: String,
}

impl Default for LocalSourceOptions {
    fn default() -> Self {
        Self {
            text_columns: vec!["dreams_text".to_string(), "text".to_string()],
            json_field: "text".to_string(),
        }
    }
}

#[async_trait]
pub trait LoadStage: Send + Sync {
    async fn load(&self, source: &SourceDescriptor) -> Result<Vec<String>>;
}

/// ソース種別に応じて読み込み方法を切り替える既定の読み込みステージ。
#[derive(Debug, Clone)]
pub struct SourceLoadStage {
    local: LocalSourceOptions,
    remote: RemoteCorpusClient,
}

impl SourceLoadStage {
    #[must_use]
    pub fn new(local: LocalSourceOptions, remote: RemoteCorpusClient) -> Self {
        Self { local, remote }
    }
}

#[async_trait]
impl LoadStage for SourceLoadStage {
    async fn load(&self, source: &SourceDescriptor) -> Result<Vec<String>> {
        match source {
            SourceDescriptor::Tabular { path, delimiter } => {
                let path = path.clone();
                let delimiter = *delimiter;
                let candidates = self.local.text_columns.clone();
                let texts = tokio::task::spawn_blocking(move || load_tabular(&path, delimiter, &candidates))
                    .await
                    .context("tabular load task panicked")??;
                Ok(texts)
            }
            SourceDescriptor::Json { path } => {
                let path = path.clone();
                let field = self.local.json_field.clone();
                let texts = tokio::task::spawn_blocking(move || load_json(&path, &field))
                    .await
                    .context("JSON load task panicked")??;
                Ok(texts)
            }
            SourceDescriptor::Remote { dataset, split } => self.remote.fetch_texts(dataset, split).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn remote_settings(endpoint: String) -> RemoteCorpusSettings {
        RemoteCorpusSettings {
            endpoint,
            config_name: "default".to_string(),
            token: None,
            text_columns: columns(&["report", "text"]),
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff_base_ms: 1,
            backoff_cap_ms: 2,
        }
    }

    #[rstest]
    #[case("dreams.csv", SourceDescriptor::Tabular { path: "dreams.csv".into(), delimiter: b',' })]
    #[case("data/Dreams.CSV", SourceDescriptor::Tabular { path: "data/Dreams.CSV".into(), delimiter: b',' })]
    #[case("dreams.tsv", SourceDescriptor::Tabular { path: "dreams.tsv".into(), delimiter: b'\t' })]
    #[case("dreams.json", SourceDescriptor::Json { path: "dreams.json".into() })]
    #[case("huggingface", SourceDescriptor::Remote {
        dataset: DEFAULT_REMOTE_DATASET.into(),
        split: DEFAULT_REMOTE_SPLIT.into(),
    })]
    #[case("hf://someone/dreams", SourceDescriptor::Remote {
        dataset: "someone/dreams".into(),
        split: "train".into(),
    })]
    #[case("hf://someone/dreams@test", SourceDescriptor::Remote {
        dataset: "someone/dreams".into(),
        split: "test".into(),
    })]
    fn parses_supported_descriptors(#[case] raw: &str, #[case] expected: SourceDescriptor) {
        assert_eq!(SourceDescriptor::parse(raw).expect("supported"), expected);
    }

    #[rstest]
    #[case("dreams.txt")]
    #[case("dreams.parquet")]
    #[case("dreams")]
    #[case("hf://no-owner")]
    #[case("hf://owner/name@")]
    #[case("hf:///name")]
    fn rejects_unsupported_descriptors(#[case] raw: &str) {
        assert!(matches!(
            SourceDescriptor::parse(raw),
            Err(SourceError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn column_priority_follows_candidate_order() {
        let candidates = columns(&["dreams_text", "text"]);
        assert_eq!(select_column(["text", "dreams_text"], &candidates), Some(1));
        assert_eq!(select_column(["id", "text"], &candidates), Some(1));
        assert_eq!(select_column(["id", "body"], &candidates), None);
    }

    #[test]
    fn tabular_prefers_dreams_text_and_drops_empty_cells() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("dreams.csv");
        std::fs::write(
            &file,
            "id,text,dreams_text\n1,ignored,first dream\n2,ignored,\n3,ignored,\"quoted, with comma\"\n4,ignored,   \n",
        )
        .expect("write csv");

        let texts = load_tabular(&file, b',', &columns(&["dreams_text", "text"])).expect("load");
        assert_eq!(texts, vec!["first dream", "quoted, with comma", "   "]);
    }

    #[test]
    fn tabular_falls_back_to_first_column() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("dreams.tsv");
        std::fs::write(&file, "body\tscore\nflying dream\t3\nfalling dream\t1\n").expect("write tsv");

        let texts = load_tabular(&file, b'\t', &columns(&["dreams_text", "text"])).expect("load");
        assert_eq!(texts, vec!["flying dream", "falling dream"]);
    }

    #[test]
    fn tabular_without_header_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("empty.csv");
        std::fs::write(&file, "").expect("write csv");

        assert!(matches!(
            load_tabular(&file, b',', &columns(&["text"])),
            Err(SourceError::EmptyHeader(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let missing = Path::new("/nonexistent/dreams.csv");
        assert!(matches!(
            load_tabular(missing, b',', &columns(&["text"])),
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            load_json(Path::new("/nonexistent/dreams.json"), "text"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn json_drops_missing_and_falsy_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("dreams.json");
        let body = json!([
            {"text": "a dream about the sea"},
            {"other": "no text field"},
            {"text": ""},
            {"text": null},
            {"text": false},
            "not an object",
            {"text": "夢の中で空を飛んだ"}
        ]);
        std::fs::write(&file, body.to_string()).expect("write json");

        let texts = load_json(&file, "text").expect("load");
        assert_eq!(texts, vec!["a dream about the sea", "夢の中で空を飛んだ"]);
    }

    #[test]
    fn json_non_string_field_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("dreams.json");
        std::fs::write(&file, r#"[{"text": "fine"}, {"text": 42}]"#).expect("write json");

        match load_json(&file, "text") {
            Err(SourceError::InvalidFieldType { index, found, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(found, "a number");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn json_object_root_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("dreams.json");
        std::fs::write(&file, r#"{"text": "not in an array"}"#).expect("write json");

        assert!(matches!(
            load_json(&file, "text"),
            Err(SourceError::NotAnArray(_))
        ));
    }

    #[tokio::test]
    async fn remote_fetch_paginates_and_selects_report_column() {
        let server = MockServer::start().await;

        let rows: Vec<Value> = (0..REMOTE_PAGE_SIZE)
            .map(|i| json!({"row_idx": i, "row": {"id": i, "report": format!("dream number {i}")}}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/rows"))
            .and(query_param("dataset", "someone/dreams"))
            .and(query_param("split", "train"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{"feature_idx": 0, "name": "id"}, {"feature_idx": 1, "name": "report"}],
                "rows": rows,
                "num_rows_total": REMOTE_PAGE_SIZE + 2,
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .and(query_param("offset", REMOTE_PAGE_SIZE.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{"feature_idx": 0, "name": "id"}, {"feature_idx": 1, "name": "report"}],
                "rows": [
                    {"row_idx": 100, "row": {"id": 100, "report": null}},
                    {"row_idx": 101, "row": {"id": 101, "report": "last dream"}}
                ],
                "num_rows_total": REMOTE_PAGE_SIZE + 2,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RemoteCorpusClient::new(remote_settings(server.uri())).expect("client");
        let texts = client.fetch_texts("someone/dreams", "train").await.expect("fetch");

        assert_eq!(texts.len(), REMOTE_PAGE_SIZE + 1);
        assert_eq!(texts[0], "dream number 0");
        assert_eq!(texts.last().map(String::as_str), Some("last dream"));
    }

    #[tokio::test]
    async fn remote_fetch_without_total_reads_until_short_page() {
        let server = MockServer::start().await;

        let rows: Vec<Value> = (0..REMOTE_PAGE_SIZE)
            .map(|i| json!({"row_idx": i, "row": {"text": format!("dream number {i}")}}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/rows"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{"feature_idx": 0, "name": "text"}],
                "rows": rows,
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .and(query_param("offset", REMOTE_PAGE_SIZE.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{"feature_idx": 0, "name": "text"}],
                "rows": [
                    {"row_idx": 100, "row": {"text": "second page first"}},
                    {"row_idx": 101, "row": {"text": "second page last"}}
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RemoteCorpusClient::new(remote_settings(server.uri())).expect("client");
        let texts = client.fetch_texts("someone/dreams", "train").await.expect("fetch");

        assert_eq!(texts.len(), REMOTE_PAGE_SIZE + 2);
        assert_eq!(texts[REMOTE_PAGE_SIZE], "second page first");
        assert_eq!(texts.last().map(String::as_str), Some("second page last"));
    }

    #[tokio::test]
    async fn remote_non_string_text_value_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{"feature_idx": 0, "name": "report"}],
                "rows": [
                    {"row_idx": 0, "row": {"report": "a fine dream"}},
                    {"row_idx": 1, "row": {"report": 42}}
                ],
                "num_rows_total": 2,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RemoteCorpusClient::new(remote_settings(server.uri())).expect("client");
        let err = client
            .fetch_texts("someone/dreams", "train")
            .await
            .expect_err("number in text column");

        match err.downcast_ref::<SourceError>() {
            Some(SourceError::InvalidFieldType { index, field, found }) => {
                assert_eq!(*index, 1);
                assert_eq!(field, "report");
                assert_eq!(*found, "a number");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn remote_fetch_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{"feature_idx": 0, "name": "text"}],
                "rows": [{"row_idx": 0, "row": {"text": "recovered"}}],
                "num_rows_total": 1,
            })))
            .mount(&server)
            .await;

        let client = RemoteCorpusClient::new(remote_settings(server.uri())).expect("client");
        let texts = client.fetch_texts("someone/dreams", "train").await.expect("fetch");
        assert_eq!(texts, vec!["recovered"]);
    }

    #[tokio::test]
    async fn remote_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = RemoteCorpusClient::new(remote_settings(server.uri())).expect("client");
        assert!(client.fetch_texts("someone/missing", "train").await.is_err());
    }

    #[tokio::test]
    async fn remote_fetch_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "features": [{"feature_idx": 0, "name": "body"}],
                "rows": [{"row_idx": 0, "row": {"body": "gated dream"}}],
                "num_rows_total": 1,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = remote_settings(server.uri());
        settings.token = Some("secret-token".to_string());
        let client = RemoteCorpusClient::new(settings).expect("client");

        // 候補列がないので先頭列を使う
        let texts = client.fetch_texts("someone/gated", "train").await.expect("fetch");
        assert_eq!(texts, vec!["gated dream"]);
    }

    #[tokio::test]
    async fn load_stage_dispatches_on_descriptor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("dreams.json");
        std::fs::write(&file, r#"[{"text": "from json"}]"#).expect("write json");

        let remote =
            RemoteCorpusClient::new(remote_settings("http://127.0.0.1:9".to_string())).expect("client");
        let stage = SourceLoadStage::new(LocalSourceOptions::default(), remote);
        let descriptor = SourceDescriptor::parse(file.to_str().expect("utf-8 path")).expect("json");

        let texts = stage.load(&descriptor).await.expect("load");
        assert_eq!(texts, vec!["from json"]);
    }
}
