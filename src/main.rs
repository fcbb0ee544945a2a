//! keyword-triage
//! --------------
//! One-shot batch tool: read a CSV of flagged keywords, ask an OpenAI-compatible
//! endpoint for a short analysis of each keyword, and write the results back out
//! partitioned by country code.
//!
//! Pipeline:
//!   keywords.csv -> batches -> LLM analyses (parallel, bounded retries) -> merge -> JSON + CSV
//!
//! Failure policy: a batch that exhausts its retries degrades to sentinel
//! "Analysis failed" text instead of aborting the run. Only an unreadable
//! input file or a missing API key is fatal.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::create_dir_all;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ================================
// CLI + Config
// ================================

#[derive(Debug, Parser)]
#[command(name="keyword-triage", version, about="Batch keyword analysis with country-partitioned JSON/CSV outputs")]
struct Cli {
    /// Input CSV of flagged keywords
    #[arg(long, value_name="FILE", required_unless_present = "demo")]
    input: Option<PathBuf>,

    /// Run on a small embedded sample CSV
    #[arg(long, default_value_t = false, conflicts_with = "input")]
    demo: bool,

    /// Output directory (JSON + CSV)
    #[arg(long, value_name="DIR", default_value="./out")]
    out_dir: PathBuf,

    /// Model ID (e.g., gpt-4o, gpt-4o-mini)
    #[arg(long, default_value="gpt-4o")]
    model: String,

    /// Keywords per classification call
    #[arg(long, default_value_t=10)]
    batch_size: usize,

    /// Attempts per batch before recording sentinel analyses
    #[arg(long, default_value_t=3)]
    max_retries: usize,

    /// Max parallel in-flight batches
    #[arg(long, default_value_t=3)]
    concurrency: usize,

    /// Overall HTTP request timeout in seconds (default: 120)
    #[arg(long)]
    timeout_seconds: Option<u64>,

    /// Override the API base URL (e.g., a local gateway)
    #[arg(long, value_name="URL")]
    api_base: Option<String>,
}

#[derive(Debug, Clone)]
struct Config {
    model: String,
    api_base: String,
    batch_size: usize,
    max_retries: usize,
    concurrency: usize,
    out_dir: PathBuf,
    timeout_seconds: u64,
}

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Country code marking a keyword as applicable everywhere.
const ALL_COUNTRIES: &str = "ALL";

/// Recorded for every keyword in a batch whose retries are exhausted.
const ANALYSIS_FAILED: &str = "Analysis failed";

/// Recorded for a keyword the model never answered for.
const NO_ANALYSIS: &str = "No analysis available";

const SAMPLE_KEYWORDS: &str = include_str!("../sample_keywords.csv");

// ================================
// Errors
// ================================

#[derive(Debug, Error)]
enum LoadError {
    #[error("failed to read input CSV: {0}")]
    Read(#[from] csv::Error),
    #[error("input CSV is missing a required {0} column")]
    MissingColumn(&'static str),
}

/// The schema-validated reply could not be deserialized; triggers one
/// degraded JSON-text call within the same attempt.
#[derive(Debug, Error)]
#[error("structured reply did not match the analyses schema: {0}")]
struct StructuredParseError(String);

#[derive(Debug, Error)]
enum AdapterError {
    #[error("classification request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("classification endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("could not locate reply text in response payload")]
    NoReplyText,
    #[error("fallback reply was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply JSON has no 'analyses' key")]
    MissingAnalyses,
}

#[derive(Debug, Error)]
enum WriteError {
    #[error("failed to write {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to encode {path:?}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("failed to serialize {path:?}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

// ================================
// Data model
// ================================

/// One input row. The keyword is the correlation key used to join analyses
/// back onto rows; the remaining fields are carried through unchanged.
#[derive(Debug, Clone, PartialEq)]
struct KeywordRecord {
    keyword: String,
    reason: String,
    country_code: String,
    valid_country_codes: String,
    country: String,
    compliance_region: String,
}

/// Reply shape we ask the model for (strict when schema mode works).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeywordAnalyses {
    analyses: Vec<AnalysisEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnalysisEntry {
    keyword: String,
    analysis: String,
}

// ================================
// Row loading
// ================================

/// Column indices resolved from the header row. The source sheets disagree on
/// header spelling ("Keyword" vs "keyword", "Reason_to_Flag" vs "reason",
/// "Country_Code" vs "valid_country_code", "Compliance _Region" with a stray
/// space), so headers are matched after stripping everything but letters and
/// digits.
#[derive(Debug)]
struct ColumnMap {
    keyword: usize,
    reason: usize,
    country_code: Option<usize>,
    valid_country_codes: Option<usize>,
    country: Option<usize>,
    compliance_region: Option<usize>,
}

fn canonical(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| names.contains(&canonical(header).as_str()))
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        Ok(Self {
            keyword: find_column(headers, &["keyword"])
                .ok_or(LoadError::MissingColumn("keyword"))?,
            reason: find_column(headers, &["reasontoflag", "reason"])
                .ok_or(LoadError::MissingColumn("reason for flag"))?,
            country_code: find_column(headers, &["countrycode", "validcountrycode"]),
            valid_country_codes: find_column(headers, &["validcountrycodes"]),
            country: find_column(headers, &["country"]),
            compliance_region: find_column(headers, &["complianceregion"]),
        })
    }
}

fn field(row: &csv::StringRecord, index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .unwrap_or("")
        .trim()
        .to_string()
}

fn load_records(path: &Path) -> Result<Vec<KeywordRecord>, LoadError> {
    let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    read_records(reader)
}

/// Rows with an empty keyword (after trimming) are skipped; missing optional
/// cells become empty strings.
fn read_records<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<KeywordRecord>, LoadError> {
    let headers = reader.headers()?.clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let keyword = field(&row, Some(columns.keyword));
        if keyword.is_empty() {
            continue;
        }
        records.push(KeywordRecord {
            keyword,
            reason: field(&row, Some(columns.reason)),
            country_code: field(&row, columns.country_code),
            valid_country_codes: field(&row, columns.valid_country_codes),
            country: field(&row, columns.country),
            compliance_region: field(&row, columns.compliance_region),
        });
    }
    Ok(records)
}

// ================================
// Batching
// ================================

/// Fixed-size batches preserving input order; concatenation of the output
/// equals the input exactly.
fn split_batches(records: &[KeywordRecord], batch_size: usize) -> Result<Vec<&[KeywordRecord]>> {
    anyhow::ensure!(batch_size > 0, "batch size must be at least 1");
    Ok(records.chunks(batch_size).collect())
}

// ================================
// Prompt building
// ================================

const SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes keywords and their reasons for \
    flagging. Your task is to analyze each keyword and provide a brief analysis. \
    You ONLY return JSON matching the requested shape.";

/// Render one batch as the user prompt: numbered entries with the keyword,
/// flag reason, and any present hints, followed by the expected reply shape.
fn build_batch_prompt(batch: &[KeywordRecord]) -> String {
    let mut prompt = String::from("Keywords to analyze:\n\n");

    for (i, record) in batch.iter().enumerate() {
        prompt.push_str(&format!("{}. Keyword: {}\n", i + 1, record.keyword));
        prompt.push_str(&format!("   Reason: {}\n", record.reason));
        if !record.valid_country_codes.is_empty() {
            prompt.push_str(&format!("   Valid Country Codes: {}\n", record.valid_country_codes));
        }
        if !record.country.is_empty() {
            prompt.push_str(&format!("   Country: {}\n", record.country));
        }
        if !record.compliance_region.is_empty() {
            prompt.push_str(&format!("   Compliance Region: {}\n", record.compliance_region));
        }
        if !record.country_code.is_empty() {
            prompt.push_str(&format!("   Country Code: {}\n", record.country_code));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "Respond with JSON in the following format:\n\
        {\n\
        \x20 \"analyses\": [\n\
        \x20   {\"keyword\": \"keyword1\", \"analysis\": \"analysis text\"},\n\
        \x20   {\"keyword\": \"keyword2\", \"analysis\": \"analysis text\"}\n\
        \x20 ]\n\
        }",
    );
    prompt
}

// ================================
/* Classification adapter (Responses API)

   One attempt is up to two HTTP calls:
     1. schema mode  - strict json_schema reply, deserialized into KeywordAnalyses
     2. on StructuredParseError, text mode - json_object reply, probed for "analyses"
   Transport errors and HTTP error statuses are NOT retried here; the retry
   controller owns recovery.
*/

enum ReplyFormat {
    Schema,
    JsonText,
}

fn analyses_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "analyses": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "keyword": {"type": "string"},
                        "analysis": {"type": "string"}
                    },
                    "required": ["keyword", "analysis"]
                }
            }
        },
        "required": ["analyses"]
    })
}

async fn request_reply(
    client: &Client,
    cfg: &Config,
    api_key: &str,
    prompt: &str,
    format: ReplyFormat,
) -> Result<Value, AdapterError> {
    let format_block = match format {
        ReplyFormat::Schema => json!({
            "format": {
                "type": "json_schema",
                "name": "keyword_analyses",
                "schema": analyses_schema(),
                "strict": true
            }
        }),
        ReplyFormat::JsonText => json!({
            "format": { "type": "json_object" }
        }),
    };

    let body = json!({
        "model": cfg.model,
        "input": [
            {
                "role": "system",
                "content": [{ "type": "input_text", "text": SYSTEM_PROMPT }]
            },
            {
                "role": "user",
                "content": [{ "type": "input_text", "text": prompt }]
            }
        ],
        "text": format_block
    });

    let url = format!("{}/responses", cfg.api_base.trim_end_matches('/'));
    let resp = client.post(&url).bearer_auth(api_key).json(&body).send().await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AdapterError::Status { status, body });
    }
    Ok(resp.json().await?)
}

/// Locate the model's reply text inside the Responses API envelope:
/// `output[].content[]` with `type == "output_text"`, or top-level `output_text`.
fn reply_text(reply: &Value) -> Option<String> {
    if let Some(items) = reply.get("output").and_then(Value::as_array) {
        for item in items {
            if let Some(contents) = item.get("content").and_then(Value::as_array) {
                for content in contents {
                    if content.get("type").and_then(Value::as_str) == Some("output_text") {
                        if let Some(text) = content.get("text").and_then(Value::as_str) {
                            return Some(text.to_string());
                        }
                    }
                }
            }
        }
    }
    reply.get("output_text").and_then(Value::as_str).map(str::to_string)
}

fn parse_structured(reply: &Value) -> Result<KeywordAnalyses, StructuredParseError> {
    let text = reply_text(reply)
        .ok_or_else(|| StructuredParseError("no output text in reply".to_string()))?;
    serde_json::from_str(&text).map_err(|err| StructuredParseError(err.to_string()))
}

/// Degraded-mode parse: raw JSON text probed for the `analyses` key.
fn parse_degraded(reply: &Value) -> Result<HashMap<String, String>, AdapterError> {
    let text = reply_text(reply).ok_or(AdapterError::NoReplyText)?;
    let parsed: Value = serde_json::from_str(&text)?;
    let entries = parsed
        .get("analyses")
        .and_then(Value::as_array)
        .ok_or(AdapterError::MissingAnalyses)?;

    let mut analyses = HashMap::new();
    for entry in entries {
        let keyword = entry.get("keyword").and_then(Value::as_str).unwrap_or("").trim();
        let analysis = entry.get("analysis").and_then(Value::as_str).unwrap_or("");
        if !keyword.is_empty() {
            analyses.insert(keyword.to_string(), analysis.to_string());
        }
    }
    Ok(analyses)
}

fn to_analysis_map(entries: Vec<AnalysisEntry>) -> HashMap<String, String> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let keyword = entry.keyword.trim().to_string();
            (!keyword.is_empty()).then_some((keyword, entry.analysis))
        })
        .collect()
}

/// One classification attempt for a rendered batch prompt.
async fn classify_batch(
    client: &Client,
    cfg: &Config,
    api_key: &str,
    prompt: &str,
) -> Result<HashMap<String, String>, AdapterError> {
    let reply = request_reply(client, cfg, api_key, prompt, ReplyFormat::Schema).await?;
    match parse_structured(&reply) {
        Ok(parsed) => Ok(to_analysis_map(parsed.analyses)),
        Err(err) => {
            warn!("⚠️ {err}; retrying in JSON text mode");
            let reply = request_reply(client, cfg, api_key, prompt, ReplyFormat::JsonText).await?;
            parse_degraded(&reply)
        }
    }
}

// ================================
// Retry controller
// ================================

/// Call the adapter up to `max_retries` times with exponential backoff
/// (1s, 2s, 4s, ...). Success returns the mapping restricted to this batch's
/// own keywords; exhaustion returns the sentinel text for every keyword.
/// Never propagates an error - total failure is data, not an exception.
fn analyze_batch_with_retry<C, S>(
    batch: &[KeywordRecord],
    max_retries: usize,
    mut call: C,
    mut sleep: S,
) -> HashMap<String, String>
where
    C: FnMut() -> Result<HashMap<String, String>, AdapterError>,
    S: FnMut(Duration),
{
    let keywords: HashSet<&str> = batch.iter().map(|r| r.keyword.as_str()).collect();

    for attempt in 0..max_retries {
        match call() {
            Ok(mut analyses) => {
                analyses.retain(|keyword, _| keywords.contains(keyword.as_str()));
                return analyses;
            }
            Err(err) => {
                warn!(
                    "⚠️ Classification attempt {} of {} failed: {err}",
                    attempt + 1,
                    max_retries
                );
                if attempt + 1 < max_retries {
                    sleep(Duration::from_secs(1u64 << attempt));
                }
            }
        }
    }

    error!(
        "❌ Batch of {} keywords failed after {max_retries} attempts; recording sentinel analyses",
        batch.len()
    );
    batch
        .iter()
        .map(|r| (r.keyword.clone(), ANALYSIS_FAILED.to_string()))
        .collect()
}

// ================================
// Batch orchestration
// ================================

/// Run every batch through `process` on a capped worker pool and merge the
/// per-batch mappings. Rayon's collect preserves submission order, so the
/// merge is index-ordered regardless of completion timing: on duplicate
/// keywords the batch with the higher original index wins.
fn process_batches<F>(
    batches: &[&[KeywordRecord]],
    concurrency: usize,
    process: F,
) -> Result<HashMap<String, String>>
where
    F: Fn(&[KeywordRecord]) -> HashMap<String, String> + Send + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .build()
        .context("failed to build worker pool")?;

    let per_batch: Vec<HashMap<String, String>> =
        pool.install(|| batches.par_iter().map(|batch| process(batch)).collect());

    Ok(merge_batch_results(per_batch))
}

fn merge_batch_results(per_batch: Vec<HashMap<String, String>>) -> HashMap<String, String> {
    let mut merged = HashMap::new();
    for analyses in per_batch {
        merged.extend(analyses);
    }
    merged
}

// ================================
// Result assembly + writers
// ================================

#[derive(Debug)]
struct CountryOutputs {
    /// Sorted distinct country codes, excluding "ALL" and blanks.
    countries: Vec<String>,
    /// Country code -> keywords. "ALL" is always present; every seen code is
    /// present even when its list is empty.
    partitions: BTreeMap<String, Vec<String>>,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Join analyses back onto rows and group by country code. "ALL" rows come
/// first and carry the ALL marker in every country column; other rows mark
/// their own country with YES. Rows with a blank country code appear in the
/// CSV only, never in the JSON partitions.
fn assemble_outputs(
    records: &[KeywordRecord],
    analyses: &HashMap<String, String>,
) -> CountryOutputs {
    let countries: Vec<String> = records
        .iter()
        .map(|r| r.country_code.as_str())
        .filter(|code| !code.is_empty() && *code != ALL_COUNTRIES)
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut partitions: BTreeMap<String, Vec<String>> = countries
        .iter()
        .map(|code| (code.clone(), Vec::new()))
        .collect();
    partitions.insert(ALL_COUNTRIES.to_string(), Vec::new());

    let mut header = vec!["Keyword".to_string(), "Reason".to_string(), "Analysis".to_string()];
    header.extend(countries.iter().cloned());

    let lookup = |record: &KeywordRecord| {
        analyses
            .get(&record.keyword)
            .cloned()
            .unwrap_or_else(|| NO_ANALYSIS.to_string())
    };

    let mut rows = Vec::new();

    for record in records.iter().filter(|r| r.country_code == ALL_COUNTRIES) {
        partitions
            .get_mut(ALL_COUNTRIES)
            .expect("ALL partition is always present")
            .push(record.keyword.clone());

        let mut row = vec![record.keyword.clone(), record.reason.clone(), lookup(record)];
        row.extend(countries.iter().map(|_| ALL_COUNTRIES.to_string()));
        rows.push(row);
    }

    for record in records.iter().filter(|r| r.country_code != ALL_COUNTRIES) {
        if let Some(bucket) = partitions.get_mut(&record.country_code) {
            bucket.push(record.keyword.clone());
        }

        let mut row = vec![record.keyword.clone(), record.reason.clone(), lookup(record)];
        row.extend(countries.iter().map(|code| {
            if *code == record.country_code {
                "YES".to_string()
            } else {
                String::new()
            }
        }));
        rows.push(row);
    }

    CountryOutputs { countries, partitions, header, rows }
}

fn write_partition_json(
    partitions: &BTreeMap<String, Vec<String>>,
    path: &Path,
) -> Result<(), WriteError> {
    let payload = serde_json::to_string_pretty(partitions)
        .map_err(|source| WriteError::Json { path: path.to_path_buf(), source })?;
    std::fs::write(path, payload)
        .map_err(|source| WriteError::Io { path: path.to_path_buf(), source })
}

fn write_marker_csv(outputs: &CountryOutputs, path: &Path) -> Result<(), WriteError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|source| WriteError::Csv { path: path.to_path_buf(), source })?;
    writer
        .write_record(&outputs.header)
        .map_err(|source| WriteError::Csv { path: path.to_path_buf(), source })?;
    for row in &outputs.rows {
        writer
            .write_record(row)
            .map_err(|source| WriteError::Csv { path: path.to_path_buf(), source })?;
    }
    writer
        .flush()
        .map_err(|source| WriteError::Io { path: path.to_path_buf(), source })
}

// ================================
// Main
// ================================

#[tokio::main]
async fn main() -> Result<()> {
    // ---- Logging setup ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    // ---- Resolve API key ----
    dotenvy::dotenv().ok();
    let api_key = std::env::var("OPENAI_API_KEY")
        .context("Missing OPENAI_API_KEY env var. Set it before running.")?;

    // ---- Load input rows ----
    let records = if cli.demo {
        info!("📄 Using embedded sample keywords");
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(SAMPLE_KEYWORDS.as_bytes());
        read_records(reader)?
    } else {
        let input = cli.input.as_ref().expect("input required unless --demo");
        info!("📄 Reading keywords from {}", input.display());
        load_records(input).with_context(|| format!("failed to load {}", input.display()))?
    };

    if records.is_empty() {
        warn!("No keywords found in input. Nothing to do.");
        return Ok(());
    }

    // ---- Prepare config ----
    let cfg = Config {
        model: cli.model,
        api_base: cli.api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        batch_size: cli.batch_size,
        max_retries: cli.max_retries,
        concurrency: cli.concurrency,
        out_dir: cli.out_dir,
        timeout_seconds: cli.timeout_seconds.unwrap_or(120),
    };

    create_dir_all(&cfg.out_dir).context("failed to create out-dir")?;
    let json_path = cfg.out_dir.join("violation_patterns.json");
    let csv_path = cfg.out_dir.join("violation_patterns.csv");

    info!("🧠 Model: {}", cfg.model);
    info!(
        "⚙️  BatchSize={}, MaxRetries={}, Concurrency={}",
        cfg.batch_size, cfg.max_retries, cfg.concurrency
    );

    // ---- Batch input ----
    let batches = split_batches(&records, cfg.batch_size)?;
    info!("🪓 Processing {} keywords in {} batches", records.len(), batches.len());

    // ---- Progress bar ----
    let pb = ProgressBar::new(batches.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("analyzing…");

    // ---- HTTP client ----
    let client = Client::builder()
        .gzip(true)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(cfg.timeout_seconds))
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .context("HTTP client build failed")?;

    // ---- Dispatch batches across the worker pool ----
    let analyses = process_batches(&batches, cfg.concurrency, |batch| {
        let prompt = build_batch_prompt(batch);

        // BLOCK ON async calls inside the rayon worker:
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("tokio rt");

        let result = analyze_batch_with_retry(
            batch,
            cfg.max_retries,
            || rt.block_on(classify_batch(&client, &cfg, &api_key, &prompt)),
            |delay| thread::sleep(delay),
        );
        pb.inc(1);
        result
    })?;

    pb.finish_with_message("done");
    info!("🧮 Completed analysis for {} keywords", analyses.len());

    // ---- Assemble + write outputs ----
    let outputs = assemble_outputs(&records, &analyses);

    let mut write_failed = false;
    match write_partition_json(&outputs.partitions, &json_path) {
        Ok(()) => info!("💾 JSON: {}", json_path.display()),
        Err(err) => {
            error!("❌ {err}");
            write_failed = true;
        }
    }
    match write_marker_csv(&outputs, &csv_path) {
        Ok(()) => info!("💾 CSV:  {}", csv_path.display()),
        Err(err) => {
            error!("❌ {err}");
            write_failed = true;
        }
    }

    // ---- Statistics ----
    let all_count = outputs.partitions.get(ALL_COUNTRIES).map_or(0, Vec::len);
    let country_count: usize = outputs
        .countries
        .iter()
        .filter_map(|code| outputs.partitions.get(code))
        .map(Vec::len)
        .sum();
    info!("📊 Keywords applicable to ALL countries: {all_count}");
    info!("📊 Country-specific keywords: {country_count}");
    info!("📊 Countries covered: {:?}", outputs.partitions.keys().collect::<Vec<_>>());

    anyhow::ensure!(!write_failed, "one or more output artifacts could not be written");
    info!("✅ All done.");
    Ok(())
}

// ================================
// Tests
// ================================
