// ringscan/src/main.rs
//
// Ringscan: survey response-integrity analysis over a JSONL snapshot.
//
// Three subcommands:
//   analyze  fraud-ring verdict per survey (all surveys in the file by default)
//   assess   per-response fingerprint annotation (fraud score, flag reasons)
//   similar  near-duplicate devices for one fingerprint within one survey
//
// Usage:
//   ringscan analyze --path responses.jsonl --pretty
//   ringscan analyze --path responses.jsonl --survey s-42 --now 2026-05-01T12:00:00Z
//   ringscan assess  --path responses.jsonl
//   ringscan similar --path responses.jsonl --survey s-42 --fingerprint fp.json
//
// Results go to stdout as one JSON object per line; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ringscan::fingerprint::assess::assess_response;
use ringscan::fingerprint::index::find_similar;
use ringscan::{
    AnalysisConfig, ClusteringMode, DeviceFingerprint, FraudRingAggregator, FraudRingAnalysis,
    MemoryRepository, ResponseQuery, ResponseRepository, RiskLevel, SurveyResponse,
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "ringscan",
    about   = "Device fingerprint scoring and fraud ring detection for survey responses",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "JSON config file (camelCase keys)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Minimum responses for a suspicious group")]
    min_group_size: Option<usize>,

    #[arg(long, global = true, help = "Similarity threshold for answer/device/behavior grouping")]
    similarity_threshold: Option<f64>,

    #[arg(long, global = true, help = "Analysis window in hours")]
    window_hours: Option<i64>,

    #[arg(long, global = true, value_enum)]
    clustering: Option<ClusteringMode>,

    #[arg(long, global = true, help = "Pin the analysis clock (RFC 3339)")]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Command {
    /// Fraud-ring verdict per survey
    Analyze {
        #[arg(long, help = "JSONL file of survey responses")]
        path: PathBuf,

        #[arg(long = "survey", help = "Survey id to analyze (repeatable, default all)")]
        surveys: Vec<String>,

        #[arg(long, help = "Coloured summary on stderr")]
        pretty: bool,
    },

    /// Per-response fingerprint annotation
    Assess {
        #[arg(long)]
        path: PathBuf,
    },

    /// Near-duplicate devices for one fingerprint
    Similar {
        #[arg(long)]
        path: PathBuf,

        #[arg(long)]
        survey: String,

        #[arg(long, help = "JSON file holding the target device fingerprint")]
        fingerprint: PathBuf,

        #[arg(long, help = "Similarity floor (default: nearDuplicateThreshold)")]
        threshold: Option<f64>,
    },
}

impl Cli {
    fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut cfg = match &self.config {
            Some(p) => AnalysisConfig::from_file(p)
                .with_context(|| format!("loading config {}", p.display()))?,
            None => AnalysisConfig::default(),
        };

        if let Some(n) = self.min_group_size       { cfg.min_group_size       = n; }
        if let Some(t) = self.similarity_threshold { cfg.similarity_threshold = t; }
        if let Some(h) = self.window_hours         { cfg.time_window_hours    = h; }
        if let Some(m) = self.clustering           { cfg.clustering           = m; }

        cfg.validate().context("invalid analysis config")?;
        Ok(cfg)
    }
}

/// One `analyze` output line.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SurveyVerdict<'a> {
    survey_id: &'a str,
    analysis:  &'a FraudRingAnalysis,
}

// ── Snapshot loading ──────────────────────────────────────────────────────────

async fn load_snapshot(path: &Path) -> Result<MemoryRepository> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let repo      = MemoryRepository::new();
    let mut n     = 0usize;

    while let Some(line) = lines.next_line().await? {
        n += 1;
        let line = line.trim();
        if line.is_empty() { continue; }
        match serde_json::from_str::<SurveyResponse>(line) {
            Ok(r)  => repo.insert(r),
            Err(e) => warn!("{}:{}: skipping malformed response: {}", path.display(), n, e),
        }
    }

    info!("Loaded {} responses across {} surveys from {}",
          repo.total_responses.load(std::sync::atomic::Ordering::Relaxed),
          repo.n_surveys(),
          path.display());
    Ok(repo)
}

// ── Terminal output ───────────────────────────────────────────────────────────

fn print_summary(survey_id: &str, analysis: &FraudRingAnalysis) {
    let (color, label) = if analysis.is_fraud_ring {
        ("\x1b[91;1m", "FRAUD RING")
    } else if !analysis.patterns.is_empty() {
        ("\x1b[93;1m", "SUSPICIOUS")
    } else {
        ("\x1b[92m", "CLEAN")
    };
    let reset = "\x1b[0m";

    eprintln!("\n{}{} {}{}", color, label, survey_id, reset);
    eprintln!("  Confidence: {}{:.3}{}", color, analysis.confidence, reset);
    eprintln!("  Ring size : {}", analysis.ring_size);
    for p in &analysis.patterns {
        eprintln!("  Pattern   : [{}] {} ({}, {:.2})", p.severity, p.description, p.pattern_type, p.confidence);
    }
    for g in &analysis.suspicious_groups {
        let tint = match g.risk_level {
            RiskLevel::High   => "\x1b[91m",
            RiskLevel::Medium => "\x1b[93m",
            RiskLevel::Low    => "\x1b[90m",
        };
        let kinds = g.shared_attribute_types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(",");
        eprintln!("  Group     : {}{}{} n={} sim={:.2} [{}]",
                  tint, g.risk_level, reset, g.response_ids.len(), g.similarity_score, kinds);
    }
}

// ── Subcommands ───────────────────────────────────────────────────────────────

async fn run_analyze(
    cfg:     AnalysisConfig,
    now:     DateTime<Utc>,
    path:    &Path,
    surveys: Vec<String>,
    pretty:  bool,
) -> Result<()> {
    let repo = Arc::new(load_snapshot(path).await?);
    let agg  = Arc::new(FraudRingAggregator::new(cfg)?);

    let surveys = if surveys.is_empty() { repo.survey_ids() } else { surveys };

    // One blocking task per survey; no cross-survey state.
    let handles: Vec<_> = surveys.into_iter()
        .map(|survey_id| {
            let repo = Arc::clone(&repo);
            let agg  = Arc::clone(&agg);
            tokio::task::spawn_blocking(move || {
                let analysis = agg.analyze_at(repo.as_ref(), &survey_id, now);
                (survey_id, analysis)
            })
        })
        .collect();

    for h in handles {
        let (survey_id, analysis) = h.await.context("analysis task failed")?;
        if pretty {
            print_summary(&survey_id, &analysis);
        }
        let line = SurveyVerdict { survey_id: &survey_id, analysis: &analysis };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}

async fn run_assess(cfg: AnalysisConfig, path: &Path) -> Result<()> {
    let repo = load_snapshot(path).await?;
    for survey_id in repo.survey_ids() {
        let responses = repo.fetch(&ResponseQuery::survey(&survey_id))?;
        for r in &responses {
            let annotation = assess_response(&repo, r, &cfg);
            println!("{}", serde_json::to_string(&annotation)?);
        }
    }
    Ok(())
}

async fn run_similar(
    cfg:         AnalysisConfig,
    path:        &Path,
    survey_id:   &str,
    fingerprint: &Path,
    threshold:   Option<f64>,
) -> Result<()> {
    let repo = load_snapshot(path).await?;
    let raw  = tokio::fs::read_to_string(fingerprint)
        .await
        .with_context(|| format!("reading {}", fingerprint.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", fingerprint.display()))?;
    let target = DeviceFingerprint::from_value(&value)
        .with_context(|| format!("decoding fingerprint {}", fingerprint.display()))?;

    let threshold = threshold.unwrap_or(cfg.near_duplicate_threshold);
    anyhow::ensure!((0.0..=1.0).contains(&threshold), "--threshold must lie in [0, 1]");

    let out = find_similar(&repo, &target, survey_id, threshold, cfg.near_duplicate_limit);
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("ringscan=info".parse()?))
        .with_writer(std::io::stderr)
        .compact().init();

    let cli = Cli::parse();
    let cfg = cli.analysis_config()?;
    let now = cli.now.unwrap_or_else(Utc::now);

    match cli.command {
        Command::Analyze { path, surveys, pretty } => {
            run_analyze(cfg, now, &path, surveys, pretty).await
        }
        Command::Assess { path } => run_assess(cfg, &path).await,
        Command::Similar { path, survey, fingerprint, threshold } => {
            run_similar(cfg, &path, &survey, &fingerprint, threshold).await
        }
    }
}
