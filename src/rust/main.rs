use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use txn_categorizer::{
    default_budgets, Budget, BudgetLine, BudgetStatus, ClassificationResult, ClassifierInfo, LabelConfig,
    ModelInfo, ModelManager, OptimizationLevel, RuntimeConfig, SpendingLog, TransactionClassifier, DEFAULT_HUB_URL,
};

#[derive(Parser)]
#[command(author, version, about = "Categorize financial transactions", long_about = None)]
struct Args {
    /// Transactions to categorize. Read one per line from stdin when omitted.
    transactions: Vec<String>,

    /// Directory with the fine-tuned adapter (adapter_config.json, model.onnx, tokenizer.json)
    #[arg(long, default_value = "trained_models/finetuned_model")]
    adapter_dir: PathBuf,

    /// JSON file with the category list, colors and base model name
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Base model registry root
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Download the base model into the registry before loading, if missing or unverified
    #[arg(long)]
    download: bool,

    /// Force a fresh download of the base model files (implies --download)
    #[arg(short, long)]
    fresh: bool,

    /// Model hub the base model is downloaded from
    #[arg(long, default_value = DEFAULT_HUB_URL)]
    hub_url: String,

    /// Expected SHA-256 of the base model's model.onnx
    #[arg(long)]
    model_sha256: Option<String>,

    /// Expected SHA-256 of the base model's tokenizer.json
    #[arg(long)]
    tokenizer_sha256: Option<String>,

    /// Budget to monitor, e.g. Food=10000. Repeatable; defaults apply when omitted.
    #[arg(long = "budget", value_name = "CATEGORY=AMOUNT")]
    budgets: Vec<Budget>,

    /// Print the full probability distribution for each transaction
    #[arg(long)]
    scores: bool,

    /// Emit a JSON report instead of tables
    #[arg(long)]
    json: bool,

    /// Longest accepted input, in tokens
    #[arg(long, default_value_t = 512)]
    max_tokens: usize,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    #[arg(long, value_enum, default_value_t = OptimizationLevel::All)]
    optimization: OptimizationLevel,
}

#[derive(Serialize)]
struct CategorySummary<'a> {
    category: String,
    count: usize,
    total: f64,
    color: Option<&'a str>,
}

#[derive(Serialize)]
struct Report<'a> {
    model: ClassifierInfo,
    results: &'a [ClassificationResult],
    categories: Vec<CategorySummary<'a>>,
    budgets: Vec<BudgetLine>,
}

fn read_transactions(args: &Args) -> anyhow::Result<Vec<String>> {
    let raw = if args.transactions.is_empty() {
        io::stdin()
            .lock()
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read transactions from stdin")?
    } else {
        args.transactions.clone()
    };
    Ok(raw
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

async fn ensure_base_model(args: &Args, labels: &LabelConfig) -> anyhow::Result<()> {
    let manager = match &args.models_dir {
        Some(dir) => ModelManager::new(dir)?,
        None => ModelManager::new_default()?,
    };
    let info = ModelInfo::from_hub(&args.hub_url, labels.model_name())
        .with_hashes(args.model_sha256.clone(), args.tokenizer_sha256.clone());

    if args.fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(&info.name)?;
    }
    manager
        .ensure_model_downloaded(&info)
        .await
        .with_context(|| format!("Failed to download base model '{}'", info.name))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let transactions = read_transactions(&args)?;
    if transactions.is_empty() {
        bail!("No transactions given");
    }

    let labels = match &args.labels {
        Some(path) => LabelConfig::from_file(path)?,
        None => LabelConfig::default(),
    };

    if args.download || args.fresh {
        ensure_base_model(&args, &labels).await?;
    }

    let start_time = Instant::now();
    info!("Building classifier...");
    let mut builder = TransactionClassifier::builder()
        .with_labels(labels)
        .with_adapter_dir(&args.adapter_dir)?
        .with_runtime_config(RuntimeConfig {
            intra_threads: args.threads,
            optimization_level: args.optimization,
            max_sequence_length: args.max_tokens,
            ..RuntimeConfig::default()
        });
    if let Some(dir) = &args.models_dir {
        builder = builder.with_models_dir(dir);
    }
    let classifier = builder.build().context("Failed to load a classification model")?;
    info!("Classifier built in {:.2?}", start_time.elapsed());

    let classify_start = Instant::now();
    let mut log = SpendingLog::new();
    log.extend(classifier.categorize(&transactions)?);
    info!(
        "Categorized {} transactions in {:.2?}",
        log.len(),
        classify_start.elapsed()
    );

    let budgets = if args.budgets.is_empty() {
        default_budgets()
    } else {
        args.budgets.clone()
    };
    for budget in &budgets {
        if !classifier.labels().contains(&budget.category) {
            warn!("Budget category '{}' is not a configured category", budget.category);
        }
    }

    if args.json {
        print_json(&classifier, &log, &budgets)
    } else {
        print_tables(&classifier, &log, &budgets, args.scores)
    }
}

fn print_json(classifier: &TransactionClassifier, log: &SpendingLog, budgets: &[Budget]) -> anyhow::Result<()> {
    let counts = log.category_counts();
    let categories = log
        .spending_by_category()
        .into_iter()
        .zip(counts)
        .map(|((category, total), (_, count))| CategorySummary {
            color: classifier.labels().color_for(&category),
            category,
            count,
            total,
        })
        .collect();

    let report = Report {
        model: classifier.info(),
        results: log.records(),
        categories,
        budgets: log.budget_report(budgets),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_tables(
    classifier: &TransactionClassifier,
    log: &SpendingLog,
    budgets: &[Budget],
    show_scores: bool,
) -> anyhow::Result<()> {
    println!("Model: {}", classifier.model_kind());
    println!("\nResults:");
    println!("  {:<45} {:<15} {:>12} {:>10}", "Transaction", "Category", "Amount", "Confidence");
    for result in log.records() {
        println!(
            "  {:<45} {:<15} {:>12.2} {:>10}",
            result.transaction(),
            result.category(),
            result.amount(),
            result.confidence_percent()
        );
        if show_scores {
            let mut scores = classifier.category_scores(result.transaction())?;
            scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            for (label, score) in scores {
                println!("      {}: {:.1}%", label, score * 100.0);
            }
        }
    }

    println!("\nCategory distribution:");
    for (category, count) in log.category_counts() {
        println!("  {:<15} {:>5}", category, count);
    }

    println!("\nSpending by category:");
    for (category, total) in log.spending_by_category() {
        println!("  {:<15} {:>12.2}", category, total);
    }

    println!("\nBudget monitoring:");
    for line in log.budget_report(budgets) {
        println!(
            "  {:<15} {:>10.2} / {:<10.2} {:>5.1}%  {}",
            line.category, line.spent, line.limit, line.progress, line.status
        );
        match line.status {
            BudgetStatus::Approaching => warn!("Approaching budget limit for {}", line.category),
            BudgetStatus::Exceeded { by } => warn!("Budget exceeded for {} by {:.2}", line.category, by),
            BudgetStatus::OnTrack => {}
        }
    }
    Ok(())
}
