use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use log::{error, info};
use recipe_schema::classifier::{all_passed, check_thresholds, export_model};
use recipe_schema::config::{load_config, PipelineConfig};
use recipe_schema::dataset::{
    build_training_table, evaluate_classifier, export_correction, train_classifier,
    validate_dataset, write_training_table, CorrectionPayload, DocFilter, EvaluationOptions,
    SplitFile, TrainOptions, DOCUMENTS_DIR, LINES_DIR,
};
use recipe_schema::engine::{CommandEngine, ModelEngine, SchemaEngine};
use recipe_schema::model::Label;
use recipe_schema::parity::{
    compare_assembly, compare_labels, evaluate_gate, load_golden_cases, load_rationales,
    run_golden_cases, Rationales,
};
use recipe_schema::regression::run_regression;
use recipe_schema::{load_model, InputSource, RecipeExtractor};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "recipe-schema")]
#[command(about = "Recipe extraction pipeline and line-classifier tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a recipe and print it as JSON
    #[command(group(
        ArgGroup::new("input")
            .required(true)
            .args(["url", "html_file", "text_file", "ocr_text_file", "image"])
    ))]
    Extract {
        /// Recipe page to fetch
        #[arg(long)]
        url: Option<String>,

        /// Saved page markup
        #[arg(long)]
        html_file: Option<PathBuf>,

        /// URL the saved page came from
        #[arg(long, requires = "html_file")]
        source_url: Option<String>,

        /// Caption or pasted recipe text
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// Text recognized by an external OCR engine
        #[arg(long)]
        ocr_text_file: Option<PathBuf>,

        /// Photo to recognize with Google Cloud Vision (needs GOOGLE_API_KEY)
        #[arg(long)]
        image: Option<PathBuf>,

        /// Exported line_classifier.json (defaults to classifier.model_path)
        #[arg(long, env = "RECIPE_SCHEMA_MODEL")]
        model: Option<PathBuf>,
    },

    /// Check document and line fixtures for consistency
    ValidateDataset {
        /// Fixture root holding documents/ and lines/
        #[arg(long)]
        data_dir: PathBuf,
    },

    /// Write the materialized training table as JSONL
    BuildTrainingTable {
        #[arg(long)]
        data_dir: PathBuf,

        /// Output JSONL file
        #[arg(long)]
        out: PathBuf,

        /// Only include docs whose id starts with this prefix (repeatable)
        #[arg(long)]
        include_doc_prefix: Vec<String>,

        /// Exclude docs whose id starts with this prefix (repeatable, defaults to the holdout prefix)
        #[arg(long)]
        exclude_doc_prefix: Vec<String>,
    },

    /// Train the line classifier on a document-level split
    TrainClassifier {
        #[arg(long)]
        data_dir: PathBuf,

        /// Directory receiving line_classifier.json and split.json
        #[arg(long)]
        out_dir: PathBuf,

        #[arg(long)]
        holdout_ratio: Option<f64>,

        /// Mixed into the split hash
        #[arg(long)]
        split_seed: Option<String>,

        #[arg(long)]
        include_doc_prefix: Vec<String>,

        #[arg(long)]
        exclude_doc_prefix: Vec<String>,
    },

    /// Evaluate the classifier on held-out fixtures
    EvaluateClassifier {
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        data_dir: PathBuf,

        /// split.json from training
        #[arg(long)]
        split: Option<PathBuf>,

        /// Optional output JSON report
        #[arg(long)]
        report: Option<PathBuf>,

        #[arg(long)]
        include_doc_prefix: Vec<String>,

        #[arg(long)]
        exclude_doc_prefix: Vec<String>,

        /// Succeed whenever evaluation ran, even if thresholds fail
        #[arg(long)]
        skip_threshold_check: bool,
    },

    /// Bundle a trained model with its manifest
    ExportModel {
        #[arg(long)]
        model: PathBuf,

        /// Bundle directory; a .mlmodel path maps to .mlmodelc
        #[arg(long)]
        out: PathBuf,
    },

    /// Section-level regression metrics over raw recipe texts
    ComputeRegressionMetrics {
        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        regression_dir: PathBuf,

        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Compare two implementations over the fixture corpus
    #[command(group(
        ArgGroup::new("reference")
            .required(true)
            .args(["reference_model", "reference_command"])
    ))]
    CompareImplementations {
        /// Candidate model
        #[arg(long)]
        model: PathBuf,

        /// Reference model run in-process
        #[arg(long)]
        reference_model: Option<PathBuf>,

        /// Reference implementation speaking JSON over stdin/stdout
        #[arg(long)]
        reference_command: Option<String>,

        /// Fixture root holding documents/ and lines/
        #[arg(long)]
        data_dir: PathBuf,

        /// Directory receiving parity_labels.json and parity_assembly.json
        #[arg(long)]
        out_dir: PathBuf,

        /// Golden case file (JSON array)
        #[arg(long)]
        golden: Option<PathBuf>,

        /// JSON object of fixture -> reason for known assembly differences
        #[arg(long)]
        rationales: Option<PathBuf>,

        #[arg(long)]
        threshold: Option<f64>,

        #[arg(long)]
        max_mismatch_docs: Option<usize>,

        /// Exit non-zero when the gate is not green
        #[arg(long)]
        gate: bool,
    },

    /// Turn a correction payload into a fixture pair
    ExportCorrections {
        #[arg(long)]
        input: PathBuf,

        /// Fixture root receiving documents/ and lines/
        #[arg(long)]
        out_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config().context("failed to load configuration")?;

    match cli.command {
        Commands::Extract {
            url,
            html_file,
            source_url,
            text_file,
            ocr_text_file,
            image,
            model,
        } => {
            let source = if let Some(url) = url {
                InputSource::Url(url)
            } else if let Some(path) = html_file {
                InputSource::Html {
                    html: read_text(&path)?,
                    source_url,
                }
            } else if let Some(path) = text_file {
                InputSource::Text(read_text(&path)?)
            } else if let Some(path) = ocr_text_file {
                InputSource::OcrText(read_text(&path)?)
            } else if let Some(path) = image {
                InputSource::Image(path)
            } else {
                bail!("no input given");
            };
            extract(source, model, config)
        }
        Commands::ValidateDataset { data_dir } => validate(&data_dir),
        Commands::BuildTrainingTable {
            data_dir,
            out,
            include_doc_prefix,
            exclude_doc_prefix,
        } => {
            let filter = doc_filter(include_doc_prefix, exclude_doc_prefix, &config.classifier.holdout_prefix);
            let rows = build_training_table(&data_dir, &filter, config.classifier.max_char_ngram)?;
            write_training_table(&out, &rows)?;
            println!("WROTE TRAINING TABLE: {}", out.display());
            println!("Rows: {}", rows.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::TrainClassifier {
            data_dir,
            out_dir,
            holdout_ratio,
            split_seed,
            include_doc_prefix,
            exclude_doc_prefix,
        } => {
            let mut options = TrainOptions::from_config(&config.classifier);
            options.filter = doc_filter(include_doc_prefix, exclude_doc_prefix, &config.classifier.holdout_prefix);
            if let Some(ratio) = holdout_ratio {
                options.holdout_ratio = ratio;
            }
            if let Some(seed) = split_seed {
                options.split_seed = seed;
            }

            let outcome = train_classifier(&data_dir, &out_dir, &options)?;
            println!("TRAINING COMPLETE");
            println!("Model: {}", outcome.model_path.display());
            println!("Split: {}", outcome.split_path.display());
            println!(
                "Train docs: {} | Holdout docs: {}",
                outcome.split.train_docs.len(),
                outcome.split.holdout_docs.len()
            );
            println!(
                "Train rows: {} | Holdout rows: {}",
                outcome.split.train_rows, outcome.split.holdout_rows
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::EvaluateClassifier {
            model,
            data_dir,
            split,
            report,
            include_doc_prefix,
            exclude_doc_prefix,
            skip_threshold_check,
        } => {
            let split = match split.filter(|path| path.exists()) {
                Some(path) => Some(read_json::<SplitFile>(&path)?),
                None => None,
            };
            let options = EvaluationOptions {
                filter: DocFilter {
                    include_prefixes: include_doc_prefix,
                    exclude_prefixes: exclude_doc_prefix,
                },
                split,
                reserved_prefix: config.classifier.holdout_prefix.clone(),
            };
            evaluate(&model, &data_dir, &options, report.as_deref(), skip_threshold_check, &config)
        }
        Commands::ExportModel { model, out } => {
            let exported = export_model(&model, &out)?;
            println!("EXPORT COMPLETE");
            println!("Artifact: {}", exported.bundle_dir.display());
            if exported.bundle_dir != exported.requested {
                println!(
                    "Requested --out={} mapped to compiled artifact directory {}",
                    exported.requested.display(),
                    exported.bundle_dir.display()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::ComputeRegressionMetrics {
            model,
            regression_dir,
            report,
        } => {
            let model = load_model(&model)?;
            let outcome = run_regression(model, &regression_dir, config.normalizer.max_lines)?;
            for case in &outcome.cases {
                println!(
                    "{}: exact_match={} leakage={:.2}% swap={:.2}%",
                    case.name,
                    pass_fail(case.exact_match),
                    case.note_leakage_rate * 100.0,
                    case.swap_rate * 100.0
                );
            }
            println!("REGRESSION METRICS");
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if let Some(path) = report {
                write_report(&path, &outcome)?;
            }
            Ok(exit_code(outcome.passes()))
        }
        Commands::CompareImplementations {
            model,
            reference_model,
            reference_command,
            data_dir,
            out_dir,
            golden,
            rationales,
            threshold,
            max_mismatch_docs,
            gate,
        } => {
            let candidate_model = load_model(&model)?;
            let candidate = ModelEngine::new("candidate", Arc::clone(&candidate_model));
            let reference: Box<dyn SchemaEngine> = match (reference_model, reference_command) {
                (Some(path), _) => Box::new(ModelEngine::new("reference", load_model(&path)?)),
                (None, Some(command)) => Box::new(CommandEngine::from_command_line("reference", &command)?),
                (None, None) => bail!("either --reference-model or --reference-command is required"),
            };

            let threshold = threshold.unwrap_or(config.parity.label_mismatch_threshold);
            let max_docs = max_mismatch_docs.unwrap_or(config.parity.max_mismatch_docs);
            let labels = compare_labels(&candidate, reference.as_ref(), &data_dir.join(LINES_DIR), threshold)?;
            let assembly =
                compare_assembly(&candidate, reference.as_ref(), &data_dir.join(DOCUMENTS_DIR), max_docs)?;
            write_report(&out_dir.join("parity_labels.json"), &labels)?;
            write_report(&out_dir.join("parity_assembly.json"), &assembly)?;

            println!(
                "Label parity: {}/{} ({:.4}%) threshold={:.4}%",
                labels.mismatch_lines,
                labels.total_lines,
                labels.mismatch_rate * 100.0,
                labels.threshold * 100.0
            );
            println!(
                "Assembly parity: {}/{} docs (ingredient={}, step={}, note={})",
                assembly.mismatch_docs,
                assembly.total_fixtures,
                assembly.ingredient_mismatch_docs,
                assembly.step_mismatch_docs,
                assembly.note_mismatch_docs
            );

            let golden_results = match golden {
                Some(path) => {
                    let cases = load_golden_cases(&path)?;
                    run_golden_cases(&cases, candidate_model, config.normalizer.max_lines)
                }
                None => Vec::new(),
            };
            for result in &golden_results {
                println!("Golden {}: {}", result.name, pass_fail(result.passed));
                for failure in &result.failures {
                    println!("  - {failure}");
                }
            }

            let rationales = match rationales {
                Some(path) => load_rationales(&path)?,
                None => Rationales::new(),
            };
            let verdict = evaluate_gate(&labels, &assembly, &rationales, &golden_results);
            for fixture in &verdict.missing_rationales {
                println!("Missing rationale for mismatched fixture {fixture}");
            }
            println!("Parity gate: {}", pass_fail(verdict.passed()));
            println!("Wrote: {}", out_dir.display());

            Ok(exit_code(!gate || verdict.passed()))
        }
        Commands::ExportCorrections { input, out_dir } => {
            let payload: CorrectionPayload = read_json(&input)?;
            let exported = export_correction(&payload, &out_dir)?;
            println!("WROTE {}", exported.document_path.display());
            println!("WROTE {}", exported.lines_path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn extract(source: InputSource, model: Option<PathBuf>, config: PipelineConfig) -> Result<ExitCode> {
    let mut builder = RecipeExtractor::builder().config(config);
    if let Some(path) = model {
        builder = builder.model_path(path);
    }
    let extractor = builder.extractor()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    match runtime.block_on(extractor.extract(&source)) {
        Ok(draft) => {
            println!("{}", serde_json::to_string_pretty(&draft)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Extraction failed: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn validate(data_dir: &Path) -> Result<ExitCode> {
    let report = validate_dataset(data_dir)?;

    println!("DATASET VALIDATION REPORT");
    println!("Data dir: {}", data_dir.display());
    println!("Per-label counts:");
    for label in Label::ALL {
        println!("  {}: {}", label, report.label_counts.get(label.as_str()).unwrap_or(&0));
    }
    println!("Source counts:");
    for (source_type, count) in &report.source_counts {
        println!("  {source_type}: {count}");
    }

    if report.is_valid() {
        println!("VALIDATION PASSED");
        return Ok(ExitCode::SUCCESS);
    }
    println!("VALIDATION FAILED");
    for message in &report.errors {
        println!("  - {message}");
    }
    Ok(ExitCode::FAILURE)
}

fn evaluate(
    model_path: &Path,
    data_dir: &Path,
    options: &EvaluationOptions,
    report: Option<&Path>,
    skip_threshold_check: bool,
    config: &PipelineConfig,
) -> Result<ExitCode> {
    let model = load_model(model_path)?;
    let metrics = evaluate_classifier(model, data_dir, options)?;

    println!("EVALUATION REPORT");
    println!("Prediction count: {}", metrics.prediction_count);
    println!("Macro F1: {:.4}", metrics.macro_f1);
    println!("Macro F1 (present labels): {:.4}", metrics.macro_f1_present_labels);
    println!(
        "Ingredient-vs-step confusion: {:.4}%",
        metrics.ingredient_step_confusion_rate * 100.0
    );
    for (label, class) in &metrics.per_class {
        println!(
            "Class {:>10}: P={:.3} R={:.3} F1={:.3} support={}",
            label.as_str(),
            class.precision,
            class.recall,
            class.f1,
            class.support
        );
    }

    if let Some(path) = report {
        write_report(path, &metrics)?;
        println!("Report JSON: {}", path.display());
    }

    let checks = check_thresholds(&metrics, &config.thresholds);
    println!("Thresholds:");
    for check in &checks {
        let verdict = match check.passed {
            Some(passed) => pass_fail(passed).to_string(),
            None => "N/A (support=0)".to_string(),
        };
        println!("  {} ({:.4} vs {:.4}): {}", check.name, check.value, check.threshold, verdict);
    }

    if skip_threshold_check {
        println!("Threshold enforcement: SKIPPED");
        return Ok(ExitCode::SUCCESS);
    }
    Ok(exit_code(all_passed(&checks)))
}

fn doc_filter(include: Vec<String>, exclude: Vec<String>, holdout_prefix: &str) -> DocFilter {
    DocFilter {
        include_prefixes: include,
        exclude_prefixes: if exclude.is_empty() {
            vec![holdout_prefix.to_string()]
        } else {
            exclude
        },
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn write_report<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let payload = serde_json::to_string_pretty(value)?;
    fs::write(path, payload + "\n").with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn pass_fail(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
