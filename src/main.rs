//! hashedml: hash-keyed associative memory CLI.
//!
//! `classify` trains on one CSV and reports accuracy on another;
//! `generate` trains on text files and continues a seed phrase.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hashedml::config::GENERATE_NBACK;
use hashedml::text::corpus::{read_csv, seed_tokens, training_windows, Corpus};
use hashedml::text::tokenize::Tokenizer;
use hashedml::{GenerateOptions, HashedMl, ModelConfig};

/// Hash-based classification and text generation.
#[derive(Parser, Debug)]
#[command(name = "hashedml", about = "Hash based machine learning", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train on a CSV (features..., label) and test on another.
    Classify {
        /// Training CSV.
        train: PathBuf,

        /// Test CSV.
        test: PathBuf,

        /// RNG seed for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,

        /// Print the accuracy report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Print every fingerprint and bucket after training.
        #[arg(long, default_value_t = false)]
        dump: bool,
    },

    /// Train on text files and generate a continuation of a seed phrase.
    Generate {
        /// Appended after every generated token.
        separator: String,

        /// Number of generation steps.
        word_count: usize,

        /// Seed phrase, split on spaces.
        seed_text: String,

        /// Training text files.
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Context width.
        #[arg(long, default_value_t = GENERATE_NBACK)]
        nback: usize,

        /// RNG seed for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,

        /// Disable the short-term-memory loop escape.
        #[arg(long, default_value_t = false)]
        no_stm: bool,

        /// Print every fingerprint and bucket after training.
        #[arg(long, default_value_t = false)]
        dump: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only results.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    tracing::debug!("hashedml v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Classify {
            train,
            test,
            seed,
            json,
            dump,
        } => {
            let config = ModelConfig {
                seed,
                ..Default::default()
            };
            run_classify(&train, &test, config, json, dump)
        }
        Command::Generate {
            separator,
            word_count,
            seed_text,
            inputs,
            nback,
            seed,
            no_stm,
            dump,
        } => {
            let options = GenerateOptions {
                nwords: word_count,
                stm: !no_stm,
                separator,
            };
            let config = ModelConfig {
                nback,
                seed,
                ..Default::default()
            };
            run_generate(&seed_text, &inputs, config, &options, dump)
        }
    }
}

fn run_classify(
    train: &Path,
    test: &Path,
    config: ModelConfig,
    json: bool,
    dump: bool,
) -> Result<()> {
    let mut model = HashedMl::with_config(config)?;

    let train_rows = read_csv(train)?;
    tracing::info!("Training on {} rows from {}", train_rows.len(), train.display());
    for (features, label) in &train_rows {
        model.fit(features, label);
    }
    if dump {
        print!("{}", model.dump_map());
    }

    let test_rows = read_csv(test)?;
    tracing::info!("Testing on {} rows from {}", test_rows.len(), test.display());
    for (features, label) in &test_rows {
        model
            .test(features, label)
            .with_context(|| format!("failed to test row {:?}", features))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(model.test_report())?);
    } else {
        println!("accuracy: {:.2}%", model.accuracy() * 100.0);
    }
    Ok(())
}

fn run_generate(
    seed_text: &str,
    inputs: &[PathBuf],
    config: ModelConfig,
    options: &GenerateOptions,
    dump: bool,
) -> Result<()> {
    let mut model = HashedMl::with_config(config)?;
    let nback = model.nback();

    let tokenizer = Tokenizer::new()?;
    let corpus = Corpus::load(&tokenizer, inputs);
    if !corpus.skipped.is_empty() {
        tracing::warn!("{} input file(s) skipped", corpus.skipped.len());
    }

    let samples = training_windows(&corpus.tokens, nback);
    tracing::info!(
        "Training on {} windows ({} tokens, nback={})",
        samples.len(),
        corpus.tokens.len(),
        nback,
    );
    for (features, label) in &samples {
        model.fit(features, label);
    }
    if dump {
        print!("{}", model.dump_map());
    }

    let seed = seed_tokens(seed_text, nback - 1);
    let output = model
        .generate(seed, options)
        .context("generation failed")?;

    let stats = model.generation_stats();
    tracing::info!(
        "Generated {} steps ({} dropped as repeats, {} escapes)",
        stats.steps,
        stats.rejected_repetitions,
        stats.escapes,
    );

    println!("output:");
    println!("{}", output);
    Ok(())
}
