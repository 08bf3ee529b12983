//! Load train and dev treebanks the way a sentiment tree model sees them
//!
//! Reads the training split with growing dictionaries, freezes them, reads
//! the dev split against the frozen dictionaries and reports the embedding
//! table sizes.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use sentitree::{FieldDelimiter, ReaderConfig, Vocabularies, read_treebank_with_config};
use std::path::PathBuf;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Delimiter {
    Tab,
    Whitespace,
}

impl From<Delimiter> for FieldDelimiter {
    fn from(d: Delimiter) -> Self {
        match d {
            Delimiter::Tab => FieldDelimiter::Tab,
            Delimiter::Whitespace => FieldDelimiter::Whitespace,
        }
    }
}

/// CLI arguments
#[derive(Parser)]
#[command(name = "sentitree")]
#[command(about = "Read sentiment treebanks into dependency trees and symbol dictionaries")]
#[command(version)]
struct Cli {
    /// Training treebank (plain or gzipped)
    train: PathBuf,

    /// Development treebank (plain or gzipped)
    dev: PathBuf,

    /// Token that unseen dev words map to
    #[arg(long, default_value = "UNK")]
    unknown: String,

    /// Field delimiter; runs of delimiters count as one
    #[arg(long, value_enum, default_value_t = Delimiter::Tab)]
    delimiter: Delimiter,

    /// Index of the dev tree to dump to stderr
    #[arg(long, default_value_t = 0)]
    dump: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = ReaderConfig {
        delimiter: cli.delimiter.into(),
    };
    let mut vocab = Vocabularies::new();

    info!("Reading training data from {}...", cli.train.display());
    let training = read_treebank_with_config(&cli.train, &mut vocab, config)
        .with_context(|| format!("failed to read training data {}", cli.train.display()))?;

    // No new word, tag or relation types after this point
    vocab
        .freeze_for_evaluation(&cli.unknown)
        .context("failed to set the unknown token")?;
    let sizes = vocab.sizes();

    info!("Reading dev data from {}...", cli.dev.display());
    let dev = read_treebank_with_config(&cli.dev, &mut vocab, config)
        .with_context(|| format!("failed to read dev data {}", cli.dev.display()))?;

    info!(
        train = training.len(),
        dev = dev.len(),
        vocab = sizes.tokens,
        tags = sizes.tags,
        relations = sizes.relations,
        "datasets ready"
    );
    println!(
        "VOCAB_SIZE={} TAG_SIZE={} DEPREL_SIZE={}",
        sizes.tokens, sizes.tags, sizes.relations
    );

    if dev.is_empty() {
        return Ok(());
    }
    let Some(example) = dev.examples.get(cli.dump) else {
        bail!(
            "dev tree {} requested but the dev set has {} trees",
            cli.dump,
            dev.len()
        );
    };
    eprint!("{}", example.tree.display(&vocab));
    Ok(())
}
