use std::fs::{self, File};
use std::io::{prelude::*, stderr};
use std::path::PathBuf;

use clap::Parser;
use sapling::{read_treebank, GrammarTrainer, Lexicon, Model};

#[derive(Parser, Debug)]
#[command(about = "A program to train models of Sapling.")]
struct Args {
    /// A treebank file of bracketed trees
    #[arg(long, required = true)]
    treebank: Vec<PathBuf>,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// Trees with more words than this value are not used for grammar induction
    #[arg(long, default_value = "999")]
    max_train: usize,

    /// The number of sibling labels kept in intermediate symbols (unbounded if not given)
    #[arg(long)]
    horizontal: Option<usize>,

    /// The number of ancestor labels attached to phrasal symbols
    #[arg(long, default_value = "0")]
    vertical: usize,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    eprintln!("Loading treebank...");
    let mut trees = vec![];
    for path in &args.treebank {
        eprintln!("Loading {path:?} ...");
        let text = fs::read_to_string(path)?;
        trees.extend(read_treebank(&text)?);
        eprintln!("# of trees: {}", trees.len());
    }

    eprintln!("Building grammar...");
    let mut trainer = GrammarTrainer::new(args.max_train, args.horizontal, args.vertical);
    for (i, tree) in trees.iter().enumerate() {
        if i % 1000 == 0 {
            eprint!("# of trees: {}\r", trainer.n_trees());
            stderr().flush()?;
        }
        if let Err(e) = trainer.add_tree(tree) {
            eprintln!("Tree #{i}: {e}");
            return Err(e.into());
        }
    }
    eprintln!(
        "# of trees: {} ({} skipped)",
        trainer.n_trees(),
        trees.len() - trainer.n_trees()
    );
    let grammar = trainer.train();
    eprintln!(
        "# of rules: {} unary, {} binary",
        grammar.n_unary_rules(),
        grammar.n_binary_rules()
    );

    eprintln!("Building lexicon...");
    let lexicon = Lexicon::from_tagged_words(
        trees
            .iter()
            .flat_map(|t| t.tagged_words())
            .map(|(word, tag)| (word.to_string(), tag.clone())),
    );
    eprintln!("# of tags: {}", lexicon.tags().len());

    let model = Model::new(grammar, lexicon);
    let mut f = zstd::Encoder::new(File::create(args.model)?, 19)?;
    f.multithread(args.zstd_workers)?;
    model.write(&mut f)?;
    f.finish()?;

    Ok(())
}
