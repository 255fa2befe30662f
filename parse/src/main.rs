use std::fs::File;
use std::io::{prelude::*, stdin, BufReader};
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use clap::{ArgGroup, Parser};
use sapling::{mini, Model, Parser as SentenceParser, Result};

#[derive(Parser, Debug)]
#[command(
    about = "A program to parse tokenized sentences.",
    group = ArgGroup::new("source").required(true),
)]
struct Args {
    /// The model file to use when parsing text
    #[arg(long, group = "source")]
    model: Option<PathBuf>,

    /// Use the built-in toy grammar and lexicon instead of a model file
    #[arg(long, group = "source")]
    mini: bool,

    /// The label of the root symbol
    #[arg(long, default_value = "S")]
    root: String,

    /// Print binarized trees as they are derived by the grammar
    #[arg(long)]
    binarized: bool,

    /// Print the log-probability after each tree, separated by a tab
    #[arg(long)]
    scores: bool,

    /// Number of threads (0 means sentences are parsed on the main thread)
    #[arg(long, default_value = "0")]
    n_threads: usize,

    /// Number of sentences each thread parses at a time
    #[arg(long, default_value = "10")]
    mt_chunk_size: usize,
}

/// Parses a line and formats the result. Failures that only concern the line are reported on
/// stderr and produce an empty output line.
fn parse_line(parser: &SentenceParser, args: &Args, i: usize, line: &str) -> Result<String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(String::new());
    }
    let parse = match parser.parse(&words, &args.root) {
        Ok(parse) => parse,
        Err(e) if e.is_recoverable() => {
            eprintln!("Line #{}: {e}", i + 1);
            return Ok(String::new());
        }
        Err(e) => return Err(e),
    };
    let tree = if args.binarized {
        parse.tree().to_string()
    } else {
        parse.tree().unbinarize().to_string()
    };
    Ok(if args.scores {
        format!("{tree}\t{}", parse.log_prob())
    } else {
        tree
    })
}

/// Parses a batch of lines, `chunk_size` lines per thread, and returns the outputs in input
/// order. `first` is the index of the first line of the batch in the whole input.
fn parse_batch(
    parser: &SentenceParser,
    args: &Args,
    first: usize,
    batch: &[String],
    chunk_size: usize,
) -> Result<Vec<String>> {
    let results: Vec<Result<Vec<String>>> = thread::scope(|s| {
        let handles: Vec<_> = batch
            .chunks(chunk_size)
            .enumerate()
            .map(|(c, chunk)| {
                s.spawn(move || {
                    chunk
                        .iter()
                        .enumerate()
                        .map(|(j, line)| parse_line(parser, args, first + c * chunk_size + j, line))
                        .collect::<Result<Vec<_>>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("parser thread panicked"))
            .collect()
    });
    let mut trees = Vec::with_capacity(batch.len());
    for result in results {
        trees.extend(result?);
    }
    Ok(trees)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let model = if let Some(path) = &args.model {
        eprintln!("Loading model file...");
        let mut f = zstd::Decoder::new(BufReader::new(File::open(path)?))?;
        Model::read(&mut f)?
    } else {
        mini::model()?
    };
    let parser = SentenceParser::from_model(model);

    eprintln!("Start parsing");
    let start = Instant::now();
    let mut n_sentences = 0;
    if args.n_threads == 0 {
        for (i, line) in stdin().lock().lines().enumerate() {
            println!("{}", parse_line(&parser, &args, i, &line?)?);
            n_sentences += 1;
        }
    } else {
        let chunk_size = args.mt_chunk_size.max(1);
        let batch_size = args.n_threads * chunk_size;
        let mut lines = stdin().lock().lines();
        loop {
            let batch = lines
                .by_ref()
                .take(batch_size)
                .collect::<std::io::Result<Vec<_>>>()?;
            if batch.is_empty() {
                break;
            }
            for tree in parse_batch(&parser, &args, n_sentences, &batch, chunk_size)? {
                println!("{tree}");
                n_sentences += 1;
            }
        }
    }
    let duration = start.elapsed();
    eprintln!("Elapsed: {} [sec]", duration.as_secs_f64());
    eprintln!(
        "Speed: {} [sentences/sec]",
        n_sentences as f64 / duration.as_secs_f64()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_keeps_input_order() {
        let args = Args::parse_from(["parse", "--mini", "--n-threads", "2"]);
        let parser = SentenceParser::from_model(mini::model().unwrap());
        let batch: Vec<String> = [
            "people fish tanks",
            "",
            "fish",
            "unicorns fish",
            "people fish tanks with rods",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let trees = parse_batch(&parser, &args, 10, &batch, 2).unwrap();
        let expected: Vec<String> = batch
            .iter()
            .enumerate()
            .map(|(i, line)| parse_line(&parser, &args, 10 + i, line).unwrap())
            .collect();

        assert_eq!(5, trees.len());
        assert_eq!(expected, trees);
        assert_eq!("", trees[1]);
        assert_eq!("(S (VP (V fish)))", trees[2]);
    }
}
