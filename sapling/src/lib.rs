#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Sapling
//!
//! Sapling is a parser for probabilistic context-free grammars. Grammars are induced from a
//! treebank by binarization with horizontal and vertical markovization, and sentences are parsed
//! with the CYK algorithm extended by unary closure.
//!
//! ## Examples
//!
//! ```
//! use sapling::{read_treebank, Grammar, Lexicon, Parser};
//!
//! let trees = read_treebank(
//!     "(S (NP (DT the) (NN dog)) (VP (VBZ barks)))
//!      (S (NP (DT a) (JJ big) (NN cat)) (VP (VBZ sleeps)))",
//! )
//! .unwrap();
//! let grammar = Grammar::from_treebank(&trees, 999, None, 0).unwrap();
//! let lexicon = Lexicon::from_tagged_words(
//!     trees.iter().flat_map(|t| t.tagged_words()).map(|(w, t)| (w.to_string(), t.clone())),
//! );
//! let parser = Parser::new(grammar, lexicon);
//!
//! let parse = parser.parse(&["the", "big", "dog", "sleeps"], "S").unwrap();
//! assert_eq!(
//!     "(S (NP (DT the) (JJ big) (NN dog)) (VP (VBZ sleeps)))",
//!     parse.tree().unbinarize().to_string(),
//! );
//! ```
//!
//! Trained models can be stored with [`Model::write()`] and loaded with [`Model::read()`].

#[macro_use]
mod utils;

mod binarizer;
mod chart;
mod grammar;
mod lexicon;
mod model;
mod parser;
mod probability_table;
mod symbol;
mod tree;

pub mod errors;
pub mod mini;

pub use binarizer::Binarizer;
pub use errors::{Result, SaplingError};
pub use grammar::{Grammar, GrammarTrainer};
pub use lexicon::{FixedLexicon, Lexicon, SmoothedLexicon, RARE_WORD_THRESHOLD};
pub use model::Model;
pub use parser::{Parse, Parser};
pub use probability_table::ProbabilityTable;
pub use symbol::{Symbol, SymbolId, SymbolTable};
pub use tree::{read_treebank, Child, Tree};
