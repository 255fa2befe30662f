//! Small hand-written grammar and lexicon over the words "people", "fish", "tanks", "rods" and
//! "with".
//!
//! # Examples
//!
//! ```
//! use sapling::{mini, Parser};
//!
//! let parser = Parser::from_model(mini::model().unwrap());
//! let parse = parser.parse(&["people", "fish", "with", "rods"], "S").unwrap();
//! assert_eq!(
//!     "(S (NP (N people)) (VP (V fish) (PP (P with) (NP (N rods)))))",
//!     parse.tree().to_string(),
//! );
//! ```

use crate::errors::Result;
use crate::grammar::Grammar;
use crate::lexicon::Lexicon;
use crate::model::Model;

/// `(parent, right-hand side, probability)`
pub const GRAMMAR_RULES: &[(&str, &str, f64)] = &[
    ("S", "NP VP", 0.9),
    ("S", "VP", 0.1),
    ("VP", "V NP", 0.5),
    ("VP", "V", 0.1),
    ("VP", "V @VP_V", 0.3),
    ("VP", "V PP", 0.1),
    ("@VP_V", "NP PP", 1.0),
    ("NP", "NP NP", 0.1),
    ("NP", "NP PP", 0.2),
    ("NP", "N", 0.7),
    ("PP", "P NP", 1.0),
];

/// `(tag, word, probability)`
pub const LEXICON_RULES: &[(&str, &str, f64)] = &[
    ("N", "people", 0.5),
    ("N", "fish", 0.2),
    ("N", "tanks", 0.2),
    ("N", "rods", 0.1),
    ("V", "people", 0.1),
    ("V", "fish", 0.6),
    ("V", "tanks", 0.3),
    ("P", "with", 1.0),
];

pub fn grammar() -> Result<Grammar> {
    Grammar::from_rules(GRAMMAR_RULES.iter().copied())
}

pub fn lexicon() -> Result<Lexicon> {
    Lexicon::from_rules(LEXICON_RULES.iter().copied())
}

pub fn model() -> Result<Model> {
    Ok(Model::new(grammar()?, lexicon()?))
}
