use crate::chart::{Backpointer, Cell, Chart, Span};
use crate::errors::{Result, SaplingError};
use crate::grammar::Grammar;
use crate::lexicon::Lexicon;
use crate::model::Model;
use crate::symbol::{Symbol, SymbolId, SymbolTable};
use crate::tree::{Child, Tree};

#[derive(Clone, Copy, Debug)]
struct BinaryRule {
    parent: SymbolId,
    right: SymbolId,
    log_prob: f64,
}

/// Best parse of a sentence.
#[derive(Clone, Debug)]
pub struct Parse {
    tree: Tree<Symbol>,
    log_prob: f64,
}

impl Parse {
    /// Gets the binarized parse tree.
    pub const fn tree(&self) -> &Tree<Symbol> {
        &self.tree
    }

    pub fn into_tree(self) -> Tree<Symbol> {
        self.tree
    }

    /// Gets the log-probability of the derivation.
    pub const fn log_prob(&self) -> f64 {
        self.log_prob
    }
}

/// Probabilistic CYK parser with unary closure.
///
/// The parser is immutable after construction and can be shared between threads.
///
/// # Examples
///
/// ```
/// use sapling::{mini, Parser};
///
/// let parser = Parser::from_model(mini::model().unwrap());
/// let parse = parser.parse(&["fish", "people", "fish", "tanks"], "S").unwrap();
/// assert_eq!(
///     "(S (NP (NP (N fish)) (NP (N people))) (VP (V fish) (NP (N tanks))))",
///     parse.tree().to_string(),
/// );
/// ```
pub struct Parser {
    grammar: Grammar,
    lexicon: Lexicon,
    symbols: SymbolTable,
    tags: Vec<(String, SymbolId)>,
    unaries_by_child: Vec<Vec<(SymbolId, f64)>>,
    binaries_by_left: Vec<Vec<BinaryRule>>,
}

impl Parser {
    /// Creates a new parser.
    ///
    /// # Arguments
    ///
    /// * `grammar` - Rules over nonterminal symbols.
    /// * `lexicon` - Emission model. Its tags are matched against plain labels of the grammar.
    pub fn new(grammar: Grammar, lexicon: Lexicon) -> Self {
        let mut symbols = grammar.symbols.clone();
        let tags = lexicon
            .tags()
            .into_iter()
            .map(|tag| (tag.to_string(), symbols.get_or_insert(&Symbol::label(tag))))
            .collect();

        let mut unaries_by_child = vec![vec![]; symbols.len()];
        let mut unaries: Vec<_> = grammar.unaries.iter().collect();
        unaries.sort_unstable_by_key(|&(&parent, _)| parent);
        for (&parent, table) in unaries {
            let mut rules: Vec<_> = table.iter().collect();
            rules.sort_unstable_by_key(|&(&child, _)| child);
            for (&child, log_prob) in rules {
                unaries_by_child[child.index()].push((parent, log_prob));
            }
        }

        let mut binaries_by_left = vec![vec![]; symbols.len()];
        let mut binaries: Vec<_> = grammar.binaries.iter().collect();
        binaries.sort_unstable_by_key(|&(&parent, _)| parent);
        for (&parent, table) in binaries {
            let mut rules: Vec<_> = table.iter().collect();
            rules.sort_unstable_by_key(|&(&children, _)| children);
            for (&(left, right), log_prob) in rules {
                binaries_by_left[left.index()].push(BinaryRule {
                    parent,
                    right,
                    log_prob,
                });
            }
        }

        Self {
            grammar,
            lexicon,
            symbols,
            tags,
            unaries_by_child,
            binaries_by_left,
        }
    }

    /// Creates a new parser from a model.
    pub fn from_model(model: Model) -> Self {
        let (grammar, lexicon) = model.into_parts();
        Self::new(grammar, lexicon)
    }

    pub const fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub const fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Finds the most probable binarized tree rooted at `root` that yields `sentence`.
    ///
    /// # Arguments
    ///
    /// * `sentence` - Words of the sentence.
    /// * `root` - Label of the root symbol.
    ///
    /// # Errors
    ///
    /// This function will return an error variant when:
    ///
    /// * `sentence` is empty.
    /// * `root` cannot be derived over the whole sentence, e.g., because a word cannot be emitted
    ///   by any tag.
    pub fn parse<S>(&self, sentence: &[S], root: &str) -> Result<Parse>
    where
        S: AsRef<str>,
    {
        if sentence.is_empty() {
            return Err(SaplingError::invalid_argument(
                "sentence",
                "must contain at least one word",
            ));
        }
        let n_words = sentence.len();
        let mut chart = Chart::new(n_words);

        for (i, word) in sentence.iter().enumerate() {
            let cell = chart.cell_mut(Span::new(i, 0));
            for (tag, id) in &self.tags {
                if let Some(score) = self.lexicon.score(word.as_ref(), tag) {
                    cell.update(*id, score, Backpointer::Terminal);
                }
            }
            self.close_unaries(cell);
        }

        for length in 1..n_words {
            for start in 0..n_words - length {
                let mut cell = Cell::default();
                for split in 0..length {
                    let left_span = Span::new(start, split);
                    let right_span = Span::new(start + split + 1, length - split - 1);
                    let right_cell = chart.cell(right_span);
                    for (left, left_entry) in chart.cell(left_span).iter() {
                        for rule in &self.binaries_by_left[left.index()] {
                            if let Some(right_score) = right_cell.score(rule.right) {
                                cell.update(
                                    rule.parent,
                                    left_entry.score + right_score + rule.log_prob,
                                    Backpointer::Binary {
                                        left: (left_span, left),
                                        right: (right_span, rule.right),
                                    },
                                );
                            }
                        }
                    }
                }
                self.close_unaries(&mut cell);
                *chart.cell_mut(Span::new(start, length)) = cell;
            }
        }

        let span = chart.full_span();
        let (root_id, log_prob) = self
            .symbols
            .get(&Symbol::label(root))
            .and_then(|id| Some((id, chart.cell(span).score(id)?)))
            .ok_or_else(|| SaplingError::no_parse_found(root, n_words))?;
        let tree = self.build_tree(&chart, sentence, span, root_id);
        Ok(Parse { tree, log_prob })
    }

    /// Same as [`Parser::parse()`] but returns only the tree.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse()`].
    pub fn generate_parse_tree<S>(&self, sentence: &[S], root: &str) -> Result<Tree<Symbol>>
    where
        S: AsRef<str>,
    {
        Ok(self.parse(sentence, root)?.into_tree())
    }

    /// Computes the log-probability of a binarized tree under the grammar and the lexicon.
    ///
    /// # Returns
    ///
    /// `None` if the tree uses a rule or an emission with no probability mass.
    pub fn score_tree(&self, tree: &Tree<Symbol>) -> Option<f64> {
        match tree.children.as_slice() {
            [Child::Word(word)] => match &tree.label {
                Symbol::Label(tag) => self.lexicon.score(word, tag),
                _ => None,
            },
            [Child::Node(child)] => Some(
                self.grammar.unary_log_prob(&tree.label, &child.label)? + self.score_tree(child)?,
            ),
            [Child::Node(left), Child::Node(right)] => Some(
                self.grammar
                    .binary_log_prob(&tree.label, &left.label, &right.label)?
                    + self.score_tree(left)?
                    + self.score_tree(right)?,
            ),
            _ => None,
        }
    }

    /// Applies unary rules inside a cell until no score improves.
    ///
    /// Every rule has a non-positive log-probability, so a cycle never improves a score and the
    /// loop terminates.
    pub(crate) fn close_unaries(&self, cell: &mut Cell) {
        let mut updated = true;
        while updated {
            updated = false;
            // Entries appended during the pass are visited in the same pass.
            let mut i = 0;
            while i < cell.len() {
                let (child, entry) = cell.nth(i);
                let child_score = entry.score;
                for &(parent, log_prob) in &self.unaries_by_child[child.index()] {
                    updated |= cell.update(parent, child_score + log_prob, Backpointer::Unary(child));
                }
                i += 1;
            }
        }
    }

    fn build_tree<S>(&self, chart: &Chart, sentence: &[S], span: Span, symbol: SymbolId) -> Tree<Symbol>
    where
        S: AsRef<str>,
    {
        let label = self.symbols.symbol(symbol).clone();
        let back = match chart.cell(span).get(symbol) {
            Some(entry) => entry.back,
            None => unreachable!("backpointer to a missing entry"),
        };
        match back {
            Backpointer::Terminal => Tree::preterminal(label, sentence[span.start].as_ref()),
            Backpointer::Unary(child) => Tree::new(
                label,
                vec![Child::Node(self.build_tree(chart, sentence, span, child))],
            ),
            Backpointer::Binary {
                left: (left_span, left),
                right: (right_span, right),
            } => Tree::new(
                label,
                vec![
                    Child::Node(self.build_tree(chart, sentence, left_span, left)),
                    Child::Node(self.build_tree(chart, sentence, right_span, right)),
                ],
            ),
        }
    }
}
