use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::binarizer::Binarizer;
use crate::errors::{Result, SaplingError};
use crate::probability_table::ProbabilityTable;
use crate::symbol::{Symbol, SymbolId, SymbolTable};
use crate::tree::{Child, Tree};
use crate::utils::SerializableHashMap;

type UnaryTables = SerializableHashMap<SymbolId, ProbabilityTable<SymbolId>>;
type BinaryTables = SerializableHashMap<SymbolId, ProbabilityTable<(SymbolId, SymbolId)>>;

/// Binary-branching grammar with log-probabilities.
///
/// The unary and the binary rules of a parent are two separate distributions: each of them sums
/// to one on its own.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    pub(crate) symbols: SymbolTable,
    pub(crate) unaries: UnaryTables,
    pub(crate) binaries: BinaryTables,
}

impl Grammar {
    /// Induces a grammar from a treebank.
    ///
    /// # Arguments
    ///
    /// * `trees` - Training trees.
    /// * `max_train` - Trees with more words than this value are skipped.
    /// * `horizontal` - Horizontal markovization order. `None` means unbounded.
    /// * `vertical` - Vertical markovization order.
    ///
    /// # Errors
    ///
    /// [`SaplingError::MalformedProduction`] will be returned if a binarized tree contains a
    /// production that has neither one nor two children.
    pub fn from_treebank<'a, I>(
        trees: I,
        max_train: usize,
        horizontal: Option<usize>,
        vertical: usize,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Tree<String>>,
    {
        let mut trainer = GrammarTrainer::new(max_train, horizontal, vertical);
        for tree in trees {
            trainer.add_tree(tree)?;
        }
        Ok(trainer.train())
    }

    /// Creates a grammar from explicit `(parent, right-hand side, probability)` triples.
    ///
    /// The right-hand side is a whitespace-separated list of one or two symbols. Probabilities of
    /// repeated rules are summed; the values are used as probabilities, not as counts.
    ///
    /// # Errors
    ///
    /// This function will return an error variant when:
    ///
    /// * a right-hand side has neither one nor two symbols.
    /// * a probability is not positive, or the summed probability of a rule exceeds one.
    ///
    /// # Examples
    ///
    /// ```
    /// use sapling::{Grammar, Symbol};
    ///
    /// let g = Grammar::from_rules([("S", "NP VP", 0.9), ("S", "VP", 0.1)]).unwrap();
    /// let s = Symbol::label("S");
    /// let vp = Symbol::label("VP");
    /// assert!((g.unary_log_prob(&s, &vp).unwrap() - 0.1f64.ln()).abs() < 1e-12);
    ///
    /// assert!(Grammar::from_rules([("S", "A B C", 1.0)]).is_err());
    /// ```
    pub fn from_rules<I, P, R>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, R, f64)>,
        P: AsRef<str>,
        R: AsRef<str>,
    {
        let mut grammar = Self::default();
        for (parent, rhs, prob) in rules {
            let (parent, rhs) = (parent.as_ref(), rhs.as_ref());
            if !(prob.is_finite() && prob > 0.) {
                return Err(SaplingError::invalid_argument(
                    "rules",
                    format!("`{parent} -> {rhs}` has a non-positive probability {prob}"),
                ));
            }
            let parent_id = grammar.symbols.get_or_insert(&Symbol::label(parent));
            let children: Vec<_> = rhs
                .split_whitespace()
                .map(|c| grammar.symbols.get_or_insert(&Symbol::label(c)))
                .collect();
            match children[..] {
                [child] => grammar
                    .unaries
                    .entry(parent_id)
                    .or_default()
                    .accumulate(child, prob),
                [left, right] => grammar
                    .binaries
                    .entry(parent_id)
                    .or_default()
                    .accumulate((left, right), prob),
                _ => {
                    return Err(SaplingError::malformed_production(
                        format!("{parent} -> {rhs}"),
                        children.len(),
                    ))
                }
            }
        }
        let probs = grammar
            .unaries
            .values()
            .flat_map(|t| t.iter().map(|(_, p)| p))
            .chain(grammar.binaries.values().flat_map(|t| t.iter().map(|(_, p)| p)));
        for prob in probs {
            if prob > 1. {
                return Err(SaplingError::invalid_argument(
                    "rules",
                    format!("summed rule probability {prob} exceeds 1"),
                ));
            }
        }
        grammar.normalize(Some(1.));
        Ok(grammar)
    }

    fn normalize(&mut self, total: Option<f64>) {
        for table in self.unaries.values_mut() {
            table.normalize(total);
        }
        for table in self.binaries.values_mut() {
            table.normalize(total);
        }
    }

    /// Gets the symbols used by the rules.
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Gets the log-probability of `parent -> child`.
    pub fn unary_log_prob(&self, parent: &Symbol, child: &Symbol) -> Option<f64> {
        let parent = self.symbols.get(parent)?;
        let child = self.symbols.get(child)?;
        self.unaries.get(&parent)?.get(&child)
    }

    /// Gets the log-probability of `parent -> left right`.
    pub fn binary_log_prob(&self, parent: &Symbol, left: &Symbol, right: &Symbol) -> Option<f64> {
        let parent = self.symbols.get(parent)?;
        let left = self.symbols.get(left)?;
        let right = self.symbols.get(right)?;
        self.binaries.get(&parent)?.get(&(left, right))
    }

    /// Iterates over `(parent, child, log-probability)` of all unary rules in arbitrary order.
    pub fn unary_rules(&self) -> impl Iterator<Item = (&Symbol, &Symbol, f64)> {
        self.unaries.iter().flat_map(move |(&parent, table)| {
            table.iter().map(move |(&child, prob)| {
                (self.symbols.symbol(parent), self.symbols.symbol(child), prob)
            })
        })
    }

    /// Iterates over `(parent, left, right, log-probability)` of all binary rules in arbitrary
    /// order.
    pub fn binary_rules(&self) -> impl Iterator<Item = (&Symbol, &Symbol, &Symbol, f64)> {
        self.binaries.iter().flat_map(move |(&parent, table)| {
            table.iter().map(move |(&(left, right), prob)| {
                (
                    self.symbols.symbol(parent),
                    self.symbols.symbol(left),
                    self.symbols.symbol(right),
                    prob,
                )
            })
        })
    }

    pub fn n_unary_rules(&self) -> usize {
        self.unaries.values().map(|t| t.len()).sum()
    }

    pub fn n_binary_rules(&self) -> usize {
        self.binaries.values().map(|t| t.len()).sum()
    }

    /// Checks that every rule refers to an interned symbol and that every table is a normalized
    /// distribution with non-positive log-probabilities.
    pub(crate) fn validate(&self) -> Result<()> {
        let n_symbols = self.symbols.len();
        let in_range = |id: &SymbolId| id.index() < n_symbols;
        let unaries_ok = self
            .unaries
            .iter()
            .all(|(parent, t)| in_range(parent) && t.keys().all(in_range));
        let binaries_ok = self.binaries.iter().all(|(parent, t)| {
            in_range(parent) && t.keys().all(|(l, r)| in_range(l) && in_range(r))
        });
        if !(unaries_ok && binaries_ok) {
            return Err(SaplingError::invalid_model("rule refers to an unknown symbol"));
        }
        let normalized = self.unaries.values().all(|t| t.is_normalized())
            && self.binaries.values().all(|t| t.is_normalized());
        if !normalized {
            return Err(SaplingError::invalid_model("rule table is not normalized"));
        }
        // NaN fails the comparison.
        let log_probs_ok = self
            .unaries
            .values()
            .flat_map(|t| t.iter().map(|(_, p)| p))
            .chain(self.binaries.values().flat_map(|t| t.iter().map(|(_, p)| p)))
            .all(|p| p <= 0.);
        if !log_probs_ok {
            return Err(SaplingError::invalid_model(
                "rule has a log-probability that is positive or not a number",
            ));
        }
        Ok(())
    }
}

impl Decode for Grammar {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self {
            symbols: Decode::decode(decoder)?,
            unaries: Decode::decode(decoder)?,
            binaries: Decode::decode(decoder)?,
        })
    }
}

impl Encode for Grammar {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.symbols, encoder)?;
        Encode::encode(&self.unaries, encoder)?;
        Encode::encode(&self.binaries, encoder)?;
        Ok(())
    }
}

/// Grammar trainer.
///
/// # Examples
///
/// ```
/// use sapling::{GrammarTrainer, Symbol, Tree};
///
/// let trees = [
///     "(S (NP (N fish)) (VP (V swim)))",
///     "(S (NP (N people)) (VP (V fish) (NP (N tanks))))",
/// ];
/// let mut trainer = GrammarTrainer::new(999, None, 0);
/// for t in trees {
///     trainer.add_tree(&Tree::from_bracketed(t).unwrap()).unwrap();
/// }
/// let grammar = trainer.train();
///
/// let vp = Symbol::label("VP");
/// let v = Symbol::label("V");
/// let np = Symbol::label("NP");
/// assert_eq!(Some(0.), grammar.unary_log_prob(&vp, &v));
/// assert_eq!(Some(0.), grammar.binary_log_prob(&vp, &v, &np));
/// ```
pub struct GrammarTrainer {
    max_train: usize,
    binarizer: Binarizer,
    symbols: SymbolTable,
    unaries: UnaryTables,
    binaries: BinaryTables,
    n_trees: usize,
}

impl GrammarTrainer {
    /// Creates a new trainer.
    ///
    /// # Arguments
    ///
    /// * `max_train` - Trees with more words than this value are skipped.
    /// * `horizontal` - Horizontal markovization order. `None` means unbounded.
    /// * `vertical` - Vertical markovization order.
    pub fn new(max_train: usize, horizontal: Option<usize>, vertical: usize) -> Self {
        Self {
            max_train,
            binarizer: Binarizer::new(horizontal, vertical),
            symbols: SymbolTable::new(),
            unaries: SerializableHashMap::default(),
            binaries: SerializableHashMap::default(),
            n_trees: 0,
        }
    }

    /// Binarizes a tree and counts its productions.
    ///
    /// # Returns
    ///
    /// `false` if the tree is skipped because it is longer than `max_train`.
    ///
    /// # Errors
    ///
    /// [`SaplingError::MalformedProduction`] will be returned if the binarized tree contains a
    /// production with neither one nor two children. Nothing of the tree is counted in that case.
    pub fn add_tree(&mut self, tree: &Tree<String>) -> Result<bool> {
        if tree.leaves().len() > self.max_train {
            return Ok(false);
        }
        let binarized = self.binarizer.binarize(tree);
        let mut productions = vec![];
        collect_productions(&binarized, &mut productions)?;
        for (parent, children) in productions {
            let parent = self.symbols.get_or_insert(parent);
            match children[..] {
                [child] => {
                    let child = self.symbols.get_or_insert(child);
                    self.unaries
                        .entry(parent)
                        .or_default()
                        .accumulate(child, 1.);
                }
                [left, right] => {
                    let left = self.symbols.get_or_insert(left);
                    let right = self.symbols.get_or_insert(right);
                    self.binaries
                        .entry(parent)
                        .or_default()
                        .accumulate((left, right), 1.);
                }
                _ => unreachable!(),
            }
        }
        self.n_trees += 1;
        Ok(true)
    }

    /// Gets the number of trees counted so far.
    pub const fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Normalizes the counts into a grammar.
    pub fn train(self) -> Grammar {
        let mut grammar = Grammar {
            symbols: self.symbols,
            unaries: self.unaries,
            binaries: self.binaries,
        };
        grammar.normalize(None);
        grammar
    }
}

/// Collects the nonterminal productions of a binarized tree, failing on any arity other than one
/// or two.
fn collect_productions<'a>(
    tree: &'a Tree<Symbol>,
    productions: &mut Vec<(&'a Symbol, Vec<&'a Symbol>)>,
) -> Result<()> {
    if !tree.is_lexical() {
        let children: Vec<&Symbol> = tree
            .children
            .iter()
            .filter_map(|child| match child {
                Child::Node(t) => Some(&t.label),
                Child::Word(_) => None,
            })
            .collect();
        if children.is_empty() || children.len() > 2 {
            let rhs: String = children.iter().map(|c| format!(" {c}")).collect();
            return Err(SaplingError::malformed_production(
                format!("{} ->{rhs}", tree.label),
                children.len(),
            ));
        }
        productions.push((&tree.label, children));
    }
    for child in &tree.children {
        if let Child::Node(t) = child {
            collect_productions(t, productions)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Symbol {
        Symbol::label(s)
    }

    #[test]
    fn test_from_treebank_counts() {
        let trees: Vec<_> = [
            "(S (NP (N fish)) (VP (V swim)))",
            "(S (NP (N people)) (VP (V fish) (NP (N tanks))))",
            "(S (VP (V fish)))",
            "(S (NP (NP (N people)) (NP (N fish))) (VP (V swim)))",
            "(S (NP (DT the) (N dog)) (VP (V swims)))",
        ]
        .iter()
        .map(|t| Tree::from_bracketed(t).unwrap())
        .collect();
        let g = Grammar::from_treebank(&trees, 999, None, 0).unwrap();

        let (s, np, vp, n, v) = (label("S"), label("NP"), label("VP"), label("N"), label("V"));
        assert_close!(0., g.binary_log_prob(&s, &np, &vp).unwrap());
        assert_close!(0., g.unary_log_prob(&s, &vp).unwrap());
        assert_close!(0., g.unary_log_prob(&np, &n).unwrap());
        assert_close!(0.5f64.ln(), g.binary_log_prob(&np, &np, &np).unwrap());
        assert_close!(
            0.5f64.ln(),
            g.binary_log_prob(&np, &label("DT"), &n).unwrap()
        );
        // VP -> V and VP -> V NP belong to different distributions.
        assert_close!(0., g.unary_log_prob(&vp, &v).unwrap());
        assert_close!(0., g.binary_log_prob(&vp, &v, &np).unwrap());
        assert_eq!(None, g.unary_log_prob(&vp, &n));
        assert_eq!(3, g.n_unary_rules());
        assert_eq!(4, g.n_binary_rules());
    }

    #[test]
    fn test_from_treebank_skips_long_trees() {
        let trees: Vec<_> = [
            "(S (NP (N fish)) (VP (V swim)))",
            "(S (NP (N people)) (VP (V fish) (NP (N tanks))))",
        ]
        .iter()
        .map(|t| Tree::from_bracketed(t).unwrap())
        .collect();
        let g = Grammar::from_treebank(&trees, 2, None, 0).unwrap();

        assert_eq!(None, g.binary_log_prob(&label("VP"), &label("V"), &label("NP")));
        assert_close!(0., g.unary_log_prob(&label("VP"), &label("V")).unwrap());
    }

    #[test]
    fn test_from_treebank_markovized_symbols() {
        let t = Tree::from_bracketed("(S (NP (DT the) (JJ big) (NN dog)) (VP (VBD ran)))").unwrap();
        let g = Grammar::from_treebank([&t], 999, None, 1).unwrap();

        let np = Symbol::Annotated {
            label: "NP".into(),
            ancestors: vec!["S".into()],
        };
        let vp = Symbol::Annotated {
            label: "VP".into(),
            ancestors: vec!["S".into()],
        };
        let np_rest = Symbol::Intermediate {
            parent: "NP".into(),
            siblings: vec!["JJ".into(), "NN".into()],
            ancestors: vec!["S".into()],
        };
        assert_close!(0., g.binary_log_prob(&label("S"), &np, &vp).unwrap());
        assert_close!(0., g.binary_log_prob(&np, &label("DT"), &np_rest).unwrap());
        assert_close!(
            0.,
            g.binary_log_prob(&np_rest, &label("JJ"), &label("NN"))
                .unwrap()
        );
        assert_close!(0., g.unary_log_prob(&vp, &label("VBD")).unwrap());
        assert_eq!(None, g.unary_log_prob(&label("VP"), &label("VBD")));
    }

    #[test]
    fn test_malformed_production_is_fatal_and_uncounted() {
        let good = Tree::from_bracketed("(S (NP (N fish)) (VP (V swim)))").unwrap();
        let bad = Tree::from_bracketed("(S (NP) (VP (V runs)))").unwrap();

        let mut trainer = GrammarTrainer::new(999, None, 0);
        assert!(trainer.add_tree(&good).unwrap());
        let e = trainer.add_tree(&bad).unwrap_err();
        assert_eq!(
            "MalformedProductionError: NP -> has 0 children",
            e.to_string()
        );
        assert!(!e.is_recoverable());
        assert_eq!(1, trainer.n_trees());

        let g = trainer.train();
        assert_close!(0., g.unary_log_prob(&label("VP"), &label("V")).unwrap());
        assert_eq!(1, g.n_binary_rules());
        assert_eq!(2, g.n_unary_rules());
    }

    #[test]
    fn test_from_treebank_propagates_malformed_production() {
        let bad = Tree::from_bracketed("(S (X) (Y (Z w)))").unwrap();
        let g = Grammar::from_treebank([&bad], 999, None, 0);
        assert!(matches!(g, Err(SaplingError::MalformedProduction(_))));
    }

    #[test]
    fn test_from_rules() {
        let g = Grammar::from_rules([
            ("S", "NP VP", 0.9),
            ("S", "VP", 0.1),
            ("NP", "N", 0.3),
            ("NP", "N", 0.4),
        ])
        .unwrap();

        assert_close!(
            0.9f64.ln(),
            g.binary_log_prob(&label("S"), &label("NP"), &label("VP"))
                .unwrap()
        );
        assert_close!(0.1f64.ln(), g.unary_log_prob(&label("S"), &label("VP")).unwrap());
        assert_close!(0.7f64.ln(), g.unary_log_prob(&label("NP"), &label("N")).unwrap());
        assert_eq!(2, g.n_unary_rules());
        assert_eq!(1, g.n_binary_rules());
        assert_eq!(
            vec![(&label("S"), &label("VP"))],
            g.unary_rules()
                .filter(|&(p, _, _)| p == &label("S"))
                .map(|(p, c, _)| (p, c))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_from_rules_invalid() {
        let e = Grammar::from_rules([("S", "A B C", 1.)]).unwrap_err();
        assert_eq!(
            "MalformedProductionError: S -> A B C has 3 children",
            e.to_string()
        );

        let e = Grammar::from_rules([("S", "A", 0.)]).unwrap_err();
        assert_eq!(
            "InvalidArgumentError: rules: `S -> A` has a non-positive probability 0",
            e.to_string()
        );

        let e = Grammar::from_rules([("S", "A", 0.6), ("S", "A", 0.6)]).unwrap_err();
        assert!(matches!(e, SaplingError::InvalidArgument(_)));
    }

    fn cyclic_grammar(total: Option<f64>) -> Grammar {
        let mut g = Grammar::default();
        let a = g.symbols.get_or_insert(&label("A"));
        let b = g.symbols.get_or_insert(&label("B"));
        g.unaries.entry(a).or_default().accumulate(b, 2.);
        g.unaries.entry(b).or_default().accumulate(a, 2.);
        if total.is_some() {
            g.normalize(total);
        }
        g
    }

    #[test]
    fn test_validate() {
        assert!(cyclic_grammar(Some(4.)).validate().is_ok());
        assert!(Grammar::from_rules([("S", "NP VP", 1.)]).unwrap().validate().is_ok());

        let e = cyclic_grammar(None).validate().unwrap_err();
        assert_eq!(
            "InvalidModelError: rule table is not normalized",
            e.to_string()
        );

        // ln(2 / 1) > 0
        let e = cyclic_grammar(Some(1.)).validate().unwrap_err();
        assert_eq!(
            "InvalidModelError: rule has a log-probability that is positive or not a number",
            e.to_string()
        );

        let mut g = cyclic_grammar(Some(4.));
        let a = g.symbols.get(&label("A")).unwrap();
        g.binaries.entry(a).or_default().accumulate((a, SymbolId(7)), 1.);
        let e = g.validate().unwrap_err();
        assert_eq!(
            "InvalidModelError: rule refers to an unknown symbol",
            e.to_string()
        );
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut g = Grammar::default();
        let a = g.symbols.get_or_insert(&label("A"));
        let b = g.symbols.get_or_insert(&label("B"));
        g.unaries.entry(a).or_default().accumulate(b, f64::NAN);
        g.normalize(Some(1.));
        assert!(matches!(g.validate(), Err(SaplingError::InvalidModel(_))));
    }
}
