use crate::symbol::Symbol;
use crate::tree::{Child, Tree};

/// Converts treebank trees into binary-branching trees with markovized labels.
///
/// Nodes with more than two children are factored to the right:
///
/// ```text
/// (NP DT JJ JJ NN)  =>  (NP DT (NP|<JJ-JJ-NN> JJ (NP|<JJ-NN> JJ NN)))
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Binarizer {
    horizontal: Option<usize>,
    vertical: usize,
}

impl Binarizer {
    /// Creates a new binarizer.
    ///
    /// # Arguments
    ///
    /// * `horizontal` - Number of sibling labels kept in intermediate symbols. `None` keeps all
    ///   of them.
    /// * `vertical` - Number of ancestor labels attached to each phrasal node. `0` disables
    ///   the annotation.
    pub const fn new(horizontal: Option<usize>, vertical: usize) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Binarizes a tree. The root label is never annotated.
    ///
    /// # Examples
    ///
    /// ```
    /// use sapling::{Binarizer, Tree};
    ///
    /// let t = Tree::from_bracketed("(S (NP (DT a) (JJ big) (NN dog)) (VP (VBZ barks)))").unwrap();
    /// let b = Binarizer::new(None, 1).binarize(&t);
    /// assert_eq!(
    ///     "(S (NP^<S> (DT a) (NP|<JJ-NN>^<S> (JJ big) (NN dog))) (VP^<S> (VBZ barks)))",
    ///     b.to_string(),
    /// );
    /// ```
    pub fn binarize(&self, tree: &Tree<String>) -> Tree<Symbol> {
        self.binarize_node(tree, &[tree.label.clone()], true)
    }

    fn binarize_node(&self, node: &Tree<String>, parents: &[String], is_root: bool) -> Tree<Symbol> {
        let is_phrasal = matches!(node.children.first(), Some(Child::Node(_)));

        let (label, ancestors, child_parents) = if self.vertical != 0 && !is_root && is_phrasal {
            let mut child_parents = Vec::with_capacity(self.vertical);
            child_parents.push(node.label.clone());
            child_parents.extend(parents.iter().take(self.vertical - 1).cloned());
            let label = Symbol::Annotated {
                label: node.label.clone(),
                ancestors: parents.to_vec(),
            };
            (label, parents.to_vec(), child_parents)
        } else {
            (Symbol::Label(node.label.clone()), vec![], parents.to_vec())
        };

        let mut children: Vec<Child<Symbol>> = node
            .children
            .iter()
            .map(|child| match child {
                Child::Node(t) => Child::Node(self.binarize_node(t, &child_parents, false)),
                Child::Word(w) => Child::Word(w.clone()),
            })
            .collect();

        if children.len() <= 2 || node.is_lexical() {
            return Tree::new(label, children);
        }

        let sibling_labels: Vec<&String> = node
            .children
            .iter()
            .filter_map(|child| match child {
                Child::Node(t) => Some(&t.label),
                Child::Word(_) => None,
            })
            .collect();
        let n_children = children.len();
        let horizontal = self.horizontal.unwrap_or(usize::MAX);
        let intermediate = |i: usize| Symbol::Intermediate {
            parent: node.label.clone(),
            siblings: sibling_labels[i..i.saturating_add(horizontal).min(n_children)]
                .iter()
                .map(|&s| s.clone())
                .collect(),
            ancestors: ancestors.clone(),
        };

        // Builds the chain of intermediate nodes from the rightmost one.
        let last = children.pop().unwrap();
        let second_last = children.pop().unwrap();
        let mut tail = Tree::new(intermediate(n_children - 2), vec![second_last, last]);
        for i in (1..n_children - 2).rev() {
            let child = children.pop().unwrap();
            tail = Tree::new(intermediate(i), vec![child, Child::Node(tail)]);
        }
        let first = children.pop().unwrap();
        Tree::new(label, vec![first, Child::Node(tail)])
    }
}
