use std::fmt;

use crate::errors::{Result, SaplingError};
use crate::symbol::Symbol;

/// Child of a tree node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Child<L> {
    /// Nonterminal subtree.
    Node(Tree<L>),

    /// Terminal word.
    Word(String),
}

/// Ordered tree whose nodes carry labels of type `L` and whose leaves are words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree<L> {
    pub(crate) label: L,
    pub(crate) children: Vec<Child<L>>,
}

impl<L> Tree<L> {
    pub fn new(label: L, children: Vec<Child<L>>) -> Self {
        Self { label, children }
    }

    /// Creates a preterminal node holding a single word.
    pub fn preterminal<S>(label: L, word: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            label,
            children: vec![Child::Word(word.into())],
        }
    }

    pub const fn label(&self) -> &L {
        &self.label
    }

    pub fn children(&self) -> &[Child<L>] {
        &self.children
    }

    /// Returns `true` if any child of this node is a word.
    pub fn is_lexical(&self) -> bool {
        self.children.iter().any(|c| matches!(c, Child::Word(_)))
    }

    /// Gets the words of the tree from left to right.
    pub fn leaves(&self) -> Vec<&str> {
        let mut result = vec![];
        self.push_leaves(&mut result);
        result
    }

    fn push_leaves<'a>(&'a self, result: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                Child::Node(t) => t.push_leaves(result),
                Child::Word(w) => result.push(w),
            }
        }
    }

    /// Gets every word paired with the label of the node directly above it.
    ///
    /// # Examples
    ///
    /// ```
    /// use sapling::Tree;
    ///
    /// let t = Tree::from_bracketed("(S (NP (N fish)) (VP (V swim)))").unwrap();
    /// let tagged: Vec<_> = t.tagged_words().into_iter().map(|(w, t)| (w, t.as_str())).collect();
    /// assert_eq!(vec![("fish", "N"), ("swim", "V")], tagged);
    /// ```
    pub fn tagged_words(&self) -> Vec<(&str, &L)> {
        let mut result = vec![];
        self.push_tagged_words(&mut result);
        result
    }

    fn push_tagged_words<'a>(&'a self, result: &mut Vec<(&'a str, &'a L)>) {
        for child in &self.children {
            match child {
                Child::Node(t) => t.push_tagged_words(result),
                Child::Word(w) => result.push((w, &self.label)),
            }
        }
    }
}

impl Tree<String> {
    /// Reads exactly one bracketed tree.
    ///
    /// # Errors
    ///
    /// An error variant will be returned when the text is not well bracketed or does not contain
    /// exactly one tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use sapling::Tree;
    ///
    /// let t = Tree::from_bracketed("( (S (NP (N fish)) (VP (V swim))) )").unwrap();
    /// assert_eq!("S", t.label());
    /// assert_eq!(vec!["fish", "swim"], t.leaves());
    ///
    /// assert!(Tree::from_bracketed("(S (NP (N fish))").is_err());
    /// ```
    pub fn from_bracketed<S>(text: S) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let mut trees = read_treebank(text.as_ref())?;
        if trees.len() != 1 {
            return Err(SaplingError::invalid_tree(format!(
                "expected 1 tree, found {}",
                trees.len()
            )));
        }
        Ok(trees.pop().unwrap())
    }
}

impl Tree<Symbol> {
    /// Undoes binarization: intermediate nodes are spliced into their parents and markovization
    /// annotations are dropped.
    pub fn unbinarize(&self) -> Tree<String> {
        let mut children = vec![];
        self.push_unbinarized_children(&mut children);
        Tree::new(self.label.base_label().to_string(), children)
    }

    fn push_unbinarized_children(&self, result: &mut Vec<Child<String>>) {
        for child in &self.children {
            match child {
                Child::Word(w) => result.push(Child::Word(w.clone())),
                Child::Node(t) if t.label.is_intermediate() => t.push_unbinarized_children(result),
                Child::Node(t) => result.push(Child::Node(t.unbinarize())),
            }
        }
    }
}

impl<L> fmt::Display for Tree<L>
where
    L: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}", self.label)?;
        for child in &self.children {
            match child {
                Child::Node(t) => write!(f, " {t}")?,
                Child::Word(w) => write!(f, " {w}")?,
            }
        }
        write!(f, ")")
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Atom(&'a str),
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = vec![];
    let mut atom_start = None;
    for (i, c) in text.char_indices() {
        if c == '(' || c == ')' || c.is_whitespace() {
            if let Some(start) = atom_start.take() {
                tokens.push(Token::Atom(&text[start..i]));
            }
            match c {
                '(' => tokens.push(Token::Open),
                ')' => tokens.push(Token::Close),
                _ => (),
            }
        } else if atom_start.is_none() {
            atom_start = Some(i);
        }
    }
    if let Some(start) = atom_start {
        tokens.push(Token::Atom(&text[start..]));
    }
    tokens
}

/// Reads all bracketed trees in a text, such as the contents of a Penn Treebank `.mrg` file.
///
/// A tree may span several lines. An unlabeled top node wrapping a single tree is removed.
///
/// # Errors
///
/// An error variant will be returned when brackets are unbalanced or a word appears outside of
/// any bracket.
pub fn read_treebank(text: &str) -> Result<Vec<Tree<String>>> {
    let mut trees = vec![];
    let mut stack: Vec<Tree<String>> = vec![];
    let mut expect_label = false;
    for token in tokenize(text) {
        match token {
            Token::Open => {
                stack.push(Tree::new(String::new(), vec![]));
                expect_label = true;
            }
            Token::Close => {
                expect_label = false;
                let tree = stack
                    .pop()
                    .ok_or_else(|| SaplingError::invalid_tree("unexpected `)`"))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Child::Node(tree));
                } else {
                    trees.push(strip_empty_root(tree));
                }
            }
            Token::Atom(atom) => {
                let top = stack.last_mut().ok_or_else(|| {
                    SaplingError::invalid_tree(format!("`{atom}` is outside of brackets"))
                })?;
                if expect_label {
                    top.label = atom.to_string();
                    expect_label = false;
                } else {
                    top.children.push(Child::Word(atom.to_string()));
                }
            }
        }
    }
    if !stack.is_empty() {
        return Err(SaplingError::invalid_tree("unclosed `(`"));
    }
    Ok(trees)
}

fn strip_empty_root(mut tree: Tree<String>) -> Tree<String> {
    if tree.label.is_empty() && tree.children.len() == 1 {
        if let Some(Child::Node(_)) = tree.children.first() {
            if let Some(Child::Node(inner)) = tree.children.pop() {
                return inner;
            }
        }
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_treebank_multiline() {
        let text = "( (S\n    (NP (DT the) (NN dog))\n    (VP (VBD ran))) )\n(FRAG (NN hello))\n";
        let trees = read_treebank(text).unwrap();

        assert_eq!(2, trees.len());
        assert_eq!(
            "(S (NP (DT the) (NN dog)) (VP (VBD ran)))",
            trees[0].to_string()
        );
        assert_eq!("(FRAG (NN hello))", trees[1].to_string());
    }

    #[test]
    fn test_read_treebank_keeps_empty_root_with_many_children() {
        let trees = read_treebank("( (NP (NN a)) (NP (NN b)) )").unwrap();

        assert_eq!(1, trees.len());
        assert_eq!("", trees[0].label());
        assert_eq!(2, trees[0].children().len());
    }

    #[test]
    fn test_read_treebank_unbalanced() {
        let e = read_treebank("(S (NP (NN a))").unwrap_err();
        assert_eq!("InvalidTreeError: unclosed `(`", e.to_string());

        let e = read_treebank("(S (NP (NN a))))").unwrap_err();
        assert_eq!("InvalidTreeError: unexpected `)`", e.to_string());

        let e = read_treebank("word (S (NN a))").unwrap_err();
        assert_eq!(
            "InvalidTreeError: `word` is outside of brackets",
            e.to_string()
        );
    }

    #[test]
    fn test_from_bracketed_requires_one_tree() {
        let e = Tree::from_bracketed("(A (B c)) (A (B d))").unwrap_err();
        assert_eq!("InvalidTreeError: expected 1 tree, found 2", e.to_string());
        assert!(Tree::from_bracketed("").is_err());
    }

    #[test]
    fn test_empty_node() {
        let t = Tree::from_bracketed("(S (NP) (VP (V runs)))").unwrap();
        assert_eq!("(S (NP) (VP (V runs)))", t.to_string());
        assert_eq!(vec!["runs"], t.leaves());
    }

    #[test]
    fn test_tagged_words() {
        let t = Tree::from_bracketed("(S (NP (DT the) (NN dog)) (VP (VBD ran)))").unwrap();
        let tagged: Vec<(&str, &str)> = t
            .tagged_words()
            .into_iter()
            .map(|(w, t)| (w, t.as_str()))
            .collect();
        assert_eq!(vec![("the", "DT"), ("dog", "NN"), ("ran", "VBD")], tagged);
    }

    #[test]
    fn test_unbinarize() {
        let np_rest = Symbol::Intermediate {
            parent: "NP".into(),
            siblings: vec!["JJ".into(), "NN".into()],
            ancestors: vec!["S".into()],
        };
        let np = Symbol::Annotated {
            label: "NP".into(),
            ancestors: vec!["S".into()],
        };
        let t = Tree::new(
            Symbol::label("S"),
            vec![Child::Node(Tree::new(
                np,
                vec![
                    Child::Node(Tree::preterminal(Symbol::label("DT"), "the")),
                    Child::Node(Tree::new(
                        np_rest,
                        vec![
                            Child::Node(Tree::preterminal(Symbol::label("JJ"), "big")),
                            Child::Node(Tree::preterminal(Symbol::label("NN"), "dog")),
                        ],
                    )),
                ],
            ))],
        );

        assert_eq!(
            "(S (NP^<S> (DT the) (NP|<JJ-NN>^<S> (JJ big) (NN dog))))",
            t.to_string()
        );
        assert_eq!(
            "(S (NP (DT the) (JJ big) (NN dog)))",
            t.unbinarize().to_string()
        );
    }
}
