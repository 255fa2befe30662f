use std::fmt;

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

/// Grammar symbol.
///
/// Symbols created by markovization keep their context as structured data, so they can never
/// collide with a label that occurs in the training data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub enum Symbol {
    /// Label as it appears in a treebank or a rule list. (e.g. `NP`)
    Label(String),

    /// Label annotated with its ancestors by vertical markovization. (e.g. `NP^<S>`)
    Annotated {
        label: String,
        ancestors: Vec<String>,
    },

    /// Intermediate node created by binarization, standing for the remaining children of
    /// `parent`. (e.g. `NP|<JJ-NN>^<S>`)
    Intermediate {
        parent: String,
        siblings: Vec<String>,
        ancestors: Vec<String>,
    },
}

impl Symbol {
    /// Creates a plain label.
    ///
    /// # Examples
    ///
    /// ```
    /// use sapling::Symbol;
    ///
    /// assert_eq!("NP", Symbol::label("NP").to_string());
    /// ```
    pub fn label<S>(label: S) -> Self
    where
        S: Into<String>,
    {
        Self::Label(label.into())
    }

    /// Gets the treebank label this symbol was derived from.
    pub fn base_label(&self) -> &str {
        match self {
            Self::Label(label) | Self::Annotated { label, .. } => label,
            Self::Intermediate { parent, .. } => parent,
        }
    }

    pub const fn is_intermediate(&self) -> bool {
        matches!(self, Self::Intermediate { .. })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Label(label) => write!(f, "{label}"),
            Self::Annotated { label, ancestors } => {
                write!(f, "{label}^<{}>", ancestors.join("-"))
            }
            Self::Intermediate {
                parent,
                siblings,
                ancestors,
            } => {
                write!(f, "{parent}|<{}>", siblings.join("-"))?;
                if !ancestors.is_empty() {
                    write!(f, "^<{}>", ancestors.join("-"))?;
                }
                Ok(())
            }
        }
    }
}

/// Dense identifier of a symbol in a [`SymbolTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct SymbolId(pub(crate) usize);

impl SymbolId {
    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Interns symbols to dense identifiers in order of first appearance.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    ids: HashMap<Symbol, SymbolId>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the identifier of `symbol`, assigning a new one if it is not interned yet.
    pub fn get_or_insert(&mut self, symbol: &Symbol) -> SymbolId {
        if let Some(&id) = self.ids.get(symbol) {
            id
        } else {
            let id = SymbolId(self.symbols.len());
            self.symbols.push(symbol.clone());
            self.ids.insert(symbol.clone(), id);
            id
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<SymbolId> {
        self.ids.get(symbol).copied()
    }

    /// Gets the symbol of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this table.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Decode for SymbolTable {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let symbols: Vec<Symbol> = Decode::decode(decoder)?;
        let ids: HashMap<_, _> = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), SymbolId(i)))
            .collect();
        if ids.len() != symbols.len() {
            return Err(DecodeError::Other("duplicate symbol in symbol table"));
        }
        Ok(Self { ids, symbols })
    }
}

impl Encode for SymbolTable {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.symbols, encoder)
    }
}
