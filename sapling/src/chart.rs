use hashbrown::HashMap;

use crate::symbol::SymbolId;

/// Contiguous range of words in a sentence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    /// Position of the first word.
    pub start: usize,

    /// Number of words covered minus one.
    pub length: usize,
}

impl Span {
    pub const fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }
}

/// Best derivation of a symbol over a span.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Backpointer {
    /// The symbol is a tag emitting the word at the start of the span.
    Terminal,

    /// The symbol rewrites to another symbol over the same span.
    Unary(SymbolId),

    /// The symbol rewrites to two symbols over adjacent spans.
    Binary {
        left: (Span, SymbolId),
        right: (Span, SymbolId),
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entry {
    pub score: f64,
    pub back: Backpointer,
}

/// Scores of the symbols derivable over one span. Entries keep their insertion order so that
/// iteration, and thus tie-breaking, is deterministic.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    entries: Vec<(SymbolId, Entry)>,
    index: HashMap<SymbolId, usize>,
}

impl Cell {
    /// Stores the derivation if the symbol is absent or `score` is strictly better.
    ///
    /// # Returns
    ///
    /// `true` if the cell changed.
    pub fn update(&mut self, symbol: SymbolId, score: f64, back: Backpointer) -> bool {
        if let Some(&i) = self.index.get(&symbol) {
            let entry = &mut self.entries[i].1;
            if score > entry.score {
                *entry = Entry { score, back };
                return true;
            }
            false
        } else {
            self.index.insert(symbol, self.entries.len());
            self.entries.push((symbol, Entry { score, back }));
            true
        }
    }

    pub fn get(&self, symbol: SymbolId) -> Option<&Entry> {
        self.index.get(&symbol).map(|&i| &self.entries[i].1)
    }

    #[inline(always)]
    pub fn score(&self, symbol: SymbolId) -> Option<f64> {
        self.get(symbol).map(|e| e.score)
    }

    /// Gets the `i`-th entry in insertion order.
    #[inline(always)]
    pub fn nth(&self, i: usize) -> (SymbolId, &Entry) {
        let (symbol, entry) = &self.entries[i];
        (*symbol, entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Entry)> {
        self.entries.iter().map(|(s, e)| (*s, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Triangular table of cells for a sentence of `n_words` words.
//
// Cells are stored by length, then by start:
//
//   length 0: (0,0) (1,0) ... (n-1,0)
//   length 1: (0,1) (1,1) ... (n-2,1)
//   ...
#[derive(Debug)]
pub struct Chart {
    n_words: usize,
    cells: Vec<Cell>,
}

impl Chart {
    pub fn new(n_words: usize) -> Self {
        Self {
            n_words,
            cells: vec![Cell::default(); n_words * (n_words + 1) / 2],
        }
    }

    #[inline(always)]
    fn offset(&self, span: Span) -> usize {
        debug_assert!(span.start + span.length < self.n_words);
        span.length * self.n_words - span.length * span.length.saturating_sub(1) / 2 + span.start
    }

    pub fn cell(&self, span: Span) -> &Cell {
        &self.cells[self.offset(span)]
    }

    pub fn cell_mut(&mut self, span: Span) -> &mut Cell {
        let offset = self.offset(span);
        &mut self.cells[offset]
    }

    /// Gets the span covering the whole sentence.
    pub const fn full_span(&self) -> Span {
        Span::new(0, self.n_words - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_update_requires_strict_improvement() {
        let mut cell = Cell::default();
        let a = SymbolId(0);
        let b = SymbolId(1);

        assert!(cell.update(a, -2., Backpointer::Terminal));
        assert!(cell.update(b, -3., Backpointer::Unary(a)));
        assert!(!cell.update(a, -2., Backpointer::Unary(b)));
        assert!(!cell.update(a, -5., Backpointer::Unary(b)));
        assert!(cell.update(b, -1., Backpointer::Terminal));

        assert_eq!(Backpointer::Terminal, cell.get(a).unwrap().back);
        assert_eq!(Some(-1.), cell.score(b));
        assert_eq!(vec![a, b], cell.iter().map(|(s, _)| s).collect::<Vec<_>>());
    }

    #[test]
    fn test_chart_offsets_are_distinct() {
        let n = 5;
        let chart = Chart::new(n);
        let mut offsets = vec![];
        for length in 0..n {
            for start in 0..n - length {
                offsets.push(chart.offset(Span::new(start, length)));
            }
        }
        let expected: Vec<usize> = (0..n * (n + 1) / 2).collect();
        assert_eq!(expected, offsets);
        assert_eq!(Span::new(0, 4), chart.full_span());
    }
}
