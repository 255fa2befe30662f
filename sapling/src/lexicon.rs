use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::errors::{Result, SaplingError};
use crate::probability_table::ProbabilityTable;
use crate::utils::SerializableHashMap;

/// Words seen fewer times than this value share probability mass with unseen words.
pub const RARE_WORD_THRESHOLD: f64 = 10.;

/// Emission model scoring a word given a part-of-speech tag.
#[derive(Clone, Debug)]
pub enum Lexicon {
    /// Model induced from a tagged corpus with smoothing for rare and unseen words.
    Smoothed(SmoothedLexicon),

    /// Model given by explicit emission probabilities.
    Fixed(FixedLexicon),
}

impl Lexicon {
    const TYPE_ID_SMOOTHED: u8 = 0;
    const TYPE_ID_FIXED: u8 = 1;

    /// Creates a smoothed lexicon from `(word, tag)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use sapling::Lexicon;
    ///
    /// let lexicon = Lexicon::from_tagged_words([
    ///     ("the", "DT"), ("dog", "NN"), ("barks", "VBZ"),
    ///     ("the", "DT"), ("cat", "NN"), ("barks", "VBZ"),
    /// ]);
    /// assert_eq!(vec!["DT", "NN", "VBZ"], lexicon.tags());
    /// assert_eq!(Some("NN"), lexicon.best_tag("unicorn"));
    /// ```
    pub fn from_tagged_words<I, W, T>(tagged_words: I) -> Self
    where
        I: IntoIterator<Item = (W, T)>,
        W: AsRef<str>,
        T: AsRef<str>,
    {
        Self::Smoothed(SmoothedLexicon::new(tagged_words))
    }

    /// Creates a fixed lexicon from `(tag, word, probability)` triples. The probabilities of each
    /// tag are normalized by their sum.
    ///
    /// # Errors
    ///
    /// If a probability is not positive, an error variant will be returned.
    pub fn from_rules<I, T, W>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, W, f64)>,
        T: AsRef<str>,
        W: AsRef<str>,
    {
        Ok(Self::Fixed(FixedLexicon::new(rules)?))
    }

    /// Gets the known tags in sorted order.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = match self {
            Self::Smoothed(lexicon) => lexicon.tags.keys().map(String::as_str).collect(),
            Self::Fixed(lexicon) => lexicon.tags.keys().map(String::as_str).collect(),
        };
        tags.sort_unstable();
        tags
    }

    /// Gets the log-probability of emitting `word` from `tag`.
    ///
    /// # Returns
    ///
    /// `None` if the model assigns no probability mass to the pair.
    pub fn score(&self, word: &str, tag: &str) -> Option<f64> {
        match self {
            Self::Smoothed(lexicon) => lexicon.score(word, tag),
            Self::Fixed(lexicon) => lexicon.score(word, tag),
        }
    }

    /// Gets the tag that emits `word` with the highest score. Ties are won by the tag that comes
    /// first in sorted order.
    pub fn best_tag(&self, word: &str) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for tag in self.tags() {
            if let Some(score) = self.score(word, tag) {
                if best.map_or(true, |(_, s)| score > s) {
                    best.replace((tag, score));
                }
            }
        }
        best.map(|(tag, _)| tag)
    }
}

impl Decode for Lexicon {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let type_id: u8 = Decode::decode(decoder)?;
        match type_id {
            Self::TYPE_ID_SMOOTHED => Ok(Self::Smoothed(Decode::decode(decoder)?)),
            Self::TYPE_ID_FIXED => Ok(Self::Fixed(Decode::decode(decoder)?)),
            _ => Err(DecodeError::Other("invalid type_id of lexicon")),
        }
    }
}

impl Encode for Lexicon {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        match self {
            Self::Smoothed(lexicon) => {
                Encode::encode(&Self::TYPE_ID_SMOOTHED, encoder)?;
                Encode::encode(lexicon, encoder)
            }
            Self::Fixed(lexicon) => {
                Encode::encode(&Self::TYPE_ID_FIXED, encoder)?;
                Encode::encode(lexicon, encoder)
            }
        }
    }
}

/// Emission model built from tag, word and word-tag counts.
///
/// For a rare word (seen fewer than [`RARE_WORD_THRESHOLD`] times) the counts are adjusted as
/// `c(w) + 1` and `c(w, t) + P_type(t)`, where `P_type(t)` is the fraction of word types whose
/// first occurrence carried `t`. The score is
/// `ln(c(w, t) / c(w)) - ln P(t) + ln((1 + c(w)) / (1 + N))`.
#[derive(Clone, Debug)]
pub struct SmoothedLexicon {
    tags: ProbabilityTable<String>,
    tag_types: ProbabilityTable<String>,
    words: SerializableHashMap<String, f64>,
    word_tags: SerializableHashMap<String, SerializableHashMap<String, f64>>,
    total: f64,
}

impl SmoothedLexicon {
    fn new<I, W, T>(tagged_words: I) -> Self
    where
        I: IntoIterator<Item = (W, T)>,
        W: AsRef<str>,
        T: AsRef<str>,
    {
        let mut tags = ProbabilityTable::new();
        let mut tag_types = ProbabilityTable::new();
        let mut words: SerializableHashMap<String, f64> = SerializableHashMap::default();
        let mut word_tags: SerializableHashMap<String, SerializableHashMap<String, f64>> =
            SerializableHashMap::default();
        let mut total = 0.;
        for (word, tag) in tagged_words {
            let (word, tag) = (word.as_ref(), tag.as_ref());
            if !words.contains_key(word) {
                tag_types.accumulate(tag.to_string(), 1.);
            }
            tags.accumulate(tag.to_string(), 1.);
            *words.entry(word.to_string()).or_insert(0.) += 1.;
            *word_tags
                .entry(word.to_string())
                .or_default()
                .entry(tag.to_string())
                .or_insert(0.) += 1.;
            total += 1.;
        }
        tags.normalize(None);
        tag_types.normalize(None);
        Self {
            tags,
            tag_types,
            words,
            word_tags,
            total,
        }
    }

    fn score(&self, word: &str, tag: &str) -> Option<f64> {
        let log_p_tag = self.tags.get(tag)?;
        let mut c_word = self.words.get(word).copied().unwrap_or(0.);
        let mut c_tag_word = self
            .word_tags
            .get(word)
            .and_then(|t| t.get(tag))
            .copied()
            .unwrap_or(0.);
        if c_word < RARE_WORD_THRESHOLD {
            c_word += 1.;
            c_tag_word += self.tag_types.get(tag).map_or(0., f64::exp);
        }
        if c_tag_word <= 0. {
            return None;
        }
        let p_word = (1. + c_word) / (1. + self.total);
        Some((c_tag_word / c_word).ln() - log_p_tag + p_word.ln())
    }
}

impl Decode for SmoothedLexicon {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self {
            tags: Decode::decode(decoder)?,
            tag_types: Decode::decode(decoder)?,
            words: Decode::decode(decoder)?,
            word_tags: Decode::decode(decoder)?,
            total: Decode::decode(decoder)?,
        })
    }
}

impl Encode for SmoothedLexicon {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.tags, encoder)?;
        Encode::encode(&self.tag_types, encoder)?;
        Encode::encode(&self.words, encoder)?;
        Encode::encode(&self.word_tags, encoder)?;
        Encode::encode(&self.total, encoder)?;
        Ok(())
    }
}

/// Emission model given by explicit probabilities.
#[derive(Clone, Debug)]
pub struct FixedLexicon {
    tags: SerializableHashMap<String, ProbabilityTable<String>>,
}

impl FixedLexicon {
    fn new<I, T, W>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, W, f64)>,
        T: AsRef<str>,
        W: AsRef<str>,
    {
        let mut tags: SerializableHashMap<String, ProbabilityTable<String>> =
            SerializableHashMap::default();
        for (tag, word, prob) in rules {
            let (tag, word) = (tag.as_ref(), word.as_ref());
            if !(prob.is_finite() && prob > 0.) {
                return Err(SaplingError::invalid_argument(
                    "rules",
                    format!("`{tag} -> {word}` has a non-positive probability {prob}"),
                ));
            }
            tags.entry(tag.to_string())
                .or_default()
                .accumulate(word.to_string(), prob);
        }
        for table in tags.values_mut() {
            table.normalize(None);
        }
        Ok(Self { tags })
    }

    fn score(&self, word: &str, tag: &str) -> Option<f64> {
        self.tags.get(tag)?.get(word)
    }
}

impl Decode for FixedLexicon {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self {
            tags: Decode::decode(decoder)?,
        })
    }
}

impl Encode for FixedLexicon {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.tags, encoder)
    }
}
