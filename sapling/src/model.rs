use std::io::{Read, Write};

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::errors::{Result, SaplingError};
use crate::grammar::Grammar;
use crate::lexicon::Lexicon;

const MODEL_MAGIC: &[u8] = b"SaplingModel 0.1\n";

/// Model data: a grammar and a lexicon.
#[derive(Clone, Debug)]
pub struct Model {
    pub(crate) grammar: Grammar,
    pub(crate) lexicon: Lexicon,
}

impl Model {
    pub const fn new(grammar: Grammar, lexicon: Lexicon) -> Self {
        Self { grammar, lexicon }
    }

    pub const fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub const fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn into_parts(self) -> (Grammar, Lexicon) {
        (self.grammar, self.lexicon)
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;
        bincode::encode_into_std_write(self, wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is. If the data is not a model of
    /// this version, or a rule refers to an unknown symbol, [`SaplingError::InvalidModel`] will
    /// be returned.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0; MODEL_MAGIC.len()];
        rdr.read_exact(&mut magic)?;
        if magic != MODEL_MAGIC {
            return Err(SaplingError::invalid_model(
                "model version mismatch or not a model file",
            ));
        }
        let model: Self = bincode::decode_from_std_read(rdr, bincode::config::standard())?;
        model.grammar.validate()?;
        Ok(model)
    }
}

impl Decode for Model {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self {
            grammar: Decode::decode(decoder)?,
            lexicon: Decode::decode(decoder)?,
        })
    }
}

impl Encode for Model {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.grammar, encoder)?;
        Encode::encode(&self.lexicon, encoder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mini;
    use crate::parser::Parser;
    use crate::symbol::Symbol;

    #[test]
    fn test_write_read() {
        let model = mini::model().unwrap();
        let mut data = vec![];
        model.write(&mut data).unwrap();
        let model = Model::read(&mut data.as_slice()).unwrap();

        let (s, np, vp) = (Symbol::label("S"), Symbol::label("NP"), Symbol::label("VP"));
        assert_close!(
            0.9f64.ln(),
            model.grammar().binary_log_prob(&s, &np, &vp).unwrap()
        );
        assert_eq!(11, model.grammar().n_unary_rules() + model.grammar().n_binary_rules());
        assert_eq!(vec!["N", "P", "V"], model.lexicon().tags());

        let parser = Parser::from_model(model);
        let parse = parser.parse(&["fish", "people", "fish", "tanks"], "S").unwrap();
        assert_close!(0.00018522f64.ln(), parse.log_prob());
    }

    #[test]
    fn test_write_read_smoothed_lexicon() {
        let grammar = Grammar::from_rules([("S", "NN VBZ", 1.)]).unwrap();
        let lexicon = Lexicon::from_tagged_words([("dog", "NN"), ("barks", "VBZ")]);
        let model = Model::new(grammar, lexicon);
        let mut data = vec![];
        model.write(&mut data).unwrap();
        let decoded = Model::read(&mut data.as_slice()).unwrap();

        for (word, tag) in [("dog", "NN"), ("dog", "VBZ"), ("cat", "NN")] {
            assert_close!(
                model.lexicon().score(word, tag).unwrap(),
                decoded.lexicon().score(word, tag).unwrap()
            );
        }
    }

    #[test]
    fn test_read_invalid_magic() {
        let data = b"TreebankModel 9.9\n\0\0\0\0";
        let e = Model::read(&mut data.as_slice()).unwrap_err();
        assert_eq!(
            "InvalidModelError: model version mismatch or not a model file",
            e.to_string()
        );
    }

    #[test]
    fn test_read_truncated() {
        let model = mini::model().unwrap();
        let mut data = vec![];
        model.write(&mut data).unwrap();
        data.truncate(data.len() / 2);
        assert!(Model::read(&mut data.as_slice()).is_err());
    }

    #[test]
    fn test_read_rejects_unnormalized_unary_cycle() {
        let mut grammar = Grammar::default();
        let a = grammar.symbols.get_or_insert(&Symbol::label("A"));
        let b = grammar.symbols.get_or_insert(&Symbol::label("B"));
        grammar.unaries.entry(a).or_default().accumulate(b, 2.);
        grammar.unaries.entry(b).or_default().accumulate(a, 2.);
        let lexicon = Lexicon::from_rules([("B", "w", 1.)]).unwrap();
        let model = Model::new(grammar, lexicon);

        let mut data = vec![];
        model.write(&mut data).unwrap();
        let e = Model::read(&mut data.as_slice()).unwrap_err();
        assert_eq!(
            "InvalidModelError: rule table is not normalized",
            e.to_string()
        );
    }
}
