//! Character trie used as an inverted index from words to story identifiers
//!
//! Each node has 26 child slots (ASCII letters, case-folded), an end-of-word
//! flag and the identifiers attached to the word ending there. Words are
//! walked character by character:
//!
//! - `! , . : ; ?` are skipped without descending
//! - ASCII letters fold to a slot and descend (creating nodes on insert)
//! - anything else fails the whole word with [`TokenError::InvalidCharacter`]
//!
//! Text is split into words on single spaces. Failures are collected per word,
//! so one malformed word never prevents its neighbours from being indexed or
//! matched. The trie is not synchronized; [`crate::SearchCache`] owns it behind
//! a lock.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Characters dropped from words before indexing or lookup
pub const PUNCTUATION: [char; 6] = ['!', ',', '.', ':', ';', '?'];

const ALPHABET_SIZE: usize = 26;

/// Per-word tokenizer outcome that is not a success
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenError {
    /// The word contains a character that is neither a letter nor skippable punctuation
    #[error("invalid character {character:?} at position {position} in word {word:?}")]
    InvalidCharacter { word: String, character: char, position: usize },

    /// The word is not indexed
    #[error("word not found: {word:?}")]
    NotFound { word: String },
}

impl TokenError {
    /// The word as it appeared in the input
    pub fn word(&self) -> &str {
        match self {
            Self::InvalidCharacter { word, .. } => word,
            Self::NotFound { word } => word,
        }
    }
}

/// Split text into raw words on single spaces, dropping empty pieces
pub fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ').filter(|word| !word.is_empty())
}

/// Fold a word to the token the trie stores for it
///
/// Returns an empty string for words made only of punctuation.
pub fn normalize(word: &str) -> Result<String, TokenError> {
    fold(word).map(|slots| token_from_slots(&slots))
}

/// Map a word to child-slot indexes
fn fold(word: &str) -> Result<Vec<usize>, TokenError> {
    let mut slots = Vec::with_capacity(word.len());

    for (position, character) in word.chars().enumerate() {
        if PUNCTUATION.contains(&character) {
            continue;
        }
        if !character.is_ascii_alphabetic() {
            return Err(TokenError::InvalidCharacter { word: word.to_string(), character, position });
        }
        slots.push((character.to_ascii_lowercase() as u8 - b'a') as usize);
    }

    Ok(slots)
}

fn token_from_slots(slots: &[usize]) -> String {
    slots.iter().map(|&slot| (b'a' + slot as u8) as char).collect()
}

/// Identifiers in first-seen order without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet {
    order: Vec<Uuid>,
    seen: HashSet<Uuid>,
}

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an id, returning whether it was new
    pub fn insert(&mut self, id: Uuid) -> bool {
        if self.seen.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.order.iter()
    }

    pub fn into_vec(self) -> Vec<Uuid> {
        self.order
    }
}

impl Extend<Uuid> for IdSet {
    fn extend<I: IntoIterator<Item = Uuid>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

/// Result of indexing a piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Tokens registered for the id, in text order
    pub tokens: Vec<String>,
    /// Words that could not be indexed, in text order
    pub errors: Vec<TokenError>,
}

/// Result of a multi-word lookup
///
/// `ids` is the union over every word that matched; `errors` lists the words
/// that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Lookup {
    pub ids: Vec<Uuid>,
    pub errors: Vec<TokenError>,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: [Option<Box<TrieNode>>; ALPHABET_SIZE],
    end_of_word: bool,
    ids: Vec<Uuid>,
}

impl TrieNode {
    fn descend(&self, slots: &[usize]) -> Option<&TrieNode> {
        let mut node = self;
        for &slot in slots {
            node = node.children[slot].as_deref()?;
        }
        Some(node)
    }

    fn descend_mut(&mut self, slots: &[usize]) -> Option<&mut TrieNode> {
        let mut node = self;
        for &slot in slots {
            node = node.children[slot].as_deref_mut()?;
        }
        Some(node)
    }
}

/// 26-ary word index; see the module docs for tokenization rules
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
    words: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one word against `id`
    ///
    /// Returns the stored token, or `None` when the word folds to nothing
    /// (empty or punctuation only). On error nothing is recorded for the word.
    pub fn insert(&mut self, word: &str, id: Uuid) -> Result<Option<String>, TokenError> {
        let slots = fold(word)?;
        if slots.is_empty() {
            return Ok(None);
        }

        let mut node = &mut self.root;
        for &slot in &slots {
            node = node.children[slot].get_or_insert_with(Box::default).as_mut();
        }

        if !node.end_of_word {
            node.end_of_word = true;
            self.words += 1;
        }
        if !node.ids.contains(&id) {
            node.ids.push(id);
        }

        Ok(Some(token_from_slots(&slots)))
    }

    /// Index every word of `text` against `id`
    pub fn insert_sentence(&mut self, text: &str, id: Uuid) -> IndexReport {
        let mut report = IndexReport::default();

        for word in split_words(text) {
            match self.insert(word, id) {
                Ok(Some(token)) => report.tokens.push(token),
                Ok(None) => {}
                Err(err) => report.errors.push(err),
            }
        }

        report
    }

    /// Merge the identifiers indexed under `word` into `results`
    pub fn search(&self, word: &str, results: &mut IdSet) -> Result<(), TokenError> {
        let slots = fold(word)?;
        self.collect(word, &slots, results)
    }

    fn collect(&self, word: &str, slots: &[usize], results: &mut IdSet) -> Result<(), TokenError> {
        match self.root.descend(slots) {
            Some(node) if node.end_of_word => {
                results.extend(node.ids.iter().copied());
                Ok(())
            }
            _ => Err(TokenError::NotFound { word: word.to_string() }),
        }
    }

    /// Resolve every word of `query`, returning the union of matches
    ///
    /// Lookup failures do not abort the query.
    pub fn get_ids(&self, query: &str) -> Lookup {
        let mut ids = IdSet::new();
        let mut errors = Vec::new();

        for word in split_words(query) {
            let outcome = match fold(word) {
                Ok(slots) if slots.is_empty() => continue,
                Ok(slots) => self.collect(word, &slots, &mut ids),
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                errors.push(err);
            }
        }

        Lookup { ids: ids.into_vec(), errors }
    }

    /// Detach `id` from `word`
    ///
    /// Clears the end-of-word flag once no identifiers remain. Nodes are kept.
    pub fn remove(&mut self, word: &str, id: Uuid) -> bool {
        let Ok(slots) = fold(word) else {
            return false;
        };
        let Some(node) = self.root.descend_mut(&slots) else {
            return false;
        };

        let before = node.ids.len();
        node.ids.retain(|existing| *existing != id);
        let removed = node.ids.len() != before;

        if removed && node.ids.is_empty() && node.end_of_word {
            node.end_of_word = false;
            self.words -= 1;
        }

        removed
    }

    /// Number of distinct words currently indexed
    pub fn word_count(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }
}
