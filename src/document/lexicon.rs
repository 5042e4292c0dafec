use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Malformed lexicon line: {0}")]
    MalformedLine(String),
    #[error("Lexicon data is empty")]
    EmptyData,
}

/// Embedded linguistic data: stop words plus irregular lemma pairs.
///
/// Format is line-oriented. `stop <word>` and `lemma <form> <base>`.
const LEXICON_DATA: &str = "\
stop a\nstop an\nstop and\nstop are\nstop as\nstop at\nstop be\nstop been\n\
stop but\nstop by\nstop for\nstop from\nstop had\nstop has\nstop have\n\
stop he\nstop her\nstop his\nstop if\nstop in\nstop into\nstop is\nstop it\n\
stop its\nstop no\nstop not\nstop of\nstop on\nstop or\nstop our\nstop she\n\
stop that\nstop the\nstop their\nstop them\nstop then\nstop there\nstop these\n\
stop they\nstop this\nstop to\nstop was\nstop we\nstop were\nstop which\n\
stop will\nstop with\nstop would\nstop you\nstop your\n\
lemma children child\nlemma people person\nlemma men man\nlemma women woman\n\
lemma feet foot\nlemma teeth tooth\nlemma mice mouse\nlemma geese goose\n\
lemma indices index\nlemma matrices matrix\nlemma analyses analysis\n\
lemma crises crisis\nlemma theses thesis\nlemma criteria criterion\n\
lemma phenomena phenomenon\nlemma taxes tax\nlemma leaves leaf\n\
lemma paid pay\nlemma sent send\nlemma received receive\nlemma wrote write\n\
lemma written write\nlemma bought buy\nlemma sold sell\nlemma held hold\n\
lemma met meet\nlemma made make\n";

/// Stop-word list and lemmatization rules, loaded once per process and
/// shared read-only afterwards.
#[derive(Debug)]
pub struct Lexicon {
    stop_words: BTreeSet<String>,
    irregular: BTreeMap<String, String>,
}

static SHARED: OnceLock<Option<Lexicon>> = OnceLock::new();

impl Lexicon {
    /// Parse the embedded lexicon table.
    pub fn load() -> Result<Self, LexiconError> {
        Self::parse(LEXICON_DATA)
    }

    fn parse(data: &str) -> Result<Self, LexiconError> {
        if data.trim().is_empty() {
            return Err(LexiconError::EmptyData);
        }

        let mut stop_words = BTreeSet::new();
        let mut irregular = BTreeMap::new();
        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some("stop"), Some(word), None) => {
                    stop_words.insert(word.to_lowercase());
                }
                (Some("lemma"), Some(form), Some(base)) => {
                    irregular.insert(form.to_lowercase(), base.to_lowercase());
                }
                _ => return Err(LexiconError::MalformedLine(line.to_string())),
            }
        }
        Ok(Lexicon {
            stop_words,
            irregular,
        })
    }

    /// Process-wide instance. A failed load is recorded once and surfaced
    /// as `None`; callers degrade to identity lemmatization.
    pub fn shared() -> Option<&'static Lexicon> {
        SHARED
            .get_or_init(|| match Lexicon::load() {
                Ok(lexicon) => Some(lexicon),
                Err(err) => {
                    tracing::warn!(error = %err, "lexicon unavailable, degrading to plain tokenization");
                    None
                }
            })
            .as_ref()
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    /// Reduce a lowercased token to its dictionary base form.
    ///
    /// Irregular forms come from the embedded table; everything else goes
    /// through conservative suffix stripping.
    pub fn lemmatize(&self, token: &str) -> String {
        if let Some(base) = self.irregular.get(token) {
            return base.clone();
        }
        strip_suffix(token)
    }
}

/// Conservative English suffix stripping. Only rewrites when the stem
/// stays at least three characters, so short tokens pass through intact.
fn strip_suffix(token: &str) -> String {
    let n = token.len();

    if n > 5 && token.ends_with("sses") {
        return token[..n - 2].to_string();
    }
    if n > 4 && token.ends_with("ies") {
        return format!("{}y", &token[..n - 3]);
    }
    if n > 5 && token.ends_with("ing") {
        return undouble(&token[..n - 3]);
    }
    if n > 4 && token.ends_with("ed") {
        return undouble(&token[..n - 2]);
    }
    if n > 4 && token.ends_with("es") && !token.ends_with("ses") {
        return token[..n - 1].to_string();
    }
    if n > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..n - 1].to_string();
    }
    token.to_string()
}

// running → runn → run
fn undouble(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 4 && bytes[n - 1] == bytes[n - 2] && bytes[n - 1].is_ascii_alphabetic() {
        return stem[..n - 1].to_string();
    }
    stem.to_string()
}
