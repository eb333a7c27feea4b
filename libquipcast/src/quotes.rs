//! Quote text and the built-in fallback set

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::history::RecentHistory;

/// Twitter-compatible length limit applied when nothing else is configured.
pub const DEFAULT_MAX_CHARS: usize = 280;

const OPENING_QUOTES: [char; 4] = ['"', '\'', '“', '‘'];
const CLOSING_QUOTES: [char; 4] = ['"', '\'', '”', '’'];

/// A single postable quote.
///
/// Always normalized: no surrounding whitespace, no wrapping quotation
/// marks, never empty. Identity is the text itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quote(String);

impl Quote {
    /// Normalize raw text into a quote, or `None` if nothing is left.
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, which is what platform limits count.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }

    pub fn fits(&self, max_chars: usize) -> bool {
        self.char_count() <= max_chars
    }
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Quote {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trim whitespace and strip one pair of wrapping quotation marks.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();

    let wrapped = match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => {
            OPENING_QUOTES.contains(&first) && CLOSING_QUOTES.contains(&last)
        }
        _ => false,
    };

    if wrapped {
        chars.as_str().trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Pre-written quotes used when generation is unavailable or exhausted.
pub const FALLBACK_QUOTES: [&str; 15] = [
    "I tried to make my own oat milk… I milked the oats, Jerry! But they just got soggy!",
    "You ever been in a Zoom breakout room, Jerry? It's like being trapped in an elevator… with no buttons!",
    "I sold my neighbor an NFT of his own front door. It's art, Jerry!",
    "I was tracking my steps with a smart ring… now it thinks I'm a hummingbird!",
    "You know what the problem is with AI girlfriends? No garlic breath! It's unnatural!",
    "I bought a self-driving e-scooter, Jerry. Now it's driving me crazy!",
    "These AirPods are like having tiny robots in your ears, Jerry!",
    "I started a TikTok about my coffee table. It's got 3 followers - me, you, and the table!",
    "I tried to order oat milk at Starbucks, Jerry. They looked at me like I was from Mars!",
    "You ever notice how everyone's on their phone at the gym? It's like a digital workout!",
    "I bought a smart fridge, Jerry. Now it's judging my food choices!",
    "These delivery apps are like having a personal butler, Jerry. But the butler's always late!",
    "I tried to use voice commands on my TV, Jerry. Now it thinks I'm yelling at it!",
    "You ever been to a virtual happy hour? It's like talking to ghosts, Jerry!",
    "I started a podcast about nothing, Jerry. It's perfect!",
];

/// Immutable, ordered set of fallback quotes.
#[derive(Debug, Clone)]
pub struct FallbackQuotes {
    quotes: Vec<Quote>,
}

impl Default for FallbackQuotes {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FallbackQuotes {
    /// The set compiled into the binary
    pub fn builtin() -> Self {
        Self::from_texts(FALLBACK_QUOTES)
    }

    /// Build a set from arbitrary texts; blank entries are dropped.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            quotes: texts
                .into_iter()
                .filter_map(|t| Quote::new(t.as_ref()))
                .collect(),
        }
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Length of the shortest quote in the set
    pub fn shortest_char_count(&self) -> Option<usize> {
        self.quotes.iter().map(Quote::char_count).min()
    }

    /// Choose a fallback quote for the given history.
    ///
    /// Only quotes that fit `max_chars` are candidates. Prefers a random
    /// candidate absent from `history`; when every candidate has been posted
    /// recently, the one posted longest ago is returned. Returns `None` when
    /// no quote fits.
    pub fn pick<R: Rng + ?Sized>(
        &self,
        history: &RecentHistory,
        max_chars: usize,
        rng: &mut R,
    ) -> Option<Quote> {
        let fitting: Vec<&Quote> = self.quotes.iter().filter(|q| q.fits(max_chars)).collect();

        let fresh: Vec<&Quote> = fitting
            .iter()
            .copied()
            .filter(|q| !history.contains(q.as_str()))
            .collect();

        if let Some(quote) = fresh.choose(rng) {
            return Some((*quote).clone());
        }

        fitting
            .into_iter()
            .min_by_key(|q| history.last_position(q.as_str()))
            .cloned()
    }
}
