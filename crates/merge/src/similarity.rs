//! Name similarity scores on a 0-100 scale.

use serde::{Deserialize, Serialize};

/// Which similarity function the fuzzy phase uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Indel ratio over alphabetically sorted tokens. Token order does not matter.
    #[default]
    TokenSort,
    /// Jaro-Winkler over sorted tokens. Rewards shared prefixes.
    JaroWinkler,
}

impl Scorer {
    pub fn score(&self, a: &str, b: &str) -> u8 {
        match self {
            Self::TokenSort => token_sort_ratio(a, b),
            Self::JaroWinkler => {
                let (a, b) = (sorted_tokens(a), sorted_tokens(b));
                if a.is_empty() || b.is_empty() {
                    return 0;
                }
                to_percent(strsim::jaro_winkler(&a, &b))
            }
        }
    }
}

impl std::fmt::Display for Scorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenSort => write!(f, "token_sort"),
            Self::JaroWinkler => write!(f, "jaro_winkler"),
        }
    }
}

/// Similarity of two strings after lower-casing, replacing non-alphanumerics
/// with spaces and sorting the tokens. `"guerra javi"` and `"Javi Guerra"`
/// score 100. Empty input on either side scores 0.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let (a, b) = (sorted_tokens(a), sorted_tokens(b));
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    ratio(&a, &b)
}

/// Indel similarity: `2 * lcs / (len_a + len_b)`, scaled and rounded.
fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    to_percent(2.0 * lcs_len(&a, &b) as f64 / total as f64)
}

/// Longest common subsequence length, two-row dynamic programming.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn sorted_tokens(s: &str) -> String {
    let processed: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn to_percent(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}
