use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry from the fixed challenge catalog: a leading symbol plus the
/// dare text shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengePrompt {
    pub symbol: &'static str,
    pub text: &'static str,
}

impl fmt::Display for ChallengePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbol, self.text)
    }
}

pub const CHALLENGES: [ChallengePrompt; 8] = [
    ChallengePrompt { symbol: "😁", text: "Show your biggest smile!" },
    ChallengePrompt { symbol: "😡", text: "Angry face!" },
    ChallengePrompt { symbol: "😜", text: "Stick your tongue out!" },
    ChallengePrompt { symbol: "😎", text: "Cool pose!" },
    ChallengePrompt { symbol: "😱", text: "Surprise face!" },
    ChallengePrompt { symbol: "😂", text: "Laugh hard!" },
    ChallengePrompt { symbol: "🤔", text: "Thinking face!" },
    ChallengePrompt { symbol: "🙃", text: "Upside-down smile!" },
];

/// Uniform draw with replacement; consecutive repeats are allowed.
pub fn random_challenge<R: Rng + ?Sized>(rng: &mut R) -> ChallengePrompt {
    CHALLENGES[rng.gen_range(0..CHALLENGES.len())]
}
