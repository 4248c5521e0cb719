//! Stage prompts, few-shot seeds, and tag vocabularies
//!
//! A profile is everything that distinguishes one stage from another: the
//! system preamble, the worked examples, and the mapping from the leading
//! token of a model response to a [`VerdictTag`]. The call mechanics are
//! shared and live in [`ClassificationStage`](crate::ClassificationStage).

use factbot_core::{Error, Exchange, Result, Verdict, VerdictTag};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which stage of the chain a profile drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Structural check: readable and not abusive
    Validity,
    /// Content check: misinformation, fact, or opinion
    Accuracy,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validity => "validity",
            Self::Accuracy => "accuracy",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a stage vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagKeyword {
    /// Leading token the model is asked to answer with (upper case)
    pub keyword: &'static str,

    /// Tag the keyword maps to
    pub tag: VerdictTag,

    /// Reason used when the model gives the keyword and nothing else
    pub default_reason: &'static str,
}

const VALIDITY_PREAMBLE: &str = "\
You screen chat messages before they are fact-checked. Reply with exactly one of \
GRAMMATICAL, UNGRAMMATICAL, HARMFUL or UNSURE, followed by a colon and a one-sentence reason. \
GRAMMATICAL means the message is a readable statement or question. \
UNGRAMMATICAL means the message is gibberish or cannot be read as a statement. \
HARMFUL means the message harasses, threatens, or demeans someone. \
UNSURE means you cannot decide. It is strictly forbidden to respond with anything else. \
Here are some sample inputs and their expected outputs:";

const VALIDITY_VOCABULARY: &[TagKeyword] = &[
    TagKeyword {
        keyword: "GRAMMATICAL",
        tag: VerdictTag::Grammatical,
        default_reason: "readable statement",
    },
    TagKeyword {
        keyword: "UNGRAMMATICAL",
        tag: VerdictTag::Ungrammatical,
        default_reason: "message could not be read as a statement",
    },
    TagKeyword {
        keyword: "HARMFUL",
        tag: VerdictTag::Harmful,
        default_reason: "message contains harmful content",
    },
    TagKeyword {
        keyword: "UNSURE",
        tag: VerdictTag::Unsure,
        default_reason: "classifier could not decide",
    },
];

const ACCURACY_PREAMBLE: &str = "\
You're tasked with finding misinformation in chat messages. Reply with exactly one of \
MISINFORMATION, FACTUAL, OPINION or UNSURE, followed by a colon and a short reason. \
When the message is false, the reason must state the correct facts. \
It is strictly forbidden to respond with anything else. \
Here are some sample inputs and their expected outputs:";

const ACCURACY_VOCABULARY: &[TagKeyword] = &[
    TagKeyword {
        keyword: "MISINFORMATION",
        tag: VerdictTag::ContainsMisinformation,
        default_reason: "message contains misinformation",
    },
    TagKeyword {
        keyword: "FACTUAL",
        tag: VerdictTag::DoesNotContainMisinformation,
        default_reason: "no misinformation found",
    },
    TagKeyword {
        keyword: "OPINION",
        tag: VerdictTag::ContainsOpinion,
        default_reason: "message states an opinion",
    },
    TagKeyword {
        keyword: "UNSURE",
        tag: VerdictTag::Unsure,
        default_reason: "classifier could not decide",
    },
];

/// Prompt content and vocabulary of one stage
#[derive(Debug, Clone)]
pub struct StageProfile {
    kind: StageKind,
    preamble: String,
    examples: Vec<(String, String)>,
    vocabulary: &'static [TagKeyword],
    unsure: VerdictTag,
}

impl StageProfile {
    /// Validity stage: {Grammatical, Ungrammatical, Harmful, Unsure}
    pub fn validity() -> Self {
        Self {
            kind: StageKind::Validity,
            preamble: VALIDITY_PREAMBLE.to_string(),
            examples: pairs(&[
                ("The earth is round", "GRAMMATICAL: A readable statement."),
                ("asdogihaw", "UNGRAMMATICAL: The text is not made of words."),
                (
                    "I know where you live and I will hurt you",
                    "HARMFUL: The message threatens violence.",
                ),
                ("Water boils at 100 degrees Celsius at sea level", "GRAMMATICAL: A readable statement."),
                ("sdf the of is", "UNGRAMMATICAL: The words do not form a statement."),
            ]),
            vocabulary: VALIDITY_VOCABULARY,
            unsure: VerdictTag::Unsure,
        }
    }

    /// Accuracy stage: {ContainsMisinformation, DoesNotContainMisinformation, ContainsOpinion, Unsure}
    pub fn accuracy() -> Self {
        Self {
            kind: StageKind::Accuracy,
            preamble: ACCURACY_PREAMBLE.to_string(),
            examples: pairs(&[
                (
                    "Covid 19 is a hoax",
                    "MISINFORMATION: COVID-19 is a real disease caused by the SARS-CoV-2 virus.",
                ),
                (
                    "The earth is flat",
                    "MISINFORMATION: The earth is an oblate spheroid, as satellite imagery and circumnavigation show.",
                ),
                (
                    "The moon landing was faked",
                    "MISINFORMATION: The Apollo landings are thoroughly documented and independently verified.",
                ),
                ("The earth is round", "FACTUAL: The earth is very nearly spherical."),
                ("Pineapple belongs on pizza", "OPINION: This is a matter of taste."),
            ]),
            vocabulary: ACCURACY_VOCABULARY,
            unsure: VerdictTag::Unsure,
        }
    }

    /// Build a profile for the given stage
    pub fn for_kind(kind: StageKind) -> Self {
        match kind {
            StageKind::Validity => Self::validity(),
            StageKind::Accuracy => Self::accuracy(),
        }
    }

    /// Replace the worked examples
    pub fn with_examples(mut self, examples: Vec<(String, String)>) -> Self {
        self.examples = examples;
        self
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn vocabulary(&self) -> &'static [TagKeyword] {
        self.vocabulary
    }

    /// Tag returned when the response cannot be mapped
    pub fn unsure_tag(&self) -> VerdictTag {
        self.unsure
    }

    /// System preamble followed by the worked examples
    pub fn seed(&self) -> Vec<Exchange> {
        let mut seed = Vec::with_capacity(1 + self.examples.len() * 2);
        seed.push(Exchange::system(self.preamble.clone()));
        for (input, output) in &self.examples {
            seed.push(Exchange::user(input.clone()));
            seed.push(Exchange::assistant(output.clone()));
        }
        seed
    }

    /// Map a response to a verdict by its leading token.
    ///
    /// The token is matched case-insensitively and exactly against the
    /// vocabulary. Whatever follows the token (minus separators) becomes the
    /// reason. Fails with [`Error::MalformedResponse`] when no keyword matches.
    pub fn parse(&self, response: &str) -> Result<Verdict> {
        let body = response.trim_start_matches(|c: char| !c.is_alphanumeric());
        let token_end = body
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(body.len());
        let (token, rest) = body.split_at(token_end);

        let entry = self
            .vocabulary
            .iter()
            .find(|entry| entry.keyword.eq_ignore_ascii_case(token))
            .ok_or_else(|| Error::malformed(truncate(response.trim(), 80)))?;

        let reason = rest
            .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '.' | ',' | '*'))
            .trim();
        let reason = if reason.is_empty() {
            entry.default_reason
        } else {
            reason
        };

        Ok(Verdict::new(entry.tag, reason))
    }

    /// Like [`parse`](Self::parse), but degrades to the unsure tag
    pub fn interpret(&self, response: &str) -> (Verdict, bool) {
        match self.parse(response) {
            Ok(verdict) => (verdict, false),
            Err(_) => (Verdict::new(self.unsure, response.trim()), true),
        }
    }
}

fn pairs(examples: &[(&str, &str)]) -> Vec<(String, String)> {
    examples
        .iter()
        .map(|(input, output)| (input.to_string(), output.to_string()))
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
