// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern-based query complexity classification.
//!
//! Classifies caller utterances into Simple/Moderate/Complex tiers with a
//! fixed, ordered set of regular expressions. No LLM pre-call, no network,
//! no latency.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use strum::{Display, EnumString};

/// Query complexity tiers, ordered `Simple < Moderate < Complex`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueryComplexity {
    /// Greetings, yes/no, thanks and goodbyes.
    Simple,
    /// Status checks, scheduling, prices, opening hours.
    Moderate,
    /// Explanations, comparisons, troubleshooting, conditionals.
    Complex,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("static classifier pattern"))
        .collect()
}

/// Anchored at the start of the utterance.
static SIMPLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"^(hi|hello|hey|good\s*(morning|afternoon|evening)|greetings)\b",
        r"^(yes|no|yeah|nope|sure|ok|okay|yep|nah)\b",
        r"^(thanks|thank\s*you|bye|goodbye|see\s*you)\b",
        r"^(what|who)\s*(is|are)\s*(your|the)\s*name",
        r"^how\s*are\s*you",
    ])
});

static MODERATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(status|update|check)\s*(on|for|of)",
        r"(is\s*(my|the|it)\s*\w+\s*ready)",
        r"(when|what\s*time|how\s*long)",
        r"(schedule|book|appointment|available)",
        r"(price|cost|how\s*much)",
        r"(hours|open|close|location|address)",
    ])
});

// Unanchored substring matches: "all" also hits "call", "if" hits "life".
static COMPLEX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(explain|describe|tell\s*me\s*(about|more)|elaborate)",
        r"(why|how\s*does|how\s*do\s*I|what\s*should\s*I)",
        r"(compare|difference|between|versus|vs)",
        r"(recommend|suggest|advice|opinion)",
        r"(problem|issue|trouble|not\s*working|broken)",
        r"(multiple|several|many|list|all)",
        r"(if|when|then|because|however|although)",
    ])
});

const APPOINTMENT_KEYWORDS: &[&str] = &[
    "appointment",
    "schedule",
    "book",
    "reserve",
    "cancel",
    "reschedule",
    "change",
    "available",
    "slot",
    "time",
    "date",
    "calendar",
];

/// Deterministic, case-insensitive utterance classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryClassifier;

impl QueryClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an utterance into a complexity tier.
    ///
    /// Order matters: a short (≤ 3 word) utterance that opens with a simple
    /// pattern is Simple even when it also contains a complex keyword
    /// ("yes, explain"); otherwise complex patterns win over moderate ones,
    /// which win over simple ones, and unmatched text falls back on length.
    pub fn classify(&self, utterance: &str) -> QueryComplexity {
        let text = utterance.trim().to_lowercase();
        let word_count = text.split_whitespace().count();

        if word_count <= 3 && matches_any(&SIMPLE_PATTERNS, &text) {
            return QueryComplexity::Simple;
        }
        if matches_any(&COMPLEX_PATTERNS, &text) {
            return QueryComplexity::Complex;
        }
        if matches_any(&MODERATE_PATTERNS, &text) {
            return QueryComplexity::Moderate;
        }
        if matches_any(&SIMPLE_PATTERNS, &text) {
            return QueryComplexity::Simple;
        }

        if word_count > 15 {
            QueryComplexity::Complex
        } else {
            QueryComplexity::Moderate
        }
    }

    /// Whether the utterance mentions scheduling (plain substring match).
    pub fn is_appointment_related(&self, utterance: &str) -> bool {
        let text = utterance.to_lowercase();
        APPOINTMENT_KEYWORDS.iter().any(|k| text.contains(k))
    }
}

fn matches_any(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}
