//! Keyword heuristic that buckets a conversation into general / project / estimate.

use aho_corasick::AhoCorasick;
use serde::Serialize;

use crate::conversation::{ConversationTurn, ConversationType};

/// Project-intent nouns and verbs.
const PROJECT_KEYWORDS: &[&str] = &[
    "project",
    "app",
    "application",
    "website",
    "web site",
    "landing",
    "online store",
    "e-commerce",
    "ecommerce",
    "platform",
    "mobile",
    "ios",
    "android",
    "redesign",
    "develop",
    "build",
    "create",
    "mvp",
    "startup",
    "проект",
    "прилож",
    "сайт",
    "лендинг",
    "магазин",
    "платформ",
    "разработ",
    "создать",
    "редизайн",
];

/// Cost and schedule vocabulary.
const ESTIMATE_KEYWORDS: &[&str] = &[
    "cost",
    "price",
    "pricing",
    "budget",
    "estimate",
    "how much",
    "quote",
    "timeline",
    "deadline",
    "how long",
    "hours",
    "стоимость",
    "стоит",
    "цена",
    "бюджет",
    "оценк",
    "сколько",
    "срок",
];

/// Questions about the agency itself.
const COMPANY_KEYWORDS: &[&str] = &[
    "team",
    "company",
    "agency",
    "portfolio",
    "case stud",
    "experience",
    "who are you",
    "about you",
    "clients",
    "команд",
    "компани",
    "агентств",
    "портфолио",
    "кейс",
    "опыт",
];

/// Team and portfolio questions that trigger the last-turn override.
const TEAM_OVERRIDE_KEYWORDS: &[&str] = &[
    "team",
    "portfolio",
    "designer",
    "who works",
    "your work",
    "case stud",
    "команд",
    "портфолио",
    "дизайнер",
    "кейс",
];

/// Phrases that signal the client wants something built.
const CREATION_INTENT_KEYWORDS: &[&str] = &[
    "create",
    "build",
    "develop",
    "make",
    "new project",
    "need a",
    "need an",
    "want a",
    "want an",
    "looking for",
    "создать",
    "разработать",
    "сделать",
    "нужен",
    "нужно",
    "хочу",
    "новый проект",
];

const PROJECT_WEIGHT: f64 = 2.0;
const ESTIMATE_WEIGHT: f64 = 1.5;
const COMPANY_WEIGHT: f64 = 1.0;

/// Weighted keyword hits accumulated over all user turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassificationScores {
    pub project: f64,
    pub estimate: f64,
    pub company: f64,
}

/// A keyword list compiled into one automaton.
struct KeywordSet {
    matcher: AhoCorasick,
}

impl KeywordSet {
    fn new(keywords: &[&str]) -> Self {
        // Keyword lists include Cyrillic, so inputs are lowercased before
        // matching instead of relying on ASCII case folding.
        let matcher = AhoCorasick::new(keywords).expect("Failed to build keyword matcher");
        Self { matcher }
    }

    /// Number of distinct keywords contained in `lowered`.
    fn hits(&self, lowered: &str) -> usize {
        let mut seen = vec![false; self.matcher.patterns_len()];
        for mat in self.matcher.find_overlapping_iter(lowered) {
            seen[mat.pattern().as_usize()] = true;
        }
        seen.into_iter().filter(|hit| *hit).count()
    }

    fn contains_any(&self, lowered: &str) -> bool {
        self.matcher.is_match(lowered)
    }
}

/// Buckets a conversation into a [`ConversationType`].
pub struct ConversationClassifier {
    project: KeywordSet,
    estimate: KeywordSet,
    company: KeywordSet,
    team_override: KeywordSet,
    creation_intent: KeywordSet,
}

impl ConversationClassifier {
    /// Create a classifier with the built-in bilingual keyword lists.
    pub fn new() -> Self {
        Self {
            project: KeywordSet::new(PROJECT_KEYWORDS),
            estimate: KeywordSet::new(ESTIMATE_KEYWORDS),
            company: KeywordSet::new(COMPANY_KEYWORDS),
            team_override: KeywordSet::new(TEAM_OVERRIDE_KEYWORDS),
            creation_intent: KeywordSet::new(CREATION_INTENT_KEYWORDS),
        }
    }

    /// Accumulate weighted keyword hits over every user turn.
    pub fn score(&self, turns: &[ConversationTurn]) -> ClassificationScores {
        let mut scores = ClassificationScores::default();
        for turn in turns.iter().filter(|t| t.is_user()) {
            let lowered = turn.text.to_lowercase();
            scores.project += self.project.hits(&lowered) as f64 * PROJECT_WEIGHT;
            scores.estimate += self.estimate.hits(&lowered) as f64 * ESTIMATE_WEIGHT;
            scores.company += self.company.hits(&lowered) as f64 * COMPANY_WEIGHT;
        }
        scores
    }

    /// Classify a conversation.
    ///
    /// A last user turn asking about the team or portfolio without asking
    /// for something to be built forces `General`, whatever earlier turns
    /// scored.
    pub fn classify(&self, turns: &[ConversationTurn]) -> ConversationType {
        if let Some(last) = turns.iter().rev().find(|t| t.is_user()) {
            let lowered = last.text.to_lowercase();
            if self.team_override.contains_any(&lowered)
                && !self.creation_intent.contains_any(&lowered)
            {
                tracing::debug!("Last turn asks about the team, classifying as general");
                return ConversationType::General;
            }
        }

        let scores = self.score(turns);
        let kind = if scores.project > 0.0 && scores.estimate > 0.0 {
            ConversationType::Estimate
        } else if scores.project > 0.0 {
            ConversationType::Project
        } else {
            ConversationType::General
        };

        tracing::debug!(
            project = scores.project,
            estimate = scores.estimate,
            company = scores.company,
            kind = %kind,
            "Classified conversation"
        );
        kind
    }
}

impl Default for ConversationClassifier {
    fn default() -> Self {
        Self::new()
    }
}
