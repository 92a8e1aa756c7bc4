//! Rule-based structural and text features for post content.
//!
//! Each rule is a small, inspectable [`FeatureRule`] that fills in part of
//! [`TextFeatures`]. The [`FeatureExtractor`] runs its rules in order and then
//! derives structure tags from the combined result, so rules can be swapped
//! or added without touching the scoring math.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Paragraph count at which a post is tagged `long_form`.
pub const LONG_FORM_PARAGRAPHS: usize = 3;

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?。！？]+").expect("valid regex"));

static PARAGRAPH_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("valid regex"));

static BULLET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*+][ \t]+|[•·▪◦‣●✔✓✅➡→][ \t]*|\d{1,2}[.)][ \t]+)\S")
        .expect("valid regex")
});

static INLINE_HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\p{L}\p{N}_&/#])#([\p{L}\p{N}_]+)").expect("valid regex")
});

static HARD_CTA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:buy|shop|order|apply|sign[ -]?up|register|enroll|book (?:a|your|now)|subscribe|download|now|today only|limited|last chance|hurry|discount|promo code|link in (?:my )?bio|dm me|click)\b",
    )
    .expect("valid regex")
});

static SOFT_CTA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:save (?:this|it|for later)|share|comments?|follow|tag (?:a|your|someone)|let me know|double tap|bookmark)\b",
    )
    .expect("valid regex")
});

static STORY_INTRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:when i\b|i used to\b|i was\b|i remember\b|i never\b|last (?:year|month|week|summer)\b|yesterday\b|once\b|story ?time\b|here'?s (?:my|the) story\b|\d+ (?:years?|months?|weeks?) ago\b|(?:before|after)\b)",
    )
    .expect("valid regex")
});

static BEFORE_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbefore\b.*\bafter\b").expect("valid regex"));

static QUESTION_INTRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[¿]|(?:what|why|how|when|where|who|whom|whose|which)\b)")
        .expect("valid regex")
});

/// Auxiliary or imperative openers. These read as questions only when the
/// opening line ends in a question mark ("Do this now." is a statement).
static AUXILIARY_INTRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:did|do|does|is|are|was|were|can|could|would|should|will|have|has|ever|ready|want)\b",
    )
    .expect("valid regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CtaType {
    /// Hard, action/urgency language. Takes precedence over soft CTAs.
    Conversion,
    /// Soft, interaction-seeking language.
    Engagement,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntroStyle {
    Story,
    Question,
    #[default]
    Statement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFeatures {
    pub word_count: usize,
    pub char_count: usize,
    pub sentence_count: usize,
    pub avg_words_per_sentence: f64,
    pub paragraph_count: usize,
    pub has_bullets: bool,
    pub bullet_count: usize,
    pub has_hashtags: bool,
    pub hashtag_count: usize,
    pub hashtags: Vec<String>,
    pub has_hard_cta: bool,
    pub has_soft_cta: bool,
    pub cta_type: CtaType,
    pub intro_style: IntroStyle,
    pub has_emoji: bool,
    pub emoji_count: usize,
    pub structure_tags: Vec<String>,
}

/// Content handed to the rules: the post text and its explicit hashtag list.
#[derive(Debug, Clone, Copy)]
pub struct PostText<'a> {
    pub text: &'a str,
    pub hashtags: &'a [String],
}

impl<'a> PostText<'a> {
    #[must_use]
    pub fn new(text: &'a str, hashtags: &'a [String]) -> Self {
        Self { text, hashtags }
    }

    /// First line with visible content, trimmed.
    fn opening_line(&self) -> Option<&'a str> {
        self.text.lines().map(str::trim).find(|l| !l.is_empty())
    }
}

/// One swappable piece of the text classifier.
pub trait FeatureRule: Send + Sync {
    /// Stable identifier, used by [`FeatureExtractor::without_rule`].
    fn name(&self) -> &'static str;

    fn apply(&self, post: &PostText<'_>, features: &mut TextFeatures);
}

/// Ordered set of [`FeatureRule`]s.
pub struct FeatureExtractor {
    rules: Vec<Box<dyn FeatureRule>>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::empty()
            .with_rule(StructureRule)
            .with_rule(BulletRule)
            .with_rule(HashtagRule)
            .with_rule(CallToActionRule)
            .with_rule(IntroRule)
            .with_rule(EmojiRule)
    }
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("rules", &self.rule_names())
            .finish()
    }
}

impl FeatureExtractor {
    /// An extractor with no rules; everything stays at its default.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule. Later rules see (and may overwrite) earlier results.
    #[must_use]
    pub fn with_rule<R>(mut self, rule: R) -> Self
    where
        R: FeatureRule + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Drop every rule registered under `name`.
    #[must_use]
    pub fn without_rule(mut self, name: &str) -> Self {
        self.rules.retain(|r| r.name() != name);
        self
    }

    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    #[must_use]
    pub fn extract(&self, post: &PostText<'_>) -> TextFeatures {
        let mut features = TextFeatures::default();
        for rule in &self.rules {
            rule.apply(post, &mut features);
        }
        features.structure_tags = structure_tags(&features);
        features
    }
}

/// Tags summarizing the extracted features, for downstream filtering.
#[must_use]
pub fn structure_tags(features: &TextFeatures) -> Vec<String> {
    let mut tags = Vec::new();
    match features.intro_style {
        IntroStyle::Story => tags.push("story_intro"),
        IntroStyle::Question => tags.push("question_intro"),
        IntroStyle::Statement => {}
    }
    if features.has_bullets {
        tags.push("bullet_list");
    }
    match features.cta_type {
        CtaType::Conversion => tags.push("cta_hard"),
        CtaType::Engagement => tags.push("cta_soft"),
        CtaType::None => {}
    }
    if features.has_emoji {
        tags.push("emoji_rich");
    }
    if features.paragraph_count >= LONG_FORM_PARAGRAPHS {
        tags.push("long_form");
    }
    tags.into_iter().map(str::to_string).collect()
}

/// Word, character, sentence, and paragraph counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureRule;

impl FeatureRule for StructureRule {
    fn name(&self) -> &'static str {
        "structure"
    }

    #[allow(clippy::cast_precision_loss)]
    fn apply(&self, post: &PostText<'_>, features: &mut TextFeatures) {
        let text = post.text;
        features.word_count = text.split_whitespace().count();
        features.char_count = text.chars().count();
        features.sentence_count = SENTENCE_SPLIT
            .split(text)
            .filter(|s| !s.trim().is_empty())
            .count();
        features.avg_words_per_sentence = if features.sentence_count == 0 {
            0.0
        } else {
            crate::scorer::round_to(
                features.word_count as f64 / features.sentence_count as f64,
                2,
            )
        };

        let paragraphs = PARAGRAPH_SPLIT
            .split(text)
            .filter(|p| !p.trim().is_empty())
            .count();
        features.paragraph_count = if text.trim().is_empty() {
            0
        } else {
            paragraphs.max(1)
        };
    }
}

/// Lines opening with a bullet marker or a short ordinal (`1.`, `2)`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BulletRule;

impl FeatureRule for BulletRule {
    fn name(&self) -> &'static str {
        "bullets"
    }

    fn apply(&self, post: &PostText<'_>, features: &mut TextFeatures) {
        features.bullet_count = BULLET_LINE.find_iter(post.text).count();
        features.has_bullets = features.bullet_count > 0;
    }
}

/// Explicit hashtag list, else inline `#token` patterns. Stored without `#`,
/// deduplicated case-insensitively in first-seen order.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashtagRule;

impl FeatureRule for HashtagRule {
    fn name(&self) -> &'static str {
        "hashtags"
    }

    fn apply(&self, post: &PostText<'_>, features: &mut TextFeatures) {
        let explicit: Vec<&str> = post
            .hashtags
            .iter()
            .map(|t| t.trim().trim_start_matches('#').trim())
            .filter(|t| !t.is_empty())
            .collect();

        let candidates: Vec<&str> = if explicit.is_empty() {
            INLINE_HASHTAG
                .captures_iter(post.text)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect()
        } else {
            explicit
        };

        let mut seen = std::collections::HashSet::new();
        features.hashtags = candidates
            .into_iter()
            .filter(|t| seen.insert(t.to_lowercase()))
            .map(str::to_string)
            .collect();
        features.hashtag_count = features.hashtags.len();
        features.has_hashtags = features.hashtag_count > 0;
    }
}

/// Hard (conversion) versus soft (engagement) call-to-action vocabulary.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallToActionRule;

impl FeatureRule for CallToActionRule {
    fn name(&self) -> &'static str {
        "cta"
    }

    fn apply(&self, post: &PostText<'_>, features: &mut TextFeatures) {
        features.has_hard_cta = HARD_CTA.is_match(post.text);
        features.has_soft_cta = SOFT_CTA.is_match(post.text);
        features.cta_type = if features.has_hard_cta {
            CtaType::Conversion
        } else if features.has_soft_cta {
            CtaType::Engagement
        } else {
            CtaType::None
        };
    }
}

/// Opening-line style: narrative cues, then interrogatives, else statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntroRule;

impl FeatureRule for IntroRule {
    fn name(&self) -> &'static str {
        "intro"
    }

    fn apply(&self, post: &PostText<'_>, features: &mut TextFeatures) {
        features.intro_style = match post.opening_line() {
            Some(line) if STORY_INTRO.is_match(line) || BEFORE_AFTER.is_match(line) => {
                IntroStyle::Story
            }
            Some(line) if QUESTION_INTRO.is_match(line) => IntroStyle::Question,
            Some(line)
                if AUXILIARY_INTRO.is_match(line) && line.ends_with(['?', '？']) =>
            {
                IntroStyle::Question
            }
            _ => IntroStyle::Statement,
        };
    }
}

/// Pictographic code points. Joiners and variation selectors are not counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmojiRule;

impl FeatureRule for EmojiRule {
    fn name(&self) -> &'static str {
        "emoji"
    }

    fn apply(&self, post: &PostText<'_>, features: &mut TextFeatures) {
        features.emoji_count = post.text.chars().filter(|c| is_emoji(*c)).count();
        features.has_emoji = features.emoji_count > 0;
    }
}

fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F000..=0x1F02F
            | 0x1F0A0..=0x1F0FF
            | 0x1F1E6..=0x1F1FF
            | 0x1F300..=0x1F5FF
            | 0x1F600..=0x1F64F
            | 0x1F680..=0x1F6FF
            | 0x1F900..=0x1F9FF
            | 0x1FA70..=0x1FAFF
            | 0x2600..=0x26FF
            | 0x2700..=0x27BF
            | 0x231A..=0x231B
            | 0x23E9..=0x23FA
            | 0x2B50
            | 0x2B55
    )
}

#[cfg(test)]
#[path = "features_test.rs"]
mod tests;
