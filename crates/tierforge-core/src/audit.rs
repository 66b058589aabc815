//! Advisory checks against the lesson design targets
//!
//! The prompt asks for minimum tier durations and a narration share of
//! 60-70%. Validation checks shape only and fallback content echoes the
//! caller's duration hint, so these targets surface as findings, never as
//! rejections.

use std::fmt;

use crate::types::{ContentSet, ContentVariant, Tier, NARRATION_SHARE_MAX, NARRATION_SHARE_MIN};

/// Speaking rate used to turn narration text into minutes
pub const NARRATION_WORDS_PER_MINUTE: f64 = 130.0;

#[derive(Debug, Clone, PartialEq)]
pub enum FindingKind {
    DurationBelowTarget { actual: u32, minimum: u32 },
    NarrationShareOutOfRange { share: f64 },
    LabelMismatch { label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub tier: Tier,
    pub kind: FindingKind,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FindingKind::DurationBelowTarget { actual, minimum } => write!(
                f,
                "{}: duration {} min is below the {} min target",
                self.tier, actual, minimum
            ),
            FindingKind::NarrationShareOutOfRange { share } => write!(
                f,
                "{}: narration covers {:.0}% of the lesson, target is {:.0}-{:.0}%",
                self.tier,
                share * 100.0,
                NARRATION_SHARE_MIN * 100.0,
                NARRATION_SHARE_MAX * 100.0
            ),
            FindingKind::LabelMismatch { label } => {
                write!(f, "{}: labelled {:?}", self.tier, label)
            }
        }
    }
}

/// Findings for a whole content set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignAudit {
    pub findings: Vec<Finding>,
}

impl DesignAudit {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn for_tier(&self, tier: Tier) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.tier == tier)
    }
}

pub fn audit(content: &ContentSet) -> DesignAudit {
    let mut findings = Vec::new();

    for (tier, variant) in content.iter() {
        let duration = variant.lesson.estimated_duration_minutes;

        if duration < tier.min_duration_minutes() {
            findings.push(Finding {
                tier,
                kind: FindingKind::DurationBelowTarget {
                    actual: duration,
                    minimum: tier.min_duration_minutes(),
                },
            });
        }

        let share = narration_share(variant);
        if !(NARRATION_SHARE_MIN..=NARRATION_SHARE_MAX).contains(&share) {
            findings.push(Finding {
                tier,
                kind: FindingKind::NarrationShareOutOfRange { share },
            });
        }

        if Tier::from_label(&variant.tier_label) != Some(tier) {
            findings.push(Finding {
                tier,
                kind: FindingKind::LabelMismatch {
                    label: variant.tier_label.clone(),
                },
            });
        }
    }

    DesignAudit { findings }
}

/// Estimated share of the lesson spent on narration
pub fn narration_share(variant: &ContentVariant) -> f64 {
    let duration = variant.lesson.estimated_duration_minutes;
    if duration == 0 {
        return 0.0;
    }

    let words: usize = variant
        .lesson
        .script
        .iter()
        .map(|step| step.narration.split_whitespace().count())
        .sum();

    (words as f64 / NARRATION_WORDS_PER_MINUTE) / f64::from(duration)
}
