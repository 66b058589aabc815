//! Core data model: requests, tiers and the three-tier content set
//!
//! Field names serialize in snake_case, which is also the shape the model is
//! asked to emit (see [`crate::prompt`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Default duration hint when the caller does not provide one
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Lower bound of the share of a tier's time that should be narration
pub const NARRATION_SHARE_MIN: f64 = 0.60;

/// Upper bound of the share of a tier's time that should be narration
pub const NARRATION_SHARE_MAX: f64 = 0.70;

/// One of the three fixed difficulty/approach levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Basic,
    Intermediate,
    Creative,
}

impl Tier {
    /// All tiers, in the order they appear in a content set
    pub const ALL: [Tier; 3] = [Tier::Basic, Tier::Intermediate, Tier::Creative];

    /// JSON key of the tier inside a content set
    pub fn key(self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Intermediate => "intermediate",
            Tier::Creative => "creative",
        }
    }

    /// Canonical human-facing label
    pub fn label(self) -> &'static str {
        match self {
            Tier::Basic => "Basic",
            Tier::Intermediate => "Intermediate",
            Tier::Creative => "Creative",
        }
    }

    /// Minimum lesson length the model is asked to plan for
    pub fn min_duration_minutes(self) -> u32 {
        match self {
            Tier::Basic => 180,
            Tier::Intermediate => 360,
            Tier::Creative => 600,
        }
    }

    pub fn from_key(key: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|tier| tier.key() == key)
    }

    /// Labels are matched case-insensitively, surrounding whitespace ignored
    pub fn from_label(label: &str) -> Option<Tier> {
        let label = label.trim();
        Tier::ALL
            .into_iter()
            .find(|tier| tier.label().eq_ignore_ascii_case(label))
    }

    fn index(self) -> usize {
        match self {
            Tier::Basic => 0,
            Tier::Intermediate => 1,
            Tier::Creative => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Input of one generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub target_audience: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// A hint for the model, not a contract
    #[serde(default = "default_duration_minutes")]
    pub estimated_duration_minutes: u32,
}

fn default_duration_minutes() -> u32 {
    DEFAULT_DURATION_MINUTES
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, target_audience: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            target_audience: target_audience.into(),
            prerequisites: Vec::new(),
            estimated_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.estimated_duration_minutes = minutes;
        self
    }
}

/// The three-tier aggregate returned by one generation
///
/// Stored as a tier-indexed array so code that handles content can stay
/// generic over [`Tier`]. On the wire it is an object with exactly the keys
/// `basic`, `intermediate` and `creative`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ContentSetWire", into = "ContentSetWire")]
pub struct ContentSet {
    variants: [ContentVariant; 3],
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentSetWire {
    basic: ContentVariant,
    intermediate: ContentVariant,
    creative: ContentVariant,
}

impl From<ContentSetWire> for ContentSet {
    fn from(wire: ContentSetWire) -> Self {
        Self {
            variants: [wire.basic, wire.intermediate, wire.creative],
        }
    }
}

impl From<ContentSet> for ContentSetWire {
    fn from(set: ContentSet) -> Self {
        let [basic, intermediate, creative] = set.variants;
        Self {
            basic,
            intermediate,
            creative,
        }
    }
}

impl ContentSet {
    /// Build a set by producing one variant per tier
    pub fn from_fn(mut make: impl FnMut(Tier) -> ContentVariant) -> Self {
        Self {
            variants: Tier::ALL.map(|tier| make(tier)),
        }
    }

    pub fn get(&self, tier: Tier) -> &ContentVariant {
        &self.variants[tier.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &ContentVariant)> {
        Tier::ALL.into_iter().zip(self.variants.iter())
    }
}

impl Index<Tier> for ContentSet {
    type Output = ContentVariant;

    fn index(&self, tier: Tier) -> &Self::Output {
        self.get(tier)
    }
}

/// One tier's artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentVariant {
    pub tier_label: String,
    pub assumptions: Vec<String>,
    pub executive_summary: String,
    pub lesson: Lesson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub script: Vec<ScriptStep>,
    /// "Lab, no guided code": the learner writes the solution unassisted
    #[serde(rename = "lab_ngc")]
    pub lab_exercise: LabExercise,
    pub project: Project,
    pub estimated_duration_minutes: u32,
}

/// One narrated segment of a lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub segment_name: String,
    pub narration: String,
    #[serde(default)]
    pub code: Option<String>,
    pub video_reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabExercise {
    pub title: String,
    pub instructions: String,
    pub steps: Vec<String>,
    pub starter_code: String,
    pub solution_code: String,
}

/// Capstone deliverable with criteria and an explained sample solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    pub brief: String,
    pub criteria: Vec<String>,
    pub steps: Vec<String>,
    pub line_explanations: Vec<LineExplanation>,
    pub sample_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineExplanation {
    pub line: String,
    pub explanation: String,
}
