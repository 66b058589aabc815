//! Prompt construction
//!
//! Builds the system and user messages for one generation. The system
//! message carries the whole output contract (schema, tier targets,
//! narration ratio, formatting rules); the user message carries the request.

use serde::Serialize;

use crate::types::{GenerationRequest, Tier, NARRATION_SHARE_MAX, NARRATION_SHARE_MIN};

/// Nested schema the model must follow, one entry per tier key
const VARIANT_SCHEMA: &str = r#"{
  "tier_label": string,
  "assumptions": [string],
  "executive_summary": string,
  "lesson": {
    "script": [
      {
        "segment_name": string,
        "narration": string (non-empty, the words spoken by the instructor),
        "code": string or null,
        "video_reference": string
      }
    ] (at least one step),
    "lab_ngc": {
      "title": string,
      "instructions": string,
      "steps": [string] (at least one),
      "starter_code": string,
      "solution_code": string
    },
    "project": {
      "title": string,
      "brief": string,
      "criteria": [string] (at least one),
      "steps": [string] (at least one),
      "line_explanations": [{ "line": string, "explanation": string }],
      "sample_code": string
    },
    "estimated_duration_minutes": integer (positive)
  }
}"#;

/// System + user message pair for one chat completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system_message: String,
    pub user_message: String,
}

/// Builds prompts from generation requests
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(request: &GenerationRequest) -> Prompt {
        Prompt {
            system_message: Self::build_system_message(),
            user_message: Self::build_user_message(request),
        }
    }

    /// The output contract does not depend on the request
    pub fn build_system_message() -> String {
        let mut prompt = String::with_capacity(4096);

        prompt.push_str(
            "You are an instructional designer producing complete, self-paced lessons. \
             For every request you write THREE versions of the same lesson, one per tier.\n\n",
        );

        prompt.push_str("=== TIERS ===\n");
        for tier in Tier::ALL {
            prompt.push_str(&format!(
                "- \"{}\": tier_label \"{}\", {}, estimated_duration_minutes >= {}\n",
                tier.key(),
                tier.label(),
                Self::tier_approach(tier),
                tier.min_duration_minutes()
            ));
        }
        prompt.push('\n');

        prompt.push_str("=== TIMING ===\n");
        prompt.push_str(&format!(
            "Narration across the script must account for {:.0}-{:.0}% of each tier's \
             estimated_duration_minutes. The lab and the project fill the remaining time.\n\n",
            NARRATION_SHARE_MIN * 100.0,
            NARRATION_SHARE_MAX * 100.0
        ));

        prompt.push_str("=== OUTPUT SCHEMA ===\n");
        prompt.push_str(
            "Return one JSON object with exactly the keys \"basic\", \"intermediate\" and \
             \"creative\". Each value has this shape:\n",
        );
        prompt.push_str(VARIANT_SCHEMA);
        prompt.push_str("\n\n");

        prompt.push_str("=== OUTPUT FORMAT ===\n");
        prompt.push_str(
            "- Respond with JSON only: no prose, no markdown, no code fences\n\
             - Escape newlines inside strings as \\n, never emit raw line breaks in a string\n\
             - Escape double quotes inside strings\n\
             - Use null for a script step without code\n\
             - Do not add keys that are not in the schema\n",
        );

        prompt
    }

    pub fn build_user_message(request: &GenerationRequest) -> String {
        let prerequisites = if request.prerequisites.is_empty() {
            "none".to_string()
        } else {
            request.prerequisites.join(", ")
        };

        format!(
            "Create the three lesson versions for the following course request.\n\n\
             Topic: {}\n\
             Target audience: {}\n\
             Prerequisites: {}\n\
             Duration hint: about {} minutes (tier minimums still apply)\n",
            request.topic.trim(),
            request.target_audience.trim(),
            prerequisites,
            request.estimated_duration_minutes
        )
    }

    fn tier_approach(tier: Tier) -> &'static str {
        match tier {
            Tier::Basic => "fundamentals first, small steps, no assumed experience beyond the prerequisites",
            Tier::Intermediate => "applied patterns, trade-offs and debugging of realistic code",
            Tier::Creative => "open-ended exploration that combines the topic with other ideas",
        }
    }
}
