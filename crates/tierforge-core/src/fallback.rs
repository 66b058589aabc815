//! Deterministic fallback content
//!
//! When the model is unreachable or its output can't be trusted, the
//! pipeline still owes the caller a complete three-tier [`ContentSet`].
//! [`FallbackSynthesizer::synthesize`] fills fixed per-tier templates with the
//! request's topic. It is a total function: no I/O, no randomness, no errors.
//!
//! The output must always pass [`crate::validate::validate`]; the two modules
//! change together.

use crate::types::{
    ContentSet, ContentVariant, GenerationRequest, LabExercise, Lesson, LineExplanation, Project,
    ScriptStep, Tier,
};

/// Fixed wording for one tier
struct TierTemplate {
    angle: &'static str,
    segments: [(&'static str, &'static str); 3],
    lab_focus: &'static str,
    project_focus: &'static str,
    criteria: [&'static str; 3],
}

static BASIC: TierTemplate = TierTemplate {
    angle: "builds a solid foundation, one concept at a time",
    segments: [
        ("Welcome", "what {topic} is and where you will meet it"),
        ("Core concepts", "the essential vocabulary and building blocks of {topic}"),
        ("Guided walkthrough", "a first complete example of {topic}, step by step"),
    ],
    lab_focus: "reproduce the walkthrough example on your own",
    project_focus: "a small, complete piece of work that uses the fundamentals of {topic}",
    criteria: [
        "The work runs or renders without errors",
        "Every core concept from the lesson is used at least once",
        "The learner can explain each part in their own words",
    ],
};

static INTERMEDIATE: TierTemplate = TierTemplate {
    angle: "applies proven patterns and weighs their trade-offs",
    segments: [
        ("Recap and goals", "the fundamentals of {topic} this lesson builds on"),
        ("Patterns in practice", "common patterns for {topic} and when each one fits"),
        ("Debugging and trade-offs", "typical mistakes with {topic} and how to diagnose them"),
    ],
    lab_focus: "refactor a working example of {topic} into a cleaner structure",
    project_focus: "a realistic feature built with {topic} that balances clarity and flexibility",
    criteria: [
        "At least two patterns from the lesson are applied deliberately",
        "A known pitfall is identified and avoided",
        "Design decisions are documented briefly",
    ],
};

static CREATIVE: TierTemplate = TierTemplate {
    angle: "explores open-ended ideas and combines {topic} with other skills",
    segments: [
        ("Inspiration", "surprising things people build with {topic}"),
        ("Remixing ideas", "ways to combine {topic} with other tools and disciplines"),
        ("From idea to prototype", "turning a rough idea that uses {topic} into something you can show"),
    ],
    lab_focus: "prototype an unusual use of {topic} in a short time box",
    project_focus: "an original piece that uses {topic} in a way that reflects your own interests",
    criteria: [
        "The idea is original and clearly explained",
        "The prototype demonstrates the idea end to end",
        "The learner reflects on what they would change next",
    ],
};

/// Builds schema-valid placeholder content from a request
pub struct FallbackSynthesizer;

impl FallbackSynthesizer {
    pub fn synthesize(request: &GenerationRequest) -> ContentSet {
        ContentSet::from_fn(|tier| Self::variant(tier, request))
    }

    /// Build one tier's variant from its template
    pub fn variant(tier: Tier, request: &GenerationRequest) -> ContentVariant {
        let template = template(tier);
        let topic = display_topic(request);
        let fill = |text: &str| text.replace("{topic}", &topic);

        ContentVariant {
            tier_label: tier.label().to_string(),
            assumptions: assumptions(tier, request),
            executive_summary: format!(
                "A {} lesson on {} for {} that {}.",
                tier.label().to_lowercase(),
                topic,
                display_audience(request),
                fill(template.angle)
            ),
            lesson: Lesson {
                script: template
                    .segments
                    .iter()
                    .enumerate()
                    .map(|(i, (name, subject))| ScriptStep {
                        segment_name: (*name).to_string(),
                        narration: format!("In this segment we cover {}.", fill(*subject)),
                        code: (i == template.segments.len() - 1)
                            .then(|| sample_snippet(&topic, tier)),
                        video_reference: format!("{}-segment-{}", tier.key(), i + 1),
                    })
                    .collect(),
                lab_exercise: LabExercise {
                    title: format!("{} lab: {}", tier.label(), topic),
                    instructions: format!(
                        "Work through the steps below to {}.",
                        fill(template.lab_focus)
                    ),
                    steps: vec![
                        "Read the starter code and note what is missing".to_string(),
                        format!("Complete the starter code to {}", fill(template.lab_focus)),
                        "Check your result against the lesson and fix any gaps".to_string(),
                    ],
                    starter_code: format!("// {}: starter\n// your code here\n", topic),
                    solution_code: sample_snippet(&topic, tier),
                },
                project: Project {
                    title: format!("{} project: {}", tier.label(), topic),
                    brief: format!("Create {}.", fill(template.project_focus)),
                    criteria: template.criteria.iter().map(|c| (*c).to_string()).collect(),
                    steps: vec![
                        "Outline what you will build and which lesson concepts it uses".to_string(),
                        "Build a first working version".to_string(),
                        "Review it against the criteria and refine".to_string(),
                    ],
                    line_explanations: vec![
                        LineExplanation {
                            line: format!("// {}: {} sample", topic, tier.label()),
                            explanation: "Names the topic and tier the sample belongs to"
                                .to_string(),
                        },
                        LineExplanation {
                            line: "// step 1: set up".to_string(),
                            explanation: "Marks where the learner prepares the working material"
                                .to_string(),
                        },
                    ],
                    sample_code: sample_snippet(&topic, tier),
                },
                // Echoes the hint; 0 would break the positive-duration rule
                estimated_duration_minutes: request.estimated_duration_minutes.max(1),
            },
        }
    }
}

fn template(tier: Tier) -> &'static TierTemplate {
    match tier {
        Tier::Basic => &BASIC,
        Tier::Intermediate => &INTERMEDIATE,
        Tier::Creative => &CREATIVE,
    }
}

fn display_topic(request: &GenerationRequest) -> String {
    let topic = request.topic.trim();
    if topic.is_empty() {
        "this topic".to_string()
    } else {
        topic.to_string()
    }
}

fn display_audience(request: &GenerationRequest) -> String {
    let audience = request.target_audience.trim();
    if audience.is_empty() {
        "all learners".to_string()
    } else {
        audience.to_string()
    }
}

fn assumptions(tier: Tier, request: &GenerationRequest) -> Vec<String> {
    let mut assumptions: Vec<String> = request
        .prerequisites
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| format!("Learner is comfortable with {}", p))
        .collect();

    assumptions.push(match tier {
        Tier::Basic => "No prior experience with the topic is required".to_string(),
        Tier::Intermediate => "Learner has completed the basic tier or equivalent".to_string(),
        Tier::Creative => "Learner is ready to work on open-ended problems".to_string(),
    });
    assumptions
}

fn sample_snippet(topic: &str, tier: Tier) -> String {
    format!(
        "// {}: {} sample\n// step 1: set up\n// step 2: apply the lesson concepts\n// step 3: review the result\n",
        topic,
        tier.label()
    )
}
