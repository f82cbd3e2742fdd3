//! Prompt system for tripweave.
//!
//! Structured prompt management with:
//! - YAML prompt definitions, built in or overridden per workspace
//! - Strict Handlebars rendering of system and user messages

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt_ids, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec};

/// Prompt that turns retrieved context into a day-by-day itinerary.
pub const ITINERARY_PLAN: &str = "itinerary.plan";

/// Prompt that extracts vibe tags from a corpus record.
pub const VIBES_EXTRACT: &str = "vibes.extract";
