//! The fixed keyword vocabulary every signal source is queried with.
//!
//! Order matters: it breaks ties in trend rankings and decides which keyword
//! wins a partial topic match.

pub const AI_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural networks",
    "GPT",
    "Claude",
    "ChatGPT",
    "LLM",
    "large language model",
    "generative AI",
    "computer vision",
    "natural language processing",
    "NLP",
    "transformer",
    "OpenAI",
    "Anthropic",
    "Google AI",
    "Meta AI",
    "AI research",
    "AGI",
    "reinforcement learning",
    "diffusion models",
    "stable diffusion",
    "midjourney",
    "AI ethics",
    "AI safety",
    "AI regulation",
    "AI governance",
    "AI bias",
    "robotics",
    "autonomous",
    "AI startup",
    "AI funding",
    "AI breakthrough",
];

/// Owned copy of the default vocabulary.
pub fn default_vocabulary() -> Vec<String> {
    AI_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Sum `value` into every vocabulary keyword that appears in `text`
/// (case-insensitive). Shared by sources that scan post titles.
pub fn tally_keywords(
    text: &str,
    value: f64,
    vocabulary: &[String],
    into: &mut std::collections::HashMap<String, f64>,
) {
    let text = text.to_lowercase();
    for keyword in vocabulary {
        if text.contains(&keyword.to_lowercase()) {
            *into.entry(keyword.clone()).or_insert(0.0) += value;
        }
    }
}
