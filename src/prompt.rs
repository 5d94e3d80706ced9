use chrono::{DateTime, FixedOffset};

/// Date as shown to readers: prompt, titles, subject line.
pub fn display_date(now: &DateTime<FixedOffset>) -> String {
    now.format("%-m/%-d/%Y").to_string()
}

const PROMPT_TEMPLATE: &str = r#"Act as a Chief AI Scientist. Today is {date}.
Generate a high-density, technical executive briefing (approx 1500 words).

I. SOTA RESEARCH (3 Papers):
- Must be from last 48 hours.
- Include "Technical Novelty" (e.g., new loss function, architecture change).
- Include "Metrics" (e.g., 15% latency drop, 88% MMLU).

II. TRENDING TOOLS (3 Repos):
- Compare "Technical Edge" vs standard tools.

III. EXECUTIVE STRATEGY:
- 500 words on ROI, Corporate Implementation Risks, and Competitor Moves.

Return ONLY a JSON object:
{
  "intro": "Short strategic context of the day.",
  "research": [{"title": "...", "specs": "...", "metrics": "...", "link": "..."}],
  "tools": [{"name": "...", "edge": "...", "link": "..."}],
  "strategy": "Deep dive text for the manager...",
  "video": {"title": "...", "url": "..."}
}"#;

pub fn build_prompt(date: &str) -> String {
    PROMPT_TEMPLATE.replace("{date}", date)
}
