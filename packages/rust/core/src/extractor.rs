//! Recovery of a structured decision from free-text advisory output.
//!
//! Responses often arrive wrapped in a ```` ```json ```` fence or surrounded by
//! prose. [`extract`] never fails: anything it cannot interpret becomes the
//! conservative [`fallback_strategy`], and the raw text plus the parse error
//! are logged.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use changedoc_shared::{
    ChangeDocError, ContentType, DocumentationAction, DocumentationPlan, DocumentationStrategy,
    Priority, Result,
};

/// Reasoning attached to the fallback strategy.
pub const FALLBACK_REASONING: &str = "fallback: could not interpret advisory response";

/// Target page used by [`extract`] when no better name is known.
pub const FALLBACK_TARGET_PAGE: &str = "Data-Changes";

/// Opening fence of a block labeled as JSON.
const JSON_FENCE: &str = "```json";

const FENCE: &str = "```";

static FENCED_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*\n(.*?)\n```").expect("valid regex"));

/// Extract a strategy, falling back to [`FALLBACK_TARGET_PAGE`].
pub fn extract(raw: &str) -> DocumentationStrategy {
    extract_or(raw, FALLBACK_TARGET_PAGE)
}

/// Extract a strategy, using `fallback_page` as the target if the response
/// cannot be interpreted.
pub fn extract_or(raw: &str, fallback_page: &str) -> DocumentationStrategy {
    match try_extract(raw) {
        Ok(strategy) => {
            debug!(
                action = strategy.action().as_str(),
                targets = ?strategy.target_pages(),
                "advisory decision parsed"
            );
            strategy
        }
        Err(e) => {
            warn!(error = %e, raw = %raw, "could not interpret advisory response, using fallback strategy");
            fallback_strategy(fallback_page)
        }
    }
}

/// Strict variant of [`extract`]: returns the parse error instead of falling back.
pub fn try_extract(raw: &str) -> Result<DocumentationStrategy> {
    let cleaned = strip_fences(raw);
    let first_err = match parse_strategy(&cleaned) {
        Ok(strategy) => return Ok(strategy),
        Err(e) => e,
    };

    // Decision embedded in narrative text: try a fenced block anywhere, then
    // the outermost brace span.
    let embedded = FENCED_JSON_RE
        .captures(raw)
        .map(|caps| caps[1].trim().to_string())
        .into_iter()
        .chain(outer_object(raw).map(str::to_string));

    for candidate in embedded {
        if candidate == cleaned {
            continue;
        }
        if let Ok(strategy) = parse_strategy(&candidate) {
            return Ok(strategy);
        }
    }

    Err(first_err)
}

/// The conservative default: document the change on one new page.
pub fn fallback_strategy(target_page: &str) -> DocumentationStrategy {
    DocumentationStrategy {
        needs_documentation: true,
        reasoning: FALLBACK_REASONING.to_string(),
        changes_summary: String::new(),
        plan: DocumentationPlan {
            action: DocumentationAction::CreateNewPage,
            target_pages: vec![target_page.to_string()],
            content_type: ContentType::Mixed,
            priority: Priority::Medium,
            primary_page: None,
            sections_to_update: Vec::new(),
            new_sections_needed: Vec::new(),
        },
    }
}

/// Remove a fence wrapping the whole response.
fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.starts_with(JSON_FENCE) {
        if let Some(caps) = FENCED_JSON_RE.captures(trimmed) {
            return caps[1].trim().to_string();
        }
        return trimmed
            .replace(JSON_FENCE, "")
            .replace(FENCE, "")
            .trim()
            .to_string();
    }

    if let Some(rest) = trimmed.strip_prefix(FENCE) {
        // Drop the opener line (which may carry some other label).
        let body = rest.split_once('\n').map_or("", |(_, body)| body);
        let body = body.trim_end();
        let body = body.strip_suffix(FENCE).unwrap_or(body);
        return body.trim().to_string();
    }

    trimmed.to_string()
}

/// Slice from the first `{` to the last `}`, if any.
fn outer_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_strategy(text: &str) -> Result<DocumentationStrategy> {
    let strategy: DocumentationStrategy =
        serde_json::from_str(text).map_err(|e| ChangeDocError::parse(e.to_string()))?;

    if strategy.needs_documentation && strategy.plan.target_pages.is_empty() {
        return Err(ChangeDocError::parse(
            "decision requires documentation but names no target pages",
        ));
    }

    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: &str = r#"{
  "needs_documentation": true,
  "reasoning": "New column on users",
  "changes_summary": "users.email added",
  "documentation_strategy": {
    "action": "update_existing_page",
    "target_pages": ["Database Schema"],
    "primary_page": "Database Schema",
    "content_type": "schema",
    "priority": "high",
    "sections_to_update": ["users"],
    "new_sections_needed": []
  }
}"#;

    fn sample() -> DocumentationStrategy {
        DocumentationStrategy {
            needs_documentation: true,
            reasoning: "Endpoints changed".into(),
            changes_summary: "Orders API returns totals".into(),
            plan: DocumentationPlan {
                action: DocumentationAction::UpdateMultiplePages,
                target_pages: vec!["API Reference".into(), "Data Flow".into()],
                content_type: ContentType::Interface,
                priority: Priority::Low,
                primary_page: Some("API Reference".into()),
                sections_to_update: vec!["Orders".into()],
                new_sections_needed: vec!["Totals".into()],
            },
        }
    }

    #[test]
    fn clean_input_parses() {
        let s = extract(CLEAN);
        assert!(s.needs_documentation);
        assert_eq!(s.action(), DocumentationAction::UpdateExistingPage);
        assert_eq!(s.target_pages(), ["Database Schema"]);
        assert_eq!(s.plan.content_type, ContentType::Schema);
        assert_eq!(s.plan.priority, Priority::High);
        assert_eq!(s.plan.primary_page.as_deref(), Some("Database Schema"));
    }

    #[test]
    fn serialized_strategy_is_a_fixed_point() {
        let s = sample();
        let json = serde_json::to_string(&s).expect("serialize");
        assert_eq!(extract(&json), s);

        let pretty = serde_json::to_string_pretty(&s).expect("serialize");
        assert_eq!(extract(&pretty), s);
    }

    #[test]
    fn json_fence_matches_bare_parse() {
        let fenced = format!("```json\n{CLEAN}\n```");
        assert_eq!(extract(&fenced), extract(CLEAN));
    }

    #[test]
    fn unlabeled_fence_is_stripped() {
        let fenced = format!("```\n{CLEAN}\n```");
        assert_eq!(extract(&fenced), extract(CLEAN));
    }

    #[test]
    fn fence_without_newlines_uses_marker_stripping() {
        let compact = serde_json::to_string(&sample()).expect("serialize");
        let fenced = format!("```json{compact}```");
        assert_eq!(extract(&fenced), sample());
    }

    #[test]
    fn surrounding_prose_is_tolerated() {
        let wrapped = format!("Here is my analysis:\n\n```json\n{CLEAN}\n```\n\nLet me know!");
        assert_eq!(extract(&wrapped), extract(CLEAN));

        let inline = format!("Sure. {} Hope that helps.", serde_json::to_string(&sample()).expect("serialize"));
        assert_eq!(extract(&inline), sample());
    }

    #[test]
    fn garbage_yields_fallback() {
        for raw in [
            "",
            "   ",
            "I think you should document this.",
            "```json\n{ not json }\n```",
            "```\n```\n```json\n```",
            "{\"reasoning\": \"missing verdict\"}",
        ] {
            let s = extract(raw);
            assert_eq!(s, fallback_strategy(FALLBACK_TARGET_PAGE), "input: {raw:?}");
        }
    }

    #[test]
    fn fallback_shape() {
        let s = extract_or("nonsense", "Data-Changes-2026-01-01-abcdef12");
        assert!(s.needs_documentation);
        assert_eq!(s.reasoning, FALLBACK_REASONING);
        assert_eq!(s.action(), DocumentationAction::CreateNewPage);
        assert_eq!(s.target_pages(), ["Data-Changes-2026-01-01-abcdef12"]);
        assert_eq!(s.plan.content_type, ContentType::Mixed);
        assert_eq!(s.plan.priority, Priority::Medium);
    }

    #[test]
    fn empty_targets_with_documentation_is_rejected() {
        let raw = r#"{"needs_documentation": true, "reasoning": "x",
            "documentation_strategy": {"action": "create_new_page", "target_pages": []}}"#;
        assert!(try_extract(raw).is_err());
        assert_eq!(extract(raw).reasoning, FALLBACK_REASONING);
    }

    #[test]
    fn no_documentation_needs_no_targets() {
        let raw = r#"{"needs_documentation": false, "reasoning": "only CSS"}"#;
        let s = extract(raw);
        assert!(!s.needs_documentation);
        assert_eq!(s.reasoning, "only CSS");
        assert!(s.target_pages().is_empty());
    }

    #[test]
    fn strip_fences_variants() {
        assert_eq!(strip_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```javascript\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```"), "");
    }
}
