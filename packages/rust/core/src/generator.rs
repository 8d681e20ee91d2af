//! Documentation body generation.
//!
//! The body is Markdown written by the advisor from the full change. The
//! literal [`NO_DOCUMENTATION_NEEDED`] sentinel, an empty response and a
//! failed call all mean "nothing to write".

use tracing::{info, instrument, warn};

use changedoc_shared::{Advisor, ChangeRecord};

use crate::planner::truncate_chars;

/// Sentinel the advisor returns when the change is not worth documenting.
pub const NO_DOCUMENTATION_NEEDED: &str = "NO_DOCUMENTATION_NEEDED";

/// Generate the documentation body for `change`, or `None` if there is
/// nothing to write.
#[instrument(skip_all, fields(reference = %change.short_ref()))]
pub async fn generate_body(
    change: &ChangeRecord,
    advisor: &dyn Advisor,
    diff_budget: usize,
) -> Option<String> {
    let prompt = documentation_prompt(change, diff_budget);

    match advisor.advise(&prompt).await {
        Ok(body) => interpret_body(body),
        Err(e) => {
            warn!(error = %e, "documentation generation failed");
            None
        }
    }
}

/// Map a raw generator response to a body, treating the sentinel as absent.
pub fn interpret_body(body: String) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        warn!("advisor returned an empty documentation body");
        return None;
    }
    if trimmed == NO_DOCUMENTATION_NEEDED {
        info!("advisor determined no documentation update is needed");
        return None;
    }
    Some(body)
}

/// Prompt asking for the full Markdown documentation of a change.
pub fn documentation_prompt(change: &ChangeRecord, diff_budget: usize) -> String {
    format!(
        "The following code changes contain data-related modifications. Analyze them \
comprehensively to generate documentation that helps with data governance and understanding.

Commit Message: {message}
Files Changed: {files}

FULL CODE CHANGES:
{diff}

Your goal is to answer the key data governance questions:
- **WHY was this column/field added?** (business purpose)
- **HOW is this data used?** (data flow through the application)
- **WHAT does this change mean for data consumers?** (API, reports, etc.)

Analyze the changes and provide documentation covering relevant sections:

**1. SUMMARY**
- Brief overview of what changed from a data perspective
- Business context (infer from commit message and code patterns)

**2. DATABASE SCHEMA CHANGES** (if any)
- New tables, columns, indexes with their business purpose
- Data types and constraints and why they were chosen
- Relationships to existing data

**3. DATA QUERY CHANGES** (if any)
- New or modified SQL queries and their purpose
- Changes in data selection criteria (WHERE, JOIN, etc.)
- Performance implications or query optimization

**4. DATA FLOW AND USAGE** (if any)
- How data moves through the application layers
- How results are mapped, transformed, or processed
- Business logic that consumes this data

**5. API AND CONSUMER IMPACT** (if any)
- New fields exposed to API consumers
- Changes in response structures or data formats
- Backward compatibility considerations

**6. DATA GOVERNANCE NOTES**
- Purpose and meaning of new data elements
- Data quality or validation rules
- Access patterns or security considerations

Focus on business context and practical usage. Explain WHY the changes were made and HOW the data will be used.
Format as **Markdown** with clear headers and sections (##, ###).
Use tables for structured data like column definitions.

If after this detailed analysis you determine no significant documentation is needed, respond with \"{NO_DOCUMENTATION_NEEDED}\".
",
        message = change.summary,
        files = change.file_paths.join(", "),
        diff = truncate_chars(&change.diff, diff_budget),
    )
}
