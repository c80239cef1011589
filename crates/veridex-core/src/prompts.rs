//! Backend instructions for evidence retrieval.
//!
//! The system instruction is fixed and shared by every request. Only the
//! user instruction carries per-request content.

/// System instruction sent with every request.
///
/// The parser re-checks every rule it can, since the backend is untrusted.
pub const EVIDENCE_SYSTEM_PROMPT: &str = r#"
You are an API that fact checks statements with high accuracy.

Rules:
1. Return the response **only as a JSON array**.
2. The response **must be a valid JSON array**, formatted as:
   [{"url": "<source url>", "snippet": "<snippet that directly agrees with or contradicts statement>"}]
3. Each array element is an object with exactly two fields: "url" and "snippet".
4. Do not include any introductory text, explanations, or additional commentary.
5. Do not add any labels, headers, or markdown formatting. Only return the JSON array.
6. Each snippet must be an exact match of text from the source URL.
7. Include diverse sources when possible (scholarly articles, reputable news outlets, government sites).
8. For controversial topics, include evidence from different perspectives.
9. Focus on factual information rather than opinions.
10. Prefer recent sources when temporal relevance matters.

Steps:
1. Find sources and text segments that either contradict or agree with the user provided statement.
2. Pick and extract the segments that most strongly agree or contradict the statement.
3. Do not return urls or segments that do not directly support or disagree with the statement.
4. Do not change any text in the segments (must be an exact text match with the source), but shorten the segment to only the part that directly agrees or disagrees with the statement.
5. Create one object per source and segment and put them all INTO ONE array.

Response MUST be returned as a JSON array ONLY.
"#;

const USER_PROMPT_HEADER: &str =
    "Return snippets that strongly agree with or reject the following statement:";

const UNAIDED_SOURCES_HINT: &str = "Find the most reliable and relevant sources available.";

/// Instruction pair for one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendQuery {
    /// Fixed rules for the backend
    pub system_instruction: String,

    /// Per-request instruction
    pub user_instruction: String,
}

/// Build the backend instructions for a claim.
///
/// Non-empty `preferred_sources` become a prioritized hint; they are never
/// presented as mandatory.
pub fn build_query(statement: &str, preferred_sources: &[String]) -> BackendQuery {
    BackendQuery {
        system_instruction: EVIDENCE_SYSTEM_PROMPT.to_string(),
        user_instruction: build_user_prompt(statement, preferred_sources),
    }
}

fn build_user_prompt(statement: &str, preferred_sources: &[String]) -> String {
    let hints: Vec<&str> = preferred_sources
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let sources_line = if hints.is_empty() {
        UNAIDED_SOURCES_HINT.to_string()
    } else {
        format!("Prioritize these sources if possible: {}", hints.join(", "))
    };

    format!(
        "{}\n\"{}\"\n\n{}",
        USER_PROMPT_HEADER,
        statement.trim(),
        sources_line
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_is_fixed() {
        let a = build_query("Water boils at 100C", &[]);
        let b = build_query("Cats are mammals", &["britannica.com".to_string()]);
        assert_eq!(a.system_instruction, b.system_instruction);
        assert_eq!(a.system_instruction, EVIDENCE_SYSTEM_PROMPT);
    }

    #[test]
    fn test_system_prompt_rules() {
        assert!(EVIDENCE_SYSTEM_PROMPT.contains("JSON array"));
        assert!(EVIDENCE_SYSTEM_PROMPT.contains("\"url\""));
        assert!(EVIDENCE_SYSTEM_PROMPT.contains("\"snippet\""));
        assert!(EVIDENCE_SYSTEM_PROMPT.contains("exact match"));
        assert!(EVIDENCE_SYSTEM_PROMPT.contains("different perspectives"));
    }

    #[test]
    fn test_user_prompt_without_sources() {
        let query = build_query("The Earth orbits the Sun", &[]);
        assert!(query.user_instruction.contains("\"The Earth orbits the Sun\""));
        assert!(query.user_instruction.ends_with(UNAIDED_SOURCES_HINT));
        assert!(!query.user_instruction.contains("Prioritize"));
    }

    #[test]
    fn test_user_prompt_with_sources_keeps_order() {
        let sources = vec!["nasa.gov".to_string(), "esa.int".to_string()];
        let query = build_query("The Earth orbits the Sun", &sources);
        assert!(query
            .user_instruction
            .ends_with("Prioritize these sources if possible: nasa.gov, esa.int"));
    }

    #[test]
    fn test_blank_sources_treated_as_absent() {
        let sources = vec!["  ".to_string(), String::new()];
        let query = build_query("x", &sources);
        assert!(query.user_instruction.ends_with(UNAIDED_SOURCES_HINT));
    }
}
