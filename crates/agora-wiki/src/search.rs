/// Result of looking a query up among entry titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The query names an entry (ignoring case); go straight to it.
    Exact(String),
    /// Entries whose title contains the query (ignoring case).
    Candidates(Vec<Candidate>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Stored title, used for the link.
    pub title: String,
    /// Title as shown in the results list.
    pub display: String,
}

/// Matching uses the query exactly as typed, surrounding whitespace included.
pub fn search(titles: &[String], query: &str) -> SearchOutcome {
    let query = query.to_lowercase();

    if let Some(exact) = titles.iter().find(|t| t.to_lowercase() == query) {
        return SearchOutcome::Exact(exact.clone());
    }

    let candidates = titles
        .iter()
        .filter(|t| t.to_lowercase().contains(&query))
        .map(|t| Candidate {
            title: t.clone(),
            display: display_title(t),
        })
        .collect();

    SearchOutcome::Candidates(candidates)
}

/// "html" and "css" are acronyms and shown upper-case; everything else is
/// capitalized (first letter upper, the rest lower).
pub fn display_title(title: &str) -> String {
    let lower = title.to_lowercase();
    if lower == "html" || lower == "css" {
        return lower.to_uppercase();
    }

    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles() -> Vec<String> {
        ["CSS", "Django", "Git", "HTML", "Python"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_ignores_case() {
        assert_eq!(search(&titles(), "python"), SearchOutcome::Exact("Python".into()));
        assert_eq!(search(&titles(), "hTmL"), SearchOutcome::Exact("HTML".into()));
    }

    #[test]
    fn query_whitespace_is_significant() {
        assert_eq!(search(&titles(), " py"), SearchOutcome::Candidates(vec![]));
        assert_eq!(search(&titles(), "git "), SearchOutcome::Candidates(vec![]));
    }

    #[test]
    fn substring_candidates() {
        let SearchOutcome::Candidates(found) = search(&titles(), "t") else {
            panic!("expected candidates");
        };
        let shown: Vec<&str> = found.iter().map(|c| c.display.as_str()).collect();
        assert_eq!(shown, ["Git", "HTML", "Python"]);
        assert_eq!(found[1].title, "HTML");
    }

    #[test]
    fn no_match_is_empty_candidates() {
        assert_eq!(search(&titles(), "zzz"), SearchOutcome::Candidates(vec![]));
    }

    #[test]
    fn display_recasing() {
        assert_eq!(display_title("css"), "CSS");
        assert_eq!(display_title("HTML"), "HTML");
        assert_eq!(display_title("mIxEd"), "Mixed");
        assert_eq!(display_title(""), "");
    }
}
