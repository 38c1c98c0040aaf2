use crate::contexts::tree_builder::{create_tree, node, Node};
use crate::data::{Profile, Spec};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

pub const FALLBACK_SUMMARY: &str = "Here is what I found from the resume.";

static RESUME_WORDS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(resume|résumé|cv)\b").ok());

static INTEREST_WORDS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(outside|hobby|hobbies|personal|interests?)\b").ok()
});

/// How a fallback answer is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Heading, summary paragraph and bullet list from the answer text
    Generic,
    /// Résumé document preview from the profile
    Resume,
    /// Grid of personal interests from the profile
    Interests,
}

fn mentions(pattern: &Option<Regex>, question: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(question))
}

/// Chooses a presentation from keywords in the question
pub fn sniff_presentation(question: &str) -> Presentation {
    if mentions(&RESUME_WORDS, question) {
        Presentation::Resume
    } else if mentions(&INTEREST_WORDS, question) {
        Presentation::Interests
    } else {
        Presentation::Generic
    }
}

/// A plain-text answer split into prose and bullets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnswerOutline {
    pub summary: String,
    pub bullets: Vec<String>,
}

/// Splits an answer into one summary paragraph and `-` bullet items
pub fn outline_answer(answer: &str) -> AnswerOutline {
    let mut outline = AnswerOutline::default();
    let mut prose = Vec::new();

    for line in answer.lines().map(str::trim).filter(|line| !line.is_empty()) {
        match line.strip_prefix('-') {
            Some(item) => outline.bullets.push(item.trim_start().to_string()),
            None => prose.push(line),
        }
    }

    outline.summary = prose.join(" ");
    outline
}

/// Builds a displayable tree from a plain-text answer.
///
/// Used when no structured tree could be extracted from the model's
/// response. Résumé and personal-interest questions get a block sourced from
/// the profile instead of the answer text.
pub fn build_tree_from_answer(question: &str, answer: &str, profile: &Profile) -> Spec {
    let heading = node("Heading").props(json!({"text": question, "level": "h3"}));

    let specialized = match sniff_presentation(question) {
        Presentation::Resume => profile.resume.as_ref().map(|resume| {
            node("Resume").props(json!({"title": resume.title, "href": resume.href}))
        }),
        Presentation::Interests if !profile.interests.is_empty() => Some(
            node("InterestGrid")
                .props(json!({"title": "Outside of work", "items": profile.interests})),
        ),
        _ => None,
    };

    let children = match specialized {
        Some(block) => vec![heading, block],
        None => generic_children(heading, answer),
    };

    create_tree(&node("Card").prop("title", "Answer").children(children))
}

fn generic_children(heading: Node, answer: &str) -> Vec<Node> {
    let outline = outline_answer(answer);
    let summary = if outline.summary.is_empty() {
        FALLBACK_SUMMARY.to_string()
    } else {
        outline.summary
    };

    let mut children = vec![heading, node("Text").prop("content", summary)];
    if !outline.bullets.is_empty() {
        children.push(
            node("List").children(
                outline
                    .bullets
                    .into_iter()
                    .map(|item| node("ListItem").prop("content", item))
                    .collect(),
            ),
        );
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile::builtin().unwrap()
    }

    fn contents_of(spec: &Spec, element_type: &str) -> Vec<String> {
        let mut keys: Vec<_> = spec.elements_of_type(element_type).collect();
        keys.sort_by_key(|element| {
            element
                .key
                .rsplit('-')
                .next()
                .and_then(|n| n.parse::<usize>().ok())
        });
        keys.iter()
            .filter_map(|element| element.prop_str("content").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_outline_splits_bullets_from_prose() {
        let outline = outline_answer("First line.\n\n- one\n  -   two  \nSecond line.");
        assert_eq!(outline.summary, "First line. Second line.");
        assert_eq!(outline.bullets, vec!["one", "two"]);
    }

    #[test]
    fn test_bare_marker_is_an_empty_item() {
        let outline = outline_answer("Intro.\n- one\n-\n- two");
        assert_eq!(outline.bullets, vec!["one", "", "two"]);

        let spec = build_tree_from_answer("Skills?", "Intro.\n- one\n-", &profile());
        assert_eq!(contents_of(&spec, "ListItem"), vec!["one", ""]);
    }

    #[test]
    fn test_generic_answer_tree() {
        let spec = build_tree_from_answer("Skills?", "Line one.\n- point A\n- point B", &profile());
        assert_eq!(spec.check_invariants(), Ok(()));

        let card = spec.root_element().unwrap();
        assert_eq!(card.prop_str("title"), Some("Answer"));
        let children: Vec<_> = spec.children_of(&spec.root).collect();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].element_type, "Heading");
        assert_eq!(children[0].prop_str("text"), Some("Skills?"));
        assert_eq!(children[1].prop_str("content"), Some("Line one."));
        assert_eq!(children[2].element_type, "List");
        assert_eq!(contents_of(&spec, "ListItem"), vec!["point A", "point B"]);
    }

    #[test]
    fn test_empty_summary_uses_generic_sentence() {
        let spec = build_tree_from_answer("Tools?", "- Cursor", &profile());
        let text = spec.elements_of_type("Text").next().unwrap();
        assert_eq!(text.prop_str("content"), Some(FALLBACK_SUMMARY));
    }

    #[test]
    fn test_no_list_without_bullets() {
        let spec = build_tree_from_answer("Who?", "Just prose here.", &profile());
        assert_eq!(spec.elements_of_type("List").count(), 0);
        assert_eq!(spec.len(), 3);
    }

    #[test]
    fn test_resume_question_gets_document_preview() {
        let spec = build_tree_from_answer(
            "Can I see your resume?",
            "Sure.\n- It is attached",
            &profile(),
        );
        assert_eq!(spec.elements_of_type("Resume").count(), 1);
        assert_eq!(spec.elements_of_type("Text").count(), 0);
        assert_eq!(spec.elements_of_type("List").count(), 0);
    }

    #[test]
    fn test_interest_question_gets_grid_from_profile() {
        let spec = build_tree_from_answer("What do you do outside of work?", "", &profile());
        let grid = spec.elements_of_type("InterestGrid").next().unwrap();
        assert_eq!(grid.props["items"][0], "Building AI products and blockchain products");
    }

    #[test]
    fn test_sniffing_matches_whole_words() {
        assert_eq!(sniff_presentation("Send me your CV"), Presentation::Resume);
        assert_eq!(sniff_presentation("Any HOBBIES?"), Presentation::Interests);
        assert_eq!(sniff_presentation("What about CVS pharmacy?"), Presentation::Generic);
        assert_eq!(sniff_presentation("Tell me about Procore"), Presentation::Generic);
    }

    #[test]
    fn test_resume_without_profile_link_falls_back_to_generic() {
        let mut profile = profile();
        profile.resume = None;
        let spec = build_tree_from_answer("resume?", "Here it is.", &profile);
        assert_eq!(spec.elements_of_type("Resume").count(), 0);
        assert_eq!(spec.elements_of_type("Text").count(), 1);
    }
}
