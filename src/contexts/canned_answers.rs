//! Deterministic trees built from the profile alone.
//!
//! These answer without a model: the greeting card, the quick summary shown
//! when a request fails, and keyword-routed topic cards.

use crate::contexts::tree_builder::{create_tree, node, Node};
use crate::data::{Profile, Spec};
use serde_json::json;

const QUICK_TOPICS: [&str; 5] = ["Experience", "Skills", "Education", "Contact", "AI tools"];

const GENERAL_FOLLOW_UPS: [&str; 3] = [
    "What industries have you worked in?",
    "What are your strongest frontend strengths?",
    "How can I get in contact?",
];
const EXPERIENCE_FOLLOW_UPS: [&str; 3] = [
    "What was your impact in your most recent role?",
    "What kind of teams have you led?",
    "Which project are you proudest of?",
];
const SKILLS_FOLLOW_UPS: [&str; 3] = [
    "What is your preferred tech stack?",
    "What backend experience do you have?",
    "Which tools do you use for testing?",
];
const CONTACT_FOLLOW_UPS: [&str; 3] = [
    "Where can I find your GitHub?",
    "Are you open to new opportunities?",
    "What is the best way to reach you?",
];

/// Topic a question is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Experience,
    Education,
    Contact,
    AiTools,
    Skills,
    About,
    Summary,
}

/// True when any word of `question` is, or starts with, one of `keywords`.
/// Keywords shorter than four letters must match a whole word.
fn mentions(question: &str, keywords: &[&str]) -> bool {
    let lowered = question.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| {
            keywords.iter().any(|keyword| {
                word == *keyword || (keyword.len() >= 4 && word.starts_with(keyword))
            })
        })
}

pub fn route_topic(question: &str) -> Topic {
    if mentions(question, &["experience", "role", "company", "work", "career"]) {
        Topic::Experience
    } else if mentions(question, &["education", "school", "college", "study"]) {
        Topic::Education
    } else if mentions(question, &["contact", "email", "linkedin", "github"]) {
        Topic::Contact
    } else if mentions(question, &["ai", "assistant", "workflow", "tools"]) {
        Topic::AiTools
    } else if mentions(question, &["skills", "stack", "tech"]) {
        Topic::Skills
    } else if mentions(question, &["about", "bio", "background", "who"]) {
        Topic::About
    } else {
        Topic::Summary
    }
}

/// Follow-up questions suited to what was just asked
pub fn follow_ups(question: &str) -> Vec<String> {
    let bank: &[&str] = if mentions(question, &["contact", "email"]) {
        &CONTACT_FOLLOW_UPS
    } else if mentions(question, &["experience", "roles", "company"]) {
        &EXPERIENCE_FOLLOW_UPS
    } else if mentions(question, &["stack", "skills", "tech"]) {
        &SKILLS_FOLLOW_UPS
    } else {
        &GENERAL_FOLLOW_UPS
    };
    bank.iter().map(|question| question.to_string()).collect()
}

/// Answers a question from the profile without a model
pub fn build_answer_tree(question: &str, profile: &Profile) -> Spec {
    match route_topic(question) {
        Topic::Experience => build_experience_tree(profile),
        Topic::Education => build_education_tree(profile),
        Topic::Contact => build_contact_tree(profile),
        Topic::AiTools => build_ai_tools_tree(profile),
        Topic::Skills => build_skills_tree(profile),
        Topic::About => build_about_tree(profile),
        Topic::Summary => build_summary_tree(profile),
    }
}

pub fn build_intro_tree(profile: &Profile) -> Spec {
    let mut children: Vec<Node> = profile
        .about
        .iter()
        .take(2)
        .map(|paragraph| node("Text").prop("content", paragraph.as_str()))
        .collect();
    children.push(
        node("Text").props(json!({
            "content": "Ask me anything about my experience, skills, or projects.",
            "variant": "muted",
        })),
    );
    children.push(
        node("List").children(
            QUICK_TOPICS
                .iter()
                .map(|topic| {
                    node("ListItem").prop("content", format!("Ask about {}", topic.to_lowercase()))
                })
                .collect(),
        ),
    );

    create_tree(
        &node("Card")
            .props(json!({"title": profile.name, "subtitle": profile.title}))
            .children(children),
    )
}

pub fn build_summary_tree(profile: &Profile) -> Spec {
    create_tree(
        &node("Card")
            .props(json!({"title": "Quick summary", "subtitle": profile.title}))
            .children(vec![
                node("Text").prop("content", profile.tagline.as_str()),
                node("Text").prop("content", profile.lead_paragraph()),
                node("Divider").prop("label", "Highlights"),
                list_of(&profile.highlights),
            ]),
    )
}

fn list_of(items: &[String]) -> Node {
    node("List").children(
        items
            .iter()
            .map(|item| node("ListItem").prop("content", item.as_str()))
            .collect(),
    )
}

fn tag_row(tags: &[String]) -> Node {
    node("TagRow").children(
        tags.iter()
            .map(|tag| node("Tag").prop("text", tag.as_str()))
            .collect(),
    )
}

fn build_about_tree(profile: &Profile) -> Spec {
    create_tree(
        &node("Card").prop("title", format!("About {}", profile.name)).children(
            profile
                .about
                .iter()
                .map(|paragraph| node("Text").prop("content", paragraph.as_str()))
                .collect(),
        ),
    )
}

fn build_experience_tree(profile: &Profile) -> Spec {
    let last = profile.experience.len().saturating_sub(1);
    let blocks = profile
        .experience
        .iter()
        .enumerate()
        .flat_map(|(index, role)| {
            let mut blocks = vec![
                node("Heading").props(json!({
                    "text": format!("{} - {}", role.title, role.company),
                    "level": "h3",
                })),
                node("Text").props(json!({
                    "content": format!("{} | {}", role.date_range, role.location),
                    "variant": "caption",
                })),
                node("Text").prop("content", role.description.as_str()),
                list_of(&role.achievements),
                tag_row(&role.skills),
            ];
            if index < last {
                blocks.push(node("Divider").prop("label", ""));
            }
            blocks
        })
        .collect();

    create_tree(&node("Card").prop("title", "Experience").children(blocks))
}

fn build_skills_tree(profile: &Profile) -> Spec {
    create_tree(&node("Card").prop("title", "Skills and focus").children(vec![
        tag_row(&profile.skills),
        node("Divider").prop("label", "Current focus"),
        list_of(&profile.highlights),
    ]))
}

fn build_education_tree(profile: &Profile) -> Spec {
    let last = profile.education.len().saturating_sub(1);
    let parts = profile
        .education
        .iter()
        .enumerate()
        .flat_map(|(index, entry)| {
            let location = if entry.location.is_empty() {
                "Remote"
            } else {
                entry.location.as_str()
            };
            let mut parts = vec![
                node("Heading").props(json!({"text": entry.school, "level": "h3"})),
                node("Text").props(json!({"content": location, "variant": "caption"})),
                node("Text").prop("content", entry.focus.as_str()),
                node("Text").props(json!({"content": entry.date_range, "variant": "muted"})),
            ];
            if index < last {
                parts.push(node("Divider").prop("label", ""));
            }
            parts
        })
        .collect();

    create_tree(&node("Card").prop("title", "Education").children(parts))
}

fn build_contact_tree(profile: &Profile) -> Spec {
    let contact = &profile.contact;
    let items = vec![
        node("ListItem").props(json!({
            "content": contact.email,
            "meta": "Email",
            "href": format!("mailto:{}", contact.email),
        })),
        node("ListItem").props(json!({
            "content": "LinkedIn",
            "meta": contact.linkedin,
            "href": contact.linkedin,
        })),
        node("ListItem").props(json!({
            "content": "GitHub",
            "meta": contact.github,
            "href": contact.github,
        })),
        node("ListItem").props(json!({
            "content": "Website",
            "meta": contact.site,
            "href": contact.site,
        })),
    ];

    create_tree(
        &node("Card")
            .prop("title", "Contact")
            .child(node("List").children(items)),
    )
}

fn build_ai_tools_tree(profile: &Profile) -> Spec {
    create_tree(&node("Card").prop("title", "AI-assisted workflow").children(vec![
        node("Text").prop(
            "content",
            "AI tools are part of the daily workflow for prototyping features, refactoring code, and improving test coverage.",
        ),
        tag_row(&profile.ai_tools),
    ]))
}
