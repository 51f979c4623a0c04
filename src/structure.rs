//! # Article structurer
//!
//! Deterministic, I/O-free conversion of flat prose into the fixed section layout that
//! export consumers parse by label:
//!
//! ```text
//! Title: …
//! Excerpt: …
//!
//! Introduction
//! Main Sections
//! Key Points
//! Details
//! Conclusion
//! Sources
//! ```
//!
//! Sentences are partitioned, not sampled: every sentence of the body lands in exactly
//! one of introduction / key points / details / conclusion. The only exception is a body
//! of at most three sentences, where the conclusion repeats the introduction.
//!
//! Also home to the slug and excerpt helpers, which share the sentence/word logic.

use once_cell::sync::Lazy;
use regex::Regex;

pub const INTRO_SENTENCES: usize = 3;
pub const SUMMARY_SENTENCES: usize = 13;
pub const MAX_KEY_POINTS: usize = 6;
pub const SENTENCES_PER_DETAIL: usize = 2;

pub const EXCERPT_MIN_CHARS: usize = 160;
pub const EXCERPT_MAX_CHARS: usize = 220;
pub const SLUG_MAX_CHARS: usize = 96;

pub const LABEL_TITLE: &str = "Title:";
pub const LABEL_EXCERPT: &str = "Excerpt:";
pub const LABEL_INTRODUCTION: &str = "Introduction";
pub const LABEL_MAIN: &str = "Main Sections";
pub const LABEL_KEY_POINTS: &str = "Key Points";
pub const LABEL_DETAILS: &str = "Details";
pub const LABEL_CONCLUSION: &str = "Conclusion";
pub const LABEL_SOURCES: &str = "Sources";
pub const NO_SOURCES: &str = "No sources available";
pub const NO_KEY_POINTS: &str = "None";

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static RE_SLUG_DROP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\p{M}\s_-]").unwrap());
static RE_SLUG_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").unwrap());

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '…')
}

/// Scripts written without inter-word spaces end sentences on these alone.
fn is_full_width_terminator(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»' | '」' | '』')
}

/// Split prose into sentences.
///
/// Boundaries: blank lines, a full-width terminator, and a Latin terminator (plus any
/// closing quotes/brackets) followed by whitespace or end of text. `3.5` or `U.S.A`
/// stay whole because no whitespace follows the inner dots.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for para in RE_BLANK_LINES.split(text) {
        let chars: Vec<char> = para.chars().collect();
        let mut current = String::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            current.push(c);
            if is_terminator(c) {
                let mut j = i + 1;
                while j < chars.len() && (is_terminator(chars[j]) || is_closer(chars[j])) {
                    current.push(chars[j]);
                    j += 1;
                }
                let full_width = chars[i..j].iter().any(|&t| is_full_width_terminator(t));
                if j >= chars.len() || chars[j].is_whitespace() || full_width {
                    push_sentence(&mut out, &current);
                    current.clear();
                }
                i = j;
                continue;
            }
            i += 1;
        }
        push_sentence(&mut out, &current);
    }
    out
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let s = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !s.is_empty() {
        out.push(s);
    }
}

/// Sections of a structured body, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sections {
    pub introduction: Vec<String>,
    /// Window used to derive an excerpt when none is supplied.
    pub summary: Vec<String>,
    pub key_points: Vec<String>,
    /// Paragraphs of up to `SENTENCES_PER_DETAIL` sentences.
    pub details: Vec<Vec<String>>,
    pub conclusion: Vec<String>,
}

/// Partition sentences into sections.
pub fn partition(sentences: &[String]) -> Sections {
    let n = sentences.len();
    let intro_end = INTRO_SENTENCES.min(n);
    let introduction = sentences[..intro_end].to_vec();
    let rest = &sentences[intro_end..];

    let summary = if rest.is_empty() {
        introduction.clone()
    } else {
        rest.iter().take(SUMMARY_SENTENCES).cloned().collect()
    };

    if rest.is_empty() {
        return Sections {
            conclusion: introduction.clone(),
            introduction,
            summary,
            ..Default::default()
        };
    }

    let conclusion_len = if rest.len() >= 3 { 2 } else { 1 };
    let (middle, conclusion) = rest.split_at(rest.len() - conclusion_len);
    let kp_end = MAX_KEY_POINTS.min(middle.len());
    let key_points = middle[..kp_end].to_vec();
    let details = middle[kp_end..]
        .chunks(SENTENCES_PER_DETAIL)
        .map(|c| c.to_vec())
        .collect();

    Sections {
        introduction,
        summary,
        key_points,
        details,
        conclusion: conclusion.to_vec(),
    }
}

/// Longest word-bounded prefix of `text` not exceeding `max` chars.
///
/// Whole sentences are preferred; if even the first sentence is too long, the cut
/// happens at the last whitespace before `max` and an ellipsis is appended.
pub fn word_bounded(text: &str, max: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= max {
        return text;
    }

    let mut acc = String::new();
    for s in split_sentences(&text) {
        let next_len = acc.chars().count() + usize::from(!acc.is_empty()) + s.chars().count();
        if next_len > max {
            break;
        }
        if !acc.is_empty() {
            acc.push(' ');
        }
        acc.push_str(&s);
    }
    if !acc.is_empty() {
        return acc;
    }

    // reserve one char for the ellipsis
    let budget: String = text.chars().take(max.saturating_sub(1)).collect();
    let cut = match budget.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => budget[..idx].trim_end().to_string(),
        _ => budget,
    };
    format!("{cut}…")
}

/// Excerpt from a list of sentences, aiming for 160–220 chars on word boundaries.
pub fn excerpt_from_sentences(sentences: &[String]) -> String {
    let mut acc = String::new();
    for s in sentences {
        if acc.chars().count() >= EXCERPT_MIN_CHARS {
            break;
        }
        let candidate = if acc.is_empty() {
            s.clone()
        } else {
            format!("{acc} {s}")
        };
        if candidate.chars().count() > EXCERPT_MAX_CHARS {
            if acc.is_empty() {
                return word_bounded(s, EXCERPT_MAX_CHARS);
            }
            break;
        }
        acc = candidate;
    }
    acc
}

/// Lowercase, punctuation-free, hyphen-joined slug of at most 96 chars.
///
/// Letters, digits and combining marks of any script survive, so Thai titles keep
/// their vowels and tone marks. Re-applying `slugify` to its output is a no-op.
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    let kept = RE_SLUG_DROP.replace_all(&lower, "");
    let joined = RE_SLUG_SEP
        .split(kept.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let truncated: String = joined.chars().take(SLUG_MAX_CHARS).collect();
    truncated.trim_matches('-').to_string()
}

/// Inputs of [`render_document`].
#[derive(Debug, Clone, Copy)]
pub struct DocumentInput<'a> {
    pub title: &'a str,
    /// Empty means "derive from the body".
    pub excerpt: &'a str,
    pub body: &'a str,
    pub sources: &'a [String],
}

/// Structured article: the rendered document plus the excerpt it used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredDocument {
    pub excerpt: String,
    pub content: String,
    pub sections: Sections,
}

/// Build the fixed-section document. Never fails.
pub fn render_document(input: DocumentInput<'_>) -> StructuredDocument {
    let sentences = split_sentences(input.body);
    let sections = partition(&sentences);

    let excerpt = if input.excerpt.trim().is_empty() {
        excerpt_from_sentences(&sections.summary)
    } else {
        input.excerpt.split_whitespace().collect::<Vec<_>>().join(" ")
    };

    let mut doc = String::new();
    doc.push_str(&format!("{LABEL_TITLE} {}\n", input.title.trim()));
    doc.push_str(&format!("{LABEL_EXCERPT} {excerpt}\n\n"));

    doc.push_str(LABEL_INTRODUCTION);
    doc.push('\n');
    doc.push_str(&sections.introduction.join(" "));
    doc.push_str("\n\n");

    doc.push_str(LABEL_MAIN);
    doc.push('\n');
    doc.push_str(LABEL_KEY_POINTS);
    doc.push('\n');
    if sections.key_points.is_empty() {
        doc.push_str(&format!("- {NO_KEY_POINTS}\n"));
    }
    for kp in &sections.key_points {
        doc.push_str(&format!("- {kp}\n"));
    }
    doc.push_str(LABEL_DETAILS);
    doc.push('\n');
    for para in &sections.details {
        doc.push_str(&para.join(" "));
        doc.push_str("\n\n");
    }
    if sections.details.is_empty() {
        doc.push('\n');
    }

    doc.push_str(LABEL_CONCLUSION);
    doc.push('\n');
    doc.push_str(&sections.conclusion.join(" "));
    doc.push_str("\n\n");

    doc.push_str(LABEL_SOURCES);
    doc.push('\n');
    let sources: Vec<&String> = input.sources.iter().filter(|s| !s.trim().is_empty()).collect();
    if sources.is_empty() {
        doc.push_str(&format!("- {NO_SOURCES}\n"));
    }
    for src in sources {
        doc.push_str(&format!("- {}\n", src.trim()));
    }

    StructuredDocument {
        excerpt,
        content: doc,
        sections,
    }
}
