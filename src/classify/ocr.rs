//! OCR artifact repair for uppercase headings.
//!
//! OCR and some PDF text layers break uppercase headings apart: a drop cap
//! separated from the rest of its word ("I NTRODUCTION") or letter-spaced
//! titles ("A B S T R A C T"). Repair is limited to these shapes and to
//! known section words so ordinary multi-word headings survive untouched.

use std::borrow::Cow;
use std::collections::HashSet;

use crate::patterns::SPLIT_CAPITAL_RE;

/// Words that commonly appear in section headings.
const SECTION_WORDS: &[&str] = &[
    "ABSTRACT",
    "ACKNOWLEDGEMENTS",
    "ACKNOWLEDGMENTS",
    "ACTIVITIES",
    "ANALYSIS",
    "APPENDIX",
    "APPROACH",
    "ARCHITECTURE",
    "BACKGROUND",
    "BIBLIOGRAPHY",
    "CONCLUSION",
    "CONCLUSIONS",
    "CONTENTS",
    "CONTRIBUTIONS",
    "DATA",
    "DESIGN",
    "DISCUSSION",
    "EVALUATION",
    "EXPERIMENTAL",
    "EXPERIMENTS",
    "FRAMEWORK",
    "FUTURE",
    "IMPLEMENTATION",
    "INTRODUCTION",
    "KEYWORDS",
    "LIMITATIONS",
    "MATERIALS",
    "METHOD",
    "METHODOLOGY",
    "METHODS",
    "MODEL",
    "NOTATION",
    "OVERVIEW",
    "PRELIMINARIES",
    "PROBLEM",
    "PROPOSED",
    "QUANTUM",
    "REFERENCES",
    "RELATED",
    "RESULTS",
    "SETUP",
    "STATEMENT",
    "SUMMARY",
    "SYSTEM",
    "TECHNICAL",
    "THEORY",
    "WORK",
];

/// Capital letters that are words on their own.
const STANDALONE_LETTERS: &[&str] = &["A", "I"];

/// Known section words used to decide whether to rejoin split tokens.
#[derive(Debug, Clone)]
pub struct Dictionary {
    words: HashSet<String>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl Dictionary {
    pub fn new(extra: &[String]) -> Self {
        let mut words: HashSet<String> = SECTION_WORDS.iter().map(|w| w.to_string()).collect();
        words.extend(extra.iter().map(|w| w.trim().to_uppercase()));
        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Repair one line. Only uppercase, heading-shaped lines are touched;
    /// prose and lines without a known artifact are borrowed unchanged.
    pub fn repair<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if !is_uppercase_line(line) {
            return Cow::Borrowed(line);
        }
        let line = match join_spaced_capitals(line) {
            Some(joined) => Cow::Owned(joined),
            None => Cow::Borrowed(line),
        };

        if !SPLIT_CAPITAL_RE.is_match(&line) {
            return line;
        }

        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        for caps in SPLIT_CAPITAL_RE.captures_iter(&line) {
            let (Some(whole), Some(letter), Some(rest)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            out.push_str(&line[last..whole.start()]);
            if self.should_join(&line[..whole.start()], letter.as_str(), rest.as_str()) {
                out.push_str(letter.as_str());
                out.push_str(rest.as_str());
            } else {
                out.push_str(whole.as_str());
            }
            last = whole.end();
        }
        out.push_str(&line[last..]);
        Cow::Owned(out)
    }

    fn should_join(&self, before: &str, letter: &str, rest: &str) -> bool {
        let joined = format!("{letter}{rest}");
        if self.contains(&joined) {
            return true;
        }
        // A stray non-word capital at the start of a title is a drop cap
        // ("Q UANTUM"), unless the remainder already reads as a word.
        !STANDALONE_LETTERS.contains(&letter)
            && !self.contains(rest)
            && is_title_start(before)
    }
}

/// True when the line has letters and none of them is lowercase.
fn is_uppercase_line(line: &str) -> bool {
    line.chars().any(char::is_alphabetic) && !line.chars().any(char::is_lowercase)
}

/// True when `before` is empty or only a section number.
fn is_title_start(before: &str) -> bool {
    let before = before.trim();
    if before.is_empty() {
        return true;
    }
    let number = before.strip_suffix('.').unwrap_or(before);
    !number.is_empty()
        && !before.contains(' ')
        && (number.chars().all(|c| matches!(c, 'I' | 'V' | 'X' | 'L' | 'C'))
            || number.chars().all(|c| c.is_ascii_digit() || c == '.'))
}

/// Join a trailing run of four or more single capitals ("A B S T R A C T"),
/// optionally preceded by a section number.
fn join_spaced_capitals(line: &str) -> Option<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let run_start = tokens
        .iter()
        .rposition(|t| !is_single_capital(t))
        .map_or(0, |i| i + 1);
    let run = &tokens[run_start..];

    if run.len() < 4 {
        return None;
    }
    let prefix = &tokens[..run_start];
    if !(prefix.is_empty() || (prefix.len() == 1 && is_title_start(prefix[0]))) {
        return None;
    }

    let mut out = prefix.join(" ");
    if !out.is_empty() {
        out.push(' ');
    }
    out.extend(run.iter().copied());
    Some(out)
}

fn is_single_capital(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase())
}
