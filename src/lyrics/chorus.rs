//! Chorus detection: the most repeated exact line of a song.

use std::collections::HashMap;

use serde::Serialize;

use super::parser::StructuredLine;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChorusResult {
    pub detected: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub occurrences: usize,
    /// Ascending, in original line order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_numbers: Vec<usize>,
}

impl ChorusResult {
    pub fn not_detected() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChorusDetector;

impl ChorusDetector {
    pub fn new() -> Self {
        Self
    }

    /// Find the line text that repeats most often (at least twice).
    ///
    /// Ties go to the text whose first occurrence has the smallest line number.
    pub fn detect(&self, lines: &[StructuredLine]) -> ChorusResult {
        // Groups in first-seen order so ties resolve deterministically.
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();

        for line in lines {
            if line.text.is_empty() {
                continue;
            }
            match index.get(line.text.as_str()) {
                Some(&slot) => groups[slot].1.push(line.line_number),
                None => {
                    index.insert(line.text.as_str(), groups.len());
                    groups.push((line.text.as_str(), vec![line.line_number]));
                }
            }
        }

        let mut best: Option<&(&str, Vec<usize>)> = None;
        for group in &groups {
            let count = group.1.len();
            if count < 2 {
                continue;
            }
            let wins = match best {
                None => true,
                Some(current) => {
                    count > current.1.len()
                        || (count == current.1.len() && first(&group.1) < first(&current.1))
                }
            };
            if wins {
                best = Some(group);
            }
        }

        match best {
            Some((text, numbers)) => {
                let mut line_numbers = numbers.clone();
                line_numbers.sort_unstable();
                ChorusResult {
                    detected: true,
                    text: (*text).to_string(),
                    occurrences: line_numbers.len(),
                    line_numbers,
                }
            }
            None => ChorusResult::not_detected(),
        }
    }
}

fn first(numbers: &[usize]) -> usize {
    numbers.iter().copied().min().unwrap_or(usize::MAX)
}
