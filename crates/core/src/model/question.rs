use serde::{Deserialize, Serialize};

use super::ids::QuestionId;

/// How a question accepts answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Exactly one option may be selected; selecting replaces the previous pick.
    Single,
    /// Any number of options may be selected; selecting toggles membership.
    Multiple,
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub options: Vec<String>,
    pub correct_indices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub category: String,
}

impl Question {
    /// Returns true when `selected` is exactly the set of correct options.
    ///
    /// Order and duplicates are ignored. An empty selection is never correct.
    #[must_use]
    pub fn is_correct_selection(&self, selected: &[usize]) -> bool {
        if selected.is_empty() {
            return false;
        }
        normalized(selected) == normalized(&self.correct_indices)
    }

    /// Labels for the given option indices, skipping any that are out of range.
    #[must_use]
    pub fn labels_for(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .filter_map(|&idx| self.options.get(idx).cloned())
            .collect()
    }

    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }
}

fn normalized(indices: &[usize]) -> Vec<usize> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(kind: QuestionType, correct: Vec<usize>) -> Question {
        Question {
            id: QuestionId::new("q"),
            text: "Pick".into(),
            kind,
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_indices: correct,
            explanation: None,
            category: "general".into(),
        }
    }

    #[test]
    fn exact_match_is_correct() {
        let q = question(QuestionType::Single, vec![1]);
        assert!(q.is_correct_selection(&[1]));
        assert!(!q.is_correct_selection(&[0]));
    }

    #[test]
    fn extra_selection_fails_even_with_correct_index() {
        let q = question(QuestionType::Multiple, vec![1]);
        assert!(!q.is_correct_selection(&[0, 1]));
    }

    #[test]
    fn order_does_not_matter() {
        let q = question(QuestionType::Multiple, vec![2, 0]);
        assert!(q.is_correct_selection(&[0, 2]));
    }

    #[test]
    fn empty_selection_is_never_correct() {
        let q = question(QuestionType::Multiple, vec![]);
        assert!(!q.is_correct_selection(&[]));
    }

    #[test]
    fn type_uses_lowercase_names() {
        let json = r#"{"id":"x","text":"t","type":"multiple","options":["a"],"correctIndices":[0]}"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.kind, QuestionType::Multiple);
        assert_eq!(q.category, "");
        assert_eq!(q.labels_for(&[0, 4]), vec!["a".to_string()]);
    }
}
