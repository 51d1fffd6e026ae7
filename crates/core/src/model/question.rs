use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("correct answer cannot be empty")]
    EmptyCorrectAnswer,

    #[error("multiple choice questions need at least two choices, got {count}")]
    TooFewChoices { count: usize },

    #[error("correct answer is not one of the choices")]
    AnswerNotAChoice,

    #[error("only multiple choice questions carry choices")]
    UnexpectedChoices,

    #[error("unknown question kind: {0}")]
    UnknownKind(String),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How the learner answers a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    /// Pick one of the listed choices.
    #[serde(rename = "mcq")]
    MultipleChoice,
    /// Type the missing token.
    #[serde(rename = "fill-blank")]
    FillInBlank,
    /// Free-form written answer.
    #[serde(rename = "text")]
    FreeText,
}

impl QuestionKind {
    /// Stable storage name for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "mcq",
            QuestionKind::FillInBlank => "fill-blank",
            QuestionKind::FreeText => "text",
        }
    }

    /// Human readable label, e.g. "fill blank".
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple choice",
            QuestionKind::FillInBlank => "fill blank",
            QuestionKind::FreeText => "text",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(Self::MultipleChoice),
            "fill-blank" => Ok(Self::FillInBlank),
            "text" => Ok(Self::FreeText),
            other => Err(QuestionError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question input, as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub kind: QuestionKind,
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

impl QuestionDraft {
    #[must_use]
    pub fn multiple_choice<I, S>(
        id: u64,
        prompt: impl Into<String>,
        choices: I,
        correct_answer: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: QuestionId::new(id),
            kind: QuestionKind::MultipleChoice,
            prompt: prompt.into(),
            choices: choices.into_iter().map(Into::into).collect(),
            correct_answer: correct_answer.into(),
            explanation: None,
        }
    }

    #[must_use]
    pub fn fill_in_blank(
        id: u64,
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self::open(id, QuestionKind::FillInBlank, prompt, correct_answer)
    }

    #[must_use]
    pub fn free_text(id: u64, prompt: impl Into<String>, correct_answer: impl Into<String>) -> Self {
        Self::open(id, QuestionKind::FreeText, prompt, correct_answer)
    }

    fn open(
        id: u64,
        kind: QuestionKind,
        prompt: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            id: QuestionId::new(id),
            kind,
            prompt: prompt.into(),
            choices: Vec::new(),
            correct_answer: correct_answer.into(),
            explanation: None,
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt or correct answer is blank, or when the
    /// choices do not fit the question kind.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.correct_answer.trim().is_empty() {
            return Err(QuestionError::EmptyCorrectAnswer);
        }

        match self.kind {
            QuestionKind::MultipleChoice => {
                if self.choices.len() < 2 {
                    return Err(QuestionError::TooFewChoices {
                        count: self.choices.len(),
                    });
                }
                if !self.choices.iter().any(|c| *c == self.correct_answer) {
                    return Err(QuestionError::AnswerNotAChoice);
                }
            }
            QuestionKind::FillInBlank | QuestionKind::FreeText => {
                if !self.choices.is_empty() {
                    return Err(QuestionError::UnexpectedChoices);
                }
            }
        }

        let explanation = self.explanation.filter(|e| !e.trim().is_empty());

        Ok(Question {
            id: self.id,
            kind: self.kind,
            prompt: self.prompt,
            choices: self.choices,
            correct_answer: self.correct_answer,
            explanation,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One validated quiz item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    kind: QuestionKind,
    prompt: String,
    choices: Vec<String>,
    correct_answer: String,
    explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Choices in display order; empty unless the question is multiple choice.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Containment grading: the lower-cased answer must contain the lower-cased
    /// correct answer. An empty answer is never correct.
    #[must_use]
    pub fn accepts(&self, answer: &str) -> bool {
        if answer.is_empty() {
            return false;
        }
        answer
            .to_lowercase()
            .contains(&self.correct_answer.to_lowercase())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn click_question() -> QuestionDraft {
        QuestionDraft::multiple_choice(
            1,
            "Which is the correct way to handle a click event in React?",
            [
                "onClick=\"handleClick()\"",
                "onClick={handleClick}",
                "onclick={handleClick}",
            ],
            "onClick={handleClick}",
        )
    }

    #[test]
    fn multiple_choice_validates() {
        let q = click_question().with_explanation("camelCase").validate().unwrap();
        assert_eq!(q.kind(), QuestionKind::MultipleChoice);
        assert_eq!(q.choices().len(), 3);
        assert_eq!(q.explanation(), Some("camelCase"));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let err = QuestionDraft::fill_in_blank(1, "  ", "onClick")
            .validate()
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn blank_correct_answer_is_rejected() {
        let err = QuestionDraft::free_text(1, "Explain", " ")
            .validate()
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyCorrectAnswer);
    }

    #[test]
    fn multiple_choice_needs_matching_choice() {
        let mut draft = click_question();
        draft.correct_answer = "onPress".into();
        assert_eq!(draft.validate().unwrap_err(), QuestionError::AnswerNotAChoice);

        let draft = QuestionDraft::multiple_choice(2, "Pick", ["only"], "only");
        assert_eq!(
            draft.validate().unwrap_err(),
            QuestionError::TooFewChoices { count: 1 }
        );
    }

    #[test]
    fn open_questions_reject_choices() {
        let mut draft = QuestionDraft::fill_in_blank(1, "Complete", "onClick");
        draft.choices.push("onClick".into());
        assert_eq!(draft.validate().unwrap_err(), QuestionError::UnexpectedChoices);
    }

    #[test]
    fn containment_is_case_insensitive_and_one_directional() {
        let q = QuestionDraft::fill_in_blank(1, "Complete", "onClick")
            .validate()
            .unwrap();
        assert!(q.accepts("onClick"));
        assert!(q.accepts("I would use ONCLICK here"));
        assert!(!q.accepts("on"));
        assert!(!q.accepts(""));
    }

    #[test]
    fn kind_round_trips_through_storage_name() {
        for kind in [
            QuestionKind::MultipleChoice,
            QuestionKind::FillInBlank,
            QuestionKind::FreeText,
        ] {
            assert_eq!(kind.as_str().parse::<QuestionKind>().unwrap(), kind);
        }
        assert!(matches!(
            "audio".parse::<QuestionKind>(),
            Err(QuestionError::UnknownKind(_))
        ));
    }
}
