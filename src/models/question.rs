// src/models/question.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::{error::AppError, utils::html::clean_html};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub question_text: String,
}

/// Represents the 'choices' table in the database.
/// `position` keeps the order the choices were entered in.
#[derive(Debug, Clone, FromRow)]
pub struct ChoiceRow {
    pub id: i64,
    pub question_id: i64,
    pub choice_text: String,
    pub is_correct: bool,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub id: i64,
    pub choice_text: String,
    pub is_correct: bool,
}

/// A question with its choices, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChoiceInput {
    #[validate(length(max = 500))]
    pub choice_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating or replacing a question.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(max = 1000))]
    pub question_text: String,
    #[validate(nested)]
    pub choices: Vec<ChoiceInput>,
}

/// A question that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_text: String,
    /// (choice_text, is_correct) in display order.
    pub choices: Vec<(String, bool)>,
}

impl QuestionRequest {
    /// Trims and sanitizes the text, skips blank choices and enforces that
    /// at least one valid choice is marked correct.
    pub fn normalize(self) -> Result<NewQuestion, AppError> {
        self.validate()?;

        let question_text = clean_html(&self.question_text).trim().to_string();
        if question_text.is_empty() {
            return Err(AppError::BadRequest("Question text is required".to_string()));
        }

        if self.choices.is_empty() {
            return Err(AppError::BadRequest("At least one choice is required".to_string()));
        }

        let choices: Vec<(String, bool)> = self
            .choices
            .into_iter()
            .filter_map(|c| {
                // Blank after sanitizing counts as blank
                let text = clean_html(&c.choice_text).trim().to_string();
                (!text.is_empty()).then_some((text, c.is_correct))
            })
            .collect();

        if choices.is_empty() {
            return Err(AppError::BadRequest(
                "At least one non-empty choice is required".to_string(),
            ));
        }

        if !choices.iter().any(|(_, correct)| *correct) {
            return Err(AppError::BadRequest(
                "At least one choice must be marked correct".to_string(),
            ));
        }

        Ok(NewQuestion {
            question_text,
            choices,
        })
    }
}

/// Attaches choices to their questions. Questions keep the input order,
/// choices are sorted by position.
pub fn assemble(questions: Vec<QuestionRow>, choices: Vec<ChoiceRow>) -> Vec<Question> {
    let mut by_question: HashMap<i64, Vec<ChoiceRow>> = HashMap::new();
    for choice in choices {
        by_question.entry(choice.question_id).or_default().push(choice);
    }

    questions
        .into_iter()
        .map(|q| {
            let mut rows = by_question.remove(&q.id).unwrap_or_default();
            rows.sort_by_key(|c| (c.position, c.id));
            Question {
                id: q.id,
                question_text: q.question_text,
                choices: rows
                    .into_iter()
                    .map(|c| Choice {
                        id: c.id,
                        choice_text: c.choice_text,
                        is_correct: c.is_correct,
                    })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, choices: &[(&str, bool)]) -> QuestionRequest {
        QuestionRequest {
            question_text: text.to_string(),
            choices: choices
                .iter()
                .map(|(t, c)| ChoiceInput {
                    choice_text: t.to_string(),
                    is_correct: *c,
                })
                .collect(),
        }
    }

    #[test]
    fn blank_choices_are_skipped() {
        let q = request(
            "  Nominal voltage of an LFP cell?  ",
            &[("3.2 V", true), ("   ", true), ("3.7 V", false), ("", false)],
        )
        .normalize()
        .unwrap();

        assert_eq!(q.question_text, "Nominal voltage of an LFP cell?");
        assert_eq!(
            q.choices,
            vec![("3.2 V".to_string(), true), ("3.7 V".to_string(), false)]
        );
    }

    #[test]
    fn empty_text_is_rejected() {
        let err = request("   ", &[("a", true)]).normalize().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn requires_a_valid_choice() {
        assert!(matches!(
            request("q", &[]).normalize(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            request("q", &[(" ", true)]).normalize(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn requires_a_correct_choice() {
        let err = request("q", &[("a", false), ("b", false)])
            .normalize()
            .unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("correct")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn markup_is_sanitized() {
        let q = request("<script>alert(1)</script>Which?", &[("<b>A</b>", true)])
            .normalize()
            .unwrap();
        assert_eq!(q.question_text, "Which?");
        assert_eq!(q.choices[0].0, "<b>A</b>");
    }

    #[test]
    fn choices_empty_after_sanitizing_are_skipped() {
        let err = request("q", &[("<script>x</script>", true), ("3.7 V", false)])
            .normalize()
            .unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("correct")),
            other => panic!("unexpected error: {:?}", other),
        }

        let q = request("q", &[("<script>x</script>", true), ("3.2 V", true)])
            .normalize()
            .unwrap();
        assert_eq!(q.choices, vec![("3.2 V".to_string(), true)]);
    }

    #[test]
    fn question_text_empty_after_sanitizing_is_rejected() {
        assert!(matches!(
            request("<script>alert(1)</script>  ", &[("a", true)]).normalize(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn plain_text_is_stored_entity_escaped() {
        let q = request("Cut-off when V < 3.0 & I > 0?", &[("Yes", true)])
            .normalize()
            .unwrap();
        assert_eq!(q.question_text, "Cut-off when V &lt; 3.0 &amp; I &gt; 0?");
    }

    #[test]
    fn assemble_groups_and_orders_choices() {
        let questions = vec![
            QuestionRow { id: 1, question_text: "one".into() },
            QuestionRow { id: 2, question_text: "two".into() },
        ];
        let choices = vec![
            ChoiceRow { id: 10, question_id: 1, choice_text: "b".into(), is_correct: false, position: 1 },
            ChoiceRow { id: 11, question_id: 1, choice_text: "a".into(), is_correct: true, position: 0 },
            ChoiceRow { id: 12, question_id: 3, choice_text: "orphan".into(), is_correct: true, position: 0 },
        ];

        let assembled = assemble(questions, choices);

        assert_eq!(assembled.len(), 2);
        assert_eq!(
            assembled[0].choices.iter().map(|c| c.choice_text.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(assembled[1].choices.is_empty());
    }
}
