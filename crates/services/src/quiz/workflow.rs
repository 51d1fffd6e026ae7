use std::sync::Arc;

use learn_core::Score;
use learn_core::model::ChapterId;
use storage::repository::{ChapterRepository, ChapterResultId, ChapterResultRepository};

use super::service::ChapterQuiz;
use crate::Clock;
use crate::error::QuizServiceError;

/// Result of submitting a chapter quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub score: Score,
    pub result_id: ChapterResultId,
}

/// Orchestrates quiz start, navigation and persisted submission.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    chapters: Arc<dyn ChapterRepository>,
    results: Arc<dyn ChapterResultRepository>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        chapters: Arc<dyn ChapterRepository>,
        results: Arc<dyn ChapterResultRepository>,
    ) -> Self {
        Self {
            clock,
            chapters,
            results,
        }
    }

    /// Load a chapter and start a fresh quiz over its questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::ChapterNotFound` for an unknown chapter,
    /// `QuizServiceError::Quiz` if it has no questions, or storage errors.
    pub async fn start_quiz(&self, chapter_id: ChapterId) -> Result<ChapterQuiz, QuizServiceError> {
        let chapter = self
            .chapters
            .get_chapter(chapter_id)
            .await?
            .ok_or(QuizServiceError::ChapterNotFound(chapter_id))?;
        let quiz = ChapterQuiz::new(&chapter, self.clock.now())?;
        tracing::info!(
            chapter_id = %chapter_id,
            questions = quiz.session().total(),
            "quiz started"
        );
        Ok(quiz)
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` once the quiz is submitted.
    pub fn record_answer(
        &self,
        quiz: &mut ChapterQuiz,
        raw: impl Into<String>,
    ) -> Result<(), QuizServiceError> {
        quiz.record_answer(raw).inspect_err(|e| log_rejection(quiz, "answer", e))
    }

    /// Record the `number`-th (1-based) choice of the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::InvalidChoice` when there is no such choice,
    /// or `QuizServiceError::Quiz` once the quiz is submitted.
    pub fn choose(&self, quiz: &mut ChapterQuiz, number: usize) -> Result<(), QuizServiceError> {
        quiz.choose(number).inspect_err(|e| log_rejection(quiz, "choose", e))
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` when the current question is unanswered,
    /// the quiz is on its last question, or it is already submitted.
    pub fn advance(&self, quiz: &mut ChapterQuiz) -> Result<(), QuizServiceError> {
        quiz.advance().inspect_err(|e| log_rejection(quiz, "advance", e))
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` on the first question or after submission.
    pub fn retreat(&self, quiz: &mut ChapterQuiz) -> Result<(), QuizServiceError> {
        quiz.retreat().inspect_err(|e| log_rejection(quiz, "retreat", e))
    }

    /// Grade and finalize the quiz, then append its chapter result.
    ///
    /// If the append fails the quiz stays finalized; call
    /// [`QuizLoopService::finalize_result`] to retry persistence.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` when the session rejects the submit,
    /// or `QuizServiceError::Storage` if persistence fails.
    pub async fn submit(&self, quiz: &mut ChapterQuiz) -> Result<SubmitOutcome, QuizServiceError> {
        let score = quiz
            .submit_at(self.clock.now())
            .inspect_err(|e| log_rejection(quiz, "submit", e))?;
        tracing::info!(
            chapter_id = %quiz.chapter_id(),
            correct = score.correct(),
            total = score.total(),
            percent = score.percent(),
            "quiz submitted"
        );

        let result_id = self.finalize_result(quiz).await?;
        Ok(SubmitOutcome { score, result_id })
    }

    /// Persist the result of a submitted quiz, once.
    ///
    /// Returns the existing id when the result was already stored.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFinalized` if the quiz is still in progress.
    /// Returns `QuizServiceError::Storage` if persistence fails.
    pub async fn finalize_result(
        &self,
        quiz: &mut ChapterQuiz,
    ) -> Result<ChapterResultId, QuizServiceError> {
        if let Some(id) = quiz.result_id() {
            return Ok(id);
        }

        let result = quiz.build_result()?;
        let id = self.results.append_result(&result).await.inspect_err(|e| {
            tracing::warn!(chapter_id = %quiz.chapter_id(), error = %e, "failed to store chapter result");
        })?;
        quiz.set_result_id(id);
        tracing::debug!(chapter_id = %quiz.chapter_id(), result_id = id, "chapter result stored");
        Ok(id)
    }
}

fn log_rejection(quiz: &ChapterQuiz, action: &'static str, err: &QuizServiceError) {
    tracing::debug!(
        chapter_id = %quiz.chapter_id(),
        cursor = quiz.session().cursor(),
        action,
        reason = %err,
        "quiz action rejected"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use learn_core::QuizError;
    use learn_core::model::{Chapter, CourseId, QuestionDraft};
    use learn_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn service_with_chapter(questions: usize) -> (QuizLoopService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let drafts = (1..=questions as u64)
            .map(|i| {
                QuestionDraft::fill_in_blank(i, format!("Q{i}"), "yes")
                    .validate()
                    .unwrap()
            })
            .collect();
        let chapter = Chapter::new(
            ChapterId::new(7),
            CourseId::new(1),
            "Chapter",
            "",
            0,
            drafts,
        )
        .unwrap();
        repo.upsert_chapter(&chapter).await.unwrap();

        let service = QuizLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (service, repo)
    }

    #[tokio::test]
    async fn start_quiz_reports_missing_chapter() {
        let (service, _) = service_with_chapter(1).await;
        let err = service.start_quiz(ChapterId::new(99)).await.unwrap_err();
        assert!(matches!(err, QuizServiceError::ChapterNotFound(id) if id == ChapterId::new(99)));
    }

    #[tokio::test]
    async fn start_quiz_rejects_chapter_without_questions() {
        let (service, _) = service_with_chapter(0).await;
        let err = service.start_quiz(ChapterId::new(7)).await.unwrap_err();
        assert!(matches!(err, QuizServiceError::Quiz(QuizError::Empty)));
    }

    #[tokio::test]
    async fn rejected_submit_does_not_persist() {
        let (service, repo) = service_with_chapter(2).await;
        let mut quiz = service.start_quiz(ChapterId::new(7)).await.unwrap();
        service.record_answer(&mut quiz, "yes").unwrap();

        let err = service.submit(&mut quiz).await.unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::Quiz(QuizError::NotOnFinalQuestion { cursor: 0, last: 1 })
        ));
        assert!(!quiz.is_finalized());
        assert!(repo.list_results(ChapterId::new(7), 10).await.unwrap().is_empty());

        assert!(matches!(
            service.finalize_result(&mut quiz).await.unwrap_err(),
            QuizServiceError::NotFinalized
        ));
    }

    #[tokio::test]
    async fn finalize_result_is_idempotent() {
        let (service, repo) = service_with_chapter(1).await;
        let mut quiz = service.start_quiz(ChapterId::new(7)).await.unwrap();
        service.record_answer(&mut quiz, "Yes!").unwrap();
        let outcome = service.submit(&mut quiz).await.unwrap();

        assert_eq!(outcome.score.correct(), 1);
        let again = service.finalize_result(&mut quiz).await.unwrap();
        assert_eq!(again, outcome.result_id);
        assert_eq!(repo.list_results(ChapterId::new(7), 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_submit_is_rejected() {
        let (service, _) = service_with_chapter(1).await;
        let mut quiz = service.start_quiz(ChapterId::new(7)).await.unwrap();
        service.record_answer(&mut quiz, "yes").unwrap();
        service.submit(&mut quiz).await.unwrap();

        let err = service.submit(&mut quiz).await.unwrap_err();
        assert!(matches!(err, QuizServiceError::Quiz(QuizError::Finalized)));
        assert!(service.record_answer(&mut quiz, "no").is_err());
        assert_eq!(quiz.session().answer(0), Some("yes"));
    }

    #[tokio::test]
    async fn choose_goes_through_service_and_rejects_out_of_range() {
        let repo = InMemoryRepository::new();
        let chapter = Chapter::new(
            ChapterId::new(8),
            CourseId::new(1),
            "Choices",
            "",
            0,
            vec![
                QuestionDraft::multiple_choice(1, "Pick", ["a", "b"], "b")
                    .validate()
                    .unwrap(),
            ],
        )
        .unwrap();
        repo.upsert_chapter(&chapter).await.unwrap();
        let service = QuizLoopService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let mut quiz = service.start_quiz(ChapterId::new(8)).await.unwrap();

        let err = service.choose(&mut quiz, 3).unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::InvalidChoice {
                number: 3,
                available: 2
            }
        ));
        assert_eq!(quiz.session().current_answer(), None);

        service.choose(&mut quiz, 2).unwrap();
        assert_eq!(quiz.session().current_answer(), Some("b"));

        service.submit(&mut quiz).await.unwrap();
        let err = service.choose(&mut quiz, 1).unwrap_err();
        assert!(matches!(err, QuizServiceError::Quiz(QuizError::Finalized)));
        assert_eq!(quiz.session().current_answer(), Some("b"));
    }
}
