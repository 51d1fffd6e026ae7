//! Line-oriented quiz driver for the terminal.

use std::fmt::Write as _;
use std::io::Write as _;

use learn_core::model::{ChapterId, Question, QuestionKind};
use services::{ChapterQuiz, QuizLoopService, QuizServiceError, SubmitOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line of learner input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Blank,
    Answer(String),
    Choice(usize),
    Next,
    Prev,
    Submit,
    Quit,
    Help,
}

/// Interpret a line against the current question. A bare number selects a choice
/// only when the question is multiple choice. An empty line never touches the
/// saved answer.
pub(crate) fn parse_input(line: &str, question: &Question) -> Input {
    let line = line.trim();
    match line {
        "" => return Input::Blank,
        ":next" | ":n" => return Input::Next,
        ":prev" | ":p" => return Input::Prev,
        ":submit" | ":s" => return Input::Submit,
        ":quit" | ":q" => return Input::Quit,
        ":help" | ":h" => return Input::Help,
        _ => {}
    }

    if question.kind() == QuestionKind::MultipleChoice {
        if let Ok(number) = line.parse::<usize>() {
            return Input::Choice(number);
        }
    }
    Input::Answer(line.to_owned())
}

const HELP: &str = "\
Type your answer and press enter. For multiple choice, enter the option number.
Commands: :next  :prev  :submit  :quit  :help";

pub(crate) fn render_intro(quiz: &ChapterQuiz) -> String {
    let mut out = format!("== {} ==\n", quiz.title());
    for paragraph in quiz.content().lines().map(str::trim).filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "{paragraph}\n");
    }
    out.push_str(HELP);
    out
}

pub(crate) fn render_question(quiz: &ChapterQuiz) -> String {
    let progress = quiz.progress();
    let question = quiz.current_question();
    let mut out = format!(
        "\nQuestion {} of {} ({:.0}%) [{}]\n{}\n",
        progress.position,
        progress.total,
        progress.percent,
        question.kind().label(),
        question.prompt()
    );
    for (i, choice) in question.choices().iter().enumerate() {
        let _ = writeln!(out, "  {}. {choice}", i + 1);
    }
    if let Some(answer) = quiz.session().current_answer().filter(|a| !a.is_empty()) {
        let _ = writeln!(out, "Your answer: {answer}");
    }
    out
}

pub(crate) fn render_review(quiz: &ChapterQuiz, outcome: &SubmitOutcome) -> String {
    let mut out = format!(
        "\nQuiz complete: {:.2}% ({} of {} correct)\n",
        outcome.score.percent(),
        outcome.score.correct(),
        outcome.score.total()
    );
    for item in quiz.review().unwrap_or_default() {
        let mark = if item.correct { "correct" } else { "incorrect" };
        let _ = writeln!(out, "\n{}. {} ({mark})", item.index + 1, item.question.prompt());
        let _ = writeln!(out, "   Your answer: {}", item.answer.unwrap_or("(none)"));
        if !item.correct {
            let _ = writeln!(out, "   Correct answer: {}", item.question.correct_answer());
        }
        if let Some(explanation) = item.question.explanation() {
            let _ = writeln!(out, "   {explanation}");
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Recorded,
    Moved,
    Unchanged,
}

/// Apply an answer or navigation input. Submit, quit and help are handled by the loop.
fn apply(
    quiz_loop: &QuizLoopService,
    quiz: &mut ChapterQuiz,
    input: Input,
) -> Result<Step, QuizServiceError> {
    match input {
        Input::Answer(text) => quiz_loop.record_answer(quiz, text).map(|()| Step::Recorded),
        Input::Choice(number) => quiz_loop.choose(quiz, number).map(|()| Step::Recorded),
        Input::Next => quiz_loop.advance(quiz).map(|()| Step::Moved),
        Input::Prev => quiz_loop.retreat(quiz).map(|()| Step::Moved),
        Input::Blank | Input::Submit | Input::Quit | Input::Help => Ok(Step::Unchanged),
    }
}

/// Drive one chapter quiz from stdin until it is submitted or the learner quits.
///
/// Rejected actions are printed and the loop continues; storage failures end it.
pub(crate) async fn run_quiz(
    quiz_loop: &QuizLoopService,
    chapter_id: ChapterId,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut quiz = quiz_loop.start_quiz(chapter_id).await?;
    println!("{}", render_intro(&quiz));
    print!("{}", render_question(&quiz));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let step = match parse_input(&line, quiz.current_question()) {
            Input::Submit => match submit_with_retry(quiz_loop, &mut quiz).await {
                Ok(outcome) => {
                    print!("{}", render_review(&quiz, &outcome));
                    return Ok(());
                }
                Err(err) => Err(err),
            },
            Input::Quit => break,
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            input => apply(quiz_loop, &mut quiz, input),
        };

        match step {
            Ok(Step::Recorded) => {
                let hint = if quiz.session().is_last() {
                    ":submit when ready"
                } else {
                    ":next to continue"
                };
                println!("Answer saved ({hint}).");
            }
            Ok(Step::Moved) => print!("{}", render_question(&quiz)),
            Ok(Step::Unchanged) => match quiz.session().current_answer().filter(|a| !a.is_empty()) {
                Some(answer) => println!("Answer unchanged: {answer}"),
                None => println!("Type an answer, or :help for commands."),
            },
            Err(err) if err.is_rejection() => println!("! {err}"),
            Err(err) => return Err(err.into()),
        }
    }

    println!("Left the quiz without submitting.");
    Ok(())
}

/// Submit, giving the result append one more try if only persistence failed.
async fn submit_with_retry(
    quiz_loop: &QuizLoopService,
    quiz: &mut ChapterQuiz,
) -> Result<SubmitOutcome, QuizServiceError> {
    match quiz_loop.submit(quiz).await {
        Err(QuizServiceError::Storage(err)) if quiz.is_finalized() => {
            tracing::warn!(error = %err, "retrying chapter result append");
            let result_id = quiz_loop.finalize_result(quiz).await?;
            let score = quiz.score().ok_or(QuizServiceError::NotFinalized)?;
            Ok(SubmitOutcome { score, result_id })
        }
        other => other,
    }
}
