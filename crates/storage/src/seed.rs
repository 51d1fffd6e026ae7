//! Demo catalog used by the `seed` binary and by the app on an empty database.

use chrono::{DateTime, Utc};
use learn_core::model::{
    Chapter, ChapterId, Course, CourseId, OutlineEntry, QuestionDraft,
};
use thiserror::Error;

use crate::repository::{Storage, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Domain(#[from] learn_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<learn_core::model::CourseError> for SeedError {
    fn from(e: learn_core::model::CourseError) -> Self {
        Self::Domain(e.into())
    }
}

impl From<learn_core::model::ChapterError> for SeedError {
    fn from(e: learn_core::model::ChapterError) -> Self {
        Self::Domain(e.into())
    }
}

impl From<learn_core::model::QuestionError> for SeedError {
    fn from(e: learn_core::model::QuestionError) -> Self {
        Self::Domain(e.into())
    }
}

/// Chapter id of the "Handling Events" demo quiz, relative to the course id.
#[must_use]
pub fn handling_events_chapter_id(course_id: CourseId) -> ChapterId {
    ChapterId::new(course_id.value() * 100 + 6)
}

const OUTLINE: &[(&str, &str, &str, u32)] = &[
    ("Introduction to React", "Getting Started", "What is React?", 15),
    (
        "Introduction to React",
        "Getting Started",
        "Setting up Development Environment",
        20,
    ),
    (
        "Introduction to React",
        "Getting Started",
        "Creating Your First React App",
        25,
    ),
    ("Introduction to React", "React Basics", "JSX Syntax", 18),
    ("Introduction to React", "React Basics", "Components and Props", 22),
    ("Introduction to React", "React Basics", "Handling Events", 20),
    ("State Management", "React Hooks", "useState Hook", 25),
    ("State Management", "React Hooks", "useEffect Hook", 30),
    ("State Management", "React Hooks", "Custom Hooks", 35),
];

/// The "React Fundamentals" course with its full outline.
///
/// # Errors
///
/// Returns `SeedError::Domain` if the built-in data fails validation.
pub fn demo_course(course_id: CourseId, now: DateTime<Utc>) -> Result<Course, SeedError> {
    let outline = OUTLINE
        .iter()
        .zip(1_u64..)
        .map(|(&(section, unit, title, minutes), n)| {
            OutlineEntry::new(
                ChapterId::new(course_id.value() * 100 + n),
                title,
                section,
                unit,
                minutes,
            )
        })
        .collect();

    Ok(Course::new(
        course_id,
        "React Fundamentals",
        "John Doe",
        Some(
            "Master the fundamentals of React development with hands-on projects and real-world examples."
                .into(),
        ),
        now,
        outline,
    )?)
}

/// The "Handling Events" chapter and its three-question quiz.
///
/// # Errors
///
/// Returns `SeedError::Domain` if the built-in data fails validation.
pub fn handling_events_chapter(course_id: CourseId) -> Result<Chapter, SeedError> {
    let questions = vec![
        QuestionDraft::multiple_choice(
            1,
            "Which is the correct way to handle a click event in React?",
            [
                "onClick=\"handleClick()\"",
                "onClick={handleClick}",
                "onclick={handleClick}",
                "on-click={handleClick}",
            ],
            "onClick={handleClick}",
        )
        .with_explanation(
            "In React, event handlers are passed as functions, not strings, and use camelCase naming.",
        )
        .validate()?,
        QuestionDraft::fill_in_blank(
            2,
            "Complete the code: <button ______={handleClick}>Click me</button>",
            "onClick",
        )
        .with_explanation("The onClick prop is used to handle click events in React.")
        .validate()?,
        QuestionDraft::free_text(
            3,
            "Explain the difference between onClick={handleClick} and onClick={handleClick()}",
            "onClick={handleClick} passes the function reference, while onClick={handleClick()} calls the function immediately",
        )
        .with_explanation(
            "Passing the function reference allows React to call it when the event occurs, while calling it immediately would execute on render.",
        )
        .validate()?,
    ];

    let content = "\
In React, handling events is similar to handling events on DOM elements. React events are named using camelCase, \
rather than lowercase. With JSX you pass a function as the event handler, rather than a string.

Let's explore how to handle different types of events in React components.";

    Ok(Chapter::new(
        handling_events_chapter_id(course_id),
        course_id,
        "Handling Events",
        content,
        5,
        questions,
    )?)
}

/// Write the demo course and its quiz chapter.
///
/// # Errors
///
/// Returns `SeedError` if validation or persistence fails.
pub async fn seed_demo_catalog(
    storage: &Storage,
    course_id: CourseId,
    now: DateTime<Utc>,
) -> Result<ChapterId, SeedError> {
    let course = demo_course(course_id, now)?;
    storage.courses.upsert_course(&course).await?;

    let chapter = handling_events_chapter(course_id)?;
    storage.chapters.upsert_chapter(&chapter).await?;
    tracing::info!(
        course_id = %course_id,
        chapter_id = %chapter.id(),
        "seeded demo catalog"
    );

    Ok(chapter.id())
}
