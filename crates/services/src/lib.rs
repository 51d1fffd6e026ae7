#![forbid(unsafe_code)]

pub mod app_services;
pub mod course_service;
pub mod error;
pub mod quiz;

pub use learn_core::Clock;

pub use app_services::AppServices;
pub use course_service::{
    CourseOutline, CourseProgress, CourseService, CourseSummary, LearnerDashboard, NextChapter,
    OutlineItem, OutlineSection, OutlineUnit,
};
pub use error::{AppServicesError, CourseServiceError, QuizServiceError};
pub use quiz::{ChapterQuiz, QuizLoopService, QuizProgress, SharedQuiz, SubmitOutcome};
