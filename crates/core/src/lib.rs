#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod quiz;
pub mod time;

pub use error::Error;
pub use quiz::{QuestionOutcome, QuizError, QuizSession, QuizState, Score};
pub use time::Clock;
