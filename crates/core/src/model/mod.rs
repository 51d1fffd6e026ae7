mod chapter;
mod course;
mod ids;
mod question;
mod result;

pub use ids::{ChapterId, CourseId, ParseIdError, QuestionId};

pub use chapter::{Chapter, ChapterError};
pub use course::{ChapterStatus, Course, CourseError, OutlineEntry};
pub use question::{Question, QuestionDraft, QuestionError, QuestionKind};
pub use result::{ChapterResult, ChapterResultError};
