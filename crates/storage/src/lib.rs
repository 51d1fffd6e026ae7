#![forbid(unsafe_code)]

pub mod repository;
pub mod seed;
pub mod sqlite;

pub use repository::{
    ChapterRepository, ChapterResultId, ChapterResultRepository, ChapterResultRow,
    CourseRepository, InMemoryRepository, Storage, StorageError,
};
