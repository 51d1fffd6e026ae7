use std::fmt::Write as _;

use learn_core::model::ChapterStatus;
use services::{CourseOutline, CourseProgress, CourseSummary, LearnerDashboard};

pub(crate) fn courses(list: &[CourseSummary]) -> String {
    if list.is_empty() {
        return "No courses yet. Run `app seed` to add the demo course.\n".into();
    }
    let mut out = String::new();
    for course in list {
        let _ = writeln!(
            out,
            "{:>4}  {} by {} ({} chapters, {} min)",
            course.id.value(), course.title, course.instructor, course.chapter_count, course.total_minutes
        );
        if let Some(description) = &course.description {
            let _ = writeln!(out, "      {description}");
        }
    }
    out
}

fn status_tag(status: ChapterStatus) -> &'static str {
    match status {
        ChapterStatus::Completed => "done",
        ChapterStatus::Current => "open",
        ChapterStatus::Locked => "locked",
    }
}

pub(crate) fn outline(outline: &CourseOutline) -> String {
    let course = &outline.course;
    let mut out = format!(
        "{} by {} ({} chapters, {} min)\n",
        course.title, course.instructor, course.chapter_count, course.total_minutes
    );
    for section in &outline.sections {
        let _ = writeln!(out, "\n{}", section.title);
        for unit in &section.units {
            let _ = writeln!(out, "  {}", unit.title);
            for item in &unit.chapters {
                let _ = write!(
                    out,
                    "    [{:<6}] {:>5}  {} ({} min)",
                    status_tag(item.status),
                    item.chapter_id.value(),
                    item.title,
                    item.duration_minutes
                );
                if let Some(best) = item.best_score {
                    let _ = write!(out, "  best {best:.0}% over {} attempt(s)", item.attempts);
                }
                out.push('\n');
            }
        }
    }
    out
}

fn progress_line(out: &mut String, progress: &CourseProgress) {
    let _ = write!(
        out,
        "{}: {}/{} chapters ({:.0}%)",
        progress.title, progress.completed, progress.total, progress.percent
    );
    match &progress.next_chapter {
        Some(next) => {
            let _ = write!(out, ", next: {}", next.title);
        }
        None => out.push_str(", finished"),
    }
    if let Some(average) = progress.average_score {
        let _ = write!(out, ", average score {average:.0}%");
    }
    out.push('\n');
}

pub(crate) fn dashboard(dashboard: &LearnerDashboard) -> String {
    let mut out = String::new();
    for progress in &dashboard.courses {
        progress_line(&mut out, progress);
    }
    let _ = write!(
        out,
        "\n{} chapter(s) completed over {} attempt(s)",
        dashboard.completed_chapters, dashboard.attempts
    );
    if let Some(average) = dashboard.average_score {
        let _ = write!(out, ", overall average {average:.2}%");
    }
    out.push('\n');
    out
}
