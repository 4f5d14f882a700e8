use std::io::Write;

use anyhow::{Context, Result};

use crate::catalog::ProjectSummary;
use crate::time_entry::TimeEntry;

/// Consoleにtime entryとprojectを表示するためのtrait。
pub trait ConsolePresenter {
    /// タイムエントリーを表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 表示するタイムエントリー
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()>;

    /// projectとtask数を番号付きで表示する。
    fn show_projects(&mut self, projects: &[ProjectSummary]) -> Result<()>;
}

/// Markdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 読み込んだ順に表示し、並び替えは行わない。
    fn show_time_entries(&mut self, time_entries: &[TimeEntry]) -> Result<()> {
        for entry in time_entries {
            let end_str = if entry.end_time.is_empty() {
                "N/A"
            } else {
                entry.end_time.as_str()
            };
            let mut line = format!(
                "- [{}] {} ~ {} ({}): {}",
                entry.id, entry.start_time, end_str, entry.duration, entry.project_name
            );
            if entry.count > 0 {
                line.push_str(&format!(" x{}", entry.count));
            }
            if entry.is_running {
                line.push_str(" (running)");
            }
            writeln!(self.writer, "{}", line)
                .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        }

        Ok(())
    }

    fn show_projects(&mut self, projects: &[ProjectSummary]) -> Result<()> {
        for (index, summary) in projects.iter().enumerate() {
            let mut line = format!(
                "{}. {} (Tasks: {})",
                index + 1,
                summary.project.name,
                summary.task_count
            );
            if !summary.project.description.is_empty() {
                line.push_str(&format!(": {}", summary.project.description));
            }
            writeln!(self.writer, "{}", line)
                .with_context(|| format!("Failed to write project: {:?}", summary.project))?;
        }

        Ok(())
    }
}
