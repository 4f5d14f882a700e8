use std::fmt;

use log::warn;

use crate::time_entry::TimeEntry;

/// 操作が受け付けられなかった理由。
///
/// いずれの場合もstoreは変更されていない。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// 新しい計測を始めるためのprojectが選択されていない。
    NoProjectSelected,
    /// 既に別のtime entryが計測中。
    AlreadyRunning { running_id: String },
    /// 指定したidのtime entryが存在しない。
    UnknownEntry(String),
    /// 指定したtime entryは計測中ではない。
    NotRunning(String),
    /// 同じidのtime entryが既に存在する。
    DuplicateEntry(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoProjectSelected => write!(f, "Please select a project first."),
            Rejection::AlreadyRunning { running_id } => {
                write!(f, "A timer is already running ({}).", running_id)
            }
            Rejection::UnknownEntry(id) => write!(f, "No time entry with id {}.", id),
            Rejection::NotRunning(id) => write!(f, "Time entry {} is not running.", id),
            Rejection::DuplicateEntry(id) => write!(f, "Time entry {} already exists.", id),
        }
    }
}

impl std::error::Error for Rejection {}

/// Trackify APIから読み込んだtime entryを保持する。
///
/// 計測状態の変更は`begin_fresh`, `resume`, `finish`からのみ行い、
/// 計測中のtime entryが常に高々1件であることを保証する。
/// 読み込み・追加した順序を保ち、並び替えは行わない。
#[derive(Clone, Debug, Default)]
pub struct TimeEntryStore {
    entries: Vec<TimeEntry>,
}

impl TimeEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保持しているtime entryを置き換える。
    ///
    /// idのないtime entryは読み込まない。計測中のtime entryが複数ある場合は、
    /// 最初の1件以外を停止扱いにする。
    pub fn replace_all(&mut self, entries: Vec<TimeEntry>) {
        let mut running_seen = false;
        self.entries = entries
            .into_iter()
            .filter(|entry| {
                if entry.id.is_empty() {
                    warn!("Skip time entry without id: {:?}", entry);
                    return false;
                }
                true
            })
            .map(|mut entry| {
                if entry.is_running {
                    if running_seen {
                        warn!("Multiple running time entries, treat {} as stopped", entry.id);
                        entry.is_running = false;
                    }
                    running_seen = true;
                }
                entry
            })
            .collect();
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&TimeEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// 計測中のtime entryを返す。
    pub fn running(&self) -> Option<&TimeEntry> {
        self.entries.iter().find(|entry| entry.is_running)
    }

    pub fn running_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_running).count()
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        match self.running() {
            Some(running) => Err(Rejection::AlreadyRunning {
                running_id: running.id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn position(&self, id: &str) -> Result<usize, Rejection> {
        self.entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| Rejection::UnknownEntry(id.to_string()))
    }

    /// 新しいtime entryを計測中として末尾に追加する。
    pub fn begin_fresh(&mut self, mut entry: TimeEntry) -> Result<&TimeEntry, Rejection> {
        self.ensure_idle()?;
        if self.get(&entry.id).is_some() {
            return Err(Rejection::DuplicateEntry(entry.id));
        }
        entry.is_running = true;
        entry.end_time = String::new();
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// 停止中のtime entryを同じレコードのまま計測中に戻す。
    pub fn resume(&mut self, id: &str, start_time: String) -> Result<&TimeEntry, Rejection> {
        let index = self.position(id)?;
        self.ensure_idle()?;
        let entry = &mut self.entries[index];
        entry.is_running = true;
        entry.start_time = start_time;
        Ok(&*entry)
    }

    /// 計測中のtime entryを停止し、終了時刻と経過時間を確定する。
    pub fn finish(
        &mut self,
        id: &str,
        end_time: String,
        duration: String,
    ) -> Result<&TimeEntry, Rejection> {
        let index = self.position(id)?;
        let entry = &mut self.entries[index];
        if !entry.is_running {
            return Err(Rejection::NotRunning(id.to_string()));
        }
        entry.is_running = false;
        entry.end_time = end_time;
        entry.duration = duration;
        Ok(&*entry)
    }

    /// 同じidのtime entryを置き換える。計測状態は変更しない。
    pub fn replace(&mut self, entry: TimeEntry) -> Result<&TimeEntry, Rejection> {
        let index = self.position(&entry.id)?;
        let is_running = self.entries[index].is_running;
        self.entries[index] = TimeEntry {
            is_running,
            ..entry
        };
        Ok(&self.entries[index])
    }

    /// 仮idをサーバーが払い出したidに置き換える。
    ///
    /// 仮idのtime entryが既に削除されている場合は何もしない。
    pub fn replace_id(&mut self, placeholder_id: &str, created_id: &str) -> Option<&TimeEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == placeholder_id)?;
        // idだけを置き換え、その他の項目はローカルの変更を優先する
        let entry = &mut self.entries[index];
        entry.id = created_id.to_string();
        Some(&*entry)
    }

    pub fn remove(&mut self, id: &str) -> Result<TimeEntry, Rejection> {
        let index = self.position(id)?;
        Ok(self.entries.remove(index))
    }

    pub fn increment_count(&mut self, id: &str) -> Result<&TimeEntry, Rejection> {
        let index = self.position(id)?;
        let entry = &mut self.entries[index];
        entry.count += 1;
        Ok(&*entry)
    }
}
