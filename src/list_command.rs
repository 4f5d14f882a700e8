use anyhow::{Context, Result};
use log::{info, warn};

use crate::elapsed::Elapsed;
use crate::store::TimeEntryStore;
use crate::time_entry::TimeEntry;
use crate::trackify::TimeEntryRepository;

/// time entryの一覧を出力するためのサブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct ListArgs {
    #[clap(short = 'r', long = "running", help = "Shows only the running time entry")]
    pub running: bool,
}

/// `list`サブコマンドの結果。
#[derive(Debug)]
pub struct ListReport {
    pub entries: Vec<TimeEntry>,
    /// 停止済みのtime entryの経過時間の合計
    pub total: Elapsed,
}

pub struct ListCommand<'a, T: TimeEntryRepository> {
    repository: &'a T,
}

impl<'a, T: TimeEntryRepository> ListCommand<'a, T> {
    /// 新しい`ListCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - time entryを取得するリポジトリ
    pub fn new(repository: &'a T) -> Self {
        Self { repository }
    }

    /// `list`サブコマンドの処理を行う。
    ///
    /// Trackify APIから取得した順にtime entryを返す。
    /// 経過時間の形式が不正なtime entryは合計に含めない。
    pub async fn run(&self, args: ListArgs) -> Result<ListReport> {
        let time_entries = self
            .repository
            .list_time_entries()
            .await
            .context("Failed to retrieve time entries")?;
        let mut store = TimeEntryStore::new();
        store.replace_all(time_entries);
        info!("Time entries retrieved successfully.");

        let total_secs: u64 = store
            .entries()
            .iter()
            .filter(|entry| !entry.is_running)
            .filter_map(|entry| match entry.duration.parse::<Elapsed>() {
                Ok(elapsed) => Some(elapsed.as_secs()),
                Err(err) => {
                    warn!("Skip duration of time entry {}: {:?}", entry.id, err);
                    None
                }
            })
            .sum();

        let entries: Vec<TimeEntry> = if args.running {
            store.running().cloned().into_iter().collect()
        } else {
            store.entries().to_vec()
        };

        Ok(ListReport {
            entries,
            total: Elapsed::from_secs(total_secs),
        })
    }
}
