use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::datetime;
use crate::elapsed::{DisplayTimer, Elapsed};
use crate::store::{Rejection, TimeEntryStore};
use crate::time_entry::{EntryPatch, TimeEntry};
use crate::trackify::TimeEntryRepository;

/// Trackify APIへの反映方法。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncKind {
    Create,
    Update,
    Delete,
}

/// Trackify APIへの反映要求。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncRequest {
    pub kind: SyncKind,
    pub entry: TimeEntry,
}

impl SyncRequest {
    fn new(kind: SyncKind, entry: TimeEntry) -> Self {
        Self { kind, entry }
    }
}

/// `TimerController::persist`が返す反映要求の結果。
#[derive(Debug)]
pub struct SyncCompletion {
    request: SyncRequest,
    result: anyhow::Result<TimeEntry>,
}

/// 受け付けた操作の結果。
///
/// ローカルの状態は変更済みで、APIへの反映は`request`として呼び出し側が実行する。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Accepted {
    pub entry: TimeEntry,
    /// ローカルのみの操作、または作成中の仮idへの操作では`None`
    pub request: Option<SyncRequest>,
}

/// Trackify APIへの反映状況。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// APIに反映した
    Saved,
    /// APIへの反映に失敗した。ローカルの状態は戻していない
    Failed,
    /// 反映が終わる前に対象のtime entryがローカルからなくなっていた
    Stale,
}

/// 反映要求の結果をローカルに適用した結果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settled {
    pub kind: SyncKind,
    pub entry: TimeEntry,
    pub status: SyncStatus,
    /// 続けてAPIに送る必要がある要求
    pub follow_up: Option<SyncRequest>,
}

impl Settled {
    fn new(kind: SyncKind, entry: TimeEntry, status: SyncStatus) -> Self {
        Self {
            kind,
            entry,
            status,
            follow_up: None,
        }
    }
}

/// time entryの計測開始・停止・編集・削除を行う。
///
/// 状態の変更は`TimeEntryStore`を経由して同期的に行い、APIへの反映は`SyncRequest`として返す。
/// 反映を待たずに次の操作を受け付けられるよう、反映の実行(`persist`)と
/// 結果の適用(`complete`)は分けている。
/// APIへの反映に失敗してもログを出力するだけで、ローカルの状態は戻さず再送もしない。
pub struct TimerController<R: TimeEntryRepository> {
    repository: Arc<R>,
    store: TimeEntryStore,
    display: DisplayTimer,
    selected_project: Option<String>,
    /// 作成要求の結果を待っている仮id
    pending_creates: HashSet<String>,
}

impl<R: TimeEntryRepository> TimerController<R> {
    /// 新しい`TimerController`を返す。
    ///
    /// # Arguments
    /// * `repository` - time entryを永続化するリポジトリ
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
            store: TimeEntryStore::new(),
            display: DisplayTimer::new(),
            selected_project: None,
            pending_creates: HashSet::new(),
        }
    }

    /// APIからtime entryを読み込む。
    ///
    /// 読み込みに失敗した場合は空のまま続ける。
    /// 計測中のtime entryがある場合は表示用のタイマーをゼロから動かす。
    pub async fn load(&mut self) -> usize {
        match self.repository.list_time_entries().await {
            Ok(entries) => self.store.replace_all(entries),
            Err(err) => {
                error!("Error loading time entries: {:?}", err);
                self.store.replace_all(vec![]);
            }
        }
        self.display.halt();
        if self.store.running().is_some() {
            self.display.start();
        }
        info!(
            "Loaded {} time entries ({} running)",
            self.store.entries().len(),
            self.store.running_count()
        );

        self.store.entries().len()
    }

    /// 次に新しく計測するprojectを選択する。
    pub fn select_project(&mut self, name: impl Into<String>) {
        let name = name.into();
        info!("Select project: {}", name);
        self.selected_project = Some(name);
    }

    pub fn selected_project(&self) -> Option<&str> {
        self.selected_project.as_deref()
    }

    pub fn entries(&self) -> &[TimeEntry] {
        self.store.entries()
    }

    pub fn running_entry(&self) -> Option<&TimeEntry> {
        self.store.running()
    }

    /// 表示用のタイマーの現在値。
    pub fn display(&self) -> Elapsed {
        self.display.value()
    }

    /// 表示用のタイマーがtickを必要としているか。
    pub fn is_ticking(&self) -> bool {
        self.display.is_running()
    }

    /// 表示用のタイマーを1秒進める。
    pub fn tick(&mut self) -> Option<Elapsed> {
        self.display.tick()
    }

    /// 計測を開始する。
    ///
    /// `target`を指定した場合は停止中のtime entryを再開し、
    /// 指定しない場合は選択中のprojectで新しいtime entryを仮idで追加する。
    ///
    /// # Arguments
    /// * `target` - 再開するtime entryのid
    pub fn start(&mut self, target: Option<&str>) -> Result<Accepted, Rejection> {
        match target {
            Some(id) => self.resume(id),
            None => self.start_fresh(),
        }
    }

    fn resume(&mut self, id: &str) -> Result<Accepted, Rejection> {
        let entry = self.store.resume(id, datetime::time_of_day())?.clone();
        self.display.halt();
        self.display.start();
        info!("Resume time entry: {}", entry.id);

        Ok(self.accept(SyncKind::Update, entry))
    }

    fn start_fresh(&mut self) -> Result<Accepted, Rejection> {
        let project_name = self
            .selected_project
            .clone()
            .ok_or(Rejection::NoProjectSelected)?;
        let placeholder = TimeEntry {
            id: datetime::placeholder_id(),
            project_name,
            start_time: datetime::time_of_day(),
            end_time: String::new(),
            duration: self.display.value().to_string(),
            is_running: true,
            count: 0,
        };
        let entry = self.store.begin_fresh(placeholder)?.clone();
        self.display.start();
        self.pending_creates.insert(entry.id.clone());
        info!("Start time entry: {} ({})", entry.id, entry.project_name);

        Ok(Accepted {
            request: Some(SyncRequest::new(SyncKind::Create, entry.clone())),
            entry,
        })
    }

    /// 計測中のtime entryを停止する。
    ///
    /// 経過時間には表示用のタイマーの値を記録し、選択中のprojectは解除する。
    pub fn stop(&mut self, id: &str) -> Result<Accepted, Rejection> {
        let duration = self.display.value().to_string();
        let entry = match self.store.finish(id, datetime::time_of_day(), duration) {
            Ok(entry) => entry.clone(),
            Err(rejection) => {
                warn!("Cannot stop time entry {}: {}", id, rejection);
                return Err(rejection);
            }
        };
        self.display.halt();
        self.selected_project = None;
        info!("Stop time entry: {} ({})", entry.id, entry.duration);

        Ok(self.accept(SyncKind::Update, entry))
    }

    /// project名、開始時刻、終了時刻を編集する。
    ///
    /// ローカルのtime entryはすぐに置き換える。durationは再計算しない。
    pub fn edit(&mut self, id: &str, patch: &EntryPatch) -> Result<Accepted, Rejection> {
        let updated = self
            .store
            .get(id)
            .map(|current| patch.apply_to(current))
            .ok_or_else(|| Rejection::UnknownEntry(id.to_string()))?;
        let replaced = self.store.replace(updated)?.clone();
        info!("Edit time entry: {}", replaced.id);

        Ok(self.accept(SyncKind::Update, replaced))
    }

    /// time entryの削除を受け付ける。
    ///
    /// ローカルからはAPIで削除できた後に取り除く。
    /// 作成中の仮idはすぐにローカルから取り除き、作成の完了後にAPIからも削除する。
    pub fn remove(&mut self, id: &str) -> Result<Accepted, Rejection> {
        if self.pending_creates.contains(id) {
            let removed = self.discard(id)?;
            debug!("Delete {} after it is created", id);
            return Ok(Accepted {
                entry: removed,
                request: None,
            });
        }
        let entry = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| Rejection::UnknownEntry(id.to_string()))?;
        info!("Delete time entry: {}", entry.id);

        Ok(Accepted {
            request: Some(SyncRequest::new(SyncKind::Delete, entry.clone())),
            entry,
        })
    }

    /// 回数を1増やす。表示用のためAPIには送らない。
    pub fn increment_count(&mut self, id: &str) -> Result<Accepted, Rejection> {
        let entry = self.store.increment_count(id)?.clone();
        Ok(Accepted {
            entry,
            request: None,
        })
    }

    /// 反映要求をAPIに送るfutureを返す。
    ///
    /// futureは`TimerController`を借用しないため、別のタスクで実行できる。
    pub fn persist(
        &self,
        request: SyncRequest,
    ) -> impl Future<Output = SyncCompletion> + Send + 'static
    where
        R: Send + Sync + 'static,
    {
        let repository = Arc::clone(&self.repository);
        async move {
            let entry = &request.entry;
            let result = match request.kind {
                SyncKind::Create => repository.create_time_entry(entry).await,
                SyncKind::Update => repository.update_time_entry(&entry.id, entry).await,
                SyncKind::Delete => repository
                    .delete_time_entry(&entry.id)
                    .await
                    .map(|_| entry.clone()),
            };
            SyncCompletion { request, result }
        }
    }

    /// 反映要求の結果をローカルに適用する。
    ///
    /// 対象のidがローカルにない場合は何もしない。
    pub fn complete(&mut self, completion: SyncCompletion) -> Settled {
        let SyncCompletion { request, result } = completion;
        let SyncRequest { kind, entry } = request;
        match result {
            Err(err) => {
                error!("Error saving time entry {} ({:?}): {:?}", entry.id, kind, err);
                if kind == SyncKind::Create {
                    self.pending_creates.remove(&entry.id);
                }
                Settled::new(kind, entry, SyncStatus::Failed)
            }
            Ok(saved) => match kind {
                SyncKind::Create => self.complete_create(entry, saved),
                SyncKind::Update => Settled::new(kind, entry, SyncStatus::Saved),
                SyncKind::Delete => self.complete_delete(entry),
            },
        }
    }

    fn complete_create(&mut self, placeholder: TimeEntry, created: TimeEntry) -> Settled {
        self.pending_creates.remove(&placeholder.id);
        if created.id.is_empty() {
            warn!(
                "Created time entry does not have a valid id, keep {}",
                placeholder.id
            );
            return Settled::new(SyncKind::Create, placeholder, SyncStatus::Failed);
        }

        match self.store.replace_id(&placeholder.id, &created.id) {
            Some(synced) => {
                let synced = synced.clone();
                info!("Time entry {} was saved as {}", placeholder.id, synced.id);
                let mut settled =
                    Settled::new(SyncKind::Create, synced.clone(), SyncStatus::Saved);
                // 作成中に停止や編集をした場合は最新の状態を送り直す
                if synced != created {
                    settled.follow_up = Some(SyncRequest::new(SyncKind::Update, synced));
                }
                settled
            }
            None => {
                warn!(
                    "Time entry {} was removed before {} was created",
                    placeholder.id, created.id
                );
                let mut settled =
                    Settled::new(SyncKind::Create, created.clone(), SyncStatus::Stale);
                settled.follow_up = Some(SyncRequest::new(SyncKind::Delete, created));
                settled
            }
        }
    }

    fn complete_delete(&mut self, entry: TimeEntry) -> Settled {
        match self.discard(&entry.id) {
            Ok(removed) => {
                info!("Deleted time entry: {}", removed.id);
                Settled::new(SyncKind::Delete, removed, SyncStatus::Saved)
            }
            Err(rejection) => {
                warn!("Deleted time entry is no longer loaded: {}", rejection);
                Settled::new(SyncKind::Delete, entry, SyncStatus::Stale)
            }
        }
    }

    /// ローカルからtime entryを取り除く。計測中だった場合は表示用のタイマーも止める。
    fn discard(&mut self, id: &str) -> Result<TimeEntry, Rejection> {
        let removed = self.store.remove(id)?;
        if removed.is_running {
            warn!("Removed running time entry: {}", removed.id);
            self.display.halt();
        }
        Ok(removed)
    }

    fn accept(&self, kind: SyncKind, entry: TimeEntry) -> Accepted {
        // 作成中の仮idへの変更は作成の完了後にまとめて送る
        let request = if self.pending_creates.contains(&entry.id) {
            debug!("Defer {:?} of {} until it is created", kind, entry.id);
            None
        } else {
            Some(SyncRequest::new(kind, entry.clone()))
        };
        Accepted { entry, request }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{Local, TimeZone};
    use rstest::rstest;

    use super::{Accepted, Settled, SyncKind, SyncStatus, TimerController};
    use crate::datetime::mock_datetime;
    use crate::elapsed::Elapsed;
    use crate::store::Rejection;
    use crate::time_entry::{EntryPatch, TimeEntry};
    use crate::trackify::MockTimeEntryRepository;

    fn entry(id: &str, project_name: &str, is_running: bool) -> TimeEntry {
        TimeEntry {
            id: id.to_string(),
            project_name: project_name.to_string(),
            start_time: "09:00:00".to_string(),
            end_time: if is_running {
                "".to_string()
            } else {
                "10:00:00".to_string()
            },
            duration: "01:00:00".to_string(),
            is_running,
            count: 0,
        }
    }

    /// `entries`を読み込んだ状態の`TimerController`を作成する。
    ///
    /// `setup`で読み込み後の呼び出しに対する期待値を設定する。
    async fn controller<F>(
        entries: Vec<TimeEntry>,
        setup: F,
    ) -> TimerController<MockTimeEntryRepository>
    where
        F: FnOnce(&mut MockTimeEntryRepository),
    {
        let mut repository = MockTimeEntryRepository::new();
        repository
            .expect_list_time_entries()
            .times(1)
            .return_once(move || Ok(entries));
        setup(&mut repository);

        let mut controller = TimerController::new(repository);
        controller.load().await;
        controller
    }

    /// 受け付けた操作の反映要求をAPIに送り、その結果を適用する。
    async fn settle(
        controller: &mut TimerController<MockTimeEntryRepository>,
        accepted: &Accepted,
    ) -> Settled {
        let request = accepted.request.clone().expect("sync request");
        let completion = controller.persist(request).await;
        controller.complete(completion)
    }

    fn created_as(id: &'static str) -> impl Fn(&TimeEntry) -> anyhow::Result<TimeEntry> + Send {
        move |entry| {
            Ok(TimeEntry {
                id: id.to_string(),
                ..entry.clone()
            })
        }
    }

    fn set_clock(hour: u32, min: u32, sec: u32) {
        let local = Local.with_ymd_and_hms(2024, 5, 1, hour, min, sec).unwrap();
        mock_datetime::set_mock_time(local.to_utc());
    }

    /// 開始はAPIを待たずに仮idで追加し、作成後にサーバーのidへ置き換えることを確認する。
    #[tokio::test]
    async fn test_start_fresh() {
        set_clock(9, 0, 0);
        let mut controller = controller(vec![], |repository| {
            repository
                .expect_create_time_entry()
                .withf(|entry| {
                    entry.project_name == "Alpha"
                        && entry.is_running
                        && entry.end_time.is_empty()
                        && entry.start_time == "09:00:00"
                        && entry.duration == "00:00:00"
                        && entry.count == 0
                })
                .times(1)
                .returning(created_as("srv-1"));
        })
        .await;
        controller.select_project("Alpha");

        let accepted = controller.start(None).unwrap();

        let placeholder = accepted.entry.id.clone();
        assert_eq!(accepted.request.as_ref().unwrap().kind, SyncKind::Create);
        assert_eq!(controller.running_entry().unwrap().id, placeholder);
        assert!(controller.is_ticking());

        let settled = settle(&mut controller, &accepted).await;

        assert_eq!(settled.status, SyncStatus::Saved);
        assert_eq!(settled.follow_up, None);
        assert_eq!(controller.entries().len(), 1);
        let created = &controller.entries()[0];
        assert_eq!(created.id, "srv-1");
        assert_eq!(created.project_name, "Alpha");
        assert_eq!(created.end_time, "");
        assert!(created.is_running);
        assert!(controller.is_ticking());
        mock_datetime::clear_mock_time();
    }

    /// projectが未選択の場合は開始せず、storeも変更しないことを確認する。
    #[tokio::test]
    async fn test_start_without_project() {
        let stopped = entry("1", "Alpha", false);
        let mut controller = controller(vec![stopped.clone()], |repository| {
            repository.expect_create_time_entry().times(0);
        })
        .await;

        let result = controller.start(None);

        assert_eq!(result.unwrap_err(), Rejection::NoProjectSelected);
        assert_eq!(controller.entries(), &[stopped]);
        assert!(!controller.is_ticking());
    }

    /// 計測中のtime entryがある場合は新しく開始しないことを確認する。
    #[tokio::test]
    async fn test_start_while_running() {
        let running = entry("1", "Alpha", true);
        let mut controller = controller(vec![running.clone()], |repository| {
            repository.expect_create_time_entry().times(0);
        })
        .await;
        controller.select_project("Alpha");

        let result = controller.start(None);

        assert_eq!(
            result.unwrap_err(),
            Rejection::AlreadyRunning {
                running_id: "1".to_string()
            }
        );
        assert_eq!(controller.entries(), &[running]);
        assert_eq!(
            controller.entries().iter().filter(|e| e.is_running).count(),
            1
        );
    }

    /// 作成に失敗しても仮idのtime entryは残り、計測は続くことを確認する。
    #[rstest]
    #[case::request_failed(false)]
    #[case::missing_id(true)]
    #[tokio::test]
    async fn test_start_fresh_not_synced(#[case] responds: bool) {
        let mut controller = controller(vec![], move |repository| {
            repository
                .expect_create_time_entry()
                .times(1)
                .returning(move |entry| {
                    if responds {
                        Ok(TimeEntry {
                            id: String::new(),
                            ..entry.clone()
                        })
                    } else {
                        Err(anyhow!("connection refused"))
                    }
                });
        })
        .await;
        controller.select_project("Alpha");
        let accepted = controller.start(None).unwrap();

        let settled = settle(&mut controller, &accepted).await;

        assert_eq!(settled.status, SyncStatus::Failed);
        assert_eq!(settled.follow_up, None);
        assert_eq!(controller.entries().len(), 1);
        assert_eq!(controller.running_entry().unwrap().id, accepted.entry.id);
        assert!(!accepted.entry.id.is_empty());
        assert!(controller.is_ticking());
    }

    /// 作成中に停止した場合は、作成後にサーバーのidで停止した状態を送ることを確認する。
    #[tokio::test]
    async fn test_stop_while_creating() {
        let mut controller = controller(vec![], |repository| {
            repository
                .expect_create_time_entry()
                .times(1)
                .returning(created_as("srv-1"));
            repository
                .expect_update_time_entry()
                .withf(|id, entry| {
                    id == "srv-1" && !entry.is_running && entry.duration == "00:00:03"
                })
                .times(1)
                .returning(|_, entry| Ok(entry.clone()));
        })
        .await;
        controller.select_project("Alpha");
        let started = controller.start(None).unwrap();
        for _ in 0..3 {
            controller.tick();
        }

        let stopped = controller.stop(&started.entry.id).unwrap();

        assert_eq!(stopped.request, None);
        assert!(!controller.is_ticking());

        let created = settle(&mut controller, &started).await;

        assert_eq!(created.status, SyncStatus::Saved);
        let follow_up = created.follow_up.clone().unwrap();
        assert_eq!(follow_up.kind, SyncKind::Update);
        assert_eq!(controller.entries()[0].id, "srv-1");
        assert!(!controller.entries()[0].is_running);

        let completion = controller.persist(follow_up).await;
        let updated = controller.complete(completion);

        assert_eq!(updated.status, SyncStatus::Saved);
        assert_eq!(updated.entry.duration, "00:00:03");
    }

    /// 作成中に削除した場合は、作成後にサーバーからも削除することを確認する。
    #[tokio::test]
    async fn test_remove_while_creating() {
        let mut controller = controller(vec![], |repository| {
            repository
                .expect_create_time_entry()
                .times(1)
                .returning(created_as("srv-1"));
            repository
                .expect_delete_time_entry()
                .withf(|id| id == "srv-1")
                .times(1)
                .returning(|_| Ok(()));
        })
        .await;
        controller.select_project("Alpha");
        let started = controller.start(None).unwrap();
        controller.tick();

        let removed = controller.remove(&started.entry.id).unwrap();

        assert_eq!(removed.request, None);
        assert!(controller.entries().is_empty());
        assert!(!controller.is_ticking());
        assert_eq!(controller.tick(), None);

        let created = settle(&mut controller, &started).await;

        assert_eq!(created.status, SyncStatus::Stale);
        assert!(controller.entries().is_empty());
        let follow_up = created.follow_up.unwrap();
        assert_eq!(follow_up.kind, SyncKind::Delete);

        let completion = controller.persist(follow_up).await;
        let deleted = controller.complete(completion);

        assert_eq!(deleted.status, SyncStatus::Stale);
        assert!(controller.entries().is_empty());
    }

    /// 125秒経過後に停止すると、経過時間`00:02:05`で更新されることを確認する。
    #[tokio::test]
    async fn test_stop_after_ticks() {
        set_clock(10, 2, 5);
        let mut controller = controller(vec![entry("1", "Alpha", false)], |repository| {
            repository
                .expect_update_time_entry()
                .withf(|id, entry| {
                    id == "1"
                        && !entry.is_running
                        && entry.duration == "00:02:05"
                        && entry.end_time == "10:02:05"
                })
                .times(1)
                .returning(|_, entry| Ok(entry.clone()));
        })
        .await;
        controller.select_project("Alpha");
        controller.start(Some("1")).unwrap();
        for _ in 0..125 {
            controller.tick();
        }

        let accepted = controller.stop("1").unwrap();

        assert_eq!(accepted.entry.duration, "00:02:05");
        assert!(!accepted.entry.is_running);
        assert!(!accepted.entry.end_time.is_empty());
        assert_eq!(controller.running_entry(), None);
        assert_eq!(controller.selected_project(), None);
        assert_eq!(controller.display(), Elapsed::ZERO);
        assert!(!controller.is_ticking());
        assert_eq!(controller.tick(), None);

        let settled = settle(&mut controller, &accepted).await;

        assert_eq!(settled.status, SyncStatus::Saved);
        mock_datetime::clear_mock_time();
    }

    /// 停止中のtime entryの再開はレコードを作り直さず、開始時刻を更新することを確認する。
    #[tokio::test]
    async fn test_resume() {
        set_clock(13, 30, 0);
        let mut controller = controller(
            vec![entry("1", "Alpha", false), entry("2", "Beta", false)],
            |repository| {
                repository
                    .expect_update_time_entry()
                    .withf(|id, entry| {
                        id == "2" && entry.is_running && entry.start_time == "13:30:00"
                    })
                    .times(1)
                    .returning(|_, _| Err(anyhow!("service unavailable")));
                repository.expect_create_time_entry().times(0);
            },
        )
        .await;

        let accepted = controller.start(Some("2")).unwrap();
        let settled = settle(&mut controller, &accepted).await;

        assert_eq!(settled.status, SyncStatus::Failed);
        assert_eq!(controller.entries().len(), 2);
        assert_eq!(controller.running_entry().unwrap().id, "2");
        assert!(controller.is_ticking());
        mock_datetime::clear_mock_time();
    }

    /// 別のtime entryが計測中の場合は再開しないことを確認する。
    #[tokio::test]
    async fn test_resume_while_running() {
        let mut controller = controller(
            vec![entry("1", "Alpha", true), entry("2", "Beta", false)],
            |repository| {
                repository.expect_update_time_entry().times(0);
            },
        )
        .await;

        let result = controller.start(Some("2"));

        assert_eq!(
            result.unwrap_err(),
            Rejection::AlreadyRunning {
                running_id: "1".to_string()
            }
        );
        assert_eq!(controller.running_entry().unwrap().id, "1");
    }

    /// 計測中でないtime entryや存在しないidの停止は何もしないことを確認する。
    #[rstest]
    #[case::not_running("2", Rejection::NotRunning("2".to_string()))]
    #[case::unknown("9", Rejection::UnknownEntry("9".to_string()))]
    #[tokio::test]
    async fn test_stop_rejected(#[case] id: &str, #[case] expected: Rejection) {
        let mut controller = controller(
            vec![entry("1", "Alpha", true), entry("2", "Beta", false)],
            |repository| {
                repository.expect_update_time_entry().times(0);
            },
        )
        .await;
        controller.tick();

        let result = controller.stop(id);

        assert_eq!(result.unwrap_err(), expected);
        assert_eq!(controller.running_entry().unwrap().id, "1");
        assert_eq!(controller.display().to_string(), "00:00:01");
    }

    /// 編集はすぐにローカルへ反映し、APIへの反映に失敗しても戻さないことを確認する。
    #[rstest]
    #[case::saved(true, SyncStatus::Saved)]
    #[case::failed(false, SyncStatus::Failed)]
    #[tokio::test]
    async fn test_edit(#[case] succeeds: bool, #[case] expected_status: SyncStatus) {
        let mut controller = controller(vec![entry("1", "Alpha", false)], move |repository| {
            repository
                .expect_update_time_entry()
                .withf(|id, entry| id == "1" && entry.project_name == "Beta")
                .times(1)
                .returning(move |_, entry| {
                    if succeeds {
                        Ok(entry.clone())
                    } else {
                        Err(anyhow!("timeout"))
                    }
                });
        })
        .await;
        let patch = EntryPatch {
            project_name: Some("Beta".to_string()),
            start_time: Some("08:00:00".to_string()),
            end_time: None,
        };

        let accepted = controller.edit("1", &patch).unwrap();
        let settled = settle(&mut controller, &accepted).await;

        assert_eq!(settled.status, expected_status);
        let stored = &controller.entries()[0];
        assert_eq!(stored.project_name, "Beta");
        assert_eq!(stored.start_time, "08:00:00");
        assert_eq!(stored.duration, "01:00:00");
        assert_eq!(stored.end_time, "10:00:00");
    }

    #[tokio::test]
    async fn test_edit_unknown() {
        let mut controller = controller(vec![], |repository| {
            repository.expect_update_time_entry().times(0);
        })
        .await;

        let result = controller.edit("1", &EntryPatch::default());

        assert_eq!(result.unwrap_err(), Rejection::UnknownEntry("1".to_string()));
    }

    /// 計測中のtime entryは削除が反映された時点で取り除き、表示用のタイマーも止めることを確認する。
    #[tokio::test]
    async fn test_remove_running() {
        let mut controller = controller(
            vec![entry("1", "Alpha", false), entry("2", "Beta", true)],
            |repository| {
                repository
                    .expect_delete_time_entry()
                    .withf(|id| id == "2")
                    .times(1)
                    .returning(|_| Ok(()));
            },
        )
        .await;
        controller.tick();

        let accepted = controller.remove("2").unwrap();

        assert_eq!(accepted.request.as_ref().unwrap().kind, SyncKind::Delete);
        assert_eq!(controller.entries().len(), 2);

        let settled = settle(&mut controller, &accepted).await;

        assert_eq!(settled.status, SyncStatus::Saved);
        assert_eq!(controller.entries(), &[entry("1", "Alpha", false)]);
        assert!(!controller.is_ticking());
        assert_eq!(controller.display(), Elapsed::ZERO);
    }

    /// 削除に失敗した場合はローカルにも残すことを確認する。
    #[tokio::test]
    async fn test_remove_failed() {
        let mut controller = controller(vec![entry("1", "Alpha", false)], |repository| {
            repository
                .expect_delete_time_entry()
                .times(1)
                .returning(|_| Err(anyhow!("internal server error")));
        })
        .await;

        let accepted = controller.remove("1").unwrap();
        let settled = settle(&mut controller, &accepted).await;

        assert_eq!(settled.status, SyncStatus::Failed);
        assert_eq!(controller.entries().len(), 1);
    }

    /// 回数の加算はローカルのみで、APIを呼び出さないことを確認する。
    #[tokio::test]
    async fn test_increment_count_is_local() {
        let mut controller = controller(vec![entry("1", "Alpha", false)], |repository| {
            repository.expect_create_time_entry().times(0);
            repository.expect_update_time_entry().times(0);
            repository.expect_delete_time_entry().times(0);
        })
        .await;

        controller.increment_count("1").unwrap();
        let accepted = controller.increment_count("1").unwrap();

        assert_eq!(accepted.request, None);
        assert_eq!(accepted.entry.count, 2);
        assert_eq!(controller.entries()[0].count, 2);
    }

    /// 読み込みに失敗した場合は空のまま続けることを確認する。
    #[tokio::test]
    async fn test_load_failed() {
        let mut repository = MockTimeEntryRepository::new();
        repository
            .expect_list_time_entries()
            .times(1)
            .returning(|| Err(anyhow!("dns error")));
        let mut controller = TimerController::new(repository);

        let loaded = controller.load().await;

        assert_eq!(loaded, 0);
        assert!(controller.entries().is_empty());
        assert!(!controller.is_ticking());
    }

    /// 開始・停止・再開を繰り返しても、計測中は常に高々1件であることを確認する。
    #[tokio::test]
    async fn test_single_running_through_lifecycle() {
        let mut controller = controller(vec![entry("1", "Alpha", false)], |repository| {
            repository.expect_create_time_entry().returning(|entry| {
                Ok(TimeEntry {
                    id: format!("srv-{}", entry.project_name),
                    ..entry.clone()
                })
            });
            repository
                .expect_update_time_entry()
                .returning(|_, entry| Ok(entry.clone()));
        })
        .await;

        controller.select_project("Beta");
        let started = controller.start(None).unwrap();
        settle(&mut controller, &started).await;
        assert!(controller.start(Some("1")).is_err());
        assert!(controller.start(None).is_err());
        controller.stop("srv-Beta").unwrap();
        controller.start(Some("1")).unwrap();
        controller.select_project("Gamma");
        assert!(controller.start(None).is_err());
        controller.stop("1").unwrap();
        controller.select_project("Gamma");
        let started = controller.start(None).unwrap();
        settle(&mut controller, &started).await;

        let running: Vec<&str> = controller
            .entries()
            .iter()
            .filter(|e| e.is_running)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(running, vec!["srv-Gamma"]);
        assert_eq!(controller.entries().len(), 3);
    }
}
