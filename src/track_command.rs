use std::{io::Write, time::Duration};

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, MissedTickBehavior};

use crate::catalog::{find_project, summarize_projects, ProjectSummary};
use crate::console::{ConsoleMarkdownList, ConsolePresenter};
use crate::controller::{
    Accepted, SyncCompletion, SyncKind, SyncRequest, SyncStatus, TimerController,
};
use crate::store::Rejection;
use crate::time_entry::EntryPatch;
use crate::trackify::{CatalogRepository, TimeEntryRepository};

const HELP: &str = "\
Commands:
  projects [term]          list projects matching term with task counts
  select <number|name>     select the project for the next start
  start [id]               start a new timer, or resume the entry with id
  stop [id]                stop the running timer
  edit <id> [project=..] [start=..] [end=..]
                           edit a time entry
  delete <id>              delete a time entry
  count <id>               increment the counter of a time entry
  list                     list time entries
  status                   show the running timer
  help                     show this help
  quit                     exit";

/// 対話中に受け付けるコマンド。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Empty,
    Projects(String),
    Select(String),
    Start(Option<String>),
    Stop(Option<String>),
    Edit(String, EntryPatch),
    Delete(String),
    Count(String),
    List,
    Status,
    Help,
    Quit,
}

/// 1行の入力をコマンドに変換する。
///
/// 変換できない場合は利用者に表示するメッセージを返す。
pub fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let argument = || (!rest.is_empty()).then(|| rest.to_string());
    let required = |usage: &str| argument().ok_or_else(|| format!("Usage: {}", usage));

    match name {
        "" => Ok(Command::Empty),
        "projects" | "p" => Ok(Command::Projects(rest.to_string())),
        "select" => required("select <number|name>").map(Command::Select),
        "start" => Ok(Command::Start(argument())),
        "stop" => Ok(Command::Stop(argument())),
        "edit" => parse_edit(rest),
        "delete" | "rm" => required("delete <id>").map(Command::Delete),
        "count" => required("count <id>").map(Command::Count),
        "list" | "ls" => Ok(Command::List),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command: {}. Type `help` for commands.", other)),
    }
}

/// `edit <id> project=.. start=.. end=..`を変換する。
///
/// `=`を含まない語は直前の値に空白区切りで連結する。
fn parse_edit(rest: &str) -> std::result::Result<Command, String> {
    const USAGE: &str = "Usage: edit <id> [project=..] [start=..] [end=..]";
    let mut words = rest.split_whitespace();
    let id = words.next().ok_or_else(|| USAGE.to_string())?;

    let mut patch = EntryPatch::default();
    let mut last_key: Option<&str> = None;
    for word in words {
        let (key, value) = match word.split_once('=') {
            Some((key, value)) => (key, value.to_string()),
            None => {
                let key = last_key.ok_or_else(|| USAGE.to_string())?;
                let previous = patch_field(&mut patch, key)
                    .and_then(|slot| slot.take())
                    .unwrap_or_default();
                if previous.is_empty() {
                    (key, word.to_string())
                } else {
                    (key, format!("{} {}", previous, word))
                }
            }
        };
        let slot = patch_field(&mut patch, key)
            .ok_or_else(|| format!("Unknown field: {}. {}", key, USAGE))?;
        *slot = Some(value);
        last_key = Some(key);
    }
    if patch.is_empty() {
        return Err(USAGE.to_string());
    }

    Ok(Command::Edit(id.to_string(), patch))
}

fn patch_field<'p>(patch: &'p mut EntryPatch, key: &str) -> Option<&'p mut Option<String>> {
    match key {
        "project" => Some(&mut patch.project_name),
        "start" => Some(&mut patch.start_time),
        "end" => Some(&mut patch.end_time),
        _ => None,
    }
}

/// 対話的にtime entryを計測するためのサブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct TrackArgs {
    #[clap(
        short = 'p',
        long = "project",
        help = "Selects a project by name before the session starts"
    )]
    pub project: Option<String>,
}

/// `track`サブコマンド。
///
/// 標準入力のコマンド、1秒ごとのtick、APIへの反映の完了を1つのループで順に処理する。
/// APIへの反映は別のタスクで実行し、完了を待たずに次の入力とtickを受け付ける。
/// tickは計測中のみ受け付ける。
pub struct TrackCommand<'a, R: TimeEntryRepository, C: CatalogRepository, W: Write> {
    controller: TimerController<R>,
    catalog: &'a C,
    writer: &'a mut W,
    projects: Vec<ProjectSummary>,
    syncs: JoinSet<SyncCompletion>,
}

impl<'a, R, C, W> TrackCommand<'a, R, C, W>
where
    R: TimeEntryRepository + Send + Sync + 'static,
    C: CatalogRepository,
    W: Write,
{
    /// 新しい`TrackCommand`を返す。
    ///
    /// # Arguments
    /// * `controller` - time entryを操作するコントローラー
    /// * `catalog` - projectとtaskを参照するリポジトリ
    /// * `writer` - 結果の出力先
    pub fn new(controller: TimerController<R>, catalog: &'a C, writer: &'a mut W) -> Self {
        Self {
            controller,
            catalog,
            writer,
            projects: vec![],
            syncs: JoinSet::new(),
        }
    }

    /// time entryを読み込み、入力が終わるか`quit`が入力されるまでコマンドを処理する。
    ///
    /// 終了時はAPIへの反映が終わるまで待つ。
    pub async fn run<B>(&mut self, args: TrackArgs, input: B) -> Result<()>
    where
        B: AsyncBufRead + Unpin,
    {
        let loaded = self.controller.load().await;
        writeln!(
            self.writer,
            "Loaded {} time entries. Type `help` for commands.",
            loaded
        )?;
        if let Some(project) = args.project {
            self.controller.select_project(project);
        }

        let mut lines = input.lines();
        let mut ticker = time::interval(Duration::from_secs(1));
        // 入力の処理中に過ぎたtickも数える
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        ticker.reset();
        self.prompt()?;

        loop {
            let ticking = self.controller.is_ticking();
            tokio::select! {
                biased;

                Some(joined) = self.syncs.join_next(), if !self.syncs.is_empty() => {
                    if self.settle(joined)? {
                        self.prompt()?;
                    }
                }
                _ = ticker.tick(), if ticking => {
                    self.controller.tick();
                }
                line = lines.next_line() => {
                    let line = match line.context("Failed to read input")? {
                        Some(line) => line,
                        None => break,
                    };
                    let command = match parse_command(&line) {
                        Ok(command) => command,
                        Err(message) => {
                            writeln!(self.writer, "{}", message)?;
                            self.prompt()?;
                            continue;
                        }
                    };
                    if !self.handle(command).await? {
                        break;
                    }
                    // 計測が始まった時点から1秒ごとに数える
                    if !ticking && self.controller.is_ticking() {
                        ticker.reset();
                    }
                    self.prompt()?;
                }
            }
        }

        if !self.syncs.is_empty() {
            info!("Waiting for {} pending saves", self.syncs.len());
        }
        while let Some(joined) = self.syncs.join_next().await {
            self.settle(joined)?;
        }

        if let Some(running) = self.controller.running_entry() {
            info!("Exit while time entry {} is running", running.id);
            writeln!(
                self.writer,
                "Time entry {} ({}) is still running.",
                running.id, running.project_name
            )?;
        }
        Ok(())
    }

    fn prompt(&mut self) -> Result<()> {
        let label = match self.controller.running_entry() {
            Some(running) => format!("{} {}", running.project_name, self.controller.display()),
            None => self
                .controller
                .selected_project()
                .unwrap_or("no project")
                .to_string(),
        };
        write!(self.writer, "[{}]> ", label)?;
        self.writer.flush().context("Failed to flush output")
    }

    /// コマンドを1つ処理する。終了する場合は`false`を返す。
    pub async fn handle(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Empty => {}
            Command::Projects(term) => {
                if self.refresh_projects(&term).await? {
                    if self.projects.is_empty() {
                        writeln!(self.writer, "No projects found.")?;
                    }
                    ConsoleMarkdownList::new(&mut *self.writer).show_projects(&self.projects)?;
                }
            }
            Command::Select(key) => {
                if self.projects.is_empty() && !self.refresh_projects("").await? {
                    return Ok(true);
                }
                match find_project(&self.projects, &key) {
                    Some(project) => {
                        let name = project.name.clone();
                        self.controller.select_project(name.as_str());
                        writeln!(self.writer, "Selected project: {}", name)?;
                    }
                    None => writeln!(self.writer, "! No project matches {}", key)?,
                }
            }
            Command::Start(target) => {
                let result = self.controller.start(target.as_deref());
                self.accept("Started", result)?;
            }
            Command::Stop(target) => {
                let running_id = self.controller.running_entry().map(|e| e.id.clone());
                let id = match target.or(running_id) {
                    Some(id) => id,
                    None => {
                        writeln!(self.writer, "! No timer is running.")?;
                        return Ok(true);
                    }
                };
                let result = self.controller.stop(&id);
                self.accept("Stopped", result)?;
            }
            Command::Edit(id, patch) => {
                let result = self.controller.edit(&id, &patch);
                self.accept("Edited", result)?;
            }
            Command::Delete(id) => {
                let result = self.controller.remove(&id);
                self.accept("Deleting", result)?;
            }
            Command::Count(id) => {
                let result = self.controller.increment_count(&id);
                self.accept("Counted", result)?;
            }
            Command::List => {
                if self.controller.entries().is_empty() {
                    writeln!(self.writer, "No time entries.")?;
                }
                ConsoleMarkdownList::new(&mut *self.writer)
                    .show_time_entries(self.controller.entries())?;
            }
            Command::Status => match self.controller.running_entry() {
                Some(running) => writeln!(
                    self.writer,
                    "{} running since {} ({})",
                    running.project_name,
                    running.start_time,
                    self.controller.display()
                )?,
                None => writeln!(
                    self.writer,
                    "No timer is running. Selected project: {}",
                    self.controller.selected_project().unwrap_or("none")
                )?,
            },
            Command::Help => writeln!(self.writer, "{}", HELP)?,
            Command::Quit => return Ok(false),
        }

        Ok(true)
    }

    /// projectとtaskを取得し直す。取得できなかった場合は`false`を返す。
    async fn refresh_projects(&mut self, term: &str) -> Result<bool> {
        let projects = self.catalog.list_projects().await;
        let tasks = self.catalog.list_tasks().await;
        match (projects, tasks) {
            (Ok(projects), Ok(tasks)) => {
                self.projects = summarize_projects(&projects, &tasks, term);
                Ok(true)
            }
            (Err(err), _) | (_, Err(err)) => {
                warn!("Failed to load projects: {:?}", err);
                writeln!(self.writer, "! Failed to load projects.")?;
                Ok(false)
            }
        }
    }

    /// 受け付けた操作を表示し、APIへの反映を別のタスクで始める。
    fn accept(
        &mut self,
        action: &str,
        result: std::result::Result<Accepted, Rejection>,
    ) -> Result<()> {
        match result {
            Ok(accepted) => {
                let entry = &accepted.entry;
                writeln!(
                    self.writer,
                    "{} {} [{}] {}",
                    action, entry.project_name, entry.id, entry.duration
                )?;
                self.dispatch(accepted.request);
            }
            Err(rejection) => writeln!(self.writer, "! {}", rejection)?,
        }
        Ok(())
    }

    fn dispatch(&mut self, request: Option<SyncRequest>) {
        if let Some(request) = request {
            self.syncs.spawn(self.controller.persist(request));
        }
    }

    /// APIへの反映結果を適用する。何か表示した場合は`true`を返す。
    fn settle(&mut self, joined: std::result::Result<SyncCompletion, JoinError>) -> Result<bool> {
        let completion = match joined {
            Ok(completion) => completion,
            Err(err) => {
                error!("Sync task failed: {:?}", err);
                return Ok(false);
            }
        };
        let settled = self.controller.complete(completion);
        self.dispatch(settled.follow_up);

        let entry = &settled.entry;
        match (settled.kind, settled.status) {
            (SyncKind::Create, SyncStatus::Saved) => {
                writeln!(self.writer, "\nSaved {} as [{}]", entry.project_name, entry.id)?;
            }
            (SyncKind::Delete, SyncStatus::Saved) => {
                writeln!(self.writer, "\nDeleted {} [{}]", entry.project_name, entry.id)?;
            }
            (_, SyncStatus::Failed) => {
                writeln!(
                    self.writer,
                    "\n! {} [{}] was not saved to server.",
                    entry.project_name, entry.id
                )?;
            }
            (SyncKind::Update, SyncStatus::Saved) | (_, SyncStatus::Stale) => return Ok(false),
        }
        Ok(true)
    }
}
