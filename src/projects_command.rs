use anyhow::{Context, Result};
use log::info;

use crate::catalog::{summarize_projects, ProjectSummary};
use crate::trackify::CatalogRepository;

/// projectの一覧を出力するためのサブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct ProjectsArgs {
    #[clap(
        short = 's',
        long = "search",
        help = "Filters projects by a case-insensitive substring of the name"
    )]
    pub search: Option<String>,
}

pub struct ProjectsCommand<'a, T: CatalogRepository> {
    catalog: &'a T,
}

impl<'a, T: CatalogRepository> ProjectsCommand<'a, T> {
    pub fn new(catalog: &'a T) -> Self {
        Self { catalog }
    }

    /// `projects`サブコマンドの処理を行う。
    ///
    /// projectごとのtask数は全taskを取得して数える。
    pub async fn run(&self, args: ProjectsArgs) -> Result<Vec<ProjectSummary>> {
        let projects = self
            .catalog
            .list_projects()
            .await
            .context("Failed to retrieve projects")?;
        let tasks = self
            .catalog
            .list_tasks()
            .await
            .context("Failed to retrieve tasks")?;
        info!("{} projects and {} tasks retrieved.", projects.len(), tasks.len());

        Ok(summarize_projects(
            &projects,
            &tasks,
            args.search.as_deref().unwrap_or_default(),
        ))
    }
}
