use serde::Deserialize;

/// Trackify APIのproject。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Trackify APIのtask。projectごとの件数を数えるためだけに利用する。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub title: String,
}

/// 選択画面に表示するprojectとtask数。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectSummary {
    pub project: Project,
    pub task_count: usize,
}

/// projectを名前で絞り込み、projectごとのtask数を付けて返す。
///
/// 絞り込みは大文字小文字を区別しない部分一致で行い、並び順は入力のまま。
///
/// # Arguments
///
/// * `projects` - 全project
/// * `tasks` - 全task
/// * `term` - 検索語。空文字の場合は全projectを返す
pub fn summarize_projects(projects: &[Project], tasks: &[Task], term: &str) -> Vec<ProjectSummary> {
    let term = term.to_lowercase();
    projects
        .iter()
        .filter(|project| project.name.to_lowercase().contains(&term))
        .map(|project| ProjectSummary {
            project: project.clone(),
            task_count: tasks
                .iter()
                .filter(|task| task.project_id == project.id)
                .count(),
        })
        .collect()
}

/// 番号(1始まり)または完全一致する名前からprojectを選ぶ。
pub fn find_project<'a>(summaries: &'a [ProjectSummary], key: &str) -> Option<&'a Project> {
    if let Ok(index) = key.parse::<usize>() {
        if let Some(summary) = index.checked_sub(1).and_then(|i| summaries.get(i)) {
            return Some(&summary.project);
        }
    }
    summaries
        .iter()
        .map(|summary| &summary.project)
        .find(|project| project.name == key)
}
