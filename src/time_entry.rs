use serde::{Deserialize, Serialize};

/// 1回の作業セッションを表すtime entry。
///
/// Trackify APIとはcamelCaseのJSONでやり取りする。
/// APIのレスポンスに含まれない項目は既定値で補う。
/// `id`が空の場合はサーバーに送らず、サーバー側で払い出させる。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub count: u32,
}

/// 編集フォームから受け取る変更内容。
///
/// `None`の項目は変更しない。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub project_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl EntryPatch {
    /// 変更内容を適用した新しい`TimeEntry`を返す。
    ///
    /// `duration`は編集された時刻から再計算しない。
    pub fn apply_to(&self, entry: &TimeEntry) -> TimeEntry {
        let mut updated = entry.clone();
        if let Some(project_name) = &self.project_name {
            updated.project_name = project_name.clone();
        }
        if let Some(start_time) = &self.start_time {
            updated.start_time = start_time.clone();
        }
        if let Some(end_time) = &self.end_time {
            updated.end_time = end_time.clone();
        }
        updated
    }

    pub fn is_empty(&self) -> bool {
        self.project_name.is_none() && self.start_time.is_none() && self.end_time.is_none()
    }
}
