use chrono::{DateTime, Local, SecondsFormat, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// 現在時刻をLocalタイムゾーンの`HH:MM:SS`形式で返す。
///
/// time entryの`startTime`, `endTime`に記録する表示用の文字列。
pub fn time_of_day() -> String {
    format_time_of_day(&now())
}

/// 指定した時刻をLocalタイムゾーンの`HH:MM:SS`形式に変換する。
pub fn format_time_of_day(datetime: &DateTime<Utc>) -> String {
    datetime.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// サーバーがidを払い出すまでの仮idを現在時刻から作成する。
pub fn placeholder_id() -> String {
    now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
