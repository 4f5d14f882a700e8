use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// `HH:MM:SS`形式で表す経過時間。
///
/// 時は24で折り返さず、上限なく増える。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Elapsed {
    hours: u64,
    minutes: u8,
    seconds: u8,
}

impl Elapsed {
    pub const ZERO: Elapsed = Elapsed {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// 秒数から`Elapsed`を作成する。
    pub fn from_secs(secs: u64) -> Self {
        Self {
            hours: secs / 3600,
            minutes: ((secs % 3600) / 60) as u8,
            seconds: (secs % 60) as u8,
        }
    }

    pub fn as_secs(&self) -> u64 {
        self.hours * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    /// 1秒進める。秒から分、分から時へ繰り上げる。
    pub fn tick(&mut self) {
        self.seconds += 1;
        if self.seconds == 60 {
            self.seconds = 0;
            self.minutes += 1;
        }
        if self.minutes == 60 {
            self.minutes = 0;
            self.hours += 1;
        }
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

impl FromStr for Elapsed {
    type Err = anyhow::Error;

    /// `H+:MM:SS`形式の文字列をパースする。
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            bail!("Duration must be in the format HH:MM:SS: {}", s);
        }
        let hours = parts[0]
            .parse::<u64>()
            .with_context(|| format!("Failed to parse hours: {}", s))?;
        let minutes = parts[1]
            .parse::<u8>()
            .with_context(|| format!("Failed to parse minutes: {}", s))?;
        let seconds = parts[2]
            .parse::<u8>()
            .with_context(|| format!("Failed to parse seconds: {}", s))?;
        if minutes >= 60 || seconds >= 60 {
            bail!("Minutes and seconds must be less than 60: {}", s);
        }

        Ok(Self {
            hours,
            minutes,
            seconds,
        })
    }
}

/// `00:00:01`から1秒ずつ進んだ経過時間を返し続けるイテレータ。
#[derive(Clone, Debug, Default)]
pub struct ElapsedTicks {
    current: Elapsed,
}

impl ElapsedTicks {
    /// 直近に返した値。
    pub fn current(&self) -> Elapsed {
        self.current
    }

    /// ゼロから数え直す。
    pub fn restart(&mut self) {
        self.current = Elapsed::ZERO;
    }
}

impl Iterator for ElapsedTicks {
    type Item = Elapsed;

    fn next(&mut self) -> Option<Self::Item> {
        self.current.tick();
        Some(self.current)
    }
}

/// 計測中のtime entryに表示するタイマー。
///
/// 開始時刻から計算するのではなく、1秒ごとのtickで`00:00:00`から数え上げる表示用の値。
/// 停止するたびにゼロへ戻すため、新しい計測は常にゼロから始まる。
#[derive(Clone, Debug, Default)]
pub struct DisplayTimer {
    ticks: ElapsedTicks,
    running: bool,
}

impl DisplayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// tickの受け付けを開始する。
    pub fn start(&mut self) {
        self.running = true;
    }

    /// 計測中であれば1秒進め、現在値を返す。停止中は何もしない。
    pub fn tick(&mut self) -> Option<Elapsed> {
        if !self.running {
            return None;
        }
        self.ticks.next()
    }

    /// 計測を止めて現在値を返し、表示をゼロに戻す。
    pub fn halt(&mut self) -> Elapsed {
        let frozen = self.ticks.current();
        self.running = false;
        self.ticks.restart();
        frozen
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn value(&self) -> Elapsed {
        self.ticks.current()
    }
}
