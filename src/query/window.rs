use chrono::NaiveDateTime;

/// Dashboard time window selected by the `period` query parameter.
///
/// Bounded windows filter the event log by timestamp; `AllTime` reads the
/// per-URL rollup instead, which has no time dimension and is already
/// all-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Day,
    Week,
    Month,
    Quarter,
    AllTime,
}

impl Window {
    /// Parse a `period` parameter. Unknown values are a caller error.
    pub fn parse(period: &str) -> Option<Self> {
        match period {
            "1d" => Some(Self::Day),
            "7d" => Some(Self::Week),
            "30d" => Some(Self::Month),
            "90d" => Some(Self::Quarter),
            "all_time" => Some(Self::AllTime),
            _ => None,
        }
    }

    pub const fn is_all_time(self) -> bool {
        matches!(self, Self::AllTime)
    }

    /// Inclusive lower bound of the window. The all-time cutoff is the epoch,
    /// which predates every stored event.
    pub fn cutoff_from(self, now: NaiveDateTime) -> NaiveDateTime {
        let days = match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::AllTime => return chrono::DateTime::<chrono::Utc>::UNIX_EPOCH.naive_utc(),
        };
        now - chrono::Duration::days(days)
    }
}

/// Render a timestamp the way the store binds and compares them.
pub fn format_ts(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}
