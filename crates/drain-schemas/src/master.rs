use chrono::{DateTime, Utc};

/// Lifecycle state of a [`MasterRecord`].
///
/// `Completed`/`Failed` are sticky from the core's point of view: nothing in
/// this crate ever transitions a row back out of them. Operators may reset a
/// row externally; that is outside the claim protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl MasterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MasterStatus::Pending => "PENDING",
            MasterStatus::Processing => "PROCESSING",
            MasterStatus::Completed => "COMPLETED",
            MasterStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(MasterStatus::Pending),
            "PROCESSING" => Some(MasterStatus::Processing),
            "COMPLETED" => Some(MasterStatus::Completed),
            "FAILED" => Some(MasterStatus::Failed),
            _ => None,
        }
    }
}

/// A unit of work: one row produces at most one output file.
#[derive(Debug, Clone)]
pub struct MasterRecord {
    pub master_id: i64,
    pub business_center_code: String,
    pub priority: i32,
    pub status: MasterStatus,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Process-stable, cluster-unique identity a worker stamps into `locked_by`.
///
/// Formed once at startup from host name, pid, start time, and a random
/// suffix, then reused for every claim/finalize call the process makes for
/// its lifetime — this is what lets a restarted worker recognize (and safely
/// no-op against) its own stale locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate a fresh identity: `<host>-<pid>-<start_ts_ms>-<random-suffix>`.
    pub fn generate() -> Self {
        let host = hostname_or_unknown();
        let pid = std::process::id();
        let start_ts = Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let suffix = &suffix[..8];
        Self(format!("{host}-{pid}-{start_ts}-{suffix}"))
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hostname_or_unknown() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}
