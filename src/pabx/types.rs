//! PABX Wire Types
//!
//! JSON payloads exchanged with the management API. Field names follow
//! the server's PascalCase convention.

use serde::{Deserialize, Serialize};

/// Body posted to the login endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest<'a> {
    pub re_captcha_response: Option<&'a str>,
    pub security_code: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

/// Login endpoint response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoginResponse {
    pub status: Option<String>,
    pub token: Option<TokenBody>,
}

/// Token object nested in the login response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenBody {
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Refresh-token grant response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefreshedToken {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    /// Servers may omit rotation
    pub refresh_token: Option<String>,
}

/// Call state as reported by the PABX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CallStatus {
    Routing,
    Talking,
    Rerouting,
    Initiating,
    Transferring,
    #[serde(other)]
    Unknown,
}

/// One entry of the active-calls list
///
/// A `null` caller or callee decodes as an empty string, which the
/// classifier then rejects for that record alone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", from = "RawCallRecord")]
pub struct ActiveCallRecord {
    pub id: i64,
    pub caller: String,
    pub callee: String,
    pub status: CallStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCallRecord {
    id: i64,
    #[serde(default)]
    caller: Option<String>,
    #[serde(default)]
    callee: Option<String>,
    status: CallStatus,
}

impl From<RawCallRecord> for ActiveCallRecord {
    fn from(raw: RawCallRecord) -> Self {
        Self {
            id: raw.id,
            caller: raw.caller.unwrap_or_default(),
            callee: raw.callee.unwrap_or_default(),
            status: raw.status,
        }
    }
}

/// An active-calls entry that could not be decoded
#[derive(Debug, Clone)]
pub struct MalformedRecord {
    pub raw: serde_json::Value,
    pub error: String,
}

/// One page of the active-calls endpoint
///
/// Entries are kept as raw JSON so one bad entry cannot fail the page;
/// [`records`](Self::records) decodes them one by one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveCallsPage {
    /// Server-side total, independent of the page size
    #[serde(rename = "@odata.count", default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
}

impl ActiveCallsPage {
    /// Concurrent call total, falling back to the page length when the
    /// server omitted the count
    pub fn total(&self) -> u64 {
        self.count.unwrap_or(self.value.len() as u64)
    }

    /// Decode every entry, setting aside the ones that do not fit
    pub fn records(&self) -> (Vec<ActiveCallRecord>, Vec<MalformedRecord>) {
        let mut records = Vec::with_capacity(self.value.len());
        let mut malformed = Vec::new();

        for raw in &self.value {
            match ActiveCallRecord::deserialize(raw) {
                Ok(record) => records.push(record),
                Err(e) => malformed.push(MalformedRecord {
                    raw: raw.clone(),
                    error: e.to_string(),
                }),
            }
        }

        (records, malformed)
    }
}

/// System status snapshot
///
/// Absent or `null` fields read as zero/empty so one missing value never
/// hides the others.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawSystemSnapshot")]
pub struct SystemSnapshot {
    pub fqdn: String,
    pub version: String,
    pub os: String,
    pub ip: String,
    pub max_sim_calls: f64,
    pub calls_active: f64,
    pub extensions_registered: f64,
    pub extensions_total: f64,
    pub trunks_registered: f64,
    pub trunks_total: f64,
    /// Percentage
    pub disk_usage: f64,
    pub free_disk_space: f64,
    pub total_disk_space: f64,
    pub recording_used_space: f64,
    pub recording_quota: f64,
    pub chat_used_space: f64,
    pub log_used_space: f64,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RawSystemSnapshot {
    #[serde(rename = "FQDN")]
    fqdn: Option<String>,
    version: Option<String>,
    #[serde(rename = "OS")]
    os: Option<String>,
    ip: Option<String>,
    max_sim_calls: Option<f64>,
    calls_active: Option<f64>,
    extensions_registered: Option<f64>,
    extensions_total: Option<f64>,
    trunks_registered: Option<f64>,
    trunks_total: Option<f64>,
    disk_usage: Option<f64>,
    free_disk_space: Option<f64>,
    total_disk_space: Option<f64>,
    recording_used_space: Option<f64>,
    recording_quota: Option<f64>,
    chat_used_space: Option<f64>,
    log_used_space: Option<f64>,
}

impl From<RawSystemSnapshot> for SystemSnapshot {
    fn from(raw: RawSystemSnapshot) -> Self {
        Self {
            fqdn: raw.fqdn.unwrap_or_default(),
            version: raw.version.unwrap_or_default(),
            os: raw.os.unwrap_or_default(),
            ip: raw.ip.unwrap_or_default(),
            max_sim_calls: raw.max_sim_calls.unwrap_or_default(),
            calls_active: raw.calls_active.unwrap_or_default(),
            extensions_registered: raw.extensions_registered.unwrap_or_default(),
            extensions_total: raw.extensions_total.unwrap_or_default(),
            trunks_registered: raw.trunks_registered.unwrap_or_default(),
            trunks_total: raw.trunks_total.unwrap_or_default(),
            disk_usage: raw.disk_usage.unwrap_or_default(),
            free_disk_space: raw.free_disk_space.unwrap_or_default(),
            total_disk_space: raw.total_disk_space.unwrap_or_default(),
            recording_used_space: raw.recording_used_space.unwrap_or_default(),
            recording_quota: raw.recording_quota.unwrap_or_default(),
            chat_used_space: raw.chat_used_space.unwrap_or_default(),
            log_used_space: raw.log_used_space.unwrap_or_default(),
        }
    }
}

impl SystemSnapshot {
    /// Recording space used as a percentage of the quota; 0 when no quota is set
    pub fn recording_usage_percent(&self) -> f64 {
        if self.recording_quota > 0.0 {
            self.recording_used_space / self.recording_quota * 100.0
        } else {
            0.0
        }
    }
}
