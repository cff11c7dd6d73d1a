//! Domain types for the update catalog.
//!
//! A [`Record`] is one versioned update entry. Records from both sources
//! (application packages and device images) share the same shape and are
//! stored as JSON in the `updates` table.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now_secs() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ── Key ───────────────────────────────────────────────────────────

/// Identity of a record: `(identifier, revision)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub identifier: String,
    pub revision: u32,
}

impl RecordKey {
    pub fn new(identifier: impl Into<String>, revision: u32) -> Self {
        Self {
            identifier: identifier.into(),
            revision,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identifier, self.revision)
    }
}

// ── Kind ──────────────────────────────────────────────────────────

/// Source an update originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    #[default]
    Unknown,
    /// Sandboxed application package.
    AppPackage,
    /// Whole-device image update.
    Image,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Unknown, Kind::AppPackage, Kind::Image];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Unknown => "unknown",
            Kind::AppPackage => "app_package",
            Kind::Image => "image",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CatalogError::InvalidRecord(format!("unknown kind: {s}")))
    }
}

// ── State ─────────────────────────────────────────────────────────

/// Lifecycle state of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Unknown,
    Available,
    Unavailable,
    QueuedForDownload,
    Downloading,
    DownloadingAutomatically,
    DownloadPaused,
    AutomaticDownloadPaused,
    Installing,
    InstallingAutomatically,
    InstallPaused,
    InstallFinished,
    Installed,
    Downloaded,
    Failed,
}

impl State {
    pub const ALL: [State; 15] = [
        State::Unknown,
        State::Available,
        State::Unavailable,
        State::QueuedForDownload,
        State::Downloading,
        State::DownloadingAutomatically,
        State::DownloadPaused,
        State::AutomaticDownloadPaused,
        State::Installing,
        State::InstallingAutomatically,
        State::InstallPaused,
        State::InstallFinished,
        State::Installed,
        State::Downloaded,
        State::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Unknown => "unknown",
            State::Available => "available",
            State::Unavailable => "unavailable",
            State::QueuedForDownload => "queued_for_download",
            State::Downloading => "downloading",
            State::DownloadingAutomatically => "downloading_automatically",
            State::DownloadPaused => "download_paused",
            State::AutomaticDownloadPaused => "automatic_download_paused",
            State::Installing => "installing",
            State::InstallingAutomatically => "installing_automatically",
            State::InstallPaused => "install_paused",
            State::InstallFinished => "install_finished",
            State::Installed => "installed",
            State::Downloaded => "downloaded",
            State::Failed => "failed",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for State {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| CatalogError::InvalidRecord(format!("unknown state: {s}")))
    }
}

// ── Record ────────────────────────────────────────────────────────

/// One row of the catalog.
///
/// Upserts always replace the whole value; `PartialEq` compares every
/// field and is what change detection runs on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub identifier: String,
    pub revision: u32,
    pub kind: Kind,
    pub state: State,
    pub title: String,
    pub changelog: String,
    /// Channel the update was published on.
    pub channel: String,
    pub download_hash: String,
    pub download_url: String,
    pub icon_url: String,
    pub remote_version: String,
    pub local_version: String,
    /// Download authorization token.
    pub token: String,
    /// Install command line, in order.
    pub command: Vec<String>,
    pub error: String,
    /// Size of the download in bytes.
    pub binary_filesize: u64,
    /// Download/install progress, 0–100.
    pub progress: u8,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub installed: bool,
    /// Downloaded or installed without user interaction.
    pub automatic: bool,
}

impl Record {
    /// A bare record with the given key and every other field defaulted.
    pub fn new(identifier: impl Into<String>, revision: u32) -> Self {
        Self {
            identifier: identifier.into(),
            revision,
            ..Default::default()
        }
    }

    /// Build a device image update. Image updates use the device channel
    /// as their identifier and the image version as their revision.
    pub fn image_update(
        channel: impl Into<String>,
        revision: u32,
        binary_filesize: u64,
        automatic: bool,
    ) -> Self {
        let channel = channel.into();
        Self {
            identifier: channel.clone(),
            revision,
            kind: Kind::Image,
            state: State::Available,
            channel,
            binary_filesize,
            automatic,
            ..Default::default()
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.identifier.clone(), self.revision)
    }

    /// Whether this record counts as installed for filtering purposes.
    pub fn is_installed(&self) -> bool {
        self.installed || self.state == State::Installed
    }

    /// Whether the remote version is newer than what is installed locally.
    ///
    /// Versions are compared as semver with missing components padded
    /// (`"0.2"` reads as `0.2.0`). When either side is not a version the
    /// strings are only checked for inequality.
    pub fn is_update_required(&self) -> bool {
        if self.remote_version.is_empty() {
            return false;
        }
        match (
            parse_version(&self.remote_version),
            parse_version(&self.local_version),
        ) {
            (Some(remote), Some(local)) => remote > local,
            _ => self.remote_version != self.local_version,
        }
    }
}

fn parse_version(raw: &str) -> Option<semver::Version> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('v').unwrap_or(raw);
    if let Ok(version) = semver::Version::parse(raw) {
        return Some(version);
    }
    let parts: Vec<&str> = raw.split('.').collect();
    let padded = match parts.len() {
        1 => format!("{raw}.0.0"),
        2 => format!("{raw}.0"),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}
