//! Process-wide feature flags of the embedded browser platform.
//!
//! Before any document is rendered the host switches off every entry of the
//! platform's feature list (MIME sniffing, zone elevation, protocol handlers
//! and so on). The change is one-way: nothing here turns a feature back on,
//! and it is meant to run once, early, before other threads exist.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One entry of the platform feature list, in platform index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum FeatureEntry {
    ObjectCaching = 0,
    ZoneElevation = 1,
    MimeHandling = 2,
    MimeSniffing = 3,
    WindowRestrictions = 4,
    WebOcPopupManagement = 5,
    Behaviors = 6,
    DisableMkProtocol = 7,
    LocalMachineLockdown = 8,
    SecurityBand = 9,
    RestrictActiveXInstall = 10,
    ValidateNavigateUrl = 11,
    RestrictFileDownload = 12,
    AddonManagement = 13,
    ProtocolLockdown = 14,
    HttpUsernamePasswordDisable = 15,
    SafeBindToObject = 16,
    UncSavedFileCheck = 17,
    GetUrlDomFilePathUnencoded = 18,
    TabbedBrowsing = 19,
    SslUx = 20,
    DisableNavigationSounds = 21,
    DisableLegacyCompression = 22,
    ForceAddrAndStatus = 23,
    XmlHttp = 24,
    DisableTelnetProtocol = 25,
    Feeds = 26,
    BlockInputPrompts = 27,
}

impl FeatureEntry {
    /// Number of entries the platform defines
    pub const COUNT: usize = 28;

    /// Every entry, ascending by index
    pub const ALL: [FeatureEntry; Self::COUNT] = [
        FeatureEntry::ObjectCaching,
        FeatureEntry::ZoneElevation,
        FeatureEntry::MimeHandling,
        FeatureEntry::MimeSniffing,
        FeatureEntry::WindowRestrictions,
        FeatureEntry::WebOcPopupManagement,
        FeatureEntry::Behaviors,
        FeatureEntry::DisableMkProtocol,
        FeatureEntry::LocalMachineLockdown,
        FeatureEntry::SecurityBand,
        FeatureEntry::RestrictActiveXInstall,
        FeatureEntry::ValidateNavigateUrl,
        FeatureEntry::RestrictFileDownload,
        FeatureEntry::AddonManagement,
        FeatureEntry::ProtocolLockdown,
        FeatureEntry::HttpUsernamePasswordDisable,
        FeatureEntry::SafeBindToObject,
        FeatureEntry::UncSavedFileCheck,
        FeatureEntry::GetUrlDomFilePathUnencoded,
        FeatureEntry::TabbedBrowsing,
        FeatureEntry::SslUx,
        FeatureEntry::DisableNavigationSounds,
        FeatureEntry::DisableLegacyCompression,
        FeatureEntry::ForceAddrAndStatus,
        FeatureEntry::XmlHttp,
        FeatureEntry::DisableTelnetProtocol,
        FeatureEntry::Feeds,
        FeatureEntry::BlockInputPrompts,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Platform constant name, e.g. `FEATURE_MIME_SNIFFING`
    pub fn platform_name(self) -> &'static str {
        match self {
            FeatureEntry::ObjectCaching => "FEATURE_OBJECT_CACHING",
            FeatureEntry::ZoneElevation => "FEATURE_ZONE_ELEVATION",
            FeatureEntry::MimeHandling => "FEATURE_MIME_HANDLING",
            FeatureEntry::MimeSniffing => "FEATURE_MIME_SNIFFING",
            FeatureEntry::WindowRestrictions => "FEATURE_WINDOW_RESTRICTIONS",
            FeatureEntry::WebOcPopupManagement => "FEATURE_WEBOC_POPUPMANAGEMENT",
            FeatureEntry::Behaviors => "FEATURE_BEHAVIORS",
            FeatureEntry::DisableMkProtocol => "FEATURE_DISABLE_MK_PROTOCOL",
            FeatureEntry::LocalMachineLockdown => "FEATURE_LOCALMACHINE_LOCKDOWN",
            FeatureEntry::SecurityBand => "FEATURE_SECURITYBAND",
            FeatureEntry::RestrictActiveXInstall => "FEATURE_RESTRICT_ACTIVEXINSTALL",
            FeatureEntry::ValidateNavigateUrl => "FEATURE_VALIDATE_NAVIGATE_URL",
            FeatureEntry::RestrictFileDownload => "FEATURE_RESTRICT_FILEDOWNLOAD",
            FeatureEntry::AddonManagement => "FEATURE_ADDON_MANAGEMENT",
            FeatureEntry::ProtocolLockdown => "FEATURE_PROTOCOL_LOCKDOWN",
            FeatureEntry::HttpUsernamePasswordDisable => "FEATURE_HTTP_USERNAME_PASSWORD_DISABLE",
            FeatureEntry::SafeBindToObject => "FEATURE_SAFE_BINDTOOBJECT",
            FeatureEntry::UncSavedFileCheck => "FEATURE_UNC_SAVEDFILECHECK",
            FeatureEntry::GetUrlDomFilePathUnencoded => "FEATURE_GET_URL_DOM_FILEPATH_UNENCODED",
            FeatureEntry::TabbedBrowsing => "FEATURE_TABBED_BROWSING",
            FeatureEntry::SslUx => "FEATURE_SSLUX",
            FeatureEntry::DisableNavigationSounds => "FEATURE_DISABLE_NAVIGATION_SOUNDS",
            FeatureEntry::DisableLegacyCompression => "FEATURE_DISABLE_LEGACY_COMPRESSION",
            FeatureEntry::ForceAddrAndStatus => "FEATURE_FORCE_ADDR_AND_STATUS",
            FeatureEntry::XmlHttp => "FEATURE_XMLHTTP",
            FeatureEntry::DisableTelnetProtocol => "FEATURE_DISABLE_TELNET_PROTOCOL",
            FeatureEntry::Feeds => "FEATURE_FEEDS",
            FeatureEntry::BlockInputPrompts => "FEATURE_BLOCK_INPUT_PROMPTS",
        }
    }
}

/// Where a feature change applies. Values match the platform's
/// `SET_FEATURE_*` / `GET_FEATURE_*` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureScope {
    Thread,
    Process,
    Registry,
    ThreadLocalMachine,
    ThreadIntranet,
    ThreadTrusted,
    ThreadInternet,
    ThreadRestricted,
}

impl FeatureScope {
    pub fn bits(self) -> u32 {
        match self {
            FeatureScope::Thread => 0x0000_0001,
            FeatureScope::Process => 0x0000_0002,
            FeatureScope::Registry => 0x0000_0004,
            FeatureScope::ThreadLocalMachine => 0x0000_0008,
            FeatureScope::ThreadIntranet => 0x0000_0010,
            FeatureScope::ThreadTrusted => 0x0000_0020,
            FeatureScope::ThreadInternet => 0x0000_0040,
            FeatureScope::ThreadRestricted => 0x0000_0080,
        }
    }
}

impl fmt::Display for FeatureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeatureScope::Thread => "thread",
            FeatureScope::Process => "process",
            FeatureScope::Registry => "registry",
            FeatureScope::ThreadLocalMachine => "thread_local_machine",
            FeatureScope::ThreadIntranet => "thread_intranet",
            FeatureScope::ThreadTrusted => "thread_trusted",
            FeatureScope::ThreadInternet => "thread_internet",
            FeatureScope::ThreadRestricted => "thread_restricted",
        };
        f.write_str(s)
    }
}

impl FromStr for FeatureScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "thread" => Ok(FeatureScope::Thread),
            "process" => Ok(FeatureScope::Process),
            "registry" => Ok(FeatureScope::Registry),
            "thread_local_machine" => Ok(FeatureScope::ThreadLocalMachine),
            "thread_intranet" => Ok(FeatureScope::ThreadIntranet),
            "thread_trusted" => Ok(FeatureScope::ThreadTrusted),
            "thread_internet" => Ok(FeatureScope::ThreadInternet),
            "thread_restricted" => Ok(FeatureScope::ThreadRestricted),
            other => Err(Error::ConfigError(format!("unknown feature scope '{}'", other))),
        }
    }
}

/// Status word returned by the platform (HRESULT-style: negative is failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformStatus(pub i32);

impl PlatformStatus {
    pub const OK: PlatformStatus = PlatformStatus(0);
    pub const FALSE: PlatformStatus = PlatformStatus(1);

    pub fn is_success(self) -> bool {
        self.0 >= 0
    }
}

/// Binding to the platform's feature table.
pub trait FeatureControl {
    /// Switch one entry on or off at `scope`
    fn set_feature_enabled(&mut self, entry: FeatureEntry, scope: FeatureScope, enabled: bool) -> PlatformStatus;

    /// `OK` when the entry is enabled at `scope`, `FALSE` when disabled,
    /// a negative status on failure
    fn is_feature_enabled(&self, entry: FeatureEntry, scope: FeatureScope) -> PlatformStatus;
}

/// Disable every feature entry at `scope`, in index order.
///
/// Stops at the first entry the platform refuses; entries before it stay
/// disabled. There is no way to undo this for the lifetime of the process.
pub fn disable_all<C: FeatureControl + ?Sized>(control: &mut C, scope: FeatureScope) -> Result<()> {
    for entry in FeatureEntry::ALL {
        let status = control.set_feature_enabled(entry, scope, false);
        if !status.is_success() {
            log::error!(
                "{} could not be disabled at {} scope (status {:#010x})",
                entry.platform_name(),
                scope,
                status.0
            );
            return Err(Error::PlatformFeatureError { entry, code: status.0 });
        }
        log::trace!("disabled {} at {} scope", entry.platform_name(), scope);
    }
    log::debug!("disabled {} platform features at {} scope", FeatureEntry::COUNT, scope);
    Ok(())
}

pub fn disable_all_on_process<C: FeatureControl + ?Sized>(control: &mut C) -> Result<()> {
    disable_all(control, FeatureScope::Process)
}

pub fn disable_all_on_thread<C: FeatureControl + ?Sized>(control: &mut C) -> Result<()> {
    disable_all(control, FeatureScope::Thread)
}

/// Query one entry; `Ok(true)` when enabled.
pub fn is_enabled<C: FeatureControl + ?Sized>(control: &C, entry: FeatureEntry, scope: FeatureScope) -> Result<bool> {
    let status = control.is_feature_enabled(entry, scope);
    if !status.is_success() {
        return Err(Error::PlatformFeatureError { entry, code: status.0 });
    }
    Ok(status == PlatformStatus::OK)
}

/// In-process feature table used where the platform has none (and in tests).
///
/// Every entry starts out enabled, as on a fresh platform.
#[derive(Debug, Default, Clone)]
pub struct FeatureTable {
    state: HashMap<(FeatureEntry, FeatureScope), bool>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently disabled at `scope`, ascending
    pub fn disabled(&self, scope: FeatureScope) -> Vec<FeatureEntry> {
        FeatureEntry::ALL
            .into_iter()
            .filter(|e| self.state.get(&(*e, scope)) == Some(&false))
            .collect()
    }
}

impl FeatureControl for FeatureTable {
    fn set_feature_enabled(&mut self, entry: FeatureEntry, scope: FeatureScope, enabled: bool) -> PlatformStatus {
        self.state.insert((entry, scope), enabled);
        PlatformStatus::OK
    }

    fn is_feature_enabled(&self, entry: FeatureEntry, scope: FeatureScope) -> PlatformStatus {
        match self.state.get(&(entry, scope)) {
            Some(false) => PlatformStatus::FALSE,
            _ => PlatformStatus::OK,
        }
    }
}

#[cfg(windows)]
mod urlmon {
    #[link(name = "urlmon")]
    extern "system" {
        pub fn CoInternetSetFeatureEnabled(feature_entry: i32, flags: u32, enable: i32) -> i32;
        pub fn CoInternetIsFeatureEnabled(feature_entry: i32, flags: u32) -> i32;
    }
}

/// The real feature table of the Windows browser platform (`urlmon.dll`).
#[cfg(windows)]
#[derive(Debug, Default)]
pub struct UrlmonFeatures;

#[cfg(windows)]
impl FeatureControl for UrlmonFeatures {
    fn set_feature_enabled(&mut self, entry: FeatureEntry, scope: FeatureScope, enabled: bool) -> PlatformStatus {
        // SAFETY: plain value arguments; the entry index is within the platform's list.
        let hr = unsafe { urlmon::CoInternetSetFeatureEnabled(entry as i32, scope.bits(), enabled as i32) };
        PlatformStatus(hr)
    }

    fn is_feature_enabled(&self, entry: FeatureEntry, scope: FeatureScope) -> PlatformStatus {
        // SAFETY: as above.
        let hr = unsafe { urlmon::CoInternetIsFeatureEnabled(entry as i32, scope.bits()) };
        PlatformStatus(hr)
    }
}

/// The feature table for the current platform.
pub fn platform_features() -> Box<dyn FeatureControl> {
    #[cfg(windows)]
    {
        Box::new(UrlmonFeatures)
    }
    #[cfg(not(windows))]
    {
        log::debug!("no platform feature table on this OS; using an in-process table");
        Box::new(FeatureTable::new())
    }
}
