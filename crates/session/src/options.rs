//! crates/session/src/options.rs
//!
//! `Options` is the single configuration object a replication session is
//! built from: explicit setter methods returning `Self`, validated in a
//! `build()` that returns `Result<Options, OptionsError>`. No global config
//! singleton — every task receives an `Arc<Options>` or borrows from one.

use std::path::PathBuf;

use thiserror::Error;
use zeroize::Zeroizing;

/// Source address: a host and port pair, resolved fresh on every connect
/// attempt (including the reconnect `prefer_replica` triggers).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceAddress {
    /// Hostname or literal IP address of the source.
    pub host: String,
    /// TCP port the source's replication listener is bound to.
    pub port: u16,
}

impl SourceAddress {
    /// Builds a source address from a host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Optional `AUTH` credentials sent during the handshake.
///
/// The password is wrapped in [`Zeroizing`] so it is scrubbed from memory
/// as soon as the credentials are dropped.
#[derive(Clone, Debug)]
pub struct AuthCredentials {
    /// Optional ACL username; omitted for legacy single-password `AUTH`.
    pub username: Option<String>,
    password: Zeroizing<String>,
}

impl AuthCredentials {
    /// Builds credentials from a password, with no ACL username.
    #[must_use]
    pub fn password_only(password: impl Into<String>) -> Self {
        Self {
            username: None,
            password: Zeroizing::new(password.into()),
        }
    }

    /// Builds credentials with both an ACL username and a password.
    #[must_use]
    pub fn with_username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Zeroizing::new(password.into()),
        }
    }

    /// The password, borrowed for the duration of the `AUTH` call.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl PartialEq for AuthCredentials {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username && *self.password == *other.password
    }
}

/// Optional TLS material for a `rediss://`-style encrypted source
/// connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// PEM file containing additional trust anchors, appended to the
    /// Mozilla root store shipped via `webpki-roots`.
    pub ca_file: Option<PathBuf>,
    /// PEM file with a client certificate, for deployments that require
    /// mutual TLS on the replication link.
    pub client_cert_file: Option<PathBuf>,
    /// PEM file with the private key matching `client_cert_file`.
    pub client_key_file: Option<PathBuf>,
    /// Disables server certificate verification entirely. Intended for
    /// connecting to a source behind a trusted internal network only.
    pub insecure_skip_verify: bool,
}

/// A previously negotiated replication offset, carried across a process
/// restart so `connect` can attempt `PSYNC <replid> <offset>` instead of a
/// fresh full resync.
///
/// Per `spec.md` §7, a restart with an intact spool directory may skip the
/// snapshot phase entirely if the source accepts the partial resync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumeOffset {
    /// The source's replication ID at the time the offset was recorded.
    pub replid: String,
    /// The last byte offset this replica durably received.
    pub offset: i64,
}

/// Configuration for one replication session, built once and shared
/// read-only across every task it spawns.
#[derive(Clone, Debug)]
pub struct Options {
    address: SourceAddress,
    auth: Option<AuthCredentials>,
    tls: Option<TlsOptions>,
    prefer_replica: bool,
    try_diskless: bool,
    segment_max_size: u64,
    data_dir: PathBuf,
    listening_port: u16,
    resume: Option<ResumeOffset>,
}

impl Options {
    /// Starts a builder for the given source address.
    #[must_use]
    pub fn builder(address: SourceAddress) -> OptionsBuilder {
        OptionsBuilder::new(address)
    }

    /// The source address to connect to.
    #[must_use]
    pub fn address(&self) -> &SourceAddress {
        &self.address
    }

    /// Optional `AUTH` credentials.
    #[must_use]
    pub fn auth(&self) -> Option<&AuthCredentials> {
        self.auth.as_ref()
    }

    /// Optional TLS material.
    #[must_use]
    pub fn tls(&self) -> Option<&TlsOptions> {
        self.tls.as_ref()
    }

    /// Whether to follow `INFO replication` to the replica with the
    /// largest offset before requesting a resync.
    #[must_use]
    pub fn prefer_replica(&self) -> bool {
        self.prefer_replica
    }

    /// Whether to request `CAPA EOF` (diskless snapshot transfer).
    #[must_use]
    pub fn try_diskless(&self) -> bool {
        self.try_diskless
    }

    /// Maximum size, in bytes, of one spool segment before rotation.
    #[must_use]
    pub fn segment_max_size(&self) -> u64 {
        self.segment_max_size
    }

    /// Directory holding the RDB snapshot file and the spool segment
    /// directory for this session.
    #[must_use]
    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }

    /// Port announced via `REPLCONF listening-port`. This system has no
    /// inbound listener; the value is carried forward from the operator's
    /// status port purely for protocol compliance, per the Go original.
    #[must_use]
    pub fn listening_port(&self) -> u16 {
        self.listening_port
    }

    /// A previously recorded replication offset to resume from, if any.
    #[must_use]
    pub fn resume(&self) -> Option<&ResumeOffset> {
        self.resume.as_ref()
    }

    /// Path the RDB snapshot file is written to for this session.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("snapshot.rdb")
    }

    /// Path the rotating command spool directory lives at for this session.
    #[must_use]
    pub fn spool_dir(&self) -> PathBuf {
        self.data_dir.join("spool")
    }
}

/// Builder for [`Options`], validated on [`OptionsBuilder::build`].
#[derive(Clone, Debug)]
pub struct OptionsBuilder {
    address: SourceAddress,
    auth: Option<AuthCredentials>,
    tls: Option<TlsOptions>,
    prefer_replica: bool,
    try_diskless: bool,
    segment_max_size: u64,
    data_dir: Option<PathBuf>,
    listening_port: u16,
    resume: Option<ResumeOffset>,
}

/// Default spool segment size: 64 MiB.
const DEFAULT_SEGMENT_MAX_SIZE: u64 = 64 * 1024 * 1024;

impl OptionsBuilder {
    fn new(address: SourceAddress) -> Self {
        Self {
            address,
            auth: None,
            tls: None,
            prefer_replica: false,
            try_diskless: true,
            segment_max_size: DEFAULT_SEGMENT_MAX_SIZE,
            data_dir: None,
            listening_port: 0,
            resume: None,
        }
    }

    /// Sets the `AUTH` credentials.
    #[must_use]
    pub fn auth(mut self, auth: AuthCredentials) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Enables TLS with the given material.
    #[must_use]
    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Sets whether to follow `INFO replication` to the best replica.
    #[must_use]
    pub fn prefer_replica(mut self, prefer_replica: bool) -> Self {
        self.prefer_replica = prefer_replica;
        self
    }

    /// Sets whether to request diskless (`CAPA EOF`) snapshot transfer.
    #[must_use]
    pub fn try_diskless(mut self, try_diskless: bool) -> Self {
        self.try_diskless = try_diskless;
        self
    }

    /// Sets the spool segment rotation size.
    #[must_use]
    pub fn segment_max_size(mut self, segment_max_size: u64) -> Self {
        self.segment_max_size = segment_max_size;
        self
    }

    /// Sets the directory the snapshot file and spool directory live under.
    #[must_use]
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Sets the port announced via `REPLCONF listening-port`.
    #[must_use]
    pub fn listening_port(mut self, listening_port: u16) -> Self {
        self.listening_port = listening_port;
        self
    }

    /// Supplies a previously recorded offset to attempt a partial resync
    /// from, skipping the snapshot phase if the source accepts it.
    #[must_use]
    pub fn resume(mut self, resume: ResumeOffset) -> Self {
        self.resume = Some(resume);
        self
    }

    /// Validates and finalizes the options.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::MissingDataDir`] if [`Self::data_dir`] was
    /// never called, and [`OptionsError::ZeroSegmentSize`] if the segment
    /// size was set to `0`.
    pub fn build(self) -> Result<Options, OptionsError> {
        let data_dir = self.data_dir.ok_or(OptionsError::MissingDataDir)?;
        if self.segment_max_size == 0 {
            return Err(OptionsError::ZeroSegmentSize);
        }
        Ok(Options {
            address: self.address,
            auth: self.auth,
            tls: self.tls,
            prefer_replica: self.prefer_replica,
            try_diskless: self.try_diskless,
            segment_max_size: self.segment_max_size,
            data_dir,
            listening_port: self.listening_port,
            resume: self.resume,
        })
    }
}

/// Errors building [`Options`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// [`OptionsBuilder::data_dir`] was never called.
    #[error("options builder requires a data_dir")]
    MissingDataDir,
    /// [`OptionsBuilder::segment_max_size`] was set to `0`.
    #[error("segment_max_size must be greater than 0")]
    ZeroSegmentSize,
}
