//! libgit2 callback plumbing shared by clone, fetch, pull and push.
//!
//! A [`RemoteSession`] lives for exactly one remote call. It answers credential
//! requests from the session [`Credentials`], aborts the transfer once the deadline
//! passes, records push rejections, and turns the resulting `git2::Error` into an
//! action-scoped [`SyncError`] that separates authentication from connectivity.

use crate::core::{
    credentials::Credentials,
    error::{RemoteAction, Result, SyncError},
};
use git2::{Cred, CredentialType, ErrorClass, ErrorCode, RemoteCallbacks};
use std::cell::{Cell, RefCell};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// libgit2 keeps asking for credentials while the server rejects them
const MAX_AUTH_ATTEMPTS: u32 = 3;

/// Transport timeout last handed to libgit2, in milliseconds (0 disables)
static TRANSPORT_TIMEOUT_MS: Mutex<Option<i32>> = Mutex::new(None);

/// Bound libgit2's socket connect and read/write waits by `timeout`.
///
/// Callbacks only run while data flows, so a server that accepts the connection and
/// never answers is caught here. The option is process-wide: the most recent session
/// decides the value for every transfer that starts after it.
fn apply_transport_timeout(timeout: Option<Duration>) {
    let millis = timeout
        .map(|t| i32::try_from(t.as_millis()).unwrap_or(i32::MAX).max(1))
        .unwrap_or(0);

    let mut current = TRANSPORT_TIMEOUT_MS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if *current == Some(millis) {
        return;
    }

    // SAFETY: libgit2 keeps these options in unsynchronized globals. Every write from
    // this crate happens under TRANSPORT_TIMEOUT_MS, and the value is a plain int that
    // transports only read when they open a connection.
    let applied = unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)
            .and_then(|()| git2::opts::set_server_timeout_in_milliseconds(millis))
    };
    match applied {
        Ok(()) => *current = Some(millis),
        Err(e) => log::warn!("Could not set the transport timeout: {e}"),
    }
}

pub(crate) struct RemoteSession<'a> {
    action: RemoteAction,
    credentials: &'a Credentials,
    timeout: Option<Duration>,
    started: Instant,
    timed_out: Cell<bool>,
    auth_attempts: Cell<u32>,
    rejection: RefCell<Option<(String, String)>>,
}

impl<'a> RemoteSession<'a> {
    pub(crate) fn new(
        action: RemoteAction,
        credentials: &'a Credentials,
        timeout: Option<Duration>,
    ) -> Self {
        apply_transport_timeout(timeout);
        Self {
            action,
            credentials,
            timeout,
            started: Instant::now(),
            timed_out: Cell::new(false),
            auth_attempts: Cell::new(0),
            rejection: RefCell::new(None),
        }
    }

    /// Mark the session as expired when the deadline has passed
    fn expired(&self) -> bool {
        let expired = self
            .timeout
            .is_some_and(|timeout| self.started.elapsed() >= timeout);
        if expired {
            self.timed_out.set(true);
        }
        expired
    }

    pub(crate) fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();

        callbacks.credentials(move |_url, username_from_url, allowed| {
            if self.expired() {
                return Err(git2::Error::from_str("remote operation timed out"));
            }

            let attempts = self.auth_attempts.get() + 1;
            self.auth_attempts.set(attempts);
            if attempts > MAX_AUTH_ATTEMPTS {
                return Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Callback,
                    "credentials were rejected by the remote",
                ));
            }

            let username = if self.credentials.username().is_empty() {
                username_from_url.unwrap_or("git")
            } else {
                self.credentials.username()
            };

            log::debug!(
                "Credential request #{attempts} for {} ({:?})",
                self.action,
                allowed
            );

            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
                && !self.credentials.secret().is_empty()
            {
                Cred::userpass_plaintext(username, self.credentials.secret().expose())
            } else if allowed.contains(CredentialType::SSH_KEY) {
                Cred::ssh_key_from_agent(username_from_url.unwrap_or(username))
            } else if allowed.contains(CredentialType::DEFAULT) {
                Cred::default()
            } else {
                Err(git2::Error::new(
                    ErrorCode::Auth,
                    ErrorClass::Callback,
                    "no usable credentials for this remote",
                ))
            }
        });

        callbacks.transfer_progress(move |progress| {
            log::trace!(
                "{}: {}/{} objects",
                self.action,
                progress.received_objects(),
                progress.total_objects()
            );
            !self.expired()
        });

        callbacks.sideband_progress(move |_data| !self.expired());

        callbacks.push_update_reference(move |reference, status| {
            if let Some(message) = status {
                *self.rejection.borrow_mut() = Some((reference.to_string(), message.to_string()));
            }
            Ok(())
        });

        callbacks
    }

    /// Rejection reported by the server for a pushed reference, if any
    pub(crate) fn check_rejection(&self) -> Result<()> {
        match self.rejection.borrow_mut().take() {
            Some((reference, message)) => Err(SyncError::push_rejected(reference, message)),
            None => Ok(()),
        }
    }

    /// Map a libgit2 failure from this session onto the remote error taxonomy
    pub(crate) fn classify(&self, err: git2::Error) -> SyncError {
        if let Some(timeout) = self.timeout {
            if self.timed_out.get() || is_transport_timeout(&err) {
                return SyncError::remote_timeout(self.action, timeout);
            }
        }

        let kind = classify_remote_error(&err, self.auth_attempts.get() > MAX_AUTH_ATTEMPTS);
        match kind {
            RemoteFailure::Auth => SyncError::remote_auth(self.action, err.message()),
            RemoteFailure::Network => SyncError::remote_network(self.action, err.message()),
            RemoteFailure::Other => SyncError::Git(err),
        }
    }
}

/// libgit2 gave up waiting on the socket
fn is_transport_timeout(err: &git2::Error) -> bool {
    err.code() == ErrorCode::Timeout || err.message().to_ascii_lowercase().contains("timed out")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteFailure {
    Auth,
    Network,
    Other,
}

pub(crate) fn classify_remote_error(err: &git2::Error, auth_exhausted: bool) -> RemoteFailure {
    let message = err.message().to_ascii_lowercase();
    let auth_words = message.contains("authentication")
        || message.contains("401")
        || message.contains("403")
        || message.contains("credentials");

    if auth_exhausted || err.code() == ErrorCode::Auth || auth_words {
        return RemoteFailure::Auth;
    }

    match err.class() {
        ErrorClass::Net
        | ErrorClass::Http
        | ErrorClass::Ssl
        | ErrorClass::Ssh
        | ErrorClass::Os => RemoteFailure::Network,
        _ if err.code() == ErrorCode::Certificate => RemoteFailure::Network,
        _ => RemoteFailure::Other,
    }
}
