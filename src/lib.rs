//! Dragonfly (SAE) PAKE (Password-Authenticated Key Exchange) over prime-field short-Weierstrass curves.
//!
//! # Overview
//! This crate implements the Dragonfly key exchange (RFC 7664), the handshake behind WPA3's SAE. Two peers sharing
//! a low-entropy password derive a 256-bit Pairwise Master Key (PMK) without exposing the password to eavesdroppers
//! or to offline dictionary attacks. The implementation is designed to operate without the standard library
//! (`#![no_std]`, `alloc` required).
//!
//! ## Parties
//! Dragonfly is balanced: both peers run the same [`PeerSession`] and either one may start. Sessions never perform
//! I/O; moving the values between peers is up to the caller.
//!
//! ## Protocol Workflow
//! 1. **Initiate**: each peer derives the password element (PE) from the password and both identities.
//! 2. **Commit**: each peer produces a [`CommitMessage`] (scalar and element) and sends it to the other.
//! 3. **Shared secret**: each peer combines the received commit with its own secrets and produces a [`Token`].
//! 4. **Confirm**: each peer verifies the received token and obtains the [`Pmk`].
//!
//! ## Constants
//! - `TOKEN_BYTES`: Length of a confirmation token in bytes.
//! - `PMK_BYTES`: Length of the derived PMK in bytes.
//!
//! ## Errors
//! The [`Error`] enum defines possible errors, including:
//! - Invalid or reflected peer values.
//! - Confirmation token mismatches.
//! - Random number generator failures.
//!
//! Every error returned by a session operation leaves the session [`State::Aborted`].
//!
//! ## Example Usage
//! ```rust
//! use pake_dragonfly::*;
//! use rand::rngs::OsRng;
//!
//! let config = SessionConfig::new(CurveParameters::brainpool_p256r1());
//! let mut alice = PeerSession::new(config.clone(), "password", "alice").unwrap();
//! let mut bob = PeerSession::new(config, "password", "bob").unwrap();
//!
//! alice.initiate("bob").unwrap();
//! bob.initiate("alice").unwrap();
//!
//! let alice_commit = alice.commit_with_rng(OsRng).unwrap();
//! let bob_commit = bob.commit_with_rng(OsRng).unwrap();
//!
//! let alice_token = alice.compute_shared_secret(&bob_commit, "bob").unwrap();
//! let bob_token = bob.compute_shared_secret(&alice_commit, "alice").unwrap();
//!
//! let alice_pmk = alice.confirm(&bob_token).unwrap();
//! let bob_pmk = bob.confirm(&alice_token).unwrap();
//!
//! assert_eq!(alice_pmk.as_bytes(), bob_pmk.as_bytes());
//! ```

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

use core::fmt;
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub mod curve;
pub mod element;
mod error;
pub mod field;
mod hash;
mod session;

pub use curve::{CurveParameters, Point};
pub use element::{derive_password_element, DEFAULT_ITERATIONS};
pub use error::Error;
pub use num_bigint::BigUint;
pub use session::{CommitMessage, PeerSession, SessionConfig, State, DEFAULT_COMMIT_ATTEMPTS};

/// Length of a confirmation token in bytes.
pub const TOKEN_BYTES: usize = hash::HASH_BYTES;
/// Length of the PMK in bytes.
pub const PMK_BYTES: usize = hash::HASH_BYTES;

/// Confirmation token exchanged in the confirm phase.
#[derive(Debug, Copy, Clone)]
pub struct Token([u8; TOKEN_BYTES]);

impl Token {
    /// Wraps a token received from the peer.
    pub fn from_bytes(bytes: [u8; TOKEN_BYTES]) -> Self {
        Token(bytes)
    }

    /// Retrieves the token bytes to send to the peer.
    pub fn as_bytes(&self) -> &[u8; TOKEN_BYTES] {
        &self.0
    }
}

impl ConstantTimeEq for Token {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0[..].ct_eq(&other.0[..])
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Token {}

/// Pairwise Master Key derived by a confirmed session.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Pmk([u8; PMK_BYTES]);

impl Pmk {
    pub(crate) fn new(bytes: [u8; PMK_BYTES]) -> Self {
        Pmk(bytes)
    }

    /// Retrieves the key bytes.
    pub fn as_bytes(&self) -> &[u8; PMK_BYTES] {
        &self.0
    }
}

impl fmt::Debug for Pmk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Pmk(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_dragonfly() {
        let config = SessionConfig::default();
        let mut sta = PeerSession::new(config.clone(), "abc1238", "aa:bb:cc:dd:ee:01").unwrap();
        let mut ap = PeerSession::new(config, "abc1238", "aa:bb:cc:dd:ee:02").unwrap();

        sta.initiate(ap.identity().to_vec()).unwrap();
        ap.initiate(sta.identity().to_vec()).unwrap();
        assert_eq!(sta.password_element(), ap.password_element());

        let sta_commit = sta.commit_with_rng(OsRng).unwrap();
        let ap_commit = ap.commit_with_rng(OsRng).unwrap();
        assert_ne!(sta_commit, ap_commit);

        let sta_token = sta
            .compute_shared_secret(&ap_commit, "aa:bb:cc:dd:ee:02")
            .unwrap();
        let ap_token = ap
            .compute_shared_secret(&sta_commit, "aa:bb:cc:dd:ee:01")
            .unwrap();
        assert_ne!(sta_token, ap_token);

        let sta_pmk = sta.confirm(&ap_token).unwrap();
        let ap_pmk = ap.confirm(&sta_token).unwrap();

        assert_eq!(sta_pmk.as_bytes(), ap_pmk.as_bytes());
        assert_eq!(sta.state(), State::Confirmed);
        assert_eq!(ap.state(), State::Confirmed);
    }

    #[test]
    fn wrong_password_never_confirms() {
        let config = SessionConfig::default();
        let mut sta = PeerSession::new(config.clone(), "abc1238", "sta").unwrap();
        let mut ap = PeerSession::new(config, "abc1239", "ap").unwrap();

        sta.initiate("ap").unwrap();
        ap.initiate("sta").unwrap();
        let sta_commit = sta.commit_with_rng(OsRng).unwrap();
        let ap_commit = ap.commit_with_rng(OsRng).unwrap();
        let sta_token = sta.compute_shared_secret(&ap_commit, "ap").unwrap();
        let ap_token = ap.compute_shared_secret(&sta_commit, "sta").unwrap();

        assert!(matches!(sta.confirm(&ap_token), Err(Error::ConfirmationMismatch)));
        assert!(matches!(ap.confirm(&sta_token), Err(Error::ConfirmationMismatch)));
        assert_eq!(sta.state(), State::Aborted);
        assert_eq!(ap.state(), State::Aborted);
    }
}
