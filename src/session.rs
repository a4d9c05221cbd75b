//! The per-handshake protocol state machine.

use alloc::vec::Vec;
use core::mem;

use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::curve::{CurveParameters, Point};
use crate::element::{derive_password_element, DEFAULT_ITERATIONS};
use crate::hash::{hash_concat, scrub, to_fixed_be};
use crate::{Error, Pmk, Token};

/// Default bound on commit attempts that yield a scalar below two.
pub const DEFAULT_COMMIT_ATTEMPTS: u8 = 8;

/// Phase of a [`PeerSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Created, password element not derived yet.
    New,
    /// Password element derived.
    PeReady,
    /// Own scalar and element produced.
    Committed,
    /// Shared secret derived, own token produced.
    SecretReady,
    /// Peer's token verified and PMK released.
    Confirmed,
    /// A fatal error occurred or the session was aborted by the caller.
    Aborted,
}

/// Parameters of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    curve: CurveParameters,
    max_iterations: u8,
    max_commit_attempts: u8,
}

impl SessionConfig {
    /// Configuration for `curve` with default bounds.
    pub fn new(curve: CurveParameters) -> Self {
        SessionConfig {
            curve,
            max_iterations: DEFAULT_ITERATIONS,
            max_commit_attempts: DEFAULT_COMMIT_ATTEMPTS,
        }
    }

    /// Sets the number of hunting-and-pecking iterations.
    pub fn with_max_iterations(mut self, max_iterations: u8) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets how many times a degenerate commit is regenerated.
    pub fn with_max_commit_attempts(mut self, max_commit_attempts: u8) -> Self {
        self.max_commit_attempts = max_commit_attempts;
        self
    }

    /// The curve in use.
    pub fn curve(&self) -> &CurveParameters {
        &self.curve
    }

    /// Hunting-and-pecking iteration bound.
    pub fn max_iterations(&self) -> u8 {
        self.max_iterations
    }

    /// Commit retry bound.
    pub fn max_commit_attempts(&self) -> u8 {
        self.max_commit_attempts
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::new(CurveParameters::brainpool_p256r1())
    }
}

/// Scalar and element exchanged in the commit phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    scalar: BigUint,
    element: Point,
}

impl CommitMessage {
    /// Wraps a scalar and element, e.g. decoded from the wire.
    pub fn new(scalar: BigUint, element: Point) -> Self {
        CommitMessage { scalar, element }
    }

    /// The commit scalar.
    pub fn scalar(&self) -> &BigUint {
        &self.scalar
    }

    /// The commit element.
    pub fn element(&self) -> &Point {
        &self.element
    }
}

enum Phase {
    New,
    PeReady {
        pe: Point,
    },
    Committed {
        pe: Point,
        private: Zeroizing<Vec<u8>>,
        commit: CommitMessage,
    },
    SecretReady {
        pe: Point,
        k: Zeroizing<Vec<u8>>,
        commit: CommitMessage,
        peer_commit: CommitMessage,
        peer_identity: Vec<u8>,
    },
    Confirmed {
        pe: Point,
    },
    Aborted,
}

impl Phase {
    fn state(&self) -> State {
        match self {
            Phase::New => State::New,
            Phase::PeReady { .. } => State::PeReady,
            Phase::Committed { .. } => State::Committed,
            Phase::SecretReady { .. } => State::SecretReady,
            Phase::Confirmed { .. } => State::Confirmed,
            Phase::Aborted => State::Aborted,
        }
    }
}

/// One Dragonfly handshake attempt with a single peer.
///
/// The session owns every secret of the exchange. Each operation takes the
/// current phase out of the session; if it fails, the session is left
/// [`State::Aborted`] and all ephemeral secrets are dropped and zeroized.
///
/// The session performs no I/O. The caller moves the [`CommitMessage`] and
/// [`Token`] values between peers and should call [`PeerSession::abort`]
/// when a round times out.
pub struct PeerSession {
    config: SessionConfig,
    password: Zeroizing<Vec<u8>>,
    identity: Vec<u8>,
    phase: Phase,
}

impl PeerSession {
    /// Creates a session for `identity` using the shared `password`.
    pub fn new(
        config: SessionConfig,
        password: impl AsRef<[u8]>,
        identity: impl AsRef<[u8]>,
    ) -> Result<Self, Error> {
        if identity.as_ref().len() > 0xff {
            return Err(Error::Overflow(
                "Identifiers must be at most 255 bytes long",
            ));
        }
        Ok(PeerSession {
            config,
            password: Zeroizing::new(password.as_ref().to_vec()),
            identity: identity.as_ref().to_vec(),
            phase: Phase::New,
        })
    }

    /// Current phase.
    pub fn state(&self) -> State {
        self.phase.state()
    }

    /// Our own identifier.
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    /// The peer identifier bound into the tokens, once the shared secret is
    /// derived.
    pub fn peer_identity(&self) -> Option<&[u8]> {
        match &self.phase {
            Phase::SecretReady { peer_identity, .. } => Some(peer_identity),
            _ => None,
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The password element, once derived and while the session is alive.
    pub fn password_element(&self) -> Option<&Point> {
        match &self.phase {
            Phase::PeReady { pe }
            | Phase::Committed { pe, .. }
            | Phase::SecretReady { pe, .. }
            | Phase::Confirmed { pe } => Some(pe),
            Phase::New | Phase::Aborted => None,
        }
    }

    /// Aborts the session, discarding all secrets.
    pub fn abort(&mut self) {
        let previous = mem::replace(&mut self.phase, Phase::Aborted).state();
        if previous != State::Aborted {
            log::debug!("session aborted by caller in state {:?}", previous);
        }
    }

    /// Derives the password element for the exchange with `remote_identity`.
    pub fn initiate(&mut self, remote_identity: impl AsRef<[u8]>) -> Result<(), Error> {
        let result = self.run_initiate(remote_identity.as_ref());
        self.finish("initiate", result)
    }

    /// s. [`commit_with_rng`](PeerSession::commit_with_rng)
    #[cfg(feature = "getrandom")]
    pub fn commit(&mut self) -> Result<CommitMessage, Error> {
        self.commit_with_rng(rand::rngs::OsRng)
    }

    /// Produces our scalar and element.
    ///
    /// `private` and `mask` are drawn from `[1, p - 1)`. A scalar below two
    /// (or an identity element) causes both to be redrawn, up to the
    /// configured number of attempts. The mask is wiped as soon as the
    /// element is computed.
    ///
    /// # Data to be sent over the wire:
    ///
    /// The returned [`CommitMessage`] **must be sent to the peer**.
    pub fn commit_with_rng(
        &mut self,
        rng: impl CryptoRng + RngCore,
    ) -> Result<CommitMessage, Error> {
        let result = self.run_commit(rng);
        self.finish("commit", result)
    }

    /// Derives the shared secret from the peer's commit and returns our
    /// confirmation token.
    ///
    /// The peer's element must be a finite point on the curve and its scalar
    /// must lie in `(1, q)`. A commit equal to our own is treated as a
    /// reflection attack.
    ///
    /// # Data to be sent over the wire:
    ///
    /// The returned [`Token`] **must be sent to the peer**.
    pub fn compute_shared_secret(
        &mut self,
        peer_commit: &CommitMessage,
        peer_identity: impl AsRef<[u8]>,
    ) -> Result<Token, Error> {
        let result = self.run_compute_shared_secret(peer_commit, peer_identity.as_ref());
        self.finish("compute_shared_secret", result)
    }

    /// Verifies the peer's token and releases the PMK.
    ///
    /// The comparison is constant time. On mismatch the session aborts and
    /// no key is ever produced.
    pub fn confirm(&mut self, peer_token: &Token) -> Result<Pmk, Error> {
        let result = self.run_confirm(peer_token);
        self.finish("confirm", result)
    }

    fn run_initiate(&mut self, remote_identity: &[u8]) -> Result<(), Error> {
        match self.take_phase() {
            Phase::New => {}
            other => return Err(unexpected(State::New, &other)),
        }
        let pe = derive_password_element(
            &self.config.curve,
            &self.password[..],
            &self.identity,
            remote_identity,
            self.config.max_iterations,
        )?;
        self.phase = Phase::PeReady { pe };
        Ok(())
    }

    fn run_commit(&mut self, mut rng: impl CryptoRng + RngCore) -> Result<CommitMessage, Error> {
        let pe = match self.take_phase() {
            Phase::PeReady { pe } => pe,
            other => return Err(unexpected(State::PeReady, &other)),
        };
        let curve = &self.config.curve;
        let two = BigUint::from(2u8);

        for attempt in 1..=self.config.max_commit_attempts {
            let mut private = random_below_p(curve, &mut rng)?;
            let mut mask = match random_below_p(curve, &mut rng) {
                Ok(mask) => mask,
                Err(e) => {
                    scrub(&mut private);
                    return Err(e);
                }
            };
            let scalar = (&private + &mask) % curve.q();
            let element = curve.multiply(&mask, &pe).map(|m| curve.negate(&m));
            // mask is wiped before its value can outlive this attempt
            scrub(&mut mask);
            let element = match element {
                Ok(element) => element,
                Err(e) => {
                    scrub(&mut private);
                    return Err(e);
                }
            };
            if scalar < two || element.is_identity() {
                scrub(&mut private);
                log::warn!("degenerate commit on attempt {}, regenerating", attempt);
                continue;
            }
            let encoded = to_fixed_be(&private, curve.field_len());
            // private only lives on in the zeroizing byte buffer
            scrub(&mut private);
            let commit = CommitMessage { scalar, element };
            self.phase = Phase::Committed {
                pe,
                private: encoded,
                commit: commit.clone(),
            };
            return Ok(commit);
        }
        Err(Error::DegenerateScalar {
            attempts: self.config.max_commit_attempts,
        })
    }

    fn run_compute_shared_secret(
        &mut self,
        peer_commit: &CommitMessage,
        peer_identity: &[u8],
    ) -> Result<Token, Error> {
        let (pe, private, commit) = match self.take_phase() {
            Phase::Committed {
                pe,
                private,
                commit,
            } => (pe, private, commit),
            other => return Err(unexpected(State::Committed, &other)),
        };
        let curve = &self.config.curve;

        if peer_identity.len() > 0xff {
            return Err(Error::Overflow(
                "Identifiers must be at most 255 bytes long",
            ));
        }
        if peer_commit.element.is_identity() || !curve.is_valid(&peer_commit.element) {
            return Err(Error::InvalidPeerElement);
        }
        if peer_commit.scalar < BigUint::from(2u8) || &peer_commit.scalar >= curve.q() {
            return Err(Error::InvalidPeerScalar);
        }
        if *peer_commit == commit {
            return Err(Error::ReflectionDetected);
        }

        // K = private * (peer_element + peer_scalar * PE)
        let z = curve.multiply(&peer_commit.scalar, &pe)?;
        let zz = curve.add(&peer_commit.element, &z)?;
        let mut private = BigUint::from_bytes_be(&private[..]);
        let shared = curve.multiply(&private, &zz);
        // wipe the rebuilt private value whatever the outcome
        scrub(&mut private);
        let k = match shared? {
            Point::Affine { mut x, .. } => {
                let k = to_fixed_be(&x, curve.field_len());
                scrub(&mut x);
                k
            }
            Point::Identity => return Err(Error::InvalidPeerElement),
        };

        let token = confirmation_token(curve, &k, &commit, peer_commit, &self.identity);
        self.phase = Phase::SecretReady {
            pe,
            k,
            commit,
            peer_commit: peer_commit.clone(),
            peer_identity: peer_identity.to_vec(),
        };
        Ok(token)
    }

    fn run_confirm(&mut self, peer_token: &Token) -> Result<Pmk, Error> {
        let (pe, k, commit, peer_commit, peer_identity) = match self.take_phase() {
            Phase::SecretReady {
                pe,
                k,
                commit,
                peer_commit,
                peer_identity,
            } => (pe, k, commit, peer_commit, peer_identity),
            other => return Err(unexpected(State::SecretReady, &other)),
        };
        let curve = &self.config.curve;

        let expected = confirmation_token(curve, &k, &peer_commit, &commit, &peer_identity);
        if !bool::from(expected.ct_eq(peer_token)) {
            return Err(Error::ConfirmationMismatch);
        }

        // PMK = H(k || (scalar + peer_scalar) mod q)
        let sum = (&commit.scalar + &peer_commit.scalar) % curve.q();
        let sum = to_fixed_be(&sum, curve.scalar_len());
        let pmk = Pmk::new(hash_concat(&[&k[..], &sum[..]]));
        self.phase = Phase::Confirmed { pe };
        Ok(pmk)
    }

    /// Moves the phase out, leaving the session aborted until the caller
    /// stores the next phase.
    fn take_phase(&mut self) -> Phase {
        mem::replace(&mut self.phase, Phase::Aborted)
    }

    fn finish<T>(&self, operation: &str, result: Result<T, Error>) -> Result<T, Error> {
        match &result {
            Ok(_) => log::debug!("{} succeeded, session is {:?}", operation, self.state()),
            Err(e) => log::warn!("{} failed, session aborted: {}", operation, e),
        }
        result
    }
}

fn unexpected(expected: State, actual: &Phase) -> Error {
    Error::UnexpectedState {
        expected,
        actual: actual.state(),
    }
}

/// Uniform integer in `[1, p - 1)`, reduced from `len(p) + 8` random bytes.
fn random_below_p(
    curve: &CurveParameters,
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<BigUint, Error> {
    let p = curve.p();
    let mut wide = Zeroizing::new(alloc::vec![0u8; curve.field_len() + 8]);
    rng.try_fill_bytes(&mut wide[..])?;
    let one = BigUint::from(1u8);
    let span = p - BigUint::from(2u8);
    let mut wide = BigUint::from_bytes_be(&wide[..]);
    let v = &wide % &span + &one;
    scrub(&mut wide);
    Ok(v)
}

/// `H(k || first.scalar || second.scalar || first.x || second.x || identity)`
fn confirmation_token(
    curve: &CurveParameters,
    k: &[u8],
    first: &CommitMessage,
    second: &CommitMessage,
    identity: &[u8],
) -> Token {
    let zero = BigUint::from(0u8);
    let first_scalar = to_fixed_be(&first.scalar, curve.scalar_len());
    let second_scalar = to_fixed_be(&second.scalar, curve.scalar_len());
    let first_x = to_fixed_be(first.element.x().unwrap_or(&zero), curve.field_len());
    let second_x = to_fixed_be(second.element.x().unwrap_or(&zero), curve.field_len());
    Token::from_bytes(hash_concat(&[
        k,
        &first_scalar[..],
        &second_scalar[..],
        &first_x[..],
        &second_x[..],
        identity,
    ]))
}
