use core::fmt;

/// Errors that may occur during the Dragonfly protocol.
///
/// Every error returned by a [`PeerSession`](crate::PeerSession) operation is
/// fatal for that session, including RNG failures and oversized peer
/// identifiers: the session moves to [`State::Aborted`](crate::State::Aborted)
/// and never releases a PMK.
#[derive(Debug)]
pub enum Error {
    /// Overflow in input lengths.
    Overflow(&'static str),
    /// Random number generator failure.
    Random(rand_core::Error),
    /// Curve parameters rejected at construction.
    InvalidParameters(&'static str),
    /// A point failed the curve or range check.
    InvalidPoint,
    /// Field inverse of zero.
    DivisionByZero,
    /// Hunting and pecking found no point within the iteration bound.
    DerivationFailure {
        /// Number of iterations that were run.
        iterations: u8,
    },
    /// Every commit attempt produced a scalar below two.
    DegenerateScalar {
        /// Number of attempts made before giving up.
        attempts: u8,
    },
    /// The peer's element is not a valid curve point.
    InvalidPeerElement,
    /// The peer's scalar is outside `(1, q)`.
    InvalidPeerScalar,
    /// The peer sent back our own scalar and element.
    ReflectionDetected,
    /// The peer's confirmation token does not match the expected one.
    ConfirmationMismatch,
    /// An operation was invoked in the wrong protocol phase.
    UnexpectedState {
        /// Phase the operation requires.
        expected: crate::State,
        /// Phase the session was in.
        actual: crate::State,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Overflow(msg) => write!(f, "overflow: {}", msg),
            Error::Random(e) => write!(f, "random number generator failure: {}", e),
            Error::InvalidParameters(msg) => write!(f, "invalid curve parameters: {}", msg),
            Error::InvalidPoint => f.write_str("point is not on the curve"),
            Error::DivisionByZero => f.write_str("inverse of zero"),
            Error::DerivationFailure { iterations } => write!(
                f,
                "no password element found after {} iterations",
                iterations
            ),
            Error::DegenerateScalar { attempts } => {
                write!(f, "degenerate scalar after {} attempts", attempts)
            }
            Error::InvalidPeerElement => f.write_str("invalid peer element"),
            Error::InvalidPeerScalar => f.write_str("invalid peer scalar"),
            Error::ReflectionDetected => f.write_str("peer reflected our commit"),
            Error::ConfirmationMismatch => f.write_str("confirmation token mismatch"),
            Error::UnexpectedState { expected, actual } => {
                write!(f, "expected state {:?}, session is {:?}", expected, actual)
            }
        }
    }
}

impl From<rand_core::Error> for Error {
    fn from(e: rand_core::Error) -> Self {
        Error::Random(e)
    }
}
