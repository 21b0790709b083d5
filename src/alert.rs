use std::fmt;

/// The subset of the TLS alert protocol's description codes this layer can
/// raise on its own. The full alert list (bad_certificate, decode_error, …)
/// belongs to the TLS state machine above; this layer only ever reports
/// `InternalError`, when the record layer cannot carry even a single
/// fragment byte.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AlertDescription {
    InternalError = 80,
}

impl fmt::Display for AlertDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AlertDescription::InternalError => write!(f, "InternalError"),
        }
    }
}
