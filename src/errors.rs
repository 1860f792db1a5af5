use thiserror::Error;

/// Classification of a single order-service HTTP exchange.
///
/// The gateway's retry policy is driven entirely by this classification:
/// transient errors retry on the same host, client errors stop the order,
/// anything else moves on to the next host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The service answered with a non-success status
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    /// Connection refused, timeout, DNS failure, ...
    #[error("no response: {0}")]
    NoResponse(String),
    /// The service answered 2xx but the body was not a usable order
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl TransportError {
    /// 5xx or no response at all.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => *status >= 500,
            TransportError::NoResponse(_) => true,
            TransportError::Decode(_) => false,
        }
    }

    /// 4xx: the request itself was rejected.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TransportError::Status { status, .. } if (400..500).contains(status))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why a single order could not be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderErrorKind {
    /// 4xx from the order service; not retried, no fallback
    Rejected,
    /// Every host failed within its retry budget
    AllHostsExhausted,
    /// Order created but signing/sending/receipt failed
    Broadcast,
}

impl std::fmt::Display for OrderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderErrorKind::Rejected => write!(f, "rejected"),
            OrderErrorKind::AllHostsExhausted => write!(f, "all hosts exhausted"),
            OrderErrorKind::Broadcast => write!(f, "broadcast failed"),
        }
    }
}

/// Failure of one order submission. Recorded per recipient, never aborts a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("DLN order {kind}: {message}")]
pub struct OrderError {
    pub kind: OrderErrorKind,
    pub message: String,
    /// Remote order id, known when the order was created but the broadcast failed
    pub order_id: Option<String>,
}

impl OrderError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: OrderErrorKind::Rejected,
            message: message.into(),
            order_id: None,
        }
    }

    pub fn exhausted(message: impl Into<String>) -> Self {
        Self {
            kind: OrderErrorKind::AllHostsExhausted,
            message: message.into(),
            order_id: None,
        }
    }

    pub fn broadcast(message: impl Into<String>, order_id: Option<String>) -> Self {
        Self {
            kind: OrderErrorKind::Broadcast,
            message: message.into(),
            order_id,
        }
    }
}

/// Main crate error type.
///
/// `Balance` and `Holders` are cycle preconditions: they escape `run_cycle`
/// unchanged and abort the cycle.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Balance oracle failure
    #[error("Balance query failed: {0}")]
    Balance(String),

    /// Holder source failure
    #[error("Holder fetch failed: {0}")]
    Holders(String),

    /// Generic request error
    #[error("Generic request error: {0}")]
    GenericRequest(String),

    /// JSON parse error
    #[error("Json parse error: {0}")]
    JsonParse(String),

    /// Amount / decimal parsing error
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Wallet error
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Chain RPC error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),

    /// Order error surfaced outside a cycle (single-order CLI)
    #[error(transparent)]
    Order(#[from] OrderError),
}

impl Error {
    pub fn json_parse(msg: impl Into<String>) -> Self {
        Error::JsonParse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// True for failures that abort a cycle before any order is submitted.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::Balance(_) | Error::Holders(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
