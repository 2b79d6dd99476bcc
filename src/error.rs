use crate::Family;

/// Error codes wallets attach to their failures, following EIP-1193
/// and the JSON-RPC conventions most extensions (EVM, Solana and Tron
/// alike) have adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum ProviderErrorCode {
    #[error("The user rejected the request.")]
    UserRejected,
    #[error("The requested method and/or account has not been authorized by the user.")]
    Unauthorized,
    #[error("The provider does not support the requested method.")]
    UnsupportedMethod,
    #[error("The provider is disconnected from all chains.")]
    Disconnected,
    #[error("The provider is not connected to the requested chain.")]
    ChainDisconnected,
    /// Usually a previous request is still waiting on the user.
    #[error("The requested resource is not available.")]
    ResourceUnavailable,
    #[error("Unknown error code `{0}'")]
    Unknown(i64),
}

impl ProviderErrorCode {
    pub const USER_REJECTED: i64 = 4001;

    pub fn from_code(code: i64) -> Self {
        match code {
            4001 => Self::UserRejected,
            4100 => Self::Unauthorized,
            4200 => Self::UnsupportedMethod,
            4900 => Self::Disconnected,
            4901 => Self::ChainDisconnected,
            -32002 => Self::ResourceUnavailable,
            unknown => Self::Unknown(unknown),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::UserRejected => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::ResourceUnavailable => -32002,
            Self::Unknown(code) => *code,
        }
    }
}

/// A failure reported by the wallet provider itself.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error, serde::Deserialize,
)]
#[error("{message}")]
pub struct ProviderError {
    #[serde(default)]
    pub code: Option<ProviderErrorCode>,
    #[serde(default)]
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(ProviderErrorCode::UserRejected)
    }
}

/// Errors returned by the connection flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("User rejected the connection request (code {code}).")]
    UserRejected { code: i64 },
    #[error("Wallet `{0}' not found or not available.")]
    ProviderNotFound(String),
    #[error("No handler for wallet family of `{0}'.")]
    UnsupportedFamily(String),
    #[error("The wallet does not expose a {0} provider.")]
    ProviderUnavailable(Family),
    #[error("No accounts found. User may have rejected.")]
    NoAccounts,
    #[error("The wallet is locked or no account is available.")]
    WalletLocked,
    #[error("Connection request already pending in the wallet.")]
    RequestPending,
    #[error("Wallet `{0}' is already connected.")]
    AlreadyConnected(String),
    #[error("Connection already in progress.")]
    ConnectionInProgress,
    #[error("Connection timeout.")]
    Timeout,
    #[error(transparent)]
    Provider(ProviderError),
}

impl From<ProviderError> for ConnectError {
    fn from(error: ProviderError) -> Self {
        match error.code {
            Some(ProviderErrorCode::UserRejected) => Self::UserRejected {
                code: ProviderErrorCode::USER_REJECTED,
            },
            _ => Self::Provider(error),
        }
    }
}

impl ConnectError {
    /// rejections are expected outcomes, UIs usually don't want to alarm
    /// the user about them
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejected { .. })
    }

    /// message suitable to display to the end user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UserRejected { .. } => {
                "User rejected the connection request. Please try again."
            }
            Self::ProviderNotFound(_) | Self::ProviderUnavailable(_) => {
                "Wallet not found or not available. Please make sure the wallet extension is installed and enabled."
            }
            Self::UnsupportedFamily(_) => {
                "Wallet family not supported. This type of wallet is not currently supported."
            }
            Self::NoAccounts => {
                "No accounts found in the wallet. Please create an account in your wallet application."
            }
            Self::WalletLocked => "The wallet is locked. Please unlock your wallet and try again.",
            Self::RequestPending => {
                "A connection request is already pending. Please check your wallet."
            }
            Self::AlreadyConnected(_) => "This wallet is already connected.",
            Self::ConnectionInProgress => "A connection is already in progress.",
            Self::Timeout => {
                "Connection timed out. Please check your internet connection and try again."
            }
            Self::Provider(_) => "An unexpected error occurred while connecting to the wallet.",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage is not available.")]
    Unavailable,
    #[error("Storage operation failed: {0}")]
    Backend(String),
    #[error("Couldn't encode the record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl<'de> serde::Deserialize<'de> for ProviderErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct Visitor;
        impl serde::de::Visitor<'_> for Visitor {
            type Value = ProviderErrorCode;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "Expecting an integer ProviderErrorCode")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ProviderErrorCode::from_code(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                i64::try_from(v)
                    .map(ProviderErrorCode::from_code)
                    .map_err(|_| E::custom(format!("error code out of range: {v}")))
            }

            // numbers coming from JS are doubles
            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v.fract() == 0.0 {
                    Ok(ProviderErrorCode::from_code(v as i64))
                } else {
                    Err(E::custom(format!("error code is not an integer: {v}")))
                }
            }
        }

        deserializer.deserialize_i64(Visitor)
    }
}
