use serde::Serialize;
use yd_api_types::AmountError;
use yd_chain_client::ProviderError;
use yd_contracts::ContractName;

/// Which class of failure a [`DappError`] belongs to. Views use it to
/// decide between an inline message, a transient banner, or a degraded
/// section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    Connection,
    Transaction,
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DappError {
    #[error("{0} contract not configured for this chain")]
    NotConfigured(ContractName),
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    #[error("{0}")]
    InvalidInput(String),
    #[error("wallet not connected")]
    WalletNotConnected,
    #[error("no wallet provider found")]
    NoProvider,
    #[error("no active wallet session")]
    NoSession,
    #[error("wallet connection failed: {0}")]
    Connection(String),
    #[error("transaction rejected by wallet: {0}")]
    Rejected(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("transaction reverted{}", .0.as_deref().map(|reason| format!(": {reason}")).unwrap_or_default())]
    Reverted(Option<String>),
    #[error("network error: {0}")]
    Network(String),
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
    #[error("read failed: {0}")]
    Read(String),
}

impl DappError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConfigured(_) => ErrorKind::Configuration,
            Self::InvalidAmount(_) | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::WalletNotConnected | Self::NoProvider | Self::NoSession | Self::Connection(_) => {
                ErrorKind::Connection
            }
            Self::Rejected(_)
            | Self::InsufficientFunds(_)
            | Self::Reverted(_)
            | Self::Network(_)
            | Self::TransactionFailed(_) => ErrorKind::Transaction,
            Self::Read(_) => ErrorKind::Read,
        }
    }

    /// A provider failure while sending a write.
    pub fn from_write(err: ProviderError) -> Self {
        match err {
            ProviderError::UserRejected(message) => Self::Rejected(message),
            ProviderError::InsufficientFunds(message) => Self::InsufficientFunds(message),
            ProviderError::Reverted(reason) => Self::Reverted(reason),
            ProviderError::Network(message) => Self::Network(message),
            ProviderError::Unsupported(message) | ProviderError::Other(message) => {
                Self::TransactionFailed(message)
            }
        }
    }

    /// A provider failure during connect, disconnect or chain switch.
    pub fn from_connection(err: ProviderError) -> Self {
        Self::Connection(err.to_string())
    }

    pub fn from_read(err: impl std::fmt::Display) -> Self {
        Self::Read(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            DappError::NotConfigured(ContractName::CourseManager).to_string(),
            "CourseManager contract not configured for this chain"
        );
        assert_eq!(
            DappError::from(AmountError::NotPositive).to_string(),
            "invalid amount: amount must be greater than zero"
        );
        assert_eq!(DappError::Reverted(None).to_string(), "transaction reverted");
        assert_eq!(
            DappError::Reverted(Some("already purchased".into())).to_string(),
            "transaction reverted: already purchased"
        );
    }

    #[test]
    fn provider_errors_keep_their_message() {
        let err = DappError::from_write(ProviderError::UserRejected("User denied".into()));
        assert_eq!(err.to_string(), "transaction rejected by wallet: User denied");
        assert_eq!(err.kind(), ErrorKind::Transaction);

        let err = DappError::from_write(ProviderError::Reverted(Some("incorrect payment".into())));
        assert_eq!(err, DappError::Reverted(Some("incorrect payment".into())));
        assert_eq!(
            DappError::from_connection(ProviderError::UserRejected("nope".into())).kind(),
            ErrorKind::Connection
        );
    }
}
