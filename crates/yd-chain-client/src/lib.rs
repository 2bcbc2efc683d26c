use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use yd_api_types::{ChainId, TxHash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorKind {
    Injected,
    WalletConnect,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    UserRejected(String),
    #[error("{0}")]
    InsufficientFunds(String),
    #[error("{}", .0.as_deref().unwrap_or("execution reverted"))]
    Reverted(Option<String>),
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Wallet-side boundary: account access, signing, and transport for
/// contract reads and writes.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> ConnectorKind;
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;
    async fn chain_id(&self) -> Result<ChainId, ProviderError>;
    async fn switch_chain(&self, chain: ChainId) -> Result<(), ProviderError>;
    async fn disconnect(&self) -> Result<(), ProviderError>;
    async fn sign_message(&self, account: Address, message: &str) -> Result<String, ProviderError>;
    /// Resolves once the wallet accepted the transaction.
    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, ProviderError>;
    async fn call(&self, req: CallRequest) -> Result<Bytes, ProviderError>;
    async fn get_balance(&self, account: Address) -> Result<U256, ProviderError>;
}

/// Available wallet providers in registration order.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn WalletProvider>>,
}

impl ProviderRegistry {
    pub fn register(&mut self, provider: Arc<dyn WalletProvider>) {
        self.providers.retain(|existing| existing.id() != provider.id());
        self.providers.push(provider);
    }

    pub fn provider(&self, id: &str) -> Option<Arc<dyn WalletProvider>> {
        self.providers.iter().find(|p| p.id() == id).cloned()
    }

    /// The injected provider if one is registered, otherwise the first one.
    pub fn preferred(&self) -> Option<Arc<dyn WalletProvider>> {
        self.providers
            .iter()
            .find(|p| p.kind() == ConnectorKind::Injected)
            .or_else(|| self.providers.first())
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        id: &'static str,
        kind: ConnectorKind,
    }

    #[async_trait]
    impl WalletProvider for Stub {
        fn id(&self) -> &str {
            self.id
        }
        fn kind(&self) -> ConnectorKind {
            self.kind
        }
        async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
            Ok(vec![])
        }
        async fn chain_id(&self) -> Result<ChainId, ProviderError> {
            Ok(ChainId::HARDHAT)
        }
        async fn switch_chain(&self, _chain: ChainId) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn disconnect(&self) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn sign_message(&self, _account: Address, _message: &str) -> Result<String, ProviderError> {
            Ok(String::new())
        }
        async fn send_transaction(&self, _tx: TxRequest) -> Result<TxHash, ProviderError> {
            Ok(TxHash::ZERO)
        }
        async fn call(&self, _req: CallRequest) -> Result<Bytes, ProviderError> {
            Ok(Bytes::new())
        }
        async fn get_balance(&self, _account: Address) -> Result<U256, ProviderError> {
            Ok(U256::ZERO)
        }
    }

    fn stub(id: &'static str, kind: ConnectorKind) -> Arc<dyn WalletProvider> {
        Arc::new(Stub { id, kind })
    }

    #[test]
    fn preferred_picks_injected_then_first() {
        let mut registry = ProviderRegistry::default();
        assert!(registry.preferred().is_none());

        registry.register(stub("walletconnect", ConnectorKind::WalletConnect));
        registry.register(stub("other", ConnectorKind::Other));
        assert_eq!(registry.preferred().unwrap().id(), "walletconnect");

        registry.register(stub("metamask", ConnectorKind::Injected));
        assert_eq!(registry.preferred().unwrap().id(), "metamask");
    }

    #[test]
    fn registering_same_id_replaces() {
        let mut registry = ProviderRegistry::default();
        registry.register(stub("a", ConnectorKind::Other));
        registry.register(stub("a", ConnectorKind::Injected));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.provider("a").unwrap().kind(), ConnectorKind::Injected);
    }

    #[test]
    fn reverted_without_reason_has_default_message() {
        assert_eq!(ProviderError::Reverted(None).to_string(), "execution reverted");
        assert_eq!(
            ProviderError::Reverted(Some("course not found".into())).to_string(),
            "course not found"
        );
    }
}
