//! Wallet session lifecycle.
//!
//! `WalletManager` is the only writer of the session. Everything else reads
//! it through [`WalletManager::state`] or follows changes through
//! [`WalletManager::subscribe`].

use alloy_primitives::Address;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{info, warn};
use yd_api_types::{ChainId, TokenAmount};
use yd_chain_client::{ProviderRegistry, WalletProvider};

use crate::DappError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSession {
    pub address: Address,
    pub chain_id: ChainId,
    pub connector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalletState {
    pub session: Option<WalletSession>,
    pub connecting: bool,
    pub disconnecting: bool,
    pub last_error: Option<String>,
}

impl WalletState {
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn address(&self) -> Option<Address> {
        self.session.as_ref().map(|s| s.address)
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.session.as_ref().map(|s| s.chain_id)
    }
}

pub struct WalletManager {
    registry: ProviderRegistry,
    active: RwLock<Option<Arc<dyn WalletProvider>>>,
    state: watch::Sender<WalletState>,
    default_chain: ChainId,
}

impl WalletManager {
    pub fn new(registry: ProviderRegistry, default_chain: ChainId) -> Self {
        let (state, _) = watch::channel(WalletState::default());
        Self {
            registry,
            active: RwLock::new(None),
            state,
            default_chain,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> WalletState {
        self.state.borrow().clone()
    }

    pub fn default_chain(&self) -> ChainId {
        self.default_chain
    }

    /// Chain the app is looking at: the session's chain, or the default
    /// chain while disconnected.
    pub fn current_chain(&self) -> ChainId {
        self.state.borrow().chain_id().unwrap_or(self.default_chain)
    }

    pub async fn active_provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.active.read().await.clone()
    }

    /// Connects through the injected provider if one is registered,
    /// otherwise the first available one.
    pub async fn connect(&self) -> Result<WalletSession, DappError> {
        if let Some(session) = self.state.borrow().session.clone() {
            return Ok(session);
        }
        let Some(provider) = self.registry.preferred() else {
            return Err(self.fail(DappError::NoProvider));
        };

        self.state.send_modify(|s| {
            s.connecting = true;
            s.last_error = None;
        });

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => return Err(self.fail(DappError::from_connection(err))),
        };
        let Some(address) = accounts.first().copied() else {
            return Err(self.fail(DappError::Connection("wallet returned no accounts".into())));
        };
        let chain_id = match provider.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(err) => return Err(self.fail(DappError::from_connection(err))),
        };

        let session = WalletSession {
            address,
            chain_id,
            connector: provider.id().to_owned(),
        };
        *self.active.write().await = Some(provider);
        self.state.send_modify(|s| {
            s.session = Some(session.clone());
            s.connecting = false;
        });
        info!("wallet {} connected on chain {} via {}", address, chain_id, session.connector);
        Ok(session)
    }

    /// Tears the session down. Without a session this only reports
    /// "no active wallet session".
    pub async fn disconnect(&self) -> Result<(), DappError> {
        let Some(provider) = self.active_provider().await else {
            return Err(self.report(DappError::NoSession));
        };
        if !self.state.borrow().is_connected() {
            return Err(self.report(DappError::NoSession));
        }

        self.state.send_modify(|s| {
            s.disconnecting = true;
            s.last_error = None;
        });
        if let Err(err) = provider.disconnect().await {
            let err = DappError::from_connection(err);
            self.state.send_modify(|s| {
                s.disconnecting = false;
                s.last_error = Some(err.to_string());
            });
            return Err(err);
        }

        *self.active.write().await = None;
        self.state.send_modify(|s| {
            s.session = None;
            s.disconnecting = false;
        });
        info!("wallet disconnected");
        Ok(())
    }

    /// Asks the wallet to switch networks and replaces the session with
    /// one on the new chain.
    pub async fn switch_chain(&self, chain: ChainId) -> Result<WalletSession, DappError> {
        let Some(provider) = self.active_provider().await else {
            return Err(self.report(DappError::WalletNotConnected));
        };
        if let Err(err) = provider.switch_chain(chain).await {
            return Err(self.report(DappError::from_connection(err)));
        }
        let chain_id = match provider.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(err) => return Err(self.report(DappError::from_connection(err))),
        };
        self.chain_changed(chain_id)
            .ok_or_else(|| self.report(DappError::WalletNotConnected))
    }

    /// Provider event: the account list changed. An empty list ends the
    /// session.
    pub async fn accounts_changed(&self, accounts: &[Address]) -> Option<WalletSession> {
        match accounts.first().copied() {
            Some(address) => {
                let mut updated = None;
                self.state.send_modify(|s| {
                    if let Some(session) = s.session.as_mut() {
                        session.address = address;
                        updated = Some(session.clone());
                    }
                });
                updated
            }
            None => {
                *self.active.write().await = None;
                self.state.send_modify(|s| s.session = None);
                info!("wallet locked or all accounts removed");
                None
            }
        }
    }

    /// Provider event: the wallet moved to another chain.
    pub fn chain_changed(&self, chain_id: ChainId) -> Option<WalletSession> {
        let mut updated = None;
        self.state.send_modify(|s| {
            if let Some(session) = s.session.as_mut() {
                session.chain_id = chain_id;
                updated = Some(session.clone());
            }
        });
        if updated.is_some() {
            info!("wallet switched to chain {}", chain_id);
        }
        updated
    }

    /// Native balance of the connected account; `None` while disconnected.
    pub async fn native_balance(&self) -> Result<Option<TokenAmount>, DappError> {
        let Some(address) = self.state.borrow().address() else {
            return Ok(None);
        };
        let Some(provider) = self.active_provider().await else {
            return Ok(None);
        };
        let balance = provider
            .get_balance(address)
            .await
            .map_err(DappError::from_read)?;
        Ok(Some(TokenAmount::from_base_units(balance)))
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.last_error = None);
    }

    fn fail(&self, err: DappError) -> DappError {
        warn!("wallet connect failed: {}", err);
        self.state.send_modify(|s| {
            s.connecting = false;
            s.last_error = Some(err.to_string());
        });
        err
    }

    fn report(&self, err: DappError) -> DappError {
        warn!("wallet: {}", err);
        self.state.send_modify(|s| s.last_error = Some(err.to_string()));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yd_chain_client::ConnectorKind;
    use yd_chain_memory::{MemoryChain, MemoryChainConfig};
    use yd_contracts::AddressBook;

    fn chain(id: &str, kind: ConnectorKind) -> Arc<MemoryChain> {
        Arc::new(
            MemoryChain::new(MemoryChainConfig::hardhat(&AddressBook::builtin())).with_identity(id, kind),
        )
    }

    fn manager(providers: Vec<Arc<MemoryChain>>) -> WalletManager {
        let mut registry = ProviderRegistry::default();
        for provider in providers {
            registry.register(provider);
        }
        WalletManager::new(registry, ChainId::HARDHAT)
    }

    #[tokio::test]
    async fn connect_prefers_injected_and_publishes_state() {
        let wc = chain("walletconnect", ConnectorKind::WalletConnect);
        let injected = chain("metamask", ConnectorKind::Injected);
        let wallet = manager(vec![wc, injected.clone()]);
        let mut rx = wallet.subscribe();

        let session = wallet.connect().await.unwrap();
        assert_eq!(session.connector, "metamask");
        assert_eq!(session.address, injected.accounts()[0]);
        assert_eq!(session.chain_id, ChainId::HARDHAT);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().session, Some(session));
    }

    #[tokio::test]
    async fn connect_without_provider_reports_message() {
        let wallet = manager(vec![]);
        assert_eq!(wallet.connect().await.unwrap_err(), DappError::NoProvider);
        assert_eq!(wallet.state().last_error.as_deref(), Some("no wallet provider found"));
        assert!(!wallet.state().connecting);
    }

    #[tokio::test]
    async fn rejected_connect_keeps_provider_message() {
        let provider = chain("injected", ConnectorKind::Injected);
        provider.reject_connect(true).await;
        let wallet = manager(vec![provider]);
        let err = wallet.connect().await.unwrap_err();
        assert_eq!(err.to_string(), "wallet connection failed: User rejected the request.");
        assert!(wallet.state().session.is_none());
    }

    #[tokio::test]
    async fn disconnect_without_session_is_reported_not_fatal() {
        let wallet = manager(vec![chain("injected", ConnectorKind::Injected)]);
        assert_eq!(wallet.disconnect().await.unwrap_err(), DappError::NoSession);

        wallet.connect().await.unwrap();
        wallet.disconnect().await.unwrap();
        assert!(!wallet.state().is_connected());
        assert_eq!(wallet.current_chain(), ChainId::HARDHAT);
    }

    #[tokio::test]
    async fn chain_switch_and_account_events_replace_session() {
        let provider = chain("injected", ConnectorKind::Injected);
        let wallet = manager(vec![provider.clone()]);
        wallet.connect().await.unwrap();

        let session = wallet.switch_chain(ChainId::SEPOLIA).await.unwrap();
        assert_eq!(session.chain_id, ChainId::SEPOLIA);
        assert_eq!(wallet.current_chain(), ChainId::SEPOLIA);

        let err = wallet.switch_chain(ChainId(56)).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Connection);
        assert_eq!(wallet.current_chain(), ChainId::SEPOLIA);

        let second = provider.accounts()[1];
        assert_eq!(wallet.accounts_changed(&[second]).await.unwrap().address, second);
        assert!(wallet.accounts_changed(&[]).await.is_none());
        assert!(!wallet.state().is_connected());
    }

    #[tokio::test]
    async fn native_balance_only_when_connected() {
        let wallet = manager(vec![chain("injected", ConnectorKind::Injected)]);
        assert_eq!(wallet.native_balance().await.unwrap(), None);
        wallet.connect().await.unwrap();
        assert_eq!(
            wallet.native_balance().await.unwrap(),
            Some(TokenAmount::from_tokens(10_000))
        );
    }
}
