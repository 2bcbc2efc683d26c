//! App-wide broadcast signals between sibling views.

use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSignal {
    /// Balances (native, platform token, staking) should be re-read.
    BalanceRefresh,
    DisplayNameChanged(String),
}

#[derive(Debug, Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<AppSignal>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire and forget; returns how many subscribers saw the signal.
    pub fn publish(&self, signal: AppSignal) -> usize {
        match self.tx.send(signal) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(signal)) => {
                debug!("no subscribers for {:?}", signal);
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppSignal> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_receives_signals_in_order() {
        let bus = SignalBus::default();
        let mut nav = bus.subscribe();
        let mut profile = bus.subscribe();

        assert_eq!(bus.publish(AppSignal::DisplayNameChanged("Ada".into())), 2);
        bus.publish(AppSignal::BalanceRefresh);

        for rx in [&mut nav, &mut profile] {
            assert_eq!(rx.recv().await.unwrap(), AppSignal::DisplayNameChanged("Ada".into()));
            assert_eq!(rx.recv().await.unwrap(), AppSignal::BalanceRefresh);
        }
    }

    #[test]
    fn publishing_without_subscribers_is_not_an_error() {
        assert_eq!(SignalBus::new(0).publish(AppSignal::BalanceRefresh), 0);
    }
}
