//! Reader bring-up and the reconnect worker.

use homekey_hardware::{AnyNfcBus, FirmwareVersion, NfcBus, Result};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Probe the chip and configure it for polling.
///
/// The host interface must already be up (see [`NfcBus::begin`]).
pub(crate) async fn configure<B: NfcBus>(bus: &mut B) -> Result<FirmwareVersion> {
    let version = bus.firmware_version().await?;
    info!("Found chip {}", version);
    bus.sam_config().await?;
    bus.set_rf_field(0x02, 0x01).await?;
    bus.set_passive_activation_retries(0).await?;
    Ok(version)
}

/// Bring the reader back and hand the bus to whoever waits on `handback`.
///
/// Retries forever with `delay` between attempts; gives up only once the
/// waiting side is gone.
pub(crate) async fn reconnect(
    mut bus: AnyNfcBus,
    delay: Duration,
    handback: oneshot::Sender<AnyNfcBus>,
) {
    info!("Starting reconnecting reader");
    let mut attempts: u32 = 0;
    loop {
        if handback.is_closed() {
            debug!("Card loop gone, abandoning reconnect");
            return;
        }
        attempts += 1;
        let result = match bus.begin().await {
            Ok(()) => configure(&mut bus).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => {
                info!("Reader back after {} attempt(s)", attempts);
                if handback.send(bus).is_err() {
                    debug!("Card loop gone before the reader came back");
                }
                return;
            }
            Err(e) => {
                error!("Error establishing reader connection: {}", e);
                bus.stop().await;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homekey_hardware::mock::MockNfcBus;

    #[tokio::test(start_paused = true)]
    async fn test_configure_sequence() {
        let (mut bus, handle) = MockNfcBus::new();
        configure(&mut bus).await.unwrap();

        let stats = handle.stats();
        assert_eq!(stats.probe_calls, 1);
        assert_eq!(stats.sam_configs, 1);
        assert_eq!(stats.rf_fields, vec![(0x02, 0x01)]);
        assert_eq!(stats.passive_retries, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_retries_until_probe_succeeds() {
        let (bus, handle) = MockNfcBus::new();
        handle.fail_next_probes(3);
        let (tx, rx) = oneshot::channel();

        tokio::spawn(reconnect(AnyNfcBus::Mock(bus), Duration::from_millis(50), tx));
        assert!(rx.await.is_ok());

        let stats = handle.stats();
        assert_eq!(stats.begin_calls, 4);
        assert_eq!(stats.probe_failures, 3);
        assert_eq!(stats.stops, 3);
        assert_eq!(stats.sam_configs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_stops_when_receiver_dropped() {
        let (bus, handle) = MockNfcBus::new();
        handle.set_online(false);
        let (tx, rx) = oneshot::channel();

        let task = tokio::spawn(reconnect(AnyNfcBus::Mock(bus), Duration::from_millis(50), tx));
        tokio::time::sleep(Duration::from_millis(120)).await;
        drop(rx);

        task.await.unwrap();
        assert!(handle.stats().begin_calls >= 2);
    }
}
