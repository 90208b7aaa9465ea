//! Addressable pixel worker.

use crate::indicator::millis;
use crate::queue::SharedReceiver;
use crate::worker::recv_polling;
use homekey_core::constants::is_pin_assigned;
use homekey_core::{ConfigReader, FeedbackEvent};
use homekey_hardware::PixelDriver;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct PixelWorker {
    pixel: Arc<dyn PixelDriver>,
    config: ConfigReader,
    poll: Duration,
}

impl PixelWorker {
    pub fn new(pixel: Arc<dyn PixelDriver>, config: ConfigReader, poll: Duration) -> Self {
        Self {
            pixel,
            config,
            poll,
        }
    }

    /// Serve the queue until a stop message arrives.
    pub async fn run(self, queue: SharedReceiver<FeedbackEvent>) {
        let mut rx = queue.lock().await;
        debug!("Pixel worker started");
        while let Some(event) = recv_polling(&mut rx, self.poll).await {
            if event == FeedbackEvent::Stop {
                break;
            }
            self.handle(event).await;
        }
        info!("Pixel worker stopped");
    }

    /// Show the color for `event`, hold it, then turn the pixel off.
    pub async fn handle(&self, event: FeedbackEvent) {
        let (pin, pixel_type, color, hold) = match self.config.with(|c| {
            let pixel_type = c.pixel_type();
            match event {
                FeedbackEvent::Fail => Some((
                    c.nfc_neopixel_pin,
                    pixel_type,
                    c.neopixel_failure_color,
                    c.neopixel_fail_time,
                )),
                FeedbackEvent::Success => Some((
                    c.nfc_neopixel_pin,
                    pixel_type,
                    c.neopixel_success_color,
                    c.neopixel_success_time,
                )),
                FeedbackEvent::AltAction | FeedbackEvent::Stop => None,
            }
        }) {
            Some(params) => params,
            None => {
                debug!("Pixel worker ignores {:?}", event);
                return;
            }
        };
        if !is_pin_assigned(pin) {
            return;
        }

        debug!(
            "{:?} PIXEL {}:{},{},{}",
            event, pin, color.r, color.g, color.b
        );
        if let Err(e) = self.pixel.show(pin, pixel_type, color) {
            warn!("Failed to light pixel on pin {}: {}", pin, e);
        }
        tokio::time::sleep(millis(hold)).await;
        if let Err(e) = self.pixel.off(pin) {
            warn!("Failed to turn pixel on pin {} off: {}", pin, e);
        }
    }
}
