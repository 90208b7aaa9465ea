//! Mock addressable pixel.

use crate::{Result, traits::PixelDriver};
use homekey_core::{PixelType, Rgb};
use std::sync::{Arc, Mutex};

/// Recorded pixel operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelEvent {
    Show {
        pin: u8,
        pixel_type: PixelType,
        color: Rgb,
    },
    Off {
        pin: u8,
    },
}

/// Mock pixel driver that records every call.
#[derive(Debug)]
pub struct MockPixel {
    events: Arc<Mutex<Vec<PixelEvent>>>,
}

impl MockPixel {
    pub fn new() -> (Self, MockPixelHandle) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: Arc::clone(&events),
            },
            MockPixelHandle { events },
        )
    }

    fn record(&self, event: PixelEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl PixelDriver for MockPixel {
    fn show(&self, pin: u8, pixel_type: PixelType, color: Rgb) -> Result<()> {
        self.record(PixelEvent::Show {
            pin,
            pixel_type,
            color,
        });
        Ok(())
    }

    fn off(&self, pin: u8) -> Result<()> {
        self.record(PixelEvent::Off { pin });
        Ok(())
    }
}

/// Inspection handle for [`MockPixel`].
#[derive(Debug, Clone)]
pub struct MockPixelHandle {
    events: Arc<Mutex<Vec<PixelEvent>>>,
}

impl MockPixelHandle {
    pub fn events(&self) -> Vec<PixelEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Colors shown so far, in order.
    pub fn colors(&self) -> Vec<Rgb> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PixelEvent::Show { color, .. } => Some(color),
                PixelEvent::Off { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_show_and_off() {
        let (pixel, handle) = MockPixel::new();
        pixel.show(27, PixelType::Grb, Rgb::new(0, 255, 0)).unwrap();
        pixel.off(27).unwrap();

        assert_eq!(handle.colors(), vec![Rgb::new(0, 255, 0)]);
        assert_eq!(handle.events()[1], PixelEvent::Off { pin: 27 });
    }
}
