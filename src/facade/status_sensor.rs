use crate::prelude::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

use crate::protocol::MachineStatus;

/// Text sensor publishing the machine's status in human-readable form.
pub struct StatusTextSensor {
    shared: Arc<SensorShared>,
}

pub(crate) struct SensorShared {
    text: watch::Sender<String>,
    refreshes: AtomicUsize,
}

/// Renders a status for display. Total over every status.
pub fn render(status: MachineStatus) -> String {
    match status {
        MachineStatus::Unknown => "Unknown".to_owned(),
        MachineStatus::Off => "Off".to_owned(),
        MachineStatus::Idle => "Idle".to_owned(),
        MachineStatus::Heating => "Heating".to_owned(),
        MachineStatus::Brewing => "Brewing".to_owned(),
        MachineStatus::Cleaning => "Cleaning".to_owned(),
        MachineStatus::Descaling => "Descaling".to_owned(),
        MachineStatus::Error(code) => format!("Error {}", code),
        MachineStatus::LinkDown => "Link down".to_owned(),
    }
}

impl Default for StatusTextSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTextSensor {
    pub fn new() -> Self {
        let (text, _) = watch::channel(render(MachineStatus::Unknown));
        StatusTextSensor {
            shared: Arc::new(SensorShared {
                text,
                refreshes: AtomicUsize::new(0),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<SensorShared> {
        &self.shared
    }

    /// The text currently published.
    pub fn text(&self) -> String {
        self.shared.text.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.shared.text.subscribe()
    }

    /// How many times the controller has asked this sensor to refresh.
    pub fn refresh_count(&self) -> usize {
        self.shared.refreshes.load(Ordering::Relaxed)
    }
}

impl SensorShared {
    pub(crate) fn refresh(&self, status: MachineStatus) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let text = render(status);
        self.text.send_if_modified(|current| {
            if *current == text {
                false
            } else {
                *current = text;
                true
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(MachineStatus::Unknown, "Unknown")]
    #[case(MachineStatus::Off, "Off")]
    #[case(MachineStatus::Idle, "Idle")]
    #[case(MachineStatus::Heating, "Heating")]
    #[case(MachineStatus::Brewing, "Brewing")]
    #[case(MachineStatus::Cleaning, "Cleaning")]
    #[case(MachineStatus::Descaling, "Descaling")]
    #[case(MachineStatus::Error(12), "Error 12")]
    #[case(MachineStatus::LinkDown, "Link down")]
    fn renders(#[case] status: MachineStatus, #[case] text: &str) {
        assert_eq!(render(status), text);
    }

    #[test]
    fn refresh_publishes() {
        let sensor = StatusTextSensor::new();
        let mut rx = sensor.subscribe();
        assert_eq!(sensor.text(), "Unknown");
        sensor.shared.refresh(MachineStatus::Error(3));
        assert_eq!(*rx.borrow_and_update(), "Error 3");
        assert_eq!(sensor.text(), "Error 3");
        assert_eq!(sensor.refresh_count(), 1);
    }
}
