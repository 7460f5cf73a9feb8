use easel_core::host::{FactValue, HostBridge};

/// Longest fact value logged in full.
const MAX_LOGGED: usize = 96;

/// A host that writes every fact and signal to the log.
#[derive(Default)]
pub struct LogHost;

impl HostBridge for LogHost {
    fn publish(&self, key: &str, value: FactValue) {
        let text = value.to_string();
        if text.len() > MAX_LOGGED {
            let cut = (0..=MAX_LOGGED)
                .rev()
                .find(|&i| text.is_char_boundary(i))
                .unwrap_or(0);
            log::info!("{key} = {}... ({} bytes)", &text[..cut], text.len());
        } else {
            log::info!("{key} = {text}");
        }
    }
    fn trigger(&self, signal: &str) {
        log::info!("signal: {signal}");
    }
}
