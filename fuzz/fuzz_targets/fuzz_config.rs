//! Fuzz target: configuration parsing and validation
//!
//! Feeds arbitrary bytes both as a JSON document and as a stored postcard
//! blob.  Neither path may panic, and anything that validates must
//! describe a usable poll plan.
//!
//! cargo fuzz run fuzz_config

#![no_main]

use chirp::config::ChirpConfig;
use chirp::sensors::DeviceSelector;
use libfuzzer_sys::fuzz_target;

fn check(cfg: &ChirpConfig) {
    if let Ok(plan) = cfg.validate() {
        assert!(plan.poll.scan_interval_ms >= 1000);
        assert!(plan.poll.ready_timeout_ms < plan.poll.scan_interval_ms);
        assert!(plan.poll.ready_poll_interval_ms >= 1);
        assert!(!plan.device_name.is_empty());
        assert!(plan.calibration.moisture_wet > plan.calibration.moisture_dry);
        match plan.selector {
            DeviceSelector::Fixed(a) => assert!(a.get() <= 0x7F),
            DeviceSelector::Range(r) => assert!(r.start() <= r.end()),
        }
    }
}

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = core::str::from_utf8(data) {
        if let Ok(cfg) = ChirpConfig::from_json(text) {
            check(&cfg);
        }
    }

    if let Ok(cfg) = postcard::from_bytes::<ChirpConfig>(data) {
        check(&cfg);
    }
});
