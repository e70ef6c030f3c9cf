//! Fuzz target: `TwinSync::apply_write`
//!
//! Parses arbitrary bytes as a desired-properties patch and applies every
//! member as a twin write.  Asserts that no write panics, every write is
//! acknowledged, and the alert level and altitude never leave their
//! validated ranges.
//!
//! cargo fuzz run fuzz_twin_write

#![no_main]

use co2monitor::alarm::AlarmMachine;
use co2monitor::config::{
    MAX_ALERT_LEVEL_PPM, MAX_ALTITUDE_M, MIN_ALERT_LEVEL_PPM, MIN_ALTITUDE_M,
};
use co2monitor::telemetry::Sampler;
use co2monitor::twin::{TwinSync, TwinWrite};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(Value::Object(patch)) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let mut twin = TwinSync::new("fuzz".into());
    let mut alarm = AlarmMachine::new(1000, 8_000);
    let mut sampler = Sampler::new(0);

    for (version, (name, value)) in patch.into_iter().enumerate() {
        let write = TwinWrite::new(&name, value, version as u32);
        let ack = twin.apply_write(&write, &mut alarm, &mut sampler);
        assert_eq!(ack.version, write.version);
        assert_eq!(ack.name, write.name);

        assert!((MIN_ALERT_LEVEL_PPM..=MAX_ALERT_LEVEL_PPM).contains(&alarm.threshold()));
        assert!((MIN_ALTITUDE_M..=MAX_ALTITUDE_M).contains(&sampler.altitude_m()));
    }
});
