//! Fuzz target: `PulseProfile::duty_at`
//!
//! Builds a profile and a sample time from raw bytes (any f64 bit pattern,
//! including NaN, infinities and negatives) and asserts that the duty
//! computation never panics and always yields a percentage.
//!
//! cargo fuzz run fuzz_pulse_profile

#![no_main]

use explorerhat::PulseProfile;
use libfuzzer_sys::fuzz_target;

fn f64_at(data: &[u8], i: usize) -> f64 {
    let mut buf = [0u8; 8];
    if let Some(chunk) = data.get(i * 8..i * 8 + 8) {
        buf.copy_from_slice(chunk);
    }
    f64::from_le_bytes(buf)
}

fuzz_target!(|data: &[u8]| {
    let p = PulseProfile::new(f64_at(data, 0), f64_at(data, 1), f64_at(data, 2), f64_at(data, 3));
    let t = f64_at(data, 4);

    assert!(p.duty_at(t) <= 100);
    assert!(p.duty_in_cycle(t) <= 100);

    if p.is_valid() {
        let _ = p.phase_at(t.rem_euclid(p.period()));
    }
});
