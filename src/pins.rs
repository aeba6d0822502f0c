//! GPIO / peripheral pin assignments for the Explorer HAT.
//!
//! Single source of truth: the board builder references this module rather
//! than hard-coding line numbers. Numbers are Broadcom (BCM) GPIO numbers
//! for the 40-pin header (A+/B+ and later).

// ---------------------------------------------------------------------------
// Onboard LEDs (above inputs 1–4)
// ---------------------------------------------------------------------------

pub const LED1_GPIO: u8 = 4;
pub const LED2_GPIO: u8 = 17;
pub const LED3_GPIO: u8 = 27;
pub const LED4_GPIO: u8 = 5;

// ---------------------------------------------------------------------------
// Outputs: ULN2003A Darlington array, sinking
// ---------------------------------------------------------------------------

pub const OUT1_GPIO: u8 = 6;
pub const OUT2_GPIO: u8 = 12;
pub const OUT3_GPIO: u8 = 13;
pub const OUT4_GPIO: u8 = 16;

// ---------------------------------------------------------------------------
// Inputs: 5 V tolerant buffered
// ---------------------------------------------------------------------------

pub const IN1_GPIO: u8 = 23;
pub const IN2_GPIO: u8 = 22;
pub const IN3_GPIO: u8 = 24;
pub const IN4_GPIO: u8 = 25;

// ---------------------------------------------------------------------------
// Motors: DRV8833PWP dual H-bridge (Pro only)
// ---------------------------------------------------------------------------

pub const M1_BACKWARD_GPIO: u8 = 19;
pub const M1_FORWARD_GPIO: u8 = 20;
pub const M2_BACKWARD_GPIO: u8 = 21;
pub const M2_FORWARD_GPIO: u8 = 26;

// ---------------------------------------------------------------------------
// Capacitive touch: CAP1208 channel for each printed pad
// ---------------------------------------------------------------------------

/// `(chip channel, pad number)` in board order: pads 1–4 are the numbered
/// buttons, 5–8 the crocodile-clip pads.
pub const TOUCH_CHANNELS: [(u8, u8); 8] = [
    (4, 1),
    (5, 2),
    (6, 3),
    (7, 4),
    (0, 5),
    (1, 6),
    (2, 7),
    (3, 8),
];

// ---------------------------------------------------------------------------
// Analog: ADS1015 single-ended channels (Pro only)
// ---------------------------------------------------------------------------

/// ADC channel for analog inputs 1–4 (wired in reverse order).
pub const ANALOG_CHANNELS: [u8; 4] = [3, 2, 1, 0];
