//! GPIO / peripheral assignments for the Chirp sensor bus.
//!
//! Single source of truth: `main.rs` builds the I2C master from these
//! rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// I2C bus (Chirp sensors, 3.3 V with external 4.7 kΩ pull-ups)
// ---------------------------------------------------------------------------

/// I2C data line.
pub const I2C_SDA_GPIO: i32 = 21;
/// I2C clock line.
pub const I2C_SCL_GPIO: i32 = 22;

/// The Chirp's software I2C slave is unreliable above standard mode.
pub const I2C_FREQ_HZ: u32 = 100_000;

/// Main loop period; the scheduler decides when a cycle is actually due.
pub const LOOP_PERIOD_MS: u32 = 100;
