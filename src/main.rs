//! Chirp firmware main entry point.
//!
//! Wires the adapters to the hexagonal core and runs the cooperative loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SharedBus<I2cDriver>  LogEventSink  NvsAdapter  SystemClock │
//! │  (RegisterBus)         (EventSink)   (Config+NVS) (Clock)    │
//! │                                                              │
//! │  console (AppCommand queue, drained by the loop)             │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              ChirpService (pure logic)                 │  │
//! │  │  Driver · Discovery · Scheduler (delegate-driven)      │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use chirp::adapters::console;
use chirp::adapters::i2c_bus::SharedBus;
use chirp::adapters::log_sink::LogEventSink;
use chirp::adapters::nvs::NvsAdapter;
use chirp::adapters::time::SystemClock;
use chirp::app::ports::ConfigPort;
use chirp::app::service::ChirpService;
use chirp::config::ChirpConfig;
use chirp::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Chirp v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {e}"))?;
    let config = nvs.load().unwrap_or_else(|e| {
        warn!("Stored config unusable ({}), using defaults", e);
        ChirpConfig::default()
    });

    // ── 3. I2C bus ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    // SAFETY: the pin numbers come from `pins` and are not claimed elsewhere.
    let (sda, scl) = unsafe {
        (
            AnyIOPin::new(pins::I2C_SDA_GPIO),
            AnyIOPin::new(pins::I2C_SCL_GPIO),
        )
    };
    let i2c_config = I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ));
    let i2c = I2cDriver::new(peripherals.i2c0, sda, scl, &i2c_config)?;
    let bus: SharedBus<NoopRawMutex, _, _> = SharedBus::new(i2c, FreeRtos);

    // ── 4. Component setup ────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut service = match ChirpService::setup(&config, bus, FreeRtos, &nvs, &mut sink) {
        Ok(s) => s,
        Err(e) => {
            // Configuration errors are fatal: nothing gets polled.
            error!("Chirp setup failed: {}, halting", e);
            loop {
                FreeRtos::delay_ms(1000);
            }
        }
    };

    // ── 5. Console commands ───────────────────────────────────
    if let Err(e) = console::spawn_reader(&console::COMMANDS) {
        warn!("Console reader not started ({}); commands unavailable", e);
    }

    // ── 6. Main loop ──────────────────────────────────────────
    let clock = SystemClock::new();
    info!("System ready. Entering poll loop.");
    loop {
        while let Ok(cmd) = console::COMMANDS.try_receive() {
            if let Err(e) = service.handle_command(cmd, &mut nvs, &mut sink) {
                warn!("Command rejected: {}", e);
            }
        }
        service.tick(&clock, &mut sink);
        FreeRtos::delay_ms(pins::LOOP_PERIOD_MS);
    }
}
