//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements   | Connects to                    |
//! |------------|--------------|--------------------------------|
//! | `console`  | AppCommand   | UART console (inbound)         |
//! | `i2c_bus`  | RegisterBus  | any `embedded-hal` I2C master  |
//! | `log_sink` | EventSink    | Serial log output              |
//! | `nvs`      | ConfigPort   | NVS / in-memory store          |
//! |            | StoragePort  |                                |
//! | `time`     | Clock        | ESP32 system timer             |

pub mod console;
pub mod i2c_bus;
pub mod log_sink;
pub mod nvs;
pub mod time;
