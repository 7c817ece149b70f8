//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements     | Connects to                    |
//! |-----------------|----------------|--------------------------------|
//! | `hardware`      | ActuatorPort   | PCF8574 valve bank, pump relay |
//! | `log_sink`      | EventSink      | Serial log output              |
//! | `nvs`           | ConfigPort     | NVS / in-memory store          |
//! |                 | StoragePort    |                                |
//! | `program_store` | StepStorePort  | any StoragePort (postcard)     |
//! | `time`          | ClockPort      | ESP32 system timer, SNTP clock |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod program_store;
pub mod time;
