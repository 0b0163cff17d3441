//! ES3C28P board support: the board-specific layer of a voice-assistant
//! firmware.
//!
//! The Shenzhen ES3C28P pairs an ESP32-S3 with a 2.8" 240x320 SPI LCD, an
//! FT6x36 capacitive touch panel, an ES8311 audio codec, a boot button, a
//! battery sense divider and a single PWM status LED. This crate holds the
//! parts of the board support that have no platform dependency, testable on
//! any host with
//! `cargo test --lib --no-default-features --features board-es3c28p,ui`.
//! The firmware binaries (bare-metal esp-hal in `src/main.rs`, ESP-IDF in
//! `firmware-std/`) are thin consumers that bring the peripherals up and
//! hand the concrete drivers to these types.
//!
//! - `board`: pin map and tuning constants
//! - `bringup`: the ordered, fail-fast initialization contract
//! - `platform`: the [`platform::Board`] interface the application consumes
//! - `battery`, `led`, `backlight`, `touch`, `codec`: board components,
//!   generic over `embedded-hal` 1.0 traits
//! - `button`: boot-button click detection and click dispatch
//! - `protocol`, `comm`: NDJSON tool calls on the serial console
//! - `screen`: status screen drawing (`ui` feature)

#![cfg_attr(not(test), no_std)]

pub mod backlight;
pub mod battery;
pub mod board;
pub mod bringup;
pub mod button;
pub mod codec;
pub mod comm;
pub mod led;
pub mod platform;
pub mod protocol;
#[cfg(feature = "ui")]
pub mod screen;
pub mod touch;
