//! UART sink (ESP-IDF only).
//!
//! Blocking TX-only serial output. Wrap it in an
//! [`AsyncSink`](crate::AsyncSink) so interrupt handlers and fast tasks
//! never wait on the wire.
//!
//! # Hardware Setup
//!
//! ```text
//! ESP32-S3 GPIO6 (TX) ──────▶ USB-UART RX
//!                              └─▶ PC Serial Monitor
//! ```
//!
//! **WARNING**: GPIO6 conflicts with Octal PSRAM. Only use on Quad flash boards!

use esp_idf_svc::hal::gpio;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartTxDriver};
use esp_idf_svc::sys::EspError;

use crate::level::Level;
use crate::sink::Sink;

/// UART configuration for logging.
pub struct UartSinkConfig {
    pub baud_rate: u32,
    pub tx_pin: u8,
}

impl Default for UartSinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            tx_pin: 6, // GPIO6 - UART TX (Quad flash, GPIO6 free for UART)
        }
    }
}

/// Initialize UART1 TX-only for logging output.
pub fn init_uart<'d>(
    uart: impl Peripheral<P = uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    config: &UartSinkConfig,
) -> Result<UartTxDriver<'d>, EspError> {
    let uart_config = uart::config::Config::default()
        .baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

/// Sink writing records to a UART TX driver.
pub struct UartSink<'d> {
    uart: UartTxDriver<'d>,
}

impl<'d> UartSink<'d> {
    pub fn new(uart: UartTxDriver<'d>) -> Self {
        Self { uart }
    }

    pub fn into_inner(self) -> UartTxDriver<'d> {
        self.uart
    }
}

impl Sink for UartSink<'_> {
    fn on_write(&mut self, _level: Level, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            match self.uart.write(bytes) {
                Ok(0) | Err(_) => return,
                Ok(n) => bytes = &bytes[n..],
            }
        }
    }
}
