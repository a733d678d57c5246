//! sinklog demo.
//!
//! Host: records from several threads go through the `log` facade into a
//! colored stdout sink behind an [`AsyncSink`]. Lines read from stdin are
//! console commands (`help`, `level NET debug`, `show`, ...).
//!
//! ESP-IDF: the same pipeline on UART1 / GPIO6 with an interrupt-aware
//! adapter and millisecond timestamps.
//!
//! Usage: `sinklog-demo [directives]`, e.g. `sinklog-demo warning,NET=debug`.

use std::sync::Arc;

use sinklog::{bridge, AsyncSink, AsyncSinkConfig, Logger};

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::io::{self, BufRead, Write};
    use std::thread;
    use std::time::Duration;

    use sinklog::{console, ColorSink, WriterSink};

    let stdout = Arc::new(AsyncSink::spawn(
        ColorSink::new(WriterSink::stdout()),
        AsyncSinkConfig::default(),
    )?);

    let mut logger = Logger::new().with_time_source(uptime_ms);
    logger.registry_mut().add_global_sink(Box::new(Arc::clone(&stdout)));
    if let Some(directives) = std::env::args().nth(1) {
        logger.registry_mut().apply_directives(&directives)?;
    }

    let bridge = bridge::install(logger)?;
    log::info!(target: sinklog::ROOT_TAG, "{}", sinklog::VERSION);

    let workers: Vec<_> = ["NET", "USB", "APP"]
        .into_iter()
        .map(|tag| {
            thread::spawn(move || {
                for i in 0..5 {
                    log::debug!(target: tag, "tick {}", i);
                    log::warn!(target: tag, "tock {}", i);
                    thread::sleep(Duration::from_millis(5));
                }
            })
        })
        .collect();
    for worker in workers {
        let _ = worker.join();
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut out = String::new();
        let result = bridge
            .with_logger(|l| console::execute(&console::parse_line(&line), l.registry_mut(), &mut out));
        if let Some(Err(e)) = result {
            out = format!("{}\n", e);
        }
        io::stdout().write_all(out.as_bytes())?;
        log::info!(target: "console", "{}", line);
    }

    // Let the consumer drain what is queued, then stop it.
    thread::sleep(AsyncSinkConfig::default().refresh_period * 5);
    let dropped = stdout.dropped();
    stdout.shutdown();
    if dropped != 0 {
        eprintln!("{} records dropped at exit", dropped);
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn uptime_ms() -> u32 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u32
}

#[cfg(target_os = "espidf")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use esp_idf_svc::hal::peripherals::Peripherals;
    use sinklog::uart_sink::{init_uart, UartSink, UartSinkConfig};
    use sinklog::{logger::esp_timer_ms, ColorSink};

    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();

    let peripherals = Peripherals::take()?;
    let uart = init_uart(
        peripherals.uart1,
        peripherals.pins.gpio6,
        &UartSinkConfig::default(),
    )?;

    let serial = Arc::new(AsyncSink::spawn(
        ColorSink::new(UartSink::new(uart)).with_bell(),
        AsyncSinkConfig::default(),
    )?);

    let mut logger = Logger::new().with_time_source(esp_timer_ms);
    logger.registry_mut().add_global_sink(Box::new(serial));
    bridge::install(logger)?;

    log::info!(target: sinklog::ROOT_TAG, "{}", sinklog::VERSION);

    let mut beat = 0u32;
    loop {
        log::info!(target: "APP", "heartbeat {}", beat);
        beat = beat.wrapping_add(1);
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}
