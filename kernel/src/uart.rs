//! Early console: a 16550 UART reachable before the heap or scheduler
//! exist. `log` and panic output both go through here.

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

const COM1: u16 = 0x3F8;

lazy_static! {
    static ref SERIAL: Mutex<SerialPort> = {
        let mut port = unsafe { SerialPort::new(COM1) };
        port.init();
        Mutex::new(port)
    };
}

/// Forces the lazy_static to run. Safe to call more than once.
pub fn init() {
    let _ = &*SERIAL;
}

pub fn console() -> spin::MutexGuard<'static, SerialPort> {
    SERIAL.lock()
}

/// Raw byte write used by the very earliest boot diagnostics, before
/// logging's level machinery is meaningful.
pub fn write_bytes(bytes: &[u8]) {
    use core::fmt::Write;
    let mut port = SERIAL.lock();
    for &b in bytes {
        let _ = port.write_char(b as char);
    }
}
