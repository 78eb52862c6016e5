//! Keyboard device contract. A concrete PS/2 or USB-HID driver would
//! implement this; none ships here.

pub trait KeyboardDevice: Send + Sync {
    /// Returns the next pending scancode, or `None` if the queue is
    /// empty. Never blocks.
    fn poll_scancode(&self) -> Option<u8>;
}
