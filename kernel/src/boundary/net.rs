//! Network device contract. A concrete E1000/VirtIO-net driver would
//! implement this; none ships here.

use crate::lib::Result;

pub trait NetworkDevice: Send + Sync {
    fn mac_address(&self) -> [u8; 6];
    fn send_frame(&self, frame: &[u8]) -> Result<()>;
    /// Copies the next queued frame into `buf`, returning its length, or
    /// `0` if none is queued.
    fn receive_frame(&self, buf: &mut [u8]) -> Result<usize>;
}
