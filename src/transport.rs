//! Serial receive dispatch.
//!
//! A serial driver that receives with idle-line detection hands each burst
//! to the device registered on that port. The registry is owned by the
//! caller and sized at compile time; nothing here is global.

use core::fmt;

/// A device that consumes bytes received on a serial port.
pub trait RxSink {
    fn on_data_received(&mut self, data: &[u8]);
}

impl<T: RxSink + ?Sized> RxSink for &mut T {
    fn on_data_received(&mut self, data: &[u8]) {
        (**self).on_data_received(data)
    }
}

/// Index of a registered device, returned by [`Registry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// Every slot is taken.
    Full,
    /// A device is already registered on this port.
    Duplicate,
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegisterError::Full => "serial registry is full",
            RegisterError::Duplicate => "port already has a device",
        })
    }
}

/// Up to `N` `(port handle, sink)` pairs.
pub struct Registry<H, S, const N: usize> {
    devices: [Option<(H, S)>; N],
    len: usize,
}

impl<H, S, const N: usize> Default for Registry<H, S, N>
where
    H: PartialEq,
    S: RxSink,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H, S, const N: usize> Registry<H, S, N>
where
    H: PartialEq,
    S: RxSink,
{
    pub fn new() -> Self {
        Self {
            devices: core::array::from_fn(|_| None),
            len: 0,
        }
    }

    /// Attach `sink` to the port identified by `handle`.
    pub fn register(&mut self, handle: H, sink: S) -> Result<DeviceId, RegisterError> {
        if self.iter().any(|(registered, _)| *registered == handle) {
            return Err(RegisterError::Duplicate);
        }
        let slot = self.devices.get_mut(self.len).ok_or(RegisterError::Full)?;
        *slot = Some((handle, sink));
        self.len += 1;
        Ok(DeviceId(self.len - 1))
    }

    /// Route a received burst to the sink on `handle`. Returns `false` when
    /// no device is registered on that port.
    pub fn dispatch(&mut self, handle: &H, data: &[u8]) -> bool {
        let device = self.devices[..self.len]
            .iter_mut()
            .flatten()
            .find(|(registered, _)| registered == handle);
        match device {
            Some((_, sink)) => {
                sink.on_data_received(data);
                true
            }
            None => false,
        }
    }

    pub fn sink(&self, id: DeviceId) -> Option<&S> {
        self.devices.get(id.0)?.as_ref().map(|(_, sink)| sink)
    }

    pub fn sink_mut(&mut self, id: DeviceId) -> Option<&mut S> {
        self.devices.get_mut(id.0)?.as_mut().map(|(_, sink)| sink)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn iter(&self) -> impl Iterator<Item = &(H, S)> {
        self.devices[..self.len].iter().flatten()
    }
}
