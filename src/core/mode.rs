//! File open modes.

use bitflags::bitflags;

bitflags! {
    /// Mode a store is opened with, also used as a capability mask by the
    /// registry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpenMode: u8 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const APPEND = 0b0100;
    }
}

impl OpenMode {
    /// True when the store accepts writes.
    #[inline]
    pub fn is_writable(self) -> bool {
        self.intersects(Self::WRITE | Self::APPEND)
    }
}
