use std::fmt;

/// Handle assigned to each registered system.
///
/// It is the system's position in registration order and stays valid
/// until the engine is torn down.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Registration index backing this handle.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}
