//! Deck model identification database
//!
//! Maps the two-byte device type returned by a 9-pin device type request to
//! a manufacturer/model pair. The vendor documentation for these codes is
//! internally inconsistent across firmware generations (the same code shows
//! up against different models in different manuals), so identification is
//! best-effort metadata only; nothing downstream may treat it as a
//! correctness-critical path.

/// An identified deck or cart model
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeckModel {
    /// Manufacturer name
    pub manufacturer: String,
    /// Model designation
    pub model: String,
}

impl DeckModel {
    fn new(manufacturer: &str, model: &str) -> Self {
        Self {
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
        }
    }
}

/// Static lookup over the known device type codes
pub struct DeckDatabase;

impl DeckDatabase {
    /// Look up a model by its two-byte device type
    ///
    /// Returns `None` for unknown codes; callers fall back to showing the
    /// raw bytes.
    pub fn by_device_type(b0: u8, b1: u8) -> Option<DeckModel> {
        let (manufacturer, model) = match (b0, b1) {
            (0x20, 0x24) => ("Sony", "BVW-70"),
            (0x20, 0x25) => ("Sony", "BVW-75"),
            (0x20, 0x46) => ("Sony", "PVW-2800"),
            (0x21, 0x10) => ("Sony", "DVW-A500"),
            (0x21, 0x20) => ("Sony", "DVW-500"),
            (0x22, 0x11) => ("Sony", "UVW-1800"),
            (0xF0, 0x10) => ("Sony", "FlexiCart FC-1"),
            (0xF0, 0x11) => ("Sony", "FlexiCart FC-2"),
            _ => return None,
        };
        Some(DeckModel::new(manufacturer, model))
    }
}
