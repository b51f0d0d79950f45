use std::{fmt, str::FromStr, sync::Arc};

use hashbrown::HashMap;

/// The target architecture of a graft. Selects which initial payload is
/// written to the peer as soon as the connection is up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    X86,
    X64,
    Aarch64,
}

impl Architecture {
    pub const ALL: [Architecture; 3] =
        [Architecture::X86, Architecture::X64, Architecture::Aarch64];

    pub fn name(&self) -> &'static str {
        match self {
            Architecture::X86 => "X86",
            Architecture::X64 => "X64",
            Architecture::Aarch64 => "AARCH64",
        }
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::X64
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown architecture '{0}'")]
pub struct UnknownArchitecture(pub String);

impl FromStr for Architecture {
    type Err = UnknownArchitecture;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::ALL
            .into_iter()
            .find(|arch| arch.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownArchitecture(s.to_owned()))
    }
}

/// Maps each architecture to the opaque bytes sent on connect.
///
/// The table never looks inside a payload. Every architecture starts out
/// with an empty payload; operators swap in real bytes with
/// [`PayloadTable::with_payload`].
#[derive(Clone, Debug)]
pub struct PayloadTable {
    payloads: HashMap<Architecture, Arc<[u8]>>,
}

impl PayloadTable {
    /// A table with no entries at all, not even empty payloads.
    pub fn empty() -> Self {
        Self {
            payloads: HashMap::new(),
        }
    }

    pub fn with_payload(
        mut self,
        arch: Architecture,
        payload: impl Into<Arc<[u8]>>,
    ) -> Self {
        self.payloads.insert(arch, payload.into());
        self
    }

    pub fn get(&self, arch: Architecture) -> Option<Arc<[u8]>> {
        self.payloads.get(&arch).cloned()
    }

    /// Registered architectures in a stable order.
    pub fn architectures(&self) -> Vec<Architecture> {
        let mut archs: Vec<_> = self.payloads.keys().copied().collect();
        archs.sort();
        archs
    }
}

impl Default for PayloadTable {
    fn default() -> Self {
        Architecture::ALL
            .into_iter()
            .fold(Self::empty(), |table, arch| {
                table.with_payload(arch, Vec::new())
            })
    }
}
