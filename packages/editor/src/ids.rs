use crate::node::NodeId;
use crc32fast::Hasher;

/// Derive a short, stable id prefix from a document/session name using CRC32
pub fn get_seed(name: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential node id allocator.
///
/// The counter only moves forward, so an id handed out once is never handed
/// out again even after the node that carried it is undone away.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(name: &str) -> Self {
        Self {
            seed: get_seed(name),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential ID
    pub fn next_id(&mut self) -> NodeId {
        self.count += 1;
        NodeId::new(format!("{}-{}", self.seed, self.count))
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.count
    }

    /// Advance past any id already minted with this seed, so a session
    /// opened on an existing tree never collides with it
    pub fn skip_past<'a>(&mut self, existing: impl IntoIterator<Item = &'a NodeId>) {
        let prefix = format!("{}-", self.seed);
        for id in existing {
            let Some(suffix) = id.as_str().strip_prefix(&prefix) else {
                continue;
            };
            if let Ok(n) = suffix.parse::<u64>() {
                self.count = self.count.max(n);
            }
        }
    }
}
