pub mod collab;
pub mod network;
pub mod peer;
pub mod store;

pub use collab::{ScriptedDiscovery, StaticAuthorizer};
pub use network::{ClientEngine, TestNetwork};
pub use peer::{TestEngine, TestPeer, fields};
pub use store::{RecordingStore, SharedStore, WriteCounts};
