pub mod manifest;
pub mod naming;
pub mod object_store;

pub use manifest::{ManifestPatch, ManifestStore};
pub use naming::Category;
pub use object_store::ObjectStore;
