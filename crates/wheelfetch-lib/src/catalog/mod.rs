mod index;
mod resolver;
mod types;

pub use index::{PackageIndex, PyPiIndex, ReleaseFile, ReleaseFileDigests, WHEEL_PACKAGE_TYPE};
pub use resolver::{CatalogResolver, VersionSelector};
pub use types::{ArtifactDescriptor, Catalog};
