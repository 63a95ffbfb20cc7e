//! # Package References
//!
//! The declarative model of a workbook's NuGet dependencies: package ids, version
//! ranges and the per-page reference list. Resolving references against a feed is
//! the job of an external resolver; this module only models what the manifest
//! declares.

pub mod range;
pub mod reference;
pub mod version;

pub use range::{FloatingVersion, LowerBound, VersionRange};
pub use reference::{PackageId, PackageReference, PackageReferenceList};
pub use version::NuGetVersion;
