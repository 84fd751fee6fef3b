pub mod assembler;
pub mod serialization;

pub use assembler::ChapterAssembler;
pub use serialization::{ManifestEntry, PackageManifest};
