// https://github.com/openjdk/jdk/blob/master/src/java.base/share/native/libjimage/imageFile.hpp

mod archive;
mod error;

pub use archive::{Archive, AttributeKind, Header, Index, Resource, Resources};
pub use error::JImageError;
