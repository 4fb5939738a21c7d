//! Embedded media: storage and placeholder substitution.

mod materialize;
mod store;
mod substitution;

pub use materialize::{MEDIA_FILE_MODE, MEDIA_URL_PREFIX, materialize, storage_file_name};
pub use store::{FsMediaStore, MediaStore};
pub use substitution::SubstitutionTable;
