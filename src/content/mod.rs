mod storage;

pub use storage::{ContentRef, ContentStorage, ContentStorageError, MAX_UPLOAD_SIZE, is_allowed_content_type};
