mod store;

pub use store::{strip_json_comments, JsonStore, GLOBAL_DIR_NAME, PROJECT_DIR_NAME};
