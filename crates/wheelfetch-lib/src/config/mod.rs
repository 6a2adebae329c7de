mod loader;
mod model;

pub use loader::load_config;
pub use model::{
    Config, DEFAULT_CONCURRENCY, DEFAULT_DOWNLOAD_DIR, DEFAULT_INDEX_URL, DEFAULT_PACKAGE,
};
