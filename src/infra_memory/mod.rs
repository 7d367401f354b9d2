mod session_cache_memory;
mod user_repo_memory;

pub use session_cache_memory::*;
pub use user_repo_memory::*;
