pub mod errors;
pub mod http;
pub mod models;

pub const MIN_PASSWORD_CHARS: usize = 6;
pub const RESET_TOKEN_BYTES: usize = 32;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;
pub const MAX_INLINE_FILE_CHARS: usize = 10_000;
