// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATABASE_URL: &str = "sqlite:relay.db?mode=rwc";

// Connection handling constants
pub const DEFAULT_MAX_CONNECTIONS: usize = 200;
pub const DEFAULT_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 1800;
