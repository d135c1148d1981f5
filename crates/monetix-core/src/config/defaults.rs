/// Upstream Open Cloud host
pub const DEFAULT_UPSTREAM_URL: &str = "https://apis.roblox.com";

/// Path prefix the relay answers on
pub const DEFAULT_RELAY_PREFIX: &str = "/api/relay";

/// Default relay listen address
pub const DEFAULT_RELAY_HOST: &str = "127.0.0.1";

/// Default relay listen port
pub const DEFAULT_RELAY_PORT: u16 = 3001;

/// Largest inbound body the relay buffers (bytes)
pub const DEFAULT_RELAY_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Items requested per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Concurrent icon lookups per batch
pub const DEFAULT_ICON_BATCH_SIZE: usize = 5;

/// Gamepass pacing (milliseconds)
pub const GAME_PASS_PAGE_DELAY_MS: u64 = 250;
pub const GAME_PASS_ICON_BATCH_DELAY_MS: u64 = 250;

/// Developer product pacing (milliseconds)
pub const DEVELOPER_PRODUCT_PAGE_DELAY_MS: u64 = 150;
pub const DEVELOPER_PRODUCT_ICON_BATCH_DELAY_MS: u64 = 200;

/// Delay between bulk create rows (milliseconds)
pub const DEFAULT_BULK_ROW_DELAY_MS: u64 = 350;
