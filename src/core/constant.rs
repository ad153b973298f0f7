pub const SYSTEM_USER: &str = "System";
pub const DEFAULT_ROOM: &str = "General";

pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_ROOM_LIST_LIMIT: usize = 1000;
pub const DEFAULT_OCCUPANT_LIMIT: usize = 1000;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 3000;
pub const CHAN_CAPACITY: usize = 100;
pub const PING_INTERVAL_SECS: u64 = 15;

pub const API_KEY_HEADER: &str = "xapikey";

pub const HISTORY_CLEARED_TEXT: &str = "Message history has been cleared";
