use crate::core::constant::{
    CHAN_CAPACITY, DEFAULT_HISTORY_LIMIT, DEFAULT_OCCUPANT_LIMIT, DEFAULT_ROOM,
    DEFAULT_ROOM_LIST_LIMIT, DEFAULT_STORE_TIMEOUT_MS,
};
use std::{env, net::IpAddr, str::FromStr, time::Duration};

// ========================// Config //======================== //

/// Configure of the App
#[derive(Debug, Clone)]
pub struct Config {
    pub ip: String,
    pub port: String,
    pub database_url: Option<String>,
    pub history_limit: usize,
    pub room_list_limit: usize,
    pub occupant_limit: usize,
    pub store_timeout: Duration,
    pub user_channel_capacity: usize,
    pub default_room: String,
    pub admin_password_hash: Option<String>,
    /// Expected `XApiKey` header, no check when unset
    pub api_key: Option<String>,
    /// Client addresses allowed to connect, everyone when empty
    pub ip_allow_list: Vec<IpAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ip: "0.0.0.0".to_owned(),
            port: "8080".to_owned(),
            database_url: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            room_list_limit: DEFAULT_ROOM_LIST_LIMIT,
            occupant_limit: DEFAULT_OCCUPANT_LIMIT,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            user_channel_capacity: CHAN_CAPACITY,
            default_room: DEFAULT_ROOM.to_owned(),
            admin_password_hash: None,
            api_key: None,
            ip_allow_list: Vec::new(),
        }
    }
}

impl Config {
    /// Initialize the Config from env
    pub fn from_env() -> Config {
        let defaults = Config::default();

        let ip = env::var("SERVER_IP").unwrap_or(defaults.ip);
        let port = env::var("SERVER_PORT").unwrap_or(defaults.port);
        let database_url = non_empty_var("DATABASE_URL");

        let history_limit = parse_var("MESSAGE_HISTORY_LIMIT", defaults.history_limit);
        let room_list_limit = parse_var("ROOM_LIST_LIMIT", defaults.room_list_limit);
        let occupant_limit = parse_var("ROOM_OCCUPANT_LIMIT", defaults.occupant_limit);
        let store_timeout = Duration::from_millis(parse_var(
            "STORE_TIMEOUT_MS",
            DEFAULT_STORE_TIMEOUT_MS,
        ));
        let user_channel_capacity =
            parse_var("USER_CHANNEL_CAPACITY", defaults.user_channel_capacity);

        let default_room = non_empty_var("DEFAULT_ROOM").unwrap_or(defaults.default_room);
        let admin_password_hash = non_empty_var("ADMIN_PASSWORD_HASH");
        let api_key = non_empty_var("XAPI_KEY");
        let ip_allow_list = non_empty_var("IP_ALLOW_LIST")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        Config {
            ip,
            port,
            database_url,
            history_limit,
            room_list_limit,
            occupant_limit,
            store_timeout,
            user_channel_capacity,
            default_room,
            admin_password_hash,
            api_key,
            ip_allow_list,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("failed to parse {}", key)),
        Err(_) => default,
    }
}

/// Comma separated addresses, blanks ignored
fn parse_list(value: &str) -> Vec<IpAddr> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse()
                .unwrap_or_else(|_| panic!("failed to parse IP_ALLOW_LIST entry {}", v))
        })
        .collect()
}
