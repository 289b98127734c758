//! Default values for configuration fields
//!
//! Kept in one place so the serde defaults, [`generate_default_config`](crate::generate_default_config)
//! and the validator agree on what "default" means.

pub fn service_name() -> String {
    "fxgap".to_string()
}

pub fn refresh_ttl_minutes() -> u64 {
    30
}

pub fn reference_amount() -> f64 {
    25.0
}

pub fn official_url() -> String {
    "https://bcv-api.rafnixg.dev/rates/".to_string()
}

pub fn peer_url() -> String {
    "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search".to_string()
}

pub fn fiat() -> String {
    "VES".to_string()
}

pub fn asset() -> String {
    "USDT".to_string()
}

pub fn rows() -> u32 {
    10
}

pub fn source_timeout_seconds() -> u64 {
    10
}

pub fn snapshot_path() -> String {
    "data/snapshot.json".to_string()
}

pub fn host() -> String {
    "0.0.0.0".to_string()
}

pub fn http_port() -> u16 {
    8080
}

pub fn log_format() -> String {
    "pretty".to_string()
}
