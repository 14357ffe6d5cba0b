// src/types.rs
use serde::Serialize;

pub const BALANCES_PATH: &str = "/api/v1/account/balances";

pub const HEADER_APIKEY: &str = "X-TXC-APIKEY";
pub const HEADER_PAYLOAD: &str = "X-TXC-PAYLOAD";
pub const HEADER_SIGNATURE: &str = "X-TXC-SIGNATURE";

// Field order matters: the serialized body is exactly what gets signed.
#[derive(Serialize)]
pub struct BalanceRequest {
    pub request: String,
    pub nonce: i64,
}
