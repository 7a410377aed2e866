//! Redis refresh ledger.
//!
//! Each record is a hash at `refresh_token:{token_id}`. Keys carry no TTL:
//! a consumed record must stay visible so replays keep being detected.

use super::RefreshLedger;
use crate::error::SessionError;
use crate::refresh::{MarkUsed, RefreshTokenRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;

const KEY_PREFIX: &str = "refresh_token:";

/// Insert only when the key is absent. Returns 1 on insert, 0 on duplicate.
const CREATE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], 'hashed_secret', ARGV[1], 'used', '0', 'expires_at', ARGV[2])
return 1
";

/// Returns -1 when missing, 0 when already used, 1 when this call consumed it.
const MARK_USED_SCRIPT: &str = r"
local used = redis.call('HGET', KEYS[1], 'used')
if not used then
    return -1
end
if used == '1' then
    return 0
end
redis.call('HSET', KEYS[1], 'used', '1')
return 1
";

/// Ledger stored in Redis hashes.
#[derive(Clone)]
pub struct RedisLedger {
    conn: ConnectionManager,
    create_script: Script,
    mark_used_script: Script,
}

impl RedisLedger {
    pub async fn new(redis_url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            create_script: Script::new(CREATE_SCRIPT),
            mark_used_script: Script::new(MARK_USED_SCRIPT),
        })
    }

    fn key(token_id: &str) -> String {
        format!("{KEY_PREFIX}{token_id}")
    }
}

fn record_from_fields(
    token_id: &str,
    mut fields: HashMap<String, String>,
) -> Result<RefreshTokenRecord, SessionError> {
    let hashed_secret = fields
        .remove("hashed_secret")
        .ok_or_else(|| SessionError::storage("refresh record missing hashed_secret"))?;
    let used = fields.get("used").is_some_and(|v| v == "1");
    let expires_at = fields
        .get("expires_at")
        .ok_or_else(|| SessionError::storage("refresh record missing expires_at"))?;
    let expires_at = DateTime::parse_from_rfc3339(expires_at)
        .map_err(|e| SessionError::storage(format!("bad expires_at: {e}")))?
        .with_timezone(&Utc);

    Ok(RefreshTokenRecord {
        token_id: token_id.to_string(),
        hashed_secret,
        used,
        expires_at,
    })
}

#[async_trait]
impl RefreshLedger for RedisLedger {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        let inserted: i64 = self
            .create_script
            .key(Self::key(&record.token_id))
            .arg(&record.hashed_secret)
            .arg(record.expires_at.to_rfc3339())
            .invoke_async(&mut conn)
            .await?;

        if inserted == 1 {
            Ok(())
        } else {
            Err(SessionError::storage(format!(
                "duplicate refresh token id {}",
                record.token_id
            )))
        }
    }

    async fn lookup(&self, token_id: &str) -> Result<Option<RefreshTokenRecord>, SessionError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(Self::key(token_id)).await?;

        if fields.is_empty() {
            return Ok(None);
        }
        record_from_fields(token_id, fields).map(Some)
    }

    async fn mark_used(&self, token_id: &str) -> Result<MarkUsed, SessionError> {
        let mut conn = self.conn.clone();
        let outcome: i64 = self
            .mark_used_script
            .key(Self::key(token_id))
            .invoke_async(&mut conn)
            .await?;

        Ok(match outcome {
            1 => MarkUsed::Consumed,
            0 => MarkUsed::AlreadyUsed,
            _ => MarkUsed::NotFound,
        })
    }
}
