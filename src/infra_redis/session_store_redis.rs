use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{
    AsyncCommands, FromRedisValue, RedisError, RedisResult, RedisWrite, Script, ToRedisArgs, Value,
};
use std::collections::HashMap;
use std::time::Duration;

const SESSION_CREATE: &str = include_str!("session_create.lua");
const SESSION_ROTATE: &str = include_str!("session_rotate.lua");
const SESSION_REVOKE: &str = include_str!("session_revoke.lua");

/// Key layout under `prefix`:
/// `session:{principal}` hash, `spent:{principal}` hash of used digest to
/// consumption time, and the
/// string indexes `sid:{session}`, `current:{digest}`, `used:{digest}`, each
/// pointing back at the principal. Every write goes through a Lua script.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    ttl: Duration,
    create_script: Script,
    rotate_script: Script,
    revoke_script: Script,
}

impl ToRedisArgs for PrincipalId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

impl FromRedisValue for PrincipalId {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let s: String = redis::from_redis_value(v)?;
        let principal_id = s.parse::<PrincipalId>().map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "invalid PrincipalId string",
                e.to_string(),
            ))
        })?;
        Ok(principal_id)
    }
}

fn store_err(e: RedisError) -> SessionStoreError {
    SessionStoreError::Store(e.to_string())
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Result<&'a str, SessionStoreError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| SessionStoreError::Corrupt(format!("missing field {name}")))
}

fn parse_rfc3339(raw: &str, name: &str) -> Result<DateTime<Utc>, SessionStoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SessionStoreError::Corrupt(format!("{name}: {e}")))
}

fn parse_time(fields: &HashMap<String, String>, name: &str) -> Result<DateTime<Utc>, SessionStoreError> {
    parse_rfc3339(field(fields, name)?, name)
}

/// Flat `HGETALL` reply to a map.
fn pairs_to_map(flat: Vec<String>) -> Result<HashMap<String, String>, SessionStoreError> {
    if flat.len() % 2 != 0 {
        return Err(SessionStoreError::Corrupt("odd HGETALL reply".to_string()));
    }
    let mut map = HashMap::with_capacity(flat.len() / 2);
    let mut it = flat.into_iter();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        map.insert(k, v);
    }
    Ok(map)
}

fn record_from_fields(
    fields: &HashMap<String, String>,
    used: HashMap<String, String>,
) -> Result<SessionRecord, SessionStoreError> {
    let used_refresh_tokens = used
        .into_iter()
        .map(|(digest, at)| Ok((TokenDigest(digest), parse_rfc3339(&at, "consumed_at")?)))
        .collect::<Result<HashMap<_, _>, SessionStoreError>>()?;

    let id = field(fields, "id")?
        .parse::<SessionId>()
        .map_err(|e| SessionStoreError::Corrupt(format!("id: {e}")))?;
    let principal_id = field(fields, "principal_id")?
        .parse::<PrincipalId>()
        .map_err(|e| SessionStoreError::Corrupt(format!("principal_id: {e}")))?;
    let key_pair = EncodedKeyPair {
        public_key_pem: field(fields, "public_key")?.to_string(),
        private_key_pem: field(fields, "private_key")?.to_string(),
    }
    .decode()
    .map_err(|e| SessionStoreError::Corrupt(e.to_string()))?;

    Ok(SessionRecord {
        id,
        principal_id,
        key_pair,
        current_refresh_token: TokenDigest(field(fields, "current")?.to_string()),
        used_refresh_tokens,
        created_at: parse_time(fields, "created_at")?,
        updated_at: parse_time(fields, "updated_at")?,
        expires_at: parse_time(fields, "expires_at")?,
    })
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, ttl: Duration) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
            ttl,
            create_script: Script::new(SESSION_CREATE),
            rotate_script: Script::new(SESSION_ROTATE),
            revoke_script: Script::new(SESSION_REVOKE),
        }
    }

    fn session_key(&self, principal_id: PrincipalId) -> String {
        format!("{}:session:{}", self.prefix, principal_id)
    }

    fn spent_key(&self, principal_id: PrincipalId) -> String {
        format!("{}:spent:{}", self.prefix, principal_id)
    }

    fn index_key(&self, kind: &str, value: &str) -> String {
        format!("{}:{}:{}", self.prefix, kind, value)
    }

    // redis rejects EX 0
    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }

    fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::from_secs(self.ttl_secs())
    }

    async fn load(&self, principal_id: PrincipalId) -> Result<Option<SessionRecord>, SessionStoreError> {
        let mut conn = self.conn.clone();
        let (fields, used): (HashMap<String, String>, HashMap<String, String>) = redis::pipe()
            .atomic()
            .hgetall(self.session_key(principal_id))
            .hgetall(self.spent_key(principal_id))
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;
        if fields.is_empty() {
            return Ok(None);
        }

        let record = record_from_fields(&fields, used)?;
        if record.is_expired(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn principal_for(&self, key: String) -> Result<Option<PrincipalId>, SessionStoreError> {
        let mut conn = self.conn.clone();
        conn.get(&key).await.map_err(store_err)
    }

    async fn run_revoke(
        &self,
        principal_id: PrincipalId,
        expected: Option<SessionId>,
    ) -> Result<bool, SessionStoreError> {
        let mut conn = self.conn.clone();
        let expected = expected.map(|id| id.to_string()).unwrap_or_default();
        let deleted: i64 = self
            .revoke_script
            .key(self.session_key(principal_id))
            .key(self.spent_key(principal_id))
            .arg(&self.prefix)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        Ok(deleted == 1)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(
        &self,
        principal_id: PrincipalId,
        key_pair: KeyPair,
        refresh_token: &TokenDigest,
    ) -> Result<SessionRecord, SessionStoreError> {
        let encoded = key_pair
            .encode()
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        let now = Utc::now();
        let record = SessionRecord {
            id: SessionId::new(),
            principal_id,
            key_pair,
            current_refresh_token: refresh_token.clone(),
            used_refresh_tokens: HashMap::new(),
            created_at: now,
            updated_at: now,
            expires_at: self.expires_at(now),
        };

        let mut conn = self.conn.clone();
        let _: i64 = self
            .create_script
            .key(self.session_key(principal_id))
            .key(self.spent_key(principal_id))
            .arg(&self.prefix)
            .arg(principal_id)
            .arg(record.id.to_string())
            .arg(&encoded.public_key_pem)
            .arg(&encoded.private_key_pem)
            .arg(refresh_token.as_str())
            .arg(now.to_rfc3339())
            .arg(record.expires_at.to_rfc3339())
            .arg(self.ttl_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(record)
    }

    async fn find_by_principal(
        &self,
        principal_id: PrincipalId,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        self.load(principal_id).await
    }

    async fn find_by_current_refresh_token(
        &self,
        refresh_token: &TokenDigest,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let Some(principal_id) = self
            .principal_for(self.index_key("current", refresh_token.as_str()))
            .await?
        else {
            return Ok(None);
        };
        Ok(self
            .load(principal_id)
            .await?
            .filter(|record| record.current_refresh_token == *refresh_token))
    }

    async fn find_by_used_refresh_token(
        &self,
        refresh_token: &TokenDigest,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let Some(principal_id) = self
            .principal_for(self.index_key("used", refresh_token.as_str()))
            .await?
        else {
            return Ok(None);
        };
        Ok(self
            .load(principal_id)
            .await?
            .filter(|record| record.used_refresh_tokens.contains_key(refresh_token)))
    }

    async fn rotate(&self, rotation: SessionRotation) -> Result<RotateOutcome, SessionStoreError> {
        let Some(principal_id) = self
            .principal_for(self.index_key("sid", &rotation.session_id.to_string()))
            .await?
        else {
            return Ok(RotateOutcome::Conflict);
        };
        let encoded = rotation
            .key_pair
            .encode()
            .map_err(|e| SessionStoreError::Store(e.to_string()))?;
        let now = Utc::now();

        let mut conn = self.conn.clone();
        let post: Vec<Vec<String>> = self
            .rotate_script
            .key(self.session_key(principal_id))
            .key(self.spent_key(principal_id))
            .arg(&self.prefix)
            .arg(rotation.session_id.to_string())
            .arg(rotation.consumed_refresh_token.as_str())
            .arg(rotation.new_refresh_token.as_str())
            .arg(&encoded.public_key_pem)
            .arg(&encoded.private_key_pem)
            .arg(now.to_rfc3339())
            .arg(self.expires_at(now).to_rfc3339())
            .arg(self.ttl_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(store_err)?;
        // the script answers with the committed state, so no second read
        let mut post = post.into_iter();
        let (Some(fields), Some(used)) = (post.next(), post.next()) else {
            return Ok(RotateOutcome::Conflict);
        };
        let record = record_from_fields(&pairs_to_map(fields)?, pairs_to_map(used)?)?;
        Ok(RotateOutcome::Rotated(record))
    }

    async fn revoke(&self, principal_id: PrincipalId) -> Result<bool, SessionStoreError> {
        self.run_revoke(principal_id, None).await
    }

    async fn remove_by_record_id(&self, session_id: SessionId) -> Result<bool, SessionStoreError> {
        let Some(principal_id) = self
            .principal_for(self.index_key("sid", &session_id.to_string()))
            .await?
        else {
            return Ok(false);
        };
        self.run_revoke(principal_id, Some(session_id)).await
    }
}
