//! Redis-backed session store

use rand::{distributions::Alphanumeric, Rng};
use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};

/// Length of session keys and CSRF tokens
pub const KEY_LENGTH: usize = 32;

/// Random alphanumeric key for sessions and CSRF tokens
pub fn random_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service and check the server answers
    pub async fn new(url: &str) -> AppResult<Self> {
        let service = Self::open(url)?;
        service.ping().await?;
        Ok(service)
    }

    /// Create the service without connecting; connections are made per call
    pub fn open(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;
        Ok(())
    }

    /// Open a session for `user_id` and return its key
    pub async fn create_session(&self, user_id: i32, ttl_seconds: u64) -> AppResult<String> {
        let mut conn = self.connection().await?;

        let session_key = random_key();
        conn.set_ex::<_, _, ()>(session_redis_key(&session_key), user_id, ttl_seconds)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store session in Redis: {}", e)))?;

        Ok(session_key)
    }

    /// User id of a live session
    pub async fn session_user(&self, session_key: &str) -> AppResult<Option<i32>> {
        let mut conn = self.connection().await?;

        let user_id: Option<i32> = conn
            .get(session_redis_key(session_key))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read session from Redis: {}", e)))?;

        Ok(user_id)
    }

    /// End a session. Unknown keys are ignored.
    pub async fn delete_session(&self, session_key: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;

        conn.del::<_, ()>(session_redis_key(session_key))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete session from Redis: {}", e)))?;

        Ok(())
    }
}

fn session_redis_key(session_key: &str) -> String {
    format!("session:{}", session_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_key_shape() {
        let a = random_key();
        let b = random_key();
        assert_eq!(a.len(), KEY_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_key_namespace() {
        assert_eq!(session_redis_key("abc"), "session:abc");
    }

    #[test]
    fn test_open_does_not_connect() {
        assert!(RedisService::open("redis://127.0.0.1:1").is_ok());
        assert!(RedisService::open("not a url").is_err());
    }
}
