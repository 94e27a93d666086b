//! Redis-backed inbound queue and dead-letter queue.
//!
//! # Queue Structure
//!
//! Two Redis lists hold raw message bodies:
//!
//! - `{queue_name}`: inbound messages; producers LPUSH, the processor pops
//!   from the right so messages come out in FIFO order
//! - `{dead_letter_queue}`: bodies of jobs that failed, stored verbatim
//!
//! Bodies are never re-encoded on the way through, so a dead-lettered
//! message can be redriven onto the inbound queue unchanged.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;

use super::dead_letter::DeadLetterRouter;
use super::source::JobSource;
use crate::error::RouterError;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Failed to connect to Redis.
    #[error("Redis connection failed: {0}")]
    ConnectionFailed(String),

    /// Redis operation failed.
    #[error("Redis operation failed: {0}")]
    RedisError(#[from] redis::RedisError),

    /// An event file could not be read or parsed.
    #[error("Invalid event file: {0}")]
    EventFile(String),
}

/// Redis-backed inbound queue with a dead-letter list.
pub struct RedisJobQueue {
    /// Redis connection manager (handles reconnection automatically).
    redis: ConnectionManager,
    /// Name of the inbound list.
    queue_name: String,
    /// Name of the dead-letter list.
    dead_letter_queue: String,
}

impl RedisJobQueue {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::ConnectionFailed` if the connection fails.
    pub async fn connect(
        redis_url: &str,
        queue_name: &str,
        dead_letter_queue: &str,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| QueueError::ConnectionFailed(e.to_string()))?;

        Ok(Self::from_connection(redis, queue_name, dead_letter_queue))
    }

    /// Creates a queue from an existing ConnectionManager.
    pub fn from_connection(
        redis: ConnectionManager,
        queue_name: &str,
        dead_letter_queue: &str,
    ) -> Self {
        Self {
            redis,
            queue_name: queue_name.to_string(),
            dead_letter_queue: dead_letter_queue.to_string(),
        }
    }

    /// Pushes raw bodies onto the inbound queue.
    pub async fn enqueue_raw(&self, bodies: &[String]) -> Result<(), QueueError> {
        if bodies.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis.clone();
        let mut pipe = redis::pipe();
        for body in bodies {
            pipe.lpush(&self.queue_name, body);
        }
        pipe.query_async::<_, ()>(&mut conn).await?;

        Ok(())
    }

    /// Returns the number of messages waiting in the inbound queue.
    pub async fn len(&self) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let len: usize = conn.llen(&self.queue_name).await?;
        Ok(len)
    }

    /// Returns the number of bodies in the dead-letter queue.
    pub async fn dead_letter_len(&self) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let len: usize = conn.llen(&self.dead_letter_queue).await?;
        Ok(len)
    }

    /// Peeks at the oldest dead-lettered bodies without removing them.
    pub async fn peek_dead_letter(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.redis.clone();
        let limit = limit as isize;
        let mut bodies: Vec<String> = conn
            .lrange(&self.dead_letter_queue, -limit, -1)
            .await?;
        // The oldest entry sits at the right end of the list.
        bodies.reverse();

        Ok(bodies)
    }

    /// Moves up to `limit` dead-lettered bodies back onto the inbound queue,
    /// oldest first.
    ///
    /// Returns the number of bodies moved.
    pub async fn redrive(&self, limit: usize) -> Result<usize, QueueError> {
        let mut conn = self.redis.clone();
        let mut moved = 0;

        while moved < limit {
            let body: Option<String> = redis::cmd("RPOPLPUSH")
                .arg(&self.dead_letter_queue)
                .arg(&self.queue_name)
                .query_async(&mut conn)
                .await?;

            if body.is_none() {
                break;
            }
            moved += 1;
        }

        Ok(moved)
    }

    /// Returns the inbound queue name.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl JobSource for RedisJobQueue {
    async fn receive_batch(&self, max: usize) -> Result<Vec<String>, QueueError> {
        let mut conn = self.redis.clone();
        let mut bodies = Vec::with_capacity(max);

        while bodies.len() < max {
            let body: Option<String> = redis::cmd("RPOP")
                .arg(&self.queue_name)
                .query_async(&mut conn)
                .await?;

            match body {
                Some(body) => bodies.push(body),
                None => break,
            }
        }

        Ok(bodies)
    }
}

#[async_trait]
impl DeadLetterRouter for RedisJobQueue {
    fn destination(&self) -> &str {
        &self.dead_letter_queue
    }

    async fn route(&self, body: &str) -> Result<(), RouterError> {
        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(&self.dead_letter_queue, body)
            .await
            .map_err(|e| RouterError {
                queue: self.dead_letter_queue.clone(),
                reason: e.to_string(),
            })
    }
}
