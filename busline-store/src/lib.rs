pub mod app_config;
pub mod database;
pub mod trip_repo;
pub mod booking_repo;
pub mod user_repo;
pub mod memory;
pub mod seed;
pub mod redis_repo;
pub mod events;

pub use app_config::Config;
pub use database::{DbClient, PgStore};
pub use events::EventProducer;
pub use memory::InMemoryStore;
pub use redis_repo::RedisClient;
