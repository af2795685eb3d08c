pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ingestion;

pub use config::Config;
pub use datasource::{DataSourceError, MockDataSource, PositionDataSource, RpcDataSource};
pub use domain::{
    Address, Amount, Clock, ManualClock, Position, PositionEvent, PositionKey, SystemClock,
    TimeMs, Token, TokenRegistry, B256, U256,
};
pub use engine::{DisplayOptions, PositionQuery, PositionSnapshot, Reconciler};
pub use error::AppError;
pub use ingestion::{spawn_session, SessionConfig, SessionHandle};
