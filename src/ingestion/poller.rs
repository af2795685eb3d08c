//! Periodic batched reads feeding the session.

use super::session::{SessionCommand, SessionError, SessionHandle};
use crate::datasource::{DataSourceError, PositionDataSource};
use futures::future::try_join;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One refresh: token prices and the position read for the current epoch, fetched together.
///
/// The read is tagged with the epoch observed before it started, so a result
/// that lands after a reset or query change is discarded by the session.
pub async fn poll_once(
    datasource: &dyn PositionDataSource,
    session: &SessionHandle,
) -> Result<(), PollError> {
    let view = session.view();
    let tokens = view.registry.contract_addresses();

    let fetch_prices = async {
        if tokens.is_empty() {
            return Ok(None);
        }
        datasource.fetch_token_prices(&tokens).await.map(Some)
    };
    let fetch_positions = async {
        match view.account {
            Some(account) if !view.query.is_empty() => datasource
                .fetch_positions(&view.query, &account)
                .await
                .map(Some),
            Some(_) => Ok(None),
            None => {
                debug!("No active account, skipping position read");
                Ok(None)
            }
        }
    };
    let (prices, raw) = try_join(fetch_prices, fetch_positions).await?;

    if let Some(prices) = prices {
        session.send(SessionCommand::PricesUpdated(prices)).await?;
    }
    if let Some(raw) = raw {
        session
            .send(SessionCommand::ReadCompleted {
                epoch: view.epoch,
                raw,
            })
            .await?;
    }
    Ok(())
}

/// Poll until the session closes.
pub async fn run_poller(
    datasource: Arc<dyn PositionDataSource>,
    session: SessionHandle,
    interval: Duration,
) {
    info!(interval_ms = interval.as_millis() as u64, "Starting position poller");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match poll_once(datasource.as_ref(), &session).await {
            Ok(()) => {}
            Err(PollError::Session(_)) => {
                info!("Session closed, stopping position poller");
                break;
            }
            Err(PollError::DataSource(e)) => {
                warn!(error = %e, "Position refresh failed");
            }
        }
    }
}
