//! Visit log store
//!
//! Append-only request log. Recording is best-effort: a disabled database
//! yields an empty result instead of an error.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::driver;
use crate::db::manager::ConnectionManager;
use crate::error::Result;

/// Visits returned by [`VisitStore::stats`]
const RECENT_VISITS: i64 = 10;

/// Visit row
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Visit {
    pub id: i32,
    pub timestamp: DateTime<Utc>,
    pub endpoint: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub response_time: Option<i32>,
    pub stage: Option<String>,
}

/// Result of [`VisitStore::record`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordedVisit {
    pub visit: Option<Visit>,
    pub total_visits: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisitStats {
    pub total_visits: i64,
    pub unique_paths: i64,
    pub recent_visits: Vec<Visit>,
}

pub struct VisitStore<'a> {
    db: &'a ConnectionManager,
    stage: &'a str,
}

impl<'a> VisitStore<'a> {
    pub fn new(db: &'a ConnectionManager, stage: &'a str) -> Self {
        Self { db, stage }
    }

    /// Append a visit and return it with the running total.
    ///
    /// Addresses that do not parse as IP addresses are stored as NULL.
    pub async fn record(
        &self,
        endpoint: &str,
        user_agent: Option<&str>,
        ip: Option<&str>,
        response_time_ms: Option<i32>,
    ) -> Result<RecordedVisit> {
        let Some(pool) = self.db.pool().await else {
            return Ok(RecordedVisit::default());
        };

        let ip = ip.and_then(normalize_ip);

        let visit: Visit = sqlx::query_as(
            r#"
            INSERT INTO visits (endpoint, user_agent, ip_address, response_time, stage)
            VALUES ($1, $2, $3::inet, $4, $5)
            RETURNING id, timestamp, endpoint, user_agent, host(ip_address) AS ip_address,
                      response_time, stage
            "#,
        )
        .bind(endpoint)
        .bind(user_agent)
        .bind(ip)
        .bind(response_time_ms)
        .bind(self.stage)
        .fetch_one(&pool)
        .await
        .map_err(driver("insert visit"))?;

        let (total_visits,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM visits")
            .fetch_one(&pool)
            .await
            .map_err(driver("count visits"))?;

        Ok(RecordedVisit {
            visit: Some(visit),
            total_visits,
        })
    }

    /// Totals plus the most recent visits.
    pub async fn stats(&self) -> Result<VisitStats> {
        let pool = self.db.require_pool().await?;

        let (total_visits, unique_paths): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), COUNT(DISTINCT endpoint) FROM visits")
                .fetch_one(&pool)
                .await
                .map_err(driver("visit totals"))?;

        let recent_visits: Vec<Visit> = sqlx::query_as(
            r#"
            SELECT id, timestamp, endpoint, user_agent, host(ip_address) AS ip_address,
                   response_time, stage
            FROM visits
            ORDER BY timestamp DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(RECENT_VISITS)
        .fetch_all(&pool)
        .await
        .map_err(driver("recent visits"))?;

        Ok(VisitStats {
            total_visits,
            unique_paths,
            recent_visits,
        })
    }
}

/// Canonical form of an address, or `None` if it is not one.
///
/// IPv4-mapped IPv6 peers (`::ffff:1.2.3.4`) are reported as IPv4.
fn normalize_ip(raw: &str) -> Option<String> {
    let addr: IpAddr = raw.trim().parse().ok()?;
    let addr = match addr {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(addr),
        v4 => v4,
    };
    Some(addr.to_string())
}
