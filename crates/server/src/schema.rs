//! GraphQL schema over [`AthenaClient`].
//!
//! The client is stored as schema data; resolvers fetch it from the context.

mod objects;
pub mod sql;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Result, Schema};
use tracing::debug;

use athenaql_athena::{AthenaClient, UsageSummary};

pub use objects::{CloudTrailEvent, FailedQuery, QueryStats, UsageRollup};
use sql::CloudTrailFilter;

pub type AthenaSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn build_schema(client: AthenaClient) -> AthenaSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(client)
        .finish()
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Metadata and statistics of one execution. Quoted ids are accepted.
    async fn stats(&self, ctx: &Context<'_>, id: String) -> Result<QueryStats> {
        let client = ctx.data::<AthenaClient>()?;
        Ok(QueryStats(client.stats(&id).await?))
    }

    /// Statistics of many executions; executions that scanned nothing are left out.
    async fn batch_stats(&self, ctx: &Context<'_>, ids: Vec<String>) -> Result<Vec<QueryStats>> {
        let client = ctx.data::<AthenaClient>()?;
        let stats = client.batch_stats(&ids).await?;
        Ok(stats.into_iter().map(QueryStats).collect())
    }

    /// Failed `StartQueryExecution` calls from CloudTrail, newest first.
    async fn failed_queries(
        &self,
        ctx: &Context<'_>,
        limit: Option<i32>,
        user: Option<String>,
        interval: Option<i32>,
        unit: Option<String>,
    ) -> Result<Vec<FailedQuery>> {
        let client = ctx.data::<AthenaClient>()?;
        let sql = sql::failed_queries_sql(limit, user.as_deref(), interval, unit.as_deref());
        let records = client.query(sql).await?;
        Ok(records.iter().map(FailedQuery::from).collect())
    }

    /// Scanned data, cost and engine time of every execution a user started.
    async fn usage_rollup(
        &self,
        ctx: &Context<'_>,
        month: Option<i32>,
        user: Option<String>,
    ) -> Result<UsageRollup> {
        let client = ctx.data::<AthenaClient>()?;
        let records = client
            .query(sql::usage_rollup_sql(month, user.as_deref()))
            .await?;

        let ids = objects::execution_ids(&records);
        debug!(rows = records.len(), ids = ids.len(), "Rolling up usage");

        let stats = client.batch_stats(&ids).await?;
        Ok(UsageRollup::from(&UsageSummary::from_statistics(&stats)))
    }

    /// Athena `StartQueryExecution` events from raw CloudTrail logs.
    async fn cloudtrail(
        &self,
        ctx: &Context<'_>,
        limit: Option<i32>,
        user: Option<String>,
        gt_month: Option<i32>,
        gt_day: Option<i32>,
        eq_month: Option<i32>,
        eq_day: Option<i32>,
    ) -> Result<Vec<CloudTrailEvent>> {
        let client = ctx.data::<AthenaClient>()?;
        let filter = CloudTrailFilter {
            limit,
            user,
            gt_month,
            gt_day,
            eq_month,
            eq_day,
        };
        let records = client.query(sql::cloudtrail_sql(&filter)).await?;
        Ok(records.iter().map(CloudTrailEvent::from).collect())
    }
}
