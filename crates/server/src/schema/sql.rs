//! SQL text for the CloudTrail dashboard queries.
//!
//! Filter values are interpolated into the statement. Single quotes in the
//! user filter are doubled; nothing else is validated.

/// Units accepted by the `failedQueries` interval filter.
pub const INTERVAL_UNITS: [&str; 3] = ["hour", "day", "month"];

fn like_literal(user: &str) -> String {
    user.replace('\'', "''")
}

fn user_filter(user: Option<&str>) -> Option<&str> {
    user.filter(|u| !u.is_empty())
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// Failed `StartQueryExecution` calls recorded in CloudTrail, newest first.
///
/// The interval filter only applies when `interval > 0` and `unit` is one of
/// [`INTERVAL_UNITS`]. An hourly window is also pinned to the current date.
pub fn failed_queries_sql(
    limit: Option<i32>,
    user: Option<&str>,
    interval: Option<i32>,
    unit: Option<&str>,
) -> String {
    let mut conditions = Vec::new();
    if let Some(user) = user_filter(user) {
        conditions.push(format!("identity_username LIKE '%{}%'", like_literal(user)));
    }
    if let (Some(interval), Some(unit)) = (interval, unit) {
        if interval > 0 && INTERVAL_UNITS.contains(&unit) {
            conditions.push(format!(
                "ts BETWEEN (current_timestamp - INTERVAL '{interval}' {unit}) AND current_timestamp"
            ));
            if unit == "hour" {
                conditions.push("date(\"date\") = current_date".to_string());
            }
        }
    }

    let limit = match limit {
        Some(n) if n > 0 => format!(" LIMIT {n}"),
        _ => String::new(),
    };

    format!(
        r#"WITH logs AS (
    SELECT
        ts,
        "date",
        identity_username,
        errorcode,
        errormessage,
        json_extract(responseelements, '$.queryExecutionId') AS queryexecutionid,
        json_extract(requestparameters, '$.queryString') AS sqlquery
    FROM cloudtrail.ct_cloudtrail
    WHERE identity_username <> '' AND errorcode <> '' AND eventname = 'StartQueryExecution'
)
SELECT * FROM logs
{}
ORDER BY ts DESC{}"#,
        where_clause(&conditions),
        limit
    )
}

/// Query execution ids started per user, optionally narrowed to one month (1-12).
pub fn usage_rollup_sql(month: Option<i32>, user: Option<&str>) -> String {
    let mut conditions = Vec::new();
    if let Some(user) = user_filter(user) {
        conditions.push(format!("identity_username LIKE '%{}%'", like_literal(user)));
    }
    if let Some(month) = month.filter(|m| (1..=12).contains(m)) {
        conditions.push(format!("\"month\" = {month}"));
    }

    format!(
        r#"WITH logs AS (
    SELECT
        ts,
        month(date("date")) AS "month",
        identity_username,
        json_extract(responseelements, '$.queryExecutionId') AS queryexecutionid
    FROM cloudtrail.ct_cloudtrail
    WHERE identity_username <> '' AND eventname = 'StartQueryExecution'
)
SELECT * FROM logs
{}"#,
        where_clause(&conditions)
    )
}

/// Filters for [`cloudtrail_sql`]. Only the first valid date filter applies,
/// checked in field order.
#[derive(Debug, Clone, Default)]
pub struct CloudTrailFilter {
    pub limit: Option<i32>,
    pub user: Option<String>,
    pub gt_month: Option<i32>,
    pub gt_day: Option<i32>,
    pub eq_month: Option<i32>,
    pub eq_day: Option<i32>,
}

impl CloudTrailFilter {
    fn date_condition(&self) -> Option<String> {
        let month = |m: &i32| (1..=12).contains(m);
        let day = |d: &i32| (1..=31).contains(d);

        if let Some(m) = self.gt_month.filter(month) {
            Some(format!("month(ts) > {m}"))
        } else if let Some(d) = self.gt_day.filter(day) {
            Some(format!("day(ts) > {d}"))
        } else if let Some(m) = self.eq_month.filter(month) {
            Some(format!("month(ts) = {m}"))
        } else {
            self.eq_day.filter(day).map(|d| format!("day(ts) = {d}"))
        }
    }
}

/// Athena `StartQueryExecution` events from raw CloudTrail logs.
pub fn cloudtrail_sql(filter: &CloudTrailFilter) -> String {
    let mut conditions = vec![
        "eventsource LIKE 'athena%'".to_string(),
        "eventname LIKE 'StartQueryExecution'".to_string(),
    ];
    if let Some(user) = user_filter(filter.user.as_deref()) {
        conditions.push(format!("userarn LIKE '%{}'", like_literal(user)));
    }
    conditions.extend(filter.date_condition());

    let limit = match filter.limit {
        Some(n) if n > 0 => format!(" LIMIT {n}"),
        _ => String::new(),
    };

    format!(
        r#"WITH logs AS (
    SELECT
        event.eventTime AS eventtime,
        from_iso8601_timestamp(event.eventtime) AS ts,
        event.eventSource AS eventsource,
        event.eventName AS eventname,
        event.awsRegion AS awsregion,
        event.errorCode AS errorcode,
        event.userIdentity.type AS usertype,
        event.userIdentity.arn AS userarn,
        event.userIdentity.principalId AS userprincipalid,
        event.userIdentity.accountId AS useraccountid,
        json_extract(event.responseElements, '$.queryExecutionId') AS queryexecutionid
    FROM cloudtrail_logs
    CROSS JOIN UNNEST (Records) AS r (event)
)
SELECT * FROM logs
{}{}"#,
        where_clause(&conditions),
        limit
    )
}
