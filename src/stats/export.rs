//! Monitoring exporters over the statistics state.
//!
//! Two surfaces consume read-only snapshots of the counters and latency
//! moments:
//!
//! - a JSON statistics document (host, uptime, global and per-project
//!   counters and latency moments);
//! - the munin plugin text protocol, with a `config` declaration listing
//!   graph metadata and a default fetch emitting `key.value <number>`
//!   lines, one multigraph section per project plus a global section.
//!
//! Both apply [`zero_if_nan`] so undefined moments (small sample counts)
//! export as 0, never NaN. Aliases are not listed; callers pass canonical
//! projects only.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use super::moments::{zero_if_nan, RequestMoments};
use super::{Counters, ServiceStats};

// =============================================================================
// JSON Document
// =============================================================================

/// Request counters as exported.
#[derive(Debug, Serialize)]
pub struct CounterSnapshot {
    pub requests: u64,
    pub success: u64,
    pub fail: u64,
}

/// Latency moments as exported, NaN already squashed to 0.
#[derive(Debug, Serialize)]
pub struct LatencySnapshot {
    pub mean: f64,
    pub stddev: f64,
    pub skewness: f64,
}

impl LatencySnapshot {
    fn from_moments(moments: Option<&RequestMoments>) -> Self {
        let moments = moments.cloned().unwrap_or_default();
        Self {
            mean: zero_if_nan(moments.mean()),
            stddev: zero_if_nan(moments.standard_deviation()),
            skewness: zero_if_nan(moments.skewness()),
        }
    }
}

/// One project's section of the statistics document.
#[derive(Debug, Serialize)]
pub struct ProjectDocument {
    pub requests: CounterSnapshot,
    pub request_time: LatencySnapshot,
}

/// The whole statistics document.
#[derive(Debug, Serialize)]
pub struct StatsDocument {
    pub host: String,
    pub uptime: u64,
    pub requests: CounterSnapshot,
    pub request_time: LatencySnapshot,
    pub projects: BTreeMap<String, ProjectDocument>,
}

/// Build the JSON statistics document from a point-in-time snapshot.
pub fn statistics_document<'a, I>(stats: &ServiceStats, projects: I) -> StatsDocument
where
    I: IntoIterator<Item = (&'a str, &'a Counters)>,
{
    let global_latency = stats.latency();

    StatsDocument {
        host: stats.hostname().to_string(),
        uptime: stats.uptime_secs(),
        requests: CounterSnapshot {
            requests: stats.requests(),
            success: stats.success(),
            fail: stats.fail(),
        },
        request_time: LatencySnapshot::from_moments(Some(&global_latency)),
        projects: projects
            .into_iter()
            .map(|(name, counters)| {
                (
                    name.to_string(),
                    ProjectDocument {
                        requests: CounterSnapshot {
                            requests: counters.requests(),
                            success: counters.success(),
                            fail: counters.fail(),
                        },
                        request_time: LatencySnapshot::from_moments(counters.latency().as_ref()),
                    },
                )
            })
            .collect(),
    }
}

// =============================================================================
// Munin Plugin Protocol
// =============================================================================

/// Render the munin `config` declaration.
///
/// Declares a request-rate and a request-time graph globally and per
/// project, plus an uptime graph.
pub fn munin_config<'a, I>(projects: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();

    push_requests_config(&mut out, "tilegate_requests", "Tilegate request rate", "");
    push_request_time_config(&mut out, "tilegate_request_time", "Tilegate request time", "");

    for name in projects {
        push_requests_config(
            &mut out,
            &format!("tilegate_requests_{}", name),
            &format!("Tilegate request rate ({})", name),
            &format!("{}_", name),
        );
        push_request_time_config(
            &mut out,
            &format!("tilegate_request_time_{}", name),
            &format!("Tilegate request time ({})", name),
            &format!("{}_", name),
        );
    }

    let _ = writeln!(out, "multigraph tilegate_uptime");
    let _ = writeln!(out, "graph_category tilegate_uptime");
    let _ = writeln!(out, "graph_title Tilegate uptime");
    let _ = writeln!(out, "graph_scale no");
    let _ = writeln!(out, "graph_vlabel days");
    let _ = writeln!(out, "uptime.label Service uptime");
    let _ = writeln!(out, "uptime.cdef uptime,86400,/");
    let _ = writeln!(out, "uptime.type GAUGE");

    out
}

fn push_requests_config(out: &mut String, graph: &str, title: &str, key_prefix: &str) {
    let _ = writeln!(out, "multigraph {}", graph);
    let _ = writeln!(out, "graph_title {}", title);
    let _ = writeln!(out, "graph_vlabel requests/s");
    let _ = writeln!(out, "graph_category tilegate_requests");
    for field in ["requests", "success", "fail"] {
        let _ = writeln!(out, "{}{}.label {}", key_prefix, field, field);
        let _ = writeln!(out, "{}{}.type DERIVE", key_prefix, field);
        let _ = writeln!(out, "{}{}.min 0", key_prefix, field);
    }
}

fn push_request_time_config(out: &mut String, graph: &str, title: &str, key_prefix: &str) {
    let _ = writeln!(out, "multigraph {}", graph);
    let _ = writeln!(out, "graph_title {}", title);
    let _ = writeln!(out, "graph_vlabel ms");
    let _ = writeln!(out, "graph_category tilegate_request_times");
    for (field, label) in [
        ("mean", "mean"),
        ("stddev", "standard deviation"),
        ("skewness", "skewness"),
    ] {
        let _ = writeln!(out, "{}{}.label {}", key_prefix, field, label);
        let _ = writeln!(out, "{}{}.type GAUGE", key_prefix, field);
        let _ = writeln!(out, "{}{}.min 0", key_prefix, field);
    }
}

/// Render the munin default fetch: current counter and moment values.
pub fn munin_values<'a, I>(stats: &ServiceStats, projects: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Counters)>,
{
    let mut out = String::new();

    let _ = writeln!(out, "multigraph tilegate_requests");
    let _ = writeln!(out, "requests.value {}", stats.requests());
    let _ = writeln!(out, "success.value {}", stats.success());
    let _ = writeln!(out, "fail.value {}", stats.fail());

    let _ = writeln!(out, "multigraph tilegate_request_time");
    push_latency_values(&mut out, "", &stats.latency());

    for (name, counters) in projects {
        let _ = writeln!(out, "multigraph tilegate_requests_{}", name);
        let _ = writeln!(out, "{}_requests.value {}", name, counters.requests());
        let _ = writeln!(out, "{}_success.value {}", name, counters.success());
        let _ = writeln!(out, "{}_fail.value {}", name, counters.fail());

        let _ = writeln!(out, "multigraph tilegate_request_time_{}", name);
        let latency = counters.latency().unwrap_or_default();
        push_latency_values(&mut out, &format!("{}_", name), &latency);
    }

    let _ = writeln!(out, "multigraph tilegate_uptime");
    let _ = writeln!(out, "uptime.value {}", stats.uptime_secs());

    out
}

fn push_latency_values(out: &mut String, key_prefix: &str, moments: &RequestMoments) {
    let _ = writeln!(out, "{}mean.value {}", key_prefix, zero_if_nan(moments.mean()));
    let _ = writeln!(
        out,
        "{}stddev.value {}",
        key_prefix,
        zero_if_nan(moments.standard_deviation())
    );
    let _ = writeln!(
        out,
        "{}skewness.value {}",
        key_prefix,
        zero_if_nan(moments.skewness())
    );
}

/// Render the munin `average_size` option: one line per project.
pub fn munin_average_sizes<'a, I>(projects: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Counters)>,
{
    let mut out = String::new();
    for (name, counters) in projects {
        let _ = writeln!(
            out,
            "{}_average_size.value {}",
            name,
            counters.average_size().unwrap_or(0)
        );
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
