use crate::config::ShowFormat;
use crate::counters::ProgressSnapshot;
use serde::Serialize;

/// Callback name substituted whenever an `X-Progress-Callback` value is
/// missing or contains a character outside `[A-Za-z0-9._]`.
pub const DEFAULT_CALLBACK: &str = "progress";

/// Validates a jsonp callback name against §6.2's character class, falling
/// back to [`DEFAULT_CALLBACK`] on any violation (or if none was supplied).
pub fn sanitize_callback(raw: Option<&str>) -> &str {
    match raw {
        Some(name)
            if !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_') =>
        {
            name
        }
        _ => DEFAULT_CALLBACK,
    }
}

/// The `state` tag a snapshot renders as, per the table in §6.2. Exposed
/// separately from [`render`] so callers (metrics) can record it without
/// re-deriving the same match.
pub fn state_tag(snapshot: Option<ProgressSnapshot>) -> &'static str {
    match snapshot {
        None => "unknown",
        Some(ProgressSnapshot { status_code: 0, .. }) => "running",
        Some(ProgressSnapshot {
            status_code: 200, ..
        }) => "done",
        Some(_) => "error",
    }
}

/// Body shape for the `unknown` state: no tracked entry was found.
#[derive(Serialize)]
struct UnknownBody {
    state: &'static str,
}

/// Body shape for `running`/`done`: field order matches §6.2's documented
/// contract (`state`, `received`, `sent`, `request_size`, `response_size`)
/// byte-for-byte, since `serde_json` serializes struct fields in
/// declaration order rather than sorted — unlike `serde_json::json!`, whose
/// `Value::Object` is a `BTreeMap` under the default feature set and so
/// always serializes keys sorted.
#[derive(Serialize)]
struct CountersBody {
    state: &'static str,
    received: u64,
    sent: u64,
    request_size: u64,
    response_size: u64,
}

/// Body shape for `error`: the stored non-200 status code.
#[derive(Serialize)]
struct ErrorBody {
    state: &'static str,
    status: u16,
}

/// The JSON body for a `show` response, per the state table in §6.2.
fn body(snapshot: Option<ProgressSnapshot>) -> String {
    let Some(snapshot) = snapshot else {
        return serde_json::to_string(&UnknownBody { state: "unknown" })
            .expect("UnknownBody always serializes");
    };

    match snapshot.status_code {
        // A status of 0 marks a still-Live entry (no terminal status yet).
        0 => serde_json::to_string(&CountersBody {
            state: "running",
            received: snapshot.bytes_in,
            sent: snapshot.bytes_out,
            request_size: snapshot.request_size,
            response_size: snapshot.response_size,
        }),
        200 => serde_json::to_string(&CountersBody {
            state: "done",
            received: snapshot.bytes_in,
            sent: snapshot.bytes_out,
            request_size: snapshot.request_size,
            response_size: snapshot.response_size,
        }),
        status => serde_json::to_string(&ErrorBody {
            state: "error",
            status,
        }),
    }
    .expect("body structs always serialize")
}

/// Frames the `show` response body according to the configured format.
pub fn render(format: ShowFormat, snapshot: Option<ProgressSnapshot>, callback: &str) -> String {
    let body = body(snapshot);
    match format {
        ShowFormat::Json | ShowFormat::Dump => body,
        ShowFormat::Legacy => format!("new Object({body})"),
        ShowFormat::Jsonp => format!("{callback}({body})"),
    }
}
