//! Result summary.
//!
//! [`summarize`] folds a result into a single serializable value. Which
//! fields are present depends on the result status:
//!
//! | status group | fields |
//! |---|---|
//! | every status | `status`, `status_text`, `cmd_status` |
//! | `TUPLES_OK`, `SINGLE_TUPLE` | `ntuples`; `nfields`, `binary_tuples`, `fields` when there are rows |
//! | the above and `COMMAND_OK` | `cmd_tuples` (when parseable), `oid_value`; `nparams`, `params` when there are parameters |
//! | `EMPTY_QUERY`, `PIPELINE_SYNC`, `COPY_*` | nothing more |
//! | error statuses and unknown codes | `error` |

use serde::Serialize;

use crate::constants::ExecStatus;

/// Statuses that carry rows.
const ROW_STATUSES: &[ExecStatus] = &[ExecStatus::TuplesOk, ExecStatus::SingleTuple];

/// Statuses that report command completion (rows imply completion).
const COMMAND_STATUSES: &[ExecStatus] = &[
    ExecStatus::TuplesOk,
    ExecStatus::SingleTuple,
    ExecStatus::CommandOk,
];

/// Per-column metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldStat {
    pub name: String,
    /// OID of the table the column was fetched from, or 0.
    pub table: u32,
    /// Column number within that table, or 0.
    pub tablecol: i32,
    pub format: i32,
    #[serde(rename = "type")]
    pub type_oid: u32,
    pub size: i32,
    #[serde(rename = "mod")]
    pub modifier: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatSummary {
    pub status: i32,
    pub status_text: String,
    pub cmd_status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ntuples: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nfields: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_tuples: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldStat>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd_tuples: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oid_value: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nparams: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<u32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read access to a live result. Column and parameter numbers are 0-based
/// and always in range when called from [`summarize`].
pub trait ResultView {
    fn status(&self) -> i32;
    fn status_text(&self) -> String;
    fn cmd_status(&self) -> String;
    fn ntuples(&self) -> i32;
    fn nfields(&self) -> i32;
    fn binary_tuples(&self) -> bool;
    fn field(&self, col: i32) -> FieldStat;
    /// `PQcmdTuples` text.
    fn cmd_tuples_text(&self) -> String;
    fn oid_value(&self) -> u32;
    fn nparams(&self) -> i32;
    fn param_type(&self, param: i32) -> u32;
    fn error_message(&self) -> String;
}

/// Parse `PQcmdTuples` output. Empty or malformed text means "no count",
/// never zero.
pub fn parse_cmd_tuples(text: &str) -> Option<u64> {
    text.parse().ok()
}

pub fn summarize<R: ResultView + ?Sized>(res: &R) -> StatSummary {
    let status = res.status();
    let mut stat = StatSummary {
        status,
        status_text: res.status_text(),
        cmd_status: res.cmd_status(),
        ..StatSummary::default()
    };

    let known = ExecStatus::try_from(status).ok();
    let is_in = |set: &[ExecStatus]| known.is_some_and(|s| set.contains(&s));

    if is_in(ROW_STATUSES) {
        let ntuples = res.ntuples();
        stat.ntuples = Some(ntuples);
        if ntuples > 0 {
            let nfields = res.nfields();
            stat.nfields = Some(nfields);
            stat.binary_tuples = Some(res.binary_tuples());
            stat.fields = Some((0..nfields).map(|col| res.field(col)).collect());
        }
    }

    if is_in(COMMAND_STATUSES) {
        stat.cmd_tuples = parse_cmd_tuples(&res.cmd_tuples_text());
        stat.oid_value = Some(res.oid_value());
        let nparams = res.nparams();
        if nparams > 0 {
            stat.nparams = Some(nparams);
            stat.params = Some((0..nparams).map(|i| res.param_type(i)).collect());
        }
    }

    // unknown codes are reported like errors
    if known.map_or(true, ExecStatus::is_error) {
        let message = res.error_message();
        stat.error = Some(if message.is_empty() {
            stat.status_text.clone()
        } else {
            message
        });
    }

    stat
}
