//! Tests for the libpq handle layer.
//!
//! Everything outside `integration` runs without a server. Results are built
//! with `PQmakeEmptyPGresult` and friends, and a connection that failed to
//! parse its conninfo stands in for a real one: it is a genuine `PGconn`
//! (status `CONNECTION_BAD`) whose notice hooks work normally.

use std::cell::RefCell;
use std::ffi::CString;
use std::ptr;
use std::rc::Rc;

use pq_sys::ExecStatusType;

use crate::conn::Connection;
use crate::constants::*;
use crate::error::PqError;
use crate::notice::{Notice, NoticeHandler};
use crate::params::{Param, TextParams};
use crate::result::{native_index, PgResult};
use crate::stat::{summarize, FieldStat, ResultView, StatSummary};

fn bad_conn() -> Connection {
    let conn = Connection::connect("bogus_option=1", false).unwrap();
    assert_eq!(conn.status().unwrap(), ConnStatus::Bad.code());
    conn
}

fn empty_result(status: ExecStatusType) -> PgResult {
    unsafe { PgResult::from_raw(pq_sys::PQmakeEmptyPGresult(ptr::null_mut(), status)) }.unwrap()
}

/// A `TUPLES_OK` result with columns `id int4` and `name text` and one row
/// `(42, NULL)`.
fn one_row_result() -> PgResult {
    let res = empty_result(ExecStatusType::PGRES_TUPLES_OK);
    let id = CString::new("id").unwrap();
    let name = CString::new("name").unwrap();
    let mut attrs = [
        pq_sys::PGresAttDesc {
            name: id.as_ptr() as *mut _,
            tableid: 16384,
            columnid: 1,
            format: 0,
            typid: 23,
            typlen: 4,
            atttypmod: -1,
        },
        pq_sys::PGresAttDesc {
            name: name.as_ptr() as *mut _,
            tableid: 16384,
            columnid: 2,
            format: 0,
            typid: 25,
            typlen: -1,
            atttypmod: -1,
        },
    ];
    let value = CString::new("42").unwrap();
    unsafe {
        assert_eq!(pq_sys::PQsetResultAttrs(res.as_ptr(), 2, attrs.as_mut_ptr()), 1);
        assert_eq!(pq_sys::PQsetvalue(res.as_ptr(), 0, 0, value.as_ptr() as *mut _, 2), 1);
        assert_eq!(pq_sys::PQsetvalue(res.as_ptr(), 0, 1, ptr::null_mut(), -1), 1);
    }
    res
}

/// Records every notice it sees.
#[derive(Default)]
struct Recorder {
    messages: RefCell<Vec<String>>,
    results: RefCell<Vec<(i32, Option<String>)>>,
}

impl NoticeHandler for Recorder {
    fn invoke(&self, notice: Notice<'_>) {
        match notice {
            Notice::Message(msg) => self.messages.borrow_mut().push(msg.to_string()),
            Notice::Result(res) => {
                assert!(res.is_observed());
                self.results
                    .borrow_mut()
                    .push((res.status().unwrap(), res.error_message().unwrap()));
            }
        }
    }
}

// ============================================================================
// Indexes and parameters
// ============================================================================

mod indexes {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_one_based_to_native() {
        assert_eq!(native_index("row", 1).unwrap(), 0);
        assert_eq!(native_index("column", 7).unwrap(), 6);
        assert_eq!(
            native_index("row", i64::from(i32::MAX)).unwrap(),
            i32::MAX - 1
        );
    }

    #[test]
    fn test_rejects_zero_negative_and_overflow() {
        for value in [0, -1, i64::MIN, i64::from(i32::MAX) + 1] {
            let err = native_index("row", value).unwrap_err();
            assert!(matches!(err, PqError::Index { what: "row", .. }), "{value}");
        }
        assert_eq!(
            native_index("column", 0).unwrap_err().to_string(),
            "column must be a positive integer, got 0"
        );
    }
}

mod params {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_forms() {
        assert_eq!(Param::Null.to_text(), None);
        assert_eq!(Param::Text("abc".into()).to_text().unwrap(), "abc");
        assert_eq!(Param::Bool(true).to_text().unwrap(), "TRUE");
        assert_eq!(Param::Bool(false).to_text().unwrap(), "FALSE");
        assert_eq!(Param::Int(-42).to_text().unwrap(), "-42");
        assert_eq!(Param::Int(i64::MAX).to_text().unwrap(), "9223372036854775807");
        assert_eq!(Param::Float(1.5).to_text().unwrap(), "1.5");
        assert_eq!(Param::Float(0.1).to_text().unwrap(), "0.1");
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(Param::Float(f64::NAN).to_text().unwrap(), "NaN");
        assert_eq!(Param::Float(f64::INFINITY).to_text().unwrap(), "Infinity");
        assert_eq!(Param::Float(f64::NEG_INFINITY).to_text().unwrap(), "-Infinity");
    }

    #[test]
    fn test_null_params_are_null_pointers() {
        let params =
            TextParams::new(&[Param::Int(1), Param::Null, Param::Text("x".into())]).unwrap();
        assert_eq!(params.count(), 3);
        unsafe {
            assert!(!(*params.values()).is_null());
            assert!((*params.values().add(1)).is_null());
            assert!(!(*params.values().add(2)).is_null());
        }
    }

    #[test]
    fn test_empty_params() {
        let params = TextParams::new(&[]).unwrap();
        assert_eq!(params.count(), 0);
        assert!(params.values().is_null());
    }

    #[test]
    fn test_interior_nul_rejected() {
        let err = TextParams::new(&[Param::Text("a\0b".into())]).err().unwrap();
        assert!(matches!(err, PqError::Nul(_)));
    }

    #[test]
    fn test_too_many_params() {
        let params = vec![Param::Null; PQ_QUERY_PARAM_MAX_LIMIT + 1];
        let err = TextParams::new(&params).err().unwrap();
        assert!(matches!(
            err,
            PqError::TooManyParams { count, limit } if count == limit + 1
        ));
        assert!(TextParams::new(&params[1..]).is_ok());
    }

    #[test]
    fn test_param_error_message() {
        let err = PqError::Param {
            position: 2,
            type_name: "table".into(),
        };
        assert_eq!(err.to_string(), "bad argument #2 (<table> param is not supported)");
    }
}

// ============================================================================
// Result summary
// ============================================================================

mod summary {
    use super::*;
    use pretty_assertions::assert_eq;

    struct FakeView {
        status: i32,
        message: &'static str,
        cmd_tuples: &'static str,
        ntuples: i32,
        nfields: i32,
        nparams: i32,
    }

    impl FakeView {
        fn new(status: i32) -> Self {
            Self {
                status,
                message: "",
                cmd_tuples: "",
                ntuples: 0,
                nfields: 0,
                nparams: 0,
            }
        }
    }

    impl ResultView for FakeView {
        fn status(&self) -> i32 {
            self.status
        }
        fn status_text(&self) -> String {
            ExecStatus::try_from(self.status)
                .map(|s| s.name().to_string())
                .unwrap_or_else(|_| "invalid ExecStatusType code".to_string())
        }
        fn cmd_status(&self) -> String {
            "SELECT 2".to_string()
        }
        fn ntuples(&self) -> i32 {
            self.ntuples
        }
        fn nfields(&self) -> i32 {
            self.nfields
        }
        fn binary_tuples(&self) -> bool {
            true
        }
        fn field(&self, col: i32) -> FieldStat {
            FieldStat {
                name: format!("c{col}"),
                type_oid: 23,
                size: 4,
                modifier: -1,
                ..FieldStat::default()
            }
        }
        fn cmd_tuples_text(&self) -> String {
            self.cmd_tuples.to_string()
        }
        fn oid_value(&self) -> u32 {
            0
        }
        fn nparams(&self) -> i32 {
            self.nparams
        }
        fn param_type(&self, param: i32) -> u32 {
            [23, 25][param as usize]
        }
        fn error_message(&self) -> String {
            self.message.to_string()
        }
    }

    #[test]
    fn test_rows_include_fields_and_command_info() {
        let view = FakeView {
            ntuples: 2,
            nfields: 3,
            cmd_tuples: "2",
            ..FakeView::new(ExecStatus::TuplesOk.code())
        };
        let stat = summarize(&view);

        assert_eq!(stat.ntuples, Some(2));
        assert_eq!(stat.nfields, Some(3));
        assert_eq!(stat.binary_tuples, Some(true));
        let names: Vec<_> = stat.fields.unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["c0", "c1", "c2"]);
        assert_eq!(stat.cmd_tuples, Some(2));
        assert_eq!(stat.oid_value, Some(0));
        assert_eq!(stat.error, None);
    }

    #[test]
    fn test_zero_rows_omit_field_info() {
        let view = FakeView {
            nfields: 3,
            ..FakeView::new(ExecStatus::SingleTuple.code())
        };
        let stat = summarize(&view);

        assert_eq!(stat.ntuples, Some(0));
        assert_eq!(stat.nfields, None);
        assert_eq!(stat.binary_tuples, None);
        assert_eq!(stat.fields, None);
        assert_eq!(stat.oid_value, Some(0));
    }

    #[test]
    fn test_command_ok() {
        let view = FakeView {
            cmd_tuples: "5",
            nparams: 2,
            ..FakeView::new(ExecStatus::CommandOk.code())
        };
        let stat = summarize(&view);

        assert_eq!(stat.ntuples, None);
        assert_eq!(stat.cmd_tuples, Some(5));
        assert_eq!(stat.nparams, Some(2));
        assert_eq!(stat.params, Some(vec![23, 25]));
        assert_eq!(stat.error, None);
    }

    #[test]
    fn test_malformed_cmd_tuples_is_absent() {
        for text in ["", "abc", "-1", "12x"] {
            let view = FakeView {
                cmd_tuples: text,
                ..FakeView::new(ExecStatus::CommandOk.code())
            };
            assert_eq!(summarize(&view).cmd_tuples, None, "{text:?}");
        }
    }

    #[test]
    fn test_quiet_statuses() {
        for status in [
            ExecStatus::EmptyQuery,
            ExecStatus::PipelineSync,
            ExecStatus::CopyOut,
            ExecStatus::CopyIn,
            ExecStatus::CopyBoth,
        ] {
            let stat = summarize(&FakeView::new(status.code()));
            assert_eq!(
                stat,
                StatSummary {
                    status: status.code(),
                    status_text: status.name().to_string(),
                    cmd_status: "SELECT 2".to_string(),
                    ..StatSummary::default()
                }
            );
        }
    }

    #[test]
    fn test_error_statuses_carry_message() {
        for status in [
            ExecStatus::BadResponse,
            ExecStatus::NonfatalError,
            ExecStatus::FatalError,
            ExecStatus::PipelineAborted,
        ] {
            let view = FakeView {
                message: "ERROR:  boom\n",
                ..FakeView::new(status.code())
            };
            let stat = summarize(&view);
            assert_eq!(stat.error.as_deref(), Some("ERROR:  boom\n"));
            assert_eq!(stat.ntuples, None);
            assert_eq!(stat.oid_value, None);
        }
    }

    #[test]
    fn test_error_falls_back_to_status_text() {
        let stat = summarize(&FakeView::new(ExecStatus::FatalError.code()));
        assert_eq!(stat.error.as_deref(), Some("PGRES_FATAL_ERROR"));
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let stat = summarize(&FakeView::new(99));
        assert_eq!(stat.error.as_deref(), Some("invalid ExecStatusType code"));
        assert_eq!(stat.cmd_tuples, None);
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let view = FakeView {
            ntuples: 1,
            nfields: 1,
            ..FakeView::new(ExecStatus::TuplesOk.code())
        };
        let json = serde_json::to_value(summarize(&view)).unwrap();
        let obj = json.as_object().unwrap();

        assert!(!obj.contains_key("cmd_tuples"));
        assert!(!obj.contains_key("nparams"));
        assert!(!obj.contains_key("error"));
        assert_eq!(
            json["fields"][0],
            serde_json::json!({
                "name": "c0", "table": 0, "tablecol": 0, "format": 0,
                "type": 23, "size": 4, "mod": -1,
            })
        );
    }

    #[test]
    fn test_native_empty_command_result() {
        let res = empty_result(ExecStatusType::PGRES_COMMAND_OK);
        assert_eq!(
            res.stat().unwrap(),
            StatSummary {
                status: ExecStatus::CommandOk.code(),
                status_text: "PGRES_COMMAND_OK".to_string(),
                cmd_status: String::new(),
                oid_value: Some(0),
                ..StatSummary::default()
            }
        );
    }

    #[test]
    fn test_native_fatal_result_without_message() {
        let res = empty_result(ExecStatusType::PGRES_FATAL_ERROR);
        let stat = res.stat().unwrap();
        assert_eq!(stat.error.as_deref(), Some("PGRES_FATAL_ERROR"));
    }

    #[test]
    fn test_native_tuples_result() {
        let stat = one_row_result().stat().unwrap();
        assert_eq!(stat.ntuples, Some(1));
        assert_eq!(stat.nfields, Some(2));
        assert_eq!(stat.binary_tuples, Some(false));
        assert_eq!(
            stat.fields.unwrap()[0],
            FieldStat {
                name: "id".to_string(),
                table: 16384,
                tablecol: 1,
                format: 0,
                type_oid: 23,
                size: 4,
                modifier: -1,
            }
        );
    }
}

// ============================================================================
// Result handles
// ============================================================================

mod results {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accessors_are_one_based() {
        let res = one_row_result();
        assert_eq!(res.ntuples().unwrap(), 1);
        assert_eq!(res.nfields().unwrap(), 2);
        assert_eq!(res.fname(1).unwrap().as_deref(), Some("id"));
        assert_eq!(res.fname(2).unwrap().as_deref(), Some("name"));
        assert_eq!(res.ftype(1).unwrap(), 23);
        assert_eq!(res.ftable(2).unwrap(), 16384);
        assert_eq!(res.ftablecol(2).unwrap(), 2);
        assert_eq!(res.fsize(2).unwrap(), -1);
        assert_eq!(res.get_value(1, 1).unwrap(), Some(&b"42"[..]));
        assert_eq!(res.get_length(1, 1).unwrap(), 2);
        assert!(!res.get_is_null(1, 1).unwrap());
        assert!(res.get_is_null(1, 2).unwrap());
    }

    #[test]
    fn test_fnumber() {
        let res = one_row_result();
        assert_eq!(res.fnumber("id").unwrap(), 1);
        assert_eq!(res.fnumber("name").unwrap(), 2);
        assert_eq!(res.fnumber("missing").unwrap(), -1);
    }

    #[test]
    fn test_bad_index_never_reaches_libpq() {
        let res = one_row_result();
        assert!(matches!(res.fname(0), Err(PqError::Index { .. })));
        assert!(matches!(res.get_value(0, 1), Err(PqError::Index { .. })));
        assert!(matches!(res.get_value(1, -3), Err(PqError::Index { .. })));
        assert!(matches!(res.param_type(0), Err(PqError::Index { .. })));
    }

    #[test]
    fn test_out_of_range_is_none() {
        let res = one_row_result();
        assert_eq!(res.get_value(2, 1).unwrap(), None);
        assert_eq!(res.fname(3).unwrap(), None);
    }

    #[test]
    fn test_status_and_messages() {
        let res = empty_result(ExecStatusType::PGRES_EMPTY_QUERY);
        assert_eq!(res.status().unwrap(), 0);
        assert_eq!(res.status_text().unwrap(), "PGRES_EMPTY_QUERY");
        assert_eq!(res.exec_status().unwrap(), Some(ExecStatus::EmptyQuery));
        assert_eq!(res.error_message().unwrap(), None);
        assert_eq!(res.cmd_tuples().unwrap(), None);
        assert_eq!(res.error_field(DiagField::Sqlstate.code()).unwrap(), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut res = one_row_result();
        res.clear();
        res.clear();
        assert!(res.is_cleared());
        assert!(res.as_ptr().is_null());
    }

    #[test]
    fn test_use_after_clear() {
        let mut res = one_row_result();
        res.clear();
        let err = res.ntuples().unwrap_err();
        assert!(matches!(err, PqError::Freed));
        assert_eq!(err.to_string(), "attempt to use a freed object");
        assert!(matches!(res.get_value(1, 1), Err(PqError::Freed)));
        assert!(matches!(res.stat(), Err(PqError::Freed)));
        assert!(matches!(res.fnumber("id"), Err(PqError::Freed)));
    }

    #[test]
    fn test_observed_result_is_not_freed_by_clear() {
        let owner = one_row_result();
        let mut observed = unsafe { PgResult::observe(owner.as_ptr()) };
        assert!(observed.is_observed());
        observed.clear();
        assert!(observed.is_cleared());
        // the owner is still intact
        assert_eq!(owner.ntuples().unwrap(), 1);
    }
}

// ============================================================================
// Connections
// ============================================================================

mod connections {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bad_connection_is_returned() {
        let conn = bad_conn();
        let msg = conn.error_message().unwrap().unwrap();
        assert!(msg.contains("bogus_option"), "{msg}");
        assert_eq!(conn.socket().unwrap(), -1);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut conn = bad_conn();
        conn.finish();
        conn.finish();
        assert!(conn.is_finished());
        assert!(matches!(conn.status(), Err(PqError::Freed)));
        assert!(matches!(conn.exec("SELECT 1"), Err(PqError::Freed)));
        assert!(matches!(conn.untrace(), Err(PqError::Freed)));
    }

    #[test]
    fn test_exec_without_server_is_native_error() {
        let conn = bad_conn();
        match conn.exec("SELECT 1") {
            Err(PqError::Native(msg)) => assert!(msg.contains("no connection"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(conn.send_query("SELECT 1"), Err(PqError::Native(_))));
    }

    #[test]
    fn test_make_empty_result_copies_error() {
        let conn = bad_conn();
        let res = conn.make_empty_result(ExecStatus::FatalError).unwrap();
        assert!(res.stat().unwrap().error.unwrap().contains("bogus_option"));

        let res = conn.make_empty_result(ExecStatus::CommandOk).unwrap();
        assert_eq!(res.status().unwrap(), 1);
    }

    #[test]
    fn test_get_cancel_without_socket() {
        let conn = bad_conn();
        assert!(matches!(conn.get_cancel(), Err(PqError::Os { .. })));
    }

    #[test]
    fn test_escaping() {
        let conn = bad_conn();
        assert_eq!(conn.escape_literal("it's").unwrap(), "'it''s'");
        assert_eq!(conn.escape_identifier("a\"b").unwrap(), "\"a\"\"b\"");
        assert_eq!(conn.escape_string_conn("it's").unwrap(), "it''s");
        assert_eq!(conn.escape_bytea_conn(b"AB").unwrap(), b"AB".to_vec());
    }

    #[test]
    fn test_error_verbosity_returns_previous() {
        let conn = bad_conn();
        assert_eq!(
            conn.set_error_verbosity(Verbosity::Verbose).unwrap(),
            Verbosity::Default.code()
        );
        assert_eq!(
            conn.set_error_verbosity(Verbosity::Terse).unwrap(),
            Verbosity::Verbose.code()
        );
        assert_eq!(
            conn.set_error_context_visibility(ContextVisibility::Never).unwrap(),
            ContextVisibility::Errors.code()
        );
    }

    #[test]
    fn test_blocking_flags() {
        let conn = bad_conn();
        assert!(!conn.is_nonblocking().unwrap());
        assert_eq!(conn.pipeline_status().unwrap(), PipelineStatus::Off.code());
        assert_eq!(conn.transaction_status().unwrap(), TransactionStatus::Unknown.code());
    }

}

// ============================================================================
// Notice callbacks
// ============================================================================

mod notices {
    use super::*;
    use pretty_assertions::assert_eq;

    fn trigger(res: &PgResult) {
        // row 2 does not exist, so libpq emits a notice through the hooks
        // the result was created with
        assert_eq!(res.get_value(2, 1).unwrap(), None);
    }

    #[test]
    fn test_processor_receives_messages() {
        let conn = bad_conn();
        let recorder = Rc::new(Recorder::default());
        conn.set_notice_processor(Some(recorder.clone())).unwrap();

        let res = conn.make_empty_result(ExecStatus::TuplesOk).unwrap();
        trigger(&res);

        let messages = recorder.messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("out of range"), "{}", messages[0]);
    }

    #[test]
    fn test_reregistration_swaps_handler() {
        let conn = bad_conn();
        let first = Rc::new(Recorder::default());
        let second = Rc::new(Recorder::default());
        conn.set_notice_processor(Some(first.clone())).unwrap();
        conn.set_notice_processor(Some(second.clone())).unwrap();

        trigger(&conn.make_empty_result(ExecStatus::TuplesOk).unwrap());

        assert_eq!(first.messages.borrow().len(), 0);
        assert_eq!(second.messages.borrow().len(), 1);
    }

    #[test]
    fn test_unregister_restores_default() {
        let conn = bad_conn();
        let recorder = Rc::new(Recorder::default());
        conn.set_notice_processor(Some(recorder.clone())).unwrap();
        let early = conn.make_empty_result(ExecStatus::TuplesOk).unwrap();

        conn.set_notice_processor(None).unwrap();
        assert_eq!(Rc::strong_count(&recorder), 1);

        // a result from before the removal still calls the trampoline,
        // which forwards to the libpq default
        trigger(&early);
        trigger(&conn.make_empty_result(ExecStatus::TuplesOk).unwrap());
        assert_eq!(recorder.messages.borrow().len(), 0);
    }

    #[test]
    fn test_results_outlive_connection_hooks() {
        let mut conn = bad_conn();
        let recorder = Rc::new(Recorder::default());
        conn.set_notice_processor(Some(recorder.clone())).unwrap();
        let res = conn.make_empty_result(ExecStatus::TuplesOk).unwrap();

        conn.finish();
        assert_eq!(Rc::strong_count(&recorder), 1);
        trigger(&res);
        assert_eq!(recorder.messages.borrow().len(), 0);
    }

    #[test]
    fn test_receiver_gets_nonfatal_result() {
        let conn = bad_conn();
        let recorder = Rc::new(Recorder::default());
        conn.set_notice_receiver(Some(recorder.clone())).unwrap();

        trigger(&conn.make_empty_result(ExecStatus::TuplesOk).unwrap());

        let results = recorder.results.borrow();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, ExecStatus::NonfatalError.code());
        assert!(results[0].1.as_deref().unwrap().contains("out of range"));
        // the receiver replaces the default, so the processor never fires
        assert_eq!(recorder.messages.borrow().len(), 0);
    }

    #[test]
    fn test_closure_handler() {
        let conn = bad_conn();
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        let handler = move |notice: Notice<'_>| {
            if let Notice::Message(_) = notice {
                *counter.borrow_mut() += 1;
            }
        };
        conn.set_notice_processor(Some(Rc::new(handler))).unwrap();
        trigger(&conn.make_empty_result(ExecStatus::TuplesOk).unwrap());
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let conn = bad_conn();
        let handler = |_: Notice<'_>| panic!("handler failure");
        conn.set_notice_processor(Some(Rc::new(handler))).unwrap();
        trigger(&conn.make_empty_result(ExecStatus::TuplesOk).unwrap());
    }

    #[test]
    fn test_call_handlers_directly() {
        let conn = bad_conn();
        assert!(!conn.call_notice_processor("hello").unwrap());

        let recorder = Rc::new(Recorder::default());
        conn.set_notice_processor(Some(recorder.clone())).unwrap();
        conn.set_notice_receiver(Some(recorder.clone())).unwrap();

        assert!(conn.call_notice_processor("hello").unwrap());
        assert_eq!(*recorder.messages.borrow(), vec!["hello".to_string()]);

        let res = conn.make_empty_result(ExecStatus::NonfatalError).unwrap();
        let observed = unsafe { PgResult::observe(res.as_ptr()) };
        assert!(conn.call_notice_receiver(&observed).unwrap());
        assert_eq!(recorder.results.borrow()[0].0, ExecStatus::NonfatalError.code());

        let mut cleared = conn.make_empty_result(ExecStatus::CommandOk).unwrap();
        cleared.clear();
        assert!(matches!(conn.call_notice_receiver(&cleared), Err(PqError::Freed)));
    }
}

// ============================================================================
// Tracing, conninfo and free functions
// ============================================================================

mod tracing {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::trace::TraceFile;

    #[test]
    fn test_invalid_descriptor() {
        assert!(matches!(TraceFile::from_fd(-1), Err(PqError::Os { .. })));
    }

    #[test]
    fn test_missing_directory() {
        let path = std::env::temp_dir().join("pqshim-no-such-dir").join("trace.log");
        assert!(matches!(TraceFile::create(&path), Err(PqError::Os { .. })));
    }

    #[test]
    fn test_trace_and_untrace() {
        let path = std::env::temp_dir().join(format!("pqshim-trace-{}.log", std::process::id()));
        let mut conn = bad_conn();

        assert!(!conn.untrace().unwrap());
        conn.trace(TraceFile::create(&path).unwrap()).unwrap();
        conn.set_trace_flags(PQTRACE_SUPPRESS_TIMESTAMPS).unwrap();
        // replacing a sink closes the old one
        conn.trace(TraceFile::create(&path).unwrap()).unwrap();
        assert!(conn.untrace().unwrap());
        assert!(!conn.untrace().unwrap());

        std::fs::remove_file(&path).unwrap();
    }
}

mod conninfo {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::conninfo::{default_conninfo, parse_conninfo};

    #[test]
    fn test_parse_keywords() {
        let info = parse_conninfo("host=db.example port=5433 application_name=app").unwrap();
        assert_eq!(info["host"].val.as_deref(), Some("db.example"));
        assert_eq!(info["port"].val.as_deref(), Some("5433"));
        assert_eq!(info["application_name"].val.as_deref(), Some("app"));
        assert_eq!(info["dbname"].val, None);
        assert_eq!(info["password"].dispchar.as_deref(), Some("*"));
    }

    #[test]
    fn test_parse_uri() {
        let info = parse_conninfo("postgresql://alice@db.example:6543/shop").unwrap();
        assert_eq!(info["user"].val.as_deref(), Some("alice"));
        assert_eq!(info["dbname"].val.as_deref(), Some("shop"));
        assert_eq!(info["port"].val.as_deref(), Some("6543"));
    }

    #[test]
    fn test_parse_error_is_native() {
        match parse_conninfo("bogus_option=1") {
            Err(PqError::Native(msg)) => assert!(msg.contains("bogus_option"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse_conninfo("host=a\0b"), Err(PqError::Nul(_))));
    }

    #[test]
    fn test_defaults_list_every_keyword() {
        let info = default_conninfo().unwrap();
        for keyword in ["host", "port", "dbname", "user", "password"] {
            assert!(info.contains_key(keyword), "{keyword}");
        }
        assert_eq!(info["port"].compiled.as_deref(), Some("5432"));
    }
}

mod util {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::util::*;

    #[test]
    fn test_versions() {
        assert!(lib_version() >= 100_000);
        assert!(is_threadsafe());
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(char_to_encoding("UTF8").unwrap(), 6);
        assert_eq!(char_to_encoding("no-such-encoding").unwrap(), -1);
        assert_eq!(encoding_to_char(6), "UTF8");
        assert_eq!(encoding_to_char(0), "SQL_ASCII");
        assert!(valid_server_encoding_id(6));
        assert!(!valid_server_encoding_id(-1));
    }

    #[test]
    fn test_mblen() {
        assert_eq!(mblen("a", 6).unwrap(), 1);
        assert_eq!(mblen("é", 6).unwrap(), 2);
        assert_eq!(mblen_bounded("€", 6).unwrap(), 3);
        assert_eq!(dsplen("a", 6).unwrap(), 1);
    }

    #[test]
    fn test_bytea_and_passwords() {
        assert_eq!(unescape_bytea("\\x414243").unwrap(), b"ABC".to_vec());
        let md5 = encrypt_password("secret", "alice").unwrap();
        assert!(md5.starts_with("md5"));
        assert_eq!(md5.len(), 35);
    }

    #[test]
    fn test_ping_without_server() {
        assert_eq!(ping("bogus_option=1").unwrap(), Ping::NoAttempt.code());
    }
}

// ============================================================================
// Constants
// ============================================================================

mod constants {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_values_match_libpq() {
        use pq_sys::*;

        assert_eq!(ConnStatus::Ok.code(), ConnStatusType::CONNECTION_OK as i32);
        assert_eq!(ConnStatus::Bad.code(), ConnStatusType::CONNECTION_BAD as i32);
        assert_eq!(
            ConnStatus::CheckStandby.code(),
            ConnStatusType::CONNECTION_CHECK_STANDBY as i32
        );
        assert_eq!(
            PollingStatus::Ok.code(),
            PostgresPollingStatusType::PGRES_POLLING_OK as i32
        );
        assert_eq!(
            ExecStatus::PipelineAborted.code(),
            ExecStatusType::PGRES_PIPELINE_ABORTED as i32
        );
        assert_eq!(
            ExecStatus::SingleTuple.code(),
            ExecStatusType::PGRES_SINGLE_TUPLE as i32
        );
        assert_eq!(
            TransactionStatus::InError.code(),
            PGTransactionStatusType::PQTRANS_INERROR as i32
        );
        assert_eq!(Verbosity::Sqlstate.code(), PGVerbosity::PQERRORS_SQLSTATE as i32);
        assert_eq!(
            ContextVisibility::Always.code(),
            PGContextVisibility::PQSHOW_CONTEXT_ALWAYS as i32
        );
        assert_eq!(Ping::NoAttempt.code(), PGPing::PQPING_NO_ATTEMPT as i32);
        assert_eq!(
            PipelineStatus::Aborted.code(),
            PGpipelineStatus::PQ_PIPELINE_ABORTED as i32
        );
    }

    #[test]
    fn test_every_exec_status_maps_to_native() {
        for &(name, status) in ExecStatus::ALL {
            let res = empty_result(status.to_native());
            assert_eq!(res.status().unwrap(), status.code());
            assert_eq!(res.status_text().unwrap(), name);
        }
    }

    #[test]
    fn test_error_statuses() {
        let errors: Vec<_> = ExecStatus::ALL
            .iter()
            .filter(|(_, status)| status.is_error())
            .map(|&(name, _)| name)
            .collect();
        assert_eq!(
            errors,
            vec![
                "PGRES_BAD_RESPONSE",
                "PGRES_NONFATAL_ERROR",
                "PGRES_FATAL_ERROR",
                "PGRES_PIPELINE_ABORTED",
            ]
        );
    }

    #[test]
    fn test_diag_fields_are_protocol_bytes() {
        assert_eq!(DiagField::Severity.code(), i32::from(b'S'));
        assert_eq!(DiagField::Sqlstate.code(), i32::from(b'C'));
        assert_eq!(DiagField::MessagePrimary.code(), i32::from(b'M'));
        assert_eq!(DiagField::InternalPosition.code(), i32::from(b'p'));
        assert_eq!(DiagField::SourceFunction.code(), i32::from(b'R'));
    }

    #[test]
    fn test_name_tables_round_trip() {
        for &(name, status) in ConnStatus::ALL {
            assert_eq!(ConnStatus::try_from(status.code()).unwrap(), status);
            assert_eq!(status.name(), name);
        }
        assert!(matches!(
            ExecStatus::try_from(12),
            Err(PqError::Enum { kind: "result status", value: 12 })
        ));
        assert!(Verbosity::try_from(-1).is_err());
    }
}

// ============================================================================
// Outcomes
// ============================================================================

mod outcomes {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::conn::{CopyData, Progress};
    use crate::outcome::Outcome;

    fn native(msg: &str) -> PqError {
        PqError::Native(msg.to_string())
    }

    fn slots<T>(outcome: Outcome<T>) -> (Option<T>, Option<String>, Option<bool>) {
        (outcome.value, outcome.error.map(|e| e.to_string()), outcome.retry)
    }

    #[test]
    fn test_value() {
        assert_eq!(slots(Outcome::value(Ok(7)).unwrap()), (Some(7), None, None));
        assert_eq!(
            slots(Outcome::<i32>::value(Err(native("no connection"))).unwrap()),
            (None, Some("no connection".to_string()), None)
        );
    }

    #[test]
    fn test_status_and_flag() {
        assert_eq!(slots(Outcome::status(Ok(())).unwrap()), (Some(true), None, None));
        assert_eq!(
            slots(Outcome::status(Err(native("lost"))).unwrap()),
            (Some(false), Some("lost".to_string()), None)
        );
        assert_eq!(slots(Outcome::flag(Ok(false)).unwrap()), (Some(false), None, None));
    }

    #[test]
    fn test_progress() {
        assert_eq!(
            slots(Outcome::progress(Ok(Progress::Done)).unwrap()),
            (Some(true), None, Some(false))
        );
        assert_eq!(
            slots(Outcome::progress(Ok(Progress::WouldBlock)).unwrap()),
            (Some(false), None, Some(true))
        );
        assert_eq!(
            slots(Outcome::progress(Err(native("broken pipe"))).unwrap()),
            (Some(false), Some("broken pipe".to_string()), Some(false))
        );
    }

    #[test]
    fn test_copy_data() {
        assert_eq!(
            slots(Outcome::copy_data(Ok(CopyData::Row(b"1\n".to_vec()))).unwrap()),
            (Some(b"1\n".to_vec()), None, Some(false))
        );
        assert_eq!(
            slots(Outcome::copy_data(Ok(CopyData::Pending)).unwrap()),
            (None, None, Some(true))
        );
        assert_eq!(
            slots(Outcome::copy_data(Ok(CopyData::Done)).unwrap()),
            (None, None, Some(false))
        );
    }

    #[test]
    fn test_os_errors_are_outcomes() {
        let err = PqError::Os {
            context: "connect",
            source: std::io::Error::from_raw_os_error(libc::ENOMEM),
        };
        let outcome = Outcome::<i32>::value(Err(err)).unwrap();
        assert!(matches!(outcome.error, Some(PqError::Os { context: "connect", .. })));
    }

    #[test]
    fn test_other_errors_are_raised() {
        assert!(matches!(Outcome::<i32>::value(Err(PqError::Freed)), Err(PqError::Freed)));
        assert!(matches!(
            Outcome::progress(Err(PqError::TooLarge { what: "copy data", len: 1 })),
            Err(PqError::TooLarge { .. })
        ));
        let bad = PqError::Index { what: "row number", value: 0 };
        assert!(matches!(Outcome::status(Err(bad)), Err(PqError::Index { .. })));
    }
}

// ============================================================================
// Integration Tests (require running PostgreSQL)
// ============================================================================

#[cfg(feature = "postgres-integration-tests")]
mod integration {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::conn::{CopyData, Progress};

    fn test_conninfo() -> String {
        std::env::var("PQSHIM_TEST_CONNINFO")
            .unwrap_or_else(|_| "host=localhost user=postgres dbname=postgres".to_string())
    }

    fn connect() -> Connection {
        let conn = Connection::connect(&test_conninfo(), false).unwrap();
        assert_eq!(
            conn.status().unwrap(),
            ConnStatus::Ok.code(),
            "{:?}",
            conn.error_message()
        );
        conn
    }

    #[test]
    fn test_simple_query() {
        let conn = connect();
        let res = conn.exec("SELECT 1 AS num").unwrap();
        assert_eq!(res.exec_status().unwrap(), Some(ExecStatus::TuplesOk));
        assert_eq!(res.fname(1).unwrap().as_deref(), Some("num"));
        assert_eq!(res.get_value(1, 1).unwrap(), Some(&b"1"[..]));
        assert_eq!(res.cmd_status().unwrap(), "SELECT 1");
        assert_eq!(res.cmd_tuples().unwrap(), Some(1));
    }

    #[test]
    fn test_exec_params() {
        let conn = connect();
        let res = conn
            .exec_params(
                "SELECT $1::int + $2::int, $3::bool, $4::text IS NULL",
                &[Param::Int(2), Param::Text("3".into()), Param::Bool(true), Param::Null],
            )
            .unwrap();
        assert_eq!(res.get_value(1, 1).unwrap(), Some(&b"5"[..]));
        assert_eq!(res.get_value(1, 2).unwrap(), Some(&b"t"[..]));
        assert_eq!(res.get_value(1, 3).unwrap(), Some(&b"t"[..]));
    }

    #[test]
    fn test_prepared_statement() {
        let conn = connect();
        let res = conn.prepare("pqshim_add", "SELECT $1::int8 * 2", 1).unwrap();
        assert_eq!(res.exec_status().unwrap(), Some(ExecStatus::CommandOk));

        let desc = conn.describe_prepared("pqshim_add").unwrap();
        assert_eq!(desc.nparams().unwrap(), 1);
        assert_eq!(desc.param_type(1).unwrap(), 20);

        let res = conn.exec_prepared("pqshim_add", &[Param::Int(21)]).unwrap();
        assert_eq!(res.get_value(1, 1).unwrap(), Some(&b"42"[..]));
    }

    #[test]
    fn test_error_result() {
        let conn = connect();
        let res = conn.exec("SELECT * FROM pqshim_missing_table").unwrap();
        assert_eq!(res.exec_status().unwrap(), Some(ExecStatus::FatalError));
        assert_eq!(
            res.error_field(DiagField::Sqlstate.code()).unwrap().as_deref(),
            Some("42P01")
        );
        assert!(res.stat().unwrap().error.unwrap().contains("pqshim_missing_table"));
    }

    #[test]
    fn test_async_query_drains() {
        let conn = connect();
        conn.send_query("SELECT 1; SELECT 2").unwrap();
        let mut values = Vec::new();
        while let Some(res) = conn.get_result().unwrap() {
            values.push(res.get_value(1, 1).unwrap().unwrap().to_vec());
        }
        assert_eq!(values, vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn test_copy_out() {
        let conn = connect();
        let res = conn.exec("COPY (SELECT generate_series(1, 3)) TO STDOUT").unwrap();
        assert_eq!(res.exec_status().unwrap(), Some(ExecStatus::CopyOut));

        let mut rows = Vec::new();
        loop {
            match conn.get_copy_data(false).unwrap() {
                CopyData::Row(row) => rows.push(row),
                CopyData::Done => break,
                CopyData::Pending => unreachable!("blocking mode never returns pending"),
            }
        }
        assert_eq!(rows, vec![b"1\n".to_vec(), b"2\n".to_vec(), b"3\n".to_vec()]);
        let done = conn.get_result().unwrap().unwrap();
        assert_eq!(done.exec_status().unwrap(), Some(ExecStatus::CommandOk));
    }

    #[test]
    fn test_listen_notify() {
        let conn = connect();
        conn.exec("LISTEN pqshim_channel").unwrap();
        conn.exec("NOTIFY pqshim_channel, 'hello'").unwrap();
        let notify = conn.notifies().unwrap().unwrap();
        assert_eq!(notify.relname().unwrap(), "pqshim_channel");
        assert_eq!(notify.extra().unwrap(), "hello");
        assert_eq!(notify.be_pid().unwrap(), conn.backend_pid().unwrap());
        assert!(conn.notifies().unwrap().is_none());
    }

    #[test]
    fn test_server_notice_reaches_processor() {
        let conn = connect();
        let recorder = Rc::new(Recorder::default());
        conn.set_notice_processor(Some(recorder.clone())).unwrap();
        conn.exec("DO $$ BEGIN RAISE NOTICE 'pqshim says hi'; END $$").unwrap();
        assert!(recorder.messages.borrow()[0].contains("pqshim says hi"));
    }

    #[test]
    fn test_cancel_idle_connection() {
        let conn = connect();
        let cancel = conn.get_cancel().unwrap();
        cancel.cancel().unwrap();
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let conn = connect();
        let cancel = conn.get_cancel().unwrap();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(300));
            cancel.cancel()
        });

        let started = std::time::Instant::now();
        let res = conn.exec("SELECT pg_sleep(30)").unwrap();
        canceller.join().unwrap().unwrap();

        assert!(started.elapsed() < std::time::Duration::from_secs(20));
        assert_eq!(res.exec_status().unwrap(), Some(ExecStatus::FatalError));
        assert_eq!(
            res.error_field(DiagField::Sqlstate.code()).unwrap().as_deref(),
            Some("57014")
        );
    }

    #[test]
    fn test_nonblocking_copy_in_would_block() {
        let conn = connect();
        conn.exec("CREATE TEMP TABLE pqshim_sink (line text)").unwrap();
        let res = conn.exec("COPY pqshim_sink FROM STDIN").unwrap();
        assert_eq!(res.exec_status().unwrap(), Some(ExecStatus::CopyIn));
        conn.set_nonblocking(true).unwrap();

        // far more than a socket buffer holds
        let chunk = "pqshim copy line\n".repeat(4096).into_bytes();
        let mut blocked = false;
        for _ in 0..2048 {
            match conn.put_copy_data(&chunk).unwrap() {
                Progress::WouldBlock => {
                    blocked = true;
                    break;
                }
                Progress::Done => {}
            }
            if conn.flush().unwrap() == Progress::WouldBlock {
                blocked = true;
                break;
            }
        }
        assert!(blocked, "send buffer never filled");

        while conn.flush().unwrap() == Progress::WouldBlock {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        while conn.put_copy_end(None).unwrap() == Progress::WouldBlock {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        conn.set_nonblocking(false).unwrap();
        let done = conn.get_result().unwrap().unwrap();
        assert_eq!(done.exec_status().unwrap(), Some(ExecStatus::CommandOk));
    }
}
