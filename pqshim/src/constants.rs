//! libpq enumerations and flag values.
//!
//! Every value here is numerically identical to the one in `libpq-fe.h` /
//! `postgres_ext.h`; code written against the binding compares raw integers,
//! so the numbers are part of the interface.

use crate::error::PqError;

macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal => $cname:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value, )+
        }

        impl $name {
            /// Every variant paired with its libpq constant name.
            pub const ALL: &'static [(&'static str, $name)] = &[
                $( ($cname, $name::$variant), )+
            ];

            #[inline]
            pub const fn code(self) -> i32 {
                self as i32
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $cname, )+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = PqError;

            fn try_from(value: i32) -> Result<Self, PqError> {
                match value {
                    $( $value => Ok($name::$variant), )+
                    _ => Err(PqError::Enum { kind: $kind, value }),
                }
            }
        }
    };
}

native_enum! {
    /// `ConnStatusType`
    pub enum ConnStatus ("connection status") {
        Ok = 0 => "CONNECTION_OK",
        Bad = 1 => "CONNECTION_BAD",
        // Non-blocking mode only below here
        Started = 2 => "CONNECTION_STARTED",
        Made = 3 => "CONNECTION_MADE",
        AwaitingResponse = 4 => "CONNECTION_AWAITING_RESPONSE",
        AuthOk = 5 => "CONNECTION_AUTH_OK",
        /// No longer used by libpq.
        Setenv = 6 => "CONNECTION_SETENV",
        SslStartup = 7 => "CONNECTION_SSL_STARTUP",
        Needed = 8 => "CONNECTION_NEEDED",
        CheckWritable = 9 => "CONNECTION_CHECK_WRITABLE",
        Consume = 10 => "CONNECTION_CONSUME",
        GssStartup = 11 => "CONNECTION_GSS_STARTUP",
        CheckTarget = 12 => "CONNECTION_CHECK_TARGET",
        CheckStandby = 13 => "CONNECTION_CHECK_STANDBY",
    }
}

native_enum! {
    /// `PostgresPollingStatusType`
    pub enum PollingStatus ("polling status") {
        Failed = 0 => "PGRES_POLLING_FAILED",
        Reading = 1 => "PGRES_POLLING_READING",
        Writing = 2 => "PGRES_POLLING_WRITING",
        Ok = 3 => "PGRES_POLLING_OK",
        /// Unused; kept for backwards compatibility.
        Active = 4 => "PGRES_POLLING_ACTIVE",
    }
}

native_enum! {
    /// `ExecStatusType`
    pub enum ExecStatus ("result status") {
        EmptyQuery = 0 => "PGRES_EMPTY_QUERY",
        CommandOk = 1 => "PGRES_COMMAND_OK",
        TuplesOk = 2 => "PGRES_TUPLES_OK",
        CopyOut = 3 => "PGRES_COPY_OUT",
        CopyIn = 4 => "PGRES_COPY_IN",
        BadResponse = 5 => "PGRES_BAD_RESPONSE",
        NonfatalError = 6 => "PGRES_NONFATAL_ERROR",
        FatalError = 7 => "PGRES_FATAL_ERROR",
        CopyBoth = 8 => "PGRES_COPY_BOTH",
        SingleTuple = 9 => "PGRES_SINGLE_TUPLE",
        PipelineSync = 10 => "PGRES_PIPELINE_SYNC",
        PipelineAborted = 11 => "PGRES_PIPELINE_ABORTED",
    }
}

native_enum! {
    /// `PGTransactionStatusType`
    pub enum TransactionStatus ("transaction status") {
        Idle = 0 => "PQTRANS_IDLE",
        Active = 1 => "PQTRANS_ACTIVE",
        InTrans = 2 => "PQTRANS_INTRANS",
        InError = 3 => "PQTRANS_INERROR",
        Unknown = 4 => "PQTRANS_UNKNOWN",
    }
}

native_enum! {
    /// `PGVerbosity`
    pub enum Verbosity ("error verbosity") {
        Terse = 0 => "PQERRORS_TERSE",
        Default = 1 => "PQERRORS_DEFAULT",
        Verbose = 2 => "PQERRORS_VERBOSE",
        Sqlstate = 3 => "PQERRORS_SQLSTATE",
    }
}

native_enum! {
    /// `PGContextVisibility`
    pub enum ContextVisibility ("context visibility") {
        Never = 0 => "PQSHOW_CONTEXT_NEVER",
        Errors = 1 => "PQSHOW_CONTEXT_ERRORS",
        Always = 2 => "PQSHOW_CONTEXT_ALWAYS",
    }
}

native_enum! {
    /// `PGPing`
    pub enum Ping ("ping result") {
        Ok = 0 => "PQPING_OK",
        Reject = 1 => "PQPING_REJECT",
        NoResponse = 2 => "PQPING_NO_RESPONSE",
        NoAttempt = 3 => "PQPING_NO_ATTEMPT",
    }
}

native_enum! {
    /// `PGpipelineStatus`
    pub enum PipelineStatus ("pipeline status") {
        Off = 0 => "PQ_PIPELINE_OFF",
        On = 1 => "PQ_PIPELINE_ON",
        Aborted = 2 => "PQ_PIPELINE_ABORTED",
    }
}

native_enum! {
    /// Error and notice field identifiers (`PG_DIAG_*`). The values are the
    /// protocol's single-byte field codes.
    pub enum DiagField ("diagnostic field") {
        Severity = 83 => "PG_DIAG_SEVERITY",
        SeverityNonlocalized = 86 => "PG_DIAG_SEVERITY_NONLOCALIZED",
        Sqlstate = 67 => "PG_DIAG_SQLSTATE",
        MessagePrimary = 77 => "PG_DIAG_MESSAGE_PRIMARY",
        MessageDetail = 68 => "PG_DIAG_MESSAGE_DETAIL",
        MessageHint = 72 => "PG_DIAG_MESSAGE_HINT",
        StatementPosition = 80 => "PG_DIAG_STATEMENT_POSITION",
        InternalPosition = 112 => "PG_DIAG_INTERNAL_POSITION",
        InternalQuery = 113 => "PG_DIAG_INTERNAL_QUERY",
        Context = 87 => "PG_DIAG_CONTEXT",
        SchemaName = 115 => "PG_DIAG_SCHEMA_NAME",
        TableName = 116 => "PG_DIAG_TABLE_NAME",
        ColumnName = 99 => "PG_DIAG_COLUMN_NAME",
        DatatypeName = 100 => "PG_DIAG_DATATYPE_NAME",
        ConstraintName = 110 => "PG_DIAG_CONSTRAINT_NAME",
        SourceFile = 70 => "PG_DIAG_SOURCE_FILE",
        SourceLine = 76 => "PG_DIAG_SOURCE_LINE",
        SourceFunction = 82 => "PG_DIAG_SOURCE_FUNCTION",
    }
}

// Trace output flags
pub const PQTRACE_SUPPRESS_TIMESTAMPS: i32 = 1 << 0;
pub const PQTRACE_REGRESS_MODE: i32 = 1 << 1;

// PQcopyResult option flags
pub const PG_COPYRES_ATTRS: i32 = 0x01;
/// Implies `PG_COPYRES_ATTRS`.
pub const PG_COPYRES_TUPLES: i32 = 0x02;
pub const PG_COPYRES_EVENTS: i32 = 0x04;
pub const PG_COPYRES_NOTICEHOOKS: i32 = 0x08;

/// Upper bound on the number of parameters of a single query.
pub const PQ_QUERY_PARAM_MAX_LIMIT: usize = 65535;

/// Plain integer constants, for bindings that export them by name.
pub const FLAGS: &[(&str, i32)] = &[
    ("PQTRACE_SUPPRESS_TIMESTAMPS", PQTRACE_SUPPRESS_TIMESTAMPS),
    ("PQTRACE_REGRESS_MODE", PQTRACE_REGRESS_MODE),
    ("PG_COPYRES_ATTRS", PG_COPYRES_ATTRS),
    ("PG_COPYRES_TUPLES", PG_COPYRES_TUPLES),
    ("PG_COPYRES_EVENTS", PG_COPYRES_EVENTS),
    ("PG_COPYRES_NOTICEHOOKS", PG_COPYRES_NOTICEHOOKS),
    ("PQ_QUERY_PARAM_MAX_LIMIT", PQ_QUERY_PARAM_MAX_LIMIT as i32),
];

impl ExecStatus {
    pub(crate) fn to_native(self) -> pq_sys::ExecStatusType {
        use pq_sys::ExecStatusType as N;
        match self {
            ExecStatus::EmptyQuery => N::PGRES_EMPTY_QUERY,
            ExecStatus::CommandOk => N::PGRES_COMMAND_OK,
            ExecStatus::TuplesOk => N::PGRES_TUPLES_OK,
            ExecStatus::CopyOut => N::PGRES_COPY_OUT,
            ExecStatus::CopyIn => N::PGRES_COPY_IN,
            ExecStatus::BadResponse => N::PGRES_BAD_RESPONSE,
            ExecStatus::NonfatalError => N::PGRES_NONFATAL_ERROR,
            ExecStatus::FatalError => N::PGRES_FATAL_ERROR,
            ExecStatus::CopyBoth => N::PGRES_COPY_BOTH,
            ExecStatus::SingleTuple => N::PGRES_SINGLE_TUPLE,
            ExecStatus::PipelineSync => N::PGRES_PIPELINE_SYNC,
            ExecStatus::PipelineAborted => N::PGRES_PIPELINE_ABORTED,
        }
    }

    /// Statuses whose result carries an error message rather than data.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            ExecStatus::BadResponse
                | ExecStatus::NonfatalError
                | ExecStatus::FatalError
                | ExecStatus::PipelineAborted
        )
    }
}

impl Verbosity {
    pub(crate) fn to_native(self) -> pq_sys::PGVerbosity {
        use pq_sys::PGVerbosity as N;
        match self {
            Verbosity::Terse => N::PQERRORS_TERSE,
            Verbosity::Default => N::PQERRORS_DEFAULT,
            Verbosity::Verbose => N::PQERRORS_VERBOSE,
            Verbosity::Sqlstate => N::PQERRORS_SQLSTATE,
        }
    }
}

impl ContextVisibility {
    pub(crate) fn to_native(self) -> pq_sys::PGContextVisibility {
        use pq_sys::PGContextVisibility as N;
        match self {
            ContextVisibility::Never => N::PQSHOW_CONTEXT_NEVER,
            ContextVisibility::Errors => N::PQSHOW_CONTEXT_ERRORS,
            ContextVisibility::Always => N::PQSHOW_CONTEXT_ALWAYS,
        }
    }
}
