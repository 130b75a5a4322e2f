use pyo3::prelude::*;
use pqshim::constants::*;

macro_rules! add_enums {
    ($m:expr, $($ty:ty),+ $(,)?) => {
        $(
            for &(name, value) in <$ty>::ALL {
                $m.add(name, value.code())?;
            }
        )+
    };
}

/// Export every libpq enumeration value and flag as a module integer.
pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    add_enums!(
        m,
        ConnStatus,
        PollingStatus,
        ExecStatus,
        TransactionStatus,
        Verbosity,
        ContextVisibility,
        Ping,
        PipelineStatus,
        DiagField,
    );
    for &(name, value) in FLAGS {
        m.add(name, value)?;
    }
    Ok(())
}
