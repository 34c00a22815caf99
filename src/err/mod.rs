use std::fmt::{Debug, Display, Formatter};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Crate-wide error carrying the message plus the location it was raised at.
/// Build one through `batchwatch_error!` / `batchwatch_error_with_source!`.
pub struct BatchwatchError {
    msg: String,
    file: &'static str,
    line: u32,
    // Send + Sync so errors can cross task boundaries; still exposed as
    // `&dyn Error` through `source()`.
    source: Option<Error>,
}

impl BatchwatchError {
    pub fn new(
        msg: impl Into<String>,
        file: &'static str,
        line: u32,
        source: Option<Error>,
    ) -> Self {
        Self {
            msg: msg.into(),
            file,
            line,
            source,
        }
    }
}

#[macro_export]
macro_rules! batchwatch_error {
    ($fmt:expr $(, $($args:tt)*)?) => {
        $crate::err::BatchwatchError::new(
            format!($fmt $(,$($args)*)?),
            file!(), line!(), None)
    };
}

#[macro_export]
macro_rules! batchwatch_error_with_source {
    ($source:expr, $fmt:expr $(, $($args:tt)*)?) => {
        $crate::err::BatchwatchError::new(
            format!($fmt $(,$($args)*)?),
            file!(), line!(), Some(Box::new($source) as $crate::err::Error))
    }
}

impl Debug for BatchwatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]:{} {}", self.file, self.line, self.msg)
    }
}

impl Display for BatchwatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for BatchwatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error))
    }
}

/// This is defined as a convenience.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    #[test]
    fn error_macro_records_message_and_location() {
        let e = batchwatch_error!("bad cycle duration: {}", 0);
        assert_eq!(format!("{}", e), "bad cycle duration: 0");
        let dbg = format!("{:?}", e);
        assert!(dbg.contains("err/mod.rs"), "debug output: {}", dbg);
        assert!(e.source().is_none());
    }

    #[test]
    fn error_macro_chains_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e = batchwatch_error_with_source!(io, "config load failed");
        assert_eq!(format!("{}", e), "config load failed");
        assert!(e.source().is_some());
    }
}
