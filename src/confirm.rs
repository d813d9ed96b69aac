//! Purpose: Typed confirmation gate guarding the destructive reset.
//! Exports: `CONFIRM_PHRASE`, `read_confirmation`.
//! Role: Keep the stdin contract identical for terminals and pipes, and testable.
//! Invariants: Only an exact `DELETE` line confirms; EOF or any other input cancels.
//! Invariants: Only the trailing line terminator is stripped before comparison.
//! Invariants: Comparison is bytewise; non-UTF-8 input cancels, it does not error.

use std::io::BufRead;

use symco_reset::core::error::{Error, ErrorKind};

pub(crate) const CONFIRM_PHRASE: &str = "DELETE";

pub(crate) fn read_confirmation(reader: &mut impl BufRead) -> Result<bool, Error> {
    let mut line = Vec::new();
    let read = reader.read_until(b'\n', &mut line).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read confirmation from stdin")
            .with_source(err)
    })?;
    if read == 0 {
        return Ok(false);
    }
    if line.ends_with(b"\n") {
        line.pop();
        if line.ends_with(b"\r") {
            line.pop();
        }
    }
    Ok(line == CONFIRM_PHRASE.as_bytes())
}
