//! Plain-text rendering for the query subcommands

use std::{io::Write, time::SystemTime};

use chrono::{DateTime, SecondsFormat, Utc};
use courier_delivery::MessageStatus;
use courier_store::MessageRecord;

fn timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Write the disposition of a single message
///
/// # Errors
/// If writing to `out` fails
pub fn write_status(out: &mut impl Write, status: &MessageStatus) -> std::io::Result<()> {
    writeln!(out, "Message:  {}", status.id)?;
    writeln!(out, "State:    {}", status.state)?;
    writeln!(out, "Attempts: {}", status.attempts)?;
    if let Some(error) = &status.last_error {
        writeln!(out, "Error:    {error}")?;
    }
    Ok(())
}

/// Write one line per audited record, newest first as given
///
/// # Errors
/// If writing to `out` fails
pub fn write_records(out: &mut impl Write, records: &[MessageRecord]) -> std::io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No messages");
    }

    for record in records {
        let finished = record
            .terminal_at()
            .map_or_else(|| "-".to_string(), timestamp);

        write!(
            out,
            "{}  {}  {:<8} attempts={}  to={}  subject={:?}",
            record.id(),
            finished,
            record.state().as_str(),
            record.attempts(),
            record.recipient(),
            record.subject()
        )?;

        if let Some(error) = record.last_error() {
            write!(out, "  error={error:?}")?;
        }
        writeln!(out)?;
    }

    Ok(())
}
