use crate::domain::request::Request;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize, PartialEq)]
struct OutcomeRow {
    request: String,
    requester: String,
    kind: String,
    state: String,
    category: String,
    raw_value: String,
}

impl From<&Request> for OutcomeRow {
    fn from(request: &Request) -> Self {
        let (category, raw_value) = match &request.outcome {
            Some(outcome) => (outcome.category.clone(), outcome.raw_value.to_string()),
            None => (String::new(), String::new()),
        };
        Self {
            request: request.id.to_string(),
            requester: request.requester.to_string(),
            kind: request.kind.to_string(),
            state: request.state.to_string(),
            category,
            raw_value,
        }
    }
}

/// Writes the final state of each request as CSV.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header followed by one row per request, in the given order.
    pub fn write_requests<'a>(
        &mut self,
        requests: impl IntoIterator<Item = &'a Request>,
    ) -> Result<()> {
        let mut wrote_any = false;
        for request in requests {
            self.writer.serialize(OutcomeRow::from(request))?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer.write_record([
                "request",
                "requester",
                "kind",
                "state",
                "category",
                "raw_value",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
