use crate::domain::request::{Fee, RequestId, RequestKind, Requester};
use crate::error::{EngineError, Result};
use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Request,
    Fulfill,
    Price,
    Withdraw,
}

/// One raw row of a relay script: `type, requester, request, value, kind`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct EventRecord {
    pub r#type: EventType,
    pub requester: Option<String>,
    pub request: Option<String>,
    pub value: Option<String>,
    pub kind: Option<RequestKind>,
}

/// A validated relay script step.
#[derive(Debug, PartialEq, Clone)]
pub enum Event {
    /// `requester` pays `fee` for a request of `kind`.
    Request {
        requester: Requester,
        fee: Fee,
        kind: RequestKind,
    },
    /// The oracle answers `request_id`; without a value the simulated oracle
    /// generates one.
    Fulfill {
        request_id: RequestId,
        raw_value: Option<U256>,
    },
    /// The price feed moves to a decimal reading.
    Price { reading: Decimal },
    /// `caller` drains the treasury.
    Withdraw { caller: Requester },
}

impl TryFrom<EventRecord> for Event {
    type Error = EngineError;

    fn try_from(record: EventRecord) -> Result<Self> {
        match record.r#type {
            EventType::Request => {
                let requester = required(record.requester, "requester")?;
                let value = required(record.value, "value")?;
                let fee = Decimal::from_str(&value)
                    .map_err(|e| {
                        EngineError::ValidationError(format!("invalid fee '{value}': {e}"))
                    })
                    .and_then(Fee::new)?;
                Ok(Event::Request {
                    requester: Requester::new(requester),
                    fee,
                    kind: record.kind.unwrap_or(RequestKind::Rarity),
                })
            }
            EventType::Fulfill => {
                let request = required(record.request, "request")?;
                let raw_value = match record.value {
                    Some(value) => Some(U256::from_str(&value).map_err(|e| {
                        EngineError::ValidationError(format!("invalid raw value '{value}': {e}"))
                    })?),
                    None => None,
                };
                Ok(Event::Fulfill {
                    request_id: RequestId::new(request),
                    raw_value,
                })
            }
            EventType::Price => {
                let value = required(record.value, "value")?;
                let reading = Decimal::from_str(&value).map_err(|e| {
                    EngineError::ValidationError(format!("invalid price '{value}': {e}"))
                })?;
                Ok(Event::Price { reading })
            }
            EventType::Withdraw => {
                let caller = required(record.requester, "requester")?;
                Ok(Event::Withdraw {
                    caller: Requester::new(caller),
                })
            }
        }
    }
}

fn required(field: Option<String>, name: &str) -> Result<String> {
    field
        .filter(|value| !value.is_empty())
        .ok_or_else(|| EngineError::ValidationError(format!("missing {name}")))
}

/// Reads relay events from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Event>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads, deserializes and validates events.
    pub fn events(self) -> impl Iterator<Item = Result<Event>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(EngineError::from)
                .and_then(|record: EventRecord| Event::try_from(record))
        })
    }
}
