use crate::codec::ProtocolError;
use crate::record::{Record, Schema};

/// Binds a strongly typed struct to its [Schema]. Required fields are plain struct fields and
///  optional fields are `Option`s, so the typed representation can not express a missing
///  required field. [Record] is the dynamic counterpart that does the actual encoding.
pub trait Fields: Sized {
    fn schema() -> &'static Schema;

    fn to_record(&self) -> Result<Record, ProtocolError>;

    /// fails if the record has a different schema or lacks a required field
    fn from_record(record: &Record) -> Result<Self, ProtocolError>;
}
