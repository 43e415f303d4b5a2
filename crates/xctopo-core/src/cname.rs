//! Parser for Cray canonical node names.
//!
//! Format: `c<rack_col>-<rack_row>c<chassis>s<blade>n<nic>`, e.g. `c1-0c1s2n1` or `c3-0c2s15n3`.

use std::str::FromStr;

use thiserror::Error;

use crate::types::RawCoordinate;

/// Where the compute node kernel publishes its canonical name.
pub const DEFAULT_CNAME_PATH: &str = "/proc/cray_xt/cname";

/// Literal separator preceding each numeric field, in record order.
const GRAMMAR: [(u8, &str); 5] = [
    (b'c', "rack_col"),
    (b'-', "rack_row"),
    (b'c', "chassis"),
    (b's', "blade"),
    (b'n', "nic"),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CnameError {
    #[error("cname record is empty")]
    Empty,
    #[error("expected '{expected}' before {field} at byte {offset} of {record:?}")]
    Separator {
        expected: char,
        field: &'static str,
        offset: usize,
        record: String,
    },
    #[error("missing digits for {field} at byte {offset} of {record:?}")]
    MissingDigits {
        field: &'static str,
        offset: usize,
        record: String,
    },
    #[error("{field} does not fit in 32 bits in {record:?}")]
    Overflow { field: &'static str, record: String },
    #[error("unexpected trailing input {trailing:?} after nic in {record:?}")]
    Trailing { trailing: String, record: String },
}

struct Cursor<'a> {
    record: &'a str,
    pos: usize,
}

impl Cursor<'_> {
    fn expect(&mut self, sep: u8, field: &'static str) -> Result<(), CnameError> {
        if self.record.as_bytes().get(self.pos) != Some(&sep) {
            return Err(CnameError::Separator {
                expected: sep as char,
                field,
                offset: self.pos,
                record: self.record.to_string(),
            });
        }
        self.pos += 1;
        Ok(())
    }

    fn number(&mut self, field: &'static str) -> Result<u32, CnameError> {
        let rest = &self.record.as_bytes()[self.pos..];
        let len = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if len == 0 {
            return Err(CnameError::MissingDigits {
                field,
                offset: self.pos,
                record: self.record.to_string(),
            });
        }
        let digits = &self.record[self.pos..self.pos + len];
        let value = digits.parse::<u32>().map_err(|_| CnameError::Overflow {
            field,
            record: self.record.to_string(),
        })?;
        self.pos += len;
        Ok(value)
    }
}

/// Parses one canonical name record. Surrounding whitespace (the proc file ends with a newline)
/// is ignored; anything else that deviates from the grammar is an error.
pub fn parse_cname(record: &str) -> Result<RawCoordinate, CnameError> {
    let record = record.trim();
    if record.is_empty() {
        return Err(CnameError::Empty);
    }

    let mut cursor = Cursor { record, pos: 0 };
    let mut values = [0u32; GRAMMAR.len()];
    for (slot, (sep, field)) in values.iter_mut().zip(GRAMMAR) {
        cursor.expect(sep, field)?;
        *slot = cursor.number(field)?;
    }

    if cursor.pos != record.len() {
        return Err(CnameError::Trailing {
            trailing: record[cursor.pos..].to_string(),
            record: record.to_string(),
        });
    }

    let [rack_col, rack_row, chassis, blade, nic] = values;
    Ok(RawCoordinate {
        rack_col,
        rack_row,
        chassis,
        blade,
        nic,
    })
}

impl FromStr for RawCoordinate {
    type Err = CnameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cname(s)
    }
}
