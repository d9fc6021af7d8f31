use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} out of range: {value}"))
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Unix seconds as the `"(high low)"` pair used by the desktop side, where
/// `high = s >> 16` and `low = s & 0xFFFF`.
pub fn encode_timestamp(seconds: i64) -> String {
    format!("({} {})", seconds >> 16, seconds & 0xFFFF)
}

/// Inverse of [`encode_timestamp`]. Extra trailing components (microseconds
/// and the like) are ignored.
pub fn decode_timestamp(value: &str) -> Option<i64> {
    let mut parts = value
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split_whitespace();
    let high: i64 = parts.next()?.parse().ok()?;
    let low: i64 = parts.next()?.parse().ok()?;
    Some((high << 16) | low)
}

/// Values written by Emacs Lisp keep their surrounding double quotes.
pub fn strip_lisp_quotes(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_pair_encoding() {
        assert_eq!(encode_timestamp(1_700_000_000), "(25939 61696)");
        assert_eq!(decode_timestamp("(25939 61696)"), Some(1_700_000_000));
        assert_eq!(decode_timestamp("(25939 61696 123 0)"), Some(1_700_000_000));
        assert_eq!(decode_timestamp("soon"), None);
    }

    #[test]
    fn strips_lisp_quotes() {
        assert_eq!(strip_lisp_quotes("\"/a/b.org\""), "/a/b.org");
        assert_eq!(strip_lisp_quotes("/a/b.org"), "/a/b.org");
    }
}
