use anyhow::{bail, Context};
use serde_json::Value;

/// A block reference argument as it appears in request params: a tag or an
/// explicit height. `"earliest"` is a synonym for height zero and folds into
/// [`BlockRef::Number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Latest,
    Pending,
    Number(u64),
}

impl BlockRef {
    /// Parses a params slot into a block reference.
    ///
    /// Accepts the string tags and hex heights, plus the object form carrying
    /// a `blockNumber` member. Anything else (including `blockHash` objects)
    /// is an error, which callers demote to uncacheable passthrough.
    pub fn parse(value: &Value) -> anyhow::Result<BlockRef> {
        match value {
            Value::String(tag) => match tag.as_str() {
                "latest" => Ok(BlockRef::Latest),
                "pending" => Ok(BlockRef::Pending),
                "earliest" => Ok(BlockRef::Number(0)),
                hex => parse_hex_height(hex).map(BlockRef::Number),
            },
            Value::Object(tag) => {
                if let Some(Value::String(block_number)) = tag.get("blockNumber") {
                    return parse_hex_height(block_number).map(BlockRef::Number);
                }

                bail!("block tag object has no blockNumber")
            }
            _ => bail!("block tag not a string or object"),
        }
    }

    /// Canonical hex rendering of an explicit height, e.g. `0x00` -> `0x0`.
    /// Tags have no canonical height.
    pub fn as_literal(&self) -> Option<String> {
        match self {
            BlockRef::Number(height) => Some(format_height(*height)),
            _ => None,
        }
    }
}

/// Canonical lowercase hex without leading zeros.
pub fn format_height(height: u64) -> String {
    format!("0x{height:x}")
}

/// Parses a `0x`-prefixed hex height and re-checks it is actually hex.
pub fn parse_hex_height(tag: &str) -> anyhow::Result<u64> {
    let digits = tag
        .strip_prefix("0x")
        .context("block tag not a hex string")?;

    u64::from_str_radix(digits, 16).context("block tag not a hex string")
}
