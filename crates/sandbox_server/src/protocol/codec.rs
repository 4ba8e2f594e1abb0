//! Text encoding and decoding of [`WireLine`]s.

use super::WireLine;
use std::fmt;
use std::str::FromStr;

/// Line delimiter terminating every encoded line.
pub const LINE_DELIMITER: char = '\n';

const VERSION_PREFIX: &str = "V,";

/// Decode-time failures. Only known tags can fail; unknown tags decode to
/// [`WireLine::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed {tag} command ({reason}): {line:?}")]
    MalformedCommand {
        tag: char,
        reason: String,
        line: String,
    },
}

fn malformed(tag: char, reason: impl Into<String>, line: &str) -> ProtocolError {
    ProtocolError::MalformedCommand {
        tag,
        reason: reason.into(),
        line: line.to_string(),
    }
}

impl fmt::Display for WireLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireLine::Position {
                player_id,
                x,
                y,
                z,
                rot_x,
                rot_y,
            } => write!(f, "U,{player_id},{x},{y},{z},{rot_x},{rot_y}"),
            WireLine::EnvInfo { time, duration } => write!(f, "E,{time},{duration}"),
            WireLine::Text { body } => write!(f, "T,{body}"),
            WireLine::NameAssign { player_id, name } => write!(f, "N,{player_id},{name}"),
            WireLine::Block {
                dim,
                chunk_x,
                chunk_z,
                x,
                y,
                z,
                block_type,
            } => write!(f, "B,{dim},{chunk_x},{chunk_z},{x},{y},{z},{block_type}"),
            WireLine::ChunkKey {
                chunk_x,
                chunk_z,
                key,
            } => write!(f, "K,{chunk_x},{chunk_z},{key}"),
            WireLine::ChunkRefresh { chunk_x, chunk_z } => write!(f, "R,{chunk_x},{chunk_z}"),
            WireLine::Unknown { raw } => f.write_str(raw),
        }
    }
}

/// Encode a line, terminated by [`LINE_DELIMITER`].
pub fn encode(line: &WireLine) -> String {
    format!("{line}{LINE_DELIMITER}")
}

impl WireLine {
    /// Shorthand for [`encode`].
    pub fn encode(&self) -> String {
        encode(self)
    }
}

/// Whether a raw client line is the version announce that opens a session.
pub fn is_version_announce(line: &str) -> bool {
    line.starts_with(VERSION_PREFIX)
}

/// Decode one line. A trailing line break is ignored.
pub fn decode(line: &str) -> Result<WireLine, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (tag, rest) = match line.split_once(',') {
        Some((tag, rest)) => (tag, Some(rest)),
        None => (line, None),
    };

    match tag {
        "T" => match rest {
            Some(body) => Ok(WireLine::text(body.trim())),
            None => Err(malformed('T', "missing text payload", line)),
        },
        "U" => {
            let [player_id, x, y, z, rot_x, rot_y] = fields('U', rest, line)?;
            Ok(WireLine::Position {
                player_id: int('U', player_id, line)?,
                x: int('U', x, line)?,
                y: int('U', y, line)?,
                z: int('U', z, line)?,
                rot_x: int('U', rot_x, line)?,
                rot_y: int('U', rot_y, line)?,
            })
        }
        "E" => {
            let [time, duration] = fields('E', rest, line)?;
            Ok(WireLine::EnvInfo {
                time: int('E', time, line)?,
                duration: int('E', duration, line)?,
            })
        }
        "N" => {
            let [player_id, name] = fields('N', rest, line)?;
            Ok(WireLine::NameAssign {
                player_id: int('N', player_id, line)?,
                name: name.to_string(),
            })
        }
        "B" => decode_block(rest, line),
        "K" => {
            let [chunk_x, chunk_z, key] = fields('K', rest, line)?;
            Ok(WireLine::ChunkKey {
                chunk_x: int('K', chunk_x, line)?,
                chunk_z: int('K', chunk_z, line)?,
                key: int('K', key, line)?,
            })
        }
        "R" => {
            let [chunk_x, chunk_z] = fields('R', rest, line)?;
            Ok(WireLine::ChunkRefresh {
                chunk_x: int('R', chunk_x, line)?,
                chunk_z: int('R', chunk_z, line)?,
            })
        }
        _ => Ok(WireLine::Unknown {
            raw: line.to_string(),
        }),
    }
}

/// `B` comes in two shapes: the client edit `B,x,y,z,type`, where the
/// missing leading fields are 0, and the full form written by [`encode`].
fn decode_block(rest: Option<&str>, line: &str) -> Result<WireLine, ProtocolError> {
    let parts: Vec<&str> = rest.map(|rest| rest.split(',').collect()).unwrap_or_default();
    let values = parts
        .iter()
        .map(|field| int::<i32>('B', field, line))
        .collect::<Result<Vec<_>, _>>();

    match (parts.len(), values) {
        (4 | 7, Err(e)) => Err(e),
        (4, Ok(v)) => Ok(WireLine::Block {
            dim: 0,
            chunk_x: 0,
            chunk_z: 0,
            x: v[0],
            y: v[1],
            z: v[2],
            block_type: v[3],
        }),
        (7, Ok(v)) => Ok(WireLine::Block {
            dim: v[0],
            chunk_x: v[1],
            chunk_z: v[2],
            x: v[3],
            y: v[4],
            z: v[5],
            block_type: v[6],
        }),
        (n, _) => Err(malformed('B', format!("expected 4 or 7 fields, got {n}"), line)),
    }
}

fn fields<'a, const N: usize>(
    tag: char,
    rest: Option<&'a str>,
    line: &str,
) -> Result<[&'a str; N], ProtocolError> {
    let parts: Vec<&str> = rest.map(|rest| rest.split(',').collect()).unwrap_or_default();
    let count = parts.len();
    <[&str; N]>::try_from(parts)
        .map_err(|_| malformed(tag, format!("expected {N} fields, got {count}"), line))
}

fn int<T: FromStr>(tag: char, field: &str, line: &str) -> Result<T, ProtocolError> {
    field
        .parse()
        .map_err(|_| malformed(tag, format!("{field:?} is not an integer"), line))
}

impl FromStr for WireLine {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}
