//! The line protocol spoken with web clients.
//!
//! Every message is one line of comma-separated ASCII fields. The first field
//! is a single upper-case letter naming the command:
//!
//! | Tag | Fields                                     |
//! |-----|--------------------------------------------|
//! | `U` | `player_id,x,y,z,rot_x,rot_y`              |
//! | `E` | `time,duration`                            |
//! | `T` | remainder of the line (may contain commas) |
//! | `N` | `player_id,name`                           |
//! | `B` | `dim,chunk_x,chunk_z,x,y,z,block_type`     |
//! | `K` | `chunk_x,chunk_z,key`                      |
//! | `R` | `chunk_x,chunk_z`                          |
//!
//! Clients send block edits in a short form, `B,x,y,z,block_type`. A line
//! starting with `V,` announces the client version and opens the session.
//!
//! Lines with any other tag decode to [`WireLine::Unknown`] so that newer
//! clients can talk to this server without tripping it.

mod codec;
mod types;

pub use codec::{decode, encode, is_version_announce, ProtocolError};
pub use types::WireLine;
