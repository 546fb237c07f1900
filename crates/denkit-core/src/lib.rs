//! # Denkit Core
//!
//! Shared primitives for denkit: byte/text codecs, identifiers, and the
//! common error taxonomy.
//!
//! This crate contains no I/O and no cryptography beyond the system random
//! source. It is the leaf every other denkit crate builds on.
//!
//! ## Key Types
//!
//! - [`DenId`] - Stable identifier for a den
//! - [`Namespace`] - Named partition of the shared document
//! - [`DocRole`] - Selects a den's private or shared document
//!
//! ## Codec
//!
//! All text-armored bytes use unpadded base64url; see [`codec`]. The
//! decoder also accepts padded and standard-alphabet input for
//! interoperability.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{
    constant_time_eq, decode_utf8, encode_utf8, from_base64url, random_bytes, to_base64url,
};
pub use error::{CoreError, Result};
pub use types::{DenId, DocRole, Namespace, MAX_DEN_ID_LEN};
