mod client;
mod track;

pub use {
    client::{FingerprintClient, Identification, Identifier},
    track::IdentifiedTrack,
};

#[cfg(test)]
pub(crate) use client::{IdentifyRequest, classify_response};
