//! Share-link and subscription parsing.
//!
//! - [`protocols`]: per-scheme link codecs (`http`, `socks`, `ss`, `vmess`,
//!   `vless`) behind the [`ShareLinkCodec`] trait
//! - [`subscription`]: plain, base64 and OOCv1 subscription payloads
//! - [`detection`] and [`base64`]: payload classification and tolerant
//!   base64 handling shared by both

pub mod base64;
pub mod detection;
pub mod protocols;
pub mod subscription;

pub use detection::{SubscriptionKind, detect_subscription_kind};
pub use protocols::{
    LinkRegistry, NamedOutbound, ShareLinkCodec, deserialize_link, serialize_link,
};
pub use subscription::{
    OocV1Decoder, SimpleDecoder, SubscriptionContent, SubscriptionDecoder, SubscriptionUsage,
    decode_subscription,
};
