//! Channel identifiers and a fixed Y/U/V triple container

use serde::{Deserialize, Serialize};

use crate::block::{CHROMA_PAYLOAD_LEN, LUMA_PAYLOAD_LEN};

/// One plane of the reversible color transform.
/// Deduplication and storage are performed independently per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    /// Luminance (Y)
    Luma,
    /// First chroma plane (U = R - G)
    ChromaCb,
    /// Second chroma plane (V = B - G)
    ChromaCr,
}

impl Channel {
    /// All channels in container order (Y, U, V)
    pub const ALL: [Channel; 3] = [Channel::Luma, Channel::ChromaCb, Channel::ChromaCr];

    /// Wire name of the channel
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Luma => "LUMA",
            Channel::ChromaCb => "CHROMA_CB",
            Channel::ChromaCr => "CHROMA_CR",
        }
    }

    /// Size in bytes of one block payload of this channel
    pub fn payload_len(&self) -> usize {
        match self {
            Channel::Luma => LUMA_PAYLOAD_LEN,
            Channel::ChromaCb | Channel::ChromaCr => CHROMA_PAYLOAD_LEN,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerChannel<T> {
    /// Y value
    pub luma: T,
    /// U value
    pub chroma_cb: T,
    /// V value
    pub chroma_cr: T,
}

impl<T> PerChannel<T> {
    /// Build from explicit Y, U, V values
    pub fn new(luma: T, chroma_cb: T, chroma_cr: T) -> Self {
        Self {
            luma,
            chroma_cb,
            chroma_cr,
        }
    }

    /// Build by evaluating `f` once per channel, in Y, U, V order
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        let luma = f(Channel::Luma);
        let chroma_cb = f(Channel::ChromaCb);
        let chroma_cr = f(Channel::ChromaCr);
        Self::new(luma, chroma_cb, chroma_cr)
    }

    /// Borrow the value for `channel`
    pub fn get(&self, channel: Channel) -> &T {
        match channel {
            Channel::Luma => &self.luma,
            Channel::ChromaCb => &self.chroma_cb,
            Channel::ChromaCr => &self.chroma_cr,
        }
    }

    /// Mutably borrow the value for `channel`
    pub fn get_mut(&mut self, channel: Channel) -> &mut T {
        match channel {
            Channel::Luma => &mut self.luma,
            Channel::ChromaCb => &mut self.chroma_cb,
            Channel::ChromaCr => &mut self.chroma_cr,
        }
    }

    /// Transform every value, keeping channel association
    pub fn map<U>(self, mut f: impl FnMut(Channel, T) -> U) -> PerChannel<U> {
        PerChannel {
            luma: f(Channel::Luma, self.luma),
            chroma_cb: f(Channel::ChromaCb, self.chroma_cb),
            chroma_cr: f(Channel::ChromaCr, self.chroma_cr),
        }
    }

    /// Borrowing view of every value
    pub fn as_ref(&self) -> PerChannel<&T> {
        PerChannel::new(&self.luma, &self.chroma_cb, &self.chroma_cr)
    }

    /// Iterate `(channel, value)` pairs in Y, U, V order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for channel in Channel::ALL {
            let json = serde_json::to_string(&channel).unwrap();
            assert_eq!(json, format!("\"{}\"", channel.as_str()));
            let back: Channel = serde_json::from_str(&json).unwrap();
            assert_eq!(back, channel);
        }
    }

    #[test]
    fn payload_lengths() {
        assert_eq!(Channel::Luma.payload_len(), 64);
        assert_eq!(Channel::ChromaCb.payload_len(), 128);
        assert_eq!(Channel::ChromaCr.payload_len(), 128);
    }

    #[test]
    fn per_channel_accessors() {
        let mut triple = PerChannel::from_fn(|c| c.payload_len());
        assert_eq!(*triple.get(Channel::Luma), 64);
        *triple.get_mut(Channel::ChromaCr) = 7;
        let order: Vec<_> = triple.iter().map(|(c, v)| (c, *v)).collect();
        assert_eq!(
            order,
            vec![(Channel::Luma, 64), (Channel::ChromaCb, 128), (Channel::ChromaCr, 7)]
        );
        let doubled = triple.map(|_, v| v * 2);
        assert_eq!(doubled.chroma_cr, 14);
    }
}
