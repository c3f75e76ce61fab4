use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Size of a compressed secp256k1 public key.
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Size of a chain genesis hash.
pub const CHAIN_HASH_SIZE: usize = 32;

/// Identity of a network participant: its 33-byte compressed public key.
///
/// Ordering compares the raw key bytes, which is what the channel direction
/// bit is derived from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId([u8; PUBLIC_KEY_SIZE]);

impl NodeId {
    /// Wrap raw compressed-key bytes.
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; PUBLIC_KEY_SIZE] =
            bytes.try_into().map_err(|_| CoreError::InvalidLength {
                what: "node id",
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.to_hex())
    }
}

impl FromStr for NodeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Genesis block hash identifying the chain a channel lives on.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainHash([u8; CHAIN_HASH_SIZE]);

impl ChainHash {
    /// Bitcoin mainnet genesis hash, in gossip byte order.
    pub const BITCOIN: ChainHash = ChainHash([
        0x6f, 0xe2, 0x8c, 0x0a, 0xb6, 0xf1, 0xb3, 0x72, 0xc1, 0xa6, 0xa2, 0x46, 0xae, 0x63, 0xf7,
        0x4f, 0x93, 0x1e, 0x83, 0x65, 0xe1, 0x5a, 0x08, 0x9c, 0x68, 0xd6, 0x19, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ]);

    /// Bitcoin testnet3 genesis hash.
    pub const TESTNET: ChainHash = ChainHash([
        0x43, 0x49, 0x7f, 0xd7, 0xf8, 0x26, 0x95, 0x71, 0x08, 0xf4, 0xa3, 0x0f, 0xd9, 0xce, 0xc3,
        0xae, 0xba, 0x79, 0x97, 0x20, 0x84, 0xe9, 0x0e, 0xad, 0x01, 0xea, 0x33, 0x09, 0x00, 0x00,
        0x00, 0x00,
    ]);

    /// Bitcoin regtest genesis hash.
    pub const REGTEST: ChainHash = ChainHash([
        0x06, 0x22, 0x6e, 0x46, 0x11, 0x1a, 0x0b, 0x59, 0xca, 0xaf, 0x12, 0x60, 0x43, 0xeb, 0x5b,
        0xbf, 0x28, 0xc3, 0x4f, 0x3a, 0x5e, 0x33, 0x2a, 0x1f, 0xc7, 0xb2, 0xb7, 0x3c, 0xf1, 0x88,
        0x91, 0x0f,
    ]);

    pub const fn from_bytes(bytes: [u8; CHAIN_HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHAIN_HASH_SIZE] {
        &self.0
    }

    /// Well-known chain hash for a network name (`bitcoin`, `testnet`, `regtest`).
    pub fn for_network(name: &str) -> Result<Self, CoreError> {
        match name {
            "bitcoin" | "mainnet" => Ok(Self::BITCOIN),
            "testnet" => Ok(Self::TESTNET),
            "regtest" => Ok(Self::REGTEST),
            other => Err(CoreError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ChainHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainHash({})", hex::encode(self.0))
    }
}

impl FromStr for ChainHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let arr: [u8; CHAIN_HASH_SIZE] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| CoreError::InvalidLength {
                    what: "chain hash",
                    expected: CHAIN_HASH_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }
}

impl Serialize for ChainHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Chain-anchored channel identifier: the funding output's block height,
/// transaction index within the block and output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShortChannelId {
    pub block_height: u32,
    pub tx_index: u32,
    pub output_index: u16,
}

impl ShortChannelId {
    const MAX_24_BITS: u32 = 0x00ff_ffff;

    pub fn new(block_height: u32, tx_index: u32, output_index: u16) -> Result<Self, CoreError> {
        if block_height > Self::MAX_24_BITS || tx_index > Self::MAX_24_BITS {
            return Err(CoreError::InvalidShortChannelId(format!(
                "{}x{}x{}",
                block_height, tx_index, output_index
            )));
        }
        Ok(Self {
            block_height,
            tx_index,
            output_index,
        })
    }

    /// Packed wire form: 3 bytes height, 3 bytes tx index, 2 bytes output.
    pub fn to_u64(&self) -> u64 {
        (u64::from(self.block_height) << 40)
            | (u64::from(self.tx_index) << 16)
            | u64::from(self.output_index)
    }

    pub fn from_u64(v: u64) -> Self {
        Self {
            block_height: ((v >> 40) & 0x00ff_ffff) as u32,
            tx_index: ((v >> 16) & 0x00ff_ffff) as u32,
            output_index: (v & 0xffff) as u16,
        }
    }
}

impl fmt::Display for ShortChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}",
            self.block_height, self.tx_index, self.output_index
        )
    }
}

impl FromStr for ShortChannelId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidShortChannelId(s.to_string());
        let mut parts = s.split('x');
        let block_height = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let tx_index = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let output_index = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Self::new(block_height, tx_index, output_index)
    }
}

/// Which endpoint ordering a directional edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Zero,
    One,
}

impl Direction {
    /// Low bit of a channel update's flags field.
    pub fn from_bit(bit: u16) -> Self {
        if bit & 1 == 1 {
            Direction::One
        } else {
            Direction::Zero
        }
    }

    pub fn as_bit(&self) -> u16 {
        match self {
            Direction::Zero => 0,
            Direction::One => 1,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Zero => Direction::One,
            Direction::One => Direction::Zero,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_bit())
    }
}

/// Direction of the edge `from -> to`: `One` iff `from`'s key bytes compare
/// greater than `to`'s.
pub fn get_channel_direction(from: &NodeId, to: &NodeId) -> Direction {
    if from.as_bytes() > to.as_bytes() {
        Direction::One
    } else {
        Direction::Zero
    }
}

/// Identity of one directional edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub short_channel_id: ShortChannelId,
    pub direction: Direction,
}

impl EdgeKey {
    pub fn new(short_channel_id: ShortChannelId, direction: Direction) -> Self {
        Self {
            short_channel_id,
            direction,
        }
    }

    /// The key of the same channel's other direction.
    pub fn reverse(&self) -> Self {
        Self::new(self.short_channel_id, self.direction.opposite())
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.short_channel_id, self.direction)
    }
}

/// Amount in millisatoshi.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MilliSatoshi(pub u64);

impl MilliSatoshi {
    /// 21 million coins expressed in millisatoshi.
    pub const MAX_SUPPLY: MilliSatoshi = MilliSatoshi(21_000_000 * 100_000_000 * 1_000);

    pub const ZERO: MilliSatoshi = MilliSatoshi(0);

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn saturating_add(self, other: MilliSatoshi) -> MilliSatoshi {
        MilliSatoshi(self.0.saturating_add(other.0))
    }

    pub fn checked_sub(self, other: MilliSatoshi) -> Option<MilliSatoshi> {
        self.0.checked_sub(other.0).map(MilliSatoshi)
    }
}

impl From<u64> for MilliSatoshi {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for MilliSatoshi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}msat", self.0)
    }
}
