use sha3::{Digest, Keccak256};

use crate::address::Address;
use crate::error::{ChainError, ChainResult};

const WORD: usize = 32;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the hash of a canonical function signature,
/// e.g. `transfer(address,uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Argument values for the handful of contract calls this service makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u128),
    FixedBytes([u8; 32]),
    String(String),
    StringArray(Vec<String>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_) | Token::StringArray(_))
    }

    fn encode_static(&self) -> [u8; WORD] {
        match self {
            Token::Address(addr) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(addr.as_bytes());
                word
            }
            Token::Uint(v) => uint_word(*v),
            Token::FixedBytes(b) => *b,
            Token::String(_) | Token::StringArray(_) => [0u8; WORD],
        }
    }

    fn encode_tail(&self) -> Vec<u8> {
        match self {
            Token::String(s) => encode_bytes(s.as_bytes()),
            Token::StringArray(items) => {
                let mut out = uint_word(items.len() as u128).to_vec();
                let tokens: Vec<Token> = items.iter().cloned().map(Token::String).collect();
                out.extend(encode_tokens(&tokens));
                out
            }
            _ => self.encode_static().to_vec(),
        }
    }
}

/// Calldata for `signature` applied to `args`.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend(encode_tokens(args));
    out
}

/// Standard head/tail encoding of a tuple of tokens.
pub fn encode_tokens(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
            tail.extend(token.encode_tail());
        } else {
            head.extend_from_slice(&token.encode_static());
        }
    }

    head.extend(tail);
    head
}

fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = uint_word(bytes.len() as u128).to_vec();
    out.extend_from_slice(bytes);
    let pad = (WORD - bytes.len() % WORD) % WORD;
    out.extend(std::iter::repeat_n(0u8, pad));
    out
}

fn uint_word(v: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

fn word_at(data: &[u8], offset: usize) -> ChainResult<&[u8]> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| ChainError::Decode(format!("need a word at byte {}, have {}", offset, data.len())))
}

/// Reads a word as an unsigned integer that must fit in a u128.
fn word_as_u128(word: &[u8]) -> ChainResult<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(ChainError::Decode("integer overflows u128".into()));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(buf))
}

pub fn decode_uint(data: &[u8]) -> ChainResult<u128> {
    word_as_u128(word_at(data, 0)?)
}

pub fn decode_u64(data: &[u8]) -> ChainResult<u64> {
    u64::try_from(decode_uint(data)?).map_err(|_| ChainError::Decode("value overflows u64".into()))
}

pub fn decode_u8(data: &[u8]) -> ChainResult<u8> {
    u8::try_from(decode_uint(data)?).map_err(|_| ChainError::Decode("value overflows u8".into()))
}

pub fn decode_address(data: &[u8]) -> ChainResult<Address> {
    let word = word_at(data, 0)?;
    let mut out = [0u8; 20];
    out.copy_from_slice(&word[12..]);
    Ok(Address(out))
}

/// Decodes a single dynamic `string` return value.
pub fn decode_string(data: &[u8]) -> ChainResult<String> {
    let offset = usize::try_from(decode_uint(data)?)
        .map_err(|_| ChainError::Decode("string offset too large".into()))?;
    let len = usize::try_from(word_as_u128(word_at(data, offset)?)?)
        .map_err(|_| ChainError::Decode("string length too large".into()))?;
    let start = offset + WORD;
    let bytes = start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| ChainError::Decode("string runs past end of data".into()))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| ChainError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_and_selectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn test_encode_transfer() {
        let to: Address = "0x3535353535353535353535353535353535353535".parse().unwrap();
        let data = encode_call("transfer(address,uint256)", &[Token::Address(to), Token::Uint(500_000_000)]);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[4 + 12..4 + 32], to.as_bytes());
        assert_eq!(decode_uint(&data[4 + 32..]).unwrap(), 500_000_000);
    }

    #[test]
    fn test_encode_dynamic_layout() {
        let author: Address = "0x9a5cf28f9dc827a367c2a0eff4b4f02bd589db67".parse().unwrap();
        let data = encode_tokens(&[
            Token::Address(author),
            Token::String("hi".into()),
            Token::StringArray(vec!["a".into(), "bc".into()]),
        ]);

        // head: address, offset to string, offset to array
        assert_eq!(decode_uint(&data[32..]).unwrap(), 96);
        assert_eq!(decode_uint(&data[64..]).unwrap(), 160);

        // string tail: length word + one padded word
        assert_eq!(decode_uint(&data[96..]).unwrap(), 2);
        assert_eq!(&data[128..130], b"hi");

        // array tail: length, two element offsets, then the elements
        assert_eq!(decode_uint(&data[160..]).unwrap(), 2);
        assert_eq!(decode_uint(&data[192..]).unwrap(), 64);
        assert_eq!(decode_uint(&data[224..]).unwrap(), 128);
        assert_eq!(decode_uint(&data[256..]).unwrap(), 1);
        assert_eq!(&data[288..289], b"a");
        assert_eq!(decode_uint(&data[320..]).unwrap(), 2);
        assert_eq!(&data[352..354], b"bc");
        assert_eq!(data.len(), 384);
    }

    #[test]
    fn test_decode_string_roundtrip() {
        let data = encode_tokens(&[Token::String("FRA".into())]);
        assert_eq!(decode_string(&data).unwrap(), "FRA");
        assert_eq!(decode_string(&encode_tokens(&[Token::String(String::new())])).unwrap(), "");
    }

    #[test]
    fn test_decode_rejects_short_or_oversized() {
        assert!(decode_uint(&[0u8; 10]).is_err());
        let mut word = [0u8; 32];
        word[23] = 1;
        assert!(decode_u64(&word).is_err());
        assert!(decode_u8(&uint_word(256)).is_err());
        assert_eq!(decode_u8(&uint_word(11)).unwrap(), 11);
    }
}
