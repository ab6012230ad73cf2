use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{DecodeError, EncodeError, Result};
use crate::message::{Arg, Message};

/// Every padded field is a multiple of this many bytes.
pub const ALIGNMENT: usize = 4;

/// Separator that opens the type tag block.
pub const TAG_PREFIX: u8 = b',';

const BLOB_TAG: u8 = b'b';

/// Number of zero bytes that follow a field of `len` bytes.
///
/// Always between 1 and 4: an aligned field still gets a full word of padding,
/// which doubles as its terminator.
pub const fn pad_len(len: usize) -> usize {
    ALIGNMENT - (len % ALIGNMENT)
}

/// Encode a message into the wire format.
///
/// ```text
/// ┌────────────────────┬────────────────────┬──────────────────────────┐
/// │ Address + pad      │ ',' tags + pad     │ Arguments in tag order   │
/// │ "/ch/01/mix/fader" │ ",f\0\0"           │ i/f: 4B BE, s: str + pad │
/// └────────────────────┴────────────────────┴──────────────────────────┘
/// ```
pub fn encode(
    address: &str,
    args: &[Arg],
    dst: &mut BytesMut,
) -> std::result::Result<(), EncodeError> {
    if address.as_bytes().contains(&TAG_PREFIX) {
        return Err(EncodeError::CommaInAddress {
            address: address.to_string(),
        });
    }
    check_no_nul(address, "address")?;
    for arg in args {
        if let Arg::Str(s) = arg {
            check_no_nul(s, "string argument")?;
        }
    }

    put_padded(dst, address.as_bytes());

    let tag_block_len = 1 + args.len();
    dst.reserve(tag_block_len + pad_len(tag_block_len));
    dst.put_u8(TAG_PREFIX);
    for arg in args {
        dst.put_u8(arg.tag().as_char() as u8);
    }
    dst.put_bytes(0, pad_len(tag_block_len));

    for arg in args {
        match arg {
            Arg::Int(v) => dst.put_i32(*v),
            Arg::Float(v) => dst.put_u32(v.to_bits()),
            Arg::Str(s) => put_padded(dst, s.as_bytes()),
        }
    }
    Ok(())
}

/// Decode a complete packet into a message.
///
/// The returned message keeps `packet` as its raw bytes.
pub fn decode(packet: Bytes) -> Result<Message> {
    if packet.is_empty() {
        return Err(DecodeError::EmptyPacket);
    }

    let comma = packet
        .iter()
        .position(|&b| b == TAG_PREFIX)
        .ok_or(DecodeError::MissingTypeTags)?;
    let address = String::from_utf8_lossy(trim_trailing_zeros(&packet[..comma])).into_owned();

    let mut src = &packet[comma + 1..];
    let tag_count = src
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::MissingTagTerminator)?;
    let tags = &src[..tag_count];
    // The comma counts towards the tag block's alignment.
    skip(&mut src, tag_count);
    skip(&mut src, pad_len(tag_count + 1));

    let mut args = Vec::with_capacity(tag_count);
    for (index, &tag) in tags.iter().enumerate() {
        let arg = match tag {
            b'i' => Arg::Int(take_word(&mut src, index, tag)? as i32),
            b'f' => Arg::Float(f32::from_bits(take_word(&mut src, index, tag)?)),
            b's' => Arg::Str(take_string(&mut src, index)?),
            BLOB_TAG => return Err(DecodeError::UnsupportedBlobType { index }),
            other => {
                return Err(DecodeError::UnknownTag {
                    index,
                    tag: other as char,
                })
            }
        };
        args.push(arg);
    }

    if let Some(pos) = src.iter().position(|&b| b != 0) {
        return Err(DecodeError::TrailingNonZeroData {
            offset: packet.len() - src.len() + pos,
        });
    }

    trace!(%address, tags = tag_count, len = packet.len(), "decoded message");
    Ok(Message::from_parts(address, args, packet))
}

fn put_padded(dst: &mut BytesMut, field: &[u8]) {
    let pad = pad_len(field.len());
    dst.reserve(field.len() + pad);
    dst.put_slice(field);
    dst.put_bytes(0, pad);
}

fn check_no_nul(field: &str, name: &'static str) -> std::result::Result<(), EncodeError> {
    if field.as_bytes().contains(&0) {
        return Err(EncodeError::InteriorNul { field: name });
    }
    Ok(())
}

fn trim_trailing_zeros(field: &[u8]) -> &[u8] {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &field[..end]
}

// Padding at the very end of a packet may be short; skip whatever is there.
fn skip(src: &mut &[u8], n: usize) {
    src.advance(n.min(src.len()));
}

fn take_word(src: &mut &[u8], index: usize, tag: u8) -> Result<u32> {
    if src.len() < 4 {
        return Err(DecodeError::TruncatedArgument {
            index,
            tag: tag as char,
        });
    }
    Ok(src.get_u32())
}

fn take_string(src: &mut &[u8], index: usize) -> Result<String> {
    let len = src
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::TruncatedArgument { index, tag: 's' })?;
    let value = String::from_utf8_lossy(&src[..len]).into_owned();
    skip(src, len);
    skip(src, pad_len(len));
    Ok(value)
}
