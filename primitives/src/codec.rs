//! Deterministic binary encoding for arguments, events and transactions.
//!
//! Encoding format:
//! - Fixed-size integers are little-endian
//! - Variable-length fields (bytes, strings) are length-prefixed (u32 LE)
//! - Repeated fields are count-prefixed (u32 LE) then concatenated
//! - Tagged unions (arguments, signers) start with a 1-byte tag
//!
//! Packed argument arrays are how nested arguments cross the SDK boundary
//! (`Service.callMethod`, `Events.emitEvent`, cross-chain calls).

use crate::block::{SignedTransaction, Signer, Transaction, SIGNER_SCHEME_ED25519};
use crate::error::CodecError;
use crate::execution::{Argument, ArgumentArray, Event};

const ARG_UINT32: u8 = 0;
const ARG_UINT64: u8 = 1;
const ARG_STRING: u8 = 2;
const ARG_BYTES: u8 = 3;

/// A cursor for reading bytes during decoding.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_bytes(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_array32(&mut self) -> Result<[u8; 32], CodecError> {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(self.read_bytes(32)?);
        Ok(buf)
    }

    fn read_var_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        String::from_utf8(self.read_var_bytes()?).map_err(|_| CodecError::InvalidUtf8)
    }

    fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

// ── Encoding helpers ──

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_u32(buf, data.len() as u32);
    buf.extend_from_slice(data);
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_var_bytes(buf, s.as_bytes());
}

// ── Arguments ──

fn write_argument(buf: &mut Vec<u8>, arg: &Argument) {
    match arg {
        Argument::Uint32(v) => {
            buf.push(ARG_UINT32);
            write_u32(buf, *v);
        }
        Argument::Uint64(v) => {
            buf.push(ARG_UINT64);
            write_u64(buf, *v);
        }
        Argument::String(v) => {
            buf.push(ARG_STRING);
            write_string(buf, v);
        }
        Argument::Bytes(v) => {
            buf.push(ARG_BYTES);
            write_var_bytes(buf, v);
        }
    }
}

fn read_argument(r: &mut Reader<'_>) -> Result<Argument, CodecError> {
    match r.read_u8()? {
        ARG_UINT32 => Ok(Argument::Uint32(r.read_u32()?)),
        ARG_UINT64 => Ok(Argument::Uint64(r.read_u64()?)),
        ARG_STRING => Ok(Argument::String(r.read_string()?)),
        ARG_BYTES => Ok(Argument::Bytes(r.read_var_bytes()?)),
        tag => Err(CodecError::UnknownArgumentType(tag)),
    }
}

fn write_argument_array(buf: &mut Vec<u8>, args: &ArgumentArray) {
    write_u32(buf, args.len() as u32);
    for arg in args {
        write_argument(buf, arg);
    }
}

fn read_argument_array(r: &mut Reader<'_>) -> Result<ArgumentArray, CodecError> {
    let count = r.read_u32()? as usize;
    // Every argument takes at least 5 bytes; cap the preallocation by what
    // the input could possibly hold.
    let mut args = Vec::with_capacity(count.min(r.remaining() / 5));
    for _ in 0..count {
        args.push(read_argument(r)?);
    }
    Ok(ArgumentArray::from(args))
}

/// Pack an argument array into its canonical byte form.
pub fn encode_argument_array(args: &ArgumentArray) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    write_argument_array(&mut buf, args);
    buf
}

/// Unpack an argument array. The whole input must be consumed.
///
/// An empty input decodes to an empty array, so contracts may pass no
/// payload at all where a packed array is expected.
pub fn decode_argument_array(data: &[u8]) -> Result<ArgumentArray, CodecError> {
    if data.is_empty() {
        return Ok(ArgumentArray::new());
    }
    let mut r = Reader::new(data);
    let args = read_argument_array(&mut r)?;
    r.finish()?;
    Ok(args)
}

// ── Events ──

/// Encode a single `Event` to deterministic bytes.
pub fn encode_event(event: &Event) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    write_string(&mut buf, &event.contract_name);
    write_string(&mut buf, &event.event_name);
    write_var_bytes(&mut buf, &event.packed_arguments);
    buf
}

/// Decode a single `Event` from bytes.
pub fn decode_event(data: &[u8]) -> Result<Event, CodecError> {
    let mut r = Reader::new(data);
    let event = Event {
        contract_name: r.read_string()?,
        event_name: r.read_string()?,
        packed_arguments: r.read_var_bytes()?,
    };
    r.finish()?;
    Ok(event)
}

// ── Transactions ──

fn write_signer(buf: &mut Vec<u8>, signer: &Signer) {
    match signer {
        Signer::Ed25519 { public_key } => {
            buf.push(SIGNER_SCHEME_ED25519);
            buf.extend_from_slice(public_key);
        }
        Signer::Unknown(unknown) => {
            buf.push(unknown.scheme());
            write_var_bytes(buf, unknown.key());
        }
    }
}

fn read_signer(r: &mut Reader<'_>) -> Result<Signer, CodecError> {
    match r.read_u8()? {
        SIGNER_SCHEME_ED25519 => Ok(Signer::Ed25519 { public_key: r.read_array32()? }),
        scheme => Signer::unknown(scheme, r.read_var_bytes()?),
    }
}

fn write_transaction(buf: &mut Vec<u8>, tx: &Transaction) {
    write_u32(buf, tx.protocol_version);
    write_u32(buf, tx.virtual_chain_id);
    write_u64(buf, tx.timestamp);
    write_signer(buf, &tx.signer);
    write_string(buf, &tx.contract_name);
    write_string(buf, &tx.method_name);
    write_argument_array(buf, &tx.input_arguments);
}

fn read_transaction(r: &mut Reader<'_>) -> Result<Transaction, CodecError> {
    Ok(Transaction {
        protocol_version: r.read_u32()?,
        virtual_chain_id: r.read_u32()?,
        timestamp: r.read_u64()?,
        signer: read_signer(r)?,
        contract_name: r.read_string()?,
        method_name: r.read_string()?,
        input_arguments: read_argument_array(r)?,
    })
}

/// Encode a `Transaction`. These are the bytes that get hashed and signed.
pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);
    write_transaction(&mut buf, tx);
    buf
}

pub fn decode_transaction(data: &[u8]) -> Result<Transaction, CodecError> {
    let mut r = Reader::new(data);
    let tx = read_transaction(&mut r)?;
    r.finish()?;
    Ok(tx)
}

/// Encode a `SignedTransaction`: the transaction followed by the signature.
pub fn encode_signed_transaction(signed: &SignedTransaction) -> Vec<u8> {
    let mut buf = encode_transaction(&signed.transaction);
    write_var_bytes(&mut buf, &signed.signature);
    buf
}

pub fn decode_signed_transaction(data: &[u8]) -> Result<SignedTransaction, CodecError> {
    let mut r = Reader::new(data);
    let transaction = read_transaction(&mut r)?;
    let signature = r.read_var_bytes()?;
    r.finish()?;
    Ok(SignedTransaction { transaction, signature })
}
