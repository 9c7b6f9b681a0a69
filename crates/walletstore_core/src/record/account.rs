//! Account and accounting entry records.

use crate::types::PubKey;
use walletstore_codec::{CodecResult, Decode, Encode, RecordReader, RecordWriter};

/// A named account, keyed by its name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Account {
    /// Receiving key associated with the account; empty when unset.
    pub pub_key: PubKey,
}

impl Account {
    /// Version written by the encoder.
    pub const VERSION_CURRENT: u32 = 1;
}

impl Encode for Account {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = RecordWriter::new();
        writer.put_u32(Self::VERSION_CURRENT);
        writer.put_bytes(self.pub_key.as_bytes());
        Ok(writer.into_bytes())
    }
}

impl Decode for Account {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = RecordReader::new(bytes);
        let _version = reader.read_u32()?;
        let pub_key = PubKey::new(reader.read_bytes()?);
        reader.expect_end()?;
        Ok(Self { pub_key })
    }
}

/// An internal credit/debit move between accounts.
///
/// Keyed by account name plus a monotonic sequence number, so a cursor
/// scan returns one account's entries in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountingEntry {
    /// Signed amount: positive credits the account, negative debits it.
    pub credit_debit: i64,
    /// Unix time the entry was recorded.
    pub time: i64,
    /// The account on the other side of the move.
    pub other_account: String,
    /// Free-form note.
    pub comment: String,
}

impl AccountingEntry {
    /// Version written by the encoder.
    pub const VERSION_CURRENT: u32 = 1;
}

impl Encode for AccountingEntry {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = RecordWriter::new();
        writer.put_u32(Self::VERSION_CURRENT);
        writer.put_i64(self.credit_debit);
        writer.put_i64(self.time);
        writer.put_string(&self.other_account);
        writer.put_string(&self.comment);
        Ok(writer.into_bytes())
    }
}

impl Decode for AccountingEntry {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = RecordReader::new(bytes);
        let _version = reader.read_u32()?;
        let credit_debit = reader.read_i64()?;
        let time = reader.read_i64()?;
        let other_account = reader.read_string()?;
        let comment = reader.read_string()?;
        reader.expect_end()?;
        Ok(Self {
            credit_debit,
            time,
            other_account,
            comment,
        })
    }
}
