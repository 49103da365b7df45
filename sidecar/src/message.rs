use bytes::Bytes;

use crate::Result;

/// A value that can travel as the payload of a single frame.
///
/// Every `prost` message gets this for free. `RawMessage` opts out of any
/// encoding and moves payload bytes through untouched. The representation is
/// fixed by the type parameter a call is constructed with.
pub trait RpcMessage: Sized + Send + Sync + 'static {
    fn encode_message(&self) -> Result<Bytes>;

    fn decode_message(payload: Bytes) -> Result<Self>;
}

impl<T> RpcMessage for T
where
    T: prost::Message + Default + 'static,
{
    fn encode_message(&self) -> Result<Bytes> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn decode_message(payload: Bytes) -> Result<Self> {
        Ok(T::decode(payload)?)
    }
}

/// Opaque payload bytes, framed without any encoding step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage(pub Bytes);

impl RawMessage {
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for RawMessage {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

impl From<Vec<u8>> for RawMessage {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<&'static str> for RawMessage {
    fn from(value: &'static str) -> Self {
        Self(Bytes::from_static(value.as_bytes()))
    }
}

impl RpcMessage for RawMessage {
    fn encode_message(&self) -> Result<Bytes> {
        Ok(self.0.clone())
    }

    fn decode_message(payload: Bytes) -> Result<Self> {
        Ok(Self(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, prost::Message)]
    struct Note {
        #[prost(string, tag = "1")]
        text: String,
    }

    #[test]
    fn prost_messages_encode_through_protobuf() -> Result<()> {
        let note = Note {
            text: "hi".to_string(),
        };
        let bytes = note.encode_message()?;
        // field 1, wire type 2, length 2
        assert_eq!(bytes.as_ref(), &[0x0a, 0x02, b'h', b'i']);
        assert_eq!(Note::decode_message(bytes)?, note);
        Ok(())
    }

    #[test]
    fn raw_messages_pass_through() -> Result<()> {
        let raw = RawMessage::from("\x00\x01not protobuf");
        assert_eq!(raw.encode_message()?.as_ref(), b"\x00\x01not protobuf");
        Ok(())
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = Note::decode_message(Bytes::from_static(&[0x0a, 0x09, b'x']));
        assert!(matches!(err, Err(crate::Error::Decode(_))));
    }
}
